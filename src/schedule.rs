//! Waiting without letting the panel go dark.
//!
//! The panel is only lit while it is being refreshed, so anything that waits
//! refreshes in a loop instead of blocking.

use alloc::string::String;
use core::fmt::Write as _;

use embassy_time::Duration;

use crate::{Clock, Console, Error, Hub75, PinBank};

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

impl<B: PinBank, C: Clock, const ROWS: usize, const COLS: usize> Hub75<B, C, ROWS, COLS> {
    /// Refresh continuously for `duration`.
    ///
    /// Always refreshes at least once, even for a zero `duration`.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if a pin write fails; the wait ends early.
    pub fn sleep(
        &mut self,
        duration: Duration,
        skip_unchanged: bool,
    ) -> Result<(), Error<B::Error>> {
        let deadline = self.clock().now() + duration;
        loop {
            self.refresh(skip_unchanged)?;
            if self.clock().now() >= deadline {
                return Ok(());
            }
        }
    }

    /// Read a line from `console`, refreshing the panel while waiting.
    ///
    /// Input already buffered when the call starts is discarded, then
    /// `prompt` is written. Every iteration refreshes once and reads at most
    /// one byte. Input is decoded as UTF-8; printable characters and tab are
    /// collected and echoed unless `silent`, and backspace or delete erases
    /// the last character. `\n` or `\r` ends the line and is not part of the
    /// result. Bytes that fail to read, control characters and invalid UTF-8
    /// sequences are dropped.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if a refresh fails.
    pub fn read_line<T: Console>(
        &mut self,
        console: &mut T,
        prompt: Option<&str>,
        skip_unchanged: bool,
        silent: bool,
    ) -> Result<String, Error<B::Error>> {
        while console.poll_readable(Duration::from_ticks(0)) {
            let _ = console.read_byte();
            self.refresh(skip_unchanged)?;
        }
        // echo is best effort, a console that cannot print can still type
        if let Some(prompt) = prompt {
            let _ = console.write_str(prompt);
        }

        let mut line = String::new();
        let mut pending = heapless::Vec::<u8, 4>::new();
        loop {
            self.refresh(skip_unchanged)?;
            if !console.poll_readable(Duration::from_ticks(0)) {
                continue;
            }
            let byte = match console.read_byte() {
                Ok(byte) => byte,
                Err(_err) => {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("hub75: console read failed: {}", defmt::Debug2Format(&_err));
                    continue;
                }
            };

            if !byte.is_ascii() {
                if pending.push(byte).is_err() {
                    pending.clear();
                    continue;
                }
                match core::str::from_utf8(&pending) {
                    Ok(decoded) => {
                        if let Some(c) = decoded.chars().next().filter(|c| !c.is_control()) {
                            line.push(c);
                            if !silent {
                                let _ = console.write_char(c);
                            }
                        }
                        pending.clear();
                    }
                    Err(err) if err.error_len().is_some() => {
                        #[cfg(feature = "defmt")]
                        defmt::trace!("hub75: dropped invalid UTF-8 {=[u8]:x}", &pending[..]);
                        pending.clear();
                    }
                    // sequence not complete yet
                    Err(_) => {}
                }
                continue;
            }

            // an ASCII byte cuts off any unfinished sequence
            pending.clear();
            match byte {
                b'\n' | b'\r' => {
                    if !silent {
                        let _ = console.write_str("\r\n");
                    }
                    return Ok(line);
                }
                BACKSPACE | DELETE => {
                    if line.pop().is_some() && !silent {
                        let _ = console.write_str("\x08 \x08");
                    }
                }
                b'\t' | b' '..=b'~' => {
                    let c = char::from(byte);
                    line.push(c);
                    if !silent {
                        let _ = console.write_char(c);
                    }
                }
                _ => {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("hub75: dropped input byte {=u8:#x}", byte);
                }
            }
        }
    }

    /// Whether `console` has a byte ready within `timeout`.
    ///
    /// The panel is not refreshed meanwhile, so keep `timeout` short.
    pub fn input_ready<T: Console>(&self, console: &mut T, timeout: Duration) -> bool {
        console.poll_readable(timeout)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::mock::{config, MockBank, MockClock, MockConsole};

    type Matrix = Hub75<MockBank, MockClock, 32, 8>;

    fn matrix(step: Duration) -> (Matrix, std::rc::Rc<crate::mock::Bus>) {
        let (bank, bus) = MockBank::new();
        let matrix = Matrix::new(bank, MockClock::new(step), &config()).unwrap();
        bus.clear_events();
        (matrix, bus)
    }

    #[test]
    fn test_sleep_refreshes_until_deadline() {
        let (mut matrix, bus) = matrix(Duration::from_millis(1));
        // one read for the deadline, then one after every refresh
        matrix.sleep(Duration::from_millis(3), false).unwrap();
        assert_eq!(bus.pulses("LAT"), 3 * 16);
        assert_eq!(matrix.clock().reads(), 4);
    }

    #[test]
    fn test_sleep_zero_refreshes_once() {
        let (mut matrix, bus) = matrix(Duration::from_millis(1));
        matrix.sleep(Duration::from_ticks(0), false).unwrap();
        assert_eq!(bus.pulses("LAT"), 16);
    }

    #[test]
    fn test_sleep_skip_unchanged() {
        let (mut matrix, bus) = matrix(Duration::from_millis(1));
        matrix.sleep(Duration::from_millis(2), true).unwrap();
        // blank panel: one shifted pair per refresh
        assert_eq!(bus.pulses("LAT"), 2);
        assert_eq!(bus.pulses("OE"), 2 * 16);
    }

    #[test]
    fn test_read_line_collects_and_echoes() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        let mut console = MockConsole::typing("hi there\n");
        let line = matrix
            .read_line(&mut console, Some("> "), true, false)
            .unwrap();
        assert_eq!(line, "hi there");
        assert_eq!(console.output, "> hi there\r\n");
    }

    #[test]
    fn test_read_line_carriage_return_ends_line() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        let mut console = MockConsole::typing("ok\rmore");
        let line = matrix.read_line(&mut console, None, true, false).unwrap();
        assert_eq!(line, "ok");
    }

    #[test]
    fn test_read_line_silent() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        let mut console = MockConsole::typing("secret\n");
        let line = matrix
            .read_line(&mut console, Some("pw: "), true, true)
            .unwrap();
        assert_eq!(line, "secret");
        assert_eq!(console.output, "pw: ");
    }

    #[test]
    fn test_read_line_backspace() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        let mut console = MockConsole::typing("abx\x08c\x7f\x7f\x7f\x7fd\n");
        let line = matrix.read_line(&mut console, None, true, false).unwrap();
        assert_eq!(line, "d");
        // the last erase had nothing left to remove and echoes nothing
        assert_eq!(
            console.output,
            "abx\x08 \x08c\x08 \x08\x08 \x08\x08 \x08d\r\n"
        );
    }

    #[test]
    fn test_read_line_drains_stale_input() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        let script = [None, Some(b'y'), None, Some(b'\n')];
        let mut console = MockConsole::new(b"old\n", &script);
        let line = matrix.read_line(&mut console, None, true, false).unwrap();
        assert_eq!(line, "y");
    }

    #[test]
    fn test_read_line_drops_bad_bytes() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        let script = [
            None,
            Some(b'a'),
            Some(0xff),
            Some(0xc3),
            Some(0x01),
            Some(b'b'),
            Some(b'\n'),
        ];
        let mut console = MockConsole::new(&[], &script);
        let line = matrix.read_line(&mut console, None, true, true).unwrap();
        assert_eq!(line, "ab");
    }

    #[test]
    fn test_read_line_keeps_utf8_and_tab() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        let mut console = MockConsole::typing("café\tx\n");
        let line = matrix.read_line(&mut console, None, true, false).unwrap();
        assert_eq!(line, "café\tx");
        assert_eq!(console.output, "café\tx\r\n");
    }

    #[test]
    fn test_read_line_erases_whole_character() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        let mut console = MockConsole::typing("né\x7f\n");
        let line = matrix.read_line(&mut console, None, true, false).unwrap();
        assert_eq!(line, "n");
        assert_eq!(console.output, "né\x08 \x08\r\n");
    }

    #[test]
    fn test_read_line_drops_invalid_utf8() {
        let (mut matrix, _bus) = matrix(Duration::from_micros(1));
        // lone continuation byte, a truncated sequence cut off by 'b', and
        // a four byte lead followed by a non-continuation
        let script = [
            Some(0x80),
            Some(b'a'),
            Some(0xe2),
            Some(0x82),
            Some(b'b'),
            Some(0xf0),
            Some(0xc3),
            Some(0xa9),
            Some(b'c'),
            Some(0xe2),
            Some(0x82),
            Some(0xac),
            Some(b'\n'),
        ];
        let mut console = MockConsole::new(&[], &script);
        let line = matrix.read_line(&mut console, None, true, true).unwrap();
        assert_eq!(line, "abc€");
    }

    #[test]
    fn test_read_line_refreshes_while_draining() {
        let (mut matrix, bus) = matrix(Duration::from_micros(1));
        let script = [None, Some(b'y'), None, Some(b'\n')];
        let mut console = MockConsole::new(b"old\n", &script);
        let line = matrix.read_line(&mut console, None, false, true).unwrap();
        assert_eq!(line, "y");
        // four stale bytes drained, then three waits on the script
        assert_eq!(bus.pulses("LAT"), 7 * 16);
    }

    #[test]
    fn test_read_line_refreshes_every_iteration() {
        let (mut matrix, bus) = matrix(Duration::from_micros(1));
        let script = [None, None, None, Some(b'x'), None, None, Some(b'\n')];
        let mut console = MockConsole::new(&[], &script);
        let line = matrix.read_line(&mut console, None, false, true).unwrap();
        assert_eq!(line, "x");

        // one drain poll, then a poll per refresh
        let refreshes = bus.pulses("LAT") / 16;
        assert_eq!(refreshes, console.polls - 1);
        assert_eq!(refreshes, 6);
    }

    #[test]
    fn test_input_ready() {
        let (matrix, _bus) = matrix(Duration::from_micros(1));
        let mut console = MockConsole::new(&[], &[None, Some(b'x')]);
        assert!(!matrix.input_ready(&mut console, Duration::from_millis(1)));
        assert!(matrix.input_ready(&mut console, Duration::from_millis(1)));
    }
}
