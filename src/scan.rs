//! The HUB75 scan protocol, driven one pin write at a time.
//!
//! A refresh visits every address `0..ROWS / 2` once. Per address:
//! 1. shift `COLS` columns of colour bits for the upper and lower row
//!    (skipped in [`refresh`](ScanPins::refresh) with `skip_unchanged` when
//!    the pair matches the pair latched last),
//! 2. OE high to blank,
//! 3. pulse LAT, only if something was shifted,
//! 4. drive the address lines,
//! 5. OE low to light the row pair.

use embassy_time::Duration;
use embedded_hal::digital::{Error as _, ErrorKind, OutputPin, PinState};
use heapless::Vec;

use crate::{Channels, Clock, FrameBuffer, MAX_ADDRESS_LINES, MAX_RGB_LINES};

/// Binary row-address counter, bit 0 on the first address line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct AddressCounter {
    bits: [bool; MAX_ADDRESS_LINES],
}

impl AddressCounter {
    fn increment(&mut self, width: usize) {
        for bit in &mut self.bits[..width] {
            *bit = !*bit;
            // carry only out of a bit that just went low
            if *bit {
                break;
            }
        }
    }
}

const CLOCK: usize = 0;
const LATCH: usize = 1;
const OUTPUT_ENABLE: usize = 2;
const ADDRESS: usize = 3;

/// Control, address and colour pins: everything a panel can need.
pub(crate) const MAX_PINS: usize = ADDRESS + MAX_ADDRESS_LINES + MAX_RGB_LINES;

/// Every pin the driver holds, in binding order: clock, latch, output
/// enable, the address lines, the wired RGB lines (upper half-panel channels
/// then lower) and finally the unused RGB lines, which stay low.
pub(crate) struct ScanPins<P> {
    pins: Vec<P, MAX_PINS>,
    address_lines: usize,
    channels: Channels,
}

fn set<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), ErrorKind> {
    pin.set_state(PinState::from(high)).map_err(|e| e.kind())
}

fn pulse<P: OutputPin>(pin: &mut P) -> Result<(), ErrorKind> {
    set(pin, true)?;
    set(pin, false)
}

impl<P: OutputPin> ScanPins<P> {
    pub(crate) fn new(pins: Vec<P, MAX_PINS>, address_lines: usize, channels: Channels) -> Self {
        Self {
            pins,
            address_lines,
            channels,
        }
    }

    /// Drive every pin low.
    pub(crate) fn all_low(&mut self) -> Result<(), ErrorKind> {
        for pin in &mut self.pins {
            set(pin, false)?;
        }
        Ok(())
    }

    pub(crate) fn address_lines(&self) -> usize {
        self.address_lines
    }

    /// Give up the pins, in binding order.
    pub(crate) fn into_pins(self) -> Vec<P, MAX_PINS> {
        self.pins
    }

    fn rgb(&self, channel: usize) -> usize {
        ADDRESS + self.address_lines + channel
    }

    fn set_output(&mut self, enabled: bool) -> Result<(), ErrorKind> {
        set(&mut self.pins[OUTPUT_ENABLE], !enabled)
    }

    /// Blank the panel.
    pub(crate) fn off(&mut self) -> Result<(), ErrorKind> {
        self.set_output(false)
    }

    fn shift<const COLS: usize>(
        &mut self,
        upper: &[u8; COLS],
        lower: &[u8; COLS],
    ) -> Result<(), ErrorKind> {
        let n = self.channels.count();
        for (&top, &bottom) in upper.iter().zip(lower) {
            for ch in 0..n {
                let bit = self.channels.bit(ch);
                let (upper_pin, lower_pin) = (self.rgb(ch), self.rgb(ch + n));
                set(&mut self.pins[upper_pin], top & bit != 0)?;
                set(&mut self.pins[lower_pin], bottom & bit != 0)?;
            }
            pulse(&mut self.pins[CLOCK])?;
        }
        Ok(())
    }

    fn select(&mut self, address: &AddressCounter) -> Result<(), ErrorKind> {
        let lines = &mut self.pins[ADDRESS..ADDRESS + self.address_lines];
        for (pin, &high) in lines.iter_mut().zip(&address.bits) {
            set(pin, high)?;
        }
        Ok(())
    }

    /// Scan the whole framebuffer once.
    ///
    /// With `skip_unchanged`, a row pair equal in content to the pair latched
    /// last is not shifted again; the row drivers still hold it. Those rows
    /// are then held for `brightness` to make up for the time they did not
    /// spend shifting.
    pub(crate) fn refresh<C: Clock, const ROWS: usize, const COLS: usize>(
        &mut self,
        fb: &FrameBuffer<ROWS, COLS>,
        skip_unchanged: bool,
        clock: &C,
        brightness: Duration,
    ) -> Result<(), ErrorKind> {
        let half = ROWS / 2;
        let width = self.address_lines;
        let mut address = AddressCounter::default();
        let mut latched: Option<usize> = None;

        for row in 0..half {
            let (upper, lower) = (fb.row(row), fb.row(row + half));
            let changed = !skip_unchanged
                || latched.is_none_or(|prev| fb.row(prev) != upper || fb.row(prev + half) != lower);

            if changed {
                self.shift(upper, lower)?;
                latched = Some(row);
            }
            self.set_output(false)?;
            if changed {
                pulse(&mut self.pins[LATCH])?;
            }
            self.select(&address)?;
            self.set_output(true)?;
            address.increment(width);

            if !changed && brightness > Duration::from_ticks(0) {
                let deadline = clock.now() + brightness;
                while clock.now() < deadline {
                    core::hint::spin_loop();
                }
            }
        }
        Ok(())
    }

    /// Shift and latch the row pair containing `row`, unconditionally.
    pub(crate) fn send_row<const ROWS: usize, const COLS: usize>(
        &mut self,
        fb: &FrameBuffer<ROWS, COLS>,
        row: usize,
    ) -> Result<(), ErrorKind> {
        let half = ROWS / 2;
        let upper = row % half;
        self.shift(fb.row(upper), fb.row(upper + half))?;
        self.set_output(false)?;
        pulse(&mut self.pins[LATCH])?;
        let lines = &mut self.pins[ADDRESS..ADDRESS + self.address_lines];
        for (i, pin) in lines.iter_mut().enumerate() {
            set(pin, upper & (1 << i) != 0)?;
        }
        self.set_output(true)
    }
}
