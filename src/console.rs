//! Line-oriented text console used by [`Hub75::read_line`](crate::Hub75::read_line).
//!
//! The console is a debugging convenience, so reads are best effort: a byte
//! that fails to read is dropped and the line editor carries on.

use core::fmt;

use embassy_time::Duration;

/// A byte-at-a-time input with a text output for prompts and echo.
pub trait Console: fmt::Write {
    /// Read failure.
    type Error: fmt::Debug;

    /// Whether at least one byte can be read within `timeout`.
    ///
    /// Must return promptly: the display goes dark while this waits.
    fn poll_readable(&mut self, timeout: Duration) -> bool;

    /// Read one byte. Only called after [`poll_readable`](Self::poll_readable)
    /// returned `true`, so it must not block.
    ///
    /// # Errors
    ///
    /// If the byte cannot be read; the caller drops it.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;
}
