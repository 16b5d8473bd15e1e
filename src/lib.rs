//! Bit-banged GPIO driver for HUB75 LED matrix displays.
//!
//! ## How HUB75 LED Displays Work
//!
//! HUB75 RGB LED matrix panels are scanned, time-multiplexed displays that behave like a long
//! daisy-chained shift register rather than a random-access framebuffer.
//!
//! ### Signal names
//! - **R1 G1 B1 / R2 G2 B2** – Serial colour data for the upper and lower halves of the active scan line
//! - **CLK** – Shift-register clock; every rising edge pushes the colour bits one pixel to the right
//! - **LAT / STB** – Latch; copies the shift-register contents to the LED drivers
//! - **OE** – Output-Enable (active LOW): LEDs are lit while OE is LOW and blanked when it is HIGH
//! - **A B C D (E)** – Row-address select lines (choose which pair of rows is lit)
//!
//! ### Row-pair scanning
//! Row `r` of the upper half-panel and row `r + ROWS / 2` of the lower half-panel share one
//! address and are shifted in together. For every address the driver
//! 1. clocks `COLS` columns of colour bits into the chain (skipped when the row pair is
//!    unchanged from the one latched last, see [`Hub75::refresh`]),
//! 2. raises OE to blank the panel,
//! 3. pulses LAT,
//! 4. drives the address lines,
//! 5. drops OE so the row pair lights up.
//!
//! Nothing here is DMA or interrupt driven: the panel only shows an image while
//! [`Hub75::refresh`] is being called, hundreds of times a second. Code that waits should
//! use [`Hub75::sleep`] and [`Hub75::read_line`], which keep refreshing while they wait.
//!
//! ## Colour
//! Each pixel is a colour index of one bit per wired channel (no BCM, no PWM). With all
//! three channels wired the index is a [`Color`]: bit 2 red, bit 1 green, bit 0 blue. With
//! fewer channels the first wired channel takes the most significant remaining bit.
//!
//! ## Example
//! ```rust
//! use core::convert::Infallible;
//! use embassy_time::{Duration, Instant};
//! use embedded_hal::digital::{ErrorType, OutputPin};
//! use hub75_gpio::{Clock, Color, Hub75, PanelConfig, PinBank};
//!
//! # struct MockPin;
//! # impl ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Board;
//! # impl PinBank for Board {
//! #     type Pin = MockPin;
//! #     type Error = Infallible;
//! #     fn bind(&mut self, _name: &str) -> Result<MockPin, Infallible> { Ok(MockPin) }
//! #     fn release(&mut self, _pin: MockPin) -> Result<(), Infallible> { Ok(()) }
//! # }
//! # struct Ticks(core::cell::Cell<u64>);
//! # impl Clock for Ticks {
//! #     fn now(&self) -> Instant {
//! #         self.0.set(self.0.get() + 100);
//! #         Instant::from_micros(self.0.get())
//! #     }
//! # }
//! let config = PanelConfig::new(
//!     &["A", "B", "C", "D"],
//!     &["R1", "G1", "B1", "R2", "G2", "B2"],
//!     "CLK",
//!     "LAT",
//!     "OE",
//! );
//! let mut matrix = Hub75::<_, _, 32, 64>::new(Board, Ticks(Default::default()), &config).unwrap();
//!
//! matrix.line(0, 0, 31, 63, Color::RED.index());
//! matrix.circle(16, 32, 10, Color::BLUE.index());
//! matrix.sleep(Duration::from_millis(5), true).unwrap();
//! matrix.teardown().unwrap();
//! ```
//!
//! ## Available Feature Flags
//!
//! ### `defmt` Feature
//! Implements `defmt::Format` for the error types and emits `defmt` log lines during
//! construction, teardown and pin failures. No functional changes.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

extern crate alloc;

use bitfield::bitfield;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

pub mod console;
mod draw;
pub mod driver;
pub mod error;
pub mod framebuffer;
pub mod gpio;
#[cfg(test)]
mod mock;
mod scan;
mod schedule;
pub mod time;

pub use console::Console;
pub use driver::{Hub75, PanelConfig};
pub use error::{Error, GeometryError, OutOfRange};
pub use framebuffer::FrameBuffer;
pub use gpio::{NamedPins, PinBank};
pub use time::{Clock, SystemClock};

/// Most address lines a HUB75 connector carries (A..E).
pub const MAX_ADDRESS_LINES: usize = 5;

/// Colour data lines on a HUB75 connector (R1 G1 B1 R2 G2 B2).
pub const MAX_RGB_LINES: usize = 6;

/// Number of panel rows a given number of address lines scans.
///
/// # Arguments
///
/// * `address_lines` - Number of row-address pins wired
///
/// # Returns
///
/// `2^(address_lines + 1)`: each address selects one row in each half-panel
#[must_use]
pub const fn compute_rows(address_lines: usize) -> usize {
    1 << (address_lines + 1)
}

/// Number of address lines needed to scan `rows` rows, if `rows` is scannable.
#[must_use]
pub const fn compute_address_lines(rows: usize) -> Option<usize> {
    if rows < 2 || !rows.is_power_of_two() {
        return None;
    }
    Some(rows.trailing_zeros() as usize - 1)
}

bitfield! {
    /// 3-bit colour index as stored in the framebuffer when all three
    /// channels are wired.
    ///
    /// The bit layout is as follows:
    /// - Bit 2: Red
    /// - Bit 1: Green
    /// - Bit 0: Blue
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Color(u8);
    impl Debug;
    pub red, set_red: 2;
    pub green, set_green: 1;
    pub blue, set_blue: 0;
}

impl Color {
    /// All channels off
    pub const BLACK: Self = Self(0b000);
    /// Blue only
    pub const BLUE: Self = Self(0b001);
    /// Green only
    pub const GREEN: Self = Self(0b010);
    /// Green and blue
    pub const CYAN: Self = Self(0b011);
    /// Red only
    pub const RED: Self = Self(0b100);
    /// Red and blue
    pub const MAGENTA: Self = Self(0b101);
    /// Red and green
    pub const YELLOW: Self = Self(0b110);
    /// All channels on
    pub const WHITE: Self = Self(0b111);

    /// Colour from a raw index; bits above the three channels are dropped.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index & 0b111)
    }

    /// Raw index as written to the framebuffer.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl From<Rgb888> for Color {
    /// A channel is lit when its 8-bit value is at least half intensity.
    fn from(color: Rgb888) -> Self {
        let mut c = Self::BLACK;
        c.set_red(color.r() >= 0x80);
        c.set_green(color.g() >= 0x80);
        c.set_blue(color.b() >= 0x80);
        c
    }
}

impl From<Color> for Rgb888 {
    fn from(color: Color) -> Self {
        let level = |on: bool| if on { 0xff } else { 0 };
        Rgb888::new(level(color.red()), level(color.green()), level(color.blue()))
    }
}

/// How many colour channels are wired to each half-panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channels {
    /// One channel (R1/R2 for example), colours `0..2`
    One = 1,
    /// Two channels, colours `0..4`
    Two = 2,
    /// All three channels, colours `0..8`
    Three = 3,
}

impl Channels {
    /// Channel count from the number of RGB pins wired across both half-panels.
    ///
    /// # Errors
    ///
    /// [`GeometryError::ChannelPins`] unless `pins` is 2, 4 or 6.
    pub const fn from_pin_count(pins: usize) -> Result<Self, GeometryError> {
        match pins {
            2 => Ok(Self::One),
            4 => Ok(Self::Two),
            6 => Ok(Self::Three),
            n => Err(GeometryError::ChannelPins(n)),
        }
    }

    /// Number of channels per half-panel.
    #[must_use]
    pub const fn count(self) -> usize {
        self as usize
    }

    /// Mask applied to every colour written to the framebuffer.
    #[must_use]
    pub const fn mask(self) -> u8 {
        (1 << self.count()) - 1
    }

    /// Bit of the colour index that drives channel `channel`, MSB first.
    #[must_use]
    pub const fn bit(self, channel: usize) -> u8 {
        1 << (self.count() - 1 - channel)
    }
}
