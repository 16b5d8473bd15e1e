//! Colour-index framebuffer for a single HUB75 panel.
//!
//! The framebuffer holds one small integer per pixel, masked to the channels
//! actually wired. It knows nothing about pins or scanning; the
//! [`Hub75`](crate::Hub75) driver owns one and reads it every refresh.
//!
//! Coordinates are `(row, col)` with `(0, 0)` in the top left corner. They
//! are signed so drawing primitives can run off the panel; such pixels are
//! rejected by [`FrameBuffer::point`] and simply not drawn.
//!
//! # Example
//! ```rust
//! use hub75_gpio::{Channels, Color, FrameBuffer};
//!
//! let mut fb = FrameBuffer::<16, 32>::new(Channels::Three);
//! fb.fill(Color::BLUE.index());
//! fb.point(3, 4, Color::RED.index()).unwrap();
//! fb.swap(Color::BLUE.index(), Color::RED.index());
//!
//! assert_eq!(fb.value(3, 4), Ok(Color::BLUE.index()));
//! assert_eq!(fb.value(0, 0), Ok(Color::RED.index()));
//! assert!(fb.point(16, 0, 1).is_err());
//! ```

use core::convert::Infallible;
use core::fmt;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{OriginDimensions, Point, Size};

use crate::{Channels, Color, OutOfRange};

/// Pixel storage of a `ROWS` x `COLS` panel.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer<const ROWS: usize, const COLS: usize> {
    pixels: [[u8; COLS]; ROWS],
    channels: Channels,
}

impl<const ROWS: usize, const COLS: usize> FrameBuffer<ROWS, COLS> {
    /// Create a blank framebuffer for a panel with `channels` wired.
    #[must_use]
    pub const fn new(channels: Channels) -> Self {
        Self {
            pixels: [[0; COLS]; ROWS],
            channels,
        }
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        ROWS
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        COLS
    }

    /// Channels wired to the panel this buffer is shown on.
    #[must_use]
    pub const fn channels(&self) -> Channels {
        self.channels
    }

    /// Mask applied to every colour written.
    #[must_use]
    pub const fn color_mask(&self) -> u8 {
        self.channels.mask()
    }

    fn index(row: i32, col: i32) -> Result<(usize, usize), OutOfRange> {
        if row < 0 || col < 0 || row as usize >= ROWS || col as usize >= COLS {
            return Err(OutOfRange { row, col });
        }
        Ok((row as usize, col as usize))
    }

    /// Set the pixel at `(row, col)` to `color`.
    ///
    /// # Errors
    ///
    /// [`OutOfRange`] if the coordinate is outside the panel. The buffer is
    /// left untouched.
    pub fn point(&mut self, row: i32, col: i32, color: u8) -> Result<(), OutOfRange> {
        let (r, c) = Self::index(row, col).inspect_err(|_err| {
            #[cfg(feature = "defmt")]
            defmt::debug!("hub75: rejected point {}", _err);
        })?;
        self.pixels[r][c] = color & self.color_mask();
        Ok(())
    }

    /// Colour currently stored at `(row, col)`.
    ///
    /// # Errors
    ///
    /// [`OutOfRange`] if the coordinate is outside the panel.
    pub fn value(&self, row: i32, col: i32) -> Result<u8, OutOfRange> {
        let (r, c) = Self::index(row, col)?;
        Ok(self.pixels[r][c])
    }

    /// Write a pixel, dropping it if it falls off the panel.
    pub(crate) fn plot(&mut self, row: i32, col: i32, color: u8) {
        // off-panel pixels of a primitive are clipped, not errors
        let _ = self.point(row, col, color);
    }

    /// Set every pixel to `color`.
    pub fn fill(&mut self, color: u8) {
        let color = color & self.color_mask();
        for row in &mut self.pixels {
            row.fill(color);
        }
    }

    /// Recolour every pixel currently `from` to `to`.
    pub fn replace(&mut self, from: u8, to: u8) {
        let mask = self.color_mask();
        let (from, to) = (from & mask, to & mask);
        for pixel in self.pixels.iter_mut().flatten() {
            if *pixel == from {
                *pixel = to;
            }
        }
    }

    /// Exchange two colours: pixels `a` become `b` and pixels `b` become `a`.
    ///
    /// Each pixel is decided from its value before the call, so no pixel is
    /// recoloured twice.
    pub fn swap(&mut self, a: u8, b: u8) {
        let mask = self.color_mask();
        let (a, b) = (a & mask, b & mask);
        for pixel in self.pixels.iter_mut().flatten() {
            if *pixel == a {
                *pixel = b;
            } else if *pixel == b {
                *pixel = a;
            }
        }
    }

    /// One full row of colour indices.
    ///
    /// # Panics
    ///
    /// If `row >= ROWS`.
    #[must_use]
    pub fn row(&self, row: usize) -> &[u8; COLS] {
        &self.pixels[row]
    }

    /// Whether every pixel is `color`.
    #[must_use]
    pub fn is_filled_with(&self, color: u8) -> bool {
        self.pixels.iter().flatten().all(|&p| p == color)
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [u8; COLS] {
        &mut self.pixels[row]
    }
}

/// Dumps the buffer as a grid of colour digits under a column header.
impl<const ROWS: usize, const COLS: usize> fmt::Display for FrameBuffer<ROWS, COLS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 0..COLS {
            write!(f, "{}", col % 10)?;
        }
        writeln!(f)?;
        for (r, row) in self.pixels.iter().enumerate() {
            write!(f, "{:>2} ", r)?;
            for pixel in row {
                write!(f, "{pixel}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl<const ROWS: usize, const COLS: usize> fmt::Debug for FrameBuffer<ROWS, COLS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("rows", &ROWS)
            .field("cols", &COLS)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "defmt")]
impl<const ROWS: usize, const COLS: usize> defmt::Format for FrameBuffer<ROWS, COLS> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "FrameBuffer<{}, {}> {}", ROWS, COLS, self.channels);
    }
}

impl<const ROWS: usize, const COLS: usize> OriginDimensions for FrameBuffer<ROWS, COLS> {
    fn size(&self) -> Size {
        Size::new(COLS as u32, ROWS as u32)
    }
}

/// `embedded-graphics` drawing: `x` is the column and `y` the row.
impl<const ROWS: usize, const COLS: usize> embedded_graphics::draw_target::DrawTarget
    for FrameBuffer<ROWS, COLS>
{
    type Color = Rgb888;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        for embedded_graphics::Pixel(Point { x, y }, color) in pixels {
            self.plot(y, x, Color::from(color).index());
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(Color::from(color).index());
        Ok(())
    }
}
