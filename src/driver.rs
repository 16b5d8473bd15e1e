//! The panel driver: pin binding, the framebuffer and the scan, owned together.
//!
//! A [`Hub75`] is built from a [`PinBank`], a [`Clock`] and a [`PanelConfig`].
//! Construction checks the geometry before touching any pin, binds every pin
//! and blanks the panel. [`Hub75::teardown`] blanks it again and hands every
//! pin back to the bank.

use embassy_time::Duration;
use heapless::Vec;

use crate::error::{Error, GeometryError, OutOfRange};
use crate::scan::{ScanPins, MAX_PINS};
use crate::{
    compute_rows, Channels, Clock, FrameBuffer, PinBank, MAX_ADDRESS_LINES, MAX_RGB_LINES,
};

/// Pin names and timing for one panel.
///
/// # Example
/// ```rust
/// use embassy_time::Duration;
/// use hub75_gpio::PanelConfig;
///
/// // red and green wired, blue held low
/// const CONFIG: PanelConfig<'static> = PanelConfig::new(
///     &["A", "B", "C", "D"],
///     &["R1", "G1", "R2", "G2"],
///     "CLK",
///     "LAT",
///     "OE",
/// )
/// .unused_rgb(&["B1", "B2"])
/// .brightness(Duration::from_micros(20));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig<'a> {
    address: &'a [&'a str],
    rgb: &'a [&'a str],
    unused_rgb: &'a [&'a str],
    clock: &'a str,
    latch: &'a str,
    output_enable: &'a str,
    brightness: Duration,
}

impl<'a> PanelConfig<'a> {
    /// Create a configuration.
    ///
    /// # Arguments
    ///
    /// * `address` - Row-address pins, A first
    /// * `rgb` - Wired colour pins of the upper half-panel followed by the
    ///   same colours of the lower half-panel, e.g. `R1 G1 B1 R2 G2 B2`
    /// * `clock` - Shift clock (CLK)
    /// * `latch` - Latch (LAT / STB)
    /// * `output_enable` - Output enable (OE), active low
    #[must_use]
    pub const fn new(
        address: &'a [&'a str],
        rgb: &'a [&'a str],
        clock: &'a str,
        latch: &'a str,
        output_enable: &'a str,
    ) -> Self {
        Self {
            address,
            rgb,
            unused_rgb: &[],
            clock,
            latch,
            output_enable,
            brightness: Duration::from_ticks(0),
        }
    }

    /// Colour pins that are connected but not used. They are bound and held
    /// low so they do not float and show up as noise.
    #[must_use]
    pub const fn unused_rgb(mut self, unused_rgb: &'a [&'a str]) -> Self {
        self.unused_rgb = unused_rgb;
        self
    }

    /// Extra time a row is held lit when it was not shifted again.
    ///
    /// Skipping unchanged rows makes them light for less time than shifted
    /// ones; this evens it out. Zero, the default, disables it.
    #[must_use]
    pub const fn brightness(mut self, brightness: Duration) -> Self {
        self.brightness = brightness;
        self
    }

    /// Check the pin lists against a `ROWS` x `COLS` panel.
    ///
    /// # Errors
    ///
    /// The first [`GeometryError`] found.
    pub fn validate<const ROWS: usize, const COLS: usize>(
        &self,
    ) -> Result<Channels, GeometryError> {
        if COLS == 0 {
            return Err(GeometryError::NoColumns);
        }
        let address_lines = self.address.len();
        if address_lines > MAX_ADDRESS_LINES {
            return Err(GeometryError::TooManyAddressLines(address_lines));
        }
        if ROWS != compute_rows(address_lines) {
            return Err(GeometryError::AddressLines {
                rows: ROWS,
                address_lines,
            });
        }
        let channels = Channels::from_pin_count(self.rgb.len())?;
        let rgb_lines = self.rgb.len() + self.unused_rgb.len();
        if rgb_lines > MAX_RGB_LINES {
            return Err(GeometryError::TooManyRgbPins(rgb_lines));
        }
        Ok(channels)
    }

    /// Every pin name in binding order.
    fn names(self) -> impl Iterator<Item = &'a str> {
        [self.clock, self.latch, self.output_enable]
            .into_iter()
            .chain(self.address.iter().copied())
            .chain(self.rgb.iter().copied())
            .chain(self.unused_rgb.iter().copied())
    }
}

/// Hand every pin back, attempting all of them, and report the first failure.
fn release_all<B: PinBank>(
    bank: &mut B,
    pins: impl IntoIterator<Item = B::Pin>,
) -> Result<(), B::Error> {
    let mut result = Ok(());
    for pin in pins {
        if let Err(err) = bank.release(pin) {
            #[cfg(feature = "defmt")]
            defmt::warn!("hub75: pin release failed: {}", defmt::Debug2Format(&err));
            result = result.and(Err(err));
        }
    }
    result
}

/// A HUB75 panel of `ROWS` x `COLS` pixels driven through GPIO pins from `B`.
///
/// The panel only shows the framebuffer while [`refresh`](Self::refresh) is
/// called, so it has to be called continuously. Drawing calls between two
/// refreshes show up together in the next one.
pub struct Hub75<B: PinBank, C, const ROWS: usize, const COLS: usize> {
    bank: B,
    clock: C,
    pins: ScanPins<B::Pin>,
    fb: FrameBuffer<ROWS, COLS>,
    brightness: Duration,
}

impl<B: PinBank, C: Clock, const ROWS: usize, const COLS: usize> Hub75<B, C, ROWS, COLS> {
    /// Bind the pins named in `config` and blank the panel.
    ///
    /// Once all pins are bound they are driven low and every row is latched
    /// empty.
    ///
    /// # Errors
    ///
    /// * [`Error::Geometry`] if `config` does not fit a `ROWS` x `COLS`
    ///   panel. No pin has been touched.
    /// * [`Error::PinBinding`] if `bank` fails to bind a pin. Pins bound
    ///   before the failure are released again.
    /// * [`Error::Pin`] if the blanking writes fail. All pins are released.
    pub fn new(mut bank: B, clock: C, config: &PanelConfig<'_>) -> Result<Self, Error<B::Error>> {
        let channels = config.validate::<ROWS, COLS>()?;

        let mut bound: Vec<B::Pin, MAX_PINS> = Vec::new();
        for name in config.names() {
            let pin = match bank.bind(name) {
                Ok(pin) => pin,
                Err(err) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "hub75: binding {} failed: {}",
                        name,
                        defmt::Debug2Format(&err)
                    );
                    // the bind error is the one worth reporting
                    let _ = release_all(&mut bank, bound);
                    return Err(Error::PinBinding(err));
                }
            };
            if let Err(pin) = bound.push(pin) {
                let _ = release_all(&mut bank, bound.into_iter().chain([pin]));
                let rgb_lines = config.rgb.len() + config.unused_rgb.len();
                return Err(GeometryError::TooManyRgbPins(rgb_lines).into());
            }
        }

        let mut matrix = Self {
            bank,
            clock,
            pins: ScanPins::new(bound, config.address.len(), channels),
            fb: FrameBuffer::new(channels),
            brightness: config.brightness,
        };
        let blank = matrix.pins.all_low().and_then(|()| matrix.send_all_rows());
        if let Err(kind) = blank {
            let Self { mut bank, pins, .. } = matrix;
            let _ = release_all(&mut bank, pins.into_pins());
            return Err(Error::Pin(kind));
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "hub75: {}x{} panel, {} address lines, {} channels",
            ROWS,
            COLS,
            config.address.len(),
            channels.count()
        );
        Ok(matrix)
    }

    /// Blank the panel and release every pin, giving the bank back.
    ///
    /// Every pin is released even if an earlier one fails. The driver is
    /// consumed, so it cannot be used afterwards:
    ///
    /// ```compile_fail
    /// # use core::convert::Infallible;
    /// # use embassy_time::Instant;
    /// # use embedded_hal::digital::{ErrorType, OutputPin};
    /// # use hub75_gpio::{Clock, Hub75, PanelConfig, PinBank};
    /// # struct MockPin;
    /// # impl ErrorType for MockPin { type Error = Infallible; }
    /// # impl OutputPin for MockPin {
    /// #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
    /// #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
    /// # }
    /// # struct Board;
    /// # impl PinBank for Board {
    /// #     type Pin = MockPin;
    /// #     type Error = Infallible;
    /// #     fn bind(&mut self, _name: &str) -> Result<MockPin, Infallible> { Ok(MockPin) }
    /// #     fn release(&mut self, _pin: MockPin) -> Result<(), Infallible> { Ok(()) }
    /// # }
    /// # struct Ticks;
    /// # impl Clock for Ticks {
    /// #     fn now(&self) -> Instant { Instant::from_ticks(0) }
    /// # }
    /// # let config = PanelConfig::new(&["A", "B", "C"], &["R1", "R2"], "CLK", "LAT", "OE");
    /// let mut matrix = Hub75::<_, _, 16, 32>::new(Board, Ticks, &config).unwrap();
    /// let board = matrix.teardown().unwrap();
    /// matrix.refresh(true).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// * [`Error::PinBinding`] with the first release failure.
    /// * [`Error::Pin`] if blanking failed; the pins are still released.
    pub fn teardown(mut self) -> Result<B, Error<B::Error>> {
        self.fb.fill(0);
        let blank = self.send_all_rows().and_then(|()| self.pins.off());

        let Self { mut bank, pins, .. } = self;
        release_all(&mut bank, pins.into_pins()).map_err(Error::PinBinding)?;
        blank.map_err(Error::Pin)?;

        #[cfg(feature = "defmt")]
        defmt::info!("hub75: released all pins");
        Ok(bank)
    }

    /// Scan the framebuffer out to the panel once.
    ///
    /// With `skip_unchanged`, a row pair identical to the one latched just
    /// before it is not shifted again. This speeds up images with repeated
    /// rows, such as blank areas, a lot.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if a pin write fails.
    pub fn refresh(&mut self, skip_unchanged: bool) -> Result<(), Error<B::Error>> {
        self.pins
            .refresh(&self.fb, skip_unchanged, &self.clock, self.brightness)
            .map_err(Error::Pin)
    }

    /// Shift and latch the row pair containing `row`, whether it changed or
    /// not.
    ///
    /// # Errors
    ///
    /// * [`Error::OutOfRange`] unless `row < ROWS`.
    /// * [`Error::Pin`] if a pin write fails.
    pub fn send_row(&mut self, row: usize) -> Result<(), Error<B::Error>> {
        if row >= ROWS {
            return Err(OutOfRange {
                row: row as i32,
                col: 0,
            }
            .into());
        }
        self.pins.send_row(&self.fb, row).map_err(Error::Pin)
    }

    fn send_all_rows(&mut self) -> Result<(), embedded_hal::digital::ErrorKind> {
        for row in 0..ROWS {
            self.pins.send_row(&self.fb, row)?;
        }
        Ok(())
    }

    /// Blank the panel until the next refresh. The framebuffer is kept.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if the write fails.
    pub fn off(&mut self) -> Result<(), Error<B::Error>> {
        self.pins.off().map_err(Error::Pin)
    }

    /// Fill the framebuffer with colour 0 and latch every row, so the panel
    /// goes dark without waiting for a refresh.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if a pin write fails.
    pub fn clear(&mut self) -> Result<(), Error<B::Error>> {
        self.fb.fill(0);
        self.send_all_rows().map_err(Error::Pin)
    }

    /// Write `color` at (`row`, `col`), masked to the wired channels.
    ///
    /// # Errors
    ///
    /// [`OutOfRange`] outside the panel; nothing is written.
    pub fn point(&mut self, row: i32, col: i32, color: u8) -> Result<(), OutOfRange> {
        self.fb.point(row, col, color)
    }

    /// Colour at (`row`, `col`).
    ///
    /// # Errors
    ///
    /// [`OutOfRange`] outside the panel.
    pub fn value(&self, row: i32, col: i32) -> Result<u8, OutOfRange> {
        self.fb.value(row, col)
    }

    /// See [`FrameBuffer::line`].
    pub fn line(&mut self, row0: i32, col0: i32, row1: i32, col1: i32, color: u8) {
        self.fb.line(row0, col0, row1, col1, color);
    }

    /// See [`FrameBuffer::circle`].
    pub fn circle(&mut self, row: i32, col: i32, radius: u32, color: u8) {
        self.fb.circle(row, col, radius, color);
    }

    /// See [`FrameBuffer::polygon`].
    pub fn polygon(&mut self, points: &[(i32, i32)], color: u8) {
        self.fb.polygon(points, color);
    }

    /// See [`FrameBuffer::fill`]. Unlike [`clear`](Self::clear) this does not
    /// touch the panel.
    pub fn fill(&mut self, color: u8) {
        self.fb.fill(color);
    }

    /// See [`FrameBuffer::replace`].
    pub fn replace(&mut self, from: u8, to: u8) {
        self.fb.replace(from, to);
    }

    /// See [`FrameBuffer::swap`].
    pub fn swap(&mut self, a: u8, b: u8) {
        self.fb.swap(a, b);
    }

    /// See [`FrameBuffer::fill_area`].
    ///
    /// # Errors
    ///
    /// [`OutOfRange`] if the seed is outside the panel.
    pub fn fill_area(&mut self, row: i32, col: i32, color: u8) -> Result<(), OutOfRange> {
        self.fb.fill_area(row, col, color)
    }

    /// The framebuffer being scanned.
    #[must_use]
    pub fn framebuffer(&self) -> &FrameBuffer<ROWS, COLS> {
        &self.fb
    }

    /// The framebuffer, for drawing with `embedded-graphics`.
    #[must_use]
    pub fn framebuffer_mut(&mut self) -> &mut FrameBuffer<ROWS, COLS> {
        &mut self.fb
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    /// Panel height.
    #[must_use]
    pub const fn rows(&self) -> usize {
        ROWS
    }

    /// Panel width.
    #[must_use]
    pub const fn cols(&self) -> usize {
        COLS
    }

    /// Number of row-address pins.
    #[must_use]
    pub fn address_lines(&self) -> usize {
        self.pins.address_lines()
    }

    /// Wired colour channels per half-panel.
    #[must_use]
    pub fn channels(&self) -> Channels {
        self.fb.channels()
    }

    /// Mask applied to every colour written.
    #[must_use]
    pub fn color_mask(&self) -> u8 {
        self.fb.color_mask()
    }

    /// Hold time for rows skipped by [`refresh`](Self::refresh).
    #[must_use]
    pub fn brightness(&self) -> Duration {
        self.brightness
    }

    /// Change the hold time for skipped rows. Zero disables it.
    pub fn set_brightness(&mut self, brightness: Duration) {
        self.brightness = brightness;
    }
}
