//! Error types for the driver.
//!
//! Geometry problems are detected before any pin is bound, so a
//! [`GeometryError`] never leaves hardware in a half-configured state.
//! [`OutOfRange`] is the only recoverable error and is what the pixel
//! accessors of [`FrameBuffer`](crate::framebuffer::FrameBuffer) return.

use core::fmt;

use embedded_hal::digital::ErrorKind;

/// Panel geometry that cannot be driven with the configured pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeometryError {
    /// `rows` is not `2^(address_lines + 1)`.
    AddressLines {
        /// Rows the framebuffer was declared with
        rows: usize,
        /// Number of address pins supplied
        address_lines: usize,
    },
    /// More address pins than a HUB75 connector carries.
    TooManyAddressLines(usize),
    /// The RGB pin list must name 2, 4 or 6 pins.
    ChannelPins(usize),
    /// Used plus unused RGB pins exceed the six data lines of the connector.
    TooManyRgbPins(usize),
    /// A panel needs at least one column.
    NoColumns,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressLines {
                rows,
                address_lines,
            } => write!(
                f,
                "a matrix with {rows} rows cannot be scanned with {address_lines} address pins"
            ),
            Self::TooManyAddressLines(n) => {
                write!(f, "{n} address pins given, at most {} supported", crate::MAX_ADDRESS_LINES)
            }
            Self::ChannelPins(n) => write!(f, "{n} RGB pins given, expected 2, 4 or 6"),
            Self::TooManyRgbPins(n) => write!(f, "{n} RGB pins given, a HUB75 connector has 6"),
            Self::NoColumns => write!(f, "panel has no columns"),
        }
    }
}

impl core::error::Error for GeometryError {}

/// A pixel coordinate outside the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRange {
    /// Requested row
    pub row: i32,
    /// Requested column
    pub col: i32,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad row,col ({},{})", self.row, self.col)
    }
}

impl core::error::Error for OutOfRange {}

/// Driver errors.
///
/// `E` is the error type of the [`PinBank`](crate::gpio::PinBank) the driver
/// binds its pins through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Invalid panel geometry, raised only at construction
    Geometry(GeometryError),
    /// Pixel access outside the panel
    OutOfRange(OutOfRange),
    /// The pin bank failed to bind or release a pin
    PinBinding(E),
    /// Driving a bound pin failed
    Pin(ErrorKind),
}

impl<E> From<GeometryError> for Error<E> {
    fn from(err: GeometryError) -> Self {
        Self::Geometry(err)
    }
}

impl<E> From<OutOfRange> for Error<E> {
    fn from(err: OutOfRange) -> Self {
        Self::OutOfRange(err)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(err) => write!(f, "geometry error: {err}"),
            Self::OutOfRange(err) => write!(f, "out of range: {err}"),
            Self::PinBinding(err) => write!(f, "pin binding failed: {err:?}"),
            Self::Pin(kind) => write!(f, "pin write failed: {kind}"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
