//! Pin binding.
//!
//! The driver asks a [`PinBank`] for its pins by name at construction and
//! hands every one of them back on teardown. Any pin type implementing
//! [`embedded_hal::digital::OutputPin`] works, so one bank per platform is
//! all the porting needed.
//!
//! [`NamedPins`] is a ready-made bank for HALs that hand out typed pin
//! objects: fill it with `(name, pin)` pairs from the board's pin table and
//! pass it to [`Hub75::new`](crate::Hub75::new).

use core::fmt;

use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use heapless::Vec;

/// A source of named digital output pins.
pub trait PinBank {
    /// Output pin handed out by [`bind`](Self::bind).
    type Pin: OutputPin;

    /// Bind or release failure.
    type Error: fmt::Debug;

    /// Claim the pin called `name` as an output.
    ///
    /// # Errors
    ///
    /// If the pin does not exist or cannot be claimed.
    fn bind(&mut self, name: &str) -> Result<Self::Pin, Self::Error>;

    /// Give a pin obtained from [`bind`](Self::bind) back.
    ///
    /// # Errors
    ///
    /// If the pin cannot be released.
    fn release(&mut self, pin: Self::Pin) -> Result<(), Self::Error>;
}

/// Failure to bind or release a pin of a [`NamedPins`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NamedPinError {
    /// No pin with this name in the table
    Unknown,
    /// The pin is already bound
    Busy,
    /// The released pin did not come from this table
    Foreign,
    /// The table has no room for another pin
    Full,
}

impl fmt::Display for NamedPinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "no such pin"),
            Self::Busy => write!(f, "pin already bound"),
            Self::Foreign => write!(f, "pin not from this table"),
            Self::Full => write!(f, "pin table full"),
        }
    }
}

impl core::error::Error for NamedPinError {}

enum State<P> {
    Free(P),
    Bound,
    Removed,
}

struct Slot<P> {
    name: &'static str,
    state: State<P>,
}

impl<P> Slot<P> {
    fn named(&self, name: &str) -> bool {
        self.name == name && !matches!(self.state, State::Removed)
    }
}

/// Board pin table of up to `N` named pins.
pub struct NamedPins<P, const N: usize> {
    slots: Vec<Slot<P>, N>,
}

impl<P: OutputPin, const N: usize> NamedPins<P, N> {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Add `pin` under `name`.
    ///
    /// Slots freed by [`remove`](Self::remove) are reused.
    ///
    /// # Errors
    ///
    /// [`NamedPinError::Full`] when all `N` slots are taken.
    pub fn insert(&mut self, name: &'static str, pin: P) -> Result<(), NamedPinError> {
        let slot = Slot {
            name,
            state: State::Free(pin),
        };
        match self
            .slots
            .iter_mut()
            .find(|slot| matches!(slot.state, State::Removed))
        {
            Some(free) => {
                *free = slot;
                Ok(())
            }
            None => self.slots.push(slot).map_err(|_| NamedPinError::Full),
        }
    }

    /// Add `pin` under `name`, builder style.
    ///
    /// # Errors
    ///
    /// [`NamedPinError::Full`] when all `N` slots are taken.
    pub fn with(mut self, name: &'static str, pin: P) -> Result<Self, NamedPinError> {
        self.insert(name, pin)?;
        Ok(self)
    }

    /// Whether the pin called `name` is currently bound.
    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.named(name) && matches!(slot.state, State::Bound))
    }

    /// Take a pin back out of the table for good.
    ///
    /// Returns `None` if there is no such pin or it is currently bound.
    /// Afterwards the name is unknown to the table.
    pub fn remove(&mut self, name: &str) -> Option<P> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.named(name) && matches!(slot.state, State::Free(_)))?;
        match core::mem::replace(&mut slot.state, State::Removed) {
            State::Free(pin) => Some(pin),
            _ => None,
        }
    }
}

impl<P: OutputPin, const N: usize> Default for NamedPins<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin, const N: usize> PinBank for NamedPins<P, N> {
    type Pin = BoundPin<P>;
    type Error = NamedPinError;

    fn bind(&mut self, name: &str) -> Result<Self::Pin, Self::Error> {
        let (slot, entry) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.named(name))
            .ok_or(NamedPinError::Unknown)?;
        match core::mem::replace(&mut entry.state, State::Bound) {
            State::Free(pin) => Ok(BoundPin { slot, pin }),
            state => {
                entry.state = state;
                Err(NamedPinError::Busy)
            }
        }
    }

    fn release(&mut self, pin: Self::Pin) -> Result<(), Self::Error> {
        let entry = self
            .slots
            .get_mut(pin.slot)
            .ok_or(NamedPinError::Foreign)?;
        if !matches!(entry.state, State::Bound) {
            return Err(NamedPinError::Foreign);
        }
        entry.state = State::Free(pin.pin);
        Ok(())
    }
}

/// A pin on loan from a [`NamedPins`] table.
pub struct BoundPin<P> {
    slot: usize,
    pin: P,
}

impl<P: OutputPin> ErrorType for BoundPin<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for BoundPin<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high()
    }

    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.pin.set_state(state)
    }
}
