//! Test doubles: recording pins, a stepping clock, a scripted console and a
//! panel model that replays pin writes into the image a real panel would show.

extern crate std;

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::fmt;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::{Channels, Clock, Console, PanelConfig, PinBank};

pub(crate) static ADDRESS: [&str; 4] = ["A", "B", "C", "D"];
pub(crate) static RGB: [&str; 6] = ["R1", "G1", "B1", "R2", "G2", "B2"];

pub(crate) fn config() -> PanelConfig<'static> {
    PanelConfig::new(&ADDRESS, &RGB, "CLK", "LAT", "OE")
}

/// Shared record of every pin operation.
#[derive(Default)]
pub(crate) struct Bus {
    events: RefCell<Vec<(String, bool)>>,
    levels: RefCell<BTreeMap<String, bool>>,
    bound: RefCell<Vec<String>>,
    released: RefCell<Vec<String>>,
    fail_bind: RefCell<Option<String>>,
    fail_release: RefCell<Option<String>>,
}

impl Bus {
    pub(crate) fn events(&self) -> Vec<(String, bool)> {
        self.events.borrow().clone()
    }

    pub(crate) fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    pub(crate) fn levels(&self) -> BTreeMap<String, bool> {
        self.levels.borrow().clone()
    }

    pub(crate) fn level(&self, name: &str) -> Option<bool> {
        self.levels.borrow().get(name).copied()
    }

    /// Rising edges seen on `name` since the log was last cleared.
    pub(crate) fn pulses(&self, name: &str) -> usize {
        let mut level = false;
        let mut count = 0;
        for (pin, high) in self.events.borrow().iter() {
            if pin == name {
                if *high && !level {
                    count += 1;
                }
                level = *high;
            }
        }
        count
    }

    pub(crate) fn bound(&self) -> Vec<String> {
        self.bound.borrow().clone()
    }

    pub(crate) fn released(&self) -> Vec<String> {
        self.released.borrow().clone()
    }

    pub(crate) fn fail_bind(&self, name: &str) {
        *self.fail_bind.borrow_mut() = Some(name.to_string());
    }

    pub(crate) fn fail_release(&self, name: &str) {
        *self.fail_release.borrow_mut() = Some(name.to_string());
    }
}

pub(crate) struct MockPin {
    name: String,
    bus: Rc<Bus>,
}

impl MockPin {
    pub(crate) fn new(name: &str, bus: &Rc<Bus>) -> Self {
        Self {
            name: name.to_string(),
            bus: bus.clone(),
        }
    }

    fn write(&mut self, high: bool) {
        self.bus.events.borrow_mut().push((self.name.clone(), high));
        self.bus.levels.borrow_mut().insert(self.name.clone(), high);
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

pub(crate) struct MockBank {
    pub(crate) bus: Rc<Bus>,
}

impl MockBank {
    pub(crate) fn new() -> (Self, Rc<Bus>) {
        let bus = Rc::new(Bus::default());
        (Self { bus: bus.clone() }, bus)
    }
}

impl PinBank for MockBank {
    type Pin = MockPin;
    type Error = String;

    fn bind(&mut self, name: &str) -> Result<MockPin, String> {
        if self.bus.fail_bind.borrow().as_deref() == Some(name) {
            return Err(name.to_string());
        }
        self.bus.bound.borrow_mut().push(name.to_string());
        Ok(MockPin::new(name, &self.bus))
    }

    fn release(&mut self, pin: MockPin) -> Result<(), String> {
        if self.bus.fail_release.borrow().as_deref() == Some(pin.name.as_str()) {
            return Err(pin.name);
        }
        self.bus.released.borrow_mut().push(pin.name);
        Ok(())
    }
}

/// Advances by `step` on every read.
pub(crate) struct MockClock {
    now: Cell<u64>,
    step: u64,
    reads: Cell<usize>,
}

impl MockClock {
    pub(crate) fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(0),
            step: step.as_micros(),
            reads: Cell::new(0),
        }
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.reads.set(self.reads.get() + 1);
        let now = self.now.get();
        self.now.set(now + self.step);
        Instant::from_micros(now)
    }
}

/// Replays a script of input bytes, one per poll at most, and records output.
pub(crate) struct MockConsole {
    stale: VecDeque<u8>,
    script: VecDeque<Option<u8>>,
    pub(crate) output: String,
    pub(crate) polls: usize,
}

impl MockConsole {
    /// `stale` is already buffered before the read starts. In `script`,
    /// `None` is a poll with nothing ready and `Some(0xff)` a failed read.
    pub(crate) fn new(stale: &[u8], script: &[Option<u8>]) -> Self {
        Self {
            stale: stale.iter().copied().collect(),
            script: script.iter().copied().collect(),
            output: String::new(),
            polls: 0,
        }
    }

    pub(crate) fn typing(text: &str) -> Self {
        let script: Vec<_> = text.bytes().flat_map(|b| [None, Some(b)]).collect();
        Self::new(&[], &script)
    }
}

impl fmt::Write for MockConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

impl Console for MockConsole {
    type Error = ();

    fn poll_readable(&mut self, _timeout: Duration) -> bool {
        self.polls += 1;
        if !self.stale.is_empty() {
            return true;
        }
        match self.script.front() {
            Some(Some(_)) => true,
            Some(None) => {
                self.script.pop_front();
                false
            }
            None => false,
        }
    }

    fn read_byte(&mut self) -> Result<u8, ()> {
        if let Some(b) = self.stale.pop_front() {
            return Ok(b);
        }
        match self.script.pop_front() {
            Some(Some(0xff)) => Err(()),
            Some(Some(b)) => Ok(b),
            _ => Err(()),
        }
    }
}

/// What a HUB75 panel would show after receiving `events`.
///
/// Columns are shifted in first to last, LAT copies the shift register to
/// the row drivers and the falling edge of OE lights the addressed row pair.
pub(crate) fn displayed(
    events: &[(String, bool)],
    rows: usize,
    cols: usize,
    channels: Channels,
) -> Vec<Vec<u8>> {
    let n = channels.count();
    let half = rows / 2;
    let mut levels: BTreeMap<&str, bool> = BTreeMap::new();
    let mut shifted: Vec<(u8, u8)> = Vec::new();
    let mut latched: Vec<(u8, u8)> = std::vec![(0, 0); cols];
    let mut image = std::vec![std::vec![0u8; cols]; rows];

    for (pin, high) in events {
        let was = levels.insert(pin.as_str(), *high).unwrap_or(false);
        match pin.as_str() {
            "CLK" if *high && !was => {
                let mut upper = 0;
                let mut lower = 0;
                for ch in 0..n {
                    if levels.get(RGB[ch]).copied().unwrap_or(false) {
                        upper |= channels.bit(ch);
                    }
                    if levels.get(RGB[3 + ch]).copied().unwrap_or(false) {
                        lower |= channels.bit(ch);
                    }
                }
                shifted.push((upper, lower));
            }
            "LAT" if *high && !was => {
                let start = shifted.len().saturating_sub(cols);
                latched = shifted[start..].to_vec();
            }
            "OE" if !*high && was => {
                let mut address = 0;
                for (i, name) in ADDRESS.iter().enumerate() {
                    if levels.get(name).copied().unwrap_or(false) {
                        address |= 1 << i;
                    }
                }
                if address < half && latched.len() == cols {
                    for (col, &(upper, lower)) in latched.iter().enumerate() {
                        image[address][col] = upper;
                        image[address + half][col] = lower;
                    }
                }
            }
            _ => {}
        }
    }
    image
}
