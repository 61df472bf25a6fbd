//! Tick time base for the scheduler.
//!
//! One tick is one millisecond. Deadlines are absolute [`Tick`] values built
//! by adding [`TickDuration`] offsets to a single anchor.

use core::cell::Cell;
use core::fmt;
use core::ops::{Add, AddAssign};

use critical_section::Mutex;

/// Tick rate of the scheduling time base.
pub const TICK_RATE_HZ: u32 = 1000;

const MICROS_PER_TICK: u64 = 1_000_000 / TICK_RATE_HZ as u64;

/// Absolute position on the monotonic tick counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(u64);

impl Tick {
    /// Zero tick
    pub const ZERO: Self = Self(0);

    /// Create a tick from a raw counter value
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Get the raw tick value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`, zero when `earlier` lies ahead of `self`.
    pub fn saturating_since(self, earlier: Tick) -> TickDuration {
        let elapsed = self.0.saturating_sub(earlier.0);
        TickDuration::from_ticks(u32::try_from(elapsed).unwrap_or(u32::MAX))
    }

    /// Check if this tick is strictly after another tick
    pub fn is_after(self, other: Tick) -> bool {
        self.0 > other.0
    }
}

impl Add<TickDuration> for Tick {
    type Output = Tick;

    fn add(self, rhs: TickDuration) -> Tick {
        Tick(self.0.saturating_add(u64::from(rhs.ticks)))
    }
}

impl AddAssign<TickDuration> for Tick {
    fn add_assign(&mut self, rhs: TickDuration) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick:{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Tick {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "tick:{}", self.0);
    }
}

/// Span of ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct TickDuration {
    ticks: u32,
}

impl TickDuration {
    /// Zero duration
    pub const ZERO: Self = Self { ticks: 0 };

    /// Maximum duration
    pub const MAX: Self = Self { ticks: u32::MAX };

    /// Create duration from ticks
    pub const fn from_ticks(ticks: u32) -> Self {
        Self { ticks }
    }

    /// Create duration from milliseconds
    pub const fn from_millis(millis: u32) -> Self {
        Self { ticks: millis }
    }

    /// Create duration from seconds, saturating on overflow
    pub const fn from_secs(secs: u32) -> Self {
        Self {
            ticks: secs.saturating_mul(TICK_RATE_HZ),
        }
    }

    /// Smallest duration covering `micros`, so airtimes are never shortened.
    pub fn from_micros_ceil(micros: u64) -> Self {
        let ticks = micros.div_ceil(MICROS_PER_TICK);
        Self {
            ticks: u32::try_from(ticks).unwrap_or(u32::MAX),
        }
    }

    /// Get tick count
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Convert to milliseconds
    pub const fn as_millis(&self) -> u32 {
        self.ticks
    }

    /// Convert to microseconds
    pub const fn as_micros(&self) -> u64 {
        self.ticks as u64 * MICROS_PER_TICK
    }

    /// Check if duration is zero
    pub const fn is_zero(&self) -> bool {
        self.ticks == 0
    }

    pub fn checked_add(self, rhs: TickDuration) -> Option<TickDuration> {
        self.ticks.checked_add(rhs.ticks).map(Self::from_ticks)
    }

    pub fn checked_mul(self, factor: u32) -> Option<TickDuration> {
        self.ticks.checked_mul(factor).map(Self::from_ticks)
    }

    pub fn saturating_add(self, rhs: TickDuration) -> TickDuration {
        Self::from_ticks(self.ticks.saturating_add(rhs.ticks))
    }

    pub fn saturating_mul(self, factor: u32) -> TickDuration {
        Self::from_ticks(self.ticks.saturating_mul(factor))
    }
}

impl fmt::Display for TickDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.ticks)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TickDuration {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}ms", self.ticks);
    }
}

/// Tick counter shared between a periodic tick interrupt and readers.
///
/// Usable as a `static`; every access runs inside a critical section.
pub struct TickCounter {
    ticks: Mutex<Cell<u64>>,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Called once per tick from the tick interrupt.
    pub fn advance(&self) {
        self.advance_by(1);
    }

    pub fn advance_by(&self, ticks: u64) {
        critical_section::with(|cs| {
            let cell = self.ticks.borrow(cs);
            cell.set(cell.get().saturating_add(ticks));
        });
    }

    pub fn now(&self) -> Tick {
        critical_section::with(|cs| Tick(self.ticks.borrow(cs).get()))
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a [`TickDuration`] from a literal.
#[macro_export]
macro_rules! duration {
    ($value:literal ms) => {
        $crate::TickDuration::from_millis($value)
    };
    ($value:literal s) => {
        $crate::TickDuration::from_secs($value)
    };
    ($value:literal ticks) => {
        $crate::TickDuration::from_ticks($value)
    };
}
