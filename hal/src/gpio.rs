//! Synchronization input and instrumentation outputs

use crate::error::HalError;

/// GPIO pin levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Low level (0V)
    Low,
    /// High level (VCC)
    High,
}

/// External start signal shared by all nodes of a testbed.
pub trait SyncInput {
    /// Completes once the line is asserted, `WouldBlock` until then.
    fn poll(&mut self) -> nb::Result<(), HalError>;
}

/// Output line used for round and slot timing capture.
///
/// Setting a level is fire-and-forget; failures are not observable to the
/// scheduler.
pub trait SignalPin {
    fn set(&mut self, level: Level);
}

/// Stand-in for boards without instrumentation outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl SignalPin for NoPin {
    fn set(&mut self, _level: Level) {}
}

impl<P: SignalPin + ?Sized> SignalPin for &mut P {
    fn set(&mut self, level: Level) {
        (**self).set(level)
    }
}
