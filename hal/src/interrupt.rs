//! Interrupt hand-off abstraction

use linktest_core::TickDuration;

/// Wake signal from interrupt context to a processing context.
///
/// Holds at most one pending notification; interrupts raised before the
/// processing context wakes collapse into one.
pub trait IrqNotifier: Send + Sync {
    /// Raises the signal. Must be callable from interrupt context.
    fn notify(&self);

    /// Waits up to `timeout` for the signal and consumes it. Returns `true`
    /// if a notification was pending.
    fn wait(&self, timeout: TickDuration) -> bool;
}
