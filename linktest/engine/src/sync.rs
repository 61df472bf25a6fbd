//! Locking shared by the scheduler and the interrupt relay.
//!
//! [`Mutex`] is `std::sync::Mutex` on hosted targets and `spin::Mutex` on bare
//! metal. Poisoning is ignored.

#[cfg(not(feature = "std"))]
pub use alloc::sync::Arc;
#[cfg(feature = "std")]
pub use std::sync::Arc;

#[cfg(feature = "std")]
pub type LinkGuard<'a, T> = std::sync::MutexGuard<'a, T>;
#[cfg(not(feature = "std"))]
pub type LinkGuard<'a, T> = spin::MutexGuard<'a, T>;

pub struct Mutex<T> {
    #[cfg(feature = "std")]
    cell: std::sync::Mutex<T>,
    #[cfg(not(feature = "std"))]
    cell: spin::Mutex<T>,
}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Self {
        #[cfg(feature = "std")]
        let cell = std::sync::Mutex::new(value);
        #[cfg(not(feature = "std"))]
        let cell = spin::Mutex::new(value);
        Self { cell }
    }

    /// Blocks until the lock is free.
    pub fn lock(&self) -> LinkGuard<'_, T> {
        #[cfg(feature = "std")]
        return self
            .cell
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        #[cfg(not(feature = "std"))]
        return self.cell.lock();
    }

    /// Takes the lock only if it is free. Usable from interrupt context.
    pub fn try_lock(&self) -> Option<LinkGuard<'_, T>> {
        #[cfg(feature = "std")]
        return match self.cell.try_lock() {
            Ok(guard) => Some(guard),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(std::sync::TryLockError::WouldBlock) => None,
        };
        #[cfg(not(feature = "std"))]
        return self.cell.try_lock();
    }
}

#[cfg(feature = "std")]
pub use wake::WakeSignal;

#[cfg(feature = "std")]
mod wake {
    use std::sync::{Condvar, Mutex, PoisonError};
    use std::time::Duration;

    use linktest_core::TickDuration;
    use linktest_hal::IrqNotifier;

    /// Capacity-one wake signal backed by a condition variable.
    #[derive(Debug, Default)]
    pub struct WakeSignal {
        pending: Mutex<bool>,
        cond: Condvar,
    }

    impl WakeSignal {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl IrqNotifier for WakeSignal {
        fn notify(&self) {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            *pending = true;
            self.cond.notify_one();
        }

        fn wait(&self, timeout: TickDuration) -> bool {
            let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            let (mut pending, _) = self
                .cond
                .wait_timeout_while(pending, Duration::from_micros(timeout.as_micros()), |p| !*p)
                .unwrap_or_else(PoisonError::into_inner);
            core::mem::take(&mut *pending)
        }
    }
}
