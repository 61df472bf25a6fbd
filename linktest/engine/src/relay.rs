//! Radio interrupt relays.
//!
//! [`DirectRelay`] services the radio from the interrupt itself and latches
//! the interrupt when the radio is busy. [`DeferredRelay`] only raises a wake
//! signal and leaves processing, plus the receive watchdog, to a dedicated
//! context.

use core::sync::atomic::{AtomicBool, Ordering};

use linktest_core::TickDuration;
use linktest_hal::{IrqNotifier, Radio};

use crate::link::{IrqOutcome, RadioLink, WatchdogAction};
use crate::sync::Arc;

/// Longest the processing context sleeps without a notification.
pub const PROCESS_WAIT: TickDuration = TickDuration::from_millis(100);

pub struct DirectRelay<R> {
    link: Arc<RadioLink<R>>,
}

impl<R: Radio> DirectRelay<R> {
    pub fn new(link: Arc<RadioLink<R>>) -> Self {
        Self { link }
    }

    /// Interrupt entry point. Returns `None` when the interrupt was latched.
    pub fn on_irq(&self) -> Option<IrqOutcome> {
        self.link.process_or_latch()
    }

    /// Closure suitable for registering as the radio's interrupt handler.
    pub fn irq_line(&self) -> impl Fn() + Send + Sync + 'static
    where
        R: Send + 'static,
    {
        let link = Arc::clone(&self.link);
        move || {
            link.process_or_latch();
        }
    }
}

/// What one pass of the processing context did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceReport {
    /// `false` when the pass ran because the wait timed out.
    pub woken: bool,
    pub outcome: IrqOutcome,
    pub watchdog: Option<WatchdogAction>,
}

pub struct DeferredRelay<R, N> {
    link: Arc<RadioLink<R>>,
    notifier: Arc<N>,
    watchdog: bool,
}

impl<R: Radio, N: IrqNotifier> DeferredRelay<R, N> {
    pub fn new(link: Arc<RadioLink<R>>, notifier: Arc<N>) -> Self {
        Self {
            link,
            notifier,
            watchdog: true,
        }
    }

    /// Disables the post-reception receive check.
    pub fn without_watchdog(mut self) -> Self {
        self.watchdog = false;
        self
    }

    /// Interrupt entry point: wakes the processing context and nothing else.
    pub fn on_irq(&self) {
        self.notifier.notify();
    }

    pub fn irq_line(&self) -> impl Fn() + Send + Sync + 'static
    where
        N: 'static,
    {
        let notifier = Arc::clone(&self.notifier);
        move || notifier.notify()
    }

    /// Waits for a notification (or [`PROCESS_WAIT`]), processes the radio
    /// and, after a completed reception, checks that it is still receiving.
    pub fn service(&self) -> ServiceReport {
        let woken = self.notifier.wait(PROCESS_WAIT);
        let outcome = self.link.process();
        let watchdog = (self.watchdog && outcome.rx_done > 0).then(|| self.link.check_receiving());
        if let Some(action @ WatchdogAction::Rearmed { .. }) = watchdog {
            log::debug!("receive watchdog: {action:?}");
        }
        ServiceReport {
            woken,
            outcome,
            watchdog,
        }
    }

    pub fn run(&self) -> ! {
        loop {
            self.service();
        }
    }

    /// Services until `stop` is raised.
    pub fn run_until(&self, stop: &AtomicBool) {
        while !stop.load(Ordering::Acquire) {
            self.service();
        }
    }
}
