//! Exclusive radio ownership shared by the scheduler and the interrupt relay.
//!
//! Every radio command goes through [`RadioLink::with`]. Interrupt processing
//! needs the same lock; an interrupt that finds the radio busy is latched and
//! serviced by whoever releases it, so driver calls never interleave.

use core::sync::atomic::{AtomicBool, Ordering};

use linktest_core::{LogEvent, Message, RadioWarningKind, RxDoneRecord};
use linktest_hal::{Radio, RadioEvents, RxArm};

use crate::sync::Mutex;
use crate::trace::Emitter;

/// The radio plus the receive request it was last armed with.
pub struct RadioCell<R> {
    radio: R,
    rx_expected: Option<RxArm>,
}

impl<R: Radio> RadioCell<R> {
    pub fn radio(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Enters receive and remembers the request so the watchdog can re-arm it.
    pub fn arm_rx(&mut self, arm: RxArm) {
        self.radio.rx_boosted_with_mask(arm);
        self.rx_expected = Some(arm);
    }

    /// Returns to standby; reception is no longer expected.
    pub fn standby(&mut self) {
        self.radio.standby();
        self.rx_expected = None;
    }

    pub fn rx_expected(&self) -> Option<RxArm> {
        self.rx_expected
    }
}

/// Completion counts of one interrupt processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IrqOutcome {
    pub tx_done: u16,
    pub rx_done: u16,
    pub rx_errors: u16,
}

impl IrqOutcome {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    /// No reception is expected right now.
    Idle,
    Healthy,
    /// The radio had left receive mode and was re-armed.
    Rearmed { missed_irq: bool },
}

pub struct RadioLink<R> {
    cell: Mutex<RadioCell<R>>,
    latched: AtomicBool,
    emitter: Emitter,
}

impl<R: Radio> RadioLink<R> {
    pub fn new(radio: R, emitter: Emitter) -> Self {
        Self {
            cell: Mutex::new(RadioCell {
                radio,
                rx_expected: None,
            }),
            latched: AtomicBool::new(false),
            emitter,
        }
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Runs `f` with exclusive access to the radio. An interrupt latched while
    /// the radio was held is serviced before returning.
    pub fn with<T>(&self, f: impl FnOnce(&mut RadioCell<R>) -> T) -> T {
        let out = {
            let mut cell = self.cell.lock();
            f(&mut cell)
        };
        self.drain_latch();
        out
    }

    /// Processes pending interrupts if the radio is free, otherwise latches
    /// them for the current holder. Never blocks.
    pub fn process_or_latch(&self) -> Option<IrqOutcome> {
        let outcome = match self.cell.try_lock() {
            Some(mut cell) => Some(self.process_locked(&mut cell)),
            None => {
                self.latched.store(true, Ordering::Release);
                None
            }
        };
        // The holder may have released the radio before the latch was set.
        let serviced = self.drain_latch();
        outcome.or(serviced)
    }

    /// Runs the driver's interrupt processing with the link-test callbacks.
    pub fn process(&self) -> IrqOutcome {
        let outcome = {
            let mut cell = self.cell.lock();
            self.process_locked(&mut cell)
        };
        self.drain_latch();
        outcome
    }

    /// Services a latched interrupt while the radio is free. Every release of
    /// the radio and every latch goes through here, so a latch is never left
    /// set once all contexts are idle. Never blocks.
    fn drain_latch(&self) -> Option<IrqOutcome> {
        let mut serviced = None;
        while self.latched.load(Ordering::Acquire) {
            let Some(mut cell) = self.cell.try_lock() else {
                break;
            };
            if self.latched.swap(false, Ordering::AcqRel) {
                log::trace!("servicing latched radio interrupt");
                serviced = Some(self.process_locked(&mut cell));
            }
        }
        serviced
    }

    fn process_locked(&self, cell: &mut RadioCell<R>) -> IrqOutcome {
        let mut events = LinktestEvents {
            emitter: &self.emitter,
            outcome: IrqOutcome::default(),
        };
        cell.radio.irq_process(&mut events);
        events.outcome
    }

    /// Verifies that a radio expected to be receiving still is. A radio that
    /// dropped out is reported, any interrupt left pending is processed, and
    /// reception is re-armed with the last request.
    pub fn check_receiving(&self) -> WatchdogAction {
        let action = {
            let mut cell = self.cell.lock();
            self.check_locked(&mut cell)
        };
        self.drain_latch();
        action
    }

    fn check_locked(&self, cell: &mut RadioCell<R>) -> WatchdogAction {
        let Some(arm) = cell.rx_expected else {
            return WatchdogAction::Idle;
        };
        if cell.radio.is_receiving() {
            return WatchdogAction::Healthy;
        }

        log::warn!("radio left receive mode, re-arming");
        self.emitter
            .emit(LogEvent::radio_warning(RadioWarningKind::LeftReceive));

        let missed_irq = cell.radio.irq_pending();
        if missed_irq {
            log::warn!("radio interrupt pending but not processed");
            self.emitter
                .emit(LogEvent::radio_warning(RadioWarningKind::MissedIrq));
            self.process_locked(cell);
        }

        cell.arm_rx(arm);
        WatchdogAction::Rearmed { missed_irq }
    }
}

/// Turns driver callbacks into log records.
struct LinktestEvents<'a> {
    emitter: &'a Emitter,
    outcome: IrqOutcome,
}

impl RadioEvents for LinktestEvents<'_> {
    fn on_tx_done(&mut self) {
        self.outcome.tx_done = self.outcome.tx_done.saturating_add(1);
        self.emitter.emit(LogEvent::TxDone);
    }

    fn on_rx_done(&mut self, payload: &[u8], rssi: i16, snr: i8, crc_error: bool) {
        self.outcome.rx_done = self.outcome.rx_done.saturating_add(1);
        let message = Message::from_received(payload);
        self.emitter.emit(LogEvent::RxDone(RxDoneRecord {
            key: message.key,
            size: u16::try_from(payload.len()).unwrap_or(u16::MAX),
            counter: message.counter,
            rssi,
            snr,
            crc_error,
        }));
    }

    fn on_rx_error(&mut self) {
        self.outcome.rx_errors = self.outcome.rx_errors.saturating_add(1);
        log::debug!("radio reported a receive error");
    }

    fn on_tx_timeout(&mut self) {
        log::warn!("radio transmit timeout");
    }
}
