//! Synchronization line and capture pins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use linktest_core::Tick;
use linktest_hal::{HalError, Level, SignalPin, SyncInput, TimeAuthority};

use crate::clock::StdClock;
use crate::medium::lock;

/// Start line shared by every node of a simulated testbed.
#[derive(Debug, Clone, Default)]
pub struct SyncLine {
    released: Arc<AtomicBool>,
}

impl SyncLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Input end for one node.
    pub fn input(&self) -> SyncLineInput {
        SyncLineInput {
            released: Arc::clone(&self.released),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncLineInput {
    released: Arc<AtomicBool>,
}

impl SyncInput for SyncLineInput {
    fn poll(&mut self) -> nb::Result<(), HalError> {
        if self.released.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

/// Output pin that records the tick of every rising edge.
#[derive(Debug, Clone)]
pub struct SimPin {
    clock: StdClock,
    level: Level,
    edges: Arc<Mutex<Vec<Tick>>>,
}

impl SimPin {
    pub fn new(clock: StdClock) -> Self {
        Self {
            clock,
            level: Level::Low,
            edges: Arc::default(),
        }
    }

    pub fn rising_edges(&self) -> Vec<Tick> {
        lock(&self.edges).clone()
    }
}

impl SignalPin for SimPin {
    fn set(&mut self, level: Level) {
        if self.level == Level::Low && level == Level::High {
            lock(&self.edges).push(self.clock.now());
        }
        self.level = level;
    }
}
