//! Radio transceiver capability

use core::ops::{BitOr, BitOrAssign};

use linktest_core::Modem;

use crate::error::HalResult;

/// Radio interrupt sources, using the SX126x IRQ register layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IrqMask(u16);

impl IrqMask {
    pub const NONE: Self = Self(0);
    pub const TX_DONE: Self = Self(1 << 0);
    pub const RX_DONE: Self = Self(1 << 1);
    pub const PREAMBLE_DETECTED: Self = Self(1 << 2);
    pub const SYNCWORD_VALID: Self = Self(1 << 3);
    pub const HEADER_VALID: Self = Self(1 << 4);
    pub const HEADER_ERROR: Self = Self(1 << 5);
    pub const CRC_ERROR: Self = Self(1 << 6);
    pub const CAD_DONE: Self = Self(1 << 7);
    pub const CAD_DETECTED: Self = Self(1 << 8);
    pub const RX_TX_TIMEOUT: Self = Self(1 << 9);
    pub const ALL: Self = Self(0x03FF);

    /// Interrupts a continuously receiving link-test node listens to.
    /// Preamble detection is left out to keep the interrupt load low.
    pub const LINKTEST: Self = Self(
        Self::HEADER_VALID.0
            | Self::SYNCWORD_VALID.0
            | Self::RX_DONE.0
            | Self::TX_DONE.0
            | Self::HEADER_ERROR.0
            | Self::CRC_ERROR.0,
    );

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: IrqMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for IrqMask {
    type Output = IrqMask;

    fn bitor(self, rhs: IrqMask) -> IrqMask {
        IrqMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for IrqMask {
    fn bitor_assign(&mut self, rhs: IrqMask) {
        self.0 |= rhs.0;
    }
}

/// Transmit configuration.
///
/// `datarate` is the spreading factor for LoRa and bits/s for FSK;
/// `bandwidth` is the LoRa bandwidth index or the FSK bandwidth in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxConfig {
    pub modem: Modem,
    pub power: i8,
    pub fdev: u32,
    pub bandwidth: u32,
    pub datarate: u32,
    pub coderate: u8,
    pub preamble_len: u16,
    pub fixed_len: bool,
    pub crc_on: bool,
    pub freq_hop_on: bool,
    pub hop_period: u8,
    pub iq_inverted: bool,
    pub timeout_ms: u32,
}

/// Receive configuration, mirroring [`TxConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxConfig {
    pub modem: Modem,
    pub bandwidth: u32,
    pub datarate: u32,
    pub coderate: u8,
    pub bandwidth_afc: u32,
    pub preamble_len: u16,
    pub symb_timeout: u16,
    pub fixed_len: bool,
    pub payload_len: u8,
    pub crc_on: bool,
    pub freq_hop_on: bool,
    pub hop_period: u8,
    pub iq_inverted: bool,
    pub rx_continuous: bool,
}

/// Receive request with its interrupt mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxArm {
    pub mask: IrqMask,
    /// Receive timeout in radio units, 0 for none.
    pub timeout: u32,
    pub preamble_irqs_disabled: bool,
    pub continuous: bool,
}

impl RxArm {
    /// Continuous receive with the link-test mask and preamble interrupts off.
    pub const fn continuous_linktest() -> Self {
        Self {
            mask: IrqMask::LINKTEST,
            timeout: 0,
            preamble_irqs_disabled: true,
            continuous: true,
        }
    }
}

/// Modulation parameters that determine the time-on-air of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirtimeParams {
    pub modem: Modem,
    pub bandwidth: u32,
    pub datarate: u32,
    pub coderate: u8,
    pub preamble_len: u16,
    pub fixed_len: bool,
    pub crc_on: bool,
}

/// Callbacks invoked from [`Radio::irq_process`].
pub trait RadioEvents {
    fn on_tx_done(&mut self) {}

    fn on_tx_timeout(&mut self) {}

    /// `payload.len()` is the received frame size.
    fn on_rx_done(&mut self, _payload: &[u8], _rssi: i16, _snr: i8, _crc_error: bool) {}

    fn on_rx_timeout(&mut self) {}

    fn on_rx_error(&mut self) {}

    fn on_cad_done(&mut self, _detected: bool) {}

    fn on_rx_sync(&mut self) {}
}

/// Transceiver driver.
///
/// Interrupt callbacks are delivered through the handler passed to
/// [`irq_process`](Radio::irq_process), so the driver never stores
/// references into the engine.
pub trait Radio {
    /// Brings the transceiver out of reset into standby.
    fn init(&mut self) -> HalResult<()>;

    fn standby(&mut self);

    fn set_channel(&mut self, frequency_hz: u32);

    fn set_tx_config(&mut self, config: &TxConfig);

    fn set_rx_config(&mut self, config: &RxConfig);

    /// Starts transmitting `payload`; completion is reported as `on_tx_done`.
    fn send(&mut self, payload: &[u8]) -> HalResult<()>;

    fn rx_boosted_with_mask(&mut self, arm: RxArm);

    /// Time-on-air of a `payload_len` byte frame in microseconds.
    fn time_on_air(&self, params: &AirtimeParams, payload_len: u8) -> u32;

    /// Services latched interrupts, invoking `events` for each of them.
    fn irq_process(&mut self, events: &mut dyn RadioEvents);

    /// Whether the transceiver is currently in receive mode.
    fn is_receiving(&self) -> bool;

    /// Level of the interrupt line.
    fn irq_pending(&self) -> bool;
}
