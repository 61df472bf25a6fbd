//! Fatal engine errors. All of them surface before the synchronization wait.

use core::fmt;

use linktest_core::PlanError;
use linktest_hal::HalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The test plan or its derived timing is invalid
    Plan(PlanError),
    /// A capability failed during initialization
    Hal(HalError),
    /// P2P mode was selected but no radio was provided
    MissingRadio,
    /// Flood mode was selected but no flood engine was provided
    MissingFlood,
}

impl From<PlanError> for EngineError {
    fn from(value: PlanError) -> Self {
        Self::Plan(value)
    }
}

impl From<HalError> for EngineError {
    fn from(value: HalError) -> Self {
        Self::Hal(value)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan(err) => write!(f, "invalid test plan: {err}"),
            Self::Hal(err) => write!(f, "capability failure: {err}"),
            Self::MissingRadio => write!(f, "p2p mode requires a radio"),
            Self::MissingFlood => write!(f, "flood mode requires a flood engine"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EngineError {}
