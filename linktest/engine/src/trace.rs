#[cfg(feature = "trace")]
pub use linktest_trace::{EventHook, TraceError};

#[cfg(not(feature = "trace"))]
use crate::sync::Arc;

#[cfg(not(feature = "trace"))]
pub type TraceError = core::convert::Infallible;

#[cfg(not(feature = "trace"))]
pub type EventHook =
    Arc<dyn Fn(&linktest_core::LogEvent) -> Result<(), TraceError> + Send + Sync>;

use linktest_core::LogEvent;

/// Hands records to the configured sink. Sink failures are logged and
/// swallowed so they never interrupt the schedule.
#[derive(Clone, Default)]
pub struct Emitter {
    hook: Option<EventHook>,
}

impl Emitter {
    pub fn new(hook: EventHook) -> Self {
        Self { hook: Some(hook) }
    }

    /// Emitter that drops every record.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: LogEvent) {
        if let Some(hook) = &self.hook {
            if let Err(err) = hook(&event) {
                log::error!("dropping {} record: {err}", event.name());
            }
        }
    }
}
