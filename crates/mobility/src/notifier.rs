use model::notification::RideNotificationKind;
use serde_json::Value;

/// Receives ride lifecycle events. Fire-and-forget: implementations must not
/// block and the caller never learns whether delivery succeeded.
pub trait NotificationEmitter: Send + Sync {
    fn emit(&self, kind: RideNotificationKind, payload: Value);
}

/// Only writes ride notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmitter;

impl NotificationEmitter for LogEmitter {
    fn emit(&self, kind: RideNotificationKind, payload: Value) {
        log::info!("ride notification {:?}: {}", kind, payload);
    }
}
