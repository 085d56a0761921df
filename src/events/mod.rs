//! Decoupled "SMS received" notifications
//!
//! Fire-and-forget: any number of listeners (including none) may observe an
//! event; a slow listener lags and skips rather than blocking the webhook.

use tokio::sync::broadcast;

use crate::models::SmsReceived;

pub const SMS_RECEIVED_EVENT: &str = "simbase_sms_received";

/// If a listener falls behind by more than this many events it receives
/// `RecvError::Lagged` and resumes at the newest one.
const EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SmsReceived>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish to every current listener; returns how many received it.
    pub fn fire(&self, event: SmsReceived) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                tracing::debug!("[Events] {} fired with no listeners", SMS_RECEIVED_EVENT);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SmsReceived> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
