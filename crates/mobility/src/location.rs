use std::{
    error, fmt,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use model::location::LocationSample;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

const SUBSCRIPTION_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    PermissionDenied,
    /// No fix could be obtained. Transient.
    Unavailable(String),
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::Unavailable(why) => write!(f, "location unavailable: {}", why),
        }
    }
}

impl error::Error for LocationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    Granted,
    Denied,
}

/// A source of position fixes.
///
/// Samples arrive at a provider-determined cadence. A subscription ends when
/// the returned receiver is dropped.
#[async_trait]
pub trait LocationFeed: Send + Sync {
    async fn request_permission(&self) -> Permission;
    async fn current_position(&self) -> Result<LocationSample, LocationError>;
    async fn subscribe(&self) -> Result<mpsc::Receiver<LocationSample>, LocationError>;
}

#[derive(Debug)]
struct PushFeedState {
    permission: Permission,
    last: Option<LocationSample>,
    subscribers: Vec<mpsc::Sender<LocationSample>>,
}

/// A feed driven from the outside: every pushed sample becomes the current
/// position and is fanned out to all live subscriptions.
///
/// The HTTP API forwards device positions through it, and tests use it as a
/// fake.
#[derive(Debug)]
pub struct PushLocationFeed {
    state: Mutex<PushFeedState>,
}

impl Default for PushLocationFeed {
    fn default() -> Self {
        Self::new(Permission::Granted)
    }
}

impl PushLocationFeed {
    pub fn new(permission: Permission) -> Self {
        Self {
            state: Mutex::new(PushFeedState {
                permission,
                last: None,
                subscribers: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PushFeedState> {
        // the state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_permission(&self, permission: Permission) {
        let mut state = self.state();
        state.permission = permission;
        if permission == Permission::Denied {
            state.subscribers.clear();
        }
    }

    pub fn permission(&self) -> Permission {
        self.state().permission
    }

    /// Publishes a sample. Returns the number of subscriptions it reached.
    pub fn push(&self, sample: LocationSample) -> usize {
        let mut state = self.state();
        state.last = Some(sample.clone());
        state.subscribers.retain(|subscriber| !subscriber.is_closed());
        let mut delivered = 0;
        for subscriber in &state.subscribers {
            match subscriber.try_send(sample.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("location subscriber is lagging, sample dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|subscriber| !subscriber.is_closed());
        state.subscribers.len()
    }
}

#[async_trait]
impl LocationFeed for PushLocationFeed {
    async fn request_permission(&self) -> Permission {
        self.permission()
    }

    async fn current_position(&self) -> Result<LocationSample, LocationError> {
        let state = self.state();
        if state.permission == Permission::Denied {
            return Err(LocationError::PermissionDenied);
        }
        state
            .last
            .clone()
            .ok_or_else(|| LocationError::Unavailable("no fix received yet".to_owned()))
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<LocationSample>, LocationError> {
        let mut state = self.state();
        if state.permission == Permission::Denied {
            return Err(LocationError::PermissionDenied);
        }
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        state.subscribers.push(tx);
        Ok(rx)
    }
}
