use std::{error::Error, fmt};

use location::LocationError;
use session::InvalidTransition;
use store::StoreError;

pub mod config;
pub mod geofence;
pub mod location;
pub mod notifier;
pub mod services;
pub mod session;
pub mod store;
pub mod tracker;

#[derive(Debug)]
pub enum MobilityError {
    /// The ride state machine was driven the wrong way. Not retried.
    InvalidTransition(InvalidTransition),
    /// Location access was refused. The caller may ask the user and retry.
    PermissionDenied,
    LocationUnavailable(String),
    Persistence(StoreError),
    NotFound,
    InvalidInput(String),
    /// The tracker or another service actor is no longer running.
    Unavailable(String),
    Other(Box<dyn Error + Send + Sync>),
}

impl MobilityError {
    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }

    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Maps a failed `tell`/`ask` on a service actor.
    pub fn unavailable<E: fmt::Display>(why: E) -> Self {
        Self::Unavailable(why.to_string())
    }
}

impl fmt::Display for MobilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition(why) => write!(f, "{}", why),
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::LocationUnavailable(why) => write!(f, "location unavailable: {}", why),
            Self::Persistence(why) => write!(f, "persistence failure: {}", why),
            Self::NotFound => write!(f, "not found"),
            Self::InvalidInput(why) => write!(f, "invalid input: {}", why),
            Self::Unavailable(why) => write!(f, "service unavailable: {}", why),
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

impl Error for MobilityError {}

impl From<InvalidTransition> for MobilityError {
    fn from(value: InvalidTransition) -> Self {
        Self::InvalidTransition(value)
    }
}

impl From<StoreError> for MobilityError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value)
    }
}

impl From<LocationError> for MobilityError {
    fn from(value: LocationError) -> Self {
        match value {
            LocationError::PermissionDenied => Self::PermissionDenied,
            LocationError::Unavailable(why) => Self::LocationUnavailable(why),
        }
    }
}

pub type MobilityResult<O> = Result<O, MobilityError>;
