use std::{collections::HashMap, error, fmt, result, sync::RwLock};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Keys of the documents kept in the store.
pub mod keys {
    pub const ACTIVE_RIDE: &str = "active_ride";
    pub const RIDE_HISTORY: &str = "ride_history";
    pub const FAVORITE_LOCATIONS: &str = "favorite_locations";
    pub const RECENT_LOCATIONS: &str = "recent_locations";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const NOTIFICATION_SETTINGS: &str = "notification_settings";
    pub const USER_PREFERENCES: &str = "user_preferences";
    pub const PAYMENT_METHODS: &str = "payment_methods";
}

#[derive(Debug)]
pub enum StoreError {
    /// A stored document does not have the expected shape.
    Serialization(serde_json::Error),
    Other(Box<dyn error::Error + Send + Sync>),
}

impl StoreError {
    pub fn other<T: error::Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization(why) => write!(f, "malformed document: {}", why),
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

impl error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

pub type Result<T> = result::Result<T, StoreError>;

/// Key-value storage of opaque JSON documents.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Typed access on top of any [`PersistenceStore`].
#[async_trait]
pub trait PersistenceStoreExt: PersistenceStore {
    async fn load<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        self.set(key, value).await
    }
}

impl<S: PersistenceStore + ?Sized> PersistenceStoreExt for S {}

/// Process-local store, used in tests and when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Other("memory store lock poisoned".into())
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let documents = self.documents.read().map_err(Self::poisoned)?;
        Ok(documents.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut documents = self.documents.write().map_err(Self::poisoned)?;
        documents.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut documents = self.documents.write().map_err(Self::poisoned)?;
        documents.remove(key);
        Ok(())
    }
}
