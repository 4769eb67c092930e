//! Local app services kept next to the tracker. Each one owns a few documents
//! in the [`PersistenceStore`].

use std::{marker::PhantomData, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::{
    store::{PersistenceStore, PersistenceStoreExt},
    MobilityResult,
};

pub mod favorites;
pub mod history;
pub mod notifications;
pub mod payments;
pub mod preferences;

/// A typed document stored under a fixed key. Missing documents read as
/// `T::default()`. Updates are serialized per handle, clones share the lock.
pub(crate) struct Document<T> {
    store: Arc<dyn PersistenceStore>,
    key: &'static str,
    lock: Arc<Mutex<()>>,
    _content: PhantomData<fn() -> T>,
}

impl<T> Clone for Document<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key,
            lock: self.lock.clone(),
            _content: PhantomData,
        }
    }
}

impl<T> Document<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    pub(crate) fn new(store: Arc<dyn PersistenceStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            lock: Arc::new(Mutex::new(())),
            _content: PhantomData,
        }
    }

    pub(crate) async fn read(&self) -> MobilityResult<T> {
        Ok(self.store.load(self.key).await?.unwrap_or_default())
    }

    /// Applies `change` and writes the result back. Nothing is written if
    /// `change` fails.
    pub(crate) async fn update<R, F>(&self, change: F) -> MobilityResult<R>
    where
        F: FnOnce(&mut T) -> MobilityResult<R> + Send,
        R: Send,
    {
        let _guard = self.lock.lock().await;
        let mut content = self.read().await?;
        let result = change(&mut content)?;
        self.store.save(self.key, &content).await?;
        Ok(result)
    }

    pub(crate) async fn replace(&self, content: &T) -> MobilityResult<()> {
        let _guard = self.lock.lock().await;
        self.store.save(self.key, content).await?;
        Ok(())
    }

    pub(crate) async fn clear(&self) -> MobilityResult<()> {
        let _guard = self.lock.lock().await;
        self.store.remove(self.key).await?;
        Ok(())
    }
}
