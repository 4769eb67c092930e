use std::{env, error::Error};

use async_trait::async_trait;
use mobility::store::{PersistenceStore, Result};
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub mod data_model;
pub mod queries;

const DEFAULT_DATABASE_URL: &str = "sqlite://scooter.db?mode=rwc";

pub struct StorageConnectionInfo {
    pub url: String,
    pub max_connections: u32,
}

impl StorageConnectionInfo {
    pub fn from_env() -> Self {
        let url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(5);
        Self {
            url,
            max_connections,
        }
    }
}

/// [`PersistenceStore`] backed by a single `documents` table in SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    connection: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(
        connection_info: StorageConnectionInfo,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let pool = SqlitePoolOptions::new()
            .max_connections(connection_info.max_connections)
            .connect(&connection_info.url)
            .await?;
        log::info!("Connected to {}", connection_info.url);
        Self::from_pool(pool).await
    }

    /// Runs the migrations on an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> std::result::Result<Self, Box<dyn Error>> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { connection: pool })
    }
}

#[async_trait]
impl PersistenceStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        queries::document::get(&self.connection, key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        queries::document::put(&self.connection, key, &value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        queries::document::delete(&self.connection, key).await
    }
}

#[cfg(test)]
mod tests {
    use mobility::store::{keys, PersistenceStoreExt, StoreError};
    use serde_json::json;

    use super::*;

    async fn store() -> SqliteStore {
        // A single connection, every new in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteStore::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = store().await;
        assert_eq!(store.get(keys::ACTIVE_RIDE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_previous_document() {
        let store = store().await;
        store
            .set(keys::RIDE_HISTORY, json!([{ "id": "a" }]))
            .await
            .unwrap();
        store
            .set(keys::RIDE_HISTORY, json!([{ "id": "b" }]))
            .await
            .unwrap();
        assert_eq!(
            store.get(keys::RIDE_HISTORY).await.unwrap(),
            Some(json!([{ "id": "b" }]))
        );
    }

    #[tokio::test]
    async fn remove_deletes_the_document() {
        let store = store().await;
        store.set(keys::ACTIVE_RIDE, json!({})).await.unwrap();
        store.remove(keys::ACTIVE_RIDE).await.unwrap();
        store.remove(keys::ACTIVE_RIDE).await.unwrap();
        assert_eq!(store.get(keys::ACTIVE_RIDE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn typed_documents_round_trip() {
        let store = store().await;
        store
            .save(keys::USER_PREFERENCES, &vec![1.5, 2.5])
            .await
            .unwrap();
        let loaded: Option<Vec<f64>> = store.load(keys::USER_PREFERENCES).await.unwrap();
        assert_eq!(loaded, Some(vec![1.5, 2.5]));
    }

    #[tokio::test]
    async fn mismatched_document_is_a_serialization_error() {
        let store = store().await;
        store.set(keys::PAYMENT_METHODS, json!("text")).await.unwrap();
        let loaded: mobility::store::Result<Option<Vec<f64>>> =
            store.load(keys::PAYMENT_METHODS).await;
        assert!(matches!(loaded, Err(StoreError::Serialization(_))));
    }
}
