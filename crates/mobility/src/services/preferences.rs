use std::sync::Arc;

use model::preferences::UserPreferences;
use serde_json::Value;

use super::Document;
use crate::{
    store::{keys, PersistenceStore},
    MobilityError, MobilityResult,
};

/// Keys removed by [`Preferences::clear_all_data`]. The active ride is left
/// alone, it belongs to the tracker.
const USER_DATA_KEYS: &[&str] = &[
    keys::USER_PREFERENCES,
    keys::FAVORITE_LOCATIONS,
    keys::RECENT_LOCATIONS,
    keys::RIDE_HISTORY,
    keys::NOTIFICATIONS,
    keys::NOTIFICATION_SETTINGS,
    keys::PAYMENT_METHODS,
];

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PersistenceStore>,
    preferences: Document<UserPreferences>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            preferences: Document::new(store.clone(), keys::USER_PREFERENCES),
            store,
        }
    }

    /// Stored preferences. Fields missing from the stored document take their
    /// default values.
    pub async fn get(&self) -> MobilityResult<UserPreferences> {
        self.preferences.read().await
    }

    pub async fn save(&self, preferences: &UserPreferences) -> MobilityResult<()> {
        self.preferences.replace(preferences).await
    }

    pub async fn update<F>(&self, change: F) -> MobilityResult<UserPreferences>
    where
        F: FnOnce(&mut UserPreferences) + Send,
    {
        self.preferences
            .update(|preferences| {
                change(preferences);
                Ok(preferences.clone())
            })
            .await
    }

    /// Merges a partial document, e.g. `{"privacy": {"shareLocation": false}}`,
    /// into the stored preferences.
    pub async fn merge(&self, patch: Value) -> MobilityResult<UserPreferences> {
        self.preferences
            .update(|preferences| {
                let mut merged = serde_json::to_value(&*preferences).map_err(MobilityError::other)?;
                merge_json(&mut merged, patch);
                *preferences = serde_json::from_value(merged)
                    .map_err(|why| MobilityError::invalid_input(why.to_string()))?;
                Ok(preferences.clone())
            })
            .await
    }

    pub async fn clear_all_data(&self) -> MobilityResult<()> {
        for key in USER_DATA_KEYS {
            self.store.remove(key).await?;
        }
        log::info!("Cleared all stored user data");
        Ok(())
    }
}

/// Objects are merged key by key, anything else in `patch` replaces the
/// value in `target`.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use model::preferences::FontSize;
    use serde_json::json;

    use super::*;
    use crate::store::{MemoryStore, PersistenceStoreExt};

    #[tokio::test]
    async fn missing_document_reads_as_defaults() {
        let preferences = Preferences::new(Arc::new(MemoryStore::new()));
        assert_eq!(preferences.get().await.unwrap(), UserPreferences::default());
    }

    #[tokio::test]
    async fn stored_sections_are_merged_over_defaults() {
        let store = Arc::new(MemoryStore::new());
        store
            .save(
                keys::USER_PREFERENCES,
                &json!({ "notifications": { "promotions": true } }),
            )
            .await
            .unwrap();

        let preferences = Preferences::new(store).get().await.unwrap();
        assert!(preferences.notifications.promotions);
        assert!(preferences.notifications.push_enabled);
        assert_eq!(preferences.accessibility.font_size, FontSize::Medium);
    }

    #[tokio::test]
    async fn update_changes_one_section() {
        let preferences = Preferences::new(Arc::new(MemoryStore::new()));
        let updated = preferences
            .update(|preferences| preferences.accessibility.font_size = FontSize::Large)
            .await
            .unwrap();
        assert_eq!(updated.accessibility.font_size, FontSize::Large);
        assert_eq!(preferences.get().await.unwrap(), updated);
    }

    #[tokio::test]
    async fn merge_keeps_untouched_fields() {
        let preferences = Preferences::new(Arc::new(MemoryStore::new()));
        let merged = preferences
            .merge(json!({ "privacy": { "shareRideHistory": true } }))
            .await
            .unwrap();
        assert!(merged.privacy.share_ride_history);
        assert!(merged.privacy.share_location);
        assert_eq!(preferences.get().await.unwrap(), merged);
    }

    #[tokio::test]
    async fn malformed_merge_is_rejected_and_not_stored() {
        let preferences = Preferences::new(Arc::new(MemoryStore::new()));
        let result = preferences
            .merge(json!({ "accessibility": { "fontSize": "huge" } }))
            .await;
        assert!(matches!(result, Err(MobilityError::InvalidInput(_))));
        assert_eq!(preferences.get().await.unwrap(), UserPreferences::default());
    }

    #[tokio::test]
    async fn clear_all_data_keeps_the_active_ride() {
        let store = Arc::new(MemoryStore::new());
        for key in USER_DATA_KEYS {
            store.save(key, &json!([])).await.unwrap();
        }
        store.save(keys::ACTIVE_RIDE, &json!({})).await.unwrap();

        Preferences::new(store.clone()).clear_all_data().await.unwrap();

        for key in USER_DATA_KEYS {
            assert_eq!(store.get(key).await.unwrap(), None);
        }
        assert!(store.get(keys::ACTIVE_RIDE).await.unwrap().is_some());
    }
}
