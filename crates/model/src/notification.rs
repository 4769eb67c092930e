use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utility::id::{HasId, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Ride,
    Promotion,
    Maintenance,
    General,
}

/// Ride lifecycle events the tracker reports to the notification subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RideNotificationKind {
    Started,
    Paused,
    Resumed,
    Ended,
    LowBattery,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Id<Notification>,
    pub title: String,
    pub body: String,
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub kind: NotificationKind,
}

impl HasId for Notification {
    type IdType = String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub ride_updates: bool,
    pub promotions: bool,
    pub maintenance: bool,
    pub general: bool,
    pub push_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            ride_updates: true,
            promotions: true,
            maintenance: true,
            general: true,
            push_enabled: true,
        }
    }
}

impl NotificationSettings {
    /// Whether a notification of the given kind may be delivered.
    pub fn allows(&self, kind: NotificationKind) -> bool {
        self.push_enabled
            && match kind {
                NotificationKind::Ride => self.ride_updates,
                NotificationKind::Promotion => self.promotions,
                NotificationKind::Maintenance => self.maintenance,
                NotificationKind::General => self.general,
            }
    }

    pub fn apply(&mut self, update: &NotificationSettingsUpdate) {
        if let Some(value) = update.ride_updates {
            self.ride_updates = value;
        }
        if let Some(value) = update.promotions {
            self.promotions = value;
        }
        if let Some(value) = update.maintenance {
            self.maintenance = value;
        }
        if let Some(value) = update.general {
            self.general = value;
        }
        if let Some(value) = update.push_enabled {
            self.push_enabled = value;
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingsUpdate {
    pub ride_updates: Option<bool>,
    pub promotions: Option<bool>,
    pub maintenance: Option<bool>,
    pub general: Option<bool>,
    pub push_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_disabled_blocks_everything() {
        let settings = NotificationSettings {
            push_enabled: false,
            ..Default::default()
        };
        assert!(!settings.allows(NotificationKind::Ride));
        assert!(!settings.allows(NotificationKind::General));
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut settings = NotificationSettings::default();
        settings.apply(&NotificationSettingsUpdate {
            promotions: Some(false),
            ..Default::default()
        });
        assert!(!settings.allows(NotificationKind::Promotion));
        assert!(settings.allows(NotificationKind::Ride));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: NotificationSettings =
            serde_json::from_str(r#"{"promotions": false}"#).unwrap();
        assert!(!settings.promotions);
        assert!(settings.ride_updates);
        assert!(settings.push_enabled);
    }
}
