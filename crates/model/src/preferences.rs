use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// User settings. Every section and field has a default, so a stored document
/// missing newer fields still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub notifications: NotificationPreferences,
    pub privacy: PrivacyPreferences,
    pub accessibility: AccessibilityPreferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPreferences {
    pub push_enabled: bool,
    pub email_enabled: bool,
    pub riding_reminders: bool,
    pub promotions: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            push_enabled: true,
            email_enabled: true,
            riding_reminders: true,
            promotions: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacyPreferences {
    pub share_location: bool,
    pub share_ride_history: bool,
}

impl Default for PrivacyPreferences {
    fn default() -> Self {
        Self {
            share_location: true,
            share_ride_history: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessibilityPreferences {
    pub reduced_motion: bool,
    pub high_contrast: bool,
    pub font_size: FontSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_is_merged_over_defaults() {
        let stored = r#"{"privacy": {"shareRideHistory": true}, "accessibility": {"fontSize": "large"}}"#;
        let preferences: UserPreferences = serde_json::from_str(stored).unwrap();
        assert!(preferences.privacy.share_ride_history);
        assert!(preferences.privacy.share_location);
        assert_eq!(preferences.accessibility.font_size, FontSize::Large);
        assert_eq!(preferences.notifications, NotificationPreferences::default());
    }
}
