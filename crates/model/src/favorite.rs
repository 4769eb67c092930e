use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{location::Coordinates, Mergable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum FavoriteKind {
    Home,
    Work,
    Custom,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteLocation {
    pub id: Id<FavoriteLocation>,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: FavoriteKind,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl HasId for FavoriteLocation {
    type IdType = String;
}

impl FavoriteLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// A favorite as submitted by the user, before it gets an id and timestamps.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewFavorite {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: FavoriteKind,
    pub icon: Option<String>,
}

/// Partial update of a favorite. Absent fields are left untouched.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub kind: Option<FavoriteKind>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentLocation {
    pub id: Id<RecentLocation>,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub frequency: u32,
}

impl HasId for RecentLocation {
    type IdType = String;
}

impl Mergable for RecentLocation {
    /// A revisit of the same place: keeps the id, takes the newer name,
    /// address and timestamp and counts the visit.
    fn merge(self, other: Self) -> Self {
        Self {
            id: self.id,
            name: other.name,
            address: other.address,
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: other.timestamp,
            frequency: self.frequency + other.frequency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewRecentLocation {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Either kind of saved place, as returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SavedLocation {
    Favorite(FavoriteLocation),
    Recent(RecentLocation),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesByKind {
    pub home: usize,
    pub work: usize,
    pub custom: usize,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatistics {
    pub total_favorites: usize,
    pub favorites_by_kind: FavoritesByKind,
    pub total_recent_locations: usize,
    pub most_frequent_location: Option<RecentLocation>,
}

/// Exported favorites and recents. On import, absent lists are left as they
/// are.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesBackup {
    pub favorites: Option<Vec<FavoriteLocation>>,
    pub recent_locations: Option<Vec<RecentLocation>>,
    pub export_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent(name: &str, frequency: u32, timestamp: DateTime<Utc>) -> RecentLocation {
        RecentLocation {
            id: Id::new(format!("recent-{name}")),
            name: name.to_owned(),
            address: format!("{name} street"),
            latitude: 37.0,
            longitude: -122.0,
            timestamp,
            frequency,
        }
    }

    #[test]
    fn merging_a_revisit_counts_it_and_keeps_the_id() {
        let earlier = DateTime::<Utc>::from_timestamp(1_000, 0).unwrap();
        let later = DateTime::<Utc>::from_timestamp(2_000, 0).unwrap();
        let merged = recent("cafe", 2, earlier).merge(recent("coffee", 1, later));
        assert_eq!(merged.id.raw(), "recent-cafe");
        assert_eq!(merged.name, "coffee");
        assert_eq!(merged.frequency, 3);
        assert_eq!(merged.timestamp, later);
    }
}
