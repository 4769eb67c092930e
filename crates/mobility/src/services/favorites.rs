use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDateTime, Timelike, Utc, Weekday};
use model::{
    favorite::{
        FavoriteKind, FavoriteLocation, FavoriteStatistics, FavoriteUpdate, FavoritesBackup,
        FavoritesByKind, NewFavorite, NewRecentLocation, RecentLocation, SavedLocation,
    },
    Mergable, WithDistance,
};
use utility::{geo, id::Id};

use super::Document;
use crate::{
    geofence::validate_coordinate,
    store::{keys, PersistenceStore},
    MobilityError, MobilityResult,
};

/// Degrees within which two places count as the same.
pub const SAME_PLACE_TOLERANCE: f64 = 0.001;

const MAX_RECENT_LOCATIONS: usize = 20;
const FREQUENT_AFTER_VISITS: u32 = 3;
const FALLBACK_SUGGESTIONS: usize = 3;

fn same_place(a: (f64, f64), b: (f64, f64), tolerance: f64) -> bool {
    (a.0 - b.0).abs() < tolerance && (a.1 - b.1).abs() < tolerance
}

fn matches_query(name: &str, address: &str, query: &str) -> bool {
    name.to_lowercase().contains(query) || address.to_lowercase().contains(query)
}

#[derive(Clone)]
pub struct Favorites {
    favorites: Document<Vec<FavoriteLocation>>,
    recents: Document<Vec<RecentLocation>>,
}

impl Favorites {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            favorites: Document::new(store.clone(), keys::FAVORITE_LOCATIONS),
            recents: Document::new(store, keys::RECENT_LOCATIONS),
        }
    }

    pub async fn add(&self, favorite: NewFavorite) -> MobilityResult<FavoriteLocation> {
        validate_coordinate(favorite.latitude, favorite.longitude)
            .map_err(|why| MobilityError::invalid_input(why.to_string()))?;
        let now = Utc::now();
        let favorite = FavoriteLocation {
            id: Id::generate(),
            name: favorite.name,
            address: favorite.address,
            latitude: favorite.latitude,
            longitude: favorite.longitude,
            kind: favorite.kind,
            icon: favorite.icon,
            created_at: now,
            last_used: now,
        };
        self.favorites
            .update(|favorites| {
                favorites.push(favorite.clone());
                Ok(favorite)
            })
            .await
    }

    pub async fn remove(&self, id: &Id<FavoriteLocation>) -> MobilityResult<()> {
        self.favorites
            .update(|favorites| {
                let before = favorites.len();
                favorites.retain(|favorite| &favorite.id != id);
                if favorites.len() == before {
                    Err(MobilityError::NotFound)
                } else {
                    Ok(())
                }
            })
            .await
    }

    pub async fn update(
        &self,
        id: &Id<FavoriteLocation>,
        update: FavoriteUpdate,
    ) -> MobilityResult<FavoriteLocation> {
        self.favorites
            .update(|favorites| {
                let favorite = favorites
                    .iter_mut()
                    .find(|favorite| &favorite.id == id)
                    .ok_or(MobilityError::NotFound)?;
                let latitude = update.latitude.unwrap_or(favorite.latitude);
                let longitude = update.longitude.unwrap_or(favorite.longitude);
                validate_coordinate(latitude, longitude)
                    .map_err(|why| MobilityError::invalid_input(why.to_string()))?;
                favorite.latitude = latitude;
                favorite.longitude = longitude;
                if let Some(name) = update.name {
                    favorite.name = name;
                }
                if let Some(address) = update.address {
                    favorite.address = address;
                }
                if let Some(kind) = update.kind {
                    favorite.kind = kind;
                }
                if update.icon.is_some() {
                    favorite.icon = update.icon;
                }
                Ok(favorite.clone())
            })
            .await
    }

    pub async fn mark_used(&self, id: &Id<FavoriteLocation>) -> MobilityResult<FavoriteLocation> {
        self.favorites
            .update(|favorites| {
                let favorite = favorites
                    .iter_mut()
                    .find(|favorite| &favorite.id == id)
                    .ok_or(MobilityError::NotFound)?;
                favorite.last_used = Utc::now();
                Ok(favorite.clone())
            })
            .await
    }

    /// Most recently used first.
    pub async fn list(&self) -> MobilityResult<Vec<FavoriteLocation>> {
        let mut favorites = self.favorites.read().await?;
        favorites.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        Ok(favorites)
    }

    pub async fn by_kind(&self, kind: FavoriteKind) -> MobilityResult<Vec<FavoriteLocation>> {
        let mut favorites = self.favorites.read().await?;
        favorites.retain(|favorite| favorite.kind == kind);
        Ok(favorites)
    }

    pub async fn is_favorite(
        &self,
        latitude: f64,
        longitude: f64,
        tolerance: Option<f64>,
    ) -> MobilityResult<bool> {
        let tolerance = tolerance.unwrap_or(SAME_PLACE_TOLERANCE);
        Ok(self.favorites.read().await?.iter().any(|favorite| {
            same_place(
                (favorite.latitude, favorite.longitude),
                (latitude, longitude),
                tolerance,
            )
        }))
    }

    /// Favorites within `radius_km`, nearest first.
    pub async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> MobilityResult<Vec<WithDistance<FavoriteLocation>>> {
        validate_coordinate(latitude, longitude)
            .map_err(|why| MobilityError::invalid_input(why.to_string()))?;
        let mut nearby: Vec<_> = self
            .favorites
            .read()
            .await?
            .into_iter()
            .map(|favorite| {
                let distance = geo::haversine_distance(
                    latitude,
                    longitude,
                    favorite.latitude,
                    favorite.longitude,
                );
                WithDistance::new(distance, favorite)
            })
            .filter(|favorite| favorite.distance_km <= radius_km)
            .collect();
        WithDistance::sort_nearest_first(&mut nearby);
        Ok(nearby)
    }

    /// Records a visit. A place within the tolerance of a known one counts as
    /// a revisit of it. Only the most recent locations are kept.
    pub async fn add_recent(&self, location: NewRecentLocation) -> MobilityResult<RecentLocation> {
        validate_coordinate(location.latitude, location.longitude)
            .map_err(|why| MobilityError::invalid_input(why.to_string()))?;
        let visit = RecentLocation {
            id: Id::generate(),
            name: location.name,
            address: location.address,
            latitude: location.latitude,
            longitude: location.longitude,
            timestamp: Utc::now(),
            frequency: 1,
        };
        self.recents
            .update(|recents| {
                let known = recents.iter().position(|recent| {
                    same_place(
                        (recent.latitude, recent.longitude),
                        (visit.latitude, visit.longitude),
                        SAME_PLACE_TOLERANCE,
                    )
                });
                let visited = match known {
                    Some(index) => {
                        let known = recents.remove(index);
                        known.merge(visit)
                    }
                    None => visit,
                };
                recents.push(visited.clone());
                recents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                recents.truncate(MAX_RECENT_LOCATIONS);
                Ok(visited)
            })
            .await
    }

    /// Newest first.
    pub async fn recents(&self) -> MobilityResult<Vec<RecentLocation>> {
        let mut recents = self.recents.read().await?;
        recents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(recents)
    }

    /// Places visited at least three times, most visited first.
    pub async fn frequent(&self) -> MobilityResult<Vec<RecentLocation>> {
        let mut recents = self.recents.read().await?;
        recents.retain(|recent| recent.frequency >= FREQUENT_AFTER_VISITS);
        recents.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        Ok(recents)
    }

    pub async fn clear_recents(&self) -> MobilityResult<()> {
        self.recents.clear().await
    }

    /// Case-insensitive match on name or address. Favorites come first.
    pub async fn search(&self, query: &str) -> MobilityResult<Vec<SavedLocation>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let favorites = self.favorites.read().await?;
        let recents = self.recents.read().await?;
        Ok(favorites
            .into_iter()
            .filter(|favorite| matches_query(&favorite.name, &favorite.address, &query))
            .map(SavedLocation::Favorite)
            .chain(
                recents
                    .into_iter()
                    .filter(|recent| matches_query(&recent.name, &recent.address, &query))
                    .map(SavedLocation::Recent),
            )
            .collect())
    }

    pub async fn suggestions(&self) -> MobilityResult<Vec<FavoriteLocation>> {
        self.suggestions_at(Local::now().naive_local()).await
    }

    /// Work on weekday mornings, home on weekday evenings, otherwise the most
    /// recently used favorites.
    pub async fn suggestions_at(&self, now: NaiveDateTime) -> MobilityResult<Vec<FavoriteLocation>> {
        let weekday = !matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
        let commute = match now.hour() {
            6..=9 if weekday => Some(FavoriteKind::Work),
            16..=19 if weekday => Some(FavoriteKind::Home),
            _ => None,
        };
        if let Some(kind) = commute {
            let matching = self.by_kind(kind).await?;
            if !matching.is_empty() {
                return Ok(matching);
            }
        }
        let mut favorites = self.list().await?;
        favorites.truncate(FALLBACK_SUGGESTIONS);
        Ok(favorites)
    }

    pub async fn export(&self) -> MobilityResult<String> {
        let backup = FavoritesBackup {
            favorites: Some(self.favorites.read().await?),
            recent_locations: Some(self.recents.read().await?),
            export_date: Some(Utc::now()),
        };
        serde_json::to_string_pretty(&backup).map_err(MobilityError::other)
    }

    pub async fn import(&self, backup: &str) -> MobilityResult<()> {
        let backup: FavoritesBackup = serde_json::from_str(backup)
            .map_err(|_| MobilityError::invalid_input("invalid backup data format"))?;
        if let Some(favorites) = backup.favorites {
            self.favorites.replace(&favorites).await?;
        }
        if let Some(recents) = backup.recent_locations {
            self.recents.replace(&recents).await?;
        }
        Ok(())
    }

    pub async fn statistics(&self) -> MobilityResult<FavoriteStatistics> {
        let favorites = self.favorites.read().await?;
        let recents = self.recents.read().await?;
        let mut by_kind = FavoritesByKind::default();
        for favorite in &favorites {
            match favorite.kind {
                FavoriteKind::Home => by_kind.home += 1,
                FavoriteKind::Work => by_kind.work += 1,
                FavoriteKind::Custom => by_kind.custom += 1,
            }
        }
        Ok(FavoriteStatistics {
            total_favorites: favorites.len(),
            favorites_by_kind: by_kind,
            total_recent_locations: recents.len(),
            most_frequent_location: recents
                .iter()
                .max_by_key(|recent| recent.frequency)
                .cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::store::MemoryStore;

    fn favorites() -> Favorites {
        Favorites::new(Arc::new(MemoryStore::new()))
    }

    fn new_favorite(name: &str, kind: FavoriteKind, latitude: f64, longitude: f64) -> NewFavorite {
        NewFavorite {
            name: name.to_owned(),
            address: format!("{name} street 1"),
            latitude,
            longitude,
            kind,
            icon: None,
        }
    }

    fn new_recent(name: &str, latitude: f64, longitude: f64) -> NewRecentLocation {
        NewRecentLocation {
            name: name.to_owned(),
            address: format!("{name} avenue"),
            latitude,
            longitude,
        }
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        // 2024-01-01 is a Monday
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn add_update_and_remove() {
        let favorites = favorites();
        let home = favorites
            .add(new_favorite("Home", FavoriteKind::Home, 37.77, -122.42))
            .await
            .unwrap();
        let updated = favorites
            .update(
                &home.id,
                FavoriteUpdate {
                    name: Some("Flat".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Flat");
        assert_eq!(updated.latitude, 37.77);

        favorites.remove(&home.id).await.unwrap();
        assert!(favorites.list().await.unwrap().is_empty());
        assert!(matches!(
            favorites.remove(&home.id).await,
            Err(MobilityError::NotFound)
        ));
    }

    #[tokio::test]
    async fn rejects_invalid_coordinates() {
        let favorites = favorites();
        let result = favorites
            .add(new_favorite("Nowhere", FavoriteKind::Custom, 95.0, 0.0))
            .await;
        assert!(matches!(result, Err(MobilityError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn recognizes_favorites_within_tolerance() {
        let favorites = favorites();
        favorites
            .add(new_favorite("Work", FavoriteKind::Work, 37.7749, -122.4194))
            .await
            .unwrap();
        assert!(favorites.is_favorite(37.7752, -122.4190, None).await.unwrap());
        assert!(!favorites.is_favorite(37.7770, -122.4194, None).await.unwrap());
        assert!(favorites
            .is_favorite(37.7770, -122.4194, Some(0.01))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn nearby_favorites_are_sorted_by_distance() {
        let favorites = favorites();
        favorites
            .add(new_favorite("Far", FavoriteKind::Custom, 37.7800, -122.4194))
            .await
            .unwrap();
        favorites
            .add(new_favorite("Near", FavoriteKind::Custom, 37.7755, -122.4194))
            .await
            .unwrap();
        favorites
            .add(new_favorite("Other city", FavoriteKind::Custom, 48.137, 11.575))
            .await
            .unwrap();
        let nearby = favorites.nearby(37.7749, -122.4194, 1.0).await.unwrap();
        let names: Vec<&str> = nearby.iter().map(|f| f.content.name.as_str()).collect();
        assert_eq!(names, vec!["Near", "Far"]);
    }

    #[tokio::test]
    async fn revisits_count_up_instead_of_duplicating() {
        let favorites = favorites();
        let first = favorites
            .add_recent(new_recent("Cafe", 37.7749, -122.4194))
            .await
            .unwrap();
        favorites
            .add_recent(new_recent("Coffee", 37.7751, -122.4195))
            .await
            .unwrap();
        let third = favorites
            .add_recent(new_recent("Coffee bar", 37.7750, -122.4193))
            .await
            .unwrap();
        assert_eq!(third.id, first.id);
        assert_eq!(third.frequency, 3);
        assert_eq!(third.name, "Coffee bar");

        let recents = favorites.recents().await.unwrap();
        assert_eq!(recents.len(), 1);
        let frequent = favorites.frequent().await.unwrap();
        assert_eq!(frequent.len(), 1);
    }

    #[tokio::test]
    async fn keeps_only_the_twenty_latest_recents() {
        let favorites = favorites();
        for i in 0..25 {
            favorites
                .add_recent(new_recent(&format!("Place {i}"), 10.0 + i as f64 * 0.01, 10.0))
                .await
                .unwrap();
        }
        let recents = favorites.recents().await.unwrap();
        assert_eq!(recents.len(), 20);
        favorites.clear_recents().await.unwrap();
        assert!(favorites.recents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_matches_names_and_addresses() {
        let favorites = favorites();
        favorites
            .add(new_favorite("Gym", FavoriteKind::Custom, 37.0, -122.0))
            .await
            .unwrap();
        favorites
            .add_recent(new_recent("Bakery", 37.1, -122.1))
            .await
            .unwrap();
        let found = favorites.search("  STREET ").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0], SavedLocation::Favorite(_)));
        let found = favorites.search("bak").await.unwrap();
        assert!(matches!(found[0], SavedLocation::Recent(_)));
        assert!(favorites.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn suggests_by_time_of_day() {
        let favorites = favorites();
        favorites
            .add(new_favorite("Home", FavoriteKind::Home, 37.0, -122.0))
            .await
            .unwrap();
        favorites
            .add(new_favorite("Office", FavoriteKind::Work, 37.1, -122.1))
            .await
            .unwrap();
        favorites
            .add(new_favorite("Gym", FavoriteKind::Custom, 37.2, -122.2))
            .await
            .unwrap();

        let morning = favorites.suggestions_at(at(1, 8)).await.unwrap();
        assert_eq!(morning.len(), 1);
        assert_eq!(morning[0].name, "Office");

        let evening = favorites.suggestions_at(at(1, 17)).await.unwrap();
        assert_eq!(evening[0].name, "Home");

        // Saturday morning
        let weekend = favorites.suggestions_at(at(6, 8)).await.unwrap();
        assert_eq!(weekend.len(), 3);
    }

    #[tokio::test]
    async fn export_and_import() {
        let source = favorites();
        source
            .add(new_favorite("Home", FavoriteKind::Home, 37.0, -122.0))
            .await
            .unwrap();
        source
            .add_recent(new_recent("Bakery", 37.1, -122.1))
            .await
            .unwrap();
        let backup = source.export().await.unwrap();

        let target = favorites();
        target.import(&backup).await.unwrap();
        assert_eq!(target.list().await.unwrap(), source.list().await.unwrap());
        assert_eq!(target.recents().await.unwrap().len(), 1);

        assert!(matches!(
            target.import("not json").await,
            Err(MobilityError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn statistics_count_by_kind() {
        let favorites = favorites();
        favorites
            .add(new_favorite("Home", FavoriteKind::Home, 37.0, -122.0))
            .await
            .unwrap();
        favorites
            .add(new_favorite("Gym", FavoriteKind::Custom, 37.2, -122.2))
            .await
            .unwrap();
        favorites
            .add_recent(new_recent("Bakery", 37.1, -122.1))
            .await
            .unwrap();
        let statistics = favorites.statistics().await.unwrap();
        assert_eq!(statistics.total_favorites, 2);
        assert_eq!(
            statistics.favorites_by_kind,
            FavoritesByKind {
                home: 1,
                work: 0,
                custom: 1
            }
        );
        assert_eq!(statistics.total_recent_locations, 1);
        assert_eq!(
            statistics.most_frequent_location.map(|recent| recent.name),
            Some("Bakery".to_owned())
        );
    }
}
