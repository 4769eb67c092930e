use std::sync::Arc;

use chrono::Duration;
use model::{
    ride::{co2_saved_kg, RideRecord, RideStatistics},
    round_to_cents,
};
use utility::id::Id;

use super::Document;
use crate::{
    store::{keys, PersistenceStore},
    MobilityError, MobilityResult,
};

/// Finished rides, newest first.
#[derive(Clone)]
pub struct RideHistory {
    rides: Document<Vec<RideRecord>>,
}

impl RideHistory {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            rides: Document::new(store, keys::RIDE_HISTORY),
        }
    }

    pub async fn list(&self) -> MobilityResult<Vec<RideRecord>> {
        self.rides.read().await
    }

    pub async fn get(&self, id: &Id<RideRecord>) -> MobilityResult<RideRecord> {
        self.rides
            .read()
            .await?
            .into_iter()
            .find(|ride| &ride.id == id)
            .ok_or(MobilityError::NotFound)
    }

    pub async fn append(&self, record: RideRecord) -> MobilityResult<()> {
        self.rides
            .update(|rides| {
                rides.retain(|ride| ride.id != record.id);
                rides.insert(0, record);
                Ok(())
            })
            .await
    }

    /// Rates a ride from 1 to 5 stars.
    pub async fn rate(&self, id: &Id<RideRecord>, rating: u8) -> MobilityResult<RideRecord> {
        if !(1..=5).contains(&rating) {
            return Err(MobilityError::invalid_input(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }
        self.rides
            .update(|rides| {
                let ride = rides
                    .iter_mut()
                    .find(|ride| &ride.id == id)
                    .ok_or(MobilityError::NotFound)?;
                ride.rating = Some(rating);
                Ok(ride.clone())
            })
            .await
    }

    pub async fn statistics(&self) -> MobilityResult<RideStatistics> {
        let rides = self.rides.read().await?;
        let total_distance_meters: f64 = rides.iter().map(|ride| ride.distance_meters).sum();
        let ratings: Vec<f64> = rides
            .iter()
            .filter_map(|ride| ride.rating)
            .map(f64::from)
            .collect();
        Ok(RideStatistics {
            total_rides: rides.len(),
            total_distance_meters,
            total_cost: round_to_cents(rides.iter().map(|ride| ride.cost).sum()),
            total_duration: rides
                .iter()
                .fold(Duration::zero(), |total, ride| total + ride.duration),
            total_co2_saved_kg: co2_saved_kg(total_distance_meters),
            average_rating: (!ratings.is_empty())
                .then(|| ratings.iter().sum::<f64>() / ratings.len() as f64),
        })
    }
}
