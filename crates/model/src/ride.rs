use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{location::RoutePoint, scooter::Scooter};

/// Kilograms of CO2 saved per kilometer ridden instead of driven.
pub const CO2_SAVED_KG_PER_KM: f64 = 0.12;

/// Battery percentage points drained per kilometer.
pub const BATTERY_DRAIN_PERCENT_PER_KM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RideStatus {
    Idle,
    Active,
    Paused,
    Ended,
}

impl RideStatus {
    /// Active or paused rides occupy the device.
    pub fn in_progress(self) -> bool {
        matches!(self, Self::Active | Self::Paused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RideAction {
    Start,
    Pause,
    Resume,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub unlock_fee: f64,
    pub rate_per_minute: f64,
}

impl Pricing {
    pub fn new(unlock_fee: f64, rate_per_minute: f64) -> Self {
        Self {
            unlock_fee,
            rate_per_minute,
        }
    }

    /// Unrounded cost after `elapsed_seconds` of active riding.
    pub fn cost(&self, elapsed_seconds: u64) -> f64 {
        self.unlock_fee + self.rate_per_minute * (elapsed_seconds as f64 / 60.0)
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::new(1.00, 0.15)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RideRecordStatus {
    Completed,
    Cancelled,
}

/// A finished ride as kept in the ride history.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RideRecord {
    pub id: Id<RideRecord>,
    pub scooter_id: Id<Scooter>,
    pub status: RideRecordStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// active riding time, pauses excluded
    #[serde(with = "utility::serde::duration")]
    #[schemars(schema_with = "utility::serde::duration::schema")]
    pub duration: Duration,
    pub distance_meters: f64,
    /// billed amount, rounded to cents
    pub cost: f64,
    pub max_speed_kmh: f64,
    pub average_speed_kmh: f64,
    pub battery_used_percent: f64,
    pub co2_saved_kg: f64,
    pub route: Vec<RoutePoint>,
    pub rating: Option<u8>,
}

impl HasId for RideRecord {
    type IdType = String;
}

impl RideRecord {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }
}

/// Totals over the ride history.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RideStatistics {
    pub total_rides: usize,
    pub total_distance_meters: f64,
    /// rounded to cents
    pub total_cost: f64,
    #[serde(with = "utility::serde::duration")]
    #[schemars(schema_with = "utility::serde::duration::schema")]
    pub total_duration: Duration,
    pub total_co2_saved_kg: f64,
    pub average_rating: Option<f64>,
}

pub fn co2_saved_kg(distance_meters: f64) -> f64 {
    distance_meters / 1000.0 * CO2_SAVED_KG_PER_KM
}

/// Meters per second to kilometers per hour.
pub fn mps_to_kmh(speed: f64) -> f64 {
    speed * 3.6
}
