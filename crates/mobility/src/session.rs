use std::{error, fmt};

use chrono::{DateTime, Duration, Utc};
use model::{
    location::{LocationSample, RoutePoint},
    ride::{
        co2_saved_kg, mps_to_kmh, Pricing, RideAction, RideRecord, RideRecordStatus, RideStatus,
        BATTERY_DRAIN_PERCENT_PER_KM,
    },
    round_to_cents,
    scooter::Scooter,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{geo, id::Id};

/// A ride was asked to do something its current state does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidTransition {
    pub from: RideStatus,
    pub action: RideAction,
}

impl InvalidTransition {
    pub fn new(from: RideStatus, action: RideAction) -> Self {
        Self { from, action }
    }
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "can not {:?} a ride that is {:?}", self.action, self.from)
    }
}

impl error::Error for InvalidTransition {}

/// The state of one rental from unlock to end.
///
/// All accrual happens through [`RideSession::tick`] and
/// [`RideSession::ingest`], and both only count while the ride is active.
/// Nothing here knows about timers or feeds, the tracker drives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideSession {
    ride_id: Id<RideRecord>,
    scooter_id: Id<Scooter>,
    status: RideStatus,
    pricing: Pricing,
    started_at: Option<DateTime<Utc>>,
    route: Vec<RoutePoint>,
    current_location: Option<LocationSample>,
    distance_meters: f64,
    elapsed_seconds: u64,
    cost: f64,
    /// meters per second
    max_speed: f64,
    battery_level: Option<f64>,
    low_battery_reported: bool,
}

/// A read-only copy of a ride as handed to observers.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RideSnapshot {
    pub ride_id: Id<RideRecord>,
    pub scooter_id: Id<Scooter>,
    pub status: RideStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    pub distance_meters: f64,
    /// rounded to cents
    pub cost: f64,
    pub current_location: Option<LocationSample>,
    pub route: Vec<RoutePoint>,
    pub max_speed_kmh: f64,
    pub average_speed_kmh: f64,
    pub battery_used_percent: f64,
    pub battery_remaining_percent: Option<f64>,
}

impl RideSession {
    pub fn new(ride_id: Id<RideRecord>, scooter_id: Id<Scooter>, pricing: Pricing) -> Self {
        Self {
            ride_id,
            scooter_id,
            status: RideStatus::Idle,
            pricing,
            started_at: None,
            route: Vec::new(),
            current_location: None,
            distance_meters: 0.0,
            elapsed_seconds: 0,
            cost: 0.0,
            max_speed: 0.0,
            battery_level: None,
            low_battery_reported: false,
        }
    }

    /// Battery level of the scooter at unlock, in percent.
    pub fn with_battery_level(mut self, battery_level: f64) -> Self {
        self.battery_level = Some(battery_level.clamp(0.0, 100.0));
        self
    }

    pub fn ride_id(&self) -> &Id<RideRecord> {
        &self.ride_id
    }

    pub fn scooter_id(&self) -> &Id<Scooter> {
        &self.scooter_id
    }

    pub fn status(&self) -> RideStatus {
        self.status
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn route(&self) -> &[RoutePoint] {
        &self.route
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Unrounded cost.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Meters per second.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Meters per second over the active time.
    pub fn average_speed(&self) -> f64 {
        if self.elapsed_seconds == 0 {
            0.0
        } else {
            self.distance_meters / self.elapsed_seconds as f64
        }
    }

    pub fn battery_used_percent(&self) -> f64 {
        let used = self.distance_meters / 1000.0 * BATTERY_DRAIN_PERCENT_PER_KM;
        used.min(self.battery_level.unwrap_or(100.0))
    }

    pub fn battery_remaining_percent(&self) -> Option<f64> {
        self.battery_level
            .map(|level| (level - self.battery_used_percent()).max(0.0))
    }

    /// True exactly once per ride, the first time the remaining battery is
    /// below `threshold`.
    pub fn take_low_battery(&mut self, threshold: f64) -> bool {
        if self.low_battery_reported {
            return false;
        }
        match self.battery_remaining_percent() {
            Some(remaining) if remaining < threshold => {
                self.low_battery_reported = true;
                true
            }
            _ => false,
        }
    }

    pub fn start(
        &mut self,
        origin: Option<LocationSample>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if self.status != RideStatus::Idle {
            return Err(InvalidTransition::new(self.status, RideAction::Start));
        }
        if let Some(origin) = origin {
            self.max_speed = origin.speed.unwrap_or(0.0).max(0.0);
            self.route.push(RoutePoint::from(&origin));
            self.current_location = Some(origin);
        }
        self.started_at = Some(now);
        self.cost = self.pricing.unlock_fee;
        self.status = RideStatus::Active;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), InvalidTransition> {
        if self.status != RideStatus::Active {
            return Err(InvalidTransition::new(self.status, RideAction::Pause));
        }
        self.status = RideStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), InvalidTransition> {
        if self.status != RideStatus::Paused {
            return Err(InvalidTransition::new(self.status, RideAction::Resume));
        }
        self.status = RideStatus::Active;
        Ok(())
    }

    /// Accrues one second. Returns false, changing nothing, unless active.
    pub fn tick(&mut self) -> bool {
        if self.status != RideStatus::Active {
            return false;
        }
        self.elapsed_seconds += 1;
        self.cost = self.pricing.cost(self.elapsed_seconds);
        true
    }

    /// Adds a sample to the route. Returns the distance it added, or `None`
    /// if the ride is not active.
    pub fn ingest(&mut self, sample: LocationSample) -> Option<f64> {
        if self.status != RideStatus::Active {
            return None;
        }
        let delta = self
            .route
            .last()
            .map(|last| {
                geo::haversine_distance_meters(
                    last.latitude,
                    last.longitude,
                    sample.latitude,
                    sample.longitude,
                )
            })
            .unwrap_or(0.0);
        if let Some(speed) = sample.speed {
            if speed > self.max_speed {
                self.max_speed = speed;
            }
        }
        self.route.push(RoutePoint::from(&sample));
        self.current_location = Some(sample);
        self.distance_meters += delta;
        Some(delta)
    }

    /// Finishes the ride. The session is frozen afterwards.
    pub fn end(&mut self, now: DateTime<Utc>) -> Result<RideRecord, InvalidTransition> {
        let started_at = match (self.status, self.started_at) {
            (RideStatus::Active | RideStatus::Paused, Some(started_at)) => started_at,
            _ => return Err(InvalidTransition::new(self.status, RideAction::End)),
        };
        self.status = RideStatus::Ended;
        self.cost = self.pricing.cost(self.elapsed_seconds);
        let status = if self.elapsed_seconds == 0 && self.distance_meters == 0.0 {
            RideRecordStatus::Cancelled
        } else {
            RideRecordStatus::Completed
        };
        Ok(RideRecord {
            id: self.ride_id.clone(),
            scooter_id: self.scooter_id.clone(),
            status,
            started_at,
            ended_at: now,
            duration: Duration::seconds(self.elapsed_seconds as i64),
            distance_meters: self.distance_meters,
            cost: round_to_cents(self.cost),
            max_speed_kmh: mps_to_kmh(self.max_speed),
            average_speed_kmh: mps_to_kmh(self.average_speed()),
            battery_used_percent: self.battery_used_percent(),
            co2_saved_kg: co2_saved_kg(self.distance_meters),
            route: self.route.clone(),
            rating: None,
        })
    }

    /// Puts a ride reloaded after a restart into the paused state, so time
    /// spent while nothing was running is not billed.
    pub fn into_restored(mut self) -> Self {
        if self.status == RideStatus::Active {
            self.status = RideStatus::Paused;
        }
        self
    }

    pub fn snapshot(&self) -> RideSnapshot {
        RideSnapshot {
            ride_id: self.ride_id.clone(),
            scooter_id: self.scooter_id.clone(),
            status: self.status,
            started_at: self.started_at,
            elapsed_seconds: self.elapsed_seconds,
            distance_meters: self.distance_meters,
            cost: round_to_cents(self.cost),
            current_location: self.current_location.clone(),
            route: self.route.clone(),
            max_speed_kmh: mps_to_kmh(self.max_speed),
            average_speed_kmh: mps_to_kmh(self.average_speed()),
            battery_used_percent: self.battery_used_percent(),
            battery_remaining_percent: self.battery_remaining_percent(),
        }
    }
}
