//! Client for the vehicle feed of a GBFS system. Handles both the v2
//! `free_bike_status` and the v3 `vehicle_status` layout.

use std::{error::Error, fmt};

use model::{scooter::Scooter, WithDistance};
use reqwest::Url;
use serde::Deserialize;
use utility::{geo, id::Id};

#[derive(Debug)]
pub enum GbfsError {
    Request(reqwest::Error),
    Format(serde_json::Error),
}

impl fmt::Display for GbfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(why) => write!(f, "gbfs request failed: {}", why),
            Self::Format(why) => write!(f, "malformed gbfs feed: {}", why),
        }
    }
}

impl Error for GbfsError {}

impl From<reqwest::Error> for GbfsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Request(value)
    }
}

impl From<serde_json::Error> for GbfsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Format(value)
    }
}

pub type GbfsResult<T> = Result<T, GbfsError>;

#[derive(Debug, Clone, Deserialize)]
pub struct Response<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehiclesResponse {
    #[serde(alias = "bikes")]
    pub vehicles: Vec<VehicleStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleStatus {
    #[serde(alias = "bike_id")]
    pub vehicle_id: String,
    /// Missing for vehicles docked at a station.
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub is_reserved: bool,
    #[serde(default)]
    pub is_disabled: bool,
    /// 0.0 to 1.0
    pub current_fuel_percent: Option<f64>,
    pub current_range_meters: Option<f64>,
    pub vehicle_type_id: Option<String>,
}

impl VehicleStatus {
    pub fn into_scooter(self) -> Option<Scooter> {
        let (latitude, longitude) = (self.lat?, self.lon?);
        if !geo::is_valid_coordinate(latitude, longitude) {
            return None;
        }
        Some(Scooter {
            id: Id::new(self.vehicle_id),
            latitude,
            longitude,
            battery_level: self
                .current_fuel_percent
                .map(|fraction| (fraction * 100.0).clamp(0.0, 100.0)),
            range_meters: self.current_range_meters,
            is_available: !self.is_reserved && !self.is_disabled,
            model: self.vehicle_type_id,
        })
    }
}

/// Parses a vehicle feed document. Vehicles without a usable position are
/// skipped.
pub fn parse_vehicles(body: &str) -> GbfsResult<Vec<Scooter>> {
    let response: Response<VehiclesResponse> = serde_json::from_str(body)?;
    let total = response.data.vehicles.len();
    let scooters: Vec<Scooter> = response
        .data
        .vehicles
        .into_iter()
        .filter_map(VehicleStatus::into_scooter)
        .collect();
    if scooters.len() < total {
        log::debug!("Skipped {} vehicles without a position", total - scooters.len());
    }
    Ok(scooters)
}

/// Available scooters within `radius_km` of the point, nearest first.
pub fn nearby(
    scooters: Vec<Scooter>,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> Vec<WithDistance<Scooter>> {
    let bounding_box = geo::calculate_bounding_box(latitude, longitude, radius_km);
    let mut result: Vec<WithDistance<Scooter>> = scooters
        .into_iter()
        .filter(|scooter| scooter.is_available)
        .filter(|scooter| geo::in_bounding_box(scooter.latitude, scooter.longitude, bounding_box))
        .map(|scooter| scooter.with_distance_to(latitude, longitude))
        .filter(|scooter| scooter.distance_km <= radius_km)
        .collect();
    WithDistance::sort_nearest_first(&mut result);
    result
}

/// Query parameters a vehicle link may carry its id in, in order of preference.
const QR_ID_PARAMETERS: [&str; 3] = ["vehicle_id", "bike_id", "id"];

fn is_vehicle_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= 64
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Reads the vehicle id printed on a scooter's QR code. The code is either the
/// bare id or a link carrying it in a `vehicle_id`, `bike_id` or `id` query
/// parameter or as its last path segment.
pub fn vehicle_id_from_qr(code: &str) -> Option<Id<Scooter>> {
    let code = code.trim();
    let candidate = match Url::parse(code) {
        Ok(url) => {
            let from_query = QR_ID_PARAMETERS.iter().find_map(|name| {
                url.query_pairs()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
            });
            match from_query {
                Some(id) => id,
                None => match url.path_segments() {
                    Some(segments) => segments.filter(|s| !s.is_empty()).last()?.to_owned(),
                    // `scooter:SC-1` and the like
                    None => url.path().to_owned(),
                },
            }
        }
        Err(_) => code.to_owned(),
    };
    is_vehicle_id(&candidate).then(|| Id::new(candidate))
}

#[derive(Debug, Clone)]
pub struct GbfsClient {
    http: reqwest::Client,
    url: String,
}

impl GbfsClient {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn vehicles(&self) -> GbfsResult<Vec<Scooter>> {
        let body = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_vehicles(&body)
    }

    /// The vehicle with the given id, if the feed lists it with a position.
    pub async fn vehicle(&self, id: &Id<Scooter>) -> GbfsResult<Option<Scooter>> {
        Ok(self
            .vehicles()
            .await?
            .into_iter()
            .find(|scooter| &scooter.id == id))
    }

    pub async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> GbfsResult<Vec<WithDistance<Scooter>>> {
        Ok(nearby(self.vehicles().await?, latitude, longitude, radius_km))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FREE_BIKE_STATUS: &str = r#"{
        "last_updated": 1700000000,
        "ttl": 60,
        "version": "2.3",
        "data": {
            "bikes": [
                { "bike_id": "near", "lat": 37.7750, "lon": -122.4195, "is_reserved": false, "is_disabled": false, "current_fuel_percent": 0.87, "vehicle_type_id": "es-1" },
                { "bike_id": "far", "lat": 37.8049, "lon": -122.4194, "is_reserved": false, "is_disabled": false },
                { "bike_id": "reserved", "lat": 37.7751, "lon": -122.4194, "is_reserved": true, "is_disabled": false },
                { "bike_id": "middle", "lat": 37.7790, "lon": -122.4194, "is_reserved": false, "is_disabled": false, "current_range_meters": 12000 },
                { "bike_id": "docked", "is_reserved": false, "is_disabled": false, "station_id": "s1" }
            ]
        }
    }"#;

    const VEHICLE_STATUS: &str = r#"{
        "last_updated": "2024-01-01T00:00:00Z",
        "ttl": 0,
        "version": "3.0",
        "data": {
            "vehicles": [
                { "vehicle_id": "v1", "lat": 52.52, "lon": 13.405, "is_reserved": false, "is_disabled": true, "current_fuel_percent": 0.2 }
            ]
        }
    }"#;

    #[test]
    fn parses_free_bike_status() {
        let scooters = parse_vehicles(FREE_BIKE_STATUS).unwrap();
        assert_eq!(scooters.len(), 4);
        let near = &scooters[0];
        assert_eq!(near.id, Id::new("near".to_owned()));
        assert_eq!(near.battery_level, Some(87.0));
        assert_eq!(near.model.as_deref(), Some("es-1"));
        assert!(near.is_available);
        assert!(!scooters[2].is_available);
    }

    #[test]
    fn parses_vehicle_status() {
        let scooters = parse_vehicles(VEHICLE_STATUS).unwrap();
        assert_eq!(scooters.len(), 1);
        assert!(!scooters[0].is_available);
        assert_eq!(scooters[0].battery_level, Some(20.0));
    }

    #[test]
    fn malformed_feed_is_a_format_error() {
        assert!(matches!(
            parse_vehicles(r#"{"data": {}}"#),
            Err(GbfsError::Format(_))
        ));
    }

    #[test]
    fn reads_vehicle_ids_from_qr_codes() {
        let id = |code: &str| vehicle_id_from_qr(code).map(|id| id.raw());
        assert_eq!(id("SC-2024"), Some("SC-2024".to_owned()));
        assert_eq!(id("  near \n"), Some("near".to_owned()));
        assert_eq!(id("https://scoot.example/s/near"), Some("near".to_owned()));
        assert_eq!(id("https://scoot.example/s/near/"), Some("near".to_owned()));
        assert_eq!(
            id("https://scoot.example/unlock?bike_id=middle&lang=en"),
            Some("middle".to_owned())
        );
        assert_eq!(id("scooter:v1"), Some("v1".to_owned()));
        assert_eq!(id(""), None);
        assert_eq!(id("https://scoot.example/"), None);
        assert_eq!(id("not a vehicle"), None);
    }

    #[test]
    fn nearby_filters_and_sorts_available_scooters() {
        let scooters = parse_vehicles(FREE_BIKE_STATUS).unwrap();
        let found = nearby(scooters, 37.7749, -122.4194, 1.0);
        let ids: Vec<String> = found.iter().map(|s| s.content.id.raw()).collect();
        assert_eq!(ids, vec!["near", "middle"]);
        assert!(found[0].distance_km < found[1].distance_km);
    }
}
