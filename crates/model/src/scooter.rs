use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo;
use utility::id::{HasId, Id};

use crate::WithDistance;

/// A rentable vehicle as seen on the map.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scooter {
    pub id: Id<Scooter>,
    pub latitude: f64,
    pub longitude: f64,
    /// 0 to 100
    pub battery_level: Option<f64>,
    pub range_meters: Option<f64>,
    pub is_available: bool,
    pub model: Option<String>,
}

impl HasId for Scooter {
    type IdType = String;
}

impl Scooter {
    pub fn with_distance_to(self, latitude: f64, longitude: f64) -> WithDistance<Self> {
        let distance =
            geo::haversine_distance(latitude, longitude, self.latitude, self.longitude);
        WithDistance::new(distance, self)
    }
}
