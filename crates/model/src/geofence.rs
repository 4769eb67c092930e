use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ZoneKind {
    /// speed is limited inside
    Slow,
    /// riding is not allowed inside
    NoRide,
    /// rides may be ended inside
    Parking,
}

/// A named circular region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub name: String,
    pub kind: ZoneKind,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl Zone {
    pub fn new<S: Into<String>>(
        name: S,
        kind: ZoneKind,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            latitude,
            longitude,
            radius_meters,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceStatus {
    pub in_slow_zone: bool,
    pub in_no_ride_zone: bool,
    pub in_parking_zone: bool,
}
