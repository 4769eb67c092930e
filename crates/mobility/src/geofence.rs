use std::{error, fmt};

use model::geofence::{GeofenceStatus, Zone, ZoneKind};
use utility::geo;

#[derive(Debug, Clone, PartialEq)]
pub enum GeofenceError {
    InvalidCoordinate { latitude: f64, longitude: f64 },
    InvalidZone(String),
}

impl fmt::Display for GeofenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoordinate {
                latitude,
                longitude,
            } => write!(f, "invalid coordinate ({}, {})", latitude, longitude),
            Self::InvalidZone(name) => write!(f, "invalid zone {:?}", name),
        }
    }
}

impl error::Error for GeofenceError {}

pub fn validate_coordinate(latitude: f64, longitude: f64) -> Result<(), GeofenceError> {
    if geo::is_valid_coordinate(latitude, longitude) {
        Ok(())
    } else {
        Err(GeofenceError::InvalidCoordinate {
            latitude,
            longitude,
        })
    }
}

pub fn validate_zone(zone: &Zone) -> Result<(), GeofenceError> {
    let radius_ok = zone.radius_meters.is_finite() && zone.radius_meters >= 0.0;
    if radius_ok && geo::is_valid_coordinate(zone.latitude, zone.longitude) {
        Ok(())
    } else {
        Err(GeofenceError::InvalidZone(zone.name.clone()))
    }
}

fn contains(zone: &Zone, latitude: f64, longitude: f64) -> bool {
    geo::haversine_distance_meters(zone.latitude, zone.longitude, latitude, longitude)
        <= zone.radius_meters
}

/// Names of the zones containing the point, in the order the zones are given.
/// A point exactly on the border is inside.
pub fn zones_containing<'a>(
    latitude: f64,
    longitude: f64,
    zones: &'a [Zone],
) -> Result<Vec<&'a str>, GeofenceError> {
    validate_coordinate(latitude, longitude)?;
    let mut names = Vec::new();
    for zone in zones {
        validate_zone(zone)?;
        if contains(zone, latitude, longitude) {
            names.push(zone.name.as_str());
        }
    }
    Ok(names)
}

pub fn evaluate(
    latitude: f64,
    longitude: f64,
    zones: &[Zone],
) -> Result<GeofenceStatus, GeofenceError> {
    validate_coordinate(latitude, longitude)?;
    let mut status = GeofenceStatus::default();
    for zone in zones {
        validate_zone(zone)?;
        if !contains(zone, latitude, longitude) {
            continue;
        }
        match zone.kind {
            ZoneKind::Slow => status.in_slow_zone = true,
            ZoneKind::NoRide => status.in_no_ride_zone = true,
            ZoneKind::Parking => status.in_parking_zone = true,
        }
    }
    Ok(status)
}

/// The zones used when none are configured.
pub fn default_zones() -> Vec<Zone> {
    vec![
        Zone::new("Downtown", ZoneKind::Slow, 37.7749, -122.4194, 500.0),
        Zone::new("Hospital area", ZoneKind::NoRide, 37.7849, -122.4094, 200.0),
        Zone::new("Designated parking", ZoneKind::Parking, 37.7649, -122.4294, 100.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_zone_containing_the_point() {
        let zones = vec![
            Zone::new("a", ZoneKind::Slow, 37.7749, -122.4194, 500.0),
            Zone::new("b", ZoneKind::Parking, 37.7749, -122.4194, 50.0),
            Zone::new("far", ZoneKind::NoRide, 48.137, 11.575, 1000.0),
        ];
        let names = zones_containing(37.7755, -122.4200, &zones).unwrap();
        assert_eq!(names, vec!["a"]);
        let names = zones_containing(37.7749, -122.4194, &zones).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn border_is_inside() {
        let distance = geo::haversine_distance_meters(37.7749, -122.4194, 37.7755, -122.4200);
        let zones = vec![Zone::new("edge", ZoneKind::Slow, 37.7749, -122.4194, distance)];
        assert_eq!(
            zones_containing(37.7755, -122.4200, &zones).unwrap(),
            vec!["edge"]
        );
    }

    #[test]
    fn rejects_invalid_points() {
        let zones = default_zones();
        assert!(zones_containing(f64::NAN, 0.0, &zones).is_err());
        assert!(zones_containing(91.0, 0.0, &zones).is_err());
        assert!(evaluate(0.0, 180.5, &zones).is_err());
        assert!(evaluate(0.0, f64::INFINITY, &zones).is_err());
    }

    #[test]
    fn rejects_malformed_zones() {
        let zones = vec![Zone::new("broken", ZoneKind::Slow, 0.0, 0.0, -1.0)];
        assert_eq!(
            evaluate(0.0, 0.0, &zones),
            Err(GeofenceError::InvalidZone("broken".to_owned()))
        );
        let zones = vec![Zone::new("nan", ZoneKind::Slow, f64::NAN, 0.0, 10.0)];
        assert!(zones_containing(0.0, 0.0, &zones).is_err());
    }

    #[test]
    fn evaluates_zone_kinds() {
        let zones = default_zones();
        let downtown = evaluate(37.7749, -122.4194, &zones).unwrap();
        assert!(downtown.in_slow_zone);
        assert!(!downtown.in_no_ride_zone);
        assert!(!downtown.in_parking_zone);

        let parking = evaluate(37.7649, -122.4294, &zones).unwrap();
        assert!(parking.in_parking_zone);
        assert!(!parking.in_slow_zone);

        let nowhere = evaluate(0.0, 0.0, &zones).unwrap();
        assert_eq!(nowhere, GeofenceStatus::default());
    }
}
