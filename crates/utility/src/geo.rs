pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const EARTH_RADIUS_M: f64 = EARTH_RADIUS_KM * 1000.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Whether the pair is a finite WGS84 coordinate.
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Returns `((min_lat, min_lon), (max_lat, max_lon))` of a box enclosing the
/// circle of `radius_km` around the given point. Used as a cheap prefilter
/// before the exact haversine check.
pub fn calculate_bounding_box(
    lat: f64,
    lon: f64,
    radius_km: f64,
) -> ((f64, f64), (f64, f64)) {
    let lat_rad = to_radians(lat);
    let lon_rad = to_radians(lon);

    let min_lat = lat_rad - radius_km / EARTH_RADIUS_KM;
    let max_lat = lat_rad + radius_km / EARTH_RADIUS_KM;

    // longitude bounds widen with latitude
    let lon_delta = radius_km / (EARTH_RADIUS_KM * lat_rad.cos());
    let min_lon = lon_rad - lon_delta;
    let max_lon = lon_rad + lon_delta;

    (
        (to_degrees(min_lat), to_degrees(min_lon)),
        (to_degrees(max_lat), to_degrees(max_lon)),
    )
}

pub fn in_bounding_box(
    latitude: f64,
    longitude: f64,
    bounding_box: ((f64, f64), (f64, f64)),
) -> bool {
    let ((min_lat, min_lon), (max_lat, max_lon)) = bounding_box;
    (min_lat..=max_lat).contains(&latitude) && (min_lon..=max_lon).contains(&longitude)
}

/// Great-circle distance in kilometers on a spherical earth.
pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lon1_rad = to_radians(longitude_1);
    let lat2_rad = to_radians(latitude_2);
    let lon2_rad = to_radians(longitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = lon2_rad - lon1_rad;

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Same as [`haversine_distance`], in meters.
pub fn haversine_distance_meters(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    haversine_distance(latitude_1, longitude_1, latitude_2, longitude_2) * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hop_in_san_francisco() {
        let meters = haversine_distance_meters(37.7749, -122.4194, 37.7755, -122.4200);
        assert!((meters - 83.0).abs() <= 83.0 * 0.05, "got {meters}");
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_distance(52.0, 10.0, 52.0, 10.0), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = haversine_distance(54.32, 10.13, 54.39, 10.24);
        let back = haversine_distance(54.39, 10.24, 54.32, 10.13);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_contains_circle() {
        let bbox = calculate_bounding_box(37.7749, -122.4194, 1.0);
        assert!(in_bounding_box(37.7749, -122.4194, bbox));
        // roughly 0.9 km north
        assert!(in_bounding_box(37.7830, -122.4194, bbox));
        // roughly 2.2 km north
        assert!(!in_bounding_box(37.7949, -122.4194, bbox));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(is_valid_coordinate(-90.0, 180.0));
        assert!(!is_valid_coordinate(90.1, 0.0));
        assert!(!is_valid_coordinate(0.0, -180.5));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
        assert!(!is_valid_coordinate(0.0, f64::INFINITY));
    }
}
