/// Great-circle distance between two coordinates in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// SQL haversine over `latitude`/`longitude` columns, parameterized on
/// `$lat`/`$lng` placeholders that the caller substitutes with bind numbers.
/// Both the feed fetch and the feed count interpolate this same fragment so
/// the two queries can never disagree on which rows fall inside the radius.
pub fn distance_sql(lat_bind: &str, lng_bind: &str) -> String {
    format!(
        "(6371.0 * acos(LEAST(1.0, \
         cos(radians({lat})) * cos(radians(latitude)) * cos(radians(longitude) - radians({lng})) \
         + sin(radians({lat})) * sin(radians(latitude)))))",
        lat = lat_bind,
        lng = lng_bind,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        let d = haversine_km(40.7128, -74.0060, 40.7128, -74.0060);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn known_distance_nyc_to_philly() {
        // ~130 km as the crow flies
        let d = haversine_km(40.7128, -74.0060, 39.9526, -75.1652);
        assert!((d - 130.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn distance_sql_substitutes_binds() {
        let sql = distance_sql("$3", "$4");
        assert!(sql.contains("radians($3)"));
        assert!(sql.contains("radians($4)"));
        assert!(!sql.contains("$lat"));
    }
}
