//! Great-circle distance and nearest-site lookup.

use crate::types::Site;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two points given in degrees.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Site closest to the given coordinates, `None` for an empty list.
pub fn nearest_site(sites: &[Site], longitude: f64, latitude: f64) -> Option<&Site> {
    sites.iter().min_by(|a, b| {
        let da = distance_km(latitude, longitude, a.latitude, a.longitude);
        let db = distance_km(latitude, longitude, b.latitude, b.longitude);
        da.total_cmp(&db)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str, latitude: f64, longitude: f64) -> Site {
        Site {
            id: id.to_string(),
            name: id.to_string(),
            latitude,
            longitude,
            elevation: None,
            region: None,
            unitary_auth_area: None,
        }
    }

    #[test]
    fn test_distance_london_to_exeter() {
        // Roughly 250 km
        let d = distance_km(51.5074, -0.1278, 50.7184, -3.5339);
        assert!((240.0..260.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert!(distance_km(55.95, -3.19, 55.95, -3.19).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_site() {
        let sites = vec![
            site("edinburgh", 55.95, -3.19),
            site("heathrow", 51.479, -0.449),
            site("exeter", 50.72, -3.53),
        ];
        // Central London
        let nearest = nearest_site(&sites, -0.1278, 51.5074).unwrap();
        assert_eq!(nearest.id, "heathrow");
    }

    #[test]
    fn test_nearest_site_empty() {
        assert!(nearest_site(&[], 0.0, 0.0).is_none());
    }
}
