use serde::Serialize;

use crate::models::fleet::{Ambulance, Hospital};
use crate::models::location::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Anything that can be ranked by distance from a point.
pub trait Located {
    fn position(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn position(&self) -> GeoPoint {
        *self
    }
}

impl Located for Ambulance {
    fn position(&self) -> GeoPoint {
        self.location
    }
}

impl Located for Hospital {
    fn position(&self) -> GeoPoint {
        self.location
    }
}

/// A candidate annotated with its rounded distance from the query origin.
#[derive(Debug, Clone, Serialize)]
pub struct Ranked<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance: f64,
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Haversine distance rounded to one decimal place. Reported distances are
/// always in this precision.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    (haversine_km(a, b) * 10.0).round() / 10.0
}

/// The `limit` candidates nearest to `origin`, ascending by distance. Equal
/// distances keep their input order.
pub fn find_nearest<T>(origin: &GeoPoint, candidates: &[T], limit: usize) -> Vec<Ranked<T>>
where
    T: Located + Clone,
{
    let mut ranked: Vec<Ranked<T>> = candidates
        .iter()
        .map(|candidate| Ranked {
            distance: distance_km(origin, &candidate.position()),
            item: candidate.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked.truncate(limit);
    ranked
}

pub fn within_radius<T>(origin: &GeoPoint, candidates: &[T], radius_km: f64) -> Vec<Ranked<T>>
where
    T: Located + Clone,
{
    find_nearest(origin, candidates, candidates.len())
        .into_iter()
        .take_while(|ranked| ranked.distance <= radius_km)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{distance_km, find_nearest, haversine_km, within_radius, Located};
    use crate::models::location::GeoPoint;

    // Kilometres per degree of latitude on the 6371 km sphere.
    const KM_PER_DEGREE: f64 = 111.194_926_644_558_73;

    #[derive(Debug, Clone, PartialEq)]
    struct Unit {
        name: &'static str,
        at: GeoPoint,
    }

    impl Located for Unit {
        fn position(&self) -> GeoPoint {
            self.at
        }
    }

    fn north_of(origin: GeoPoint, km: f64) -> GeoPoint {
        GeoPoint::new(origin.lat + km / KM_PER_DEGREE, origin.lng)
    }

    fn unit(name: &'static str, at: GeoPoint) -> Unit {
        Unit { name, at }
    }

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint::new(53.5511, 9.9937);
        assert!(haversine_km(&p, &p) < 1e-9);
        assert_eq!(distance_km(&p, &p), 0.0);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let distance = haversine_km(&london, &paris);
        assert!((distance - 343.0).abs() < 5.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (GeoPoint::new(37.7, -122.4), GeoPoint::new(37.8, -122.5)),
            (GeoPoint::new(-33.86, 151.2), GeoPoint::new(35.68, 139.69)),
            (GeoPoint::new(0.0, 179.9), GeoPoint::new(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance_km(&a, &b), distance_km(&b, &a));
        }
    }

    #[test]
    fn distance_is_rounded_to_one_decimal() {
        let origin = GeoPoint::new(10.0, 20.0);
        assert_eq!(distance_km(&origin, &north_of(origin, 3.04)), 3.0);
        assert_eq!(distance_km(&origin, &north_of(origin, 2.96)), 3.0);
        assert_eq!(distance_km(&origin, &north_of(origin, 3.16)), 3.2);
    }

    #[test]
    fn nearest_two_of_three_in_ascending_order() {
        let origin = GeoPoint::new(37.7749, -122.4194);
        let fleet = vec![
            unit("a", north_of(origin, 1.2)),
            unit("b", north_of(origin, 3.7)),
            unit("c", north_of(origin, 0.4)),
        ];

        let nearest = find_nearest(&origin, &fleet, 2);

        assert_eq!(nearest.len(), 2);
        assert_eq!(nearest[0].item.name, "c");
        assert_eq!(nearest[0].distance, 0.4);
        assert_eq!(nearest[1].item.name, "a");
        assert_eq!(nearest[1].distance, 1.2);
    }

    #[test]
    fn limit_larger_than_input_returns_everything_sorted() {
        let origin = GeoPoint::new(0.0, 0.0);
        let fleet = vec![
            unit("far", north_of(origin, 9.0)),
            unit("near", north_of(origin, 1.0)),
            unit("mid", north_of(origin, 4.0)),
        ];

        let nearest = find_nearest(&origin, &fleet, 10);

        assert_eq!(nearest.len(), fleet.len());
        assert!(nearest.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(nearest.iter().all(|r| fleet.contains(&r.item)));
        assert!(find_nearest(&origin, &fleet, 0).is_empty());
        assert!(find_nearest::<Unit>(&origin, &[], 3).is_empty());
    }

    #[test]
    fn equal_distances_keep_input_order() {
        let origin = GeoPoint::new(0.0, 0.0);
        let fleet = vec![
            unit("first", north_of(origin, 2.0)),
            unit("second", north_of(origin, 2.02)),
            unit("closest", north_of(origin, 0.5)),
        ];

        let names: Vec<_> = find_nearest(&origin, &fleet, 3)
            .into_iter()
            .map(|r| r.item.name)
            .collect();

        assert_eq!(names, vec!["closest", "first", "second"]);
    }

    #[test]
    fn radius_filter_drops_distant_candidates() {
        let origin = GeoPoint::new(0.0, 0.0);
        let fleet = vec![
            unit("outside", north_of(origin, 7.0)),
            unit("inside", north_of(origin, 4.0)),
        ];

        let found = within_radius(&origin, &fleet, 5.0);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].item.name, "inside");
    }
}
