//! Great-circle distance and nearest-neighbour ranking
//!
//! Every call recomputes distances over the whole catalog, which is fine for
//! catalogs up to roughly a thousand entries. No spatial index is kept.

use crate::models::{GeoPoint, LocationEntry, RosterEntry};
use serde::{Deserialize, Serialize};

/// A catalog item together with its distance from the query point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult<T> {
    pub item: T,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

impl<T> RankedResult<T> {
    /// Replace the item while keeping its distance
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RankedResult<U> {
        RankedResult {
            item: f(self.item),
            distance_km: self.distance_km,
        }
    }
}

/// Anything with a position on the globe
pub trait Located {
    fn point(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn point(&self) -> GeoPoint {
        *self
    }
}

impl Located for LocationEntry {
    fn point(&self) -> GeoPoint {
        self.point
    }
}

impl Located for RosterEntry {
    fn point(&self) -> GeoPoint {
        self.point
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn point(&self) -> GeoPoint {
        (**self).point()
    }
}

/// Haversine distance in kilometers on a sphere of radius 6371 km
#[must_use]
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine::distance(
        haversine::Location {
            latitude: a.latitude(),
            longitude: a.longitude(),
        },
        haversine::Location {
            latitude: b.latitude(),
            longitude: b.longitude(),
        },
        haversine::Units::Kilometers,
    )
}

fn rank<T: Located>(point: &GeoPoint, catalog: impl IntoIterator<Item = T>) -> Vec<RankedResult<T>> {
    let mut ranked: Vec<RankedResult<T>> = catalog
        .into_iter()
        .map(|item| {
            let distance_km = distance_km(point, &item.point());
            RankedResult { item, distance_km }
        })
        .collect();
    // Stable: equal distances keep catalog order
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

/// The `n` catalog entries closest to `point`, closest first
#[must_use]
pub fn nearest<T: Located>(
    point: &GeoPoint,
    catalog: impl IntoIterator<Item = T>,
    n: usize,
) -> Vec<RankedResult<T>> {
    let mut ranked = rank(point, catalog);
    ranked.truncate(n);
    ranked
}

/// All catalog entries within `radius_km` of `point`, closest first
#[must_use]
pub fn within_radius<T: Located>(
    point: &GeoPoint,
    catalog: impl IntoIterator<Item = T>,
    radius_km: f64,
) -> Vec<RankedResult<T>> {
    let mut ranked = rank(point, catalog);
    ranked.retain(|result| result.distance_km <= radius_km);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn catalog() -> Vec<LocationEntry> {
        vec![
            LocationEntry::new("far", "Far Site", point(46.0, 7.0)),
            LocationEntry::new("near", "Near Site", point(45.01, 6.0)),
            LocationEntry::new("same", "Same Site", point(45.0, 6.0)),
            LocationEntry::new("twin", "Twin Site", point(45.01, 6.0)),
        ]
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = point(40.0, -74.0);
        assert_eq!(distance_km(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = point(40.0, -74.0);
        let b = point(51.5, -0.12);
        assert!((distance_km(&a, &b) - distance_km(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_along_equator() {
        let d = distance_km(&point(0.0, 0.0), &point(0.0, 1.0));
        assert!((d - 111.19).abs() < 1.11, "got {d}");
    }

    #[test]
    fn test_nearest_orders_and_truncates() {
        let sites = catalog();
        let center = point(45.0, 6.0);

        let ranked = nearest(&center, &sites, 3);
        assert_eq!(ranked.len(), 3);
        let ids: Vec<&str> = ranked.iter().map(|r| r.item.id.as_str()).collect();
        // Ties keep catalog order
        assert_eq!(ids, vec!["same", "near", "twin"]);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn test_nearest_with_small_catalog() {
        let sites = catalog();
        let ranked = nearest(&point(0.0, 0.0), sites.iter(), 10);
        assert_eq!(ranked.len(), sites.len());
        assert_eq!(ranked.last().unwrap().item.id, "far");
    }

    #[test]
    fn test_nearest_empty_and_zero() {
        let empty: Vec<LocationEntry> = Vec::new();
        assert!(nearest(&point(0.0, 0.0), empty, 5).is_empty());
        assert!(nearest(&point(0.0, 0.0), catalog(), 0).is_empty());
    }

    #[test]
    fn test_within_radius() {
        let sites = catalog();
        let nearby = within_radius(&point(45.0, 6.0), &sites, 50.0);
        assert_eq!(nearby.len(), 3);
        assert!(nearby.iter().all(|r| r.item.id != "far"));
    }
}
