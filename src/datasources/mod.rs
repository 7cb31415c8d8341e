pub mod snapshot;

pub use snapshot::SnapshotSource;

use crate::error::Result;
use crate::models::{ClimbingRoute, GeoPoint, LocationWeather};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

/// Supplier of route metadata, weather series and canopy coverage.
///
/// `route` and `area_routes` return `NotFound` for unknown ids. `weather` and
/// `tree_coverage` return `Ok(None)` when the provider simply has nothing for
/// the location; errors are reserved for provider failures.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn route(&self, route_id: &str) -> Result<ClimbingRoute>;

    async fn area_routes(&self, area_id: &str) -> Result<Vec<ClimbingRoute>>;

    async fn weather(&self, location: &GeoPoint) -> Result<Option<LocationWeather>>;

    async fn tree_coverage(&self, route: &ClimbingRoute) -> Result<Option<f64>>;
}

/// Pre-fetched, read-only inputs for a set of routes.
///
/// Weather is keyed by grid cell so routes on the same crag share one series.
#[derive(Debug, Clone, Default)]
pub struct WeatherContext {
    weather: HashMap<(i64, i64), LocationWeather>,
    tree_coverage: HashMap<String, f64>,
}

impl WeatherContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch everything `routes` need, one weather request per distinct cell.
    ///
    /// Provider failures are logged and leave the entry empty; the affected
    /// routes then take the degraded path.
    pub async fn gather<S: DataSource + ?Sized>(source: &S, routes: &[ClimbingRoute]) -> Self {
        let mut ctx = Self::new();

        let cells: BTreeSet<(i64, i64)> = routes
            .iter()
            .filter_map(|r| r.usable_location())
            .map(|p| p.grid_key())
            .collect();

        for cell in cells {
            let Some(point) = routes
                .iter()
                .filter_map(|r| r.usable_location())
                .find(|p| p.grid_key() == cell)
            else {
                continue;
            };

            match source.weather(&point).await {
                Ok(Some(weather)) => {
                    ctx.weather.insert(cell, weather.normalized());
                }
                Ok(None) => {
                    tracing::debug!(
                        lat = point.latitude,
                        lon = point.longitude,
                        "No weather for cell"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        lat = point.latitude,
                        lon = point.longitude,
                        "Weather fetch failed: {}",
                        e
                    );
                }
            }
        }

        for route in routes {
            match source.tree_coverage(route).await {
                Ok(Some(pct)) => {
                    ctx.tree_coverage.insert(route.id.clone(), pct);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(route = %route.id, "Tree coverage fetch failed: {}", e);
                }
            }
        }

        tracing::debug!(
            routes = routes.len(),
            cells = ctx.cell_count(),
            "Gathered weather context"
        );
        ctx
    }

    pub fn insert_weather(&mut self, location: GeoPoint, weather: LocationWeather) {
        self.weather.insert(location.grid_key(), weather.normalized());
    }

    pub fn insert_tree_coverage(&mut self, route_id: impl Into<String>, percent: f64) {
        self.tree_coverage.insert(route_id.into(), percent);
    }

    pub fn weather_for(&self, route: &ClimbingRoute) -> Option<&LocationWeather> {
        route
            .usable_location()
            .and_then(|p| self.weather.get(&p.grid_key()))
    }

    pub fn tree_coverage_for(&self, route: &ClimbingRoute) -> Option<f64> {
        self.tree_coverage.get(&route.id).copied()
    }

    pub fn cell_count(&self) -> usize {
        self.weather.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CragError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        weather_calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for CountingSource {
        async fn route(&self, route_id: &str) -> Result<ClimbingRoute> {
            Err(CragError::NotFound(route_id.to_string()))
        }

        async fn area_routes(&self, area_id: &str) -> Result<Vec<ClimbingRoute>> {
            Err(CragError::NotFound(area_id.to_string()))
        }

        async fn weather(&self, location: &GeoPoint) -> Result<Option<LocationWeather>> {
            self.weather_calls.fetch_add(1, Ordering::SeqCst);
            if location.latitude > 50.0 {
                return Err(CragError::DataUnavailable("provider down".into()));
            }
            Ok(Some(LocationWeather::default()))
        }

        async fn tree_coverage(&self, route: &ClimbingRoute) -> Result<Option<f64>> {
            Ok((route.id == "shaded").then_some(70.0))
        }
    }

    #[tokio::test]
    async fn gather_fetches_each_cell_once() {
        let source = CountingSource {
            weather_calls: AtomicUsize::new(0),
        };
        let routes = vec![
            ClimbingRoute::new("a", "crag").with_location(40.0001, -105.0001),
            ClimbingRoute::new("b", "crag").with_location(40.0002, -105.0002),
            ClimbingRoute::new("shaded", "crag").with_location(41.0, -105.0),
            ClimbingRoute::new("no-gps", "crag"),
        ];

        let ctx = WeatherContext::gather(&source, &routes).await;
        assert_eq!(source.weather_calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.cell_count(), 2);
        assert!(ctx.weather_for(&routes[0]).is_some());
        assert!(ctx.weather_for(&routes[3]).is_none());
        assert_eq!(ctx.tree_coverage_for(&routes[2]), Some(70.0));
        assert_eq!(ctx.tree_coverage_for(&routes[0]), None);
    }

    #[tokio::test]
    async fn provider_failure_leaves_cell_empty() {
        let source = CountingSource {
            weather_calls: AtomicUsize::new(0),
        };
        let routes = vec![ClimbingRoute::new("north", "crag").with_location(60.0, 10.0)];
        let ctx = WeatherContext::gather(&source, &routes).await;
        assert_eq!(ctx.cell_count(), 0);
        assert!(ctx.weather_for(&routes[0]).is_none());
    }
}
