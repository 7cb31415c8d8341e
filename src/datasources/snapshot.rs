use super::DataSource;
use crate::error::{CragError, Result};
use crate::models::{ClimbingRoute, GeoPoint, LocationWeather, WeatherSample};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// On-disk snapshot layout
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub routes: Vec<ClimbingRoute>,
    #[serde(default)]
    pub weather: Vec<SnapshotWeather>,
    #[serde(default)]
    pub tree_coverage: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotWeather {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub history: Vec<WeatherSample>,
    #[serde(default)]
    pub forecast: Vec<WeatherSample>,
}

/// `DataSource` backed by a JSON snapshot of routes, weather and canopy cover.
pub struct SnapshotSource {
    routes: BTreeMap<String, ClimbingRoute>,
    weather: HashMap<(i64, i64), LocationWeather>,
    tree_coverage: HashMap<String, f64>,
}

impl SnapshotSource {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let source = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            routes = source.routes.len(),
            cells = source.weather.len(),
            "Loaded snapshot"
        );
        Ok(source)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut routes = BTreeMap::new();
        for route in snapshot.routes {
            if routes.contains_key(&route.id) {
                tracing::warn!(
                    route = %route.id,
                    "Duplicate route in snapshot, keeping the last one"
                );
            }
            routes.insert(route.id.clone(), route);
        }

        let weather = snapshot
            .weather
            .into_iter()
            .map(|w| {
                let key = GeoPoint::new(w.latitude, w.longitude).grid_key();
                (key, LocationWeather::new(w.history, w.forecast))
            })
            .collect();

        Self {
            routes,
            weather,
            tree_coverage: snapshot.tree_coverage.into_iter().collect(),
        }
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Distinct area ids, sorted
    pub fn area_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.routes.values().map(|r| r.area_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn routes(&self) -> impl Iterator<Item = &ClimbingRoute> {
        self.routes.values()
    }
}

#[async_trait]
impl DataSource for SnapshotSource {
    async fn route(&self, route_id: &str) -> Result<ClimbingRoute> {
        self.routes
            .get(route_id)
            .cloned()
            .ok_or_else(|| CragError::NotFound(format!("route {}", route_id)))
    }

    async fn area_routes(&self, area_id: &str) -> Result<Vec<ClimbingRoute>> {
        let routes: Vec<ClimbingRoute> = self
            .routes
            .values()
            .filter(|r| r.area_id == area_id)
            .cloned()
            .collect();
        if routes.is_empty() {
            return Err(CragError::NotFound(format!("area {}", area_id)));
        }
        Ok(routes)
    }

    async fn weather(&self, location: &GeoPoint) -> Result<Option<LocationWeather>> {
        Ok(self.weather.get(&location.grid_key()).cloned())
    }

    async fn tree_coverage(&self, route: &ClimbingRoute) -> Result<Option<f64>> {
        Ok(self.tree_coverage.get(&route.id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SNAPSHOT: &str = r#"{
        "routes": [
            {"id": "r2", "name": "Second", "area_id": "eldo", "location": {"latitude": 39.93, "longitude": -105.28}, "rock_type": "sandstone", "aspect": "S"},
            {"id": "r1", "area_id": "eldo", "location": {"latitude": 39.93, "longitude": -105.28}, "rock_type": "quartzite"},
            {"id": "r3", "area_id": "lumpy"}
        ],
        "weather": [
            {
                "latitude": 39.9301,
                "longitude": -105.2799,
                "history": [
                    {"timestamp": "2026-10-15T11:00:00Z", "precipitation_mm": 0.0, "temperature_c": 12.0, "humidity_percent": 50.0, "wind_speed_kmh": 5.0, "cloud_cover_percent": 10.0},
                    {"timestamp": "2026-10-15T10:00:00Z", "precipitation_mm": 2.0, "temperature_c": 10.0, "humidity_percent": 80.0, "wind_speed_kmh": 5.0, "cloud_cover_percent": 90.0}
                ]
            }
        ],
        "tree_coverage": {"r1": 15.0}
    }"#;

    #[tokio::test]
    async fn loads_snapshot_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();

        let source = SnapshotSource::from_file(file.path()).unwrap();
        assert_eq!(source.route_count(), 3);
        assert_eq!(source.area_ids(), vec!["eldo".to_string(), "lumpy".to_string()]);

        let route = source.route("r2").await.unwrap();
        assert_eq!(route.display_name(), "Second");

        let location = route.usable_location().unwrap();
        let weather = source.weather(&location).await.unwrap().unwrap();
        assert_eq!(weather.history.len(), 2);
        assert!(weather.history[0].timestamp < weather.history[1].timestamp);

        let r1 = source.route("r1").await.unwrap();
        assert_eq!(source.tree_coverage(&r1).await.unwrap(), Some(15.0));
        assert_eq!(source.tree_coverage(&route).await.unwrap(), None);
    }

    #[tokio::test]
    async fn area_routes_in_id_order() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let routes = source.area_routes("eldo").await.unwrap();
        let ids: Vec<&str> = routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        assert!(matches!(source.route("nope").await, Err(CragError::NotFound(_))));
        assert!(matches!(source.area_routes("nope").await, Err(CragError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_cell_has_no_weather() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let far = GeoPoint::new(-33.9, 18.4);
        assert!(source.weather(&far).await.unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            SnapshotSource::from_json("{ not json"),
            Err(CragError::Json(_))
        ));
    }
}
