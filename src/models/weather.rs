use super::route::Hemisphere;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// One point of a weather series (observed or forecast).
///
/// Precipitation is the amount accumulated over the sample interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub timestamp: DateTime<Utc>,
    pub precipitation_mm: f64,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
    pub cloud_cover_percent: f64,
}

impl WeatherSample {
    pub fn is_rain(&self, threshold_mm: f64) -> bool {
        self.precipitation_mm > threshold_mm
    }
}

/// Historical and forecast series for one weather cell
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationWeather {
    #[serde(default)]
    pub history: Vec<WeatherSample>,
    #[serde(default)]
    pub forecast: Vec<WeatherSample>,
}

impl LocationWeather {
    pub fn new(history: Vec<WeatherSample>, forecast: Vec<WeatherSample>) -> Self {
        Self { history, forecast }.normalized()
    }

    /// Sort both series by timestamp; providers do not always deliver them in order
    pub fn normalized(mut self) -> Self {
        self.history.sort_by_key(|s| s.timestamp);
        self.forecast.sort_by_key(|s| s.timestamp);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.forecast.is_empty()
    }

    /// Samples observed at or before `now`
    pub fn history_until(&self, now: DateTime<Utc>) -> &[WeatherSample] {
        let end = self.history.partition_point(|s| s.timestamp <= now);
        &self.history[..end]
    }

    /// Hours of history available before `now`
    pub fn history_span_hours(&self, now: DateTime<Utc>) -> f64 {
        match self.history_until(now).first() {
            Some(first) => (now - first.timestamp).num_minutes().max(0) as f64 / 60.0,
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_date(date: DateTime<Utc>, hemisphere: Hemisphere) -> Self {
        let northern = match date.month() {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        };
        match hemisphere {
            Hemisphere::Northern => northern,
            Hemisphere::Southern => northern.opposite(),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Season::Winter => Season::Summer,
            Season::Spring => Season::Autumn,
            Season::Summer => Season::Winter,
            Season::Autumn => Season::Spring,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }

    /// Typical hours of daylight at mid latitudes
    pub fn daylight_hours(&self) -> f64 {
        match self {
            Season::Winter => 9.0,
            Season::Spring => 12.5,
            Season::Summer => 15.0,
            Season::Autumn => 11.5,
        }
    }

    /// Climate normals used when no weather series is available
    pub fn typical_conditions(&self) -> SeasonalNormals {
        match self {
            Season::Winter => SeasonalNormals {
                temperature_c: 3.0,
                humidity_percent: 80.0,
                wind_speed_kmh: 12.0,
                cloud_cover_percent: 70.0,
            },
            Season::Spring => SeasonalNormals {
                temperature_c: 12.0,
                humidity_percent: 65.0,
                wind_speed_kmh: 12.0,
                cloud_cover_percent: 55.0,
            },
            Season::Summer => SeasonalNormals {
                temperature_c: 22.0,
                humidity_percent: 55.0,
                wind_speed_kmh: 10.0,
                cloud_cover_percent: 35.0,
            },
            Season::Autumn => SeasonalNormals {
                temperature_c: 11.0,
                humidity_percent: 72.0,
                wind_speed_kmh: 11.0,
                cloud_cover_percent: 60.0,
            },
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalNormals {
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
    pub cloud_cover_percent: f64,
}
