//! Weather and route fixtures shared by the logic tests.

use crate::models::{Aspect, ClimbingRoute, LocationWeather, WeatherSample};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
}

pub fn sample_at(timestamp: DateTime<Utc>, precipitation_mm: f64, humidity: f64) -> WeatherSample {
    WeatherSample {
        timestamp,
        precipitation_mm,
        temperature_c: 14.0,
        humidity_percent: humidity,
        wind_speed_kmh: 8.0,
        cloud_cover_percent: 40.0,
    }
}

/// Hourly history covering 14 days up to `now`, dry except for `rain`
/// given as `(hours_ago, mm)`.
pub fn history_with_rain(
    now: DateTime<Utc>,
    rain: &[(i64, f64)],
    humidity: f64,
) -> Vec<WeatherSample> {
    (0..=14 * 24)
        .rev()
        .map(|hours_ago| {
            let precip = rain
                .iter()
                .find(|(h, _)| *h == hours_ago)
                .map(|(_, mm)| *mm)
                .unwrap_or(0.0);
            sample_at(now - Duration::hours(hours_ago), precip, humidity)
        })
        .collect()
}

/// Hourly forecast over the next 6 days starting one hour after `now`,
/// dry except for `rain` given as `(hours_ahead, mm)`.
pub fn forecast_with_rain(now: DateTime<Utc>, rain: &[(i64, f64)]) -> Vec<WeatherSample> {
    (1..=6 * 24)
        .map(|hours_ahead| {
            let precip = rain
                .iter()
                .find(|(h, _)| *h == hours_ahead)
                .map(|(_, mm)| *mm)
                .unwrap_or(0.0);
            sample_at(now + Duration::hours(hours_ahead), precip, 60.0)
        })
        .collect()
}

pub fn weather(history_rain: &[(i64, f64)], forecast_rain: &[(i64, f64)]) -> LocationWeather {
    LocationWeather::new(
        history_with_rain(now(), history_rain, 60.0),
        forecast_with_rain(now(), forecast_rain),
    )
}

pub fn route(id: &str, area_id: &str, rock_type: &str) -> ClimbingRoute {
    ClimbingRoute::new(id, area_id)
        .with_location(40.0, -105.3)
        .with_rock_type(rock_type)
        .with_aspect(Aspect::South)
}
