use crate::models::{Season, SeasonalNormals, WeatherSample};
use chrono::{DateTime, Duration, Utc};

/// A maximal run of consecutive rainy samples
#[derive(Debug, Clone, PartialEq)]
pub struct RainEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub amount_mm: f64,
    pub sample_count: usize,
}

/// Averaged drying conditions over a stretch of samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
    pub cloud_cover_percent: f64,
}

impl From<&WeatherSample> for Conditions {
    fn from(sample: &WeatherSample) -> Self {
        Self {
            temperature_c: sample.temperature_c,
            humidity_percent: sample.humidity_percent,
            wind_speed_kmh: sample.wind_speed_kmh,
            cloud_cover_percent: sample.cloud_cover_percent,
        }
    }
}

impl From<SeasonalNormals> for Conditions {
    fn from(normals: SeasonalNormals) -> Self {
        Self {
            temperature_c: normals.temperature_c,
            humidity_percent: normals.humidity_percent,
            wind_speed_kmh: normals.wind_speed_kmh,
            cloud_cover_percent: normals.cloud_cover_percent,
        }
    }
}

/// Find the most recent rain event in `history` that ended at or before `now`
/// and inside the lookback window.
///
/// `history` must be sorted by timestamp. Samples further apart than
/// `max_gap` are not contiguous, so a gap in the series ends the event.
pub fn find_last_rain_event(
    history: &[WeatherSample],
    now: DateTime<Utc>,
    lookback: Duration,
    threshold_mm: f64,
    max_gap: Duration,
) -> Option<RainEvent> {
    let window_start = now - lookback;
    let window: Vec<&WeatherSample> = history
        .iter()
        .filter(|s| s.timestamp >= window_start && s.timestamp <= now)
        .collect();

    let last_rain = window.iter().rposition(|s| s.is_rain(threshold_mm))?;

    let mut first = last_rain;
    while first > 0 {
        let prev = window[first - 1];
        let contiguous = window[first].timestamp - prev.timestamp <= max_gap;
        if !prev.is_rain(threshold_mm) || !contiguous {
            break;
        }
        first -= 1;
    }

    let run = &window[first..=last_rain];
    Some(RainEvent {
        start: run[0].timestamp,
        end: window[last_rain].timestamp,
        amount_mm: total_precipitation(run.iter().copied()),
        sample_count: run.len(),
    })
}

/// Average conditions over a set of samples
pub fn average_conditions<'a>(
    samples: impl IntoIterator<Item = &'a WeatherSample>,
) -> Option<Conditions> {
    let mut count = 0usize;
    let mut sums = [0.0f64; 4];
    for s in samples {
        sums[0] += s.temperature_c;
        sums[1] += s.humidity_percent;
        sums[2] += s.wind_speed_kmh;
        sums[3] += s.cloud_cover_percent;
        count += 1;
    }

    if count == 0 {
        None
    } else {
        let n = count as f64;
        Some(Conditions {
            temperature_c: sums[0] / n,
            humidity_percent: sums[1] / n,
            wind_speed_kmh: sums[2] / n,
            cloud_cover_percent: sums[3] / n,
        })
    }
}

/// Average conditions for samples with `from <= timestamp < to`
pub fn conditions_between(
    samples: &[WeatherSample],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Option<Conditions> {
    average_conditions(
        samples
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp < to),
    )
}

/// Drying conditions since a rain event ended, capped to the most recent
/// `window`. Falls back to the latest sample when nothing follows the event.
pub fn conditions_since(
    history: &[WeatherSample],
    event_end: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> Option<Conditions> {
    let from = event_end.max(now - window);
    average_conditions(
        history
            .iter()
            .filter(|s| s.timestamp > from && s.timestamp <= now),
    )
    .or_else(|| {
        history
            .iter()
            .rev()
            .find(|s| s.timestamp <= now)
            .map(Conditions::from)
    })
}

/// Open-sky sun hours per day given average cloud cover
pub fn effective_sun_hours(cloud_cover_percent: f64, season: Season) -> f64 {
    let clear_fraction = 1.0 - cloud_cover_percent.clamp(0.0, 100.0) / 100.0;
    season.daylight_hours() * clear_fraction
}

/// Calculate total precipitation over a set of samples
pub fn total_precipitation<'a>(samples: impl IntoIterator<Item = &'a WeatherSample>) -> f64 {
    samples
        .into_iter()
        .map(|s| s.precipitation_mm)
        .filter(|p| *p >= 0.0)
        .sum()
}

/// Fraction (0-1) of the lookback window covered by observed history
pub fn history_coverage(span_hours: f64, lookback: Duration) -> f64 {
    let lookback_hours = lookback.num_minutes() as f64 / 60.0;
    if lookback_hours <= 0.0 {
        return 1.0;
    }
    (span_hours / lookback_hours).clamp(0.0, 1.0)
}

pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
    }

    fn sample(hours_ago: i64, precip: f64) -> WeatherSample {
        WeatherSample {
            timestamp: now() - Duration::hours(hours_ago),
            precipitation_mm: precip,
            temperature_c: 20.0,
            humidity_percent: 50.0,
            wind_speed_kmh: 10.0,
            cloud_cover_percent: 20.0,
        }
    }

    fn hourly(precip_oldest_first: &[f64]) -> Vec<WeatherSample> {
        let n = precip_oldest_first.len() as i64;
        precip_oldest_first
            .iter()
            .enumerate()
            .map(|(i, p)| sample(n - 1 - i as i64, *p))
            .collect()
    }

    fn scan(history: &[WeatherSample]) -> Option<RainEvent> {
        find_last_rain_event(
            history,
            now(),
            Duration::days(14),
            0.1,
            Duration::hours(6),
        )
    }

    #[test]
    fn no_rain_means_no_event() {
        let history = hourly(&[0.0, 0.05, 0.0, 0.1, 0.0]);
        assert!(scan(&history).is_none());
    }

    #[test]
    fn finds_most_recent_maximal_run() {
        // oldest ... newest (newest is "now")
        let history = hourly(&[2.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.0]);
        let event = scan(&history).unwrap();
        assert_eq!(event.sample_count, 3);
        assert!((event.amount_mm - 4.5).abs() < 1e-9);
        assert_eq!(event.end, now() - Duration::hours(2));
        assert_eq!(event.start, now() - Duration::hours(4));
    }

    #[test]
    fn gap_in_series_breaks_the_event() {
        let history = vec![sample(30, 4.0), sample(10, 1.0), sample(9, 1.0), sample(1, 0.0)];
        let event = scan(&history).unwrap();
        assert_eq!(event.sample_count, 2);
        assert!((event.amount_mm - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rain_outside_lookback_is_ignored() {
        let history = vec![sample(24 * 15, 10.0), sample(2, 0.0)];
        assert!(scan(&history).is_none());
    }

    #[test]
    fn future_samples_are_ignored() {
        let mut history = hourly(&[0.0, 0.0]);
        history.push(WeatherSample {
            timestamp: now() + Duration::hours(1),
            ..sample(0, 5.0)
        });
        assert!(scan(&history).is_none());
    }

    #[test]
    fn average_conditions_of_samples() {
        let samples = vec![
            WeatherSample {
                temperature_c: 10.0,
                humidity_percent: 80.0,
                ..sample(2, 0.0)
            },
            WeatherSample {
                temperature_c: 20.0,
                humidity_percent: 60.0,
                ..sample(1, 0.0)
            },
        ];
        let c = average_conditions(&samples).unwrap();
        assert!((c.temperature_c - 15.0).abs() < 1e-9);
        assert!((c.humidity_percent - 70.0).abs() < 1e-9);
        assert!(average_conditions(&Vec::<WeatherSample>::new()).is_none());
    }

    #[test]
    fn conditions_since_falls_back_to_latest_sample() {
        let history = hourly(&[0.0, 0.0, 3.0]);
        let c = conditions_since(&history, now(), now(), Duration::hours(24)).unwrap();
        assert!((c.temperature_c - 20.0).abs() < 1e-9);
    }

    #[test]
    fn sun_hours_scale_with_cloud_cover() {
        assert!((effective_sun_hours(0.0, Season::Summer) - 15.0).abs() < 1e-9);
        assert!(effective_sun_hours(100.0, Season::Summer).abs() < 1e-9);
        let winter = effective_sun_hours(50.0, Season::Winter);
        assert!(winter < effective_sun_hours(50.0, Season::Summer));
    }

    #[test]
    fn total_precipitation_skips_negative_values() {
        let samples = vec![sample(3, 1.5), sample(2, -9.0), sample(1, 0.5)];
        assert!((total_precipitation(&samples) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn coverage_fraction() {
        assert!((history_coverage(168.0, Duration::days(14)) - 0.5).abs() < 1e-9);
        assert_eq!(history_coverage(1000.0, Duration::days(14)), 1.0);
        assert_eq!(history_coverage(0.0, Duration::days(14)), 0.0);
    }
}
