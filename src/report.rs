//! Plain-text rendering of engine results for the terminal.

use cragcast::logic::BatchResult;
use cragcast::models::{
    AreaOutcome, ClimbingRoute, DataQuality, DryingForecastPeriod, StatusReport,
};
use std::fmt::Write;

const TIME_FORMAT: &str = "%a %d %b %H:%M";

/// Merge adjacent periods that share a status.
///
/// The merged period keeps the first period's start and hours-until-dry and
/// sums the rain of everything it absorbed.
pub fn consolidate_periods(periods: &[DryingForecastPeriod]) -> Vec<DryingForecastPeriod> {
    let mut merged: Vec<DryingForecastPeriod> = Vec::with_capacity(periods.len());
    for period in periods {
        match merged.last_mut() {
            Some(prev) if prev.status == period.status => {
                prev.end_time = period.end_time;
                prev.rain_mm += period.rain_mm;
            }
            _ => merged.push(period.clone()),
        }
    }
    merged
}

pub fn render_status(route: &ClimbingRoute, report: &StatusReport) -> String {
    let status = &report.status;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {} [{}]",
        status.status.symbol(),
        route.display_name(),
        status.status.as_str().to_uppercase()
    );
    let _ = writeln!(out, "  {}", status.message);
    if status.is_wet {
        let _ = writeln!(out, "  Hours until dry: {:.1}", status.hours_until_dry);
    }
    if let Some(at) = status.last_rain_at {
        let _ = writeln!(out, "  Last rain: {}", at.format(TIME_FORMAT));
    }
    let _ = writeln!(out, "  Confidence: {}%", status.confidence_score);

    let factors = &status.factors;
    let _ = writeln!(
        out,
        "  Rock: {} ({} porosity{})",
        factors.rock_group.as_str(),
        factors.porosity.as_str(),
        if factors.rock_type_assumed { ", assumed" } else { "" }
    );
    if let DataQuality::Degraded { reason } = &report.quality {
        let _ = writeln!(out, "  Estimate degraded: {}", reason);
    }
    out
}

pub fn render_forecast(route: &ClimbingRoute, periods: &[DryingForecastPeriod]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Drying forecast for {}", route.display_name());

    for period in periods {
        let end = match period.end_time {
            Some(end) => end.format(TIME_FORMAT).to_string(),
            None => "end of forecast".to_string(),
        };
        let _ = write!(
            out,
            "  {} {} -> {}  {}",
            period.status.symbol(),
            period.start_time.format(TIME_FORMAT),
            end,
            period.status.as_str()
        );
        if period.hours_until_dry > 0.0 {
            let _ = write!(out, ", {:.1}h to dry", period.hours_until_dry);
        }
        if period.rain_mm > 0.0 {
            let _ = write!(out, ", {:.1}mm rain", period.rain_mm);
        }
        out.push('\n');
    }
    out
}

pub fn render_area(outcome: &AreaOutcome) -> String {
    let mut out = String::new();
    match outcome {
        AreaOutcome::Stats(stats) => {
            let _ = writeln!(out, "Area {}: {}% dry", stats.area_id, stats.percent_dry);
            let _ = writeln!(
                out,
                "  {} dry, {} drying, {} wet of {} routes",
                stats.dry_count, stats.drying_count, stats.wet_count, stats.total_routes
            );
            if stats.excluded_count > 0 {
                let _ = writeln!(
                    out,
                    "  {} routes excluded (no usable data)",
                    stats.excluded_count
                );
            }
            let _ = writeln!(out, "  Average hours until dry: {:.1}", stats.avg_hours_until_dry);
            if let Some(tree) = stats.avg_tree_coverage {
                let _ = writeln!(out, "  Average tree cover: {:.0}%", tree);
            }
            if let Some(at) = stats.last_rain_at {
                let _ = writeln!(out, "  Last rain: {}", at.format(TIME_FORMAT));
            }
            let _ = writeln!(out, "  Confidence: {}%", stats.confidence_score);
        }
        AreaOutcome::NoData { area_id, excluded } => {
            let _ = writeln!(
                out,
                "Area {}: insufficient data ({} routes without usable data)",
                area_id, excluded
            );
        }
    }
    out
}

pub fn render_route_batch(batch: &BatchResult<StatusReport>) -> String {
    let mut out = String::new();
    for (id, report) in &batch.results {
        let status = &report.status;
        let _ = writeln!(
            out,
            "{} {:<24} {:<8} {:>6.1}h  {}%",
            status.status.symbol(),
            id,
            status.status.as_str(),
            status.hours_until_dry,
            status.confidence_score
        );
    }
    push_batch_footer(&mut out, &batch.failed, batch.cancelled);
    out
}

pub fn render_area_batch(batch: &BatchResult<AreaOutcome>) -> String {
    let mut out = String::new();
    for outcome in batch.results.values() {
        out.push_str(&render_area(outcome));
    }
    push_batch_footer(&mut out, &batch.failed, batch.cancelled);
    out
}

fn push_batch_footer(out: &mut String, failed: &[String], cancelled: bool) {
    if !failed.is_empty() {
        let _ = writeln!(out, "Skipped: {}", failed.join(", "));
    }
    if cancelled {
        let _ = writeln!(out, "Timed out - results are partial");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use cragcast::models::{AreaDryingStats, DryingTier};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
    }

    fn period(
        from_h: i64,
        to_h: Option<i64>,
        status: DryingTier,
        rain: f64,
    ) -> DryingForecastPeriod {
        DryingForecastPeriod {
            start_time: start() + Duration::hours(from_h),
            end_time: to_h.map(|h| start() + Duration::hours(h)),
            status,
            hours_until_dry: if status == DryingTier::Good { 0.0 } else { 5.0 },
            rain_mm: rain,
        }
    }

    #[test]
    fn merges_adjacent_same_status() {
        let periods = vec![
            period(0, Some(10), DryingTier::Good, 0.0),
            period(10, Some(13), DryingTier::Poor, 4.0),
            period(13, Some(20), DryingTier::Poor, 1.0),
            period(20, Some(30), DryingTier::Good, 0.0),
            period(30, None, DryingTier::Good, 0.0),
        ];
        let merged = consolidate_periods(&periods);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].start_time, start() + Duration::hours(10));
        assert_eq!(merged[1].end_time, Some(start() + Duration::hours(20)));
        assert!((merged[1].rain_mm - 5.0).abs() < 1e-9);
        assert!(merged[2].end_time.is_none());
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(consolidate_periods(&[]).is_empty());
    }

    #[test]
    fn forecast_rendering_marks_open_end() {
        let route = ClimbingRoute::new("r1", "eldo");
        let text = render_forecast(&route, &[period(0, None, DryingTier::Good, 0.0)]);
        assert!(text.contains("end of forecast"));
        assert!(text.contains("r1"));
    }

    #[test]
    fn area_rendering() {
        let stats = AreaOutcome::Stats(AreaDryingStats {
            area_id: "eldo".into(),
            total_routes: 10,
            dry_count: 8,
            drying_count: 0,
            wet_count: 2,
            excluded_count: 0,
            percent_dry: 80,
            avg_hours_until_dry: 3.2,
            avg_tree_coverage: None,
            confidence_score: 90,
            last_rain_at: None,
        });
        assert!(render_area(&stats).contains("80% dry"));

        let none = AreaOutcome::NoData {
            area_id: "lumpy".into(),
            excluded: 3,
        };
        assert!(render_area(&none).contains("insufficient data"));
    }
}
