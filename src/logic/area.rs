use super::pool::{CancelSignal, WorkerPool};
use super::status::DryingStatusCalculator;
use crate::datasources::WeatherContext;
use crate::error::{CragError, Result};
use crate::models::{
    AreaDryingStats, AreaOutcome, ClimbingRoute, DryingBucket, StatusReport,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One route's contribution to an area aggregate
#[derive(Debug)]
pub struct RouteResult {
    pub report: Result<StatusReport>,
    pub tree_coverage_percent: Option<f64>,
}

/// Folds per-route drying status into area statistics.
///
/// Routes that are not applicable (no GPS) or have no usable data at all are
/// excluded from the counts but deflate the confidence score. Degraded
/// estimates are counted.
pub struct AreaAggregator {
    calculator: Arc<DryingStatusCalculator>,
    pool: WorkerPool,
}

impl AreaAggregator {
    pub fn new(calculator: Arc<DryingStatusCalculator>, pool: WorkerPool) -> Self {
        Self { calculator, pool }
    }

    pub fn compute_area_stats(
        &self,
        area_id: &str,
        routes: &[ClimbingRoute],
        ctx: &WeatherContext,
        now: DateTime<Utc>,
    ) -> AreaOutcome {
        let (outcome, _) =
            self.compute_area_stats_until(area_id, routes, ctx, now, &CancelSignal::new());
        outcome
    }

    /// Sequential aggregation that checks `cancel` before every route.
    ///
    /// Routes not reached when `cancel` fires count as excluded. The returned
    /// flag is true in that case.
    pub fn compute_area_stats_until(
        &self,
        area_id: &str,
        routes: &[ClimbingRoute],
        ctx: &WeatherContext,
        now: DateTime<Utc>,
        cancel: &CancelSignal,
    ) -> (AreaOutcome, bool) {
        let mut results = BTreeMap::new();
        let mut cancelled = false;
        for route in routes {
            let result = if cancelled || cancel.is_cancelled() {
                cancelled = true;
                not_computed(&route.id)
            } else {
                route_result(&self.calculator, route, ctx, now)
            };
            results.insert(route.id.clone(), result);
        }
        if cancelled {
            tracing::warn!(area = %area_id, "Area aggregation cancelled before all routes ran");
        }
        (summarize(area_id, &results), cancelled)
    }

    /// Same as [`compute_area_stats`](Self::compute_area_stats), with the
    /// per-route work spread over the worker pool.
    ///
    /// Routes left unprocessed when `cancel` fires count as excluded. The
    /// returned flag is true in that case.
    pub async fn compute_area_stats_concurrent(
        &self,
        area_id: &str,
        routes: Vec<ClimbingRoute>,
        ctx: Arc<WeatherContext>,
        now: DateTime<Utc>,
        cancel: &CancelSignal,
    ) -> (AreaOutcome, bool) {
        let ids: Vec<String> = routes.iter().map(|r| r.id.clone()).collect();
        let calculator = Arc::clone(&self.calculator);

        let outcome = self
            .pool
            .run(routes, cancel, move |route: ClimbingRoute| {
                let calculator = Arc::clone(&calculator);
                let ctx = Arc::clone(&ctx);
                async move { Ok::<_, CragError>(route_result(&calculator, &route, &ctx, now)) }
            })
            .await;

        let mut results: BTreeMap<String, RouteResult> = BTreeMap::new();
        for (route, result) in outcome.completed {
            results.insert(route.id, result);
        }
        for (route, e) in outcome.failed {
            results.insert(
                route.id,
                RouteResult {
                    report: Err(e),
                    tree_coverage_percent: None,
                },
            );
        }
        for id in ids {
            results.entry(id.clone()).or_insert_with(|| not_computed(&id));
        }

        (summarize(area_id, &results), outcome.cancelled)
    }
}

fn route_result(
    calculator: &DryingStatusCalculator,
    route: &ClimbingRoute,
    ctx: &WeatherContext,
    now: DateTime<Utc>,
) -> RouteResult {
    let tree = ctx.tree_coverage_for(route);
    RouteResult {
        report: calculator.compute_status(route, ctx.weather_for(route), tree, now),
        tree_coverage_percent: tree,
    }
}

fn not_computed(route_id: &str) -> RouteResult {
    RouteResult {
        report: Err(CragError::DataUnavailable(format!(
            "route {} not computed",
            route_id
        ))),
        tree_coverage_percent: None,
    }
}

/// Fold route results into an area outcome.
///
/// Iterates in route-id order so floating-point sums do not depend on the
/// order in which results arrived.
pub fn summarize(area_id: &str, results: &BTreeMap<String, RouteResult>) -> AreaOutcome {
    let mut dry_count = 0;
    let mut drying_count = 0;
    let mut wet_count = 0;
    let mut excluded_count = 0;
    let mut hours_sum = 0.0;
    let mut confidence_sum = 0.0;
    let mut tree_sum = 0.0;
    let mut tree_count = 0usize;
    let mut last_rain_at: Option<DateTime<Utc>> = None;

    for (route_id, result) in results {
        let report = match &result.report {
            Ok(report) => report,
            Err(e) => {
                tracing::debug!(area = %area_id, route = %route_id, "Excluded from area: {}", e);
                excluded_count += 1;
                continue;
            }
        };

        let status = &report.status;
        match status.bucket() {
            DryingBucket::Dry => dry_count += 1,
            DryingBucket::Drying => drying_count += 1,
            DryingBucket::Wet => wet_count += 1,
        }
        hours_sum += status.hours_until_dry;
        confidence_sum += f64::from(status.confidence_score);
        if let Some(pct) = result.tree_coverage_percent {
            tree_sum += pct;
            tree_count += 1;
        }
        last_rain_at = match (last_rain_at, status.last_rain_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    let included = dry_count + drying_count + wet_count;
    if included == 0 {
        tracing::info!(area = %area_id, excluded = excluded_count, "No usable route data for area");
        return AreaOutcome::NoData {
            area_id: area_id.to_string(),
            excluded: excluded_count,
        };
    }

    let n = included as f64;
    let inclusion = n / (included + excluded_count) as f64;
    let confidence = (confidence_sum / n) * inclusion;

    let stats = AreaDryingStats {
        area_id: area_id.to_string(),
        total_routes: included,
        dry_count,
        drying_count,
        wet_count,
        excluded_count,
        percent_dry: ((dry_count as f64 / n) * 100.0).round() as u8,
        avg_hours_until_dry: ((hours_sum / n) * 10.0).round() / 10.0,
        avg_tree_coverage: (tree_count > 0).then(|| tree_sum / tree_count as f64),
        confidence_score: confidence.clamp(0.0, 100.0).round() as u8,
        last_rain_at,
    };

    tracing::debug!(
        area = %area_id,
        total = stats.total_routes,
        dry = stats.dry_count,
        excluded = stats.excluded_count,
        "Area stats computed"
    );
    AreaOutcome::Stats(stats)
}
