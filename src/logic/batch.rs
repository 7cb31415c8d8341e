use super::area::AreaAggregator;
use super::pool::{CancelSignal, PoolOutcome, WorkerPool};
use super::status::DryingStatusCalculator;
use crate::config::{BatchConfig, Config};
use crate::datasources::{DataSource, WeatherContext};
use crate::error::{CragError, Result};
use crate::models::{AreaOutcome, GeoPoint, LocationWeather, StatusReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

/// Results of a batch, keyed by id. Ids whose computation failed are listed
/// in `failed` and absent from `results`.
#[derive(Debug, Serialize)]
pub struct BatchResult<T> {
    pub results: BTreeMap<String, T>,
    pub failed: Vec<String>,
    pub cancelled: bool,
}

impl<T> BatchResult<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Weather per grid cell, fetched at most once per batch
#[derive(Default)]
struct WeatherCache {
    cells: Mutex<HashMap<(i64, i64), Arc<OnceCell<Option<Arc<LocationWeather>>>>>>,
}

impl WeatherCache {
    async fn get<S: DataSource + ?Sized>(
        &self,
        source: &S,
        location: GeoPoint,
    ) -> Option<Arc<LocationWeather>> {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(location.grid_key()).or_default())
        };

        cell.get_or_init(|| async {
            match with_retry("weather", || source.weather(&location)).await {
                Ok(weather) => weather.map(|w| Arc::new(w.normalized())),
                Err(e) => {
                    tracing::warn!(
                        lat = location.latitude,
                        lon = location.longitude,
                        "Weather fetch failed: {}",
                        e
                    );
                    None
                }
            }
        })
        .await
        .clone()
    }
}

/// Bounded fan-out of route and area calculations over a fixed worker pool.
pub struct BatchCoordinator<S: DataSource + 'static> {
    source: Arc<S>,
    calculator: Arc<DryingStatusCalculator>,
    pool: WorkerPool,
    limits: BatchConfig,
}

impl<S: DataSource + 'static> BatchCoordinator<S> {
    pub fn new(source: Arc<S>, config: &Config) -> Self {
        Self {
            source,
            calculator: Arc::new(DryingStatusCalculator::new(config)),
            pool: WorkerPool::new(config.batch.workers),
            limits: config.batch.clone(),
        }
    }

    /// Cancellation signal carrying the configured default timeout
    pub fn default_signal(&self) -> CancelSignal {
        CancelSignal::with_timeout(Duration::from_secs(self.limits.timeout_secs))
    }

    pub async fn compute_routes(
        &self,
        route_ids: &[String],
        now: DateTime<Utc>,
        cancel: &CancelSignal,
    ) -> Result<BatchResult<StatusReport>> {
        let ids = validate_ids(route_ids, self.limits.max_batch_routes, "route")?;
        let requested = ids.len();
        tracing::debug!(requested, workers = self.pool.workers(), "Starting route batch");

        let source = Arc::clone(&self.source);
        let calculator = Arc::clone(&self.calculator);
        let cache = Arc::new(WeatherCache::default());

        let outcome = self
            .pool
            .run(ids, cancel, move |id: String| {
                let source = Arc::clone(&source);
                let calculator = Arc::clone(&calculator);
                let cache = Arc::clone(&cache);
                async move {
                    let route = with_retry("route", || source.route(&id)).await?;
                    let weather = match route.usable_location() {
                        Some(location) => cache.get(source.as_ref(), location).await,
                        None => None,
                    };
                    let tree = with_retry("tree coverage", || source.tree_coverage(&route))
                        .await
                        .unwrap_or_else(|e| {
                            tracing::warn!(route = %route.id, "Tree coverage fetch failed: {}", e);
                            None
                        });
                    calculator.compute_status(&route, weather.as_deref(), tree, now)
                }
            })
            .await;

        Ok(collect("route", requested, outcome))
    }

    pub async fn compute_areas(
        &self,
        area_ids: &[String],
        now: DateTime<Utc>,
        cancel: &CancelSignal,
    ) -> Result<BatchResult<AreaOutcome>> {
        let ids = validate_ids(area_ids, self.limits.max_batch_areas, "area")?;
        let requested = ids.len();
        tracing::debug!(requested, workers = self.pool.workers(), "Starting area batch");

        let source = Arc::clone(&self.source);
        let aggregator = Arc::new(AreaAggregator::new(Arc::clone(&self.calculator), self.pool));
        let task_cancel = cancel.clone();

        let outcome = self
            .pool
            .run(ids, cancel, move |id: String| {
                let source = Arc::clone(&source);
                let aggregator = Arc::clone(&aggregator);
                let cancel = task_cancel.clone();
                async move {
                    let routes = with_retry("area routes", || source.area_routes(&id)).await?;
                    let ctx = WeatherContext::gather(source.as_ref(), &routes).await;
                    Ok::<_, CragError>(
                        aggregator.compute_area_stats_until(&id, &routes, &ctx, now, &cancel),
                    )
                }
            })
            .await;

        // An area cut short mid-way is returned with its unreached routes excluded
        let cut_short = outcome.completed.iter().any(|(_, (_, partial))| *partial);
        let outcome = PoolOutcome {
            completed: outcome
                .completed
                .into_iter()
                .map(|(id, (area, _))| (id, area))
                .collect(),
            failed: outcome.failed,
            cancelled: outcome.cancelled || cut_short,
        };

        Ok(collect("area", requested, outcome))
    }
}

/// Reject empty or oversized requests and collapse duplicates, keeping first-seen order.
fn validate_ids(ids: &[String], cap: usize, kind: &str) -> Result<Vec<String>> {
    if ids.is_empty() {
        return Err(CragError::InvalidArgument(format!("no {} ids given", kind)));
    }
    if ids.len() > cap {
        return Err(CragError::InvalidArgument(format!(
            "{} {} ids requested, at most {} allowed",
            ids.len(),
            kind,
            cap
        )));
    }

    let mut seen = HashSet::new();
    Ok(ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect())
}

/// Call the source, retrying once when the error is transient
async fn with_retry<T, F, Fut>(what: &str, fetch: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match fetch().await {
        Err(e) if e.is_retryable() => {
            tracing::debug!(what, "Retrying after transient failure: {}", e);
            fetch().await
        }
        other => other,
    }
}

fn collect<T>(kind: &str, requested: usize, outcome: PoolOutcome<String, T>) -> BatchResult<T> {
    let mut failed: Vec<String> = Vec::with_capacity(outcome.failed.len());
    for (id, e) in outcome.failed {
        tracing::warn!(kind, id = %id, "Batch item failed: {}", e);
        failed.push(id);
    }
    failed.sort();

    let results: BTreeMap<String, T> = outcome.completed.into_iter().collect();

    tracing::info!(
        kind,
        requested,
        computed = results.len(),
        failed = failed.len(),
        cancelled = outcome.cancelled,
        "Batch complete"
    );

    BatchResult {
        results,
        failed,
        cancelled: outcome.cancelled,
    }
}
