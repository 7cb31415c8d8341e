use super::calculations::{conditions_between, total_precipitation, Conditions};
use super::status::{round_hours, DryingStatusCalculator, RouteContext};
use crate::error::Result;
use crate::models::{
    ClimbingRoute, DryingForecastPeriod, DryingTier, LocationWeather, WeatherSample,
};
use chrono::{DateTime, Duration, Utc};

/// Projects a route's drying status across the forecast horizon.
///
/// Periods break wherever a forecast rain event begins or ends and where the
/// rock is projected to finish drying. Adjacent periods with the same status
/// are left as-is; merging them is up to the caller.
pub struct ForecastTimelineBuilder<'a> {
    calculator: &'a DryingStatusCalculator,
}

impl<'a> ForecastTimelineBuilder<'a> {
    pub fn new(calculator: &'a DryingStatusCalculator) -> Self {
        Self { calculator }
    }

    pub fn compute_forecast(
        &self,
        route: &ClimbingRoute,
        weather: Option<&LocationWeather>,
        tree_coverage_percent: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DryingForecastPeriod>> {
        let tree = tree_coverage_percent;
        let current = self.calculator.compute_status(route, weather, tree, now)?.status;
        let ctx = self.calculator.route_context(route, now)?;
        let engine = self.calculator.engine();
        let horizon_end = now + engine.horizon();

        let mut timeline =
            TimelineBuilder::new(now, horizon_end, current.status, current.hours_until_dry);

        let Some(weather) = weather else {
            return Ok(timeline.finish());
        };

        let window = Duration::minutes((engine.condition_window_hours * 60.0) as i64);
        let threshold = engine.rain_threshold_mm;

        let mut raining = false;
        // Rain still on the rock at `now`, plus the forecast samples since the
        // current wet spell began
        let mut carried_mm = if current.is_wet {
            current.factors.rain_amount_mm
        } else {
            0.0
        };
        let mut spell_start: Option<usize> = None;
        let mut dry_at = current
            .is_wet
            .then(|| now + Duration::minutes((current.hours_until_dry * 60.0).round() as i64));

        let samples: Vec<&WeatherSample> = weather
            .forecast
            .iter()
            .filter(|s| s.timestamp >= now && s.timestamp < horizon_end)
            .collect();

        for (i, sample) in samples.iter().enumerate() {
            let t = sample.timestamp;

            if sample.is_rain(threshold) {
                let start = *spell_start.get_or_insert(i);
                if !raining {
                    raining = true;
                    dry_at = None;
                    let wet_mm = carried_mm + spell_rain(&samples[start..=i], threshold);
                    let conditions = conditions_from(&weather.forecast, sample, window);
                    let hours = self.hours_needed(route, &ctx, wet_mm, &conditions, tree);
                    timeline.transition(t, self.tier(&ctx, hours), hours);
                    tracing::trace!(route = %route.id, at = %t, hours, "Forecast rain begins");
                }
                timeline.add_rain(sample.precipitation_mm);
                continue;
            }

            timeline.add_rain(sample.precipitation_mm);

            if raining {
                raining = false;
                let start = spell_start.unwrap_or(i);
                let wet_mm = carried_mm + spell_rain(&samples[start..i], threshold);
                let conditions = conditions_from(&weather.forecast, sample, window);
                let hours = self.hours_needed(route, &ctx, wet_mm, &conditions, tree);
                if hours > 0.0 {
                    dry_at = Some(t + Duration::minutes((hours * 60.0).round() as i64));
                } else {
                    dry_at = None;
                    carried_mm = 0.0;
                    spell_start = None;
                }
                timeline.transition(t, self.tier(&ctx, hours), hours);
                tracing::trace!(route = %route.id, at = %t, hours, "Forecast rain ends");
            } else if dry_at.is_some_and(|at| t >= at) {
                dry_at = None;
                carried_mm = 0.0;
                spell_start = None;
                timeline.transition(t, DryingTier::Good, 0.0);
            }
        }

        Ok(timeline.finish())
    }

    fn hours_needed(
        &self,
        route: &ClimbingRoute,
        ctx: &RouteContext,
        wet_mm: f64,
        conditions: &Conditions,
        tree_coverage_percent: Option<f64>,
    ) -> f64 {
        let estimate = self.calculator.estimate_with(
            route,
            ctx,
            wet_mm,
            0.0,
            conditions,
            tree_coverage_percent,
        );
        round_hours(estimate.total_hours_needed)
    }

    fn tier(&self, ctx: &RouteContext, hours: f64) -> DryingTier {
        self.calculator.tier(&ctx.rock.profile, hours).1
    }
}

/// Conditions over the window following `sample`, falling back to the sample itself
fn conditions_from(
    forecast: &[WeatherSample],
    sample: &WeatherSample,
    window: Duration,
) -> Conditions {
    conditions_between(forecast, sample.timestamp, sample.timestamp + window)
        .unwrap_or_else(|| Conditions::from(sample))
}

/// Rain that fell on the rock over a run of forecast samples
fn spell_rain(samples: &[&WeatherSample], threshold_mm: f64) -> f64 {
    total_precipitation(samples.iter().copied().filter(|s| s.is_rain(threshold_mm)))
}

struct OpenPeriod {
    start: DateTime<Utc>,
    status: DryingTier,
    hours_until_dry: f64,
    rain_mm: f64,
}

/// Append-only period accumulator.
///
/// Closed periods are never touched again; each new period starts exactly
/// where the previous one ended, and the last one stays open until the
/// horizon end.
pub struct TimelineBuilder {
    closed: Vec<DryingForecastPeriod>,
    open: OpenPeriod,
    horizon_end: DateTime<Utc>,
}

impl TimelineBuilder {
    pub fn new(
        start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
        status: DryingTier,
        hours_until_dry: f64,
    ) -> Self {
        Self {
            closed: Vec::new(),
            open: OpenPeriod {
                start,
                status,
                hours_until_dry,
                rain_mm: 0.0,
            },
            horizon_end,
        }
    }

    /// Close the open period at `at` and open a new one.
    ///
    /// A transition at the open period's own start restates that period;
    /// transitions at or past the horizon end are ignored.
    pub fn transition(&mut self, at: DateTime<Utc>, status: DryingTier, hours_until_dry: f64) {
        if at >= self.horizon_end {
            return;
        }
        if at <= self.open.start {
            self.open.status = status;
            self.open.hours_until_dry = hours_until_dry;
            return;
        }

        let next = OpenPeriod {
            start: at,
            status,
            hours_until_dry,
            rain_mm: 0.0,
        };
        let done = std::mem::replace(&mut self.open, next);
        self.closed.push(DryingForecastPeriod {
            start_time: done.start,
            end_time: Some(at),
            status: done.status,
            hours_until_dry: done.hours_until_dry,
            rain_mm: done.rain_mm,
        });
    }

    pub fn add_rain(&mut self, mm: f64) {
        if mm > 0.0 {
            self.open.rain_mm += mm;
        }
    }

    pub fn finish(mut self) -> Vec<DryingForecastPeriod> {
        self.closed.push(DryingForecastPeriod {
            start_time: self.open.start,
            end_time: None,
            status: self.open.status,
            hours_until_dry: self.open.hours_until_dry,
            rain_mm: self.open.rain_mm,
        });
        self.closed
    }
}
