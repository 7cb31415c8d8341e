use super::calculations::{
    conditions_since, effective_sun_hours, find_last_rain_event, history_coverage, hours_between,
    Conditions, RainEvent,
};
use super::drying_curve::{estimate_drying_hours, input_confidence, CurveEstimate, DryingInputs};
use super::rock_catalog::RockTypeCatalog;
use crate::config::{Config, DryingCurveConfig, EngineConfig, StatusThresholds};
use crate::error::{CragError, Result};
use crate::models::{
    ClimbingRoute, DataQuality, DryingFactors, DryingStatus, DryingTier, Hemisphere,
    LocationWeather, RockClassification, RockTypeProfile, Season, StatusReport, WeatherSample,
};
use chrono::{DateTime, Duration, Utc};

/// Per-route drying status.
///
/// Holds only read-only configuration and reference data, so one instance
/// can be shared across any number of concurrent calculations.
#[derive(Debug, Clone)]
pub struct DryingStatusCalculator {
    catalog: RockTypeCatalog,
    engine: EngineConfig,
    thresholds: StatusThresholds,
    curve: DryingCurveConfig,
}

/// Route attributes resolved once per calculation
pub(crate) struct RouteContext {
    pub rock: RockClassification,
    pub season: Season,
    pub hemisphere: Hemisphere,
}

struct DryingProgress {
    remaining_hours: f64,
    /// Curve estimate under the latest conditions
    current: CurveEstimate,
}

impl DryingStatusCalculator {
    pub fn new(config: &Config) -> Self {
        Self {
            catalog: RockTypeCatalog::with_aliases(&config.rock_aliases),
            engine: config.engine.clone(),
            thresholds: config.thresholds.clone(),
            curve: config.curve.clone(),
        }
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Compute the drying status of one route at `now`.
    ///
    /// Returns `NotApplicable` when the route has no usable coordinates. When
    /// weather history is missing the result is a low-confidence estimate
    /// marked `DataQuality::Degraded`; only a route with neither weather nor a
    /// rock type fails with `DataUnavailable`.
    pub fn compute_status(
        &self,
        route: &ClimbingRoute,
        weather: Option<&LocationWeather>,
        tree_coverage_percent: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<StatusReport> {
        let ctx = self.route_context(route, now)?;

        let weather = weather.filter(|w| !w.history_until(now).is_empty());
        let Some(weather) = weather else {
            let has_rock_type = route
                .rock_type
                .as_deref()
                .is_some_and(|code| !code.trim().is_empty());
            if !has_rock_type {
                return Err(CragError::DataUnavailable(format!(
                    "route {} has neither weather history nor a rock type",
                    route.id
                )));
            }
            tracing::debug!(route = %route.id, "No weather history - using static estimate");
            return Ok(StatusReport {
                status: self.static_estimate(route, &ctx, tree_coverage_percent),
                quality: DataQuality::Degraded {
                    reason: "weather history unavailable".into(),
                },
            });
        };

        let status = self.assess(route, &ctx, weather, tree_coverage_percent, now);
        tracing::debug!(
            route = %route.id,
            status = %status.status,
            hours_until_dry = status.hours_until_dry,
            confidence = status.confidence_score,
            "Computed drying status"
        );

        Ok(StatusReport {
            status,
            quality: DataQuality::Complete,
        })
    }

    pub(crate) fn route_context(
        &self,
        route: &ClimbingRoute,
        now: DateTime<Utc>,
    ) -> Result<RouteContext> {
        let location = route.usable_location().ok_or_else(|| {
            CragError::NotApplicable(format!("route {} has no GPS data", route.id))
        })?;
        let hemisphere = location.hemisphere();
        Ok(RouteContext {
            rock: self.catalog.classify_optional(route.rock_type.as_deref()),
            season: Season::from_date(now, hemisphere),
            hemisphere,
        })
    }

    fn assess(
        &self,
        route: &ClimbingRoute,
        ctx: &RouteContext,
        weather: &LocationWeather,
        tree_coverage_percent: Option<f64>,
        now: DateTime<Utc>,
    ) -> DryingStatus {
        let history = weather.history_until(now);
        let window = Duration::minutes((self.engine.condition_window_hours * 60.0) as i64);
        let coverage = history_coverage(weather.history_span_hours(now), self.engine.lookback());
        let coverage_scale = 0.5 + 0.5 * coverage;
        let profile = ctx.rock.profile;

        let event = find_last_rain_event(
            history,
            now,
            self.engine.lookback(),
            self.engine.rain_threshold_mm,
            Duration::minutes((self.engine.max_sample_gap_hours * 60.0) as i64),
        );

        let Some(event) = event else {
            let conditions = conditions_since(history, now - window, now, window);
            let confidence = (input_confidence(&self.curve, tree_coverage_percent, route.aspect)
                - self.assumed_penalty(&ctx.rock))
                * coverage_scale;
            let mut factors = self.factors(route, ctx, tree_coverage_percent, conditions, None);
            factors.effective_sun_hours =
                conditions.map(|c| effective_sun_hours(c.cloud_cover_percent, ctx.season));
            return DryingStatus {
                is_wet: false,
                status: DryingTier::Good,
                hours_until_dry: 0.0,
                confidence_score: to_score(confidence),
                last_rain_at: None,
                message: build_message(&profile, false, DryingTier::Good, 0.0),
                factors,
            };
        };

        let elapsed = hours_between(event.end, now).max(0.0);
        let progress =
            self.drying_progress(route, ctx, &event, history, now, tree_coverage_percent);
        let estimate = progress.current;

        let hours_until_dry = round_hours(progress.remaining_hours);
        let (is_wet, tier) = self.tier(&profile, hours_until_dry);
        let confidence =
            (estimate.confidence_contribution - self.assumed_penalty(&ctx.rock)) * coverage_scale;

        let conditions = conditions_since(history, event.end, now, window);
        let mut factors = self.factors(route, ctx, tree_coverage_percent, conditions, Some(&event));
        factors.hours_since_rain = Some(round_hours(elapsed));
        factors.total_drying_hours = round_hours(estimate.total_hours_needed);
        factors.effective_sun_hours = Some(estimate.effective_sun_hours);

        DryingStatus {
            is_wet,
            status: tier,
            hours_until_dry,
            confidence_score: to_score(confidence),
            last_rain_at: Some(event.end),
            message: build_message(&profile, is_wet, tier, hours_until_dry),
            factors,
        }
    }

    /// Accumulate drying since `event` ended.
    ///
    /// Each sample's conditions hold until the next sample. A stretch of `dt`
    /// hours dries `dt / total` of the rock, where `total` is the curve
    /// estimate under that stretch's conditions. What is left is scaled by the
    /// fastest total seen since the event, so without new rain the remaining
    /// time only ever goes down.
    fn drying_progress(
        &self,
        route: &ClimbingRoute,
        ctx: &RouteContext,
        event: &RainEvent,
        history: &[WeatherSample],
        now: DateTime<Utc>,
        tree_coverage_percent: Option<f64>,
    ) -> DryingProgress {
        let curve = |conditions: &Conditions, at: DateTime<Utc>| {
            let hours_since_rain = hours_between(event.end, at).max(0.0);
            self.estimate_with(
                route,
                ctx,
                event.amount_mm,
                hours_since_rain,
                conditions,
                tree_coverage_percent,
            )
        };

        let mut conditions = history
            .iter()
            .rev()
            .find(|s| s.timestamp <= event.end)
            .map(Conditions::from)
            .unwrap_or_else(|| ctx.season.typical_conditions().into());

        let mut estimate = curve(&conditions, event.end);
        let mut fastest = estimate.total_hours_needed;
        let mut stretch_start = event.end;
        let mut progress = 0.0;

        let after_event = history
            .iter()
            .filter(|s| s.timestamp > event.end && s.timestamp <= now);
        for sample in after_event {
            progress += stretch_share(hours_between(stretch_start, sample.timestamp), &estimate);
            stretch_start = sample.timestamp;
            conditions = Conditions::from(sample);
            estimate = curve(&conditions, sample.timestamp);
            fastest = fastest.min(estimate.total_hours_needed);
        }
        progress += stretch_share(hours_between(stretch_start, now).max(0.0), &estimate);

        DryingProgress {
            remaining_hours: (1.0 - progress).max(0.0) * fastest.max(0.0),
            current: curve(&conditions, now),
        }
    }

    /// Run the drying curve for this route under the given conditions
    pub(crate) fn estimate_with(
        &self,
        route: &ClimbingRoute,
        ctx: &RouteContext,
        rain_amount_mm: f64,
        hours_since_rain: f64,
        conditions: &Conditions,
        tree_coverage_percent: Option<f64>,
    ) -> CurveEstimate {
        let inputs = DryingInputs {
            porosity: ctx.rock.profile.porosity,
            hours_since_rain,
            rain_amount_mm,
            temperature_c: conditions.temperature_c,
            humidity_percent: conditions.humidity_percent,
            wind_speed_kmh: conditions.wind_speed_kmh,
            sun_exposure_hours: effective_sun_hours(conditions.cloud_cover_percent, ctx.season),
            tree_coverage_percent,
            aspect: route.aspect,
            season: ctx.season,
            hemisphere: ctx.hemisphere,
        };
        estimate_drying_hours(&self.curve, &inputs)
    }

    /// Estimate from rock type and seasonal normals alone.
    ///
    /// Without history there is no rain event to dry from, so the rock is not
    /// reported wet and `hours_until_dry` is 0. Ordinary rock is assumed good.
    /// Wet-sensitive rock is reported fair instead, since climbing it wet does
    /// lasting damage and dryness cannot be confirmed; area stats count it as
    /// drying rather than dry.
    fn static_estimate(
        &self,
        route: &ClimbingRoute,
        ctx: &RouteContext,
        tree_coverage_percent: Option<f64>,
    ) -> DryingStatus {
        let conditions: Conditions = ctx.season.typical_conditions().into();
        let estimate = self.estimate_with(
            route,
            ctx,
            self.curve.reference_rain_mm,
            self.curve.seep_window_hours,
            &conditions,
            tree_coverage_percent,
        );

        let confidence = (estimate.confidence_contribution - self.assumed_penalty(&ctx.rock))
            .min(self.engine.degraded_confidence_cap as f64);

        let profile = ctx.rock.profile;
        let (tier, assumption) = if profile.wet_sensitive {
            (DryingTier::Fair, "dryness unknown")
        } else {
            (DryingTier::Good, "assuming dry")
        };
        let mut message = format!(
            "No recent weather data; {}. {} typically needs about {} to dry after rain in {}.",
            assumption,
            profile.name,
            format_hours(estimate.total_hours_needed),
            ctx.season.as_str().to_lowercase()
        );
        if profile.wet_sensitive {
            message.push_str(&format!(
                " Check the rock before climbing: {} is permanently damaged by climbing while wet.",
                profile.name.to_lowercase()
            ));
        }

        let mut factors = self.factors(route, ctx, tree_coverage_percent, Some(conditions), None);
        factors.total_drying_hours = round_hours(estimate.total_hours_needed);
        factors.effective_sun_hours = Some(estimate.effective_sun_hours);
        factors.degraded = true;

        DryingStatus {
            is_wet: false,
            status: tier,
            hours_until_dry: 0.0,
            confidence_score: to_score(confidence),
            last_rain_at: None,
            message,
            factors,
        }
    }

    /// Wet flag and tier for a number of hours until dry, including the
    /// wet-sensitive override
    pub fn tier(&self, profile: &RockTypeProfile, hours_until_dry: f64) -> (bool, DryingTier) {
        let is_wet = hours_until_dry > 0.0;
        let tier = if profile.wet_sensitive && is_wet {
            DryingTier::Critical
        } else {
            self.thresholds.tier_for(hours_until_dry)
        };
        (is_wet, tier)
    }

    fn assumed_penalty(&self, rock: &RockClassification) -> f64 {
        if rock.assumed {
            self.engine.assumed_rock_penalty
        } else {
            0.0
        }
    }

    fn factors(
        &self,
        route: &ClimbingRoute,
        ctx: &RouteContext,
        tree_coverage_percent: Option<f64>,
        conditions: Option<Conditions>,
        event: Option<&RainEvent>,
    ) -> DryingFactors {
        let profile = ctx.rock.profile;
        DryingFactors {
            rock_group: profile.group,
            porosity: profile.porosity,
            wet_sensitive: profile.wet_sensitive,
            rock_type_assumed: ctx.rock.assumed,
            rain_amount_mm: event.map(|e| e.amount_mm).unwrap_or(0.0),
            hours_since_rain: None,
            total_drying_hours: 0.0,
            avg_temperature_c: conditions.map(|c| c.temperature_c),
            avg_humidity_percent: conditions.map(|c| c.humidity_percent),
            avg_wind_speed_kmh: conditions.map(|c| c.wind_speed_kmh),
            effective_sun_hours: None,
            tree_coverage_percent,
            aspect: route.aspect,
            season: ctx.season,
            degraded: false,
        }
    }
}

pub(crate) fn build_message(
    profile: &RockTypeProfile,
    is_wet: bool,
    tier: DryingTier,
    hours_until_dry: f64,
) -> String {
    if !is_wet {
        return format!("{} is dry - good to climb.", profile.name);
    }
    if profile.wet_sensitive {
        return format!(
            "{} is wet and is permanently damaged by climbing while wet - do not climb. About {} until dry.",
            profile.name,
            format_hours(hours_until_dry)
        );
    }
    match tier {
        DryingTier::Fair => format!(
            "{} is drying - about {} until dry.",
            profile.name,
            format_hours(hours_until_dry)
        ),
        DryingTier::Poor => format!(
            "{} is wet - about {} until dry.",
            profile.name,
            format_hours(hours_until_dry)
        ),
        _ => format!(
            "{} is soaked - about {} until dry.",
            profile.name,
            format_hours(hours_until_dry)
        ),
    }
}

pub(crate) fn format_hours(hours: f64) -> String {
    if hours < 1.0 {
        "under an hour".to_string()
    } else if hours < 48.0 {
        format!("{:.0}h", hours)
    } else {
        format!("{:.1} days", hours / 24.0)
    }
}

pub(crate) fn round_hours(hours: f64) -> f64 {
    ((hours.max(0.0)) * 10.0).round() / 10.0
}

/// Share of the drying done over `hours` under one stretch's estimate
fn stretch_share(hours: f64, estimate: &CurveEstimate) -> f64 {
    if estimate.total_hours_needed > 0.0 {
        hours / estimate.total_hours_needed
    } else {
        1.0
    }
}

fn to_score(confidence: f64) -> u8 {
    confidence.clamp(0.0, 100.0).round() as u8
}
