use super::rock::{Porosity, RockGroup};
use super::route::Aspect;
use super::weather::Season;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DryingTier {
    Good,
    Fair,
    Poor,
    Critical,
}

impl DryingTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DryingTier::Good => "good",
            DryingTier::Fair => "fair",
            DryingTier::Poor => "poor",
            DryingTier::Critical => "critical",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            DryingTier::Good => "✓",
            DryingTier::Fair => "~",
            DryingTier::Poor => "⚠",
            DryingTier::Critical => "!",
        }
    }
}

impl std::fmt::Display for DryingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inputs that went into a status, kept for explanation and debugging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryingFactors {
    pub rock_group: RockGroup,
    pub porosity: Porosity,
    pub wet_sensitive: bool,
    pub rock_type_assumed: bool,
    pub rain_amount_mm: f64,
    pub hours_since_rain: Option<f64>,
    pub total_drying_hours: f64,
    pub avg_temperature_c: Option<f64>,
    pub avg_humidity_percent: Option<f64>,
    pub avg_wind_speed_kmh: Option<f64>,
    pub effective_sun_hours: Option<f64>,
    pub tree_coverage_percent: Option<f64>,
    pub aspect: Option<Aspect>,
    pub season: Season,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryingStatus {
    pub is_wet: bool,
    pub status: DryingTier,
    pub hours_until_dry: f64,
    pub confidence_score: u8,
    pub last_rain_at: Option<DateTime<Utc>>,
    pub message: String,
    pub factors: DryingFactors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQuality {
    Complete,
    /// Weather data was unavailable and the estimate relies on static attributes
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: DryingStatus,
    pub quality: DataQuality,
}

impl StatusReport {
    pub fn is_degraded(&self) -> bool {
        matches!(self.quality, DataQuality::Degraded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryingForecastPeriod {
    pub start_time: DateTime<Utc>,
    /// `None` only on the final period, which runs to the end of the horizon
    pub end_time: Option<DateTime<Utc>>,
    pub status: DryingTier,
    pub hours_until_dry: f64,
    pub rain_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDryingStats {
    pub area_id: String,
    pub total_routes: usize,
    pub dry_count: usize,
    pub drying_count: usize,
    pub wet_count: usize,
    pub excluded_count: usize,
    pub percent_dry: u8,
    pub avg_hours_until_dry: f64,
    pub avg_tree_coverage: Option<f64>,
    pub confidence_score: u8,
    pub last_rain_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AreaOutcome {
    Stats(AreaDryingStats),
    /// Every route was excluded; "insufficient data" rather than a failure
    NoData { area_id: String, excluded: usize },
}

impl AreaOutcome {
    pub fn stats(&self) -> Option<&AreaDryingStats> {
        match self {
            AreaOutcome::Stats(stats) => Some(stats),
            AreaOutcome::NoData { .. } => None,
        }
    }
}

/// Area bucket for a single route result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DryingBucket {
    Dry,
    Drying,
    Wet,
}

impl DryingStatus {
    /// Only rock that is not wet and rated good counts as dry
    pub fn bucket(&self) -> DryingBucket {
        if !self.is_wet && self.status == DryingTier::Good {
            DryingBucket::Dry
        } else if self.status == DryingTier::Critical {
            DryingBucket::Wet
        } else {
            DryingBucket::Drying
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(is_wet: bool, tier: DryingTier) -> DryingStatus {
        DryingStatus {
            is_wet,
            status: tier,
            hours_until_dry: if is_wet { 5.0 } else { 0.0 },
            confidence_score: 90,
            last_rain_at: None,
            message: String::new(),
            factors: DryingFactors {
                rock_group: RockGroup::Granite,
                porosity: Porosity::Low,
                wet_sensitive: false,
                rock_type_assumed: false,
                rain_amount_mm: 0.0,
                hours_since_rain: None,
                total_drying_hours: 0.0,
                avg_temperature_c: None,
                avg_humidity_percent: None,
                avg_wind_speed_kmh: None,
                effective_sun_hours: None,
                tree_coverage_percent: None,
                aspect: None,
                season: Season::Summer,
                degraded: false,
            },
        }
    }

    #[test]
    fn tier_ordering() {
        assert!(DryingTier::Good < DryingTier::Fair);
        assert!(DryingTier::Poor < DryingTier::Critical);
    }

    #[test]
    fn bucket_mapping() {
        assert_eq!(status(false, DryingTier::Good).bucket(), DryingBucket::Dry);
        assert_eq!(status(false, DryingTier::Fair).bucket(), DryingBucket::Drying);
        assert_eq!(status(true, DryingTier::Fair).bucket(), DryingBucket::Drying);
        assert_eq!(status(true, DryingTier::Poor).bucket(), DryingBucket::Drying);
        assert_eq!(status(true, DryingTier::Critical).bucket(), DryingBucket::Wet);
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&DryingTier::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
