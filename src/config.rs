use crate::error::{CragError, Result};
use crate::models::{DryingTier, RockGroup};
use dialoguer::Input;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub thresholds: StatusThresholds,
    #[serde(default)]
    pub curve: DryingCurveConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    /// Extra rock-type codes mapped onto known groups, e.g. `"grès": sandstone`
    #[serde(default)]
    pub rock_aliases: BTreeMap<String, RockGroup>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lookback_days: u32,
    pub horizon_days: u32,
    /// Precipitation at or below this amount does not count as rain
    pub rain_threshold_mm: f64,
    /// Samples further apart than this break a rain event in two
    pub max_sample_gap_hours: f64,
    /// Window after a boundary over which drying conditions are averaged
    pub condition_window_hours: f64,
    pub degraded_confidence_cap: u8,
    pub assumed_rock_penalty: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            horizon_days: 6,
            rain_threshold_mm: 0.1,
            max_sample_gap_hours: 6.0,
            condition_window_hours: 24.0,
            degraded_confidence_cap: 30,
            assumed_rock_penalty: 15.0,
        }
    }
}

impl EngineConfig {
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.lookback_days as i64)
    }

    pub fn horizon(&self) -> chrono::Duration {
        chrono::Duration::days(self.horizon_days as i64)
    }
}

/// Hours-until-dry cut-offs between status tiers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusThresholds {
    pub fair_below_hours: f64,
    pub poor_below_hours: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            fair_below_hours: 6.0,
            poor_below_hours: 24.0,
        }
    }
}

impl StatusThresholds {
    pub fn tier_for(&self, hours_until_dry: f64) -> DryingTier {
        if hours_until_dry <= 0.0 {
            DryingTier::Good
        } else if hours_until_dry < self.fair_below_hours {
            DryingTier::Fair
        } else if hours_until_dry < self.poor_below_hours {
            DryingTier::Poor
        } else {
            DryingTier::Critical
        }
    }
}

/// Tunable constants of the drying curve
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DryingCurveConfig {
    pub base_hours_low_porosity: f64,
    pub base_hours_medium_porosity: f64,
    pub base_hours_high_porosity: f64,
    /// Rain amount at which the base hours apply unscaled
    pub reference_rain_mm: f64,
    pub max_rain_factor: f64,
    pub reference_temperature_c: f64,
    pub temperature_coefficient: f64,
    pub min_temperature_factor: f64,
    pub max_temperature_factor: f64,
    pub freeze_factor: f64,
    pub reference_humidity_percent: f64,
    pub humidity_coefficient: f64,
    pub wind_coefficient: f64,
    pub sun_coefficient: f64,
    pub canopy_coefficient: f64,
    /// Share of direct sun a pole-facing wall still gets, by season
    pub poleward_sun_share_summer: f64,
    pub poleward_sun_share_equinox: f64,
    pub poleward_sun_share_winter: f64,
    pub default_tree_coverage_percent: f64,
    pub default_aspect_exposure: f64,
    pub missing_tree_coverage_penalty: f64,
    pub missing_aspect_penalty: f64,
    /// Porous rock keeps seeping for this long after rain stops
    pub seep_window_hours: f64,
    pub seep_penalty: f64,
}

impl Default for DryingCurveConfig {
    fn default() -> Self {
        Self {
            base_hours_low_porosity: 4.0,
            base_hours_medium_porosity: 10.0,
            base_hours_high_porosity: 20.0,
            reference_rain_mm: 5.0,
            max_rain_factor: 3.0,
            reference_temperature_c: 15.0,
            temperature_coefficient: 0.03,
            min_temperature_factor: 0.5,
            max_temperature_factor: 3.0,
            freeze_factor: 2.0,
            reference_humidity_percent: 60.0,
            humidity_coefficient: 0.015,
            wind_coefficient: 0.03,
            sun_coefficient: 0.08,
            canopy_coefficient: 0.8,
            poleward_sun_share_summer: 0.45,
            poleward_sun_share_equinox: 0.3,
            poleward_sun_share_winter: 0.1,
            default_tree_coverage_percent: 25.0,
            default_aspect_exposure: 0.5,
            missing_tree_coverage_penalty: 10.0,
            missing_aspect_penalty: 10.0,
            seep_window_hours: 6.0,
            seep_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub workers: usize,
    pub max_batch_routes: usize,
    pub max_batch_areas: usize,
    pub timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            max_batch_routes: 200,
            max_batch_areas: 100,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(CragError::Config(format!(
                "Config file not found at {:?}. Run `cragcast init` to set up.",
                config_path
            )));
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| CragError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&config_str)
    }

    /// Load the config if one exists, otherwise fall back to built-in defaults.
    /// An explicit path that does not exist is still an error.
    pub fn load_or_default(config_override: Option<PathBuf>) -> Result<Self> {
        if config_override.is_some() || Self::exists(None) {
            return Self::load(config_override);
        }
        tracing::info!("No config file found - using built-in defaults");
        Ok(Self::default())
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let content = Self::substitute_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| CragError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.lookback_days == 0 || engine.horizon_days == 0 {
            return Err(CragError::Config(
                "lookback_days and horizon_days must be at least 1".into(),
            ));
        }
        if engine.rain_threshold_mm < 0.0 || engine.max_sample_gap_hours <= 0.0 {
            return Err(CragError::Config(
                "rain_threshold_mm must be >= 0 and max_sample_gap_hours > 0".into(),
            ));
        }
        if engine.condition_window_hours <= 0.0 {
            return Err(CragError::Config("condition_window_hours must be > 0".into()));
        }
        if engine.degraded_confidence_cap > 100 {
            return Err(CragError::Config(
                "degraded_confidence_cap must be within 0-100".into(),
            ));
        }

        let t = &self.thresholds;
        if t.fair_below_hours <= 0.0 || t.poor_below_hours <= t.fair_below_hours {
            return Err(CragError::Config(format!(
                "thresholds must satisfy 0 < fair_below_hours ({}) < poor_below_hours ({})",
                t.fair_below_hours, t.poor_below_hours
            )));
        }

        let c = &self.curve;
        if !(c.base_hours_low_porosity > 0.0
            && c.base_hours_low_porosity <= c.base_hours_medium_porosity
            && c.base_hours_medium_porosity <= c.base_hours_high_porosity)
        {
            return Err(CragError::Config(
                "base drying hours must be positive and non-decreasing with porosity".into(),
            ));
        }
        let non_negative = [
            c.temperature_coefficient,
            c.humidity_coefficient,
            c.wind_coefficient,
            c.sun_coefficient,
            c.canopy_coefficient,
            c.missing_tree_coverage_penalty,
            c.missing_aspect_penalty,
            c.seep_penalty,
        ];
        if non_negative.iter().any(|v| *v < 0.0) {
            return Err(CragError::Config(
                "drying curve coefficients and penalties must be >= 0".into(),
            ));
        }
        if c.reference_rain_mm <= 0.0 || c.max_rain_factor < 1.0 || c.freeze_factor < 1.0 {
            return Err(CragError::Config(
                "reference_rain_mm must be > 0, max_rain_factor and freeze_factor >= 1".into(),
            ));
        }
        if c.min_temperature_factor <= 0.0 || c.max_temperature_factor < c.min_temperature_factor
        {
            return Err(CragError::Config(
                "temperature factor bounds must satisfy 0 < min <= max".into(),
            ));
        }

        let b = &self.batch;
        if b.workers == 0 || b.max_batch_routes == 0 || b.max_batch_areas == 0 {
            return Err(CragError::Config(
                "batch workers and caps must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    pub fn find_config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("cragcast").join("config.yaml");
            if xdg_config.exists() {
                return Ok(xdg_config);
            }
        }

        Self::default_config_path()
    }

    /// Returns true if a config file can be found in any standard location.
    pub fn exists(config_override: Option<&PathBuf>) -> bool {
        match config_override {
            Some(p) => p.exists(),
            None => Self::find_config_path()
                .map(|p| p.exists())
                .unwrap_or(false),
        }
    }

    /// Default path for writing new config files (~/.config/cragcast/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CragError::Config("Cannot determine config directory".into()))?
            .join("cragcast");
        Ok(config_dir.join("config.yaml"))
    }

    /// Run interactive setup prompts and write config to disk.
    /// Returns the config and the path it was written to.
    pub fn setup_interactive() -> Result<(Self, PathBuf)> {
        println!();
        println!("Let's set up cragcast. Press enter to keep a default.");
        println!();

        let defaults = Config::default();

        println!("Weather windows");
        let lookback_days: u32 = Input::new()
            .with_prompt("  History lookback (days)")
            .default(defaults.engine.lookback_days)
            .interact_text()
            .map_err(|e| CragError::Config(format!("Input error: {}", e)))?;

        let horizon_days: u32 = Input::new()
            .with_prompt("  Forecast horizon (days)")
            .default(defaults.engine.horizon_days)
            .interact_text()
            .map_err(|e| CragError::Config(format!("Input error: {}", e)))?;

        println!();
        println!("Status thresholds");
        let fair_below_hours: f64 = Input::new()
            .with_prompt("  Fair below (hours until dry)")
            .default(defaults.thresholds.fair_below_hours)
            .interact_text()
            .map_err(|e| CragError::Config(format!("Input error: {}", e)))?;

        let poor_below_hours: f64 = Input::new()
            .with_prompt("  Poor below (hours until dry)")
            .default(defaults.thresholds.poor_below_hours)
            .interact_text()
            .map_err(|e| CragError::Config(format!("Input error: {}", e)))?;

        println!();
        println!("Batch processing");
        let workers: usize = Input::new()
            .with_prompt("  Concurrent workers")
            .default(defaults.batch.workers)
            .interact_text()
            .map_err(|e| CragError::Config(format!("Input error: {}", e)))?;

        println!();

        let config = Config {
            engine: EngineConfig {
                lookback_days,
                horizon_days,
                ..defaults.engine
            },
            thresholds: StatusThresholds {
                fair_below_hours,
                poor_below_hours,
            },
            batch: BatchConfig {
                workers,
                ..defaults.batch
            },
            ..Config::default()
        };
        config.validate()?;

        let config_path = Self::default_config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| CragError::Config(format!("Failed to serialize config: {}", e)))?;

        let content = format!(
            "# cragcast configuration\n# Generated by `cragcast init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(&config_path, content)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        let mut result = content.to_string();

        // Find all ${VAR_NAME} patterns and substitute
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| CragError::Config(format!("Invalid substitution pattern: {}", e)))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        Ok(result)
    }
}
