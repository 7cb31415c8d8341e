use crate::config::DryingCurveConfig;
use crate::models::{Aspect, Hemisphere, Porosity, Season};

/// Environmental inputs to the drying curve
#[derive(Debug, Clone, PartialEq)]
pub struct DryingInputs {
    pub porosity: Porosity,
    pub hours_since_rain: f64,
    pub rain_amount_mm: f64,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
    /// Open-sky sun hours per day, before the face's aspect is taken into account
    pub sun_exposure_hours: f64,
    pub tree_coverage_percent: Option<f64>,
    pub aspect: Option<Aspect>,
    pub season: Season,
    pub hemisphere: Hemisphere,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveEstimate {
    /// Hours of drying needed after the rain event ends
    pub total_hours_needed: f64,
    /// 0-100, reduced for every defaulted input
    pub confidence_contribution: f64,
    /// Sun hours actually reaching the face
    pub effective_sun_hours: f64,
}

/// Estimate how long rock needs to dry after a rain event.
///
/// Pure and deterministic: the estimate is a product of independent factors,
/// each monotonic in its own input, so identical inputs always give identical
/// outputs and the drying time moves in a predictable direction:
///
/// - porosity, rain amount, humidity, canopy cover: more means longer
/// - temperature, wind, effective sun: more means shorter
/// - freezing temperatures multiply the time by `freeze_factor`
///
/// Aspect and season only act through the effective sun exposure. A face
/// pointing at the pole in winter keeps `poleward_sun_share_winter` of the
/// open-sky sun.
pub fn estimate_drying_hours(config: &DryingCurveConfig, inputs: &DryingInputs) -> CurveEstimate {
    let base = match inputs.porosity {
        Porosity::Low => config.base_hours_low_porosity,
        Porosity::Medium => config.base_hours_medium_porosity,
        Porosity::High => config.base_hours_high_porosity,
    };

    let rain_factor = rain_factor(config, finite_or(inputs.rain_amount_mm, 0.0));
    let temperature_factor = temperature_factor(
        config,
        finite_or(inputs.temperature_c, config.reference_temperature_c),
    );
    let humidity_factor = humidity_factor(
        config,
        finite_or(inputs.humidity_percent, config.reference_humidity_percent),
    );
    let wind_speed_kmh = finite_or(inputs.wind_speed_kmh, 0.0).max(0.0);
    let wind_factor = 1.0 / (1.0 + config.wind_coefficient * wind_speed_kmh);

    let effective_sun_hours = finite_or(inputs.sun_exposure_hours, 0.0).max(0.0)
        * aspect_sun_multiplier(config, inputs.aspect, inputs.season, inputs.hemisphere);
    let sun_factor = 1.0 / (1.0 + config.sun_coefficient * effective_sun_hours);

    let canopy_percent = inputs
        .tree_coverage_percent
        .filter(|p| p.is_finite())
        .unwrap_or(config.default_tree_coverage_percent)
        .clamp(0.0, 100.0);
    let canopy_factor = 1.0 + config.canopy_coefficient * canopy_percent / 100.0;

    let total_hours_needed = base
        * rain_factor
        * temperature_factor
        * humidity_factor
        * wind_factor
        * sun_factor
        * canopy_factor;

    let mut confidence = input_confidence(config, inputs.tree_coverage_percent, inputs.aspect);
    // Porous rock may still be seeping; surface readings right after rain are unreliable
    if inputs.porosity == Porosity::High && inputs.hours_since_rain < config.seep_window_hours {
        confidence -= config.seep_penalty;
    }

    CurveEstimate {
        total_hours_needed,
        confidence_contribution: confidence.clamp(0.0, 100.0),
        effective_sun_hours,
    }
}

/// Confidence (0-100) left after penalties for a missing canopy reading or aspect
pub fn input_confidence(
    config: &DryingCurveConfig,
    tree_coverage_percent: Option<f64>,
    aspect: Option<Aspect>,
) -> f64 {
    let mut confidence = 100.0;
    if tree_coverage_percent.is_none() {
        confidence -= config.missing_tree_coverage_penalty;
    }
    if aspect.is_none() {
        confidence -= config.missing_aspect_penalty;
    }
    confidence
}

fn rain_factor(config: &DryingCurveConfig, rain_mm: f64) -> f64 {
    let ratio = rain_mm.max(0.0) / config.reference_rain_mm;
    (0.5 + 0.5 * ratio.sqrt()).min(config.max_rain_factor)
}

fn temperature_factor(config: &DryingCurveConfig, temperature_c: f64) -> f64 {
    let mut factor =
        1.0 - config.temperature_coefficient * (temperature_c - config.reference_temperature_c);
    if temperature_c < 0.0 {
        factor *= config.freeze_factor;
    }
    factor.clamp(config.min_temperature_factor, config.max_temperature_factor)
}

fn humidity_factor(config: &DryingCurveConfig, humidity_percent: f64) -> f64 {
    let humidity = humidity_percent.clamp(0.0, 100.0);
    (1.0 + config.humidity_coefficient * (humidity - config.reference_humidity_percent)).max(0.3)
}

/// Fraction of open-sky sun that reaches a face with the given aspect
pub fn aspect_sun_multiplier(
    config: &DryingCurveConfig,
    aspect: Option<Aspect>,
    season: Season,
    hemisphere: Hemisphere,
) -> f64 {
    let exposure = match aspect {
        Some(aspect) => aspect.equatorward_exposure(hemisphere),
        None => config.default_aspect_exposure,
    };
    let floor = match season {
        Season::Summer => config.poleward_sun_share_summer,
        Season::Spring | Season::Autumn => config.poleward_sun_share_equinox,
        Season::Winter => config.poleward_sun_share_winter,
    }
    .clamp(0.0, 1.0);
    floor + (1.0 - floor) * exposure.clamp(0.0, 1.0)
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral_inputs() -> DryingInputs {
        DryingInputs {
            porosity: Porosity::Medium,
            hours_since_rain: 10.0,
            rain_amount_mm: 5.0,
            temperature_c: 15.0,
            humidity_percent: 60.0,
            wind_speed_kmh: 0.0,
            sun_exposure_hours: 0.0,
            tree_coverage_percent: Some(0.0),
            aspect: Some(Aspect::South),
            season: Season::Summer,
            hemisphere: Hemisphere::Northern,
        }
    }

    fn hours(inputs: &DryingInputs) -> f64 {
        estimate_drying_hours(&DryingCurveConfig::default(), inputs).total_hours_needed
    }

    #[test]
    fn neutral_conditions_give_base_hours() {
        let estimate = estimate_drying_hours(&DryingCurveConfig::default(), &neutral_inputs());
        assert_eq!(estimate.total_hours_needed, 10.0);
        assert_eq!(estimate.confidence_contribution, 100.0);
    }

    #[test]
    fn regression_value_for_wet_sandstone_day() {
        let inputs = DryingInputs {
            porosity: Porosity::High,
            rain_amount_mm: 20.0,
            temperature_c: 25.0,
            humidity_percent: 80.0,
            wind_speed_kmh: 10.0,
            sun_exposure_hours: 10.0,
            tree_coverage_percent: Some(50.0),
            ..neutral_inputs()
        };
        // 20 * 1.5 * 0.7 * 1.3 / 1.3 / 1.8 * 1.4
        let expected = 20.0 * 1.5 * 0.7 * 1.4 / 1.8;
        assert!((hours(&inputs) - expected).abs() < 1e-9);
    }

    #[test]
    fn deterministic_across_calls() {
        let inputs = DryingInputs {
            porosity: Porosity::High,
            rain_amount_mm: 12.3,
            temperature_c: 7.5,
            humidity_percent: 88.0,
            wind_speed_kmh: 14.0,
            sun_exposure_hours: 4.2,
            tree_coverage_percent: None,
            aspect: None,
            season: Season::Autumn,
            ..neutral_inputs()
        };
        let first = estimate_drying_hours(&DryingCurveConfig::default(), &inputs);
        for _ in 0..10 {
            let again = estimate_drying_hours(&DryingCurveConfig::default(), &inputs);
            assert_eq!(
                first.total_hours_needed.to_bits(),
                again.total_hours_needed.to_bits()
            );
            assert_eq!(first.confidence_contribution, again.confidence_contribution);
        }
    }

    #[test]
    fn porosity_increases_drying_time() {
        let low = hours(&DryingInputs {
            porosity: Porosity::Low,
            ..neutral_inputs()
        });
        let medium = hours(&neutral_inputs());
        let high = hours(&DryingInputs {
            porosity: Porosity::High,
            ..neutral_inputs()
        });
        assert!(low < medium && medium < high);
    }

    #[test]
    fn more_rain_never_dries_faster() {
        let mut previous = 0.0;
        for rain in [0.0, 0.5, 2.0, 5.0, 10.0, 25.0, 60.0, 200.0] {
            let h = hours(&DryingInputs {
                rain_amount_mm: rain,
                ..neutral_inputs()
            });
            assert!(h >= previous, "rain {} gave {} < {}", rain, h, previous);
            previous = h;
        }
    }

    #[test]
    fn warmer_windier_sunnier_dries_faster() {
        let base = hours(&neutral_inputs());
        assert!(
            hours(&DryingInputs {
                temperature_c: 28.0,
                ..neutral_inputs()
            }) < base
        );
        assert!(
            hours(&DryingInputs {
                wind_speed_kmh: 25.0,
                ..neutral_inputs()
            }) < base
        );
        assert!(
            hours(&DryingInputs {
                sun_exposure_hours: 8.0,
                ..neutral_inputs()
            }) < base
        );
    }

    #[test]
    fn temperature_is_monotonic_through_freezing() {
        let mut previous = f64::MAX;
        for t in [-15.0, -5.0, -0.5, 0.0, 5.0, 15.0, 30.0, 45.0] {
            let h = hours(&DryingInputs {
                temperature_c: t,
                ..neutral_inputs()
            });
            assert!(h <= previous, "temperature {} gave {} > {}", t, h, previous);
            previous = h;
        }
    }

    #[test]
    fn humidity_and_canopy_slow_drying() {
        let base = hours(&neutral_inputs());
        assert!(
            hours(&DryingInputs {
                humidity_percent: 95.0,
                ..neutral_inputs()
            }) > base
        );
        assert!(
            hours(&DryingInputs {
                tree_coverage_percent: Some(80.0),
                ..neutral_inputs()
            }) > base
        );
    }

    #[test]
    fn north_face_in_winter_gets_least_sun() {
        let config = DryingCurveConfig::default();
        let share = |aspect: Aspect, season: Season| {
            aspect_sun_multiplier(&config, Some(aspect), season, Hemisphere::Northern)
        };
        let north_winter = share(Aspect::North, Season::Winter);
        let north_summer = share(Aspect::North, Season::Summer);
        let south_winter = share(Aspect::South, Season::Winter);
        assert!(north_winter < north_summer);
        assert!(north_winter < south_winter);
        assert!((south_winter - 1.0).abs() < 1e-9);

        let sunny = DryingInputs {
            sun_exposure_hours: 8.0,
            season: Season::Winter,
            ..neutral_inputs()
        };
        let north = hours(&DryingInputs {
            aspect: Some(Aspect::North),
            ..sunny.clone()
        });
        let south = hours(&sunny);
        assert!(north > south);
    }

    #[test]
    fn southern_hemisphere_flips_aspect() {
        let sunny = DryingInputs {
            sun_exposure_hours: 8.0,
            hemisphere: Hemisphere::Southern,
            ..neutral_inputs()
        };
        let north = hours(&DryingInputs {
            aspect: Some(Aspect::North),
            ..sunny.clone()
        });
        let south = hours(&DryingInputs {
            aspect: Some(Aspect::South),
            ..sunny
        });
        assert!(north < south);
    }

    #[test]
    fn missing_inputs_reduce_confidence() {
        let config = DryingCurveConfig::default();
        let no_tree = estimate_drying_hours(
            &config,
            &DryingInputs {
                tree_coverage_percent: None,
                ..neutral_inputs()
            },
        );
        assert_eq!(no_tree.confidence_contribution, 90.0);

        let nothing = estimate_drying_hours(
            &config,
            &DryingInputs {
                tree_coverage_percent: None,
                aspect: None,
                ..neutral_inputs()
            },
        );
        assert_eq!(nothing.confidence_contribution, 80.0);
    }

    #[test]
    fn porous_rock_right_after_rain_is_less_certain() {
        let estimate = estimate_drying_hours(
            &DryingCurveConfig::default(),
            &DryingInputs {
                porosity: Porosity::High,
                hours_since_rain: 1.0,
                ..neutral_inputs()
            },
        );
        assert_eq!(estimate.confidence_contribution, 90.0);
    }

    #[test]
    fn non_finite_inputs_fall_back_to_references() {
        let estimate = estimate_drying_hours(
            &DryingCurveConfig::default(),
            &DryingInputs {
                temperature_c: f64::NAN,
                humidity_percent: f64::INFINITY,
                wind_speed_kmh: f64::NAN,
                ..neutral_inputs()
            },
        );
        assert_eq!(estimate.total_hours_needed, 10.0);
    }
}
