//! Annual energy estimate for a roof.
//!
//! Everything here is a deliberately coarse approximation: irradiance is
//! derived linearly from cloud cover and production assumes a fixed number
//! of full-sun hours per year. There is no radiative-transfer or sun-path
//! model behind these numbers.

use crate::error::{ensure_non_negative, ensure_range, AuditError, Result};
use crate::models::{EnvironmentalConditions, Orientation, RoofProfile, SolarPotential};

pub const MAX_CLEAR_SKY_IRRADIANCE: f64 = 1000.0;
pub const CLOUD_ATTENUATION_FACTOR: f64 = 0.75;
pub const PANEL_EFFICIENCY: f64 = 0.18;
/// Four equivalent full-sun hours per day, converted from Wh to kWh.
pub const HOURS_PER_YEAR_CONVERSION: f64 = 365.0 * 4.0 / 1000.0;

/// Tilt efficiency sample points in (degrees, efficiency), peaking at 30.
const TILT_CURVE: [(f64, f64); 7] = [
    (0.0, 0.87),
    (15.0, 0.96),
    (30.0, 1.0),
    (45.0, 0.97),
    (60.0, 0.89),
    (75.0, 0.78),
    (90.0, 0.66),
];

/// Relative yield by facing, assuming a northern hemisphere site.
pub fn orientation_efficiency(orientation: Orientation) -> f64 {
    match orientation {
        Orientation::S => 1.0,
        Orientation::SE | Orientation::SW => 0.95,
        Orientation::E | Orientation::W => 0.85,
        Orientation::NE | Orientation::NW => 0.7,
        Orientation::N => 0.6,
    }
}

/// Linear interpolation over [`TILT_CURVE`]. Angles outside [0, 90] clamp
/// to the end points; callers validate the roof first.
pub fn tilt_efficiency(tilt_angle_degrees: f64) -> f64 {
    let tilt = tilt_angle_degrees.clamp(0.0, 90.0);
    for pair in TILT_CURVE.windows(2) {
        let (lo_angle, lo_eff) = pair[0];
        let (hi_angle, hi_eff) = pair[1];
        if tilt <= hi_angle {
            let t = (tilt - lo_angle) / (hi_angle - lo_angle);
            return lo_eff * (1.0 - t) + hi_eff * t;
        }
    }
    TILT_CURVE[TILT_CURVE.len() - 1].1
}

pub fn estimate_irradiance(cloud_cover_pct: f64) -> Result<f64> {
    let cloud_cover = ensure_range("cloud cover", cloud_cover_pct, 0.0, 100.0)?;
    Ok(MAX_CLEAR_SKY_IRRADIANCE * (1.0 - (cloud_cover / 100.0) * CLOUD_ATTENUATION_FACTOR))
}

impl EnvironmentalConditions {
    /// Builds a snapshot whose irradiance is estimated from cloud cover.
    pub fn from_cloud_cover(
        temperature_c: Option<f64>,
        humidity_pct: Option<f64>,
        cloud_cover_pct: f64,
    ) -> Result<Self> {
        Ok(Self {
            solar_irradiance_w_m2: Some(estimate_irradiance(cloud_cover_pct)?),
            temperature_c,
            humidity_pct,
            cloud_cover_pct: Some(cloud_cover_pct),
        })
    }
}

/// Measured irradiance if present, otherwise the cloud-cover estimate.
pub fn resolve_irradiance(conditions: Option<&EnvironmentalConditions>) -> Result<f64> {
    let conditions = conditions.ok_or_else(|| {
        AuditError::InvalidParameter("no environmental conditions recorded".to_string())
    })?;

    match (conditions.solar_irradiance_w_m2, conditions.cloud_cover_pct) {
        (Some(irradiance), _) => ensure_non_negative("irradiance", irradiance),
        (None, Some(cloud_cover)) => estimate_irradiance(cloud_cover),
        (None, None) => Err(AuditError::InvalidParameter(
            "conditions carry neither irradiance nor cloud cover".to_string(),
        )),
    }
}

pub fn estimate_annual_production(roof: &RoofProfile, irradiance_w_m2: f64) -> Result<f64> {
    roof.validate()?;
    let irradiance = ensure_non_negative("irradiance", irradiance_w_m2)?;

    Ok(roof.area_m2
        * irradiance
        * orientation_efficiency(roof.orientation)
        * tilt_efficiency(roof.tilt_angle_degrees)
        * (1.0 - roof.shading_factor)
        * PANEL_EFFICIENCY
        * HOURS_PER_YEAR_CONVERSION)
}

pub fn assess(
    roof: &RoofProfile,
    conditions: Option<&EnvironmentalConditions>,
) -> Result<SolarPotential> {
    let irradiance = resolve_irradiance(conditions)?;
    let annual_potential_kwh = estimate_annual_production(roof, irradiance)?;
    tracing::debug!(irradiance, annual_potential_kwh, "assessed solar potential");

    Ok(SolarPotential {
        irradiance_w_m2: irradiance,
        orientation_efficiency: orientation_efficiency(roof.orientation),
        tilt_efficiency: tilt_efficiency(roof.tilt_angle_degrees),
        annual_potential_kwh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ORIENTATIONS: [Orientation; 8] = [
        Orientation::N,
        Orientation::NE,
        Orientation::E,
        Orientation::SE,
        Orientation::S,
        Orientation::SW,
        Orientation::W,
        Orientation::NW,
    ];

    fn roof(area_m2: f64) -> RoofProfile {
        RoofProfile {
            area_m2,
            tilt_angle_degrees: 30.0,
            orientation: Orientation::S,
            shading_factor: 0.1,
        }
    }

    #[test]
    fn south_facing_is_the_best_orientation() {
        for orientation in ALL_ORIENTATIONS {
            assert!(orientation_efficiency(orientation) <= orientation_efficiency(Orientation::S));
        }
        assert!(orientation_efficiency(Orientation::N) < orientation_efficiency(Orientation::E));
    }

    #[test]
    fn tilt_curve_peaks_at_thirty_degrees() {
        assert_eq!(tilt_efficiency(30.0), 1.0);
        for angle in (0..=90).step_by(5) {
            assert!(tilt_efficiency(angle as f64) <= 1.0);
        }
        assert!((tilt_efficiency(7.5) - 0.915).abs() < 1e-9);
        assert!((tilt_efficiency(90.0) - 0.66).abs() < 1e-12);
        assert!(tilt_efficiency(0.0) < tilt_efficiency(15.0));
        assert!(tilt_efficiency(60.0) > tilt_efficiency(75.0));
    }

    // Linear cloud-cover approximation, not a physical sky model.
    #[test]
    fn irradiance_estimate_follows_linear_cloud_approximation() {
        assert_eq!(estimate_irradiance(0.0).unwrap(), 1000.0);
        assert_eq!(estimate_irradiance(100.0).unwrap(), 250.0);
        assert!((estimate_irradiance(40.0).unwrap() - 700.0).abs() < 1e-9);
        assert!(estimate_irradiance(120.0).is_err());
        assert!(estimate_irradiance(f64::NAN).is_err());
    }

    #[test]
    fn production_matches_reference_roof() {
        let kwh = estimate_annual_production(&roof(100.0), 1000.0).unwrap();
        let expected = 100.0 * 1000.0 * 0.9 * 0.18 * 1.46;
        assert!((kwh - expected).abs() < 1e-6);
    }

    #[test]
    fn production_is_non_negative_and_monotonic() {
        for orientation in ALL_ORIENTATIONS {
            let mut previous = 0.0;
            for step in 1..=20 {
                let profile = RoofProfile { orientation, ..roof(step as f64 * 5.0) };
                let kwh = estimate_annual_production(&profile, 800.0).unwrap();
                assert!(kwh >= 0.0);
                assert!(kwh > previous);
                previous = kwh;
            }

            let mut previous = -1.0;
            for step in 0..=20 {
                let profile = RoofProfile { orientation, ..roof(50.0) };
                let kwh = estimate_annual_production(&profile, step as f64 * 50.0).unwrap();
                assert!(kwh >= 0.0);
                assert!(kwh > previous);
                previous = kwh;
            }
        }
    }

    #[test]
    fn fully_shaded_roof_produces_nothing() {
        let shaded = RoofProfile { shading_factor: 1.0, ..roof(100.0) };
        assert_eq!(estimate_annual_production(&shaded, 1000.0).unwrap(), 0.0);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            estimate_annual_production(&roof(0.0), 1000.0),
            Err(AuditError::InvalidParameter(_))
        ));
        assert!(estimate_annual_production(&roof(100.0), -1.0).is_err());
        assert!(estimate_annual_production(&roof(100.0), f64::NAN).is_err());
    }

    #[test]
    fn missing_irradiance_falls_back_to_cloud_cover() {
        let conditions = EnvironmentalConditions {
            solar_irradiance_w_m2: None,
            temperature_c: Some(21.0),
            humidity_pct: None,
            cloud_cover_pct: Some(100.0),
        };
        assert_eq!(resolve_irradiance(Some(&conditions)).unwrap(), 250.0);
    }

    #[test]
    fn null_conditions_fail_fast() {
        let empty = EnvironmentalConditions {
            solar_irradiance_w_m2: None,
            temperature_c: None,
            humidity_pct: None,
            cloud_cover_pct: None,
        };
        assert!(matches!(
            resolve_irradiance(Some(&empty)),
            Err(AuditError::InvalidParameter(_))
        ));
        assert!(resolve_irradiance(None).is_err());
        assert!(assess(&roof(100.0), Some(&empty)).is_err());
    }

    #[test]
    fn assess_reports_intermediate_factors() {
        let conditions = EnvironmentalConditions::from_cloud_cover(Some(25.0), Some(40.0), 0.0)
            .unwrap();
        let potential = assess(&roof(100.0), Some(&conditions)).unwrap();
        assert_eq!(potential.irradiance_w_m2, 1000.0);
        assert_eq!(potential.orientation_efficiency, 1.0);
        assert_eq!(potential.tilt_efficiency, 1.0);
        assert!(potential.annual_potential_kwh > 0.0);
    }
}
