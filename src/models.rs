use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{
    ensure_finite, ensure_non_negative, ensure_positive, ensure_range, AuditError, Result,
};
use crate::finance::MAX_FINANCING_TERM_YEARS;

/// Compass direction a roof plane faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::N => "N",
            Orientation::NE => "NE",
            Orientation::E => "E",
            Orientation::SE => "SE",
            Orientation::S => "S",
            Orientation::SW => "SW",
            Orientation::W => "W",
            Orientation::NW => "NW",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "N" | "NORTH" => Ok(Orientation::N),
            "NE" | "NORTHEAST" => Ok(Orientation::NE),
            "E" | "EAST" => Ok(Orientation::E),
            "SE" | "SOUTHEAST" => Ok(Orientation::SE),
            "S" | "SOUTH" => Ok(Orientation::S),
            "SW" | "SOUTHWEST" => Ok(Orientation::SW),
            "W" | "WEST" => Ok(Orientation::W),
            "NW" | "NORTHWEST" => Ok(Orientation::NW),
            _ => Err(AuditError::InvalidParameter(format!(
                "unknown roof orientation: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoofProfile {
    pub area_m2: f64,
    pub tilt_angle_degrees: f64,
    pub orientation: Orientation,
    /// Fraction of potential lost to shade.
    pub shading_factor: f64,
}

impl RoofProfile {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("roof area", self.area_m2)?;
        ensure_range("tilt angle", self.tilt_angle_degrees, 0.0, 90.0)?;
        ensure_range("shading factor", self.shading_factor, 0.0, 1.0)?;
        Ok(())
    }
}

/// Snapshot of conditions at one measurement event. Any field may be missing
/// when the upstream weather source returned partial data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalConditions {
    pub solar_irradiance_w_m2: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
}

impl EnvironmentalConditions {
    pub fn validate(&self) -> Result<()> {
        if let Some(irradiance) = self.solar_irradiance_w_m2 {
            ensure_non_negative("irradiance", irradiance)?;
        }
        if let Some(temperature) = self.temperature_c {
            ensure_finite("temperature", temperature)?;
        }
        if let Some(humidity) = self.humidity_pct {
            ensure_range("humidity", humidity, 0.0, 100.0)?;
        }
        if let Some(cloud_cover) = self.cloud_cover_pct {
            ensure_range("cloud cover", cloud_cover, 0.0, 100.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancialParameters {
    pub electricity_rate_per_kwh: f64,
    pub install_cost_per_watt: f64,
    pub incentives: f64,
    /// Annual loan rate in percent, e.g. 4.5.
    pub financing_rate_pct: f64,
    pub financing_term_years: u32,
    pub annual_maintenance_cost: f64,
    /// Yearly electricity price growth as a fraction, e.g. 0.03.
    pub annual_price_escalation_pct: f64,
}

impl FinancialParameters {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("electricity rate", self.electricity_rate_per_kwh)?;
        ensure_positive("install cost per watt", self.install_cost_per_watt)?;
        ensure_non_negative("incentives", self.incentives)?;
        ensure_non_negative("financing rate", self.financing_rate_pct)?;
        if self.financing_term_years > MAX_FINANCING_TERM_YEARS {
            return Err(AuditError::InvalidParameter(format!(
                "financing term must not exceed {MAX_FINANCING_TERM_YEARS} years, got {}",
                self.financing_term_years
            )));
        }
        ensure_non_negative("annual maintenance cost", self.annual_maintenance_cost)?;
        ensure_non_negative("price escalation", self.annual_price_escalation_pct)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyProjection {
    pub year: u32,
    pub production_kwh: f64,
    pub electricity_rate: f64,
    pub net_savings: f64,
    pub cumulative_savings: f64,
    pub roi_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancingSchedule {
    pub monthly_payment: f64,
    pub total_paid: f64,
    pub total_interest: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemDetails {
    pub size_kw: f64,
    pub base_cost: f64,
    pub incentives: f64,
    pub net_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub horizon_years: u32,
    pub total_savings: f64,
    pub average_annual_savings: f64,
    pub break_even_year: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialAnalysis {
    pub system_details: SystemDetails,
    pub financing: Option<FinancingSchedule>,
    pub yearly_table: Vec<YearlyProjection>,
    pub summary: ProjectionSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarPotential {
    pub irradiance_w_m2: f64,
    pub orientation_efficiency: f64,
    pub tilt_efficiency: f64,
    pub annual_potential_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn validate(&self) -> Result<()> {
        ensure_range("latitude", self.latitude, -90.0, 90.0)?;
        ensure_range("longitude", self.longitude, -180.0, 180.0)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub id: Uuid,
    pub address: String,
    pub coordinates: Coordinates,
    pub timezone: String,
    pub roof: RoofProfile,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub id: Uuid,
    pub conditions: EnvironmentalConditions,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRecord {
    pub id: Uuid,
    pub params: FinancialParameters,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoRecord {
    pub id: Uuid,
    pub photo_type: String,
    pub file_name: String,
    pub gps: Coordinates,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Input row for bulk property imports. Coordinates are supplied directly
/// since addresses are not geocoded here.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyCsvRow {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub roof_area_m2: f64,
    pub tilt_angle_degrees: f64,
    pub orientation: String,
    pub shading_factor: f64,
}

impl PropertyCsvRow {
    pub fn into_parts(self) -> Result<(String, Coordinates, String, RoofProfile)> {
        let coordinates = Coordinates {
            latitude: ensure_finite("latitude", self.latitude)?,
            longitude: ensure_finite("longitude", self.longitude)?,
        };
        coordinates.validate()?;
        let roof = RoofProfile {
            area_m2: self.roof_area_m2,
            tilt_angle_degrees: self.tilt_angle_degrees,
            orientation: self.orientation.parse()?,
            shading_factor: self.shading_factor,
        };
        roof.validate()?;
        Ok((self.address, coordinates, self.timezone, roof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_roof() -> RoofProfile {
        RoofProfile {
            area_m2: 100.0,
            tilt_angle_degrees: 30.0,
            orientation: Orientation::S,
            shading_factor: 0.1,
        }
    }

    #[test]
    fn orientation_parses_abbreviations_and_names() {
        assert_eq!("s".parse::<Orientation>(), Ok(Orientation::S));
        assert_eq!(" sw ".parse::<Orientation>(), Ok(Orientation::SW));
        assert_eq!("NorthEast".parse::<Orientation>(), Ok(Orientation::NE));
        assert!(matches!(
            "up".parse::<Orientation>(),
            Err(AuditError::InvalidParameter(_))
        ));
    }

    #[test]
    fn orientation_serializes_as_abbreviation() {
        let json = serde_json::to_string(&Orientation::NW).unwrap();
        assert_eq!(json, "\"NW\"");
        assert_eq!(Orientation::NW.to_string(), "NW");
    }

    #[test]
    fn roof_validation_rejects_out_of_range_values() {
        assert!(sample_roof().validate().is_ok());

        let negative_area = RoofProfile { area_m2: -5.0, ..sample_roof() };
        assert!(negative_area.validate().is_err());

        let steep = RoofProfile { tilt_angle_degrees: 95.0, ..sample_roof() };
        assert!(steep.validate().is_err());

        let overshaded = RoofProfile { shading_factor: 1.2, ..sample_roof() };
        assert!(overshaded.validate().is_err());
    }

    #[test]
    fn conditions_validation_checks_present_fields_only() {
        let partial = EnvironmentalConditions {
            solar_irradiance_w_m2: None,
            temperature_c: Some(-4.0),
            humidity_pct: None,
            cloud_cover_pct: Some(35.0),
        };
        assert!(partial.validate().is_ok());

        let cloudy = EnvironmentalConditions { cloud_cover_pct: Some(140.0), ..partial };
        assert!(cloudy.validate().is_err());

        let dark = EnvironmentalConditions { solar_irradiance_w_m2: Some(-10.0), ..partial };
        assert!(dark.validate().is_err());
    }

    #[test]
    fn financial_validation_requires_positive_rate_and_cost() {
        let params = FinancialParameters {
            electricity_rate_per_kwh: 0.12,
            install_cost_per_watt: 2.75,
            incentives: 5000.0,
            financing_rate_pct: 4.5,
            financing_term_years: 20,
            annual_maintenance_cost: 200.0,
            annual_price_escalation_pct: 0.03,
        };
        assert!(params.validate().is_ok());

        let free_power = FinancialParameters { electricity_rate_per_kwh: 0.0, ..params };
        assert!(free_power.validate().is_err());

        let negative_incentive = FinancialParameters { incentives: -1.0, ..params };
        assert!(negative_incentive.validate().is_err());

        let century_loan = FinancialParameters { financing_term_years: 100, ..params };
        assert!(century_loan.validate().is_ok());

        let endless_loan = FinancialParameters { financing_term_years: 101, ..params };
        assert!(endless_loan.validate().is_err());
    }

    #[test]
    fn csv_row_converts_into_validated_parts() {
        let row = PropertyCsvRow {
            address: "123 Sun Street".to_string(),
            latitude: 34.0,
            longitude: -81.0,
            timezone: "America/New_York".to_string(),
            roof_area_m2: 100.0,
            tilt_angle_degrees: 30.0,
            orientation: "S".to_string(),
            shading_factor: 0.1,
        };
        let (address, coordinates, timezone, roof) = row.clone().into_parts().unwrap();
        assert_eq!(address, "123 Sun Street");
        assert_eq!(coordinates.latitude, 34.0);
        assert_eq!(timezone, "America/New_York");
        assert_eq!(roof, sample_roof());

        let bad = PropertyCsvRow { latitude: 120.0, ..row };
        assert!(bad.into_parts().is_err());
    }
}
