use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::finance;
use crate::models::{
    Coordinates, FinancialAnalysis, FinancialRecord, MeasurementRecord, PhotoRecord,
    PropertyRecord, RoofProfile, SolarPotential,
};
use crate::solar;

#[derive(Debug, Clone, Serialize)]
pub struct PropertyDetails {
    pub id: Uuid,
    pub address: String,
    pub coordinates: Coordinates,
    pub timezone: String,
    pub roof_specifications: RoofProfile,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub property_details: PropertyDetails,
    pub current_conditions: Option<MeasurementRecord>,
    pub documentation: Vec<PhotoRecord>,
    pub solar_potential: SolarPotential,
    pub financial_inputs: Option<FinancialRecord>,
    pub financial_analysis: FinancialAnalysis,
}

/// Assembles the full audit from records already loaded for one property.
pub fn build_report(
    property: &PropertyRecord,
    measurement: Option<&MeasurementRecord>,
    photos: &[PhotoRecord],
    financials: Option<&FinancialRecord>,
    horizon_years: u32,
    generated_at: DateTime<Utc>,
) -> Result<AuditReport> {
    let solar_potential = solar::assess(
        &property.roof,
        measurement.map(|record| &record.conditions),
    )?;
    let financial_analysis = finance::project(
        property.id,
        financials.map(|record| &record.params),
        solar_potential.annual_potential_kwh,
        horizon_years,
    )?;

    Ok(AuditReport {
        generated_at,
        property_details: PropertyDetails {
            id: property.id,
            address: property.address.clone(),
            coordinates: property.coordinates,
            timezone: property.timezone.clone(),
            roof_specifications: property.roof,
            registered_at: property.created_at,
        },
        current_conditions: measurement.cloned(),
        documentation: photos.to_vec(),
        solar_potential,
        financial_inputs: financials.cloned(),
        financial_analysis,
    })
}

pub fn render_summary(address: &str, analysis: &FinancialAnalysis) -> String {
    let mut output = String::new();
    let details = &analysis.system_details;
    let summary = &analysis.summary;

    let _ = writeln!(output, "Solar audit summary for {address}");
    let _ = writeln!(output);
    let _ = writeln!(output, "System Specifications:");
    let _ = writeln!(output, "- System size: {:.2} kW", details.size_kw);
    let _ = writeln!(output, "- Base cost: ${:.2}", details.base_cost);
    let _ = writeln!(output, "- Incentives: ${:.2}", details.incentives);
    let _ = writeln!(output, "- Net cost: ${:.2}", details.net_cost);

    let _ = writeln!(output);
    let _ = writeln!(output, "Financial Projections:");
    let _ = writeln!(
        output,
        "- {}-year savings: ${:.2}",
        summary.horizon_years, summary.total_savings
    );
    let _ = writeln!(
        output,
        "- Average annual savings: ${:.2}",
        summary.average_annual_savings
    );
    match summary.break_even_year {
        Some(year) => {
            let _ = writeln!(output, "- Break-even year: {year}");
        }
        None => {
            let _ = writeln!(output, "- Break-even year: not reached");
        }
    }

    if let Some(financing) = &analysis.financing {
        let _ = writeln!(output);
        let _ = writeln!(output, "Financing:");
        let _ = writeln!(output, "- Monthly payment: ${:.2}", financing.monthly_payment);
        let _ = writeln!(output, "- Total paid: ${:.2}", financing.total_paid);
        let _ = writeln!(output, "- Total interest: ${:.2}", financing.total_interest);
    }

    output
}

pub fn render_yearly_table(analysis: &FinancialAnalysis) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:>4}  {:>12}  {:>7}  {:>11}  {:>12}  {:>8}",
        "year", "kWh", "rate", "net", "cumulative", "roi %"
    );
    for row in &analysis.yearly_table {
        let _ = writeln!(
            output,
            "{:>4}  {:>12.2}  {:>7.3}  {:>11.2}  {:>12.2}  {:>8.2}",
            row.year,
            row.production_kwh,
            row.electricity_rate,
            row.net_savings,
            row.cumulative_savings,
            row.roi_pct
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::models::{EnvironmentalConditions, FinancialParameters, Orientation};
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample_property() -> PropertyRecord {
        PropertyRecord {
            id: Uuid::new_v4(),
            address: "123 Sun Street, Solar City, SC 12345".to_string(),
            coordinates: Coordinates {
                latitude: 34.0,
                longitude: -81.0,
            },
            timezone: "America/New_York".to_string(),
            roof: RoofProfile {
                area_m2: 100.0,
                tilt_angle_degrees: 30.0,
                orientation: Orientation::S,
                shading_factor: 0.1,
            },
            created_at: timestamp(),
        }
    }

    fn sample_measurement(irradiance: Option<f64>) -> MeasurementRecord {
        MeasurementRecord {
            id: Uuid::new_v4(),
            conditions: EnvironmentalConditions {
                solar_irradiance_w_m2: irradiance,
                temperature_c: Some(24.0),
                humidity_pct: Some(55.0),
                cloud_cover_pct: None,
            },
            recorded_at: timestamp(),
        }
    }

    fn sample_financials() -> FinancialRecord {
        FinancialRecord {
            id: Uuid::new_v4(),
            params: FinancialParameters {
                electricity_rate_per_kwh: 0.12,
                install_cost_per_watt: 2.75,
                incentives: 5000.0,
                financing_rate_pct: 4.5,
                financing_term_years: 20,
                annual_maintenance_cost: 200.0,
                annual_price_escalation_pct: 0.03,
            },
            recorded_at: timestamp(),
        }
    }

    #[test]
    fn report_chains_solar_estimate_into_projection() {
        let property = sample_property();
        let measurement = sample_measurement(Some(1000.0));
        let financials = sample_financials();
        let report = build_report(
            &property,
            Some(&measurement),
            &[],
            Some(&financials),
            25,
            timestamp(),
        )
        .unwrap();

        let expected_kwh = 100.0 * 1000.0 * 0.9 * 0.18 * 1.46;
        assert!((report.solar_potential.annual_potential_kwh - expected_kwh).abs() < 1e-6);
        assert_eq!(report.financial_analysis.yearly_table.len(), 25);
        assert_eq!(report.property_details.id, property.id);
        assert!(report.financial_analysis.financing.is_some());
        assert_eq!(
            report.financial_inputs.map(|record| record.recorded_at),
            Some(timestamp())
        );
    }

    #[test]
    fn report_without_financials_fails() {
        let property = sample_property();
        let measurement = sample_measurement(Some(800.0));
        let result = build_report(&property, Some(&measurement), &[], None, 25, timestamp());
        assert!(matches!(result, Err(AuditError::MissingFinancialData(id)) if id == property.id));
    }

    #[test]
    fn report_with_null_irradiance_fails_fast() {
        let property = sample_property();
        let measurement = sample_measurement(None);
        let financials = sample_financials();
        let result = build_report(
            &property,
            Some(&measurement),
            &[],
            Some(&financials),
            25,
            timestamp(),
        );
        assert!(matches!(result, Err(AuditError::InvalidParameter(_))));
    }

    #[test]
    fn report_serializes_to_nested_json() {
        let property = sample_property();
        let measurement = sample_measurement(Some(900.0));
        let financials = sample_financials();
        let report = build_report(
            &property,
            Some(&measurement),
            &[],
            Some(&financials),
            10,
            timestamp(),
        )
        .unwrap();

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value["property_details"]["roof_specifications"]["orientation"],
            "S"
        );
        assert_eq!(
            value["financial_analysis"]["yearly_table"]
                .as_array()
                .map(|rows| rows.len()),
            Some(10)
        );
        assert!(value["documentation"].as_array().is_some());
    }

    #[test]
    fn summary_mentions_break_even_and_financing() {
        let analysis =
            finance::project(Uuid::new_v4(), Some(&sample_financials().params), 14_600.0, 25)
                .unwrap();
        let text = render_summary("123 Sun Street", &analysis);
        assert!(text.contains("Solar audit summary for 123 Sun Street"));
        assert!(text.contains("- System size: 10.00 kW"));
        assert!(text.contains("- Net cost: $22500.00"));
        assert!(text.contains("Break-even year:"));
        assert!(text.contains("Monthly payment: $142.35"));
    }

    #[test]
    fn yearly_table_has_one_line_per_year() {
        let analysis =
            finance::project(Uuid::new_v4(), Some(&sample_financials().params), 14_600.0, 5)
                .unwrap();
        let table = render_yearly_table(&analysis);
        assert_eq!(table.lines().count(), 6);
        assert!(table.lines().nth(1).is_some_and(|line| line.trim_start().starts_with('1')));
    }
}
