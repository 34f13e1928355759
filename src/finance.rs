use tracing::warn;
use uuid::Uuid;

use crate::error::{ensure_finite, ensure_non_negative, AuditError, Result};
use crate::models::{
    FinancialAnalysis, FinancialParameters, FinancingSchedule, ProjectionSummary, SystemDetails,
    YearlyProjection,
};

pub const DEFAULT_HORIZON_YEARS: u32 = 25;
/// Linear degradation reaches zero output at this age.
pub const MAX_HORIZON_YEARS: u32 = 200;
pub const MAX_FINANCING_TERM_YEARS: u32 = 100;
/// Linear output loss per year of panel age.
pub const DEGRADATION_PER_YEAR: f64 = 0.005;
/// Equivalent full-sun hours per year used to back out system capacity.
pub const SIZING_SUN_HOURS_PER_YEAR: f64 = 365.0 * 4.0;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn system_size_kw(annual_production_kwh: f64) -> f64 {
    annual_production_kwh / SIZING_SUN_HOURS_PER_YEAR
}

/// Output in a given year; goes negative past year 200.
pub fn degraded_production(annual_production_kwh: f64, year: u32) -> f64 {
    annual_production_kwh * (1.0 - DEGRADATION_PER_YEAR * year as f64)
}

/// Fixed-payment amortization of `principal` over `term_years`.
pub fn amortize(
    principal: f64,
    financing_rate_pct: f64,
    financing_term_years: u32,
) -> Result<FinancingSchedule> {
    let principal = ensure_finite("principal", principal)?;
    let rate_pct = ensure_non_negative("financing rate", financing_rate_pct)?;
    if financing_term_years == 0 || financing_term_years > MAX_FINANCING_TERM_YEARS {
        return Err(AuditError::InvalidParameter(format!(
            "financing term must be between 1 and {MAX_FINANCING_TERM_YEARS} years, got {financing_term_years}"
        )));
    }

    let monthly_rate = rate_pct / 12.0 / 100.0;
    let num_payments = i32::try_from(financing_term_years * 12).map_err(|_| {
        AuditError::InvalidParameter(format!(
            "financing term of {financing_term_years} years is too long"
        ))
    })?;

    let monthly_payment = if monthly_rate == 0.0 {
        principal / num_payments as f64
    } else {
        let growth = (1.0 + monthly_rate).powi(num_payments);
        principal * monthly_rate * growth / (growth - 1.0)
    };
    let total_paid = monthly_payment * num_payments as f64;

    Ok(FinancingSchedule {
        monthly_payment: round_to(monthly_payment, 2),
        total_paid: round_to(total_paid, 2),
        total_interest: round_to(total_paid - principal, 2),
    })
}

/// First year whose cumulative savings cover the net system cost.
pub fn break_even_year(table: &[YearlyProjection], net_cost: f64) -> Option<u32> {
    table
        .iter()
        .find(|row| row.cumulative_savings >= net_cost)
        .map(|row| row.year)
}

pub fn project(
    property_id: Uuid,
    financials: Option<&FinancialParameters>,
    annual_production_kwh: f64,
    horizon_years: u32,
) -> Result<FinancialAnalysis> {
    let params = financials.ok_or(AuditError::MissingFinancialData(property_id))?;
    params.validate()?;
    let annual_production = ensure_non_negative("annual production", annual_production_kwh)?;
    if horizon_years == 0 || horizon_years > MAX_HORIZON_YEARS {
        return Err(AuditError::InvalidParameter(format!(
            "projection horizon must be between 1 and {MAX_HORIZON_YEARS} years, got {horizon_years}"
        )));
    }

    let size_kw = system_size_kw(annual_production);
    let base_cost = size_kw * 1000.0 * params.install_cost_per_watt;
    let net_cost = base_cost - params.incentives;
    if net_cost <= 0.0 {
        warn!(%property_id, net_cost, "incentives cover the full system cost; ROI reported as 0");
    }

    let mut yearly_table = Vec::with_capacity(horizon_years as usize);
    let mut cumulative_savings = 0.0;
    let mut electricity_rate = params.electricity_rate_per_kwh;

    for year in 1..=horizon_years {
        let production = degraded_production(annual_production, year);
        let savings = production * electricity_rate;
        let net_savings = savings - params.annual_maintenance_cost;
        cumulative_savings += net_savings;

        let roi_pct = if net_cost > 0.0 {
            cumulative_savings / net_cost * 100.0
        } else {
            0.0
        };

        // The recorded rate is the one that applies to the following year.
        electricity_rate *= 1.0 + params.annual_price_escalation_pct;

        yearly_table.push(YearlyProjection {
            year,
            production_kwh: round_to(production, 2),
            electricity_rate: round_to(electricity_rate, 3),
            net_savings: round_to(net_savings, 2),
            cumulative_savings: round_to(cumulative_savings, 2),
            roi_pct: round_to(roi_pct, 2),
        });
    }

    let financing = if params.financing_rate_pct > 0.0 && params.financing_term_years > 0 {
        Some(amortize(
            net_cost,
            params.financing_rate_pct,
            params.financing_term_years,
        )?)
    } else {
        None
    };

    let break_even = break_even_year(&yearly_table, net_cost);
    if break_even.is_none() {
        warn!(%property_id, horizon_years, "break-even not reached within horizon");
    }

    Ok(FinancialAnalysis {
        system_details: SystemDetails {
            size_kw: round_to(size_kw, 2),
            base_cost: round_to(base_cost, 2),
            incentives: round_to(params.incentives, 2),
            net_cost: round_to(net_cost, 2),
        },
        financing,
        yearly_table,
        summary: ProjectionSummary {
            horizon_years,
            total_savings: round_to(cumulative_savings, 2),
            average_annual_savings: round_to(cumulative_savings / horizon_years as f64, 2),
            break_even_year: break_even,
        },
    })
}
