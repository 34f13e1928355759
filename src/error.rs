use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the solar and financial computations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuditError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("no financial data recorded for property {0}")]
    MissingFinancialData(Uuid),
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

pub type Result<T, E = AuditError> = std::result::Result<T, E>;

/// Rejects NaN and infinities before any range check runs.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AuditError::InvalidParameter(format!(
            "{name} must be a finite number, got {value}"
        )))
    }
}

pub(crate) fn ensure_range(name: &str, value: f64, min: f64, max: f64) -> Result<f64> {
    let value = ensure_finite(name, value)?;
    if value < min || value > max {
        return Err(AuditError::InvalidParameter(format!(
            "{name} must be within [{min}, {max}], got {value}"
        )));
    }
    Ok(value)
}

pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<f64> {
    let value = ensure_finite(name, value)?;
    if value <= 0.0 {
        return Err(AuditError::InvalidParameter(format!(
            "{name} must be greater than zero, got {value}"
        )));
    }
    Ok(value)
}

pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<f64> {
    let value = ensure_finite(name, value)?;
    if value < 0.0 {
        return Err(AuditError::InvalidParameter(format!(
            "{name} must not be negative, got {value}"
        )));
    }
    Ok(value)
}
