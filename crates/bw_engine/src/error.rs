use thiserror::Error;

/// Errors raised by the estimator and the preset catalog.
#[derive(Error, Debug)]
pub enum EstimateError {
    /// A workload, hardware or model value is outside its valid domain.
    #[error("invalid input `{field}`: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Preset data could not be normalized into a usable configuration.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// A preset name was not found in the catalog.
    #[error("unknown {kind} preset `{name}`")]
    UnknownPreset { kind: &'static str, name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EstimateError>;

impl EstimateError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EstimateError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejects zero, negative, `NaN` and infinite values.
pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EstimateError::invalid(
            field,
            format!("must be a positive finite number, got {value}"),
        ))
    }
}

pub(crate) fn ensure_nonzero(field: &'static str, value: u64) -> Result<u64> {
    if value == 0 {
        Err(EstimateError::invalid(field, "must be at least 1"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EstimateError::invalid("target_latency_ms", "must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid input `target_latency_ms`: must be > 0"
        );
    }

    #[test]
    fn test_ensure_positive_rejects_non_finite() {
        assert!(ensure_positive("x", 0.0).is_err());
        assert!(ensure_positive("x", -1.0).is_err());
        assert!(ensure_positive("x", f64::NAN).is_err());
        assert!(ensure_positive("x", f64::INFINITY).is_err());
        assert_eq!(ensure_positive("x", 2.5).unwrap(), 2.5);
    }

    #[test]
    fn test_ensure_nonzero() {
        assert!(ensure_nonzero("batch_size", 0).is_err());
        assert_eq!(ensure_nonzero("batch_size", 4).unwrap(), 4);
    }
}
