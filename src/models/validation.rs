use serde::Serialize;

/// One rejected field with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Every field-level violation found on a write, reported together.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Validation failed for {} field(s)", fields.len())]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn from_fields(fields: Vec<FieldError>) -> Result<(), ValidationError> {
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { fields })
        }
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            fields: vec![FieldError::new(field, message)],
        }
    }
}

/// Push an error when a present value falls outside `[min, max]`.
pub(crate) fn check_range(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<f64>,
    min: f64,
    max: f64,
) {
    if let Some(v) = value {
        if !v.is_finite() || v < min || v > max {
            errors.push(FieldError::new(field, format!("must be between {min} and {max}")));
        }
    }
}

pub(crate) fn check_min(errors: &mut Vec<FieldError>, field: &str, value: Option<f64>, min: f64) {
    if let Some(v) = value {
        if !v.is_finite() || v < min {
            errors.push(FieldError::new(field, format!("must be at least {min}")));
        }
    }
}

pub(crate) fn check_max_len(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    max: usize,
) {
    if let Some(v) = value {
        if v.chars().count() > max {
            errors.push(FieldError::new(field, format!("must be at most {max} characters")));
        }
    }
}
