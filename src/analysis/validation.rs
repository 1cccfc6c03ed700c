use crate::data::types::{DataItem, ForecastRequest, MIN_SERIES_LEN};

/// Rejects request payloads before any computation runs. Only the first
/// violation found is reported.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("{0} must not be empty")]
    EmptyList(&'static str),

    #[error("items[{0}].category must not be empty")]
    EmptyCategory(usize),

    #[error("{field}[{index}] must be a finite number")]
    NonFiniteValue { field: &'static str, index: usize },

    #[error("At least {required} values are required for ARIMA, got {actual}")]
    SeriesTooShort { required: usize, actual: usize },

    #[error("steps must be a positive integer")]
    NonPositiveSteps,
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::MalformedBody(err.to_string())
    }
}

pub fn validate_items(items: &[DataItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyList("items"));
    }

    for (index, item) in items.iter().enumerate() {
        if item.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory(index));
        }
        if !item.value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "items", index });
        }
    }

    Ok(())
}

pub fn validate_values(values: &[f64]) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::EmptyList("values"));
    }
    check_finite("values", values)
}

pub fn validate_forecast(request: &ForecastRequest) -> Result<(), ValidationError> {
    // Length goes first so a short series is reported as such whatever else is wrong.
    if request.values.len() < MIN_SERIES_LEN {
        return Err(ValidationError::SeriesTooShort {
            required: MIN_SERIES_LEN,
            actual: request.values.len(),
        });
    }
    check_finite("values", &request.values)?;

    if request.steps == 0 {
        return Err(ValidationError::NonPositiveSteps);
    }

    Ok(())
}

/// Decodes and validates a forecast body. A short `values` array is reported
/// even when other fields would fail to decode.
pub fn decode_forecast(body: &[u8]) -> Result<ForecastRequest, ValidationError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if let Some(values) = value.get("values").and_then(serde_json::Value::as_array) {
        if values.len() < MIN_SERIES_LEN {
            return Err(ValidationError::SeriesTooShort {
                required: MIN_SERIES_LEN,
                actual: values.len(),
            });
        }
    }

    let request: ForecastRequest = serde_json::from_value(value)?;
    validate_forecast(&request)?;
    Ok(request)
}

fn check_finite(field: &'static str, values: &[f64]) -> Result<(), ValidationError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ValidationError::NonFiniteValue { field, index }),
        None => Ok(()),
    }
}
