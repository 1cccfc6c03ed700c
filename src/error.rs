use crate::data::types::ArimaOrder;

/// A numerical computation could not produce a usable result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputationError {
    #[error("No input values")]
    EmptyInput,

    #[error("Non-finite {0} in result")]
    NonFinite(&'static str),

    #[error("Unsupported model order {order}: p, d and q must each be at most {max}")]
    OrderTooLarge { order: ArimaOrder, max: usize },

    #[error("Too many forecast steps: {steps} exceeds the maximum of {max}")]
    TooManySteps { steps: usize, max: usize },

    #[error(
        "Series too short for ARIMA{order}: {remaining} observations left after differencing, need at least {required}"
    )]
    SeriesTooShort { order: ArimaOrder, remaining: usize, required: usize },

    #[error("Degenerate series: no variation left after differencing")]
    DegenerateSeries,

    #[error("Model failed to converge after {0} iterations")]
    NotConverged(usize),

    #[error("Numerical instability during fitting: {0}")]
    Numerical(String),
}
