pub mod arima;
pub mod optimizer;
pub mod params;
pub mod state_space;

use tracing::debug;

use crate::config::ForecastConfig;
use crate::data::types::ArimaOrder;
use crate::error::ComputationError;

/// Fits a model to a series and returns point forecasts.
pub trait Forecaster: Send + Sync {
    fn fit_and_forecast(
        &self,
        series: &[f64],
        order: ArimaOrder,
        steps: usize,
    ) -> Result<Vec<f64>, ComputationError>;
}

pub struct ArimaForecaster {
    config: ForecastConfig,
}

impl ArimaForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }
}

impl Forecaster for ArimaForecaster {
    fn fit_and_forecast(
        &self,
        series: &[f64],
        order: ArimaOrder,
        steps: usize,
    ) -> Result<Vec<f64>, ComputationError> {
        if steps > self.config.max_steps {
            return Err(ComputationError::TooManySteps { steps, max: self.config.max_steps });
        }

        let fitted = arima::fit(series, order, &self.config)?;
        debug!(
            "ARIMA{} fitted in {} iterations: loglik={:.4} sigma2={:.6} mean={:.6} ar={:?} ma={:?}",
            fitted.order(),
            fitted.iterations(),
            fitted.log_likelihood(),
            fitted.sigma2(),
            fitted.mean(),
            fitted.ar(),
            fitted.ma(),
        );

        let forecast = fitted.forecast(steps)?;
        debug_assert_eq!(forecast.len(), steps);
        Ok(forecast)
    }
}
