use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;
use warp::{Rejection, Reply};

use crate::analysis::grouping::group_by_category;
use crate::analysis::shaping::ResponseShaper;
use crate::analysis::stats::describe;
use crate::analysis::validation::{decode_forecast, validate_items, validate_values, ValidationError};
use crate::api::error::ApiError;
use crate::config::Config;
use crate::data::types::{
    AnalyzeRequest, ApiInfo, ForecastRequest, HealthStatus, StatsRequest,
};
use crate::forecasting::{ArimaForecaster, Forecaster};
#[cfg(feature = "metrics")]
use crate::monitoring::metrics::RequestMetrics;

pub const ENDPOINTS: [&str; 5] = ["/", "/health", "/analyze", "/stats", "/forecast/arima"];

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppContext {
    shaper: ResponseShaper,
    forecaster: Arc<dyn Forecaster>,
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<RequestMetrics>>,
}

impl AppContext {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            shaper: ResponseShaper::new(config.analysis.decimal_places),
            forecaster: Arc::new(ArimaForecaster::new(config.forecast.clone())),
            #[cfg(feature = "metrics")]
            metrics: if config.monitoring.metrics_enabled {
                Some(Arc::new(RequestMetrics::new()?))
            } else {
                None
            },
        })
    }

    #[cfg(test)]
    pub fn with_forecaster(mut self, forecaster: Arc<dyn Forecaster>) -> Self {
        self.forecaster = forecaster;
        self
    }

    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<Arc<RequestMetrics>> {
        self.metrics.clone()
    }
}

fn malformed(err: serde_json::Error) -> ApiError {
    ApiError::Validation(ValidationError::from(err))
}

pub async fn root() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&ApiInfo {
        name: "Data Flow Analyzer",
        message: "Welcome to Data Flow Analyzer API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS.to_vec(),
    }))
}

pub async fn health() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&HealthStatus { status: "ok" }))
}

pub async fn analyze(body: Bytes, ctx: AppContext) -> Result<impl Reply, Rejection> {
    let request = AnalyzeRequest::from_json(&body).map_err(malformed)?;
    validate_items(&request.items).map_err(ApiError::from)?;

    let results = group_by_category(&request.items).map_err(ApiError::from)?;
    debug!("Grouped {} items into {} categories", request.items.len(), results.len());

    Ok(warp::reply::json(&ctx.shaper.analysis(results)))
}

pub async fn stats(body: Bytes, ctx: AppContext) -> Result<impl Reply, Rejection> {
    let request = StatsRequest::from_json(&body).map_err(malformed)?;
    validate_values(&request.values).map_err(ApiError::from)?;

    let summary = describe(&request.values).map_err(ApiError::from)?;
    Ok(warp::reply::json(&ctx.shaper.stats(summary)))
}

pub async fn forecast(body: Bytes, ctx: AppContext) -> Result<impl Reply, Rejection> {
    let request = decode_forecast(&body).map_err(ApiError::from)?;

    let ForecastRequest { values, order, steps } = request;
    let forecaster = Arc::clone(&ctx.forecaster);
    // Fitting is CPU-bound; keep it off the reactor threads.
    let forecast = tokio::task::spawn_blocking(move || {
        forecaster.fit_and_forecast(&values, order, steps)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("forecast task failed: {}", e)))?
    .map_err(ApiError::from)?;

    Ok(warp::reply::json(&ctx.shaper.forecast(forecast, order)))
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub async fn metrics(ctx: AppContext) -> Result<warp::reply::Response, Rejection> {
    #[cfg(feature = "metrics")]
    if let Some(metrics) = ctx.metrics.as_ref() {
        let body = metrics
            .render()
            .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {}", e)))?;
        return Ok(warp::reply::with_header(body, "content-type", "text/plain; version=0.0.4")
            .into_response());
    }

    Err(warp::reject::not_found())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::routes;
    use crate::data::types::ArimaOrder;
    use crate::error::ComputationError;
    use serde_json::{json, Value};
    use warp::http::StatusCode;

    const README_SERIES: [f64; 10] = [3.2, 1.9, 6.5, 2.9, 5.9, 23.12, 61.2, 99.99, 100.21, 21.22];

    fn context() -> AppContext {
        AppContext::new(&Config::default()).unwrap()
    }

    async fn post(ctx: AppContext, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = warp::test::request()
            .method("POST")
            .path(path)
            .json(body)
            .reply(&routes(ctx, &Config::default()))
            .await;
        let status = response.status();
        (status, serde_json::from_slice(response.body()).unwrap())
    }

    async fn get(path: &str) -> (StatusCode, Value) {
        let response = warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(context(), &Config::default()))
            .await;
        let status = response.status();
        (status, serde_json::from_slice(response.body()).unwrap())
    }

    struct FailingForecaster;

    impl Forecaster for FailingForecaster {
        fn fit_and_forecast(
            &self,
            _series: &[f64],
            _order: ArimaOrder,
            _steps: usize,
        ) -> Result<Vec<f64>, ComputationError> {
            Err(ComputationError::NotConverged(42))
        }
    }

    struct PanickingForecaster;

    impl Forecaster for PanickingForecaster {
        fn fit_and_forecast(
            &self,
            _series: &[f64],
            _order: ArimaOrder,
            _steps: usize,
        ) -> Result<Vec<f64>, ComputationError> {
            panic!("boom")
        }
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let (status, body) = get("/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["endpoints"].as_array().unwrap().len(), ENDPOINTS.len());
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_stats_of_one_to_five() {
        let (status, body) = post(context(), "/stats", &json!({"values": [1, 2, 3, 4, 5]})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 5);
        assert_eq!(body["mean"], 3.0);
        assert_eq!(body["median"], 3.0);
        assert_eq!(body["std_dev"], 1.581139);
        assert_eq!(body["min"], 1.0);
        assert_eq!(body["max"], 5.0);
    }

    #[tokio::test]
    async fn test_stats_accepts_bare_array() {
        let (status, body) = post(context(), "/stats", &json!([2.5])).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["std_dev"], 0.0);
    }

    #[tokio::test]
    async fn test_stats_empty_is_rejected() {
        let (status, body) = post(context(), "/stats", &json!({"values": []})).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_analyze_groups_by_category() {
        let items = json!({"items": [
            {"category": "a", "value": 10},
            {"category": "a", "value": 20},
            {"category": "b", "value": 5}
        ]});
        let (status, body) = post(context(), "/analyze", &items).await;

        assert_eq!(status, StatusCode::OK);
        let a = &body["results"]["a"];
        assert_eq!(a["count"], 2);
        assert_eq!(a["sum"], 30.0);
        assert_eq!(a["mean"], 15.0);
        assert_eq!(a["min"], 10.0);
        assert_eq!(a["max"], 20.0);

        let b = &body["results"]["b"];
        assert_eq!(b["count"], 1);
        assert_eq!(b["sum"], 5.0);
        assert_eq!(b["mean"], 5.0);
        assert_eq!(b["min"], 5.0);
        assert_eq!(b["max"], 5.0);
    }

    #[tokio::test]
    async fn test_analyze_accepts_named_bare_items() {
        let items = json!([{"name": "x", "category": "c", "value": 1.5}]);
        let (status, body) = post(context(), "/analyze", &items).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"]["c"]["count"], 1);
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_category() {
        let items = json!({"items": [{"category": "a", "value": 1}, {"category": "", "value": 2}]});
        let (status, body) = post(context(), "/analyze", &items).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "items[1].category must not be empty");
    }

    #[tokio::test]
    async fn test_forecast_with_default_order() {
        let request = json!({"values": README_SERIES, "steps": 5});
        let (status, body) = post(context(), "/forecast/arima", &request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["forecast"].as_array().unwrap().len(), 5);
        assert_eq!(body["model_order"], json!([1, 1, 1]));
    }

    #[tokio::test]
    async fn test_forecast_defaults_to_ten_steps() {
        let request = json!({"values": README_SERIES, "order": [0, 1, 0]});
        let (status, body) = post(context(), "/forecast/arima", &request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["forecast"], serde_json::to_value(vec![21.22; 10]).unwrap());
        assert_eq!(body["model_order"], json!([0, 1, 0]));
    }

    #[tokio::test]
    async fn test_forecast_short_series_is_rejected() {
        let request = json!({"values": &README_SERIES[..9], "order": [9, 9, 9], "steps": 0});
        let (status, body) = post(context(), "/forecast/arima", &request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "At least 10 values are required for ARIMA, got 9");
    }

    #[tokio::test]
    async fn test_forecast_short_series_wins_over_bad_order() {
        let request = json!({"values": &README_SERIES[..9], "order": [1, 1]});
        let (status, body) = post(context(), "/forecast/arima", &request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "At least 10 values are required for ARIMA, got 9");
    }

    #[tokio::test]
    async fn test_forecast_rejects_bad_order_shape() {
        let request = json!({"values": README_SERIES, "order": [1, 1]});
        let (status, body) = post(context(), "/forecast/arima", &request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_forecast_degenerate_series_is_computation_error() {
        let request = json!({"values": vec![7.0; 12], "order": [1, 0, 0]});
        let (status, body) = post(context(), "/forecast/arima", &request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "computation_error");
    }

    #[tokio::test]
    async fn test_forecaster_failure_is_surfaced() {
        let ctx = context().with_forecaster(Arc::new(FailingForecaster));
        let (status, body) = post(ctx, "/forecast/arima", &json!({"values": README_SERIES})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Model failed to converge after 42 iterations");
    }

    #[tokio::test]
    async fn test_forecaster_panic_is_internal_error() {
        let ctx = context().with_forecaster(Arc::new(PanickingForecaster));
        let (status, body) = post(ctx, "/forecast/arima", &json!({"values": README_SERIES})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
    }

    #[tokio::test]
    async fn test_identical_requests_give_identical_bodies() {
        let request = json!({"values": README_SERIES, "order": [2, 1, 1], "steps": 3});
        let filter = routes(context(), &Config::default());

        let mut bodies = Vec::new();
        for _ in 0..2 {
            let response = warp::test::request()
                .method("POST")
                .path("/forecast/arima")
                .json(&request)
                .reply(&filter)
                .await;
            bodies.push(response.body().clone());
        }

        assert_eq!(bodies[0], bodies[1]);
    }
}
