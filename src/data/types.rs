use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Shortest series accepted by the forecast endpoint.
pub const MIN_SERIES_LEN: usize = 10;
pub const DEFAULT_STEPS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub category: String,
    pub value: f64,
    /// Free-form label some clients send along; not used in any computation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub items: Vec<DataItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsRequest {
    pub values: Vec<f64>,
}

/// ARIMA order `(p, d, q)`, carried on the wire as `[p, d, q]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder(pub usize, pub usize, pub usize);

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastRequest {
    pub values: Vec<f64>,
    #[serde(default)]
    pub order: ArimaOrder,
    #[serde(default = "default_steps")]
    pub steps: usize,
}

fn default_steps() -> usize { DEFAULT_STEPS }

impl ArimaOrder {
    pub fn p(&self) -> usize { self.0 }
    pub fn d(&self) -> usize { self.1 }
    pub fn q(&self) -> usize { self.2 }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self(1, 1, 1)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.0, self.1, self.2)
    }
}

impl AnalyzeRequest {
    /// Accepts `{"items": [...]}` as well as the legacy bare-array body.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if value.is_array() {
            Ok(Self { items: serde_json::from_value(value)? })
        } else {
            serde_json::from_value(value)
        }
    }
}

impl StatsRequest {
    /// Accepts `{"values": [...]}` as well as the legacy bare-array body.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if value.is_array() {
            Ok(Self { values: serde_json::from_value(value)? })
        } else {
            serde_json::from_value(value)
        }
    }
}

/// Aggregates for one category of an `/analyze` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// Category → aggregates. Sorted keys keep response bodies byte-stable.
pub type AnalysisResult = BTreeMap<String, GroupSummary>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub results: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub forecast: Vec<f64>,
    pub model_order: ArimaOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiInfo {
    pub name: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}
