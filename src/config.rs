use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Decimal places kept in every float of a response body.
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Largest accepted value for each of p, d and q.
    #[serde(default = "default_max_order")]
    pub max_order: usize,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_max_body_bytes() -> u64 { 1024 * 1024 }
fn default_decimal_places() -> u32 { 6 }
fn default_max_iterations() -> usize { 5000 }
fn default_tolerance() -> f64 { 1e-10 }
fn default_max_order() -> usize { 10 }
fn default_max_steps() -> usize { 1000 }
fn default_log_level() -> String { "info".to_string() }
fn default_metrics_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { decimal_places: default_decimal_places() }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            max_order: default_max_order(),
            max_steps: default_max_steps(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Overrides read from the process environment (and `.env`, if present).
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(host) = &env.host {
            self.server.host = host.clone();
        }
        if let Some(port) = env.port {
            self.server.port = port;
        }
        if let Some(level) = &env.log_level {
            self.monitoring.log_level = level.clone();
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!("Invalid bind address: {}:{}", self.server.host, self.server.port)
            })
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.decimal_places > 15 {
            anyhow::bail!(
                "analysis.decimal_places must be at most 15, but is {}",
                self.analysis.decimal_places
            );
        }
        if self.forecast.max_iterations == 0 {
            anyhow::bail!("forecast.max_iterations must be positive");
        }
        if !(self.forecast.tolerance > 0.0 && self.forecast.tolerance.is_finite()) {
            anyhow::bail!(
                "forecast.tolerance must be a positive number, but is {}",
                self.forecast.tolerance
            );
        }
        Ok(())
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("ANALYZER_PORT") {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .with_context(|| format!("ANALYZER_PORT is not a valid port: {}", raw))?,
            ),
            None => None,
        };

        Ok(Self {
            host: lookup("ANALYZER_HOST"),
            port,
            log_level: lookup("ANALYZER_LOG_LEVEL"),
        })
    }
}
