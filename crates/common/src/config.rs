use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub geocoder: GeocoderConfig,
    pub verification: VerificationConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub test_admin_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default = "GeocoderConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "GeocoderConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "GeocoderConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GeocoderConfig {
    fn default_base_url() -> String {
        "https://nominatim.openstreetmap.org".to_string()
    }

    fn default_user_agent() -> String {
        "complaint-trust-lab".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        10
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    #[serde(default = "VerificationConfig::default_threshold_meters")]
    pub threshold_meters: f64,
    #[serde(default = "VerificationConfig::default_min_address_len")]
    pub min_address_len: usize,
}

impl VerificationConfig {
    const fn default_threshold_meters() -> f64 {
        200.0
    }

    const fn default_min_address_len() -> usize {
        8
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            threshold_meters: Self::default_threshold_meters(),
            min_address_len: Self::default_min_address_len(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "ObservabilityConfig::default_metrics_path")]
    pub metrics_path: String,
}

impl ObservabilityConfig {
    fn default_metrics_path() -> String {
        "/metrics".to_string()
    }
}
