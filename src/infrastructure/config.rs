use crate::domain::params::{ProcessingParams, WaveletType};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkbenchConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub defaults: DefaultParams,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServiceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Initial processing parameters for a new session
#[derive(Debug, Deserialize, Clone)]
pub struct DefaultParams {
    #[serde(default)]
    pub time_column: u32,
    #[serde(default = "default_signal_column")]
    pub signal_column: u32,
    #[serde(default)]
    pub wavelet_type: WaveletType,
    #[serde(default = "default_levels")]
    pub n_levels: u32,
}

impl Default for DefaultParams {
    fn default() -> Self {
        Self {
            time_column: 0,
            signal_column: default_signal_column(),
            wavelet_type: WaveletType::default(),
            n_levels: default_levels(),
        }
    }
}

impl DefaultParams {
    pub fn to_params(&self) -> ProcessingParams {
        ProcessingParams::new(
            self.time_column,
            self.signal_column,
            self.wavelet_type,
            self.n_levels,
        )
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_signal_column() -> u32 {
    1
}

fn default_levels() -> u32 {
    7
}

/// Load `config/workbench` (optional) overlaid with `WORKBENCH__*` variables
pub fn load_workbench_config() -> anyhow::Result<WorkbenchConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/workbench").required(false))
        .add_source(config::Environment::with_prefix("WORKBENCH").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> WorkbenchConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse("");
        assert_eq!(config.service.base_url, "http://localhost:8000");
        assert_eq!(config.service.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.defaults.to_params(), ProcessingParams::default());
    }

    #[test]
    fn test_defaults_are_clamped() {
        let config = parse(
            r#"
            [service]
            base_url = "http://dsp:9000"
            request_timeout_secs = 0

            [defaults]
            wavelet_type = "bior3.5"
            n_levels = 40
            time_column = 12
            "#,
        );
        assert_eq!(config.service.base_url, "http://dsp:9000");
        assert_eq!(config.service.request_timeout(), Duration::from_secs(1));

        let params = config.defaults.to_params();
        assert_eq!(params.wavelet_type, WaveletType::Bior3_5);
        assert_eq!(params.n_levels, 20);
        assert_eq!(params.time_column, 9);
        assert_eq!(params.signal_column, 1);
    }
}
