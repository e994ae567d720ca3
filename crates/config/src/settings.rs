//! Application settings

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub reconciler: ReconcilerConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
            cors_origins: vec![],
        }
    }
}

/// Voice provider API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    /// Conversational agent to dial with
    pub agent_id: String,
    /// Outbound caller id registered with the provider
    pub phone_number_id: String,
    pub timeout_secs: u64,
    /// Retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff, doubles each retry
    pub initial_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            api_key: String::new(),
            agent_id: String::new(),
            phone_number_id: String::new(),
            timeout_secs: 30,
            max_retries: 3,
            initial_backoff_ms: 100,
        }
    }
}

/// Reconciliation sweep thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Scheduler period between sweeps
    pub interval_secs: u64,
    /// Brand-new calls are skipped to avoid false positives
    pub grace_period_secs: i64,
    /// How far back to look for completed-but-unextracted calls
    pub recent_window_hours: i64,
    /// A call that never got a conversation id is force-completed
    /// after this long
    pub abandoned_after_mins: i64,
    /// Hard ceiling on call duration, the safety valve against stuck
    /// state
    pub max_call_duration_hours: i64,
    /// Delay before the single transcript retry fetch
    pub transcript_retry_delay_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            grace_period_secs: 120,
            recent_window_hours: 6,
            abandoned_after_mins: 30,
            max_call_duration_hours: 4,
            transcript_retry_delay_secs: 5,
        }
    }
}

/// Load settings from an optional file plus CLAIMCALL_ environment
/// overrides (e.g. CLAIMCALL_SERVER__PORT=9090).
pub fn load_settings(path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        if !std::path::Path::new(path).exists() {
            return Err(ConfigError::FileNotFound(path.to_string()));
        }
        builder = builder.add_source(config::File::with_name(path));
    }

    let cfg = builder
        .add_source(config::Environment::with_prefix("CLAIMCALL").separator("__"))
        .build()?;

    let settings: Settings = cfg.try_deserialize()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.reconciler.grace_period_secs < 0 {
        return Err(ConfigError::InvalidValue {
            field: "reconciler.grace_period_secs".to_string(),
            message: "must be non-negative".to_string(),
        });
    }
    if settings.reconciler.max_call_duration_hours <= 0 {
        return Err(ConfigError::InvalidValue {
            field: "reconciler.max_call_duration_hours".to_string(),
            message: "must be positive".to_string(),
        });
    }
    if settings.provider.max_retries > 10 {
        return Err(ConfigError::InvalidValue {
            field: "provider.max_retries".to_string(),
            message: "more than 10 retries would outlive the sweep period".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(validate(&settings).is_ok());
        assert_eq!(settings.reconciler.interval_secs, 60);
        assert_eq!(settings.reconciler.grace_period_secs, 120);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_settings(Some("/nonexistent/claimcall.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let text = toml::to_string(&Settings::default()).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back.server.port, 8080);
        assert_eq!(back.reconciler.max_call_duration_hours, 4);
    }
}
