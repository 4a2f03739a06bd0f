use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::risk::{LocaleStyle, NumberFormat, RiskFormatter};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/calcula";
pub const DEFAULT_LOG_LEVEL: &str = "readmission_client=info";

/// Main configuration structure loaded from readmission.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub display: DisplayConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Where submissions are posted.
///
/// `url` may be absolute (`http://localhost:8080/calcula`) or relative
/// (`marcapasso`); a relative path is joined onto `base_url`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Client-side request timeout. Unset means transport defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            base_url: None,
            timeout_ms: None,
        }
    }
}

impl EndpointConfig {
    /// Resolve `url` (and `base_url` for relative paths) into an http(s) URL.
    pub fn resolve(&self) -> Result<Url> {
        let url = match (Url::parse(&self.url), self.base_url.as_deref()) {
            (Ok(url), _) => url,
            (Err(_), Some(base)) => {
                let base = Url::parse(base).map_err(|e| ClientError::Config {
                    message: format!("invalid base_url '{}': {}", base, e),
                })?;
                base.join(&self.url).map_err(|e| ClientError::Config {
                    message: format!("cannot join '{}' onto '{}': {}", self.url, base, e),
                })?
            }
            (Err(e), None) => {
                return Err(ClientError::Config {
                    message: format!(
                        "endpoint '{}' is not an absolute URL and no base_url is configured: {}",
                        self.url, e
                    ),
                });
            }
        };

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::Config {
                message: format!("endpoint scheme must be http or https, got '{}'", other),
            }),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// How the score is presented.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub format: NumberFormat,
    pub scroll_into_view: bool,
    /// Separators used by the `locale` format.
    pub locale: LocaleStyle,
}

impl DisplayConfig {
    pub fn formatter(&self) -> RiskFormatter {
        RiskFormatter::new(self.format, self.locale.clone())
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn load_from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

/// Values supplied on the command line. They take precedence over the file
/// and the environment, and the environment variables they replace are not
/// read at all.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub format: Option<NumberFormat>,
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses READMISSION_CONFIG environment variable or defaults to "readmission.toml"
    pub fn load() -> Result<Self> {
        Self::load_with_overrides(&ConfigOverrides::default())
    }

    /// Like [`Config::load`], with command-line values applied before
    /// validation.
    pub fn load_with_overrides(overrides: &ConfigOverrides) -> Result<Self> {
        if let Ok(env_path) = std::env::var("RDM_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path =
            std::env::var("READMISSION_CONFIG").unwrap_or_else(|_| "readmission.toml".to_string());

        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(_) => {
                tracing::warn!("Config file {} not found, using defaults", config_path);
                Self::default()
            }
        };

        config.apply_env_overrides(overrides)?;
        if let Some(url) = &overrides.endpoint {
            config.endpoint.url = url.clone();
        }
        if let Some(format) = overrides.format {
            config.display.format = format;
        }
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `RDM_*` environment overrides (env wins over the file).
    /// Variables shadowed by a command-line override are skipped.
    fn apply_env_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if overrides.endpoint.is_none()
            && let Ok(url) = std::env::var("RDM_ENDPOINT")
        {
            self.endpoint.url = url;
            tracing::debug!("RDM_ENDPOINT env override applied");
        }
        if let Ok(base) = std::env::var("RDM_BASE_URL") {
            self.endpoint.base_url = Some(base);
            tracing::debug!("RDM_BASE_URL env override applied");
        }
        if let Ok(raw) = std::env::var("RDM_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => self.endpoint.timeout_ms = Some(ms),
                _ => tracing::warn!("Ignoring RDM_TIMEOUT_MS='{}': expected positive integer", raw),
            }
        }
        if overrides.format.is_none()
            && let Ok(format) = std::env::var("RDM_NUMBER_FORMAT")
        {
            self.display.format = format.parse()?;
        }
        if let Ok(scroll) = std::env::var("RDM_SCROLL_INTO_VIEW") {
            self.display.scroll_into_view = scroll == "1" || scroll.eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.endpoint.resolve()?;
        if self.endpoint.timeout_ms == Some(0) {
            return Err(ClientError::Config {
                message: "timeout_ms must be positive; omit it to use transport defaults"
                    .to_string(),
            });
        }
        if self.display.locale.fraction_digits > 10 {
            return Err(ClientError::Config {
                message: format!(
                    "fraction_digits must be at most 10, got {}",
                    self.display.locale.fraction_digits
                ),
            });
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ClientError::Internal {
            message: format!("failed to render config: {}", e),
        })
    }
}
