//! Configuration loaded from the environment.
//!
//! `Config::from_env()` is the only place the process environment is read.
//! Everything downstream receives its settings through constructors.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub oracle: OracleConfig,
    pub http: HttpConfig,
    pub estimation: EstimationConfig,
    pub logging: LoggingConfig,
}

/// Hosted chat-completion API used to extract project features.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Root URL of an OpenAI-compatible API (without `/v1`).
    pub base_url: String,
    /// Bearer key. Required to talk to the oracle, optional for offline use.
    pub api_key: Option<SecretString>,
    /// Model name sent with every request.
    pub model: String,
    /// Hard limit for a single extraction call.
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP API bind settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Estimation engine settings.
#[derive(Debug, Clone)]
pub struct EstimationConfig {
    /// Catalog data file. `None` uses the catalog compiled into the binary.
    pub catalog_path: Option<PathBuf>,
    /// Currency code reported with every estimate.
    pub currency: String,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            currency: "USD".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "quotecraft=info,tower_http=info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let oracle_defaults = OracleConfig::default();
        let oracle = OracleConfig {
            base_url: get("ORACLE_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(oracle_defaults.base_url),
            api_key: get("ORACLE_API_KEY").map(SecretString::from),
            model: get("ORACLE_MODEL").unwrap_or(oracle_defaults.model),
            timeout: match get("ORACLE_TIMEOUT_SECS") {
                Some(raw) => Duration::from_secs(parse_number("ORACLE_TIMEOUT_SECS", &raw)?),
                None => oracle_defaults.timeout,
            },
        };

        let http_defaults = HttpConfig::default();
        let http = HttpConfig {
            host: get("HTTP_HOST").unwrap_or(http_defaults.host),
            port: match get("HTTP_PORT") {
                Some(raw) => parse_number("HTTP_PORT", &raw)?,
                None => http_defaults.port,
            },
        };

        let estimation = EstimationConfig {
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            currency: get("ESTIMATE_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| EstimationConfig::default().currency),
        };

        let currency = &estimation.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidValue {
                key: "ESTIMATE_CURRENCY".to_string(),
                message: format!("expected a 3-letter currency code, got {:?}", currency),
            });
        }

        let logging = LoggingConfig {
            filter: get("RUST_LOG").unwrap_or_else(|| LoggingConfig::default().filter),
            format: match get("LOG_FORMAT").map(|f| f.trim().to_lowercase()).as_deref() {
                None | Some("text") => LogFormat::Text,
                Some("json") => LogFormat::Json,
                Some(other) => {
                    return Err(ConfigError::InvalidValue {
                        key: "LOG_FORMAT".to_string(),
                        message: format!("expected \"text\" or \"json\", got {:?}", other),
                    });
                }
            },
        };

        Ok(Self {
            oracle,
            http,
            estimation,
            logging,
        })
    }

    /// Fail early when a command needs the oracle but no key is set.
    pub fn require_oracle_key(&self) -> Result<(), ConfigError> {
        if self.oracle.api_key.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "ORACLE_API_KEY".to_string(),
                hint: "Set it in the environment or in .env".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
