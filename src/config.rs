//! Configuration types.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::sink::DEFAULT_WEBHOOK_TIMEOUT;

/// Where completed submissions are delivered.
#[derive(Debug, Clone)]
pub enum SinkConfig {
    /// Structured log event only.
    Log,
    /// Append JSON lines to a file.
    File { path: PathBuf },
    /// POST to an HTTP endpoint.
    Webhook {
        url: String,
        token: Option<SecretString>,
        /// Bound on one delivery attempt.
        timeout: Duration,
    },
}

/// Intake service configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Sessions untouched for this long are dropped.
    pub session_idle_timeout: Duration,
    /// How often the expiry task sweeps idle sessions.
    pub expiry_interval: Duration,
    pub sink: SinkConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
            expiry_interval: Duration::from_secs(60),
            sink: SinkConfig::Log,
        }
    }
}

impl IntakeConfig {
    /// Build config from `INTAKE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from any variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = parse_or(&var, "INTAKE_BIND_ADDR", defaults.bind_addr)?;
        let port = parse_or(&var, "INTAKE_PORT", defaults.port)?;
        let idle_minutes: u64 = parse_or(&var, "INTAKE_SESSION_IDLE_MINUTES", 60)?;
        let idle_secs = idle_minutes
            .checked_mul(60)
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "INTAKE_SESSION_IDLE_MINUTES".to_string(),
                message: format!("{idle_minutes} is out of range (1 minute or more)"),
            })?;

        let sink_kind = var("INTAKE_SINK").unwrap_or_else(|| "log".to_string());
        let sink = match sink_kind.trim().to_ascii_lowercase().as_str() {
            "log" => SinkConfig::Log,
            "file" => SinkConfig::File {
                path: var("INTAKE_SUBMISSIONS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data/submissions.jsonl")),
            },
            "webhook" => {
                let url = var("INTAKE_WEBHOOK_URL")
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingRequired {
                        key: "INTAKE_WEBHOOK_URL".to_string(),
                        hint: "set it to the endpoint that receives submissions".to_string(),
                    })?;
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidValue {
                        key: "INTAKE_WEBHOOK_URL".to_string(),
                        message: format!("expected an http(s) URL, got {url}"),
                    });
                }
                let token = var("INTAKE_WEBHOOK_TOKEN")
                    .filter(|s| !s.is_empty())
                    .map(SecretString::from);
                let timeout_secs: u64 =
                    parse_or(&var, "INTAKE_WEBHOOK_TIMEOUT_SECS", DEFAULT_WEBHOOK_TIMEOUT.as_secs())?;
                if timeout_secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "INTAKE_WEBHOOK_TIMEOUT_SECS".to_string(),
                        message: "must be at least 1 second".to_string(),
                    });
                }
                SinkConfig::Webhook {
                    url,
                    token,
                    timeout: Duration::from_secs(timeout_secs),
                }
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "INTAKE_SINK".to_string(),
                    message: format!("unknown sink '{other}' (expected log, file or webhook)"),
                });
            }
        };

        Ok(Self {
            bind_addr,
            port,
            session_idle_timeout: Duration::from_secs(idle_secs),
            expiry_interval: defaults.expiry_interval,
            sink,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
