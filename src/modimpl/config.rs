use std::fmt;
use std::net::{Ipv6Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Args;

use crate::modimpl::documentfilter::{DocumentFilter, DEFAULT_DOCUMENT_PATTERN};
use crate::modimpl::error::ConfigError;

pub const DOCUMENT_POST_PATH: &str = "/api/documents/post_document/";
pub const DEFAULT_FTP_PORT: u16 = 21;
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 5;
pub const DEFAULT_INTERVAL_SECONDS: u64 = 5 * 60;
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_HEALTH_WINDOW: usize = 10;
pub const DEFAULT_UNHEALTHY_RATIO: f64 = 0.5;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Raw settings as given on the command line or in the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct Settings {
    /// FTP server address, `host` or `host:port`
    #[arg(long, env = "FTP_HOST")]
    pub ftp_host: Option<String>,

    #[arg(long, env = "FTP_USERNAME")]
    pub ftp_username: Option<String>,

    #[arg(long, env = "FTP_PASSWORD", hide_env_values = true)]
    pub ftp_password: Option<String>,

    /// Directory to pick documents up from (defaults to the login directory)
    #[arg(long, env = "FTP_PATH")]
    pub ftp_path: Option<String>,

    #[arg(long, env = "FTP_CONNECT_TIMEOUT_SECONDS")]
    pub ftp_connect_timeout_seconds: Option<u64>,

    /// Accept self-signed or otherwise invalid FTPS certificates
    #[arg(long, env = "FTP_ACCEPT_INVALID_CERTS")]
    pub ftp_accept_invalid_certs: Option<bool>,

    /// Paperless-ngx base URL
    #[arg(long, env = "PAPERLESS_URL")]
    pub paperless_url: Option<String>,

    #[arg(long, env = "PAPERLESS_USER")]
    pub paperless_user: Option<String>,

    #[arg(long, env = "PAPERLESS_PASSWORD", hide_env_values = true)]
    pub paperless_password: Option<String>,

    /// API token, used instead of user/password when set
    #[arg(long, env = "PAPERLESS_TOKEN", hide_env_values = true)]
    pub paperless_token: Option<String>,

    /// Seconds between two runs (default 300)
    #[arg(long, env = "INTERVAL_SECONDS")]
    pub interval_seconds: Option<u64>,

    /// Cron expression, takes precedence over --interval-seconds
    #[arg(long, env = "CRON_SCHEDULE")]
    pub cron_schedule: Option<String>,

    /// Glob patterns of documents to transfer (default `*.pdf`)
    #[arg(long, env = "DOCUMENT_PATTERNS", value_delimiter = ',')]
    pub document_patterns: Vec<String>,

    #[arg(long, env = "HEALTH_ADDR")]
    pub health_addr: Option<SocketAddr>,

    /// Number of recent runs the health verdict is computed over
    #[arg(long, env = "HEALTH_WINDOW")]
    pub health_window: Option<usize>,

    /// Share of failed runs in the window above which the service is unhealthy
    #[arg(long, env = "HEALTH_UNHEALTHY_RATIO")]
    pub health_unhealthy_ratio: Option<f64>,

    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Directory for daily rolling log files
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// String that keeps out of `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"***\"")
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub host: String,
    pub username: String,
    pub password: Secret,
    pub path: Option<String>,
    pub connect_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl SourceConfig {
    /// `host:port`, with the standard FTP port filled in when missing.
    pub fn address(&self) -> String {
        let (host, port) = split_host_port(&self.host);
        let port = port.unwrap_or(DEFAULT_FTP_PORT);
        if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        }
    }

    /// Host name presented for TLS verification.
    pub fn domain(&self) -> &str {
        split_host_port(&self.host).0
    }
}

/// Splits `host[:port]`. IPv6 literals are accepted bare (`::1`) or in
/// brackets (`[::1]`, `[::1]:2121`); the returned host never has brackets.
fn split_host_port(host: &str) -> (&str, Option<u16>) {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.split_once("]:") {
            Some((ip, port)) => (ip, port.parse().ok()),
            None => (rest.trim_end_matches(']'), None),
        };
    }
    if host.parse::<Ipv6Addr>().is_ok() {
        return (host, None);
    }
    match host.rsplit_once(':') {
        Some((name, port)) => match port.parse() {
            Ok(port) => (name, Some(port)),
            Err(_) => (host, None),
        },
        None => (host, None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCredential {
    Basic { username: String, password: Secret },
    Token(Secret),
}

#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub base_url: String,
    pub document_url: String,
    pub credential: SinkCredential,
}

#[derive(Debug, Clone)]
pub enum Schedule {
    Interval(Duration),
    Cron(Box<cron::Schedule>),
}

impl Schedule {
    /// Accepts classic 5-field expressions as well as the 6/7-field form with
    /// seconds that the `cron` crate expects.
    pub fn cron(expression: &str) -> Result<Self, ConfigError> {
        let expression = expression.trim();
        let normalized = if expression.split_whitespace().count() == 5 {
            format!("0 {}", expression)
        } else {
            expression.to_string()
        };
        let schedule = cron::Schedule::from_str(&normalized)
            .map_err(|e| ConfigError::invalid("CRON_SCHEDULE", e.to_string()))?;
        Ok(Schedule::Cron(Box::new(schedule)))
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Interval(period) => write!(f, "every {}s", period.as_secs()),
            Schedule::Cron(schedule) => write!(f, "cron '{}'", schedule),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub listen_addr: SocketAddr,
    pub window: NonZeroUsize,
    pub unhealthy_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub schedule: Schedule,
    pub documents: DocumentFilter,
    pub health: HealthConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let source = SourceConfig {
            host: required(settings.ftp_host, "FTP_HOST")?,
            username: required(settings.ftp_username, "FTP_USERNAME")?,
            password: Secret::new(required(settings.ftp_password, "FTP_PASSWORD")?),
            path: non_empty(settings.ftp_path),
            connect_timeout: Duration::from_secs(
                settings
                    .ftp_connect_timeout_seconds
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECONDS),
            ),
            accept_invalid_certs: settings.ftp_accept_invalid_certs.unwrap_or(false),
        };
        if source.connect_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "FTP_CONNECT_TIMEOUT_SECONDS",
                "must be greater than zero",
            ));
        }

        let base_url = required(settings.paperless_url, "PAPERLESS_URL")?;
        let base_url = base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| ConfigError::invalid("PAPERLESS_URL", e.to_string()))?;

        let credential = match non_empty(settings.paperless_token) {
            Some(token) => SinkCredential::Token(Secret::new(token)),
            None => SinkCredential::Basic {
                username: required(settings.paperless_user, "PAPERLESS_USER")?,
                password: Secret::new(required(settings.paperless_password, "PAPERLESS_PASSWORD")?),
            },
        };

        let sink = SinkConfig {
            document_url: format!("{}{}", base_url, DOCUMENT_POST_PATH),
            base_url,
            credential,
        };

        let schedule = match non_empty(settings.cron_schedule) {
            Some(expression) => Schedule::cron(&expression)?,
            None => match settings.interval_seconds {
                Some(0) => {
                    return Err(ConfigError::invalid(
                        "INTERVAL_SECONDS",
                        "must be greater than zero",
                    ))
                }
                Some(seconds) => Schedule::Interval(Duration::from_secs(seconds)),
                None => Schedule::Interval(Duration::from_secs(DEFAULT_INTERVAL_SECONDS)),
            },
        };

        let documents = if settings.document_patterns.is_empty() {
            DocumentFilter::new(&[DEFAULT_DOCUMENT_PATTERN])
        } else {
            DocumentFilter::new(settings.document_patterns.as_slice())
        }
        .map_err(|e| ConfigError::invalid("DOCUMENT_PATTERNS", format!("{:#}", e)))?;

        let window = NonZeroUsize::new(settings.health_window.unwrap_or(DEFAULT_HEALTH_WINDOW))
            .ok_or_else(|| ConfigError::invalid("HEALTH_WINDOW", "must be at least 1"))?;
        let unhealthy_ratio = settings
            .health_unhealthy_ratio
            .unwrap_or(DEFAULT_UNHEALTHY_RATIO);
        if !(0.0..=1.0).contains(&unhealthy_ratio) {
            return Err(ConfigError::invalid(
                "HEALTH_UNHEALTHY_RATIO",
                "must be between 0.0 and 1.0",
            ));
        }
        let listen_addr = match settings.health_addr {
            Some(addr) => addr,
            None => DEFAULT_HEALTH_ADDR
                .parse()
                .map_err(|_| ConfigError::invalid("HEALTH_ADDR", DEFAULT_HEALTH_ADDR))?,
        };

        Ok(Self {
            source,
            sink,
            schedule,
            documents,
            health: HealthConfig {
                listen_addr,
                window,
                unhealthy_ratio,
            },
            logging: LoggingConfig {
                level: non_empty(settings.log_level).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
                log_dir: settings.log_dir,
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    non_empty(value).ok_or(ConfigError::Missing(key))
}
