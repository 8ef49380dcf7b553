use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

pub const DEFAULT_SCHOOL_NAME: &str = "Ambition Public School";
pub const DEFAULT_PAYMENT_BASE_URL: &str = "https://pay.ambitionschool.com/pay?student_id=";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_SMS_ENDPOINT: &str = "https://www.fast2sms.com/dev/bulkV2";

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub school: SchoolConfig,
    pub mail: MailConfig,
    pub sms: SmsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let school = SchoolConfig {
            name: env::var("FEEDESK_SCHOOL_NAME")
                .unwrap_or_else(|_| DEFAULT_SCHOOL_NAME.to_string()),
            payment_base_url: env::var("FEEDESK_PAYMENT_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PAYMENT_BASE_URL.to_string()),
            bracket_override: parse_flag("FEEDESK_BRACKET_OVERRIDE", true)?,
        };

        let mail = MailConfig {
            host: env::var("FEEDESK_SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string()),
            port: match env::var("FEEDESK_SMTP_PORT") {
                Ok(raw) => raw
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidSmtpPort)?,
                Err(_) => DEFAULT_SMTP_PORT,
            },
            credentials: match (
                non_empty_var("FEEDESK_SMTP_USER"),
                non_empty_var("FEEDESK_SMTP_PASSWORD"),
            ) {
                (Some(username), Some(password)) => Some(MailCredentials { username, password }),
                _ => None,
            },
        };

        let sms = SmsConfig {
            endpoint: env::var("FEEDESK_SMS_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_SMS_ENDPOINT.to_string()),
            api_key: non_empty_var("FEEDESK_SMS_API_KEY"),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            school,
            mail,
            sms,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// School identity and the template precedence toggle.
#[derive(Debug, Clone)]
pub struct SchoolConfig {
    pub name: String,
    pub payment_base_url: String,
    /// When set, junior/senior class brackets win over the operator's template choice.
    pub bracket_override: bool,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SCHOOL_NAME.to_string(),
            payment_base_url: DEFAULT_PAYMENT_BASE_URL.to_string(),
            bracket_override: true,
        }
    }
}

/// Mail submission endpoint; credentials are usually supplied by the operator per run.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<MailCredentials>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct MailCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct SmsConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidSmtpPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidSmtpPort => write!(f, "FEEDESK_SMTP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { key, value } => {
                write!(f, "{key} must be true or false (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSmtpPort
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}
