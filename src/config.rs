/*
 * Responsibility
 * - Load configuration from env vars (listen addr, environment, CORS, auth, logging)
 * - Validate required values (startup fails on a missing/invalid key)
 * - Everything here is read-only after startup and shared across requests
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Request/response logging knobs.
///
/// Read-only after startup; every request sees the same instance.
/// Bodies are opt-in because they are the expensive (and risky) part.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub log_request_body: bool,
    pub log_response_body: bool,
    pub max_body_size: usize,
    pub log_headers: bool,
    pub log_response_headers: bool,
    pub log_duration: bool,
    pub log_client_ip: bool,
    pub exclude_paths: Vec<String>,
    pub exclude_headers: Vec<String>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_request_body: false,
            log_response_body: false,
            max_body_size: 4096,
            log_headers: true,
            log_response_headers: true,
            log_duration: true,
            log_client_ip: true,
            exclude_paths: Vec::new(),
            exclude_headers: vec![
                "authorization".to_string(),
                "cookie".to_string(),
                "set-cookie".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Path prefixes that skip the authentication gate entirely.
    pub public_paths: Vec<String>,
    /// `?token=` fallback for local debugging. Off by default: URLs end up in
    /// proxy logs, so this must never be relied on in production.
    pub allow_query_token: bool,

    pub issuer: String,
    pub audience: String,
    pub leeway_seconds: u64,
    pub public_key_pem: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            public_paths: default_public_paths(),
            allow_query_token: false,
            issuer: String::new(),
            audience: String::new(),
            leeway_seconds: 60,
            public_key_pem: String::new(),
        }
    }
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/api/v1/auth".to_string(),
        "/api/v1/health".to_string(),
        "/docs".to_string(),
        "/swagger".to_string(),
    ]
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub logging: LoggingOptions,
    pub auth: AuthOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = env_list("CORS_ALLOWED_ORIGINS");

        let defaults = LoggingOptions::default();
        let logging = LoggingOptions {
            log_request_body: env_bool("LOG_REQUEST_BODY", defaults.log_request_body)?,
            log_response_body: env_bool("LOG_RESPONSE_BODY", defaults.log_response_body)?,
            max_body_size: std::env::var("LOG_MAX_BODY_SIZE")
                .ok()
                .map(|v| v.parse::<usize>().map_err(|_| ConfigError::Invalid("LOG_MAX_BODY_SIZE")))
                .transpose()?
                .unwrap_or(defaults.max_body_size),
            log_headers: env_bool("LOG_HEADERS", defaults.log_headers)?,
            log_response_headers: env_bool("LOG_RESPONSE_HEADERS", defaults.log_response_headers)?,
            log_duration: env_bool("LOG_DURATION", defaults.log_duration)?,
            log_client_ip: env_bool("LOG_CLIENT_IP", defaults.log_client_ip)?,
            exclude_paths: {
                let v = env_list("LOG_EXCLUDE_PATHS");
                if v.is_empty() { defaults.exclude_paths } else { v }
            },
            exclude_headers: {
                let v = env_list("LOG_EXCLUDE_HEADERS");
                if v.is_empty() { defaults.exclude_headers } else { v }
            },
        };

        let auth_issuer =
            std::env::var("AUTH_ISSUER").map_err(|_| ConfigError::Missing("AUTH_ISSUER"))?;

        let auth_audience =
            std::env::var("AUTH_AUDIENCE").map_err(|_| ConfigError::Missing("AUTH_AUDIENCE"))?;

        let leeway_seconds = std::env::var("ACCESS_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let public_key_pem = std::env::var("ACCESS_JWT_PUBLIC_KEY_PEM")
            .map_err(|_| ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
            .replace("\\n", "\n");

        let auth = AuthOptions {
            public_paths: default_public_paths(),
            allow_query_token: env_bool("ALLOW_QUERY_TOKEN", false)?,
            issuer: auth_issuer,
            audience: auth_audience,
            leeway_seconds,
            public_key_pem,
        };

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            logging,
            auth,
        })
    }
}

fn env_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(key)),
        },
    }
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
