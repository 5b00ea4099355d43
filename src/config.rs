use std::env;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,

    // Sessions
    pub session_ttl_secs: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,

    // CORS whitelist for credentialed cross-origin clients
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // Sessions
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 3600)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let cookie_name =
            env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "walletgate.sid".to_string());
        if cookie_name.is_empty()
            || !cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidValue(
                "SESSION_COOKIE_NAME".to_string(),
                "must be a non-empty cookie token".to_string(),
            ));
        }

        let cookie_secure = parse_env_or_default("SESSION_COOKIE_SECURE", false)?;

        // CORS: origins allowed to make credentialed calls, e.g. the
        // frontend dev server and a browser-extension origin
        let allowed_origins_str =
            env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let allowed_origins: Vec<String> = allowed_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &allowed_origins {
            if !origin.starts_with("http://")
                && !origin.starts_with("https://")
                && !origin.starts_with("chrome-extension://")
            {
                return Err(ConfigError::InvalidValue(
                    "ALLOWED_ORIGINS".to_string(),
                    format!("origin must carry a scheme: {}", origin),
                ));
            }
        }

        Ok(Config {
            bind_addr,
            session_ttl_secs,
            cookie_name,
            cookie_secure,
            allowed_origins,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
