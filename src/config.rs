use std::env;
use std::net::SocketAddr;

/// Refresh tokens outlive the session by this margin so a renewal attempt
/// near the session boundary is not lost to clock skew.
const REFRESH_TOKEN_SLACK_HOURS: u64 = 168;

#[derive(Clone)]
pub struct Config {
    // Token secrets (independent, one per token type)
    pub access_token_secret: String,
    pub refresh_token_secret: String,

    // Server
    pub bind_addr: SocketAddr,

    // Durations
    pub session_duration_hours: u64,
    pub challenge_expiry_minutes: u64,

    // Background sweep intervals (in seconds)
    pub challenge_sweep_secs: u64,
    pub session_sweep_secs: u64,

    // Development signature bypass. Requires BOTH APP_ENV=development and
    // DEV_AUTH_BYPASS=true so a single stray variable cannot enable it
    // in production.
    pub dev_mode: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token_secret", &"[REDACTED]")
            .field("refresh_token_secret", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("session_duration_hours", &self.session_duration_hours)
            .field("challenge_expiry_minutes", &self.challenge_expiry_minutes)
            .field("challenge_sweep_secs", &self.challenge_sweep_secs)
            .field("session_sweep_secs", &self.session_sweep_secs)
            .field("dev_mode", &self.dev_mode)
            .finish()
    }
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

        let access_token_secret = require_secret("ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = require_secret("REFRESH_TOKEN_SECRET")?;

        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::InvalidValue(
                "REFRESH_TOKEN_SECRET".to_string(),
                "must differ from ACCESS_TOKEN_SECRET".to_string(),
            ));
        }

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // Durations
        let session_duration_hours = parse_env_or_default("SESSION_DURATION_HOURS", 24)?;
        let challenge_expiry_minutes = parse_env_or_default("CHALLENGE_EXPIRY_MINUTES", 5)?;

        // Sweep intervals
        let challenge_sweep_secs = parse_env_or_default("CHALLENGE_SWEEP_SECS", 300)?;
        let session_sweep_secs = parse_env_or_default("SESSION_SWEEP_SECS", 3_600)?;

        // Two independent conditions must hold for the dev bypass
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "production".to_string());
        let bypass_flag = env::var("DEV_AUTH_BYPASS").unwrap_or_default();
        let dev_mode = app_env == "development" && bypass_flag == "true";

        if dev_mode {
            tracing::warn!(
                "Development auth bypass ENABLED; signature verification will be skipped"
            );
        }

        Ok(Config {
            access_token_secret,
            refresh_token_secret,
            bind_addr,
            session_duration_hours,
            challenge_expiry_minutes,
            challenge_sweep_secs,
            session_sweep_secs,
            dev_mode,
        })
    }

    /// Session lifetime in milliseconds.
    pub fn session_duration_ms(&self) -> u64 {
        self.session_duration_hours * 3_600_000
    }

    /// Challenge lifetime in milliseconds.
    pub fn challenge_expiry_ms(&self) -> u64 {
        self.challenge_expiry_minutes * 60_000
    }

    /// Refresh-token lifetime in milliseconds (session duration plus slack).
    pub fn refresh_token_ttl_ms(&self) -> u64 {
        (self.session_duration_hours + REFRESH_TOKEN_SLACK_HOURS) * 3_600_000
    }
}

fn require_secret(key: &str) -> Result<String, ConfigError> {
    let value = env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))?;
    if value.len() < 16 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be at least 16 characters".to_string(),
        ));
    }
    Ok(value)
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_test_env() {
        env::remove_var("ACCESS_TOKEN_SECRET");
        env::remove_var("REFRESH_TOKEN_SECRET");
        env::remove_var("BIND_ADDR");
        env::remove_var("SESSION_DURATION_HOURS");
        env::remove_var("CHALLENGE_EXPIRY_MINUTES");
        env::remove_var("CHALLENGE_SWEEP_SECS");
        env::remove_var("SESSION_SWEEP_SECS");
        env::remove_var("APP_ENV");
        env::remove_var("DEV_AUTH_BYPASS");
    }

    fn set_required_env() {
        env::set_var("ACCESS_TOKEN_SECRET", "test-access-secret-0123456789");
        env::set_var("REFRESH_TOKEN_SECRET", "test-refresh-secret-0123456789");
    }

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_missing_access_secret() {
        let _guard = lock_test();
        clear_test_env();

        // Set to empty to prevent dotenvy from reloading a value from .env
        // (dotenvy doesn't override existing vars).
        env::set_var("ACCESS_TOKEN_SECRET", "");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "ACCESS_TOKEN_SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_short_secret_rejected() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("ACCESS_TOKEN_SECRET", "short");
        env::set_var("REFRESH_TOKEN_SECRET", "test-refresh-secret-0123456789");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "ACCESS_TOKEN_SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("ACCESS_TOKEN_SECRET", "the-same-secret-value-here");
        env::set_var("REFRESH_TOKEN_SECRET", "the-same-secret-value-here");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "REFRESH_TOKEN_SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        clear_test_env();
        set_required_env();

        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        clear_test_env();
        set_required_env();
        env::set_var("BIND_ADDR", "0.0.0.0:3000");

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.session_duration_hours, 24);
        assert_eq!(config.challenge_expiry_minutes, 5);
        assert_eq!(config.challenge_sweep_secs, 300);
        assert_eq!(config.session_sweep_secs, 3_600);
        assert!(!config.dev_mode);

        clear_test_env();
    }

    #[test]
    fn test_dev_mode_needs_both_flags() {
        let _guard = lock_test();
        clear_test_env();
        set_required_env();

        // Only the bypass flag: stays off
        env::set_var("DEV_AUTH_BYPASS", "true");
        assert!(!Config::from_env().unwrap().dev_mode);

        // Only the environment: stays off
        env::remove_var("DEV_AUTH_BYPASS");
        env::set_var("APP_ENV", "development");
        assert!(!Config::from_env().unwrap().dev_mode);

        // Both: on
        env::set_var("DEV_AUTH_BYPASS", "true");
        assert!(Config::from_env().unwrap().dev_mode);

        clear_test_env();
    }

    #[test]
    fn test_duration_helpers() {
        let _guard = lock_test();
        clear_test_env();
        set_required_env();
        env::set_var("SESSION_DURATION_HOURS", "2");
        env::set_var("CHALLENGE_EXPIRY_MINUTES", "3");

        let config = Config::from_env().unwrap();
        assert_eq!(config.session_duration_ms(), 2 * 3_600_000);
        assert_eq!(config.challenge_expiry_ms(), 3 * 60_000);
        assert!(config.refresh_token_ttl_ms() > config.session_duration_ms());

        clear_test_env();
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let _guard = lock_test();
        clear_test_env();
        set_required_env();

        let config = Config::from_env().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("test-access-secret"));
        assert!(!debug.contains("test-refresh-secret"));

        clear_test_env();
    }
}
