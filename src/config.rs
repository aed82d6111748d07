use crate::auth::GuardPolicy;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    // Credential source
    pub credentials_path: PathBuf,
    pub reload_secret: Option<String>,

    // Server
    pub bind_addr: SocketAddr,

    // Abuse guard
    pub failure_window_secs: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// 0 disables the hard threshold
    pub max_attempts: usize,
    pub max_tracked_clients: usize,
    pub sweep_interval_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("credentials_path", &self.credentials_path)
            .field(
                "reload_secret",
                &self.reload_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("bind_addr", &self.bind_addr)
            .field("failure_window_secs", &self.failure_window_secs)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("backoff_max_ms", &self.backoff_max_ms)
            .field("max_attempts", &self.max_attempts)
            .field("max_tracked_clients", &self.max_tracked_clients)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("./config/users.cfg"),
            reload_secret: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            failure_window_secs: 60,
            backoff_base_ms: 500,
            backoff_max_ms: 5_000,
            max_attempts: 0,
            max_tracked_clients: 100_000,
            sweep_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();

        let credentials_path = env::var("CONFIG_FILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.credentials_path);

        // Empty secret means the reload endpoint is open
        let reload_secret = env::var("RELOAD_SECRET").ok().filter(|s| !s.is_empty());

        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        let config = Config {
            credentials_path,
            reload_secret,
            bind_addr,
            failure_window_secs: parse_env_or_default(
                "FAIL_WINDOW_SECS",
                defaults.failure_window_secs,
            )?,
            backoff_base_ms: parse_env_or_default("BACKOFF_BASE_MS", defaults.backoff_base_ms)?,
            backoff_max_ms: parse_env_or_default("BACKOFF_MAX_MS", defaults.backoff_max_ms)?,
            max_attempts: parse_env_or_default("MAX_ATTEMPTS", defaults.max_attempts)?,
            max_tracked_clients: parse_env_or_default(
                "MAX_TRACKED_CLIENTS",
                defaults.max_tracked_clients,
            )?,
            sweep_interval_secs: parse_env_or_default(
                "SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_window_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "FAIL_WINDOW_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(ConfigError::InvalidValue(
                "BACKOFF_MAX_MS".to_string(),
                format!("must be at least BACKOFF_BASE_MS ({})", self.backoff_base_ms),
            ));
        }
        if self.max_tracked_clients == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_TRACKED_CLIENTS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Abuse guard tunables derived from this config.
    pub fn guard_policy(&self) -> GuardPolicy {
        GuardPolicy {
            window: Duration::from_secs(self.failure_window_secs),
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
            max_tracked: self.max_tracked_clients,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
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

    const VARS: &[&str] = &[
        "CONFIG_FILE",
        "RELOAD_SECRET",
        "BIND_ADDR",
        "FAIL_WINDOW_SECS",
        "BACKOFF_BASE_MS",
        "BACKOFF_MAX_MS",
        "MAX_ATTEMPTS",
        "MAX_TRACKED_CLIENTS",
        "SWEEP_INTERVAL_SECS",
    ];

    // Set every var explicitly so a stray .env file cannot leak in
    // (dotenvy doesn't override existing vars).
    fn reset_test_env() {
        env::set_var("CONFIG_FILE", "./config/users.cfg");
        env::set_var("RELOAD_SECRET", "");
        env::set_var("BIND_ADDR", "0.0.0.0:8080");
        env::set_var("FAIL_WINDOW_SECS", "60");
        env::set_var("BACKOFF_BASE_MS", "500");
        env::set_var("BACKOFF_MAX_MS", "5000");
        env::set_var("MAX_ATTEMPTS", "0");
        env::set_var("MAX_TRACKED_CLIENTS", "100000");
        env::set_var("SWEEP_INTERVAL_SECS", "60");
    }

    fn clear_test_env() {
        for var in VARS {
            env::remove_var(var);
        }
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
    fn test_config_defaults() {
        let _guard = lock_test();
        reset_test_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.credentials_path, PathBuf::from("./config/users.cfg"));
        assert_eq!(config.reload_secret, None);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");

        let policy = config.guard_policy();
        assert_eq!(policy.window, Duration::from_secs(60));
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.max_tracked, 100_000);
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));

        clear_test_env();
    }

    #[test]
    fn test_overrides() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("CONFIG_FILE", "/etc/hashgate/users.cfg");
        env::set_var("RELOAD_SECRET", "s3cret");
        env::set_var("FAIL_WINDOW_SECS", "30");
        env::set_var("BACKOFF_BASE_MS", "100");
        env::set_var("BACKOFF_MAX_MS", "1000");
        env::set_var("MAX_ATTEMPTS", "10");

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.credentials_path,
            PathBuf::from("/etc/hashgate/users.cfg")
        );
        assert_eq!(config.reload_secret.as_deref(), Some("s3cret"));

        let policy = config.guard_policy();
        assert_eq!(policy.window, Duration::from_secs(30));
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, Some(10));

        clear_test_env();
    }

    #[test]
    fn test_debug_redacts_reload_secret() {
        let config = Config {
            reload_secret: Some("do-not-print".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("do-not-print"));
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_unparseable_number() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("BACKOFF_BASE_MS", "half a second");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ParseError(ref s, _) if s == "BACKOFF_BASE_MS"
        ));

        clear_test_env();
    }

    #[test]
    fn test_zero_window_rejected() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("FAIL_WINDOW_SECS", "0");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "FAIL_WINDOW_SECS"
        ));

        clear_test_env();
    }

    #[test]
    fn test_cap_below_base_rejected() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("BACKOFF_BASE_MS", "2000");
        env::set_var("BACKOFF_MAX_MS", "1000");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "BACKOFF_MAX_MS"
        ));

        clear_test_env();
    }

    #[test]
    fn test_zero_tracked_clients_rejected() {
        let _guard = lock_test();
        reset_test_env();

        env::set_var("MAX_TRACKED_CLIENTS", "0");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "MAX_TRACKED_CLIENTS"
        ));

        clear_test_env();
    }
}
