// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};
use thiserror::Error;
use url::Url;

use crate::seal::MIN_PASSWORD_LEN;

/// Longest lifetime accepted for sealed sessions (one year).
pub const MAX_SESSION_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Environment variables the server refuses to start without.
pub const REQUIRED_ENV_VARS: &[&str] = &["NEXT_PUBLIC_WC_PID", "IRON_SESSION_PASSWORD"];

/// Central configuration for the auth server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    pub log_level: String,
    /// WalletConnect project ID handed to the frontend
    pub wallet_connect_project_id: String,

    pub session: SessionConfig,
    pub siwe: SiweConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Secret the session key is derived from; never logged
    pub password: String,
    /// Lifetime of an authenticated session
    pub ttl_seconds: i64,
    /// Lifetime of a nonce-only session
    pub nonce_ttl_seconds: i64,
    pub secure_cookies: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SiweConfig {
    /// Expected `domain` of incoming messages; unchecked when unset
    pub domain: Option<String>,
    pub chain_id: u64,
    pub statement: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    pub paths: Vec<String>,
    /// Key clients on `Forwarded` / `X-Forwarded-For`. Only safe behind a
    /// reverse proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            log_level: "info".to_string(),
            wallet_connect_project_id: String::new(),
            session: SessionConfig::default(),
            siwe: SiweConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "siwe".to_string(),
            password: String::new(),
            ttl_seconds: 14 * 24 * 60 * 60,
            nonce_ttl_seconds: 600,
            secure_cookies: false,
        }
    }
}

impl Default for SiweConfig {
    fn default() -> Self {
        Self {
            domain: None,
            chain_id: 1,
            statement: "Sign in with Ethereum to the application.".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_seconds: 60,
            paths: vec!["/api/auth/nonce".to_string(), "/api/auth/verify".to_string()],
            trust_forwarded_headers: false,
        }
    }
}

/// Errors raised while validating configuration at startup
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),
    #[error("session password must be at least {min} characters long")]
    WeakSessionPassword { min: usize },
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
    #[error("{field} must be at most {max} seconds")]
    TtlTooLong { field: &'static str, max: i64 },
}

/// Outcome of checking the required environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvValidation {
    pub is_valid: bool,
    pub missing_vars: Vec<String>,
}

/// Check the process environment for every entry of [`REQUIRED_ENV_VARS`]
pub fn validate_env_vars() -> EnvValidation {
    validate_env_vars_with(|name| env::var(name).ok())
}

/// Same as [`validate_env_vars`] over an arbitrary lookup. Empty values count as missing.
pub fn validate_env_vars_with<F>(lookup: F) -> EnvValidation
where
    F: Fn(&str) -> Option<String>,
{
    let missing_vars: Vec<String> = REQUIRED_ENV_VARS
        .iter()
        .copied()
        .filter(|name| lookup(name).map_or(true, |value| value.is_empty()))
        .map(|name| name.to_string())
        .collect();

    EnvValidation {
        is_valid: missing_vars.is_empty(),
        missing_vars,
    }
}

pub fn assert_env_vars() -> Result<(), StartupError> {
    assert_env_vars_with(|name| env::var(name).ok())
}

pub fn assert_env_vars_with<F>(lookup: F) -> Result<(), StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    let EnvValidation { is_valid, missing_vars } = validate_env_vars_with(lookup);
    if is_valid {
        Ok(())
    } else {
        Err(StartupError::MissingEnvVars(missing_vars))
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let mut config: Config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment variables with prefix "APP", e.g. APP__SESSION__TTL_SECONDS
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        config.apply_env_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    /// Load from files and environment, falling back to environment variables only
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let mut config = Self::default();
                config.apply_env_overrides(|name| env::var(name).ok());
                config
            }
        }
    }

    /// Apply the well-known variables shared with the frontend deployment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("WEB_SERVER_ADDR") {
            self.web_server_addr = addr;
        }
        if let Some(password) = lookup("IRON_SESSION_PASSWORD") {
            self.session.password = password;
        }
        if let Some(project_id) = lookup("NEXT_PUBLIC_WC_PID") {
            self.wallet_connect_project_id = project_id;
        }
        if let Some(raw) = lookup("NEXT_PUBLIC_CHAIN_ID") {
            match raw.parse::<u64>() {
                Ok(chain_id) => self.siwe.chain_id = chain_id,
                Err(_) => tracing::warn!("Ignoring invalid NEXT_PUBLIC_CHAIN_ID: {}", raw),
            }
        }
        if let Some(raw) = lookup("NEXTAUTH_URL") {
            match auth_domain(&raw) {
                Some(domain) => self.siwe.domain = Some(domain),
                None => tracing::warn!("Invalid NEXTAUTH_URL, domain check disabled: {}", raw),
            }
        }

        let production = ["RUN_MODE", "NODE_ENV"]
            .iter()
            .any(|name| lookup(name).as_deref() == Some("production"));
        if production {
            self.session.secure_cookies = true;
        }
    }

    /// Sanity checks that do not depend on the environment
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.session.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(StartupError::WeakSessionPassword { min: MIN_PASSWORD_LEN });
        }
        check_ttl("session.ttl_seconds", self.session.ttl_seconds)?;
        check_ttl("session.nonce_ttl_seconds", self.session.nonce_ttl_seconds)?;
        if self.rate_limit.window_seconds == 0 {
            return Err(StartupError::NonPositive { field: "rate_limit.window_seconds" });
        }
        Ok(())
    }
}

fn check_ttl(field: &'static str, seconds: i64) -> Result<(), StartupError> {
    if seconds <= 0 {
        return Err(StartupError::NonPositive { field });
    }
    if seconds > MAX_SESSION_TTL_SECONDS {
        return Err(StartupError::TtlTooLong {
            field,
            max: MAX_SESSION_TTL_SECONDS,
        });
    }
    Ok(())
}

/// Host (with port, if any) of a base URL, as used for the SIWE `domain` field
pub fn auth_domain(base_url: &str) -> Option<String> {
    let url = Url::parse(base_url).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_validate_env_vars_all_present() {
        let result = validate_env_vars_with(lookup_from(&[
            ("NEXT_PUBLIC_WC_PID", "test-project-id"),
            ("IRON_SESSION_PASSWORD", "a-very-long-session-password-of-32+chars"),
        ]));
        assert!(result.is_valid);
        assert!(result.missing_vars.is_empty());
    }

    #[test]
    fn test_validate_env_vars_missing_project_id() {
        let result = validate_env_vars_with(lookup_from(&[
            ("IRON_SESSION_PASSWORD", "a-very-long-session-password-of-32+chars"),
        ]));
        assert!(!result.is_valid);
        assert!(result.missing_vars.contains(&"NEXT_PUBLIC_WC_PID".to_string()));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let result = validate_env_vars_with(lookup_from(&[
            ("NEXT_PUBLIC_WC_PID", ""),
            ("IRON_SESSION_PASSWORD", "a-very-long-session-password-of-32+chars"),
        ]));
        assert_eq!(result.missing_vars, vec!["NEXT_PUBLIC_WC_PID".to_string()]);
    }

    #[test]
    fn test_assert_env_vars_lists_all_missing() {
        let err = assert_env_vars_with(lookup_from(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: NEXT_PUBLIC_WC_PID, IRON_SESSION_PASSWORD"
        );
    }

    #[test]
    fn test_assert_env_vars_ok() {
        assert!(assert_env_vars_with(lookup_from(&[
            ("NEXT_PUBLIC_WC_PID", "test-project-id"),
            ("IRON_SESSION_PASSWORD", "x"),
        ]))
        .is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup_from(&[
            ("IRON_SESSION_PASSWORD", "secret"),
            ("NEXT_PUBLIC_WC_PID", "wc-123"),
            ("NEXTAUTH_URL", "https://app.example.com:8443/login"),
            ("NEXT_PUBLIC_CHAIN_ID", "10"),
            ("NODE_ENV", "production"),
        ]));

        assert_eq!(config.session.password, "secret");
        assert_eq!(config.wallet_connect_project_id, "wc-123");
        assert_eq!(config.siwe.domain.as_deref(), Some("app.example.com:8443"));
        assert_eq!(config.siwe.chain_id, 10);
        assert!(config.session.secure_cookies);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup_from(&[
            ("NEXTAUTH_URL", "not a url"),
            ("NEXT_PUBLIC_CHAIN_ID", "mainnet"),
        ]));

        assert_eq!(config.siwe.domain, None);
        assert_eq!(config.siwe.chain_id, 1);
        assert!(!config.session.secure_cookies);
    }

    #[test]
    fn test_validate_rejects_short_password() {
        let mut config = Config::default();
        config.session.password = "too-short".to_string();
        assert!(matches!(
            config.validate(),
            Err(StartupError::WeakSessionPassword { .. })
        ));

        config.session.password = "0123456789abcdef0123456789abcdef".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_ttls() {
        let mut config = Config::default();
        config.session.password = "0123456789abcdef0123456789abcdef".to_string();

        config.session.ttl_seconds = i64::MAX;
        assert!(matches!(
            config.validate(),
            Err(StartupError::TtlTooLong { field: "session.ttl_seconds", .. })
        ));

        config.session.ttl_seconds = MAX_SESSION_TTL_SECONDS;
        config.session.nonce_ttl_seconds = 1_000_000_000_000_000;
        assert!(matches!(
            config.validate(),
            Err(StartupError::TtlTooLong { field: "session.nonce_ttl_seconds", .. })
        ));

        config.session.nonce_ttl_seconds = 0;
        assert!(matches!(config.validate(), Err(StartupError::NonPositive { .. })));
    }

    #[test]
    fn test_auth_domain() {
        assert_eq!(auth_domain("http://localhost:3000").as_deref(), Some("localhost:3000"));
        assert_eq!(auth_domain("https://example.com/").as_deref(), Some("example.com"));
        assert_eq!(auth_domain("::"), None);
    }
}
