use std::{collections::HashSet, env, fmt, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::{matcher::RouteMatcher, policy::AccessPolicy};

/// ConfigError
///
/// Startup faults. Any of these stops the process before the listener is bound, so a
/// misconfigured gate never serves a single request.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("SESSION_JWT_SECRET must be set to a non-empty value")]
    MissingSecret,
    #[error("{key} must be an absolute path without a query string, got {value:?}")]
    InvalidPath { key: &'static str, value: String },
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("BIND_ADDR is not a socket address: {0:?}")]
    InvalidBindAddr(String),
    #[error("{key}={path} is itself gated and would redirect back to itself")]
    RedirectLoop { key: &'static str, path: String },
}

/// AppConfig
///
/// Holds the gate's entire configuration. Loaded once at startup and never mutated afterwards;
/// every request reads it through the shared `AppState`.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls the log output format.
    pub env: Env,
    pub bind_addr: SocketAddr,
    // HS256 secret used to verify session tokens. Never logged.
    pub jwt_secret: String,
    // Name of the cookie carrying the session token.
    pub session_cookie: String,
    pub access: AccessPolicy,
    pub sign_in_path: String,
    pub denied_path: String,
    // Which inbound paths the gate inspects at all.
    pub matcher: RouteMatcher,
    pub verify_timeout: Duration,
}

/// Env
///
/// Defines the runtime context: pretty logs locally, JSON logs in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_COOKIE: &str = "session_token";
pub const DEFAULT_PRIVILEGED_PREFIX: &str = "/admin";
pub const DEFAULT_SIGN_IN_PATH: &str = "/auth/signin";
pub const DEFAULT_DENIED_PATH: &str = "/";
pub const DEFAULT_MATCHER: &str = "/admin/:path*,/account/:path*";
pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 2000;

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("session_cookie", &self.session_cookie)
            .field("access", &self.access)
            .field("sign_in_path", &self.sign_in_path)
            .field("denied_path", &self.denied_path)
            .field("matcher", &self.matcher)
            .field("verify_timeout", &self.verify_timeout)
            .finish()
    }
}

impl AppConfig {
    /// with_secret
    ///
    /// Builds a configuration with every default in place and the given verification secret.
    /// Used by tests to get a working gate without touching the process environment; the
    /// allow-lists start empty, so privileged paths fail closed until populated.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            env: Env::Local,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            jwt_secret: secret.into(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            access: AccessPolicy::new(
                DEFAULT_PRIVILEGED_PREFIX,
                HashSet::new(),
                HashSet::new(),
            ),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            denied_path: DEFAULT_DENIED_PATH.to_string(),
            matcher: RouteMatcher::parse(DEFAULT_MATCHER),
            verify_timeout: Duration::from_millis(DEFAULT_VERIFY_TIMEOUT_MS),
        }
    }

    /// load
    ///
    /// Reads the configuration from environment variables and validates it.
    ///
    /// Unlike the optional settings, the verification secret has no fallback in any
    /// environment: an absent secret is reported here rather than surfacing as a gate that
    /// silently rejects (or admits) everyone.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = env::var("SESSION_JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let bind_raw = var_or("BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_raw.clone()))?;

        let timeout_raw = var_or("VERIFY_TIMEOUT_MS", &DEFAULT_VERIFY_TIMEOUT_MS.to_string());
        let verify_timeout = match timeout_raw.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Duration::from_millis(ms),
            _ => {
                return Err(ConfigError::InvalidNumber {
                    key: "VERIFY_TIMEOUT_MS",
                    value: timeout_raw,
                });
            }
        };

        let access = AccessPolicy::new(
            var_or("PRIVILEGED_PREFIX", DEFAULT_PRIVILEGED_PREFIX),
            parse_list(&var_or("ADMIN_EMAILS", "")),
            parse_list(&var_or("ADMIN_DOMAINS", "")),
        );

        let config = Self {
            env,
            bind_addr,
            jwt_secret,
            session_cookie: var_or("SESSION_COOKIE", DEFAULT_SESSION_COOKIE),
            access,
            sign_in_path: var_or("SIGN_IN_PATH", DEFAULT_SIGN_IN_PATH),
            denied_path: var_or("DENIED_PATH", DEFAULT_DENIED_PATH),
            matcher: RouteMatcher::parse(&var_or("GATE_MATCHER", DEFAULT_MATCHER)),
            verify_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    /// validate
    ///
    /// Checks the invariants `load` cannot express through parsing alone. Both redirect
    /// targets must be reachable without passing through the gate, otherwise a denied caller
    /// would bounce between the gate and the target forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        for (key, path) in [
            ("PRIVILEGED_PREFIX", self.access.privileged_prefix()),
            ("SIGN_IN_PATH", self.sign_in_path.as_str()),
            ("DENIED_PATH", self.denied_path.as_str()),
        ] {
            if !path.starts_with('/') || path.contains('?') {
                return Err(ConfigError::InvalidPath {
                    key,
                    value: path.to_string(),
                });
            }
        }

        if self.matcher.matches(&self.sign_in_path) {
            return Err(ConfigError::RedirectLoop {
                key: "SIGN_IN_PATH",
                path: self.sign_in_path.clone(),
            });
        }

        if self.matcher.matches(&self.denied_path)
            || self.access.is_privileged(&self.denied_path)
        {
            return Err(ConfigError::RedirectLoop {
                key: "DENIED_PATH",
                path: self.denied_path.clone(),
            });
        }

        Ok(())
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Splits a comma-separated setting. Surrounding whitespace belongs to the separator, not the
/// entry; entries themselves are kept exactly as written (no case folding).
pub fn parse_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_keeps_case_and_drops_blanks() {
        let list = parse_list(" Admin@Example.com, ,ops@example.com,");
        assert_eq!(list.len(), 2);
        assert!(list.contains("Admin@Example.com"));
        assert!(!list.contains("admin@example.com"));
        assert!(list.contains("ops@example.com"));
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(AppConfig::with_secret("s3cret").validate(), Ok(()));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(
            AppConfig::with_secret("").validate(),
            Err(ConfigError::MissingSecret)
        );
    }

    #[test]
    fn gated_denied_path_is_a_loop() {
        let mut config = AppConfig::with_secret("s3cret");
        config.denied_path = "/admin/denied".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RedirectLoop { key: "DENIED_PATH", .. })
        ));
    }

    #[test]
    fn gated_sign_in_path_is_a_loop() {
        let mut config = AppConfig::with_secret("s3cret");
        config.sign_in_path = "/account/login".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RedirectLoop { key: "SIGN_IN_PATH", .. })
        ));
    }

    #[test]
    fn relative_paths_are_rejected() {
        let mut config = AppConfig::with_secret("s3cret");
        config.sign_in_path = "auth/signin".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPath { key: "SIGN_IN_PATH", .. })
        ));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", AppConfig::with_secret("do-not-print-me"));
        assert!(!rendered.contains("do-not-print-me"));
        assert!(rendered.contains("<redacted>"));
    }
}
