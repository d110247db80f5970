// Fetcher and session options.

use std::time::Duration;

use anyhow::{anyhow, Result};
use crew_core::CrewConfigSnapshot;
use serde::{Deserialize, Serialize};

pub const FETCHER_BASE_URL_KEY: &str = "fetcher.base_url";
pub const FETCHER_PROCEDURE_KEY: &str = "fetcher.procedure";
pub const FETCHER_API_KEY_KEY: &str = "fetcher.api_key";
pub const FETCHER_TIMEOUT_KEY: &str = "fetcher.timeout";
pub const SESSION_LOGIN_PATH_KEY: &str = "session.login_path";
pub const SESSION_JWT_SECRET_KEY: &str = "session.jwt.secret";
pub const SESSION_JWT_ISSUER_KEY: &str = "session.jwt.issuer";
pub const SESSION_JWT_AUDIENCE_KEY: &str = "session.jwt.audience";

pub const DEFAULT_PROCEDURE: &str = "get_user_capabilities";
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Where and how capability snapshots are fetched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetcherOptions {
    /// Base URL of the remote procedure endpoint, e.g. `https://db.example.com/rest/v1`
    pub base_url: String,
    /// Name of the stored procedure returning the snapshot
    pub procedure: String,
    /// Project API key sent as the `apikey` header
    pub api_key: Option<String>,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            procedure: DEFAULT_PROCEDURE.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl FetcherOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &CrewConfigSnapshot) -> Result<Self> {
        let defaults = Self::default();
        let timeout = match config.get(FETCHER_TIMEOUT_KEY) {
            Some(raw) => humantime_serde::re::humantime::parse_duration(raw.trim())
                .map_err(|e| anyhow!("Invalid {FETCHER_TIMEOUT_KEY} '{raw}': {e}"))?,
            None => defaults.timeout,
        };

        let options = Self {
            base_url: config.get_string(FETCHER_BASE_URL_KEY).unwrap_or_default(),
            procedure: config
                .get_string(FETCHER_PROCEDURE_KEY)
                .unwrap_or(defaults.procedure),
            api_key: config
                .get_string(FETCHER_API_KEY_KEY)
                .filter(|k| !k.trim().is_empty()),
            timeout,
        };
        options.validate().map_err(|e| anyhow!(e))?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), String> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err("Fetcher base_url cannot be empty".to_string());
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(format!("Fetcher base_url must be an http(s) URL, got '{base}'"));
        }
        if self.procedure.trim().is_empty() {
            return Err("Fetcher procedure cannot be empty".to_string());
        }
        if self.timeout.is_zero() {
            return Err("Fetcher timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// `{base_url}/rpc/{procedure}`
    pub fn endpoint(&self) -> String {
        format!(
            "{}/rpc/{}",
            self.base_url.trim().trim_end_matches('/'),
            self.procedure.trim()
        )
    }
}

/// JWT signing algorithms
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

/// How session tokens are verified.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    pub algorithm: JwtAlgorithm,
    /// Expected `iss` claim
    pub issuer: String,
    /// Accepted `aud` values
    pub audience: Vec<String>,
    /// HMAC secret
    pub secret: Option<String>,
    /// Clock skew tolerated when checking `exp`
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            issuer: "crew-auth".to_string(),
            audience: vec!["authenticated".to_string()],
            secret: None,
            leeway: Duration::from_secs(30),
        }
    }
}

impl JwtOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.is_empty() {
            return Err("JWT issuer cannot be empty".to_string());
        }
        if self.audience.is_empty() {
            return Err("JWT audience cannot be empty".to_string());
        }
        match &self.secret {
            None => return Err("HMAC algorithms require a secret".to_string()),
            Some(s) if s.len() < 32 => {
                return Err("JWT secret must be at least 32 characters".to_string())
            }
            Some(_) => {}
        }
        Ok(())
    }
}

/// Session guard configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionOptions {
    /// Where a client without a session is sent
    pub login_path: String,
    pub jwt: JwtOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            jwt: JwtOptions::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &CrewConfigSnapshot) -> Result<Self> {
        let defaults = Self::default();
        let audience = config
            .get(SESSION_JWT_AUDIENCE_KEY)
            .map(|raw| {
                raw.split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or(defaults.jwt.audience);

        let options = Self {
            login_path: config
                .get_string(SESSION_LOGIN_PATH_KEY)
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.login_path),
            jwt: JwtOptions {
                issuer: config
                    .get_string(SESSION_JWT_ISSUER_KEY)
                    .unwrap_or(defaults.jwt.issuer),
                audience,
                secret: config.get_string(SESSION_JWT_SECRET_KEY),
                ..defaults.jwt
            },
        };
        options.validate().map_err(|e| anyhow!(e))?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.login_path.starts_with('/') {
            return Err(format!("Login path must be absolute, got '{}'", self.login_path));
        }
        self.jwt
            .validate()
            .map_err(|e| format!("JWT validation failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_core::CrewConfig;

    const SECRET: &str = "an-hmac-secret-that-is-long-enough!!";

    #[test]
    fn fetcher_options_from_config() {
        let mut config = CrewConfig::new();
        config.set(FETCHER_BASE_URL_KEY, "https://db.example.com/rest/v1/");
        config.set(FETCHER_TIMEOUT_KEY, "2s 500ms");
        config.set(FETCHER_API_KEY_KEY, " ");

        let options = FetcherOptions::from_config(&config.snapshot()).unwrap();

        assert_eq!(options.timeout, Duration::from_millis(2500));
        assert_eq!(options.api_key, None);
        assert_eq!(
            options.endpoint(),
            "https://db.example.com/rest/v1/rpc/get_user_capabilities"
        );
    }

    #[test]
    fn fetcher_options_reject_bad_values() {
        let mut config = CrewConfig::new();
        assert!(FetcherOptions::from_config(&config.snapshot()).is_err());

        config.set(FETCHER_BASE_URL_KEY, "db.example.com");
        assert!(FetcherOptions::from_config(&config.snapshot()).is_err());

        config.set(FETCHER_BASE_URL_KEY, "http://db");
        config.set(FETCHER_TIMEOUT_KEY, "soon");
        let err = FetcherOptions::from_config(&config.snapshot()).unwrap_err();
        assert!(err.to_string().contains("fetcher.timeout"));
    }

    #[test]
    fn session_options_from_config() {
        let mut config = CrewConfig::new();
        config.set(SESSION_JWT_SECRET_KEY, SECRET);
        config.set(SESSION_JWT_AUDIENCE_KEY, "authenticated, staff");
        config.set(SESSION_LOGIN_PATH_KEY, "/auth/sign-in");

        let options = SessionOptions::from_config(&config.snapshot()).unwrap();

        assert_eq!(options.login_path, "/auth/sign-in");
        assert_eq!(options.jwt.audience, vec!["authenticated", "staff"]);
        assert_eq!(options.jwt.issuer, "crew-auth");
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut config = CrewConfig::new();
        config.set(SESSION_JWT_SECRET_KEY, "short");

        let err = SessionOptions::from_config(&config.snapshot()).unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn options_round_trip_through_humantime() {
        let options = FetcherOptions::new("http://db");
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["timeout"], "10s");
    }
}
