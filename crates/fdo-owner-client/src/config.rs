//! Client configuration.
//!
//! Both configs are read once at startup. `from_env` reads the process
//! environment; `from_lookup` takes any variable lookup so tests do not
//! have to mutate global state.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;
use zeroize::Zeroizing;

/// Owner Service connection settings.
///
/// Custom `Debug` implementation redacts the password.
#[derive(Clone)]
pub struct OwnerServiceConfig {
    /// Base URL, e.g. `http://owner:8042`.
    pub base_url: Url,
    /// Digest user.
    pub api_user: String,
    /// Digest password.
    pub api_password: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for OwnerServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_user", &self.api_user)
            .field("api_password", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OwnerServiceConfig {
    /// Load from the process environment.
    ///
    /// Variables:
    /// - `HZN_FDO_API_URL` (required)
    /// - `FDO_OWNER_USER` (default: `apiUser`)
    /// - `FDO_OWNER_PASSWORD` (required)
    /// - `FDO_OWNER_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: required_url(&lookup, "HZN_FDO_API_URL")?,
            api_user: lookup("FDO_OWNER_USER").unwrap_or_else(|| "apiUser".to_string()),
            api_password: Zeroizing::new(required(&lookup, "FDO_OWNER_PASSWORD")?),
            timeout_secs: parsed(&lookup, "FDO_OWNER_TIMEOUT_SECS", 30)?,
        })
    }

    /// Config for a local Owner Service (tests, development).
    pub fn local(base_url: &str, user: &str, password: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("base_url", base_url)?,
            api_user: user.to_string(),
            api_password: Zeroizing::new(password.to_string()),
            timeout_secs: 5,
        })
    }
}

/// Exchange connection settings.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// URL devices use to reach the exchange (written into their config).
    pub external_url: Url,
    /// URL the gateway uses to reach the exchange.
    pub internal_url: Url,
    /// Extra CA certificate (PEM) trusted for `internal_url`.
    pub ca_cert_pem: Option<Vec<u8>>,
    /// Startup connectivity attempts.
    pub retries: u32,
    /// Seconds between startup connectivity attempts.
    pub retry_interval_secs: u64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl ExchangeConfig {
    /// Load from the process environment.
    ///
    /// Variables:
    /// - `HZN_EXCHANGE_URL` (required)
    /// - `EXCHANGE_INTERNAL_URL` (default: `HZN_EXCHANGE_URL`)
    /// - `EXCHANGE_INTERNAL_CERT` (optional, base64 or raw PEM)
    /// - `EXCHANGE_INTERNAL_RETRIES` (default: 12)
    /// - `EXCHANGE_INTERNAL_INTERVAL` (default: 5)
    /// - `EXCHANGE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let external_url = required_url(&lookup, "HZN_EXCHANGE_URL")?;
        let internal_url = match lookup("EXCHANGE_INTERNAL_URL").filter(|s| !s.is_empty()) {
            Some(raw) => parse_url("EXCHANGE_INTERNAL_URL", &raw)?,
            None => external_url.clone(),
        };

        Ok(Self {
            external_url,
            internal_url,
            ca_cert_pem: lookup("EXCHANGE_INTERNAL_CERT")
                .filter(|s| !s.is_empty())
                .map(|raw| decode_pem_value(&raw)),
            retries: parsed(&lookup, "EXCHANGE_INTERNAL_RETRIES", 12)?,
            retry_interval_secs: parsed(&lookup, "EXCHANGE_INTERNAL_INTERVAL", 5)?,
            timeout_secs: parsed(&lookup, "EXCHANGE_TIMEOUT_SECS", 30)?,
        })
    }

    /// Config pointing both URLs at `url` (tests, development).
    pub fn local(url: &str) -> Result<Self, ConfigError> {
        let url = parse_url("url", url)?;
        Ok(Self {
            external_url: url.clone(),
            internal_url: url,
            ca_cert_pem: None,
            retries: 1,
            retry_interval_secs: 0,
            timeout_secs: 5,
        })
    }
}

/// Decode a certificate passed through the environment. Operators may
/// supply either base64 of the PEM or the PEM itself; anything that does
/// not decode as base64 is taken verbatim.
pub fn decode_pem_value(raw: &str) -> Vec<u8> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .unwrap_or_else(|_| raw.as_bytes().to_vec())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<String, ConfigError> {
    lookup(var)
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn required_url(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Url, ConfigError> {
    parse_url(var, &required(lookup, var)?)
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {var}: \"{value}\"")]
    InvalidValue { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn owner_config_defaults() {
        let cfg = OwnerServiceConfig::from_lookup(lookup(&[
            ("HZN_FDO_API_URL", "http://owner:8042"),
            ("FDO_OWNER_PASSWORD", "pw"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://owner:8042/");
        assert_eq!(cfg.api_user, "apiUser");
        assert_eq!(cfg.timeout_secs, 30);
    }

    #[test]
    fn owner_config_requires_url_and_password() {
        let err = OwnerServiceConfig::from_lookup(lookup(&[("FDO_OWNER_PASSWORD", "pw")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("HZN_FDO_API_URL")));
        let err = OwnerServiceConfig::from_lookup(lookup(&[("HZN_FDO_API_URL", "http://o")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("FDO_OWNER_PASSWORD")));
    }

    #[test]
    fn owner_config_debug_redacts_password() {
        let cfg = OwnerServiceConfig::local("http://127.0.0.1:1", "apiUser", "topsecret").unwrap();
        let dbg = format!("{cfg:?}");
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("topsecret"));
    }

    #[test]
    fn exchange_internal_url_defaults_to_external() {
        let cfg = ExchangeConfig::from_lookup(lookup(&[("HZN_EXCHANGE_URL", "https://ex/v1")])).unwrap();
        assert_eq!(cfg.internal_url, cfg.external_url);
        assert_eq!(cfg.retries, 12);
        assert_eq!(cfg.retry_interval_secs, 5);
        assert!(cfg.ca_cert_pem.is_none());
    }

    #[test]
    fn exchange_rejects_bad_retry_count() {
        let err = ExchangeConfig::from_lookup(lookup(&[
            ("HZN_EXCHANGE_URL", "https://ex/v1"),
            ("EXCHANGE_INTERNAL_RETRIES", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "EXCHANGE_INTERNAL_RETRIES", .. }));
    }

    #[test]
    fn cert_value_accepts_base64_or_raw() {
        let pem = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
        assert_eq!(decode_pem_value(&STANDARD.encode(pem)), pem.as_bytes());
        assert_eq!(decode_pem_value(pem), pem.as_bytes());
    }

    #[test]
    fn invalid_url_is_reported() {
        let err = OwnerServiceConfig::from_lookup(lookup(&[
            ("HZN_FDO_API_URL", "not a url"),
            ("FDO_OWNER_PASSWORD", "pw"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(..)));
    }
}
