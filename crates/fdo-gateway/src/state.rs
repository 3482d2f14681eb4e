//! # Application State
//!
//! Shared state handed to every handler: the gateway's own configuration,
//! the route table, the device index and the two backend clients. Every
//! field is cheap to clone (`Arc` or an internally shared client).

use std::sync::Arc;

use fdo_core::{RouteError, RouteTable};
use fdo_owner_client::{decode_pem_value, ConfigError, ExchangeClient, OwnerClient};
use fdo_store::{DeviceIndex, StoreResult};

use crate::error::AppError;

/// Default source of the agent packages devices download.
pub const DEFAULT_PKGS_FROM: &str =
    "https://github.com/open-horizon/anax/releases/latest/download";
/// Default source of the agent config file.
pub const DEFAULT_CFG_FILE_FROM: &str = "css:";
/// Default To2 port advertised in the redirect.
pub const DEFAULT_TO2_PORT: u16 = 8042;

const KNOWN_PKG_SOURCES: [&str; 3] = ["https://github.com/", "css:", "http"];

/// Gateway configuration that shapes onboarding.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gateway version, served by `GetVersion`.
    pub version: String,
    /// Where devices fetch agent packages (`-i` of the install command).
    pub pkgs_from: String,
    /// Where devices fetch the agent config (`-k` of the install command).
    pub cfg_file_from: String,
    /// Model management (CSS) URL written into `agent-install.cfg`.
    pub css_url: String,
    /// Management hub certificate (PEM), if the hub uses one.
    pub mgmt_hub_cert: Option<Vec<u8>>,
    /// Host advertised to devices for To2. Unset means no redirect is registered.
    pub to2_host: Option<String>,
    /// Port advertised to devices for To2.
    pub to2_port: u16,
}

impl AppConfig {
    /// Defaults around the given CSS URL.
    pub fn new(css_url: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            pkgs_from: DEFAULT_PKGS_FROM.to_string(),
            cfg_file_from: DEFAULT_CFG_FILE_FROM.to_string(),
            css_url: css_url.into(),
            mgmt_hub_cert: None,
            to2_host: None,
            to2_port: DEFAULT_TO2_PORT,
        }
    }

    /// Load from the process environment.
    ///
    /// Variables:
    /// - `HZN_FSS_CSSURL` (required)
    /// - `HZN_MGMT_HUB_CERT` (optional, PEM or base64 of PEM)
    /// - `FDO_GET_PKGS_FROM` (default: latest anax release on GitHub)
    /// - `FDO_GET_CFG_FILE_FROM` (default: `css:`)
    /// - `FDO_TO2_HOST` (optional)
    /// - `FDO_TO2_PORT` (default: 8042)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let css_url = present("HZN_FSS_CSSURL").ok_or(ConfigError::Missing("HZN_FSS_CSSURL"))?;
        let mut config = Self::new(css_url.trim_end_matches('/'));

        if let Some(pkgs) = present("FDO_GET_PKGS_FROM") {
            if !KNOWN_PKG_SOURCES.iter().any(|p| pkgs.starts_with(p)) {
                tracing::warn!(pkgs_from = %pkgs, "unrecognized agent package source");
            }
            config.pkgs_from = pkgs;
        }
        if let Some(cfg) = present("FDO_GET_CFG_FILE_FROM") {
            config.cfg_file_from = cfg;
        }
        config.mgmt_hub_cert = present("HZN_MGMT_HUB_CERT").map(|raw| decode_pem_value(&raw));
        config.to2_host = present("FDO_TO2_HOST");
        if let Some(port) = present("FDO_TO2_PORT") {
            config.to2_port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "FDO_TO2_PORT",
                value: port,
            })?;
        }
        Ok(config)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub routes: Arc<RouteTable>,
    pub devices: Arc<dyn DeviceIndex>,
    pub owner: OwnerClient,
    pub exchange: ExchangeClient,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("routes", &self.routes.routes().len())
            .field("devices", &self.devices.backend_name())
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Assemble state around the standard route table.
    pub fn new(
        config: AppConfig,
        devices: Arc<dyn DeviceIndex>,
        owner: OwnerClient,
        exchange: ExchangeClient,
    ) -> Result<Self, RouteError> {
        let routes = RouteTable::standard()?;
        for (earlier, later) in routes.shadowed() {
            tracing::warn!(earlier, later, "route table contains overlapping patterns");
        }
        Ok(Self {
            config: Arc::new(config),
            routes: Arc::new(routes),
            devices,
            owner,
            exchange,
        })
    }

    /// Run a device index operation on the blocking pool.
    pub async fn with_devices<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn DeviceIndex) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let devices = Arc::clone(&self.devices);
        let result = tokio::task::spawn_blocking(move || f(devices.as_ref()))
            .await
            .map_err(|e| AppError::Internal(format!("device index task failed: {e}")))?;
        result.map_err(AppError::from)
    }
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
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[("HZN_FSS_CSSURL", "https://hub:9443/")])).unwrap();
        assert_eq!(cfg.css_url, "https://hub:9443");
        assert_eq!(cfg.pkgs_from, DEFAULT_PKGS_FROM);
        assert_eq!(cfg.cfg_file_from, "css:");
        assert_eq!(cfg.to2_port, 8042);
        assert!(cfg.to2_host.is_none());
        assert!(cfg.mgmt_hub_cert.is_none());
        assert_eq!(cfg.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn css_url_is_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("HZN_FSS_CSSURL")));
    }

    #[test]
    fn overrides_are_read() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("HZN_FSS_CSSURL", "https://hub:9443"),
            ("FDO_GET_PKGS_FROM", "css:"),
            ("FDO_GET_CFG_FILE_FROM", "agent-install.cfg"),
            ("FDO_TO2_HOST", "owner.example"),
            ("FDO_TO2_PORT", "9000"),
            ("HZN_MGMT_HUB_CERT", "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n"),
        ]))
        .unwrap();
        assert_eq!(cfg.pkgs_from, "css:");
        assert_eq!(cfg.cfg_file_from, "agent-install.cfg");
        assert_eq!(cfg.to2_host.as_deref(), Some("owner.example"));
        assert_eq!(cfg.to2_port, 9000);
        assert!(cfg.mgmt_hub_cert.unwrap().starts_with(b"-----BEGIN"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("HZN_FSS_CSSURL", "https://hub:9443"),
            ("FDO_TO2_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "FDO_TO2_PORT", .. }));
    }
}
