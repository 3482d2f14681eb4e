//! # Startup
//!
//! Prepares everything the gateway needs before it accepts a request:
//!
//! 1. the `devices/` and `values/` directories under the database root,
//! 2. the shared files every device receives, each with its `_name`
//!    companion,
//! 3. the exchange CA certificate, persisted beside the database,
//! 4. a reachable exchange,
//! 5. the To2 redirect and the shared files, registered with the Owner
//!    Service.
//!
//! Any failure aborts startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fdo_core::{ResourceName, RouteError};
use fdo_owner_client::{
    ExchangeClient, ExchangeConfig, ExchangeError, OwnerClient, OwnerError,
    OwnerServiceConfig,
};
use fdo_store::{FsDeviceIndex, StoreError, ValuesDir};

use crate::state::{AppConfig, AppState};

/// Management hub certificate shipped to devices.
pub const HUB_CERT_FILE: &str = "agent-install.crt";
/// Agent configuration shipped to devices.
pub const AGENT_CONFIG_FILE: &str = "agent-install.cfg";
/// Wrapper script shipped to devices.
pub const WRAPPER_SCRIPT_FILE: &str = "agent-install-wrapper.sh";
/// Where the exchange CA certificate is persisted, relative to the database root.
pub const EXCHANGE_CA_FILE: &str = "exchange-ca.crt";

const SHARED_FILES: [(&str, &str); 3] = [
    (HUB_CERT_FILE, "agent-install-crt_name"),
    (AGENT_CONFIG_FILE, "agent-install-cfg_name"),
    (WRAPPER_SCRIPT_FILE, "agent-install-wrapper-sh_name"),
];

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("exchange: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Owner Service: {0}")]
    Owner(#[from] OwnerError),

    #[error("Owner Service answered {status} when registering {what}")]
    Registration { what: String, status: u16 },

    #[error("route table: {0}")]
    Routes(#[from] RouteError),
}

/// Everything startup needs.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Database root (`<DB_DIR>`).
    pub db_dir: PathBuf,
    /// Wrapper script copied into `values/`.
    pub wrapper_script: PathBuf,
    /// Onboarding settings shared by the handlers.
    pub app: AppConfig,
    /// Owner Service endpoint and API credentials.
    pub owner: OwnerServiceConfig,
    /// Exchange endpoints, CA and startup retry policy.
    pub exchange: ExchangeConfig,
}

/// Run the startup sequence and return the state the router serves.
pub async fn bootstrap(settings: GatewaySettings) -> Result<AppState, BootstrapError> {
    let GatewaySettings {
        db_dir,
        wrapper_script,
        app,
        owner,
        exchange,
    } = settings;

    let devices = FsDeviceIndex::open(&db_dir)?;
    let values = ValuesDir::open(&db_dir)?;
    tracing::info!(db_dir = %db_dir.display(), "database directories ready");

    let written = write_shared_files(&values, &app, &exchange, &wrapper_script)?;

    if let Some(path) = persist_exchange_ca(&db_dir, &exchange)? {
        tracing::info!(path = %path.display(), "exchange CA certificate persisted");
    }

    let exchange_client = ExchangeClient::new(&exchange)?;
    exchange_client
        .verify_connection(
            exchange.retries,
            Duration::from_secs(exchange.retry_interval_secs),
        )
        .await?;

    let owner_client = OwnerClient::new(owner)?;
    register_defaults(&owner_client, &values, &app, &written).await?;

    Ok(AppState::new(
        app,
        Arc::new(devices),
        owner_client,
        exchange_client,
    )?)
}

/// Write the shared device files into `values/`.
///
/// Returns the names of the files written, in registration order.
pub fn write_shared_files(
    values: &ValuesDir,
    app: &AppConfig,
    exchange: &ExchangeConfig,
    wrapper_script: &Path,
) -> Result<Vec<&'static str>, BootstrapError> {
    let mut written = Vec::with_capacity(SHARED_FILES.len());

    if let Some(cert) = app.mgmt_hub_cert.as_deref().filter(|c| !c.is_empty()) {
        values.write(HUB_CERT_FILE, cert)?;
        written.push(HUB_CERT_FILE);
    }

    let mut cfg = format!(
        "HZN_EXCHANGE_URL={}\nHZN_FSS_CSSURL={}\n",
        exchange.external_url.as_str().trim_end_matches('/'),
        app.css_url
    );
    if written.contains(&HUB_CERT_FILE) {
        cfg.push_str("HZN_MGMT_HUB_CERT_PATH=agent-install.crt\n");
    }
    values.write(AGENT_CONFIG_FILE, cfg.as_bytes())?;
    written.push(AGENT_CONFIG_FILE);
    tracing::info!(config = %cfg.trim_end(), "devices will be configured with");

    let script = std::fs::read(wrapper_script).map_err(|source| BootstrapError::Read {
        path: wrapper_script.to_path_buf(),
        source,
    })?;
    values.write(WRAPPER_SCRIPT_FILE, &script)?;
    written.push(WRAPPER_SCRIPT_FILE);

    for (file, companion) in SHARED_FILES {
        if written.contains(&file) {
            values.write(companion, file.as_bytes())?;
        }
    }
    Ok(written)
}

/// Persist the exchange CA certificate, if one is configured.
pub fn persist_exchange_ca(
    db_dir: &Path,
    exchange: &ExchangeConfig,
) -> Result<Option<PathBuf>, BootstrapError> {
    let Some(pem) = exchange.ca_cert_pem.as_deref().filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    let path = db_dir.join(EXCHANGE_CA_FILE);
    std::fs::write(&path, pem).map_err(|source| BootstrapError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(Some(path))
}

/// Register the To2 redirect (when a host is configured) and the shared
/// files this run wrote, as returned by [`write_shared_files`]. Files left
/// in `values/` by an earlier run are not registered.
pub async fn register_defaults(
    owner: &OwnerClient,
    values: &ValuesDir,
    app: &AppConfig,
    files: &[&str],
) -> Result<(), BootstrapError> {
    if let Some(host) = &app.to2_host {
        let body = redirect_body(host, app.to2_port);
        let response = owner.set_redirect(body.as_bytes()).await?;
        ensure_registered("To2 redirect", response.status, response.is_success())?;
        tracing::info!(host = %host, port = app.to2_port, "To2 redirect registered");
    }

    for &file in files {
        let bytes = values.read(file)?;
        let name = ResourceName::new(file).map_err(|_| StoreError::InvalidName {
            name: file.to_string(),
        })?;
        let response = owner.put_resource(&name, &bytes).await?;
        ensure_registered(file, response.status, response.is_success())?;
        tracing::info!(resource = file, "shared resource registered");
    }
    Ok(())
}

/// RV redirect blob understood by the Owner Service: one HTTP (3) entry.
pub fn redirect_body(host: &str, port: u16) -> String {
    format!("[[null,\"{host}\",{port},3]]")
}

fn ensure_registered(what: &str, status: u16, success: bool) -> Result<(), BootstrapError> {
    if success {
        Ok(())
    } else {
        Err(BootstrapError::Registration {
            what: what.to_string(),
            status,
        })
    }
}
