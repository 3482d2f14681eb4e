//! Exchange client: the Auth Gate's transport.
//!
//! The gateway never validates passwords itself. It replays the caller's
//! Basic credentials against `GET {exchange}/orgs/{org}`; the exchange only
//! lets users of that organization (and root/hub admins) read it.

use std::time::Duration;

use fdo_core::{Credentials, OrgId};
use reqwest::StatusCode;
use url::Url;

use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::retry::retry_with_interval;

/// Client for the exchange authority.
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ExchangeClient {
    /// Create a client. A configured CA certificate is added to the trust
    /// roots.
    pub fn new(config: &ExchangeConfig) -> Result<Self, ExchangeError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(pem) = &config.ca_cert_pem {
            let cert = reqwest::Certificate::from_pem(pem).map_err(ExchangeError::Certificate)?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder.build().map_err(ExchangeError::Client)?;

        Ok(Self {
            http,
            base_url: config.internal_url.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ExchangeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ExchangeError::Url {
                endpoint: segments.join("/"),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Ask the exchange whether `credentials` may act within `org`.
    ///
    /// `Ok(false)` is an explicit rejection (401, 403, 404). Other
    /// statuses and transport failures are errors, never a rejection.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
        org: &OrgId,
    ) -> Result<bool, ExchangeError> {
        let url = self.url(&["orgs", org.as_str()])?;
        let endpoint = format!("/orgs/{org}");

        let response = self
            .http
            .get(url)
            .basic_auth(credentials.qualified_user(), Some(credentials.password()))
            .send()
            .await
            .map_err(|source| ExchangeError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                tracing::info!(
                    org = %org,
                    user = %credentials.qualified_user(),
                    status = response.status().as_u16(),
                    "exchange rejected credentials"
                );
                Ok(false)
            }
            s => Err(ExchangeError::UnexpectedStatus {
                endpoint,
                status: s.as_u16(),
            }),
        }
    }

    async fn version(&self) -> Result<(), ExchangeError> {
        let endpoint = "/admin/version".to_string();
        let url = self.url(&["admin", "version"])?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ExchangeError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ExchangeError::UnexpectedStatus {
                endpoint,
                status: response.status().as_u16(),
            })
        }
    }

    /// Probe `GET /admin/version` until it succeeds, up to `attempts`
    /// times, `interval` apart.
    pub async fn verify_connection(
        &self,
        attempts: u32,
        interval: Duration,
    ) -> Result<(), ExchangeError> {
        retry_with_interval(attempts, interval, "exchange connectivity check", || self.version())
            .await?;
        tracing::info!(url = %self.base_url, "exchange reachable");
        Ok(())
    }
}
