//! Owner Service client.
//!
//! | Method | Path | Helper |
//! |--------|------|--------|
//! | GET    | `/health` | [`OwnerClient::health`] |
//! | GET    | `/api/v1/certificate?alias=` | [`OwnerClient::certificate`] |
//! | POST   | `/api/v1/owner/vouchers` | [`OwnerClient::import_voucher`] |
//! | GET    | `/api/v1/owner/vouchers/{id}` | [`OwnerClient::voucher`] |
//! | POST   | `/api/v1/owner/redirect` | [`OwnerClient::set_redirect`] |
//! | GET    | `/api/v1/owner/redirect` | [`OwnerClient::redirect`] |
//! | GET    | `/api/v1/to0/{id}` | [`OwnerClient::trigger_to0`] |
//! | POST   | `/api/v1/owner/resource?filename=` | [`OwnerClient::put_resource`] |
//! | GET    | `/api/v1/owner/resource?filename=` | [`OwnerClient::resource`] |
//! | POST   | `/api/v1/owner/svi` | [`OwnerClient::put_service_info`] |
//!
//! Every call uses the shared service credential. Bodies are opaque to the
//! client and relayed as `text/plain`. Responses come back unchanged,
//! whatever their status.

use std::sync::Arc;
use std::time::Duration;

use fdo_core::{DeviceId, PublicKeyAlias, ResourceName};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use url::{Position, Url};
use zeroize::Zeroizing;

use crate::config::OwnerServiceConfig;
use crate::digest::{DigestChallenge, DigestRequest};
use crate::error::OwnerError;

/// Owner Service response, relayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl OwnerResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Digest-authenticated client for the Owner Service.
#[derive(Clone)]
pub struct OwnerClient {
    http: reqwest::Client,
    base_url: Url,
    user: String,
    password: Arc<Zeroizing<String>>,
}

impl std::fmt::Debug for OwnerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl OwnerClient {
    /// Create a client from configuration.
    pub fn new(config: OwnerServiceConfig) -> Result<Self, OwnerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(OwnerError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url,
            user: config.api_user,
            password: Arc::new(config.api_password),
        })
    }

    /// Base URL of the Owner Service.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, OwnerError> {
        if !endpoint.starts_with('/') {
            return Err(OwnerError::Url {
                endpoint: endpoint.to_string(),
            });
        }
        let mut url = self.base_url.clone();
        let path = format!("{}{endpoint}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        authorization: Option<&str>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "text/plain")
                .body(body.to_vec());
        }
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        request.send().await
    }

    /// Send one request to `endpoint` (path relative to the base URL).
    ///
    /// The first attempt carries no credentials. If the service answers 401
    /// with a Digest challenge, the request is sent once more with the
    /// computed `Authorization` header and that response is returned.
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<OwnerResponse, OwnerError> {
        let url = self.url(endpoint, query)?;
        let transport = |source| OwnerError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let mut response = self.send(&method, &url, body, None).await.map_err(transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get_all(WWW_AUTHENTICATE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find(|v| v.trim_start().to_ascii_lowercase().starts_with("digest"))
                .map(DigestChallenge::parse);

            if let Some(challenge) = challenge {
                let challenge = challenge.map_err(|source| OwnerError::Digest {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
                let authorization = challenge.respond(&DigestRequest {
                    username: &self.user,
                    password: self.password.as_str(),
                    method: method.as_str(),
                    uri: &url[Position::BeforePath..],
                    body: body.unwrap_or_default(),
                });
                response = self
                    .send(&method, &url, body, Some(&authorization))
                    .await
                    .map_err(transport)?;
            }
        }

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport)?.to_vec();
        tracing::debug!(%method, endpoint, status, "Owner Service call");
        Ok(OwnerResponse { status, body })
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<OwnerResponse, OwnerError> {
        self.call(Method::GET, "/health", &[], None).await
    }

    /// `GET /api/v1/certificate?alias=`.
    pub async fn certificate(&self, alias: PublicKeyAlias) -> Result<OwnerResponse, OwnerError> {
        self.call(Method::GET, "/api/v1/certificate", &[("alias", alias.as_str())], None)
            .await
    }

    /// `POST /api/v1/owner/vouchers`. On success the body is the device GUID.
    pub async fn import_voucher(&self, voucher: &[u8]) -> Result<OwnerResponse, OwnerError> {
        self.call(Method::POST, "/api/v1/owner/vouchers", &[], Some(voucher))
            .await
    }

    /// `GET /api/v1/owner/vouchers/{id}`.
    pub async fn voucher(&self, device: &DeviceId) -> Result<OwnerResponse, OwnerError> {
        let endpoint = format!("/api/v1/owner/vouchers/{device}");
        self.call(Method::GET, &endpoint, &[], None).await
    }

    /// `POST /api/v1/owner/redirect`.
    pub async fn set_redirect(&self, body: &[u8]) -> Result<OwnerResponse, OwnerError> {
        self.call(Method::POST, "/api/v1/owner/redirect", &[], Some(body))
            .await
    }

    /// `GET /api/v1/owner/redirect`.
    pub async fn redirect(&self) -> Result<OwnerResponse, OwnerError> {
        self.call(Method::GET, "/api/v1/owner/redirect", &[], None).await
    }

    /// `GET /api/v1/to0/{id}`.
    pub async fn trigger_to0(&self, device: &DeviceId) -> Result<OwnerResponse, OwnerError> {
        let endpoint = format!("/api/v1/to0/{device}");
        self.call(Method::GET, &endpoint, &[], None).await
    }

    /// `POST /api/v1/owner/resource?filename=`.
    pub async fn put_resource(
        &self,
        name: &ResourceName,
        body: &[u8],
    ) -> Result<OwnerResponse, OwnerError> {
        self.call(
            Method::POST,
            "/api/v1/owner/resource",
            &[("filename", name.as_str())],
            Some(body),
        )
        .await
    }

    /// `GET /api/v1/owner/resource?filename=`.
    pub async fn resource(&self, name: &ResourceName) -> Result<OwnerResponse, OwnerError> {
        self.call(
            Method::GET,
            "/api/v1/owner/resource",
            &[("filename", name.as_str())],
            None,
        )
        .await
    }

    /// `POST /api/v1/owner/svi`.
    pub async fn put_service_info(&self, body: &[u8]) -> Result<OwnerResponse, OwnerError> {
        self.call(Method::POST, "/api/v1/owner/svi", &[], Some(body))
            .await
    }
}
