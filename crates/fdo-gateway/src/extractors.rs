//! # Request Context
//!
//! Everything a handler needs from the raw request, pulled out once by the
//! dispatcher: the matched route with its captures, the caller's
//! credentials, the `orgid` query parameter, the content type and the body.
//! The helpers enforce the request-shape rules (plain-text bodies, UUID
//! device ids, safe resource names) after authentication has happened.

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Uri};
use fdo_core::{
    resolve_org, Capture, Credentials, DeviceId, OrgId, PublicKeyAlias, ResourceName, RouteMatch,
};

use crate::auth::{self, caller_credentials};
use crate::error::AppError;
use crate::state::AppState;

/// Parsed request, bound to the route it matched.
#[derive(Debug)]
pub struct RequestContext {
    route: RouteMatch,
    credentials: Option<Credentials>,
    query_org: Option<String>,
    content_type: Option<String>,
    body: Bytes,
}

impl RequestContext {
    pub fn new(route: RouteMatch, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Self {
        let query_org = uri.query().and_then(first_orgid);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            route,
            credentials: caller_credentials(headers),
            query_org,
            content_type,
            body,
        }
    }

    /// Resolve the organization for this request and authenticate the
    /// caller against it.
    pub async fn authorized_org(&self, state: &AppState) -> Result<OrgId, AppError> {
        let org = resolve_org(
            self.route.get(Capture::Org),
            self.credentials.as_ref().map(Credentials::org),
            self.query_org.as_deref(),
        )?;
        auth::authorize(state, self.credentials.as_ref(), &org).await?;
        Ok(org)
    }

    /// The body, provided the request declared `text/plain`.
    pub fn plain_text_body(&self) -> Result<&[u8], AppError> {
        require_plain_text(self.content_type.as_deref())?;
        Ok(&self.body)
    }

    /// The `{device}` capture as a device id.
    pub fn device(&self) -> Result<DeviceId, AppError> {
        Ok(DeviceId::parse(self.capture(Capture::Device)?)?)
    }

    /// The `{name}` capture as a resource name.
    pub fn resource_name(&self) -> Result<ResourceName, AppError> {
        Ok(ResourceName::new(self.capture(Capture::Name)?)?)
    }

    /// The `{alias}` capture as a public key alias.
    pub fn key_alias(&self) -> Result<PublicKeyAlias, AppError> {
        Ok(self.capture(Capture::Alias)?.parse::<PublicKeyAlias>()?)
    }

    fn capture(&self, capture: Capture) -> Result<&str, AppError> {
        self.route.get(capture).ok_or_else(|| {
            AppError::Internal(format!(
                "route {} has no {{{}}} capture",
                self.route.pattern(),
                capture.as_str()
            ))
        })
    }
}

/// First `orgid` pair of a query string. Repeated keys and unrelated pairs
/// never hide it.
fn first_orgid(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "orgid")
        .map(|(_, value)| value.into_owned())
}

/// Accept `text/plain`, with or without parameters such as a charset.
pub fn require_plain_text(content_type: Option<&str>) -> Result<(), AppError> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if essence.eq_ignore_ascii_case("text/plain") {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Error: Content-Type header must be text/plain (got \"{}\")",
            content_type.unwrap_or_default()
        )))
    }
}
