//! # Auth Gate
//!
//! Every non-public operation passes through [`authorize`] after tenancy is
//! resolved. The gateway holds no user database: the caller's Basic
//! credentials are replayed against the exchange for the resolved
//! organization, and anything short of an explicit acceptance fails closed.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use fdo_core::{Credentials, OrgId};

use crate::error::{AppError, INVALID_CREDENTIALS};
use crate::state::AppState;

/// Parse the caller's `Authorization` header.
///
/// A missing or malformed header yields `None`; the gate rejects it later,
/// once a protected route is known to be involved.
pub fn caller_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    match Credentials::from_authorization(raw) {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unusable Authorization header");
            None
        }
    }
}

/// Check that `credentials` may act within `org`.
///
/// Exchange rejections map to 401. An unreachable or misbehaving exchange
/// maps to 502 and is never treated as acceptance.
pub async fn authorize(
    state: &AppState,
    credentials: Option<&Credentials>,
    org: &OrgId,
) -> Result<(), AppError> {
    let Some(credentials) = credentials else {
        tracing::info!(org = %org, "request without usable credentials");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    match state.exchange.authenticate(credentials, org).await {
        Ok(true) => {
            tracing::debug!(org = %org, user = %credentials.qualified_user(), "caller authenticated");
            Ok(())
        }
        Ok(false) => {
            tracing::info!(
                org = %org,
                user = %credentials.qualified_user(),
                "exchange rejected credentials"
            );
            Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))
        }
        Err(e) => Err(AppError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_basic_credentials() {
        let mut headers = HeaderMap::new();
        // base64("acme/alice:pw")
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YWNtZS9hbGljZTpwdw=="));
        let creds = caller_credentials(&headers).unwrap();
        assert_eq!(creds.org(), "acme");
        assert_eq!(creds.user(), "alice");
        assert_eq!(creds.password(), "pw");
    }

    #[test]
    fn missing_or_malformed_header_is_none() {
        assert!(caller_credentials(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(caller_credentials(&headers).is_none());

        // base64("alice:pw"), no org prefix
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YWxpY2U6cHc="));
        assert!(caller_credentials(&headers).is_none());
    }
}
