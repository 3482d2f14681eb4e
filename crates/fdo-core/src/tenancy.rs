//! # Tenancy Resolution
//!
//! Decides which organization a request acts on. Three signals may be
//! present: an `{org}` path segment, an `?orgid=` query parameter, and the
//! organization prefix of the caller's credentials. Precedence, first
//! satisfied wins:
//!
//! 1. path organization, verbatim;
//! 2. no usable credentials: [`TenancyError::MissingCredentials`];
//! 3. non-empty query organization;
//! 4. credential organization, unless it is [`ROOT_ORG`];
//! 5. otherwise [`TenancyError::Ambiguous`].
//!
//! The resolver only looks at what the request states. Whether the caller
//! may act on the chosen organization is the Auth Gate's question, and
//! whether a device belongs to it is the device index's.

use crate::error::TenancyError;
use crate::identity::OrgId;

/// The exchange organization whose users administer every tenant.
pub const ROOT_ORG: &str = "root";

/// Resolve the effective organization of a request.
///
/// `credential_org` is `None` when the caller presented no usable
/// credentials. Empty strings count as absent for the path and query
/// signals.
pub fn resolve_org(
    path_org: Option<&str>,
    credential_org: Option<&str>,
    query_org: Option<&str>,
) -> Result<OrgId, TenancyError> {
    if let Some(org) = path_org.filter(|o| !o.is_empty()) {
        return Ok(OrgId::new(org)?);
    }

    let credential_org = credential_org.ok_or(TenancyError::MissingCredentials)?;

    if let Some(org) = query_org.filter(|o| !o.is_empty()) {
        return Ok(OrgId::new(org)?);
    }

    if credential_org != ROOT_ORG {
        return Ok(OrgId::new(credential_org)?);
    }

    Err(TenancyError::Ambiguous)
}
