//! # Caller Credentials
//!
//! Exchange users authenticate with HTTP Basic auth where the user part is
//! qualified by its organization: `org/user:password`. The gateway never
//! checks the password itself; it forwards the credentials to the exchange
//! and only reads the organization prefix for tenancy resolution.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use zeroize::Zeroizing;

use crate::error::CredentialError;

/// Parsed caller credentials.
///
/// The password is wiped on drop and never printed by `Debug`.
#[derive(Clone)]
pub struct Credentials {
    org: String,
    user: String,
    password: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("org", &self.org)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from their parts.
    pub fn new(
        org: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let org = org.into();
        let user = user.into();
        if org.is_empty() || user.is_empty() || user.contains('/') {
            return Err(CredentialError::MalformedUser);
        }
        Ok(Self {
            org,
            user,
            password: Zeroizing::new(password.into()),
        })
    }

    /// Parse the value of an `Authorization` header.
    ///
    /// The scheme is matched case-insensitively. The decoded payload is split
    /// at the first `:`, so passwords may themselves contain colons.
    pub fn from_authorization(header: &str) -> Result<Self, CredentialError> {
        let (scheme, encoded) = header
            .trim()
            .split_once(' ')
            .ok_or(CredentialError::NotBasic)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(CredentialError::NotBasic);
        }

        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| CredentialError::Encoding)?,
        );
        let text = std::str::from_utf8(&decoded).map_err(|_| CredentialError::Encoding)?;
        let (qualified_user, password) =
            text.split_once(':').ok_or(CredentialError::MissingPassword)?;

        let mut parts = qualified_user.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(org), Some(user), None) => Self::new(org, user, password),
            _ => Err(CredentialError::MalformedUser),
        }
    }

    /// Organization prefix of the credential.
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Bare user name, without the organization.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The caller's password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// User name as the exchange expects it: `org/user`.
    pub fn qualified_user(&self) -> String {
        format!("{}/{}", self.org, self.user)
    }
}
