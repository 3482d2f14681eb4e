//! # Error Types
//!
//! Structured errors for the pure domain layer, built with `thiserror`.
//! The gateway maps each of these onto an HTTP status; nothing here knows
//! about HTTP.

use thiserror::Error;

/// A domain primitive failed format validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Organization identifier is empty or contains a forbidden character.
    #[error("invalid organization id: \"{0}\"")]
    InvalidOrgId(String),

    /// Device identifier is not a UUID.
    #[error("invalid device id: \"{0}\" (expected a UUID)")]
    InvalidDeviceId(String),

    /// Resource name is empty or contains a path separator.
    #[error("invalid resource name: \"{0}\"")]
    InvalidResourceName(String),

    /// Public key alias is not one the Owner Service supports.
    #[error("unsupported public key alias: \"{0}\"")]
    UnsupportedKeyAlias(String),
}

/// Errors while building a route table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Pattern does not start with `/`.
    #[error("route pattern must be absolute: \"{0}\"")]
    NotAbsolute(String),

    /// A `{name}` capture does not name a known capture.
    #[error("unknown capture \"{capture}\" in route pattern \"{pattern}\"")]
    UnknownCapture {
        /// Pattern being parsed.
        pattern: String,
        /// Offending capture name.
        capture: String,
    },

    /// The same capture appears twice in one pattern.
    #[error("duplicate capture \"{capture}\" in route pattern \"{pattern}\"")]
    DuplicateCapture {
        /// Pattern being parsed.
        pattern: String,
        /// Offending capture name.
        capture: String,
    },

    /// Empty segment (`//`) or trailing slash in a pattern.
    #[error("empty segment in route pattern \"{0}\"")]
    EmptySegment(String),
}

/// Reasons the tenancy resolver refuses to pick an organization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenancyError {
    /// No organization in the path and no usable caller credentials.
    #[error("invalid exchange credentials provided")]
    MissingCredentials,

    /// Root credentials without an explicit organization.
    #[error(
        "if using the exchange root user, you must explicitly specify the org id via the ?orgid=<org-id> URL query parameter"
    )]
    Ambiguous,

    /// The organization that won precedence is not a valid id.
    #[error(transparent)]
    InvalidOrg(#[from] ValidationError),
}

/// Caller credentials could not be parsed from the Authorization header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Header is not `Basic <base64>`.
    #[error("authorization header is not Basic")]
    NotBasic,

    /// Payload is not valid base64 or not UTF-8.
    #[error("authorization header is not valid base64 text")]
    Encoding,

    /// Payload has no `:` separating user from password.
    #[error("credentials are missing the password separator")]
    MissingPassword,

    /// User part is not exactly `org/user`.
    #[error("credentials user must have the form org/user")]
    MalformedUser,
}
