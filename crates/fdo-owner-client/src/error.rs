//! Client error types.

use crate::digest::DigestError;

/// Errors talking to the Owner Service.
///
/// A non-2xx response is not an error at this layer; it is returned as an
/// [`OwnerResponse`](crate::OwnerResponse) for the caller to relay.
#[derive(Debug, thiserror::Error)]
pub enum OwnerError {
    /// HTTP transport error (connect, timeout, body read).
    #[error("HTTP error calling Owner Service {endpoint}: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The Owner Service's digest challenge could not be answered.
    #[error("digest authentication for {endpoint} failed: {source}")]
    Digest {
        endpoint: String,
        source: DigestError,
    },
    /// Endpoint could not be joined onto the base URL.
    #[error("invalid Owner Service URL for {endpoint}")]
    Url { endpoint: String },
    /// HTTP client construction failed.
    #[error("failed to build Owner Service client: {0}")]
    Client(reqwest::Error),
}

/// Errors talking to the exchange.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// HTTP transport error.
    #[error("HTTP error calling exchange {endpoint}: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The exchange answered with a status that is neither acceptance nor
    /// rejection.
    #[error("exchange {endpoint} returned unexpected status {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },
    /// The configured CA certificate is not valid PEM.
    #[error("invalid exchange CA certificate: {0}")]
    Certificate(reqwest::Error),
    /// HTTP client construction failed.
    #[error("failed to build exchange client: {0}")]
    Client(reqwest::Error),
    /// Endpoint could not be joined onto the base URL.
    #[error("invalid exchange URL for {endpoint}")]
    Url { endpoint: String },
}
