//! # fdo-owner-client: Clients for the Gateway's Collaborators
//!
//! Two services sit behind the gateway:
//!
//! - **Owner Service** ([`OwnerClient`]): the FDO owner, reached with a
//!   single service credential over HTTP Digest authentication. It is not
//!   tenant aware; the gateway decides who may reach it.
//! - **Exchange** ([`ExchangeClient`]): the identity authority. Caller
//!   credentials are forwarded to it unchanged to decide whether the caller
//!   may act within an organization.
//!
//! Neither client retries request failures. The only retry loop is
//! [`ExchangeClient::verify_connection`], used once at startup.

pub mod config;
pub mod digest;
pub mod error;
pub mod exchange;
pub mod owner;
pub(crate) mod retry;

pub use config::{decode_pem_value, ConfigError, ExchangeConfig, OwnerServiceConfig};
pub use error::{ExchangeError, OwnerError};
pub use exchange::ExchangeClient;
pub use owner::{OwnerClient, OwnerResponse};
