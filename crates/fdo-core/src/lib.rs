#![deny(missing_docs)]

//! # fdo-core: Domain Types for the FDO Gateway
//!
//! The gateway sits between operators holding exchange credentials and an
//! FDO Owner Service that has no notion of organizations. Everything in this
//! crate is pure: no I/O, no clock, no environment access. The network and
//! filesystem layers live in `fdo-owner-client` and `fdo-store`.
//!
//! ## Contents
//!
//! - [`identity`]: [`OrgId`] and [`DeviceId`] newtypes, validated at
//!   construction so a device id can never be used as a path fragment.
//! - [`credentials`]: caller Basic credentials of the form `org/user:password`.
//! - [`routing`]: the ordered [`RouteTable`] mapping (method, path) to an
//!   [`Operation`].
//! - [`tenancy`]: the organization precedence rules in [`resolve_org`].
//! - [`onboarding`]: artifacts produced when a voucher is imported (node
//!   token, exec directive, service-info instructions, key aliases).

pub mod credentials;
pub mod error;
pub mod identity;
pub mod onboarding;
pub mod routing;
pub mod tenancy;

pub use credentials::Credentials;
pub use error::{CredentialError, RouteError, TenancyError, ValidationError};
pub use identity::{DeviceId, OrgId, ResourceName};
pub use onboarding::{
    ExecDirective, NodeToken, PublicKeyAlias, ServiceInfoInstructions, ServiceInfoStep,
};
pub use routing::{Capture, Method, Operation, RouteDescriptor, RouteMatch, RouteTable};
pub use tenancy::{resolve_org, ROOT_ORG};
