//! Device index error types.

use std::path::PathBuf;

use fdo_core::{DeviceId, OrgId};
use thiserror::Error;

/// Errors from device index and values directory operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the device.
    #[error("device not found: {device}")]
    DeviceNotFound { device: DeviceId },

    /// The device is recorded under a different organization.
    #[error("device {device} is not in org {org}")]
    Forbidden { device: DeviceId, org: OrgId },

    /// A record for the device already exists or is being written.
    #[error("device record already exists: {device}")]
    AlreadyExists { device: DeviceId },

    /// A record exists but cannot be read back as a whole.
    #[error("device record {device} is corrupt: {reason}")]
    Corrupt { device: DeviceId, reason: String },

    /// A values-directory file name is not a plain file name.
    #[error("invalid value name: {name}")]
    InvalidName { name: String },

    /// A values-directory file does not exist.
    #[error("value not found: {name}")]
    ValueNotFound { name: String },

    /// Underlying filesystem failure.
    #[error("I/O error during {op} on {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { op, path, source }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
