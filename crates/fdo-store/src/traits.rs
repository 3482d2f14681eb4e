//! The device index contract.

use std::collections::BTreeSet;

use fdo_core::{DeviceId, ExecDirective, NodeToken, OrgId};

use crate::error::{StoreError, StoreResult};

/// Everything the gateway records about one onboarded device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device: DeviceId,
    pub org: OrgId,
    /// Voucher exactly as the caller uploaded it.
    pub voucher: Vec<u8>,
    pub node_token: NodeToken,
    pub exec_directive: ExecDirective,
}

/// Keyed store of device records.
///
/// Implementations must make [`create_device`](Self::create_device) appear
/// atomic: a concurrent reader either sees no record for the device or the
/// complete record. Records are never updated or reassigned to another
/// organization.
pub trait DeviceIndex: Send + Sync + 'static {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Create the record. Fails with [`StoreError::AlreadyExists`] if a
    /// record for the device exists or another create for it is in flight.
    fn create_device(&self, record: &DeviceRecord) -> StoreResult<()>;

    /// Stored voucher bytes.
    fn read_voucher(&self, device: &DeviceId) -> StoreResult<Vec<u8>>;

    /// Owning organization, `None` when the device has no record.
    fn read_organization(&self, device: &DeviceId) -> StoreResult<Option<OrgId>>;

    /// The full record.
    fn read_record(&self, device: &DeviceId) -> StoreResult<DeviceRecord>;

    /// Devices whose stored organization equals `org`.
    fn list_devices(&self, org: &OrgId) -> StoreResult<BTreeSet<DeviceId>>;

    /// Check that `device` exists and belongs to `org`.
    fn authorize_device(&self, device: &DeviceId, org: &OrgId) -> StoreResult<()> {
        match self.read_organization(device)? {
            None => Err(StoreError::DeviceNotFound { device: *device }),
            Some(owner) if owner == *org => Ok(()),
            Some(_) => Err(StoreError::Forbidden {
                device: *device,
                org: org.clone(),
            }),
        }
    }
}
