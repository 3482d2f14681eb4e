//! In-memory device index.
//!
//! Used by tests and anywhere durability is not required. `DashMap`'s entry
//! API gives create-if-absent atomicity without an extra lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fdo_core::{DeviceId, OrgId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{DeviceIndex, DeviceRecord};

/// Device index held in a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryDeviceIndex {
    records: DashMap<DeviceId, DeviceRecord>,
}

impl MemoryDeviceIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index wrapped in `Arc`.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DeviceIndex for MemoryDeviceIndex {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn create_device(&self, record: &DeviceRecord) -> StoreResult<()> {
        match self.records.entry(record.device) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                device: record.device,
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    fn read_voucher(&self, device: &DeviceId) -> StoreResult<Vec<u8>> {
        self.records
            .get(device)
            .map(|r| r.voucher.clone())
            .ok_or(StoreError::DeviceNotFound { device: *device })
    }

    fn read_organization(&self, device: &DeviceId) -> StoreResult<Option<OrgId>> {
        Ok(self.records.get(device).map(|r| r.org.clone()))
    }

    fn read_record(&self, device: &DeviceId) -> StoreResult<DeviceRecord> {
        self.records
            .get(device)
            .map(|r| r.value().clone())
            .ok_or(StoreError::DeviceNotFound { device: *device })
    }

    fn list_devices(&self, org: &OrgId) -> StoreResult<BTreeSet<DeviceId>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.org == *org)
            .map(|r| *r.key())
            .collect())
    }
}
