//! Flat-file device index.
//!
//! ```text
//! <root>/devices/<device-id>/ownership_voucher.txt
//!                           /orgid.txt
//!                           /node_token.txt
//!                           /exec_directive.txt
//! ```
//!
//! A record is written into a hidden staging directory next to its final
//! location and published with a single `rename`, so readers never see a
//! voucher without its organization tag. The `devices/` directory is synced
//! after the rename so a published record survives a crash.
//!
//! A database root belongs to one gateway process. The duplicate check and
//! the in-flight claims are per process; `rename` replaces an empty
//! directory, so a second process writing the same root could publish over
//! a record the first has only just created.

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fdo_core::{DeviceId, ExecDirective, NodeToken, OrgId};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::{DeviceIndex, DeviceRecord};

/// Subdirectory holding one directory per device.
pub const DEVICES_DIR: &str = "devices";

const VOUCHER_FILE: &str = "ownership_voucher.txt";
const ORG_FILE: &str = "orgid.txt";
const TOKEN_FILE: &str = "node_token.txt";
const EXEC_FILE: &str = "exec_directive.txt";
const STAGING_PREFIX: &str = ".staging-";

/// Device index backed by a directory tree. One process per root.
#[derive(Debug)]
pub struct FsDeviceIndex {
    devices: PathBuf,
    in_flight: Mutex<HashSet<DeviceId>>,
}

impl FsDeviceIndex {
    /// Open (and create if needed) the index under `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let devices = root.as_ref().join(DEVICES_DIR);
        fs::create_dir_all(&devices).map_err(StoreError::io("create devices directory", &devices))?;
        Ok(Self {
            devices,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Directory that holds the device records.
    pub fn devices_dir(&self) -> &Path {
        &self.devices
    }

    fn sync_devices_dir(&self) -> StoreResult<()> {
        File::open(&self.devices)
            .and_then(|dir| dir.sync_all())
            .map_err(StoreError::io("sync devices directory", &self.devices))
    }

    fn device_dir(&self, device: &DeviceId) -> PathBuf {
        self.devices.join(device.to_string())
    }

    fn claim(&self, device: &DeviceId) -> StoreResult<InFlight<'_>> {
        if !self.in_flight.lock().insert(*device) {
            return Err(StoreError::AlreadyExists { device: *device });
        }
        Ok(InFlight {
            set: &self.in_flight,
            device: *device,
        })
    }

    fn read_text(&self, device: &DeviceId, file: &'static str) -> StoreResult<Option<String>> {
        let path = self.device_dir(device).join(file);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io("read device file", path)(e)),
        }
    }
}

/// Marks a device id as being created until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<DeviceId>>,
    device: DeviceId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.device);
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = File::create(path).map_err(StoreError::io("create device file", path))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(StoreError::io("write device file", path))
}

fn write_record(dir: &Path, record: &DeviceRecord) -> StoreResult<()> {
    write_synced(&dir.join(VOUCHER_FILE), &record.voucher)?;
    write_synced(&dir.join(ORG_FILE), format!("{}\n", record.org).as_bytes())?;
    write_synced(&dir.join(TOKEN_FILE), record.node_token.as_str().as_bytes())?;
    write_synced(&dir.join(EXEC_FILE), record.exec_directive.as_str().as_bytes())
}

impl DeviceIndex for FsDeviceIndex {
    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    fn create_device(&self, record: &DeviceRecord) -> StoreResult<()> {
        let device = record.device;
        let _claim = self.claim(&device)?;

        let target = self.device_dir(&device);
        if fs::symlink_metadata(&target).is_ok() {
            return Err(StoreError::AlreadyExists { device });
        }

        let staging = self
            .devices
            .join(format!("{STAGING_PREFIX}{device}-{}", Uuid::new_v4().simple()));
        fs::create_dir(&staging).map_err(StoreError::io("create staging directory", &staging))?;

        let published = write_record(&staging, record).and_then(|()| {
            fs::rename(&staging, &target).map_err(|e| {
                if target.exists() {
                    StoreError::AlreadyExists { device }
                } else {
                    StoreError::io("publish device record", &target)(e)
                }
            })
        });

        if published.is_err() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                tracing::warn!(path = %staging.display(), error = %e, "failed to remove staging directory");
            }
            return published;
        }
        self.sync_devices_dir()
    }

    fn read_voucher(&self, device: &DeviceId) -> StoreResult<Vec<u8>> {
        let path = self.device_dir(device).join(VOUCHER_FILE);
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::DeviceNotFound { device: *device },
            _ => StoreError::io("read voucher", path)(e),
        })
    }

    fn read_organization(&self, device: &DeviceId) -> StoreResult<Option<OrgId>> {
        let Some(text) = self.read_text(device, ORG_FILE)? else {
            return Ok(None);
        };
        let org = text.trim_end_matches(['\n', '\r']);
        if org.is_empty() {
            return Ok(None);
        }
        OrgId::new(org).map(Some).map_err(|e| StoreError::Corrupt {
            device: *device,
            reason: e.to_string(),
        })
    }

    fn read_record(&self, device: &DeviceId) -> StoreResult<DeviceRecord> {
        let voucher = self.read_voucher(device)?;
        let missing = |field: &str| StoreError::Corrupt {
            device: *device,
            reason: format!("missing {field}"),
        };
        let org = self.read_organization(device)?.ok_or_else(|| missing(ORG_FILE))?;
        let token = self.read_text(device, TOKEN_FILE)?.ok_or_else(|| missing(TOKEN_FILE))?;
        let exec = self.read_text(device, EXEC_FILE)?.ok_or_else(|| missing(EXEC_FILE))?;

        Ok(DeviceRecord {
            device: *device,
            org,
            voucher,
            node_token: NodeToken::from_stored(token),
            exec_directive: ExecDirective::from_stored(exec),
        })
    }

    fn list_devices(&self, org: &OrgId) -> StoreResult<BTreeSet<DeviceId>> {
        let entries =
            fs::read_dir(&self.devices).map_err(StoreError::io("list devices", &self.devices))?;

        let mut found = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::io("list devices", &self.devices))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            let Ok(device) = DeviceId::parse(name) else { continue };
            if device.to_string() != name {
                continue;
            }

            match self.read_organization(&device) {
                Ok(Some(owner)) if owner == *org => {
                    found.insert(device);
                }
                Ok(_) => {}
                Err(StoreError::Corrupt { reason, .. }) => {
                    tracing::warn!(device = %device, %reason, "skipping corrupt device record");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }
}
