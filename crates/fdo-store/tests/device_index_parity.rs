//! Device index backend parity tests.
//!
//! Every backend runs the same contract: round-trip of voucher bytes,
//! tenant filtering on list, org checks, no overwrite, and atomic creation
//! under contention.

use std::sync::Arc;
use std::thread;

use fdo_core::{DeviceId, ExecDirective, NodeToken, OrgId};
use fdo_store::{DeviceIndex, DeviceRecord, FsDeviceIndex, MemoryDeviceIndex, StoreError};
use uuid::Uuid;

fn record(org: &str, voucher: &[u8]) -> DeviceRecord {
    let device = DeviceId::from_uuid(Uuid::new_v4());
    let org = OrgId::new(org).unwrap();
    let node_token = NodeToken::generate();
    let exec_directive =
        ExecDirective::agent_install("https://pkgs", &device, &node_token, &org, "css:");
    DeviceRecord {
        device,
        org,
        voucher: voucher.to_vec(),
        node_token,
        exec_directive,
    }
}

fn org(s: &str) -> OrgId {
    OrgId::new(s).unwrap()
}

fn check_round_trip(index: &dyn DeviceIndex) {
    let voucher: Vec<u8> = (0..=255u8).chain(b"\n-----END-----\n".iter().copied()).collect();
    let rec = record("acme", &voucher);
    index.create_device(&rec).unwrap();

    assert_eq!(index.read_voucher(&rec.device).unwrap(), voucher, "{}", index.backend_name());
    assert_eq!(index.read_organization(&rec.device).unwrap(), Some(org("acme")));
    assert_eq!(index.read_record(&rec.device).unwrap(), rec);
}

fn check_tenant_isolation(index: &dyn DeviceIndex) {
    let a = record("tenant-a", b"a");
    let b = record("tenant-b", b"b");
    index.create_device(&a).unwrap();
    index.create_device(&b).unwrap();

    let listed_a = index.list_devices(&org("tenant-a")).unwrap();
    assert!(listed_a.contains(&a.device));
    assert!(!listed_a.contains(&b.device), "{}", index.backend_name());
    assert!(index.list_devices(&org("tenant-c")).unwrap().is_empty());

    index.authorize_device(&a.device, &org("tenant-a")).unwrap();
    assert!(matches!(
        index.authorize_device(&a.device, &org("tenant-b")),
        Err(StoreError::Forbidden { .. })
    ));
    let unknown = DeviceId::from_uuid(Uuid::new_v4());
    assert!(matches!(
        index.authorize_device(&unknown, &org("tenant-a")),
        Err(StoreError::DeviceNotFound { .. })
    ));
}

fn check_no_reassignment(index: &dyn DeviceIndex) {
    let rec = record("owner", b"v1");
    index.create_device(&rec).unwrap();
    let mut hijack = rec.clone();
    hijack.org = org("intruder");
    assert!(matches!(
        index.create_device(&hijack),
        Err(StoreError::AlreadyExists { .. })
    ));
    assert_eq!(index.read_organization(&rec.device).unwrap(), Some(org("owner")));
}

fn check_missing(index: &dyn DeviceIndex) {
    let device = DeviceId::from_uuid(Uuid::new_v4());
    assert!(matches!(index.read_voucher(&device), Err(StoreError::DeviceNotFound { .. })));
    assert_eq!(index.read_organization(&device).unwrap(), None);
}

fn check_concurrent_create(index: Arc<dyn DeviceIndex>) {
    let rec = record("race", b"once");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let index = Arc::clone(&index);
            let rec = rec.clone();
            thread::spawn(move || index.create_device(&rec).is_ok())
        })
        .collect();
    let created = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(created, 1, "{}", index.backend_name());
    assert_eq!(index.read_voucher(&rec.device).unwrap(), b"once");
}

fn run_contract(index: Arc<dyn DeviceIndex>) {
    check_round_trip(index.as_ref());
    check_tenant_isolation(index.as_ref());
    check_no_reassignment(index.as_ref());
    check_missing(index.as_ref());
    check_concurrent_create(index);
}

#[test]
fn memory_backend_contract() {
    run_contract(MemoryDeviceIndex::new_shared());
}

#[test]
fn filesystem_backend_contract() {
    let dir = tempfile::tempdir().unwrap();
    run_contract(Arc::new(FsDeviceIndex::open(dir.path()).unwrap()));
}

#[test]
fn concurrent_readers_never_see_partial_records() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(FsDeviceIndex::open(dir.path()).unwrap());
    let records: Vec<_> = (0..20).map(|i| record("acme", format!("voucher-{i}").as_bytes())).collect();

    let writer = {
        let index = Arc::clone(&index);
        let records = records.clone();
        thread::spawn(move || {
            for rec in &records {
                index.create_device(rec).unwrap();
            }
        })
    };

    let reader = {
        let index = Arc::clone(&index);
        let records = records.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                for rec in &records {
                    // Once the voucher is visible the org tag must be too.
                    if index.read_voucher(&rec.device).is_ok() {
                        assert_eq!(index.read_organization(&rec.device).unwrap(), Some(rec.org.clone()));
                    }
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(index.list_devices(&org("acme")).unwrap().len(), records.len());
}
