//! # fdo-store: Device Index
//!
//! The Owner Service stores vouchers but knows nothing about exchange
//! organizations. This crate keeps the gateway's own record of which
//! organization each onboarded device belongs to, and is the only place
//! tenant isolation is checked for device-scoped reads.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  fdo-store                    │
//! ├──────────────────────────────────────────────┤
//! │  traits.rs  - DeviceIndex trait + record      │
//! │  fs.rs      - flat-file backend (production)  │
//! │  memory.rs  - DashMap backend                 │
//! │  values.rs  - shared resource files           │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! All operations are synchronous. Callers on an async runtime should run
//! them on a blocking thread.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;
pub mod values;

pub use error::{StoreError, StoreResult};
pub use fs::FsDeviceIndex;
pub use memory::MemoryDeviceIndex;
pub use traits::{DeviceIndex, DeviceRecord};
pub use values::ValuesDir;
