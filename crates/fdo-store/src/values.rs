//! Shared resource files (`<root>/values/`).
//!
//! Holds the files every device receives: the agent-install config, the
//! management hub certificate and the wrapper script, each alongside a
//! `<name>_name` companion carrying the file name.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fdo_core::ResourceName;

use crate::error::{StoreError, StoreResult};

/// Subdirectory holding shared resource files.
pub const VALUES_DIR: &str = "values";

/// Handle on the values directory.
#[derive(Debug, Clone)]
pub struct ValuesDir {
    dir: PathBuf,
}

impl ValuesDir {
    /// Open (and create if needed) `<root>/values`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = root.as_ref().join(VALUES_DIR);
        fs::create_dir_all(&dir).map_err(StoreError::io("create values directory", &dir))?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> StoreResult<PathBuf> {
        let name = ResourceName::new(name).map_err(|_| StoreError::InvalidName {
            name: name.to_string(),
        })?;
        Ok(self.dir.join(name.as_str()))
    }

    /// Write `name`, replacing any previous content.
    pub fn write(&self, name: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.path(name)?;
        fs::write(&path, bytes).map_err(StoreError::io("write value", path))
    }

    /// Read `name`.
    pub fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        let path = self.path(name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::ValueNotFound {
                name: name.to_string(),
            },
            _ => StoreError::io("read value", path)(e),
        })
    }

    /// Whether `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.path(name).map(|p| p.is_file()).unwrap_or(false)
    }
}
