use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{Directory, OwnedBytes};

/// In-memory directory, used by unit tests and spill-free deployments.
#[derive(Debug, Default)]
pub struct RamDirectory {
    files: RwLock<HashMap<PathBuf, OwnedBytes>>,
}

impl Directory for RamDirectory {
    fn open_read(&self, path: &Path) -> io::Result<OwnedBytes> {
        self.files
            .read()
            .expect("poisoned lock")
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file does not exist: {path:?}"),
                )
            })
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.files
            .write()
            .expect("poisoned lock")
            .insert(path.to_path_buf(), OwnedBytes::new(data.to_vec()));
        Ok(())
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        self.files.write().expect("poisoned lock").remove(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().expect("poisoned lock").contains_key(path)
    }
}
