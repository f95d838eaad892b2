use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{Directory, OwnedBytes};

/// Directory rooted at a filesystem path.
///
/// `atomic_write` stages the payload in a sibling temp file and renames it
/// into place, so concurrent readers never observe a half-written chunk.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
}

impl FsDirectory {
    /// Creates a directory rooted at `root`. The path itself is created
    /// lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> FsDirectory {
        FsDirectory { root: root.into() }
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl Directory for FsDirectory {
    fn open_read(&self, path: &Path) -> io::Result<OwnedBytes> {
        let data = fs::read(self.full_path(path))?;
        Ok(OwnedBytes::new(data))
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let full_path = self.full_path(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = full_path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &full_path)
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(self.full_path(path)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.full_path(path).exists()
    }
}
