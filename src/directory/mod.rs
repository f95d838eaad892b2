//! Byte-oriented persistent file namespace.
//!
//! The index engine never touches `std::fs` directly: chunk files and spill
//! sidecars go through the [`Directory`] trait, so tests and spill-free
//! deployments can run entirely in memory.

mod fs_directory;
mod ram_directory;

use std::fmt;
use std::io;
use std::ops::{Deref, Range};
use std::path::Path;
use std::sync::Arc;

pub use self::fs_directory::FsDirectory;
pub use self::ram_directory::RamDirectory;

/// A cheaply cloneable, sliceable handle over an immutable byte buffer.
#[derive(Clone)]
pub struct OwnedBytes {
    data: Arc<[u8]>,
    range: Range<usize>,
}

impl OwnedBytes {
    /// Creates an `OwnedBytes` over the given buffer.
    pub fn new(data: Vec<u8>) -> OwnedBytes {
        let len = data.len();
        OwnedBytes {
            data: Arc::from(data),
            range: 0..len,
        }
    }

    /// Creates an empty `OwnedBytes`.
    pub fn empty() -> OwnedBytes {
        OwnedBytes::new(Vec::new())
    }

    /// A view over a subrange of the data. Does not copy.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> OwnedBytes {
        assert!(
            range.end <= self.len(),
            "slice range {:?} out of bounds (len={})",
            range,
            self.len()
        );
        OwnedBytes {
            data: self.data.clone(),
            range: self.range.start + range.start..self.range.start + range.end,
        }
    }

    /// Returns the underlying slice of data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.range.clone()]
    }

    /// Returns the length of the slice.
    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Returns true iff the slice is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl Deref for OwnedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for OwnedBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for OwnedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnedBytes({} bytes)", self.len())
    }
}

/// Write-once, read-many file namespace.
///
/// Files written through a `Directory` are immutable once `atomic_write`
/// returns: a reader either observes the complete file or no file at all.
pub trait Directory: fmt::Debug + Send + Sync + 'static {
    /// Reads the full content of the file at `path`.
    fn open_read(&self, path: &Path) -> io::Result<OwnedBytes>;

    /// Atomically replaces the content of the file at `path`.
    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Removes the file at `path`. Removing a missing file is not an error.
    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Returns true iff the file at `path` exists.
    fn exists(&self, path: &Path) -> bool;
}

impl<T: Directory + ?Sized> Directory for Arc<T> {
    fn open_read(&self, path: &Path) -> io::Result<OwnedBytes> {
        (**self).open_read(path)
    }

    fn atomic_write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        (**self).atomic_write(path, data)
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        (**self).delete(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::{Directory, FsDirectory, OwnedBytes, RamDirectory};

    #[test]
    fn test_owned_bytes_slicing() {
        let bytes = OwnedBytes::new(b"abcdefgh".to_vec());
        assert_eq!(bytes.len(), 8);
        let mid = bytes.slice(2..6);
        assert_eq!(mid.as_slice(), b"cdef");
        assert_eq!(mid.slice(1..3).as_slice(), b"de");
        assert!(OwnedBytes::empty().is_empty());
    }

    fn test_directory(directory: &dyn Directory) {
        let path = Path::new("seg/ft/chunk0.idx");
        assert!(!directory.exists(path));
        assert!(directory.open_read(path).is_err());
        directory.atomic_write(path, b"first").unwrap();
        assert_eq!(directory.open_read(path).unwrap().as_slice(), b"first");
        directory.atomic_write(path, b"second").unwrap();
        assert_eq!(directory.open_read(path).unwrap().as_slice(), b"second");
        directory.delete(path).unwrap();
        assert!(!directory.exists(path));
        // deleting twice is fine
        directory.delete(path).unwrap();
    }

    #[test]
    fn test_ram_directory() {
        test_directory(&RamDirectory::default());
    }

    #[test]
    fn test_fs_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        test_directory(&FsDirectory::new(tmp.path()));
    }

    #[test]
    fn test_directory_through_arc() {
        let directory: Arc<dyn Directory> = Arc::new(RamDirectory::default());
        directory
            .atomic_write(Path::new("a"), b"payload")
            .unwrap();
        assert!(directory.exists(Path::new("a")));
    }
}
