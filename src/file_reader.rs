//! Database buffer loading
//!
//! A database is loaded once at open time into a [`Storage`], either by
//! memory mapping the file or by reading it into an owned buffer. Files ending
//! in `.gz` (case-insensitive) are decompressed into an owned buffer since a
//! compressed file cannot be mapped.
//!
//! # Safety
//!
//! Memory-mapped files are inherently unsafe: another process may truncate or
//! rewrite the file while it is mapped. The decoder never trusts any offset in
//! the buffer, but a file that changes under the map can still fault. Use
//! [`LoadMode::Read`] when database files are replaced in place.

use crate::error::OpenError;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::ops::Deref;
use std::path::Path;

/// How a database file is brought into memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadMode {
    /// Map the file read-only (zero copy, pages shared between processes)
    #[default]
    Mmap,
    /// Read the whole file into an owned buffer with one synchronous read
    Read,
}

/// Storage for database data - either owned or memory-mapped
#[derive(Debug)]
pub enum Storage {
    /// Heap buffer (plain read, decompressed or caller supplied)
    Owned(Vec<u8>),
    /// Read-only memory map
    Mmap(Mmap),
}

impl Storage {
    /// The database bytes
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v.as_slice(),
            Storage::Mmap(m) => &m[..],
        }
    }

    /// Whether the bytes are memory mapped
    pub fn is_mmap(&self) -> bool {
        matches!(self, Storage::Mmap(_))
    }
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Whether `path` names a gzip-compressed file
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Load a database file
///
/// `.gz` files are always decompressed into an owned buffer regardless of
/// `mode`.
pub fn load(path: &Path, mode: LoadMode) -> Result<Storage, OpenError> {
    let io_err = |source: io::Error| OpenError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;

    if is_gzip(path) {
        let mut buf = Vec::new();
        GzDecoder::new(file).read_to_end(&mut buf).map_err(io_err)?;
        return Ok(Storage::Owned(buf));
    }

    match mode {
        LoadMode::Mmap => {
            // SAFETY: the map is read-only and every read through it is bounds
            // checked against its length
            let mmap = unsafe { Mmap::map(&file) }.map_err(io_err)?;
            Ok(Storage::Mmap(mmap))
        }
        LoadMode::Read => {
            let mut file = file;
            let mut buf = Vec::with_capacity(file.metadata().map(|m| m.len() as usize).unwrap_or(0));
            file.read_to_end(&mut buf).map_err(io_err)?;
            Ok(Storage::Owned(buf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(Path::new("GeoLite2-City.mmdb.gz")));
        assert!(is_gzip(Path::new("db.GZ")));
        assert!(!is_gzip(Path::new("GeoLite2-City.mmdb")));
        assert!(!is_gzip(Path::new("gz")));
    }

    #[test]
    fn test_load_plain_both_modes() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"plain database bytes").unwrap();
        temp.flush().unwrap();

        let mapped = load(temp.path(), LoadMode::Mmap).unwrap();
        assert!(mapped.is_mmap());
        assert_eq!(&*mapped, b"plain database bytes");

        let read = load(temp.path(), LoadMode::Read).unwrap();
        assert!(!read.is_mmap());
        assert_eq!(read.as_slice(), b"plain database bytes");
    }

    #[test]
    fn test_load_gzip() {
        let mut temp = tempfile::Builder::new().suffix(".mmdb.gz").tempfile().unwrap();
        {
            let mut encoder = GzEncoder::new(&mut temp, Compression::default());
            encoder.write_all(b"compressed database bytes").unwrap();
            encoder.finish().unwrap();
        }
        temp.flush().unwrap();

        let storage = load(temp.path(), LoadMode::Mmap).unwrap();
        assert!(!storage.is_mmap());
        assert_eq!(&*storage, b"compressed database bytes");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/GeoLite2-City.mmdb"), LoadMode::Read).unwrap_err();
        match err {
            OpenError::Io { path, source } => {
                assert_eq!(path, Path::new("/nonexistent/GeoLite2-City.mmdb"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected Io error, got {:?}", other),
        }
    }
}
