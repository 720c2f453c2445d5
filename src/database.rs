//! Database handle
//!
//! A [`Database`] owns the file bytes, the parsed metadata and the few values
//! precomputed at open time. It is immutable afterwards, so it is `Send` and
//! `Sync` and any number of threads may look up addresses through a shared
//! reference without locking.
//!
//! # Examples
//!
//! ```no_run
//! use geoipdb::{Database, DatabaseKind, TextMode};
//!
//! let db = Database::options()
//!     .kind(DatabaseKind::City)
//!     .text_mode(TextMode::PassThrough)
//!     .open("GeoLite2-City.mmdb")?;
//!
//! if let Some(city) = db.lookup_as::<geoipdb::CityRecord>("81.2.69.160".parse()?)? {
//!     println!("{:?}", city.city.names.get("en"));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::codec::TextMode;
use crate::data_section::{DataDecoder, DataValue};
use crate::error::{LookupError, OpenError};
use crate::file_reader::{self, LoadMode, Storage};
use crate::mmdb::{metadata_value, parse_metadata, Metadata, SearchTree};
use crate::records::{read_record, DatabaseKind, GeoRecord, Record};
use log::debug;
use serde::Serialize;
use std::net::IpAddr;
use std::path::Path;

/// A record together with the network it was found in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    /// The decoded record
    pub record: Record,
    /// Prefix length of the matching network, in bits of the looked-up address
    pub prefix_len: u8,
}

/// Options for opening a [`Database`]
///
/// ```no_run
/// use geoipdb::{Database, DatabaseKind, LoadMode, TextMode};
///
/// let db = Database::options()
///     .kind(DatabaseKind::Isp)
///     .text_mode(TextMode::TransliterateToLatin1)
///     .load(LoadMode::Read)
///     .open("GeoIP2-ISP.mmdb")?;
/// # Ok::<(), geoipdb::OpenError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    kind: Option<DatabaseKind>,
    text_mode: TextMode,
    load: LoadMode,
}

impl OpenOptions {
    /// Default options: kind inferred from the metadata, pass-through text,
    /// memory mapped
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the database to hold records of `kind`
    ///
    /// Opening fails with [`OpenError::UnsupportedDatabaseType`] when the
    /// metadata declares another type.
    pub fn kind(mut self, kind: DatabaseKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// How string values are decoded
    pub fn text_mode(mut self, text_mode: TextMode) -> Self {
        self.text_mode = text_mode;
        self
    }

    /// How the file is loaded
    pub fn load(mut self, load: LoadMode) -> Self {
        self.load = load;
        self
    }

    /// Open a database file
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Database, OpenError> {
        let path = path.as_ref();
        let storage = file_reader::load(path, self.load)?;
        debug!("loaded {} ({} bytes, mmap: {})", path.display(), storage.len(), storage.is_mmap());
        Database::from_storage(storage, self)
    }

    /// Open a database from bytes already in memory
    pub fn from_bytes(&self, data: Vec<u8>) -> Result<Database, OpenError> {
        Database::from_storage(Storage::Owned(data), self)
    }
}

/// An open, read-only database
#[derive(Debug)]
pub struct Database {
    storage: Storage,
    metadata: Metadata,
    kind: Option<DatabaseKind>,
    text_mode: TextMode,
    /// Record at which IPv4 lookups start, located at open time
    ipv4_start: u32,
    /// Offset of the metadata marker, which ends the data section
    data_end: usize,
}

impl Database {
    /// Options builder for opening a database
    pub fn options() -> OpenOptions {
        OpenOptions::new()
    }

    /// Open a database file with default options
    ///
    /// The record kind is inferred from the metadata's `database_type`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenError> {
        OpenOptions::new().open(path)
    }

    /// Open a database from raw bytes with default options
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, OpenError> {
        OpenOptions::new().from_bytes(data)
    }

    fn from_storage(storage: Storage, options: &OpenOptions) -> Result<Self, OpenError> {
        let data = storage.as_slice();
        let (metadata, data_end) = parse_metadata(data)?;

        let kind = match options.kind {
            Some(expected) if !expected.accepts(&metadata.database_type) => {
                return Err(OpenError::UnsupportedDatabaseType {
                    expected,
                    actual: metadata.database_type,
                });
            }
            Some(expected) => Some(expected),
            None => DatabaseKind::from_database_type(&metadata.database_type),
        };

        let start = metadata.data_section_start();
        if start > data_end {
            return Err(OpenError::InvalidDataSection {
                start,
                end: data_end,
            });
        }

        let ipv4_start = SearchTree::new(data, &metadata)
            .map_err(OpenError::InvalidSearchTree)?
            .ipv4_start();

        debug!(
            "opened {} database: ip_version={}, record_size={}, node_count={}, kind={}",
            metadata.database_type,
            metadata.ip_version,
            metadata.record_size,
            metadata.node_count,
            kind.map(|k| k.as_str()).unwrap_or("generic"),
        );

        Ok(Self {
            storage,
            metadata,
            kind,
            text_mode: options.text_mode,
            ipv4_start,
            data_end,
        })
    }

    /// Parsed metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Full metadata map as a generic value, including vendor keys
    pub fn metadata_value(&self) -> Result<DataValue, OpenError> {
        metadata_value(self.storage.as_slice())
    }

    /// Record kind, `None` when the database type is not one of the known kinds
    pub fn kind(&self) -> Option<DatabaseKind> {
        self.kind
    }

    /// Text mode applied to string values
    pub fn text_mode(&self) -> TextMode {
        self.text_mode
    }

    /// Whether the file is memory mapped
    pub fn is_mmap(&self) -> bool {
        self.storage.is_mmap()
    }

    fn tree(&self) -> Result<SearchTree<'_>, LookupError> {
        SearchTree::with_ipv4_start(self.storage.as_slice(), &self.metadata, self.ipv4_start)
    }

    fn decoder(&self) -> DataDecoder<'_> {
        let section = &self.storage[self.metadata.data_section_start()..self.data_end];
        DataDecoder::new(section, self.text_mode)
    }

    /// Look up an address and return its record with the matched prefix length
    ///
    /// Returns `Ok(None)` when the address is not in the database. A decode
    /// failure only fails this lookup; the database stays usable.
    pub fn lookup_entry(&self, ip: IpAddr) -> Result<Option<LookupResult>, LookupError> {
        let found = match self.tree()?.lookup(ip)? {
            Some(found) => found,
            None => return Ok(None),
        };
        let record = Record::decode(self.kind, &self.decoder(), found.data_offset)?;
        Ok(Some(LookupResult {
            record,
            prefix_len: found.prefix_len,
        }))
    }

    /// Look up an address
    pub fn lookup(&self, ip: IpAddr) -> Result<Option<Record>, LookupError> {
        Ok(self.lookup_entry(ip)?.map(|entry| entry.record))
    }

    /// Look up an address and decode it as a specific record type
    ///
    /// Fails with [`LookupError::KindMismatch`] if the database holds another
    /// kind of record.
    pub fn lookup_as<T: GeoRecord>(&self, ip: IpAddr) -> Result<Option<T>, LookupError> {
        if self.kind != Some(T::KIND) {
            return Err(LookupError::KindMismatch {
                requested: T::KIND,
                actual: self.metadata.database_type.clone(),
            });
        }
        let found = match self.tree()?.lookup(ip)? {
            Some(found) => found,
            None => return Ok(None),
        };
        let mut cursor = found.data_offset;
        Ok(Some(read_record(&self.decoder(), &mut cursor)?))
    }

    /// Prefix length of the network containing `ip`, without decoding its record
    pub fn lookup_prefix_len(&self, ip: IpAddr) -> Result<Option<u8>, LookupError> {
        Ok(self.tree()?.lookup(ip)?.map(|found| found.prefix_len))
    }

    /// Look up an address and decode its data without a schema
    pub fn lookup_value(&self, ip: IpAddr) -> Result<Option<DataValue>, LookupError> {
        let found = match self.tree()?.lookup(ip)? {
            Some(found) => found,
            None => return Ok(None),
        };
        Ok(Some(self.decoder().decode(found.data_offset)?))
    }
}
