//! Error types for the geoipdb library
//!
//! Errors are split by the phase that produces them:
//! - [`DecodeError`]: a single value in the data section could not be decoded
//! - [`OpenError`]: the buffer is not a usable database (fatal at open time)
//! - [`LookupError`]: a single lookup failed; the database stays usable

use crate::data_section::DataType;
use crate::records::DatabaseKind;
use std::io;
use std::net::Ipv6Addr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while decoding values from the data section
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A computed offset or length would read past the end of the buffer
    #[error("offset {offset} + {len} bytes exceeds buffer of {buffer_len} bytes")]
    Offset {
        /// Start of the attempted read
        offset: usize,
        /// Number of bytes requested
        len: usize,
        /// Size of the buffer being decoded
        buffer_len: usize,
    },

    /// The control byte announced a different type than the reader expected
    #[error("expected {expected} but found {actual}")]
    UnexpectedType {
        /// Type the reader was asked for
        expected: DataType,
        /// Type found in the buffer
        actual: DataType,
    },

    /// A map key did not decode as a string
    #[error("map key must be a string, found {actual}")]
    MapKeyType {
        /// Type found where the key should be
        actual: DataType,
    },

    /// A record assembler met a key outside its schema
    #[error("unknown {record} key: {key}")]
    UnknownKey {
        /// Name of the record being assembled
        record: &'static str,
        /// The offending key (lossily converted to UTF-8)
        key: String,
    },

    /// The control byte carries a type tag with no defined meaning
    #[error("invalid data type tag {0}")]
    InvalidType(u16),

    /// The payload size is impossible for the announced type
    #[error("invalid size {size} for {data_type}")]
    InvalidSize {
        /// Type of the value
        data_type: DataType,
        /// Size found in the control byte
        size: usize,
    },

    /// String payload is not valid UTF-8
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 {
        /// Start of the string payload
        offset: usize,
    },

    /// Nesting exceeded the decoder's depth limit
    #[error("maximum nesting depth of {0} exceeded")]
    DepthLimit(usize),
}

impl DecodeError {
    pub(crate) fn unknown_key(record: &'static str, key: &[u8]) -> Self {
        DecodeError::UnknownKey {
            record,
            key: String::from_utf8_lossy(key).into_owned(),
        }
    }
}

/// Errors raised while opening a database
#[derive(Debug, Error)]
pub enum OpenError {
    /// Reading or mapping the file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The metadata marker is not present in the buffer
    #[error("metadata section not found")]
    MetadataNotFound,

    /// The metadata map is present but unusable
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The metadata map could not be decoded
    #[error("failed to decode metadata: {0}")]
    MetadataDecode(#[from] DecodeError),

    /// The database declares a type the caller did not ask for
    #[error("unsupported database type: expected {expected}, found {actual}")]
    UnsupportedDatabaseType {
        /// Kind requested at open time
        expected: DatabaseKind,
        /// `database_type` declared in the metadata
        actual: String,
    },

    /// The search tree could not be walked to the IPv4 subtree
    #[error("invalid search tree: {0}")]
    InvalidSearchTree(#[source] LookupError),

    /// The search tree runs past the metadata marker
    #[error("invalid data section: starts at {start}, metadata marker at {end}")]
    InvalidDataSection {
        /// Computed start of the data section
        start: usize,
        /// Offset of the metadata marker
        end: usize,
    },
}

/// Errors raised by a single lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The record could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The search tree points somewhere it should not
    #[error("the search tree is corrupt: {0}")]
    CorruptTree(String),

    /// An IPv6 address was looked up in an IPv4-only database
    #[error("cannot look up IPv6 address {0} in an IPv4-only database")]
    Ipv6InIpv4Database(Ipv6Addr),

    /// A typed lookup asked for a record kind the database does not hold
    #[error("database holds {actual} records, not {requested}")]
    KindMismatch {
        /// Record kind the caller asked for
        requested: DatabaseKind,
        /// Record kind of the open database
        actual: String,
    },
}

/// Result alias for decode operations
pub type Result<T> = std::result::Result<T, DecodeError>;
