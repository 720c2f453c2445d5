//! MaxMind DB (MMDB) file structure
//!
//! An MMDB file is laid out as:
//!
//! ```text
//! [search tree][16 zero bytes][data section][marker][metadata map]
//! ```
//!
//! - **types**: layout constants, record sizes and IP versions
//! - **format**: metadata marker search and metadata parsing
//! - **tree**: search tree traversal for IP lookups
//!
//! Values in the data section are decoded by `crate::data_section`.

pub mod format;
pub mod tree;
pub mod types;

pub use format::{find_metadata_marker, metadata_value, parse_metadata, Metadata};
pub use tree::{SearchTree, TreeMatch};
pub use types::{IpVersion, RecordSize, DATA_SECTION_SEPARATOR_SIZE, METADATA_MARKER};
