//! geoipdb - Memory-mapped reader for GeoIP2 and GeoLite2 databases
//!
//! geoipdb opens MaxMind DB (`.mmdb`) files read-only, walks their binary
//! search tree for an IPv4 or IPv6 address and decodes the record stored for
//! the matching network into a typed struct: Country, City, ASN, ISP, Domain
//! or Connection-Type.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use geoipdb::{CityRecord, Database, DatabaseKind};
//!
//! let db = Database::options()
//!     .kind(DatabaseKind::City)
//!     .open("GeoLite2-City.mmdb")?;
//!
//! if let Some(city) = db.lookup_as::<CityRecord>("81.2.69.160".parse()?)? {
//!     println!("{:?} {:?}", city.country.iso_code, city.city.names.get("en"));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Key Features
//!
//! - **Zero-Copy Loading**: databases are memory mapped and decoded in place
//! - **Typed Records**: closed schemas for the six GeoIP2 record shapes
//! - **Lock-Free Lookups**: an open [`Database`] is immutable and `Send + Sync`
//! - **Latin-1 Mode**: optional transliteration of every string value
//! - **Lookup Context**: flattened header values for request enrichment
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │  Database File Format                │
//! ├──────────────────────────────────────┤
//! │  1. Search Tree (binary trie)        │
//! │  2. 16 zero bytes                    │
//! │  3. Data Section (typed values)      │
//! │  4. \xAB\xCD\xEFMaxMind.com          │
//! │  5. Metadata (a data-section map)    │
//! └──────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Caller-side LRU cache
pub mod cache;
/// Integer, float and Latin-1 byte codecs
pub mod codec;
/// Data section decoding
pub mod data_section;
/// Database handle and open options
pub mod database;
/// Error types
pub mod error;
/// Database file loading
pub mod file_reader;
pub mod geohash;
/// Header projections for request enrichment
pub mod lookup;
/// MMDB container format: metadata and search tree
pub mod mmdb;
/// Typed lookup records
pub mod records;

// Re-exports for Rust consumers

pub use crate::cache::{CacheStats, CachedDatabase};
pub use crate::codec::TextMode;
pub use crate::data_section::{DataType, DataValue};
pub use crate::database::{Database, LookupResult, OpenOptions};
pub use crate::error::{DecodeError, LookupError, OpenError};
pub use crate::file_reader::LoadMode;
pub use crate::lookup::{AsnInfo, CityInfo, ClientIpSource, CountryInfo, GeoInfo, GeoLookup, LookupConfig};
pub use crate::mmdb::{IpVersion, Metadata, RecordSize};
pub use crate::records::{
    Asn, City, CityRecord, ConnectionType, Continent, Country, CountryRecord, DatabaseKind, Domain, GeoRecord,
    Isp, Location, Names, Postal, Record, Subdivision, Traits,
};

/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
