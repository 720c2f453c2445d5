//! Typed lookup records
//!
//! Each database type stores one fixed map shape per network. The
//! assemblers here walk that map with the typed readers of
//! [`DataDecoder`] and fill a struct by exact key match. The schemas are
//! closed: a key that is not part of the shape fails the lookup with
//! [`DecodeError::UnknownKey`].
//!
//! Databases whose `database_type` is not one of the known kinds can still
//! be opened; their records come back as [`Record::Generic`].

mod city;
mod common;
mod network;

pub use city::{CityRecord, CountryRecord};
pub use common::{City, Continent, Country, Location, Names, Postal, Subdivision, Traits};
pub use network::{Asn, ConnectionType, Domain, Isp};

use crate::data_section::{DataDecoder, DataValue};
use crate::error::{DecodeError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The six record shapes understood by the assemblers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DatabaseKind {
    /// Country-level geolocation
    Country,
    /// City-level geolocation
    City,
    /// Autonomous system number and organization
    Asn,
    /// ISP, organization and mobile network codes
    Isp,
    /// Second level domain
    Domain,
    /// Connection type (Cable/DSL, Cellular, ...)
    ConnectionType,
}

impl DatabaseKind {
    /// All kinds, in display order
    pub const ALL: [DatabaseKind; 6] = [
        DatabaseKind::Country,
        DatabaseKind::City,
        DatabaseKind::Asn,
        DatabaseKind::Isp,
        DatabaseKind::Domain,
        DatabaseKind::ConnectionType,
    ];

    /// `database_type` metadata values stored with this record shape
    pub fn database_types(self) -> &'static [&'static str] {
        match self {
            DatabaseKind::Country => &["GeoIP2-Country", "GeoLite2-Country", "DBIP-Country-Lite"],
            DatabaseKind::City => &[
                "GeoIP2-City",
                "GeoLite2-City",
                "GeoIP2-Enterprise",
                "DBIP-City-Lite",
            ],
            DatabaseKind::Asn => &["GeoLite2-ASN", "DBIP-ASN-Lite"],
            DatabaseKind::Isp => &["GeoIP2-ISP"],
            DatabaseKind::Domain => &["GeoIP2-Domain"],
            DatabaseKind::ConnectionType => &["GeoIP2-Connection-Type"],
        }
    }

    /// Whether a database of `database_type` holds records of this kind
    pub fn accepts(self, database_type: &str) -> bool {
        self.database_types().contains(&database_type)
    }

    /// Infer the kind from a `database_type` metadata value
    pub fn from_database_type(database_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.accepts(database_type))
    }

    /// Short lowercase name, as accepted by [`FromStr`]
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseKind::Country => "country",
            DatabaseKind::City => "city",
            DatabaseKind::Asn => "asn",
            DatabaseKind::Isp => "isp",
            DatabaseKind::Domain => "domain",
            DatabaseKind::ConnectionType => "connection-type",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown database kind '{}' (expected one of: {})",
                    s,
                    Self::ALL.map(DatabaseKind::as_str).join(", ")
                )
            })
    }
}

/// A decoded lookup result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    /// From a Country database
    Country(CountryRecord),
    /// From a City database
    City(CityRecord),
    /// From an ASN database
    Asn(Asn),
    /// From an ISP database
    Isp(Isp),
    /// From a Domain database
    Domain(Domain),
    /// From a Connection-Type database
    ConnectionType(ConnectionType),
    /// From a database of unknown type, decoded without a schema
    Generic(DataValue),
}

impl Record {
    /// Decode the record at `offset` with the assembler for `kind`
    ///
    /// With no kind the value is decoded generically.
    pub fn decode(kind: Option<DatabaseKind>, decoder: &DataDecoder<'_>, offset: usize) -> Result<Self> {
        let mut cursor = offset;
        let cursor = &mut cursor;
        Ok(match kind {
            Some(DatabaseKind::Country) => Record::Country(read_record(decoder, cursor)?),
            Some(DatabaseKind::City) => Record::City(read_record(decoder, cursor)?),
            Some(DatabaseKind::Asn) => Record::Asn(read_record(decoder, cursor)?),
            Some(DatabaseKind::Isp) => Record::Isp(read_record(decoder, cursor)?),
            Some(DatabaseKind::Domain) => Record::Domain(read_record(decoder, cursor)?),
            Some(DatabaseKind::ConnectionType) => {
                Record::ConnectionType(read_record(decoder, cursor)?)
            }
            None => Record::Generic(decoder.decode_value(cursor)?),
        })
    }

    /// Kind of the record, `None` for generic values
    pub fn kind(&self) -> Option<DatabaseKind> {
        match self {
            Record::Country(_) => Some(DatabaseKind::Country),
            Record::City(_) => Some(DatabaseKind::City),
            Record::Asn(_) => Some(DatabaseKind::Asn),
            Record::Isp(_) => Some(DatabaseKind::Isp),
            Record::Domain(_) => Some(DatabaseKind::Domain),
            Record::ConnectionType(_) => Some(DatabaseKind::ConnectionType),
            Record::Generic(_) => None,
        }
    }
}

/// A struct filled from a data-section map by exact key match
pub trait MapRecord: Default {
    /// Name used in unknown-key errors
    const NAME: &'static str;

    /// Consume the value for `key` from `cursor` into `self`
    ///
    /// Must fail with [`DecodeError::UnknownKey`] for keys outside the schema.
    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()>;
}

/// A top-level record stored in one of the known database kinds
pub trait GeoRecord: MapRecord {
    /// Database kind this record is read from
    const KIND: DatabaseKind;

    /// Unwrap from a [`Record`] of the same kind
    fn from_record(record: Record) -> Option<Self>;
}

/// Assemble a [`MapRecord`] from the map at `cursor`
pub fn read_record<T: MapRecord>(decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<T> {
    let mut record = T::default();
    decoder.read_map(cursor, |key, cursor| record.read_field(key, decoder, cursor))?;
    Ok(record)
}

pub(crate) fn unknown_key<T: MapRecord>(key: &[u8]) -> Result<()> {
    Err(DecodeError::unknown_key(T::NAME, key))
}

macro_rules! geo_record {
    ($ty:ty, $kind:ident) => {
        impl GeoRecord for $ty {
            const KIND: DatabaseKind = DatabaseKind::$kind;

            fn from_record(record: Record) -> Option<Self> {
                match record {
                    Record::$kind(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

geo_record!(CountryRecord, Country);
geo_record!(CityRecord, City);
geo_record!(Asn, Asn);
geo_record!(Isp, Isp);
geo_record!(Domain, Domain);
geo_record!(ConnectionType, ConnectionType);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_accepts() {
        assert!(DatabaseKind::City.accepts("GeoLite2-City"));
        assert!(DatabaseKind::City.accepts("GeoIP2-Enterprise"));
        assert!(!DatabaseKind::City.accepts("GeoLite2-Country"));
        assert!(DatabaseKind::Isp.accepts("GeoIP2-ISP"));
        assert!(!DatabaseKind::Isp.accepts("GeoIP2-isp"));
    }

    #[test]
    fn test_kind_from_database_type() {
        assert_eq!(
            DatabaseKind::from_database_type("DBIP-ASN-Lite"),
            Some(DatabaseKind::Asn)
        );
        assert_eq!(
            DatabaseKind::from_database_type("GeoIP2-Connection-Type"),
            Some(DatabaseKind::ConnectionType)
        );
        assert_eq!(DatabaseKind::from_database_type("MyCustomDB"), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("City".parse::<DatabaseKind>(), Ok(DatabaseKind::City));
        assert_eq!(
            "connection_type".parse::<DatabaseKind>(),
            Ok(DatabaseKind::ConnectionType)
        );
        let err = "region".parse::<DatabaseKind>().unwrap_err();
        assert!(err.contains("connection-type"));
    }
}
