//! MMDB Metadata Parsing
//!
//! The metadata is an ordinary data-section map stored after the last
//! occurrence of [`METADATA_MARKER`] near the end of the file. Pointers inside
//! it are relative to the first byte after the marker.
//!
//! Only `node_count`, `record_size`, `ip_version` and `database_type` are
//! required; everything else is informational.

use super::types::{
    IpVersion, RecordSize, DATA_SECTION_SEPARATOR_SIZE, METADATA_MARKER, METADATA_SEARCH_WINDOW,
};
use crate::codec::TextMode;
use crate::data_section::{DataDecoder, DataValue};
use crate::error::OpenError;
use memchr::memmem;
use serde::Serialize;
use std::collections::BTreeMap;

/// Parsed database metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    /// Declared dataset type, e.g. `GeoIP2-City`
    pub database_type: String,
    /// Tree IP version
    pub ip_version: IpVersion,
    /// Bits per tree record
    pub record_size: RecordSize,
    /// Number of nodes in the search tree
    pub node_count: u32,
    /// Format major version (2 for every known database)
    pub binary_format_major_version: u16,
    /// Format minor version
    pub binary_format_minor_version: u16,
    /// Build time in seconds since the Unix epoch
    pub build_epoch: u64,
    /// Locales present in `names` maps
    pub languages: Vec<String>,
    /// Human-readable descriptions keyed by language
    pub description: BTreeMap<String, String>,
}

impl Metadata {
    /// Size of the search tree in bytes
    pub fn search_tree_size(&self) -> usize {
        self.node_count as usize * self.record_size.node_bytes()
    }

    /// Offset of the first data-section byte
    pub fn data_section_start(&self) -> usize {
        self.search_tree_size() + DATA_SECTION_SEPARATOR_SIZE
    }
}

/// Find the last metadata marker within the trailing search window
pub fn find_metadata_marker(data: &[u8]) -> Result<usize, OpenError> {
    let window_start = data.len().saturating_sub(METADATA_SEARCH_WINDOW);
    memmem::rfind(&data[window_start..], METADATA_MARKER)
        .map(|pos| window_start + pos)
        .ok_or(OpenError::MetadataNotFound)
}

/// Locate and parse the metadata of a database buffer
///
/// Returns the metadata and the offset of the marker, which is also the end
/// of the data section.
pub fn parse_metadata(data: &[u8]) -> Result<(Metadata, usize), OpenError> {
    let marker = find_metadata_marker(data)?;
    let metadata = decode_metadata(&data[marker + METADATA_MARKER.len()..])?;
    Ok((metadata, marker))
}

/// Decode the full metadata map as a generic value
pub fn metadata_value(data: &[u8]) -> Result<DataValue, OpenError> {
    let marker = find_metadata_marker(data)?;
    let decoder = DataDecoder::new(&data[marker + METADATA_MARKER.len()..], TextMode::PassThrough);
    Ok(decoder.decode(0)?)
}

#[derive(Default)]
struct RawMetadata {
    database_type: Option<String>,
    ip_version: Option<u64>,
    record_size: Option<u64>,
    node_count: Option<u64>,
    major: u64,
    minor: u64,
    build_epoch: u64,
    languages: Vec<String>,
    description: BTreeMap<String, String>,
}

fn decode_metadata(buf: &[u8]) -> Result<Metadata, OpenError> {
    let decoder = DataDecoder::new(buf, TextMode::PassThrough);
    let mut raw = RawMetadata::default();
    let mut cursor = 0;

    decoder.read_map(&mut cursor, |key, cursor| {
        match key {
            b"database_type" => raw.database_type = Some(decoder.read_string(cursor)?),
            b"languages" => raw.languages = decoder.read_string_slice(cursor)?,
            b"description" => raw.description = decoder.read_string_map(cursor)?,
            b"ip_version" => raw.ip_version = uint(decoder.decode_value(cursor)?),
            b"record_size" => raw.record_size = uint(decoder.decode_value(cursor)?),
            b"node_count" => raw.node_count = uint(decoder.decode_value(cursor)?),
            b"build_epoch" => raw.build_epoch = uint(decoder.decode_value(cursor)?).unwrap_or(0),
            b"binary_format_major_version" => {
                raw.major = uint(decoder.decode_value(cursor)?).unwrap_or(0)
            }
            b"binary_format_minor_version" => {
                raw.minor = uint(decoder.decode_value(cursor)?).unwrap_or(0)
            }
            _ => decoder.skip_value(cursor)?,
        }
        Ok(())
    })?;

    let database_type = raw.database_type.ok_or_else(|| missing("database_type"))?;
    let ip_version_num = raw.ip_version.ok_or_else(|| missing("ip_version"))?;
    let ip_version = IpVersion::from_number(ip_version_num).ok_or_else(|| {
        OpenError::InvalidMetadata(format!("invalid ip_version: {}", ip_version_num))
    })?;
    let record_bits = raw.record_size.ok_or_else(|| missing("record_size"))?;
    let record_size = RecordSize::from_bits(record_bits).ok_or_else(|| {
        OpenError::InvalidMetadata(format!("invalid record_size: {} bits", record_bits))
    })?;
    let node_count = raw.node_count.ok_or_else(|| missing("node_count"))?;
    let node_count = u32::try_from(node_count)
        .map_err(|_| OpenError::InvalidMetadata(format!("node_count {} too large", node_count)))?;

    Ok(Metadata {
        database_type,
        ip_version,
        record_size,
        node_count,
        binary_format_major_version: raw.major as u16,
        binary_format_minor_version: raw.minor as u16,
        build_epoch: raw.build_epoch,
        languages: raw.languages,
        description: raw.description,
    })
}

// Writers are free to pick any unsigned width for numeric metadata fields
fn uint(value: DataValue) -> Option<u64> {
    value.as_u64()
}

fn missing(field: &str) -> OpenError {
    OpenError::InvalidMetadata(format!("required field '{}' not found", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> Vec<u8> {
        let mut out = vec![0x40 | s.len() as u8];
        out.extend_from_slice(s.as_bytes());
        out
    }

    fn uint16(n: u16) -> Vec<u8> {
        let mut out = vec![0xA2];
        out.extend(n.to_be_bytes());
        out
    }

    fn uint32(n: u32) -> Vec<u8> {
        let mut out = vec![0xC4];
        out.extend(n.to_be_bytes());
        out
    }

    fn metadata_map(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut out = vec![0xE0 | entries.len() as u8];
        for (k, v) in entries {
            out.extend(string(k));
            out.extend(v);
        }
        out
    }

    fn with_marker(prefix: &[u8], metadata: &[u8]) -> Vec<u8> {
        let mut out = prefix.to_vec();
        out.extend_from_slice(METADATA_MARKER);
        out.extend_from_slice(metadata);
        out
    }

    #[test]
    fn test_parse_metadata() {
        let mut languages = vec![0x02, 0x04];
        languages.extend(string("en"));
        languages.extend(string("de"));
        let mut description = vec![0xE1];
        description.extend(string("en"));
        description.extend(string("Test DB"));
        let mut epoch = vec![0x08, 0x02];
        epoch.extend(1_700_000_000u64.to_be_bytes());

        let meta = metadata_map(&[
            ("node_count", uint32(1234)),
            ("record_size", uint16(28)),
            ("ip_version", uint16(6)),
            ("database_type", string("GeoIP2-City")),
            ("languages", languages),
            ("description", description),
            ("build_epoch", epoch),
            ("binary_format_major_version", uint16(2)),
            ("vendor_extension", string("ignored")),
        ]);
        let data = with_marker(&[0u8; 100], &meta);

        let (metadata, marker) = parse_metadata(&data).unwrap();
        assert_eq!(marker, 100);
        assert_eq!(metadata.database_type, "GeoIP2-City");
        assert_eq!(metadata.node_count, 1234);
        assert_eq!(metadata.record_size, RecordSize::Bits28);
        assert_eq!(metadata.ip_version, IpVersion::V6);
        assert_eq!(metadata.languages, vec!["en", "de"]);
        assert_eq!(metadata.description.get("en").map(String::as_str), Some("Test DB"));
        assert_eq!(metadata.build_epoch, 1_700_000_000);
        assert_eq!(metadata.binary_format_major_version, 2);
        assert_eq!(metadata.search_tree_size(), 1234 * 7);
        assert_eq!(metadata.data_section_start(), 1234 * 7 + 16);
    }

    #[test]
    fn test_last_marker_wins() {
        let first = metadata_map(&[("database_type", string("first"))]);
        let second = metadata_map(&[
            ("node_count", uint32(1)),
            ("record_size", uint16(24)),
            ("ip_version", uint16(4)),
            ("database_type", string("second")),
        ]);
        let mut data = with_marker(&[0u8; 8], &first);
        let second_at = data.len();
        data.extend(with_marker(&[], &second));

        let (metadata, marker) = parse_metadata(&data).unwrap();
        assert_eq!(marker, second_at);
        assert_eq!(metadata.database_type, "second");
    }

    #[test]
    fn test_metadata_not_found() {
        let data = b"not a valid mmdb file";
        assert!(matches!(
            find_metadata_marker(data),
            Err(OpenError::MetadataNotFound)
        ));
        assert!(matches!(find_metadata_marker(&[]), Err(OpenError::MetadataNotFound)));
        // A marker cut short by truncation is not a marker
        assert!(matches!(
            find_metadata_marker(&METADATA_MARKER[..10]),
            Err(OpenError::MetadataNotFound)
        ));
    }

    #[test]
    fn test_marker_outside_window_ignored() {
        let mut data = METADATA_MARKER.to_vec();
        data.extend(vec![0u8; METADATA_SEARCH_WINDOW]);
        assert!(matches!(
            find_metadata_marker(&data),
            Err(OpenError::MetadataNotFound)
        ));
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let meta = metadata_map(&[
            ("record_size", uint16(24)),
            ("ip_version", uint16(4)),
            ("database_type", string("x")),
        ]);
        let err = parse_metadata(&with_marker(&[], &meta)).unwrap_err();
        assert!(err.to_string().contains("node_count"));

        let meta = metadata_map(&[
            ("node_count", uint32(1)),
            ("record_size", uint16(20)),
            ("ip_version", uint16(4)),
            ("database_type", string("x")),
        ]);
        assert!(matches!(
            parse_metadata(&with_marker(&[], &meta)),
            Err(OpenError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_metadata_not_a_map() {
        let data = with_marker(&[], &string("nope"));
        assert!(matches!(
            parse_metadata(&data),
            Err(OpenError::MetadataDecode(_))
        ));
    }

    #[test]
    fn test_metadata_value() {
        let meta = metadata_map(&[("database_type", string("GeoLite2-ASN"))]);
        let value = metadata_value(&with_marker(&[1, 2, 3], &meta)).unwrap();
        assert_eq!(
            value.get("database_type").and_then(DataValue::as_str),
            Some("GeoLite2-ASN")
        );
    }
}
