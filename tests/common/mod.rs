//! Synthetic database writer shared by the integration tests and benchmarks
//!
//! Encodes data-section values, lays out a search tree for any record size
//! and appends the metadata trailer, producing bytes that `Database` can open.

#![allow(dead_code)]

use std::net::IpAddr;

pub const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// A data-section value as written to disk
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Double(f64),
    Bytes(Vec<u8>),
    U16(u16),
    U32(u32),
    Map(Vec<(String, Value)>),
    I32(i32),
    U64(u64),
    U128(u128),
    Array(Vec<Value>),
    Bool(bool),
    Float(f32),
    /// Offset into the data section
    Pointer(usize),
}

pub fn s(text: &str) -> Value {
    Value::Str(text.to_string())
}

pub fn map(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// `{"en": name}`
pub fn names(name: &str) -> Value {
    map(vec![("en", s(name))])
}

fn write_control(out: &mut Vec<u8>, type_num: u8, size: usize) {
    let (size_bits, extra): (u8, Vec<u8>) = if size < 29 {
        (size as u8, vec![])
    } else if size < 29 + 256 {
        (29, vec![(size - 29) as u8])
    } else if size < 285 + 65_536 {
        (30, ((size - 285) as u16).to_be_bytes().to_vec())
    } else {
        (31, ((size - 65_821) as u32).to_be_bytes()[1..].to_vec())
    };
    if type_num <= 7 {
        out.push((type_num << 5) | size_bits);
    } else {
        out.push(size_bits);
        out.push(type_num - 7);
    }
    out.extend(extra);
}

fn trimmed(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

/// Encode a pointer using the smallest width class that fits `target`
pub fn encode_pointer(target: usize, out: &mut Vec<u8>) {
    if target < 2048 {
        out.push(0x20 | ((target >> 8) as u8 & 0x07));
        out.push(target as u8);
    } else if target < 2048 + 524_288 {
        let v = target - 2048;
        out.push(0x20 | 0x08 | ((v >> 16) as u8 & 0x07));
        out.extend([(v >> 8) as u8, v as u8]);
    } else if target < 526_336 + 134_217_728 {
        let v = target - 526_336;
        out.push(0x20 | 0x10 | ((v >> 24) as u8 & 0x07));
        out.extend([(v >> 16) as u8, (v >> 8) as u8, v as u8]);
    } else {
        out.push(0x20 | 0x18);
        out.extend((target as u32).to_be_bytes());
    }
}

pub fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Pointer(target) => encode_pointer(*target, out),
        Value::Str(text) => {
            write_control(out, 2, text.len());
            out.extend_from_slice(text.as_bytes());
        }
        Value::Double(v) => {
            write_control(out, 3, 8);
            out.extend(v.to_be_bytes());
        }
        Value::Bytes(bytes) => {
            write_control(out, 4, bytes.len());
            out.extend_from_slice(bytes);
        }
        Value::U16(v) => {
            let bytes = v.to_be_bytes();
            let bytes = trimmed(&bytes);
            write_control(out, 5, bytes.len());
            out.extend_from_slice(bytes);
        }
        Value::U32(v) => {
            let bytes = v.to_be_bytes();
            let bytes = trimmed(&bytes);
            write_control(out, 6, bytes.len());
            out.extend_from_slice(bytes);
        }
        Value::Map(entries) => {
            write_control(out, 7, entries.len());
            for (key, value) in entries {
                encode(&Value::Str(key.clone()), out);
                encode(value, out);
            }
        }
        Value::I32(v) => {
            write_control(out, 8, 4);
            out.extend(v.to_be_bytes());
        }
        Value::U64(v) => {
            let bytes = v.to_be_bytes();
            let bytes = trimmed(&bytes);
            write_control(out, 9, bytes.len());
            out.extend_from_slice(bytes);
        }
        Value::U128(v) => {
            let bytes = v.to_be_bytes();
            let bytes = trimmed(&bytes);
            write_control(out, 10, bytes.len());
            out.extend_from_slice(bytes);
        }
        Value::Array(items) => {
            write_control(out, 11, items.len());
            for item in items {
                encode(item, out);
            }
        }
        Value::Bool(v) => write_control(out, 14, *v as usize),
        Value::Float(v) => {
            write_control(out, 15, 4);
            out.extend(v.to_be_bytes());
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Empty,
    Node(usize),
    Data(usize),
}

/// In-memory database under construction
pub struct DbWriter {
    database_type: String,
    ip_version: u16,
    record_size: u16,
    nodes: Vec<[Slot; 2]>,
    data: Vec<u8>,
    languages: Vec<String>,
    extra_metadata: Vec<(String, Value)>,
}

impl DbWriter {
    pub fn new(database_type: &str, ip_version: u16, record_size: u16) -> Self {
        Self {
            database_type: database_type.to_string(),
            ip_version,
            record_size,
            nodes: vec![[Slot::Empty, Slot::Empty]],
            data: Vec::new(),
            languages: vec!["en".to_string()],
            extra_metadata: Vec::new(),
        }
    }

    /// Append a value to the data section and return its offset
    pub fn add_value(&mut self, value: &Value) -> usize {
        let offset = self.data.len();
        encode(value, &mut self.data);
        offset
    }

    /// Append raw bytes to the data section and return their offset
    pub fn add_raw(&mut self, bytes: &[u8]) -> usize {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        offset
    }

    pub fn metadata_entry(&mut self, key: &str, value: Value) -> &mut Self {
        self.extra_metadata.push((key.to_string(), value));
        self
    }

    /// Map `network/prefix_len` to the value at `offset`
    ///
    /// IPv4 networks in an IPv6 tree go below `::/96`. More specific
    /// networks must be inserted after the networks containing them.
    pub fn insert_offset(&mut self, network: &str, offset: usize) -> &mut Self {
        let (addr, prefix) = network.split_once('/').expect("network must be CIDR");
        let addr: IpAddr = addr.parse().expect("valid address");
        let prefix: usize = prefix.parse().expect("valid prefix");

        let (bits, total) = match (addr, self.ip_version) {
            (IpAddr::V4(v4), 4) => (u128::from(u32::from(v4)) << 96, prefix),
            (IpAddr::V4(v4), _) => (u128::from(u32::from(v4)), prefix + 96),
            (IpAddr::V6(v6), 6) => (u128::from(v6), prefix),
            (IpAddr::V6(_), _) => panic!("IPv6 network in an IPv4 tree"),
        };

        let mut node = 0usize;
        for depth in 0..total {
            let side = ((bits >> (127 - depth)) & 1) as usize;
            if depth + 1 == total {
                self.nodes[node][side] = Slot::Data(offset);
                break;
            }
            node = match self.nodes[node][side] {
                Slot::Node(next) => next,
                previous => {
                    // Split an empty or data slot so the shorter network keeps
                    // covering the sibling half
                    let fill = match previous {
                        Slot::Data(off) => Slot::Data(off),
                        _ => Slot::Empty,
                    };
                    self.nodes.push([fill, fill]);
                    let next = self.nodes.len() - 1;
                    self.nodes[node][side] = Slot::Node(next);
                    next
                }
            };
        }
        self
    }

    pub fn insert(&mut self, network: &str, value: &Value) -> &mut Self {
        let offset = self.add_value(value);
        self.insert_offset(network, offset)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn record_value(&self, slot: Slot) -> u64 {
        let node_count = self.nodes.len() as u64;
        match slot {
            Slot::Empty => node_count,
            Slot::Node(i) => i as u64,
            Slot::Data(off) => node_count + 16 + off as u64,
        }
    }

    fn write_tree(&self, out: &mut Vec<u8>) {
        for pair in &self.nodes {
            let left = self.record_value(pair[0]);
            let right = self.record_value(pair[1]);
            match self.record_size {
                24 => {
                    out.extend(&left.to_be_bytes()[5..]);
                    out.extend(&right.to_be_bytes()[5..]);
                }
                28 => {
                    out.extend(&left.to_be_bytes()[5..]);
                    out.push((((left >> 24) & 0x0F) << 4 | ((right >> 24) & 0x0F)) as u8);
                    out.extend(&right.to_be_bytes()[5..]);
                }
                32 => {
                    out.extend(&left.to_be_bytes()[4..]);
                    out.extend(&right.to_be_bytes()[4..]);
                }
                other => panic!("unsupported record size {}", other),
            }
        }
    }

    fn metadata(&self) -> Value {
        let mut entries = vec![
            ("node_count".to_string(), Value::U32(self.nodes.len() as u32)),
            ("record_size".to_string(), Value::U16(self.record_size)),
            ("ip_version".to_string(), Value::U16(self.ip_version)),
            ("database_type".to_string(), s(&self.database_type)),
            (
                "languages".to_string(),
                Value::Array(self.languages.iter().map(|l| s(l)).collect()),
            ),
            ("binary_format_major_version".to_string(), Value::U16(2)),
            ("binary_format_minor_version".to_string(), Value::U16(0)),
            ("build_epoch".to_string(), Value::U64(1_700_000_000)),
            (
                "description".to_string(),
                map(vec![("en", s("geoipdb test database"))]),
            ),
        ];
        entries.extend(self.extra_metadata.iter().cloned());
        Value::Map(entries)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_tree(&mut out);
        out.extend([0u8; 16]);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(METADATA_MARKER);
        encode(&self.metadata(), &mut out);
        out
    }
}

/// Country record for `name` with a geoname id
pub fn country_record(geoname_id: u32, name: &str) -> Value {
    map(vec![(
        "country",
        map(vec![("geoname_id", Value::U32(geoname_id)), ("names", names(name))]),
    )])
}

/// The two-network country database used across the tests
///
/// `10.0.0.0/16` is Zalibobastan (666), `10.0.1.0/24` is Kyrgyzstan (333).
pub fn zalibobastan_db(record_size: u16) -> Vec<u8> {
    let mut writer = DbWriter::new("GeoLite2-Country", 4, record_size);
    writer
        .insert("10.0.0.0/16", &country_record(666, "Zalibobastan"))
        .insert("10.0.1.0/24", &country_record(333, "Kyrgyzstan"));
    writer.build()
}

/// A full City record
pub fn city_record(city: &str, country: &str, iso_code: &str, lat: f64, lon: f64) -> Value {
    map(vec![
        ("city", map(vec![("geoname_id", Value::U32(2_643_743)), ("names", names(city))])),
        (
            "continent",
            map(vec![
                ("code", s("EU")),
                ("geoname_id", Value::U32(6_255_148)),
                ("names", names("Europe")),
            ]),
        ),
        (
            "country",
            map(vec![
                ("geoname_id", Value::U32(2_635_167)),
                ("is_in_european_union", Value::Bool(false)),
                ("iso_code", s(iso_code)),
                ("names", names(country)),
            ]),
        ),
        (
            "location",
            map(vec![
                ("accuracy_radius", Value::U16(100)),
                ("latitude", Value::Double(lat)),
                ("longitude", Value::Double(lon)),
                ("time_zone", s("Europe/London")),
            ]),
        ),
        ("postal", map(vec![("code", s("EC1A"))])),
        (
            "subdivisions",
            Value::Array(vec![map(vec![
                ("geoname_id", Value::U32(6_269_131)),
                ("iso_code", s("ENG")),
                ("names", names("England")),
            ])]),
        ),
        ("traits", map(vec![("is_anycast", Value::Bool(true))])),
    ])
}

pub fn asn_record(number: u32, organization: &str) -> Value {
    map(vec![
        ("autonomous_system_number", Value::U32(number)),
        ("autonomous_system_organization", s(organization)),
    ])
}
