//! MMDB Search Tree Traversal
//!
//! The tree is a binary trie over address bits, most significant bit first.
//! Each node holds two records (left for bit 0, right for bit 1). A record
//! value is interpreted against `node_count`:
//!
//! ```text
//!   value <  node_count   next node index
//!   value == node_count   no data for this address
//!   value >  node_count   data section offset = value - node_count - 16
//! ```
//!
//! All three record widths go through [`SearchTree::read_record`]; a 28-bit
//! record keeps its top nibble in the middle byte of the node.

use super::format::Metadata;
use super::types::{IpVersion, RecordSize, DATA_SECTION_SEPARATOR_SIZE};
use crate::codec::bytes_to_uint_with_prefix;
use crate::error::LookupError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Result of a successful tree walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeMatch {
    /// Offset into the data section (relative to data section start)
    pub data_offset: usize,
    /// Network prefix length, in bits of the looked-up address
    pub prefix_len: u8,
}

/// Walk state over the address bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    /// At `node`, about to consume address bit `bit`
    Descending { node: u32, bit: u32 },
    /// A data record was reached after `depth` bits
    Found { record: u32, depth: u32 },
    /// The empty sentinel was reached
    NotFound,
}

/// Search tree for IP address lookups
#[derive(Debug, Clone, Copy)]
pub struct SearchTree<'a> {
    /// Tree bytes only (exactly `node_count * node_bytes`)
    tree: &'a [u8],
    node_count: u32,
    record_size: RecordSize,
    ip_version: IpVersion,
    /// Record reached after 96 zero bits in an IPv6 tree (root for IPv4 trees)
    ipv4_start: u32,
}

impl<'a> SearchTree<'a> {
    /// Create a search tree over `data`, which must start with the tree
    ///
    /// Walks the 96-bit IPv4 prefix once for IPv6 trees; keep the result of
    /// [`SearchTree::ipv4_start`] and use [`SearchTree::with_ipv4_start`] to
    /// skip the walk on later constructions.
    pub fn new(data: &'a [u8], metadata: &Metadata) -> Result<Self, LookupError> {
        let mut search = Self::with_ipv4_start(data, metadata, 0)?;
        if search.ip_version == IpVersion::V6 {
            let mut node = 0u32;
            let mut depth = 0u32;
            while depth < 96 && node < search.node_count {
                node = search.read_record(node, 0)?;
                depth += 1;
            }
            search.ipv4_start = node;
        }
        Ok(search)
    }

    /// Create a search tree with an already located IPv4 start record
    pub fn with_ipv4_start(
        data: &'a [u8],
        metadata: &Metadata,
        ipv4_start: u32,
    ) -> Result<Self, LookupError> {
        let size = metadata.search_tree_size();
        let tree = data.get(..size).ok_or_else(|| {
            LookupError::CorruptTree(format!(
                "tree of {} bytes exceeds buffer of {} bytes",
                size,
                data.len()
            ))
        })?;

        Ok(SearchTree {
            tree,
            node_count: metadata.node_count,
            record_size: metadata.record_size,
            ip_version: metadata.ip_version,
            ipv4_start,
        })
    }

    /// Record at which IPv4 lookups start (0 for IPv4 trees)
    pub fn ipv4_start(&self) -> u32 {
        self.ipv4_start
    }

    /// IP version of the tree
    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    /// Look up an IP address
    ///
    /// IPv4-mapped IPv6 addresses are looked up as IPv4. Any other IPv6
    /// address in an IPv4 tree is an error.
    pub fn lookup(&self, ip: IpAddr) -> Result<Option<TreeMatch>, LookupError> {
        match ip {
            IpAddr::V4(addr) => self.lookup_v4(addr),
            IpAddr::V6(addr) => match (self.ip_version, addr.to_ipv4_mapped()) {
                (IpVersion::V6, _) => self.lookup_v6(addr),
                (IpVersion::V4, Some(v4)) => self.lookup_v4(v4),
                (IpVersion::V4, None) => Err(LookupError::Ipv6InIpv4Database(addr)),
            },
        }
    }

    /// Look up an IPv4 address
    pub fn lookup_v4(&self, addr: Ipv4Addr) -> Result<Option<TreeMatch>, LookupError> {
        let bits = (u32::from(addr) as u128) << 96;
        if self.ip_version == IpVersion::V4 {
            return self.walk(bits, 0, 32);
        }
        // Reported prefix is in IPv4 bits; a data record hit during the
        // 96-bit prefix walk covers all of IPv4
        if self.ipv4_start >= self.node_count {
            return self.resolve(self.step(self.ipv4_start, 0));
        }
        self.walk(bits, self.ipv4_start, 32)
    }

    /// Look up an IPv6 address
    pub fn lookup_v6(&self, addr: Ipv6Addr) -> Result<Option<TreeMatch>, LookupError> {
        if self.ip_version == IpVersion::V4 {
            return match addr.to_ipv4_mapped() {
                Some(v4) => self.lookup_v4(v4),
                None => Err(LookupError::Ipv6InIpv4Database(addr)),
            };
        }
        self.walk(u128::from(addr), 0, 128)
    }

    /// Walk `bit_count` bits of `bits` (left-aligned in a u128) from `start`
    fn walk(&self, bits: u128, start: u32, bit_count: u32) -> Result<Option<TreeMatch>, LookupError> {
        let mut state = WalkState::Descending { node: start, bit: 0 };
        while let WalkState::Descending { node, bit } = state {
            if bit == bit_count {
                return Err(LookupError::CorruptTree(format!(
                    "still at node {} after {} bits",
                    node, bit_count
                )));
            }
            let side = ((bits >> (127 - bit)) & 1) as u8;
            let record = self.read_record(node, side)?;
            state = self.step(record, bit + 1);
        }
        self.resolve(state)
    }

    fn step(&self, record: u32, depth: u32) -> WalkState {
        if record < self.node_count {
            WalkState::Descending {
                node: record,
                bit: depth,
            }
        } else if record == self.node_count {
            WalkState::NotFound
        } else {
            WalkState::Found { record, depth }
        }
    }

    fn resolve(&self, state: WalkState) -> Result<Option<TreeMatch>, LookupError> {
        match state {
            WalkState::NotFound => Ok(None),
            WalkState::Found { record, depth } => Ok(Some(TreeMatch {
                data_offset: self.data_offset(record)?,
                prefix_len: depth as u8,
            })),
            WalkState::Descending { node, .. } => Err(LookupError::CorruptTree(format!(
                "walk stopped at node {}",
                node
            ))),
        }
    }

    /// Convert a data record value into a data section offset
    fn data_offset(&self, record: u32) -> Result<usize, LookupError> {
        (record as usize)
            .checked_sub(self.node_count as usize + DATA_SECTION_SEPARATOR_SIZE)
            .ok_or_else(|| {
                LookupError::CorruptTree(format!(
                    "record {} points into the data section separator (node_count = {})",
                    record, self.node_count
                ))
            })
    }

    /// Read the left (`side == 0`) or right record of `node`
    pub fn read_record(&self, node: u32, side: u8) -> Result<u32, LookupError> {
        let node_bytes = self.record_size.node_bytes();
        let whole = self.record_size.whole_bytes();
        let base = node as usize * node_bytes;
        let bytes = self.tree.get(base..base + node_bytes).ok_or_else(|| {
            LookupError::CorruptTree(format!(
                "node {} is outside the tree (node_count = {})",
                node, self.node_count
            ))
        })?;

        let (run, prefix) = match (self.record_size, side) {
            (RecordSize::Bits28, 0) => (&bytes[..whole], (bytes[3] >> 4) as u64),
            (RecordSize::Bits28, _) => (&bytes[node_bytes - whole..], (bytes[3] & 0x0F) as u64),
            (_, 0) => (&bytes[..whole], 0),
            (_, _) => (&bytes[whole..], 0),
        };
        Ok(bytes_to_uint_with_prefix(prefix, run) as u32)
    }
}
