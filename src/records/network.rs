//! Network ownership records: ASN, ISP, Domain and Connection-Type

use super::{unknown_key, MapRecord};
use crate::data_section::DataDecoder;
use crate::error::Result;
use serde::Serialize;

/// Record stored in ASN databases
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Asn {
    /// Autonomous system number
    pub autonomous_system_number: u32,
    /// Organization owning the AS
    pub autonomous_system_organization: String,
}

impl MapRecord for Asn {
    const NAME: &'static str = "asn";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"autonomous_system_number" => self.autonomous_system_number = decoder.read_uint32(cursor)?,
            b"autonomous_system_organization" => {
                self.autonomous_system_organization = decoder.read_string(cursor)?
            }
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Record stored in ISP databases
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Isp {
    /// Autonomous system number
    pub autonomous_system_number: u32,
    /// Organization owning the AS
    pub autonomous_system_organization: String,
    /// ISP name
    pub isp: String,
    /// Mobile country code (MCC)
    pub mobile_country_code: String,
    /// Mobile network code (MNC)
    pub mobile_network_code: String,
    /// Organization using the network
    pub organization: String,
}

impl MapRecord for Isp {
    const NAME: &'static str = "isp";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"autonomous_system_number" => self.autonomous_system_number = decoder.read_uint32(cursor)?,
            b"autonomous_system_organization" => {
                self.autonomous_system_organization = decoder.read_string(cursor)?
            }
            b"isp" => self.isp = decoder.read_string(cursor)?,
            b"mobile_country_code" => self.mobile_country_code = decoder.read_string(cursor)?,
            b"mobile_network_code" => self.mobile_network_code = decoder.read_string(cursor)?,
            b"organization" => self.organization = decoder.read_string(cursor)?,
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Record stored in Domain databases
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Domain {
    /// Second level domain, e.g. `example.com`
    pub domain: String,
}

impl MapRecord for Domain {
    const NAME: &'static str = "domain";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"domain" => self.domain = decoder.read_string(cursor)?,
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Record stored in Connection-Type databases
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionType {
    /// One of `Dialup`, `Cable/DSL`, `Corporate`, `Cellular`, `Satellite`
    pub connection_type: String,
}

impl MapRecord for ConnectionType {
    const NAME: &'static str = "connection type";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"connection_type" => self.connection_type = decoder.read_string(cursor)?,
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TextMode;
    use crate::error::DecodeError;
    use crate::records::read_record;

    fn string(s: &str) -> Vec<u8> {
        let mut out = if s.len() < 29 {
            vec![0x40 | s.len() as u8]
        } else {
            vec![0x5D, (s.len() - 29) as u8]
        };
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn test_read_asn() {
        let mut buf = vec![0xE2];
        buf.extend(string("autonomous_system_number"));
        buf.extend([0xC2, 0x34, 0x21]);
        buf.extend(string("autonomous_system_organization"));
        buf.extend(string("Cloudflare"));

        let decoder = DataDecoder::new(&buf, TextMode::PassThrough);
        let mut cursor = 0;
        let asn: Asn = read_record(&decoder, &mut cursor).unwrap();
        assert_eq!(asn.autonomous_system_number, 0x3421);
        assert_eq!(asn.autonomous_system_organization, "Cloudflare");
        assert_eq!(cursor, buf.len());
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let mut buf = vec![0xE1];
        buf.extend(string("domain_v2"));
        buf.extend(string("example.com"));

        let decoder = DataDecoder::new(&buf, TextMode::PassThrough);
        let mut cursor = 0;
        assert_eq!(
            read_record::<Domain>(&decoder, &mut cursor),
            Err(DecodeError::UnknownKey {
                record: "domain",
                key: "domain_v2".to_string()
            })
        );
    }

    #[test]
    fn test_read_connection_type_behind_pointer() {
        // [0] map{"connection_type": "Cellular"} [26] pointer -> 0
        let mut buf = vec![0xE1];
        buf.extend(string("connection_type"));
        buf.extend(string("Cellular"));
        let ptr_at = buf.len();
        buf.extend([0x20, 0x00]);

        let decoder = DataDecoder::new(&buf, TextMode::PassThrough);
        let mut cursor = ptr_at;
        let record: ConnectionType = read_record(&decoder, &mut cursor).unwrap();
        assert_eq!(record.connection_type, "Cellular");
        assert_eq!(cursor, ptr_at + 2);
    }

    #[test]
    fn test_wrong_value_type() {
        let mut buf = vec![0xE1];
        buf.extend(string("isp"));
        buf.extend([0xA1, 0x01]);
        let decoder = DataDecoder::new(&buf, TextMode::PassThrough);
        let mut cursor = 0;
        assert!(matches!(
            read_record::<Isp>(&decoder, &mut cursor),
            Err(DecodeError::UnexpectedType { .. })
        ));
    }
}
