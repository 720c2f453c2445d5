//! Sub-records shared by the Country and City shapes

use super::{read_record, unknown_key, MapRecord};
use crate::data_section::DataDecoder;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Localized names keyed by locale code (`en`, `de`, `pt-BR`, ...)
pub type Names = BTreeMap<String, String>;

/// Continent data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Continent {
    /// GeoNames identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// Two-letter continent code (`EU`, `NA`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Localized names
    #[serde(skip_serializing_if = "Names::is_empty")]
    pub names: Names,
}

impl MapRecord for Continent {
    const NAME: &'static str = "continent";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"geoname_id" => self.geoname_id = Some(decoder.read_uint32(cursor)?),
            b"code" => self.code = Some(decoder.read_string(cursor)?),
            b"names" => self.names = decoder.read_string_map(cursor)?,
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Country data, also used for registered and represented countries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Country {
    /// GeoNames identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// ISO 3166-1 alpha-2 code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_code: Option<String>,
    /// Localized names
    #[serde(skip_serializing_if = "Names::is_empty")]
    pub names: Names,
    /// Whether the country is an EU member state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_in_european_union: Option<bool>,
    /// Only set on represented countries (e.g. `military`)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub country_type: Option<String>,
    /// Confidence (0-100) in the value, Enterprise only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
}

impl MapRecord for Country {
    const NAME: &'static str = "country";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"geoname_id" => self.geoname_id = Some(decoder.read_uint32(cursor)?),
            b"iso_code" => self.iso_code = Some(decoder.read_string(cursor)?),
            b"names" => self.names = decoder.read_string_map(cursor)?,
            b"is_in_european_union" => self.is_in_european_union = Some(decoder.read_bool(cursor)?),
            b"type" => self.country_type = Some(decoder.read_string(cursor)?),
            b"confidence" => self.confidence = Some(decoder.read_uint16(cursor)?),
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// First-level (and deeper) administrative division
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subdivision {
    /// GeoNames identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// ISO 3166-2 code, without the country prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_code: Option<String>,
    /// Localized names
    #[serde(skip_serializing_if = "Names::is_empty")]
    pub names: Names,
    /// Confidence (0-100) in the value, Enterprise only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
}

impl MapRecord for Subdivision {
    const NAME: &'static str = "subdivision";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"geoname_id" => self.geoname_id = Some(decoder.read_uint32(cursor)?),
            b"iso_code" => self.iso_code = Some(decoder.read_string(cursor)?),
            b"names" => self.names = decoder.read_string_map(cursor)?,
            b"confidence" => self.confidence = Some(decoder.read_uint16(cursor)?),
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Read an array of subdivision maps
pub(crate) fn read_subdivisions(decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<Vec<Subdivision>> {
    let mut subdivisions = Vec::new();
    decoder.read_array(cursor, |cursor| {
        subdivisions.push(read_record(decoder, cursor)?);
        Ok(())
    })?;
    Ok(subdivisions)
}

/// City data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct City {
    /// GeoNames identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// Localized names
    #[serde(skip_serializing_if = "Names::is_empty")]
    pub names: Names,
    /// Confidence (0-100) in the value, Enterprise only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
}

impl MapRecord for City {
    const NAME: &'static str = "city";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"geoname_id" => self.geoname_id = Some(decoder.read_uint32(cursor)?),
            b"names" => self.names = decoder.read_string_map(cursor)?,
            b"confidence" => self.confidence = Some(decoder.read_uint16(cursor)?),
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Approximate coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Location {
    /// Latitude in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Radius in kilometres around the coordinates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_radius: Option<u16>,
    /// US only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metro_code: Option<u16>,
    /// IANA time zone name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// Average income in US dollars, Enterprise only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_income: Option<u32>,
    /// People per square kilometre, Enterprise only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_density: Option<u32>,
}

impl MapRecord for Location {
    const NAME: &'static str = "location";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"latitude" => self.latitude = Some(decoder.read_float64(cursor)?),
            b"longitude" => self.longitude = Some(decoder.read_float64(cursor)?),
            b"accuracy_radius" => self.accuracy_radius = Some(decoder.read_uint16(cursor)?),
            b"metro_code" => self.metro_code = Some(decoder.read_uint16(cursor)?),
            b"time_zone" => self.time_zone = Some(decoder.read_string(cursor)?),
            b"average_income" => self.average_income = Some(decoder.read_uint32(cursor)?),
            b"population_density" => self.population_density = Some(decoder.read_uint32(cursor)?),
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Postal code data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Postal {
    /// Postal code, possibly truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Confidence (0-100) in the value, Enterprise only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
}

impl MapRecord for Postal {
    const NAME: &'static str = "postal";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"code" => self.code = Some(decoder.read_string(cursor)?),
            b"confidence" => self.confidence = Some(decoder.read_uint16(cursor)?),
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Network traits
///
/// Country and City databases only carry the proxy flags; the rest is
/// filled in Enterprise databases.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Traits {
    /// Deprecated anonymous proxy flag
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_anonymous_proxy: bool,
    /// Deprecated satellite provider flag
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_satellite_provider: bool,
    /// Network is anycast
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_anycast: bool,
    /// Known corporate or legitimate proxy
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_legitimate_proxy: bool,
    /// Autonomous system number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autonomous_system_number: Option<u32>,
    /// Organization owning the AS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autonomous_system_organization: Option<String>,
    /// Connection type name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// Second level domain of the network
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// ISP name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    /// Organization name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Mobile country code (MCC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_country_code: Option<String>,
    /// Mobile network code (MNC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_network_code: Option<String>,
    /// Usage classification (`residential`, `business`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    /// Likelihood that the IP is static
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_ip_score: Option<f64>,
}

impl MapRecord for Traits {
    const NAME: &'static str = "traits";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"is_anonymous_proxy" => self.is_anonymous_proxy = decoder.read_bool(cursor)?,
            b"is_satellite_provider" => self.is_satellite_provider = decoder.read_bool(cursor)?,
            b"is_anycast" => self.is_anycast = decoder.read_bool(cursor)?,
            b"is_legitimate_proxy" => self.is_legitimate_proxy = decoder.read_bool(cursor)?,
            b"autonomous_system_number" => {
                self.autonomous_system_number = Some(decoder.read_uint32(cursor)?)
            }
            b"autonomous_system_organization" => {
                self.autonomous_system_organization = Some(decoder.read_string(cursor)?)
            }
            b"connection_type" => self.connection_type = Some(decoder.read_string(cursor)?),
            b"domain" => self.domain = Some(decoder.read_string(cursor)?),
            b"isp" => self.isp = Some(decoder.read_string(cursor)?),
            b"organization" => self.organization = Some(decoder.read_string(cursor)?),
            b"mobile_country_code" => self.mobile_country_code = Some(decoder.read_string(cursor)?),
            b"mobile_network_code" => self.mobile_network_code = Some(decoder.read_string(cursor)?),
            b"user_type" => self.user_type = Some(decoder.read_string(cursor)?),
            b"static_ip_score" => self.static_ip_score = Some(decoder.read_float64(cursor)?),
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}
