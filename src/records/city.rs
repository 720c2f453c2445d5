//! Country and City records

use super::common::read_subdivisions;
use super::{read_record, unknown_key, City, Continent, Country, Location, MapRecord, Postal, Subdivision, Traits};
use crate::data_section::DataDecoder;
use crate::error::Result;
use serde::Serialize;

/// Record stored in Country databases
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountryRecord {
    /// Continent of the network
    pub continent: Continent,
    /// Country where the network is located
    pub country: Country,
    /// Country where the ISP registered the network
    pub registered_country: Country,
    /// Country represented by users of the network (military bases, embassies)
    pub represented_country: Country,
    /// Network traits
    pub traits: Traits,
}

impl MapRecord for CountryRecord {
    const NAME: &'static str = "country record";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"continent" => self.continent = read_record(decoder, cursor)?,
            b"country" => self.country = read_record(decoder, cursor)?,
            b"registered_country" => self.registered_country = read_record(decoder, cursor)?,
            b"represented_country" => self.represented_country = read_record(decoder, cursor)?,
            b"traits" => self.traits = read_record(decoder, cursor)?,
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}

/// Record stored in City and Enterprise databases
///
/// A superset of [`CountryRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CityRecord {
    /// City of the network
    pub city: City,
    /// Continent of the network
    pub continent: Continent,
    /// Country where the network is located
    pub country: Country,
    /// Approximate coordinates
    pub location: Location,
    /// Postal code
    pub postal: Postal,
    /// Country where the ISP registered the network
    pub registered_country: Country,
    /// Country represented by users of the network
    pub represented_country: Country,
    /// Administrative divisions, largest first
    pub subdivisions: Vec<Subdivision>,
    /// Network traits
    pub traits: Traits,
}

impl CityRecord {
    /// The largest subdivision, if any
    pub fn most_general_subdivision(&self) -> Option<&Subdivision> {
        self.subdivisions.first()
    }
}

impl MapRecord for CityRecord {
    const NAME: &'static str = "city record";

    fn read_field(&mut self, key: &[u8], decoder: &DataDecoder<'_>, cursor: &mut usize) -> Result<()> {
        match key {
            b"city" => self.city = read_record(decoder, cursor)?,
            b"continent" => self.continent = read_record(decoder, cursor)?,
            b"country" => self.country = read_record(decoder, cursor)?,
            b"location" => self.location = read_record(decoder, cursor)?,
            b"postal" => self.postal = read_record(decoder, cursor)?,
            b"registered_country" => self.registered_country = read_record(decoder, cursor)?,
            b"represented_country" => self.represented_country = read_record(decoder, cursor)?,
            b"subdivisions" => self.subdivisions = read_subdivisions(decoder, cursor)?,
            b"traits" => self.traits = read_record(decoder, cursor)?,
            _ => return unknown_key::<Self>(key),
        }
        Ok(())
    }
}
