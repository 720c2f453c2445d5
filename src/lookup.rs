//! Geolocation lookup context
//!
//! [`GeoLookup`] bundles the City, Country and ASN databases a request
//! enricher needs and projects their records into flat string fields
//! ([`CityInfo`], [`CountryInfo`], [`AsnInfo`]) ready to be attached to a
//! request as headers. It is built once from a [`LookupConfig`] and then
//! shared; there is no global state.
//!
//! A lookup never fails. An address that cannot be parsed, is missing from a
//! database, or whose record does not decode yields [`UNKNOWN`] in every field
//! of that projection and a `warn!` log line.
//!
//! ```no_run
//! use geoipdb::{GeoLookup, LookupConfig};
//!
//! let config: LookupConfig = serde_json::from_str(r#"{
//!     "cityDbPath": "GeoLite2-City.mmdb",
//!     "asnDbPath": "GeoLite2-ASN.mmdb",
//!     "preferXForwardedForHeader": true
//! }"#)?;
//! let geo = GeoLookup::from_config(&config);
//!
//! let ip = geo.client_ip(|name| (name == "X-Forwarded-For").then_some("81.2.69.160, 10.0.0.1"), "10.0.0.1:4711");
//! for (name, value) in geo.lookup_str(ip).headers(config.light_mode) {
//!     println!("{}: {}", name, value);
//! }
//! # Ok::<(), serde_json::Error>(())
//! ```

use crate::cache::CachedDatabase;
use crate::codec::TextMode;
use crate::database::Database;
use crate::error::{LookupError, OpenError};
use crate::geohash::{self, GEOHASH_PRECISION};
use crate::records::{Asn, CityRecord, CountryRecord, DatabaseKind};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Value of every field of a failed lookup
pub const UNKNOWN: &str = "XX";

/// Default number of cached lookups per database
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Header carrying the resolved client address
pub const IP_ADDRESS_HEADER: &str = "GeoIP-IPAddress";
/// Continent name
pub const CONTINENT_HEADER: &str = "GeoIP-Continent";
/// Continent code
pub const CONTINENT_CODE_HEADER: &str = "GeoIP-Continent-Code";
/// Country name
pub const COUNTRY_HEADER: &str = "GeoIP-Country";
/// Country ISO code
pub const COUNTRY_CODE_HEADER: &str = "GeoIP-Country-Code";
/// Region (first subdivision) name
pub const REGION_HEADER: &str = "GeoIP-Region";
/// Region ISO code
pub const REGION_CODE_HEADER: &str = "GeoIP-Region-Code";
/// City name
pub const CITY_HEADER: &str = "GeoIP-City";
/// Postal code
pub const POSTAL_CODE_HEADER: &str = "GeoIP-Postal-Code";
/// Latitude
pub const LATITUDE_HEADER: &str = "GeoIP-Latitude";
/// Longitude
pub const LONGITUDE_HEADER: &str = "GeoIP-Longitude";
/// Accuracy radius in metres
pub const ACCURACY_RADIUS_HEADER: &str = "GeoIP-Accuracy-Radius";
/// Geohash of the coordinates
pub const GEOHASH_HEADER: &str = "GeoIP-Geohash";
/// Autonomous system number
pub const ASN_SYSTEM_NUMBER_HEADER: &str = "GeoIP-ASN-System-Number";
/// Autonomous system organization
pub const ASN_ORGANIZATION_HEADER: &str = "GeoIP-ASN-Organization";

const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

/// Lookup context configuration
///
/// Field names follow the JSON configuration format (`cityDbPath`, ...).
/// When both a City and a Country database are configured only the City
/// database is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupConfig {
    /// City database file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_db_path: Option<PathBuf>,
    /// Country database file, used when no City database is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_db_path: Option<PathBuf>,
    /// ASN database file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn_db_path: Option<PathBuf>,
    /// Decode strings to the Latin-1 repertoire
    pub iso88591: bool,
    /// Emit the reduced header set
    pub light_mode: bool,
    /// Take the client address from the first `X-Forwarded-For` entry
    pub prefer_x_forwarded_for_header: bool,
    /// Take the client address from this header instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_header: Option<String>,
    /// Cached lookups per database, 0 disables the cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            city_db_path: None,
            country_db_path: None,
            asn_db_path: None,
            iso88591: false,
            light_mode: false,
            prefer_x_forwarded_for_header: false,
            ip_header: None,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl LookupConfig {
    /// Text mode selected by `iso88591`
    pub fn text_mode(&self) -> TextMode {
        if self.iso88591 {
            TextMode::TransliterateToLatin1
        } else {
            TextMode::PassThrough
        }
    }
}

/// Flattened City record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityInfo {
    /// English country name
    pub country: String,
    /// Country ISO code
    pub country_code: String,
    /// English name of the first subdivision
    pub region: String,
    /// ISO code of the first subdivision
    pub region_code: String,
    /// English city name
    pub city: String,
    /// Postal code
    pub postal_code: String,
    /// Latitude in shortest decimal form
    pub latitude: String,
    /// Longitude in shortest decimal form
    pub longitude: String,
    /// Accuracy radius in metres
    pub accuracy_radius: String,
    /// Geohash of the coordinates
    pub geohash: String,
}

impl CityInfo {
    /// Every field set to [`UNKNOWN`]
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            country_code: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            region_code: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            postal_code: UNKNOWN.to_string(),
            latitude: UNKNOWN.to_string(),
            longitude: UNKNOWN.to_string(),
            accuracy_radius: UNKNOWN.to_string(),
            geohash: UNKNOWN.to_string(),
        }
    }

    /// Project a City record
    ///
    /// Missing names become [`UNKNOWN`]; missing codes and coordinates
    /// become empty strings and zero.
    pub fn from_record(record: &CityRecord) -> Self {
        let latitude = record.location.latitude.unwrap_or_default();
        let longitude = record.location.longitude.unwrap_or_default();
        let accuracy_km = u32::from(record.location.accuracy_radius.unwrap_or_default());
        let subdivision = record.most_general_subdivision();

        Self {
            country: english_name(&record.country.names),
            country_code: record.country.iso_code.clone().unwrap_or_default(),
            region: subdivision
                .map(|s| english_name(&s.names))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            region_code: subdivision
                .map(|s| s.iso_code.clone().unwrap_or_default())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            city: english_name(&record.city.names),
            postal_code: record.postal.code.clone().unwrap_or_default(),
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
            accuracy_radius: (accuracy_km * 1000).to_string(),
            geohash: geohash::encode(latitude, longitude, GEOHASH_PRECISION),
        }
    }
}

/// Flattened Country record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryInfo {
    /// English country name
    pub country: String,
    /// Country ISO code
    pub country_code: String,
}

impl CountryInfo {
    /// Every field set to [`UNKNOWN`]
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            country_code: UNKNOWN.to_string(),
        }
    }

    /// Project a Country record
    pub fn from_record(record: &CountryRecord) -> Self {
        Self {
            country: english_name(&record.country.names),
            country_code: record.country.iso_code.clone().unwrap_or_default(),
        }
    }
}

/// Flattened ASN record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsnInfo {
    /// Autonomous system number in decimal
    pub number: String,
    /// Organization owning the AS
    pub organization: String,
}

impl AsnInfo {
    /// Every field set to [`UNKNOWN`]
    pub fn unknown() -> Self {
        Self {
            number: UNKNOWN.to_string(),
            organization: UNKNOWN.to_string(),
        }
    }

    /// Project an ASN record
    pub fn from_record(record: &Asn) -> Self {
        Self {
            number: record.autonomous_system_number.to_string(),
            organization: record.autonomous_system_organization.clone(),
        }
    }
}

fn english_name(names: &crate::records::Names) -> String {
    names.get("en").cloned().unwrap_or_else(|| UNKNOWN.to_string())
}

/// Everything known about one client address
///
/// A projection is `None` when its database is not configured and the
/// unknown projection when the lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoInfo {
    /// The client address as given
    pub ip: String,
    /// City projection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<CityInfo>,
    /// Country projection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<CountryInfo>,
    /// ASN projection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<AsnInfo>,
}

impl GeoInfo {
    /// Header name and value pairs, address header first
    ///
    /// Light mode drops the country name, region name, postal code and
    /// geohash of the City projection.
    pub fn headers(&self, light_mode: bool) -> Vec<(&'static str, &str)> {
        let mut headers = vec![(IP_ADDRESS_HEADER, self.ip.as_str())];

        if let Some(city) = &self.city {
            if light_mode {
                headers.extend([
                    (COUNTRY_CODE_HEADER, city.country_code.as_str()),
                    (REGION_CODE_HEADER, city.region_code.as_str()),
                    (CITY_HEADER, city.city.as_str()),
                    (LATITUDE_HEADER, city.latitude.as_str()),
                    (LONGITUDE_HEADER, city.longitude.as_str()),
                    (ACCURACY_RADIUS_HEADER, city.accuracy_radius.as_str()),
                ]);
            } else {
                headers.extend([
                    (COUNTRY_HEADER, city.country.as_str()),
                    (COUNTRY_CODE_HEADER, city.country_code.as_str()),
                    (REGION_HEADER, city.region.as_str()),
                    (REGION_CODE_HEADER, city.region_code.as_str()),
                    (CITY_HEADER, city.city.as_str()),
                    (LATITUDE_HEADER, city.latitude.as_str()),
                    (LONGITUDE_HEADER, city.longitude.as_str()),
                    (ACCURACY_RADIUS_HEADER, city.accuracy_radius.as_str()),
                    (GEOHASH_HEADER, city.geohash.as_str()),
                    (POSTAL_CODE_HEADER, city.postal_code.as_str()),
                ]);
            }
        } else if let Some(country) = &self.country {
            headers.extend([
                (COUNTRY_HEADER, country.country.as_str()),
                (COUNTRY_CODE_HEADER, country.country_code.as_str()),
            ]);
        }

        if let Some(asn) = &self.asn {
            headers.extend([
                (ASN_SYSTEM_NUMBER_HEADER, asn.number.as_str()),
                (ASN_ORGANIZATION_HEADER, asn.organization.as_str()),
            ]);
        }
        headers
    }
}

/// How the client address is taken from a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIpSource {
    /// Use this header verbatim when set
    pub ip_header: Option<String>,
    /// Otherwise use the first `X-Forwarded-For` entry when present
    pub prefer_x_forwarded_for: bool,
}

impl ClientIpSource {
    /// Resolve the client address
    ///
    /// `header` looks a request header up by name. An explicit `ip_header`
    /// wins (an absent header yields an empty string), then the first
    /// `X-Forwarded-For` entry when preferred, then `remote_addr` with any
    /// port stripped.
    pub fn resolve<'a, F>(&self, header: F, remote_addr: &'a str) -> &'a str
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        if let Some(name) = &self.ip_header {
            return header(name.as_str()).unwrap_or("");
        }
        if self.prefer_x_forwarded_for {
            if let Some(forwarded) = header(FORWARDED_FOR_HEADER).filter(|v| !v.is_empty()) {
                return forwarded.split(',').next().unwrap_or(forwarded).trim();
            }
        }
        strip_port(remote_addr)
    }
}

/// `host:port` or `[host]:port` to `host`; anything else is returned as is
pub fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.split_once("]:") {
            Some((host, port)) if !port.contains(':') => host,
            _ => addr,
        };
    }
    match addr.split_once(':') {
        Some((host, port)) if !port.contains(':') => host,
        _ => addr,
    }
}

/// Open databases plus the projection settings
#[derive(Debug)]
pub struct GeoLookup {
    city: Option<CachedDatabase>,
    country: Option<CachedDatabase>,
    asn: Option<CachedDatabase>,
    client_ip: ClientIpSource,
    light_mode: bool,
}

impl GeoLookup {
    /// Open the configured databases
    ///
    /// A database that is missing or fails to open is logged and left out;
    /// its projection is then absent from every [`GeoInfo`].
    pub fn from_config(config: &LookupConfig) -> Self {
        let text_mode = config.text_mode();
        let open = |path: Option<&PathBuf>, kind| {
            path.and_then(|path| match open_database(path, kind, text_mode) {
                Ok(db) => Some(CachedDatabase::new(db, config.cache_size)),
                Err(e) => {
                    warn!("{} database not loaded: db={}, err={}", kind, path.display(), e);
                    None
                }
            })
        };

        let city = open(config.city_db_path.as_ref(), DatabaseKind::City);
        let country = if config.city_db_path.is_none() {
            open(config.country_db_path.as_ref(), DatabaseKind::Country)
        } else {
            None
        };
        let asn = open(config.asn_db_path.as_ref(), DatabaseKind::Asn);

        Self {
            city,
            country,
            asn,
            client_ip: ClientIpSource {
                ip_header: config.ip_header.clone().filter(|h| !h.is_empty()),
                prefer_x_forwarded_for: config.prefer_x_forwarded_for_header,
            },
            light_mode: config.light_mode,
        }
    }

    /// Build a context from databases that are already open
    pub fn from_databases(
        city: Option<Database>,
        country: Option<Database>,
        asn: Option<Database>,
        cache_size: usize,
    ) -> Self {
        let wrap = |db: Option<Database>| db.map(|db| CachedDatabase::new(db, cache_size));
        Self {
            city: wrap(city),
            country: wrap(country),
            asn: wrap(asn),
            client_ip: ClientIpSource::default(),
            light_mode: false,
        }
    }

    /// Client address resolution settings
    pub fn client_ip_source(&self) -> &ClientIpSource {
        &self.client_ip
    }

    /// Resolve the client address of a request
    pub fn client_ip<'a, F>(&self, header: F, remote_addr: &'a str) -> &'a str
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        self.client_ip.resolve(header, remote_addr)
    }

    /// Whether the reduced header set is configured
    pub fn light_mode(&self) -> bool {
        self.light_mode
    }

    /// Whether no database could be opened
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.country.is_none() && self.asn.is_none()
    }

    /// The open City database
    pub fn city_database(&self) -> Option<&CachedDatabase> {
        self.city.as_ref()
    }

    /// The open Country database
    pub fn country_database(&self) -> Option<&CachedDatabase> {
        self.country.as_ref()
    }

    /// The open ASN database
    pub fn asn_database(&self) -> Option<&CachedDatabase> {
        self.asn.as_ref()
    }

    /// Look up a textual address
    ///
    /// An unparsable address yields unknown projections for every
    /// configured database.
    pub fn lookup_str(&self, ip: &str) -> GeoInfo {
        match ip.parse::<IpAddr>() {
            Ok(addr) => self.project(ip.to_string(), Some(addr)),
            Err(_) => {
                warn!("invalid client address: ip={:?}", ip);
                self.project(ip.to_string(), None)
            }
        }
    }

    /// Look up an address
    pub fn lookup(&self, ip: IpAddr) -> GeoInfo {
        self.project(ip.to_string(), Some(ip))
    }

    fn project(&self, display: String, ip: Option<IpAddr>) -> GeoInfo {
        let city = self.city.as_ref().map(|db| {
            match ip.map(|ip| db.lookup_as::<CityRecord>(ip)) {
                Some(Ok(Some(record))) => CityInfo::from_record(&record),
                other => {
                    log_failure("city", &display, other);
                    CityInfo::unknown()
                }
            }
        });
        let country = self.country.as_ref().map(|db| {
            match ip.map(|ip| db.lookup_as::<CountryRecord>(ip)) {
                Some(Ok(Some(record))) => CountryInfo::from_record(&record),
                other => {
                    log_failure("country", &display, other);
                    CountryInfo::unknown()
                }
            }
        });
        let asn = self.asn.as_ref().map(|db| match ip.map(|ip| db.lookup_as::<Asn>(ip)) {
            Some(Ok(Some(record))) => AsnInfo::from_record(&record),
            other => {
                log_failure("ASN", &display, other);
                AsnInfo::unknown()
            }
        });

        GeoInfo {
            ip: display,
            city,
            country,
            asn,
        }
    }
}

fn log_failure<T>(what: &str, ip: &str, outcome: Option<Result<Option<T>, LookupError>>) {
    match outcome {
        Some(Err(e)) => warn!("unable to find {}: ip={}, err={}", what, ip, e),
        Some(Ok(None)) => debug!("no {} record: ip={}", what, ip),
        Some(Ok(Some(_))) | None => {}
    }
}

fn open_database(path: &Path, kind: DatabaseKind, text_mode: TextMode) -> Result<Database, OpenError> {
    let db = Database::options().kind(kind).text_mode(text_mode).open(path)?;
    debug!("{} lookup initialized: db={}", kind, path.display());
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{City, Country, Location, Postal, Subdivision};

    fn berlin() -> CityRecord {
        let mut record = CityRecord {
            country: Country {
                iso_code: Some("DE".to_string()),
                ..Default::default()
            },
            city: City::default(),
            location: Location {
                latitude: Some(52.5),
                longitude: Some(13.4),
                accuracy_radius: Some(200),
                ..Default::default()
            },
            postal: Postal {
                code: Some("10115".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        record.country.names.insert("en".to_string(), "Germany".to_string());
        record.city.names.insert("en".to_string(), "Berlin".to_string());
        record.city.names.insert("de".to_string(), "Berlin".to_string());
        let mut state = Subdivision {
            iso_code: Some("BE".to_string()),
            ..Default::default()
        };
        state.names.insert("en".to_string(), "Land Berlin".to_string());
        record.subdivisions.push(state);
        record
    }

    #[test]
    fn test_city_projection() {
        let info = CityInfo::from_record(&berlin());
        assert_eq!(info.country, "Germany");
        assert_eq!(info.country_code, "DE");
        assert_eq!(info.region, "Land Berlin");
        assert_eq!(info.region_code, "BE");
        assert_eq!(info.city, "Berlin");
        assert_eq!(info.postal_code, "10115");
        assert_eq!(info.latitude, "52.5");
        assert_eq!(info.longitude, "13.4");
        assert_eq!(info.accuracy_radius, "200000");
        assert_eq!(info.geohash, geohash::encode(52.5, 13.4, GEOHASH_PRECISION));
        assert_eq!(info.geohash.len(), 12);
    }

    #[test]
    fn test_city_projection_missing_names() {
        let info = CityInfo::from_record(&CityRecord::default());
        assert_eq!(info.country, UNKNOWN);
        assert_eq!(info.country_code, "");
        assert_eq!(info.region, UNKNOWN);
        assert_eq!(info.region_code, UNKNOWN);
        assert_eq!(info.city, UNKNOWN);
        assert_eq!(info.latitude, "0");
        assert_eq!(info.accuracy_radius, "0");
    }

    #[test]
    fn test_country_and_asn_projection() {
        let record = CountryRecord {
            country: berlin().country,
            ..Default::default()
        };
        assert_eq!(
            CountryInfo::from_record(&record),
            CountryInfo {
                country: "Germany".to_string(),
                country_code: "DE".to_string()
            }
        );

        let asn = Asn {
            autonomous_system_number: 13335,
            autonomous_system_organization: "CLOUDFLARENET".to_string(),
        };
        let info = AsnInfo::from_record(&asn);
        assert_eq!(info.number, "13335");
        assert_eq!(info.organization, "CLOUDFLARENET");
    }

    #[test]
    fn test_headers_full_and_light() {
        let info = GeoInfo {
            ip: "81.2.69.160".to_string(),
            city: Some(CityInfo::from_record(&berlin())),
            country: None,
            asn: Some(AsnInfo::unknown()),
        };

        let full = info.headers(false);
        assert_eq!(full.len(), 13);
        assert_eq!(full[0], (IP_ADDRESS_HEADER, "81.2.69.160"));
        assert!(full.contains(&(GEOHASH_HEADER, info.city.as_ref().unwrap().geohash.as_str())));
        assert!(full.contains(&(ASN_SYSTEM_NUMBER_HEADER, UNKNOWN)));

        let light = info.headers(true);
        let names: Vec<&str> = light.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            [
                IP_ADDRESS_HEADER,
                COUNTRY_CODE_HEADER,
                REGION_CODE_HEADER,
                CITY_HEADER,
                LATITUDE_HEADER,
                LONGITUDE_HEADER,
                ACCURACY_RADIUS_HEADER,
                ASN_SYSTEM_NUMBER_HEADER,
                ASN_ORGANIZATION_HEADER,
            ]
        );
    }

    #[test]
    fn test_country_headers_only_without_city() {
        let info = GeoInfo {
            ip: "1.1.1.1".to_string(),
            city: None,
            country: Some(CountryInfo::unknown()),
            asn: None,
        };
        assert_eq!(
            info.headers(true),
            vec![
                (IP_ADDRESS_HEADER, "1.1.1.1"),
                (COUNTRY_HEADER, UNKNOWN),
                (COUNTRY_CODE_HEADER, UNKNOWN)
            ]
        );
    }

    #[test]
    fn test_client_ip_resolution() {
        let headers = |name: &str| match name {
            "X-Forwarded-For" => Some(" 203.0.113.7 , 10.0.0.1"),
            "X-Real-Ip" => Some("198.51.100.2"),
            _ => None,
        };

        let remote = ClientIpSource::default();
        assert_eq!(remote.resolve(headers, "192.0.2.1:4711"), "192.0.2.1");

        let forwarded = ClientIpSource {
            ip_header: None,
            prefer_x_forwarded_for: true,
        };
        assert_eq!(forwarded.resolve(headers, "192.0.2.1:4711"), "203.0.113.7");
        assert_eq!(forwarded.resolve(|_| None, "192.0.2.1:4711"), "192.0.2.1");

        let explicit = ClientIpSource {
            ip_header: Some("X-Real-Ip".to_string()),
            prefer_x_forwarded_for: true,
        };
        assert_eq!(explicit.resolve(headers, "192.0.2.1:4711"), "198.51.100.2");
        assert_eq!(explicit.resolve(|_| None, "192.0.2.1:4711"), "");
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("192.0.2.1:80"), "192.0.2.1");
        assert_eq!(strip_port("[2001:db8::1]:443"), "2001:db8::1");
        assert_eq!(strip_port("2001:db8::1"), "2001:db8::1");
        assert_eq!(strip_port("[2001:db8::1]"), "[2001:db8::1]");
        assert_eq!(strip_port("192.0.2.1"), "192.0.2.1");
    }

    #[test]
    fn test_config_json() {
        let config: LookupConfig = serde_json::from_str(
            r#"{"cityDbPath": "GeoLite2-City.mmdb", "iso88591": true, "lightMode": true,
                "preferXForwardedForHeader": true, "ipHeader": "X-Real-Ip"}"#,
        )
        .unwrap();
        assert_eq!(config.city_db_path, Some(PathBuf::from("GeoLite2-City.mmdb")));
        assert_eq!(config.text_mode(), TextMode::TransliterateToLatin1);
        assert!(config.light_mode);
        assert!(config.prefer_x_forwarded_for_header);
        assert_eq!(config.ip_header.as_deref(), Some("X-Real-Ip"));
        assert_eq!(config.cache_size, DEFAULT_CACHE_SIZE);

        let empty: LookupConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, LookupConfig::default());
    }

    #[test]
    fn test_missing_databases_are_skipped() {
        let config = LookupConfig {
            city_db_path: Some(PathBuf::from("/nonexistent/GeoLite2-City.mmdb")),
            asn_db_path: Some(PathBuf::from("/nonexistent/GeoLite2-ASN.mmdb")),
            ..Default::default()
        };
        let geo = GeoLookup::from_config(&config);
        assert!(geo.is_empty());

        let info = geo.lookup_str("81.2.69.160");
        assert_eq!(info.city, None);
        assert_eq!(info.asn, None);
        assert_eq!(info.headers(false), vec![(IP_ADDRESS_HEADER, "81.2.69.160")]);
    }
}
