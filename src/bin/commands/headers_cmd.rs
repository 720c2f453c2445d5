use anyhow::{bail, Context, Result};
use geoipdb::{GeoLookup, LookupConfig};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

pub struct HeadersArgs {
    pub ips: Vec<String>,
    pub config: Option<PathBuf>,
    pub city: Option<PathBuf>,
    pub country: Option<PathBuf>,
    pub asn: Option<PathBuf>,
    pub light: bool,
    pub latin1: bool,
    pub json: bool,
}

fn load_config(args: &HeadersArgs) -> Result<LookupConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config: {}", path.display()))?
        }
        None => LookupConfig::default(),
    };

    if args.city.is_some() {
        config.city_db_path = args.city.clone();
    }
    if args.country.is_some() {
        config.country_db_path = args.country.clone();
    }
    if args.asn.is_some() {
        config.asn_db_path = args.asn.clone();
    }
    config.light_mode |= args.light;
    config.iso88591 |= args.latin1;
    Ok(config)
}

pub fn cmd_headers(args: HeadersArgs) -> Result<()> {
    let config = load_config(&args)?;
    if config.city_db_path.is_none() && config.country_db_path.is_none() && config.asn_db_path.is_none() {
        bail!("No database configured (use --city, --country, --asn or --config)");
    }

    let geo = GeoLookup::from_config(&config);
    if geo.is_empty() {
        bail!("None of the configured databases could be opened");
    }

    let infos: Vec<_> = args.ips.iter().map(|ip| geo.lookup_str(ip)).collect();

    if args.json {
        let output: Vec<Value> = infos
            .iter()
            .map(|info| {
                let headers: Map<String, Value> = info
                    .headers(config.light_mode)
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
                    .collect();
                Value::Object(headers)
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (i, info) in infos.iter().enumerate() {
            if i > 0 {
                println!();
            }
            for (name, value) in info.headers(config.light_mode) {
                println!("{}: {}", name, value);
            }
        }
    }
    Ok(())
}
