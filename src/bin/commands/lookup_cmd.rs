use anyhow::{anyhow, Context, Result};
use geoipdb::{Database, DatabaseKind, LoadMode, TextMode};
use rayon::prelude::*;
use serde_json::{json, Value};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::cli_utils::format_network;

pub struct LookupArgs {
    pub database: PathBuf,
    pub ips: Vec<String>,
    pub kind: Option<String>,
    pub latin1: bool,
    pub raw: bool,
    pub no_mmap: bool,
    pub quiet: bool,
}

pub fn cmd_lookup(args: LookupArgs) -> Result<()> {
    let mut options = Database::options()
        .text_mode(if args.latin1 {
            TextMode::TransliterateToLatin1
        } else {
            TextMode::PassThrough
        })
        .load(if args.no_mmap { LoadMode::Read } else { LoadMode::Mmap });
    if let Some(kind) = &args.kind {
        let kind: DatabaseKind = kind.parse().map_err(|e: String| anyhow!(e))?;
        options = options.kind(kind);
    }

    let db = options
        .open(&args.database)
        .with_context(|| format!("Failed to load database: {}", args.database.display()))?;

    let ips = args
        .ips
        .iter()
        .map(|ip| {
            ip.parse::<IpAddr>()
                .with_context(|| format!("Invalid IP address: {}", ip))
        })
        .collect::<Result<Vec<_>>>()?;

    // Lookups are independent; the database is shared read-only
    let results: Vec<(bool, Value)> = ips
        .par_iter()
        .map(|&ip| lookup_one(&db, ip, args.raw))
        .collect();

    let found = results.iter().any(|(found, _)| *found);

    if !args.quiet {
        let output: Vec<Value> = results.into_iter().map(|(_, value)| value).collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    std::process::exit(if found { 0 } else { 1 });
}

fn lookup_one(db: &Database, ip: IpAddr, raw: bool) -> (bool, Value) {
    let outcome = if raw {
        db.lookup_value(ip).and_then(|found| match found {
            Some(value) => Ok(Some((serde_json::to_value(value), db.lookup_prefix_len(ip)?))),
            None => Ok(None),
        })
    } else {
        db.lookup_entry(ip)
            .map(|found| found.map(|entry| (serde_json::to_value(&entry.record), Some(entry.prefix_len))))
    };

    match outcome {
        Ok(Some((Ok(record), prefix_len))) => {
            let mut result = json!({ "ip": ip.to_string(), "record": record });
            if let Some(prefix_len) = prefix_len {
                result["network"] = json!(format_network(ip, prefix_len));
                result["prefix_len"] = json!(prefix_len);
            }
            (true, result)
        }
        Ok(Some((Err(e), _))) => (false, json!({ "ip": ip.to_string(), "error": e.to_string() })),
        Ok(None) => (false, json!({ "ip": ip.to_string(), "record": null })),
        Err(e) => (false, json!({ "ip": ip.to_string(), "error": e.to_string() })),
    }
}
