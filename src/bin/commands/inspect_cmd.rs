use anyhow::{Context, Result};
use geoipdb::{DataValue, Database};
use serde_json::json;
use std::path::PathBuf;

use crate::cli_utils::format_unix_timestamp;

pub fn cmd_inspect(database: PathBuf, json_output: bool) -> Result<()> {
    let db = Database::open(&database)
        .with_context(|| format!("Failed to load database: {}", database.display()))?;
    let metadata = db.metadata();

    if json_output {
        let mut output = json!({
            "file": database.display().to_string(),
            "kind": db.kind().map(|k| k.as_str()),
            "mmap": db.is_mmap(),
            "search_tree_size": metadata.search_tree_size(),
            "data_section_start": metadata.data_section_start(),
        });
        // Full map, including keys the typed metadata does not model
        output["metadata"] = serde_json::to_value(db.metadata_value()?)?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Database:        {}", database.display());
    println!(
        "Kind:            {}",
        db.kind().map(|k| k.as_str()).unwrap_or("generic")
    );
    println!();
    println!("Metadata:");
    println!("  Database type:   {}", metadata.database_type);
    println!(
        "  Format version:  {}.{}",
        metadata.binary_format_major_version, metadata.binary_format_minor_version
    );
    println!(
        "  Build time:      {} ({})",
        format_unix_timestamp(metadata.build_epoch),
        metadata.build_epoch
    );
    println!("  IP version:      IPv{}", metadata.ip_version);
    println!("  Record size:     {} bits", metadata.record_size);
    println!("  Node count:      {}", metadata.node_count);
    println!("  Tree size:       {} bytes", metadata.search_tree_size());
    if !metadata.languages.is_empty() {
        println!("  Languages:       {}", metadata.languages.join(", "));
    }
    if !metadata.description.is_empty() {
        println!("  Description:");
        for (lang, text) in &metadata.description {
            println!("    {}: {}", lang, text);
        }
    }

    // Vendor keys beyond the standard set
    if let DataValue::Map(map) = db.metadata_value()? {
        let mut extra: Vec<_> = map
            .iter()
            .filter(|(key, _)| !STANDARD_KEYS.contains(&key.as_str()))
            .collect();
        extra.sort_by(|a, b| a.0.cmp(b.0));
        if !extra.is_empty() {
            println!("  Other keys:");
            for (key, value) in extra {
                println!("    {}: {}", key, serde_json::to_string(value)?);
            }
        }
    }

    Ok(())
}

const STANDARD_KEYS: &[&str] = &[
    "binary_format_major_version",
    "binary_format_minor_version",
    "build_epoch",
    "database_type",
    "description",
    "ip_version",
    "languages",
    "node_count",
    "record_size",
];
