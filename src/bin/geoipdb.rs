mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use commands::{cmd_headers, cmd_inspect, cmd_lookup, HeadersArgs, LookupArgs};

#[derive(Parser)]
#[command(name = "geoipdb")]
#[command(
    about = "Look up IP addresses in GeoIP2 / GeoLite2 databases",
    long_about = "geoipdb - Memory-mapped reader for MaxMind DB (.mmdb) files\n\n\
    Decodes Country, City, ASN, ISP, Domain and Connection-Type records\n\
    for IPv4 and IPv6 addresses. Other database types are decoded generically.\n\n\
    Examples:\n\
      geoipdb lookup GeoLite2-City.mmdb 81.2.69.160\n\
      geoipdb lookup GeoLite2-ASN.mmdb 1.1.1.1 2606:4700::1111 --kind asn\n\
      geoipdb inspect GeoLite2-City.mmdb --json\n\
      geoipdb headers --city GeoLite2-City.mmdb --asn GeoLite2-ASN.mmdb 81.2.69.160"
)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one or more addresses and print the records as JSON
    Lookup {
        /// Path to the database (.mmdb or .mmdb.gz)
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// IPv4 or IPv6 addresses
        #[arg(value_name = "IP", required = true)]
        ips: Vec<String>,

        /// Required record kind: country, city, asn, isp, domain, connection-type
        #[arg(short, long)]
        kind: Option<String>,

        /// Transliterate strings to Latin-1
        #[arg(long)]
        latin1: bool,

        /// Decode records without a schema
        #[arg(long)]
        raw: bool,

        /// Read the file into memory instead of mapping it
        #[arg(long)]
        no_mmap: bool,

        /// Quiet mode - no output, only exit code (0 = found, 1 = not found)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show database metadata
    Inspect {
        /// Path to the database (.mmdb or .mmdb.gz)
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Output metadata as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the GeoIP-* header values for addresses
    Headers {
        /// IPv4 or IPv6 addresses
        #[arg(value_name = "IP", required = true)]
        ips: Vec<String>,

        /// JSON lookup configuration (cityDbPath, asnDbPath, lightMode, ...)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// City database, overrides the configuration
        #[arg(long, value_name = "DATABASE")]
        city: Option<PathBuf>,

        /// Country database, overrides the configuration
        #[arg(long, value_name = "DATABASE")]
        country: Option<PathBuf>,

        /// ASN database, overrides the configuration
        #[arg(long, value_name = "DATABASE")]
        asn: Option<PathBuf>,

        /// Emit the reduced header set
        #[arg(long)]
        light: bool,

        /// Transliterate strings to Latin-1
        #[arg(long)]
        latin1: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Lookup {
            database,
            ips,
            kind,
            latin1,
            raw,
            no_mmap,
            quiet,
        } => cmd_lookup(LookupArgs {
            database,
            ips,
            kind,
            latin1,
            raw,
            no_mmap,
            quiet,
        }),
        Commands::Inspect { database, json } => cmd_inspect(database, json),
        Commands::Headers {
            ips,
            config,
            city,
            country,
            asn,
            light,
            latin1,
            json,
        } => cmd_headers(HeadersArgs {
            ips,
            config,
            city,
            country,
            asn,
            light,
            latin1,
            json,
        }),
    }
}
