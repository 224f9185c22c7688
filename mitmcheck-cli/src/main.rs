use std::fs::File;
use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mitmcheck_db::Database;
use mitmcheck_engine::{Config, Processor};
use mitmcheck_fp::{RequestFingerprint, UaFingerprint};

/// Detect HTTPS interception by comparing a client's User-Agent claim
/// against its TLS ClientHello behaviour.
#[derive(Parser)]
#[command(name = "mitmcheck", version, about)]
struct Args {
    /// Browser signature corpus.
    #[arg(long, default_value = "browser.txt")]
    browser_db: String,

    /// Interceptor signature corpus.
    #[arg(long, default_value = "mitm.txt")]
    mitm_db: String,

    /// Headers browsers never send, one per line.
    #[arg(long, default_value = "badheader.txt")]
    bad_headers: String,

    /// Log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check one observation and print the detection report as JSON.
    Check {
        /// Parsed User-Agent fingerprint
        /// (browser:version:platform:os:os-version:device:quirks).
        #[arg(long)]
        ua_fingerprint: String,

        /// Raw User-Agent header value.
        #[arg(long, default_value = "")]
        user_agent: String,

        /// Request fingerprint
        /// (version:ciphers:extensions:curves:ec-point-formats:headers:quirks).
        #[arg(long)]
        fingerprint: String,
    },
    /// Parse a signature corpus and write it back out (format check).
    Dump {
        /// Corpus file to dump.
        file: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match args.command {
        Command::Check {
            ua_fingerprint,
            user_agent,
            fingerprint,
        } => {
            let ua_fingerprint = UaFingerprint::parse(&ua_fingerprint)
                .with_context(|| format!("invalid user agent fingerprint '{ua_fingerprint}'"))?;
            let fingerprint = RequestFingerprint::parse(&fingerprint)
                .with_context(|| format!("invalid request fingerprint '{fingerprint}'"))?;

            let config = Config {
                browser_file_name: args.browser_db,
                mitm_file_name: args.mitm_db,
                bad_header_file_name: args.bad_headers,
                loader: None,
            };
            let processor = Processor::new(&config).context("loading signature corpus")?;
            let report = processor.check(ua_fingerprint, &user_agent, fingerprint);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Dump { file } => {
            let input =
                File::open(&file).with_context(|| format!("unable to open '{file}'"))?;
            let db = Database::load(input).with_context(|| format!("unable to parse '{file}'"))?;
            db.dump(&mut io::stdout().lock())?;
        }
    }
    Ok(())
}
