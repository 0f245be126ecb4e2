//! adqlmorph CLI
//!
//! A thin wrapper around the adqlmorph library.

use std::io::Read;
use std::path::{Path, PathBuf};

use adqlmorph::{DialectConfig, Statement, StcsValue};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "adqlmorph")]
#[command(about = "ADQL to PostgreSQL (pgSphere + q3c) dialect back end")]
#[command(after_help = "\
EXAMPLES:
    # Compile a JSON syntax tree produced by the ADQL parser
    adqlmorph compile query.json

    # Read the tree from stdin, without the q3c fast path
    cat query.json | adqlmorph compile --no-index

    # Custom function names
    adqlmorph compile --config dialect.json query.json

    # Parse an upload geometry
    adqlmorph stcs 'Box ICRS 10 20 4 2'
")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a JSON-serialized statement to SQL
    Compile {
        /// JSON statement file; stdin when omitted
        input: Option<PathBuf>,

        /// JSON dialect configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the spatial-index pass
        #[arg(long)]
        no_index: bool,

        /// Print SQL and warnings as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Parse an STC-S literal and print the geometry
    Stcs {
        literal: String,

        /// Print the parsed value as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct CompileReport<'a> {
    sql: &'a str,
    warnings: &'a [String],
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Args::parse().command {
        Command::Compile {
            input,
            config,
            no_index,
            json,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => DialectConfig::default(),
            };
            if no_index {
                config.spatial_index = false;
            }

            let source = read_input(input.as_deref())?;
            let statement: Statement =
                serde_json::from_str(&source).context("input is not a JSON statement")?;
            let compiled = adqlmorph::compile(statement, &config)?;

            if json {
                let report = CompileReport {
                    sql: &compiled.sql,
                    warnings: &compiled.warnings,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", compiled.sql);
                for warning in &compiled.warnings {
                    eprintln!("warning: {}", warning);
                }
            }
        }
        Command::Stcs { literal, json } => {
            let value = adqlmorph::parse_stcs(&literal)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                match &value {
                    StcsValue::Concrete(geometry) => {
                        log::debug!("parsed {} literal", geometry.kind());
                        println!("{}", geometry)
                    }
                    StcsValue::UnresolvedRegion(region) => {
                        anyhow::bail!("region needs resolving before storage: {}", region)
                    }
                }
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<DialectConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    log::info!("Loaded dialect config from {}", path.display());
    Ok(config)
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            Ok(text)
        }
    }
}
