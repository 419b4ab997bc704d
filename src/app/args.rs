//! Command-line arguments
//!
//! Global options select the configuration file and logging; each subcommand
//! renders one server-side artefact to stdout.

use crate::consent::ConsentPreset;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug, Clone)]
#[command(name = "gtm-client")]
#[command(about = "Render tag-manager container URLs, noscript markup and consent commands")]
#[command(version = crate::CLIENT_VERSION)]
pub struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Container id (repeatable); replaces the configured containers
    #[arg(short = 'C', long = "container", value_name = "ID", action = ArgAction::Append, global = true)]
    pub containers: Vec<String>,

    /// Tag-manager host override
    #[arg(long = "host", value_name = "URL", global = true)]
    pub host: Option<String>,

    /// Data layer name override
    #[arg(short = 'd', long = "data-layer", value_name = "NAME", global = true)]
    pub data_layer_name: Option<String>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true,
          value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", global = true,
          value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print each container's script URL
    Url(UrlArgs),
    /// Print each container's <noscript> fallback markup
    Noscript,
    /// Print a consent command entry as JSON
    Consent(ConsentArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct UrlArgs {
    /// Print the ns.html URL instead of gtm.js
    #[arg(long = "noscript", conflicts_with = "tag")]
    pub noscript: bool,

    /// Print a complete <script> tag instead of the bare URL
    #[arg(long = "tag")]
    pub tag: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConsentArgs {
    /// Preset: eea-default (alias all-denied), all-granted, analytics-only
    #[arg(value_name = "PRESET", value_parser = parse_preset)]
    pub preset: ConsentPreset,

    /// Emit an `update` command instead of `default`
    #[arg(long = "update")]
    pub update: bool,

    /// Restrict to the EEA member states
    #[arg(long = "eea", conflicts_with = "regions")]
    pub eea: bool,

    /// Region codes (repeatable or comma-separated)
    #[arg(short = 'r', long = "region", value_name = "CODES", value_delimiter = ',', action = ArgAction::Append)]
    pub regions: Vec<String>,

    /// Milliseconds the script waits for an update before applying defaults
    #[arg(long = "wait-for-update", value_name = "MS")]
    pub wait_for_update: Option<u64>,

    /// Pretty-print the JSON
    #[arg(long = "pretty")]
    pub pretty: bool,
}

fn parse_preset(value: &str) -> Result<ConsentPreset, String> {
    ConsentPreset::from_str(value).map_err(|_| {
        format!(
            "unknown preset '{}' (expected eea-default, all-denied, all-granted or analytics-only)",
            value
        )
    })
}
