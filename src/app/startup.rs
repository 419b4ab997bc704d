//! Binary entry point: parse arguments, set up logging, run one subcommand

use crate::app::args::{Cli, Command, ConsentArgs, UrlArgs};
use crate::app::error::CliError;
use crate::client::{ClientConfig, ConfigError, Containers};
use crate::consent::{build_command, eea_region_options, ConsentVerb, RegionOptions};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::{init_logging, set_log_level};
use crate::loader::{container_url, noscript_markup, script_tag, ScriptElement, ScriptKind};
use clap::Parser;
use colored::Colorize;
use std::ffi::OsString;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "gtm-client";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Run the CLI against the process arguments; returns the exit code
pub fn run() -> i32 {
    run_from(std::env::args_os())
}

pub fn run_from<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { 2 } else { 0 };
        }
    };

    let use_color = !cli.no_color && std::io::stderr().is_terminal();
    colored::control::set_override(use_color);

    if let Err(e) = init_logging(
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
        cli.log_file.as_deref(),
        use_color,
    ) {
        eprintln!("{} failed to initialise logging: {}", "warning:".yellow().bold(), e);
    }
    if cli.verbose > 0 {
        let level = if cli.verbose > 1 { "trace" } else { "debug" };
        if let Err(e) = set_log_level(level) {
            log::warn!("Could not raise log level to {}: {}", level, e);
        }
    }
    log::debug!(
        "gtm-client {} ({}, built {})",
        crate::CLIENT_VERSION,
        crate::GIT_HASH,
        crate::BUILD_TIME
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match execute(&cli, &mut out) {
        Ok(()) => 0,
        Err(e) => {
            log_error_with_context(&e, "gtm-client");
            eprintln!("{} {}", "error:".red().bold(), e);
            1
        }
    }
}

/// Run the parsed subcommand, writing its output to `out`
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<(), CliError> {
    match &cli.command {
        Command::Url(args) => print_urls(&load_config(cli)?, args, out),
        Command::Noscript => print_noscript(&load_config(cli)?, out),
        Command::Consent(args) => print_consent(args, out),
    }
}

/// `<config_dir>/gtm-client/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Configuration from the file (explicit or default), then command-line overrides
pub fn load_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let path = match &cli.config_file {
        Some(path) if !path.exists() => {
            return Err(CliError::MissingConfigFile { path: path.clone() });
        }
        Some(path) => Some(path.clone()),
        None => default_config_path().filter(|path| path.exists()),
    };

    let mut config = match path {
        Some(path) => read_config_file(&path)?,
        None => {
            log::debug!("No configuration file; using command-line options only");
            ClientConfig::new(Vec::<String>::new())
        }
    };

    if !cli.containers.is_empty() {
        config.containers = Containers::from(cli.containers.clone());
    }
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(name) = &cli.data_layer_name {
        config.data_layer_name = name.clone();
    }
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ClientConfig, CliError> {
    log::debug!("Loading configuration from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => ClientConfig::from_json_str(&contents),
        _ => ClientConfig::from_toml_str(&contents),
    };
    parsed.map_err(|source: ConfigError| CliError::InvalidConfigFile {
        path: path.to_path_buf(),
        source,
    })
}

fn print_urls(config: &ClientConfig, args: &UrlArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let resolved = config.resolve()?;
    let settings = &resolved.settings;
    let kind = if args.noscript {
        ScriptKind::Noscript
    } else {
        ScriptKind::Script
    };

    for container in &resolved.containers {
        let host = container.resolve_host(&settings.host)?;
        let src = container_url(&host, kind, container, &settings.data_layer_name);
        if args.tag {
            let element = ScriptElement {
                id: container.element_id(),
                container_id: container.id.clone(),
                src,
                is_async: true,
                attributes: settings.script_attributes.clone(),
            };
            writeln!(out, "{}", script_tag(&element))?;
        } else {
            writeln!(out, "{}", src)?;
        }
    }
    Ok(())
}

fn print_noscript(config: &ClientConfig, out: &mut dyn Write) -> Result<(), CliError> {
    let resolved = config.resolve()?;
    for container in &resolved.containers {
        let host = container.resolve_host(&resolved.settings.host)?;
        writeln!(out, "{}", noscript_markup(&host, container))?;
    }
    Ok(())
}

fn print_consent(args: &ConsentArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let verb = if args.update {
        ConsentVerb::Update
    } else {
        ConsentVerb::Default
    };

    let mut region = if args.eea {
        eea_region_options()
    } else {
        RegionOptions::for_regions(args.regions.iter().map(|code| code.trim().to_uppercase()))
    };
    if let Some(millis) = args.wait_for_update {
        region = region.with_wait_for_update(millis);
    }

    let command = build_command(verb, &args.preset.state(), Some(&region));
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&command)?
    } else {
        serde_json::to_string(&command)?
    };
    writeln!(out, "{}", rendered)?;
    Ok(())
}
