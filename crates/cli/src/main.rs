//! idproxy command-line tool.
//!
//! Runs the subject normalizer on ad-hoc identifiers, inspects the attribute
//! map, pushes response documents through the configured pipeline, and
//! generates / validates configuration files.

mod attributes;
mod style;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use idproxy_core::attribute_map::AttributeMap;
use idproxy_core::config::ProxyConfig;
use idproxy_core::identity::{NormalizeOutcome, NormalizerConfig, UpnNormalizer};
use idproxy_core::pipeline::{Pipeline, ResponseContext};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// idproxy command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "idproxy",
    version,
    about = "Normalize subjects and attributes for a federated identity proxy"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "/etc/idproxy/config.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert userPrincipalName identifiers to SamAccountName form.
    Normalize {
        /// Identifiers to convert. Pass "" to see how an empty subject is handled.
        #[arg(required = true)]
        identifiers: Vec<String>,

        /// Upper-case the domain part.
        #[arg(long)]
        domain_to_upper: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Inspect the configured attribute map.
    Attributes {
        #[command(subcommand)]
        action: AttributesAction,
    },

    /// Run a response document (JSON) through the configured pipeline.
    Process {
        /// Input file. Reads stdin when omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./idproxy.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(Subcommand, Debug)]
enum AttributesAction {
    /// List all attribute mappings.
    List,
    /// Translate one attribute name.
    Lookup {
        /// Attribute name (external by default).
        name: String,

        /// Treat NAME as a local name and print the external one.
        #[arg(long)]
        reverse: bool,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Normalize {
            identifiers,
            domain_to_upper,
            json,
        } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_normalize(&identifiers, domain_to_upper, json)
        }
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(&cli.config),
        Commands::Attributes { action } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            let config = load_config(&cli.config)?;
            let map = config
                .attribute_map()
                .context("failed to load attribute map")?;
            match action {
                AttributesAction::List => attributes::run_list(&map),
                AttributesAction::Lookup { name, reverse } => {
                    attributes::run_lookup(&map, &name, reverse)
                }
            }
        }
        Commands::Process { input } => {
            let config = load_config(&cli.config)?;
            init_tracing(
                cli.log_level
                    .as_deref()
                    .unwrap_or(&config.proxy.log_level),
            );
            cmd_process(&config, input.as_deref())
        }
    }
}

/// Install a stderr `fmt` subscriber so stdout stays machine-readable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<ProxyConfig> {
    ProxyConfig::load_and_validate(path).context("failed to load configuration file")
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct NormalizeRow<'a> {
    input: &'a str,
    value: Option<String>,
    outcome: NormalizeOutcome,
}

fn cmd_normalize(identifiers: &[String], domain_to_upper: bool, json: bool) -> Result<()> {
    let normalizer = UpnNormalizer::new(NormalizerConfig { domain_to_upper });

    let rows: Vec<NormalizeRow<'_>> = identifiers
        .iter()
        .map(|input| {
            let normalized = normalizer.normalize(Some(input.as_str()));
            NormalizeRow {
                input: input.as_str(),
                value: normalized.value,
                outcome: normalized.outcome,
            }
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&rows).context("failed to serialize results")?;
        println!("{}", out);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Input", "Result", "Outcome"]);

    for row in &rows {
        table.add_row(vec![
            Cell::new(row.input),
            Cell::new(row.value.as_deref().unwrap_or("—")),
            style::outcome_cell(row.outcome),
        ]);
    }

    println!("{}", table);
    Ok(())
}

fn cmd_process(config: &ProxyConfig, input: Option<&Path>) -> Result<()> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read response document from stdin")?;
            buf
        }
    };

    let mut ctx: ResponseContext =
        serde_json::from_str(&raw).context("failed to parse response document")?;

    let map = config
        .attribute_map()
        .context("failed to load attribute map")?;
    let pipeline = Pipeline::from_config(config).context("failed to build response pipeline")?;

    ctx.map_attributes_to_internal(&map);
    let summary = pipeline
        .run(&mut ctx)
        .context("response pipeline failed")?;
    info!(
        executed = summary.executed,
        stopped_by = summary.stopped_by.as_deref().unwrap_or("-"),
        "response processed"
    );

    let out = serde_json::to_string_pretty(&ctx).context("failed to serialize response")?;
    println!("{}", out);
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# idproxy configuration

[proxy]
log_level = "info"

[attribute_map]
# Leave unset to use the built-in AWS SAML attribute map.
# file = "/etc/idproxy/attributemaps/aws.toml"

[[response_stages]]
name = "upn_to_sam"
module = "convert_upn_to_sam"

[response_stages.config]
# Required. true turns jdoe@example.com into EXAMPLE.COM\jdoe,
# false into example.com\jdoe.
domain_to_upper = true
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Adjust domain_to_upper and the attribute map for your deployment");
    println!(
        "  2. Validate with: idproxy validate --config {}",
        output.display()
    );
    println!(
        "  3. Try it: echo '{{\"subject_id\":\"jdoe@example.com\"}}' | idproxy process --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config =
        ProxyConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    if let Err(e) = config.validate() {
        println!("  {}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("  {}", style::success("All stage options are valid"));

    let map: AttributeMap = match config.attribute_map() {
        Ok(map) => map,
        Err(e) => {
            println!("  {}", style::error(&format!("Attribute map error: {}", e)));
            anyhow::bail!("configuration validation failed");
        }
    };
    println!("  {}", style::success("Attribute map is consistent"));
    if !map.carries_subject_attribute() {
        println!(
            "  {}",
            style::warn("Attribute map has no userPrincipalName entry for the subject")
        );
    }

    println!();
    println!("Configuration summary:");
    println!("  Log level     : {}", config.proxy.log_level);
    println!(
        "  Attribute map : {}",
        config
            .attribute_map
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in (aws)".to_string())
    );
    println!("  Name format   : {}", map.identifier);
    println!("  Mappings      : {}", map.to.len());
    println!("  Stages        : {}", config.response_stages.len());
    for stage in &config.response_stages {
        println!("    - {} ({})", stage.name, stage.module.as_str());
    }
    println!();
    println!("Configuration is valid.");

    Ok(())
}
