//! sharedbuf CLI: run YAML scripts against a freshly loaded device.

use clap::{Parser, Subcommand};
use sharedbuf_core::prelude::{ConfigOverrides, DeviceConfig};
use sharedbuf_device::script::{parse_script, run_script};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sharedbuf")]
#[command(about = "Shared resizable byte buffer with stream, command and attribute access", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a script and print the JSON run report
    Run {
        /// Path to the script YAML file
        #[arg(short, long)]
        script: PathBuf,

        /// Initial buffer size in bytes (overrides env and script)
        #[arg(long)]
        buffer_size: Option<u32>,

        /// Memory cap in bytes (overrides env and script)
        #[arg(long)]
        memory_cap: Option<usize>,

        /// Device name (overrides env and script)
        #[arg(long)]
        name: Option<String>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a script YAML file (syntax check)
    Validate {
        /// Path to the script YAML file
        #[arg(short, long)]
        script: PathBuf,
    },

    /// Print the effective configuration
    Config {
        /// Initial buffer size in bytes
        #[arg(long)]
        buffer_size: Option<u32>,

        /// Memory cap in bytes
        #[arg(long)]
        memory_cap: Option<usize>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            buffer_size,
            memory_cap,
            name,
            pretty,
        } => {
            let flags = ConfigOverrides {
                name,
                initial_capacity: buffer_size,
                mem_cap_bytes: memory_cap,
            };
            if let Err(e) = run(&script, &flags, pretty) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { script } => {
            if let Err(e) = validate(&script) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Script is valid");
        }
        Commands::Config {
            buffer_size,
            memory_cap,
        } => {
            let mut config = DeviceConfig::from_env();
            ConfigOverrides {
                name: None,
                initial_capacity: buffer_size,
                mem_cap_bytes: memory_cap,
            }
            .apply(&mut config);
            match serde_json::to_string_pretty(&config) {
                Ok(s) => println!("{}", s),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn run(
    script_path: &PathBuf,
    flags: &ConfigOverrides,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let yaml = fs::read_to_string(script_path)?;
    let mut script = parse_script(&yaml)?;

    // defaults < env < script < flags
    let base = DeviceConfig::from_env();
    let mut layered = script.config.take().unwrap_or_default();
    merge_overrides(&mut layered, flags);
    script.config = Some(layered);

    let report = run_script(&script, base)?;
    let out = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", out);

    if report.error_count() > 0 {
        eprintln!("{} step(s) returned an error", report.error_count());
    }
    Ok(())
}

fn validate(script_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let yaml = fs::read_to_string(script_path)?;
    let script = parse_script(&yaml)?;
    let mut config = DeviceConfig::from_env();
    if let Some(ov) = &script.config {
        ov.apply(&mut config);
    }
    config.validate()?;
    Ok(())
}

fn merge_overrides(base: &mut ConfigOverrides, top: &ConfigOverrides) {
    if top.name.is_some() {
        base.name = top.name.clone();
    }
    if top.initial_capacity.is_some() {
        base.initial_capacity = top.initial_capacity;
    }
    if top.mem_cap_bytes.is_some() {
        base.mem_cap_bytes = top.mem_cap_bytes;
    }
}
