//! lvstack command-line interface for inspecting and tearing down LVM-backed storage.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;
use lvstack_core::{
    config::CONFIG_PATH_ENV, escape, logging, mapper_device_path, GatedTeardown, LvStackConfig,
    LvStackError, RunState, StorageService, SystemCommandRunner, TeardownReport, ToolSet,
    DEFAULT_CONFIG_PATH,
};
use lvstack_lvm::SystemLvmProvider;
use schemars::schema_for;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

type SystemService = StorageService<SystemCommandRunner, SystemLvmProvider>;

/// Top-level command-line options shared by every subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "lvstack",
    version,
    about = "Inspect and dismantle LVM-backed storage during teardown."
)]
struct Cli {
    /// Path to the lvstack configuration file.
    #[arg(short, long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report whether a mount point is backed by an LVM logical volume.
    IsLayered {
        /// Mount point to inspect; defaults to device.mount_point.
        mount_point: Option<String>,
    },

    /// Print the parsed mount table.
    Mounts,

    /// Remove a volume group's logical volumes, the group, then its physical volumes.
    Teardown {
        /// Volume group name.
        group: String,

        /// Only proceed when the host run state is one of these (repeatable).
        #[arg(long = "allow-state", value_parser = parse_run_state)]
        allow_state: Vec<RunState>,
    },

    /// Print a volume group's logical and physical volumes as JSON.
    Describe {
        /// Volume group name.
        group: String,
    },

    /// Print the host's current run state.
    RunState,

    /// Escape names for the device-mapper naming convention.
    Escape {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print the device-mapper path of a logical volume.
    DevicePath { group: String, unit: String },

    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Report configuration issues; exits non-zero when any are found.
    Validate,
    /// Print the JSON schema of the configuration file.
    Schema,
}

fn parse_run_state(value: &str) -> Result<RunState, String> {
    value.parse().map_err(|_| {
        let known: Vec<&str> = RunState::ALL.iter().map(|state| state.as_str()).collect();
        format!("unknown run state `{value}`; expected one of {}", known.join(", "))
    })
}

fn load_cli_config(path: &Path) -> Result<LvStackConfig> {
    LvStackConfig::load_or_default(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn build_service(config: LvStackConfig) -> Result<SystemService> {
    let tools = ToolSet::resolve(&config).context("failed to resolve LVM tool paths")?;
    let runner = SystemCommandRunner::new(config.command_timeout());
    let provider = SystemLvmProvider::with_runner(runner.clone(), &tools);
    Ok(StorageService::new(Arc::new(config), tools, runner, provider))
}

fn print_report(report: &TeardownReport) {
    if !report.found {
        println!("Volume group {} not found; nothing to remove.", report.group);
        return;
    }
    for unit in &report.removed_units {
        println!("Removed logical volume {unit}");
    }
    if report.group_removed {
        println!("Removed volume group {}", report.group);
    }
    for member in &report.removed_members {
        println!("Removed physical volume {member}");
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_cli_config(&cli.config)?;

    match cli.command {
        Commands::IsLayered { mount_point } => {
            let service = build_service(config)?;
            let layered = match mount_point {
                Some(mount_point) => service.is_layered(&mount_point)?,
                None => service.is_default_mount_layered()?,
            };
            println!("{layered}");
        }
        Commands::Mounts => {
            let service = build_service(config)?;
            for entry in service.mount_entries()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.device,
                    entry.mount_point,
                    entry.fs_type,
                    entry.options.join(",")
                );
            }
        }
        Commands::Teardown { group, allow_state } => {
            let service = build_service(config)?;
            let outcome = if allow_state.is_empty() {
                service.teardown(&group).map(GatedTeardown::Completed)
            } else {
                service.teardown_when(&group, &allow_state)
            };
            if let Err(LvStackError::Teardown(err)) = &outcome {
                print_report(&err.report);
            }
            match outcome.with_context(|| format!("teardown of volume group {group} failed"))? {
                GatedTeardown::Completed(report) => print_report(&report),
                GatedTeardown::Refused(state) => {
                    println!("Host run state is {state}; leaving volume group {group} in place.");
                }
            }
        }
        Commands::Describe { group } => {
            let service = build_service(config)?;
            let composition = service.describe_group(&group)?;
            println!("{}", to_string_pretty(&composition)?);
        }
        Commands::RunState => {
            let service = build_service(config)?;
            println!("{}", service.current_state()?);
        }
        Commands::Escape { names } => {
            for name in names {
                println!("{}", escape(&name));
            }
        }
        Commands::DevicePath { group, unit } => {
            println!(
                "{}",
                mapper_device_path(config.mapper_namespace(), &group, &unit)
            );
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", config.render()?),
            ConfigAction::Validate => {
                let issues = config.validate();
                if issues.is_empty() {
                    println!("Configuration at {} looks valid.", config.path.display());
                } else {
                    for issue in &issues {
                        warn!("{issue}");
                        println!("- {issue}");
                    }
                    return Ok(ExitCode::FAILURE);
                }
            }
            ConfigAction::Schema => {
                let schema = schema_for!(LvStackConfig);
                println!("{}", to_string_pretty(&schema)?);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    logging::init("info");
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        }
    }
}
