use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use stratus_core::plan::Plan;
use stratus_core::resource::ResourceId;
use stratus_core::schema::ResourceSchema;
use stratus_provider_awscc::AwsccProvider;
use stratus_state::create_backend;

mod config;
mod deps;
mod display;
mod engine;
mod error;
#[cfg(test)]
mod testing;

use config::Config;
use display::{format_state_line, print_plan};
use engine::{ApplyReport, Engine};
use error::{CliError, CliResult};

const DEFAULT_CONFIG_FILE: &str = "main.json";

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Manage AWS resources through Cloud Control", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },
    /// Destroy every resource recorded in state
    Destroy {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },
    /// Adopt an existing object into state
    Import {
        /// Resource type (e.g., pipes_pipe)
        resource_type: String,
        /// Resource name in configuration
        name: String,
        /// Cloud identifier of the existing object
        identifier: String,

        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Inspect and edit recorded state
    State {
        #[command(subcommand)]
        command: StateCommands,

        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE, global = true)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List recorded resources
    List,
    /// Show a recorded resource
    Show { resource_type: String, name: String },
    /// Forget a resource without deleting it
    Rm { resource_type: String, name: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file).await,
        Commands::Plan { file } => run_plan(&file).await,
        Commands::Apply { file, auto_approve } => run_apply(&file, auto_approve).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::Import {
            resource_type,
            name,
            identifier,
            file,
        } => run_import(&file, ResourceId::new(resource_type, name), &identifier).await,
        Commands::State { command, file } => run_state(&file, command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Load configuration, falling back to an empty one for commands that
/// only touch state
fn load_config(file: &Path, required: bool) -> CliResult<Config> {
    if !required && !file.exists() {
        log::debug!("{} not found, using defaults", file.display());
        return Ok(Config::default());
    }
    Ok(Config::load(file)?)
}

async fn build_engine(config: &Config) -> CliResult<Engine> {
    let backend = create_backend(&config.backend).await?;
    let provider = AwsccProvider::new(config.provider.clone()).await;
    log::info!("using region {}", provider.region());
    Ok(Engine::new(Box::new(provider), backend))
}

async fn run_validate(file: &Path) -> CliResult<()> {
    let config = load_config(file, true)?;
    let engine = build_engine(&config).await?;

    println!("{}", "Validating...".cyan());
    let resources = engine.validate(&config)?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", resources.len())
            .green()
            .bold()
    );
    for resource in &resources {
        println!("  • {}", resource.id);
    }
    Ok(())
}

async fn run_plan(file: &Path) -> CliResult<()> {
    let config = load_config(file, true)?;
    let engine = build_engine(&config).await?;
    let prepared = engine.plan(&config).await?;
    print_plan(&prepared.plan, engine.schemas());
    Ok(())
}

async fn run_apply(file: &Path, auto_approve: bool) -> CliResult<()> {
    let config = load_config(file, true)?;
    let engine = build_engine(&config).await?;

    let approve = |plan: &Plan, schemas: &HashMap<String, ResourceSchema>| -> CliResult<bool> {
        print_plan(plan, schemas);
        if plan.is_empty() {
            return Ok(false);
        }
        println!();
        let approved = auto_approve
            || confirm("Do you want to perform these actions?", "Only 'yes' will be accepted.")?;
        if approved {
            println!("{}", "Applying changes...".cyan().bold());
            println!();
        } else {
            println!("{}", "Apply cancelled.".yellow());
        }
        Ok(approved)
    };

    match engine.apply(&config, approve).await? {
        Some(report) if report.succeeded + report.failed > 0 => finish("Apply", report),
        _ => Ok(()),
    }
}

async fn run_destroy(file: &Path, auto_approve: bool) -> CliResult<()> {
    let config = load_config(file, false)?;
    let engine = build_engine(&config).await?;

    let approve = |plan: &Plan| -> CliResult<bool> {
        if plan.is_empty() {
            println!("{}", "No resources to destroy.".green());
            return Ok(false);
        }
        println!("{}", "Destroy Plan:".red().bold());
        println!();
        for effect in plan.effects() {
            println!("  {} {}", "-".red().bold(), effect.resource_id());
        }
        println!();
        println!("Plan: {} to destroy.", plan.effects().len().to_string().red());
        println!();

        let approved = auto_approve
            || confirm(
                "Do you really want to destroy all resources?",
                "This action cannot be undone. Type 'yes' to confirm.",
            )?;
        if approved {
            println!("{}", "Destroying resources...".red().bold());
            println!();
        } else {
            println!("{}", "Destroy cancelled.".yellow());
        }
        Ok(approved)
    };

    match engine.destroy(approve).await? {
        Some(report) => finish("Destroy", report),
        None => Ok(()),
    }
}

async fn run_import(file: &Path, id: ResourceId, identifier: &str) -> CliResult<()> {
    let config = load_config(file, false)?;
    let engine = build_engine(&config).await?;

    let state = engine.import(&config, &id, identifier).await?;
    println!(
        "{} Imported {} ({}).",
        "✓".green(),
        id.to_string().cyan().bold(),
        state.identifier.as_deref().unwrap_or(identifier)
    );
    Ok(())
}

async fn run_state(file: &Path, command: StateCommands) -> CliResult<()> {
    let config = load_config(file, false)?;
    let backend = create_backend(&config.backend).await?;

    match command {
        StateCommands::List => {
            let state = backend.read_state().await?.unwrap_or_default();
            if state.resources.is_empty() {
                println!("{}", "No resources in state.".yellow());
            }
            for resource in &state.resources {
                println!("{}", format_state_line(resource));
            }
            Ok(())
        }
        StateCommands::Show {
            resource_type,
            name,
        } => {
            let id = ResourceId::new(resource_type, name);
            let state = backend.read_state().await?.unwrap_or_default();
            let resource = state
                .find_resource(&id)
                .ok_or_else(|| CliError::Usage(format!("{} is not in state", id)))?;
            let json = serde_json::to_string_pretty(resource)
                .map_err(|e| CliError::Usage(format!("Failed to render {}: {}", id, e)))?;
            println!("{}", json);
            Ok(())
        }
        StateCommands::Rm {
            resource_type,
            name,
        } => {
            let id = ResourceId::new(resource_type, name);
            engine::remove_from_state(backend.as_ref(), &id).await?;
            println!("{} Removed {} from state.", "✓".green(), id);
            Ok(())
        }
    }
}

fn confirm(question: &str, hint: &str) -> CliResult<bool> {
    println!("{}", question.yellow().bold());
    println!("  {}", hint.yellow());
    print!("\n  Enter a value: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    println!();
    Ok(input.trim() == "yes")
}

fn finish(operation: &str, report: ApplyReport) -> CliResult<()> {
    println!();
    if report.is_success() {
        println!(
            "{}",
            format!("{} complete! {} changes applied.", operation, report.succeeded)
                .green()
                .bold()
        );
        Ok(())
    } else {
        println!(
            "{}",
            format!(
                "{} failed. {} succeeded, {} failed.",
                operation, report.succeeded, report.failed
            )
            .red()
            .bold()
        );
        Err(CliError::ApplyFailed {
            failed: report.failed,
            total: report.succeeded + report.failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_arguments() {
        let cli = Cli::try_parse_from([
            "stratus",
            "import",
            "securitylake_subscriber",
            "siem",
            "arn:aws:securitylake:us-east-1:123456789012:subscriber/9f3c",
            "--file",
            "lake.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Import {
                resource_type,
                name,
                identifier,
                file,
            } => {
                assert_eq!(resource_type, "securitylake_subscriber");
                assert_eq!(name, "siem");
                assert!(identifier.ends_with("subscriber/9f3c"));
                assert_eq!(file, PathBuf::from("lake.json"));
            }
            _ => panic!("Expected import command"),
        }
    }

    #[test]
    fn defaults_to_main_json() {
        let cli = Cli::try_parse_from(["stratus", "-vv", "apply", "--auto-approve"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Apply { file, auto_approve } => {
                assert_eq!(file, PathBuf::from("main.json"));
                assert!(auto_approve);
            }
            _ => panic!("Expected apply command"),
        }
    }

    #[test]
    fn state_subcommands_take_file_anywhere() {
        let cli =
            Cli::try_parse_from(["stratus", "state", "rm", "pipes_pipe", "orders", "-f", "p.json"])
                .unwrap();
        match cli.command {
            Commands::State {
                command: StateCommands::Rm { resource_type, name },
                file,
            } => {
                assert_eq!((resource_type.as_str(), name.as_str()), ("pipes_pipe", "orders"));
                assert_eq!(file, PathBuf::from("p.json"));
            }
            _ => panic!("Expected state rm command"),
        }
    }

    #[test]
    fn missing_optional_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("main.json");
        let config = load_config(&missing, false).unwrap();
        assert!(config.resources.is_empty());
        assert!(matches!(
            load_config(&missing, true),
            Err(CliError::Config(config::ConfigError::Read { .. }))
        ));
    }
}
