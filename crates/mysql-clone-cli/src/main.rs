//! mysql-clone CLI - clone a remote MySQL schema to a local target.

use clap::{Parser, Subcommand};
use mysql_clone::{CloneError, Config, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mysql-clone")]
#[command(about = "Clone a remote MySQL schema to a local target over an SSH tunnel")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON run report to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a clone
    Run {
        /// Override target schema
        #[arg(long)]
        target_schema: Option<String>,

        /// Override the comma-separated data exclusion list
        #[arg(long)]
        exclude: Option<String>,

        /// Keep dump directories after a successful load
        #[arg(long)]
        keep_dump: bool,

        /// Dry run: open the tunnel, resolve tables, and show the plan
        /// without moving any data
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CloneError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run {
            target_schema,
            exclude,
            keep_dump,
            dry_run,
        } => {
            // Apply overrides
            if let Some(schema) = target_schema {
                config.target.schema = Some(schema);
                config.target.timestamp_schema = false;
            }
            if let Some(spec) = exclude {
                config.clone.exclude_tables_data = spec;
            }
            if keep_dump {
                config.clone.keep_dump = true;
            }
            config.validate()?;

            let report = Orchestrator::new(config).run(dry_run).await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                let status_msg = if dry_run {
                    "Dry run completed!"
                } else {
                    "Clone completed!"
                };
                println!("\n{}", status_msg);
                println!("  Run ID: {}", report.run_id);
                println!("  Schema: {} -> {}", report.source_schema, report.target_schema);
                println!("  Plan: {}", report.plan);
                println!(
                    "  Tables: {} ({} excluded from data)",
                    report.tables_total, report.tables_data_excluded
                );
                println!("  Duration: {:.2}s", report.duration_seconds);
                if report.dump_kept {
                    println!("  Kept dumps: {:?}", report.dump_dirs);
                }
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
