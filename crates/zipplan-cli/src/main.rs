mod analyze_cmd;
mod build_cmd;
mod compact_cmd;
mod config;
mod lookup_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use zipplan_core::lookup::LookupService;
use zipplan_store::config::StoreConfig;

use config::ZipplanConfig;

#[derive(Parser)]
#[command(name = "zipplan", about = "Resolve postal codes to insurance plan offerings")]
struct Cli {
    /// Data directory holding snapshots (overrides ZIPPLAN_DATA_DIR env var)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a zipplan config file with every default spelled out
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Rebuild the snapshot from the landscape, detail and ZIP mapping sources
    Build,
    /// Print per-state statistics of the landscape file
    Analyze {
        /// Landscape CSV to analyze (defaults to the configured source)
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the canonical plans of a state straight from the landscape file
    Plans {
        /// State abbreviation (e.g. NH)
        state: String,
    },
    /// Write compact documents for every ZIP code of the snapshot
    Compact {
        /// Output directory (defaults to <data-dir>/compact)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the plans available in a ZIP code
    Zip {
        /// State abbreviation (e.g. nh)
        state: String,
        /// Five-digit ZIP code
        zip: String,
        /// List plan summaries only
        #[arg(long)]
        summary: bool,
        /// Print the JSON response
        #[arg(long)]
        json: bool,
    },
    /// Show one plan with its detail document
    Plan {
        /// State abbreviation (e.g. nh)
        state: String,
        /// Composite plan id (e.g. H1234_001_0)
        plan_id: String,
    },
    /// List the counties of a state with plan counts
    Counties {
        /// State abbreviation (e.g. nh)
        state: String,
    },
    /// List the states in the snapshot
    States,
    /// Load the snapshot and report its health
    Health,
    /// Serve lookups over HTTP
    Serve {
        /// Address to bind (overrides [server] bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides [server] port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Execute the `zipplan init` command: write config file.
fn cmd_init(data_dir: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let data_dir = data_dir.unwrap_or_else(|| Path::new(StoreConfig::DEFAULT_DIR));
    let cfg = config::ConfigFile::with_defaults(data_dir);
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  data.dir = {}", data_dir.display());
    println!("  states = {}", cfg.states.iter().map(|s| s.abbr.as_str()).collect::<Vec<_>>().join(", "));
    println!();
    println!("Next: point [source] at your data and run `zipplan build`.");

    Ok(())
}

/// Load the current snapshot, failing before anything is served.
fn load_service(config: &ZipplanConfig) -> anyhow::Result<LookupService> {
    LookupService::load(&config.store).with_context(|| {
        format!(
            "failed to load snapshot from {} (run `zipplan build` first)",
            config.store.current_dir().display()
        )
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(cli.data_dir.as_deref(), force)?;
        }
        Commands::Build => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            build_cmd::run_build(&resolved)?;
        }
        Commands::Analyze { csv, json } => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            let csv = csv.unwrap_or(resolved.source.landscape_csv);
            analyze_cmd::run_analyze(&csv, json)?;
        }
        Commands::Plans { state } => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            let info = resolved.state(&state)?.clone();
            analyze_cmd::run_plans(&resolved, &info)?;
        }
        Commands::Compact { out } => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            compact_cmd::run_compact(&resolved, out)?;
        }
        Commands::Zip {
            state,
            zip,
            summary,
            json,
        } => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            let service = load_service(&resolved)?;
            lookup_cmds::run_zip(&service, &state, &zip, !summary, json)?;
        }
        Commands::Plan { state, plan_id } => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            let service = load_service(&resolved)?;
            lookup_cmds::run_plan(&service, &state, &plan_id, resolved.source.plan_year)?;
        }
        Commands::Counties { state } => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            let service = load_service(&resolved)?;
            lookup_cmds::run_counties(&service, &state)?;
        }
        Commands::States => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            let service = load_service(&resolved)?;
            lookup_cmds::run_states(&service)?;
        }
        Commands::Health => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            let service = load_service(&resolved)?;
            lookup_cmds::run_health(&service)?;
        }
        Commands::Serve { bind, port } => {
            let resolved = ZipplanConfig::resolve(cli.data_dir.as_deref())?;
            let bind = bind.unwrap_or_else(|| resolved.server.bind.clone());
            let port = port.unwrap_or(resolved.server.port);

            // Loading is blocking file I/O; finish it before accepting requests.
            let loader = resolved.clone();
            let service = tokio::task::spawn_blocking(move || load_service(&loader))
                .await
                .context("snapshot load task panicked")??;
            serve_cmd::run_serve(Arc::new(service), &bind, port).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "zipplan", &mut std::io::stdout());
        }
    }

    Ok(())
}
