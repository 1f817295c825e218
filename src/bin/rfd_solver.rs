//! rfd-solver: command-line front end for the RFD pipeline.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use rfd_solver::config::{Config, Secrets};
use rfd_solver::{DataType, Pipeline, Rfd, artifact};

/// Cache-first solver for Request-for-Data queries
#[derive(Parser)]
#[command(name = "rfd-solver")]
#[command(version = rfd_solver::PKG_VERSION)]
#[command(about = "Solve RFDs from the IPFS cache or live from PokéAPI")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "RFD_SOLVER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve an RFD file and write `<rfd_id>_solution.json`
    Solve {
        /// RFD JSON file
        file: PathBuf,
        /// Also pin the solution to IPFS and print its URI
        #[arg(long)]
        publish: bool,
        /// Output directory (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build and solve an RFD from flags
    Quick {
        /// Data type: entity, moves, abilities, types, evolution
        #[arg(short = 't', long = "type", default_value = "entity")]
        data_type: DataType,
        /// Generation (entity only)
        #[arg(short, long)]
        generation: Option<u8>,
        /// Number of records
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u32,
        /// Elemental type filter (entity and moves)
        #[arg(long)]
        type_filter: Option<String>,
    },

    /// Show cache statistics
    Stats,

    /// Remove expired cache entries
    Sweep,

    /// Remove every cache entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialise tracing (default: info; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let pipeline = config.pipeline(&secrets)?;

    match args.command {
        Command::Solve {
            file,
            publish,
            output,
        } => {
            let rfd = Rfd::from_path(&file)?;
            let output = output.unwrap_or_else(|| config.output.dir.clone());
            let artifact = run(&pipeline, &rfd).await?;
            let path = artifact::write_local(&output, &artifact.dataset)?;
            println!("solution: {}", path.display());
            if publish {
                match config.pinata_client(&secrets)? {
                    Some(client) => {
                        let cid = client.pin_artifact(&artifact.dataset).await?;
                        println!("published: {}", cid.storage_uri());
                    }
                    None => {
                        eprintln!("cannot publish: Pinata credentials not configured");
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }
        }

        Command::Quick {
            data_type,
            generation,
            count,
            type_filter,
        } => {
            let mut request = json!({
                "rfd_id": format!("quick-{}", chrono::Utc::now().timestamp()),
                "name": "quick",
                "data_type": data_type.as_str(),
                "num_records": count,
            });
            if let Some(generation) = generation {
                request["generation"] = json!(generation);
            }
            if let Some(type_filter) = type_filter {
                request["type_filter"] = json!(type_filter);
            }
            let rfd = Rfd::from_value(request)?;
            let artifact = run(&pipeline, &rfd).await?;
            println!("{}", serde_json::to_string_pretty(&artifact.dataset)?);
        }

        Command::Stats => {
            let cache = pipeline.cache();
            cache.refresh_index().await;
            cache.check_connectivity().await;
            println!("{}", serde_json::to_string_pretty(&cache.stats())?);
        }

        Command::Sweep => {
            let cache = pipeline.cache();
            cache.refresh_index().await;
            let swept = cache.sweep_expired().await;
            println!("removed {swept} expired entries");
        }

        Command::Clear => {
            let report = pipeline.cache().clear().await;
            println!("removed {} entries", report.removed.len());
            for (key, cause) in &report.failed {
                eprintln!("failed to remove {key}: {cause}");
            }
            if !report.is_complete() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Solve with the index warmed from the backend, printing a summary line.
async fn run(
    pipeline: &Pipeline,
    rfd: &Rfd,
) -> Result<rfd_solver::Artifact, rfd_solver::PipelineError> {
    pipeline.cache().refresh_index().await;
    let artifact = pipeline.solve(rfd).await?;
    let metadata = &artifact.dataset.metadata;
    eprintln!(
        "rfd {}: {} records ({}){}",
        rfd.rfd_id,
        metadata.count,
        metadata.source.as_str(),
        metadata
            .shortfall
            .map(|s| format!(", {} short of {}", s.missing(), s.requested))
            .unwrap_or_default()
    );
    if let Some(uri) = artifact.storage_uri() {
        eprintln!("cache entry: {uri}");
    }
    Ok(artifact)
}
