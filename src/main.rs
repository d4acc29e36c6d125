use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drillbook::api::{self, AppState};
use drillbook::backend::CatalogBackend;
use drillbook::composer::DrillCatalogAdapter;
use drillbook::config::PlannerConfig;
use drillbook::models::{CreateDrillInput, Difficulty, Drill, DrillQuery};

#[derive(Parser)]
#[command(name = "drillbook")]
#[command(about = "Plan coaching sessions from a drill catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the drillbook server
    Serve {
        /// Port for HTTP API (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List catalog drills
    Drills {
        /// Only drills for this component (case-insensitive exact match)
        #[arg(short, long)]
        component: Option<String>,

        /// Only drills of this difficulty
        #[arg(short, long, value_parser = Difficulty::parse_filter)]
        difficulty: Option<Difficulty>,
    },
    /// Import drills from a JSON array into the local catalog
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// List saved sessions
    Sessions,
}

/// Initialize tracing with output to stderr (for listing commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "drillbook=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Listing commands print to stdout, keep it clean for piping
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(config: &PlannerConfig, port: u16) -> anyhow::Result<()> {
    let db = config.open_database()?;
    let catalog = config.catalog_backend(&db);
    tracing::info!("Drafts draw drills from the {}", catalog.describe());

    // Not fatal: drafts report the catalog as unavailable until it comes up
    if let CatalogBackend::Remote(client) = &catalog {
        if let Err(e) = client.health().await {
            tracing::warn!("Remote catalog is not reachable yet: {}", e);
        }
    }

    let state = AppState::new(db, catalog).with_draft_ttl(config.draft_ttl());
    state.spawn_draft_sweeper(Duration::from_secs(60));
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("drillbook server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    let config = PlannerConfig::load();

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.port);
            serve(&config, port).await?;
        }
        Some(Commands::Drills {
            component,
            difficulty,
        }) => {
            let db = config.open_database()?;
            let catalog = config.catalog_backend(&db);
            let drills: Vec<Drill> = DrillCatalogAdapter::new(catalog)
                .fetch(DrillQuery {
                    component,
                    difficulty,
                })
                .await?
                .collect();

            for drill in &drills {
                println!(
                    "{}  {:<28} {:<16} {:>3} min  {}",
                    drill.id, drill.name, drill.component, drill.duration_minutes, drill.difficulty
                );
            }
            println!("{} drill(s)", drills.len());
        }
        Some(Commands::Import { file }) => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let inputs: Vec<CreateDrillInput> =
                serde_json::from_str(&content).context("Failed to parse drill file")?;

            let db = config.open_database()?;
            let count = db.import_drills(inputs)?;
            println!("Imported {} drill(s)", count);
        }
        Some(Commands::Sessions) => {
            let db = config.open_database()?;
            for session in db.list_sessions()? {
                println!(
                    "{}  {:<28} {:>3}/{:<3} min  {} players  {} components",
                    session.id,
                    session.name,
                    session.planned_total,
                    session.total_duration,
                    session.player_count,
                    session.component_count
                );
            }
        }
        None => {
            serve(&config, config.port).await?;
        }
    }

    Ok(())
}
