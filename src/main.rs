use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use exhibitor_sync::cancel::CancelFlag;
use exhibitor_sync::config::{Config, StoreBackend};
use exhibitor_sync::executor::Progress;
use exhibitor_sync::purge::PurgeConfirmation;
use exhibitor_sync::storage::{DirectoryStore, InMemoryDirectoryStore, JsonFileDirectoryStore};
use exhibitor_sync::{logging, metrics, report, ImportSession};

#[derive(Parser)]
#[command(name = "booth-sync")]
#[command(about = "Reconcile an exhibitor spreadsheet with an event's booth directory")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Event whose directory is targeted (defaults to the config / BOOTH_SYNC_EVENT_ID)
    #[arg(long, global = true)]
    event: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a source file and show the import plan without writing anything
    Preview {
        file: PathBuf,
        /// Print the plan as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Parse, review and apply a source file
    Import {
        file: PathBuf,
        /// Apply without the interactive confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Directory for the JSON run report
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// Delete every directory record of the event
    Purge {
        /// Event id typed back as confirmation; prompts when omitted
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Show the effective configuration
    Config {
        #[arg(long)]
        show: bool,
    },
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DirectoryStore>> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryDirectoryStore::new())),
        StoreBackend::Json => Ok(Arc::new(JsonFileDirectoryStore::new(config.store.path.clone()))),
        #[cfg(feature = "db")]
        StoreBackend::Libsql => {
            let store = exhibitor_sync::db::LibsqlDirectoryStore::from_env().await?;
            store.run_migrations().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "db"))]
        StoreBackend::Libsql => Err(anyhow::anyhow!("the libsql backend requires building with --features db")),
    }
}

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;

    logging::init_logging(&config.logging.dir);
    if config.metrics.enabled {
        metrics::init_metrics(config.metrics.port);
    }

    if let Commands::Config { show } = &cli.command {
        if *show {
            println!("{:#?}", config);
        }
        return Ok(());
    }

    let event_id = config.resolve_event_id(cli.event.as_deref())?;
    let store = open_store(&config).await?;
    let session = ImportSession::new(&event_id, store, config.source.clone());

    match cli.command {
        Commands::Preview { file, json } => {
            let plan = session.load_file(&file).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print!("{}", report::render_plan(&plan));
            }
        }
        Commands::Import {
            file,
            yes,
            report_dir,
        } => {
            println!("🔍 Building import plan for event {}...", event_id);
            let plan = session.load_file(&file).await?;
            print!("{}", report::render_plan(&plan));

            if plan.counts.to_update + plan.counts.to_insert == 0 {
                println!("\nNothing to apply.");
                return Ok(());
            }
            if !yes {
                let answer = prompt("\nApply this plan? [y/N]: ")?;
                if !answer.eq_ignore_ascii_case("y") && !answer.eq_ignore_ascii_case("yes") {
                    println!("Aborted; nothing was written.");
                    return Ok(());
                }
            }

            let cancel: CancelFlag = session.cancel_flag();
            cancel.cancel_on_ctrl_c();

            println!("\n🚀 Applying plan (Ctrl+C stops after the current row)...");
            let reporter = |p: &Progress| {
                let mark = if p.succeeded { "✔" } else { "✖" };
                println!("   {} {}/{} ({}%) {}", mark, p.processed, p.total, p.percent(), p.organization_name);
            };
            let result = session.execute(&reporter).await?;
            println!();
            print!("{}", report::render_result(&result));

            if let Some(dir) = report_dir {
                match report::persist_result(&result, &dir) {
                    Ok(path) => println!("💾 Saved report to {}", path.display()),
                    Err(e) => error!("Failed to save report: {}", e),
                }
            }
            info!("Import run complete for event {}", event_id);
        }
        Commands::Purge { confirm } => {
            println!("⚠️  WARNING: This will delete ALL directory records for event '{}'!", event_id);
            let typed = match confirm {
                Some(typed) => typed,
                None => prompt("Type the event id to confirm: ")?,
            };
            let confirmation = PurgeConfirmation::confirm(&event_id, &typed)?;

            println!("🗑️  Purging directory...");
            let outcome = session.purge(&confirmation).await?;
            println!("✅ Removed {} records from event {}", outcome.deleted, outcome.event_id);
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
