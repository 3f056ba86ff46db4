use anyhow::Context;
use clap::{Parser, Subcommand};
use storage::{
    Database,
    services::{ParticipantCountSynchronizer, participant_count::DEFAULT_REPAIR_SAMPLE_LIMIT},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "padel-maintenance")]
#[command(about = "PadelParrot participant counter maintenance", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recount every match and print what was corrected
    Repair {
        #[arg(long, default_value_t = DEFAULT_REPAIR_SAMPLE_LIMIT)]
        sample_limit: usize,
    },
    /// List matches whose counter disagrees with their participants
    Drift,
    /// Recount a single match
    Recount { match_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("padel_maintenance={},storage={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Connecting to database...");
    let db = Database::with_max_connections(&cli.database_url, 5)
        .await
        .context("Failed to connect to database")?;
    let store = db.match_store();

    match cli.command {
        Commands::Repair { sample_limit } => {
            let sync = ParticipantCountSynchronizer::new(store).with_sample_limit(sample_limit);
            let report = sync.repair_all().await.context("Repair run failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.failed > 0 {
                anyhow::bail!("{} matches could not be repaired", report.failed);
            }
        }
        Commands::Drift => {
            let sync = ParticipantCountSynchronizer::new(store);
            let drift = sync
                .check_consistency()
                .await
                .context("Consistency check failed")?;
            if drift.is_empty() {
                tracing::info!("✓ All participant counters are consistent");
            } else {
                tracing::warn!("{} matches have drifted counters", drift.len());
            }
            println!("{}", serde_json::to_string_pretty(&drift)?);
        }
        Commands::Recount { match_id } => {
            let sync = ParticipantCountSynchronizer::new(store);
            let count = sync
                .recount(match_id)
                .await
                .with_context(|| format!("Failed to recount match {}", match_id))?;
            tracing::info!("✓ Match {} has {} joined players", match_id, count);
        }
    }

    Ok(())
}
