use anyhow::Result;
use clap::Parser;
use mockview_application::{RetryPolicy, RunController};
use mockview_core::config::GenerationProvider;
use mockview_core::generation::QuestionGenerator;
use mockview_core::interview::InterviewRepository;
use mockview_core::session::TurnStore;
use mockview_infrastructure::{
    ConfigService, DirInterviewRepository, DirTurnStore, MockviewPaths,
};
use mockview_interaction::{ClaudeGenerator, ScriptedGenerator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod routes;

use routes::AppState;

#[derive(Parser)]
#[command(name = "mockview-server")]
#[command(about = "Mockview - AI mock-interview session server", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to ~/.config/mockview/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config file
    #[arg(long)]
    bind: Option<String>,

    /// Use the deterministic scripted generator (no network, no API key)
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    let config = config_service.get_config();

    let data_dir = MockviewPaths::data_dir()?;
    let interviews: Arc<dyn InterviewRepository> =
        Arc::new(DirInterviewRepository::new(&data_dir).await?);
    let turn_store: Arc<dyn TurnStore> = Arc::new(DirTurnStore::new(&data_dir).await?);

    let generator: Arc<dyn QuestionGenerator> =
        if cli.offline || config.generation.provider == GenerationProvider::Scripted {
            tracing::info!(target: "server", "Using scripted question generator");
            Arc::new(ScriptedGenerator::new())
        } else {
            match ClaudeGenerator::try_from_config(&config.generation) {
                Ok(generator) => Arc::new(generator),
                Err(e) => {
                    tracing::warn!(
                        target: "server",
                        "Claude generator unavailable ({}), falling back to scripted",
                        e
                    );
                    Arc::new(ScriptedGenerator::new())
                }
            }
        };

    let controller = Arc::new(RunController::new(
        interviews.clone(),
        turn_store.clone(),
        generator,
        RetryPolicy::from_config(&config.generation),
        &config.guard,
    ));

    let app = routes::router(Arc::new(AppState {
        controller,
        interviews,
        turn_store,
    }));

    let bind = cli.bind.unwrap_or(config.server.bind);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(target: "server", "Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}
