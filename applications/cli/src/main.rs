/// Wavecast - browse episodes and listening progress
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wavecast_cli::{App, AppConfig, EpisodeFilters};
use wavecast_core::{Category, Language};
use wavecast_progress::DEFAULT_RECENT_LIMIT;

#[derive(Parser)]
#[command(name = "wavecast")]
#[command(about = "Browse Wavecast episodes and listening progress", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./wavecast.toml when present)
    #[arg(long, global = true, env = "WAVECAST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List published episodes, newest first
    Episodes {
        /// Only this language (zh-TW, en-US, ja-JP)
        #[arg(short, long)]
        language: Option<Language>,
        /// Only this category (daily-news, ethereum, macro, startup, ai, defi)
        #[arg(short, long)]
        category: Option<Category>,
        /// Case-insensitive text search
        #[arg(short, long)]
        query: Option<String>,
        /// Show at most this many episodes
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show listing service settings and check that it responds
    Status,
    /// Inspect or clear saved listening progress
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
}

#[derive(Subcommand)]
enum ProgressAction {
    /// Saved position of one episode
    Show {
        /// Episode ID
        episode_id: String,
    },
    /// Most recently played episodes
    Recent {
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// Episodes started but not finished
    Unfinished,
    /// Forget one episode
    Clear {
        /// Episode ID
        episode_id: String,
    },
    /// Forget every episode
    ClearAll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stdout carries command output)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wavecast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "Configuration loaded");
    let app = App::new(config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Episodes {
            language,
            category,
            query,
            limit,
        } => {
            let filters = EpisodeFilters {
                language,
                category,
                query,
                limit,
            };
            app.episodes(&mut out, filters).await?;
        }
        Commands::Status => {
            app.status(&mut out).await?;
        }
        Commands::Progress { action } => match action {
            ProgressAction::Show { episode_id } => app.show_progress(&mut out, &episode_id)?,
            ProgressAction::Recent { limit } => app.recent(&mut out, limit)?,
            ProgressAction::Unfinished => app.unfinished(&mut out)?,
            ProgressAction::Clear { episode_id } => app.clear(&mut out, &episode_id)?,
            ProgressAction::ClearAll => app.clear_all(&mut out)?,
        },
    }

    Ok(())
}
