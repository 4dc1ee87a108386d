use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use preprint::app::AppContext;
use preprint::cli::{commands, Cli, Commands};
use preprint::config::Config;
use preprint::domain::CategoryKey;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(&config, None)?;

    match cli.command {
        Commands::Latest => {
            commands::show_category(&ctx, CategoryKey::Latest, cli.json).await?;
        }
        Commands::Browse { category } => {
            commands::show_category(&ctx, category, cli.json).await?;
        }
        Commands::Search { query, category } => {
            commands::search(&ctx, &query, category.as_deref(), cli.json).await?;
        }
        Commands::Favorite { id, from } => {
            commands::toggle_favorite(&ctx, &id, from, cli.json).await?;
        }
        Commands::Favorites => {
            commands::list_favorites(&ctx, cli.json).await?;
        }
        Commands::Stored => {
            commands::list_stored(&ctx, cli.json).await?;
        }
        Commands::Watch { interval } => {
            commands::watch(&ctx, interval.as_deref()).await?;
        }
    }

    Ok(())
}
