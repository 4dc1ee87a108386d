pub mod commands;

use clap::{Parser, Subcommand};

use crate::domain::CategoryKey;

#[derive(Parser)]
#[command(name = "preprint")]
#[command(about = "Browse and search the arXiv catalog from the terminal", long_about = None)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the latest submissions across cs, math and physics
    Latest,
    /// Browse one subject archive (cs, math, physics, q-bio, q-fin, stat, eess, econ)
    Browse {
        category: CategoryKey,
    },
    /// Free-text search
    Search {
        /// Words or a phrase to search for
        query: String,

        /// Restrict results to one archive, e.g. "cs"
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Toggle the favorite flag of a paper
    Favorite {
        /// Paper id, e.g. 2403.01234v1
        id: String,

        /// Load this view first so papers not yet stored can be found
        #[arg(short, long)]
        from: Option<CategoryKey>,
    },
    /// List favorite papers, newest first
    Favorites,
    /// List every paper kept in the local database
    Stored,
    /// Keep refreshing the configured views in the foreground
    Watch {
        /// Refresh interval (e.g., "30m", "1h", "1d"); enables refreshing
        /// even when the config disables it
        #[arg(short, long)]
        interval: Option<String>,
    },
}
