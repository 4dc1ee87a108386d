use std::sync::Arc;

use serde::Serialize;

use crate::app::{AppContext, PreprintError, Result};
use crate::config::RefreshConfig;
use crate::coordinator::LoadState;
use crate::domain::{CategoryKey, Paper};
use crate::refresher::Refresher;

#[derive(Serialize)]
struct ViewOutput<'a> {
    category: CategoryKey,
    state: LoadState,
    papers: &'a [Paper],
}

pub async fn show_category(ctx: &AppContext, key: CategoryKey, json: bool) -> Result<()> {
    ctx.coordinator.reload(key).await?;
    print_view(ctx, key, json)
}

pub async fn search(
    ctx: &AppContext,
    query: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    ctx.coordinator.search(query, category).await?;
    print_view(ctx, CategoryKey::Search, json)
}

pub async fn toggle_favorite(
    ctx: &AppContext,
    id: &str,
    from: Option<CategoryKey>,
    json: bool,
) -> Result<()> {
    if let Some(key) = from {
        ctx.coordinator.reload(key).await?;
    }

    let outcome = ctx.coordinator.toggle_favorite(id).await?;
    if let Some(e) = &outcome.store_error {
        eprintln!("Warning: change was not saved: {}", e);
    }

    if json {
        return print_json(&outcome.paper);
    }

    let verb = if outcome.paper.is_favorite {
        "Favorited"
    } else {
        "Unfavorited"
    };
    println!("{}: {}", verb, outcome.paper.title);
    Ok(())
}

pub async fn list_favorites(ctx: &AppContext, json: bool) -> Result<()> {
    ctx.coordinator.load_favorites().await?;
    print_view(ctx, CategoryKey::Favorites, json)
}

pub async fn list_stored(ctx: &AppContext, json: bool) -> Result<()> {
    let papers = ctx.coordinator.stored_papers().await?;

    if json {
        return print_json(&papers);
    }
    if papers.is_empty() {
        println!("No stored papers");
        return Ok(());
    }
    for paper in &papers {
        print_paper(paper);
    }
    Ok(())
}

pub async fn watch(ctx: &AppContext, interval: Option<&str>) -> Result<()> {
    let mut config = ctx.config.refresh.clone();
    if let Some(interval) = interval {
        config.interval = interval.to_string();
        config.enabled = true;
    }

    let refresher = Arc::new(Refresher::new(&config)?);
    if !refresher.is_enabled() {
        println!("Auto-refresh is disabled; set [refresh] enabled = true or pass --interval");
        return Ok(());
    }
    let stopper = refresher.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        stopper.stop();
    });

    println!(
        "Refreshing every {} (Ctrl-C to stop)",
        RefreshConfig::format_interval(refresher.interval().as_secs())
    );
    refresher.run(&ctx.coordinator).await;
    Ok(())
}

fn print_view(ctx: &AppContext, key: CategoryKey, json: bool) -> Result<()> {
    let papers = ctx.coordinator.papers(key);

    if json {
        return print_json(&ViewOutput {
            category: key,
            state: ctx.coordinator.load_state(key),
            papers: &papers,
        });
    }

    if papers.is_empty() {
        println!("No papers in {}", key.display_name());
        return Ok(());
    }

    println!("{} ({} papers)", key.display_name(), papers.len());
    for paper in &papers {
        print_paper(paper);
    }
    Ok(())
}

fn print_paper(paper: &Paper) {
    let star = if paper.is_favorite { "★" } else { " " };
    println!(
        "{} {:<16} {}  {} [{}]",
        star,
        paper.id,
        paper.published_at.format("%Y-%m-%d"),
        paper.title,
        paper.categories_joined()
    );
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| PreprintError::Io(format!("Failed to encode JSON: {}", e)))?;
    println!("{}", out);
    Ok(())
}
