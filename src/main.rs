use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use game_shelf::{CatalogStore, ImageLibrary, MasterListIndex};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("progress") => {
            let limit = args
                .get(2)
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(20);
            run_progress(limit)
        }
        Some("missing") => run_missing(),
        Some("catalog") | None => run_catalog(),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: game-shelf [catalog | missing | progress [N]]");
            std::process::exit(2);
        }
    }
}

/// Directory roots come from the environment, with repo-layout defaults.
fn env_dir(var: &str, default: &str) -> PathBuf {
    env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn open_catalog() -> Arc<CatalogStore> {
    let games_dir = env_dir("SHELF_GAMES_DIR", "games");
    let images_dir = env_dir("SHELF_IMAGES_DIR", "images");
    Arc::new(CatalogStore::new(games_dir, ImageLibrary::new(images_dir)))
}

/// Default mode: load the catalog and print a summary.
fn run_catalog() -> Result<()> {
    println!("🎲 Game Shelf - Catalog");
    println!("━━━━━━━━━━━━━━━━━━━━━━━");

    let catalog = open_catalog();
    let snapshot = catalog.load_all();

    let with_images = snapshot.games.iter().filter(|g| g.has_image).count();

    println!("\n📚 Games catalogued: {}", snapshot.games.len());
    println!("🖼️  With cover image: {}", with_images);
    println!("   Missing image:    {}", snapshot.games.len() - with_images);

    if !snapshot.warnings.is_empty() {
        println!("\n⚠️  {} record file(s) skipped:", snapshot.warnings.len());
        for warning in &snapshot.warnings {
            println!("   {} - {}", warning.file, warning.reason);
        }
    }

    Ok(())
}

/// Missing mode: every game without a cover image, with its publishers,
/// so image-chasing can go publisher by publisher.
fn run_missing() -> Result<()> {
    println!("🖼️  Game Shelf - Missing Images");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let catalog = open_catalog();
    let snapshot = catalog.load_all();
    let missing = snapshot.missing_images();

    println!("\nGames missing images: {}\n", missing.len());
    for game in missing {
        let year = game
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "?".to_string());
        let publishers = if game.publisher.is_empty() {
            "unknown".to_string()
        } else {
            game.publisher.join(", ")
        };
        println!("  {} ({}) - {}", game.sort_key(), year, publishers);
    }

    Ok(())
}

/// Progress mode: reconcile the source lists and show what to research
/// next, most-nominated candidates first.
fn run_progress(limit: usize) -> Result<()> {
    println!("🗂️  Game Shelf - Research Progress");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let catalog = open_catalog();
    let lists_dir = env_dir("SHELF_LISTS_DIR", "sources/lists");
    let index = MasterListIndex::new(lists_dir, catalog);

    let snapshot = index.load();

    println!("\n📋 Candidates on source lists: {}", snapshot.total);
    println!("✓  Already researched:         {}", snapshot.researched);
    println!("   Remaining:                  {}", snapshot.total - snapshot.researched);

    if limit > 0 {
        println!("\n🔜 Next up (top {} by source count):", limit);
        for candidate in snapshot
            .games
            .iter()
            .filter(|c| !c.researched)
            .take(limit)
        {
            let year = candidate
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!(
                "   [{}] {} ({}) - {}",
                candidate.source_count,
                candidate.name,
                year,
                candidate.sources.join(", ")
            );
        }
    }

    if !snapshot.warnings.is_empty() {
        println!("\n⚠️  {} list file(s) skipped:", snapshot.warnings.len());
        for warning in &snapshot.warnings {
            println!("   {} - {}", warning.file, warning.reason);
        }
    }

    Ok(())
}
