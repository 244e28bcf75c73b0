use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::info;
use photo_indexer::config::AppConfig;
use photo_indexer::extractor::MetadataRecordBuilder;
use photo_indexer::index::{templates, Indexor};
use photo_indexer::walker::{ExtractionResult, FilesystemExplorer};
use std::io::BufRead;
use std::path::PathBuf;

/// Extracts photo metadata under a directory and indexes it
#[derive(Debug, Parser)]
#[command(name = "photo_indexer", about = "Photo metadata indexer")]
struct Cli {
    /// Directory to explore
    path: PathBuf,

    /// Drop and re-create the index first
    #[arg(default_value_t = true, action = ArgAction::Set)]
    clear_index: bool,

    /// Overwrite photos already in the index
    #[arg(default_value_t = false, action = ArgAction::Set)]
    allow_update: bool,

    /// Limit the walk to this many directory levels
    #[arg(long, value_name = "DEPTH")]
    max_depth: Option<usize>,

    /// Config file to use instead of config/default + config/{RUN_MODE}
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::new()?,
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting photo_indexer");

    let indexor = Indexor::new(&config.indexor)?;
    if !indexor.is_connected().await {
        anyhow::bail!("Search cluster at {} is not reachable", indexor.endpoint());
    }

    if cli.clear_index {
        indexor.metadata_index()?.clear().await?;
        indexor.load_search_templates().await?;
    } else if !indexor.has_search_template(templates::YEAR_MONTH).await? {
        info!("Search templates missing, loading them");
        indexor.load_search_templates().await?;
    }

    let photos = indexor.photos()?.clone();
    let builder = MetadataRecordBuilder::from_config(&config.indexor.photo);
    let allow_update = cli.allow_update;
    let root = cli.path.clone();
    let max_depth = cli.max_depth;

    let result = tokio::task::spawn_blocking(move || {
        FilesystemExplorer::default().explore(&root, max_depth, |uri, file_type, raw| {
            let record = builder.build(uri, file_type, raw)?;
            futures::executor::block_on(photos.add(&record, allow_update))?;
            Ok(())
        })
    })
    .await?;

    report(&result);

    let photos = indexor.photos()?;
    photos.refresh().await?;
    println!("{} photo(s) in index '{}'", photos.count().await?, photos.index());

    tokio::task::spawn_blocking(wait_for_quit).await??;

    indexor.close().await;
    info!("photo_indexer finished");
    Ok(())
}

fn report(result: &ExtractionResult) {
    println!("Processed OK: {}", result.processed_ok);
    println!("Processed with errors: {}", result.processed_nok);
    println!("Skipped: {}", result.skipped);
    for message in &result.error_messages {
        println!("  {}", message);
    }
}

fn wait_for_quit() -> std::io::Result<()> {
    println!("Press Q then Enter to quit");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if line?.trim().eq_ignore_ascii_case("q") {
            break;
        }
    }
    Ok(())
}
