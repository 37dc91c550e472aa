//! # Recipe Harvest
//!
//! A scraping and normalization pipeline for a recipe content site. It
//! discovers recipe-detail links from per-category listing pages, extracts
//! structured dish and ingredient records from each detail page, normalizes
//! free-text ingredient names into canonical tokens, and writes everything
//! to a persistence sink.
//!
//! ## Usage
//!
//! ```sh
//! recipe_harvest -l ./links -o ./out --tokenizer-bin ./en_tokenizer.bin
//! ```
//!
//! ## Architecture
//!
//! The pipeline runs in two sequential phases:
//! 1. **Crawl**: paginate every category listing, write per-category link
//!    files and the merged master link file (skipped when the master file
//!    already exists)
//! 2. **Extract**: fetch every discovered detail page, extract and normalize,
//!    write dishes/ingredients/links to the store
//!
//! All network access is serialized and paced by a randomized politeness
//! delay after each request.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod crawler;
mod errors;
mod extractor;
mod fetcher;
mod models;
mod normalizer;
mod processor;
mod store;
mod utils;

use cli::Cli;
use crawler::LinkCrawler;
use errors::HarvestError;
use fetcher::PageFetcher;
use normalizer::{NameNormalizer, NlpTagger};
use store::JsonlStore;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "run aborted");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<(), HarvestError> {
    let start_time = std::time::Instant::now();
    info!("recipe_harvest starting up");

    let args = Cli::parse();
    info!(
        links_dir = %args.links_dir,
        output_dir = %args.output_dir,
        max_delay_secs = args.max_delay_secs,
        "configuration loaded"
    );

    let fetcher = PageFetcher::new(&args.user_agent, args.max_delay_secs)?;

    // ---- Phase 1: link discovery ----
    let link_crawler = LinkCrawler::new(&fetcher, &args.links_dir);
    link_crawler.crawl().await?;

    // ---- Phase 2: extraction ----
    let tagger = NlpTagger::from_path(Path::new(&args.tokenizer_bin))?;
    let normalizer = NameNormalizer::new(tagger);
    let mut store = JsonlStore::open(&args.output_dir)?;

    let stats = processor::process_recipes(
        &fetcher,
        &mut store,
        &normalizer,
        Path::new(&args.links_dir),
    )
    .await?;

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        pages = stats.pages,
        dishes = stats.dishes,
        skipped = stats.skipped,
        ingredients = stats.ingredients,
        "execution complete"
    );
    Ok(())
}
