//! The extraction pass.
//!
//! Reads the category link files the crawler wrote (the delimiter line names
//! the course), fetches each detail page, extracts a dish and its raw
//! ingredient lines, normalizes the names, and writes everything to the
//! store. One page is fetched and fully handled before the next; the
//! fetcher's politeness delay paces the whole pass.
//!
//! Failure policy: transport and decode failures abort the run. A page
//! without a resolvable display name, an ingredient with no nouns left after
//! normalization, and an ingredient upsert answered with `None` are all
//! local gaps, skipped without touching their siblings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use scraper::Html;
use tokio::fs;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config;
use crate::errors::HarvestError;
use crate::extractor;
use crate::fetcher::Fetch;
use crate::models::{Course, Dish, NormalizedIngredient, RawIngredientLine};
use crate::normalizer::{self, NameNormalizer, PosLemmaTagger};
use crate::store::RecipeStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Detail pages fetched.
    pub pages: usize,
    /// Dishes persisted.
    pub dishes: usize,
    /// Pages dropped for lack of a resolvable display name.
    pub skipped: usize,
    /// Dish-ingredient links written.
    pub ingredients: usize,
}

/// Run the extraction pass over every category link file in `links_dir`.
#[instrument(level = "info", skip_all, fields(links_dir = %links_dir.display()))]
pub async fn process_recipes<F, S, T>(
    fetcher: &F,
    store: &mut S,
    normalizer: &NameNormalizer<T>,
    links_dir: &Path,
) -> Result<RunStats, HarvestError>
where
    F: Fetch,
    S: RecipeStore,
    T: PosLemmaTagger,
{
    store.update_pipeline_state(Uuid::max(), Utc::now())?;

    let mut stats = RunStats::default();
    let mut seen: HashSet<String> = HashSet::new();

    for path in category_files(links_dir).await? {
        let data = fs::read_to_string(&path)
            .await
            .map_err(|e| HarvestError::io(&path, e))?;

        let mut course: Option<Course> = None;
        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(slug) = line.strip_prefix(config::COURSE_DELIM) {
                course = Course::from_slug(slug.trim());
                if course.is_none() {
                    warn!(path = %path.display(), slug, "unknown course in delimiter line");
                }
                continue;
            }
            let Some(course) = course else {
                warn!(path = %path.display(), "link before any delimiter line, skipping");
                continue;
            };
            // A URL listed under several categories is handled once,
            // matching the master file's cross-category dedup.
            if !seen.insert(line.to_string()) {
                continue;
            }

            let body = fetcher.fetch(line).await?;
            stats.pages += 1;
            let document = Html::parse_document(&body);
            match extractor::extract_dish(&document, line, course, Utc::now()) {
                Some((dish, raw_lines)) => {
                    stats.ingredients += persist_dish(store, normalizer, &dish, &raw_lines)?;
                    stats.dishes += 1;
                }
                None => {
                    stats.skipped += 1;
                }
            }
        }
    }

    info!(
        pages = stats.pages,
        dishes = stats.dishes,
        skipped = stats.skipped,
        ingredients = stats.ingredients,
        "extraction pass complete"
    );
    Ok(stats)
}

/// Normalize one dish's ingredient batch and write the dish, its surviving
/// ingredients, and their join records.
fn persist_dish<S, T>(
    store: &mut S,
    normalizer_svc: &NameNormalizer<T>,
    dish: &Dish,
    raw_lines: &[RawIngredientLine],
) -> Result<usize, HarvestError>
where
    S: RecipeStore,
    T: PosLemmaTagger,
{
    let normalized: Vec<NormalizedIngredient> = raw_lines
        .iter()
        .map(|line| NormalizedIngredient {
            name: normalizer_svc.normalize(&line.name),
            amount: line.amount,
            unit: line.unit.clone(),
            created_at: line.created_at,
        })
        .collect();
    let names: Vec<String> = normalized.iter().map(|i| i.name.clone()).collect();
    let surviving: HashSet<String> = normalizer::post_process(&names).into_iter().collect();

    let dish_id = store.upsert_dish(dish)?;

    let mut linked: HashSet<String> = HashSet::new();
    let mut count = 0;
    for ingredient in &normalized {
        if ingredient.name.is_empty() {
            continue;
        }
        let canonical = normalizer::canonicalize(&ingredient.name);
        if !surviving.contains(&canonical) || !linked.insert(canonical.clone()) {
            continue;
        }
        match store.upsert_ingredient(&canonical, ingredient.created_at)? {
            Some(ingredient_id) => {
                store.link_dish_ingredient(
                    dish_id,
                    ingredient_id,
                    ingredient.amount,
                    &ingredient.unit,
                )?;
                count += 1;
            }
            None => {
                warn!(name = %canonical, "ingredient upsert returned nothing, skipping");
            }
        }
    }
    Ok(count)
}

/// Category link files under `links_dir`, in name order.
async fn category_files(links_dir: &Path) -> Result<Vec<PathBuf>, HarvestError> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(links_dir)
        .await
        .map_err(|e| HarvestError::io(links_dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| HarvestError::io(links_dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(config::LINKS_FILE_EXT) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
