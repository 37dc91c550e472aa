//! Core data types flowing through the pipeline.
//!
//! - [`Course`]: the closed set of category tags used for crawl partitioning
//!   and dish labeling
//! - [`Dish`]: one extracted recipe page
//! - [`RawIngredientLine`]: an ingredient line as read from markup, before
//!   name normalization
//! - [`NormalizedIngredient`]: the same shape after normalization
//! - [`PipelineState`]: the version/last-scraped marker the store keeps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recipe category tag. The set is fixed; crawling skips the courses in
/// [`crate::config::EXCLUDED_COURSES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Course {
    MainDishes,
    Appetizers,
    Breakfast,
    Desserts,
    Drinks,
    Salads,
    SideDishes,
    Snacks,
    Soups,
}

impl Course {
    pub const ALL: [Course; 9] = [
        Course::MainDishes,
        Course::Appetizers,
        Course::Breakfast,
        Course::Desserts,
        Course::Drinks,
        Course::Salads,
        Course::SideDishes,
        Course::Snacks,
        Course::Soups,
    ];

    /// The tag as it appears in listing URLs and link-file delimiter lines.
    pub fn slug(&self) -> &'static str {
        match self {
            Course::MainDishes => "main-dishes",
            Course::Appetizers => "appetizers",
            Course::Breakfast => "breakfast",
            Course::Desserts => "desserts",
            Course::Drinks => "drinks",
            Course::Salads => "salads",
            Course::SideDishes => "side-dishes",
            Course::Snacks => "snacks",
            Course::Soups => "soups",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Course> {
        Course::ALL.iter().copied().find(|c| c.slug() == slug)
    }

    /// Courses that take part in the crawl, in fixed order.
    pub fn crawlable() -> impl Iterator<Item = Course> {
        Course::ALL
            .into_iter()
            .filter(|c| !crate::config::EXCLUDED_COURSES.contains(c))
    }
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// One extracted recipe page.
///
/// `display_name` is always the non-native-script variant of the title;
/// `alternate_name` holds the other script's rendering with its combining
/// diacritics stripped. A dish with an empty `display_name` is never
/// constructed; the extractor drops it instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dish {
    pub source_url: String,
    pub course: Course,
    pub display_name: String,
    pub alternate_name: Option<String>,
    pub description: String,
    pub full_recipe_html: String,
    pub created_at: DateTime<Utc>,
}

/// An ingredient line exactly as extracted from markup.
///
/// `amount` defaults to `0.0` and `unit` to the `"N/A"` sentinel when the
/// source markup carries no structured quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIngredientLine {
    pub name: String,
    pub amount: f64,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

/// An ingredient line after name normalization. `name` is a lowercase,
/// space-joined noun-lemma string; canonicalization to underscores happens in
/// the batch post-process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIngredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

/// Version marker the persistence layer keeps for the whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    pub version: Uuid,
    pub last_scraped: DateTime<Utc>,
}
