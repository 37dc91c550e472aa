//! Site constants and crawl parameters.
//!
//! Everything here is fixed per target site: the listing URL template, the
//! recipe-detail URL prefix used to recognize detail links, and the sentinels
//! for the link files written between the crawl and extraction passes.

use crate::models::Course;

/// Listing page for one `(course, page)` pair.
pub fn listing_url(course: Course, page: u32) -> String {
    format!(
        "https://vickypham.com/recipes-finder/?_cuisine=vietnamese&_courses={}&query-0-page={}",
        course.slug(),
        page
    )
}

/// Detail links on a listing page must contain this prefix to be recipes.
pub const RECIPE_URL_PREFIX: &str = "https://vickypham.com/blog/";

/// First line of every category link file: `"---- {course}\n"`.
pub const COURSE_DELIM: &str = "---- ";

/// Extension that marks category link files during the master merge scan.
pub const LINKS_FILE_EXT: &str = "cmo";

/// Merged, deduplicated master link file. Its presence is the resumability
/// checkpoint: the crawl phase is skipped entirely when it exists.
pub const MASTER_FILE_NAME: &str = "all_recipe_links.wow";

/// Courses never crawled.
pub const EXCLUDED_COURSES: &[Course] = &[Course::Snacks, Course::Drinks];

/// Upper bound (seconds) for the politeness delay after each request.
pub const DEFAULT_MAX_DELAY_SECS: u64 = 3;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";

/// Category link file name for one course.
pub fn course_links_file(course: Course) -> String {
    format!("{}_recipe_links.{}", course.slug(), LINKS_FILE_EXT)
}
