//! Link discovery across the site's per-category listing pages.
//!
//! Each category is paginated until its "next page" control disappears. The
//! links found are deduplicated (first seen wins) and written to a category
//! link file, then a second pass merges every category file into the single
//! master link file. The master file doubles as the resumability checkpoint:
//! if it already exists the whole crawl phase is a no-op. There is no
//! partial-crawl recovery beyond that; a crash mid-category means deleting
//! the master file and rerunning from scratch.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config;
use crate::errors::HarvestError;
use crate::fetcher::Fetch;
use crate::models::Course;

static POST_TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".wp-block-post-title a[href]").unwrap());
static NEXT_PAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".wp-block-query-pagination-next").unwrap());

pub struct LinkCrawler<'a, F> {
    fetcher: &'a F,
    links_dir: PathBuf,
}

impl<'a, F: Fetch> LinkCrawler<'a, F> {
    pub fn new(fetcher: &'a F, links_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            links_dir: links_dir.into(),
        }
    }

    /// Run the whole crawl phase: every crawlable course, then the master
    /// merge. Skipped entirely when the master link file already exists.
    #[instrument(level = "info", skip_all)]
    pub async fn crawl(&self) -> Result<(), HarvestError> {
        let master = self.links_dir.join(config::MASTER_FILE_NAME);
        if fs::try_exists(&master)
            .await
            .map_err(|e| HarvestError::io(&master, e))?
        {
            info!(path = %master.display(), "master link file present, skipping crawl");
            return Ok(());
        }

        fs::create_dir_all(&self.links_dir)
            .await
            .map_err(|e| HarvestError::io(&self.links_dir, e))?;

        info!("no master link file found, crawling");
        for course in Course::crawlable() {
            info!(%course, "crawling course");
            let links = self.crawl_course(course).await?;
            save_links(&self.links_dir, course, &links).await?;
        }

        merge_master(&self.links_dir).await
    }

    /// Paginate one category's listing until the pagination control is gone.
    async fn crawl_course(&self, course: Course) -> Result<Vec<String>, HarvestError> {
        let mut links = Vec::new();
        let mut page: u32 = 0;
        let mut has_more = true;

        while has_more {
            let url = config::listing_url(course, page);
            info!(%course, page, "processing listing page");
            let body = self.fetcher.fetch(&url).await?;
            let document = Html::parse_document(&body);
            collect_recipe_links(&document, &url, &mut links);

            if has_next_page(&document) {
                page += 1;
            } else {
                info!(%course, pages = page + 1, "no more pages, terminating link crawl");
                has_more = false;
            }
        }

        Ok(links)
    }
}

/// Pull recipe-detail links out of a listing page.
///
/// Only anchors under the listing's post-title elements count, and only when
/// the resolved href matches the recipe URL template.
fn collect_recipe_links(document: &Html, listing_url: &str, links: &mut Vec<String>) {
    let base = Url::parse(listing_url).ok();
    for element in document.select(&POST_TITLE_LINK) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let resolved = match &base {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        };
        if resolved.contains(config::RECIPE_URL_PREFIX) {
            debug!(link = %resolved, "found recipe link");
            links.push(resolved);
        }
    }
}

/// The pagination control is considered present only when it renders text;
/// an absent or empty control terminates the category.
fn has_next_page(document: &Html) -> bool {
    document
        .select(&NEXT_PAGE)
        .next()
        .map(|el| !el.text().collect::<String>().trim().is_empty())
        .unwrap_or(false)
}

/// Trim and deduplicate, preserving first-seen order.
pub fn dedupe_links<'s>(links: impl IntoIterator<Item = &'s str>) -> Vec<String> {
    links
        .into_iter()
        .map(|l| l.trim().to_string())
        .unique()
        .collect()
}

/// Write one category's links: a delimiter line naming the course, then one
/// URL per line. Full truncate-then-write.
async fn save_links(
    links_dir: &Path,
    course: Course,
    links: &[String],
) -> Result<(), HarvestError> {
    let deduped = dedupe_links(links.iter().map(String::as_str));

    let mut contents = format!("{}{}\n", config::COURSE_DELIM, course.slug());
    for link in &deduped {
        contents.push_str(link);
        contents.push('\n');
    }

    let path = links_dir.join(config::course_links_file(course));
    fs::write(&path, contents)
        .await
        .map_err(|e| HarvestError::io(&path, e))?;
    info!(%course, count = deduped.len(), path = %path.display(), "wrote category link file");
    Ok(())
}

/// Merge every category link file into the master file: URLs only, no
/// delimiter lines, deduplicated across categories, overwritten whole.
async fn merge_master(links_dir: &Path) -> Result<(), HarvestError> {
    let mut category_files = Vec::new();
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
            category_files.push(path);
        }
    }
    category_files.sort();

    let mut all_links = Vec::new();
    for path in &category_files {
        let data = fs::read_to_string(path)
            .await
            .map_err(|e| HarvestError::io(path, e))?;
        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(config::COURSE_DELIM) {
                continue;
            }
            all_links.push(line.to_string());
        }
    }

    let deduped = dedupe_links(all_links.iter().map(String::as_str));
    let master = links_dir.join(config::MASTER_FILE_NAME);
    fs::write(&master, deduped.join("\n"))
        .await
        .map_err(|e| HarvestError::io(&master, e))?;
    info!(count = deduped.len(), path = %master.display(), "wrote master link file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct StubFetcher {
        pages: HashMap<String, String>,
        calls: RefCell<usize>,
    }

    impl StubFetcher {
        fn new(pages: HashMap<String, String>) -> Self {
            Self {
                pages,
                calls: RefCell::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl Fetch for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
            *self.calls.borrow_mut() += 1;
            match self.pages.get(url) {
                Some(body) => Ok(body.clone()),
                None => panic!("unexpected fetch: {url}"),
            }
        }
    }

    fn listing_page(links: &[&str], with_next: bool) -> String {
        let mut html = String::from("<html><body>");
        for link in links {
            html.push_str(&format!(
                r#"<h2 class="wp-block-post-title"><a href="{link}">A recipe</a></h2>"#
            ));
        }
        if with_next {
            html.push_str(r##"<a class="wp-block-query-pagination-next" href="#">Next Page</a>"##);
        }
        html.push_str("</body></html>");
        html
    }

    #[test]
    fn test_dedupe_preserves_first_seen_order() {
        let deduped = dedupe_links(["b", "a", " b ", "c", "a"]);
        assert_eq!(deduped, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_collect_recipe_links_filters_by_template() {
        let html = listing_page(
            &[
                "https://vickypham.com/blog/pho",
                "https://vickypham.com/about",
                "/blog/goi-cuon",
            ],
            false,
        );
        let document = Html::parse_document(&html);
        let mut links = Vec::new();
        collect_recipe_links(&document, "https://vickypham.com/recipes-finder/", &mut links);
        assert_eq!(
            links,
            vec![
                "https://vickypham.com/blog/pho",
                "https://vickypham.com/blog/goi-cuon",
            ]
        );
    }

    #[test]
    fn test_has_next_page_requires_text() {
        let with_text = Html::parse_document(
            r#"<a class="wp-block-query-pagination-next">Next</a>"#,
        );
        let empty = Html::parse_document(
            r#"<a class="wp-block-query-pagination-next"></a>"#,
        );
        let absent = Html::parse_document("<p>nothing here</p>");
        assert!(has_next_page(&with_text));
        assert!(!has_next_page(&empty));
        assert!(!has_next_page(&absent));
    }

    #[tokio::test]
    async fn test_crawl_course_follows_pagination() {
        let course = Course::Soups;
        let mut pages = HashMap::new();
        pages.insert(
            config::listing_url(course, 0),
            listing_page(
                &[
                    "https://vickypham.com/blog/pho",
                    "https://vickypham.com/blog/pho",
                ],
                true,
            ),
        );
        pages.insert(
            config::listing_url(course, 1),
            listing_page(&["https://vickypham.com/blog/canh-chua"], false),
        );
        let fetcher = StubFetcher::new(pages);
        let crawler = LinkCrawler::new(&fetcher, "/tmp/unused");

        let links = crawler.crawl_course(course).await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
        // Raw accumulation still has the duplicate; save_links dedupes.
        assert_eq!(links.len(), 3);
    }

    #[tokio::test]
    async fn test_crawl_is_skipped_when_master_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(config::MASTER_FILE_NAME), "").unwrap();

        let fetcher = StubFetcher::new(HashMap::new());
        let crawler = LinkCrawler::new(&fetcher, dir.path());
        crawler.crawl().await.unwrap();
        assert_eq!(fetcher.call_count(), 0, "resumed crawl must not fetch");
    }

    #[tokio::test]
    async fn test_save_and_merge_master() {
        let dir = tempfile::tempdir().unwrap();
        let soups = vec![
            "https://vickypham.com/blog/pho".to_string(),
            "https://vickypham.com/blog/canh-chua".to_string(),
        ];
        let salads = vec![
            // Shared with soups; the master merge must drop the duplicate.
            "https://vickypham.com/blog/pho".to_string(),
            "https://vickypham.com/blog/goi-ga".to_string(),
        ];
        save_links(dir.path(), Course::Soups, &soups).await.unwrap();
        save_links(dir.path(), Course::Salads, &salads).await.unwrap();

        let category = std::fs::read_to_string(
            dir.path().join(config::course_links_file(Course::Soups)),
        )
        .unwrap();
        assert!(category.starts_with("---- soups\n"));
        assert_eq!(category.lines().count(), 3);

        merge_master(dir.path()).await.unwrap();
        let master =
            std::fs::read_to_string(dir.path().join(config::MASTER_FILE_NAME)).unwrap();
        let lines: Vec<&str> = master.lines().collect();
        assert_eq!(lines.len(), 3, "master holds unique urls only");
        assert!(lines.iter().all(|l| !l.starts_with(config::COURSE_DELIM)));
        assert!(lines.contains(&"https://vickypham.com/blog/goi-ga"));
    }

    #[tokio::test]
    async fn test_full_crawl_writes_master() {
        let dir = tempfile::tempdir().unwrap();
        let mut pages = HashMap::new();
        for course in Course::crawlable() {
            pages.insert(
                config::listing_url(course, 0),
                listing_page(
                    &[&format!("https://vickypham.com/blog/{}-dish", course.slug())],
                    false,
                ),
            );
        }
        let fetcher = StubFetcher::new(pages);
        let crawler = LinkCrawler::new(&fetcher, dir.path());
        crawler.crawl().await.unwrap();

        assert_eq!(fetcher.call_count(), 7, "one listing page per crawlable course");
        let master =
            std::fs::read_to_string(dir.path().join(config::MASTER_FILE_NAME)).unwrap();
        assert_eq!(master.lines().count(), 7);

        // Second run resumes off the master file.
        crawler.crawl().await.unwrap();
        assert_eq!(fetcher.call_count(), 7);
    }
}
