//! Dish extraction from a fetched recipe detail page.
//!
//! The source site's markup is inconsistent across pages, so extraction is
//! heuristic throughout: known container elements are copied last-match-wins,
//! the bilingual title is disambiguated by script, and each ingredient list
//! item runs through an ordered table of extraction strategies where the
//! first match wins. Pages outside the known patterns are skipped, not fixed.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::{Course, Dish, RawIngredientLine};
use crate::utils::{contains_non_ascii, strip_diacritics};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h2.tasty-recipes-title").unwrap());
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.tasty-recipes-description-body > p").unwrap());
static FULL_RECIPE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.tasty-recipes-ingredients").unwrap());
static ENTRY_CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.tasty-recipes-entry-content").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h4").unwrap());
static LIST_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static NUTRIFOX_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.nutrifox-name").unwrap());
static NUTRIFOX_QUANTITY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.nutrifox-quantity").unwrap());
static NUTRIFOX_UNIT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.nutrifox-unit").unwrap());
static DATA_QUANTITY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span[data-amount], span[data-unit]").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());

/// `"<main> (<alt>)"`; anything without the parenthetical group is all main.
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s*\((.*?)\)\s*$").unwrap());

/// Extract one dish and its raw ingredient lines from a detail page.
///
/// Returns `None` when no display name can be resolved; such pages are
/// skipped entirely, ingredients included.
pub fn extract_dish(
    document: &Html,
    source_url: &str,
    course: Course,
    created_at: DateTime<Utc>,
) -> Option<(Dish, Vec<RawIngredientLine>)> {
    let title = document
        .select(&TITLE)
        .last()
        .map(element_text)
        .unwrap_or_default();
    let (display_name, alternate_name) = resolve_names(title.trim());
    if display_name.is_empty() {
        debug!(%source_url, "no resolvable display name, dropping page");
        return None;
    }

    let description = document
        .select(&DESCRIPTION)
        .last()
        .map(|el| element_text(el).trim().to_string())
        .unwrap_or_default();
    let full_recipe_html = document
        .select(&FULL_RECIPE)
        .last()
        .map(|el| el.html())
        .unwrap_or_default();

    let dish = Dish {
        source_url: source_url.to_string(),
        course,
        display_name,
        alternate_name,
        description,
        full_recipe_html,
        created_at,
    };
    let ingredients = extract_ingredients(document, created_at);
    Some((dish, ingredients))
}

/// Split the title and pick the non-native-script variant as the display
/// name. Whichever side carries non-ASCII characters is treated as the
/// native-script rendering and stored diacritic-stripped as the alternate.
fn resolve_names(title: &str) -> (String, Option<String>) {
    let (main, alt) = split_title(title);

    if contains_non_ascii(&main) {
        let stripped = strip_diacritics(&main);
        return (alt, (!stripped.is_empty()).then_some(stripped));
    }
    if contains_non_ascii(&alt) {
        return (main, Some(strip_diacritics(&alt)));
    }
    let alternate = (!alt.is_empty()).then_some(alt);
    (main, alternate)
}

fn split_title(title: &str) -> (String, String) {
    match TITLE_RE.captures(title) {
        Some(caps) => (
            caps[1].trim().to_string(),
            caps[2].trim().to_string(),
        ),
        None => (title.to_string(), String::new()),
    }
}

struct LineParts {
    name: String,
    amount: f64,
    unit: String,
}

/// Extraction strategies in priority order; the first that recognizes the
/// list item's markup wins.
type Strategy = fn(ElementRef) -> Option<LineParts>;
const STRATEGIES: [Strategy; 3] = [nutrition_widget, data_attributes, plain_text];

/// Walk every `h4` inside the recipe entry content whose immediately
/// following element sibling is a `ul`, and run each of its list items
/// through the strategy table.
fn extract_ingredients(document: &Html, created_at: DateTime<Utc>) -> Vec<RawIngredientLine> {
    let mut lines = Vec::new();
    for entry in document.select(&ENTRY_CONTENT) {
        for heading in entry.select(&HEADING) {
            let Some(list) = following_list(heading) else {
                continue;
            };
            for item in list.select(&LIST_ITEM) {
                let Some(parts) = STRATEGIES.iter().find_map(|strategy| strategy(item)) else {
                    continue;
                };
                if parts.name.is_empty() {
                    debug!("ingredient line with no resolvable name, dropping");
                    continue;
                }
                lines.push(RawIngredientLine {
                    name: parts.name,
                    amount: parts.amount,
                    unit: parts.unit,
                    created_at,
                });
            }
        }
    }
    lines
}

/// The `ul` directly after a heading, if that is what follows it.
fn following_list(heading: ElementRef) -> Option<ElementRef> {
    heading
        .next_siblings()
        .find_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "ul")
}

/// Nutrition-widget markup with dedicated name/quantity/unit sub-elements.
fn nutrition_widget(item: ElementRef) -> Option<LineParts> {
    let name_el = item.select(&NUTRIFOX_NAME).next()?;
    let amount = item
        .select(&NUTRIFOX_QUANTITY)
        .next()
        .and_then(|el| element_text(el).trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    let unit = item
        .select(&NUTRIFOX_UNIT)
        .next()
        .map(|el| element_text(el).trim().to_string())
        .unwrap_or_default();
    Some(LineParts {
        name: element_text(name_el).trim().to_string(),
        amount,
        unit,
    })
}

/// `data-amount`/`data-unit` markup. The name comes from the first anchor if
/// one exists, else from the item's text with child elements removed.
fn data_attributes(item: ElementRef) -> Option<LineParts> {
    let quantity = item.select(&DATA_QUANTITY).next()?;
    let name = match item.select(&ANCHOR).next() {
        Some(anchor) => element_text(anchor).trim().to_string(),
        None => own_text(item).trim().to_string(),
    };
    let amount = quantity
        .value()
        .attr("data-amount")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    let unit = quantity
        .value()
        .attr("data-unit")
        .unwrap_or("N/A")
        .trim()
        .to_string();
    Some(LineParts { name, amount, unit })
}

/// Fallback: the full item text minus any text duplicated by a nested span,
/// which the site uses as a redundant quantity rendering.
fn plain_text(item: ElementRef) -> Option<LineParts> {
    let full = element_text(item).trim().to_string();
    let span_text = item
        .select(&SPAN)
        .map(element_text)
        .collect::<String>()
        .trim()
        .to_string();
    let name = if span_text.is_empty() {
        full
    } else {
        full.replacen(&span_text, "", 1).trim().to_string()
    };
    Some(LineParts {
        name,
        amount: 0.0,
        unit: "N/A".to_string(),
    })
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

/// Text nodes that are direct children of the element; descendant elements
/// do not contribute.
fn own_text(element: ElementRef) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &*text.text)
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }

    fn detail_page(title: &str, ingredients: &str) -> String {
        format!(
            r#"<html><body>
            <h2 class="tasty-recipes-title">{title}</h2>
            <div class="tasty-recipes-description-body"><p>A classic.</p></div>
            <div class="tasty-recipes-ingredients"><ul><li>raw markup</li></ul></div>
            <div class="tasty-recipes-entry-content">
              <h4>Ingredients</h4>
              <ul>{ingredients}</ul>
            </div>
            </body></html>"#
        )
    }

    #[test]
    fn test_native_main_name_moves_to_alternate() {
        let (display, alternate) = resolve_names("Phở (Beef Noodle Soup)");
        assert_eq!(display, "Beef Noodle Soup");
        assert_eq!(alternate.as_deref(), Some("Pho"));
    }

    #[test]
    fn test_native_alt_name_is_stripped() {
        let (display, alternate) = resolve_names("Beef Noodle Soup (Phở)");
        assert_eq!(display, "Beef Noodle Soup");
        assert_eq!(alternate.as_deref(), Some("Pho"));
    }

    #[test]
    fn test_title_without_parenthetical_has_no_alternate() {
        let (display, alternate) = resolve_names("Grilled Pork Skewers");
        assert_eq!(display, "Grilled Pork Skewers");
        assert_eq!(alternate, None);
    }

    #[test]
    fn test_two_ascii_names_keep_both() {
        let (display, alternate) = resolve_names("Pho (Beef Noodle Soup)");
        assert_eq!(display, "Pho");
        assert_eq!(alternate.as_deref(), Some("Beef Noodle Soup"));
    }

    #[test]
    fn test_native_title_without_alternate_is_unresolvable() {
        let (display, _) = resolve_names("Phở");
        assert!(display.is_empty());
    }

    #[test]
    fn test_dish_without_display_name_is_dropped_entirely() {
        let html = detail_page("Phở", "<li>500 g beef bones</li>");
        let document = parse(&html);
        let result = extract_dish(
            &document,
            "https://vickypham.com/blog/pho",
            Course::Soups,
            Utc::now(),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_nutrition_widget_strategy() {
        let html = detail_page(
            "Phở (Beef Noodle Soup)",
            r#"<li><span class="nutrifox-quantity">2</span>
                <span class="nutrifox-unit">tsp</span>
                <span class="nutrifox-name">fish sauce</span></li>
               <li><span class="nutrifox-quantity">a few</span>
                <span class="nutrifox-unit">sprigs</span>
                <span class="nutrifox-name">cilantro</span></li>"#,
        );
        let document = parse(&html);
        let (dish, ingredients) = extract_dish(
            &document,
            "https://vickypham.com/blog/pho",
            Course::Soups,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(dish.display_name, "Beef Noodle Soup");
        assert_eq!(ingredients.len(), 2);
        assert_eq!(ingredients[0].name, "fish sauce");
        assert_eq!(ingredients[0].amount, 2.0);
        assert_eq!(ingredients[0].unit, "tsp");
        // Unparseable quantity falls back to 0.0 instead of aborting the item.
        assert_eq!(ingredients[1].name, "cilantro");
        assert_eq!(ingredients[1].amount, 0.0);
    }

    #[test]
    fn test_data_attribute_strategy_prefers_anchor_name() {
        let html = detail_page(
            "Goi Cuon (Fresh Spring Rolls)",
            r#"<li><span data-amount="12" data-unit="sheets">12 sheets</span>
                <a href="/blog/rice-paper">rice paper</a></li>"#,
        );
        let document = parse(&html);
        let (_, ingredients) = extract_dish(
            &document,
            "https://vickypham.com/blog/goi-cuon",
            Course::Appetizers,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "rice paper");
        assert_eq!(ingredients[0].amount, 12.0);
        assert_eq!(ingredients[0].unit, "sheets");
    }

    #[test]
    fn test_data_attribute_strategy_falls_back_to_own_text() {
        let html = detail_page(
            "Goi Cuon (Fresh Spring Rolls)",
            r#"<li><span data-amount="bad" data-unit="g">200 g</span> pork belly</li>"#,
        );
        let document = parse(&html);
        let (_, ingredients) = extract_dish(
            &document,
            "https://vickypham.com/blog/goi-cuon",
            Course::Appetizers,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "pork belly");
        assert_eq!(ingredients[0].amount, 0.0, "bad data-amount defaults to 0.0");
        assert_eq!(ingredients[0].unit, "g");
    }

    #[test]
    fn test_plain_text_strategy_removes_span_duplicate() {
        let html = detail_page(
            "Com Tam (Broken Rice)",
            r#"<li><span>2 cups</span> jasmine rice</li>"#,
        );
        let document = parse(&html);
        let (_, ingredients) = extract_dish(
            &document,
            "https://vickypham.com/blog/com-tam",
            Course::MainDishes,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "jasmine rice");
        assert_eq!(ingredients[0].amount, 0.0);
        assert_eq!(ingredients[0].unit, "N/A");
    }

    #[test]
    fn test_plain_text_strategy_without_span() {
        let html = detail_page("Com Tam (Broken Rice)", "<li>pickled daikon</li>");
        let document = parse(&html);
        let (_, ingredients) = extract_dish(
            &document,
            "https://vickypham.com/blog/com-tam",
            Course::MainDishes,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(ingredients[0].name, "pickled daikon");
        assert_eq!(ingredients[0].unit, "N/A");
    }

    #[test]
    fn test_only_list_directly_after_heading_is_scanned() {
        let html = r#"<html><body>
            <h2 class="tasty-recipes-title">Canh Chua (Sour Soup)</h2>
            <div class="tasty-recipes-entry-content">
              <h4>Ingredients</h4>
              <ul><li>tamarind</li></ul>
              <h4>Notes</h4>
              <p>Some prose.</p>
              <ul><li>not an ingredient</li></ul>
            </div>
            </body></html>"#;
        let document = parse(html);
        let ingredients = extract_ingredients(&document, Utc::now());
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "tamarind");
    }

    #[test]
    fn test_description_and_full_recipe_last_match_wins() {
        let html = r#"<html><body>
            <h2 class="tasty-recipes-title">Old Title</h2>
            <h2 class="tasty-recipes-title">Banh Mi (Baguette Sandwich)</h2>
            <div class="tasty-recipes-description-body"><p>First.</p><p>Second.</p></div>
            <div class="tasty-recipes-ingredients"><em>first</em></div>
            <div class="tasty-recipes-ingredients"><em>last</em></div>
            </body></html>"#;
        let document = parse(html);
        let (dish, _) = extract_dish(
            &document,
            "https://vickypham.com/blog/banh-mi",
            Course::MainDishes,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(dish.display_name, "Banh Mi");
        assert_eq!(dish.description, "Second.");
        assert!(dish.full_recipe_html.contains("last"));
        assert!(!dish.full_recipe_html.contains("first"));
    }

    #[test]
    fn test_empty_ingredient_name_is_dropped() {
        let html = detail_page(
            "Banh Mi (Baguette Sandwich)",
            r#"<li><span>1 loaf</span></li><li>pate</li>"#,
        );
        let document = parse(&html);
        let ingredients = extract_ingredients(&document, Utc::now());
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "pate");
    }
}
