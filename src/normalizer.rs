//! Ingredient-name normalization.
//!
//! Raw ingredient names arrive as free text ("2 tsp finely chopped (fresh)
//! basil leaves"). Normalization cleans the string, keeps only noun tokens
//! replaced by their lemma, and canonicalizes the survivors. The POS
//! tagger/lemmatizer is an explicitly constructed, caller-injected service:
//! the binary builds an [`NlpTagger`] once at startup (init failure aborts
//! the run) and tests inject dictionary-backed doubles.

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::HarvestError;
use crate::utils::strip_diacritics;

/// Non-greedy, non-nesting parenthetical spans.
static PARENS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Part-of-speech tagging plus lemmatization, the only part of normalization
/// that needs a model.
pub trait PosLemmaTagger {
    /// Lemmas of the noun-tagged tokens of `text`, in token order.
    fn noun_lemmas(&self, text: &str) -> Vec<String>;
}

/// Production tagger backed by an `nlprule` English tokenizer binary.
pub struct NlpTagger {
    tokenizer: nlprule::Tokenizer,
}

impl NlpTagger {
    /// Load the tokenizer model. This happens once per process; failure here
    /// is fatal because no name can ever be normalized without it.
    pub fn from_path(path: &Path) -> Result<Self, HarvestError> {
        let tokenizer = nlprule::Tokenizer::new(path)
            .map_err(|e| HarvestError::LemmatizerInit(Box::new(e)))?;
        Ok(Self { tokenizer })
    }
}

impl PosLemmaTagger for NlpTagger {
    fn noun_lemmas(&self, text: &str) -> Vec<String> {
        let mut lemmas = Vec::new();
        for sentence in self.tokenizer.pipe(text) {
            for token in sentence.tokens() {
                let word = token.word();
                let Some(data) = word
                    .tags()
                    .iter()
                    .find(|data| data.pos().as_str().starts_with("NN"))
                else {
                    continue;
                };
                let lemma = data.lemma().as_str();
                if lemma.is_empty() {
                    lemmas.push(word.text().as_str().to_string());
                } else {
                    lemmas.push(lemma.to_string());
                }
            }
        }
        lemmas
    }
}

/// The per-name pipeline plus the per-dish batch post-process.
pub struct NameNormalizer<T> {
    tagger: T,
}

impl<T: PosLemmaTagger> NameNormalizer<T> {
    pub fn new(tagger: T) -> Self {
        Self { tagger }
    }

    /// Normalize one raw ingredient name.
    ///
    /// An empty result means "drop this ingredient"; it is not an error.
    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = pre_process(raw);
        let picked = keep_denser_disjunct(&cleaned);
        let normalized = self.tagger.noun_lemmas(picked).join(" ");
        debug!(%raw, %normalized, "normalized ingredient name");
        normalized
    }
}

/// Slashes to spaces, trim, lowercase, diacritics out, parentheticals out.
fn pre_process(name: &str) -> String {
    let name = name.replace('/', " ");
    let name = strip_diacritics(&name.trim().to_lowercase());
    PARENS_RE.replace_all(&name, "").into_owned()
}

/// Cheap disjunction handling: at the first `" or "` keep the side with more
/// whitespace-separated tokens; ties keep the left side.
fn keep_denser_disjunct(name: &str) -> &str {
    let Some(idx) = name.find(" or ") else {
        return name;
    };
    let left = name[..idx].trim();
    let right = name[idx + 4..].trim();
    if right.split_whitespace().count() > left.split_whitespace().count() {
        right
    } else {
        left
    }
}

/// Batch post-process over one dish's normalized names.
///
/// Drops empties and duplicates, removes every name that is a strict
/// substring of another name in the set (survivors are the maximal elements;
/// containment between distinct strings is transitive, so this is
/// order-independent), orders by descending length then lexicographically,
/// and canonicalizes spaces to underscores.
pub fn post_process(names: &[String]) -> Vec<String> {
    let unique: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .collect();

    let mut survivors: Vec<&str> = unique
        .iter()
        .copied()
        .filter(|candidate| {
            !unique
                .iter()
                .any(|other| *other != *candidate && other.contains(*candidate))
        })
        .collect();
    survivors.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    survivors.into_iter().map(canonicalize).collect()
}

/// Canonical storage form: underscores instead of internal spaces.
pub fn canonicalize(name: &str) -> String {
    name.replace(' ', "_")
}
