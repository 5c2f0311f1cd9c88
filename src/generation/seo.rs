//! Keyword and length metrics for product copy.
//!
//! Everything here is pure: the same texts and keywords always give the same
//! report, including suggestion order.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{GenerationResult, SeoMetrics, SeoReport};

pub const TITLE_MAX_CHARS: usize = 60;
pub const META_MAX_CHARS: usize = 160;
pub const DENSITY_MAX_PERCENT: f64 = 3.0;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("static regex"));

/// Which analysis a generation call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Lengths, keyword presence, density and suggestions.
    #[default]
    Full,
    /// Lengths only, no suggestions.
    Reduced,
}

impl AnalysisMode {
    pub fn from_fast_flag(fast: bool) -> Self {
        if fast {
            AnalysisMode::Reduced
        } else {
            AnalysisMode::Full
        }
    }
}

/// The three fields the analyzer reads.
#[derive(Debug, Clone, Copy)]
pub struct SeoTexts<'a> {
    pub title: &'a str,
    pub meta_description: &'a str,
    pub long_description: &'a str,
}

impl<'a> From<&'a GenerationResult> for SeoTexts<'a> {
    fn from(result: &'a GenerationResult) -> Self {
        Self {
            title: &result.title,
            meta_description: &result.meta_description,
            long_description: &result.long_description,
        }
    }
}

/// Split, trim, lowercase and de-duplicate keywords, keeping first-seen order.
/// Each entry may itself be a comma-separated list.
pub fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in keywords {
        for kw in entry.as_ref().split(',') {
            let kw = kw.trim().to_lowercase();
            if !kw.is_empty() && !out.contains(&kw) {
                out.push(kw);
            }
        }
    }
    out
}

/// Case-insensitive whole-word occurrences of `token` in `text`.
pub fn count_occurrences(text: &str, token: &str) -> usize {
    let token = token.trim();
    if text.is_empty() || token.is_empty() {
        return 0;
    }
    let pattern = format!(r"\b{}\b", regex::escape(&token.to_lowercase()));
    match Regex::new(&pattern) {
        Ok(re) => re.find_iter(&text.to_lowercase()).count(),
        Err(_) => 0,
    }
}

/// Number of `\w+` runs, floored at 1.
pub fn word_count(text: &str) -> usize {
    WORD.find_iter(text).count().max(1)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub struct SeoAnalyzer;

impl SeoAnalyzer {
    pub fn run(mode: AnalysisMode, texts: SeoTexts<'_>, primary_keywords: &[String]) -> SeoReport {
        match mode {
            AnalysisMode::Full => Self::analyze(texts, primary_keywords),
            AnalysisMode::Reduced => Self::analyze_reduced(texts),
        }
    }

    /// Full analysis. Suggestions are ordered: title length, meta length,
    /// keyword missing from title, keyword missing from meta, density; the
    /// per-keyword groups follow the normalized keyword order.
    pub fn analyze(texts: SeoTexts<'_>, primary_keywords: &[String]) -> SeoReport {
        let title = texts.title.trim();
        let meta = texts.meta_description.trim();
        let long = texts.long_description.trim();
        let keywords = normalize_keywords(primary_keywords);

        let title_length = title.chars().count();
        let meta_length = meta.chars().count();
        let long_words = word_count(long);

        let in_title: Vec<bool> = keywords
            .iter()
            .map(|k| count_occurrences(title, k) > 0)
            .collect();
        let in_meta: Vec<bool> = keywords
            .iter()
            .map(|k| count_occurrences(meta, k) > 0)
            .collect();
        let density: Vec<f64> = keywords
            .iter()
            .map(|k| round3(100.0 * count_occurrences(long, k) as f64 / long_words as f64))
            .collect();

        let mut suggestions = Vec::new();
        if title_length > TITLE_MAX_CHARS {
            suggestions.push(format!(
                "Title is longer than {TITLE_MAX_CHARS} chars; shorten it and keep the primary keyword near the start."
            ));
        }
        if meta_length > META_MAX_CHARS {
            suggestions.push(format!(
                "Meta description exceeds {META_MAX_CHARS} chars; shorten to 120-155 chars and include the primary keyword once."
            ));
        }
        for (k, present) in keywords.iter().zip(&in_title) {
            if !present {
                suggestions.push(format!(
                    "Primary keyword '{k}' not found in title; consider adding it near the start."
                ));
            }
        }
        for (k, present) in keywords.iter().zip(&in_meta) {
            if !present {
                suggestions.push(format!(
                    "Primary keyword '{k}' not found in meta description; include it naturally."
                ));
            }
        }
        for (k, dens) in keywords.iter().zip(&density) {
            if *dens == 0.0 {
                suggestions.push(format!(
                    "Primary keyword '{k}' not found in long description; include it naturally."
                ));
            } else if *dens > DENSITY_MAX_PERCENT {
                suggestions.push(format!(
                    "Keyword '{k}' density in description is {dens}%; reduce repetition to avoid keyword stuffing (aim below {DENSITY_MAX_PERCENT}%)."
                ));
            }
        }

        let zip_map = |values: &[bool]| -> BTreeMap<String, bool> {
            keywords.iter().cloned().zip(values.iter().copied()).collect()
        };

        SeoReport {
            metrics: SeoMetrics {
                title_length,
                meta_length,
                title_has_primary: Some(zip_map(&in_title)),
                meta_has_primary: Some(zip_map(&in_meta)),
                keyword_density: Some(keywords.iter().cloned().zip(density).collect()),
            },
            suggestions,
        }
    }

    /// Lengths only. Always a subset of [`SeoAnalyzer::analyze`].
    pub fn analyze_reduced(texts: SeoTexts<'_>) -> SeoReport {
        SeoReport {
            metrics: SeoMetrics {
                title_length: texts.title.trim().chars().count(),
                meta_length: texts.meta_description.trim().chars().count(),
                title_has_primary: None,
                meta_has_primary: None,
                keyword_density: None,
            },
            suggestions: Vec::new(),
        }
    }
}
