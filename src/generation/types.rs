//! Structured output of a generation call and its SEO report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Product copy returned by the model.
///
/// The six leading fields are required: a reply missing any of them fails
/// to parse and goes through repair. Keys the model adds beyond the known
/// set are kept in `extra` so they survive into the description file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub title: String,
    pub meta_description: String,
    pub short_description: String,
    pub long_description: String,
    pub bullets: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub website: WebsiteCopy,
    #[serde(default)]
    pub title_suggestions: Vec<String>,
    #[serde(default)]
    pub meta_suggestions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteCopy {
    #[serde(default)]
    pub hero_blurb: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub website_description: String,
    #[serde(default)]
    pub website_bullets: Vec<String>,
}

/// Keyword and length metrics plus ordered suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoReport {
    pub metrics: SeoMetrics,
    pub suggestions: Vec<String>,
}

/// In reduced mode only the two length fields are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoMetrics {
    pub title_length: usize,
    pub meta_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_has_primary: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_has_primary: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_density: Option<BTreeMap<String, f64>>,
}

#[cfg(test)]
pub(crate) fn sample_result() -> GenerationResult {
    GenerationResult {
        title: "Cat Food Deluxe".into(),
        meta_description: "Premium cat food for picky eaters.".into(),
        short_description: "Tasty and healthy.".into(),
        long_description: "This cat food keeps every cat happy.".into(),
        bullets: vec!["Grain free".into()],
        keywords: vec!["cat food".into()],
        website: WebsiteCopy::default(),
        title_suggestions: Vec::new(),
        meta_suggestions: Vec::new(),
        extra: Map::new(),
    }
}
