//! One generation call: prompt, parse/repair, optional limit fixes, SEO report.
//!
//! No retries here. A call either returns a complete pair or fails once;
//! the batch runner owns retry policy.

use tracing::debug;

use super::constraints::enforce_title_meta_limits;
use super::repair::ResponseRepair;
use super::seo::{AnalysisMode, SeoAnalyzer, SeoTexts};
use super::types::{GenerationResult, SeoReport};
use crate::error::GenerationError;
use crate::openai::{CompletionSender, request_json_text};

/// Anything that can turn a product into copy plus an SEO report.
///
/// The seam between the batch runner and the boundary call.
#[allow(async_fn_in_trait)]
pub trait Generator {
    async fn produce(
        &self,
        name: &str,
        features: &str,
    ) -> Result<(GenerationResult, SeoReport), GenerationError>;
}

pub fn generation_prompt(name: &str, features: &str) -> String {
    format!(
        r#"Generate a detailed, SEO-optimized product description in valid JSON only.

Product Name: "{name}"
Features: "{features}"

Return ONLY JSON with the following structure:

{{
  "title": "...",
  "meta_description": "...",
  "short_description": "...",
  "long_description": "...",
  "bullets": ["...", "..."],
  "keywords": ["...", "..."],
  "website": {{
    "hero_blurb": "...",
    "tagline": "...",
    "website_description": "...",
    "website_bullets": ["...", "..."]
  }},
  "title_suggestions": ["...", "..."],
  "meta_suggestions": ["...", "..."]
}}
"#
    )
}

/// Options fixed for the lifetime of an adapter.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub model: String,
    pub mode: AnalysisMode,
    pub enforce_limits: bool,
}

pub struct GenerationAdapter<S> {
    sender: S,
    options: AdapterOptions,
}

impl<S: CompletionSender> GenerationAdapter<S> {
    pub fn new(sender: S, options: AdapterOptions) -> Self {
        Self { sender, options }
    }
}

impl<S: CompletionSender> Generator for GenerationAdapter<S> {
    async fn produce(
        &self,
        name: &str,
        features: &str,
    ) -> Result<(GenerationResult, SeoReport), GenerationError> {
        let model = self.options.model.as_str();
        let raw = request_json_text(&self.sender, model, &generation_prompt(name, features)).await?;
        debug!(product = name, len = raw.len(), "received generation reply");

        let mut result: GenerationResult = ResponseRepair::new(&self.sender, model).parse(&raw).await?;

        if self.options.enforce_limits {
            let keywords = result.keywords.clone();
            result = enforce_title_meta_limits(result, &keywords);
        }

        let report = SeoAnalyzer::run(self.options.mode, SeoTexts::from(&result), &result.keywords);
        Ok((result, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::ScriptedSender;
    use crate::openai::OpenAiError;

    const REPLY: &str = r#"{
        "title": "Steel Water Bottle for Hikers",
        "meta_description": "A steel water bottle that keeps water cold.",
        "short_description": "Cold for 24 hours.",
        "long_description": "This water bottle is made of steel and built for the trail.",
        "bullets": ["Leak proof", "BPA free"],
        "keywords": ["Water Bottle", "steel"],
        "website": {"hero_blurb": "Stay cold", "tagline": "Hydrate", "website_description": "d", "website_bullets": []},
        "title_suggestions": ["Steel Bottle"],
        "meta_suggestions": []
    }"#;

    fn options(mode: AnalysisMode) -> AdapterOptions {
        AdapterOptions {
            model: "gpt-4o-mini".into(),
            mode,
            enforce_limits: false,
        }
    }

    #[test]
    fn prompt_embeds_product() {
        let prompt = generation_prompt("Bottle", "steel, 1L");
        assert!(prompt.contains("Product Name: \"Bottle\""));
        assert!(prompt.contains("Features: \"steel, 1L\""));
        assert!(prompt.contains("\"meta_suggestions\""));
    }

    #[tokio::test]
    async fn produces_result_and_full_report() {
        let sender = ScriptedSender::new(vec![Ok(REPLY.into())]);
        let adapter = GenerationAdapter::new(sender, options(AnalysisMode::Full));

        let (result, report) = adapter.produce("Bottle", "steel").await.unwrap();
        assert_eq!(result.title, "Steel Water Bottle for Hikers");
        assert_eq!(result.website.tagline, "Hydrate");

        let in_title = report.metrics.title_has_primary.unwrap();
        assert!(in_title["water bottle"]);
        assert!(in_title["steel"]);
        assert_eq!(report.metrics.title_length, 29);
    }

    #[tokio::test]
    async fn reduced_mode_skips_keyword_metrics() {
        let sender = ScriptedSender::new(vec![Ok(REPLY.into())]);
        let adapter = GenerationAdapter::new(sender, options(AnalysisMode::Reduced));

        let (_, report) = adapter.produce("Bottle", "steel").await.unwrap();
        assert!(report.suggestions.is_empty());
        assert!(report.metrics.keyword_density.is_none());
    }

    #[tokio::test]
    async fn malformed_reply_goes_through_repair() {
        let sender = ScriptedSender::new(vec![Ok("```json\n{broken".into()), Ok(REPLY.into())]);
        let adapter = GenerationAdapter::new(sender, options(AnalysisMode::Full));

        let (result, _) = adapter.produce("Bottle", "steel").await.unwrap();
        assert_eq!(result.bullets.len(), 2);
        assert_eq!(adapter.sender.calls(), 2);
    }

    #[tokio::test]
    async fn boundary_failure_is_returned_once() {
        let sender = ScriptedSender::new(vec![Err(OpenAiError::ApiError {
            status: 500,
            message: "boom".into(),
            retry_after_secs: None,
        })]);
        let adapter = GenerationAdapter::new(sender, options(AnalysisMode::Full));

        let err = adapter.produce("Bottle", "steel").await.unwrap_err();
        assert!(matches!(err, GenerationError::Failure(_)));
        assert_eq!(adapter.sender.calls(), 1);
    }

    #[tokio::test]
    async fn enforce_limits_applies_before_analysis() {
        let long_title = format!(r#""title": "{}","#, "Amazing ".repeat(10));
        let reply = REPLY.replace(r#""title": "Steel Water Bottle for Hikers","#, &long_title);
        let sender = ScriptedSender::new(vec![Ok(reply)]);
        let mut opts = options(AnalysisMode::Full);
        opts.enforce_limits = true;
        let adapter = GenerationAdapter::new(sender, opts);

        let (result, report) = adapter.produce("Bottle", "steel").await.unwrap();
        assert!(result.title.chars().count() <= 60);
        assert_eq!(report.metrics.title_length, result.title.chars().count());
    }
}
