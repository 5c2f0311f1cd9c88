//! Non-LLM fixes for title/meta length and title keyword placement.

use super::seo::{META_MAX_CHARS, TITLE_MAX_CHARS, count_occurrences, normalize_keywords};
use super::types::GenerationResult;

/// Cut `text` to at most `max_chars` characters at the last space, then trim
/// trailing `" ,.-"`. A single over-long word is hard-cut.
pub fn truncate_to_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars + 1).collect();
    let cut = match head.rfind(' ') {
        Some(pos) => head[..pos].to_string(),
        None => head.chars().take(max_chars).collect(),
    };
    cut.trim_end_matches([' ', ',', '.', '-']).to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Trim title and meta to their limits and, when the first keyword is
/// missing from the title, prefix it if the result still fits.
pub fn enforce_title_meta_limits(
    mut result: GenerationResult,
    primary_keywords: &[String],
) -> GenerationResult {
    let mut title = truncate_to_words(result.title.trim(), TITLE_MAX_CHARS);
    let meta = truncate_to_words(result.meta_description.trim(), META_MAX_CHARS);

    let keywords = normalize_keywords(primary_keywords);
    if let Some(first) = keywords.first() {
        if count_occurrences(&title, first) == 0 {
            let keyword = capitalize(first);
            let candidates = [format!("{keyword} - {title}"), format!("{keyword} {title}")];
            if let Some(fit) = candidates
                .into_iter()
                .find(|c| c.chars().count() <= TITLE_MAX_CHARS)
            {
                title = fit;
            }
        }
    }

    result.title = title;
    result.meta_description = meta;
    result
}
