//! Model answer parsing
//!
//! Models are asked for `{"part_name": ..., "description": ...}` but do not
//! always comply, and answers cut off at the token limit arrive as half an
//! object. Parsing degrades through four tiers and never fails.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Boundary (in characters) before which a sentence end counts as a title
pub const HEURISTIC_SPLIT_LIMIT: usize = 50;

/// Description used when the model returned nothing
pub const NO_EXPLANATION_PLACEHOLDER: &str = "No explanation was returned for this part.";

const TITLE_TERMINATORS: [char; 5] = ['.', '!', '?', '\u{0964}', '\n'];

static PART_NAME_FIELD: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""part_name"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok());

// No closing quote required: the value may run to the end of the input.
static DESCRIPTION_FIELD: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""description"\s*:\s*"((?:[^"\\]|\\.)*)"#).ok());

/// A displayable explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainResult {
    pub part_name: String,
    pub description: String,
}

/// How an answer was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    /// Well-formed JSON object
    Structured,
    /// Cut-off JSON object with fields recovered leniently
    Partial,
    /// Title split off at an early sentence end
    Heuristic,
    /// Target label as title, whole text as description
    RawLabel,
}

/// Parse a model answer, falling back to `target_label` as the title
pub fn parse_response(raw: &str, target_label: &str) -> ExplainResult {
    parse_with_tier(raw, target_label).0
}

/// Like [`parse_response`], also reporting which tier matched
pub fn parse_with_tier(raw: &str, target_label: &str) -> (ExplainResult, ParseTier) {
    let cleaned = strip_fences(raw);

    if cleaned.is_empty() {
        debug!("empty answer for \"{}\"", target_label);
        return (
            ExplainResult {
                part_name: target_label.to_string(),
                description: NO_EXPLANATION_PLACEHOLDER.to_string(),
            },
            ParseTier::RawLabel,
        );
    }

    if let Some(result) = parse_structured(&cleaned, target_label) {
        return (result, ParseTier::Structured);
    }

    if looks_like_json(&cleaned) {
        if let Some(result) = recover_fields(&cleaned, target_label) {
            debug!("answer for \"{}\" was incomplete JSON, recovered fields", target_label);
            return (result, ParseTier::Partial);
        }
    } else if let Some(result) = split_heuristic(&cleaned) {
        debug!("answer for \"{}\" was not JSON, split at first sentence", target_label);
        return (result, ParseTier::Heuristic);
    }

    debug!("answer for \"{}\" kept as raw text", target_label);
    (
        ExplainResult {
            part_name: target_label.to_string(),
            description: cleaned,
        },
        ParseTier::RawLabel,
    )
}

fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

#[derive(Deserialize)]
struct StructuredAnswer {
    part_name: String,
    description: String,
}

fn parse_structured(text: &str, target_label: &str) -> Option<ExplainResult> {
    let answer = serde_json::from_str::<StructuredAnswer>(text)
        .ok()
        .or_else(|| {
            let start = text.find('{')?;
            let end = text.rfind('}')?;
            if end <= start {
                return None;
            }
            serde_json::from_str::<StructuredAnswer>(&text[start..=end]).ok()
        })?;

    let part_name = answer.part_name.trim();
    Some(ExplainResult {
        part_name: if part_name.is_empty() {
            target_label.to_string()
        } else {
            part_name.to_string()
        },
        description: answer.description.trim().to_string(),
    })
}

fn looks_like_json(text: &str) -> bool {
    text.starts_with('{') || text.contains("\"part_name\"")
}

fn recover_fields(text: &str, target_label: &str) -> Option<ExplainResult> {
    let capture = |field: &Lazy<Option<Regex>>| {
        field
            .as_ref()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|m| unescape_fragment(m.as_str()))
    };

    let part_name = capture(&PART_NAME_FIELD).filter(|name| !name.trim().is_empty());
    let description = capture(&DESCRIPTION_FIELD).filter(|desc| !desc.trim().is_empty());

    if part_name.is_none() && description.is_none() {
        return None;
    }

    Some(ExplainResult {
        part_name: part_name
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|| target_label.to_string()),
        description: description
            .map(|desc| desc.trim().to_string())
            .unwrap_or_else(|| NO_EXPLANATION_PLACEHOLDER.to_string()),
    })
}

/// Decode JSON string escapes in a possibly cut-off value
fn unescape_fragment(raw: &str) -> String {
    if let Ok(value) = serde_json::from_str::<String>(&format!("\"{}\"", raw)) {
        return value;
    }

    // A `\uXXXX` escape cut short; drop it and decode the rest
    raw.rfind('\\')
        .filter(|cut| raw.len() - cut <= 6)
        .and_then(|cut| serde_json::from_str::<String>(&format!("\"{}\"", &raw[..cut])).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn split_heuristic(text: &str) -> Option<ExplainResult> {
    let (char_index, (byte_index, terminator)) = text
        .char_indices()
        .enumerate()
        .find(|(_, (_, c))| TITLE_TERMINATORS.contains(c))?;

    if char_index >= HEURISTIC_SPLIT_LIMIT {
        return None;
    }

    let title = text[..byte_index]
        .trim()
        .trim_start_matches(['#', '*'])
        .trim_end_matches([':', '*', '#'])
        .trim();
    let rest = text[byte_index + terminator.len_utf8()..].trim();

    if title.is_empty() || rest.is_empty() {
        return None;
    }

    Some(ExplainResult {
        part_name: title.to_string(),
        description: rest.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_fences("  plain  "), "plain");
    }

    #[test]
    fn test_title_trims_markdown() {
        let result = split_heuristic("**Left Ventricle**:\nPumps blood to the body.").unwrap();
        assert_eq!(result.part_name, "Left Ventricle");
        assert_eq!(result.description, "Pumps blood to the body.");
    }

    #[test]
    fn test_devanagari_terminator() {
        let (result, tier) = parse_with_tier("महाधमनी। यह शरीर की सबसे बड़ी धमनी है।", "Mesh_12");
        assert_eq!(tier, ParseTier::Heuristic);
        assert_eq!(result.part_name, "महाधमनी");
    }

    #[test]
    fn test_terminator_without_remainder_uses_label() {
        let (result, tier) = parse_with_tier("Just a title.", "Valve");
        assert_eq!(tier, ParseTier::RawLabel);
        assert_eq!(result.part_name, "Valve");
        assert_eq!(result.description, "Just a title.");
    }
}
