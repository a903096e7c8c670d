//! Response Extractor: best-effort decoding of structured data from completion text.
//!
//! The provider is only asked to reply with JSON; nothing enforces it. Extraction
//! therefore never fails the request: a miss yields an explicit parse-failure
//! result with every structured field defaulted.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

/// First `{` through last `}`, across newlines.
static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON object pattern is valid"));

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("integer pattern is valid"));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("no JSON object found in completion")]
    NoJsonObject,

    #[error("embedded JSON is invalid: {0}")]
    InvalidJson(String),

    #[error("JSON does not match the expected shape: {0}")]
    SchemaMismatch(String),
}

/// Strategy for pulling a JSON value out of completion text.
///
/// Swap implementations (e.g. once the provider supports schema-constrained
/// output) without touching the flows that decode the result.
pub trait JsonExtractor: Send + Sync {
    fn parse(&self, text: &str) -> Result<Value, ParseFailure>;
}

/// Tolerates prose around the payload: greedy `{...}` match, then decode.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyBraceExtractor;

impl JsonExtractor for GreedyBraceExtractor {
    fn parse(&self, text: &str) -> Result<Value, ParseFailure> {
        let found = JSON_OBJECT.find(text).ok_or(ParseFailure::NoJsonObject)?;
        serde_json::from_str(found.as_str()).map_err(|e| ParseFailure::InvalidJson(e.to_string()))
    }
}

/// The whole completion (minus code fences) must be the JSON document.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictJsonExtractor;

impl JsonExtractor for StrictJsonExtractor {
    fn parse(&self, text: &str) -> Result<Value, ParseFailure> {
        let text = strip_json_fences(text);
        if !text.starts_with('{') {
            return Err(ParseFailure::NoJsonObject);
        }
        serde_json::from_str(text).map_err(|e| ParseFailure::InvalidJson(e.to_string()))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from completion text.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(str::trim)
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

/// Extracts and decodes into `T`.
pub fn decode<T: DeserializeOwned>(
    extractor: &dyn JsonExtractor,
    text: &str,
) -> Result<T, ParseFailure> {
    let value = extractor.parse(text)?;
    serde_json::from_value(value).map_err(|e| ParseFailure::SchemaMismatch(e.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Full-résumé payload
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedExperience {
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedProject {
    pub title: String,
    #[serde(default)]
    pub points: Vec<String>,
}

/// What the single-call generation asks the model to return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeSelection {
    #[serde(default)]
    pub selected_skills: Vec<String>,
    #[serde(default)]
    pub selected_experiences: Vec<SelectedExperience>,
    #[serde(default)]
    pub selected_projects: Vec<SelectedProject>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseStatus {
    Parsed,
    Failed(ParseFailure),
}

/// Raw completion plus the decoded payload. On failure the payload is the default.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub raw_text: String,
    pub selection: ResumeSelection,
    pub status: ParseStatus,
}

impl CompletionResult {
    pub fn parsed(&self) -> bool {
        self.status == ParseStatus::Parsed
    }
}

/// Decodes the full-résumé payload without any validation.
pub fn extract(extractor: &dyn JsonExtractor, raw_text: &str) -> CompletionResult {
    match decode::<ResumeSelection>(extractor, raw_text) {
        Ok(selection) => CompletionResult {
            raw_text: raw_text.to_string(),
            selection,
            status: ParseStatus::Parsed,
        },
        Err(failure) => {
            warn!("Completion could not be decoded, using empty selection: {failure}");
            CompletionResult {
                raw_text: raw_text.to_string(),
                selection: ResumeSelection::default(),
                status: ParseStatus::Failed(failure),
            }
        }
    }
}

/// Decodes the payload and drops any skill the user never declared.
pub fn extract_resume_selection(
    extractor: &dyn JsonExtractor,
    raw_text: &str,
    known_skills: &[String],
) -> CompletionResult {
    let mut result = extract(extractor, raw_text);
    let requested = result.selection.selected_skills.len();
    result.selection.selected_skills = filter_skills(&result.selection.selected_skills, known_skills);

    if result.selection.selected_skills.is_empty() {
        info!("No selected skills matched the candidate's skill set ({requested} proposed)");
    } else if result.selection.selected_skills.len() < requested {
        info!(
            "Dropped {} skills not declared by the candidate",
            requested - result.selection.selected_skills.len()
        );
    }
    result
}

/// Keeps the model's order, exact-match only, each name once.
pub fn filter_skills(selected: &[String], known: &[String]) -> Vec<String> {
    let known: HashSet<&str> = known.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    selected
        .iter()
        .filter(|s| known.contains(s.as_str()) && seen.insert(s.as_str()))
        .cloned()
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Numeric index selection
// ────────────────────────────────────────────────────────────────────────────

/// Reads every integer in `raw_text` as a 1-based index into `candidates`.
///
/// Out-of-range and repeated indices are discarded and at most `limit` survive.
/// When none survive, returns the first `limit` candidates in their original order.
pub fn select_indices<T: Clone>(raw_text: &str, candidates: &[T], limit: usize) -> Vec<T> {
    let mut seen = HashSet::new();
    let picked: Vec<T> = INTEGER
        .find_iter(raw_text)
        .filter_map(|m| m.as_str().parse::<usize>().ok())
        .filter(|&i| i >= 1 && i <= candidates.len() && seen.insert(i))
        .take(limit)
        .map(|i| candidates[i - 1].clone())
        .collect();

    if picked.is_empty() {
        candidates.iter().take(limit).cloned().collect()
    } else {
        picked
    }
}
