//! Relevance selection: reads the model's ranking of numbered résumé items.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::generation::extractor::{decode, select_indices, JsonExtractor};
use crate::models::resume::ResumeItemWithPointers;

/// At most this many items survive relevance selection.
pub const RELEVANCE_SELECTION_LIMIT: usize = 5;

const UNSCORED_REASON: &str = "Selected by position; no ranking could be read from the completion";

/// An item chosen for the job, with the model's score when it gave a readable one.
///
/// `relevance_score` is `None` when the ranking could not be parsed and the
/// item was picked by index fallback.
#[derive(Debug, Clone, Serialize)]
pub struct RankedItem {
    pub item: ResumeItemWithPointers,
    pub relevance_score: Option<u8>,
    pub selection_reason: String,
}

#[derive(Debug, Deserialize)]
struct RelevanceReply {
    #[serde(default)]
    selections: Vec<RelevanceEntry>,
}

#[derive(Debug, Deserialize)]
struct RelevanceEntry {
    index: i64,
    #[serde(default)]
    relevance_score: Option<f64>,
    #[serde(default)]
    reason: String,
}

/// Decodes `{"selections":[{"index","relevance_score","reason"}]}` against the
/// numbered `candidates`. An empty `selections` list means nothing is relevant
/// and yields no items. Falls back to plain index selection, unscored, when the
/// reply cannot be decoded or none of its selections name a valid item.
pub fn parse_relevance(
    extractor: &dyn JsonExtractor,
    raw_text: &str,
    candidates: &[ResumeItemWithPointers],
    limit: usize,
) -> Vec<RankedItem> {
    match decode::<RelevanceReply>(extractor, raw_text) {
        Ok(reply) if reply.selections.is_empty() => {
            info!("Model found none of {} items relevant", candidates.len());
            return Vec::new();
        }
        Ok(reply) => {
            let ranked = ranked_selections(reply.selections, candidates, limit);
            if !ranked.is_empty() {
                info!("Model ranked {} of {} items", ranked.len(), candidates.len());
                return ranked;
            }
            warn!("Relevance ranking named no valid item");
        }
        Err(failure) => warn!("Relevance ranking could not be decoded: {failure}"),
    }

    info!("Falling back to index selection over {} items", candidates.len());
    select_indices(raw_text, candidates, limit)
        .into_iter()
        .map(|item| RankedItem {
            item,
            relevance_score: None,
            selection_reason: UNSCORED_REASON.to_string(),
        })
        .collect()
}

fn ranked_selections(
    selections: Vec<RelevanceEntry>,
    candidates: &[ResumeItemWithPointers],
    limit: usize,
) -> Vec<RankedItem> {
    let mut seen = Vec::new();
    selections
        .into_iter()
        .filter(|e| e.index >= 1 && (e.index as usize) <= candidates.len())
        .filter(|e| {
            let fresh = !seen.contains(&e.index);
            seen.push(e.index);
            fresh
        })
        .take(limit)
        .map(|e| RankedItem {
            item: candidates[e.index as usize - 1].clone(),
            relevance_score: e.relevance_score.map(clamp_score),
            selection_reason: e.reason,
        })
        .collect()
}

fn clamp_score(score: f64) -> u8 {
    score.clamp(0.0, 100.0).round() as u8
}
