//! Résumé-vs-job analysis result and its decoding.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::generation::extractor::{decode, JsonExtractor};

/// Maximum points per category, summing to 100.
pub const SKILLS_MATCH_MAX: u8 = 40;
pub const EXPERIENCE_RELEVANCE_MAX: u8 = 30;
pub const BULLET_QUALITY_MAX: u8 = 20;
pub const PRESENTATION_MAX: u8 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryScores {
    pub skills_match: u8,
    pub experience_relevance: u8,
    pub bullet_quality: u8,
    pub presentation: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResumeAnalysis {
    pub score: u8,
    pub category_scores: CategoryScores,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

// Models hand back fractional and out-of-range numbers; they are read as
// floats and brought into range afterwards.
#[derive(Debug, Default, Deserialize)]
struct CategoryReply {
    #[serde(default)]
    skills_match: f64,
    #[serde(default)]
    experience_relevance: f64,
    #[serde(default)]
    bullet_quality: f64,
    #[serde(default)]
    presentation: f64,
}

#[derive(Debug, Deserialize)]
struct AnalysisReply {
    score: f64,
    #[serde(default)]
    category_scores: CategoryReply,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

impl ResumeAnalysis {
    /// Returned whenever the completion cannot be decoded.
    pub fn failed() -> Self {
        Self {
            weaknesses: vec!["Failed to analyze resume".to_string()],
            suggestions: vec!["Please try again".to_string()],
            ..Default::default()
        }
    }

    fn clamped(reply: AnalysisReply) -> Self {
        let c = reply.category_scores;
        Self {
            score: clamp_score(reply.score, 100),
            category_scores: CategoryScores {
                skills_match: clamp_score(c.skills_match, SKILLS_MATCH_MAX),
                experience_relevance: clamp_score(c.experience_relevance, EXPERIENCE_RELEVANCE_MAX),
                bullet_quality: clamp_score(c.bullet_quality, BULLET_QUALITY_MAX),
                presentation: clamp_score(c.presentation, PRESENTATION_MAX),
            },
            strengths: reply.strengths,
            weaknesses: reply.weaknesses,
            suggestions: reply.suggestions,
        }
    }
}

fn clamp_score(score: f64, max: u8) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.clamp(0.0, f64::from(max)).round() as u8
}

pub fn parse_analysis(extractor: &dyn JsonExtractor, raw_text: &str) -> ResumeAnalysis {
    match decode::<AnalysisReply>(extractor, raw_text) {
        Ok(reply) => ResumeAnalysis::clamped(reply),
        Err(failure) => {
            warn!("Analysis could not be decoded: {failure}");
            ResumeAnalysis::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::extractor::GreedyBraceExtractor;

    #[test]
    fn test_parses_full_analysis() {
        let raw = r#"{
            "score": 75,
            "category_scores": {"skills_match": 35, "experience_relevance": 25, "bullet_quality": 10, "presentation": 5},
            "strengths": ["Strong Python"],
            "weaknesses": ["No AWS"],
            "suggestions": ["Add metrics"]
        }"#;
        let analysis = parse_analysis(&GreedyBraceExtractor, raw);
        assert_eq!(analysis.score, 75);
        assert_eq!(analysis.category_scores.skills_match, 35);
        assert_eq!(analysis.strengths, vec!["Strong Python"]);
    }

    #[test]
    fn test_out_of_range_scores_are_capped() {
        let raw = r#"{"score": 180, "category_scores": {"skills_match": 55, "presentation": 12}}"#;
        let analysis = parse_analysis(&GreedyBraceExtractor, raw);
        assert_eq!(analysis.score, 100);
        assert_eq!(analysis.category_scores.skills_match, SKILLS_MATCH_MAX);
        assert_eq!(analysis.category_scores.presentation, PRESENTATION_MAX);
        assert_eq!(analysis.category_scores.bullet_quality, 0);
    }

    #[test]
    fn test_fractional_and_oversized_scores_are_kept_and_clamped() {
        let raw = r#"{
            "score": 82.5,
            "category_scores": {"skills_match": 300, "experience_relevance": 24.4, "bullet_quality": -3},
            "strengths": ["Strong Python"]
        }"#;
        let analysis = parse_analysis(&GreedyBraceExtractor, raw);
        assert_eq!(analysis.score, 83);
        assert_eq!(analysis.category_scores.skills_match, SKILLS_MATCH_MAX);
        assert_eq!(analysis.category_scores.experience_relevance, 24);
        assert_eq!(analysis.category_scores.bullet_quality, 0);
        assert_eq!(analysis.strengths, vec!["Strong Python"]);
        assert!(analysis.weaknesses.is_empty());

        let analysis = parse_analysis(&GreedyBraceExtractor, r#"{"score": 300}"#);
        assert_eq!(analysis.score, 100);
        assert_ne!(analysis, ResumeAnalysis::failed());
    }

    #[test]
    fn test_undecodable_analysis_returns_failure_default() {
        let analysis = parse_analysis(&GreedyBraceExtractor, "The resume looks great!");
        assert_eq!(analysis, ResumeAnalysis::failed());
        assert_eq!(analysis.score, 0);
        assert_eq!(analysis.weaknesses, vec!["Failed to analyze resume"]);
        assert_eq!(analysis.suggestions, vec!["Please try again"]);
    }
}
