//! Generation pipeline: one sequential flow per request.
//!
//! Flow: records (already fetched) → prompt builder → completion → extractor →
//!       assembly. Each provider call is tagged with the stage it failed in.
//!       There is no retry: a failed call fails the flow.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::analysis::{parse_analysis, ResumeAnalysis};
use crate::generation::assembly::{assemble_resume, TailoredResume};
use crate::generation::extractor::{
    extract_resume_selection, select_indices, JsonExtractor, ParseStatus,
};
use crate::generation::prompts::{build_pdf_parse_prompt, build_prompt, PromptContext, PromptTask};
use crate::generation::relevance::{parse_relevance, RankedItem};
use crate::llm_client::{CompletionProvider, CompletionRequest};
use crate::models::resume::{BulletPoint, ResumeItemWithPointers, UserBundle};

/// Variants generated per item by the chunks and optimize flows.
pub const POINTER_CHUNK_COUNT: usize = 3;
/// Upper bound a caller may request for pointer chunks.
pub const MAX_POINTER_CHUNKS: usize = 5;
/// Default number of existing bullets kept by best-pointer selection.
pub const BEST_POINTER_LIMIT: usize = 3;

const POINTER_TEMPERATURE: f32 = 0.7;
const FULL_RESUME_TEMPERATURE: f32 = 0.4;
const SELECTION_TEMPERATURE: f32 = 0.2;
const ANALYSIS_TEMPERATURE: f32 = 0.3;

/// Where in the per-request flow a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Prompting,
    AwaitingCompletion,
    Extracting,
    Assembling,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Prompting => "prompting",
            Stage::AwaitingCompletion => "awaiting_completion",
            Stage::Extracting => "extracting",
            Stage::Assembling => "assembling",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selected item with freshly generated bullets.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedExperience {
    pub id: Uuid,
    pub title: String,
    pub relevance_score: Option<u8>,
    pub selection_reason: String,
    pub pointers: Vec<String>,
}

/// Borrowed handles for one request. Built from `AppState::pipeline()`.
pub struct Pipeline<'a> {
    pub llm: &'a dyn CompletionProvider,
    pub extractor: &'a dyn JsonExtractor,
    pub model: &'a str,
}

impl<'a> Pipeline<'a> {
    /// One tailored bullet for one item.
    pub async fn generate_pointer(
        &self,
        item: &ResumeItemWithPointers,
        job_description: &str,
    ) -> Result<String, AppError> {
        let items = std::slice::from_ref(item);
        let ctx = PromptContext::new(job_description, items);
        let text = self
            .complete(&ctx, PromptTask::SinglePointer, POINTER_TEMPERATURE)
            .await?;
        Ok(clean_pointer(&text))
    }

    /// `count` variants, generated one after another. Empty completions are skipped,
    /// so the result may be shorter than `count`; order follows the variant index.
    pub async fn generate_pointer_chunks(
        &self,
        item: &ResumeItemWithPointers,
        job_description: &str,
        count: usize,
    ) -> Result<Vec<String>, AppError> {
        let items = std::slice::from_ref(item);
        let ctx = PromptContext::new(job_description, items);
        let mut pointers = Vec::with_capacity(count);

        for index in 1..=count {
            let task = PromptTask::PointerVariant {
                index,
                total: count,
            };
            let text = self.complete(&ctx, task, POINTER_TEMPERATURE).await?;
            let pointer = clean_pointer(&text);
            if pointer.is_empty() {
                warn!("Variant {index} of {count} for '{}' was empty, skipping", item.item.title);
                continue;
            }
            pointers.push(pointer);
        }

        info!(
            "Generated {} of {count} pointer variants for '{}'",
            pointers.len(),
            item.item.title
        );
        Ok(pointers)
    }

    /// Ranks `candidates` against the job and keeps at most `limit`.
    pub async fn select_relevant_experiences(
        &self,
        candidates: &[ResumeItemWithPointers],
        job_description: &str,
        limit: usize,
    ) -> Result<Vec<RankedItem>, AppError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let ctx = PromptContext::new(job_description, candidates);
        let text = self
            .complete(
                &ctx,
                PromptTask::RelevanceSelection { limit },
                SELECTION_TEMPERATURE,
            )
            .await?;
        Ok(parse_relevance(self.extractor, &text, candidates, limit))
    }

    /// Picks the item's best existing bullets by number, most relevant first.
    pub async fn select_best_pointers(
        &self,
        item: &ResumeItemWithPointers,
        job_description: &str,
        limit: usize,
    ) -> Result<Vec<BulletPoint>, AppError> {
        let pointers = &item.existing_pointers;
        if pointers.len() <= limit {
            return Ok(pointers.clone());
        }
        let items = std::slice::from_ref(item);
        let ctx = PromptContext::new(job_description, items);
        let text = self
            .complete(
                &ctx,
                PromptTask::BestPointerSelection { limit },
                SELECTION_TEMPERATURE,
            )
            .await?;
        Ok(select_indices(&text, pointers, limit))
    }

    /// The single-call flow: one completion chooses skills, experiences, projects
    /// and bullets; assembly fills in contact details, dates and education.
    pub async fn generate_full_resume(
        &self,
        bundle: &UserBundle,
        job_description: &str,
    ) -> Result<TailoredResume, AppError> {
        let items = bundle.work_items();
        let ctx = PromptContext {
            job_description,
            user: bundle.user.as_ref(),
            items: &items,
            skills: &bundle.skills,
            education: &bundle.education,
        };
        let text = self
            .complete(&ctx, PromptTask::FullResume, FULL_RESUME_TEMPERATURE)
            .await?;

        let result = extract_resume_selection(self.extractor, &text, &bundle.skill_names());
        if let ParseStatus::Failed(failure) = &result.status {
            warn!(
                stage = %Stage::Extracting,
                "Full resume completion unreadable ({} chars), assembling from records only: {failure}",
                result.raw_text.len()
            );
        }

        info!(stage = %Stage::Assembling, parsed = result.parsed(), "Assembling tailored resume");
        Ok(assemble_resume(bundle, &result))
    }

    pub async fn analyze_resume(
        &self,
        bundle: &UserBundle,
        job_description: &str,
    ) -> Result<ResumeAnalysis, AppError> {
        let items = bundle.work_items();
        let ctx = PromptContext {
            job_description,
            user: bundle.user.as_ref(),
            items: &items,
            skills: &bundle.skills,
            education: &bundle.education,
        };
        let text = self
            .complete(&ctx, PromptTask::ResumeAnalysis, ANALYSIS_TEMPERATURE)
            .await?;
        Ok(parse_analysis(self.extractor, &text))
    }

    /// Relevance selection, then fresh bullet variants for each selected item.
    ///
    /// A failure on one item is logged and the item skipped; an exhausted quota
    /// stops the whole flow since every later call would fail the same way.
    pub async fn optimize_experiences(
        &self,
        bundle: &UserBundle,
        job_description: &str,
        limit: usize,
    ) -> Result<Vec<OptimizedExperience>, AppError> {
        let candidates = bundle.work_items();
        let ranked = self
            .select_relevant_experiences(&candidates, job_description, limit)
            .await?;

        let mut optimized = Vec::with_capacity(ranked.len());
        for ranked_item in ranked {
            let pointers = match self
                .generate_pointer_chunks(&ranked_item.item, job_description, POINTER_CHUNK_COUNT)
                .await
            {
                Ok(pointers) => pointers,
                Err(e) if e.is_quota_exceeded() => return Err(e),
                Err(e) => {
                    warn!(
                        "Skipping '{}' after pointer generation failed: {e}",
                        ranked_item.item.item.title
                    );
                    continue;
                }
            };
            optimized.push(OptimizedExperience {
                id: ranked_item.item.item.id,
                title: ranked_item.item.item.title,
                relevance_score: ranked_item.relevance_score,
                selection_reason: ranked_item.selection_reason,
                pointers,
            });
        }
        Ok(optimized)
    }

    /// Turns text extracted from an uploaded PDF into structured JSON.
    ///
    /// An unreadable completion comes back as `{"raw": <completion text>}`.
    pub async fn parse_resume_text(&self, resume_text: &str) -> Result<Value, AppError> {
        let prompt = build_pdf_parse_prompt(resume_text);
        let text = self.call("pdf_resume_parse", prompt, None).await?;
        Ok(match self.extractor.parse(&text) {
            Ok(value) => value,
            Err(failure) => {
                warn!(stage = %Stage::Extracting, "Parsed resume was not JSON, returning raw text: {failure}");
                json!({ "raw": text })
            }
        })
    }

    async fn complete(
        &self,
        ctx: &PromptContext<'_>,
        task: PromptTask,
        temperature: f32,
    ) -> Result<String, AppError> {
        debug!(stage = %Stage::Prompting, task = task.label(), "Building prompt");
        let prompt = build_prompt(ctx, task);
        self.call(task.label(), prompt, Some(temperature)).await
    }

    async fn call(
        &self,
        task: &str,
        prompt: String,
        temperature: Option<f32>,
    ) -> Result<String, AppError> {
        info!(
            stage = %Stage::AwaitingCompletion,
            task,
            "Calling provider (model={}, prompt_chars={})",
            self.model,
            prompt.len()
        );

        let request = CompletionRequest::new(prompt, self.model).temperature(temperature);
        let completion = self
            .llm
            .complete(request)
            .await
            .map_err(|e| AppError::provider(Stage::AwaitingCompletion, e))?;
        Ok(completion.text)
    }
}

/// Trims whitespace, list markers and wrapping quotes from a single bullet.
fn clean_pointer(text: &str) -> String {
    let trimmed = text
        .trim()
        .trim_start_matches(['-', '*', '•'])
        .trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::extractor::GreedyBraceExtractor;
    use crate::llm_client::stub::StubProvider;
    use crate::llm_client::ProviderError;
    use crate::records::fetch_user_bundle;
    use crate::records::memory::{fixtures, InMemoryStore};

    fn pipeline(stub: &StubProvider) -> Pipeline<'_> {
        Pipeline {
            llm: stub,
            extractor: &GreedyBraceExtractor,
            model: "gpt-4",
        }
    }

    fn entry(titles: &[&str]) -> ResumeItemWithPointers {
        let item = fixtures::experience(Uuid::new_v4(), "Backend Engineer", "Acme");
        let existing_pointers = titles
            .iter()
            .enumerate()
            .map(|(i, t)| fixtures::point(&item, t, i as i32))
            .collect();
        ResumeItemWithPointers {
            item,
            existing_pointers,
        }
    }

    #[test]
    fn test_clean_pointer_strips_markers_and_quotes() {
        assert_eq!(clean_pointer("  - Led the migration\n"), "Led the migration");
        assert_eq!(clean_pointer("\"Cut latency by 40%\""), "Cut latency by 40%");
        assert_eq!(clean_pointer("   "), "");
    }

    #[tokio::test]
    async fn test_chunks_are_sequential_and_skip_empty() {
        let stub = StubProvider::with_texts(["First variant", "   ", "Third variant"]);
        let pointers = pipeline(&stub)
            .generate_pointer_chunks(&entry(&[]), "Rust role", 3)
            .await
            .unwrap();

        assert_eq!(pointers, vec!["First variant", "Third variant"]);
        let requests = stub.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].prompt.contains("#1 of 3"));
        assert!(requests[2].prompt.contains("#3 of 3"));
        assert_eq!(requests[0].temperature, Some(POINTER_TEMPERATURE));
        assert!(requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_chunk_failure_fails_the_flow() {
        let stub = StubProvider::with_texts(["First variant"]);
        stub.push_error(ProviderError::Timeout(60));
        let err = pipeline(&stub)
            .generate_pointer_chunks(&entry(&[]), "Rust role", 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Provider {
                stage: Stage::AwaitingCompletion,
                ..
            }
        ));
        assert_eq!(stub.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_best_pointers_skip_the_call_when_few_exist() {
        let stub = StubProvider::default();
        let item = entry(&["one", "two"]);
        let picked = pipeline(&stub)
            .select_best_pointers(&item, "jd", 3)
            .await
            .unwrap();
        assert_eq!(picked.len(), 2);
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_best_pointers_follow_model_numbers() {
        let stub = StubProvider::with_texts(["4, 2"]);
        let item = entry(&["one", "two", "three", "four"]);
        let picked = pipeline(&stub)
            .select_best_pointers(&item, "jd", 2)
            .await
            .unwrap();
        let contents: Vec<_> = picked.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["four", "two"]);
    }

    #[tokio::test]
    async fn test_relevance_with_no_candidates_makes_no_call() {
        let stub = StubProvider::default();
        let ranked = pipeline(&stub)
            .select_relevant_experiences(&[], "jd", 5)
            .await
            .unwrap();
        assert!(ranked.is_empty());
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_full_resume_end_to_end_drops_undeclared_skills() {
        let user = fixtures::user("Ada Lovelace");
        let job = fixtures::experience(user.id, "Backend Engineer", "Acme");
        let store = InMemoryStore::default()
            .with_user(user.clone())
            .with_item(job.clone())
            .with_point(fixtures::point(&job, "Built the billing API", 0))
            .with_skill(fixtures::skill(user.id, "Python"))
            .with_skill(fixtures::skill(user.id, "Go"))
            .with_skill(fixtures::skill(user.id, "AWS"));
        let bundle = fetch_user_bundle(&store, user.id).await;

        let stub = StubProvider::with_texts([r#"Here is the resume:
{"selected_skills":["Python","AWS","Rust"],
 "selected_experiences":[{"title":"Backend Engineer","company":"","points":["Built a Python service on AWS"]}],
 "selected_projects":[]}"#]);

        let resume = pipeline(&stub)
            .generate_full_resume(&bundle, "Python and AWS backend role")
            .await
            .unwrap();

        assert_eq!(resume.skills, vec!["Python", "AWS"]);
        assert_eq!(resume.contact_info.name, "Ada Lovelace");
        assert_eq!(resume.experiences[0].company, "Acme");
        assert_eq!(resume.experiences[0].start_date, "2021-06");
        assert_eq!(stub.requests()[0].temperature, Some(FULL_RESUME_TEMPERATURE));
    }

    #[tokio::test]
    async fn test_full_resume_with_unreadable_completion_still_assembles() {
        let user = fixtures::user("Ada Lovelace");
        let store = InMemoryStore::default().with_user(user.clone());
        let bundle = fetch_user_bundle(&store, user.id).await;
        let stub = StubProvider::with_texts(["I cannot do that."]);

        let resume = pipeline(&stub)
            .generate_full_resume(&bundle, "jd")
            .await
            .unwrap();

        assert!(resume.skills.is_empty());
        assert!(resume.experiences.is_empty());
        assert_eq!(resume.contact_info.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_analysis_failure_default_on_prose() {
        let stub = StubProvider::with_texts(["Looks good overall."]);
        let analysis = pipeline(&stub)
            .analyze_resume(&UserBundle::empty(), "jd")
            .await
            .unwrap();
        assert_eq!(analysis, ResumeAnalysis::failed());
    }

    #[tokio::test]
    async fn test_optimize_skips_failed_items() {
        let user = fixtures::user("Ada Lovelace");
        let first = fixtures::experience(user.id, "Backend Engineer", "Acme");
        let second = fixtures::project(user.id, "Compiler");
        let store = InMemoryStore::default()
            .with_user(user.clone())
            .with_item(first)
            .with_item(second);
        let bundle = fetch_user_bundle(&store, user.id).await;

        let stub = StubProvider::with_texts([
            r#"{"selections":[{"index":1,"relevance_score":90,"reason":"APIs"},{"index":2,"relevance_score":60,"reason":"Parsing"}]}"#,
        ]);
        stub.push_error(ProviderError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        for text in ["Parser bullet 1", "Parser bullet 2", "Parser bullet 3"] {
            stub.push_text(text);
        }

        let optimized = pipeline(&stub)
            .optimize_experiences(&bundle, "jd", 5)
            .await
            .unwrap();

        assert_eq!(optimized.len(), 1);
        assert_eq!(optimized[0].title, "Compiler");
        assert_eq!(optimized[0].relevance_score, Some(60));
        assert_eq!(optimized[0].pointers.len(), POINTER_CHUNK_COUNT);
    }

    #[tokio::test]
    async fn test_parse_resume_text_falls_back_to_raw() {
        let stub = StubProvider::with_texts(["Name: Ada", r#"{"name": "Ada"}"#]);
        let p = pipeline(&stub);

        let raw = p.parse_resume_text("Ada Lovelace\nEngineer").await.unwrap();
        assert_eq!(raw, json!({ "raw": "Name: Ada" }));

        let parsed = p.parse_resume_text("Ada Lovelace\nEngineer").await.unwrap();
        assert_eq!(parsed["name"], "Ada");
        assert!(stub.requests()[0].prompt.contains("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_optimize_stops_on_quota() {
        let user = fixtures::user("Ada Lovelace");
        let store = InMemoryStore::default()
            .with_user(user.clone())
            .with_item(fixtures::experience(user.id, "Backend Engineer", "Acme"));
        let bundle = fetch_user_bundle(&store, user.id).await;

        let stub = StubProvider::with_texts([r#"{"selections":[{"index":1}]}"#]);
        stub.push_error(ProviderError::QuotaExceeded("insufficient_quota".to_string()));

        let err = pipeline(&stub)
            .optimize_experiences(&bundle, "jd", 5)
            .await
            .unwrap_err();
        assert!(err.is_quota_exceeded());
    }
}
