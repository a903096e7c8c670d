// Résumé generation: prompt building, provider calls, response extraction and assembly.
// All provider calls go through llm_client via the `CompletionProvider` trait.

pub mod analysis;
pub mod assembly;
pub mod extractor;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod relevance;
