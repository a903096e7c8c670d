// Shared prompt fragments. Each flow keeps its own templates in
// `generation::prompts`; only cross-cutting wording lives here.

/// Appended to every prompt that expects a JSON object back.
pub const JSON_ONLY_INSTRUCTION: &str = "Return ONLY a valid JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations before or after the JSON.";

/// Keeps generated bullets tied to what the candidate actually wrote.
pub const GROUNDING_INSTRUCTION: &str = "Use ONLY facts present in the candidate's records. \
    Do NOT invent employers, titles, dates, metrics or technologies. \
    If the records do not support a claim, leave it out.";

/// Selection flows prefer leaving a section empty over padding it.
pub const EMPTY_IS_BETTER: &str = "If nothing is relevant, return an empty list. \
    An empty list is better than an irrelevant one.";
