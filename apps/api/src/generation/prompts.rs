// Prompt templates for every generation flow, plus the builder that fills them.
// Templates are fixed strings with `{slot}` placeholders; the only branching is
// the placeholder text used when a list is empty. Record IDs are never rendered.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::generation::assembly::{display_end_date, format_month, format_year};
use crate::llm_client::prompts::{EMPTY_IS_BETTER, GROUNDING_INSTRUCTION, JSON_ONLY_INSTRUCTION};
use crate::models::resume::{ItemType, ResumeItemWithPointers};
use crate::models::user::{Education, Skill, User};

const NO_POINTERS: &str = "No existing bullet points";
const NO_ITEMS: &str = "None listed";
const NO_SKILLS: &str = "No skills listed";
const NO_SUMMARY: &str = "No summary provided";

static SLOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("slot pattern is valid"));

/// Single bullet. Replace: {item}, {job_description}, {grounding}
pub const SINGLE_POINTER_TEMPLATE: &str = r#"You are a resume optimization expert. Generate ONE compelling bullet point for this experience that aligns with the job description.

Experience Details:
{item}

Target Job Description:
{job_description}

Requirements:
- Start with a strong action verb
- Include quantifiable metrics where the experience supports them
- Tailor to the job requirements
- Keep it concise but impactful
- {grounding}
- Return ONLY the bullet point text, no numbering or formatting

Generate the bullet point:"#;

/// One of N variants. Replace: {index}, {total}, {item}, {job_description}, {grounding}
pub const POINTER_VARIANT_TEMPLATE: &str = r#"Generate bullet point #{index} of {total} for this experience.
Make it different from the other variants and focus on a different aspect: a different achievement, skill or impact.

Experience:
{item}

Job Description:
{job_description}

{grounding}
Return ONLY the bullet point text."#;

/// Replace: {limit}, {items}, {job_description}, {json_only}, {empty_is_better}
pub const RELEVANCE_SELECTION_TEMPLATE: &str = r#"You are an AI resume optimization expert. Analyze these numbered experiences and select up to {limit} that are most relevant to the job description.

Available Experiences:
{items}

Target Job Description:
{job_description}

For each selected experience give its number, a relevance_score from 0 to 100 and a brief selection reason. Order the selections from most to least relevant.

{empty_is_better}

Return a JSON object with this EXACT schema:
{
  "selections": [
    {"index": 1, "relevance_score": 92, "reason": "Directly matches the backend API work in the role"}
  ]
}

{json_only}"#;

/// Replace: {limit}, {item_title}, {pointers}, {job_description}
pub const BEST_POINTER_SELECTION_TEMPLATE: &str = r#"Below are numbered bullet points written for the experience "{item_title}".
Pick the {limit} bullet points that best match the job description, most relevant first.

Bullet Points:
{pointers}

Job Description:
{job_description}

Reply with the numbers of the chosen bullet points only, separated by commas (for example: 3, 1, 4)."#;

/// Single-call full resume. Replace: {summary}, {skills}, {experiences}, {projects},
/// {job_description}, {grounding}, {empty_is_better}, {json_only}
pub const FULL_RESUME_TEMPLATE: &str = r#"You are an expert resume writer tailoring a candidate's resume to a job description.

CANDIDATE SUMMARY:
{summary}

CANDIDATE SKILLS (choose ONLY from this list, spelled exactly as written):
{skills}

CANDIDATE WORK EXPERIENCE:
{experiences}

CANDIDATE PROJECTS:
{projects}

JOB DESCRIPTION:
{job_description}

YOUR TASK:
1. Select the skills from the candidate's list that the job asks for.
2. Select at most 2 work experiences and write at most 4 tailored bullet points for each.
3. Select at most 2 projects and write at most 3 tailored bullet points for each.
4. Keep every title and company exactly as written above.

{grounding}
{empty_is_better}

Return a JSON object with this EXACT schema:
{
  "selected_skills": ["Python"],
  "selected_experiences": [
    {"title": "Backend Engineer", "company": "Acme", "points": ["Built ...", "Reduced ..."]}
  ],
  "selected_projects": [
    {"title": "Compiler", "points": ["Implemented ..."]}
  ]
}

{json_only}"#;

/// Replace: {job_description}, {summary}, {skills}, {experiences}, {projects},
/// {education}, {pointers}, {json_only}
pub const RESUME_ANALYSIS_TEMPLATE: &str = r#"Analyze how well this resume matches the job description. Give a score out of 100 and detailed feedback.

JOB DESCRIPTION:
{job_description}

CANDIDATE'S RESUME:

Summary: {summary}

Skills: {skills}

Work Experiences:
{experiences}

Projects:
{projects}

Education:
{education}

Current Bullet Points:
{pointers}

YOUR TASK:
1. Give a relevancy score (0-100) based on:
   - Skills match (40 points)
   - Experience relevance (30 points)
   - Bullet point quality (20 points)
   - Overall presentation (10 points)

2. Provide specific feedback on:
   - What's strong (relevant skills, good experience matches)
   - What's missing (skills/experience the job needs)
   - Bullet point quality (are they specific? do they have metrics?)

3. Give 2-3 actionable improvement suggestions

Return a JSON object with this EXACT schema:
{
  "score": 75,
  "category_scores": {
    "skills_match": 35,
    "experience_relevance": 25,
    "bullet_quality": 15,
    "presentation": 10
  },
  "strengths": ["Strong Python experience matches job requirements"],
  "weaknesses": ["Missing AWS experience mentioned in job description"],
  "suggestions": ["Add metrics to all bullet points"]
}

{json_only}"#;

/// Replace: {resume_text}, {json_only}
pub const PDF_RESUME_PARSE_TEMPLATE: &str = r#"You are a resume parser. Given this resume text, extract key structured information as JSON with the following keys:
name, contact (email, phone, location), summary, skills, experience (company, role, start_date, end_date, description), and education (institution, degree, year).

{json_only}

Resume text:
{resume_text}"#;

/// Request-scoped view of the records a prompt may draw on.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub job_description: &'a str,
    pub user: Option<&'a User>,
    pub items: &'a [ResumeItemWithPointers],
    pub skills: &'a [Skill],
    pub education: &'a [Education],
}

impl<'a> PromptContext<'a> {
    pub fn new(job_description: &'a str, items: &'a [ResumeItemWithPointers]) -> Self {
        Self {
            job_description,
            user: None,
            items,
            skills: &[],
            education: &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTask {
    SinglePointer,
    /// `index` is 1-based.
    PointerVariant { index: usize, total: usize },
    RelevanceSelection { limit: usize },
    BestPointerSelection { limit: usize },
    FullResume,
    ResumeAnalysis,
}

impl PromptTask {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            PromptTask::SinglePointer => "single_pointer",
            PromptTask::PointerVariant { .. } => "pointer_variant",
            PromptTask::RelevanceSelection { .. } => "relevance_selection",
            PromptTask::BestPointerSelection { .. } => "best_pointer_selection",
            PromptTask::FullResume => "full_resume",
            PromptTask::ResumeAnalysis => "resume_analysis",
        }
    }
}

pub fn build_prompt(ctx: &PromptContext<'_>, task: PromptTask) -> String {
    match task {
        PromptTask::SinglePointer => fill(
            SINGLE_POINTER_TEMPLATE,
            &[
                ("item", first_item_block(ctx).as_str()),
                ("grounding", GROUNDING_INSTRUCTION),
                ("job_description", ctx.job_description),
            ],
        ),
        PromptTask::PointerVariant { index, total } => fill(
            POINTER_VARIANT_TEMPLATE,
            &[
                ("index", index.to_string().as_str()),
                ("total", total.to_string().as_str()),
                ("item", first_item_block(ctx).as_str()),
                ("grounding", GROUNDING_INSTRUCTION),
                ("job_description", ctx.job_description),
            ],
        ),
        PromptTask::RelevanceSelection { limit } => fill(
            RELEVANCE_SELECTION_TEMPLATE,
            &[
                ("limit", limit.to_string().as_str()),
                ("items", numbered_items(ctx.items).as_str()),
                ("empty_is_better", EMPTY_IS_BETTER),
                ("json_only", JSON_ONLY_INSTRUCTION),
                ("job_description", ctx.job_description),
            ],
        ),
        PromptTask::BestPointerSelection { limit } => {
            let (title, pointers) = match ctx.items.first() {
                Some(item) => (item.item.title.as_str(), numbered_pointers(item)),
                None => ("", NO_POINTERS.to_string()),
            };
            fill(
                BEST_POINTER_SELECTION_TEMPLATE,
                &[
                    ("limit", limit.to_string().as_str()),
                    ("item_title", title),
                    ("pointers", pointers.as_str()),
                    ("job_description", ctx.job_description),
                ],
            )
        }
        PromptTask::FullResume => fill(
            FULL_RESUME_TEMPLATE,
            &[
                ("summary", summary(ctx).as_str()),
                ("skills", skill_list(ctx.skills, "\n").as_str()),
                ("experiences", item_blocks(ctx.items, ItemType::Experience).as_str()),
                ("projects", item_blocks(ctx.items, ItemType::Project).as_str()),
                ("grounding", GROUNDING_INSTRUCTION),
                ("empty_is_better", EMPTY_IS_BETTER),
                ("json_only", JSON_ONLY_INSTRUCTION),
                ("job_description", ctx.job_description),
            ],
        ),
        PromptTask::ResumeAnalysis => fill(
            RESUME_ANALYSIS_TEMPLATE,
            &[
                ("summary", summary(ctx).as_str()),
                ("skills", skill_list(ctx.skills, ", ").as_str()),
                ("education", education_lines(ctx.education).as_str()),
                ("experiences", summary_lines(ctx.items, ItemType::Experience).as_str()),
                ("projects", summary_lines(ctx.items, ItemType::Project).as_str()),
                ("pointers", all_pointers(ctx.items).as_str()),
                ("json_only", JSON_ONLY_INSTRUCTION),
                ("job_description", ctx.job_description),
            ],
        ),
    }
}

pub fn build_pdf_parse_prompt(resume_text: &str) -> String {
    fill(
        PDF_RESUME_PARSE_TEMPLATE,
        &[("json_only", JSON_ONLY_INSTRUCTION), ("resume_text", resume_text)],
    )
}

/// Substitutes every `{name}` slot of `template` in a single pass, so text
/// coming from records is never itself scanned for slots. Unknown names are
/// left as written.
fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    SLOT.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        slots
            .iter()
            .find(|(slot, _)| *slot == name)
            .map(|(_, value)| (*value).to_string())
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// The candidate's own "about" text. Contact details are never included.
fn summary(ctx: &PromptContext<'_>) -> String {
    ctx.user
        .and_then(|u| u.about.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_SUMMARY)
        .to_string()
}

fn education_lines(education: &[Education]) -> String {
    if education.is_empty() {
        return NO_ITEMS.to_string();
    }
    education
        .iter()
        .map(|e| {
            let year = format_year(e.end_date.or(e.start_date));
            match e.description.as_deref().filter(|s| !s.is_empty()) {
                Some(institution) => format!("- {}, {institution} ({year})", e.title),
                None => format!("- {} ({year})", e.title),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_item_block(ctx: &PromptContext<'_>) -> String {
    ctx.items
        .first()
        .map(item_block)
        .unwrap_or_else(|| NO_ITEMS.to_string())
}

/// Multi-line description of one item, without identifiers.
fn item_block(entry: &ResumeItemWithPointers) -> String {
    let item = &entry.item;
    let mut block = format!("Title: {}\nType: {}\n", item.title, item.item_type);
    if let Some(org) = item.organization.as_deref().filter(|s| !s.is_empty()) {
        block.push_str(&format!("Organization: {org}\n"));
    }
    if let Some(kind) = item.employment_type.as_deref().filter(|s| !s.is_empty()) {
        block.push_str(&format!("Employment type: {kind}\n"));
    }
    if let Some(location) = item.location.as_deref().filter(|s| !s.is_empty()) {
        block.push_str(&format!("Location: {location}\n"));
    }
    let start = format_month(item.start_date);
    let end = display_end_date(item.end_date, item.is_current);
    if !start.is_empty() || !end.is_empty() {
        block.push_str(&format!("Dates: {start} - {end}\n"));
    }
    if let Some(description) = item.description.as_deref().filter(|s| !s.is_empty()) {
        block.push_str(&format!("Description: {description}\n"));
    }
    block.push_str("Existing bullet points:\n");
    block.push_str(&pointer_lines(entry));
    block
}

fn pointer_lines(entry: &ResumeItemWithPointers) -> String {
    if entry.existing_pointers.is_empty() {
        return NO_POINTERS.to_string();
    }
    entry
        .existing_pointers
        .iter()
        .map(|p| format!("- {}", p.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn numbered_pointers(entry: &ResumeItemWithPointers) -> String {
    if entry.existing_pointers.is_empty() {
        return NO_POINTERS.to_string();
    }
    entry
        .existing_pointers
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}", i + 1, p.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn numbered_items(items: &[ResumeItemWithPointers]) -> String {
    if items.is_empty() {
        return NO_ITEMS.to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("[{}]\n{}", i + 1, item_block(entry)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn item_blocks(items: &[ResumeItemWithPointers], item_type: ItemType) -> String {
    let blocks: Vec<String> = items
        .iter()
        .filter(|i| i.item.is(item_type))
        .map(item_block)
        .collect();
    if blocks.is_empty() {
        NO_ITEMS.to_string()
    } else {
        blocks.join("\n\n")
    }
}

fn summary_lines(items: &[ResumeItemWithPointers], item_type: ItemType) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|i| &i.item)
        .filter(|i| i.is(item_type))
        .map(|i| {
            let description = i.description.as_deref().unwrap_or_default();
            match i.organization.as_deref().filter(|s| !s.is_empty()) {
                Some(org) => format!("- {} at {org}: {description}", i.title),
                None => format!("- {}: {description}", i.title),
            }
        })
        .collect();
    if lines.is_empty() {
        NO_ITEMS.to_string()
    } else {
        lines.join("\n")
    }
}

fn all_pointers(items: &[ResumeItemWithPointers]) -> String {
    let lines: Vec<String> = items
        .iter()
        .flat_map(|i| i.existing_pointers.iter())
        .map(|p| format!("• {}", p.content))
        .collect();
    if lines.is_empty() {
        "No bullet points yet".to_string()
    } else {
        lines.join("\n")
    }
}

fn skill_list(skills: &[Skill], separator: &str) -> String {
    if skills.is_empty() {
        return NO_SKILLS.to_string();
    }
    skills
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
