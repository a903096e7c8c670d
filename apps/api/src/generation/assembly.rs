//! Resume Assembly: merges the model's selection with static record fields.
//!
//! Contact details, education and dates always come from the database. The
//! model only chooses which experiences, projects, bullets and skills appear.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::generation::extractor::{filter_skills, CompletionResult};
use crate::models::resume::{ItemType, ResumeItem, UserBundle};

pub const MAX_EXPERIENCES: usize = 2;
pub const MAX_EXPERIENCE_POINTS: usize = 4;
pub const MAX_PROJECTS: usize = 2;
pub const MAX_PROJECT_POINTS: usize = 3;

const PRESENT: &str = "Present";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceBlock {
    pub title: String,
    pub company: String,
    pub start_date: String,
    pub end_date: String,
    pub points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBlock {
    pub title: String,
    pub date: String,
    pub points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationBlock {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

/// Final payload of the full-résumé flow, shaped for the front-end editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailoredResume {
    pub contact_info: ContactInfo,
    pub skills: Vec<String>,
    pub experiences: Vec<ExperienceBlock>,
    pub projects: Vec<ProjectBlock>,
    pub education: Vec<EducationBlock>,
}

/// `YYYY-MM`, or empty when the date is unknown.
pub fn format_month(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

/// `YYYY`, or empty when the date is unknown.
pub fn format_year(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y").to_string()).unwrap_or_default()
}

/// A current role always reads "Present", whatever end date is stored.
pub fn display_end_date(end_date: Option<NaiveDate>, is_current: bool) -> String {
    if is_current {
        PRESENT.to_string()
    } else {
        format_month(end_date)
    }
}

/// First record of `item_type` whose title matches exactly (case-sensitive).
fn find_record<'a>(
    bundle: &'a UserBundle,
    title: &str,
    item_type: ItemType,
) -> Option<&'a ResumeItem> {
    bundle
        .resume_items
        .iter()
        .map(|i| &i.item)
        .find(|i| i.is(item_type) && i.title == title)
}

pub fn assemble_resume(bundle: &UserBundle, result: &CompletionResult) -> TailoredResume {
    let selection = &result.selection;

    let contact_info = bundle
        .user
        .as_ref()
        .map(|u| ContactInfo {
            name: u.name.clone().unwrap_or_default(),
            email: u.email.clone(),
            phone: u.phone.clone().unwrap_or_default(),
        })
        .unwrap_or_default();

    let experiences = selection
        .selected_experiences
        .iter()
        .take(MAX_EXPERIENCES)
        .map(|exp| {
            let record = find_record(bundle, &exp.title, ItemType::Experience);
            let company = if exp.company.trim().is_empty() {
                record
                    .and_then(|r| r.organization.clone())
                    .unwrap_or_default()
            } else {
                exp.company.clone()
            };
            ExperienceBlock {
                title: exp.title.clone(),
                company,
                start_date: record.map(|r| format_month(r.start_date)).unwrap_or_default(),
                end_date: record
                    .map(|r| display_end_date(r.end_date, r.is_current))
                    .unwrap_or_default(),
                points: exp.points.iter().take(MAX_EXPERIENCE_POINTS).cloned().collect(),
            }
        })
        .collect();

    let projects = selection
        .selected_projects
        .iter()
        .take(MAX_PROJECTS)
        .map(|proj| {
            let date = find_record(bundle, &proj.title, ItemType::Project)
                .map(project_date)
                .unwrap_or_default();
            ProjectBlock {
                title: proj.title.clone(),
                date,
                points: proj.points.iter().take(MAX_PROJECT_POINTS).cloned().collect(),
            }
        })
        .collect();

    TailoredResume {
        contact_info,
        skills: filter_skills(&selection.selected_skills, &bundle.skill_names()),
        experiences,
        projects,
        education: education_blocks(bundle),
    }
}

fn project_date(record: &ResumeItem) -> String {
    if record.is_current {
        return PRESENT.to_string();
    }
    format_year(record.end_date.or(record.start_date))
}

/// Education table rows first, then résumé items typed `education`.
fn education_blocks(bundle: &UserBundle) -> Vec<EducationBlock> {
    let from_table = bundle.education.iter().map(|e| EducationBlock {
        degree: e.title.clone(),
        institution: e.description.clone().unwrap_or_default(),
        year: format_year(e.end_date.or(e.start_date)),
    });

    let from_items = bundle
        .resume_items
        .iter()
        .map(|i| &i.item)
        .filter(|i| i.is(ItemType::Education))
        .map(|i| EducationBlock {
            degree: i.title.clone(),
            institution: i.organization.clone().unwrap_or_default(),
            year: if i.is_current {
                PRESENT.to_string()
            } else {
                format_year(i.end_date.or(i.start_date))
            },
        });

    from_table.chain(from_items).collect()
}
