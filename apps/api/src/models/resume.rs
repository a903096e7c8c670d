use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::{Education, Skill, User};

/// Kind of history a résumé item records. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Experience,
    Project,
    Education,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Experience => "experience",
            ItemType::Project => "project",
            ItemType::Education => "education",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_type: String,
    pub title: String,
    pub organization: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

impl ResumeItem {
    pub fn is(&self, item_type: ItemType) -> bool {
        self.item_type == item_type.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BulletPoint {
    pub id: Uuid,
    pub resume_item_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub display_order: i32,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `resume_item_points`.
#[derive(Debug, Clone)]
pub struct NewBulletPoint {
    pub resume_item_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadedPdf {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pdf_filename: String,
}

/// A résumé item with its existing bullets, sorted by `display_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeItemWithPointers {
    #[serde(flatten)]
    pub item: ResumeItem,
    pub existing_pointers: Vec<BulletPoint>,
}

/// Everything the generation flows need about one user, fetched fresh per request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserBundle {
    pub user: Option<User>,
    pub resume_items: Vec<ResumeItemWithPointers>,
    pub skills: Vec<Skill>,
    pub education: Vec<Education>,
}

impl UserBundle {
    /// Sentinel returned when the store could not be read.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.name.clone()).collect()
    }

    pub fn items_of(&self, item_type: ItemType) -> Vec<ResumeItemWithPointers> {
        self.resume_items
            .iter()
            .filter(|i| i.item.is(item_type))
            .cloned()
            .collect()
    }

    /// Experiences followed by projects, the candidate pool for selection prompts.
    pub fn work_items(&self) -> Vec<ResumeItemWithPointers> {
        let mut items = self.items_of(ItemType::Experience);
        items.extend(self.items_of(ItemType::Project));
        items
    }
}
