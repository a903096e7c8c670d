//! In-memory `RecordStore` used by tests across the crate.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::RecordStore;
use crate::models::resume::{BulletPoint, NewBulletPoint, ResumeItem, UploadedPdf};
use crate::models::user::{Education, Skill, User};

#[derive(Default)]
pub struct InMemoryStore {
    users: Vec<User>,
    items: Vec<ResumeItem>,
    points: Mutex<Vec<BulletPoint>>,
    skills: Vec<Skill>,
    education: Vec<Education>,
}

impl InMemoryStore {
    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_item(mut self, item: ResumeItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_point(self, point: BulletPoint) -> Self {
        self.points.lock().unwrap().push(point);
        self
    }

    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_education(mut self, education: Education) -> Self {
        self.education.push(education);
        self
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn select_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn select_resume_items(&self, user_id: Uuid) -> Result<Vec<ResumeItem>, sqlx::Error> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn select_resume_item(&self, item_id: Uuid) -> Result<Option<ResumeItem>, sqlx::Error> {
        Ok(self.items.iter().find(|i| i.id == item_id).cloned())
    }

    // Deliberately unordered so callers are tested for sorting.
    async fn select_points(&self, item_ids: &[Uuid]) -> Result<Vec<BulletPoint>, sqlx::Error> {
        Ok(self
            .points
            .lock()
            .unwrap()
            .iter()
            .filter(|p| item_ids.contains(&p.resume_item_id))
            .cloned()
            .collect())
    }

    async fn select_skills(&self, user_id: Uuid) -> Result<Vec<Skill>, sqlx::Error> {
        Ok(self
            .skills
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn select_education(&self, user_id: Uuid) -> Result<Vec<Education>, sqlx::Error> {
        Ok(self
            .education
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_point(&self, point: NewBulletPoint) -> Result<BulletPoint, sqlx::Error> {
        let row = BulletPoint {
            id: Uuid::new_v4(),
            resume_item_id: point.resume_item_id,
            user_id: point.user_id,
            content: point.content,
            display_order: point.display_order,
            usage_count: 0,
            created_at: Utc::now(),
        };
        self.points.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn insert_uploaded_pdf(
        &self,
        user_id: Uuid,
        pdf_filename: &str,
    ) -> Result<UploadedPdf, sqlx::Error> {
        Ok(UploadedPdf {
            id: Uuid::new_v4(),
            user_id,
            pdf_filename: pdf_filename.to_string(),
        })
    }
}

/// Store whose every call fails, for degraded-mode tests.
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn select_user(&self, _user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn select_resume_items(&self, _user_id: Uuid) -> Result<Vec<ResumeItem>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn select_resume_item(&self, _item_id: Uuid) -> Result<Option<ResumeItem>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn select_points(&self, _item_ids: &[Uuid]) -> Result<Vec<BulletPoint>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn select_skills(&self, _user_id: Uuid) -> Result<Vec<Skill>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn select_education(&self, _user_id: Uuid) -> Result<Vec<Education>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn insert_point(&self, _point: NewBulletPoint) -> Result<BulletPoint, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn insert_uploaded_pdf(
        &self,
        _user_id: Uuid,
        _pdf_filename: &str,
    ) -> Result<UploadedPdf, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }
}

pub mod fixtures {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use crate::models::resume::{BulletPoint, ItemType, ResumeItem};
    use crate::models::user::{Education, Skill, User};

    pub fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: Some(name.to_string()),
            email: "ada@example.com".to_string(),
            phone: Some("+1 555 0100".to_string()),
            about: None,
            location: Some("London".to_string()),
        }
    }

    pub fn skill(user_id: Uuid, name: &str) -> Skill {
        Skill {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            category: None,
            level: None,
        }
    }

    pub fn item(user_id: Uuid, item_type: ItemType, title: &str, org: Option<&str>) -> ResumeItem {
        ResumeItem {
            id: Uuid::new_v4(),
            user_id,
            item_type: item_type.as_str().to_string(),
            title: title.to_string(),
            organization: org.map(str::to_string),
            description: Some(format!("Worked on {title}")),
            location: None,
            employment_type: None,
            start_date: NaiveDate::from_ymd_opt(2021, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2023, 6, 15),
            is_current: false,
        }
    }

    pub fn experience(user_id: Uuid, title: &str, company: &str) -> ResumeItem {
        item(user_id, ItemType::Experience, title, Some(company))
    }

    pub fn project(user_id: Uuid, title: &str) -> ResumeItem {
        item(user_id, ItemType::Project, title, None)
    }

    pub fn point(item: &ResumeItem, content: &str, display_order: i32) -> BulletPoint {
        BulletPoint {
            id: Uuid::new_v4(),
            resume_item_id: item.id,
            user_id: item.user_id,
            content: content.to_string(),
            display_order,
            usage_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn education(user_id: Uuid, degree: &str, institution: &str) -> Education {
        Education {
            id: Uuid::new_v4(),
            user_id,
            title: degree.to_string(),
            description: Some(institution.to_string()),
            grade: None,
            start_date: NaiveDate::from_ymd_opt(2015, 9, 1),
            end_date: NaiveDate::from_ymd_opt(2019, 6, 1),
        }
    }
}
