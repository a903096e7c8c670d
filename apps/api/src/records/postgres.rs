use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::RecordStore;
use crate::models::resume::{BulletPoint, NewBulletPoint, ResumeItem, UploadedPdf};
use crate::models::user::{Education, Skill, User};

const RESUME_ITEM_COLUMNS: &str = "id, user_id, item_type, title, organization, description, \
    location, employment_type, start_date, end_date, COALESCE(is_current, false) AS is_current";

const POINT_COLUMNS: &str = "id, resume_item_id, user_id, content, display_order, \
    COALESCE(usage_count, 0) AS usage_count, created_at";

/// PostgreSQL-backed record store.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn select_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, phone, about, location FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn select_resume_items(&self, user_id: Uuid) -> Result<Vec<ResumeItem>, sqlx::Error> {
        let sql = format!(
            "SELECT {RESUME_ITEM_COLUMNS} FROM resume_items WHERE user_id = $1 \
             ORDER BY start_date DESC NULLS LAST, created_at DESC"
        );
        sqlx::query_as::<_, ResumeItem>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn select_resume_item(&self, item_id: Uuid) -> Result<Option<ResumeItem>, sqlx::Error> {
        let sql = format!("SELECT {RESUME_ITEM_COLUMNS} FROM resume_items WHERE id = $1");
        sqlx::query_as::<_, ResumeItem>(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn select_points(&self, item_ids: &[Uuid]) -> Result<Vec<BulletPoint>, sqlx::Error> {
        let sql = format!(
            "SELECT {POINT_COLUMNS} FROM resume_item_points WHERE resume_item_id = ANY($1) \
             ORDER BY display_order ASC, created_at ASC"
        );
        sqlx::query_as::<_, BulletPoint>(&sql)
            .bind(item_ids)
            .fetch_all(&self.pool)
            .await
    }

    async fn select_skills(&self, user_id: Uuid) -> Result<Vec<Skill>, sqlx::Error> {
        sqlx::query_as::<_, Skill>(
            "SELECT id, user_id, name, category, level FROM skills WHERE user_id = $1 \
             ORDER BY category NULLS LAST, name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn select_education(&self, user_id: Uuid) -> Result<Vec<Education>, sqlx::Error> {
        sqlx::query_as::<_, Education>(
            "SELECT id, user_id, title, description, grade, start_date, end_date \
             FROM education WHERE user_id = $1 \
             ORDER BY start_date DESC NULLS LAST, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn insert_point(&self, point: NewBulletPoint) -> Result<BulletPoint, sqlx::Error> {
        let sql = format!(
            "INSERT INTO resume_item_points (id, resume_item_id, user_id, content, display_order) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {POINT_COLUMNS}"
        );
        sqlx::query_as::<_, BulletPoint>(&sql)
            .bind(Uuid::new_v4())
            .bind(point.resume_item_id)
            .bind(point.user_id)
            .bind(&point.content)
            .bind(point.display_order)
            .fetch_one(&self.pool)
            .await
    }

    async fn insert_uploaded_pdf(
        &self,
        user_id: Uuid,
        pdf_filename: &str,
    ) -> Result<UploadedPdf, sqlx::Error> {
        sqlx::query_as::<_, UploadedPdf>(
            "INSERT INTO user_uploaded_pdfs (user_id, pdf_filename) VALUES ($1, $2) \
             RETURNING id, user_id, pdf_filename",
        )
        .bind(user_id)
        .bind(pdf_filename)
        .fetch_one(&self.pool)
        .await
    }
}
