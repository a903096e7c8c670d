//! Record Store Accessor: read-only snapshots of a user's résumé data.
//!
//! The generation flows never write through this module; the only inserts are
//! the CRUD bullet-point endpoint and PDF upload bookkeeping.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::resume::{
    BulletPoint, NewBulletPoint, ResumeItem, ResumeItemWithPointers, UploadedPdf, UserBundle,
};
use crate::models::user::{Education, Skill, User};

pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Table-scoped select/insert operations the service needs from its store.
///
/// Each `select_*` is an equality filter on one table with a fixed ordering.
/// Carried in `AppState` as `Arc<dyn RecordStore>`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;

    /// Newest first: `start_date DESC NULLS LAST`.
    async fn select_resume_items(&self, user_id: Uuid) -> Result<Vec<ResumeItem>, sqlx::Error>;

    async fn select_resume_item(&self, item_id: Uuid) -> Result<Option<ResumeItem>, sqlx::Error>;

    /// Bullets for any of `item_ids`, ordered by `display_order` then creation time.
    async fn select_points(&self, item_ids: &[Uuid]) -> Result<Vec<BulletPoint>, sqlx::Error>;

    async fn select_skills(&self, user_id: Uuid) -> Result<Vec<Skill>, sqlx::Error>;

    async fn select_education(&self, user_id: Uuid) -> Result<Vec<Education>, sqlx::Error>;

    async fn insert_point(&self, point: NewBulletPoint) -> Result<BulletPoint, sqlx::Error>;

    async fn insert_uploaded_pdf(
        &self,
        user_id: Uuid,
        pdf_filename: &str,
    ) -> Result<UploadedPdf, sqlx::Error>;
}

/// Loads the user, their résumé items with ordered bullets, skills and education.
///
/// A store failure is logged and degrades to `UserBundle::empty()` rather than
/// failing the request; callers treat a bundle without a user as not found.
pub async fn fetch_user_bundle(store: &dyn RecordStore, user_id: Uuid) -> UserBundle {
    match load_bundle(store, user_id).await {
        Ok(bundle) => {
            info!(
                "Loaded bundle for user {user_id}: {} items, {} skills, {} education rows",
                bundle.resume_items.len(),
                bundle.skills.len(),
                bundle.education.len()
            );
            bundle
        }
        Err(e) => {
            warn!("Record store read failed for user {user_id}, returning empty bundle: {e}");
            UserBundle::empty()
        }
    }
}

async fn load_bundle(store: &dyn RecordStore, user_id: Uuid) -> Result<UserBundle, sqlx::Error> {
    let Some(user) = store.select_user(user_id).await? else {
        return Ok(UserBundle::empty());
    };

    let items = store.select_resume_items(user_id).await?;
    let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let points = if item_ids.is_empty() {
        Vec::new()
    } else {
        store.select_points(&item_ids).await?
    };
    let skills = store.select_skills(user_id).await?;
    let education = store.select_education(user_id).await?;

    Ok(UserBundle {
        user: Some(user),
        resume_items: attach_pointers(items, points),
        skills,
        education,
    })
}

/// Returns the item with its bullets, or `None` when no such item exists.
pub async fn fetch_item_with_pointers(
    store: &dyn RecordStore,
    item_id: Uuid,
) -> Result<Option<ResumeItemWithPointers>, sqlx::Error> {
    let Some(item) = store.select_resume_item(item_id).await? else {
        return Ok(None);
    };
    let points = store.select_points(&[item_id]).await?;
    Ok(attach_pointers(vec![item], points).pop())
}

/// Groups bullets under their owning item, keeping item order and sorting each
/// group by `display_order` (creation time breaks ties).
fn attach_pointers(items: Vec<ResumeItem>, points: Vec<BulletPoint>) -> Vec<ResumeItemWithPointers> {
    let mut by_item: HashMap<Uuid, Vec<BulletPoint>> = HashMap::new();
    for point in points {
        by_item.entry(point.resume_item_id).or_default().push(point);
    }

    items
        .into_iter()
        .map(|item| {
            let mut existing_pointers = by_item.remove(&item.id).unwrap_or_default();
            existing_pointers.sort_by(|a, b| {
                a.display_order
                    .cmp(&b.display_order)
                    .then(a.created_at.cmp(&b.created_at))
            });
            ResumeItemWithPointers {
                item,
                existing_pointers,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::memory::{fixtures, FailingStore, InMemoryStore};
    use super::*;

    #[tokio::test]
    async fn test_bundle_orders_pointers_by_display_order() {
        let user = fixtures::user("Ada Lovelace");
        let item = fixtures::experience(user.id, "Backend Engineer", "Acme");
        let store = InMemoryStore::default()
            .with_user(user.clone())
            .with_item(item.clone())
            .with_point(fixtures::point(&item, "third", 3))
            .with_point(fixtures::point(&item, "first", 1))
            .with_point(fixtures::point(&item, "second", 2));

        let bundle = fetch_user_bundle(&store, user.id).await;

        let contents: Vec<_> = bundle.resume_items[0]
            .existing_pointers
            .iter()
            .map(|p| p.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_bundle_for_unknown_user_is_empty() {
        let store = InMemoryStore::default();
        let bundle = fetch_user_bundle(&store, Uuid::new_v4()).await;
        assert!(bundle.user.is_none());
        assert!(bundle.resume_items.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty_bundle() {
        let bundle = fetch_user_bundle(&FailingStore, Uuid::new_v4()).await;
        assert!(bundle.user.is_none());
        assert!(bundle.skills.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_item_with_pointers_missing_returns_none() {
        let store = InMemoryStore::default();
        let item = fetch_item_with_pointers(&store, Uuid::new_v4()).await.unwrap();
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_fetch_item_with_pointers_only_includes_own_points() {
        let user = fixtures::user("Ada Lovelace");
        let a = fixtures::experience(user.id, "Backend Engineer", "Acme");
        let b = fixtures::project(user.id, "Compiler");
        let store = InMemoryStore::default()
            .with_user(user)
            .with_item(a.clone())
            .with_item(b.clone())
            .with_point(fixtures::point(&a, "Shipped the API", 0))
            .with_point(fixtures::point(&b, "Wrote a parser", 0));

        let found = fetch_item_with_pointers(&store, b.id).await.unwrap().unwrap();
        assert_eq!(found.item.title, "Compiler");
        assert_eq!(found.existing_pointers.len(), 1);
        assert_eq!(found.existing_pointers[0].content, "Wrote a parser");
    }
}
