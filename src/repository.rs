use crate::models::{AdminDashboardStats, ContentItem, ContentRow, NewContent, Profile};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The catalog and profile store. Handlers depend on this trait only, so the
/// Postgres implementation can be swapped for an in-memory one in tests.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Catalog ---
    // Every well-formed item, newest first. Gating is the caller's job.
    async fn list_content(&self) -> Vec<ContentItem>;
    async fn get_content(&self, id: Uuid) -> Option<ContentItem>;
    async fn create_content(&self, content: NewContent, created_by: Uuid) -> Option<ContentItem>;
    async fn delete_content(&self, id: Uuid) -> bool;

    // --- Profiles ---
    async fn get_profile(&self, id: Uuid) -> Option<Profile>;
    async fn create_profile(&self, profile: Profile) -> Option<Profile>;
    async fn set_premium(&self, id: Uuid, is_premium: bool) -> Option<Profile>;

    // Counters for the admin dashboard; `today` decides what is still scheduled.
    async fn get_stats(&self, today: NaiveDate) -> AdminDashboardStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const CONTENT_COLUMNS: &str = "id, title, description, type, text_content, file_url, created_at, \
     is_premium, is_locked, unlock_days, release_date, created_by";

const PROFILE_COLUMNS: &str = "id, email, full_name, role, is_premium";

/// Converts raw rows, dropping the malformed ones so they can never be served.
pub fn rows_into_items(rows: Vec<ContentRow>) -> Vec<ContentItem> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            ContentItem::try_from(row)
                .map_err(|e| tracing::warn!(content_id = %id, "dropping malformed content row: {}", e))
                .ok()
        })
        .collect()
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("count error ({}): {:?}", sql, e);
                0
            })
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_content
    ///
    /// The full catalog ordered by creation time, newest first.
    async fn list_content(&self) -> Vec<ContentItem> {
        let query = format!(
            "SELECT {} FROM content ORDER BY created_at DESC",
            CONTENT_COLUMNS
        );

        match sqlx::query_as::<_, ContentRow>(&query).fetch_all(&self.pool).await {
            Ok(rows) => rows_into_items(rows),
            Err(e) => {
                tracing::error!("list_content error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_content(&self, id: Uuid) -> Option<ContentItem> {
        let query = format!("SELECT {} FROM content WHERE id = $1", CONTENT_COLUMNS);

        let row = sqlx::query_as::<_, ContentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_content error: {:?}", e);
                None
            })?;

        rows_into_items(vec![row]).pop()
    }

    /// create_content
    ///
    /// Inserts a validated item. The text/file columns are split out of the body
    /// variant; `created_at` is set by the database.
    async fn create_content(&self, content: NewContent, created_by: Uuid) -> Option<ContentItem> {
        let unlock_days = match i32::try_from(content.unlock_days) {
            Ok(days) => days,
            Err(_) => {
                tracing::error!("create_content: unlock_days {} out of range", content.unlock_days);
                return None;
            }
        };

        let query = format!(
            r#"
            INSERT INTO content
                (id, title, description, type, text_content, file_url, created_by,
                 is_premium, is_locked, unlock_days, release_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            RETURNING {}
            "#,
            CONTENT_COLUMNS
        );

        let row = sqlx::query_as::<_, ContentRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&content.title)
            .bind(&content.description)
            .bind(content.body.content_type().as_str())
            .bind(content.body.text_content())
            .bind(content.body.file_url())
            .bind(created_by)
            .bind(content.is_premium)
            .bind(content.is_locked)
            .bind(unlock_days)
            .bind(content.release_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| tracing::error!("create_content error: {:?}", e))
            .ok()?;

        rows_into_items(vec![row]).pop()
    }

    async fn delete_content(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM content WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_content error: {:?}", e);
                false
            }
        }
    }

    /// get_profile
    ///
    /// Role and premium flag of a user, as needed to resolve a `Viewer`.
    async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        let query = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);

        sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_profile error: {:?}", e);
                None
            })
    }

    /// create_profile
    ///
    /// Mirrors an identity created at the auth provider into `public.profiles`.
    async fn create_profile(&self, profile: Profile) -> Option<Profile> {
        let query = format!(
            "INSERT INTO profiles (id, email, full_name, role, is_premium) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            PROFILE_COLUMNS
        );

        sqlx::query_as::<_, Profile>(&query)
            .bind(profile.id)
            .bind(&profile.email)
            .bind(&profile.full_name)
            .bind(&profile.role)
            .bind(profile.is_premium)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| tracing::error!("create_profile error: {:?}", e))
            .ok()
    }

    async fn set_premium(&self, id: Uuid, is_premium: bool) -> Option<Profile> {
        let query = format!(
            "UPDATE profiles SET is_premium = $1 WHERE id = $2 RETURNING {}",
            PROFILE_COLUMNS
        );

        sqlx::query_as::<_, Profile>(&query)
            .bind(is_premium)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("set_premium error: {:?}", e);
                None
            })
    }

    /// get_stats
    ///
    /// Compiles the dashboard counters. A failing counter reads as zero.
    async fn get_stats(&self, today: NaiveDate) -> AdminDashboardStats {
        let scheduled_content = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM content WHERE release_date > $1",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_stats error (scheduled): {:?}", e);
            0
        });

        AdminDashboardStats {
            total_content: self.count("SELECT COUNT(*) FROM content").await,
            premium_content: self.count("SELECT COUNT(*) FROM content WHERE is_premium").await,
            locked_content: self.count("SELECT COUNT(*) FROM content WHERE is_locked AND unlock_days > 0")
                .await,
            scheduled_content,
            total_users: self.count("SELECT COUNT(*) FROM profiles").await,
            premium_users: self.count("SELECT COUNT(*) FROM profiles WHERE is_premium").await,
        }
    }
}
