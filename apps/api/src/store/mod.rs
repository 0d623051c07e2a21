//! Persistence contract consumed by the insight and profile flows.
//!
//! `PgInsightStore` is the production backend. `AppState` carries an
//! `Arc<dyn InsightStore>` so tests can swap in the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::insight::IndustryInsight;
use crate::models::user::{NewUserProfile, ProfileUpdate, User};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgInsightStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Result of an insert guarded by a unique key.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    Inserted(T),
    /// Another writer already holds the key; re-read to get its row.
    AlreadyExists,
}

#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn find_user(&self, external_id: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(
        &self,
        external_id: &str,
        profile: &NewUserProfile,
    ) -> Result<InsertOutcome<User>, StoreError>;

    async fn find_insight(&self, industry: &str) -> Result<Option<IndustryInsight>, StoreError>;

    async fn insert_insight(
        &self,
        insight: &IndustryInsight,
    ) -> Result<InsertOutcome<IndustryInsight>, StoreError>;

    /// Overwrites the row keyed by `insight.industry`.
    async fn update_insight(&self, insight: &IndustryInsight)
        -> Result<IndustryInsight, StoreError>;

    /// Insights whose `next_update` is at or before `now`, oldest first.
    async fn list_due_insights(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<IndustryInsight>, StoreError>;

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// A unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_insight(&mut self, industry: &str)
        -> Result<Option<IndustryInsight>, StoreError>;

    async fn insert_insight(
        &mut self,
        insight: &IndustryInsight,
    ) -> Result<InsertOutcome<IndustryInsight>, StoreError>;

    async fn update_user_profile(
        &mut self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<User, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
