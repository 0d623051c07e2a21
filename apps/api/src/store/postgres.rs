use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::models::insight::{IndustryInsight, IndustryInsightRow};
use crate::models::user::{NewUserProfile, ProfileUpdate, User};
use crate::store::{InsertOutcome, InsightStore, StoreError, StoreTransaction};

#[derive(Clone)]
pub struct PgInsightStore {
    pool: PgPool,
}

impl PgInsightStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

async fn find_insight<'e>(
    executor: impl PgExecutor<'e>,
    industry: &str,
) -> Result<Option<IndustryInsight>, StoreError> {
    let row = sqlx::query_as::<_, IndustryInsightRow>(
        "SELECT * FROM industry_insights WHERE industry = $1",
    )
    .bind(industry)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(IndustryInsight::from))
}

/// `ON CONFLICT DO NOTHING` turns a lost creation race into `AlreadyExists`
/// instead of a unique violation.
async fn insert_insight<'e>(
    executor: impl PgExecutor<'e>,
    insight: &IndustryInsight,
) -> Result<InsertOutcome<IndustryInsight>, StoreError> {
    let f = &insight.fields;
    let row = sqlx::query_as::<_, IndustryInsightRow>(
        r#"
        INSERT INTO industry_insights
            (id, industry, salary_ranges, growth_rate, demand_level, top_skills,
             market_outlook, key_trends, recommended_skills, last_updated, next_update)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (industry) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(insight.id)
    .bind(&insight.industry)
    .bind(Json(&f.salary_ranges))
    .bind(f.growth_rate)
    .bind(f.demand_level)
    .bind(&f.top_skills)
    .bind(f.market_outlook)
    .bind(&f.key_trends)
    .bind(&f.recommended_skills)
    .bind(insight.last_updated)
    .bind(insight.next_update)
    .fetch_optional(executor)
    .await?;

    Ok(match row {
        Some(row) => InsertOutcome::Inserted(row.into()),
        None => {
            debug!("Insight for '{}' already exists", insight.industry);
            InsertOutcome::AlreadyExists
        }
    })
}

#[async_trait]
impl InsightStore for PgInsightStore {
    async fn find_user(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_user(
        &self,
        external_id: &str,
        profile: &NewUserProfile,
    ) -> Result<InsertOutcome<User>, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, external_id, email, name, image_url)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(external_id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map_or(InsertOutcome::AlreadyExists, InsertOutcome::Inserted))
    }

    async fn find_insight(&self, industry: &str) -> Result<Option<IndustryInsight>, StoreError> {
        find_insight(&self.pool, industry).await
    }

    async fn insert_insight(
        &self,
        insight: &IndustryInsight,
    ) -> Result<InsertOutcome<IndustryInsight>, StoreError> {
        insert_insight(&self.pool, insight).await
    }

    async fn update_insight(
        &self,
        insight: &IndustryInsight,
    ) -> Result<IndustryInsight, StoreError> {
        let f = &insight.fields;
        let row = sqlx::query_as::<_, IndustryInsightRow>(
            r#"
            UPDATE industry_insights
            SET salary_ranges = $2,
                growth_rate = $3,
                demand_level = $4,
                top_skills = $5,
                market_outlook = $6,
                key_trends = $7,
                recommended_skills = $8,
                last_updated = $9,
                next_update = $10
            WHERE industry = $1
            RETURNING *
            "#,
        )
        .bind(&insight.industry)
        .bind(Json(&f.salary_ranges))
        .bind(f.growth_rate)
        .bind(f.demand_level)
        .bind(&f.top_skills)
        .bind(f.market_outlook)
        .bind(&f.key_trends)
        .bind(&f.recommended_skills)
        .bind(insight.last_updated)
        .bind(insight.next_update)
        .fetch_optional(&self.pool)
        .await?;

        row.map(IndustryInsight::from)
            .ok_or_else(|| StoreError::NotFound(format!("insight '{}'", insight.industry)))
    }

    async fn list_due_insights(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<IndustryInsight>, StoreError> {
        let rows = sqlx::query_as::<_, IndustryInsightRow>(
            "SELECT * FROM industry_insights WHERE next_update <= $1 ORDER BY next_update ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(IndustryInsight::from).collect())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn find_insight(
        &mut self,
        industry: &str,
    ) -> Result<Option<IndustryInsight>, StoreError> {
        find_insight(&mut *self.tx, industry).await
    }

    async fn insert_insight(
        &mut self,
        insight: &IndustryInsight,
    ) -> Result<InsertOutcome<IndustryInsight>, StoreError> {
        insert_insight(&mut *self.tx, insight).await
    }

    async fn update_user_profile(
        &mut self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET industry = $2,
                experience = $3,
                bio = $4,
                skills = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&update.industry)
        .bind(update.experience)
        .bind(&update.bio)
        .bind(&update.skills)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
