//! In-memory `InsightStore` for tests. Transactions stage writes and apply them on commit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::insight::IndustryInsight;
use crate::models::user::{NewUserProfile, ProfileUpdate, User};
use crate::store::{InsertOutcome, InsightStore, StoreError, StoreTransaction};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    insights: HashMap<String, IndustryInsight>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_profile_updates: Arc<AtomicBool>,
    failing_insight_updates: Arc<Mutex<Vec<String>>>,
    /// Number of upcoming insight reads that pretend the row is missing, as if a
    /// concurrent writer committed between our read and our insert.
    stale_reads: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, external_id: &str, industry: Option<&str>) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            email: Some(format!("{external_id}@example.com")),
            name: None,
            image_url: None,
            industry: industry.map(str::to_string),
            experience: None,
            bio: None,
            skills: vec![],
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .users
            .insert(user.id, user.clone());
        user
    }

    pub fn seed_insight(&self, insight: IndustryInsight) {
        self.state
            .lock()
            .unwrap()
            .insights
            .insert(insight.industry.clone(), insight);
    }

    pub fn insight(&self, industry: &str) -> Option<IndustryInsight> {
        self.state.lock().unwrap().insights.get(industry).cloned()
    }

    pub fn insight_count(&self) -> usize {
        self.state.lock().unwrap().insights.len()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.state.lock().unwrap().users.get(&id).cloned()
    }

    pub fn fail_profile_updates(&self) {
        self.fail_profile_updates.store(true, Ordering::SeqCst);
    }

    /// Makes `update_insight` fail for one industry.
    pub fn fail_insight_updates_for(&self, industry: &str) {
        self.failing_insight_updates
            .lock()
            .unwrap()
            .push(industry.to_string());
    }

    pub fn hide_insights_for_reads(&self, reads: usize) {
        self.stale_reads.store(reads, Ordering::SeqCst);
    }

    fn take_stale_read(&self) -> bool {
        self.stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn read_insight(&self, industry: &str) -> Option<IndustryInsight> {
        if self.take_stale_read() {
            return None;
        }
        self.insight(industry)
    }
}

#[async_trait]
impl InsightStore for MemoryStore {
    async fn find_user(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .values()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn create_user(
        &self,
        external_id: &str,
        profile: &NewUserProfile,
    ) -> Result<InsertOutcome<User>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.users.values().any(|u| u.external_id == external_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            image_url: profile.image_url.clone(),
            industry: None,
            experience: None,
            bio: None,
            skills: vec![],
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(InsertOutcome::Inserted(user))
    }

    async fn find_insight(&self, industry: &str) -> Result<Option<IndustryInsight>, StoreError> {
        Ok(self.read_insight(industry))
    }

    async fn insert_insight(
        &self,
        insight: &IndustryInsight,
    ) -> Result<InsertOutcome<IndustryInsight>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.insights.contains_key(&insight.industry) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state
            .insights
            .insert(insight.industry.clone(), insight.clone());
        Ok(InsertOutcome::Inserted(insight.clone()))
    }

    async fn update_insight(
        &self,
        insight: &IndustryInsight,
    ) -> Result<IndustryInsight, StoreError> {
        if self
            .failing_insight_updates
            .lock()
            .unwrap()
            .contains(&insight.industry)
        {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().unwrap();
        let slot = state
            .insights
            .get_mut(&insight.industry)
            .ok_or_else(|| StoreError::NotFound(format!("insight '{}'", insight.industry)))?;
        *slot = IndustryInsight {
            id: slot.id,
            ..insight.clone()
        };
        Ok(slot.clone())
    }

    async fn list_due_insights(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<IndustryInsight>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut due: Vec<_> = state
            .insights
            .values()
            .filter(|i| i.next_update <= now)
            .cloned()
            .collect();
        due.sort_by_key(|i| i.next_update);
        Ok(due)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            staged_insights: HashMap::new(),
            staged_users: HashMap::new(),
        }))
    }
}

pub struct MemoryTransaction {
    store: MemoryStore,
    staged_insights: HashMap<String, IndustryInsight>,
    staged_users: HashMap<Uuid, User>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_insight(
        &mut self,
        industry: &str,
    ) -> Result<Option<IndustryInsight>, StoreError> {
        if let Some(staged) = self.staged_insights.get(industry) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.store.read_insight(industry))
    }

    async fn insert_insight(
        &mut self,
        insight: &IndustryInsight,
    ) -> Result<InsertOutcome<IndustryInsight>, StoreError> {
        if self.staged_insights.contains_key(&insight.industry)
            || self.store.insight(&insight.industry).is_some()
        {
            return Ok(InsertOutcome::AlreadyExists);
        }
        self.staged_insights
            .insert(insight.industry.clone(), insight.clone());
        Ok(InsertOutcome::Inserted(insight.clone()))
    }

    async fn update_user_profile(
        &mut self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<User, StoreError> {
        if self.store.fail_profile_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut user = match self.staged_users.get(&user_id) {
            Some(staged) => staged.clone(),
            None => self
                .store
                .user(user_id)
                .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?,
        };
        user.industry = Some(update.industry.clone());
        user.experience = Some(update.experience);
        user.bio = update.bio.clone();
        user.skills = update.skills.clone();
        user.updated_at = Utc::now();
        self.staged_users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            store,
            staged_insights,
            staged_users,
        } = *self;
        let mut state = store.state.lock().unwrap();
        for (industry, insight) in staged_insights {
            state.insights.entry(industry).or_insert(insight);
        }
        state.users.extend(staged_users);
        Ok(())
    }
}
