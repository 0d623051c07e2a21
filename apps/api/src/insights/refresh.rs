use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::insights::generator::generate_insights;
use crate::llm_client::TextGenerator;
use crate::models::insight::{refresh_cadence, IndustryInsight};
use crate::store::{InsightStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failed: usize,
}

/// Regenerates every insight whose `next_update` has passed.
///
/// A failed generation or write leaves the row untouched so it is retried on the
/// next pass; the remaining rows are still processed.
pub async fn refresh_due_insights(
    store: &dyn InsightStore,
    model: &dyn TextGenerator,
    now: DateTime<Utc>,
) -> Result<RefreshReport, StoreError> {
    let due = store.list_due_insights(now).await?;
    let mut report = RefreshReport::default();

    for insight in due {
        match generate_insights(model, &insight.industry).await {
            Ok(fields) => {
                let refreshed = IndustryInsight {
                    fields,
                    last_updated: now,
                    next_update: now + refresh_cadence(),
                    ..insight
                };
                match store.update_insight(&refreshed).await {
                    Ok(_) => report.refreshed += 1,
                    Err(e) => {
                        error!(
                            "Failed to save refreshed insight for '{}': {e}",
                            refreshed.industry
                        );
                        report.failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Refresh failed for '{}': {e}", insight.industry);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

pub fn spawn_refresh_loop(
    store: Arc<dyn InsightStore>,
    model: Arc<dyn TextGenerator>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match refresh_due_insights(store.as_ref(), model.as_ref(), Utc::now()).await {
                Ok(report) if report.refreshed + report.failed > 0 => info!(
                    "Insight refresh: {} refreshed, {} failed",
                    report.refreshed, report.failed
                ),
                Ok(_) => {}
                Err(e) => error!("Insight refresh aborted: {e}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::insights::normalize::default_insight_fields;
    use crate::models::insight::{DemandLevel, MarketOutlook};
    use crate::store::memory::MemoryStore;
    use crate::testing::{ScriptedModel, SOFTWARE_INSIGHT_REPLY};

    fn stale(industry: &str, now: DateTime<Utc>) -> IndustryInsight {
        IndustryInsight::new(industry, default_insight_fields(), now - ChronoDuration::days(8))
    }

    #[tokio::test]
    async fn test_due_rows_are_regenerated_and_rescheduled() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let due = stale("tech-software", now);
        store.seed_insight(due.clone());
        let model = ScriptedModel::replying(SOFTWARE_INSIGHT_REPLY);

        let report = refresh_due_insights(&store, &model, now).await.unwrap();

        assert_eq!(report, RefreshReport { refreshed: 1, failed: 0 });
        let row = store.insight("tech-software").unwrap();
        assert_eq!(row.id, due.id);
        assert_eq!(row.fields.demand_level, DemandLevel::High);
        assert_eq!(row.fields.market_outlook, MarketOutlook::Positive);
        assert_eq!(row.last_updated, now);
        assert_eq!(row.next_update, now + refresh_cadence());
    }

    #[tokio::test]
    async fn test_fresh_rows_are_skipped() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.seed_insight(IndustryInsight::new("finance", default_insight_fields(), now));
        let model = ScriptedModel::replying(SOFTWARE_INSIGHT_REPLY);

        let report = refresh_due_insights(&store, &model, now).await.unwrap();

        assert_eq!(report, RefreshReport::default());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_row() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let due = stale("finance", now);
        store.seed_insight(due.clone());
        let model = ScriptedModel::failing();

        let report = refresh_due_insights(&store, &model, now).await.unwrap();

        assert_eq!(report, RefreshReport { refreshed: 0, failed: 1 });
        assert_eq!(store.insight("finance"), Some(due));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_the_pass() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.seed_insight(stale("finance", now));
        store.seed_insight(IndustryInsight::new(
            "retail",
            default_insight_fields(),
            now - ChronoDuration::days(9),
        ));
        store.fail_insight_updates_for("retail");
        let model = ScriptedModel::replying(SOFTWARE_INSIGHT_REPLY);

        let report = refresh_due_insights(&store, &model, now).await.unwrap();

        assert_eq!(report, RefreshReport { refreshed: 1, failed: 1 });
        assert_eq!(model.calls(), 2);
        assert_eq!(store.insight("finance").unwrap().last_updated, now);
        assert!(store.insight("retail").unwrap().next_update < now);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_refreshes_on_first_tick() {
        let store = MemoryStore::new();
        store.seed_insight(stale("retail", Utc::now()));
        let model = Arc::new(ScriptedModel::replying(SOFTWARE_INSIGHT_REPLY));

        let handle = spawn_refresh_loop(
            Arc::new(store.clone()),
            model.clone(),
            Duration::from_secs(3600),
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.abort();

        assert_eq!(model.calls(), 1);
        assert!(store.insight("retail").unwrap().next_update > Utc::now());
    }
}
