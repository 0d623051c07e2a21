use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// How long a freshly written insight stays current before the refresh job picks it up.
pub fn refresh_cadence() -> Duration {
    Duration::days(7)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "demand_level", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DemandLevel {
    High,
    #[default]
    Medium,
    Low,
}

impl DemandLevel {
    /// Matches an already-uppercased label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "market_outlook", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketOutlook {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl MarketOutlook {
    /// Matches an already-uppercased label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "POSITIVE" => Some(Self::Positive),
            "NEUTRAL" => Some(Self::Neutral),
            "NEGATIVE" => Some(Self::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub role: String,
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub location: String,
}

/// The model-derived part of an insight, independent of storage bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightFields {
    pub salary_ranges: Vec<SalaryRange>,
    pub growth_rate: f64,
    pub demand_level: DemandLevel,
    pub top_skills: Vec<String>,
    pub market_outlook: MarketOutlook,
    pub key_trends: Vec<String>,
    pub recommended_skills: Vec<String>,
}

/// One cached insight per industry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryInsight {
    pub id: Uuid,
    pub industry: String,
    #[serde(flatten)]
    pub fields: InsightFields,
    pub last_updated: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
}

impl IndustryInsight {
    pub fn new(industry: &str, fields: InsightFields, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            industry: industry.to_string(),
            fields,
            last_updated: now,
            next_update: now + refresh_cadence(),
        }
    }

    /// True when a persisted row has lost data the dashboard relies on.
    pub fn needs_repair(&self) -> bool {
        let f = &self.fields;
        f.salary_ranges.is_empty()
            || f.top_skills.is_empty()
            || f.key_trends.is_empty()
            || f.recommended_skills.is_empty()
            || !f.growth_rate.is_finite()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct IndustryInsightRow {
    pub id: Uuid,
    pub industry: String,
    pub salary_ranges: Json<Vec<SalaryRange>>,
    pub growth_rate: f64,
    pub demand_level: DemandLevel,
    pub top_skills: Vec<String>,
    pub market_outlook: MarketOutlook,
    pub key_trends: Vec<String>,
    pub recommended_skills: Vec<String>,
    pub last_updated: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
}

impl From<IndustryInsightRow> for IndustryInsight {
    fn from(row: IndustryInsightRow) -> Self {
        Self {
            id: row.id,
            industry: row.industry,
            fields: InsightFields {
                salary_ranges: row.salary_ranges.0,
                growth_rate: row.growth_rate,
                demand_level: row.demand_level,
                top_skills: row.top_skills,
                market_outlook: row.market_outlook,
                key_trends: row.key_trends,
                recommended_skills: row.recommended_skills,
            },
            last_updated: row.last_updated,
            next_update: row.next_update,
        }
    }
}
