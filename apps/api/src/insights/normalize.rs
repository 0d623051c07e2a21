//! Insight normalizer: total mapping from a loosely shaped model object to `InsightFields`.
//!
//! Each field has a validity predicate and a fixed default. Defaults satisfy their own
//! predicates, so normalizing a normalized insight is a no-op.

use serde_json::{Map, Value};

use crate::models::insight::{DemandLevel, InsightFields, MarketOutlook, SalaryRange};

const DEFAULT_GROWTH_RATE: f64 = 5.0;
const DEFAULT_LOCATION: &str = "Global";

const DEFAULT_TOP_SKILLS: [&str; 5] = [
    "Python",
    "TensorFlow",
    "PyTorch",
    "Data Modeling",
    "Cloud ML",
];
const DEFAULT_KEY_TRENDS: [&str; 3] = ["Generative AI", "Edge AI", "Responsible AI"];
const DEFAULT_RECOMMENDED_SKILLS: [&str; 3] = ["Leadership", "MLOps", "Prompt Engineering"];

/// (role, min, median, max)
const DEFAULT_SALARY_TABLE: [(&str, f64, f64, f64); 5] = [
    ("Machine Learning Engineer", 90_000.0, 140_000.0, 200_000.0),
    ("Data Scientist", 85_000.0, 130_000.0, 190_000.0),
    ("AI Researcher", 100_000.0, 150_000.0, 220_000.0),
    ("MLOps Engineer", 95_000.0, 135_000.0, 195_000.0),
    ("Computer Vision Engineer", 90_000.0, 138_000.0, 205_000.0),
];

pub fn default_salary_ranges() -> Vec<SalaryRange> {
    DEFAULT_SALARY_TABLE
        .iter()
        .map(|(role, min, median, max)| SalaryRange {
            role: role.to_string(),
            min: *min,
            median: *median,
            max: *max,
            location: DEFAULT_LOCATION.to_string(),
        })
        .collect()
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// The insight stored when the model gives us nothing usable.
pub fn default_insight_fields() -> InsightFields {
    normalize(&Map::new())
}

pub fn normalize(candidate: &Map<String, Value>) -> InsightFields {
    InsightFields {
        salary_ranges: candidate
            .get("salaryRanges")
            .and_then(salary_ranges)
            .unwrap_or_else(default_salary_ranges),
        growth_rate: candidate
            .get("growthRate")
            .and_then(Value::as_f64)
            .filter(|rate| rate.is_finite())
            .unwrap_or(DEFAULT_GROWTH_RATE),
        demand_level: candidate
            .get("demandLevel")
            .and_then(label)
            .and_then(|l| DemandLevel::from_label(&l))
            .unwrap_or_default(),
        top_skills: candidate
            .get("topSkills")
            .and_then(string_list)
            .unwrap_or_else(|| owned(&DEFAULT_TOP_SKILLS)),
        market_outlook: candidate
            .get("marketOutlook")
            .and_then(label)
            .and_then(|l| MarketOutlook::from_label(&l))
            .unwrap_or_default(),
        key_trends: candidate
            .get("keyTrends")
            .and_then(string_list)
            .unwrap_or_else(|| owned(&DEFAULT_KEY_TRENDS)),
        recommended_skills: candidate
            .get("recommendedSkills")
            .and_then(string_list)
            .unwrap_or_else(|| owned(&DEFAULT_RECOMMENDED_SKILLS)),
    }
}

impl InsightFields {
    /// Re-applies the normalizer defaults to an already typed record, e.g. one read
    /// back from storage with emptied arrays.
    pub fn repaired(self) -> Self {
        fn or_default<T>(items: Vec<T>, default: impl FnOnce() -> Vec<T>) -> Vec<T> {
            if items.is_empty() {
                default()
            } else {
                items
            }
        }

        Self {
            salary_ranges: or_default(self.salary_ranges, default_salary_ranges),
            growth_rate: if self.growth_rate.is_finite() {
                self.growth_rate
            } else {
                DEFAULT_GROWTH_RATE
            },
            demand_level: self.demand_level,
            top_skills: or_default(self.top_skills, || owned(&DEFAULT_TOP_SKILLS)),
            market_outlook: self.market_outlook,
            key_trends: or_default(self.key_trends, || owned(&DEFAULT_KEY_TRENDS)),
            recommended_skills: or_default(self.recommended_skills, || {
                owned(&DEFAULT_RECOMMENDED_SKILLS)
            }),
        }
    }
}

/// Coerces any scalar to an uppercased label. Null, containers and blanks count as absent.
fn label(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text.to_uppercase())
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = value
        .as_array()?
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect();
    (!items.is_empty()).then_some(items)
}

fn salary_ranges(value: &Value) -> Option<Vec<SalaryRange>> {
    let ranges: Vec<SalaryRange> = value.as_array()?.iter().filter_map(salary_range).collect();
    (!ranges.is_empty()).then_some(ranges)
}

fn salary_range(value: &Value) -> Option<SalaryRange> {
    let entry = value.as_object()?;
    let role = entry.get("role")?.as_str()?.trim();
    if role.is_empty() {
        return None;
    }
    let location = entry
        .get("location")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCATION);

    Some(SalaryRange {
        role: role.to_string(),
        min: amount(entry.get("min")?)?,
        median: amount(entry.get("median")?)?,
        max: amount(entry.get("max")?)?,
        location: location.to_string(),
    })
}

/// Numbers, or numeric strings such as `"$120,000"` left behind by the repair pass.
fn amount(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .chars()
            .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
            .collect::<String>()
            .parse::<f64>()
            .ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}
