//! Typed report sections and their validate-and-coerce rules.
//!
//! Model output is untrusted. Every section is rebuilt from a raw
//! [`serde_json::Value`] here, so the rest of the pipeline only sees
//! well-formed reports: list sections are always arrays of at most
//! [`MAX_SECTION_ITEMS`] entries and string sections are always strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

/// Upper bound on entries in any list section.
pub const MAX_SECTION_ITEMS: usize = 5;
/// Upper bound on per-video deep dives in one report.
pub const MAX_VIDEO_ANALYSES: usize = 3;

/// A labelled insight such as `{ "pattern": ..., "description": ... }`.
///
/// The label key differs per section; it is supplied when reading and
/// writing so one type covers all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedInsight {
    pub name: String,
    pub description: String,
}

impl NamedInsight {
    fn from_item(item: &Value, label_key: &str) -> Option<Self> {
        match item {
            Value::String(s) if !s.trim().is_empty() => Some(Self {
                name: s.trim().to_string(),
                description: String::new(),
            }),
            Value::Object(obj) => {
                let name = [label_key, "name", "title"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(Value::as_str))
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                let description = obj
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if name.is_empty() && description.is_empty() {
                    None
                } else {
                    Some(Self { name, description })
                }
            }
            _ => None,
        }
    }

    fn to_value(&self, label_key: &str) -> Value {
        let mut obj = Map::new();
        obj.insert(label_key.to_string(), Value::String(self.name.clone()));
        obj.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        Value::Object(obj)
    }
}

/// Reads a list section, coercing anything that is not an array to empty.
fn insights(obj: &Map<String, Value>, section: &str, label_key: &str) -> Vec<NamedInsight> {
    let Some(Value::Array(items)) = obj.get(section) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| NamedInsight::from_item(item, label_key))
        .take(MAX_SECTION_ITEMS)
        .collect()
}

/// Reads a string section; numbers are stringified, anything else is empty.
fn text(obj: &Map<String, Value>, section: &str) -> String {
    match obj.get(section) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn expect_object<'a>(value: &'a Value, section: &str) -> Result<&'a Map<String, Value>, CoreError> {
    value.as_object().ok_or_else(|| CoreError::ReportShape {
        section: section.to_string(),
        reason: format!("expected a JSON object, got {}", json_kind(value)),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Encodes a list section back to the JSON shape the frontend reads.
#[must_use]
pub fn insights_to_value(items: &[NamedInsight], label_key: &str) -> Value {
    Value::Array(items.iter().map(|i| i.to_value(label_key)).collect())
}

/// Market-level overview: summary, patterns, saturation, gaps, opportunities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketOverview {
    pub executive_summary: String,
    pub dominant_patterns: Vec<NamedInsight>,
    pub saturation_level: String,
    pub market_gaps: Vec<NamedInsight>,
    pub strategic_opportunities: Vec<NamedInsight>,
}

impl MarketOverview {
    pub const PATTERN_KEY: &'static str = "pattern";
    pub const GAP_KEY: &'static str = "gap";
    pub const OPPORTUNITY_KEY: &'static str = "opportunity";

    /// Validates and coerces a decoded model response.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReportShape`] when the value is not an object.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let obj = expect_object(value, "market_overview")?;
        Ok(Self {
            executive_summary: text(obj, "executive_summary"),
            dominant_patterns: insights(obj, "dominant_patterns", Self::PATTERN_KEY),
            saturation_level: text(obj, "saturation_level"),
            market_gaps: insights(obj, "market_gaps", Self::GAP_KEY),
            strategic_opportunities: insights(
                obj,
                "strategic_opportunities",
                Self::OPPORTUNITY_KEY,
            ),
        })
    }
}

/// General strategy: hooks, positioning, sophistication, angles, storytelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyReport {
    pub hook_frameworks: Vec<NamedInsight>,
    pub positioning_analysis: String,
    pub market_sophistication_level: String,
    pub recommended_content_angles: Vec<NamedInsight>,
    pub storytelling_structures: Vec<NamedInsight>,
}

impl StrategyReport {
    pub const FRAMEWORK_KEY: &'static str = "framework";
    pub const ANGLE_KEY: &'static str = "angle";
    pub const STRUCTURE_KEY: &'static str = "structure";

    /// Validates and coerces a decoded model response.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReportShape`] when the value is not an object.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let obj = expect_object(value, "general_strategy")?;
        Ok(Self {
            hook_frameworks: insights(obj, "hook_frameworks", Self::FRAMEWORK_KEY),
            positioning_analysis: text(obj, "positioning_analysis"),
            market_sophistication_level: text(obj, "market_sophistication_level"),
            recommended_content_angles: insights(
                obj,
                "recommended_content_angles",
                Self::ANGLE_KEY,
            ),
            storytelling_structures: insights(obj, "storytelling_structures", Self::STRUCTURE_KEY),
        })
    }
}

/// Deep dive on one top-performing video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoAnalysis {
    pub creator: String,
    pub video_url: String,
    pub title: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub views: u64,
    pub duration: String,
    pub hook_type: String,
    pub hook_text: String,
    pub content_structure: String,
    pub replicable_elements: String,
    pub funnel_role: String,
    pub distribution_analysis: String,
    pub retention_tactics: String,
    pub video_analysis: String,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        Value::String(s) => s
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .unwrap_or(0),
        _ => 0,
    })
}

/// Coerces the per-video response into at most [`MAX_VIDEO_ANALYSES`] items.
///
/// Accepts a bare array, an object wrapping the array under `videos` or
/// `video_analyses`, or a single object. Items that are not objects, or that
/// fail to map onto [`VideoAnalysis`], are dropped.
#[must_use]
pub fn coerce_video_analyses(value: &Value) -> Vec<VideoAnalysis> {
    let items: Vec<Value> = match value {
        Value::Array(items) => items.clone(),
        Value::Object(obj) => match obj.get("videos").or_else(|| obj.get("video_analyses")) {
            Some(Value::Array(items)) => items.clone(),
            _ => vec![value.clone()],
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value::<VideoAnalysis>(item).ok())
        .take(MAX_VIDEO_ANALYSES)
        .collect()
}

/// Everything persisted for one completed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchReport {
    pub overview: MarketOverview,
    pub strategy: StrategyReport,
    /// `None` when there was nothing to analyse per video.
    pub videos: Option<Vec<VideoAnalysis>>,
}
