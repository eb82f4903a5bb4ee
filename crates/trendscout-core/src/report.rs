//! Structured documents produced by the enrichment agents.
//!
//! LLM output is first parsed as loose JSON and then validated entry by
//! entry: anything missing a required field is dropped and counted, the rest
//! is kept. A document whose top-level shape is wrong validates to `None`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EMPTY_STARTUPS_JSON: &str = r#"{"startups": []}"#;
pub const EMPTY_TRENDS_JSON: &str = r#"{"trends": []}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Startup {
    pub name: String,
    pub summary: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupList {
    pub startups: Vec<Startup>,
}

impl StartupList {
    pub fn is_empty(&self) -> bool {
        self.startups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtrend {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub startups: Vec<Startup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: u8,
    #[serde(default)]
    pub subtrends: Vec<Subtrend>,
}

/// Document served to the front-end by the final-report pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub trends: Vec<Trend>,
}

/// One entry of the synthesis `top_trends` list.
///
/// Only used as a typed view: the orchestrator copies the raw trend object
/// verbatim so fields the model adds beyond these survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedTrend {
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub trend_name: Option<String>,
    #[serde(default)]
    pub investment_thesis: Option<String>,
}

impl RankedTrend {
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

/// Appended to the assembled report by the verification stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub confidence_score: u8,
    pub assessment: String,
    #[serde(default)]
    pub potential_blind_spots: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl VerificationSummary {
    pub const FORMAT_FAILURE: &'static str = "Verification failed due to LLM format error.";

    /// Low-confidence placeholder carrying the unparsed model output.
    pub fn format_failure(raw_output: impl Into<String>) -> Self {
        Self {
            confidence_score: 1,
            assessment: Self::FORMAT_FAILURE.to_string(),
            potential_blind_spots: Vec::new(),
            raw_output: Some(raw_output.into()),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let summary: VerificationSummary = serde_json::from_value(value.clone()).ok()?;
        let in_range = (1..=10).contains(&summary.confidence_score);
        (in_range && !summary.assessment.trim().is_empty()).then_some(summary)
    }
}

/// The valid part of a document plus how many entries were discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    pub discarded: usize,
}

fn non_blank(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn validate_startup(value: &Value) -> Option<Startup> {
    let object = value.as_object()?;
    Some(Startup {
        name: non_blank(object, "name")?,
        summary: non_blank(object, "summary")?,
        rationale: non_blank(object, "rationale")?,
    })
}

fn validate_startups(values: Option<&Value>, discarded: &mut usize) -> Vec<Startup> {
    let Some(items) = values.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let startup = validate_startup(item);
            if startup.is_none() {
                *discarded += 1;
            }
            startup
        })
        .collect()
}

/// Validate a `{"startups": [...]}` document.
pub fn validate_startup_list(document: &Value) -> Option<Validated<StartupList>> {
    let items = document.get("startups")?;
    if !items.is_array() {
        return None;
    }
    let mut discarded = 0;
    let startups = validate_startups(Some(items), &mut discarded);
    Some(Validated {
        value: StartupList { startups },
        discarded,
    })
}

fn validate_subtrend(value: &Value, discarded: &mut usize) -> Option<Subtrend> {
    let object = value.as_object()?;
    Some(Subtrend {
        id: non_blank(object, "id")?,
        name: non_blank(object, "name")?,
        description: non_blank(object, "description")?,
        startups: validate_startups(object.get("startups"), discarded),
    })
}

fn validate_trend(value: &Value, discarded: &mut usize) -> Option<Trend> {
    let object = value.as_object()?;
    let importance = object.get("importance").and_then(Value::as_u64)?;
    if !(1..=10).contains(&importance) {
        return None;
    }
    let subtrends = object
        .get("subtrends")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let subtrend = validate_subtrend(item, discarded);
                    if subtrend.is_none() {
                        *discarded += 1;
                    }
                    subtrend
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Trend {
        id: non_blank(object, "id")?,
        name: non_blank(object, "name")?,
        description: non_blank(object, "description")?,
        importance: importance as u8,
        subtrends,
    })
}

/// Validate a `{"trends": [...]}` final-report document.
pub fn validate_final_report(document: &Value) -> Option<Validated<FinalReport>> {
    let items = document.get("trends")?.as_array()?;
    let mut discarded = 0;
    let trends = items
        .iter()
        .filter_map(|item| {
            let mut nested = 0;
            match validate_trend(item, &mut nested) {
                Some(trend) => {
                    discarded += nested;
                    Some(trend)
                }
                None => {
                    discarded += 1;
                    None
                }
            }
        })
        .collect();
    Some(Validated {
        value: FinalReport { trends },
        discarded,
    })
}

/// Name used to enrich a ranked trend: `trend_name`, else `name`.
pub fn trend_name(trend: &Value) -> Option<String> {
    let object = trend.as_object()?;
    non_blank(object, "trend_name").or_else(|| non_blank(object, "name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn startup_validation_drops_incomplete_entries() {
        let document = json!({
            "startups": [
                {"name": "Cellular Forge", "summary": "Cell-free manufacturing", "rationale": "Direct fit"},
                {"name": "", "summary": "blank name", "rationale": "x"},
                {"name": "NoRationale", "summary": "missing field"},
                "not an object"
            ]
        });
        let validated = validate_startup_list(&document).unwrap();
        assert_eq!(validated.value.startups.len(), 1);
        assert_eq!(validated.value.startups[0].name, "Cellular Forge");
        assert_eq!(validated.discarded, 3);
    }

    #[test]
    fn startup_validation_rejects_wrong_shape() {
        assert!(validate_startup_list(&json!({"startups": "none"})).is_none());
        assert!(validate_startup_list(&json!({"companies": []})).is_none());
    }

    #[test]
    fn final_report_keeps_valid_trends_only() {
        let document = json!({
            "trends": [
                {
                    "id": "generative-physical-ai",
                    "name": "Generative AI for Physical Engineering",
                    "description": "Models that design parts.",
                    "importance": 9,
                    "subtrends": [
                        {
                            "id": "ai-cad",
                            "name": "AI-native CAD",
                            "description": "Design copilots.",
                            "startups": [
                                {"name": "PartForge", "summary": "Generates CAD", "rationale": "Core niche"},
                                {"name": "Half"}
                            ]
                        },
                        {"id": "no-name", "description": "missing name"}
                    ]
                },
                {"id": "too-important", "name": "Overhyped", "description": "d", "importance": 11},
                {"id": "no-importance", "name": "Vague", "description": "d"}
            ]
        });

        let validated = validate_final_report(&document).unwrap();
        assert_eq!(validated.value.trends.len(), 1);
        let trend = &validated.value.trends[0];
        assert_eq!(trend.importance, 9);
        assert_eq!(trend.subtrends.len(), 1);
        assert_eq!(trend.subtrends[0].startups.len(), 1);
        // one startup, one subtrend, two trends
        assert_eq!(validated.discarded, 4);
    }

    #[test]
    fn verification_summary_requires_score_in_range() {
        let ok = json!({"confidence_score": 7, "assessment": "Solid.", "potential_blind_spots": ["Regulation"]});
        assert!(VerificationSummary::from_value(&ok).is_some());

        let zero = json!({"confidence_score": 0, "assessment": "Solid."});
        assert!(VerificationSummary::from_value(&zero).is_none());

        let text_score = json!({"confidence_score": "high", "assessment": "Solid."});
        assert!(VerificationSummary::from_value(&text_score).is_none());
    }

    #[test]
    fn empty_constants_parse_to_empty_documents() {
        let startups: StartupList = serde_json::from_str(EMPTY_STARTUPS_JSON).unwrap();
        assert!(startups.is_empty());
        let report: FinalReport = serde_json::from_str(EMPTY_TRENDS_JSON).unwrap();
        assert!(report.trends.is_empty());
    }

    #[test]
    fn ranked_trend_view_tolerates_odd_shapes() {
        let ranked = RankedTrend::from_value(&json!({
            "rank": 1,
            "trend_name": "Agentic Infra",
            "investment_thesis": "Tooling layer.",
            "extra": true
        }));
        assert_eq!(ranked.rank, Some(1));
        assert_eq!(ranked.trend_name.as_deref(), Some("Agentic Infra"));

        let odd = RankedTrend::from_value(&json!({"rank": "first"}));
        assert_eq!(odd, RankedTrend::default());
    }

    #[test]
    fn trend_name_prefers_trend_name_field() {
        assert_eq!(
            trend_name(&json!({"trend_name": " Agentic Infra ", "name": "other"})).as_deref(),
            Some("Agentic Infra")
        );
        assert_eq!(trend_name(&json!({"name": "Fallback"})).as_deref(), Some("Fallback"));
        assert_eq!(trend_name(&json!({"trend_name": "   "})), None);
        assert_eq!(trend_name(&json!({"rank": 1})), None);
    }
}
