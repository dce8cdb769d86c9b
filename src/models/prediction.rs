//! Wire model for the classifier's response payload.
//!
//! The Space returns a JSON object shaped like
//! `{"label": "benign-ish", "prob_malignant": 0.02, "threshold": 0.2, "note": "..."}`,
//! sometimes wrapped in a single-element array by the Gradio transport.
//! Parsing is total: malformed or missing fields never fail, they fall back
//! to neutral defaults and set the `defaulted` marker so the report can
//! flag that substitution in its diagnostics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categorical label reported by the binary classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "benign-ish")]
    Benignish,
    #[serde(rename = "malignant-ish")]
    Malignantish,
    #[serde(rename = "unknown")]
    Unknown,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Benignish => "benign-ish",
            RiskLabel::Malignantish => "malignant-ish",
            RiskLabel::Unknown => "unknown",
        }
    }

    /// Parse the wire word. Anything unrecognized yields `None` so the
    /// caller can substitute [`RiskLabel::Unknown`] and mark the result
    /// as defaulted.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "benign-ish" => Some(RiskLabel::Benignish),
            "malignant-ish" => Some(RiskLabel::Malignantish),
            "unknown" => Some(RiskLabel::Unknown),
            _ => None,
        }
    }

    pub fn is_malignant(&self) -> bool {
        matches!(self, RiskLabel::Malignantish)
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed classifier response, with defaults substituted where the
/// payload was missing or malformed.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub label: RiskLabel,
    /// Malignancy probability in the 0-1 domain. 0.0 when absent.
    pub prob_malignant: f64,
    /// Decision threshold as display text, `None` when the payload
    /// carried none.
    pub threshold: Option<String>,
    pub note: Option<String>,
    /// The payload as received (after positional unwrapping), kept
    /// verbatim for the diagnostics panel.
    pub raw: Value,
    /// True when any field above was substituted with a default.
    pub defaulted: bool,
}

impl PredictionResult {
    /// Parse a classifier payload. Never fails: a payload of the wrong
    /// shape produces an all-defaults result with `defaulted` set.
    pub fn from_value(raw: Value) -> Self {
        let output = unwrap_positional(raw);
        let mut defaulted = false;

        let label = match output.get("label").and_then(Value::as_str) {
            Some(word) => RiskLabel::from_wire(word).unwrap_or_else(|| {
                defaulted = true;
                RiskLabel::Unknown
            }),
            None => {
                defaulted = true;
                RiskLabel::Unknown
            }
        };

        // `prob_malignant` wins over the legacy `prob` key; only a null
        // (or absent) value falls through to the next key.
        let prob_field = ["prob_malignant", "prob"]
            .iter()
            .find_map(|key| output.get(*key).filter(|v| !v.is_null()));
        let prob_malignant = match prob_field.and_then(coerce_probability) {
            Some(p) => p,
            None => {
                defaulted = true;
                0.0
            }
        };

        let threshold = match output.get("threshold") {
            Some(Value::Number(n)) => n.as_f64().map(js_number_text),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        if threshold.is_none() {
            defaulted = true;
        }

        let note = output
            .get("note")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            label,
            prob_malignant,
            threshold,
            note,
            raw: output,
            defaulted,
        }
    }
}

/// Endpoints declared with positional outputs wrap the payload in a
/// single-element array. Unwrap it; everything else passes through.
fn unwrap_positional(value: Value) -> Value {
    match value {
        Value::Array(mut items) => {
            if items.is_empty() {
                Value::Null
            } else {
                items.swap_remove(0)
            }
        }
        other => other,
    }
}

/// Loose numeric coercion for the probability field: numbers pass
/// through, numeric strings parse, booleans map to 0/1. Anything else
/// (or a non-finite result) is rejected.
fn coerce_probability(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|p| p.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|p| p.is_finite())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Shortest round-trip rendering of a number, the same text a browser
/// template literal shows: `0.2` rather than `0.20`, `1` rather than `1.0`.
fn js_number_text(n: f64) -> String {
    format!("{}", n)
}
