//! Presentation model for a classification result.
//!
//! Everything a shell needs to paint the report is computed up front:
//! status line, tone, risk band, gauge value, chips, and the
//! recommendation list. The shell renders these verbatim and adds no
//! interpretation of its own.

use serde::Serialize;

use super::prediction::RiskLabel;

/// Visual tone of the report, mapped by the shell to its accent colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Good,
    Warn,
    Bad,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Good => "good",
            Tone::Warn => "warn",
            Tone::Bad => "bad",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Five-level risk band over the malignancy probability.
///
/// Variant order matches increasing probability, so the derived `Ord`
/// agrees with the banding thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskBand {
    pub fn name(&self) -> &'static str {
        match self {
            RiskBand::VeryLow => "Very low",
            RiskBand::Low => "Low",
            RiskBand::Moderate => "Moderate",
            RiskBand::High => "High",
            RiskBand::VeryHigh => "Very high",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            RiskBand::VeryLow | RiskBand::Low => Tone::Good,
            RiskBand::Moderate | RiskBand::High => Tone::Warn,
            RiskBand::VeryHigh => Tone::Bad,
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One advisory line: a bolded lead phrase plus body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub lead: String,
    pub body: String,
}

impl Recommendation {
    pub fn new(lead: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            lead: lead.into(),
            body: body.into(),
        }
    }
}

/// Fully interpreted result, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayModel {
    pub label: RiskLabel,
    /// Headline, either "Higher risk" or "Lower risk".
    pub status: String,
    pub tone: Tone,
    pub band: RiskBand,
    pub probability: f64,
    /// Probability rounded to a whole percentage for the score text.
    pub percentage: i64,
    /// Percentage clamped to 0-100 for the gauge sweep.
    pub gauge_percent: u8,
    /// Decision threshold as display text, `—` when absent.
    pub threshold: String,
    pub note: Option<String>,
    pub summary_title: String,
    pub summary_body: String,
    pub chips: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    /// Pretty-printed payload for the diagnostics panel.
    pub raw_json: String,
    pub defaulted: bool,
}
