//! Result interpretation: raw classifier output to a renderable report.
//!
//! The probability is folded into a five-level risk band, the band drives
//! tone and advisory copy, and every string the shell paints is produced
//! here. Wording is deliberately hedged ("-ish", "per the model") and
//! never diagnostic.

use serde_json::Value;

use crate::models::display::{DisplayModel, Recommendation, RiskBand};
use crate::models::prediction::{PredictionResult, RiskLabel};

// ═══════════════════════════════════════════════════════════
// Advisory copy
// ═══════════════════════════════════════════════════════════

const STATUS_HIGHER: &str = "Higher risk";
const STATUS_LOWER: &str = "Lower risk";

const ABSENT_THRESHOLD: &str = "—";

const SUMMARY_TITLE_HIGHER: &str = "Possible higher-risk pattern";
const SUMMARY_BODY_HIGHER: &str = "The model thinks this image resembles patterns it learned \
     from higher-risk (malignant-ish) examples. This is not a diagnosis—use it as a signal \
     to consider professional evaluation.";

const SUMMARY_TITLE_LOWER: &str = "Likely lower-risk pattern";
const SUMMARY_BODY_LOWER: &str = "The model thinks this image resembles lower-risk \
     (benign-ish) examples. It can still be wrong, especially with blur, glare, or unusual \
     cases—monitor and seek care if concerned.";

// ═══════════════════════════════════════════════════════════
// Banding
// ═══════════════════════════════════════════════════════════

/// Map a malignancy probability to its risk band. Total over all inputs;
/// anything below 2% (including out-of-domain negatives) is Very low and
/// anything from 60% up (including >1) is Very high.
pub fn risk_band(prob: f64) -> RiskBand {
    if prob < 0.02 {
        RiskBand::VeryLow
    } else if prob < 0.10 {
        RiskBand::Low
    } else if prob < 0.30 {
        RiskBand::Moderate
    } else if prob < 0.60 {
        RiskBand::High
    } else {
        RiskBand::VeryHigh
    }
}

// ═══════════════════════════════════════════════════════════
// Report building
// ═══════════════════════════════════════════════════════════

/// The three metric chips, in render order.
pub fn build_chips(prob: f64, threshold: &str) -> Vec<String> {
    let band = risk_band(prob);
    let pct = (prob * 100.0).round() as i64;
    vec![
        format!("Risk: {}", band.name()),
        format!("Score: {pct}%"),
        format!("Threshold: {threshold}"),
    ]
}

/// The advisory list: a label-specific lead pair, the shared base pair,
/// then the band line. Always five entries.
pub fn build_recommendations(prob: f64, label: RiskLabel) -> Vec<Recommendation> {
    let band = risk_band(prob);

    let mut recs = if label.is_malignant() {
        vec![
            Recommendation::new(
                "Don’t ignore it:",
                "This result suggests higher risk. Consider booking a dermatology appointment soon.",
            ),
            Recommendation::new(
                "Track changes:",
                "Monitor size/color/border changes and take consistent photos weekly.",
            ),
        ]
    } else {
        vec![
            Recommendation::new(
                "Likely lower risk:",
                "This looks low risk per the model, but false negatives are possible.",
            ),
            Recommendation::new(
                "Keep an eye on it:",
                "If it changes or worries you, get professional evaluation.",
            ),
        ]
    };

    recs.push(Recommendation::new(
        "Photo quality matters:",
        "Retake in bright indirect light, keep the lesion centered, avoid flash glare.",
    ));
    recs.push(Recommendation::new(
        "If concerned:",
        "Contact a licensed clinician—especially for new, changing, bleeding, or painful lesions.",
    ));
    recs.push(Recommendation::new(
        "Risk band:",
        format!("{} (based on model probability).", band.name()),
    ));

    recs
}

fn summary_for(label: RiskLabel) -> (&'static str, &'static str) {
    if label.is_malignant() {
        (SUMMARY_TITLE_HIGHER, SUMMARY_BODY_HIGHER)
    } else {
        (SUMMARY_TITLE_LOWER, SUMMARY_BODY_LOWER)
    }
}

/// Build the complete display model from a parsed result.
///
/// The status line and summary branch on the label alone; an unknown
/// label takes the lower-risk branch. Band, tone, and chips follow the
/// probability.
pub fn interpret(result: PredictionResult) -> DisplayModel {
    let band = risk_band(result.prob_malignant);
    let percentage = (result.prob_malignant * 100.0).round() as i64;
    let gauge_percent = percentage.clamp(0, 100) as u8;

    let threshold = result
        .threshold
        .clone()
        .unwrap_or_else(|| ABSENT_THRESHOLD.to_string());

    let status = if result.label.is_malignant() {
        STATUS_HIGHER
    } else {
        STATUS_LOWER
    };
    let (summary_title, summary_body) = summary_for(result.label);

    let chips = build_chips(result.prob_malignant, &threshold);
    let recommendations = build_recommendations(result.prob_malignant, result.label);

    let raw_json =
        serde_json::to_string_pretty(&result.raw).unwrap_or_else(|_| result.raw.to_string());

    DisplayModel {
        label: result.label,
        status: status.to_string(),
        tone: band.tone(),
        band,
        probability: result.prob_malignant,
        percentage,
        gauge_percent,
        threshold,
        note: result.note,
        summary_title: summary_title.to_string(),
        summary_body: summary_body.to_string(),
        chips,
        recommendations,
        raw_json,
        defaulted: result.defaulted,
    }
}

/// Parse and interpret a raw payload in one step.
pub fn interpret_value(value: Value) -> DisplayModel {
    interpret(PredictionResult::from_value(value))
}
