//! Commands for the analysis flow.
//!
//! Five commands for the front end:
//! 1. select_image — size guard, then prepare the selection for upload
//! 2. clear_selection — drop the selection and return to idle
//! 3. analyze — send the staged artifact to the Space and interpret the reply
//! 4. run_demo — render a canned prediction without touching the network
//! 5. warmup — connect to the Space in the background ahead of the first analyze

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config;
use crate::core_state::CoreState;
use crate::models::DisplayModel;
use crate::pipeline::{self, interpret_value, PrepareError, SourceImage};
use crate::predictor::{Predictor, PredictorError};

use super::{session_status, SessionSnapshot};

/// Shown when a selection cannot be decoded or re-encoded.
pub const PREPARE_FAILURE_MESSAGE: &str = "Could not process that image. Try another one.";

/// Take a new selection through the preparation pipeline.
///
/// The size guard runs before the session is touched, so an oversized
/// pick leaves any previous selection staged. Preparation failures
/// reset the whole session; nothing half-prepared survives.
pub fn select_image(
    state: &CoreState,
    file_name: String,
    mime: String,
    bytes: Vec<u8>,
) -> Result<SessionSnapshot, String> {
    let prepare_config = &state.profile.prepare;
    if bytes.len() > prepare_config.max_upload_bytes() {
        let err = PrepareError::FileTooLarge {
            actual_mb: pipeline::prepare::bytes_to_mb(bytes.len()),
            limit_mb: prepare_config.max_upload_mb,
        };
        return Err(err.to_string());
    }

    info!(file = %file_name, size = bytes.len(), "Image selected");
    state
        .begin_selection(SourceImage {
            file_name,
            mime,
            bytes,
        })
        .map_err(|e| e.to_string())?;

    let prepared = {
        let session = state.read_session().map_err(|e| e.to_string())?;
        match session.source() {
            Some(source) => pipeline::prepare(source, prepare_config),
            None => Err(PrepareError::Decode("selection vanished".to_string())),
        }
    };

    match prepared {
        Ok(artifact) => {
            debug!(
                file = %artifact.file_name,
                width = artifact.width,
                height = artifact.height,
                reencoded = artifact.reencoded,
                "Image prepared"
            );
            state.finish_preparation(artifact).map_err(|e| e.to_string())?;
        }
        Err(err) => {
            debug!(error = %err, "Image preparation failed");
            state.fail_preparation().map_err(|e| e.to_string())?;
            return Err(PREPARE_FAILURE_MESSAGE.to_string());
        }
    }

    session_status(state)
}

/// Drop the selection and return to idle.
pub fn clear_selection(state: &CoreState) -> Result<SessionSnapshot, String> {
    state.reset_session().map_err(|e| e.to_string())?;
    session_status(state)
}

/// Send the staged artifact to the Space and interpret the reply.
///
/// Connecting and predicting both happen inside the submitting phase,
/// so a sleeping Space surfaces the same way a failed call does: the
/// session returns to ready with the artifact staged for retry.
pub fn analyze(state: &CoreState) -> Result<DisplayModel, String> {
    let artifact = state.begin_analysis().map_err(|e| e.to_string())?;
    let outcome = {
        let _call = state.begin_call(config::PREDICT_ENDPOINT);
        state
            .predictor()
            .and_then(|client| client.predict(config::PREDICT_ENDPOINT, &artifact))
    };
    apply_prediction_outcome(state, outcome)
}

/// [`analyze`] against an explicit predictor. Lets tests and embedders
/// drive the full submit flow without the live Space.
pub fn analyze_with(
    state: &CoreState,
    predictor: &dyn Predictor,
) -> Result<DisplayModel, String> {
    let artifact = state.begin_analysis().map_err(|e| e.to_string())?;
    let outcome = {
        let _call = state.begin_call(config::PREDICT_ENDPOINT);
        predictor.predict(config::PREDICT_ENDPOINT, &artifact)
    };
    apply_prediction_outcome(state, outcome)
}

/// Apply a prediction outcome to the session and render it.
fn apply_prediction_outcome(
    state: &CoreState,
    outcome: Result<Value, PredictorError>,
) -> Result<DisplayModel, String> {
    match outcome {
        Ok(payload) => {
            state.complete_analysis().map_err(|e| e.to_string())?;
            Ok(interpret_value(payload))
        }
        Err(err) => {
            debug!(error = %err, "Prediction call failed");
            state.fail_analysis().map_err(|e| e.to_string())?;
            Err(prediction_failure_message(&err))
        }
    }
}

/// The alert shown when the prediction API cannot be reached.
pub fn prediction_failure_message(err: &PredictorError) -> String {
    format!(
        "Could not reach the prediction API.\n\n\
         Common causes:\n\
         • Space is sleeping (try again in ~10–30s)\n\
         • Space is private\n\
         • Temporary HF outage\n\n\
         Details: {err}"
    )
}

/// Render the canned demo prediction. No network, no session change.
pub fn run_demo() -> DisplayModel {
    let fake = json!({
        "label": "benign-ish",
        "prob_malignant": 0.022,
        "threshold": 0.20,
        "note": "Educational demo. Not medical advice."
    });
    interpret_value(fake)
}

/// Connect to the Space in the background so the first analyze feels
/// fast. Failures are ignored; analyze reconnects on demand.
pub fn warmup(state: &Arc<CoreState>) {
    let state = Arc::clone(state);
    std::thread::spawn(move || {
        if let Err(err) = state.predictor() {
            debug!(error = %err, "Warm-up connection failed");
        }
    });
}
