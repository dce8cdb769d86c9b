//! Shared application state and the analysis session machine.
//!
//! `CoreState` is the single state shared by every command handler,
//! wrapped in `Arc` at startup. The analysis session moves through an
//! explicit phase machine; every phase change goes through
//! [`Phase::apply`], so impossible transitions are rejected in one
//! place instead of being scattered across handlers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::debug;

use crate::config::{self, DeploymentProfile};
use crate::pipeline::prepare::{SourceImage, UploadArtifact};
use crate::predictor::space::SpaceClient;
use crate::predictor::{ActiveCall, PredictorError};
use crate::prefs::{PreferencesError, PreferencesStore};

// ═══════════════════════════════════════════════════════════
// Phase machine
// ═══════════════════════════════════════════════════════════

/// Where the analysis session currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing selected.
    #[default]
    Idle,
    /// A selection is being decoded and re-encoded.
    Preparing,
    /// An upload artifact is staged and can be analyzed.
    Ready,
    /// A prediction call is in flight.
    Submitting,
}

impl Phase {
    /// Busy phases reject new selections and clears.
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Preparing | Phase::Submitting)
    }

    /// Advance the machine. Returns the next phase or rejects the event.
    pub fn apply(self, event: SessionEvent) -> Result<Phase, TransitionError> {
        use Phase::*;
        use SessionEvent::*;

        match (self, event) {
            (Idle | Ready, FileSelected) => Ok(Preparing),
            (Preparing, PrepareSucceeded) => Ok(Ready),
            (Preparing, PrepareFailed) => Ok(Idle),
            (Ready, AnalyzeRequested) => Ok(Submitting),
            (Submitting, PredictionRendered | PredictionFailed) => Ok(Ready),
            (Idle | Ready, Cleared) => Ok(Idle),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Preparing => "preparing",
            Phase::Ready => "ready",
            Phase::Submitting => "submitting",
        };
        write!(f, "{name}")
    }
}

/// Everything that can move the session between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    FileSelected,
    PrepareSucceeded,
    PrepareFailed,
    AnalyzeRequested,
    PredictionRendered,
    PredictionFailed,
    Cleared,
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionEvent::FileSelected => "file_selected",
            SessionEvent::PrepareSucceeded => "prepare_succeeded",
            SessionEvent::PrepareFailed => "prepare_failed",
            SessionEvent::AnalyzeRequested => "analyze_requested",
            SessionEvent::PredictionRendered => "prediction_rendered",
            SessionEvent::PredictionFailed => "prediction_failed",
            SessionEvent::Cleared => "cleared",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Event {event} is not allowed in phase {from}")]
pub struct TransitionError {
    pub from: Phase,
    pub event: SessionEvent,
}

// ═══════════════════════════════════════════════════════════
// Analysis session
// ═══════════════════════════════════════════════════════════

/// The selection currently loaded into the checker, if any.
///
/// Invariant: `artifact` is only present in `Ready` and `Submitting`,
/// and always belongs to `source`.
#[derive(Default)]
pub struct AnalysisSession {
    phase: Phase,
    source: Option<SourceImage>,
    artifact: Option<UploadArtifact>,
}

impl AnalysisSession {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn artifact(&self) -> Option<&UploadArtifact> {
        self.artifact.as_ref()
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

/// Shared application state.
///
/// The session sits behind an `RwLock` so status reads never block each
/// other; mutations take the write lock and are applied in one critical
/// section, which keeps multi-field updates (phase plus payload) atomic.
pub struct CoreState {
    session: RwLock<AnalysisSession>,
    /// Memoized Space connection. Connecting wakes the Space, so it
    /// happens once and every later call reuses the client.
    predictor: Mutex<Option<Arc<SpaceClient>>>,
    /// The in-flight prediction call, for status snapshots.
    active_call: Mutex<Option<ActiveCall>>,
    /// Preferences database location (overridable in tests).
    prefs_path: PathBuf,
    pub profile: DeploymentProfile,
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,

    #[error("No prepared image to analyze")]
    NothingToAnalyze,

    #[error("{0}")]
    Transition(#[from] TransitionError),

    #[error("Preferences error: {0}")]
    Preferences(#[from] PreferencesError),
}

impl CoreState {
    pub fn new(profile: DeploymentProfile) -> Self {
        Self {
            session: RwLock::new(AnalysisSession::default()),
            predictor: Mutex::new(None),
            active_call: Mutex::new(None),
            prefs_path: config::preferences_db_path(),
            profile,
        }
    }

    /// State over a custom preferences path. Used by tests and by the
    /// shell when the data directory is relocated.
    pub fn with_prefs_path(profile: DeploymentProfile, prefs_path: PathBuf) -> Self {
        Self {
            prefs_path,
            ..Self::new(profile)
        }
    }

    // ── Session access ──────────────────────────────────────

    /// Acquire a read lock on the session.
    pub fn read_session(&self) -> Result<RwLockReadGuard<'_, AnalysisSession>, CoreError> {
        self.session.read().map_err(|_| CoreError::LockPoisoned)
    }

    fn write_session(&self) -> Result<RwLockWriteGuard<'_, AnalysisSession>, CoreError> {
        self.session.write().map_err(|_| CoreError::LockPoisoned)
    }

    // ── Session mutation ────────────────────────────────────

    /// Store a fresh selection and enter `Preparing`. Any previous
    /// artifact is dropped with the old selection.
    pub fn begin_selection(&self, source: SourceImage) -> Result<(), CoreError> {
        let mut session = self.write_session()?;
        let next = session.phase.apply(SessionEvent::FileSelected)?;
        debug!(file = %source.file_name, phase = %next, "Selection accepted");
        session.phase = next;
        session.source = Some(source);
        session.artifact = None;
        Ok(())
    }

    /// Attach the prepared artifact and enter `Ready`.
    pub fn finish_preparation(&self, artifact: UploadArtifact) -> Result<(), CoreError> {
        let mut session = self.write_session()?;
        let next = session.phase.apply(SessionEvent::PrepareSucceeded)?;
        session.phase = next;
        session.artifact = Some(artifact);
        Ok(())
    }

    /// Preparation failed: drop the selection entirely and return to
    /// `Idle` in one step, so no partially-prepared state survives.
    pub fn fail_preparation(&self) -> Result<(), CoreError> {
        let mut session = self.write_session()?;
        session.phase.apply(SessionEvent::PrepareFailed)?;
        *session = AnalysisSession::default();
        Ok(())
    }

    /// Clear the selection (user pressed clear).
    pub fn reset_session(&self) -> Result<(), CoreError> {
        let mut session = self.write_session()?;
        session.phase.apply(SessionEvent::Cleared)?;
        *session = AnalysisSession::default();
        Ok(())
    }

    /// Enter `Submitting` and hand back the artifact to send.
    pub fn begin_analysis(&self) -> Result<UploadArtifact, CoreError> {
        let mut session = self.write_session()?;
        let artifact = session.artifact.clone().ok_or(CoreError::NothingToAnalyze)?;
        let next = session.phase.apply(SessionEvent::AnalyzeRequested)?;
        session.phase = next;
        Ok(artifact)
    }

    /// A result came back and was rendered; the artifact stays staged
    /// so the user can re-run the same image.
    pub fn complete_analysis(&self) -> Result<(), CoreError> {
        let mut session = self.write_session()?;
        let next = session.phase.apply(SessionEvent::PredictionRendered)?;
        session.phase = next;
        Ok(())
    }

    /// The call failed; selection and artifact are retained for retry.
    pub fn fail_analysis(&self) -> Result<(), CoreError> {
        let mut session = self.write_session()?;
        let next = session.phase.apply(SessionEvent::PredictionFailed)?;
        session.phase = next;
        Ok(())
    }

    // ── Predictor access ────────────────────────────────────

    /// The memoized Space client, connecting on first use.
    ///
    /// The mutex is held across the connect, so concurrent callers wait
    /// for the one connection attempt instead of racing their own.
    pub fn predictor(&self) -> Result<Arc<SpaceClient>, PredictorError> {
        let mut slot = self
            .predictor
            .lock()
            .map_err(|_| PredictorError::HttpClient("lock poisoned".into()))?;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(SpaceClient::connect(config::SPACE_ID)?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Mark a prediction call as in flight. Dropping the guard clears it.
    pub fn begin_call(&self, endpoint: &str) -> CallGuard<'_> {
        if let Ok(mut current) = self.active_call.lock() {
            *current = Some(ActiveCall::new(endpoint));
        }
        CallGuard { state: self }
    }

    /// The in-flight prediction call, if any.
    pub fn active_call(&self) -> Option<ActiveCall> {
        self.active_call.lock().ok()?.clone()
    }

    fn clear_call(&self) {
        if let Ok(mut current) = self.active_call.lock() {
            *current = None;
        }
    }

    // ── Preferences ─────────────────────────────────────────

    pub fn open_prefs(&self) -> Result<PreferencesStore, CoreError> {
        Ok(PreferencesStore::open(&self.prefs_path)?)
    }
}

// ═══════════════════════════════════════════════════════════
// CallGuard — in-flight call marker
// ═══════════════════════════════════════════════════════════

/// RAII marker for an in-flight prediction call.
///
/// Dropping the guard clears the active call from status snapshots,
/// including on the error path.
pub struct CallGuard<'a> {
    state: &'a CoreState,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.state.clear_call();
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> CoreState {
        let dir = tempfile::tempdir().unwrap();
        CoreState::with_prefs_path(
            DeploymentProfile::desktop(),
            dir.path().join("preferences.db"),
        )
    }

    fn source() -> SourceImage {
        SourceImage {
            file_name: "lesion.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    fn artifact() -> UploadArtifact {
        UploadArtifact {
            file_name: "lesion_scaled.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: vec![4, 5, 6],
            width: 1400,
            height: 900,
            reencoded: true,
        }
    }

    // ── phase machine ──

    #[test]
    fn allowed_transitions() {
        use Phase::*;
        use SessionEvent::*;

        let table = [
            (Idle, FileSelected, Preparing),
            (Ready, FileSelected, Preparing),
            (Preparing, PrepareSucceeded, Ready),
            (Preparing, PrepareFailed, Idle),
            (Ready, AnalyzeRequested, Submitting),
            (Submitting, PredictionRendered, Ready),
            (Submitting, PredictionFailed, Ready),
            (Idle, Cleared, Idle),
            (Ready, Cleared, Idle),
        ];

        for (from, event, expected) in table {
            assert_eq!(from.apply(event).unwrap(), expected, "{from} + {event}");
        }
    }

    #[test]
    fn rejected_transitions() {
        use Phase::*;
        use SessionEvent::*;

        let rejected = [
            (Idle, AnalyzeRequested),
            (Idle, PrepareSucceeded),
            (Idle, PredictionRendered),
            (Preparing, FileSelected),
            (Preparing, AnalyzeRequested),
            (Preparing, Cleared),
            (Ready, PrepareSucceeded),
            (Ready, PredictionFailed),
            (Submitting, FileSelected),
            (Submitting, AnalyzeRequested),
            (Submitting, Cleared),
        ];

        for (from, event) in rejected {
            let err = from.apply(event).unwrap_err();
            assert_eq!(err.from, from);
            assert_eq!(err.event, event);
        }
    }

    #[test]
    fn busy_phases() {
        assert!(!Phase::Idle.is_busy());
        assert!(Phase::Preparing.is_busy());
        assert!(!Phase::Ready.is_busy());
        assert!(Phase::Submitting.is_busy());
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Phase::Idle).unwrap(), "\"idle\"");
        assert_eq!(
            serde_json::to_string(&Phase::Submitting).unwrap(),
            "\"submitting\""
        );
    }

    #[test]
    fn transition_error_names_phase_and_event() {
        let err = Phase::Idle.apply(SessionEvent::AnalyzeRequested).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("analyze_requested"));
        assert!(message.contains("idle"));
    }

    // ── session lifecycle ──

    #[test]
    fn new_state_is_idle_and_empty() {
        let state = test_state();
        let session = state.read_session().unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.source().is_none());
        assert!(session.artifact().is_none());
    }

    #[test]
    fn selection_enters_preparing_with_source() {
        let state = test_state();
        state.begin_selection(source()).unwrap();

        let session = state.read_session().unwrap();
        assert_eq!(session.phase(), Phase::Preparing);
        assert_eq!(session.source().unwrap().file_name, "lesion.png");
        assert!(session.artifact().is_none());
    }

    #[test]
    fn preparation_success_enters_ready_with_artifact() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        state.finish_preparation(artifact()).unwrap();

        let session = state.read_session().unwrap();
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.artifact().unwrap().file_name, "lesion_scaled.jpg");
    }

    #[test]
    fn preparation_failure_resets_everything() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        state.fail_preparation().unwrap();

        let session = state.read_session().unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.source().is_none());
        assert!(session.artifact().is_none());
    }

    #[test]
    fn reselection_replaces_source_and_drops_artifact() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        state.finish_preparation(artifact()).unwrap();

        let second = SourceImage {
            file_name: "other.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![9],
        };
        state.begin_selection(second).unwrap();

        let session = state.read_session().unwrap();
        assert_eq!(session.phase(), Phase::Preparing);
        assert_eq!(session.source().unwrap().file_name, "other.png");
        assert!(session.artifact().is_none());
    }

    #[test]
    fn clear_from_ready_resets_everything() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        state.finish_preparation(artifact()).unwrap();
        state.reset_session().unwrap();

        let session = state.read_session().unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.source().is_none());
    }

    #[test]
    fn clear_while_preparing_is_rejected() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        let err = state.reset_session().unwrap_err();
        assert!(matches!(err, CoreError::Transition(_)));
    }

    #[test]
    fn analysis_hands_back_artifact_and_enters_submitting() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        state.finish_preparation(artifact()).unwrap();

        let staged = state.begin_analysis().unwrap();
        assert_eq!(staged.file_name, "lesion_scaled.jpg");
        assert_eq!(state.read_session().unwrap().phase(), Phase::Submitting);
    }

    #[test]
    fn analysis_without_artifact_is_rejected() {
        let state = test_state();
        let err = state.begin_analysis().unwrap_err();
        assert!(matches!(err, CoreError::NothingToAnalyze));
    }

    #[test]
    fn double_analysis_is_rejected() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        state.finish_preparation(artifact()).unwrap();
        state.begin_analysis().unwrap();

        let err = state.begin_analysis().unwrap_err();
        assert!(matches!(err, CoreError::Transition(_)));
    }

    #[test]
    fn failed_analysis_keeps_artifact_for_retry() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        state.finish_preparation(artifact()).unwrap();
        state.begin_analysis().unwrap();
        state.fail_analysis().unwrap();

        let session = state.read_session().unwrap();
        assert_eq!(session.phase(), Phase::Ready);
        assert!(session.artifact().is_some(), "artifact must survive a failed call");
    }

    #[test]
    fn completed_analysis_returns_to_ready() {
        let state = test_state();
        state.begin_selection(source()).unwrap();
        state.finish_preparation(artifact()).unwrap();
        state.begin_analysis().unwrap();
        state.complete_analysis().unwrap();

        assert_eq!(state.read_session().unwrap().phase(), Phase::Ready);
    }

    // ── active call tracking ──

    #[test]
    fn call_guard_tracks_in_flight_call() {
        let state = test_state();
        assert!(state.active_call().is_none());

        {
            let _guard = state.begin_call("predict");
            let call = state.active_call().unwrap();
            assert_eq!(call.endpoint, "predict");
        }

        assert!(state.active_call().is_none());
    }

    // ── preferences ──

    #[test]
    fn prefs_open_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::with_prefs_path(
            DeploymentProfile::desktop(),
            dir.path().join("preferences.db"),
        );

        let store = state.open_prefs().unwrap();
        store.set("theme", "light").unwrap();

        let reopened = state.open_prefs().unwrap();
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("light"));
    }
}
