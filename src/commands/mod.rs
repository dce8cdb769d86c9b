pub mod analysis;
pub mod preferences;

use base64::Engine as _;
use serde::Serialize;

use crate::config::InputSurface;
use crate::core_state::{CoreState, Phase};
use crate::pipeline::prepare::bytes_to_mb;
use crate::predictor::ActiveCall;

/// Health check command — verifies the core is running
pub fn health_check() -> String {
    tracing::debug!("Health check called");
    "ok".to_string()
}

/// Everything a front end needs to render the current session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Current phase of the analysis session.
    pub phase: Phase,
    /// Original file name of the selection, if any.
    pub file_name: Option<String>,
    /// Display line for the selection: "name • 1.23 MB".
    pub file_meta: Option<String>,
    /// Selection preview as a data URL, straight from the original bytes.
    pub preview_data_url: Option<String>,
    /// Name of the staged upload artifact, if preparation finished.
    pub artifact_name: Option<String>,
    /// Size in bytes of the staged upload artifact.
    pub artifact_size: Option<usize>,
    /// The prediction call in flight, if any.
    pub active_call: Option<ActiveCall>,
    /// Whether the analyze action is currently available.
    pub can_analyze: bool,
    /// Whether the clear action is currently available.
    pub can_clear: bool,
    /// Persisted theme flag: "light" or "dark".
    pub theme: String,
    /// Which capture affordance this deployment renders.
    pub input_surface: InputSurface,
}

/// Snapshot of the session for status polling.
///
/// Reads never mutate: the session is taken under a read lock and the
/// theme comes from the preferences store, so polling while an image is
/// being prepared still answers.
pub fn session_status(state: &CoreState) -> Result<SessionSnapshot, String> {
    let theme = state
        .open_prefs()
        .map_err(|e| e.to_string())?
        .theme()
        .map_err(|e| e.to_string())?;

    let session = state.read_session().map_err(|e| e.to_string())?;
    let phase = session.phase();

    let (file_name, file_meta, preview_data_url) = match session.source() {
        Some(source) => (
            Some(source.file_name.clone()),
            Some(format!(
                "{} • {:.2} MB",
                source.file_name,
                bytes_to_mb(source.bytes.len())
            )),
            Some(format!(
                "data:{};base64,{}",
                source.mime,
                base64::engine::general_purpose::STANDARD.encode(&source.bytes)
            )),
        ),
        None => (None, None, None),
    };

    Ok(SessionSnapshot {
        phase,
        file_name,
        file_meta,
        preview_data_url,
        artifact_name: session.artifact().map(|a| a.file_name.clone()),
        artifact_size: session.artifact().map(|a| a.bytes.len()),
        active_call: state.active_call(),
        can_analyze: phase == Phase::Ready && session.artifact().is_some(),
        can_clear: session.source().is_some() && !phase.is_busy(),
        theme: theme.as_str().to_string(),
        input_surface: state.profile.input_surface,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentProfile;
    use crate::pipeline::prepare::{SourceImage, UploadArtifact};

    fn test_state() -> CoreState {
        let dir = tempfile::tempdir().unwrap();
        CoreState::with_prefs_path(
            DeploymentProfile::desktop(),
            dir.path().join("preferences.db"),
        )
    }

    #[test]
    fn health_check_returns_ok() {
        assert_eq!(health_check(), "ok");
    }

    #[test]
    fn empty_session_snapshot() {
        let state = test_state();
        let snapshot = session_status(&state).unwrap();

        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(snapshot.file_name.is_none());
        assert!(snapshot.file_meta.is_none());
        assert!(snapshot.preview_data_url.is_none());
        assert!(snapshot.artifact_name.is_none());
        assert!(snapshot.artifact_size.is_none());
        assert!(snapshot.active_call.is_none());
        assert!(!snapshot.can_analyze);
        assert!(!snapshot.can_clear);
        assert_eq!(snapshot.theme, "dark");
    }

    #[test]
    fn ready_session_snapshot() {
        let state = test_state();
        state
            .begin_selection(SourceImage {
                file_name: "mole.png".to_string(),
                mime: "image/png".to_string(),
                bytes: vec![0u8; 1024 * 1024],
            })
            .unwrap();
        state
            .finish_preparation(UploadArtifact {
                file_name: "mole_scaled.jpg".to_string(),
                mime: "image/jpeg".to_string(),
                bytes: vec![1, 2, 3],
                width: 800,
                height: 600,
                reencoded: true,
            })
            .unwrap();

        let snapshot = session_status(&state).unwrap();
        assert_eq!(snapshot.phase, Phase::Ready);
        assert_eq!(snapshot.file_name.as_deref(), Some("mole.png"));
        assert_eq!(snapshot.file_meta.as_deref(), Some("mole.png • 1.00 MB"));
        assert!(snapshot
            .preview_data_url
            .as_deref()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(snapshot.artifact_name.as_deref(), Some("mole_scaled.jpg"));
        assert_eq!(snapshot.artifact_size, Some(3));
        assert!(snapshot.can_analyze);
        assert!(snapshot.can_clear);
    }

    #[test]
    fn preparing_session_disables_actions() {
        let state = test_state();
        state
            .begin_selection(SourceImage {
                file_name: "mole.png".to_string(),
                mime: "image/png".to_string(),
                bytes: vec![1],
            })
            .unwrap();

        let snapshot = session_status(&state).unwrap();
        assert_eq!(snapshot.phase, Phase::Preparing);
        assert!(!snapshot.can_analyze);
        assert!(!snapshot.can_clear);
    }

    #[test]
    fn snapshot_serializes_with_snake_case_phase() {
        let state = test_state();
        let snapshot = session_status(&state).unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"phase\":\"idle\""));
        assert!(json.contains("\"theme\":\"dark\""));
        assert!(json.contains("\"input_surface\":\"single_picker\""));
    }
}
