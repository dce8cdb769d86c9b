//! Commands for persisted user preferences.
//!
//! Three commands for the front end:
//! 1. get_theme — the persisted theme flag, defaulting to dark
//! 2. set_theme — persist an explicit theme choice
//! 3. toggle_theme — flip between light and dark and persist the result

use tracing::debug;

use crate::core_state::CoreState;
use crate::prefs::Theme;

/// The persisted theme flag: "light" or "dark".
pub fn get_theme(state: &CoreState) -> Result<String, String> {
    let store = state.open_prefs().map_err(|e| e.to_string())?;
    let theme = store.theme().map_err(|e| e.to_string())?;
    Ok(theme.as_str().to_string())
}

/// Persist an explicit theme choice. Accepts "light" or "dark".
pub fn set_theme(state: &CoreState, theme: &str) -> Result<String, String> {
    let theme: Theme = theme.parse()?;
    let store = state.open_prefs().map_err(|e| e.to_string())?;
    store.set_theme(theme).map_err(|e| e.to_string())?;
    debug!(theme = %theme, "Theme saved");
    Ok(theme.as_str().to_string())
}

/// Flip the theme and persist the result. Returns the new flag.
pub fn toggle_theme(state: &CoreState) -> Result<String, String> {
    let store = state.open_prefs().map_err(|e| e.to_string())?;
    let next = store.theme().map_err(|e| e.to_string())?.toggled();
    store.set_theme(next).map_err(|e| e.to_string())?;
    debug!(theme = %next, "Theme toggled");
    Ok(next.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentProfile;

    fn state_in(dir: &tempfile::TempDir) -> CoreState {
        CoreState::with_prefs_path(
            DeploymentProfile::desktop(),
            dir.path().join("preferences.db"),
        )
    }

    #[test]
    fn theme_defaults_to_dark() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);
        assert_eq!(get_theme(&state).unwrap(), "dark");
    }

    #[test]
    fn set_theme_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);

        assert_eq!(set_theme(&state, "light").unwrap(), "light");
        assert_eq!(get_theme(&state).unwrap(), "light");

        // A fresh state over the same path still sees the choice.
        let reopened = state_in(&dir);
        assert_eq!(get_theme(&reopened).unwrap(), "light");
    }

    #[test]
    fn toggle_flips_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);

        assert_eq!(toggle_theme(&state).unwrap(), "light");
        assert_eq!(toggle_theme(&state).unwrap(), "dark");
        assert_eq!(get_theme(&state).unwrap(), "dark");
    }

    #[test]
    fn unknown_theme_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);

        let err = set_theme(&state, "sepia").unwrap_err();
        assert!(err.contains("sepia"));
        assert_eq!(get_theme(&state).unwrap(), "dark");
    }
}
