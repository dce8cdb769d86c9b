use std::path::PathBuf;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "Dermalens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hugging Face Space hosting the binary lesion classifier.
pub const SPACE_ID: &str = "ElGatito12/ham10000-efficientnet-b0-binary";

/// Named Gradio endpoint on the Space that accepts one image and
/// returns the classification payload.
pub const PREDICT_ENDPOINT: &str = "predict";

/// Hard cap on the size of a selected photo, in megabytes.
pub const MAX_UPLOAD_MB: u32 = 8;

/// Longest side of an upload after downscaling, in pixels.
pub const MAX_DIMENSION_PX: u32 = 1400;

/// JPEG quality for re-encoded uploads (0-100).
pub const JPEG_QUALITY: u8 = 90;

/// Environment variable selecting the deployment profile at startup.
pub const PROFILE_ENV_VAR: &str = "DERMALENS_PROFILE";

/// Get the application data directory
/// ~/Dermalens/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Dermalens")
}

/// Get the preferences database path
pub fn preferences_db_path() -> PathBuf {
    app_data_dir().join("preferences.db")
}

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    "dermalens=info".to_string()
}

/// How the host shell sources images from the user.
///
/// Desktop builds expose a single file picker; mobile builds offer both a
/// gallery picker and a direct camera capture. The distinction only affects
/// which affordances the shell renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSurface {
    SinglePicker,
    GalleryAndCamera,
}

impl std::fmt::Display for InputSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSurface::SinglePicker => write!(f, "single_picker"),
            InputSurface::GalleryAndCamera => write!(f, "gallery_and_camera"),
        }
    }
}

/// Per-deployment knobs resolved once at startup.
#[derive(Debug, Clone)]
pub struct DeploymentProfile {
    pub input_surface: InputSurface,
    pub prepare: crate::pipeline::prepare::PrepareConfig,
}

impl DeploymentProfile {
    pub fn desktop() -> Self {
        Self {
            input_surface: InputSurface::SinglePicker,
            prepare: crate::pipeline::prepare::PrepareConfig::desktop(),
        }
    }

    pub fn mobile() -> Self {
        Self {
            input_surface: InputSurface::GalleryAndCamera,
            prepare: crate::pipeline::prepare::PrepareConfig::mobile(),
        }
    }

    /// Resolve the profile from `DERMALENS_PROFILE` (`desktop` when unset
    /// or unrecognized).
    pub fn from_env() -> Self {
        match std::env::var(PROFILE_ENV_VAR) {
            Ok(value) if value.eq_ignore_ascii_case("mobile") => Self::mobile(),
            _ => Self::desktop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Dermalens"));
    }

    #[test]
    fn preferences_db_under_app_data() {
        let db = preferences_db_path();
        let app = app_data_dir();
        assert!(db.starts_with(app));
        assert!(db.ends_with("preferences.db"));
    }

    #[test]
    fn app_name_is_dermalens() {
        assert_eq!(APP_NAME, "Dermalens");
    }

    #[test]
    fn space_id_points_at_binary_classifier() {
        assert!(SPACE_ID.contains('/'));
        assert!(SPACE_ID.ends_with("binary"));
    }

    #[test]
    fn desktop_profile_uses_single_picker() {
        let profile = DeploymentProfile::desktop();
        assert_eq!(profile.input_surface, InputSurface::SinglePicker);
        assert!(!profile.prepare.always_reencode);
    }

    #[test]
    fn mobile_profile_reencodes_everything() {
        let profile = DeploymentProfile::mobile();
        assert_eq!(profile.input_surface, InputSurface::GalleryAndCamera);
        assert!(profile.prepare.always_reencode);
    }

    #[test]
    fn both_profiles_share_transport_limits() {
        let desktop = DeploymentProfile::desktop();
        let mobile = DeploymentProfile::mobile();
        assert_eq!(desktop.prepare.max_upload_mb, mobile.prepare.max_upload_mb);
        assert_eq!(
            desktop.prepare.max_dimension_px,
            mobile.prepare.max_dimension_px
        );
        assert_eq!(desktop.prepare.jpeg_quality, mobile.prepare.jpeg_quality);
    }
}
