pub mod interpret;
pub mod prepare;

pub use interpret::{interpret, interpret_value, risk_band};
pub use prepare::{prepare, PrepareConfig, PrepareError, SourceImage, UploadArtifact};
