pub mod display;
pub mod prediction;

pub use display::*;
pub use prediction::*;
