//! Domain models for signing resolution.

pub mod signing;
pub mod variant;

pub use signing::*;
pub use variant::*;
