//! keyprop core library
//!
//! Properties parsing, signing identity resolution and release variant
//! binding for Flutter/Android builds.

pub mod error;
pub mod models;
pub mod project;
pub mod properties;
pub mod signing;

pub use error::{KeypropError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
