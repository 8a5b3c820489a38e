//! Release signing resolution for Android builds.
//!
//! This module provides functionality for:
//! - resolving a signing identity from `key.properties`
//! - selecting it for the release variant only when it is usable
//! - Android keystore validation and key.properties generation

pub mod android;
pub mod resolver;

pub use android::*;
pub use resolver::*;
