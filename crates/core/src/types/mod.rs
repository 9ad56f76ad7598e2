//! Core types for Orbit.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod name;
pub mod status;

pub use id::*;
pub use name::{DisplayName, DisplayNameError};
pub use status::*;
