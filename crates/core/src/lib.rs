//! Orbit Core - Shared types library.
//!
//! This crate provides common types used across all Orbit components:
//! - `server` - Submission and moderation API
//! - `cli` - Command-line tools for migrations and admin setup
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, display names, statuses and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
