//! Orbit submission server library.
//!
//! Visitors submit a name and photo; an admin approves or rejects each
//! submission before it appears publicly. The binary in `main.rs` wires this
//! library to `PostgreSQL` and Cloudinary; tests wire it to in-memory fakes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
