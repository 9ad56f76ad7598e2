//! Business logic services.
//!
//! - `auth` - Admin login and token verification
//! - `images` - External image hosting for submitted photos

pub mod auth;
pub mod images;
