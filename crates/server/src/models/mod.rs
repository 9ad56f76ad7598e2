//! Domain models for the submission API.

pub mod submission;

pub use submission::{NewSubmission, Submission};
