//! Employee-side travel-document workflow.
//!
//! Resolves whether the employee's documents are already locked, validates the form,
//! and performs the one-time submission.

mod controller;
pub mod form;
mod status;

pub use controller::{SubmissionController, WorkflowError};
pub use form::SubmissionForm;
pub use status::SubmissionState;
