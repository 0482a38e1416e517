//! Collaborators the automation scripts use alongside element actions.

pub mod file;
pub mod http;
