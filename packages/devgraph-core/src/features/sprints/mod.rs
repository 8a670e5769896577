//! Sprint window parsing from the planning status document.

pub mod domain;
pub mod infrastructure;

pub use domain::SprintWindow;
pub use infrastructure::{fallback_window, parse_sprint_status, sprint_doc_prefix, SPRINT_STATUS_PATH};
