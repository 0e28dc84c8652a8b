//! Utility functions and helpers.

pub mod credential_mask;
pub mod sql_classifier;

// Re-export commonly used types
pub use credential_mask::mask_connection_url;
pub use sql_classifier::{SqlClassifier, StatementClass};
