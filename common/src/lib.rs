//! Shared building blocks for the database tool service.
//!
//! - `config`: environment-driven service configuration
//! - `errors`: the error taxonomy shared by every layer
//! - `models`: connection, query and tool data types
//! - `response`: response envelopes returned to callers
//! - `utils`: statement classification and credential masking

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
