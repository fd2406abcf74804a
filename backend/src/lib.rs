//! orgdash backend: activity and session tracking API.
//!
//! Exposed as a library so the binary in `main.rs` and the
//! integration tests under `tests/` share the same modules.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
