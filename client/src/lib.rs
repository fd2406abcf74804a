//! Native SDK for the orgdash activity and session tracking API.
//!
//! The crate is organized around [`api::ApiClient`], a thin authenticated
//! HTTP wrapper, with higher-level components layered on top:
//!
//! - [`tracker::SessionTracker`] opens a presence session, keeps it
//!   alive, and closes it, following the caller's sign-in lifecycle.
//! - [`logger::ActivityLogger`] ships audit events on a best-effort,
//!   fire-and-forget basis.
//! - [`browser`] holds paginated, filtered views over the admin logs
//!   and refetches them when the realtime feed reports changes.

pub mod api;
pub mod browser;
pub mod geo;
pub mod logger;
pub mod pager;
pub mod realtime;
pub mod tracker;
