pub mod activity;
pub mod admin;
pub mod auth;
pub mod sessions;
