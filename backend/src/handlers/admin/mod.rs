pub mod activity_logs;
pub mod common;
pub mod sessions;
pub mod stream;
pub mod users;
