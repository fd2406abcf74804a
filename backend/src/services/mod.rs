pub mod activity_log;
pub mod change_feed;
pub mod email_cache;
