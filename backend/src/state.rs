use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    db::connection::DbPool,
    services::{activity_log::ActivityLogService, change_feed::ChangeFeed, email_cache::EmailCache},
};

const EMAIL_CACHE_CAPACITY: usize = 512;
const EMAIL_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub change_feed: ChangeFeed,
    pub activity_log: Arc<ActivityLogService>,
    pub email_cache: Arc<EmailCache>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let change_feed = ChangeFeed::default();
        let activity_log = Arc::new(ActivityLogService::new(
            pool.as_ref().clone(),
            change_feed.clone(),
        ));
        let email_cache = Arc::new(EmailCache::new(EMAIL_CACHE_CAPACITY, EMAIL_CACHE_TTL));
        Self {
            pool,
            config,
            change_feed,
            activity_log,
            email_cache,
        }
    }
}
