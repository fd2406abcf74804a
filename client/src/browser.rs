//! Paginated, filtered views over the admin logs.
//!
//! Each browser owns a [`PagerState`] and publishes the latest page
//! through a `watch` channel, so UI code can subscribe to snapshots
//! without polling. Refreshes triggered while a fetch is in flight
//! coalesce, and responses that raced with newer inputs are dropped.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::{
    api::{ActivityLogPage, ApiClient, ApiError, LogFilters, SessionPage},
    pager::{FetchPlan, PagerState},
};

pub struct ActivityLogBrowser {
    api: Arc<ApiClient>,
    state: Mutex<PagerState>,
    snapshot: watch::Sender<Option<ActivityLogPage>>,
}

impl ActivityLogBrowser {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            api,
            state: Mutex::new(PagerState::default()),
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ActivityLogPage>> {
        self.snapshot.subscribe()
    }

    pub async fn set_page(&self, page: i64) -> Result<(), ApiError> {
        self.state.lock().await.set_page(page);
        self.refresh().await
    }

    pub async fn set_per_page(&self, per_page: i64) -> Result<(), ApiError> {
        self.state.lock().await.set_per_page(per_page);
        self.refresh().await
    }

    pub async fn set_filters(&self, filters: LogFilters) -> Result<(), ApiError> {
        self.state.lock().await.set_filters(filters);
        self.refresh().await
    }

    /// Fetches the current page and publishes it. Calls that arrive
    /// while a fetch runs fold into a single follow-up fetch.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        loop {
            let plan = match self.state.lock().await.begin_fetch() {
                Some(plan) => plan,
                None => return Ok(()),
            };

            let result = self.fetch(&plan).await;

            let mut state = self.state.lock().await;
            match result {
                Ok(page) => {
                    if state.is_current(plan.generation) {
                        let _ = self.snapshot.send(Some(page));
                    }
                }
                Err(err) => {
                    state.finish_fetch();
                    return Err(err);
                }
            }
            if !state.finish_fetch() {
                return Ok(());
            }
        }
    }

    async fn fetch(&self, plan: &FetchPlan) -> Result<ActivityLogPage, ApiError> {
        self.api
            .list_activity_logs(&plan.filters, plan.page, plan.per_page)
            .await
    }
}

pub struct SessionBrowser {
    api: Arc<ApiClient>,
    state: Mutex<PagerState>,
    snapshot: watch::Sender<Option<SessionPage>>,
}

impl SessionBrowser {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            api,
            state: Mutex::new(PagerState::default()),
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionPage>> {
        self.snapshot.subscribe()
    }

    pub async fn set_page(&self, page: i64) -> Result<(), ApiError> {
        self.state.lock().await.set_page(page);
        self.refresh().await
    }

    pub async fn set_per_page(&self, per_page: i64) -> Result<(), ApiError> {
        self.state.lock().await.set_per_page(per_page);
        self.refresh().await
    }

    pub async fn set_filters(&self, filters: LogFilters) -> Result<(), ApiError> {
        self.state.lock().await.set_filters(filters);
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<(), ApiError> {
        loop {
            let plan = match self.state.lock().await.begin_fetch() {
                Some(plan) => plan,
                None => return Ok(()),
            };

            let result = self
                .api
                .list_sessions(&plan.filters, plan.page, plan.per_page)
                .await;

            let mut state = self.state.lock().await;
            match result {
                Ok(page) => {
                    if state.is_current(plan.generation) {
                        let _ = self.snapshot.send(Some(page));
                    }
                }
                Err(err) => {
                    state.finish_fetch();
                    return Err(err);
                }
            }
            if !state.finish_fetch() {
                return Ok(());
            }
        }
    }
}
