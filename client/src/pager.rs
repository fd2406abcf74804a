//! Fetch coordination for the paginated log views.
//!
//! Two problems are handled here. First, rapid page or filter changes
//! must not fan out into parallel requests: while a fetch is in
//! flight, later triggers coalesce into a single follow-up. Second,
//! a response that raced with a newer page or filter change must not
//! overwrite fresher inputs, so every state change bumps a generation
//! and a response is only applied when its generation is still current.

use crate::api::LogFilters;

pub const FIRST_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 25;

#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub generation: u64,
    pub page: i64,
    pub per_page: i64,
    pub filters: LogFilters,
}

#[derive(Debug)]
pub struct PagerState {
    page: i64,
    per_page: i64,
    filters: LogFilters,
    generation: u64,
    in_flight: bool,
    queued: bool,
}

impl Default for PagerState {
    fn default() -> Self {
        Self {
            page: FIRST_PAGE,
            per_page: DEFAULT_PER_PAGE,
            filters: LogFilters::default(),
            generation: 0,
            in_flight: false,
            queued: false,
        }
    }
}

impl PagerState {
    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn filters(&self) -> &LogFilters {
        &self.filters
    }

    pub fn set_page(&mut self, page: i64) {
        self.page = page.max(FIRST_PAGE);
        self.generation += 1;
    }

    /// Changing the page size restarts from the first page.
    pub fn set_per_page(&mut self, per_page: i64) {
        self.per_page = per_page.max(1);
        self.page = FIRST_PAGE;
        self.generation += 1;
    }

    /// Changing filters restarts from the first page.
    pub fn set_filters(&mut self, filters: LogFilters) {
        if self.filters != filters {
            self.filters = filters;
            self.page = FIRST_PAGE;
        }
        self.generation += 1;
    }

    /// Claims the right to fetch. Returns `None` when a fetch is
    /// already running; the trigger is remembered and replayed by
    /// [`PagerState::finish_fetch`].
    pub fn begin_fetch(&mut self) -> Option<FetchPlan> {
        if self.in_flight {
            self.queued = true;
            return None;
        }
        self.in_flight = true;
        Some(FetchPlan {
            generation: self.generation,
            page: self.page,
            per_page: self.per_page,
            filters: self.filters.clone(),
        })
    }

    /// Whether a completed response is still for the current inputs.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Ends the in-flight fetch. Returns `true` when a coalesced
    /// trigger arrived in the meantime and the caller should fetch
    /// again.
    pub fn finish_fetch(&mut self) -> bool {
        self.in_flight = false;
        std::mem::take(&mut self.queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_fetch_claims_and_coalesces() {
        let mut state = PagerState::default();
        let plan = state.begin_fetch().expect("first claim succeeds");
        assert_eq!(plan.page, FIRST_PAGE);

        // Triggers while in flight coalesce into one queued rerun.
        assert!(state.begin_fetch().is_none());
        assert!(state.begin_fetch().is_none());

        assert!(state.finish_fetch());
        // The queue drains once.
        assert!(!state.finish_fetch());
    }

    #[test]
    fn stale_generations_are_rejected() {
        let mut state = PagerState::default();
        let plan = state.begin_fetch().expect("claim");
        state.set_page(3);
        assert!(!state.is_current(plan.generation));

        state.finish_fetch();
        let plan = state.begin_fetch().expect("claim");
        assert!(state.is_current(plan.generation));
        assert_eq!(plan.page, 3);
    }

    #[test]
    fn per_page_and_filter_changes_reset_page() {
        let mut state = PagerState::default();
        state.set_page(4);
        state.set_per_page(50);
        assert_eq!(state.page(), FIRST_PAGE);
        assert_eq!(state.per_page(), 50);

        state.set_page(2);
        state.set_filters(LogFilters {
            action_type: Some("login".into()),
            ..Default::default()
        });
        assert_eq!(state.page(), FIRST_PAGE);
    }

    #[test]
    fn identical_filters_keep_the_page() {
        let mut state = PagerState::default();
        state.set_page(2);
        state.set_filters(LogFilters::default());
        assert_eq!(state.page(), 2);
    }
}
