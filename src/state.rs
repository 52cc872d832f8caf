use crate::badge::BadgeState;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::correlator::ReplyTracker;
use crate::counter::CounterService;
use crate::detector::UrlFilter;
use crate::storage::{CountStore, JsonFileStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub counter: Arc<CounterService>,
    pub tracker: Arc<ReplyTracker>,
    pub badge: Arc<BadgeState>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CountStore>,
        clock: Arc<dyn Clock>,
        filter: UrlFilter,
    ) -> Self {
        let badge = Arc::new(BadgeState::new());
        let counter = Arc::new(CounterService::new(store, badge.clone(), clock));
        let tracker = Arc::new(ReplyTracker::new(filter, counter.clone()));
        Self {
            counter,
            tracker,
            badge,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, globset::Error> {
        let filter = UrlFilter::new(config.url_patterns.iter().cloned())?;
        Ok(Self::new(
            Arc::new(JsonFileStore::new(config.data_path.clone())),
            Arc::new(SystemClock),
            filter,
        ))
    }
}
