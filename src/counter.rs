use crate::badge::Badge;
use crate::clock::Clock;
use crate::errors::CounterError;
use crate::models::{CountsChanged, DayTotal, TodayCount};
use crate::notify::Notifier;
use crate::stats::recent_days_at;
use crate::storage::CountStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Owns every read and write of the count table.
///
/// Increments are a plain read-modify-write against the store. Two increments
/// whose windows overlap can both read the same value, and one of them is lost.
pub struct CounterService {
    store: Arc<dyn CountStore>,
    badge: Arc<dyn Badge>,
    clock: Arc<dyn Clock>,
    notifier: Notifier,
}

impl CounterService {
    pub fn new(store: Arc<dyn CountStore>, badge: Arc<dyn Badge>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            badge,
            clock,
            notifier: Notifier::new(),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Today's count. Also repaints the badge so it heals after a missed update.
    pub async fn get_today(&self) -> Result<TodayCount, CounterError> {
        let table = self.store.get().await.inspect_err(|err| {
            warn!("failed to read counts: {err}");
        })?;
        let date = self.clock.today_key();
        let count = table.get(&date).copied().unwrap_or(0);
        self.badge.show(count);
        Ok(TodayCount { date, count })
    }

    pub async fn increment_today(&self) -> Result<TodayCount, CounterError> {
        let mut table = self.store.get().await.inspect_err(|err| {
            warn!("failed to read counts: {err}");
        })?;
        let date = self.clock.today_key();
        let count = {
            let entry = table.entry(date.clone()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };

        self.store.set(&table).await.inspect_err(|err| {
            warn!("failed to persist counts: {err}");
        })?;
        self.badge.show(count);
        self.notifier.publish(CountsChanged {
            date: date.clone(),
            count,
            table,
        });

        info!(%date, count, "reply counted");
        Ok(TodayCount { date, count })
    }

    /// Repaints the badge from storage, logging instead of failing.
    pub async fn refresh_badge(&self) {
        if let Err(err) = self.get_today().await {
            warn!("badge refresh skipped: {err}");
        }
    }

    /// Subscribes, then reads the current count, so no change can fall between
    /// the two.
    pub async fn subscribe_with_snapshot(
        &self,
    ) -> Result<(broadcast::Receiver<CountsChanged>, TodayCount), CounterError> {
        let rx = self.notifier.subscribe();
        let today = self.get_today().await?;
        Ok((rx, today))
    }

    /// Per-day totals for the last `days` days, oldest first.
    pub async fn recent_days(&self, days: u32) -> Result<Vec<DayTotal>, CounterError> {
        let table = self.store.get().await?;
        Ok(recent_days_at(self.clock.today(), &table, days))
    }
}
