use crate::models::CountsChanged;
use tokio::sync::broadcast;
use tracing::trace;

const CHANNEL_CAPACITY: usize = 64;

/// The single channel through which count changes reach observers.
///
/// There is no replay: a receiver only sees changes published after it
/// subscribed, so new observers must read the current count once themselves.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<CountsChanged>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CountsChanged> {
        self.tx.subscribe()
    }

    pub fn publish(&self, change: CountsChanged) -> usize {
        match self.tx.send(change) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("count changed with no observers");
                0
            }
        }
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Waits for the next change, skipping over anything missed while lagging.
/// `None` once the notifier is gone.
pub async fn next_change(rx: &mut broadcast::Receiver<CountsChanged>) -> Option<CountsChanged> {
    loop {
        match rx.recv().await {
            Ok(change) => return Some(change),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                trace!(skipped, "observer lagged behind count changes");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::DayKey;
    use crate::models::CountTable;

    fn change(count: u64) -> CountsChanged {
        let date = DayKey::from("2024-03-05");
        let mut table = CountTable::new();
        table.insert(date.clone(), count);
        CountsChanged { date, count, table }
    }

    #[tokio::test]
    async fn every_observer_receives_the_change() {
        let notifier = Notifier::new();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        assert_eq!(notifier.publish(change(1)), 2);
        assert_eq!(next_change(&mut first).await.unwrap().count, 1);
        assert_eq!(next_change(&mut second).await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn late_observers_get_no_replay() {
        let notifier = Notifier::new();
        assert_eq!(notifier.publish(change(1)), 0);

        let mut late = notifier.subscribe();
        notifier.publish(change(2));
        assert_eq!(next_change(&mut late).await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn lagging_observer_resumes_with_newer_values() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        for count in 1..=(CHANNEL_CAPACITY as u64 + 5) {
            notifier.publish(change(count));
        }

        let first_seen = next_change(&mut rx).await.unwrap();
        assert!(first_seen.count > 1);
    }

    #[tokio::test]
    async fn closed_channel_ends_the_stream() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        drop(notifier);

        assert!(next_change(&mut rx).await.is_none());
    }
}
