use crate::counter::CounterService;
use crate::detector::{UrlFilter, is_reply_request};
use crate::models::{Disposition, NetworkEvent};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// How a tracked request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The id was never classified as a reply, or was already resolved.
    Untracked,
    /// A reply candidate finished with a 2xx status and must be counted once.
    Succeeded,
    Failed,
}

/// Reply-candidate requests that are still in flight, keyed by the network
/// layer's request id.
///
/// Every id that enters the table leaves it exactly once, through
/// [`on_request_completed`](Self::on_request_completed) or
/// [`on_request_error`](Self::on_request_error). Nothing survives a restart.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    pending: HashSet<String>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The only way into the pending table. Returns whether `id` is now pending.
    pub fn on_request_body(&mut self, id: &str, method: &str, raw_body: &[u8]) -> bool {
        if method != "POST" || raw_body.is_empty() {
            return false;
        }
        if !is_reply_request(raw_body) {
            return false;
        }
        self.pending.insert(id.to_string());
        true
    }

    pub fn on_request_completed(&mut self, id: &str, status_code: u16) -> Completion {
        if !self.pending.remove(id) {
            return Completion::Untracked;
        }
        if (200..=299).contains(&status_code) {
            Completion::Succeeded
        } else {
            Completion::Failed
        }
    }

    pub fn on_request_error(&mut self, id: &str) -> bool {
        self.pending.remove(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Feeds intercepted network events through the correlator and counts the
/// replies that succeed.
pub struct ReplyTracker {
    correlator: Mutex<RequestCorrelator>,
    filter: UrlFilter,
    counter: Arc<CounterService>,
}

impl ReplyTracker {
    pub fn new(filter: UrlFilter, counter: Arc<CounterService>) -> Self {
        Self {
            correlator: Mutex::new(RequestCorrelator::new()),
            filter,
            counter,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending_len()
    }

    pub async fn handle(&self, event: NetworkEvent) -> Disposition {
        if !self.filter.matches(event.url()) {
            return Disposition::Ignored;
        }

        match event {
            NetworkEvent::BeforeRequest {
                request_id,
                method,
                body,
                ..
            } => {
                let raw = body.as_deref().unwrap_or_default().as_bytes();
                if self.lock().on_request_body(&request_id, &method, raw) {
                    debug!(%request_id, "reply request in flight");
                    Disposition::Pending
                } else {
                    Disposition::Ignored
                }
            }
            NetworkEvent::Completed {
                request_id,
                status_code,
                ..
            } => {
                // The guard is a temporary here and is released before the await.
                let completion = self.lock().on_request_completed(&request_id, status_code);
                match completion {
                    Completion::Untracked => Disposition::Ignored,
                    Completion::Failed => {
                        debug!(%request_id, status_code, "reply request failed");
                        Disposition::Discarded
                    }
                    Completion::Succeeded => match self.counter.increment_today().await {
                        Ok(_) => Disposition::Counted,
                        Err(err) => {
                            warn!(%request_id, "reply went through but was not counted: {err}");
                            Disposition::Discarded
                        }
                    },
                }
            }
            NetworkEvent::ErrorOccurred { request_id, .. } => {
                if self.lock().on_request_error(&request_id) {
                    debug!(%request_id, "reply request errored");
                    Disposition::Discarded
                } else {
                    Disposition::Ignored
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RequestCorrelator> {
        self.correlator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
