//! Inline indicators showing today's count next to reply-submit controls.
//!
//! The host page re-renders constantly, so DOM mutations and count changes
//! only mark a pass as pending; the pass itself runs at most once per
//! animation frame.

use crate::counter::CounterService;
use crate::dom::{Document, NodeId};
use crate::errors::CounterError;
use crate::models::CountsChanged;
use crate::notify::next_change;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::trace;

pub const INDICATOR_ATTRIBUTE: &str = "data-reply-counter";
pub const INDICATOR_VALUE: &str = "indicator";
pub const CONTROL_ATTRIBUTE: &str = "data-testid";
pub const CONTROL_MARKERS: [&str; 2] = ["tweetButton", "tweetButtonInline"];

/// Roughly one display frame at 60Hz.
pub const FRAME: Duration = Duration::from_millis(16);

/// Best-effort match for a reply-submit button: one of the known markers plus
/// the word "reply" in its text or accessible label.
pub fn is_reply_control<D: Document>(document: &D, node: NodeId) -> bool {
    let marked = document
        .attribute(node, CONTROL_ATTRIBUTE)
        .is_some_and(|marker| CONTROL_MARKERS.contains(&marker.as_str()));
    if !marked {
        return false;
    }

    mentions_reply(&document.text_content(node))
        || document
            .attribute(node, "aria-label")
            .is_some_and(|label| mentions_reply(&label))
}

fn mentions_reply(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("reply"))
}

fn is_indicator<D: Document>(document: &D, node: NodeId) -> bool {
    document
        .attribute(node, INDICATOR_ATTRIBUTE)
        .is_some_and(|value| value == INDICATOR_VALUE)
}

pub struct IndicatorMounter<D> {
    document: D,
    today_count: u64,
    pass_pending: bool,
    passes: u64,
}

impl<D: Document> IndicatorMounter<D> {
    /// Subscribes to count changes before reading the current count, so no
    /// change can fall between the two. The first frame always mounts.
    pub async fn attach(
        document: D,
        counter: &CounterService,
    ) -> Result<(Self, broadcast::Receiver<CountsChanged>), CounterError> {
        let (counts, today) = counter.subscribe_with_snapshot().await?;
        Ok((Self::new(document, today.count), counts))
    }

    fn new(document: D, today_count: u64) -> Self {
        Self {
            document,
            today_count,
            pass_pending: true,
            passes: 0,
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn today_count(&self) -> u64 {
        self.today_count
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_pass_pending(&self) -> bool {
        self.pass_pending
    }

    /// Returns true when this call scheduled a new pass, i.e. the caller
    /// should request an animation frame.
    pub fn on_mutation(&mut self) -> bool {
        self.schedule()
    }

    pub fn on_count_changed(&mut self, count: u64) -> bool {
        self.today_count = count;
        self.schedule()
    }

    /// Runs the pending pass, if any. Returns whether a pass ran.
    pub fn on_animation_frame(&mut self) -> bool {
        if !self.pass_pending {
            return false;
        }
        self.pass_pending = false;
        self.mount_pass();
        true
    }

    fn schedule(&mut self) -> bool {
        let newly = !self.pass_pending;
        self.pass_pending = true;
        newly
    }

    fn mount_pass(&mut self) {
        self.passes += 1;
        let doc = &mut self.document;

        for indicator in doc.query_attribute(INDICATOR_ATTRIBUTE, INDICATOR_VALUE) {
            let still_placed = doc
                .next_element_sibling(indicator)
                .is_some_and(|next| is_reply_control(&*doc, next));
            if !still_placed {
                doc.remove(indicator);
            }
        }

        let controls: Vec<NodeId> = CONTROL_MARKERS
            .iter()
            .flat_map(|marker| doc.query_attribute(CONTROL_ATTRIBUTE, marker))
            .filter(|&control| is_reply_control(&*doc, control))
            .collect();

        let text = self.today_count.to_string();
        for control in controls {
            let indicator = match doc.previous_element_sibling(control) {
                Some(prev) if is_indicator(&*doc, prev) => prev,
                _ => {
                    let created = doc.create_element(
                        "span",
                        &[(INDICATOR_ATTRIBUTE, INDICATOR_VALUE), ("aria-hidden", "true")],
                    );
                    doc.insert_before(created, control);
                    created
                }
            };
            // Writing identical text would still fire a mutation and schedule
            // another pass.
            if doc.text_content(indicator) != text {
                doc.set_text_content(indicator, &text);
            }
        }
        trace!(pass = self.passes, count = self.today_count, "indicators mounted");
    }
}

/// Drives a mounter: DOM mutations arrive on `mutations`, count changes on
/// `counts`, and a frame ticks every `frame`. A due frame is handled before
/// queued events, so a mutation flood cannot hold passes back. Returns the
/// mounter once the mutation source closes.
pub async fn run_mounter<D: Document>(
    mut mounter: IndicatorMounter<D>,
    mut mutations: mpsc::Receiver<()>,
    mut counts: broadcast::Receiver<CountsChanged>,
    frame: Duration,
) -> IndicatorMounter<D> {
    let mut ticker = interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut counts_open = true;

    loop {
        tokio::select! {
            biased;

            _ = ticker.tick() => {
                mounter.on_animation_frame();
            }
            mutation = mutations.recv() => match mutation {
                Some(()) => {
                    mounter.on_mutation();
                }
                None => break,
            },
            change = next_change(&mut counts), if counts_open => match change {
                Some(change) => {
                    mounter.on_count_changed(change.count);
                }
                None => counts_open = false,
            },
        }
    }

    mounter
}
