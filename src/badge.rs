use serde::{Deserialize, Serialize};
use std::sync::RwLock;

pub const BADGE_COLOR: &str = "#7c3aed";

pub trait Badge: Send + Sync {
    fn show(&self, count: u64);
}

/// Badge text for a count; blank when nothing has been counted.
pub fn badge_text(count: u64) -> String {
    if count > 0 {
        count.to_string()
    } else {
        String::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeView {
    pub text: String,
    pub color: String,
}

impl Default for BadgeView {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: BADGE_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BadgeState {
    view: RwLock<BadgeView>,
}

impl BadgeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> BadgeView {
        self.view
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Badge for BadgeState {
    fn show(&self, count: u64) {
        let mut view = self
            .view
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        view.text = badge_text(count);
        view.color = BADGE_COLOR.to_string();
    }
}
