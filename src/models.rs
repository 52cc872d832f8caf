use crate::clock::DayKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replies per day. A missing day means zero.
pub type CountTable = BTreeMap<DayKey, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayCount {
    pub date: DayKey,
    pub count: u64,
}

/// Broadcast after every persisted change to the count table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountsChanged {
    pub date: DayKey,
    pub count: u64,
    pub table: CountTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "GET_TODAY_COUNT", alias = "RGI/GET_TODAY_COUNT")]
    GetTodayCount,
    /// `at` and `url` are only logged, so any JSON is accepted for them.
    #[serde(rename = "INCREMENT_REPLY", alias = "RGI/INCREMENT_REPLY")]
    IncrementReply {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<serde_json::Value>,
    },
}

impl Message {
    /// Validates an untyped payload. Anything that is not a known message is `None`.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        serde_json::from_slice(raw).ok()
    }
}

/// `{ ok: true, date, count }` or `{ ok: false, error }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DayKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn success(today: TodayCount) -> Self {
        Self {
            ok: true,
            date: Some(today.date),
            count: Some(today.count),
            error: None,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            ok: false,
            date: None,
            count: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NetworkEvent {
    BeforeRequest {
        request_id: String,
        method: String,
        url: String,
        #[serde(default)]
        body: Option<String>,
    },
    Completed {
        request_id: String,
        url: String,
        status_code: u16,
    },
    ErrorOccurred {
        request_id: String,
        url: String,
    },
}

impl NetworkEvent {
    pub fn url(&self) -> &str {
        match self {
            Self::BeforeRequest { url, .. }
            | Self::Completed { url, .. }
            | Self::ErrorOccurred { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Not reply traffic, or not a request we were tracking.
    Ignored,
    /// Classified as a reply; waiting for the outcome.
    Pending,
    Counted,
    Discarded,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub disposition: Disposition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: DayKey,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentDaysResponse {
    pub days: Vec<DayTotal>,
}
