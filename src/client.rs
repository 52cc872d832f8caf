use crate::models::{Message, MessageResponse};
use reqwest::{Client, StatusCode};

/// Sends messages to a running counter service. Transport problems come back as
/// `{ ok: false, error }` responses rather than errors.
#[derive(Debug, Clone)]
pub struct MessageClient {
    base_url: String,
    http: Client,
}

impl MessageClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub async fn send(&self, message: &Message) -> MessageResponse {
        let response = match self
            .http
            .post(format!("{}/api/message", self.base_url))
            .json(message)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return MessageResponse::failure(err),
        };

        match response.status() {
            StatusCode::NO_CONTENT => MessageResponse::failure("message was not recognized"),
            status if !status.is_success() => {
                MessageResponse::failure(format!("counter service answered {status}"))
            }
            _ => response
                .json::<MessageResponse>()
                .await
                .unwrap_or_else(MessageResponse::failure),
        }
    }

    pub async fn get_today_count(&self) -> MessageResponse {
        self.send(&Message::GetTodayCount).await
    }

    pub async fn increment_reply(&self, at: Option<f64>, url: Option<String>) -> MessageResponse {
        self.send(&Message::IncrementReply {
            at: at.map(serde_json::Value::from),
            url: url.map(serde_json::Value::from),
        })
        .await
    }
}
