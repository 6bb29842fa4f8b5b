use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PushError, Rejection};
use crate::payload::PushPayload;

use super::resolver::api_url;

/// Wait before each retry, in backoff units. Index 0 is never slept on.
pub(crate) const FIBONACCI_BACKOFF: [u32; 6] = [0, 1, 2, 3, 5, 8];

const ACK_PLATFORM: &str = "android";
const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Keys copied out of an acknowledgement response into the expanded payload.
const EXPANDED_KEYS: [&str; 11] = [
    "post_id",
    "root_id",
    "category",
    "message",
    "team_id",
    "channel_id",
    "channel_name",
    "type",
    "sender_id",
    "sender_name",
    "version",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptRequest {
    pub ack_id: String,
    pub server_url: String,
    pub post_id: Option<String>,
    pub push_type: String,
    pub id_loaded: bool,
}

#[derive(Serialize)]
struct ReceiptBody<'a> {
    id: &'a str,
    received_at: i64,
    platform: &'static str,
    #[serde(rename = "type")]
    push_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_id: Option<&'a str>,
    is_id_loaded: bool,
}

/// Posts delivery acknowledgements; stubs are retried on the Fibonacci table.
#[derive(Clone)]
pub struct ReceiptDelivery {
    http: reqwest::Client,
    backoff_unit: Duration,
    network_enabled: bool,
}

impl ReceiptDelivery {
    pub fn new(http: reqwest::Client, backoff_unit: Duration, network_enabled: bool) -> Self {
        Self {
            http,
            backoff_unit,
            network_enabled,
        }
    }

    /// Returns the expanded payload the server sent back with its 200.
    pub async fn send(
        &self,
        request: &ReceiptRequest,
        token: Option<&str>,
    ) -> Result<PushPayload, PushError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(PushError::ConfigMissing("Invalid token"))?;
        if !self.network_enabled {
            return Err(PushError::ConfigMissing("network disabled"));
        }

        let body = encode_body(request, chrono::Utc::now().timestamp_millis())?;
        let url = api_url(&request.server_url, "/api/v4/notifications/ack");

        let mut attempt = 0usize;
        loop {
            match self.attempt(&url, token, &body).await {
                Ok(expanded) => return Ok(expanded),
                Err(e) if !request.id_loaded || !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let Some(delay) = backoff_delay(attempt, self.backoff_unit) else {
                        return Err(e);
                    };
                    tracing::info!(%e, attempt, delay_ms = delay.as_millis() as u64, "receipt retry");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(&self, url: &str, token: &str, body: &str) -> Result<PushPayload, PushError> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(body.to_string())
            .send()
            .await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        if status != 200 {
            return Err(match Rejection::from_status(status) {
                Some(rejection) => PushError::ServerRejection(rejection),
                None => PushError::UnexpectedStatus(status),
            });
        }
        parse_expanded_payload(&text)
    }
}

/// `None` once the table is exhausted.
pub(crate) fn backoff_delay(attempt: usize, unit: Duration) -> Option<Duration> {
    FIBONACCI_BACKOFF.get(attempt).map(|units| unit * *units)
}

fn encode_body(request: &ReceiptRequest, received_at: i64) -> Result<String, PushError> {
    Ok(serde_json::to_string(&ReceiptBody {
        id: &request.ack_id,
        received_at,
        platform: ACK_PLATFORM,
        push_type: &request.push_type,
        post_id: request.post_id.as_deref(),
        is_id_loaded: request.id_loaded,
    })?)
}

/// A 200 that is not a JSON object counts as a transport failure.
pub(crate) fn parse_expanded_payload(text: &str) -> Result<PushPayload, PushError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| PushError::Transport(format!("invalid receipt response: {e}")))?;
    let Value::Object(map) = value else {
        return Err(PushError::Transport(
            "receipt response is not an object".into(),
        ));
    };
    let mut expanded = PushPayload::new();
    for key in EXPANDED_KEYS {
        match map.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => expanded.insert(key, s.clone()),
            Some(other) => expanded.insert(key, other.to_string()),
        }
    }
    Ok(expanded)
}
