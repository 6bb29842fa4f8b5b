use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::error::{PushError, Rejection};
use crate::notification::StyleMessage;
use crate::payload::{keys, PushPayload};
use crate::updates::{CoreMsg, InternalEvent};

use super::resolver::api_url;
use super::PushCore;

pub const REPLY_FAILED_MESSAGE: &str = "Message failed to send.";

/// Body of an inline reply post. Threads under `root_id`, else the post itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_id: Option<String>,
}

impl ReplyRequest {
    pub fn from_payload(payload: &PushPayload, message: String) -> Self {
        Self {
            channel_id: payload.channel_id().map(str::to_string),
            message,
            root_id: payload
                .non_empty(keys::ROOT_ID)
                .or_else(|| payload.post_id())
                .map(str::to_string),
        }
    }
}

/// Posts a reply. Any non-2xx status is an error; there is no retry.
pub async fn post_reply(
    http: &reqwest::Client,
    server_url: &str,
    token: &str,
    request: &ReplyRequest,
) -> Result<(), PushError> {
    let url = api_url(server_url, "/api/v4/posts?set_online=false");
    let resp = http
        .post(url)
        .bearer_auth(token)
        .header(CONTENT_TYPE, "application/json")
        .body(serde_json::to_string(request)?)
        .send()
        .await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let status = status.as_u16();
    Err(match Rejection::from_status(status) {
        Some(rejection) => PushError::ServerRejection(rejection),
        None => PushError::UnexpectedStatus(status),
    })
}

impl PushCore {
    pub(super) fn on_reply(
        &mut self,
        notification_id: i32,
        reply_text: Option<String>,
        mut payload: PushPayload,
    ) {
        let Some(reply_text) = reply_text.filter(|t| !t.is_empty()) else {
            return;
        };

        let server_url = payload
            .server_url()
            .map(str::to_string)
            .or_else(|| self.resolve_server_url(&mut payload));
        let Some(server_url) = server_url else {
            tracing::warn!("reply without a known server");
            self.on_reply_failed(notification_id, &payload);
            return;
        };
        let Some(token) = self.token_for(&server_url) else {
            tracing::warn!(%server_url, "reply without credentials");
            self.on_reply_failed(notification_id, &payload);
            return;
        };

        let request = ReplyRequest::from_payload(&payload, reply_text.clone());
        let http = self.http.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = post_reply(&http, &server_url, &token, &request).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::ReplyFinished {
                notification_id,
                payload,
                reply_text,
                result,
            })));
        });
    }

    pub(super) fn handle_reply_finished(
        &mut self,
        notification_id: i32,
        payload: PushPayload,
        reply_text: String,
        result: Result<(), PushError>,
    ) {
        match result {
            Ok(()) => {
                tracing::info!(notification_id, "reply sent");
                self.on_reply_success(notification_id, &payload, reply_text);
            }
            Err(e) => {
                tracing::warn!(%e, notification_id, "reply failed");
                self.on_reply_failed(notification_id, &payload);
            }
        }
    }

    fn on_reply_success(&self, notification_id: i32, payload: &PushPayload, reply_text: String) {
        self.recreate_notification(notification_id, payload, reply_text, true);
    }

    fn on_reply_failed(&self, notification_id: i32, payload: &PushPayload) {
        self.recreate_notification(
            notification_id,
            payload,
            REPLY_FAILED_MESSAGE.to_string(),
            false,
        );
    }

    /// Rebuilds the entry and appends one line, from self or anonymous.
    fn recreate_notification(
        &self,
        notification_id: i32,
        payload: &PushPayload,
        text: String,
        from_self: bool,
    ) {
        let mut spec = self.builder().build(payload, notification_id, false);
        let sender = from_self.then(|| spec.style.user.clone());
        spec.style.add_message(StyleMessage {
            text,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            sender,
        });
        self.host.drawer.notify(notification_id, &spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_falls_back_to_post() {
        let payload = PushPayload::from_pairs([("channel_id", "c1"), ("post_id", "p1")]);
        let request = ReplyRequest::from_payload(&payload, "ok".into());
        assert_eq!(request.root_id.as_deref(), Some("p1"));

        let payload = PushPayload::from_pairs([
            ("channel_id", "c1"),
            ("post_id", "p2"),
            ("root_id", "r1"),
        ]);
        let request = ReplyRequest::from_payload(&payload, "ok".into());
        assert_eq!(request.root_id.as_deref(), Some("r1"));

        let payload = PushPayload::from_pairs([("post_id", "p2"), ("root_id", "")]);
        let request = ReplyRequest::from_payload(&payload, "ok".into());
        assert_eq!(request.root_id.as_deref(), Some("p2"));
    }

    #[test]
    fn body_shape() {
        let request = ReplyRequest {
            channel_id: Some("c1".into()),
            message: "ok".into(),
            root_id: Some("p1".into()),
        };
        let body: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"channel_id": "c1", "message": "ok", "root_id": "p1"})
        );

        let request = ReplyRequest {
            channel_id: None,
            message: "ok".into(),
            root_id: None,
        };
        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"message":"ok"}"#);
    }
}
