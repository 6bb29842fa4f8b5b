use crate::payload::PushPayload;

/// Everything the host can ask the push core to do.
#[derive(Debug, Clone)]
pub enum PushAction {
    /// A push arrived from the OS transport.
    Received {
        payload: PushPayload,
    },
    /// The user tapped a notification.
    Opened {
        payload: PushPayload,
    },
    /// The user swiped a notification away.
    Dismissed {
        notification_id: i32,
        payload: PushPayload,
    },
    /// The inline reply action fired.
    Reply {
        notification_id: i32,
        reply_text: Option<String>,
        payload: PushPayload,
    },
    ClearChannel {
        channel_id: String,
    },
    ClearAll,
}

impl PushAction {
    /// Log-safe action tag (no payload contents).
    pub fn tag(&self) -> &'static str {
        match self {
            PushAction::Received { .. } => "Received",
            PushAction::Opened { .. } => "Opened",
            PushAction::Dismissed { .. } => "Dismissed",
            PushAction::Reply { .. } => "Reply",
            PushAction::ClearChannel { .. } => "ClearChannel",
            PushAction::ClearAll => "ClearAll",
        }
    }
}
