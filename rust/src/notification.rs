use std::collections::BTreeMap;

use image::RgbaImage;

use crate::payload::{keys, PushPayload};

pub const CHANNEL_HIGH_IMPORTANCE_ID: &str = "channel_01";
pub const CHANNEL_MIN_IMPORTANCE_ID: &str = "channel_02";
pub const KEY_TEXT_REPLY: &str = "CAN_REPLY";
pub const REPLY_LABEL: &str = "Reply";
pub const CATEGORY_MESSAGE: &str = "message";

/// First SDK level with notification channels and badge icon types.
pub const SDK_CHANNELS: u32 = 26;
/// First SDK level that renders group conversations in the messaging style.
pub const SDK_GROUP_CONVERSATION: u32 = 28;
/// First SDK level that requires an explicit mutability flag on reply intents.
pub const SDK_MUTABLE_INTENTS: u32 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Min,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: &'static str,
    pub name: &'static str,
    pub importance: Importance,
    pub show_badge: bool,
}

pub fn default_channels() -> [NotificationChannel; 2] {
    [
        NotificationChannel {
            id: CHANNEL_HIGH_IMPORTANCE_ID,
            name: "High Importance",
            importance: Importance::High,
            show_badge: true,
        },
        NotificationChannel {
            id: CHANNEL_MIN_IMPORTANCE_ID,
            name: "Min Importance",
            importance: Importance::Min,
            show_badge: true,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmallIcon {
    /// A mipmap resource the host reported as present.
    Resource(String),
    /// The platform's built-in info icon.
    PlatformInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub key: Option<String>,
    pub name: String,
    pub icon: Option<RgbaImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleMessage {
    pub text: String,
    pub timestamp_ms: i64,
    /// `None` renders as an anonymous system line.
    pub sender: Option<Person>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessagingStyle {
    pub user: Person,
    pub conversation_title: Option<String>,
    pub is_group_conversation: bool,
    pub messages: Vec<StyleMessage>,
}

impl MessagingStyle {
    pub fn add_message(&mut self, message: StyleMessage) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&StyleMessage> {
        self.messages.last()
    }
}

/// Tap target: opens the app on the conversation the payload points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIntent {
    pub payload: PushPayload,
}

/// Fired by the OS when the user swipes the notification away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteIntent {
    pub notification_id: i32,
    pub payload: PushPayload,
    pub one_shot: bool,
    pub immutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInput {
    pub result_key: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAction {
    pub title: &'static str,
    pub remote_input: RemoteInput,
    pub request_code: i32,
    pub mutable: bool,
    pub allow_generated_replies: bool,
    pub payload: PushPayload,
}

/// Everything the host needs to post one drawer entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSpec {
    pub channel_id: Option<&'static str>,
    pub content_intent: ContentIntent,
    pub delete_intent: DeleteIntent,
    pub extras: BTreeMap<String, String>,
    pub small_icon: SmallIcon,
    pub large_icon: Option<RgbaImage>,
    pub style: MessagingStyle,
    pub group: Option<String>,
    pub group_summary: bool,
    pub reply_action: Option<ReplyAction>,
    pub show_when: bool,
    pub high_priority: bool,
    /// Hide the content on a locked screen.
    pub private_visibility: bool,
    pub category: &'static str,
    pub auto_cancel: bool,
    /// Launcher badges show the large icon (SDK 26+).
    pub large_badge_icon: bool,
}

impl NotificationSpec {
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }
}

/// A notification the drawer currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNotification {
    pub id: i32,
    pub extras: BTreeMap<String, String>,
}

impl ActiveNotification {
    pub fn channel_id(&self) -> Option<&str> {
        self.extras.get(keys::CHANNEL_ID).map(String::as_str)
    }
}
