use std::collections::BTreeMap;

use crate::notification::{
    ContentIntent, DeleteIntent, MessagingStyle, NotificationSpec, Person, RemoteInput,
    ReplyAction, SmallIcon, StyleMessage, CATEGORY_MESSAGE, CHANNEL_HIGH_IMPORTANCE_ID,
    KEY_TEXT_REPLY, REPLY_LABEL, SDK_CHANNELS, SDK_GROUP_CONVERSATION, SDK_MUTABLE_INTENTS,
};
use crate::payload::{keys, PushPayload, PushType};
use crate::platform::HostPlatform;

use super::avatar::AvatarSource;

const DEFAULT_SMALL_ICON: &str = "ic_notification";
const FALLBACK_SMALL_ICON: &str = "ic_launcher";
const SELF_USER_ID: &str = "me";
const SELF_DISPLAY_NAME: &str = "Me";
// Person key used when the payload has no sender id.
const UNKNOWN_SENDER_KEY: &str = "sender_id";

/// Keys mirrored into the notification extras so later taps and dismissals
/// can find their conversation.
const EXTRA_KEYS: [&str; 5] = [
    keys::CHANNEL_ID,
    keys::POST_ID,
    keys::ROOT_ID,
    keys::IS_CRT_ENABLED,
    keys::SERVER_URL,
];

/// Turns a payload into a drawer entry. Only avatar lookups touch the outside world.
pub struct NotificationBuilder<'a> {
    platform: &'a dyn HostPlatform,
    avatars: &'a dyn AvatarSource,
}

impl<'a> NotificationBuilder<'a> {
    pub fn new(platform: &'a dyn HostPlatform, avatars: &'a dyn AvatarSource) -> Self {
        Self { platform, avatars }
    }

    /// `notification_id` is the primary's id; the summary is posted under `id + 1`.
    pub fn build(
        &self,
        payload: &PushPayload,
        notification_id: i32,
        create_summary: bool,
    ) -> NotificationSpec {
        let sdk_int = self.platform.sdk_int();
        let posted_id = if create_summary {
            notification_id.wrapping_add(1)
        } else {
            notification_id
        };

        NotificationSpec {
            channel_id: (sdk_int >= SDK_CHANNELS).then_some(CHANNEL_HIGH_IMPORTANCE_ID),
            content_intent: ContentIntent {
                payload: payload.clone(),
            },
            delete_intent: DeleteIntent {
                notification_id: posted_id,
                payload: payload.clone(),
                one_shot: true,
                immutable: true,
            },
            extras: notification_extras(payload),
            small_icon: self.small_icon(payload.get(keys::SMALL_ICON)),
            large_icon: self.large_icon(payload),
            style: self.messaging_style(payload, sdk_int),
            group: payload.group_key().map(str::to_string),
            group_summary: create_summary,
            reply_action: reply_action(payload, notification_id, sdk_int),
            show_when: has_reply_target(payload),
            high_priority: true,
            private_visibility: true,
            category: CATEGORY_MESSAGE,
            auto_cancel: true,
            large_badge_icon: sdk_int >= SDK_CHANNELS,
        }
    }

    fn small_icon(&self, requested: Option<&str>) -> SmallIcon {
        let requested = requested.unwrap_or(DEFAULT_SMALL_ICON);
        [requested, FALLBACK_SMALL_ICON]
            .into_iter()
            .find(|name| self.platform.has_icon_resource(name))
            .map(|name| SmallIcon::Resource(name.to_string()))
            .unwrap_or(SmallIcon::PlatformInfo)
    }

    /// Direct messages show the sender's avatar as the large icon.
    fn large_icon(&self, payload: &PushPayload) -> Option<image::RgbaImage> {
        let server_url = payload.server_url()?;
        let sender_name = payload.get(keys::SENDER_NAME)?;
        if payload.conversation_title() != sender_name {
            return None;
        }
        let sender_id = payload.sender_id().unwrap_or_default();
        self.avatars.avatar(
            server_url,
            sender_id,
            payload.get(keys::OVERRIDE_ICON_URL),
        )
    }

    fn messaging_style(&self, payload: &PushPayload, sdk_int: u32) -> MessagingStyle {
        let fetch_avatars = payload.push_type() != Some(PushType::Session);
        let server_url = payload.server_url();

        let user = Person {
            key: Some(SELF_USER_ID.to_string()),
            name: SELF_DISPLAY_NAME.to_string(),
            icon: server_url
                .filter(|_| fetch_avatars)
                .and_then(|url| self.avatars.avatar(url, SELF_USER_ID, None)),
        };

        let conversation_title = payload.conversation_title();
        let sender_name = payload
            .non_empty(keys::SENDER_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| payload.sender_name());
        let titled = conversation_title != sender_name;

        let sender_id = payload.sender_id().unwrap_or(UNKNOWN_SENDER_KEY);
        let sender = Person {
            key: Some(sender_id.to_string()),
            name: payload.sender_name(),
            icon: server_url
                .filter(|_| fetch_avatars)
                .and_then(|url| self.avatars.avatar(url, sender_id, None)),
        };

        MessagingStyle {
            user,
            conversation_title: titled.then_some(conversation_title),
            is_group_conversation: titled && sdk_int >= SDK_GROUP_CONVERSATION,
            messages: vec![StyleMessage {
                text: payload.message_body(),
                timestamp_ms: chrono::Utc::now().timestamp_millis(),
                sender: Some(sender),
            }],
        }
    }
}

fn notification_extras(payload: &PushPayload) -> BTreeMap<String, String> {
    let mut extras = payload.user_info().clone();
    for key in EXTRA_KEYS {
        if let Some(value) = payload.get(key) {
            extras.insert(key.to_string(), value.to_string());
        }
    }
    extras
}

fn has_reply_target(payload: &PushPayload) -> bool {
    payload.non_empty(keys::POST_ID).is_some() && payload.server_url().is_some()
}

fn reply_action(payload: &PushPayload, notification_id: i32, sdk_int: u32) -> Option<ReplyAction> {
    if !has_reply_target(payload) {
        return None;
    }
    Some(ReplyAction {
        title: REPLY_LABEL,
        remote_input: RemoteInput {
            result_key: KEY_TEXT_REPLY,
            label: REPLY_LABEL,
        },
        request_code: notification_id,
        mutable: sdk_int >= SDK_MUTABLE_INTENTS,
        allow_generated_replies: true,
        payload: payload.clone(),
    })
}
