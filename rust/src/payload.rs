use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::PushError;

/// Drawer id used when a payload carries neither `post_id` nor `channel_id`.
pub const DEFAULT_NOTIFICATION_ID: i32 = 435345;

pub mod keys {
    pub const TYPE: &str = "type";
    pub const ACK_ID: &str = "ack_id";
    pub const ID_LOADED: &str = "id_loaded";
    pub const SERVER_ID: &str = "server_id";
    pub const SERVER_URL: &str = "server_url";
    pub const CHANNEL_ID: &str = "channel_id";
    pub const CHANNEL_NAME: &str = "channel_name";
    pub const POST_ID: &str = "post_id";
    pub const ROOT_ID: &str = "root_id";
    pub const IS_CRT_ENABLED: &str = "is_crt_enabled";
    pub const SENDER_ID: &str = "sender_id";
    pub const SENDER_NAME: &str = "sender_name";
    pub const MESSAGE: &str = "message";
    pub const BODY: &str = "body";
    pub const TITLE: &str = "title";
    pub const OVERRIDE_ICON_URL: &str = "override_icon_url";
    pub const SMALL_ICON: &str = "smallIcon";
    pub const USER_INFO: &str = "userInfo";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushType {
    Message,
    Clear,
    Session,
}

impl PushType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(PushType::Message),
            "clear" => Some(PushType::Clear),
            "session" => Some(PushType::Session),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PushType::Message => "message",
            PushType::Clear => "clear",
            PushType::Session => "session",
        }
    }
}

/// The flat string map the OS hands over for one push, plus the optional
/// nested `userInfo` map. Unknown keys are carried untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
    #[serde(rename = "userInfo", skip_serializing_if = "BTreeMap::is_empty")]
    user_info: BTreeMap<String, String>,
}

impl PushPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut payload = Self::default();
        for (k, v) in pairs {
            payload.insert(k, v);
        }
        payload
    }

    /// Decode a JSON object. Non-string scalars are stringified, nulls skipped,
    /// and a nested `userInfo` object becomes the user-info map.
    pub fn from_json(json: &str) -> Result<Self, PushError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, PushError> {
        let Value::Object(map) = value else {
            return Err(PushError::PayloadMalformed(
                "push payload is not a JSON object".into(),
            ));
        };
        let mut payload = Self::default();
        for (key, value) in map {
            if key == keys::USER_INFO {
                if let Value::Object(info) = value {
                    for (k, v) in info {
                        if let Some(s) = scalar_to_string(v) {
                            payload.user_info.insert(k.clone(), s);
                        }
                    }
                }
                continue;
            }
            if let Some(s) = scalar_to_string(value) {
                payload.fields.insert(key.clone(), s);
            }
        }
        Ok(payload)
    }

    pub fn to_json(&self) -> Result<String, PushError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get) but treats an empty value as absent.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn user_info(&self) -> &BTreeMap<String, String> {
        &self.user_info
    }

    pub fn set_user_info(&mut self, user_info: BTreeMap<String, String>) {
        self.user_info = user_info;
    }

    pub fn push_type(&self) -> Option<PushType> {
        self.get(keys::TYPE).and_then(PushType::parse)
    }

    /// Stub payloads carry only ids; their content arrives with the receipt response.
    pub fn is_id_loaded(&self) -> bool {
        self.get(keys::ID_LOADED) == Some("true")
    }

    pub fn is_crt_enabled(&self) -> bool {
        self.get(keys::IS_CRT_ENABLED) == Some("true")
    }

    pub fn ack_id(&self) -> Option<&str> {
        self.get(keys::ACK_ID)
    }

    pub fn server_id(&self) -> Option<&str> {
        self.get(keys::SERVER_ID)
    }

    pub fn server_url(&self) -> Option<&str> {
        self.get(keys::SERVER_URL)
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.get(keys::CHANNEL_ID)
    }

    pub fn post_id(&self) -> Option<&str> {
        self.get(keys::POST_ID)
    }

    pub fn root_id(&self) -> Option<&str> {
        self.get(keys::ROOT_ID)
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.get(keys::SENDER_ID)
    }

    /// Drawer id: hash of `post_id`, else of `channel_id`, else the fixed default.
    pub fn notification_id(&self) -> i32 {
        if let Some(post_id) = self.non_empty(keys::POST_ID) {
            return platform_string_hash(post_id);
        }
        if let Some(channel_id) = self.non_empty(keys::CHANNEL_ID) {
            return platform_string_hash(channel_id);
        }
        DEFAULT_NOTIFICATION_ID
    }

    /// Threads get their own group when collapsed threads are on.
    pub fn group_key(&self) -> Option<&str> {
        if self.is_crt_enabled() {
            if let Some(root_id) = self.non_empty(keys::ROOT_ID) {
                return Some(root_id);
            }
        }
        self.channel_id()
    }

    pub fn conversation_title(&self) -> String {
        self.non_empty(keys::CHANNEL_NAME)
            .or_else(|| self.non_empty(keys::SENDER_NAME))
            .or_else(|| self.get(keys::TITLE))
            .unwrap_or_default()
            .to_string()
    }

    pub fn sender_name(&self) -> String {
        if let Some(name) = self.get(keys::SENDER_NAME) {
            return name.to_string();
        }
        if let Some(channel_name) = self.get(keys::CHANNEL_NAME) {
            if channel_name.starts_with('@') {
                return channel_name.to_string();
            }
        }
        if let Some(message) = self.get(keys::MESSAGE) {
            let name = message.split(':').next().unwrap_or(message);
            if name != message {
                return name.to_string();
            }
        }
        self.conversation_title()
    }

    /// Message text with any leading "Sender: " prefix removed.
    pub fn message_body(&self) -> String {
        let message = self
            .get(keys::MESSAGE)
            .or_else(|| self.get(keys::BODY))
            .unwrap_or_default();
        let sender = self.sender_name();
        if sender.trim().is_empty() {
            return message.to_string();
        }
        remove_sender_name(message, &sender)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PushPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Drops leading sender-name prefixes and ": " separators until neither remains.
pub fn remove_sender_name(message: &str, sender_name: &str) -> String {
    let mut rest = message.trim();
    if sender_name.is_empty() {
        return rest.to_string();
    }
    loop {
        let next = rest
            .strip_prefix(sender_name)
            .or_else(|| rest.strip_prefix(": "))
            .map(str::trim);
        match next {
            Some(stripped) if stripped.len() < rest.len() => rest = stripped,
            _ => break,
        }
    }
    rest.to_string()
}

/// 31-multiplier polynomial hash over UTF-16 code units with wrapping i32
/// arithmetic. Drawer ids on existing installs were derived with it.
pub fn platform_string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}
