use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PushError;
use crate::prefs::Preferences;

pub(crate) const PUSH_NOTIFICATIONS: &str = "PUSH_NOTIFICATIONS";
pub(crate) const NOTIFICATIONS_IN_CHANNEL: &str = "notificationsInChannel";
pub(crate) const VERSION_PREFERENCE: &str = "VERSION_PREFERENCE";
pub(crate) const VERSION_KEY: &str = "Version";

/// Which drawer ids belong to which conversation, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationIndex {
    groups: BTreeMap<String, Vec<i32>>,
}

impl NotificationIndex {
    pub fn get(&self, group_key: &str) -> Option<&[i32]> {
        self.groups.get(group_key).map(Vec::as_slice)
    }

    pub fn contains(&self, group_key: &str) -> bool {
        self.groups.contains_key(group_key)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Records a new arrival at the front of its group. Returns whether this
    /// arrival opened the group and therefore needs a summary, whose id
    /// (`notification_id + 1`) is recorded in front of it.
    pub fn record_arrival(&mut self, group_key: &str, notification_id: i32) -> bool {
        let ids = self.groups.entry(group_key.to_string()).or_default();
        ids.insert(0, notification_id);
        let create_summary = ids.len() == 1;
        if create_summary {
            ids.insert(0, notification_id.wrapping_add(1));
        }
        create_summary
    }

    /// Removes the first occurrence of `notification_id`. Returns whether the
    /// group is now empty. Missing groups count as empty.
    pub fn remove_id(&mut self, group_key: &str, notification_id: i32) -> bool {
        let Some(ids) = self.groups.get_mut(group_key) else {
            return true;
        };
        if let Some(pos) = ids.iter().position(|id| *id == notification_id) {
            ids.remove(pos);
        }
        ids.is_empty()
    }

    pub fn remove_group(&mut self, group_key: &str) -> Option<Vec<i32>> {
        self.groups.remove(group_key)
    }
}

/// Persists the index in the preferences area.
#[derive(Clone)]
pub struct NotificationIndexStore {
    prefs: Arc<dyn Preferences>,
}

impl NotificationIndexStore {
    pub fn new(prefs: Arc<dyn Preferences>) -> Self {
        Self { prefs }
    }

    /// Unreadable or missing state loads as an empty index.
    pub fn load(&self) -> NotificationIndex {
        let Some(raw) = self
            .prefs
            .get_string(PUSH_NOTIFICATIONS, NOTIFICATIONS_IN_CHANNEL)
        else {
            return NotificationIndex::default();
        };
        match decode_index(&raw) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(%e, "discarding notification index");
                NotificationIndex::default()
            }
        }
    }

    pub fn save(&self, index: &NotificationIndex) -> Result<(), PushError> {
        let raw = serde_json::to_string(index)?;
        self.prefs
            .put_string(PUSH_NOTIFICATIONS, NOTIFICATIONS_IN_CHANNEL, &raw)
    }

    /// Wipes the index when the stored version tag differs from `app_version`.
    /// Returns whether a reset happened.
    pub fn reset_if_version_changed(&self, app_version: &str) -> Result<bool, PushError> {
        let stored = self.prefs.get_string(VERSION_PREFERENCE, VERSION_KEY);
        if stored.as_deref() == Some(app_version) {
            return Ok(false);
        }
        self.prefs
            .put_string(VERSION_PREFERENCE, VERSION_KEY, app_version)?;
        self.save(&NotificationIndex::default())?;
        Ok(true)
    }
}

fn decode_index(raw: &str) -> Result<NotificationIndex, PushError> {
    serde_json::from_str(raw).map_err(|e| PushError::IndexCorrupt(e.to_string()))
}
