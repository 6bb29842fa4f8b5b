use std::sync::{Arc, RwLock};

use crate::credentials::CredentialStore;
use crate::notification::{ActiveNotification, NotificationChannel, NotificationSpec};
use crate::payload::PushPayload;
use crate::prefs::Preferences;
use crate::servers::ServerRegistry;

pub const NOTIFICATION_RECEIVED_EVENT: &str = "notificationReceived";
pub const NOTIFICATION_OPENED_EVENT: &str = "notificationOpened";

/// Facts about the running app that only the host can answer.
pub trait HostPlatform: Send + Sync + 'static {
    fn sdk_int(&self) -> u32;
    fn app_version(&self) -> String;
    fn is_app_visible(&self) -> bool;
    /// Whether the JS runtime is up and can receive bridge events.
    fn is_js_initialized(&self) -> bool;
    fn has_icon_resource(&self, name: &str) -> bool;
}

/// The OS notification drawer. It is the source of truth for what is shown.
pub trait NotificationDrawer: Send + Sync + 'static {
    fn create_channel(&self, channel: &NotificationChannel);
    fn notify(&self, id: i32, spec: &NotificationSpec);
    fn cancel(&self, id: i32);
    fn cancel_all(&self);
    fn active_notifications(&self) -> Vec<ActiveNotification>;
}

pub trait BridgeEmitter: Send + Sync + 'static {
    fn emit(&self, event_name: &str, payload: &PushPayload);
}

/// Warms the conversation store in the background while the JS runtime is down.
pub trait ConversationPrefetcher: Send + Sync + 'static {
    fn fetch_and_store(&self, server_url: &str, payload: &PushPayload);
}

pub(crate) type SharedBridgeEmitter = Arc<RwLock<Option<Arc<dyn BridgeEmitter>>>>;

/// Host collaborators handed to [`crate::PushHandler::new`].
#[derive(Clone)]
pub struct PushHost {
    pub platform: Arc<dyn HostPlatform>,
    pub drawer: Arc<dyn NotificationDrawer>,
    pub servers: Arc<dyn ServerRegistry>,
    pub credentials: Arc<dyn CredentialStore>,
    pub preferences: Arc<dyn Preferences>,
    pub prefetcher: Option<Arc<dyn ConversationPrefetcher>>,
}
