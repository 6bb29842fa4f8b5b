mod avatar;
mod builder;
mod config;
mod dispatch;
mod index;
mod receipt;
mod reply;
mod resolver;

use std::collections::HashMap;

use flume::Sender;

use crate::actions::PushAction;
use crate::notification::{default_channels, SDK_CHANNELS};
use crate::payload::PushPayload;
use crate::platform::{PushHost, SharedBridgeEmitter};
use crate::updates::{CoreMsg, InternalEvent};

pub use avatar::{circle_mask, AvatarFetcher, AvatarSource, NoAvatars};
pub use builder::NotificationBuilder;
pub use index::{NotificationIndex, NotificationIndexStore};
pub use receipt::{ReceiptDelivery, ReceiptRequest};
pub use reply::{post_reply, ReplyRequest, REPLY_FAILED_MESSAGE};
pub use resolver::{get_token, resolve_server_url};

pub struct PushCore {
    host: PushHost,
    runtime: tokio::runtime::Runtime,
    core_sender: Sender<CoreMsg>,
    bridge_emitter: SharedBridgeEmitter,

    http: reqwest::Client,
    index_store: NotificationIndexStore,
    avatars: AvatarFetcher,
    receipts: ReceiptDelivery,

    next_delivery_id: u64,
    // Stub payloads by receipt delivery id, waiting to be sent over the bridge.
    pending_stubs: HashMap<u64, PushPayload>,
}

impl PushCore {
    pub fn new(
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        host: PushHost,
        bridge_emitter: SharedBridgeEmitter,
    ) -> Self {
        let config = config::load_push_config(&data_dir);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .enable_io()
            .build()
            .expect("tokio runtime");

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "http client config rejected, using defaults");
                reqwest::Client::new()
            });

        let network_enabled = config.network_enabled();
        let avatars = AvatarFetcher::new(
            http.clone(),
            host.credentials.clone(),
            runtime.handle().clone(),
            network_enabled,
        );
        let receipts =
            ReceiptDelivery::new(http.clone(), config.receipt_backoff_unit(), network_enabled);
        let index_store = NotificationIndexStore::new(host.preferences.clone());

        let this = Self {
            host,
            runtime,
            core_sender,
            bridge_emitter,
            http,
            index_store,
            avatars,
            receipts,
            next_delivery_id: 0,
            pending_stubs: HashMap::new(),
        };
        this.reset_index_on_version_change();
        this.register_channels();
        this
    }

    fn reset_index_on_version_change(&self) {
        let version = self.host.platform.app_version();
        match self.index_store.reset_if_version_changed(&version) {
            Ok(true) => tracing::info!(%version, "app version changed, notification index reset"),
            Ok(false) => {}
            Err(e) => tracing::warn!(%e, "failed to check notification index version"),
        }
    }

    fn register_channels(&self) {
        if self.host.platform.sdk_int() < SDK_CHANNELS {
            return;
        }
        for channel in default_channels() {
            self.host.drawer.create_channel(&channel);
        }
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                // Never log `?action` directly: payloads carry message text.
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::ReceiptFinished {
                delivery_id,
                result,
            } => self.handle_receipt_finished(delivery_id, result),
            InternalEvent::ReplyFinished {
                notification_id,
                payload,
                reply_text,
                result,
            } => self.handle_reply_finished(notification_id, payload, reply_text, result),
            InternalEvent::Barrier { ack } => {
                let _ = ack.send(());
            }
        }
    }

    fn handle_action(&mut self, action: PushAction) {
        match action {
            PushAction::Received { payload } => self.on_received(payload),
            PushAction::Opened { payload } => self.on_opened(payload),
            PushAction::Dismissed {
                notification_id,
                payload,
            } => self.on_dismiss(notification_id, payload),
            PushAction::Reply {
                notification_id,
                reply_text,
                payload,
            } => self.on_reply(notification_id, reply_text, payload),
            PushAction::ClearChannel { channel_id } => self.clear_channel(&channel_id),
            PushAction::ClearAll => self.clear_all(),
        }
    }

    fn builder(&self) -> NotificationBuilder<'_> {
        NotificationBuilder::new(self.host.platform.as_ref(), &self.avatars)
    }

    fn emit_bridge(&self, event_name: &str, payload: &PushPayload) {
        if !self.host.platform.is_js_initialized() {
            return;
        }
        let emitter = match self.bridge_emitter.read() {
            Ok(slot) => slot.clone(),
            Err(poison) => poison.into_inner().clone(),
        };
        if let Some(emitter) = emitter {
            emitter.emit(event_name, payload);
        }
    }
}
