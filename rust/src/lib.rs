mod actions;
mod core;
mod credentials;
mod error;
mod logging;
mod notification;
mod payload;
mod platform;
mod prefs;
mod servers;
mod updates;

use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use flume::Sender;

use crate::platform::SharedBridgeEmitter;
use crate::updates::{CoreMsg, InternalEvent};

pub use crate::core::{
    circle_mask, get_token, post_reply, resolve_server_url, AvatarFetcher, AvatarSource,
    NoAvatars, NotificationBuilder, NotificationIndex, NotificationIndexStore, ReceiptDelivery,
    ReceiptRequest, ReplyRequest, REPLY_FAILED_MESSAGE,
};
pub use actions::PushAction;
pub use credentials::*;
pub use error::*;
pub use notification::*;
pub use payload::*;
pub use platform::*;
pub use prefs::*;
pub use servers::*;

/// Process-wide entry point for push events.
///
/// Every call is queued to a single actor thread, so index updates and drawer
/// posts for one notification finish before a later open or dismiss of it is
/// looked at. Calls never block the caller.
pub struct PushHandler {
    core_tx: Sender<CoreMsg>,
    bridge_emitter: SharedBridgeEmitter,
}

impl PushHandler {
    pub fn new(data_dir: String, host: PushHost) -> anyhow::Result<Arc<Self>> {
        logging::init_logging(&data_dir);
        tracing::info!(data_dir = %data_dir, "PushHandler::new() starting");

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("create push data dir {data_dir}"))?;

        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let bridge_emitter: SharedBridgeEmitter = Arc::new(RwLock::new(None));

        // Actor loop thread (single threaded "push actor").
        let core_tx_for_core = core_tx.clone();
        let bridge_for_core = bridge_emitter.clone();
        thread::Builder::new()
            .name("push-core".into())
            .spawn(move || {
                let mut core =
                    crate::core::PushCore::new(core_tx_for_core, data_dir, host, bridge_for_core);
                while let Ok(msg) = core_rx.recv() {
                    core.handle_message(msg);
                }
            })
            .context("spawn push core thread")?;

        Ok(Arc::new(Self {
            core_tx,
            bridge_emitter,
        }))
    }

    pub fn dispatch(&self, action: PushAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn on_received(&self, payload: PushPayload) {
        self.dispatch(PushAction::Received { payload });
    }

    pub fn on_opened(&self, payload: PushPayload) {
        self.dispatch(PushAction::Opened { payload });
    }

    pub fn on_dismiss(&self, notification_id: i32, payload: PushPayload) {
        self.dispatch(PushAction::Dismissed {
            notification_id,
            payload,
        });
    }

    pub fn on_reply(&self, notification_id: i32, reply_text: Option<String>, payload: PushPayload) {
        self.dispatch(PushAction::Reply {
            notification_id,
            reply_text,
            payload,
        });
    }

    pub fn clear_channel(&self, channel_id: impl Into<String>) {
        self.dispatch(PushAction::ClearChannel {
            channel_id: channel_id.into(),
        });
    }

    pub fn clear_all(&self) {
        self.dispatch(PushAction::ClearAll);
    }

    pub fn set_bridge_emitter(&self, emitter: Box<dyn BridgeEmitter>) {
        let emitter: Arc<dyn BridgeEmitter> = Arc::from(emitter);
        match self.bridge_emitter.write() {
            Ok(mut slot) => {
                *slot = Some(emitter);
            }
            Err(poison) => {
                *poison.into_inner() = Some(emitter);
            }
        }
    }
}

impl PushHandler {
    /// Blocks until the actor has handled everything queued so far. Spawned
    /// network work (receipts, replies) may still be in flight.
    pub fn wait_idle_for_tests(&self, timeout: Duration) -> bool {
        let (ack, done) = flume::bounded(1);
        if self
            .core_tx
            .send(CoreMsg::Internal(Box::new(InternalEvent::Barrier { ack })))
            .is_err()
        {
            return false;
        }
        done.recv_timeout(timeout).is_ok()
    }
}
