use crate::error::PushError;
use crate::payload::{keys, PushPayload, PushType};
use crate::platform::{NOTIFICATION_OPENED_EVENT, NOTIFICATION_RECEIVED_EVENT};
use crate::updates::{CoreMsg, InternalEvent};

use super::index::NotificationIndex;
use super::receipt::ReceiptRequest;
use super::PushCore;

impl PushCore {
    pub(super) fn on_received(&mut self, mut payload: PushPayload) {
        let Some(push_type) = payload.push_type() else {
            tracing::warn!(push_type = ?payload.get(keys::TYPE), "ignoring push with unknown type");
            return;
        };
        let notification_id = payload.notification_id();
        let server_url = self
            .resolve_server_url(&mut payload)
            .or_else(|| payload.server_url().map(str::to_string));
        let is_stub = payload.is_id_loaded();

        let delivery_id = match (payload.ack_id(), server_url.as_deref()) {
            (Some(ack_id), Some(server_url)) => {
                let request = ReceiptRequest {
                    ack_id: ack_id.to_string(),
                    server_url: server_url.to_string(),
                    post_id: payload.post_id().map(str::to_string),
                    push_type: push_type.as_str().to_string(),
                    id_loaded: is_stub,
                };
                Some(self.spawn_receipt(request))
            }
            _ => None,
        };

        match push_type {
            PushType::Message | PushType::Session => {
                if !self.host.platform.is_app_visible() {
                    let mut create_summary = false;
                    if push_type == PushType::Message {
                        if let Some(channel_id) = payload.channel_id().map(str::to_string) {
                            if let Some(server_url) = server_url.as_deref() {
                                self.prefetch_conversation(server_url, &payload);
                            }
                            create_summary = self.record_arrival(&channel_id, notification_id);
                        }
                    }
                    self.post_notification(&payload, notification_id, create_summary);
                }
            }
            PushType::Clear => {
                if let Some(channel_id) = payload.channel_id().map(str::to_string) {
                    self.clear_channel(&channel_id);
                }
            }
        }

        // A stub's bridge event carries the fetched payload, so it waits on the receipt.
        match delivery_id {
            Some(delivery_id) if is_stub => {
                self.pending_stubs.insert(delivery_id, payload);
            }
            _ => self.emit_bridge(NOTIFICATION_RECEIVED_EVENT, &payload),
        }
    }

    fn record_arrival(&self, channel_id: &str, notification_id: i32) -> bool {
        let mut index = self.index_store.load();
        let create_summary = index.record_arrival(channel_id, notification_id);
        self.save_index(&index);
        create_summary
    }

    fn prefetch_conversation(&self, server_url: &str, payload: &PushPayload) {
        if self.host.platform.is_js_initialized() {
            return;
        }
        let Some(prefetcher) = self.host.prefetcher.clone() else {
            return;
        };
        let server_url = server_url.to_string();
        let payload = payload.clone();
        // Host fetches may block on I/O; keep them off the actor thread.
        self.runtime.spawn_blocking(move || {
            prefetcher.fetch_and_store(&server_url, &payload);
        });
    }

    fn spawn_receipt(&mut self, request: ReceiptRequest) -> u64 {
        self.next_delivery_id += 1;
        let delivery_id = self.next_delivery_id;
        let token = self.token_for(&request.server_url);
        let receipts = self.receipts.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = receipts.send(&request, token.as_deref()).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::ReceiptFinished {
                delivery_id,
                result,
            })));
        });
        delivery_id
    }

    pub(super) fn handle_receipt_finished(
        &mut self,
        delivery_id: u64,
        result: Result<PushPayload, PushError>,
    ) {
        match &result {
            Ok(_) => tracing::debug!(delivery_id, "receipt delivered"),
            Err(e) => tracing::warn!(%e, delivery_id, "receipt delivery failed"),
        }
        let Some(mut payload) = self.pending_stubs.remove(&delivery_id) else {
            return;
        };
        if let Ok(mut expanded) = result {
            if let Some(server_url) = payload.server_url() {
                expanded.insert(keys::SERVER_URL, server_url);
            }
            payload = expanded;
        }
        self.emit_bridge(NOTIFICATION_RECEIVED_EVENT, &payload);
    }

    /// Posts the summary first, then the primary entry.
    fn post_notification(&self, payload: &PushPayload, notification_id: i32, create_summary: bool) {
        let builder = self.builder();
        if create_summary {
            let summary = builder.build(payload, notification_id, true);
            self.host
                .drawer
                .notify(notification_id.wrapping_add(1), &summary);
        }
        let primary = builder.build(payload, notification_id, false);
        self.host.drawer.notify(notification_id, &primary);
    }

    pub(super) fn on_opened(&mut self, payload: PushPayload) {
        if let Some(channel_id) = payload.channel_id() {
            let mut index = self.index_store.load();
            index.remove_id(channel_id, payload.notification_id());
            self.save_index(&index);
            self.clear_channel(channel_id);
        }
        self.emit_bridge(NOTIFICATION_OPENED_EVENT, &payload);
    }

    pub(super) fn on_dismiss(&mut self, notification_id: i32, payload: PushPayload) {
        self.host.drawer.cancel(notification_id);
        let Some(channel_id) = payload.channel_id() else {
            return;
        };
        let mut index = self.index_store.load();
        if !index.contains(channel_id) {
            return;
        }
        let now_empty = index.remove_id(channel_id, notification_id);
        let still_shown = self
            .host
            .drawer
            .active_notifications()
            .iter()
            .any(|n| n.channel_id() == Some(channel_id));
        if now_empty || !still_shown {
            index.remove_group(channel_id);
        }
        self.save_index(&index);
    }

    pub(super) fn clear_channel(&mut self, channel_id: &str) {
        let mut index = self.index_store.load();
        let Some(ids) = index.remove_group(channel_id) else {
            return;
        };
        self.save_index(&index);
        for id in ids {
            self.host.drawer.cancel(id);
        }
    }

    pub(super) fn clear_all(&mut self) {
        self.save_index(&NotificationIndex::default());
        self.host.drawer.cancel_all();
    }

    fn save_index(&self, index: &NotificationIndex) {
        if let Err(e) = self.index_store.save(index) {
            tracing::warn!(%e, "failed to persist notification index");
        }
    }
}
