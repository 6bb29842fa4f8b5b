use crate::actions::PushAction;
use crate::error::PushError;
use crate::payload::PushPayload;

#[derive(Debug)]
pub enum CoreMsg {
    Action(PushAction),
    Internal(Box<InternalEvent>),
}

#[derive(Debug)]
pub enum InternalEvent {
    // Async results
    ReceiptFinished {
        delivery_id: u64,
        result: Result<PushPayload, PushError>,
    },
    ReplyFinished {
        notification_id: i32,
        payload: PushPayload,
        reply_text: String,
        result: Result<(), PushError>,
    },

    // Acknowledged once every message queued before it has been handled.
    Barrier {
        ack: flume::Sender<()>,
    },
}
