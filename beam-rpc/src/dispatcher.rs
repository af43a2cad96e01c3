//! `Dispatcher`: owns the reader-routine loop for one [`Channel`] -- decode one
//! frame at a time, look up the matching slot, invoke it; for a
//! [`ResponseMessage`] complete the pending request's [`Eval`]. One reader routine
//! runs per channel for the channel's whole lifetime; writes go through the
//! channel's serialized `Writer` instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use beam_core::{Async, Eval};
use beam_io::{Buffer, Channel, ChannelWriter};
use tracing::{debug, warn};

use crate::error::RpcError;
use crate::message::{Codec, Frame, MessageTag, Outcome, RecordMessage, RequestId, RequestMessage, ResponseMessage};
use crate::slots::SlotRegistry;

struct Pending {
    entries: Mutex<HashMap<RequestId, Eval<Vec<u8>, RpcError>>>,
}

impl Pending {
    fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    fn insert(&self, id: RequestId, eval: Eval<Vec<u8>, RpcError>) {
        self.entries.lock().unwrap().insert(id, eval);
    }

    fn take(&self, id: RequestId) -> Option<Eval<Vec<u8>, RpcError>> {
        self.entries.lock().unwrap().remove(&id)
    }

    /// breaks every still-pending request with [`RpcError::PipeBroken`] and drops
    /// its entry, as if the channel had reached end-of-file mid-request.
    fn break_all(&self) {
        let mut entries = self.entries.lock().unwrap();
        for (_, eval) in entries.drain() {
            eval.set_exception(RpcError::PipeBroken);
        }
    }
}

/// shared handle to one channel's dispatcher: lets callers send requests/records
/// and holds the reader routine alive for as long as any clone (or the spawned
/// reader task itself) is outstanding.
#[derive(Clone)]
pub struct Dispatcher<C> {
    writer: ChannelWriter,
    codec: Arc<dyn Codec>,
    pending: Arc<Pending>,
    next_id: Arc<AtomicU64>,
    slots: Arc<SlotRegistry<C>>,
    client: Arc<C>,
}

impl<C: Send + Sync + 'static> Dispatcher<C> {
    /// spawns the reader routine over `channel` and returns a handle good for
    /// sending for the channel's whole lifetime. `client` is handed to every slot
    /// invocation as the connection context.
    pub fn spawn(mut channel: Channel, codec: Arc<dyn Codec>, slots: Arc<SlotRegistry<C>>, client: Arc<C>) -> Self {
        let writer = channel.writer();
        let dispatcher = Dispatcher {
            writer: writer.clone(),
            codec: codec.clone(),
            pending: Arc::new(Pending::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            slots,
            client,
        };

        let reader_dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            reader_dispatcher.run_reader(&mut channel).await;
        });

        dispatcher
    }

    async fn run_reader(&self, channel: &mut Channel) {
        let mut buf = Buffer::new();
        let mut consumed = 0usize;
        loop {
            loop {
                let data = &buf.get_data()[consumed..];
                match self.codec.decode(data) {
                    Ok(Some((frame, len))) => {
                        consumed += len;
                        self.dispatch(frame).await;
                    }
                    Ok(None) => break,
                    Err(cause) => {
                        warn!(%cause, "service protocol codec rejected a frame, closing channel");
                        channel.close().await;
                        break;
                    }
                }
            }
            buf.consume_front(consumed);
            consumed = 0;

            match channel.read(&mut buf, 64 * 1024).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        self.pending.break_all();
        debug!("service protocol dispatcher reader stopped; pending requests broken");
    }

    async fn dispatch(&self, frame: Frame) {
        match frame {
            Frame::Record(RecordMessage { tag, payload }) => {
                if let Some(handler) = self.slots.record_slot(tag) {
                    handler.handle(&self.client, payload).await;
                } else {
                    warn!(%tag, "no record slot registered for tag");
                }
            }
            Frame::Request(RequestMessage { tag, id, payload }) => {
                let outcome = match self.slots.request_slot(tag) {
                    Some(handler) => match handler.handle(&self.client, payload).await {
                        Ok(result) => Outcome::Result(result),
                        Err(cause) => Outcome::Exception(cause.to_string()),
                    },
                    None => Outcome::Exception(format!("no request slot registered for {tag}")),
                };
                let frame = Frame::Response(ResponseMessage { tag, id, outcome });
                let _ = self.writer.write(self.codec.encode(&frame)).await;
            }
            Frame::Response(ResponseMessage { id, outcome, .. }) => {
                // a Response with no matching pending entry is ignored and logged.
                match self.pending.take(id) {
                    Some(eval) => match outcome {
                        Outcome::Result(payload) => eval.set(payload),
                        Outcome::Exception(message) => eval.set_exception(RpcError::Remote(message)),
                    },
                    None => warn!(id, "response for unknown/already-resolved request id, ignoring"),
                }
            }
        }
    }

    /// sends a [`RecordMessage`]; fire-and-forget, no reply expected.
    pub async fn send_record(&self, tag: MessageTag, payload: Vec<u8>) -> Result<(), RpcError> {
        let frame = Frame::Record(RecordMessage { tag, payload });
        self.writer.write(self.codec.encode(&frame)).await.map_err(|_| RpcError::PipeBroken)
    }

    /// sends a [`RequestMessage`] and suspends until the matching
    /// [`ResponseMessage`] arrives (or the channel closes first). allocates a
    /// fresh id from a monotonically-increasing counter.
    pub async fn send_request(&self, tag: MessageTag, payload: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let async_: Async<Vec<u8>, RpcError> = Async::new();
        self.pending.insert(id, async_.get_eval());

        let frame = Frame::Request(RequestMessage { tag, id, payload });
        if self.writer.write(self.codec.encode(&frame)).await.is_err() {
            self.pending.take(id);
            return Err(RpcError::PipeBroken);
        }

        async_.get().await
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }

    pub async fn close(&self) {
        self.writer.close().await;
        self.pending.break_all();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::BinaryCodec;
    use crate::slots::SlotRegistryBuilder;

    #[tokio::test]
    async fn request_round_trips_through_a_slot() {
        let (client_channel, server_channel) = beam_io::duplex::pair(8192);

        let server_slots = SlotRegistryBuilder::<()>::new()
            .add_request_slot(MessageTag(1), |_client: &(), payload: Vec<u8>| async move {
                Ok(payload.into_iter().map(|b| b + 1).collect())
            })
            .build();
        let _server = Dispatcher::spawn(server_channel, Arc::new(BinaryCodec), server_slots, Arc::new(()));

        let client_slots = SlotRegistryBuilder::<()>::new().build();
        let client = Dispatcher::spawn(client_channel, Arc::new(BinaryCodec), client_slots, Arc::new(()));

        let result = client.send_request(MessageTag(1), vec![1, 2, 3]).await.unwrap();
        assert_eq!(result, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn unregistered_slot_rejects_with_remote_error() {
        let (client_channel, server_channel) = beam_io::duplex::pair(8192);
        let server_slots = SlotRegistryBuilder::<()>::new().build();
        let _server = Dispatcher::spawn(server_channel, Arc::new(BinaryCodec), server_slots, Arc::new(()));

        let client_slots = SlotRegistryBuilder::<()>::new().build();
        let client = Dispatcher::spawn(client_channel, Arc::new(BinaryCodec), client_slots, Arc::new(()));

        let result = client.send_request(MessageTag(9), vec![]).await;
        assert!(matches!(result, Err(RpcError::Remote(_))));
    }

    #[tokio::test]
    async fn closing_the_channel_breaks_a_pending_request() {
        let (client_channel, server_channel) = beam_io::duplex::pair(8192);
        // no responder on the other end; drop it immediately after spawn so the
        // reader observes end-of-file.
        drop(server_channel);

        let client_slots = SlotRegistryBuilder::<()>::new().build();
        let client = Dispatcher::spawn(client_channel, Arc::new(BinaryCodec), client_slots, Arc::new(()));

        let result = client.send_request(MessageTag(1), vec![]).await;
        assert!(matches!(result, Err(RpcError::PipeBroken)));
    }
}
