//! per-server slot registry: one handler per [`MessageTag`], for each of the request
//! and record message kinds -- for each protocol channel type, a slot registry maps
//! request-message tag to handler and record-message tag to handler. Registries are
//! append-only once a server starts dispatching -- enforced here by consuming the
//! `SlotRegistryBuilder` into an immutable `Arc<SlotRegistry<C>>`, generalizing
//! `xitca-service`'s `Service` trait down to the narrower "one async fn per tag"
//! surface the protocol actually needs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RpcError;
use crate::message::MessageTag;

/// invoked for a [`RequestMessage`](crate::message::RequestMessage) whose tag
/// matches this slot. `client` is the connection the request arrived on; the
/// returned payload becomes the `Ok` side of the [`ResponseMessage`]'s outcome, an
/// `Err` becomes the remote exception text.
#[async_trait::async_trait]
pub trait RequestHandler<C>: Send + Sync {
    async fn handle(&self, client: &C, payload: Vec<u8>) -> Result<Vec<u8>, RpcError>;
}

#[async_trait::async_trait]
impl<C, F, Fut> RequestHandler<C> for F
where
    C: Send + Sync,
    F: Fn(&C, Vec<u8>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Vec<u8>, RpcError>> + Send,
{
    async fn handle(&self, client: &C, payload: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        self(client, payload).await
    }
}

/// invoked for a [`RecordMessage`](crate::message::RecordMessage); no response is
/// expected or possible, so failures can only be logged.
#[async_trait::async_trait]
pub trait RecordHandler<C>: Send + Sync {
    async fn handle(&self, client: &C, payload: Vec<u8>);
}

#[async_trait::async_trait]
impl<C, F, Fut> RecordHandler<C> for F
where
    C: Send + Sync,
    F: Fn(&C, Vec<u8>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ()> + Send,
{
    async fn handle(&self, client: &C, payload: Vec<u8>) {
        self(client, payload).await
    }
}

/// mutable collection of slots; consumed into an immutable [`SlotRegistry`] once the
/// owning server is constructed -- append-only after that point.
#[derive(Default)]
pub struct SlotRegistryBuilder<C> {
    requests: HashMap<MessageTag, Box<dyn RequestHandler<C>>>,
    records: HashMap<MessageTag, Box<dyn RecordHandler<C>>>,
}

impl<C> SlotRegistryBuilder<C> {
    pub fn new() -> Self {
        Self { requests: HashMap::new(), records: HashMap::new() }
    }

    pub fn add_request_slot(mut self, tag: MessageTag, handler: impl RequestHandler<C> + 'static) -> Self {
        self.requests.insert(tag, Box::new(handler));
        self
    }

    pub fn add_record_slot(mut self, tag: MessageTag, handler: impl RecordHandler<C> + 'static) -> Self {
        self.records.insert(tag, Box::new(handler));
        self
    }

    pub fn build(self) -> Arc<SlotRegistry<C>> {
        Arc::new(SlotRegistry { requests: self.requests, records: self.records })
    }
}

/// immutable once built; looked up by tag on every incoming [`Frame`](crate::message::Frame).
pub struct SlotRegistry<C> {
    requests: HashMap<MessageTag, Box<dyn RequestHandler<C>>>,
    records: HashMap<MessageTag, Box<dyn RecordHandler<C>>>,
}

impl<C> SlotRegistry<C> {
    pub fn request_slot(&self, tag: MessageTag) -> Option<&dyn RequestHandler<C>> {
        self.requests.get(&tag).map(|h| h.as_ref())
    }

    pub fn record_slot(&self, tag: MessageTag) -> Option<&dyn RecordHandler<C>> {
        self.records.get(&tag).map(|h| h.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn dispatches_to_the_slot_matching_the_tag() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = seen.clone();
        let registry = SlotRegistryBuilder::<()>::new()
            .add_request_slot(MessageTag(1), move |_client: &(), payload: Vec<u8>| {
                let seen = seen2.clone();
                async move {
                    seen.store(payload[0] as u32, Ordering::SeqCst);
                    Ok(vec![])
                }
            })
            .build();

        let slot = registry.request_slot(MessageTag(1)).expect("slot registered");
        slot.handle(&(), vec![9]).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 9);
        assert!(registry.request_slot(MessageTag(2)).is_none());
    }
}
