//! `ServiceClient`: the long-lived service-client framework -- heartbeat,
//! reconnection, pending-request recovery, and subscription/service restoration.
//! Grounded on `original_source/.../ServicesTests/
//! TestServiceClientOperationQueue.hpp`'s pending-operation bookkeeping (a
//! synchronized set of in-flight results/queues that all break together on close)
//! and on `xitca-client`'s `RetryClosedConnection` middleware for the "retry a
//! transient transport failure" shape, generalized here into exponential backoff
//! across full reconnects rather than a bounded in-request retry count.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use beam_core::util::SynchronizedList;
use beam_io::Channel;
use rand::Rng;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::RpcError;
use crate::message::{Codec, MessageTag};
use crate::slots::SlotRegistry;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
type ConnectFn = Arc<dyn Fn() -> BoxFuture<'static, Result<Channel, RpcError>> + Send + Sync>;
type LoginFn<C> = Arc<dyn Fn(Dispatcher<C>) -> BoxFuture<'static, Result<Dispatcher<C>, RpcError>> + Send + Sync>;

/// exponential backoff for reconnection attempts, with jitter so a fleet of
/// clients reconnecting to the same restarted server doesn't reconnect in
/// lockstep. the jitter is this crate's own refinement on top of plain
/// exponential backoff, grounded on `ThreadPool`'s 30-60s randomized idle teardown
/// window (`original_source/.../ThreadPool.hpp`) as the corpus's existing
/// precedent for jittering a timing decision.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { initial_delay: Duration::from_millis(100), max_delay: Duration::from_secs(30), multiplier: 2.0 }
    }
}

impl ReconnectPolicy {
    fn jittered(&self, delay: Duration) -> Duration {
        let jitter: f64 = rand::thread_rng().gen_range(0.5..1.5);
        Duration::from_secs_f64((delay.as_secs_f64() * jitter).min(self.max_delay.as_secs_f64()))
    }

    fn next(&self, delay: Duration) -> Duration {
        Duration::from_secs_f64((delay.as_secs_f64() * self.multiplier).min(self.max_delay.as_secs_f64()))
    }
}

enum Session<C> {
    Disconnected,
    Connected(Dispatcher<C>),
}

/// tags reserved by the framework itself (heartbeat/register/subscribe), distinct
/// from application-level request tags a `SlotRegistry` dispatches on.
pub struct FrameworkTags {
    pub heartbeat: MessageTag,
    pub register_service: MessageTag,
    pub subscribe: MessageTag,
}

pub struct ServiceClient<C> {
    connect: ConnectFn,
    login: LoginFn<C>,
    codec: Arc<dyn Codec>,
    slots: Arc<SlotRegistry<C>>,
    client_ctx: Arc<C>,
    tags: FrameworkTags,
    policy: ReconnectPolicy,
    heartbeat_interval: Duration,
    session: StdMutex<Session<C>>,
    registered_services: SynchronizedList<(String, Vec<u8>)>,
    subscriptions: SynchronizedList<(MessageTag, Vec<u8>)>,
    ready: tokio::sync::Notify,
}

impl<C: Send + Sync + 'static> ServiceClient<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connect: ConnectFn,
        login: LoginFn<C>,
        codec: Arc<dyn Codec>,
        slots: Arc<SlotRegistry<C>>,
        client_ctx: Arc<C>,
        tags: FrameworkTags,
        policy: ReconnectPolicy,
        heartbeat_interval: Duration,
    ) -> Arc<Self> {
        let client = Arc::new(Self {
            connect,
            login,
            codec,
            slots,
            client_ctx,
            tags,
            policy,
            heartbeat_interval,
            session: StdMutex::new(Session::Disconnected),
            registered_services: SynchronizedList::new(),
            subscriptions: SynchronizedList::new(),
            ready: tokio::sync::Notify::new(),
        });
        client
    }

    /// performs the initial connection, login, and (a no-op, the first time)
    /// replay, then starts the background heartbeat/reconnect supervisor. must be
    /// called once before any `call`/`register_service`/`subscribe`.
    pub async fn connect(self: &Arc<Self>) -> Result<(), RpcError> {
        let dispatcher = self.establish().await?;
        *self.session.lock().unwrap() = Session::Connected(dispatcher);
        self.ready.notify_waiters();

        let supervisor = self.clone();
        tokio::spawn(async move {
            supervisor.supervise().await;
        });

        Ok(())
    }

    async fn establish(&self) -> Result<Dispatcher<C>, RpcError> {
        let channel = (self.connect)().await?;
        let dispatcher = Dispatcher::spawn(channel, self.codec.clone(), self.slots.clone(), self.client_ctx.clone());
        (self.login)(dispatcher).await
    }

    /// heartbeat loop: every `policy.initial_delay`-scaled tick, probes the live
    /// connection with a fire-and-forget heartbeat record; a failure to even
    /// enqueue it means the channel is already gone, and triggers reconnection.
    /// this is also how a graceful-looking but actually-dead peer (no RST, just a
    /// silently vanished middlebox) gets noticed within one heartbeat interval.
    async fn supervise(self: Arc<Self>) {
        loop {
            tokio::time::sleep(self.heartbeat_interval).await;
            let broken = {
                let session = self.session.lock().unwrap();
                match &*session {
                    Session::Connected(dispatcher) => dispatcher.is_closed(),
                    Session::Disconnected => true,
                }
            };
            if broken {
                self.reconnect_once().await;
                continue;
            }
            let dispatcher = match &*self.session.lock().unwrap() {
                Session::Connected(dispatcher) => dispatcher.clone(),
                Session::Disconnected => continue,
            };
            if dispatcher.send_record(self.tags.heartbeat, Vec::new()).await.is_err() {
                self.reconnect_once().await;
            }
        }
    }

    async fn reconnect_once(self: &Arc<Self>) {
        *self.session.lock().unwrap() = Session::Disconnected;
        let mut delay = self.policy.initial_delay;
        loop {
            match self.establish().await {
                Ok(dispatcher) => {
                    if let Err(cause) = self.replay(&dispatcher).await {
                        warn!(%cause, "replay of registered services/subscriptions failed after reconnect, retrying");
                        tokio::time::sleep(self.policy.jittered(delay)).await;
                        delay = self.policy.next(delay);
                        continue;
                    }
                    *self.session.lock().unwrap() = Session::Connected(dispatcher);
                    self.ready.notify_waiters();
                    info!("service client reconnected");
                    return;
                }
                Err(cause) => {
                    warn!(%cause, "reconnect attempt failed, backing off");
                    tokio::time::sleep(self.policy.jittered(delay)).await;
                    delay = self.policy.next(delay);
                }
            }
        }
    }

    /// replays every remembered service registration, then every remembered
    /// subscription, in the order they were originally performed: login, then
    /// register x N, then resubscribe x N, so every previously-registered service
    /// is re-registered before the client's next successful call returns.
    async fn replay(&self, dispatcher: &Dispatcher<C>) -> Result<(), RpcError> {
        for (name, properties) in self.registered_services.snapshot() {
            let payload = encode_service(&name, &properties);
            dispatcher.send_request(self.tags.register_service, payload).await?;
        }
        for (tag, payload) in self.subscriptions.snapshot() {
            dispatcher.send_request(self.tags.subscribe, encode_subscription(tag, &payload)).await?;
        }
        Ok(())
    }

    /// records `name`/`properties` so it is replayed on every future reconnect,
    /// and (if currently connected) registers it immediately.
    pub async fn register_service(&self, name: impl Into<String>, properties: Vec<u8>) -> Result<(), RpcError> {
        let name = name.into();
        self.registered_services.with(|list| {
            if let Some(entry) = list.iter_mut().find(|(existing, _)| *existing == name) {
                entry.1 = properties.clone();
            } else {
                list.push((name.clone(), properties.clone()));
            }
        });
        if let Some(dispatcher) = self.current() {
            dispatcher.send_request(self.tags.register_service, encode_service(&name, &properties)).await?;
        }
        Ok(())
    }

    /// records a subscription and (if currently connected) sends it immediately.
    /// `payload` is whatever the subscribe request needs (e.g. an account id); the
    /// framework treats it as opaque.
    pub async fn subscribe(&self, tag: MessageTag, payload: Vec<u8>) -> Result<(), RpcError> {
        self.subscriptions.with(|list| {
            if let Some(entry) = list.iter_mut().find(|(existing, _)| *existing == tag) {
                entry.1 = payload.clone();
            } else {
                list.push((tag, payload.clone()));
            }
        });
        if let Some(dispatcher) = self.current() {
            dispatcher.send_request(self.tags.subscribe, encode_subscription(tag, &payload)).await?;
        }
        Ok(())
    }

    /// sends an application request over the current connection. a request in
    /// flight when the channel drops fails with [`RpcError::PipeBroken`] rather
    /// than being silently retried -- callers that want retry-after-reconnect
    /// semantics call this again themselves.
    pub async fn call(&self, tag: MessageTag, payload: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let dispatcher = self.current().ok_or(RpcError::PipeBroken)?;
        dispatcher.send_request(tag, payload).await
    }

    /// suspends until the client has a live, logged-in, fully-replayed connection.
    pub async fn wait_ready(&self) {
        loop {
            if self.current().map(|d| !d.is_closed()).unwrap_or(false) {
                return;
            }
            self.ready.notified().await;
        }
    }

    fn current(&self) -> Option<Dispatcher<C>> {
        match &*self.session.lock().unwrap() {
            Session::Connected(dispatcher) => Some(dispatcher.clone()),
            Session::Disconnected => None,
        }
    }
}

fn encode_service(name: &str, properties: &[u8]) -> Vec<u8> {
    let mut out = (name.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(properties);
    out
}

fn encode_subscription(tag: MessageTag, payload: &[u8]) -> Vec<u8> {
    let mut out = tag.0.to_le_bytes().to_vec();
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::BinaryCodec;
    use crate::slots::SlotRegistryBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const REGISTER_TAG: MessageTag = MessageTag(1000);
    const SUBSCRIBE_TAG: MessageTag = MessageTag(1001);
    const HEARTBEAT_TAG: MessageTag = MessageTag(1002);
    const LOGIN_TAG: MessageTag = MessageTag(1003);

    fn tags() -> FrameworkTags {
        FrameworkTags { heartbeat: HEARTBEAT_TAG, register_service: REGISTER_TAG, subscribe: SUBSCRIBE_TAG }
    }

    /// builds a test server whose slots record every RegisterService/Subscribe
    /// call it receives, in arrival order, into `calls` -- so a test can assert the
    /// server observes login, then RegisterService(A), then RegisterService(B), in
    /// that order.
    fn spawn_test_server(calls: Arc<StdMutex<Vec<String>>>) -> Channel {
        let (client_side, server_side) = beam_io::duplex::pair(65536);

        let register_calls = calls.clone();
        let subscribe_calls = calls.clone();
        let login_calls = calls.clone();

        let slots = SlotRegistryBuilder::<()>::new()
            .add_request_slot(LOGIN_TAG, move |_c: &(), _p: Vec<u8>| {
                let calls = login_calls.clone();
                async move {
                    calls.lock().unwrap().push("login".into());
                    Ok(vec![])
                }
            })
            .add_request_slot(REGISTER_TAG, move |_c: &(), payload: Vec<u8>| {
                let calls = register_calls.clone();
                async move {
                    let len = u32::from_le_bytes(payload[..4].try_into().unwrap()) as usize;
                    let name = String::from_utf8(payload[4..4 + len].to_vec()).unwrap();
                    calls.lock().unwrap().push(format!("register:{name}"));
                    Ok(vec![])
                }
            })
            .add_request_slot(SUBSCRIBE_TAG, move |_c: &(), payload: Vec<u8>| {
                let calls = subscribe_calls.clone();
                async move {
                    let tag = u32::from_le_bytes(payload[..4].try_into().unwrap());
                    calls.lock().unwrap().push(format!("subscribe:{tag}"));
                    Ok(vec![])
                }
            })
            .add_record_slot(HEARTBEAT_TAG, |_c: &(), _p: Vec<u8>| async move {})
            .build();

        let _server = Dispatcher::spawn(server_side, Arc::new(BinaryCodec), slots, Arc::new(()));
        client_side
    }

    #[tokio::test]
    async fn registers_services_in_order_before_becoming_ready() {
        let calls: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let calls_for_connect = calls.clone();

        let channel = Arc::new(tokio::sync::Mutex::new(Some(spawn_test_server(calls.clone()))));
        let connect: ConnectFn = Arc::new(move || {
            let channel = channel.clone();
            Box::pin(async move { Ok(channel.lock().await.take().expect("connect only called once in this test")) })
        });

        let login: LoginFn<()> = Arc::new(|dispatcher: Dispatcher<()>| {
            Box::pin(async move {
                dispatcher.send_request(LOGIN_TAG, vec![]).await?;
                Ok(dispatcher)
            })
        });

        let slots = SlotRegistryBuilder::<()>::new().build();
        let client = ServiceClient::new(
            connect,
            login,
            Arc::new(BinaryCodec),
            slots,
            Arc::new(()),
            tags(),
            ReconnectPolicy::default(),
            Duration::from_secs(30),
        );

        client.connect().await.unwrap();
        client.register_service("A", vec![]).await.unwrap();
        client.register_service("B", vec![]).await.unwrap();
        client.subscribe(MessageTag(42), vec![]).await.unwrap();

        let seen = calls_for_connect.lock().unwrap().clone();
        assert_eq!(seen, vec!["login", "register:A", "register:B", "subscribe:42"]);
    }

    #[tokio::test]
    async fn replays_registrations_after_manual_reconnect() {
        let calls: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let attempt = Arc::new(AtomicUsize::new(0));
        let attempt_for_connect = attempt.clone();
        let calls_for_connect = calls.clone();

        let connect: ConnectFn = Arc::new(move || {
            let attempt = attempt_for_connect.clone();
            let calls = calls_for_connect.clone();
            Box::pin(async move {
                attempt.fetch_add(1, Ordering::SeqCst);
                Ok(spawn_test_server(calls))
            })
        });

        let login: LoginFn<()> = Arc::new(|dispatcher: Dispatcher<()>| {
            Box::pin(async move {
                dispatcher.send_request(LOGIN_TAG, vec![]).await?;
                Ok(dispatcher)
            })
        });

        let slots = SlotRegistryBuilder::<()>::new().build();
        let client = ServiceClient::new(
            connect,
            login,
            Arc::new(BinaryCodec),
            slots,
            Arc::new(()),
            tags(),
            ReconnectPolicy::default(),
            Duration::from_secs(30),
        );

        client.connect().await.unwrap();
        client.register_service("A", vec![]).await.unwrap();
        client.register_service("B", vec![]).await.unwrap();

        // force a reconnect: drop the current session and reconnect from scratch,
        // simulating the supervisor observing a closed channel.
        client.reconnect_once().await;

        assert_eq!(attempt.load(Ordering::SeqCst), 2);
        let seen = calls.lock().unwrap().clone();
        // first connection's login, then the reconnect's login + replay, in order.
        assert_eq!(seen, vec!["login", "login", "register:A", "register:B"]);
    }
}
