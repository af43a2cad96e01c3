//! service protocol (record/request/response framing and dispatch over a
//! [`beam_io::Channel`]) and the long-lived `ServiceClient` framework built on
//! top of it: heartbeat, reconnection, and replay of registered services and
//! subscriptions after a disconnect. grounded on `xitca-service`'s combinator
//! style for the handler traits and on `xitca-client`'s reconnect middleware
//! for the supervisor loop.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod session;
pub mod slots;

pub use client::{FrameworkTags, ReconnectPolicy, ServiceClient};
pub use dispatcher::Dispatcher;
pub use error::RpcError;
pub use message::{BinaryCodec, Codec, Frame, MessageTag, Outcome, RecordMessage, RequestId, RequestMessage, ResponseMessage};
pub use session::{FileStore, SessionStore};
pub use slots::{RecordHandler, RequestHandler, SlotRegistry, SlotRegistryBuilder};

#[cfg(feature = "json")]
pub use message::JsonCodec;
