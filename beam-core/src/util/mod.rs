//! the utility layer: small building blocks reused across `beam-core`, `beam-http`
//! and `beam-rpc` -- a bounded object pool, synchronized collection wrappers built on
//! the same `with(f)` idiom as [`crate::sync::Sync`], a lazy-singleton helper, a
//! generic tagged-enum dispatch table, and a "report and continue" exception logger.

pub mod report_exception;
pub mod resource_pool;
pub mod singleton;
pub mod synchronized;
pub mod tag;

pub use report_exception::report_exception;
pub use resource_pool::{PooledRef, ResourcePool};
pub use singleton::Singleton;
pub use synchronized::{SynchronizedList, SynchronizedMap, SynchronizedSet};
pub use tag::TagTable;
