//! connection pool keyed by `(host, port)`, holding at most one live [`Channel`] per
//! key -- generalized down from `xitca-client`'s multi-connection-per-key pool
//! (`pool/exclusive.rs`) to the single-entry-per-host shape this client specifies.

use std::collections::HashMap;
use std::sync::Mutex;

use beam_io::Channel;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PoolKey {
    pub host: String,
    pub port: u16,
}

#[derive(Default)]
pub(crate) struct ConnectionPool {
    entries: Mutex<HashMap<PoolKey, Channel>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// removes and returns the cached channel for `key`, if one exists and has not
    /// since been observed closed.
    pub fn take(&self, key: &PoolKey) -> Option<Channel> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(key) {
            Some(channel) if !channel.is_closed() => Some(channel),
            _ => None,
        }
    }

    /// caches `channel` under `key`, replacing (and dropping) whatever was cached
    /// there before.
    pub fn put(&self, key: PoolKey, channel: Channel) {
        self.entries.lock().unwrap().insert(key, channel);
    }

    pub fn evict(&self, key: &PoolKey) {
        self.entries.lock().unwrap().remove(key);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(host: &str) -> PoolKey {
        PoolKey { host: host.to_string(), port: 80 }
    }

    #[tokio::test]
    async fn put_then_take_round_trips() {
        let pool = ConnectionPool::new();
        let (a, _b) = beam_io::duplex::pair(4096);
        pool.put(key("example.com"), a);
        assert_eq!(pool.len(), 1);
        assert!(pool.take(&key("example.com")).is_some());
        assert_eq!(pool.len(), 0);
    }

    #[tokio::test]
    async fn take_skips_closed_entry() {
        let pool = ConnectionPool::new();
        let (a, _b) = beam_io::duplex::pair(4096);
        a.close().await;
        pool.put(key("example.com"), a);
        assert!(pool.take(&key("example.com")).is_none());
    }
}
