//! `SessionStore`/`FileStore`: external-collaborator interfaces only. neither
//! contains the engineering that is the hard part of this system -- no SQL-backed
//! session table and no directory-listing static file server are implemented here,
//! only the traits a consumer of this crate would implement or be handed.

use beam_http::{HttpRequest, HttpResponse};

/// server-side per-client state identified by a session cookie. `S` is the
/// application's own session payload type; this trait only describes how one is
/// found, minted, or torn down, not what it contains.
#[async_trait::async_trait]
pub trait SessionStore<S>: Send + Sync {
    /// returns the session associated with `request`'s session cookie,
    /// creating one via [`create`](SessionStore::create) if absent, and
    /// setting the corresponding `Set-Cookie` on `response` when a session is
    /// newly minted.
    async fn get(&self, request: &HttpRequest, response: &mut HttpResponse) -> S;

    /// looks up a session by id without creating one; `None` if the id is
    /// unknown or has expired.
    async fn find(&self, session_id: &str) -> Option<S>;

    /// mints a fresh session with an unpredictable, cryptographically strong
    /// id that cannot collide with a concurrent `create` call.
    async fn create(&self) -> S;

    /// ends a session, releasing any resources the store holds for it. after
    /// this returns, `find` on the same id returns `None`.
    async fn end(&self, session: S);
}

/// static file server with directory listings, described as an interface for the
/// same reason as [`SessionStore`] -- an external collaborator, not core
/// engineering.
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// serves `path` (relative to the store's root) as an `HttpResponse`, or
    /// `None` if it does not exist. a directory path is expected to produce a
    /// directory-listing response rather than `None`.
    async fn serve(&self, path: &str) -> Option<HttpResponse>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// in-memory `SessionStore` used only to exercise code in this crate that
    /// consumes the trait; not a deliverable implementation.
    pub struct InMemorySessionStore {
        sessions: Mutex<HashMap<String, u64>>,
        next_id: AtomicU64,
    }

    impl InMemorySessionStore {
        pub fn new() -> Self {
            Self { sessions: Mutex::new(HashMap::new()), next_id: AtomicU64::new(1) }
        }
    }

    #[async_trait::async_trait]
    impl SessionStore<u64> for InMemorySessionStore {
        async fn get(&self, request: &HttpRequest, response: &mut HttpResponse) -> u64 {
            if let Some(cookie) = request.cookies.iter().find(|c| c.name == "session") {
                if let Some(session) = self.find(&cookie.value).await {
                    return session;
                }
            }
            let session = self.create().await;
            response.cookies.push(beam_http::Cookie::new("session", session.to_string()));
            session
        }

        async fn find(&self, session_id: &str) -> Option<u64> {
            self.sessions.lock().unwrap().get(session_id).copied()
        }

        async fn create(&self) -> u64 {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.sessions.lock().unwrap().insert(id.to_string(), id);
            id
        }

        async fn end(&self, session: u64) {
            self.sessions.lock().unwrap().remove(&session.to_string());
        }
    }

    #[tokio::test]
    async fn creates_a_session_and_finds_it_again() {
        let store = InMemorySessionStore::new();
        let session = store.create().await;
        assert_eq!(store.find(&session.to_string()).await, Some(session));
        store.end(session).await;
        assert_eq!(store.find(&session.to_string()).await, None);
    }
}
