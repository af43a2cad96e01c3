//! per-host cookie jar accumulated from `Set-Cookie:` response headers and merged
//! into outgoing requests for the same host.

use std::collections::HashMap;
use std::sync::Mutex;

use beam_http::Cookie;

#[derive(Default)]
pub(crate) struct CookieJar {
    by_host: Mutex<HashMap<String, HashMap<String, Cookie>>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, host: &str, cookies: &[Cookie]) {
        if cookies.is_empty() {
            return;
        }
        let mut by_host = self.by_host.lock().unwrap();
        let jar = by_host.entry(host.to_string()).or_default();
        for cookie in cookies {
            jar.insert(cookie.name.clone(), cookie.clone());
        }
    }

    /// merges this host's jar into `request_cookies`, deduped by name with the jar
    /// entry winning over a request-supplied cookie of the same name -- avoids ever
    /// emitting two `Cookie:` pairs with the same name on the wire.
    pub fn merge_into(&self, host: &str, request_cookies: Vec<Cookie>) -> Vec<Cookie> {
        let by_host = self.by_host.lock().unwrap();
        let Some(jar) = by_host.get(host) else {
            return request_cookies;
        };

        let mut merged: HashMap<String, Cookie> =
            request_cookies.into_iter().map(|cookie| (cookie.name.clone(), cookie)).collect();
        for (name, cookie) in jar {
            merged.insert(name.clone(), cookie.clone());
        }
        merged.into_values().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn jar_entry_wins_over_request_cookie_of_same_name() {
        let jar = CookieJar::new();
        jar.store("example.com", &[Cookie::new("session", "from-server")]);

        let merged = jar.merge_into("example.com", vec![Cookie::new("session", "from-request")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].value, "from-server");
    }

    #[test]
    fn unrelated_cookies_are_preserved() {
        let jar = CookieJar::new();
        jar.store("example.com", &[Cookie::new("a", "1")]);

        let merged = jar.merge_into("example.com", vec![Cookie::new("b", "2")]);
        let mut names: Vec<_> = merged.iter().map(|c| c.name.as_str()).collect();
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn no_jar_entries_returns_request_cookies_unchanged() {
        let jar = CookieJar::new();
        let merged = jar.merge_into("example.com", vec![Cookie::new("a", "1")]);
        assert_eq!(merged, vec![Cookie::new("a", "1")]);
    }
}
