//! CSRF token cache with coalesced refetch.
//!
//! The cached token itself lives behind a [`parking_lot::RwLock`] (cheap
//! reads for every non-safe request); the *act of refetching* is
//! serialized through a [`tokio::sync::Mutex`] held across the await
//! point, the same pattern the teacher's stdio MCP transport uses to
//! serialize a request/response cycle (`request_lock: Mutex<()>`) — here
//! it prevents two concurrent 403-triggered refetches from both hitting
//! the discovery endpoint.

use parking_lot::RwLock;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct CsrfCache {
    token: RwLock<Option<String>>,
    refetch_lock: Mutex<()>,
}

impl CsrfCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set(&self, token: String) {
        *self.token.write() = Some(token);
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }

    /// Run `fetch` to completion while holding the refetch lock, then
    /// store its result. Concurrent callers block on the lock rather than
    /// each issuing their own discovery request; the second caller to
    /// acquire the lock observes the first caller's freshly stored token
    /// and can skip calling `fetch` again by checking [`CsrfCache::get`]
    /// first.
    pub async fn refetch_with<F, Fut, E>(&self, fetch: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String, E>>,
    {
        let _guard = self.refetch_lock.lock().await;
        if let Some(existing) = self.get() {
            return Ok(existing);
        }
        let token = fetch().await?;
        self.set(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refetch_stores_fetched_token() {
        let cache = CsrfCache::new();
        let token = cache
            .refetch_with(|| async { Ok::<_, std::convert::Infallible>("tok-1".to_string()) })
            .await
            .unwrap();
        assert_eq!(token, "tok-1");
        assert_eq!(cache.get(), Some("tok-1".to_string()));
    }

    #[tokio::test]
    async fn refetch_skips_fetch_if_already_populated_concurrently() {
        let cache = CsrfCache::new();
        cache.set("already-there".into());
        let token = cache
            .refetch_with(|| async { Ok::<_, std::convert::Infallible>("should-not-be-used".to_string()) })
            .await
            .unwrap();
        assert_eq!(token, "already-there");
    }

    #[test]
    fn clear_removes_token() {
        let cache = CsrfCache::new();
        cache.set("tok".into());
        cache.clear();
        assert_eq!(cache.get(), None);
    }
}
