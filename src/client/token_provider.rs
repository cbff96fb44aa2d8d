/// In-session storage for the caller's current token pair.
///
/// Pure storage: no network calls, no validation. Shared behind an `Arc` so
/// the sender and the caller observe the same pair.

use std::sync::RwLock;

use crate::auth::TokenPair;

#[derive(Default)]
pub struct TokenProvider {
    inner: RwLock<Option<TokenPair>>,
}

impl TokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<TokenPair> {
        self.inner.read().unwrap().clone()
    }

    pub fn set(&self, pair: TokenPair) {
        *self.inner.write().unwrap() = Some(pair);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(tag: &str) -> TokenPair {
        TokenPair {
            access_token: format!("access-{}", tag),
            refresh_token: format!("refresh-{}", tag),
        }
    }

    #[test]
    fn starts_empty() {
        assert!(TokenProvider::new().get().is_none());
    }

    #[test]
    fn set_then_get_returns_latest_pair() {
        let provider = TokenProvider::new();
        provider.set(pair("1"));
        provider.set(pair("2"));

        let stored = provider.get().unwrap();
        assert_eq!(stored.access_token, "access-2");
        assert_eq!(stored.refresh_token, "refresh-2");
    }

    #[test]
    fn clear_empties_storage() {
        let provider = TokenProvider::new();
        provider.set(pair("1"));
        provider.clear();

        assert!(provider.get().is_none());
    }
}
