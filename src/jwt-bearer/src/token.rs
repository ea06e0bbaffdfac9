// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Types and functions to work with access tokens.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// An access token returned by the token endpoint.
///
/// Tokens are replaced wholesale on every refresh, never updated in place.
/// They serialize to the same JSON shape the token endpoint returns, so
/// applications can persist a token and seed a new client with it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The actual token string.
    ///
    /// This is the value used in the `Authorization:` header.
    pub access_token: String,

    /// The type of the token, typically `"Bearer"`.
    pub token_type: String,

    /// The base address for API calls authorized by this token.
    pub instance_url: String,

    /// When the token expires, in seconds since the Unix epoch.
    ///
    /// A token deserialized without this field gets `0`, and is therefore
    /// always expired.
    #[serde(default)]
    pub expires_at: i64,

    /// Any other fields returned by the token endpoint, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    /// Returns `true` if the token must not be used at `now`.
    ///
    /// `now` is in seconds since the Unix epoch. The token is expired once
    /// `now + leeway` reaches `expires_at`.
    pub fn is_expired(&self, now: i64, leeway: Duration) -> bool {
        is_expired(Some(self), now, leeway)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[censored]")
            .field("token_type", &self.token_type)
            .field("instance_url", &self.instance_url)
            .field("expires_at", &self.expires_at)
            .field("extra", &self.extra)
            .finish()
    }
}

// An absent token is always expired.
pub(crate) fn is_expired(token: Option<&Token>, now: i64, leeway: Duration) -> bool {
    let leeway = i64::try_from(leeway.as_secs()).unwrap_or(i64::MAX);
    match token {
        None => true,
        Some(t) => now.saturating_add(leeway) >= t.expires_at,
    }
}

/// The current time, in seconds since the Unix epoch.
pub(crate) fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[async_trait::async_trait]
pub(crate) trait TokenProvider: std::fmt::Debug + Send + Sync {
    async fn token(&self) -> Result<Token>;
}

/// Holds the current token of a single client.
#[derive(Clone, Debug)]
pub(crate) struct TokenStore {
    token: Arc<RwLock<Option<Token>>>,
    leeway: Duration,
}

impl TokenStore {
    pub(crate) fn new(initial: Option<Token>, leeway: Duration) -> Self {
        Self {
            token: Arc::new(RwLock::new(initial)),
            leeway,
        }
    }

    /// Replaces the held token. The previous token is discarded.
    pub(crate) async fn set(&self, token: Token) {
        *self.token.write().await = Some(token);
    }

    pub(crate) async fn get(&self) -> Option<Token> {
        self.token.read().await.clone()
    }

    pub(crate) async fn is_expired(&self, now: i64) -> bool {
        is_expired(self.token.read().await.as_ref(), now, self.leeway)
    }

    /// Returns the held token, if it is usable at `now`.
    pub(crate) async fn valid(&self, now: i64) -> Option<Token> {
        let guard = self.token.read().await;
        match guard.as_ref() {
            Some(t) if !is_expired(Some(t), now, self.leeway) => Some(t.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    // Used by tests in other modules.
    mockall::mock! {
        #[derive(Debug)]
        pub TokenProvider { }

        #[async_trait::async_trait]
        impl TokenProvider for TokenProvider {
            async fn token(&self) -> Result<Token>;
        }
    }

    pub(crate) fn test_token(access_token: &str, expires_at: i64) -> Token {
        Token {
            access_token: access_token.to_string(),
            token_type: "Bearer".to_string(),
            instance_url: "https://test-only.example.com".to_string(),
            expires_at,
            extra: Map::new(),
        }
    }

    #[test]
    fn debug() {
        let token = Token {
            access_token: "token-test-only".into(),
            token_type: "token-type-test-only".into(),
            instance_url: "https://instance-test-only".into(),
            expires_at: 1_700_000_000,
            extra: Map::from_iter([("id".to_string(), json!("test-id"))]),
        };
        let got = format!("{token:?}");
        assert!(!got.contains("token-test-only\""), "{got}");
        assert!(got.contains("access_token: \"[censored]\""), "{got}");
        assert!(got.contains("token_type: \"token-type-test-only"), "{got}");
        assert!(got.contains("https://instance-test-only"), "{got}");
        assert!(got.contains("1700000000"), "{got}");
        assert!(got.contains("test-id"), "{got}");
    }

    #[test_case(100, 0, 100, true; "now at expiry")]
    #[test_case(99, 0, 100, false; "one second before expiry")]
    #[test_case(95, 5, 100, true; "leeway reaches expiry")]
    #[test_case(94, 5, 100, false; "leeway short of expiry")]
    #[test_case(200, 5, 100, true; "long expired")]
    #[test_case(0, 300, 1_000, false; "fresh token")]
    #[test_case(i64::MAX, 5, 100, true; "saturating")]
    fn expiry(now: i64, leeway: u64, expires_at: i64, want: bool) {
        let token = test_token("t", expires_at);
        let leeway = Duration::from_secs(leeway);
        assert_eq!(token.is_expired(now, leeway), want);
        assert_eq!(is_expired(Some(&token), now, leeway), want);
    }

    #[test_case(0)]
    #[test_case(i64::MIN)]
    #[test_case(i64::MAX)]
    fn absent_is_expired(now: i64) {
        assert!(is_expired(None, now, Duration::ZERO));
    }

    #[test]
    fn serde_preserves_extra_fields() -> anyhow::Result<()> {
        let input = json!({
            "access_token": "abc",
            "token_type": "Bearer",
            "instance_url": "https://x",
            "expires_at": 1234,
            "id": "https://login.example.com/id/00D/005",
            "issued_at": "1700000000000",
            "signature": {"nested": [1, 2, 3]},
        });
        let token = serde_json::from_value::<Token>(input.clone())?;
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_at, 1234);
        assert_eq!(token.extra.len(), 3, "{token:?}");
        assert_eq!(token.extra["signature"], json!({"nested": [1, 2, 3]}));
        assert_eq!(serde_json::to_value(&token)?, input);
        Ok(())
    }

    #[test]
    fn serde_missing_expires_at_is_expired() -> anyhow::Result<()> {
        let token = serde_json::from_value::<Token>(json!({
            "access_token": "abc",
            "token_type": "Bearer",
            "instance_url": "https://x",
        }))?;
        assert_eq!(token.expires_at, 0);
        assert!(token.is_expired(now_unix(), Duration::ZERO));
        Ok(())
    }

    #[tokio::test]
    async fn store_starts_empty() {
        let store = TokenStore::new(None, Duration::from_secs(5));
        assert!(store.get().await.is_none());
        assert!(store.is_expired(now_unix()).await);
        assert!(store.valid(now_unix()).await.is_none());
    }

    #[tokio::test]
    async fn store_set_replaces_wholesale() {
        let store = TokenStore::new(None, Duration::from_secs(5));
        let mut first = test_token("first", 1_000);
        first.extra.insert("only-in-first".to_string(), json!(true));
        store.set(first).await;

        let second = test_token("second", 2_000);
        store.set(second.clone()).await;
        assert_eq!(store.get().await, Some(second));
    }

    #[tokio::test]
    async fn store_valid_honors_leeway() {
        let store = TokenStore::new(Some(test_token("t", 1_000)), Duration::from_secs(5));
        assert!(store.valid(994).await.is_some());
        assert!(!store.is_expired(994).await);
        assert!(store.valid(995).await.is_none());
        assert!(store.is_expired(995).await);
        // The token is still held, just not usable.
        assert!(store.get().await.is_some());
    }
}
