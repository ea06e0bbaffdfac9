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

//! Single-flight token refresh.
//!
//! At most one token fetch is in flight per client. Callers that decide to
//! refresh while a fetch is running wait for it, and all of them receive its
//! outcome, whether a token or an error.
//!
//! The sequence is: observe the token as expired (remembering the current
//! round), acquire the client's refresh lock, then re-check. If a round
//! completed while the caller waited, its outcome is shared. If the token is
//! no longer expired, it is returned as is. Only otherwise does the caller
//! fetch, while holding the lock.

use crate::Result;
use crate::token::{Token, TokenProvider, TokenStore, now_unix};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// The result of a call to [RefreshCoordinator::refresh].
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Refreshed {
    pub token: Token,
    /// `true` if this caller performed the fetch.
    pub fetched: bool,
}

#[derive(Debug)]
pub(crate) struct RefreshCoordinator<T>
where
    T: TokenProvider,
{
    store: TokenStore,
    provider: T,
    // Held while a fetch is in flight. Carries the outcome of the last
    // completed round.
    in_flight: Mutex<Option<Result<Token>>>,
    // Incremented, under the lock, each time a round completes.
    rounds: AtomicU64,
}

impl<T: TokenProvider> RefreshCoordinator<T> {
    pub(crate) fn new(store: TokenStore, provider: T) -> Self {
        Self {
            store,
            provider,
            in_flight: Mutex::new(None),
            rounds: AtomicU64::new(0),
        }
    }

    pub(crate) fn store(&self) -> &TokenStore {
        &self.store
    }

    /// The current round. Read it *before* checking for expiration.
    pub(crate) fn round(&self) -> u64 {
        self.rounds.load(Ordering::Acquire)
    }

    /// Refreshes the token, unless another caller already did so.
    ///
    /// `observed` is the value of [round()][Self::round] read before the
    /// caller found the token expired.
    pub(crate) async fn refresh(&self, observed: u64) -> Result<Refreshed> {
        let mut last = self.in_flight.lock().await;

        // A completed round is shared as is, even if its token expired while
        // this caller waited for the lock.
        if self.rounds.load(Ordering::Acquire) != observed {
            if let Some(outcome) = last.as_ref() {
                tracing::debug!("reusing the outcome of a concurrent refresh");
                return outcome.clone().map(|token| Refreshed {
                    token,
                    fetched: false,
                });
            }
        }
        if let Some(token) = self.store.valid(now_unix()).await {
            return Ok(Refreshed {
                token,
                fetched: false,
            });
        }

        let outcome = self.fetch_locked().await;
        *last = Some(outcome.clone());
        self.rounds.fetch_add(1, Ordering::AcqRel);
        outcome.map(|token| Refreshed {
            token,
            fetched: true,
        })
    }

    /// Fetches a new token now, even if the current one is still valid.
    ///
    /// Callers waiting on a refresh share this outcome.
    pub(crate) async fn force_refresh(&self) -> Result<Token> {
        let mut last = self.in_flight.lock().await;
        let outcome = self.fetch_locked().await;
        *last = Some(outcome.clone());
        self.rounds.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    // Must be called with `in_flight` held. A failed fetch leaves the stored
    // token untouched.
    async fn fetch_locked(&self) -> Result<Token> {
        let token = self.provider.token().await?;
        self.store.set(token.clone()).await;
        Ok(token)
    }
}
