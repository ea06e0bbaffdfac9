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

//! The client for APIs protected by the JWT bearer flow.

use crate::Result;
use crate::errors::Error;
use crate::fetcher::TokenFetcher;
use crate::interceptor::AuthorizingInterceptor;
use crate::token::{Token, now_unix};
use reqwest::{Method, RequestBuilder, Response};
use std::sync::Arc;

/// Sends authorized requests, fetching and refreshing the access token as
/// needed.
///
/// Cloning a client is cheap, clones share the token and the refresh lock.
/// Separate clients (created with separate [Builder][crate::options::Builder]
/// calls) never share either.
///
/// # Example
/// ```no_run
/// # use jwt_bearer_client::client::Client;
/// # async fn sample(client: Client) -> anyhow::Result<()> {
/// let response = client
///     .post_json("/services/data/v60.0/sobjects/Account", &serde_json::json!({"Name": "Acme"}))
///     .await?;
/// println!("{}", response.status());
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    interceptor: AuthorizingInterceptor<TokenFetcher>,
    http: reqwest::Client,
}

impl Client {
    pub(crate) fn new(interceptor: AuthorizingInterceptor<TokenFetcher>, http: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(ClientInner { interceptor, http }),
        }
    }

    /// Fetches a new token now, even if the current token is still valid.
    ///
    /// The new token replaces the current one. Concurrent requests waiting
    /// for a refresh receive the same outcome. The refresh listener is not
    /// called, the caller already holds the token.
    pub async fn fetch_token(&self) -> Result<Token> {
        self.inner.interceptor.coordinator().force_refresh().await
    }

    /// Replaces the current token, for example with one loaded from a cache.
    pub async fn set_token(&self, token: Token) {
        self.inner.interceptor.coordinator().store().set(token).await
    }

    /// Returns the current token, if any.
    pub async fn token(&self) -> Option<Token> {
        self.inner.interceptor.coordinator().store().get().await
    }

    /// Returns `true` if there is no token or it is within the expiry leeway.
    pub async fn is_expired(&self) -> bool {
        self.inner
            .interceptor
            .coordinator()
            .store()
            .is_expired(now_unix())
            .await
    }

    /// Prepares an authorized request.
    ///
    /// Relative URLs are resolved against the token's `instance_url`,
    /// absolute `http` and `https` URLs are used as is. The token is
    /// refreshed first if needed.
    ///
    /// Use this to add a body, query parameters, or headers before calling
    /// [execute][Self::execute].
    pub async fn authorize(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        self.inner
            .interceptor
            .authorize(&self.inner.http, method, url)
            .await
    }

    /// Sends a request prepared with [authorize][Self::authorize].
    ///
    /// Responses with a status other than 2xx are returned as errors, with
    /// the status code and body.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(Error::io)?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http_io(status, e))?;
        Err(Error::http(status, body))
    }

    /// Sends an authorized request without a body.
    pub async fn send(&self, method: Method, url: &str) -> Result<Response> {
        let request = self.authorize(method, url).await?;
        self.execute(request).await
    }

    /// Sends an authorized `GET` request.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(Method::GET, url).await
    }

    /// Sends an authorized `POST` request with a JSON body.
    pub async fn post_json<B>(&self, url: &str, body: &B) -> Result<Response>
    where
        B: serde::Serialize + ?Sized,
    {
        let request = self.authorize(Method::POST, url).await?.json(body);
        self.execute(request).await
    }
}
