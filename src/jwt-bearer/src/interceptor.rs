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

//! Decide, for each request, whether to use, refresh, or reject the token.

use crate::Result;
use crate::errors::Error;
use crate::headers_util::build_bearer_headers;
use crate::options::{ClientOptions, combine_urls};
use crate::refresh::RefreshCoordinator;
use crate::token::{Token, TokenProvider, now_unix};
use reqwest::{Method, RequestBuilder};

#[derive(Debug)]
pub(crate) struct AuthorizingInterceptor<T>
where
    T: TokenProvider,
{
    coordinator: RefreshCoordinator<T>,
    options: ClientOptions,
}

impl<T: TokenProvider> AuthorizingInterceptor<T> {
    pub(crate) fn new(coordinator: RefreshCoordinator<T>, options: ClientOptions) -> Self {
        Self {
            coordinator,
            options,
        }
    }

    pub(crate) fn coordinator(&self) -> &RefreshCoordinator<T> {
        &self.coordinator
    }

    /// Returns a token to authorize a request.
    ///
    /// A valid token is returned without waiting on the refresh lock. An
    /// expired token is refreshed if automatic refresh is enabled, and
    /// rejected otherwise.
    pub(crate) async fn token(&self) -> Result<Token> {
        let round = self.coordinator.round();
        if let Some(token) = self.coordinator.store().valid(now_unix()).await {
            return Ok(token);
        }
        if !self.options.auto_refresh {
            tracing::debug!("rejecting request, the access token is expired and auto refresh is disabled");
            return Err(Error::token_expired());
        }
        let refreshed = self.coordinator.refresh(round).await?;
        if refreshed.fetched {
            if let Some(listener) = &self.options.on_refresh {
                listener.on_refresh(&refreshed.token).map_err(|e| {
                    tracing::warn!("refresh listener failed: {e}");
                    Error::callback(e)
                })?;
            }
        }
        Ok(refreshed.token)
    }

    /// Prepares an authorized request.
    ///
    /// Relative URLs are resolved against the token's `instance_url`.
    pub(crate) async fn authorize(
        &self,
        client: &reqwest::Client,
        method: Method,
        url: &str,
    ) -> Result<RequestBuilder> {
        let token = self.token().await?;
        let headers = build_bearer_headers(&token)?;
        Ok(client
            .request(method, request_url(&token.instance_url, url))
            .headers(headers))
    }
}

fn request_url(instance_url: &str, url: &str) -> String {
    if is_absolute(url) {
        return url.to_string();
    }
    combine_urls(instance_url, url)
}

fn is_absolute(url: &str) -> bool {
    reqwest::Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}
