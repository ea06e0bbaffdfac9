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

//! Exchange a signed assertion for an access token.
//!
//! Implements the token request of [RFC 7523 section 2.1]: the client signs
//! a JWT with its private key and posts it, form-encoded, to the token
//! endpoint. The endpoint returns the access token and the `instance_url`
//! used as the base address for subsequent API calls.
//!
//! [RFC 7523 section 2.1]: https://datatracker.ietf.org/doc/html/rfc7523#section-2.1

use crate::Result;
use crate::errors::Error;
use crate::jws::{self, JwsClaims, JwsHeader};
use crate::signer::Signer;
use crate::token::{Token, TokenProvider, now_unix};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const INVALID_GRANT: &str = "invalid_grant";

#[derive(Debug)]
pub(crate) struct TokenFetcher {
    pub(crate) client: reqwest::Client,
    pub(crate) endpoint: String,
    pub(crate) payload: Map<String, Value>,
    pub(crate) key_id: Option<String>,
    pub(crate) signer: Arc<dyn Signer>,
    pub(crate) expires_in: Duration,
}

impl TokenFetcher {
    /// Returns the signed assertion, valid until `expires_at`.
    async fn assertion(&self, expires_at: i64) -> Result<String> {
        let header = JwsHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.key_id.as_deref(),
        };
        let claims = JwsClaims {
            payload: &self.payload,
            exp: expires_at,
        };
        jws::assertion(&header, &claims, self.signer.as_ref()).await
    }

    async fn to_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return Error::http_io(status, e),
        };
        match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(e) if e.error == INVALID_GRANT => Error::invalid_grant(e.error_description),
            _ => Error::http(status, body),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for TokenFetcher {
    async fn token(&self) -> Result<Token> {
        let expires_in = i64::try_from(self.expires_in.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now_unix().saturating_add(expires_in);
        let assertion = self.assertion(expires_at).await?;

        let request = TokenRequest {
            grant_type: JWT_BEARER_GRANT_TYPE,
            assertion: &assertion,
        };
        let response = self
            .client
            .post(self.endpoint.as_str())
            .form(&request)
            .send()
            .await
            .map_err(Error::io)?;

        if !response.status().is_success() {
            let err = Self::to_error(response).await;
            tracing::warn!(endpoint = %self.endpoint, "token request failed: {err}");
            return Err(err);
        }
        let response = response.json::<TokenResponse>().await.map_err(|e| {
            if e.is_decode() {
                Error::decode(e)
            } else {
                Error::io(e)
            }
        })?;

        let token = response.into_token(expires_at);
        tracing::debug!(
            endpoint = %self.endpoint,
            instance_url = %token.instance_url,
            expires_at = token.expires_at,
            "fetched access token"
        );
        Ok(token)
    }
}

#[derive(serde::Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    instance_url: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TokenResponse {
    // The endpoint may omit `expires_at`, in which case the token is assumed
    // to live as long as the assertion.
    fn into_token(self, default_expires_at: i64) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            instance_url: self.instance_url,
            expires_at: self.expires_at.unwrap_or(default_expires_at),
            extra: self.extra,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}
