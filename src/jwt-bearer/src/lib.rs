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

//! An HTTP client for APIs protected by the OAuth 2.0 JWT bearer flow.
//!
//! The client signs an assertion with the application's private key,
//! exchanges it for an access token as described in [RFC 7523], and attaches
//! that token to each request. Expired tokens are refreshed automatically,
//! and concurrent requests that find the token expired share a single
//! refresh.
//!
//! ```no_run
//! # use jwt_bearer_client::options::Builder;
//! # async fn sample() -> anyhow::Result<()> {
//! let client = Builder::from_json(serde_json::json!({
//!     "payload": {
//!         "iss": "0123456789",
//!         "sub": "integration@example.com",
//!         "aud": "https://login.example.com",
//!     },
//!     "private_key": std::fs::read_to_string("key.pem")?,
//!     "token_host": "https://login.example.com",
//!     "token_path": "/services/oauth2/token",
//! }))?
//! .build()?;
//! let accounts = client.get("/services/data/v60.0/sobjects/Account").await?;
//! println!("{}", accounts.text().await?);
//! # Ok(()) }
//! ```
//!
//! [RFC 7523]: https://datatracker.ietf.org/doc/html/rfc7523

pub mod build_errors;
pub mod client;
pub mod errors;
pub mod options;
pub mod signer;
pub mod token;

pub(crate) mod fetcher;
pub(crate) mod headers_util;
pub(crate) mod interceptor;
pub(crate) mod jws;
pub(crate) mod refresh;

pub use client::Client;
pub use options::Builder;

/// A `Result` alias where the `Err` case is `jwt_bearer_client::errors::Error`.
pub type Result<T> = std::result::Result<T, crate::errors::Error>;
