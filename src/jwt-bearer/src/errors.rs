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

//! Errors returned while fetching tokens or issuing authorized requests.
//!
//! A single token refresh may be awaited by many concurrent requests, and all
//! of them receive the same outcome. For that reason [Error] is cheap to
//! clone: the underlying causes are shared behind an [Arc].

use http::StatusCode;
use std::error::Error as StdError;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// The error type for token fetches and authorized requests.
///
/// Use the predicates (`is_invalid_grant()`, `is_token_expired()`, ...) to
/// classify the error. Transport errors keep the original failure, which is
/// available via [std::error::Error::source].
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Clone, Debug)]
enum ErrorKind {
    InvalidGrant(String),
    TokenExpired,
    Transport {
        status: Option<StatusCode>,
        transient: bool,
        source: SharedError,
    },
    Signing(SharedError),
    Callback(SharedError),
}

impl Error {
    /// The token endpoint rejected the assertion with `invalid_grant`.
    ///
    /// This is not transient. The caller needs to fix the key or the claims
    /// before trying again.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidGrant(_))
    }

    /// The `error_description` reported with an `invalid_grant` error.
    pub fn invalid_grant_description(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::InvalidGrant(d) => Some(d.as_str()),
            _ => None,
        }
    }

    /// The current token expired and automatic refresh is disabled.
    ///
    /// The request was not sent.
    pub fn is_token_expired(&self) -> bool {
        matches!(self.kind, ErrorKind::TokenExpired)
    }

    /// The HTTP transport failed, or a server returned an unexpected response.
    ///
    /// A token whose type or value cannot form an `Authorization` header is
    /// an unexpected token endpoint response, and is reported here too, with
    /// no HTTP status.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport { .. })
    }

    /// The assertion could not be signed.
    pub fn is_signing(&self) -> bool {
        matches!(self.kind, ErrorKind::Signing(_))
    }

    /// The refresh listener failed after a successful refresh.
    ///
    /// The refreshed token is already stored, later requests use it.
    pub fn is_callback(&self) -> bool {
        matches!(self.kind, ErrorKind::Callback(_))
    }

    /// Returns `true` if a later attempt may succeed.
    ///
    /// Only transport errors are transient: connection failures and a small
    /// set of HTTP status codes. See [is_retryable].
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Transport {
                transient: true,
                ..
            }
        )
    }

    /// The HTTP status code, if the error was caused by an HTTP response.
    pub fn http_status(&self) -> Option<StatusCode> {
        match &self.kind {
            ErrorKind::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn invalid_grant<T: Into<String>>(description: T) -> Self {
        Self::from(ErrorKind::InvalidGrant(description.into()))
    }

    pub(crate) fn token_expired() -> Self {
        Self::from(ErrorKind::TokenExpired)
    }

    /// A failure sending the request or receiving the response.
    pub(crate) fn io<T: StdError + Send + Sync + 'static>(source: T) -> Self {
        Self::from(ErrorKind::Transport {
            status: None,
            transient: true,
            source: Arc::new(source),
        })
    }

    /// A response that could not be decoded or used, including tokens that
    /// are not valid header values. Never transient.
    pub(crate) fn decode<T: StdError + Send + Sync + 'static>(source: T) -> Self {
        Self::from(ErrorKind::Transport {
            status: None,
            transient: false,
            source: Arc::new(source),
        })
    }

    /// A non-2xx response, with its (possibly empty) body as the message.
    pub(crate) fn http<T: Into<String>>(status: StatusCode, body: T) -> Self {
        Self::from(ErrorKind::Transport {
            status: Some(status),
            transient: is_retryable(status),
            source: Arc::new(Message(body.into())),
        })
    }

    /// A non-2xx response whose body could not be read.
    pub(crate) fn http_io<T: StdError + Send + Sync + 'static>(
        status: StatusCode,
        source: T,
    ) -> Self {
        Self::from(ErrorKind::Transport {
            status: Some(status),
            transient: is_retryable(status),
            source: Arc::new(source),
        })
    }

    pub(crate) fn signing<T: StdError + Send + Sync + 'static>(source: T) -> Self {
        Self::from(ErrorKind::Signing(Arc::new(source)))
    }

    pub(crate) fn callback(source: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Self::from(ErrorKind::Callback(Arc::from(source)))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::Transport { source, .. }
            | ErrorKind::Signing(source)
            | ErrorKind::Callback(source) => Some(source.as_ref()),
            ErrorKind::InvalidGrant(_) | ErrorKind::TokenExpired => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ErrorKind::InvalidGrant(d) => {
                write!(f, "the token endpoint rejected the assertion (invalid_grant): {d}")
            }
            ErrorKind::TokenExpired => write!(
                f,
                "the access token has expired and automatic refresh is disabled"
            ),
            ErrorKind::Transport {
                status: Some(status),
                source,
                ..
            } => write!(f, "the request failed with status {status}: {source}"),
            ErrorKind::Transport {
                status: None,
                source,
                ..
            } => write!(f, "the request failed: {source}"),
            ErrorKind::Signing(source) => write!(f, "cannot sign the assertion: {source}"),
            ErrorKind::Callback(source) => write!(f, "the refresh listener failed: {source}"),
        }
    }
}

#[derive(Debug)]
struct Message(String);

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl StdError for Message {}

/// Returns `true` for status codes that do not indicate a problem with the
/// request itself.
pub(crate) fn is_retryable(c: StatusCode) -> bool {
    match c {
        // Internal server errors do not indicate that there is anything wrong
        // with our request, so we retry them.
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => true,
        _ => false,
    }
}
