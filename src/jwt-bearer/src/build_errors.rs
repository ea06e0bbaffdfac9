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

//! Errors created while building a [Client](crate::client::Client).

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A `Result` alias for the [Builder](crate::options::Builder).
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the client [Builder](crate::options::Builder).
///
/// Applications rarely need to create instances of this error type. The
/// exception might be when testing application code.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// A problem parsing the configuration or the private key.
    pub fn is_parsing(&self) -> bool {
        matches!(self.0, ErrorKind::Parsing(_))
    }

    /// A required field was missing from the builder.
    pub fn is_missing_field(&self) -> bool {
        matches!(self.0, ErrorKind::MissingField(_))
    }

    /// A field has a value the client cannot use.
    pub fn is_invalid_field(&self) -> bool {
        matches!(self.0, ErrorKind::InvalidField(_, _))
    }

    /// A problem parsing a configuration document or key.
    pub(crate) fn parsing<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Parsing(source.into()))
    }

    /// A required field was missing from the builder.
    pub(crate) fn missing_field(field: &'static str) -> Error {
        Error(ErrorKind::MissingField(field))
    }

    /// A field was present, but unusable.
    pub(crate) fn invalid_field<T>(field: &'static str, source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::InvalidField(field, source.into()))
    }
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("cannot parse the client configuration: {0}")]
    Parsing(#[source] BoxError),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for field {0}: {1}")]
    InvalidField(&'static str, #[source] BoxError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn constructors() {
        let error = Error::parsing("test message");
        assert!(error.is_parsing(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");

        let error = Error::missing_field("token_host");
        assert!(error.is_missing_field(), "{error:?}");
        assert!(error.to_string().contains("token_host"), "{error}");

        let error = Error::invalid_field("token_host", "relative URL");
        assert!(error.is_invalid_field(), "{error:?}");
        assert!(!error.is_parsing(), "{error:?}");
        assert!(error.to_string().contains("relative URL"), "{error}");
    }
}
