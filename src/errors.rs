// Copyright 2026 Google LLC
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

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::time::Duration;

use crate::encoding;

/// Errors surfaced while constructing or tearing down a server.
///
/// Per-request failures never use this type; they are [`HttpError`] values
/// converted into HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Binding the listening socket failed.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// No free port was found within the probe attempt budget.
    #[error("could not find an available local port after {0} attempts")]
    NoAvailablePort(usize),

    /// In-flight requests did not complete within the shutdown grace period.
    #[error("shutdown grace period of {0:?} elapsed before in-flight requests completed")]
    ShutdownTimedOut(Duration),
}

/// The per-request error taxonomy.
///
/// Every variant maps to exactly one status code, and every rendering of a
/// variant still passes through the response-header pipeline.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The caller omitted or miswrote a required request element.
    #[error("{0}")]
    Client(String),

    /// The path or attribute is not part of the metadata surface.
    #[error("not found")]
    NotFound,

    /// The attribute is documented but deliberately stubbed.
    #[error("not implemented")]
    NotImplemented,

    /// The service account key file named by the override variable does not
    /// exist.
    #[error("credentials file missing: {0}")]
    MissingCredentialsFile(String),

    /// The service account key file exists but could not be parsed.
    #[error("malformed credentials in {path}: {reason}")]
    MalformedCredentials { path: String, reason: String },

    /// Credential resolution failed for any other reason, including upstream
    /// token exchange failures.
    #[error("credential resolution failed: {0}")]
    Resolution(String),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Client(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            HttpError::MissingCredentialsFile(_)
            | HttpError::MalformedCredentials { .. }
            | HttpError::Resolution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        encoding::error_page(self.status(), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(HttpError::Client("x".into()), StatusCode::BAD_REQUEST)]
    #[test_case(HttpError::NotFound, StatusCode::NOT_FOUND)]
    #[test_case(HttpError::NotImplemented, StatusCode::NOT_IMPLEMENTED)]
    #[test_case(HttpError::MissingCredentialsFile("p".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[test_case(HttpError::Resolution("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn status_mapping(err: HttpError, want: StatusCode) {
        assert_eq!(err.status(), want);
    }

    #[test]
    fn malformed_credentials_names_the_file() {
        let err = HttpError::MalformedCredentials {
            path: "/tmp/key.json".into(),
            reason: "missing field `client_email`".into(),
        };
        let got = err.to_string();
        assert!(got.contains("/tmp/key.json"), "{got}");
        assert!(got.contains("client_email"), "{got}");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
