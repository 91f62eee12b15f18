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

//! Response synthesis: HTML-escaped plain text for scalar values and
//! directory listings, JSON for token responses, and HTML error pages.

use axum::response::{Html, IntoResponse, Response};
use http::{StatusCode, header};

use crate::credentials::Token;

/// Escapes the five HTML-significant characters.
///
/// Metadata values come from environment variables and credential files, so
/// every scalar is escaped before it is written back to a client.
pub(crate) fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A 200 response whose body is the HTML-escaped value, with the default
/// plain-text content type.
pub(crate) fn text(value: &str) -> Response {
    (StatusCode::OK, html_escape(value)).into_response()
}

/// An error page: status code plus `text/html; charset=utf-8` body.
pub(crate) fn error_page(status: StatusCode, message: &str) -> Response {
    (status, Html(html_escape(message))).into_response()
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub(crate) struct TokenBody {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// Renders an access token as the JSON object the real service returns.
///
/// `expires_in` is the rounded number of seconds between the token expiry and
/// the instant the response is built, not the instant the token was minted.
pub(crate) fn token_json(token: &Token) -> Response {
    let expires_in = token
        .expires_at
        .map(|at| {
            at.saturating_duration_since(std::time::Instant::now())
                .as_secs_f64()
                .round() as i64
        })
        .unwrap_or(0);
    let body = TokenBody {
        access_token: token.value.clone(),
        expires_in,
        token_type: token.token_type.clone(),
    };
    match serde_json::to_string(&body) {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            json,
        )
            .into_response(),
        Err(e) => error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("failed to encode token response: {e}"),
        ),
    }
}
