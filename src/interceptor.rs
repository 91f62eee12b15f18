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

//! The header pipeline wrapping every dispatched request.
//!
//! Order matters: header injection is the outermost layer so the mandated
//! response headers also land on 403 rejections, errors, and timeouts; the
//! flavor check runs before routing; the deadline bounds the handler and any
//! credential network call inside it.

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::constants::{METADATA_FLAVOR, METADATA_FLAVOR_VALUE, SERVER_VALUE};
use crate::encoding;
use crate::server::ServerState;

fn flavor_ok(value: &str) -> bool {
    value.eq_ignore_ascii_case(METADATA_FLAVOR_VALUE)
}

/// Rejects any request that does not mark itself as an intentional metadata
/// request, echoing the offending value.
pub(crate) async fn check_metadata_flavor(request: Request, next: Next) -> Response {
    let seen = request
        .headers()
        .get(METADATA_FLAVOR)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !flavor_ok(seen) {
        tracing::debug!(seen, "rejecting request without the metadata flavor header");
        return encoding::error_page(
            StatusCode::FORBIDDEN,
            &format!("Metadata-Flavor header is wrong: {seen}"),
        );
    }
    next.run(request).await
}

/// Sets the mandated response headers on commit, overwriting anything the
/// handler set.
pub(crate) async fn inject_response_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_VALUE));
    headers.insert(
        HeaderName::from_static(METADATA_FLAVOR),
        HeaderValue::from_static(METADATA_FLAVOR_VALUE),
    );
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("0"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("SAMEORIGIN"),
    );
    response
}

/// Bounds the whole handler, credential calls included, by the configured
/// request deadline.
pub(crate) async fn enforce_deadline(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(state.deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(deadline = ?state.deadline, "request deadline exceeded");
            encoding::error_page(StatusCode::GATEWAY_TIMEOUT, "request deadline exceeded")
        }
    }
}
