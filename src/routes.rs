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

//! The metadata endpoint tree and its dispatcher.
//!
//! The whole `/computeMetadata/v1/...` namespace is described by one static
//! [`Node`] tree. Directory listings and trailing-slash redirects are derived
//! mechanically from it, so no path literal appears twice. [`resolve`] walks
//! the tree without touching the environment or the network; [`dispatch`]
//! executes the resolution, which is where environment lookups, credential
//! calls, and the stub policy come in.

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;

use crate::attributes::{AttributeMap, GUEST_ATTRIBUTES, INSTANCE_ATTRIBUTES, PROJECT_ATTRIBUTES};
use crate::constants::{
    CLOUD_PLATFORM_SCOPE, ENV_GOOGLE_ACCOUNT_EMAIL, ENV_INSTANCE_HOSTNAME, ENV_INSTANCE_ID,
    ENV_PROJECT_DEFAULT_ZONE, METADATA_IP, NUMERIC_PROJECT_ID_ENVS, PROJECT_ID_ENVS,
};
use crate::errors::HttpError;
use crate::server::{ServerState, StubPolicy, metadata_host};
use crate::{cpu, encoding};

/// Which attribute map a directory consults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scope {
    Project,
    Instance,
    Guest,
}

impl Scope {
    fn map(self) -> &'static AttributeMap {
        match self {
            Scope::Project => &PROJECT_ATTRIBUTES,
            Scope::Instance => &INSTANCE_ATTRIBUTES,
            Scope::Guest => &GUEST_ATTRIBUTES,
        }
    }
}

/// How a directory behaves when addressed bare, with a trailing slash, or
/// with a remainder below it.
#[derive(Debug)]
pub(crate) enum DirKind {
    /// One-level-at-a-time browsing: the bare path lists the directory's own
    /// name, the slashed path lists its children. Used on the root spine
    /// (`/`, `computeMetadata`, `v1`).
    Browse,
    /// A registered collection: the bare path redirects to the slashed form,
    /// the slashed path lists children, a remainder descends.
    Collection,
    /// An attribute collection: listing and per-attribute lookup come from
    /// the scope's [`AttributeMap`].
    Attributes(Scope),
    /// A documented directory with no content yet; every access below the
    /// redirect is answered by the configured stub policy.
    Stubbed,
    /// The dynamic `service-accounts` directory.
    ServiceAccounts,
    /// Present in the parent listing, not otherwise served.
    Reserved,
}

#[derive(Debug)]
pub(crate) enum Leaf {
    /// First set environment variable wins; none set is not found.
    Env(&'static [&'static str]),
    /// The host CPU mapped to a GCE platform name.
    CpuPlatform,
    /// Documented endpoint with no content yet, answered per stub policy.
    Stub,
    /// Documented endpoint that always answers 501.
    NotImplemented,
}

#[derive(Debug)]
pub(crate) enum Node {
    Dir(Dir),
    Leaf(Leaf),
}

#[derive(Debug)]
pub(crate) struct Dir {
    kind: DirKind,
    children: &'static [(&'static str, Node)],
}

const fn browse(children: &'static [(&'static str, Node)]) -> Node {
    Node::Dir(Dir {
        kind: DirKind::Browse,
        children,
    })
}

const fn collection(children: &'static [(&'static str, Node)]) -> Node {
    Node::Dir(Dir {
        kind: DirKind::Collection,
        children,
    })
}

const fn attributes(scope: Scope) -> Node {
    Node::Dir(Dir {
        kind: DirKind::Attributes(scope),
        children: &[],
    })
}

const fn stubbed() -> Node {
    Node::Dir(Dir {
        kind: DirKind::Stubbed,
        children: &[],
    })
}

const fn reserved() -> Node {
    Node::Dir(Dir {
        kind: DirKind::Reserved,
        children: &[],
    })
}

const fn stub() -> Node {
    Node::Leaf(Leaf::Stub)
}

const fn unimplemented() -> Node {
    Node::Leaf(Leaf::NotImplemented)
}

const fn env(vars: &'static [&'static str]) -> Node {
    Node::Leaf(Leaf::Env(vars))
}

/// The entire metadata namespace, declared once.
///
/// See <https://cloud.google.com/compute/docs/metadata/default-metadata-values>
/// for the documented surface.
static TREE: Node = browse(&[(
    "computeMetadata",
    browse(&[(
        "v1",
        browse(&[
            (
                "instance",
                collection(&[
                    ("attributes", attributes(Scope::Instance)),
                    ("cpu-platform", Node::Leaf(Leaf::CpuPlatform)),
                    ("description", stub()),
                    (
                        "disks",
                        collection(&[
                            ("device-name", unimplemented()),
                            ("index", unimplemented()),
                            ("interface", unimplemented()),
                            ("mode", unimplemented()),
                            ("type", unimplemented()),
                        ]),
                    ),
                    ("guest-attributes", attributes(Scope::Guest)),
                    ("hostname", env(&[ENV_INSTANCE_HOSTNAME])),
                    ("id", env(&[ENV_INSTANCE_ID])),
                    ("image", stub()),
                    ("legacy-endpoint-access", stubbed()),
                    ("licenses", stubbed()),
                    ("machine-type", stub()),
                    ("maintenance-event", stub()),
                    ("name", stub()),
                    ("network-interfaces", stubbed()),
                    ("preempted", stub()),
                    ("remaining-cpu-time", stub()),
                    ("scheduling", stubbed()),
                    (
                        "service-accounts",
                        Node::Dir(Dir {
                            kind: DirKind::ServiceAccounts,
                            children: &[],
                        }),
                    ),
                    ("tags", stub()),
                    ("virtual-clock", stubbed()),
                    ("zone", stub()),
                ]),
            ),
            ("oslogin", reserved()),
            (
                "project",
                collection(&[
                    ("attributes", attributes(Scope::Project)),
                    ("numeric-project-id", env(NUMERIC_PROJECT_ID_ENVS)),
                    ("project-id", env(PROJECT_ID_ENVS)),
                ]),
            ),
        ]),
    )]),
)]);

const SERVICE_ACCOUNT_ENDPOINTS: &[&str] = &["aliases", "email", "identity", "scopes", "token"];

/// What a resolved path asks the dispatcher to do. Everything that needs the
/// environment, the resolver, or the request's query string is deferred.
#[derive(Debug, PartialEq)]
pub(crate) enum Resolution {
    /// A newline-joined directory listing.
    Listing(String),
    /// A fixed scalar value.
    Value(String),
    /// Redirect to this path (trailing slash included).
    Redirect(String),
    /// First set environment variable wins.
    Env(&'static [&'static str]),
    CpuPlatform,
    /// Answered by the configured stub policy.
    Stub,
    /// Documented attribute without a real value.
    NotImplemented,
    NotFound,
    /// `service-accounts/` itself; the listing needs the resolved email.
    SaDirectory,
    /// `{account}/email`.
    SaEmail(String),
    /// `{account}/identity`; the audience comes from the query string.
    SaIdentity,
    /// `{account}/token`; the scopes come from the query string.
    SaToken,
}

/// Resolves a normalized request path against the tree. Pure: no environment
/// reads, no I/O.
pub(crate) fn resolve(path: &str) -> Resolution {
    let Some(trimmed) = path.strip_prefix('/') else {
        return Resolution::NotFound;
    };
    let trailing = path.ends_with('/');
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let segments: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    };
    // Empty interior segments (`//`) never match anything.
    if segments.iter().any(|s| s.is_empty()) {
        return Resolution::NotFound;
    }
    walk(&TREE, "", &segments, trailing, path)
}

fn walk(node: &Node, name: &str, rest: &[&str], trailing: bool, path: &str) -> Resolution {
    match node {
        Node::Leaf(leaf) => {
            if !rest.is_empty() || trailing {
                return Resolution::NotFound;
            }
            match leaf {
                Leaf::Env(vars) => Resolution::Env(vars),
                Leaf::CpuPlatform => Resolution::CpuPlatform,
                Leaf::Stub => Resolution::Stub,
                Leaf::NotImplemented => Resolution::NotImplemented,
            }
        }
        Node::Dir(dir) => {
            if rest.is_empty() {
                return resolve_dir_itself(dir, name, trailing, path);
            }
            match &dir.kind {
                DirKind::Browse | DirKind::Collection => {
                    match dir.children.iter().find(|(child, _)| *child == rest[0]) {
                        Some((child_name, child)) => {
                            walk(child, child_name, &rest[1..], trailing, path)
                        }
                        None => Resolution::NotFound,
                    }
                }
                DirKind::Attributes(scope) => {
                    if rest.len() != 1 || trailing {
                        return Resolution::NotFound;
                    }
                    resolve_attribute(*scope, rest[0])
                }
                DirKind::Stubbed => Resolution::Stub,
                DirKind::ServiceAccounts => resolve_service_account(rest, trailing),
                DirKind::Reserved => Resolution::NotFound,
            }
        }
    }
}

fn resolve_dir_itself(dir: &Dir, name: &str, trailing: bool, path: &str) -> Resolution {
    match &dir.kind {
        DirKind::Browse => {
            if trailing {
                Resolution::Listing(children_listing(dir))
            } else {
                Resolution::Listing(format!("{name}/"))
            }
        }
        DirKind::Collection if trailing => Resolution::Listing(children_listing(dir)),
        DirKind::Attributes(scope) if trailing => Resolution::Listing(scope.map().listing()),
        DirKind::Stubbed if trailing => Resolution::Stub,
        DirKind::ServiceAccounts if trailing => Resolution::SaDirectory,
        DirKind::Collection
        | DirKind::Attributes(_)
        | DirKind::Stubbed
        | DirKind::ServiceAccounts => Resolution::Redirect(format!("{path}/")),
        DirKind::Reserved => Resolution::NotFound,
    }
}

fn children_listing(dir: &Dir) -> String {
    let names: Vec<String> = dir
        .children
        .iter()
        .map(|(name, node)| match node {
            Node::Dir(_) => format!("{name}/"),
            Node::Leaf(_) => name.to_string(),
        })
        .collect();
    names.join("\n")
}

fn resolve_attribute(scope: Scope, name: &str) -> Resolution {
    if scope == Scope::Project && name == "google-compute-default-zone" {
        return Resolution::Env(&[ENV_PROJECT_DEFAULT_ZONE]);
    }
    if scope.map().contains(name) {
        Resolution::NotImplemented
    } else {
        Resolution::NotFound
    }
}

fn resolve_service_account(rest: &[&str], trailing: bool) -> Resolution {
    match rest {
        [_account] if !trailing => Resolution::NotFound,
        [_account] => Resolution::Listing(SERVICE_ACCOUNT_ENDPOINTS.join("\n")),
        [_, _] if trailing => Resolution::NotFound,
        [_account, "aliases"] => Resolution::Value("default".to_string()),
        [account, "email"] => Resolution::SaEmail(account.to_string()),
        [_account, "identity"] => Resolution::SaIdentity,
        [_account, "scopes"] => Resolution::Value(CLOUD_PLATFORM_SCOPE.to_string()),
        [_account, "token"] => Resolution::SaToken,
        _ => Resolution::NotFound,
    }
}

/// The fallback handler behind the interceptor layers. Executes whatever the
/// tree resolves the path to.
pub(crate) async fn dispatch(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
    request: Request,
) -> Response {
    if request.method() != Method::GET {
        return encoding::error_page(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    }
    let path = request.uri().path();
    tracing::debug!(path, "dispatching metadata request");

    match resolve(path) {
        Resolution::Listing(body) | Resolution::Value(body) => encoding::text(&body),
        Resolution::Redirect(target) => redirect(&target),
        Resolution::Env(vars) => match first_env(vars) {
            Some(value) => encoding::text(&value),
            None => HttpError::NotFound.into_response(),
        },
        Resolution::CpuPlatform => encoding::text(cpu::platform_name(&cpu::identity())),
        Resolution::Stub => stub_response(state.stub_policy),
        Resolution::NotImplemented => HttpError::NotImplemented.into_response(),
        Resolution::NotFound => HttpError::NotFound.into_response(),
        Resolution::SaDirectory => match state.resolver.resolve_email() {
            Ok(email) => encoding::text(&format!("default/\n{email}/")),
            Err(e) => e.into_response(),
        },
        Resolution::SaEmail(account) => service_account_email(&state, &account),
        Resolution::SaIdentity => {
            let audience = match params.get("audience").filter(|a| !a.is_empty()) {
                Some(audience) => audience,
                None => {
                    return HttpError::Client(
                        "non-empty audience parameter required".to_string(),
                    )
                    .into_response();
                }
            };
            let strategy = state.strategy();
            match state
                .resolver
                .resolve_identity_token(&strategy, audience)
                .await
            {
                Ok(token) => encoding::text(&token.value),
                Err(e) => e.into_response(),
            }
        }
        Resolution::SaToken => {
            let scopes: Vec<String> = params
                .get("scopes")
                .map(|s| s.split(',').map(str::to_string).collect())
                .unwrap_or_default();
            match state.resolver.resolve_access_token(&scopes).await {
                Ok(token) => encoding::token_json(&token),
                Err(e) => e.into_response(),
            }
        }
    }
}

fn first_env(vars: &[&str]) -> Option<String> {
    vars.iter().find_map(|var| std::env::var(var).ok())
}

/// The redirect target embeds the currently published metadata host, read at
/// construction time rather than cached.
fn redirect(path: &str) -> Response {
    let host = metadata_host::get().unwrap_or_else(|| METADATA_IP.to_string());
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, format!("http://{host}{path}"))],
        Body::empty(),
    )
        .into_response()
}

fn stub_response(policy: StubPolicy) -> Response {
    match policy {
        StubPolicy::Empty => StatusCode::OK.into_response(),
        StubPolicy::NotFound => HttpError::NotFound.into_response(),
        StubPolicy::NotImplemented => HttpError::NotImplemented.into_response(),
    }
}

fn service_account_email(state: &ServerState, account: &str) -> Response {
    if let Some(email) = first_env(&[ENV_GOOGLE_ACCOUNT_EMAIL]) {
        return encoding::text(&email);
    }
    if account == "default" {
        // Without the override, "default" only has a meaning when a key file
        // resolves it.
        return match state.resolver.resolve_email() {
            Ok(email) => encoding::text(&email),
            Err(_) => HttpError::NotFound.into_response(),
        };
    }
    encoding::text(account)
}
