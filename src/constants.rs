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

//! Names shared across the metadata surface: headers, environment variables,
//! and the documented service constants.
//!
//! See <https://cloud.google.com/compute/docs/metadata/overview> for the
//! request conventions these mirror.

/// The documented metadata server IP address.
pub const METADATA_IP: &str = "169.254.169.254";

/// The environment variable specifying the GCE metadata hostname.
///
/// The Google Cloud client libraries consult this variable to locate the
/// metadata endpoint, which is what makes a fake server reachable without
/// touching `169.254.169.254`.
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

/// The required request header for access to the metadata server.
///
/// This header indicates that the request was sent with the intention of
/// retrieving metadata values, rather than unintentionally from an insecure
/// source. Requests without it are denied.
pub const METADATA_FLAVOR: &str = "metadata-flavor";

/// The required value of the [`METADATA_FLAVOR`] header.
pub const METADATA_FLAVOR_VALUE: &str = "Google";

/// The legacy (but still documented) request header. Recognized historically;
/// this fake only enforces [`METADATA_FLAVOR`].
pub const LEGACY_METADATA_REQUEST_HEADER: &str = "x-google-metadata-request";

/// The fixed `Server` header value set on every response.
pub const SERVER_VALUE: &str = "Metadata Server for VM";

/// The scope granted to the default service account.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Overrides the application default credentials JSON path.
pub const ENV_GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Overrides the service account email address.
pub const ENV_GOOGLE_ACCOUNT_EMAIL: &str = "GOOGLE_ACCOUNT_EMAIL";

/// Overrides the instance id.
pub const ENV_INSTANCE_ID: &str = "GOOGLE_INSTANCE_ID";

/// Overrides the instance hostname.
pub const ENV_INSTANCE_HOSTNAME: &str = "GOOGLE_INSTANCE_HOSTNAME";

/// Overrides the project default zone attribute.
pub const ENV_PROJECT_DEFAULT_ZONE: &str = "GOOGLE_PROJECT_DEFAULT_ZONE";

/// Ordered candidates for the project id override; the first one set wins.
pub const PROJECT_ID_ENVS: &[&str] = &["GOOGLE_CLOUD_PROJECT", "GCP_PROJECT", "GOOGLE_GCP_PROJECT"];

/// Ordered candidates for the numeric project id override; the first one set
/// wins.
pub const NUMERIC_PROJECT_ID_ENVS: &[&str] = &[
    "GOOGLE_CLOUD_NUMERIC_PROJECT",
    "GCP_NUMERIC_PROJECT",
    "GOOGLE_GCP_NUMERIC_PROJECT",
];
