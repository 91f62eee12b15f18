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

//! A fake Google Compute Engine instance metadata server for tests and local
//! development.
//!
//! Code written against the real metadata protocol can run against this
//! server without cloud infrastructure: it serves the documented
//! `/computeMetadata/v1/...` surface, enforces the `Metadata-Flavor: Google`
//! contract, and issues real service-account tokens when pointed at a key
//! file through `GOOGLE_APPLICATION_CREDENTIALS`.
//!
//! Starting a server publishes its address through `GCE_METADATA_HOST`, the
//! variable Google client libraries consult to locate the metadata endpoint,
//! and shutting it down removes the variable again. Because that address is
//! process-global, run at most one live server per process.
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), fake_metadata_server::Error> {
//! let server = fake_metadata_server::Builder::new().start().await?;
//!
//! let response = reqwest::Client::new()
//!     .get(format!(
//!         "http://{}/computeMetadata/v1/project/project-id",
//!         server.address()
//!     ))
//!     .header("Metadata-Flavor", "Google")
//!     .send()
//!     .await
//!     .unwrap();
//!
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Scalar endpoints read override environment variables
//! (`GOOGLE_CLOUD_PROJECT`, `GOOGLE_INSTANCE_ID`, ...; see [`constants`]),
//! so tests control the values a client observes without touching the
//! server.

pub mod attributes;
pub mod constants;
pub mod cpu;
mod credentials;
mod encoding;
mod errors;
mod interceptor;
mod routes;
mod server;

pub use credentials::{CredentialStrategy, Token};
pub use errors::{Error, HttpError};
pub use server::{Builder, Server, StubPolicy};
