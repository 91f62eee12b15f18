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

//! Server construction and lifecycle.
//!
//! A [`Builder`] configures the listen address, timeouts, the stub policy,
//! and the initial credential strategy, then [`Builder::start`] binds the
//! listener, publishes `GCE_METADATA_HOST`, and serves until shutdown.
//! Shutdown unsets the variable unconditionally and waits a bounded grace
//! period for in-flight requests. Only one live server per process is
//! meaningful, because the published address is process-global.

use axum::Router;
use axum::middleware;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::credentials::{CredentialResolver, CredentialStrategy};
use crate::errors::Error;
use crate::{interceptor, routes};

/// How endpoints that are documented but carry no content yet respond.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StubPolicy {
    /// An empty 200 body, matching the real service's unpopulated entries.
    #[default]
    Empty,
    /// 404 for clients that treat empty bodies as data.
    NotFound,
    /// 501 to make accidental reliance on stubbed values loud.
    NotImplemented,
}

/// The single scoped accessor for the published metadata-host variable.
///
/// Client libraries locate the fake server through `GCE_METADATA_HOST`, so
/// the variable itself is unavoidable; every read and write in this crate
/// goes through here. Setting and removing environment variables is unsafe
/// in the presence of concurrent readers, which is one more reason for the
/// one-live-server-per-process contract.
pub(crate) mod metadata_host {
    use crate::constants::METADATA_HOST_ENV;

    pub(crate) fn get() -> Option<String> {
        std::env::var(METADATA_HOST_ENV).ok()
    }

    pub(crate) fn publish(address: &str) {
        unsafe { std::env::set_var(METADATA_HOST_ENV, address) };
    }

    pub(crate) fn clear() {
        unsafe { std::env::remove_var(METADATA_HOST_ENV) };
    }
}

const PORT_RANGE: std::ops::Range<u16> = 1000..56535;
const MAX_PORT_ATTEMPTS: usize = 16;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Samples random ports until one refuses a connection.
///
/// Best effort only: a port that refuses now can be bound by someone else
/// before we bind it. The bind itself is the real arbiter.
async fn choose_port() -> Result<u16, Error> {
    for _ in 0..MAX_PORT_ATTEMPTS {
        let port = rand::rng().random_range(PORT_RANGE);
        match TcpStream::connect(("localhost", port)).await {
            Ok(_) => continue,
            Err(_) => return Ok(port),
        }
    }
    Err(Error::NoAvailablePort(MAX_PORT_ATTEMPTS))
}

/// Shared state behind every request handler.
#[derive(Debug)]
pub(crate) struct ServerState {
    strategy: Mutex<CredentialStrategy>,
    pub(crate) stub_policy: StubPolicy,
    pub(crate) resolver: CredentialResolver,
    pub(crate) deadline: Duration,
}

impl ServerState {
    /// Clones the current strategy; the lock is held only for the clone,
    /// never across the credential call it feeds.
    pub(crate) fn strategy(&self) -> CredentialStrategy {
        self.lock_strategy().clone()
    }

    fn set_strategy(&self, strategy: CredentialStrategy) {
        *self.lock_strategy() = strategy;
    }

    fn lock_strategy(&self) -> std::sync::MutexGuard<'_, CredentialStrategy> {
        self.strategy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Configures and starts a fake metadata server.
#[derive(Clone, Debug)]
pub struct Builder {
    host: String,
    port: Option<u16>,
    read_timeout: Duration,
    write_timeout: Duration,
    stub_policy: StubPolicy,
    strategy: CredentialStrategy,
    iam_endpoint: Option<String>,
    token_endpoint: Option<String>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            stub_policy: StubPolicy::default(),
            strategy: CredentialStrategy::default(),
            iam_endpoint: None,
            token_endpoint: None,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The interface to bind; defaults to `localhost`.
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// A fixed port instead of the random probe.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_stub_policy(mut self, policy: StubPolicy) -> Self {
        self.stub_policy = policy;
        self
    }

    /// The credential strategy the server starts with; it can be changed at
    /// runtime through [`Server::set_credential_strategy`].
    pub fn with_credential_strategy(mut self, strategy: CredentialStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Overrides the IAM Credentials endpoint used for impersonation and
    /// federation. Tests point this at a local fixture.
    pub fn with_iam_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.iam_endpoint = Some(endpoint.into());
        self
    }

    /// Overrides the OAuth token endpoint used for assertion exchanges.
    pub fn with_token_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Binds the listener, publishes the address, and starts serving.
    pub async fn start(self) -> Result<Server, Error> {
        let port = match self.port {
            Some(port) => port,
            None => choose_port().await?,
        };
        let address = format!("{}:{}", self.host, port);
        let listener = TcpListener::bind(&address).await.map_err(|e| Error::Bind {
            address: address.clone(),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| Error::Bind {
            address: address.clone(),
            source: e,
        })?;

        let state = Arc::new(ServerState {
            strategy: Mutex::new(self.strategy),
            stub_policy: self.stub_policy,
            resolver: CredentialResolver::new(self.iam_endpoint, self.token_endpoint),
            // The request deadline covers the whole exchange, which the
            // original splits into separate read and write timeouts.
            deadline: self.read_timeout + self.write_timeout,
        });
        let app = router(state.clone());

        metadata_host::publish(&address);
        tracing::info!(%address, "fake metadata server listening");

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    // Closed sender counts as a shutdown request too.
                    let _ = shutdown_rx.changed().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "fake metadata server terminated");
            }
        });

        Ok(Server {
            address,
            local_addr,
            state,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }
}

fn router(state: Arc<ServerState>) -> Router {
    // Later layers wrap earlier ones, so header injection lands outermost
    // and covers 403 rejections and timeouts as well.
    Router::new()
        .fallback(routes::dispatch)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            interceptor::enforce_deadline,
        ))
        .layer(middleware::from_fn(interceptor::check_metadata_flavor))
        .layer(middleware::from_fn(interceptor::inject_response_headers))
        .with_state(state)
}

/// A running fake metadata server.
///
/// Lifecycle: started by [`Builder::start`], stopped by [`Server::shutdown`]
/// (graceful, bounded) or [`Server::close`] (immediate). Both unset the
/// published address unconditionally and are idempotent.
#[derive(Debug)]
pub struct Server {
    address: String,
    local_addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// The published `host:port` string, as written to `GCE_METADATA_HOST`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The bound socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Replaces the credential strategy for subsequent requests.
    pub fn set_credential_strategy(&self, strategy: CredentialStrategy) {
        self.state.set_strategy(strategy);
    }

    /// Stops accepting connections and waits up to the grace period for
    /// in-flight requests, aborting whatever remains after it.
    pub async fn shutdown(&self) -> Result<(), Error> {
        metadata_host::clear();
        let _ = self.shutdown_tx.send(true);
        let Some(mut task) = self.take_task() else {
            return Ok(());
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(_) => Ok(()),
            Err(_) => {
                task.abort();
                Err(Error::ShutdownTimedOut(SHUTDOWN_GRACE))
            }
        }
    }

    /// Stops immediately, without the grace period.
    pub fn close(&self) {
        metadata_host::clear();
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.take_task() {
            task.abort();
        }
    }

    fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::METADATA_HOST_ENV;
    use scoped_env::ScopedEnv;

    #[tokio::test]
    async fn chosen_ports_stay_in_range() -> anyhow::Result<()> {
        for _ in 0..8 {
            let port = choose_port().await?;
            assert!(PORT_RANGE.contains(&port), "{port}");
        }
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn start_publishes_and_shutdown_clears_the_address() -> anyhow::Result<()> {
        let _guard = ScopedEnv::remove(METADATA_HOST_ENV);
        let server = Builder::new().start().await?;
        assert_eq!(metadata_host::get().as_deref(), Some(server.address()));

        server.shutdown().await?;
        assert_eq!(metadata_host::get(), None);
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn shutdown_is_idempotent() -> anyhow::Result<()> {
        let _guard = ScopedEnv::remove(METADATA_HOST_ENV);
        let server = Builder::new().start().await?;
        server.shutdown().await?;
        server.shutdown().await?;
        server.close();
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn explicit_port_is_honored() -> anyhow::Result<()> {
        let _guard = ScopedEnv::remove(METADATA_HOST_ENV);
        let probe = TcpListener::bind("127.0.0.1:0").await?;
        let port = probe.local_addr()?.port();
        drop(probe);

        let server = Builder::new().with_port(port).start().await?;
        assert_eq!(server.local_addr().port(), port);
        server.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn binding_a_taken_port_fails() -> anyhow::Result<()> {
        let _guard = ScopedEnv::remove(METADATA_HOST_ENV);
        let taken = TcpListener::bind("127.0.0.1:0").await?;
        let port = taken.local_addr()?.port();

        let result = Builder::new()
            .with_host("127.0.0.1")
            .with_port(port)
            .start()
            .await;
        assert!(matches!(result, Err(Error::Bind { .. })), "{result:?}");
        // A failed start must not leave the address published.
        assert_eq!(metadata_host::get(), None);
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn strategy_swap_is_visible_to_state() -> anyhow::Result<()> {
        let _guard = ScopedEnv::remove(METADATA_HOST_ENV);
        let server = Builder::new().start().await?;
        assert_eq!(server.state.strategy(), CredentialStrategy::None);

        server.set_credential_strategy(CredentialStrategy::Impersonate(
            "target@proj.iam.gserviceaccount.com".to_string(),
        ));
        assert_eq!(
            server.state.strategy(),
            CredentialStrategy::Impersonate("target@proj.iam.gserviceaccount.com".to_string())
        );
        server.shutdown().await?;
        Ok(())
    }
}
