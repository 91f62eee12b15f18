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

//! Runs a fake GCE instance metadata server until interrupted.

use clap::{Parser, ValueEnum};
use fake_metadata_server::{Builder, StubPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StubPolicyArg {
    /// Empty 200 bodies, like the real service's unpopulated entries.
    Empty,
    /// 404 for stubbed entries.
    NotFound,
    /// 501 for stubbed entries.
    NotImplemented,
}

impl From<StubPolicyArg> for StubPolicy {
    fn from(arg: StubPolicyArg) -> Self {
        match arg {
            StubPolicyArg::Empty => StubPolicy::Empty,
            StubPolicyArg::NotFound => StubPolicy::NotFound,
            StubPolicyArg::NotImplemented => StubPolicy::NotImplemented,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "A fake GCE instance metadata server", version)]
struct Args {
    /// Interface to bind.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port to listen on; picks a free port when omitted.
    #[arg(long)]
    port: Option<u16>,

    /// How endpoints without real values respond.
    #[arg(long, value_enum, default_value_t = StubPolicyArg::Empty)]
    stub_policy: StubPolicyArg,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut builder = Builder::new()
        .with_host(args.host)
        .with_stub_policy(args.stub_policy.into());
    if let Some(port) = args.port {
        builder = builder.with_port(port);
    }

    let server = builder.start().await?;
    tracing::info!(address = server.address(), "press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    server.shutdown().await?;
    Ok(())
}
