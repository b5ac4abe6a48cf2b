// crates/planguard-plugin/src/client.rs
// ============================================================================
// Module: Plugin Provider Client
// Description: Spawn a provider binary and drive it over tfplugin5 gRPC.
// Purpose: Implement the core ProviderServer seam for real providers.
// Dependencies: planguard-core, prost, tokio, tonic, tower
// ============================================================================

//! ## Overview
//! The client spawns the provider with the handshake environment, reads the
//! announcement line from stdout, connects a gRPC channel to the announced
//! Unix socket or TCP address, and exposes the protocol's unary calls behind
//! the synchronous [`planguard_core::ProviderServer`] trait. A private tokio
//! runtime owns all I/O; callers stay synchronous. The child process is
//! killed when the client drops.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use planguard_core::ApplyResourceChange;
use planguard_core::Diagnostic;
use planguard_core::ProviderError;
use planguard_core::ProviderSchema;
use planguard_core::ProviderServer;
use serde_json::Value;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::process::Child;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::transport::Endpoint;
use tonic::transport::Uri;
use tower::service_fn;

use crate::handshake::Handshake;
use crate::handshake::MAGIC_COOKIE_KEY;
use crate::handshake::MAGIC_COOKIE_VALUE;
use crate::handshake::PROTOCOL_VERSION;
use crate::handshake::ServerAddress;
use crate::proto;
use crate::proto::convert_diagnostics;

/// Terraform version announced on configure.
const TERRAFORM_VERSION: &str = "1.5.7";

/// gRPC method paths.
const GET_SCHEMA_PATH: &str = "/tfplugin5.Provider/GetSchema";
const CONFIGURE_PATH: &str = "/tfplugin5.Provider/Configure";
const APPLY_PATH: &str = "/tfplugin5.Provider/ApplyResourceChange";
const STOP_PATH: &str = "/tfplugin5.Provider/Stop";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Plugin spawn configuration.
#[derive(Debug, Clone)]
pub struct PluginProviderConfig {
    /// Provider binary path.
    pub program: PathBuf,
    /// Extra arguments; providers normally take none.
    pub args: Vec<String>,
    /// Bound on waiting for the announcement line.
    pub handshake_timeout: Duration,
}

impl PluginProviderConfig {
    /// Configuration for a provider binary with default timeouts.
    #[must_use]
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            handshake_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// A running provider process and its gRPC channel.
#[derive(Debug)]
pub struct PluginProvider {
    child: Option<Child>,
    channel: Channel,
    runtime: Runtime,
}

impl PluginProvider {
    /// Spawns the provider binary and completes the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the process cannot be spawned, the
    /// announcement is missing or unsupported, or the channel fails to
    /// connect.
    pub fn spawn(config: PluginProviderConfig) -> Result<Self, ProviderError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|err| ProviderError::Process(err.to_string()))?;

        let (child, channel) = runtime.block_on(spawn_and_connect(&config))?;
        Ok(Self {
            child: Some(child),
            channel,
            runtime,
        })
    }

    fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp, ProviderError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let channel = self.channel.clone();
        self.runtime.block_on(unary_call(channel, path, request))
    }
}

impl ProviderServer for PluginProvider {
    fn schema(&self) -> Result<ProviderSchema, ProviderError> {
        let response: proto::GetProviderSchemaResponse =
            self.unary(GET_SCHEMA_PATH, proto::GetProviderSchemaRequest {})?;

        let provider_block = response
            .provider
            .as_ref()
            .and_then(|schema| schema.block.as_ref())
            .ok_or_else(|| ProviderError::Schema("missing provider block".to_string()))?;
        let provider = proto::block_value_type(provider_block)?;

        let mut resources = std::collections::BTreeMap::new();
        for (type_name, schema) in &response.resource_schemas {
            let Some(block) = schema.block.as_ref() else {
                continue;
            };
            resources.insert(type_name.clone(), proto::block_value_type(block)?);
        }
        tracing::debug!(resources = resources.len(), "provider schema fetched");
        Ok(ProviderSchema {
            provider,
            resources,
        })
    }

    fn configure(&self, config: &Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let request = proto::ConfigureRequest {
            terraform_version: TERRAFORM_VERSION.to_string(),
            config: Some(proto::DynamicValue::from_json(config)?),
        };
        let response: proto::ConfigureResponse = self.unary(CONFIGURE_PATH, request)?;
        Ok(convert_diagnostics(response.diagnostics))
    }

    fn apply_resource_change(
        &self,
        request: ApplyResourceChange,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let planned = proto::DynamicValue::from_json(&request.planned_state)?;
        let config = proto::DynamicValue::from_json(&request.config)?;
        let prior = proto::DynamicValue::from_json(&request.prior_state)?;
        let wire = proto::ApplyResourceChangeRequest {
            type_name: request.type_name,
            prior_state: Some(prior),
            planned_state: Some(planned),
            config: Some(config),
            planned_private: Vec::new(),
            provider_meta: None,
        };
        let response: proto::ApplyResourceChangeResponse = self.unary(APPLY_PATH, wire)?;
        Ok(convert_diagnostics(response.diagnostics))
    }
}

impl Drop for PluginProvider {
    fn drop(&mut self) {
        let channel = self.channel.clone();
        let stop = self.runtime.block_on(async move {
            tokio::time::timeout(
                Duration::from_secs(2),
                unary_call::<proto::StopRequest, proto::StopResponse>(
                    channel,
                    STOP_PATH,
                    proto::StopRequest {},
                ),
            )
            .await
        });
        if stop.is_err() {
            tracing::debug!("provider did not stop in time; killing");
        }
        if let Some(mut child) = self.child.take() {
            let _ = self.runtime.block_on(async move {
                let _ = child.kill().await;
                child.wait().await
            });
        }
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Spawns the provider and connects the announced endpoint.
async fn spawn_and_connect(
    config: &PluginProviderConfig,
) -> Result<(Child, Channel), ProviderError> {
    let mut command = Command::new(&config.program);
    command
        .args(&config.args)
        .env(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE)
        .env("PLUGIN_PROTOCOL_VERSIONS", PROTOCOL_VERSION.to_string())
        .env("PLUGIN_MIN_PORT", "10000")
        .env("PLUGIN_MAX_PORT", "25000")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|err| ProviderError::Process(format!("spawning provider: {err}")))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ProviderError::Process("provider stdout unavailable".to_string()))?;

    let mut lines = BufReader::new(stdout).lines();
    let line = tokio::time::timeout(config.handshake_timeout, lines.next_line())
        .await
        .map_err(|_| ProviderError::Process("handshake timed out".to_string()))?
        .map_err(|err| ProviderError::Process(format!("reading handshake: {err}")))?
        .ok_or_else(|| ProviderError::Process("provider exited before handshake".to_string()))?;

    let handshake = Handshake::parse(&line)
        .map_err(|err| ProviderError::Process(format!("parsing handshake: {err}")))?;
    tracing::debug!(?handshake, "provider announced endpoint");

    let channel = connect(handshake.address).await?;
    Ok((child, channel))
}

/// Connects a channel to the announced address.
async fn connect(address: ServerAddress) -> Result<Channel, ProviderError> {
    match address {
        ServerAddress::Unix(path) => {
            // The URI is a placeholder; the connector dials the socket.
            Endpoint::from_static("http://[::1]:1")
                .connect_with_connector(service_fn(move |_: Uri| {
                    UnixStream::connect(path.clone())
                }))
                .await
                .map_err(|err| ProviderError::Transport(err.to_string()))
        }
        ServerAddress::Tcp(addr) => Endpoint::try_from(format!("http://{addr}"))
            .map_err(|err| ProviderError::Transport(err.to_string()))?
            .connect()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string())),
    }
}

/// Issues one unary call on the channel.
async fn unary_call<Req, Resp>(
    channel: Channel,
    path: &'static str,
    request: Req,
) -> Result<Resp, ProviderError>
where
    Req: prost::Message + Send + Sync + 'static,
    Resp: prost::Message + Default + Send + Sync + 'static,
{
    let mut grpc = tonic::client::Grpc::new(channel);
    grpc.ready()
        .await
        .map_err(|err| ProviderError::Transport(format!("service not ready: {err}")))?;
    let codec: tonic::codec::ProstCodec<Req, Resp> = tonic::codec::ProstCodec::default();
    let path = PathAndQuery::from_static(path);
    let response = grpc
        .unary(tonic::Request::new(request), path, codec)
        .await
        .map_err(|status| ProviderError::Transport(status.to_string()))?;
    Ok(response.into_inner())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use planguard_core::ProviderError;

    use super::PluginProvider;
    use super::PluginProviderConfig;

    #[test]
    fn spawn_fails_for_missing_binaries() {
        let config = PluginProviderConfig::new("/nonexistent/terraform-provider-azurerm".into());
        let err = PluginProvider::spawn(config).unwrap_err();
        assert!(matches!(err, ProviderError::Process(_)));
    }
}
