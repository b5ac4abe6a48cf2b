// crates/planguard-plugin/src/lib.rs
// ============================================================================
// Module: Planguard Plugin Client
// Description: Terraform provider plugin protocol client.
// Purpose: Drive a provider binary over the published tfplugin5 ABI.
// Dependencies: planguard-core, prost, tonic, tokio
// ============================================================================

//! ## Overview
//! Terraform providers are standalone executables that announce a gRPC
//! endpoint on stdout and then serve the versioned tfplugin5 protocol. This
//! crate spawns the binary, completes the go-plugin handshake, and implements
//! the core [`planguard_core::ProviderServer`] seam over the four operations
//! the pipeline needs. Dynamic values are JSON-encoded, which the protocol
//! accepts alongside msgpack.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod discover;
pub mod handshake;
pub mod proto;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::PluginProvider;
pub use client::PluginProviderConfig;
pub use discover::find_provider_binary;
pub use handshake::Handshake;
pub use handshake::HandshakeError;
pub use handshake::ServerAddress;
