// crates/planguard-plugin/src/handshake.rs
// ============================================================================
// Module: Plugin Handshake
// Description: go-plugin handshake environment and announcement parsing.
// Purpose: Locate the gRPC endpoint a spawned provider announces.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A provider binary launched with the magic cookie in its environment
//! prints a single announcement line on stdout:
//! `CORE-VERSION|PROTOCOL-VERSION|NETWORK|ADDRESS|PROTOCOL[|TLS-CERT]`.
//! Only core version 1, protocol version 5, and gRPC transports are
//! accepted; the network is a Unix socket path or a TCP address.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Environment key carrying the magic cookie.
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";

/// Magic cookie value expected by Terraform providers.
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Plugin protocol version this client speaks.
pub const PROTOCOL_VERSION: u32 = 5;

/// go-plugin core protocol version this client understands.
const CORE_PROTOCOL_VERSION: u32 = 1;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Handshake parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    /// The announcement line had fewer than five fields.
    #[error("malformed handshake line: {0}")]
    Malformed(String),
    /// The core protocol version is not supported.
    #[error("unsupported core protocol version: {0}")]
    CoreVersion(String),
    /// The plugin protocol version is not the one this client speaks.
    #[error("unsupported plugin protocol version: {0}")]
    ProtocolVersion(String),
    /// The network type is not unix or tcp.
    #[error("unsupported network type: {0}")]
    Network(String),
    /// The transport is not gRPC.
    #[error("unsupported transport: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Handshake
// ============================================================================

/// Announced server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAddress {
    /// Unix domain socket path.
    Unix(PathBuf),
    /// TCP host:port address.
    Tcp(String),
}

/// Parsed announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// go-plugin core protocol version.
    pub core_version: u32,
    /// Plugin protocol version.
    pub protocol_version: u32,
    /// Where the server listens.
    pub address: ServerAddress,
}

impl Handshake {
    /// Parses the announcement line.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError`] when any field is missing or unsupported.
    pub fn parse(line: &str) -> Result<Self, HandshakeError> {
        let line = line.trim();
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 5 {
            return Err(HandshakeError::Malformed(line.to_string()));
        }

        let core_version: u32 = parts[0]
            .parse()
            .map_err(|_| HandshakeError::CoreVersion(parts[0].to_string()))?;
        if core_version != CORE_PROTOCOL_VERSION {
            return Err(HandshakeError::CoreVersion(parts[0].to_string()));
        }

        let protocol_version: u32 = parts[1]
            .parse()
            .map_err(|_| HandshakeError::ProtocolVersion(parts[1].to_string()))?;
        if protocol_version != PROTOCOL_VERSION {
            return Err(HandshakeError::ProtocolVersion(parts[1].to_string()));
        }

        let address = match parts[2] {
            "unix" => ServerAddress::Unix(PathBuf::from(parts[3])),
            "tcp" => ServerAddress::Tcp(parts[3].to_string()),
            other => return Err(HandshakeError::Network(other.to_string())),
        };

        if parts[4] != "grpc" {
            return Err(HandshakeError::Transport(parts[4].to_string()));
        }

        Ok(Self {
            core_version,
            protocol_version,
            address,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::Handshake;
    use super::HandshakeError;
    use super::ServerAddress;

    #[test]
    fn parses_unix_announcements() {
        let handshake = Handshake::parse("1|5|unix|/tmp/plugin123|grpc\n").unwrap();
        assert_eq!(handshake.core_version, 1);
        assert_eq!(handshake.protocol_version, 5);
        assert_eq!(
            handshake.address,
            ServerAddress::Unix(PathBuf::from("/tmp/plugin123"))
        );
    }

    #[test]
    fn parses_tcp_announcements_with_certificates() {
        let handshake = Handshake::parse("1|5|tcp|127.0.0.1:10000|grpc|dGVzdA==").unwrap();
        assert_eq!(
            handshake.address,
            ServerAddress::Tcp("127.0.0.1:10000".to_string())
        );
    }

    #[test]
    fn rejects_unsupported_announcements() {
        assert_eq!(
            Handshake::parse("1|5|unix|/tmp/x"),
            Err(HandshakeError::Malformed("1|5|unix|/tmp/x".to_string()))
        );
        assert!(matches!(
            Handshake::parse("2|5|unix|/tmp/x|grpc"),
            Err(HandshakeError::CoreVersion(_))
        ));
        assert!(matches!(
            Handshake::parse("1|6|unix|/tmp/x|grpc"),
            Err(HandshakeError::ProtocolVersion(_))
        ));
        assert!(matches!(
            Handshake::parse("1|5|pipe|name|grpc"),
            Err(HandshakeError::Network(_))
        ));
        assert!(matches!(
            Handshake::parse("1|5|unix|/tmp/x|netrpc"),
            Err(HandshakeError::Transport(_))
        ));
    }
}
