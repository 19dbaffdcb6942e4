//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve the configured address (IP literal or hostname)
//! - Bind synchronously so start hooks fail fast on bad addresses
//! - Distinguish "address is nonsense" from "address is in use"

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address could not be parsed or resolved.
    #[error("invalid bind address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Failed to bind to a resolved address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve `address` and bind a TCP listener to it.
pub async fn bind(address: &str) -> Result<TcpListener, ListenerError> {
    let addr = resolve(address).await?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    tracing::debug!(
        requested = %address,
        address = %local_addr,
        "Listener bound"
    );

    Ok(listener)
}

async fn resolve(address: &str) -> Result<SocketAddr, ListenerError> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let invalid = |reason: String| ListenerError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    tokio::net::lookup_host(address)
        .await
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("resolved to no addresses".to_string()))
}
