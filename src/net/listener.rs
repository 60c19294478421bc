//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Resolve the configured host to an IPv4 bind address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Host name lookup failed.
    Resolve(std::io::Error),
    /// The host has no IPv4 address.
    NoIpv4Address(String),
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
    /// The connection limit semaphore was closed.
    Closed,
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Resolve(e) => write!(f, "Failed to resolve host: {}", e),
            ListenerError::NoIpv4Address(host) => write!(f, "No IPv4 address for {}", host),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
            ListenerError::Closed => write!(f, "Listener closed"),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Resolve `host` and pick the first IPv4 address.
pub async fn resolve_bind_address(host: &str, port: u16) -> Result<SocketAddr, ListenerError> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(ListenerError::Resolve)?;

    addrs
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ListenerError::NoIpv4Address(host.to_string()))
}

/// A bounded TCP listener that limits concurrent connections.
///
/// When the limit is reached, accepting waits until a slot becomes available.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Bind to `addr` with connection limits.
    pub async fn bind(addr: SocketAddr, max_connections: usize) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(ListenerError::Bind)?;

        let local_addr = listener
            .local_addr()
            .map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr.ip(),
            port = local_addr.port(),
            max_connections,
            "Server started at {}",
            local_addr
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A permit representing a connection slot.
///
/// Dropping it releases the slot, even if the connection task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_ipv4_literal() {
        let addr = resolve_bind_address("127.0.0.1", 3000).await.unwrap();
        assert_eq!(addr, "127.0.0.1:3000".parse().unwrap());
    }

    #[tokio::test]
    async fn ipv6_only_host_has_no_ipv4_address() {
        let err = resolve_bind_address("::1", 3000).await.unwrap_err();
        assert!(matches!(err, ListenerError::NoIpv4Address(_)));
    }

    #[tokio::test]
    async fn permits_are_held_per_connection() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 2).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
        assert_eq!(listener.max_connections(), 2);
    }
}
