//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Drive one session: read a line, route it, write the reply
//! - Track active connections for graceful shutdown

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::{BodyFormat, ListenerConfig};
use crate::http::ResponseEnvelope;
use crate::routing::{Dispatch, Router};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    Handshaking,
    Reading,
    Dispatching,
    Writing,
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed its side.
    EndOfStream,
    /// An empty request line.
    EmptyLine,
    /// A reserved path was requested.
    EndExchange,
    /// The request line could not be parsed or was not UTF-8; a not-found reply was sent.
    Malformed,
    /// No complete line within the read timeout.
    ReadTimeout,
    /// The line exceeded the maximum length; a not-found reply was sent.
    LineTooLong,
    ReadError,
    WriteError,
}

/// Per-session read bounds.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub read_timeout: Duration,
    pub max_line_bytes: usize,
}

impl From<&ListenerConfig> for SessionLimits {
    fn from(config: &ListenerConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            max_line_bytes: config.max_line_bytes,
        }
    }
}

/// One accepted connection, from first read to close.
pub struct Session<'a> {
    id: ConnectionId,
    peer: SocketAddr,
    router: &'a Router,
    limits: SessionLimits,
    state: ConnectionState,
}

impl<'a> Session<'a> {
    pub fn new(id: ConnectionId, peer: SocketAddr, router: &'a Router, limits: SessionLimits) -> Self {
        Self {
            id,
            peer,
            router,
            limits,
            state: ConnectionState::Accepted,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn transition(&mut self, next: ConnectionState) {
        tracing::trace!(
            connection_id = %self.id,
            from = ?self.state,
            to = ?next,
            "Session state"
        );
        self.state = next;
    }

    /// Serve request lines until the stream ends, errors or is told to stop.
    ///
    /// Lines are answered strictly in arrival order.
    pub async fn run<S>(mut self, stream: S) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        let format = self.router.body_format();

        let end = loop {
            self.transition(ConnectionState::Reading);
            line.clear();

            let read = {
                let mut limited = (&mut reader).take(self.limits.max_line_bytes as u64);
                tokio::time::timeout(self.limits.read_timeout, limited.read_until(b'\n', &mut line))
                    .await
            };

            match read {
                Err(_) => {
                    tracing::debug!(connection_id = %self.id, peer = %self.peer, "Read timed out");
                    break SessionEnd::ReadTimeout;
                }
                Ok(Err(e)) => {
                    tracing::warn!(connection_id = %self.id, peer = %self.peer, error = %e, "Read failed");
                    break SessionEnd::ReadError;
                }
                Ok(Ok(0)) => break SessionEnd::EndOfStream,
                Ok(Ok(n)) if n >= self.limits.max_line_bytes && !line.ends_with(b"\n") => {
                    // A full buffer without a newline is only acceptable as the final line.
                    let at_end = tokio::time::timeout(self.limits.read_timeout, reader.fill_buf())
                        .await
                        .map(|rest| rest.map(|rest| rest.is_empty()));
                    match at_end {
                        Ok(Ok(true)) => {}
                        Ok(Ok(false)) => {
                            tracing::warn!(connection_id = %self.id, peer = %self.peer, "Request line too long");
                            let _ = write_reply(&mut writer, &ResponseEnvelope::not_found(), format).await;
                            break SessionEnd::LineTooLong;
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(connection_id = %self.id, peer = %self.peer, error = %e, "Read failed");
                            break SessionEnd::ReadError;
                        }
                        Err(_) => {
                            tracing::debug!(connection_id = %self.id, peer = %self.peer, "Read timed out");
                            break SessionEnd::ReadTimeout;
                        }
                    }
                }
                Ok(Ok(_)) => {}
            }

            let Ok(text) = std::str::from_utf8(&line) else {
                tracing::warn!(connection_id = %self.id, peer = %self.peer, "Request line is not UTF-8");
                let _ = write_reply(&mut writer, &ResponseEnvelope::not_found(), format).await;
                break SessionEnd::Malformed;
            };

            let request = text.trim_end_matches(['\r', '\n']);
            if request.is_empty() {
                break SessionEnd::EmptyLine;
            }
            tracing::info!(connection_id = %self.id, peer = %self.peer, request, "Request received");

            self.transition(ConnectionState::Dispatching);
            let reply = match self.router.dispatch(request) {
                Ok(Dispatch::Reply(envelope)) => envelope,
                Ok(Dispatch::NotFound) => {
                    tracing::warn!(connection_id = %self.id, peer = %self.peer, "Invalid request");
                    ResponseEnvelope::not_found()
                }
                Ok(Dispatch::EndExchange) => break SessionEnd::EndExchange,
                Err(e) => {
                    tracing::warn!(connection_id = %self.id, peer = %self.peer, error = %e, "Malformed request");
                    let _ = write_reply(&mut writer, &ResponseEnvelope::not_found(), format).await;
                    break SessionEnd::Malformed;
                }
            };

            self.transition(ConnectionState::Writing);
            if let Err(e) = write_reply(&mut writer, &reply, format).await {
                tracing::warn!(connection_id = %self.id, peer = %self.peer, error = %e, "Write failed");
                break SessionEnd::WriteError;
            }
            tracing::debug!(connection_id = %self.id, code = reply.code, "Reply sent");
        };

        self.transition(ConnectionState::Closed);
        let _ = writer.shutdown().await;
        tracing::info!(connection_id = %self.id, peer = %self.peer, reason = ?end, "Stream end");
        end
    }
}

async fn write_reply<W>(writer: &mut W, envelope: &ResponseEnvelope, format: BodyFormat) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(envelope.to_wire(format).as_bytes()).await?;
    writer.flush().await
}

/// Tracks active connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until all connections are closed or `deadline` passes.
    /// Returns whether every connection closed in time.
    pub async fn wait_for_drain(&self, deadline: Duration) -> bool {
        tokio::time::timeout(deadline, async {
            while self.active_count.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .is_ok()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
