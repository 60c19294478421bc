//! Server context: configuration, module registry and the accept loop.
//!
//! One `Server` value owns everything a running instance needs, so several
//! independent servers can live in one process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_rustls::TlsAcceptor;

use crate::config::ServerConfig;
use crate::extensions::builtin::default_catalog;
use crate::extensions::{ExtensionLoader, ModuleRegistry};
use crate::lifecycle::StartupError;
use crate::net::{
    load_tls_config, resolve_bind_address, ConnectionState, ConnectionTracker, Listener,
    ListenerError, Session, SessionEnd, SessionLimits,
};
use crate::routing::Router;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long to wait before accepting again, or `None` when the listener is done.
fn accept_backoff(error: &ListenerError) -> Option<Duration> {
    match error {
        ListenerError::Closed => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

pub struct Server {
    config: Arc<ServerConfig>,
    registry: ModuleRegistry,
    router: Router,
    tls: Option<TlsAcceptor>,
    tracker: ConnectionTracker,
}

impl Server {
    /// Initialize the registry and load certificate material.
    pub fn new(config: ServerConfig, loader: Arc<dyn ExtensionLoader>) -> Result<Self, StartupError> {
        let registry = ModuleRegistry::initialize(&config.extensions, loader)?;

        let tls = match &config.tls {
            Some(tls) => Some(
                load_tls_config(&tls.cert_path, &tls.key_path).map_err(StartupError::Tls)?,
            ),
            None => None,
        };

        Ok(Self {
            router: Router::new(&config.protocol),
            config: Arc::new(config),
            registry,
            tls,
            tracker: ConnectionTracker::new(),
        })
    }

    /// Build a server whose loader is the built-in catalog.
    pub fn with_default_catalog(config: ServerConfig) -> Result<Self, StartupError> {
        let catalog = default_catalog(&config);
        Self::new(config, Arc::new(catalog))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Run the bootstrap extension's `start`. Failures are logged.
    pub fn startup(&self) -> bool {
        match self.registry.bootstrap().start() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Startup module failed to start");
                false
            }
        }
    }

    /// Resolve the configured host and bind the listener.
    pub async fn bind(&self) -> Result<Listener, StartupError> {
        let listener = &self.config.listener;
        let addr = resolve_bind_address(&listener.host, listener.port).await?;
        Ok(Listener::bind(addr, listener.max_connections).await?)
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// Each connection is handled in its own task. Accept errors are logged
    /// and retried after a short pause; a closed listener ends the loop.
    pub async fn serve(self: Arc<Self>, listener: Listener, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Listener stopping");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let server = Arc::clone(&self);
                        tokio::spawn(async move {
                            server.handle_connection(stream, peer).await;
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept failed");
                        match accept_backoff(&e) {
                            Some(delay) => tokio::time::sleep(delay).await,
                            None => break,
                        }
                    }
                },
            }
        }
    }

    /// Select the transport for one connection and run its session.
    pub async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) -> Option<SessionEnd> {
        let guard = self.tracker.track();
        let limits = SessionLimits::from(&self.config.listener);
        let mut session = Session::new(guard.id(), peer, &self.router, limits);

        if !self.registry.bootstrap().certificate_exists() {
            return Some(session.run(stream).await);
        }

        let Some(acceptor) = &self.tls else {
            tracing::error!(connection_id = %guard.id(), "Certificate reported but no TLS material loaded");
            return None;
        };

        session.transition(ConnectionState::Handshaking);
        let handshake = tokio::time::timeout(
            self.config.listener.handshake_timeout(),
            acceptor.accept(stream),
        )
        .await;

        match handshake {
            Ok(Ok(tls)) => {
                tracing::debug!(connection_id = %guard.id(), peer = %peer, "TLS handshake completed");
                Some(session.run(tls).await)
            }
            Ok(Err(e)) => {
                tracing::warn!(connection_id = %guard.id(), peer = %peer, error = %e, "TLS handshake failed");
                None
            }
            Err(_) => {
                tracing::warn!(connection_id = %guard.id(), peer = %peer, "TLS handshake timed out");
                None
            }
        }
    }
}
