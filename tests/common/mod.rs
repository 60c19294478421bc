//! Shared utilities for integration tests.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use artemisa::extensions::ExtensionLoader;
use artemisa::{Server, ServerConfig, Shutdown};
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// A server running on an ephemeral loopback port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub server: Arc<Server>,
    pub shutdown: Shutdown,
    pub root: TempDir,
}

/// Lay out a host root: `System/Startup.ext` plus one unit file per module.
pub fn host_root(modules: &[&str]) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("System")).unwrap();
    fs::create_dir_all(root.path().join("Modules")).unwrap();
    fs::write(root.path().join("System/Startup.ext"), "").unwrap();
    for module in modules {
        fs::write(root.path().join(format!("Modules/{}.ext", module)), "").unwrap();
    }
    root
}

/// Loopback config rooted at `root`.
pub fn config(root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.extensions.root = root.to_path_buf();
    config
}

#[allow(dead_code)]
pub fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Start a server with the built-in catalog.
#[allow(dead_code)]
pub async fn start(root: TempDir, config: ServerConfig) -> TestServer {
    let server = Server::with_default_catalog(config).unwrap();
    launch(root, server).await
}

/// Start a server with a custom loader.
#[allow(dead_code)]
pub async fn start_with_loader(
    root: TempDir,
    config: ServerConfig,
    loader: Arc<dyn ExtensionLoader>,
) -> TestServer {
    let server = Server::new(config, loader).unwrap();
    launch(root, server).await
}

async fn launch(root: TempDir, server: Server) -> TestServer {
    let server = Arc::new(server);
    assert!(server.startup(), "startup module failed");

    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    tokio::spawn(Arc::clone(&server).serve(listener, shutdown.subscribe()));

    TestServer { addr, server, shutdown, root }
}

/// Read one reply: status line, headers, `Content-Length` JSON body.
/// Returns `None` when the server closed the connection first.
#[allow(dead_code)]
pub async fn read_reply<R>(reader: &mut R) -> Option<(String, Value)>
where
    R: AsyncBufRead + Unpin,
{
    let mut status = String::new();
    if reader.read_line(&mut status).await.ok()? == 0 {
        return None;
    }

    let mut length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).await.ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some(value) = header.strip_prefix("Content-Length:") {
            length = value.trim().parse().unwrap();
        }
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.ok()?;
    Some((status.trim_end().to_string(), serde_json::from_slice(&body).unwrap()))
}
