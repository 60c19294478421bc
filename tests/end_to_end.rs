//! Plaintext end-to-end tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use artemisa::extensions::builtin::{StartupExtension, StartupSettings};
use artemisa::extensions::{Catalog, Extension, HostHandle, RegistryError, BOOTSTRAP_NAME};
use artemisa::lifecycle::StartupError;
use artemisa::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

mod common;

#[tokio::test]
async fn get_status_echoes_instruction_and_parameters() {
    let root = common::host_root(&[]);
    let config = common::config(root.path());
    let srv = common::start(root, config).await;

    let stream = TcpStream::connect(srv.addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    writer.write_all(b"GET /status?x=9\n").await.unwrap();
    let (status, body) = common::read_reply(&mut reader).await.expect("reply");

    assert!(status.starts_with("HTTP/1.1 2"), "status line: {}", status);
    assert_eq!(body["code"], 200);
    assert_eq!(body["response"]["instructionPath"], "/status");
    assert_eq!(body["response"]["parameters"]["x"], "9");

    srv.shutdown.trigger();
}

#[tokio::test]
async fn connection_stays_open_across_requests() {
    let root = common::host_root(&[]);
    let config = common::config(root.path());
    let srv = common::start(root, config).await;

    let stream = TcpStream::connect(srv.addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    writer.write_all(b"PUT /nope\n").await.unwrap();
    let (status, body) = common::read_reply(&mut reader).await.expect("not-found reply");
    assert!(status.starts_with("HTTP/1.1 404"));
    assert_eq!(body["code"], 404);

    writer.write_all(b"POST /echo?a=1&b=2\r\n").await.unwrap();
    let (status, body) = common::read_reply(&mut reader).await.expect("second reply");
    assert!(status.starts_with("HTTP/1.1 200"));
    assert_eq!(body["response"]["parameters"]["a"], "1");
    assert_eq!(body["response"]["parameters"]["b"], "2");

    writer.write_all(b"\n").await.unwrap();
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    srv.shutdown.trigger();
}

#[tokio::test]
async fn malformed_line_gets_not_found_and_listener_survives() {
    let root = common::host_root(&[]);
    let config = common::config(root.path());
    let srv = common::start(root, config).await;

    let stream = TcpStream::connect(srv.addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    writer.write_all(b"NONSENSE\n").await.unwrap();
    let (status, _) = common::read_reply(&mut reader).await.expect("not-found reply");
    assert!(status.starts_with("HTTP/1.1 404"));
    assert!(common::read_reply(&mut reader).await.is_none());

    let stream = TcpStream::connect(srv.addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    writer.write_all(b"GET /alive\n").await.unwrap();
    let (status, _) = common::read_reply(&mut reader).await.expect("listener still serving");
    assert!(status.starts_with("HTTP/1.1 200"));

    srv.shutdown.trigger();
}

#[tokio::test]
async fn favicon_request_closes_without_reply() {
    let root = common::host_root(&[]);
    let config = common::config(root.path());
    let srv = common::start(root, config).await;

    let mut stream = TcpStream::connect(srv.addr).await.unwrap();
    stream.write_all(b"GET /favicon.ico\n").await.unwrap();

    let mut rest = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert!(rest.is_empty());

    srv.shutdown.trigger();
}

#[tokio::test]
async fn autoloaded_modules_are_registered_on_startup() {
    let root = common::host_root(&["Echo"]);
    let mut config = common::config(root.path());
    config.extensions.autoload = vec!["Echo".into(), "Missing".into()];
    let srv = common::start(root, config).await;

    assert_eq!(srv.server.registry().module_names(), vec!["Echo", BOOTSTRAP_NAME]);

    srv.shutdown.trigger();
}

#[test]
fn missing_bootstrap_aborts_startup() {
    let root = tempfile::tempdir().unwrap();
    let config = common::config(root.path());

    match Server::with_default_catalog(config) {
        Err(StartupError::Registry(RegistryError::BootstrapMissing(path))) => {
            assert!(path.ends_with("System/Startup.ext"));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("server started without a bootstrap unit"),
    }
}

struct Counted {
    loads: Arc<AtomicUsize>,
    disposes: Arc<AtomicUsize>,
}

impl Extension for Counted {
    fn display_name(&self) -> &str {
        "Counted"
    }
    fn type_name(&self) -> &str {
        "Counted"
    }
    fn attach(&mut self, _host: HostHandle) {}
    fn load(&self) -> bool {
        self.loads.fetch_add(1, Ordering::SeqCst);
        true
    }
    fn dispose(&self) {
        self.disposes.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn modules_change_while_serving() {
    let root = common::host_root(&["Counted"]);
    let config = common::config(root.path());

    let loads = Arc::new(AtomicUsize::new(0));
    let disposes = Arc::new(AtomicUsize::new(0));
    let (l, d) = (Arc::clone(&loads), Arc::clone(&disposes));
    let catalog = Catalog::new(|| Ok(Box::new(StartupExtension::new(StartupSettings::default()))))
        .with_unit("Counted", move || {
            Ok(Box::new(Counted { loads: Arc::clone(&l), disposes: Arc::clone(&d) }))
        });
    let srv = common::start_with_loader(root, config, Arc::new(catalog)).await;
    let registry = srv.server.registry().clone();

    let stream = TcpStream::connect(srv.addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    for round in 0..3 {
        assert!(registry.add_module("Counted"));
        writer.write_all(format!("GET /round?n={}\n", round).as_bytes()).await.unwrap();
        let (_, body) = common::read_reply(&mut reader).await.expect("reply");
        assert_eq!(body["response"]["parameters"]["n"], round.to_string());
        registry.remove_module("Counted");
    }

    assert_eq!(loads.load(Ordering::SeqCst), 3);
    assert_eq!(disposes.load(Ordering::SeqCst), 3);

    srv.shutdown.trigger();
}
