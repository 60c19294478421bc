//! End-to-end tests with a certificate configured.

use std::fs::File;
use std::io::BufReader as StdBufReader;
use std::sync::Arc;
use std::time::Duration;

use artemisa::config::TlsConfig;
use artemisa::Server;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsConnector;

mod common;

fn tls_config() -> TlsConfig {
    TlsConfig {
        cert_path: common::fixture("server.pem"),
        key_path: common::fixture("server.key"),
    }
}

fn connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    let mut pem = StdBufReader::new(File::open(common::fixture("ca.pem")).unwrap());
    for cert in rustls_pemfile::certs(&mut pem) {
        roots.add(cert.unwrap()).unwrap();
    }
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

#[tokio::test]
async fn handshake_then_post_gets_reply() {
    let root = common::host_root(&[]);
    let mut config = common::config(root.path());
    config.tls = Some(tls_config());
    let srv = common::start(root, config).await;
    assert!(srv.server.registry().bootstrap().certificate_exists());

    let tcp = TcpStream::connect(srv.addr).await.unwrap();
    let domain = ServerName::try_from("localhost").unwrap();
    let tls = connector().connect(domain, tcp).await.unwrap();

    let (reader, mut writer) = tokio::io::split(tls);
    let mut reader = BufReader::new(reader);
    writer.write_all(b"POST /echo\n").await.unwrap();
    writer.flush().await.unwrap();

    let (status, body) = common::read_reply(&mut reader).await.expect("reply over TLS");
    assert!(status.starts_with("HTTP/1.1 200"));
    assert_eq!(body["response"]["instructionPath"], "/echo");
    assert!(body["response"]["parameters"].as_object().unwrap().is_empty());

    srv.shutdown.trigger();
}

#[tokio::test]
async fn plaintext_client_never_reaches_the_router() {
    let root = common::host_root(&[]);
    let mut config = common::config(root.path());
    config.tls = Some(tls_config());
    let server = Server::with_default_catalog(config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /status?x=9\n").await.unwrap();
        let mut rest = Vec::new();
        // A reset is as good as a clean close here.
        let _ = stream.read_to_end(&mut rest).await;
        rest
    });

    let (stream, peer) = listener.accept().await.unwrap();
    let end = tokio::time::timeout(Duration::from_secs(15), server.handle_connection(stream, peer))
        .await
        .unwrap();
    assert_eq!(end, None, "session must not start without a handshake");

    let rest = client.await.unwrap();
    assert!(!String::from_utf8_lossy(&rest).contains("HTTP/1.1 200"));
    assert_eq!(server.tracker().active_count(), 0);
}

#[tokio::test]
async fn failed_handshake_does_not_stop_the_listener() {
    let root = common::host_root(&[]);
    let mut config = common::config(root.path());
    config.tls = Some(tls_config());
    let srv = common::start(root, config).await;

    let mut bad = TcpStream::connect(srv.addr).await.unwrap();
    bad.write_all(b"GET /status\n").await.unwrap();
    let mut sink = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(15), bad.read_to_end(&mut sink)).await;

    let tcp = TcpStream::connect(srv.addr).await.unwrap();
    let tls = connector()
        .connect(ServerName::try_from("localhost").unwrap(), tcp)
        .await
        .unwrap();
    let (reader, mut writer) = tokio::io::split(tls);
    let mut reader = BufReader::new(reader);
    writer.write_all(b"GET /after\n").await.unwrap();
    writer.flush().await.unwrap();
    let (status, _) = common::read_reply(&mut reader).await.expect("reply after bad client");
    assert!(status.starts_with("HTTP/1.1 200"));

    srv.shutdown.trigger();
}
