//! Client and server talking over a real socket.

use keeper_client::{ClientError, ClientSession, RpcRemote, SecretCache, SecretRemote, SecretService};
use keeper_core::config::{Config, ConfigBuilder};
use keeper_core::{SecretString, SecretType};
use keeper_integration_tests::codec;
use keeper_secrets::SecretContent;
use keeper_server::{SecretServer, SqliteSecretStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn server_config() -> ConfigBuilder {
    ConfigBuilder::new()
        .token("alice-token", "alice")
        .token("bob-token", "bob")
}

async fn start_server() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    start_server_with(server_config().build()).await
}

async fn start_server_with(config: Config) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    let store = SqliteSecretStore::in_memory().await.unwrap();
    let server = SecretServer::new(&config.server, Arc::new(store)).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let shutdown = async {
            let _ = stopped.await;
        };
        server.serve(listener, shutdown).await.unwrap();
    });
    (addr, stop, task)
}

fn remote(addr: SocketAddr, token: &str) -> Arc<dyn SecretRemote> {
    Arc::new(RpcRemote::http(&format!("http://{addr}"), SecretString::new(token)).unwrap())
}

#[tokio::test]
async fn test_session_over_http() {
    let (addr, stop, task) = start_server().await;

    let (session, report) =
        ClientSession::open(remote(addr, "alice-token"), codec(1), Duration::from_secs(60))
            .await
            .unwrap();
    assert!(report.is_clean());
    let service = session.service();

    let id = service
        .create("note", SecretContent::text("hello"))
        .await
        .unwrap();
    service
        .edit(id, "note", SecretContent::text("world"), false)
        .await
        .unwrap();

    let listed = service.list(SecretType::Text).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title(), "note");

    // bob shares the server but not the secret
    let bob = remote(addr, "bob-token");
    assert!(matches!(bob.get_secret(id).await, Err(ClientError::NotFound(_))));

    session.close().await;
    drop(bob);
    let _ = stop.send(());
    task.await.unwrap();
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let (addr, stop, task) = start_server().await;

    let intruder = remote(addr, "guess");
    let result = intruder.list_secrets_by_type(SecretType::Text).await;
    assert!(matches!(result, Err(ClientError::Auth(_))));

    drop(intruder);
    let _ = stop.send(());
    task.await.unwrap();
}

#[tokio::test]
async fn test_connect_from_config_reports_initial_sync() {
    let (addr, stop, task) = start_server().await;

    let mut config = server_config()
        .server_url(format!("http://{addr}"))
        .build();
    config.client.token = Some(SecretString::new("alice-token"));

    let (session, report) = ClientSession::connect(&config.client, codec(1))
        .await
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.total_synced(), 0);

    session.close().await;
    let _ = stop.send(());
    task.await.unwrap();
}

#[tokio::test]
async fn test_multi_megabyte_binary_over_http() {
    let (addr, stop, task) = start_server().await;
    let service = SecretService::new(
        remote(addr, "alice-token"),
        codec(1),
        Arc::new(SecretCache::new()),
    );

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("photo.raw");
    let target = dir.path().join("photo.out");
    let bytes: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    std::fs::write(&source, &bytes).unwrap();

    let id = service.create_binary("photo", &source).await.unwrap();
    service.get_binary(id, &target).await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), bytes);

    drop(service);
    let _ = stop.send(());
    task.await.unwrap();
}

#[tokio::test]
async fn test_body_over_configured_limit_is_refused() {
    let (addr, stop, task) = start_server_with(server_config().max_body_bytes(4096).build()).await;
    let service = SecretService::new(
        remote(addr, "alice-token"),
        codec(1),
        Arc::new(SecretCache::new()),
    );

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("big.bin");
    std::fs::write(&source, vec![9u8; 16 * 1024]).unwrap();

    assert!(service.create_binary("big", &source).await.is_err());
    assert!(service.list_binary().await.unwrap().is_empty());

    drop(service);
    let _ = stop.send(());
    task.await.unwrap();
}
