use color_eyre::eyre::{Result, eyre};
use kvsrv::common::{spawn_test_server, spawn_test_server_with_config};
use kvsrv::http::{HttpConfig, KvClient, KvServer};
use kvsrv::{KvError, KvServerTrait};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn test_put_get_missing_scenario() -> Result<()> {
    let server = spawn_test_server().await?;
    let mut client = KvClient::connect(server.addr).await?;

    assert_eq!(client.put("color", "red").await?, "Updated: data[color] = red");
    assert_eq!(client.get("color").await?, "Read entry: data[color] = red");
    assert_eq!(client.get("missing").await?, "Read entry: data[missing] = ");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_list_empty_then_populated() -> Result<()> {
    let server = spawn_test_server().await?;
    let mut client = KvClient::connect(server.addr).await?;

    assert_eq!(client.list().await?, "Read list: ");

    client.put("k2", "v2").await?;
    client.put("k1", "v1").await?;
    assert_eq!(client.list().await?, "Read list: k1:v1, k2:v2");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_overwrite_and_idempotent_put() -> Result<()> {
    let server = spawn_test_server().await?;
    let mut client = KvClient::connect(server.addr).await?;

    client.put("k", "a").await?;
    client.put("k", "b").await?;
    client.put("k", "b").await?;

    assert_eq!(client.get("k").await?, "Read entry: data[k] = b");
    assert_eq!(server.store.len(), 1);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_unmatched_routes_are_not_found() -> Result<()> {
    let server = spawn_test_server().await?;
    let mut client = KvClient::connect(server.addr).await?;

    for (method, target) in [
        (http::Method::GET, "/"),
        (http::Method::GET, "/entry/"),
        (http::Method::POST, "/entry/k/v"),
        (http::Method::DELETE, "/entry/k"),
        (http::Method::GET, "/entry/k/v"),
        (http::Method::PUT, "/list"),
    ] {
        let (status, body) = client.request(method.clone(), target).await?;
        assert_eq!(status, http::StatusCode::NOT_FOUND, "{method} {target}");
        assert_eq!(body, "404 page not found");
    }
    assert!(server.store.is_empty());

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_percent_encoded_keys_and_values() -> Result<()> {
    let server = spawn_test_server().await?;
    let mut client = KvClient::connect(server.addr).await?;

    assert_eq!(
        client.put("favourite color", "dark red").await?,
        "Updated: data[favourite color] = dark red"
    );
    assert_eq!(server.store.get("favourite color").as_deref(), Some("dark red"));
    assert_eq!(
        client.get("favourite color").await?,
        "Read entry: data[favourite color] = dark red"
    );

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_store_is_shared_between_connections() -> Result<()> {
    let server = spawn_test_server().await?;

    let mut writer = KvClient::connect(server.addr).await?;
    let mut reader = KvClient::connect(server.addr).await?;

    writer.put("shared", "yes").await?;
    assert_eq!(reader.get("shared").await?, "Read entry: data[shared] = yes");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_many_requests_on_one_connection() -> Result<()> {
    let server = spawn_test_server().await?;
    let mut client = KvClient::connect(server.addr).await?;

    for i in 0..50 {
        client.put(&format!("key{i}"), &format!("value{i}")).await?;
    }
    for i in 0..50 {
        assert_eq!(
            client.get(&format!("key{i}")).await?,
            format!("Read entry: data[key{i}] = value{i}")
        );
    }
    assert_eq!(server.store.len(), 50);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_pipelined_requests() -> Result<()> {
    let server = spawn_test_server().await?;
    let mut stream = TcpStream::connect(server.addr).await?;

    stream
        .write_all(
            b"PUT /entry/a/1 HTTP/1.1\r\n\r\n\
              GET /entry/a HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .await?;

    let mut response = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response)).await??;

    assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 2);
    assert!(response.contains("Updated: data[a] = 1"));
    assert!(response.ends_with("Read entry: data[a] = 1"));

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_multiple_concurrent_clients() -> Result<()> {
    let server = spawn_test_server().await?;
    let addr = server.addr;

    let mut handles = Vec::new();
    for i in 0..10 {
        handles.push(tokio::spawn(async move {
            let mut client = KvClient::connect(addr).await?;
            client.put(&format!("client{i}"), &format!("{i}")).await?;
            Ok::<(), KvError>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let snapshot = server.store.list();
    assert_eq!(snapshot.len(), 10);
    for i in 0..10 {
        assert_eq!(snapshot.get(&format!("client{i}")), Some(i.to_string().as_str()));
    }

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_writers_same_key() -> Result<()> {
    let server = spawn_test_server().await?;
    let addr = server.addr;

    let writers = ["A", "B"].map(|value| {
        tokio::spawn(async move {
            let mut client = KvClient::connect(addr).await?;
            client.put("k", value).await?;
            Ok::<(), KvError>(())
        })
    });
    for writer in writers {
        writer.await??;
    }

    let mut client = KvClient::connect(addr).await?;
    let body = client.get("k").await?;
    assert!(
        body == "Read entry: data[k] = A" || body == "Read entry: data[k] = B",
        "unexpected body {body:?}"
    );

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_connection_limit() -> Result<()> {
    let config = HttpConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
        .with_max_connections(1)
        .with_read_timeout(Duration::from_secs(5));
    let server = spawn_test_server_with_config(config).await?;

    let mut first = KvClient::connect(server.addr).await?;
    first.put("k", "v").await?;

    // The second connection is accepted and immediately dropped
    let mut second = TcpStream::connect(server.addr).await?;
    second.write_all(b"GET /list HTTP/1.1\r\n\r\n").await.ok();
    let mut buf = [0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(5), second.read(&mut buf))
        .await?
        .unwrap_or(0);
    assert_eq!(n, 0);

    assert_eq!(first.get("k").await?, "Read entry: data[k] = v");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_bind_failure_is_reported() -> Result<()> {
    let occupied = TcpListener::bind("127.0.0.1:0").await?;
    let addr = occupied.local_addr()?;

    let server = KvServer::new(HttpConfig::new(addr));
    match server.run().await {
        Err(KvError::Bind { addr: failed, .. }) => assert_eq!(failed, addr),
        other => return Err(eyre!("expected bind error, got {other:?}")),
    }
    Ok(())
}

#[tokio::test]
async fn test_shutdown_signal_stops_server() -> Result<()> {
    let server = KvServer::new(HttpConfig::new(SocketAddr::from(([127, 0, 0, 1], 0))));
    let shutdown = server.shutdown_signal();
    let listener = server.bind().await?;
    let shutdown_rx = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.serve_with_shutdown(listener, shutdown_rx).await });
    shutdown.send(()).map_err(|e| eyre!("no receiver: {e}"))?;

    tokio::time::timeout(Duration::from_secs(5), handle).await???;
    Ok(())
}
