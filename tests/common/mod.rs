//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock upstream that answers every request with `body` and the
/// given extra header lines. Returns the address it listens on.
pub async fn start_mock_backend(
    body: &'static str,
    headers: &'static [(&'static str, &'static str)],
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;

                let extra: String = headers
                    .iter()
                    .map(|(name, value)| format!("{}: {}\r\n", name, value))
                    .collect();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
                    body.len(),
                    extra,
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    addr
}

/// Pick a free local port for the server under test.
#[allow(dead_code)]
pub async fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
