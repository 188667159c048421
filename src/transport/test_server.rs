use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Serves the router on an ephemeral local port for the rest of the test. The router is built
///  with the bound address so handlers can produce absolute redirect targets.
pub(crate) fn serve(build: impl FnOnce(SocketAddr) -> Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = axum::Server::from_tcp(listener).unwrap()
        .serve(build(addr).into_make_service());
    tokio::spawn(async move {
        let _ = server.await;
    });
    addr
}

/// Answers every connection with the same raw bytes and closes it, for responses no well
///  behaved server would send.
pub(crate) async fn serve_raw(response: Vec<u8>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        }
    });
    addr
}

/// Like `serve_raw`, but keeps each connection open without sending anything more for `stall`.
pub(crate) async fn serve_stalled(response: Vec<u8>, stall: Duration) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(&response).await;
                tokio::time::sleep(stall).await;
            });
        }
    });
    addr
}
