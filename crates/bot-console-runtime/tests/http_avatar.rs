use bot_console_runtime::{AvatarError, AvatarFetcher, HttpAvatarFetcher};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response on a local port and return its URL.
async fn serve_once(response: &'static str) -> String {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => panic!("bind failed: {err}"),
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("local_addr failed: {err}"),
    };

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    format!("http://{addr}/avatar.png")
}

#[tokio::test]
async fn fetches_image_bytes() {
    let url = serve_once(
        "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 4\r\nConnection: close\r\n\r\nPNG!",
    )
    .await;
    let fetcher = HttpAvatarFetcher::new(Duration::from_secs(5));

    match fetcher.fetch(&url).await {
        Ok(bytes) => assert_eq!(&bytes[..], b"PNG!"),
        Err(err) => panic!("fetch failed: {err}"),
    }
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let url = serve_once(
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let fetcher = HttpAvatarFetcher::new(Duration::from_secs(5));

    assert_eq!(fetcher.fetch(&url).await, Err(AvatarError::Status(404)));
}

#[tokio::test]
async fn empty_body_is_an_error() {
    let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
    let fetcher = HttpAvatarFetcher::new(Duration::from_secs(5));

    assert_eq!(fetcher.fetch(&url).await, Err(AvatarError::Empty));
}

#[tokio::test]
async fn unreachable_host_is_a_request_error() {
    // Bind then drop to get a port with nothing listening.
    let port = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => match listener.local_addr() {
            Ok(addr) => addr.port(),
            Err(err) => panic!("local_addr failed: {err}"),
        },
        Err(err) => panic!("bind failed: {err}"),
    };
    let fetcher = HttpAvatarFetcher::new(Duration::from_secs(5));

    let result = fetcher
        .fetch(&format!("http://127.0.0.1:{port}/avatar.png"))
        .await;
    assert!(matches!(result, Err(AvatarError::Request(_))));
}
