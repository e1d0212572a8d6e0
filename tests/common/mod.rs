//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use path_proxy::{encode, HttpServer, ProxyConfig, Shutdown, TargetOrigin};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What a mock backend answers with.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn html(body: &str) -> Self {
        Self::new(200)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(body)
    }
}

/// Bind an ephemeral local port.
pub async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a programmable mock backend.
///
/// Every parsed request is handed to `f` and also sent on the returned
/// channel, so tests can assert on what actually reached the origin.
pub async fn start_programmable_backend<F, Fut>(
    f: F,
) -> (SocketAddr, mpsc::UnboundedReceiver<CapturedRequest>)
where
    F: Fn(CapturedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let (listener, addr) = bind_local().await;
    let (tx, rx) = mpsc::unbounded_channel();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut socket = BufReader::new(socket);
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let _ = tx.send(request.clone());
                let response = f(request).await;
                let mut socket = socket.into_inner();
                let _ = socket.write_all(&serialize(&response)).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Start a backend that always returns the same response.
pub async fn start_mock_backend(
    response: MockResponse,
) -> (SocketAddr, mpsc::UnboundedReceiver<CapturedRequest>) {
    start_programmable_backend(move |_| {
        let response = response.clone();
        async move { response }
    })
    .await
}

/// Start a backend that accepts connections and never answers.
pub async fn start_stalled_backend() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    drop(listener);
    addr
}

/// Config suited to tests: ephemeral port, no static files, short timeouts.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.static_files.enabled = false;
    config.timeouts.connect_secs = 1;
    config.timeouts.upstream_secs = 2;
    config
}

/// Run the proxy on an ephemeral port until the returned `Shutdown` fires.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let (listener, addr) = bind_local().await;
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Client that neither follows redirects nor honours proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .no_proxy()
        .build()
        .unwrap()
}

/// `http://<proxy>/proxy/<token>` for a target URL.
pub fn proxy_url(proxy: SocketAddr, target: &str) -> String {
    format!("http://{}/proxy/{}", proxy, token_for(target))
}

pub fn token_for(target: &str) -> String {
    encode(&TargetOrigin::parse(target).unwrap()).to_string()
}

async fn read_request(socket: &mut BufReader<TcpStream>) -> Option<CapturedRequest> {
    let mut line = String::new();
    socket.read_line(&mut line).await.ok()?;
    let mut parts = line.trim_end().splitn(3, ' ');
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if socket.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let find = |name: &str| {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    let mut body = Vec::new();
    if let Some(len) = find("content-length").and_then(|v| v.parse::<usize>().ok()) {
        body.resize(len, 0);
        socket.read_exact(&mut body).await.ok()?;
    } else if find("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        loop {
            let mut size = String::new();
            socket.read_line(&mut size).await.ok()?;
            let size = usize::from_str_radix(size.trim(), 16).ok()?;
            let mut chunk = vec![0; size + 2];
            socket.read_exact(&mut chunk).await.ok()?;
            if size == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..size]);
        }
    }

    Some(CapturedRequest {
        method,
        target,
        headers,
        body,
    })
}

fn serialize(response: &MockResponse) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {} Mock\r\n", response.status);
    for (name, value) in &response.headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body.len()
    ));
    let mut out = out.into_bytes();
    out.extend_from_slice(&response.body);
    out
}
