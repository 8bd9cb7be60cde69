//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use connector_core::pool::{ConnectionFactory, FactoryError};

/// A mock OAuth2 token endpoint.
pub struct MockTokenServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl MockTokenServer {
    pub fn url(&self) -> String {
        format!("http://{}/oauth2/token", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Form bodies received so far.
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

/// Start a programmable token endpoint on an ephemeral port.
///
/// `respond` gets the zero-based request number and returns status and body.
pub async fn start_token_server<F>(respond: F) -> MockTokenServer
where
    F: Fn(usize) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let server_hits = hits.clone();
    let server_bodies = bodies.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let respond = respond.clone();
                    let hits = server_hits.clone();
                    let bodies = server_bodies.clone();
                    tokio::spawn(async move {
                        let body = read_request_body(&mut socket).await.unwrap_or_default();
                        bodies.lock().unwrap().push(body);
                        let n = hits.fetch_add(1, Ordering::SeqCst);
                        let (status, body) = respond(n);

                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason_phrase(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockTokenServer { addr, hits, bodies }
}

/// A token response body as the endpoint would send it.
pub fn token_body(access_token: &str, expires_in: u64) -> String {
    format!(
        r#"{{"access_token":"{}","token_type":"Bearer","expires_in":{}}}"#,
        access_token, expires_in
    )
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn read_request_body(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(String::new());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(String::from_utf8_lossy(&buf[header_end..]).into_owned())
}

/// Connection factory whose backend can be switched up and down.
pub struct SwitchableFactory {
    up: AtomicBool,
    creates: AtomicUsize,
}

impl SwitchableFactory {
    pub fn new(up: bool) -> Self {
        Self {
            up: AtomicBool::new(up),
            creates: AtomicUsize::new(0),
        }
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for SwitchableFactory {
    type Connection = usize;

    async fn create(&self) -> Result<usize, FactoryError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst);
        if self.up.load(Ordering::SeqCst) {
            Ok(n)
        } else {
            Err("connection refused".into())
        }
    }

    fn validate(&self, _conn: &usize) -> bool {
        true
    }
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
