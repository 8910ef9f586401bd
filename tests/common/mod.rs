//! Shared utilities for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dynconf::remote::service::{ConfigDataService, FetchResult, SessionRequest};
use dynconf::{ConfigError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

enum Scripted {
    Payload { next: String, body: String },
    Fail(String),
}

/// In-memory config data service driven by per-token scripts.
///
/// A token with nothing scripted answers "unchanged" and hands the same token back.
#[derive(Default)]
pub struct ScriptedService {
    sessions: Mutex<HashMap<String, VecDeque<String>>>,
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    session_calls: Mutex<Vec<String>>,
    fetch_calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Next session opened for `profile` starts at `token`. Unscripted profiles fail.
    pub fn session(&self, profile: &str, token: &str) -> &Self {
        self.sessions
            .lock()
            .unwrap()
            .entry(profile.to_string())
            .or_default()
            .push_back(token.to_string());
        self
    }

    /// Next fetch with `token` returns `body` and hands out `next`.
    pub fn respond(&self, token: &str, next: &str, body: &str) -> &Self {
        self.push(
            token,
            Scripted::Payload {
                next: next.to_string(),
                body: body.to_string(),
            },
        )
    }

    /// Next fetch with `token` fails.
    pub fn fail(&self, token: &str, message: &str) -> &Self {
        self.push(token, Scripted::Fail(message.to_string()))
    }

    fn push(&self, token: &str, scripted: Scripted) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetch_calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.lock().unwrap().len()
    }

    pub fn sessions_opened(&self, profile: &str) -> usize {
        self.session_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == profile)
            .count()
    }
}

#[async_trait]
impl ConfigDataService for ScriptedService {
    async fn start_session(&self, request: &SessionRequest) -> Result<String> {
        let profile = request.configuration_profile_identifier.clone();
        self.session_calls.lock().unwrap().push(profile.clone());
        self.sessions
            .lock()
            .unwrap()
            .get_mut(&profile)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| ConfigError::Service(format!("HTTP 404 Not Found: profile {}", profile)))
    }

    async fn fetch_latest(&self, token: &str) -> Result<FetchResult> {
        self.fetch_calls.lock().unwrap().push(token.to_string());
        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(token)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(Scripted::Payload { next, body }) => Ok(FetchResult {
                next_token: next,
                payload: body.into_bytes(),
            }),
            Some(Scripted::Fail(message)) => Err(ConfigError::Service(message)),
            None => Ok(FetchResult {
                next_token: token.to_string(),
                payload: Vec::new(),
            }),
        }
    }
}

/// A request received by [`start_mock_service`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Minimal HTTP/1.1 stand-in for the AppConfig Data API.
///
/// `POST /configurationsessions` returns token `t1`; `GET /configuration` returns
/// `payload` once and then empty bodies, each with the next token `t2`.
pub async fn start_mock_service(payload: &'static str) -> (SocketAddr, Arc<Mutex<Vec<RecordedRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let log = recorded.clone();

    tokio::spawn(async move {
        let mut served_payload = false;
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            let Some(request) = read_request(&mut socket).await else { continue };

            let (status, content_type, body) =
                if request.method == "POST" && request.target.starts_with("/configurationsessions") {
                    ("201 Created", "application/json", r#"{"InitialConfigurationToken":"t1"}"#.to_string())
                } else if request.method == "GET" && request.target.starts_with("/configuration?") {
                    let body = if served_payload { "" } else { payload };
                    served_payload = true;
                    ("200 OK", "application/octet-stream", body.to_string())
                } else {
                    ("404 Not Found", "application/json", r#"{"Message":"no such route"}"#.to_string())
                };
            log.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nNext-Poll-Configuration-Token: t2\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                content_type,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (addr, recorded)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

/// Replace `dir/name` by writing a sibling file and renaming it over the target, so
/// readers never observe a half-written document.
pub fn replace_file(dir: &Path, name: &str, content: &str) {
    let tmp = dir.join(format!(".{}.tmp", name));
    std::fs::write(&tmp, content).unwrap();
    std::fs::rename(&tmp, dir.join(name)).unwrap();
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_for<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Let spawned tasks run until they block. Under a paused clock this never advances time.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
