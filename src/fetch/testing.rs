//! In-memory transport for engine tests.

use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::TransportError;
use async_trait::async_trait;
use base64::Engine as _;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Scripted = Result<HttpResponse, TransportError>;

/// Answers by exact URL. Each URL replays its queue in order and then keeps
/// repeating the last entry; unknown URLs get a 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(self, url: &str, response: Scripted) -> Self {
        self.routes
            .lock()
            .expect("routes")
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().expect("log").clone()
    }

    pub(crate) fn count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.log.lock().expect("log").push(request.clone());
        let mut routes = self.routes.lock().expect("routes");
        let Some(queue) = routes.get_mut(&request.url) else {
            return Ok(reply(&request.url, 404, &[], br#"{"message":"Not Found"}"#));
        };
        let next = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
        match next.expect("scripted response") {
            Ok(mut response) => {
                if let Some(limit) = request.max_body_bytes {
                    if response.body.len() as u64 > limit {
                        return Err(TransportError::BodyTooLarge { url: request.url, limit });
                    }
                }
                response.url = request.url;
                Ok(response)
            }
            Err(err) => Err(err),
        }
    }
}

/// Wraps a [`ScriptedTransport`], holding every request for `delay` of real
/// time and counting how many overlap.
pub(crate) struct SlowTransport {
    inner: ScriptedTransport,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl SlowTransport {
    pub(crate) fn new(inner: ScriptedTransport, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Most requests ever in flight at once.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Requests whose response was handed back to the caller.
    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for SlowTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let response = self.inner.request(request).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        response
    }
}

pub(crate) fn reply(url: &str, status: u16, headers: &[(&str, &str)], body: &[u8]) -> HttpResponse {
    HttpResponse {
        url: url.to_string(),
        status,
        headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        body: body.to_vec(),
    }
}

pub(crate) fn ok_json(value: serde_json::Value) -> Scripted {
    Ok(reply("", 200, &[], value.to_string().as_bytes()))
}

pub(crate) fn status(code: u16, headers: &[(&str, &str)], body: &str) -> Scripted {
    Ok(reply("", code, headers, body.as_bytes()))
}

pub(crate) fn timeout(url: &str) -> Scripted {
    Err(TransportError::Timeout { url: url.to_string() })
}

/// Listing item as the contents endpoint returns it.
pub(crate) fn listing_item(path: &str, kind: &str, size: u64) -> serde_json::Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    serde_json::json!({ "name": name, "path": path, "type": kind, "size": size })
}

/// Single-file contents payload with base64 content.
pub(crate) fn file_payload(path: &str, content: &[u8]) -> serde_json::Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    serde_json::json!({
        "name": name,
        "path": path,
        "type": "file",
        "size": content.len(),
        "encoding": "base64",
        "content": base64::engine::general_purpose::STANDARD.encode(content),
    })
}
