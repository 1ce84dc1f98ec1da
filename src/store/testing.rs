//! Scripted HTTP server standing in for Firestore and token endpoints

use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Json, Router,
};
use reqwest::Url;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    /// Path and query as received
    pub uri: String,
    pub authorization: Option<String>,
    pub metadata_flavor: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<(StatusCode, Value)>>,
    seen: Mutex<Vec<SeenRequest>>,
}

/// Answers each request with the next scripted reply, whatever the path
pub struct FakeServer {
    addr: SocketAddr,
    script: Arc<Script>,
}

impl FakeServer {
    pub async fn start(replies: Vec<(StatusCode, Value)>) -> Self {
        let script = Arc::new(Script {
            replies: Mutex::new(replies.into()),
            seen: Mutex::default(),
        });
        let app = Router::new().fallback(reply).with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, script }
    }

    /// `host:port`, as expected by `emulator_host`
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.script.seen.lock().unwrap().clone()
    }
}

async fn reply(
    State(script): State<Arc<Script>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    script.seen.lock().unwrap().push(SeenRequest {
        method,
        uri: uri.to_string(),
        authorization: header("authorization"),
        metadata_flavor: header("metadata-flavor"),
        body,
    });

    let (status, reply) = script.replies.lock().unwrap().pop_front().unwrap_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "no scripted reply left" } }),
    ));
    (status, Json(reply))
}
