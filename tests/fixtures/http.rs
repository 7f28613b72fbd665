//! One-shot axum responder on a loopback port.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use axum::Router;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use tokio::sync::mpsc;

/// What the responder saw.
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    /// Header names lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Serves a single request with `status` and a JSON `body`, then shuts down
/// and hands back the request. Returns the base URL to call.
pub fn serve_once(status: u16, body: &str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let address = listener.local_addr().expect("local addr");
    let status = StatusCode::from_u16(status).expect("status code");
    let body = body.to_string();

    let handle = thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("test runtime");

        runtime.block_on(async move {
            let (sender, mut receiver) = mpsc::unbounded_channel();
            let app = Router::new().fallback(
                move |method: Method, uri: Uri, headers: HeaderMap, request_body: String| {
                    let sender = sender.clone();
                    let body = body.clone();
                    async move {
                        let captured = CapturedRequest {
                            method: method.to_string(),
                            path: uri.path().to_string(),
                            headers: headers
                                .iter()
                                .map(|(name, value)| {
                                    let value = value.to_str().unwrap_or_default().to_string();
                                    (name.as_str().to_string(), value)
                                })
                                .collect(),
                            body: request_body,
                        };
                        let _ = sender.send(captured);
                        (status, [(header::CONTENT_TYPE, "application/json")], body)
                    }
                },
            );

            let captured = Arc::new(Mutex::new(None));
            let slot = Arc::clone(&captured);
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    if let Some(request) = receiver.recv().await {
                        *slot.lock().unwrap() = Some(request);
                    }
                })
                .await
                .expect("serve");

            let request = captured.lock().unwrap().take();
            request.expect("no request reached the responder")
        })
    });

    (format!("http://{}", address), handle)
}
