// Local stand-in for the workflow API, used by client tests

use axum::{
    Json, Router,
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::client::RUN_PATH;

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

/// Records every request hitting the run endpoint
#[derive(Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Recorder {
    fn record(&self, headers: &HeaderMap, body: Value) {
        let text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().expect("recorder lock").push(RecordedRequest {
            authorization: text(header::AUTHORIZATION),
            content_type: text(header::CONTENT_TYPE),
            body,
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("recorder lock").clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().expect("recorder lock").len()
    }

    /// Answer every request with `response` as JSON
    pub fn router(&self, response: Value) -> Router {
        let recorder = self.clone();
        Router::new().route(
            RUN_PATH,
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorder = recorder.clone();
                let response = response.clone();
                async move {
                    recorder.record(&headers, body);
                    Json(response)
                }
            }),
        )
    }

    /// Fail the first `failures` requests with a 500, then answer with `response`
    pub fn flaky_router(&self, failures: usize, response: Value) -> Router {
        let recorder = self.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        Router::new().route(
            RUN_PATH,
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorder = recorder.clone();
                let response = response.clone();
                let seen = seen.clone();
                async move {
                    recorder.record(&headers, body);
                    if seen.fetch_add(1, Ordering::SeqCst) < failures {
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(serde_json::json!({"message": "temporarily unavailable"})),
                        )
                            .into_response()
                    } else {
                        Json(response).into_response()
                    }
                }
            }),
        )
    }
}

/// Respond with `chunks` as a streamed body of the given content type
pub fn chunked_router(content_type: &'static str, chunks: Vec<Vec<u8>>) -> Router {
    Router::new().route(
        RUN_PATH,
        post(move || {
            let chunks = chunks.clone();
            async move {
                let stream = futures::stream::iter(
                    chunks
                        .into_iter()
                        .map(|chunk| Ok::<_, std::io::Error>(Bytes::from(chunk))),
                );
                let mut response = Response::new(Body::from_stream(stream));
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    header::HeaderValue::from_static(content_type),
                );
                response
            }
        }),
    )
}

/// Send `chunk`, then abort the body with a read error
pub fn broken_router(content_type: &'static str, chunk: Vec<u8>) -> Router {
    Router::new().route(
        RUN_PATH,
        post(move || {
            let chunk = chunk.clone();
            async move {
                let stream = async_stream::stream! {
                    yield Ok::<_, std::io::Error>(Bytes::from(chunk));
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    yield Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "upstream reset",
                    ));
                };
                let mut response = Response::new(Body::from_stream(stream));
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    header::HeaderValue::from_static(content_type),
                );
                response
            }
        }),
    )
}
