//! In-process Kubernetes API server for tests.

use http::{Request, Response, StatusCode};
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower_test::mock;

/// A request the fake API server answered.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Value,
}

pub(crate) type Requests = Arc<Mutex<Vec<Recorded>>>;

/// Client whose requests are answered by `respond(method, path, body)`.
/// Every request is recorded before it is answered.
pub(crate) fn mock_client<F>(respond: F) -> (Client, Requests)
where
    F: Fn(&str, &str, &Value) -> (StatusCode, Value) + Send + 'static,
{
    let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
    let requests: Requests = Arc::default();
    let recorded = Arc::clone(&requests);

    tokio::spawn(async move {
        while let Some((request, send)) = handle.next_request().await {
            let method = request.method().to_string();
            let path = request.uri().path().to_string();
            let bytes = request
                .into_body()
                .collect_bytes()
                .await
                .expect("request body");
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

            let (status, reply) = respond(&method, &path, &body);
            recorded.lock().expect("lock").push(Recorded { method, path, body });
            let response = Response::builder()
                .status(status)
                .body(Body::from(serde_json::to_vec(&reply).expect("json")))
                .expect("response");
            send.send_response(response);
        }
    });

    (Client::new(service, "default"), requests)
}

/// Body of a 404 from the API server.
pub(crate) fn not_found() -> (StatusCode, Value) {
    (
        StatusCode::NOT_FOUND,
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "not found",
            "reason": "NotFound",
            "code": 404
        }),
    )
}

/// Requests with `method` whose path ends with `suffix`.
pub(crate) fn matching(requests: &Requests, method: &str, suffix: &str) -> Vec<Recorded> {
    requests
        .lock()
        .expect("lock")
        .iter()
        .filter(|r| r.method == method && r.path.ends_with(suffix))
        .cloned()
        .collect()
}
