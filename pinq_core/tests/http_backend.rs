use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use pinq_core::{Cid, PinClient, RetryPolicy};
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;
use tokio::net::TcpListener;

struct TestServer {
    base_url: String,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.unwrap();
        });

        TestServer {
            base_url: format!("http://{addr}"),
            shutdown_tx: Some(shutdown_tx),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[tokio::test]
async fn pin_json_decodes_cid_from_store_endpoint() {
    async fn store(headers: HeaderMap, Json(payload): Json<Value>) -> Json<Value> {
        assert_eq!(
            headers.get("authorization").unwrap().to_str().unwrap(),
            "Bearer TESTKEY"
        );
        assert_eq!(payload, json!({"name": "asset"}));
        Json(json!({"value": {"cid": {"/": "bafyhttp"}}}))
    }

    let server = TestServer::new(Router::new().route("/store", post(store))).await;
    let client = PinClient::new(&server.base_url, "TESTKEY");

    let cid = client.pin_json(&json!({"name": "asset"})).await.unwrap();
    assert_eq!(cid, Some(Cid::from("bafyhttp")));
}

#[tokio::test]
async fn pin_file_uploads_multipart_to_upload_endpoint() {
    async fn upload(headers: HeaderMap) -> Json<Value> {
        let content_type = headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
        assert_eq!(
            headers.get("authorization").unwrap().to_str().unwrap(),
            "Bearer TESTKEY"
        );
        Json(json!({"value": {"cid": "bafyfile"}}))
    }

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("asset.bin");
    std::fs::write(&path, b"hello world").unwrap();

    let server = TestServer::new(Router::new().route("/upload", post(upload))).await;
    let client = PinClient::new(&server.base_url, "TESTKEY");

    let cid = client.pin_file(&path).await.unwrap();
    assert_eq!(cid, Some(Cid::from("bafyfile")));
}

#[tokio::test]
async fn transient_server_errors_are_retried_until_success() {
    #[derive(Clone)]
    struct Flaky(Arc<AtomicU32>);

    async fn store(State(Flaky(hits)): State<Flaky>) -> (StatusCode, Json<Value>) {
        let hit = hits.fetch_add(1, Ordering::SeqCst);
        if hit < 2 {
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})))
        } else {
            (StatusCode::OK, Json(json!({"cid": "bafyeventually"})))
        }
    }

    let hits = Arc::new(AtomicU32::new(0));
    let router = Router::new()
        .route("/store", post(store))
        .with_state(Flaky(hits.clone()));
    let server = TestServer::new(router).await;

    let client = PinClient::new(&server.base_url, "TESTKEY")
        .with_policy(RetryPolicy::new(3, Duration::from_millis(1)));

    let cid = client.pin_json(&json!({})).await.unwrap();
    assert_eq!(cid, Some(Cid::from("bafyeventually")));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
