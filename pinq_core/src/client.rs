use crate::backend::{HttpBackend, PinBackend};
use crate::cid::{Cid, extract_cid};
use crate::retry::RetryPolicy;
use crate::{PinError, PinResult};
use pinq_store::{PendingPin, PendingStore, pending_key};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

/// Pinning client: wraps a [`PinBackend`] in a retry/backoff loop and
/// records exhausted file uploads in a [`PendingStore`].
#[derive(Debug)]
pub struct PinClient<B = HttpBackend> {
    backend: B,
    policy: RetryPolicy,
    pending: Option<Box<dyn PendingStore>>,
}

impl PinClient<HttpBackend> {
    /// Client over the default HTTP transport.
    pub fn new(api_url: &str, credential: impl Into<String>) -> Self {
        Self::with_backend(HttpBackend::new(api_url, credential))
    }
}

impl<B: PinBackend> PinClient<B> {
    /// Client over a caller-supplied transport (SDK-style integrations,
    /// test doubles).
    pub fn with_backend(backend: B) -> Self {
        PinClient {
            backend,
            policy: RetryPolicy::default(),
            pending: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attaches the durable queue that receives exhausted file uploads.
    /// Without one, file-pin failures propagate with no record.
    pub fn with_pending_store(mut self, store: Box<dyn PendingStore>) -> Self {
        self.pending = Some(store);
        self
    }

    /// Stores a JSON document, retrying per the configured policy.
    ///
    /// Returns `Ok(None)` when the service accepted the payload but the
    /// response carried no recognizable CID. Exhausted retries propagate
    /// the last failure; no pending record is written for JSON payloads.
    pub async fn pin_json(&self, payload: &Value) -> PinResult<Option<Cid>> {
        let attempts = self.policy.attempts();
        let mut attempt = 0;
        loop {
            let start = Instant::now();
            match self.backend.store_json(payload).await {
                Ok(data) => {
                    let cid = extract_cid(&data);
                    log::info!(
                        "pin_json successful cid={} duration={:.3}s",
                        cid.as_ref().map(Cid::as_str).unwrap_or("<none>"),
                        start.elapsed().as_secs_f64()
                    );
                    return Ok(cid);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(PinError::Exhausted {
                            attempts,
                            source: Box::new(e),
                        });
                    }
                    log::warn!("pin_json attempt {attempt}/{attempts} failed: {e}");
                    tokio::time::sleep(self.policy.delay_for_attempt(attempt - 1)).await;
                }
            }
        }
    }

    /// Uploads a local file, retrying per the configured policy.
    ///
    /// On exhaustion, a pending record for `path` is written to the
    /// attached store before the final failure propagates. That write is
    /// best-effort: a persistence failure is logged and swallowed so it
    /// never masks the pin failure itself.
    pub async fn pin_file(&self, path: &Path) -> PinResult<Option<Cid>> {
        let attempts = self.policy.attempts();
        let mut attempt = 0;
        loop {
            let start = Instant::now();
            match self.backend.upload_file(path).await {
                Ok(data) => {
                    let cid = extract_cid(&data);
                    log::info!(
                        "pin_file successful cid={} file={} duration={:.3}s",
                        cid.as_ref().map(Cid::as_str).unwrap_or("<none>"),
                        path.display(),
                        start.elapsed().as_secs_f64()
                    );
                    return Ok(cid);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts {
                        self.record_pending(path, &e, attempts).await;
                        return Err(PinError::Exhausted {
                            attempts,
                            source: Box::new(e),
                        });
                    }
                    log::warn!(
                        "pin_file attempt {attempt}/{attempts} failed for {}: {e}",
                        path.display()
                    );
                    tokio::time::sleep(self.policy.delay_for_attempt(attempt - 1)).await;
                }
            }
        }
    }

    async fn record_pending(&self, path: &Path, error: &PinError, attempts: u32) {
        let Some(store) = &self.pending else {
            return;
        };
        let record = PendingPin {
            file: path.display().to_string(),
            error: error.to_string(),
            attempts,
        };
        if let Err(e) = store.put(&pending_key(path), &record).await {
            log::warn!(
                "failed to record pending pin for {}: {e}",
                path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinq_store::FsPendingStore;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Backend whose responses are scripted per call, in order. Once the
    /// script runs out, every further call fails.
    #[derive(Debug, Default)]
    struct ScriptedBackend {
        script: Mutex<VecDeque<PinResult<Value>>>,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(script: Vec<PinResult<Value>>) -> Self {
            ScriptedBackend {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> PinResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PinError::HttpFailWithBody(503, "script empty".into())))
        }
    }

    #[async_trait::async_trait]
    impl PinBackend for ScriptedBackend {
        async fn store_json(&self, _payload: &Value) -> PinResult<Value> {
            self.next()
        }

        async fn upload_file(&self, _path: &Path) -> PinResult<Value> {
            self.next()
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn pin_json_success_performs_single_attempt() {
        let backend = ScriptedBackend::new(vec![Ok(json!({"value": {"cid": "bafyjson"}}))]);
        let client = PinClient::with_backend(backend).with_policy(fast_policy(3));

        let cid = client.pin_json(&json!({"x": 1})).await.unwrap();
        assert_eq!(cid, Some(Cid::from("bafyjson")));
        assert_eq!(client.backend.calls(), 1);
    }

    #[tokio::test]
    async fn pin_json_retries_then_succeeds() {
        let backend = ScriptedBackend::new(vec![
            Err(PinError::HttpFailWithBody(500, "boom".into())),
            Err(PinError::HttpFailWithBody(502, "boom".into())),
            Ok(json!({"cid": "bafylate"})),
        ]);
        let client = PinClient::with_backend(backend).with_policy(fast_policy(3));

        let cid = client.pin_json(&json!({})).await.unwrap();
        assert_eq!(cid, Some(Cid::from("bafylate")));
        assert_eq!(client.backend.calls(), 3);
    }

    #[tokio::test]
    async fn pin_json_exhaustion_surfaces_last_error_without_record() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsPendingStore::new(tmp.path());
        let backend = ScriptedBackend::new(vec![
            Err(PinError::HttpFailWithBody(500, "first".into())),
            Err(PinError::HttpFailWithBody(503, "last".into())),
        ]);
        let client = PinClient::with_backend(backend)
            .with_policy(fast_policy(2))
            .with_pending_store(Box::new(store.clone()));

        let err = client.pin_json(&json!({})).await.unwrap_err();
        assert_eq!(client.backend.calls(), 2);
        match err {
            PinError::Exhausted { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, PinError::HttpFailWithBody(503, _)));
            }
            other => panic!("unexpected error: {other}"),
        }
        // JSON payload failures are never persisted.
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pin_file_exhaustion_writes_exactly_one_record() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsPendingStore::new(tmp.path().join("pending"));
        let backend = ScriptedBackend::new(vec![]);
        let client = PinClient::with_backend(backend)
            .with_policy(fast_policy(3))
            .with_pending_store(Box::new(store.clone()));

        let path = tmp.path().join("asset.bin");
        let err = client.pin_file(&path).await.unwrap_err();
        assert!(matches!(err, PinError::Exhausted { attempts: 3, .. }));
        assert_eq!(client.backend.calls(), 3);

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "asset.bin.pending.json");
        assert_eq!(records[0].1.file, path.display().to_string());
        assert_eq!(records[0].1.attempts, 3);
        assert!(!records[0].1.error.is_empty());
    }

    #[tokio::test]
    async fn pin_file_exhaustion_without_store_still_propagates() {
        let backend = ScriptedBackend::new(vec![]);
        let client = PinClient::with_backend(backend).with_policy(fast_policy(1));

        let err = client.pin_file(Path::new("/nope.bin")).await.unwrap_err();
        assert!(matches!(err, PinError::Exhausted { attempts: 1, .. }));
        assert_eq!(client.backend.calls(), 1);
    }

    #[tokio::test]
    async fn backoff_delays_double_between_attempts() {
        let backend = ScriptedBackend::new(vec![]);
        let client = PinClient::with_backend(backend)
            .with_policy(RetryPolicy::new(3, Duration::from_millis(20)));

        let start = Instant::now();
        let _ = client.pin_json(&json!({})).await.unwrap_err();
        // Two delays: 20ms + 40ms, none after the final attempt.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(60), "elapsed {elapsed:?}");
        assert_eq!(client.backend.calls(), 3);
    }
}
