//! AssemblyAI backend with speaker diarization.
//!
//! Uploads the audio, requests a transcript with speaker labels and polls
//! until the job finishes. Utterance timestamps come back in milliseconds.

use super::{read_credential, Backend, BackendKind, BackendOutcome, BackendResult, TranscriptionRequest};
use crate::config::AssemblyAiSettings;
use crate::error::{Result, TranscribeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Job state reported by AssemblyAI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

/// One speaker turn. `start`/`end` are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyAiUtterance {
    pub speaker: String,
    pub start: u64,
    pub end: u64,
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Transcript resource as returned by `GET /v2/transcript/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyAiTranscript {
    pub id: String,
    pub status: TranscriptStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub utterances: Option<Vec<AssemblyAiUtterance>>,
    #[serde(default)]
    pub language_code: Option<String>,
    /// Audio length in seconds.
    #[serde(default)]
    pub audio_duration: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    speaker_labels: bool,
}

/// Backend for the AssemblyAI transcription API.
pub struct AssemblyAiBackend {
    api_key_env: String,
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl AssemblyAiBackend {
    /// Create a backend with default settings.
    pub fn new() -> Self {
        Self::with_config(&AssemblyAiSettings::default())
    }

    pub fn with_config(settings: &AssemblyAiSettings) -> Self {
        Self {
            api_key_env: settings.api_key_env.clone(),
            base_url: settings.base_url.clone(),
            poll_interval: Duration::from_secs(settings.poll_interval_seconds.max(1)),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = Url::parse(&self.base_url)?;
        // Without a trailing slash `join` would replace the last segment.
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        Ok(base.join(path)?)
    }

    /// Upload, submit and wait for the transcript.
    async fn transcribe(&self, api_key: &str, audio_path: &Path) -> Result<AssemblyAiTranscript> {
        let client = reqwest::Client::new();

        let file_bytes = tokio::fs::read(audio_path).await?;
        debug!("Uploading {} bytes", file_bytes.len());

        let response = client
            .post(self.endpoint("v2/upload")?)
            .header("authorization", api_key)
            .body(file_bytes)
            .send()
            .await?;
        let upload: UploadResponse = check_status(response).await?.json().await?;

        let response = client
            .post(self.endpoint("v2/transcript")?)
            .header("authorization", api_key)
            .json(&TranscriptRequest {
                audio_url: &upload.upload_url,
                speaker_labels: true,
            })
            .send()
            .await?;
        let mut transcript: AssemblyAiTranscript = check_status(response).await?.json().await?;

        info!("AssemblyAI job {} submitted", transcript.id);

        let poll_url = self.endpoint(&format!("v2/transcript/{}", transcript.id))?;
        let deadline = Instant::now() + self.timeout;

        while matches!(
            transcript.status,
            TranscriptStatus::Queued | TranscriptStatus::Processing
        ) {
            if Instant::now() >= deadline {
                return Err(TranscribeError::Backend(format!(
                    "AssemblyAI job {} did not finish within {}s",
                    transcript.id,
                    self.timeout.as_secs()
                )));
            }

            tokio::time::sleep(self.poll_interval).await;

            let response = client
                .get(poll_url.clone())
                .header("authorization", api_key)
                .send()
                .await?;
            transcript = check_status(response).await?.json().await?;
            debug!("AssemblyAI job {} is {:?}", transcript.id, transcript.status);
        }

        into_completed(transcript)
    }
}

impl Default for AssemblyAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for AssemblyAiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::AssemblyAi
    }

    fn remedy(&self) -> String {
        format!(
            "Set an AssemblyAI API key (best for speaker separation): export {}='your-key'",
            self.api_key_env
        )
    }

    #[instrument(skip(self, request), fields(audio_path = %request.audio_path().display()))]
    async fn attempt(&self, request: &TranscriptionRequest) -> BackendOutcome {
        let Some(api_key) = read_credential(&self.api_key_env) else {
            return BackendOutcome::Unavailable(format!("{} not set", self.api_key_env));
        };

        match self.transcribe(&api_key, request.audio_path()).await {
            Ok(transcript) => BackendOutcome::Success(BackendResult::AssemblyAi(transcript)),
            Err(e) => {
                warn!("AssemblyAI failed: {}", e);
                BackendOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Turn a finished job into a result, rejecting errored or unexpected states.
pub(crate) fn into_completed(transcript: AssemblyAiTranscript) -> Result<AssemblyAiTranscript> {
    match transcript.status {
        TranscriptStatus::Completed => Ok(transcript),
        TranscriptStatus::Error => Err(TranscribeError::Backend(format!(
            "AssemblyAI job {} failed: {}",
            transcript.id,
            transcript.error.as_deref().unwrap_or("no error message")
        ))),
        other => Err(TranscribeError::Backend(format!(
            "AssemblyAI job {} ended in unexpected state {:?}",
            transcript.id, other
        ))),
    }
}

/// Map non-2xx responses to an error carrying the response body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TranscribeError::Backend(format!(
        "AssemblyAI returned {}: {}",
        status,
        body.trim()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn completed_json() -> &'static str {
        r#"{
            "id": "abc123",
            "status": "completed",
            "text": "Hi there. Hello.",
            "language_code": "en_us",
            "audio_duration": 5,
            "utterances": [
                {"speaker": "A", "start": 1500, "end": 4200, "text": "Hi there.", "confidence": 0.93, "words": []},
                {"speaker": "B", "start": 4300, "end": 5000, "text": "Hello.", "confidence": 0.88, "words": []}
            ]
        }"#
    }

    #[tokio::test]
    async fn test_missing_credential_is_unavailable() {
        let settings = AssemblyAiSettings {
            api_key_env: "TIERED_TRANSCRIBE_TEST_ASSEMBLYAI_UNSET".to_string(),
            ..AssemblyAiSettings::default()
        };
        let backend = AssemblyAiBackend::with_config(&settings);
        let request = TranscriptionRequest::new("/tmp/does-not-matter.m4a", None);

        match backend.attempt(&request).await {
            BackendOutcome::Unavailable(reason) => {
                assert!(reason.contains("TIERED_TRANSCRIBE_TEST_ASSEMBLYAI_UNSET"))
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_failed() {
        std::env::set_var("TIERED_TRANSCRIBE_TEST_ASSEMBLYAI_KEY", "test-key");
        let settings = AssemblyAiSettings {
            api_key_env: "TIERED_TRANSCRIBE_TEST_ASSEMBLYAI_KEY".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            ..AssemblyAiSettings::default()
        };
        let backend = AssemblyAiBackend::with_config(&settings);

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("clip.m4a");
        std::fs::write(&audio, b"not really audio").unwrap();
        let request = TranscriptionRequest::new(&audio, None);

        assert!(matches!(backend.attempt(&request).await, BackendOutcome::Failed(_)));
    }

    #[test]
    fn test_parse_completed_transcript() {
        let transcript: AssemblyAiTranscript = serde_json::from_str(completed_json()).unwrap();
        assert_eq!(transcript.status, TranscriptStatus::Completed);
        assert_eq!(transcript.audio_duration, Some(5.0));

        let utterances = transcript.utterances.as_ref().unwrap();
        assert_eq!(utterances[0].speaker, "A");
        assert_eq!(utterances[0].start, 1500);
        assert_eq!(utterances[0].end, 4200);

        assert!(into_completed(transcript).is_ok());
    }

    #[test]
    fn test_errored_job_is_rejected() {
        let transcript: AssemblyAiTranscript = serde_json::from_str(
            r#"{"id": "x1", "status": "error", "text": null, "error": "Audio file is corrupted"}"#,
        )
        .unwrap();

        let err = into_completed(transcript).unwrap_err();
        assert!(err.to_string().contains("Audio file is corrupted"));
    }

    #[test]
    fn test_unknown_status() {
        let transcript: AssemblyAiTranscript =
            serde_json::from_str(r#"{"id": "x2", "status": "paused"}"#).unwrap();
        assert_eq!(transcript.status, TranscriptStatus::Unknown);
        assert!(into_completed(transcript).is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let backend = AssemblyAiBackend::new();
        assert_eq!(
            backend.endpoint("v2/transcript/abc").unwrap().as_str(),
            "https://api.assemblyai.com/v2/transcript/abc"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let settings = AssemblyAiSettings {
            base_url: "https://host/proxy".to_string(),
            ..AssemblyAiSettings::default()
        };
        let backend = AssemblyAiBackend::with_config(&settings);
        assert_eq!(
            backend.endpoint("v2/upload").unwrap().as_str(),
            "https://host/proxy/v2/upload"
        );
    }

    /// Serves upload and submit, then answers each poll with the next status
    /// from `polls` (the last one repeats).
    async fn spawn_service(polls: Vec<&'static str>) -> (String, Arc<Mutex<Vec<Value>>>) {
        let submitted = Arc::new(Mutex::new(Vec::new()));
        let polls = Arc::new(polls);
        let poll_count = Arc::new(AtomicUsize::new(0));

        let recorder = submitted.clone();
        let app = Router::new()
            .route(
                "/v2/upload",
                post(|headers: HeaderMap| async move {
                    let authorized = headers
                        .get("authorization")
                        .is_some_and(|value| value == "test-key");
                    if !authorized {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({"upload_url": "https://cdn.example/upload/1"})))
                }),
            )
            .route(
                "/v2/transcript",
                post(move |Json(body): Json<Value>| {
                    let recorder = recorder.clone();
                    async move {
                        recorder.lock().unwrap().push(body);
                        Json(json!({"id": "job1", "status": "queued"}))
                    }
                }),
            )
            .route(
                "/v2/transcript/job1",
                get(move || {
                    let polls = polls.clone();
                    let poll_count = poll_count.clone();
                    async move {
                        let n = poll_count.fetch_add(1, Ordering::SeqCst);
                        let status = polls[n.min(polls.len() - 1)];
                        let mut body: Value = serde_json::from_str(completed_json()).unwrap();
                        body["id"] = json!("job1");
                        body["status"] = json!(status);
                        Json(body)
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), submitted)
    }

    fn backend_for(base_url: String, key_env: &str, timeout_seconds: u64) -> AssemblyAiBackend {
        std::env::set_var(key_env, "test-key");
        AssemblyAiBackend::with_config(&AssemblyAiSettings {
            api_key_env: key_env.to_string(),
            base_url,
            poll_interval_seconds: 1,
            timeout_seconds,
        })
    }

    fn audio_request(dir: &Path) -> TranscriptionRequest {
        let audio = dir.join("meeting.m4a");
        std::fs::write(&audio, b"not really audio").unwrap();
        TranscriptionRequest::new(audio, None)
    }

    #[tokio::test]
    async fn test_polls_until_completed() {
        let (base_url, submitted) = spawn_service(vec!["processing", "completed"]).await;
        let backend = backend_for(base_url, "TIERED_TRANSCRIBE_TEST_ASSEMBLYAI_POLL", 60);
        let dir = tempfile::tempdir().unwrap();

        let transcript = match backend.attempt(&audio_request(dir.path())).await {
            BackendOutcome::Success(BackendResult::AssemblyAi(transcript)) => transcript,
            other => panic!("expected AssemblyAI success, got {:?}", other),
        };
        assert_eq!(transcript.id, "job1");
        assert_eq!(transcript.status, TranscriptStatus::Completed);
        assert_eq!(transcript.utterances.unwrap().len(), 2);

        let submitted = submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0]["speaker_labels"], json!(true));
        assert_eq!(submitted[0]["audio_url"], json!("https://cdn.example/upload/1"));
    }

    #[tokio::test]
    async fn test_poll_deadline_is_failed() {
        let (base_url, _) = spawn_service(vec!["queued"]).await;
        let backend = backend_for(base_url, "TIERED_TRANSCRIBE_TEST_ASSEMBLYAI_DEADLINE", 1);
        let dir = tempfile::tempdir().unwrap();

        match backend.attempt(&audio_request(dir.path())).await {
            BackendOutcome::Failed(reason) => assert!(reason.contains("did not finish within 1s")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_key_is_failed() {
        let (base_url, submitted) = spawn_service(vec!["completed"]).await;
        std::env::set_var("TIERED_TRANSCRIBE_TEST_ASSEMBLYAI_REJECTED", "wrong-key");
        let backend = AssemblyAiBackend::with_config(&AssemblyAiSettings {
            api_key_env: "TIERED_TRANSCRIBE_TEST_ASSEMBLYAI_REJECTED".to_string(),
            base_url,
            ..AssemblyAiSettings::default()
        });
        let dir = tempfile::tempdir().unwrap();

        match backend.attempt(&audio_request(dir.path())).await {
            BackendOutcome::Failed(reason) => assert!(reason.contains("401")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(submitted.lock().unwrap().is_empty());
    }
}
