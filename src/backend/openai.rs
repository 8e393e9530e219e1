//! OpenAI hosted Whisper backend.

use super::{read_credential, Backend, BackendKind, BackendOutcome, BackendResult, TranscriptionRequest};
use crate::config::OpenAiSettings;
use crate::error::{Result, TranscribeError};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs,
    CreateTranscriptionResponseVerboseJson, TimestampGranularity,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// One segment from the verbose JSON response (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Verbose transcription response, detached from the client library types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedTranscript {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Option<Vec<HostedSegment>>,
}

impl From<CreateTranscriptionResponseVerboseJson> for HostedTranscript {
    fn from(response: CreateTranscriptionResponseVerboseJson) -> Self {
        Self {
            text: response.text,
            language: Some(response.language).filter(|l| !l.is_empty()),
            duration: Some(response.duration as f64),
            segments: response.segments.map(|segs| {
                segs.into_iter()
                    .map(|s| HostedSegment {
                        start: s.start as f64,
                        end: s.end as f64,
                        text: s.text,
                    })
                    .collect()
            }),
        }
    }
}

/// Backend for the OpenAI audio transcription endpoint.
pub struct OpenAiBackend {
    api_key_env: String,
    model: String,
    timeout: Duration,
}

impl OpenAiBackend {
    /// Create a backend with default settings (`whisper-1`).
    pub fn new() -> Self {
        Self::with_config(&OpenAiSettings::default())
    }

    pub fn with_config(settings: &OpenAiSettings) -> Self {
        Self {
            api_key_env: settings.api_key_env.clone(),
            model: settings.model.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }

    async fn transcribe(&self, api_key: &str, request: &TranscriptionRequest) -> Result<HostedTranscript> {
        let client = create_client_with_timeout(api_key, self.timeout)?;
        let file_bytes = tokio::fs::read(request.audio_path()).await?;

        let api_request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(request.file_name(), file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![TimestampGranularity::Segment])
            .build()
            .map_err(|e| TranscribeError::Backend(format!("Failed to build request: {}", e)))?;

        let response = client
            .audio()
            .transcribe_verbose_json(api_request)
            .await
            .map_err(|e| TranscribeError::OpenAI(format!("{} API error: {}", self.model, e)))?;

        let transcript = HostedTranscript::from(response);
        debug!(
            "OpenAI returned {} segments",
            transcript.segments.as_ref().map_or(0, |s| s.len())
        );
        Ok(transcript)
    }
}

impl Default for OpenAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    fn remedy(&self) -> String {
        format!(
            "Set an OpenAI API key (good transcription, no speaker separation): export {}='sk-...'",
            self.api_key_env
        )
    }

    #[instrument(skip(self, request), fields(audio_path = %request.audio_path().display()))]
    async fn attempt(&self, request: &TranscriptionRequest) -> BackendOutcome {
        let Some(api_key) = read_credential(&self.api_key_env) else {
            return BackendOutcome::Unavailable(format!("{} not set", self.api_key_env));
        };

        match self.transcribe(&api_key, request).await {
            Ok(transcript) => BackendOutcome::Success(BackendResult::OpenAi(transcript)),
            Err(e) => {
                warn!("OpenAI transcription failed: {}", e);
                BackendOutcome::Failed(e.to_string())
            }
        }
    }
}
