//! Transcription backends.
//!
//! Each backend wraps one external provider behind the [`Backend`] trait.
//! An attempt never fails with an error: missing prerequisites come back as
//! [`BackendOutcome::Unavailable`] and provider faults as
//! [`BackendOutcome::Failed`], so the orchestrator can move to the next tier.
//!
//! # Backends
//!
//! - **local**: the Whisper CLI on this machine (no cost, no network).
//! - **assemblyai**: AssemblyAI with speaker labels (timestamps in ms).
//! - **openai**: the hosted Whisper API with segment timestamps.

mod assemblyai;
mod local;
mod openai;

pub use assemblyai::{AssemblyAiBackend, AssemblyAiTranscript, AssemblyAiUtterance};
pub use local::{LocalWhisperBackend, LocalWhisperOutput, LocalWhisperSegment};
pub use openai::{HostedSegment, HostedTranscript, OpenAiBackend};

use crate::config::Settings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Identifies a backend and its tier label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "local", alias = "whisper")]
    Local,
    #[serde(rename = "assemblyai", alias = "diarization")]
    AssemblyAi,
    #[serde(rename = "openai", alias = "hosted")]
    OpenAi,
}

impl BackendKind {
    /// Human-readable name for reports and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Local => "Local Whisper",
            BackendKind::AssemblyAi => "AssemblyAI",
            BackendKind::OpenAi => "OpenAI Whisper API",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "whisper" => Ok(BackendKind::Local),
            "assemblyai" | "diarization" => Ok(BackendKind::AssemblyAi),
            "openai" | "hosted" => Ok(BackendKind::OpenAi),
            _ => Err(format!(
                "Unknown backend: {}. Use local, assemblyai, or openai.",
                s
            )),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::AssemblyAi => write!(f, "assemblyai"),
            BackendKind::OpenAi => write!(f, "openai"),
        }
    }
}

/// A single transcription job, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    audio_path: PathBuf,
    output_path: Option<PathBuf>,
}

impl TranscriptionRequest {
    pub fn new(audio_path: impl Into<PathBuf>, output_path: Option<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            output_path,
        }
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// File name sent to remote providers.
    pub(crate) fn file_name(&self) -> String {
        self.audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_string()
    }
}

/// Provider-native result, one variant per backend.
#[derive(Debug, Clone)]
pub enum BackendResult {
    Local(LocalWhisperOutput),
    AssemblyAi(AssemblyAiTranscript),
    OpenAi(HostedTranscript),
}

/// Outcome of one backend attempt.
#[derive(Debug, Clone)]
pub enum BackendOutcome {
    Success(BackendResult),
    /// A prerequisite (tool, credential) is missing. Routing information, not a bug.
    Unavailable(String),
    /// The provider was invoked and failed.
    Failed(String),
}

/// Uniform contract over a transcription provider.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Which tier this backend represents.
    fn kind(&self) -> BackendKind;

    /// What the user should install or configure to enable this backend.
    fn remedy(&self) -> String;

    /// Make exactly one attempt. Must not panic on provider faults.
    async fn attempt(&self, request: &TranscriptionRequest) -> BackendOutcome;
}

/// Build one backend of the given kind from settings.
pub fn create_backend(kind: BackendKind, settings: &Settings) -> Box<dyn Backend> {
    match kind {
        BackendKind::Local => Box::new(LocalWhisperBackend::with_config(&settings.local)),
        BackendKind::AssemblyAi => Box::new(AssemblyAiBackend::with_config(&settings.assemblyai)),
        BackendKind::OpenAi => Box::new(OpenAiBackend::with_config(&settings.openai)),
    }
}

/// Build backends in the given priority order.
pub fn create_backends(order: &[BackendKind], settings: &Settings) -> Vec<Box<dyn Backend>> {
    order.iter().map(|kind| create_backend(*kind, settings)).collect()
}

/// Read a credential from the environment, treating empty values as unset.
pub(crate) fn read_credential(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_kind() {
        assert_eq!("local".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!("Diarization".parse::<BackendKind>().unwrap(), BackendKind::AssemblyAi);
        assert_eq!(" hosted ".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert!("deepgram".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_create_backends_follows_order() {
        let settings = Settings::default();
        let order = [BackendKind::OpenAi, BackendKind::Local];
        let kinds: Vec<_> = create_backends(&order, &settings)
            .iter()
            .map(|b| b.kind())
            .collect();
        assert_eq!(kinds, order);
    }

    #[test]
    fn test_request_file_name() {
        let request = TranscriptionRequest::new("/tmp/meeting.m4a", None);
        assert_eq!(request.file_name(), "meeting.m4a");
        assert!(request.output_path().is_none());
    }

    #[test]
    fn test_read_credential_unset() {
        assert!(read_credential("TIERED_TRANSCRIBE_TEST_NEVER_SET").is_none());
    }
}
