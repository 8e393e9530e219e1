//! Provider-agnostic transcript model.

use crate::backend::BackendKind;
use serde::{Deserialize, Serialize};

/// A transcript in the common shape every backend converges on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTranscript {
    /// Backend that produced this transcript.
    pub backend: BackendKind,
    /// Full transcript text, verbatim from the provider.
    pub full_text: String,
    /// Timed segments in source order. `None` when the provider gave none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
    /// Detected language, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Audio duration in seconds, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl NormalizedTranscript {
    /// Segments as a slice, empty when absent.
    pub fn segments(&self) -> &[Segment] {
        self.segments.as_deref().unwrap_or_default()
    }

    /// True when at least one segment carries a speaker label.
    pub fn has_speakers(&self) -> bool {
        self.segments().iter().any(|s| s.speaker.is_some())
    }
}

/// A timed span of transcript text, optionally attributed to a speaker.
///
/// Segments may overlap; ordering is whatever the provider emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
    /// Speaker label, for diarized transcripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl Segment {
    /// Create an unattributed segment.
    pub fn new(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
            speaker: None,
        }
    }

    /// Attach a speaker label.
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }
}
