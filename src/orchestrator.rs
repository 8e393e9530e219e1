//! Fallback orchestration across transcription backends.
//!
//! Backends are tried one at a time in priority order. The first success is
//! normalized and returned; every other tier's outcome is recorded so a
//! total failure can tell the user what to install or configure.

use crate::backend::{create_backends, Backend, BackendKind, BackendOutcome, TranscriptionRequest};
use crate::config::{validate_order, Settings};
use crate::error::{Result, TranscribeError};
use crate::transcription::{normalize, NormalizedTranscript};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Why a tier did not produce a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Tool or credential missing.
    Unavailable,
    /// The provider was called and failed.
    Failed,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Unavailable => write!(f, "unavailable"),
            FailureKind::Failed => write!(f, "failed"),
        }
    }
}

/// Record of one tier that did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct TierFailure {
    pub backend: BackendKind,
    pub kind: FailureKind,
    pub reason: String,
    pub remedy: String,
}

/// Every tier was tried and none succeeded.
#[derive(Debug, Clone, Error)]
#[error("all {} transcription backends failed", .tiers.len())]
pub struct TerminalFailure {
    /// One entry per tier, in tier order.
    pub tiers: Vec<TierFailure>,
}

/// A transcript together with the tiers passed over to get it.
#[derive(Debug, Clone)]
pub struct FallbackSuccess {
    pub transcript: NormalizedTranscript,
    pub skipped: Vec<TierFailure>,
}

/// Tries backends in order and stops at the first success.
pub struct FallbackOrchestrator {
    backends: Vec<Box<dyn Backend>>,
}

impl FallbackOrchestrator {
    /// Build the backend chain from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_order(&settings.fallback.order, settings)
    }

    /// Build the backend chain for an explicit order.
    pub fn with_order(order: &[BackendKind], settings: &Settings) -> Result<Self> {
        validate_order(order)?;
        Ok(Self {
            backends: create_backends(order, settings),
        })
    }

    /// Create an orchestrator over custom backends, tried in the given order.
    pub fn with_backends(backends: Vec<Box<dyn Backend>>) -> Result<Self> {
        if backends.is_empty() {
            return Err(TranscribeError::Config(
                "at least one transcription backend is required".to_string(),
            ));
        }
        Ok(Self { backends })
    }

    /// Backend kinds in the order they will be tried.
    pub fn order(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Run the fallback chain. One attempt per tier, no retries.
    #[instrument(skip(self, request), fields(audio_path = %request.audio_path().display()))]
    pub async fn run(
        &self,
        request: &TranscriptionRequest,
    ) -> std::result::Result<FallbackSuccess, TerminalFailure> {
        let mut skipped = Vec::with_capacity(self.backends.len());

        for (tier, backend) in self.backends.iter().enumerate() {
            let kind = backend.kind();
            info!("Tier {}: trying {}", tier + 1, kind.label());

            let (failure_kind, reason) = match backend.attempt(request).await {
                BackendOutcome::Success(result) => {
                    info!("Tier {}: {} succeeded", tier + 1, kind.label());
                    return Ok(FallbackSuccess {
                        transcript: normalize(&result),
                        skipped,
                    });
                }
                BackendOutcome::Unavailable(reason) => (FailureKind::Unavailable, reason),
                BackendOutcome::Failed(reason) => (FailureKind::Failed, reason),
            };

            warn!("Tier {}: {} {}: {}", tier + 1, kind.label(), failure_kind, reason);
            skipped.push(TierFailure {
                backend: kind,
                kind: failure_kind,
                reason,
                remedy: backend.remedy(),
            });
        }

        Err(TerminalFailure { tiers: skipped })
    }
}
