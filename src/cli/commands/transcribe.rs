//! Transcribe command implementation.

use crate::backend::{BackendKind, TranscriptionRequest};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::TranscribeError;
use crate::orchestrator::{FallbackOrchestrator, TerminalFailure};
use crate::transcription::{format_transcript, write_atomic, OutputFormat};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the transcribe command.
pub async fn run_transcribe(
    audio_path: &str,
    output_path: Option<&str>,
    order: Option<Vec<BackendKind>>,
    format: Option<OutputFormat>,
    settings: Settings,
) -> Result<()> {
    let format = format.unwrap_or(settings.output.format);

    let orchestrator = match order {
        Some(order) => FallbackOrchestrator::with_order(&order, &settings)?,
        None => FallbackOrchestrator::new(&settings)?,
    };

    transcribe_file(&orchestrator, audio_path, output_path, format).await?;
    Ok(())
}

/// Validate the input path, then transcribe it. A missing input fails
/// before any backend runs.
pub async fn transcribe_file(
    orchestrator: &FallbackOrchestrator,
    audio_path: &str,
    output_path: Option<&str>,
    format: OutputFormat,
) -> Result<PathBuf> {
    let request = resolve_request(audio_path, output_path)?;
    execute(orchestrator, &request, format).await
}

/// Build the request, checking that the audio file exists.
pub fn resolve_request(
    audio_path: &str,
    output_path: Option<&str>,
) -> std::result::Result<TranscriptionRequest, TranscribeError> {
    let audio = Settings::expand_path(audio_path);
    if !audio.is_file() {
        return Err(TranscribeError::InputNotFound(audio.display().to_string()));
    }

    Ok(TranscriptionRequest::new(
        audio,
        output_path.map(Settings::expand_path),
    ))
}

/// `<stem>_transcript.<ext>` next to the audio file.
pub fn default_output_path(audio_path: &Path, format: OutputFormat) -> PathBuf {
    let stem = audio_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    audio_path.with_file_name(format!("{}_transcript.{}", stem, format.extension()))
}

/// Run the fallback chain for a request from [`resolve_request`] and write
/// the result.
///
/// Returns the path written. When every backend fails the per-tier report
/// is printed to stdout and the failure is returned.
pub async fn execute(
    orchestrator: &FallbackOrchestrator,
    request: &TranscriptionRequest,
    format: OutputFormat,
) -> Result<PathBuf> {
    let output_path = request
        .output_path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(request.audio_path(), format));

    Output::info(&format!("Processing audio file: {}", request.audio_path().display()));
    Output::kv("Output", &output_path.display().to_string());
    Output::kv(
        "Backends",
        &orchestrator
            .order()
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" → "),
    );

    let spinner = Output::spinner("Transcribing...");
    let outcome = orchestrator.run(request).await;
    spinner.finish_and_clear();

    let success = match outcome {
        Ok(success) => success,
        Err(failure) => {
            print_terminal_failure(&failure);
            return Err(failure.into());
        }
    };

    for tier in &success.skipped {
        Output::warning(&format!(
            "{} {}: {}",
            tier.backend.label(),
            tier.kind,
            tier.reason
        ));
    }

    let transcript = success.transcript;
    let rendered = format_transcript(&transcript, format)?;
    write_atomic(&output_path, &rendered)?;

    info!(
        "Wrote {} report from {} to {}",
        format.extension(),
        transcript.backend,
        output_path.display()
    );
    Output::success(&format!(
        "Transcript saved to {} ({}, {} segments)",
        output_path.display(),
        transcript.backend.label(),
        transcript.segments().len()
    ));

    Ok(output_path)
}

/// Print each tier's reason and remedy to stdout.
fn print_terminal_failure(failure: &TerminalFailure) {
    Output::header("All transcription methods failed");
    println!();
    for (i, tier) in failure.tiers.iter().enumerate() {
        Output::tier_failure(i + 1, tier);
    }
    println!();
    println!("To transcribe this file, enable at least one of the backends above.");
}
