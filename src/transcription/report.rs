//! Markdown report rendering and atomic file output.

use super::NormalizedTranscript;
use crate::error::Result;
use std::io::Write as _;
use std::path::Path;
use tracing::debug;

/// Render the markdown report.
///
/// Section order: title, metadata, full transcript, then segments (only
/// when there are any). Speaker-labelled transcripts get one heading per
/// utterance instead of plain timestamp entries.
pub fn render_markdown(transcript: &NormalizedTranscript) -> String {
    let speakers = transcript.has_speakers();
    let mut out = String::new();

    if speakers {
        out.push_str("# Audio Transcription with Speaker Diarization\n\n");
    } else {
        out.push_str("# Audio Transcription\n\n");
    }

    out.push_str(&format!("**Backend**: {}\n", transcript.backend.label()));
    if let Some(duration) = transcript.duration_seconds {
        out.push_str(&format!("**Duration**: {:.2} seconds\n", duration));
    }
    if let Some(language) = &transcript.language {
        out.push_str(&format!("**Language**: {}\n", language));
    }
    out.push_str("\n---\n\n");

    out.push_str("## Full Transcript\n\n");
    out.push_str(&transcript.full_text);
    out.push_str("\n\n---\n\n");

    let segments = transcript.segments();
    if segments.is_empty() {
        return out;
    }

    if speakers {
        out.push_str("## Speaker-Separated Transcript\n\n");
        for segment in segments {
            out.push_str(&format!(
                "### Speaker {} [{:.2}s - {:.2}s]\n\n",
                segment.speaker.as_deref().unwrap_or("?"),
                segment.start_seconds,
                segment.end_seconds
            ));
            out.push_str(&format!("{}\n\n", segment.text));
        }
    } else {
        out.push_str("## Timestamped Segments\n\n");
        for segment in segments {
            out.push_str(&format!(
                "**[{:.2}s - {:.2}s]**\n",
                segment.start_seconds, segment.end_seconds
            ));
            out.push_str(&format!("{}\n\n", segment.text));
        }
    }

    out
}

/// Write the markdown report to `path`.
pub fn write_report(transcript: &NormalizedTranscript, path: &Path) -> Result<()> {
    write_atomic(path, &render_markdown(transcript))
}

/// Write `contents` to a temp file beside `path`, then rename it into place.
///
/// Either the complete file appears at `path` or nothing changes there. An
/// existing file keeps its permissions; a new one gets the usual umask mode.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = temp_file_builder().tempfile_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    if let Ok(existing) = std::fs::metadata(path) {
        temp.as_file().set_permissions(existing.permissions())?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path)?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Temp files default to 0600; ask for 0666 so the umask decides.
#[cfg(unix)]
fn temp_file_builder() -> tempfile::Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;

    let mut builder = tempfile::Builder::new();
    builder.permissions(std::fs::Permissions::from_mode(0o666));
    builder
}

#[cfg(not(unix))]
fn temp_file_builder() -> tempfile::Builder<'static, 'static> {
    tempfile::Builder::new()
}
