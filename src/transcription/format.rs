//! Transcript output formats (Markdown, JSON, SRT, VTT).

use super::{render_markdown, NormalizedTranscript, Segment};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report.
    #[default]
    Markdown,
    Json,
    Srt,
    Vtt,
}

impl OutputFormat {
    /// File extension used for default output paths.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            _ => Err(format!("Unknown format: {}. Use markdown, json, srt, or vtt.", s)),
        }
    }
}

/// Render a transcript in the given format.
pub fn format_transcript(transcript: &NormalizedTranscript, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(transcript)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(transcript)?),
        OutputFormat::Srt => Ok(format_srt(transcript)),
        OutputFormat::Vtt => Ok(format_vtt(transcript)),
    }
}

/// Cues for subtitle formats; a single cue over the full text when there are no segments.
fn cues(transcript: &NormalizedTranscript) -> Vec<Segment> {
    let segments = transcript.segments();
    if !segments.is_empty() {
        return segments.to_vec();
    }

    vec![Segment::new(
        0.0,
        transcript.duration_seconds.unwrap_or(0.0),
        transcript.full_text.trim(),
    )]
}

/// Subtitle text, prefixed with the speaker when known.
fn cue_text(segment: &Segment) -> String {
    match &segment.speaker {
        Some(speaker) => format!("[Speaker {}] {}", speaker, segment.text),
        None => segment.text.clone(),
    }
}

/// Format as SRT (SubRip).
fn format_srt(transcript: &NormalizedTranscript) -> String {
    let mut output = String::new();

    for (i, segment) in cues(transcript).iter().enumerate() {
        // Sequence number (1-indexed)
        output.push_str(&format!("{}\n", i + 1));

        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(segment.start_seconds),
            format_srt_timestamp(segment.end_seconds)
        ));

        output.push_str(&cue_text(segment));
        output.push_str("\n\n");
    }

    output
}

/// Format as WebVTT.
fn format_vtt(transcript: &NormalizedTranscript) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for (i, segment) in cues(transcript).iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));

        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_timestamp(segment.start_seconds),
            format_vtt_timestamp(segment.end_seconds)
        ));

        output.push_str(&cue_text(segment));
        output.push_str("\n\n");
    }

    output
}

/// Split seconds into (hours, minutes, seconds, millis), rounding to the nearest ms.
fn split_timestamp(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

/// Format timestamp for SRT (00:00:00,000).
fn format_srt_timestamp(seconds: f64) -> String {
    let (hours, minutes, secs, ms) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}

/// Format timestamp for VTT (00:00:00.000).
fn format_vtt_timestamp(seconds: f64) -> String {
    let (hours, minutes, secs, ms) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}
