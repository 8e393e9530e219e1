//! CLI module.

pub mod commands;
mod output;

pub use output::Output;

use crate::backend::BackendKind;
use crate::transcription::OutputFormat;
use clap::Parser;

/// Transcribe an audio file, falling back across backends.
///
/// Tries the local Whisper CLI, then AssemblyAI (speaker diarization), then
/// the OpenAI Whisper API, and writes the first successful transcript as a
/// markdown report.
#[derive(Parser, Debug)]
#[command(name = "transcribe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Audio file to transcribe
    pub audio_path: String,

    /// Output file (default: <audio_stem>_transcript.<ext> beside the audio)
    pub output_path: Option<String>,

    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Backend order, comma separated (local, assemblyai, openai)
    #[arg(long, value_delimiter = ',')]
    pub order: Option<Vec<BackendKind>>,

    /// Output format (markdown, json, srt, vtt)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positional_only() {
        let cli = Cli::try_parse_from(["transcribe", "talk.m4a"]).unwrap();
        assert_eq!(cli.audio_path, "talk.m4a");
        assert!(cli.output_path.is_none());
        assert!(cli.order.is_none());
    }

    #[test]
    fn test_parse_order_and_format() {
        let cli = Cli::try_parse_from([
            "transcribe",
            "talk.m4a",
            "notes.md",
            "--order",
            "openai,local",
            "-f",
            "srt",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.output_path.as_deref(), Some("notes.md"));
        assert_eq!(cli.order, Some(vec![BackendKind::OpenAi, BackendKind::Local]));
        assert_eq!(cli.format, Some(OutputFormat::Srt));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_missing_audio_path_is_rejected() {
        assert!(Cli::try_parse_from(["transcribe"]).is_err());
        assert!(Cli::try_parse_from(["transcribe", "a.m4a", "--order", "deepgram"]).is_err());
    }
}
