//! Local Whisper CLI backend.
//!
//! Runs the `whisper` command on this machine and reads back its JSON output.

use super::{Backend, BackendKind, BackendOutcome, BackendResult, TranscriptionRequest};
use crate::config::{DeviceSetting, LocalWhisperSettings};
use crate::error::{Result, TranscribeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// One segment as written by the Whisper CLI (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalWhisperSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// The Whisper CLI's JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalWhisperOutput {
    pub text: String,
    #[serde(default)]
    pub segments: Option<Vec<LocalWhisperSegment>>,
    #[serde(default)]
    pub language: Option<String>,
    /// Device the model ran on (filled in by the backend).
    #[serde(default)]
    pub device: String,
    /// Model size used (filled in by the backend).
    #[serde(default)]
    pub model: String,
}

/// Backend that shells out to a locally installed Whisper CLI.
pub struct LocalWhisperBackend {
    binary: String,
    model: String,
    device: DeviceSetting,
    accelerator_probe: String,
}

impl LocalWhisperBackend {
    /// Create a backend with default settings (`whisper`, model `base`).
    pub fn new() -> Self {
        Self::with_config(&LocalWhisperSettings::default())
    }

    pub fn with_config(settings: &LocalWhisperSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            model: settings.model.clone(),
            device: settings.device,
            accelerator_probe: settings.accelerator_probe.clone(),
        }
    }

    /// Check that the Whisper executable can be started.
    async fn check_installed(&self) -> std::result::Result<(), String> {
        let result = Command::new(&self.binary)
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => Err(format!("{} is installed but not working correctly", self.binary)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(format!("{} not found in PATH", self.binary))
            }
            Err(e) => Err(format!("{}: {}", self.binary, e)),
        }
    }

    /// Pick the compute device, probing for an accelerator in auto mode.
    async fn select_device(&self) -> &'static str {
        match self.device {
            DeviceSetting::Cuda => "cuda",
            DeviceSetting::Cpu => "cpu",
            DeviceSetting::Auto => {
                if probe_succeeds(&self.accelerator_probe).await {
                    "cuda"
                } else {
                    "cpu"
                }
            }
        }
    }

    /// Run the CLI and parse its JSON output.
    async fn transcribe(&self, audio_path: &Path, device: &str) -> Result<LocalWhisperOutput> {
        let temp_dir = tempfile::tempdir()?;

        info!("Loading Whisper model '{}' on {}", self.model, device);

        let output = Command::new(&self.binary)
            .arg(audio_path)
            .arg("--model").arg(&self.model)
            .arg("--device").arg(device)
            .arg("--output_format").arg("json")
            .arg("--output_dir").arg(temp_dir.path())
            .arg("--verbose").arg("False")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscribeError::ToolNotFound(self.binary.clone())
                } else {
                    TranscribeError::ToolFailed(format!("{} execution failed: {}", self.binary, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::ToolFailed(format!(
                "{} failed: {}",
                self.binary,
                last_line(&stderr)
            )));
        }

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TranscribeError::InvalidInput("audio path has no file stem".into()))?;
        let json_path = temp_dir.path().join(format!("{}.json", stem));

        let content = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            TranscribeError::ToolFailed(format!(
                "{} produced no JSON output at {}: {}",
                self.binary,
                json_path.display(),
                e
            ))
        })?;

        let mut parsed = parse_output(&content)?;
        parsed.device = device.to_string();
        parsed.model = self.model.clone();

        debug!(
            "Local Whisper returned {} segments",
            parsed.segments.as_ref().map_or(0, |s| s.len())
        );
        Ok(parsed)
    }
}

impl Default for LocalWhisperBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for LocalWhisperBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn remedy(&self) -> String {
        format!(
            "Install the Whisper CLI (free, runs offline): pip install openai-whisper \
             (expects '{}' in PATH)",
            self.binary
        )
    }

    #[instrument(skip(self, request), fields(audio_path = %request.audio_path().display()))]
    async fn attempt(&self, request: &TranscriptionRequest) -> BackendOutcome {
        if let Err(reason) = self.check_installed().await {
            return BackendOutcome::Unavailable(reason);
        }

        let device = self.select_device().await;
        match self.transcribe(request.audio_path(), device).await {
            Ok(output) => BackendOutcome::Success(BackendResult::Local(output)),
            Err(e) => {
                warn!("Local Whisper failed: {}", e);
                BackendOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Parse the Whisper CLI JSON document.
pub(crate) fn parse_output(content: &str) -> Result<LocalWhisperOutput> {
    Ok(serde_json::from_str(content)?)
}

/// Run a probe command line; true only if it starts and exits successfully.
async fn probe_succeeds(command_line: &str) -> bool {
    let mut parts = command_line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return false;
    };

    Command::new(cmd)
        .args(parts)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Last non-empty line of tool output, which usually holds the actual error.
fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_tool_settings() -> LocalWhisperSettings {
        LocalWhisperSettings {
            binary: "tiered-transcribe-no-such-whisper".to_string(),
            accelerator_probe: "tiered-transcribe-no-such-probe".to_string(),
            ..LocalWhisperSettings::default()
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let backend = LocalWhisperBackend::with_config(&missing_tool_settings());
        let request = TranscriptionRequest::new("/tmp/does-not-matter.m4a", None);

        match backend.attempt(&request).await {
            BackendOutcome::Unavailable(reason) => assert!(reason.contains("not found")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auto_device_falls_back_to_cpu() {
        let backend = LocalWhisperBackend::with_config(&missing_tool_settings());
        assert_eq!(backend.select_device().await, "cpu");
    }

    #[tokio::test]
    async fn test_forced_device() {
        let settings = LocalWhisperSettings {
            device: DeviceSetting::Cuda,
            ..missing_tool_settings()
        };
        let backend = LocalWhisperBackend::with_config(&settings);
        assert_eq!(backend.select_device().await, "cuda");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_auto_device_uses_cuda_when_accelerator_found() {
        let settings = LocalWhisperSettings {
            accelerator_probe: "true".to_string(),
            ..missing_tool_settings()
        };
        let backend = LocalWhisperBackend::with_config(&settings);
        assert_eq!(backend.select_device().await, "cuda");
    }

    /// Stand-in `whisper` that answers `--help` and then runs `body` with
    /// `$audio`, `$device` and `$outdir` parsed from the arguments.
    #[cfg(unix)]
    fn fake_whisper(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            r#"#!/bin/sh
if [ "$1" = "--help" ]; then exit 0; fi
audio="$1"; shift
while [ $# -gt 0 ]; do
  case "$1" in
    --device) device="$2"; shift 2 ;;
    --output_dir) outdir="$2"; shift 2 ;;
    *) shift ;;
  esac
done
{}
"#,
            body
        );
        let path = dir.join("fake-whisper");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_success_reads_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_whisper(
            dir.path(),
            r#"stem=$(basename "$audio"); stem="${stem%.*}"
printf '{"text": " hello world", "language": "en", "segments": [{"start": 0.0, "end": 1.0, "text": " hello"}, {"start": 1.0, "end": 2.0, "text": " world"}]}' > "$outdir/$stem.json""#,
        );
        let settings = LocalWhisperSettings {
            binary,
            model: "tiny".to_string(),
            device: DeviceSetting::Auto,
            accelerator_probe: "true".to_string(),
        };
        let backend = LocalWhisperBackend::with_config(&settings);

        let audio = dir.path().join("hello.wav");
        std::fs::write(&audio, b"fake audio").unwrap();
        let request = TranscriptionRequest::new(&audio, None);

        let output = match backend.attempt(&request).await {
            BackendOutcome::Success(BackendResult::Local(output)) => output,
            other => panic!("expected local success, got {:?}", other),
        };
        assert_eq!(output.text, " hello world");
        assert_eq!(output.segments.unwrap().len(), 2);
        assert_eq!(output.device, "cuda");
        assert_eq!(output.model, "tiny");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_failure_reports_last_stderr_line() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_whisper(
            dir.path(),
            "echo 'loading model' >&2\necho 'RuntimeError: CUDA out of memory' >&2\nexit 1",
        );
        let settings = LocalWhisperSettings {
            binary,
            device: DeviceSetting::Cpu,
            ..LocalWhisperSettings::default()
        };
        let backend = LocalWhisperBackend::with_config(&settings);

        let audio = dir.path().join("hello.wav");
        std::fs::write(&audio, b"fake audio").unwrap();

        match backend.attempt(&TranscriptionRequest::new(&audio, None)).await {
            BackendOutcome::Failed(reason) => {
                assert!(reason.contains("RuntimeError: CUDA out of memory"));
                assert!(!reason.contains("loading model"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_without_json_output_is_failed() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_whisper(dir.path(), "exit 0");
        let settings = LocalWhisperSettings {
            binary,
            device: DeviceSetting::Cpu,
            ..LocalWhisperSettings::default()
        };
        let backend = LocalWhisperBackend::with_config(&settings);

        let audio = dir.path().join("silent.wav");
        std::fs::write(&audio, b"fake audio").unwrap();

        match backend.attempt(&TranscriptionRequest::new(&audio, None)).await {
            BackendOutcome::Failed(reason) => assert!(reason.contains("produced no JSON output")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_cli_json() {
        let json = r#"{
            "text": " Hello there. General Kenobi.",
            "segments": [
                {"id": 0, "seek": 0, "start": 0.0, "end": 1.8, "text": " Hello there.", "tokens": [1, 2]},
                {"id": 1, "seek": 0, "start": 1.8, "end": 3.2, "text": " General Kenobi.", "tokens": [3]}
            ],
            "language": "en"
        }"#;

        let output = parse_output(json).unwrap();
        assert_eq!(output.text, " Hello there. General Kenobi.");
        assert_eq!(output.language.as_deref(), Some("en"));
        let segments = output.segments.unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start, 1.8);
    }

    #[test]
    fn test_parse_cli_json_without_segments() {
        let output = parse_output(r#"{"text": "just text"}"#).unwrap();
        assert!(output.segments.is_none());
        assert!(output.language.is_none());
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line("warning\nRuntimeError: boom\n\n"), "RuntimeError: boom");
        assert_eq!(last_line(""), "no error output");
    }
}
