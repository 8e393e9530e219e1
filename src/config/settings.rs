//! Configuration settings.

use crate::backend::BackendKind;
use crate::error::{Result, TranscribeError};
use crate::transcription::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub fallback: FallbackSettings,
    pub local: LocalWhisperSettings,
    pub assemblyai: AssemblyAiSettings,
    pub openai: OpenAiSettings,
    pub output: OutputSettings,
}

/// Backend priority order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    /// Backends in the order they are tried.
    pub order: Vec<BackendKind>,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            // Free and offline first, then the richer of the two paid services.
            order: vec![BackendKind::Local, BackendKind::AssemblyAi, BackendKind::OpenAi],
        }
    }
}

/// Compute device for the local model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSetting {
    /// Use an accelerator when one is detected, CPU otherwise.
    #[default]
    Auto,
    Cuda,
    Cpu,
}

/// Local Whisper CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalWhisperSettings {
    /// Whisper executable name or path.
    pub binary: String,
    /// Model size passed to `--model`.
    pub model: String,
    /// Compute device selection.
    pub device: DeviceSetting,
    /// Command whose success signals a CUDA accelerator.
    pub accelerator_probe: String,
}

impl Default for LocalWhisperSettings {
    fn default() -> Self {
        Self {
            binary: "whisper".to_string(),
            model: "base".to_string(),
            device: DeviceSetting::Auto,
            accelerator_probe: "nvidia-smi -L".to_string(),
        }
    }
}

/// AssemblyAI diarization service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyAiSettings {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// API base URL.
    pub base_url: String,
    /// Seconds between status polls.
    pub poll_interval_seconds: u64,
    /// Give up polling after this many seconds.
    pub timeout_seconds: u64,
}

impl Default for AssemblyAiSettings {
    fn default() -> Self {
        Self {
            api_key_env: "ASSEMBLYAI_API_KEY".to_string(),
            base_url: "https://api.assemblyai.com".to_string(),
            poll_interval_seconds: 3,
            timeout_seconds: 1800, // 30 minutes
        }
    }
}

/// OpenAI hosted transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Transcription model.
    pub model: String,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "whisper-1".to_string(),
            timeout_seconds: 300,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputSettings {
    /// Default output format (markdown, json, srt, vtt).
    pub format: OutputFormat,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        validate_order(&self.fallback.order)?;
        url::Url::parse(&self.assemblyai.base_url)?;
        if self.assemblyai.poll_interval_seconds == 0 {
            return Err(TranscribeError::Config(
                "assemblyai.poll_interval_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("transcribe")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

/// Reject empty orders and backends listed twice.
pub fn validate_order(order: &[BackendKind]) -> Result<()> {
    if order.is_empty() {
        return Err(TranscribeError::Config(
            "fallback order must name at least one backend".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for kind in order {
        if !seen.insert(kind) {
            return Err(TranscribeError::Config(format!(
                "backend '{}' appears more than once in the fallback order",
                kind
            )));
        }
    }
    Ok(())
}
