//! Tiered audio transcription.
//!
//! Transcribes an audio file by trying several external backends in a fixed
//! priority order and writing the first successful result as a uniform
//! report, whichever provider produced it.
//!
//! # Architecture
//!
//! - `backend` - One adapter per provider behind the `Backend` trait
//! - `orchestrator` - Ordered fallback across backends
//! - `transcription` - Normalized transcript model, normalizer and report output
//! - `config` - TOML settings, including the fallback order
//! - `cli` - Command-line interface for the `transcribe` binary
//! - `rewrite` - Ordered regex rewrite rules used by the `rewrite-auth` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use tiered_transcribe::backend::TranscriptionRequest;
//! use tiered_transcribe::config::Settings;
//! use tiered_transcribe::orchestrator::FallbackOrchestrator;
//! use tiered_transcribe::transcription::write_report;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = FallbackOrchestrator::new(&settings)?;
//!
//!     let request = TranscriptionRequest::new("meeting.m4a", None);
//!     let success = orchestrator.run(&request).await?;
//!     write_report(&success.transcript, "meeting_transcript.md".as_ref())?;
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rewrite;
pub mod transcription;

pub use error::{Result, TranscribeError};
