//! CLI command implementations.

mod transcribe;

pub use transcribe::{default_output_path, execute, resolve_request, run_transcribe, transcribe_file};
