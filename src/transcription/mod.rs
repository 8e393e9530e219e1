//! Transcript model, normalization and output.
//!
//! Every backend result is converted into a [`NormalizedTranscript`] by
//! [`normalize`]; nothing downstream of this module sees a provider shape.

mod format;
mod models;
mod normalize;
mod report;

pub use format::{format_transcript, OutputFormat};
pub use models::{NormalizedTranscript, Segment};
pub use normalize::normalize;
pub use report::{render_markdown, write_atomic, write_report};
