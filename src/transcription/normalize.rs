//! Conversion from provider-native results to [`NormalizedTranscript`].

use super::{NormalizedTranscript, Segment};
use crate::backend::{
    AssemblyAiTranscript, BackendKind, BackendResult, HostedTranscript, LocalWhisperOutput,
};

/// Normalize a backend result. Pure; never reorders or drops segments.
pub fn normalize(result: &BackendResult) -> NormalizedTranscript {
    match result {
        BackendResult::Local(output) => normalize_local(output),
        BackendResult::AssemblyAi(transcript) => normalize_assemblyai(transcript),
        BackendResult::OpenAi(transcript) => normalize_hosted(transcript),
    }
}

fn normalize_local(output: &LocalWhisperOutput) -> NormalizedTranscript {
    NormalizedTranscript {
        backend: BackendKind::Local,
        full_text: output.text.clone(),
        segments: output.segments.as_ref().map(|segs| {
            segs.iter()
                .map(|s| Segment::new(s.start, s.end, s.text.trim()))
                .collect()
        }),
        language: output.language.clone(),
        duration_seconds: None,
    }
}

fn normalize_assemblyai(transcript: &AssemblyAiTranscript) -> NormalizedTranscript {
    NormalizedTranscript {
        backend: BackendKind::AssemblyAi,
        full_text: transcript.text.clone().unwrap_or_default(),
        segments: transcript.utterances.as_ref().map(|utterances| {
            utterances
                .iter()
                .map(|u| {
                    Segment::new(ms_to_seconds(u.start), ms_to_seconds(u.end), u.text.trim())
                        .with_speaker(u.speaker.clone())
                })
                .collect()
        }),
        language: transcript.language_code.clone(),
        duration_seconds: transcript.audio_duration,
    }
}

fn normalize_hosted(transcript: &HostedTranscript) -> NormalizedTranscript {
    NormalizedTranscript {
        backend: BackendKind::OpenAi,
        full_text: transcript.text.clone(),
        segments: transcript.segments.as_ref().map(|segs| {
            segs.iter()
                .map(|s| Segment::new(s.start, s.end, s.text.trim()))
                .collect()
        }),
        language: transcript.language.clone(),
        duration_seconds: transcript.duration,
    }
}

/// Milliseconds to seconds.
fn ms_to_seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}
