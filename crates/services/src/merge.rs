//! Transcript-to-speaker merge: combines raw transcript segments with
//! diarization output into speaker-attributed segments.

use stylecoach_db::models::{Speaker, TranscriptSegment};

/// One labeled time range from the diarization collaborator. Ephemeral:
/// consumed by the merge, never persisted as a primary record.
#[derive(Debug, Clone, PartialEq)]
pub struct DiarizationSpan {
    /// Opaque label from the diarization service, e.g. "SPEAKER_00".
    pub speaker_label: String,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedSegment {
    pub speaker: Speaker,
    pub text: String,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub confidence: f64,
}

/// Assigns each transcript segment the diarization span with maximum
/// temporal overlap. No overlapping span at all leaves the segment
/// `unknown`. Ties resolve deterministically: earliest span start wins,
/// then the lexicographically smaller label.
///
/// Role inference: the label that starts chronologically first within
/// the chunk is the stylist (they greet the customer); every other
/// label is the customer.
pub fn merge_segments(
    transcripts: &[TranscriptSegment],
    spans: &[DiarizationSpan],
) -> Vec<MergedSegment> {
    let stylist_label = spans
        .iter()
        .min_by(|a, b| {
            a.start_time_ms
                .cmp(&b.start_time_ms)
                .then_with(|| a.speaker_label.cmp(&b.speaker_label))
        })
        .map(|s| s.speaker_label.clone());

    let mut merged: Vec<MergedSegment> = transcripts
        .iter()
        .map(|t| {
            let start_ms = sec_to_ms(t.start_time_sec);
            let end_ms = sec_to_ms(t.end_time_sec);

            let best = spans
                .iter()
                .filter(|s| overlap_ms(start_ms, end_ms, s.start_time_ms, s.end_time_ms) > 0)
                .max_by(|a, b| {
                    let ov_a = overlap_ms(start_ms, end_ms, a.start_time_ms, a.end_time_ms);
                    let ov_b = overlap_ms(start_ms, end_ms, b.start_time_ms, b.end_time_ms);
                    ov_a.cmp(&ov_b)
                        // Equal overlap: earlier start, then smaller label wins.
                        .then_with(|| b.start_time_ms.cmp(&a.start_time_ms))
                        .then_with(|| b.speaker_label.cmp(&a.speaker_label))
                });

            let speaker = match (&best, &stylist_label) {
                (Some(span), Some(first)) => {
                    if span.speaker_label == *first {
                        Speaker::Stylist
                    } else {
                        Speaker::Customer
                    }
                }
                _ => Speaker::Unknown,
            };

            MergedSegment {
                speaker,
                text: t.text.clone(),
                start_time_ms: start_ms,
                end_time_ms: end_ms,
                confidence: t.confidence,
            }
        })
        .collect();

    merged.sort_by_key(|m| m.start_time_ms);
    merged
}

pub fn overlap_ms(start_a: i64, end_a: i64, start_b: i64, end_b: i64) -> i64 {
    (end_a.min(end_b) - start_a.max(start_b)).max(0)
}

fn sec_to_ms(sec: f64) -> i64 {
    (sec * 1000.0).round() as i64
}
