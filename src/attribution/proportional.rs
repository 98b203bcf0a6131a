//! Proportional fallback: split the transcript's words into shares
//! proportional to each participant's screen time.

use crate::attribution::SpeechAttribution;
use crate::defaults;
use crate::types::{Participant, Transcript};

pub fn attribute(transcript: &Transcript, participants: &[Participant]) -> Vec<SpeechAttribution> {
    if participants.is_empty() {
        return Vec::new();
    }

    let words: Vec<&str> = transcript.full_text.split_whitespace().collect();
    let total_words = words.len();
    if total_words == 0 {
        return participants
            .iter()
            .map(|_| SpeechAttribution::from_text(String::new(), true))
            .collect();
    }

    let total_time: f64 = participants.iter().map(|p| p.total_time).sum();
    let n = participants.len();

    // Word share per participant, proportional to screen time; equal split
    // when no screen time was measured at all.
    let mut shares: Vec<usize> = participants
        .iter()
        .map(|p| {
            let fraction = if total_time > 0.0 {
                p.total_time / total_time
            } else {
                1.0 / n as f64
            };
            (fraction * total_words as f64).round() as usize
        })
        .collect();

    // Everyone gets a scorable floor when the text is long enough.
    let floor = defaults::PROPORTIONAL_MIN_WORDS.min(total_words / n);
    for share in &mut shares {
        if *share < floor {
            *share = floor;
        }
    }

    // Consume shares left to right, reserving the floor for everyone still
    // waiting; the last participant absorbs rounding.
    let mut result = Vec::with_capacity(n);
    let mut cursor = 0usize;
    for (i, share) in shares.iter().enumerate() {
        let end = if i == n - 1 {
            total_words
        } else {
            let reserved = floor * (n - 1 - i);
            (cursor + share)
                .min(total_words.saturating_sub(reserved))
                .max(cursor)
        };
        let text = words[cursor..end].join(" ");
        result.push(SpeechAttribution::from_text(text, true));
        cursor = end;
    }

    result
}
