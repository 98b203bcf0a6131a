//! Deterministic coherence heuristics: keyword coverage, discourse depth
//! and a term-frequency semantic similarity. These always run, with or
//! without the external judge.

use std::collections::{HashMap, HashSet};

/// Spanish stopwords excluded from topic keyword extraction.
const STOPWORDS: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "unos", "unas", "de", "en", "y", "o", "pero", "por",
    "para", "con", "a", "al", "del", "es", "son", "está", "están", "que", "cual", "como", "se",
    "su", "sus", "mi", "tu", "te", "me", "le", "les", "nos", "lo", "este", "esta",
];

/// Discourse connectors and analysis markers that signal elaboration.
const DEPTH_MARKERS: &[&str] = &[
    "porque", "debido", "causa", "consecuencia", "resultado", "ejemplo", "como", "además",
    "también", "sin embargo", "por lo tanto", "en conclusión", "finalmente", "así", "entonces",
    "específicamente", "particularmente", "significa", "implica", "demuestra", "evidencia",
    "importante", "fundamental", "esencial", "clave", "primero", "segundo", "tercero",
];

/// Result of matching topic keywords against a participant's text.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatch {
    /// 0-100.
    pub score: f64,
    /// Matched keywords, capped at 10 for display.
    pub found: Vec<String>,
    pub total_keywords: usize,
}

/// Topic keywords: title + description words, lowercased, stopwords and
/// words shorter than 4 characters removed.
fn topic_keywords(title: &str, description: &str) -> HashSet<String> {
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();
    format!("{} {}", title, description)
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() >= 4 && !stopwords.contains(w))
        .map(str::to_string)
        .collect()
}

/// Fraction of topic keywords present in the text, scaled so covering 40%
/// of them already earns full marks. Neutral 50 when the topic yields no
/// keywords at all.
pub fn keyword_score(text: &str, title: &str, description: &str) -> KeywordMatch {
    let keywords = topic_keywords(title, description);
    if keywords.is_empty() {
        return KeywordMatch {
            score: 50.0,
            found: Vec::new(),
            total_keywords: 0,
        };
    }

    let text_words: HashSet<String> = text
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut found: Vec<String> = keywords.intersection(&text_words).cloned().collect();
    found.sort();

    let fraction = found.len() as f64 / keywords.len() as f64;
    let score = (fraction * 100.0 * 2.5).min(100.0);

    found.truncate(10);
    KeywordMatch {
        score,
        found,
        total_keywords: keywords.len(),
    }
}

/// Depth proxy: word-count tier, plus bonuses for discourse connectors and
/// well-sized sentences. 0-100.
pub fn depth_score(text: &str) -> f64 {
    let word_count = text.split_whitespace().count();

    let base = if word_count < 20 {
        10.0
    } else if word_count < 40 {
        30.0
    } else if word_count < 80 {
        50.0
    } else if word_count < 150 {
        70.0
    } else {
        85.0
    };

    let lower = text.to_lowercase();
    let markers = DEPTH_MARKERS.iter().filter(|m| lower.contains(*m)).count();
    let marker_bonus = (markers as f64 * 3.0).min(15.0);

    let sentences = text.matches(['.', '?', '!']).count();
    let sentence_bonus = if sentences > 0 {
        let words_per_sentence = word_count as f64 / sentences as f64;
        if (10.0..=25.0).contains(&words_per_sentence) {
            5.0
        } else {
            0.0
        }
    } else {
        0.0
    };

    (base + marker_bonus + sentence_bonus).min(100.0)
}

/// Term-frequency cosine similarity between the text and the topic,
/// scaled so typical related speech lands in a usable 0-100 range.
pub fn semantic_coherence(text: &str, title: &str, description: &str) -> f64 {
    let topic = format!("{}. {}", title, description);
    let similarity = tf_cosine(text, &topic);
    (similarity * 125.0).clamp(0.0, 100.0)
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut counts: HashMap<String, f64> = HashMap::new();
    for word in text.to_lowercase().split_whitespace() {
        let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if word.chars().count() >= 3 {
            *counts.entry(word).or_insert(0.0) += 1.0;
        }
    }
    counts
}

fn tf_cosine(a: &str, b: &str) -> f64 {
    let tf_a = term_frequencies(a);
    let tf_b = term_frequencies(b);
    if tf_a.is_empty() || tf_b.is_empty() {
        return 0.0;
    }

    let dot: f64 = tf_a
        .iter()
        .filter_map(|(term, &wa)| tf_b.get(term).map(|&wb| wa * wb))
        .sum();
    let norm_a: f64 = tf_a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = tf_b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
