//! Heuristic scoring for content candidates
//!
//! All functions are pure and return values in `[0, 1]`. The composite is
//! `0.3 * readability + 0.4 * seo + 0.3 * engagement`.

use serde::{Deserialize, Serialize};

use crate::utils::clamp;

const READABILITY_WEIGHT: f64 = 0.3;
const SEO_WEIGHT: f64 = 0.4;
const ENGAGEMENT_WEIGHT: f64 = 0.3;

/// Target words per sentence
const IDEAL_SENTENCE_WORDS: f64 = 12.0;

/// Body length (in words) that earns the full length bonus
const LENGTH_SWEET_SPOT: std::ops::RangeInclusive<usize> = 250..=1200;

/// Title emoji counted as emphasis. Plain punctuation does not count.
const EMPHASIS_MARKERS: [char; 6] = ['🔥', '🚀', '✅', '⭐', '⚡', '✨'];

/// Per-candidate breakdown of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub readability: f64,
    pub seo: f64,
    pub engagement: f64,
    pub total: f64,
}

impl CandidateScore {
    /// Score one candidate against its topic and the trend search volume
    pub fn evaluate(topic: &str, title: &str, body: &str, volume: u64) -> Self {
        let readability = readability(body);
        let seo = seo_score(topic, title, body, volume);
        let engagement = engagement_score(title, body);
        Self {
            readability,
            seo,
            engagement,
            total: READABILITY_WEIGHT * readability
                + SEO_WEIGHT * seo
                + ENGAGEMENT_WEIGHT * engagement,
        }
    }
}

/// Penalizes average sentence length far from 12 words
///
/// Empty text scores 0.5.
pub fn readability(text: &str) -> f64 {
    if text.is_empty() {
        return 0.5;
    }

    let words = text.split_whitespace().count().max(1) as f64;
    let sentences = (text.matches('.').count()
        + text.matches("! ").count()
        + text.matches("? ").count())
    .max(1) as f64;

    let avg = words / sentences;
    let deviation = avg - IDEAL_SENTENCE_WORDS;
    clamp(1.0 / (1.0 + deviation * deviation / 144.0), 0.0, 1.0)
}

/// Topic keyword presence, body-length sweet spot and trend volume
pub fn seo_score(topic: &str, title: &str, body: &str, volume: u64) -> f64 {
    let topic = topic.trim().to_lowercase();
    let title = title.to_lowercase();
    let body = body.to_lowercase();

    let mut hits = 0u32;
    if !topic.is_empty() {
        hits += u32::from(title.contains(&topic));
        hits += u32::from(body.contains(&topic));
    }

    let length_bonus = if LENGTH_SWEET_SPOT.contains(&body.split_whitespace().count()) {
        1.0
    } else {
        0.6
    };
    let volume_norm = (volume as f64 / 5000.0).min(1.0);

    (0.4 * f64::from(hits) + 0.3 * length_bonus + 0.3 * volume_norm).min(1.0)
}

/// Emphasis emoji and questions in the title, heading density in the body
pub fn engagement_score(title: &str, body: &str) -> f64 {
    let emphasis = title.chars().filter(|c| EMPHASIS_MARKERS.contains(c)).count() as f64;
    let questions = title.matches('?').count() as f64;
    let headings = (body.matches("\n#").count() + body.matches("\n##").count()) as f64;

    (0.2 * emphasis + 0.2 * questions + 0.6 * (headings / 10.0).min(1.0)).min(1.0)
}
