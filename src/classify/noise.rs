//! Garbled-region detection.
//!
//! Interleaved columns from multi-column layouts show up as runs of short,
//! heading-like fragments with erratic line lengths. A sliding window over
//! non-blank lines measures both signals; windows exceeding both limits are
//! flagged and merged into spans that the classifier passes through verbatim.

use crate::config::ClassifierConfig;

/// A contiguous run of flagged lines (inclusive indices into the stream).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSpan {
    pub start: usize,
    pub end: usize,
    /// Noise score in (0, 1].
    pub noise: f32,
}

impl NoiseSpan {
    /// Confidence assigned to the span, strictly below `threshold`.
    pub fn confidence(&self, threshold: f32) -> f32 {
        ((1.0 - self.noise) * threshold).max(0.0)
    }
}

/// Find garbled spans in `lines`.
///
/// `heading_like` decides whether a single line looks like a heading
/// fragment; the classifier passes its own heading predicate.
pub fn detect_garbled<F>(lines: &[String], config: &ClassifierConfig, heading_like: F) -> Vec<NoiseSpan>
where
    F: Fn(&str) -> bool,
{
    let non_blank: Vec<usize> = (0..lines.len())
        .filter(|&i| !lines[i].trim().is_empty())
        .collect();
    let window = config.noise_window.max(2);
    if non_blank.len() < window {
        return Vec::new();
    }

    let fragment: Vec<bool> = non_blank.iter().map(|&i| heading_like(lines[i].trim())).collect();
    let lengths: Vec<f32> = non_blank
        .iter()
        .map(|&i| lines[i].trim().chars().count() as f32)
        .collect();

    // Per non-blank line: highest noise of any flagged window covering it.
    let mut scores = vec![0.0f32; non_blank.len()];
    for start in 0..=non_blank.len() - window {
        let range = start..start + window;
        let density = fragment[range.clone()].iter().filter(|&&f| f).count() as f32 / window as f32;
        let cv = coefficient_of_variation(&lengths[range.clone()]);

        if density >= config.max_heading_density && cv >= config.max_length_cv {
            let noise = 0.5 * density.min(1.0) + 0.5 * (cv / (2.0 * config.max_length_cv)).min(1.0);
            for score in &mut scores[range] {
                *score = score.max(noise);
            }
        }
    }

    let mut spans: Vec<NoiseSpan> = Vec::new();
    for (pos, &score) in scores.iter().enumerate() {
        if score <= 0.0 {
            continue;
        }
        let line = non_blank[pos];
        match spans.last_mut() {
            Some(span) if pos > 0 && scores[pos - 1] > 0.0 => {
                span.end = line;
                span.noise = span.noise.max(score);
            }
            _ => spans.push(NoiseSpan {
                start: line,
                end: line,
                noise: score,
            }),
        }
    }
    spans
}

fn coefficient_of_variation(values: &[f32]) -> f32 {
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    if mean <= f32::EPSILON {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    variance.sqrt() / mean
}
