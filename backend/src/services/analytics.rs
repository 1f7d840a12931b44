//! Descriptive statistics over a set of retrieved videos.

use crate::models::{AnalyticsReport, AnalyticsSummary, KeywordCount, VideoRecord};
use crate::utils::parse_upload_date;
use std::collections::HashMap;

pub const TOP_KEYWORDS: usize = 10;

pub const STOPWORDS: [&str; 27] = [
    "the", "and", "a", "to", "of", "in", "for", "on", "with", "is", "at", "by", "an", "be", "this",
    "that", "it", "from", "as", "are", "was", "but", "or", "if", "you", "i", "we",
];

const TRAILING_PUNCTUATION: [char; 4] = ['.', ',', '!', '?'];

/// Summarize `videos`. An empty slice yields [`AnalyticsReport::Empty`].
pub fn analyze(videos: &[VideoRecord]) -> AnalyticsReport {
    if videos.is_empty() {
        return AnalyticsReport::default();
    }

    let count = videos.len();
    let total_views: u128 = videos.iter().map(|v| u128::from(v.views)).sum();
    let total_likes: u128 = videos.iter().map(|v| u128::from(v.like_count)).sum();
    // Only present durations are summed, but the divisor is still the full count.
    let total_duration: u128 = videos
        .iter()
        .filter_map(|v| v.duration_seconds)
        .map(u128::from)
        .sum();

    AnalyticsReport::Summary(AnalyticsSummary {
        average_views: mean_floor(total_views, count),
        average_likes: mean_floor(total_likes, count),
        average_duration_seconds: mean_floor(total_duration, count),
        average_engagement_ratio: engagement_ratio(videos),
        top_keywords: top_keywords(videos, TOP_KEYWORDS),
        average_upload_frequency_days: upload_frequency_days(videos),
    })
}

/// Sums are widened to `u128`, so the floored mean of `u64` values always fits.
fn mean_floor(total: u128, count: usize) -> u64 {
    u64::try_from(total / count.max(1) as u128).unwrap_or(u64::MAX)
}

/// Mean of `likes / views` over videos with views, rounded to 4 decimals.
pub fn engagement_ratio(videos: &[VideoRecord]) -> f64 {
    let ratios: Vec<f64> = videos
        .iter()
        .filter(|v| v.views > 0)
        .map(|v| v.like_count as f64 / v.views as f64)
        .collect();

    if ratios.is_empty() {
        return 0.0;
    }
    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    (mean * 10_000.0).round() / 10_000.0
}

/// Most frequent title words; equal counts keep first-seen order.
pub fn top_keywords(videos: &[VideoRecord], limit: usize) -> Vec<KeywordCount> {
    let mut counts: HashMap<String, (u64, usize)> = HashMap::new();

    let tokens = videos
        .iter()
        .filter_map(|v| v.title.as_deref())
        .flat_map(|title| {
            title
                .to_lowercase()
                .split_whitespace()
                .map(|word| word.trim_end_matches(&TRAILING_PUNCTUATION[..]).to_string())
                .collect::<Vec<_>>()
        })
        .filter(|word| !word.is_empty() && !STOPWORDS.contains(&word.as_str()));

    for (position, word) in tokens.enumerate() {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, u64, usize)> = counts
        .into_iter()
        .map(|(word, (count, first_seen))| (word, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(word, count, _)| KeywordCount(word, count))
        .collect()
}

/// Mean gap in days between consecutive uploads; `None` with fewer than two dates.
pub fn upload_frequency_days(videos: &[VideoRecord]) -> Option<f64> {
    let mut dates: Vec<_> = videos
        .iter()
        .filter_map(|v| parse_upload_date(&v.published))
        .collect();
    if dates.len() < 2 {
        return None;
    }
    dates.sort();

    let gaps: Vec<i64> = dates
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days())
        .collect();
    Some(gaps.iter().sum::<i64>() as f64 / gaps.len() as f64)
}
