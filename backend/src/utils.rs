use chrono::NaiveDate;
use url::Url;

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";
const VIDEOS_TAB: &str = "videos";

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL_PREFIX}{video_id}")
}

/// Point a channel URL at its "videos" listing, e.g. `.../@handle` -> `.../@handle/videos`.
pub fn normalize_channel_url(channel_url: &str) -> String {
    let trimmed = channel_url.trim();

    if let Ok(mut parsed) = Url::parse(trimmed) {
        if parsed.cannot_be_a_base() {
            return trimmed.to_string();
        }
        let path = parsed.path().trim_end_matches('/').to_string();
        if !path.ends_with(&format!("/{VIDEOS_TAB}")) {
            parsed.set_path(&format!("{path}/{VIDEOS_TAB}"));
        }
        return parsed.to_string();
    }

    if trimmed.ends_with(&format!("/{VIDEOS_TAB}")) {
        trimmed.to_string()
    } else {
        format!("{}/{VIDEOS_TAB}", trimmed.trim_end_matches('/'))
    }
}

/// Display name for a registered channel: the last path segment of its URL.
pub fn channel_name_from_url(channel_url: &str) -> String {
    channel_url
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parse an upload date in `YYYYMMDD` form.
pub fn parse_upload_date(date_str: &str) -> Option<NaiveDate> {
    if date_str.len() != 8 || !date_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(date_str, "%Y%m%d").ok()
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Rebuild a URL that arrived as path segments (`https:/host/...` once empty segments are dropped).
pub fn rejoin_url_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let joined = segments.into_iter().collect::<Vec<_>>().join("/");

    for scheme in ["https:", "http:"] {
        if let Some(rest) = joined.strip_prefix(scheme) {
            let rest = rest.trim_start_matches('/');
            return format!("{scheme}//{rest}");
        }
    }
    joined
}

/// Percentage of `done` out of `total`, rounded up and capped at 100.
pub fn ceil_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (done.saturating_mul(100) + total - 1) / total;
    percent.min(100) as u8
}
