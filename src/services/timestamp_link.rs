//! Timestamp link codec.
//!
//! A companion link is an ordinary video URL with a `t` parameter and the
//! `&type=TSNotes` marker appended. Clicking such a link opens (or reuses) the
//! companion window and seeks its video to `t`.

use std::sync::OnceLock;

use regex::Regex;

/// Query fragment that tags a link as a companion link.
pub const COMPANION_MARKER: &str = "&type=TSNotes";

/// Query parameters that carry a playback position on common video sites.
const TIME_PARAMS: [&str; 3] = ["t", "start", "time_continue"];

fn unit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)([hms])").expect("static regex is valid"))
}

/// Returns true if the URL carries the companion marker.
pub fn is_companion_link(url: &str) -> bool {
    url.contains(COMPANION_MARKER)
}

/// Removes every occurrence of the companion marker.
pub fn strip_marker(url: &str) -> String {
    url.replace(COMPANION_MARKER, "")
}

/// Splits `url` into (base, query, fragment). Query and fragment exclude their sigils.
fn split_url(url: &str) -> (&str, Option<&str>, Option<&str>) {
    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    match rest.split_once('?') {
        Some((base, query)) => (base, Some(query), fragment),
        None => (rest, None, fragment),
    }
}

fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let (_, query, _) = split_url(url);
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Parses the leading decimal digits of `s`, like `parseInt`.
fn leading_number(s: &str) -> Option<u64> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Parses a `t` value: `1h2m3s`, `HH:MM:SS`, `MM:SS` or plain seconds.
pub fn parse_time_value(value: &str) -> Option<u64> {
    if value.contains(|c: char| matches!(c, 'h' | 'm' | 's')) {
        let mut total = 0u64;
        let mut matched = false;
        for cap in unit_regex().captures_iter(value) {
            let amount: u64 = cap[1].parse().ok()?;
            let factor = match &cap[2] {
                "h" => 3600,
                "m" => 60,
                _ => 1,
            };
            total = total.checked_add(amount.checked_mul(factor)?)?;
            matched = true;
        }
        return matched.then_some(total);
    }

    if value.contains(':') {
        let parts: Option<Vec<u64>> = value.split(':').map(|p| p.parse().ok()).collect();
        return match parts?.as_slice() {
            [h, m, s] => Some(h.saturating_mul(3600).saturating_add(m.saturating_mul(60)).saturating_add(*s)),
            [m, s] => Some(m.saturating_mul(60).saturating_add(*s)),
            _ => None,
        };
    }

    leading_number(value)
}

/// Reads the `t` parameter of a link as whole seconds. Missing or unparsable is 0.
pub fn extract_timestamp(url: &str) -> u64 {
    query_param(url, "t").and_then(parse_time_value).unwrap_or(0)
}

/// Drops the marker and every position parameter, keeping the rest of the URL intact.
pub fn clean_url(url: &str) -> String {
    let stripped = strip_marker(url);
    let (base, query, fragment) = split_url(&stripped);

    let kept: Vec<&str> = query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            !TIME_PARAMS.contains(&key) && *pair != "type=TSNotes"
        })
        .collect();

    let mut cleaned = base.to_string();
    if !kept.is_empty() {
        cleaned.push('?');
        cleaned.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        cleaned.push('#');
        cleaned.push_str(fragment);
    }
    cleaned
}

/// Builds a companion link pointing at `seconds` into the video at `url`.
pub fn build_link(url: &str, seconds: u64) -> String {
    let cleaned = clean_url(url);
    let (base_and_query, fragment) = match cleaned.split_once('#') {
        Some((head, fragment)) => (head.to_string(), Some(fragment.to_string())),
        None => (cleaned, None),
    };
    let separator = if base_and_query.contains('?') { '&' } else { '?' };
    let mut link = format!("{base_and_query}{separator}t={seconds}s{COMPANION_MARKER}");
    if let Some(fragment) = fragment {
        link.push('#');
        link.push_str(&fragment);
    }
    link
}

/// `MM:SS`, or `HH:MM:SS` once there is at least one hour.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Markdown link labelled with the formatted time, followed by a space.
pub fn markdown_link(url: &str, seconds: u64) -> String {
    format!("[{}]({}) ", format_time(seconds), build_link(url, seconds))
}

/// Normalizes URL input typed by the user. Blank input yields `None`.
pub fn normalize_user_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}
