use std::time::Duration;

use chrono::NaiveTime;

pub(crate) fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}

pub(crate) fn epoch_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

pub(crate) fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (num_str, suffix) = if s.ends_with(|c: char| c.is_ascii_alphabetic()) {
        let split = s.len() - 1;
        (&s[..split], &s[split..])
    } else {
        (s, "")
    };
    let num: u64 = num_str.parse().ok()?;
    if num == 0 {
        return None;
    }
    let secs = match suffix {
        "s" => num,
        "m" => num.checked_mul(60)?,
        "h" => num.checked_mul(3600)?,
        "d" => num.checked_mul(86400)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Parse a comma-separated list of `HH:MM` times. Result is sorted and deduplicated.
pub(crate) fn parse_checkpoints(s: &str) -> Option<Vec<NaiveTime>> {
    let mut times = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        times.push(NaiveTime::parse_from_str(part, "%H:%M").ok()?);
    }
    if times.is_empty() {
        return None;
    }
    times.sort();
    times.dedup();
    Some(times)
}

pub(crate) fn format_duration_human(secs: u64) -> String {
    if secs < 60 {
        format!("{secs} seconds")
    } else if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else if secs < 86400 {
        format!("{} hours", secs / 3600)
    } else {
        format!("{} days", secs / 86400)
    }
}
