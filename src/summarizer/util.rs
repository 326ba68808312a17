use chrono::Utc;

pub fn now_epoch_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// Milliseconds since the Unix epoch, used as the notebook entry uid.
pub fn now_epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Squash a response body onto one line and cap it at `max_chars`
/// characters, marking a cut with `…`.
pub fn clip_for_log(input: &str, max_chars: usize) -> String {
    let flat = input
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}
