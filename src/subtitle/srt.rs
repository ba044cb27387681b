use super::timeline::SubtitleEntry;

/// `HH:MM:SS,mmm`, truncating sub-millisecond precision
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).floor() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Render entries with text as an SRT document
pub fn render(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .filter(|entry| !entry.text.is_empty())
        .map(|entry| {
            format!(
                "{}\n{} --> {}\n{}\n",
                entry.index,
                format_timestamp(entry.start_time),
                format_timestamp(entry.end_time),
                entry.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
