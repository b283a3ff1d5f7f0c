/// Formats a duration in seconds as `mm:ss`, truncating fractions.
///
/// This is the precision used by CSV export and the transport time label;
/// minutes are not capped at 59.
///
/// # Example
/// ```
/// use engine::format_mmss;
///
/// assert_eq!(format_mmss(75.9), "01:15");
/// assert_eq!(format_mmss(0.0), "00:00");
/// ```
pub fn format_mmss(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Parses a `mm:ss` timestamp back into seconds.
///
/// Accepts the output of [`format_mmss`], including minute values above 59.
pub fn parse_mmss(text: &str) -> Option<f64> {
    let (minutes, seconds) = text.split_once(':')?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    Some((minutes * 60 + seconds) as f64)
}
