/// Formats seconds as `mm:ss`, or `hh:mm:ss` from one hour on.
///
/// Negative and non-finite input formats as `00:00`. Fractions are dropped.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
