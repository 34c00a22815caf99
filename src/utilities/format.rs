/// Render a duration the way the tracking screen shows countdowns, e.g.
/// "45s", "2m 05s", "1h 12m". Negative durations clamp to "0s".
pub fn duration_to_human_readable(d: chrono::Duration) -> String {
    let total = d.num_seconds().max(0);
    let (hours, rest) = (total / 3600, total % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
