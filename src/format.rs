//! Duration and commit message formatting for chart labels and tooltips

/// Shown wherever a duration is missing or unusable.
pub const MISSING_DURATION: &str = "N/A";

/// Longest commit message (in characters) shown in a tooltip.
pub const MAX_MESSAGE_CHARS: usize = 60;

/// Render a duration in seconds as `"1 hr 2 min 3 sec"`, dropping leading zero units.
///
/// Missing, negative or non-finite input yields [`MISSING_DURATION`].
pub fn format_duration(seconds: Option<f64>) -> String {
    let secs = match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => s.round() as u64,
        _ => return MISSING_DURATION.to_string(),
    };

    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;

    if h > 0 {
        format!("{} hr {} min {} sec", h, m, s)
    } else if m > 0 {
        format!("{} min {} sec", m, s)
    } else {
        format!("{} sec", s)
    }
}

/// Convert seconds to minutes for plotting, rounded to two decimals.
///
/// Missing, negative or non-finite input plots as 0, the same inputs
/// [`format_duration`] shows as [`MISSING_DURATION`].
pub fn to_minute_scale(seconds: Option<f64>) -> f64 {
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => (s / 60.0 * 100.0).round() / 100.0,
        _ => 0.0,
    }
}

/// Shorten a commit message to its first line and escape it for tooltip HTML.
pub fn truncate_message(text: Option<&str>) -> String {
    let first_line = text.and_then(|t| t.lines().next()).unwrap_or("").trim();
    if first_line.is_empty() {
        return String::new();
    }

    let shortened = if first_line.chars().count() > MAX_MESSAGE_CHARS {
        let mut cut: String = first_line.chars().take(MAX_MESSAGE_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        first_line.to_string()
    };

    escape_html(&shortened)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
