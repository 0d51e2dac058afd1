//! Number formatting for dashboard display.
//!
//! All counters, balances and percentages go through this module so every
//! view renders them the same way. European style (swapping `.` and `,`) is
//! supported for locales such as `es-ES`.

/// Swap `.` and `,` in a formatted string.
fn europeanize(s: &str) -> String {
    // Formatted strings here are purely numeric (with optional K/M/% suffix),
    // so a global swap is safe.
    s.chars()
        .map(|c| match c {
            '.' => ',',
            ',' => '.',
            _ => c,
        })
        .collect()
}

#[inline]
fn maybe_eu(s: String, european: bool) -> String {
    if european { europeanize(&s) } else { s }
}

/// Format a large number with K/M suffix for compact display.
///
/// # Examples
/// ```
/// use lootsync_types::formatting::format_compact;
/// assert_eq!(format_compact(500, false), "500");
/// assert_eq!(format_compact(1_500, false), "1.50K");
/// assert_eq!(format_compact(1_500_000, false), "1.50M");
/// assert_eq!(format_compact(1_500, true), "1,50K");
/// ```
pub fn format_compact(n: i64, european: bool) -> String {
    let abs = n.unsigned_abs();
    let s = if abs >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if abs >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    };
    maybe_eu(s, european)
}

/// Format a counter with thousands separators.
///
/// # Examples
/// ```
/// use lootsync_types::formatting::format_thousands;
/// assert_eq!(format_thousands(0, false), "0");
/// assert_eq!(format_thousands(1_500, false), "1,500");
/// assert_eq!(format_thousands(1_500_000, true), "1.500.000");
/// ```
pub fn format_thousands(n: i64, european: bool) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    if n < 0 {
        result.insert(0, '-');
    }
    // Only `,` separators are present, a plain replace is enough.
    if european { result.replace(',', ".") } else { result }
}

/// Format a percentage from count/total with 1 decimal place.
///
/// Returns `"0%"` if total is zero.
///
/// # Examples
/// ```
/// use lootsync_types::formatting::format_pct_ratio;
/// assert_eq!(format_pct_ratio(3, 10, false), "30.0%");
/// assert_eq!(format_pct_ratio(3, 10, true), "30,0%");
/// assert_eq!(format_pct_ratio(0, 0, false), "0%");
/// ```
pub fn format_pct_ratio(count: i64, total: i64, european: bool) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    maybe_eu(
        format!("{:.1}%", count as f64 / total as f64 * 100.0),
        european,
    )
}

/// Format played time given in minutes.
///
/// # Examples
/// ```
/// use lootsync_types::formatting::format_minutes;
/// assert_eq!(format_minutes(45), "45m");
/// assert_eq!(format_minutes(90), "1h 30m");
/// assert_eq!(format_minutes(0), "0m");
/// ```
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}
