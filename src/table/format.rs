/// Human readable duration: `N ms` below one second, else `1h 2m 3s` without
/// leading zero units.
pub fn format_duration(milliseconds: i64) -> String {
    if milliseconds < 1000 {
        return format!("{milliseconds} ms");
    }

    let total_seconds = milliseconds / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `1st`, `2nd`, `13th`, `99.5th`...
pub fn ordinal(value: f64) -> String {
    if value.fract() != 0.0 {
        return format!("{value}th");
    }

    #[allow(clippy::cast_possible_truncation)]
    let n = value as i64;
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Keeps cell text from breaking out of its Markdown table column.
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn link(text: &str, url: &str) -> String {
    if url.is_empty() {
        escape_cell(text)
    } else {
        format!("[{}]({url})", escape_cell(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod format_duration {
        use super::*;

        #[test]
        fn sub_second_in_milliseconds() {
            assert_eq!(format_duration(0), "0 ms");
            assert_eq!(format_duration(999), "999 ms");
        }

        #[test]
        fn omits_leading_zero_units() {
            assert_eq!(format_duration(1_000), "1s");
            assert_eq!(format_duration(61_500), "1m 1s");
            assert_eq!(format_duration(3_600_000), "1h 0m 0s");
            assert_eq!(format_duration(90_075_000), "25h 1m 15s");
        }
    }

    #[test]
    fn ordinal_suffixes() {
        assert_eq!(ordinal(1.0), "1st");
        assert_eq!(ordinal(2.0), "2nd");
        assert_eq!(ordinal(3.0), "3rd");
        assert_eq!(ordinal(11.0), "11th");
        assert_eq!(ordinal(12.0), "12th");
        assert_eq!(ordinal(22.0), "22nd");
        assert_eq!(ordinal(95.0), "95th");
        assert_eq!(ordinal(99.5), "99.5th");
    }

    #[test]
    fn escapes_pipes_and_newlines() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn link_without_url_is_plain_text() {
        assert_eq!(link("ci", ""), "ci");
        assert_eq!(link("ci", "https://x"), "[ci](https://x)");
    }
}
