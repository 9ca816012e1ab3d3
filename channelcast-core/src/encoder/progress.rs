//! Parses the encoder's `-progress pipe:2` key=value diagnostic stream.

/// Parses a single `out_time=HH:MM:SS.mmm` progress line into seconds.
/// Returns `None` for any other key or a malformed timestamp — callers are
/// expected to feed this one line at a time and ignore `None`.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let value = line.strip_prefix("out_time=")?;
    parse_timestamp(value.trim())
}

fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_out_time_line() {
        assert_eq!(parse_progress_line("out_time=00:16:40.100"), Some(1000.1));
    }

    #[test]
    fn ignores_other_keys() {
        assert_eq!(parse_progress_line("frame=120"), None);
        assert_eq!(parse_progress_line("out_time_us=1000000"), None);
    }

    #[test]
    fn rejects_malformed_timestamp() {
        assert_eq!(parse_progress_line("out_time=not-a-time"), None);
        assert_eq!(parse_progress_line("out_time=00:16"), None);
    }

    #[test]
    fn trims_trailing_whitespace() {
        assert_eq!(parse_progress_line("out_time=00:00:01.000\n"), Some(1.0));
    }
}
