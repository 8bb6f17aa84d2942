//! Small helpers shared across modules.

use std::path::Path;

/// Replace the home directory prefix with `~` for log output.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        return format!("~/{}", stripped.display());
    }
    path.display().to_string()
}

/// Render a countdown as `H:MM:SS` when an hour or more remains, `MM:SS` otherwise.
///
/// Negative input renders as zero.
pub fn format_time_remaining(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_time_remaining_under_an_hour() {
        assert_eq!(format_time_remaining(5_000), "00:05");
        assert_eq!(format_time_remaining(17 * 60_000 + 29_999), "17:29");
    }

    #[test]
    fn test_format_time_remaining_with_hours() {
        assert_eq!(format_time_remaining(3_600_000), "1:00:00");
        assert_eq!(format_time_remaining(2 * 3_600_000 + 5 * 60_000 + 9_000), "2:05:09");
    }

    #[test]
    fn test_format_time_remaining_clamps_negative() {
        assert_eq!(format_time_remaining(-1), "00:00");
    }

    #[test]
    fn test_private_path_outside_home() {
        let path = PathBuf::from("/var/tmp/minbar.json");
        assert_eq!(private_path(&path), "/var/tmp/minbar.json");
    }
}
