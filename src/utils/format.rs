//! Formatting utilities for file sizes, names, and other display values.

use chrono::{DateTime, Utc};

/// Format file size for display (e.g., "1.2K", "3.4M").
///
/// Returns a right-aligned string for terminal display or compact string for UI.
pub fn format_size(size: Option<u64>, right_align: bool) -> String {
    match size {
        None => {
            if right_align {
                "    -".to_string()
            } else {
                "-".to_string()
            }
        }
        Some(bytes) => {
            let (value, unit) = if bytes >= 1_000_000_000 {
                (bytes as f64 / 1_000_000_000.0, 'G')
            } else if bytes >= 1_000_000 {
                (bytes as f64 / 1_000_000.0, 'M')
            } else if bytes >= 1_000 {
                (bytes as f64 / 1_000.0, 'K')
            } else if right_align {
                return format!("{:4}B", bytes);
            } else {
                return format!("{}B", bytes);
            };

            if right_align {
                format!("{:4.1}{}", value, unit)
            } else {
                format!("{:.1}{}", value, unit)
            }
        }
    }
}

/// Format a timestamp as ISO date (YYYY-MM-DD), or `-` when missing.
pub fn format_date_iso(timestamp: Option<&DateTime<Utc>>) -> String {
    timestamp
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Shorten a long name by cutting out its middle.
///
/// Keeps the first half of `max_len` characters and the last five, so the
/// extension stays visible.
pub fn ellipsis_in_middle(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        return name.to_string();
    }

    let tail_len = chars.len().min(5);
    let head_len = (max_len / 2).min(chars.len() - tail_len);
    let head: String = chars[..head_len].iter().collect();
    let tail: String = chars[chars.len() - tail_len..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Extract the lowercase extension of a file name (without the dot).
///
/// Returns an empty string when the name has no extension.
pub fn file_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(None, false), "-");
        assert_eq!(format_size(None, true), "    -");
        assert_eq!(format_size(Some(500), false), "500B");
        assert_eq!(format_size(Some(1500), false), "1.5K");
        assert_eq!(format_size(Some(1_500_000), false), "1.5M");
        assert_eq!(format_size(Some(2_000_000_000), false), "2.0G");
    }

    #[test]
    fn test_format_date_iso() {
        let ts = Utc.timestamp_opt(1704067200, 0).unwrap();
        assert_eq!(format_date_iso(Some(&ts)), "2024-01-01");
        assert_eq!(format_date_iso(None), "-");
    }

    #[test]
    fn test_ellipsis_in_middle() {
        assert_eq!(ellipsis_in_middle("short.txt", 40), "short.txt");
        let long = "a".repeat(50) + ".pdf";
        let shortened = ellipsis_in_middle(&long, 40);
        assert!(shortened.starts_with(&"a".repeat(20)));
        assert!(shortened.ends_with("a.pdf"));
        assert!(shortened.contains("..."));
    }

    #[test]
    fn test_ellipsis_in_middle_tiny_limits() {
        assert_eq!(ellipsis_in_middle("abc", 2), "...abc");
        assert_eq!(ellipsis_in_middle("abcdefgh", 0), "...defgh");
        assert_eq!(ellipsis_in_middle("ab", 1), "...ab");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.JPG"), "jpg");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "");
    }
}
