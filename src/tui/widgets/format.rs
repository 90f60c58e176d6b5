use chrono::{TimeZone, Utc};

/// Formats a byte-rate (bytes per second) into a human-readable string with
/// auto-scaling units (base-10: 1 KB = 1000 bytes).
pub fn format_rate(bytes_per_sec: f64) -> String {
    const KB: f64 = 1_000.0;
    const MB: f64 = 1_000_000.0;
    const GB: f64 = 1_000_000_000.0;

    if bytes_per_sec < KB {
        format!("{:.0} B/s", bytes_per_sec)
    } else if bytes_per_sec < MB {
        format!("{:.1} KB/s", bytes_per_sec / KB)
    } else if bytes_per_sec < GB {
        format!("{:.1} MB/s", bytes_per_sec / MB)
    } else {
        format!("{:.1} GB/s", bytes_per_sec / GB)
    }
}

/// Formats a total byte count into a human-readable string with auto-scaling
/// units (base-10: 1 KB = 1000 bytes).
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1_000.0;
    const MB: f64 = 1_000_000.0;
    const GB: f64 = 1_000_000_000.0;

    let b = bytes as f64;

    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else {
        format!("{:.1} GB", b / GB)
    }
}

/// Formats a unix-millisecond timestamp as a local-less `HH:MM:SS` clock
/// label for the closed-connections table.
pub fn format_clock(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(t) => t.format("%H:%M:%S").to_string(),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_ranges() {
        assert_eq!(format_rate(0.0), "0 B/s");
        assert_eq!(format_rate(512.0), "512 B/s");
        assert_eq!(format_rate(1_500.0), "1.5 KB/s");
        assert_eq!(format_rate(23_400_000.0), "23.4 MB/s");
        assert_eq!(format_rate(1_200_000_000.0), "1.2 GB/s");
    }

    #[test]
    fn byte_ranges() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1_500), "1.5 KB");
        assert_eq!(format_bytes(23_400_000), "23.4 MB");
        assert_eq!(format_bytes(1_200_000_000), "1.2 GB");
    }

    #[test]
    fn clock_label() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3_661_000), "01:01:01");
    }
}
