//! Terminal output for the client

use std::io::Write;

use pdfpress_domain::{CompressionResult, ProgressEvent};

const UNITS: [&str; 7] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];
const BAR_WIDTH: usize = 30;

/// Human-readable size with 1024-based units and at most two decimals
///
/// Trailing zeros are dropped, so 1024 renders as `1 KB` and 1536 as `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && exponent < UNITS.len() - 1 {
        scaled /= 1024.0;
        exponent += 1;
    }

    let rounded = format!("{scaled:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[exponent])
}

/// One progress line, e.g. `[#######.......]  42% (1.2 MB / 2.86 MB)`
pub fn progress_line(event: &ProgressEvent) -> String {
    let filled = BAR_WIDTH * event.percentage as usize / 100;
    format!(
        "[{}{}] {:>3}% ({} / {})",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        event.percentage,
        format_bytes(event.bytes_transferred),
        format_bytes(event.total_bytes)
    )
}

/// Redraw the progress line in place on stderr
pub fn draw_progress(event: &ProgressEvent) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "\r{}", progress_line(event));
    if event.is_complete() {
        let _ = writeln!(stderr);
    }
    let _ = stderr.flush();
}

/// Size summary printed after a successful compression
pub fn summary(result: &CompressionResult) -> String {
    format!(
        "Original size:   {}\nCompressed size: {}\nReduction:       {:.2}%",
        format_bytes(result.original_size()),
        format_bytes(result.compressed_size()),
        result.reduction_percent()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(1), "1 Bytes");
        assert_eq!(format_bytes(1023), "1023 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1 MB");
        assert_eq!(format_bytes(3_000_000), "2.86 MB");
        assert_eq!(format_bytes(u64::MAX), "16 EB");
    }

    #[test]
    fn test_progress_line() {
        let event = ProgressEvent {
            bytes_transferred: 512,
            total_bytes: 1024,
            percentage: 50,
        };

        let line = progress_line(&event);

        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(15), ".".repeat(15))));
        assert!(line.ends_with(" 50% (512 Bytes / 1 KB)"));
    }

    #[test]
    fn test_summary() {
        let text = summary(&CompressionResult::new(1_048_576, 734_003));

        assert!(text.contains("1 MB"));
        assert!(text.contains("716.8 KB"));
        assert!(text.contains("30.00%"));
    }
}
