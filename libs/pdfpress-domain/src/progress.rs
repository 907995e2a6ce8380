//! Upload progress tracking
//!
//! The uploader feeds every transmitted chunk into an [`UploadProgress`] and
//! forwards the resulting [`ProgressEvent`] to whoever renders it. This is an
//! upload signal only; the server reports nothing once the body is received.

use serde::Serialize;

/// Snapshot of an upload in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Bytes handed to the transport so far
    pub bytes_transferred: u64,
    /// Total bytes of the upload
    pub total_bytes: u64,
    /// Completion percentage, 0 to 100
    pub percentage: u8,
}

impl ProgressEvent {
    /// Whether this event reports the whole body as sent
    pub fn is_complete(&self) -> bool {
        self.bytes_transferred >= self.total_bytes
    }
}

/// Running byte count for one upload
///
/// Percentages are `round(sent * 100 / total)`, never decrease, and only reach
/// 100 once every byte has been sent.
#[derive(Debug, Clone)]
pub struct UploadProgress {
    total_bytes: u64,
    bytes_transferred: u64,
    percentage: u8,
}

impl UploadProgress {
    /// Start tracking an upload of `total_bytes`
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            bytes_transferred: 0,
            percentage: 0,
        }
    }

    /// Account for one transmitted chunk and return the new snapshot
    pub fn record(&mut self, chunk_len: u64) -> ProgressEvent {
        self.bytes_transferred = self.bytes_transferred.saturating_add(chunk_len);
        self.percentage = self.percentage.max(self.compute_percentage());
        self.snapshot()
    }

    /// Current snapshot without recording anything
    pub fn snapshot(&self) -> ProgressEvent {
        ProgressEvent {
            bytes_transferred: self.bytes_transferred,
            total_bytes: self.total_bytes,
            percentage: self.percentage,
        }
    }

    fn compute_percentage(&self) -> u8 {
        if self.bytes_transferred >= self.total_bytes {
            return 100;
        }

        let sent = self.bytes_transferred as u128;
        let total = self.total_bytes as u128;
        let rounded = (sent * 100 + total / 2) / total;

        // Rounding must not report completion while bytes are still pending
        rounded.min(99) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_fields() {
        let mut progress = UploadProgress::new(4);
        let json = serde_json::to_value(progress.record(1)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "bytes_transferred": 1, "total_bytes": 4, "percentage": 25 })
        );
    }

    #[test]
    fn test_progress_reaches_exactly_100() {
        let mut progress = UploadProgress::new(1000);

        let percentages: Vec<u8> = [300, 300, 400]
            .into_iter()
            .map(|chunk| progress.record(chunk).percentage)
            .collect();

        assert_eq!(percentages, vec![30, 60, 100]);
        assert!(progress.snapshot().is_complete());
    }

    #[test]
    fn test_progress_rounds_to_nearest() {
        let mut progress = UploadProgress::new(3);

        assert_eq!(progress.record(1).percentage, 33);
        assert_eq!(progress.record(1).percentage, 67);
    }

    #[test]
    fn test_no_early_100() {
        let mut progress = UploadProgress::new(1000);

        let event = progress.record(996);

        assert_eq!(event.percentage, 99);
        assert!(!event.is_complete());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut progress = UploadProgress::new(10_000);
        let mut last = 0;

        for chunk in [1, 0, 17, 4096, 0, 1, 5000, 885] {
            let event = progress.record(chunk);
            assert!(event.percentage >= last);
            last = event.percentage;
        }

        assert_eq!(last, 100);
    }

    #[test]
    fn test_overshoot_is_capped() {
        let mut progress = UploadProgress::new(10);

        let event = progress.record(25);

        assert_eq!(event.percentage, 100);
        assert_eq!(event.bytes_transferred, 25);
    }

    #[test]
    fn test_empty_upload_is_complete() {
        let progress = UploadProgress::new(0);

        assert!(progress.snapshot().is_complete());
    }
}
