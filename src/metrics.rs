use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    images_captioned: AtomicU64,
    videos_processed: AtomicU64,
    frames_captioned: AtomicU64,
    documents_ingested: AtomicU64,
    questions_answered: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed single-image caption request.
    pub fn record_image(&self) {
        self.images_captioned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed video job and the number of frames it captioned.
    pub fn record_video(&self, frame_count: u64) {
        self.videos_processed.fetch_add(1, Ordering::Relaxed);
        self.frames_captioned
            .fetch_add(frame_count, Ordering::Relaxed);
    }

    /// Record a committed document batch of the given size.
    pub fn record_documents(&self, count: u64) {
        self.documents_ingested.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a successfully answered question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            images_captioned: self.images_captioned.load(Ordering::Relaxed),
            videos_processed: self.videos_processed.load(Ordering::Relaxed),
            frames_captioned: self.frames_captioned.load(Ordering::Relaxed),
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Single images captioned since startup.
    pub images_captioned: u64,
    /// Video jobs completed since startup.
    pub videos_processed: u64,
    /// Total frames captioned across all video jobs.
    pub frames_captioned: u64,
    /// Documents committed to the corpus across all upload batches.
    pub documents_ingested: u64,
    /// Questions answered since startup.
    pub questions_answered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_videos_and_frames() {
        let metrics = PipelineMetrics::new();
        metrics.record_video(3);
        metrics.record_video(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.videos_processed, 2);
        assert_eq!(snapshot.frames_captioned, 5);
    }

    #[test]
    fn snapshot_starts_empty() {
        let metrics = PipelineMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.images_captioned, 0);
        assert_eq!(snapshot.documents_ingested, 0);
        assert_eq!(snapshot.questions_answered, 0);
    }
}
