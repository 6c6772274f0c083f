//! Pipeline service coordinating frame extraction, captioning, ingestion, and QA.

use crate::{
    config::get_config,
    inference::{GenerationParams, InferenceClient, InferenceError},
    metrics::{MetricsSnapshot, PipelineMetrics},
    pipeline::{
        captions::{caption_frames, merge_captions},
        corpus::SessionContext,
        extract::extract_text,
        frames::{cleanup_dir, extract_frames},
        summarize::summarize_corpus,
        types::{
            AnswerError, CorpusDelta, DocumentRecord, MediaJob, PipelineError, SourceKind,
            UploadedFile, VideoError, VideoStage,
        },
    },
    retry::{self, RetryPolicy},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Coordinates the full media pipeline behind the HTTP surface.
///
/// The service owns the inference client, the session-scoped corpus, and the metrics
/// registry. Construct it once near process start and share it through an `Arc`.
pub struct PipelineService {
    inference: InferenceClient,
    session: SessionContext,
    metrics: Arc<PipelineMetrics>,
    policy: RetryPolicy,
    params: GenerationParams,
    chunk_size: usize,
    frames_root: PathBuf,
    frame_fps: u32,
    caption_concurrency: usize,
    ffmpeg_program: String,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Caption a single uploaded image.
    async fn caption_image(&self, image: &[u8]) -> Result<String, PipelineError>;

    /// Turn a video into an ordered frame-by-frame description.
    async fn analyze_video(&self, video_path: &Path) -> Result<String, PipelineError>;

    /// Extract text from an upload batch and append it to the session corpus.
    async fn ingest_documents(
        &self,
        uploads: &[UploadedFile],
    ) -> Result<CorpusDelta, PipelineError>;

    /// Answer a question against the accumulated corpus.
    async fn answer_question(&self, question: &str) -> Result<String, PipelineError>;

    /// List uploaded file names in upload order.
    async fn list_files(&self) -> Vec<String>;

    /// Forget a file name; returns whether it was known.
    async fn remove_file(&self, file_name: &str) -> bool;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PipelineService {
    /// Build a new pipeline service from the process configuration.
    pub fn new() -> Result<Self, InferenceError> {
        let config = get_config();
        tracing::info!("Initializing inference client");
        let inference = InferenceClient::new()?;

        Ok(Self {
            inference,
            session: SessionContext::new(),
            metrics: Arc::new(PipelineMetrics::new()),
            policy: config.retry_policy(),
            params: GenerationParams {
                max_length: config.summary_max_length,
                min_length: config.summary_min_length,
                top_p: config.summary_top_p,
                ..GenerationParams::default()
            },
            chunk_size: config.chunk_size,
            frames_root: config.upload_dir.join("frames"),
            frame_fps: config.frame_sample_fps,
            caption_concurrency: config.caption_concurrency,
            ffmpeg_program: config
                .ffmpeg_path
                .clone()
                .unwrap_or_else(|| "ffmpeg".to_string()),
        })
    }

    /// Caption one image through the retrier.
    pub async fn caption_image(&self, image: &[u8]) -> Result<String, PipelineError> {
        let job = MediaJob::new(SourceKind::Image);
        tracing::debug!(job = %job.id, bytes = image.len(), "Captioning image");
        let caption = retry::execute(&self.policy, InferenceError::class, || {
            self.inference.caption_image(image)
        })
        .await
        .map_err(PipelineError::Caption)?;

        self.metrics.record_image();
        Ok(caption)
    }

    /// Run the video state machine: extract, caption, aggregate.
    ///
    /// The frame workspace is unique to this job and reclaimed on every exit path; a
    /// captioning failure yields no partial description.
    pub async fn analyze_video(&self, video_path: &Path) -> Result<String, PipelineError> {
        let job = MediaJob::new(SourceKind::Video);
        let frames_dir = self.frames_root.join(job.id.to_string());
        tracing::info!(
            job = %job.id,
            video = %video_path.display(),
            stage = ?VideoStage::Received,
            "Video job accepted"
        );

        let frames = extract_frames(
            &self.ffmpeg_program,
            video_path,
            &frames_dir,
            self.frame_fps,
        )
        .await
        .map_err(VideoError::from)?;
        tracing::debug!(
            job = %job.id,
            frames = frames.len(),
            stage = ?VideoStage::FramesExtracted,
            "Frames extracted"
        );

        let captioned = caption_frames(
            &self.inference,
            &self.policy,
            &frames,
            self.caption_concurrency,
        )
        .await;
        // Frames are transient artifacts; reclaim the workspace before surfacing errors.
        cleanup_dir(&frames_dir);
        let captions = captioned?;
        tracing::debug!(job = %job.id, stage = ?VideoStage::Captioned, "Frames captioned");

        let description = merge_captions(&captions);
        tracing::debug!(job = %job.id, stage = ?VideoStage::Aggregated, "Captions merged");

        self.metrics.record_video(captions.len() as u64);
        tracing::info!(job = %job.id, stage = ?VideoStage::Done, "Video job completed");
        Ok(description)
    }

    /// Ingest an upload batch transactionally.
    ///
    /// Every file is extracted before the session is touched, so a failing file leaves
    /// both the corpus and the file list unchanged.
    pub async fn ingest_documents(
        &self,
        uploads: &[UploadedFile],
    ) -> Result<CorpusDelta, PipelineError> {
        let job = MediaJob::new(SourceKind::DocumentSet);
        tracing::debug!(job = %job.id, files = uploads.len(), "Ingesting document batch");

        let mut records = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let text = extract_text(&upload.path, &upload.mime_type)?;
            records.push(DocumentRecord {
                file_name: upload.file_name.clone(),
                mime_type: upload.mime_type.clone(),
                text,
            });
        }

        let appended_chars = self.session.append_batch(&records).await;
        self.metrics.record_documents(records.len() as u64);
        tracing::info!(
            files = records.len(),
            appended_chars,
            "Document batch committed"
        );

        Ok(CorpusDelta {
            files: records.into_iter().map(|record| record.file_name).collect(),
            appended_chars,
        })
    }

    /// Answer a question against the accumulated corpus.
    ///
    /// Fails with [`AnswerError::NoContextAvailable`] before any network call when the
    /// corpus is empty; otherwise the corpus is condensed chunk by chunk and one
    /// extractive-QA call is issued over the merged summary.
    pub async fn answer_question(&self, question: &str) -> Result<String, PipelineError> {
        if self.session.is_empty().await {
            return Err(AnswerError::NoContextAvailable.into());
        }

        let corpus = self.session.corpus_snapshot().await;
        let summary = summarize_corpus(
            &self.inference,
            &self.policy,
            &corpus,
            self.chunk_size,
            &self.params,
        )
        .await
        .map_err(AnswerError::Summarization)?;

        let answer = retry::execute(&self.policy, InferenceError::class, || {
            self.inference.answer_question(question, &summary)
        })
        .await
        .map_err(AnswerError::Answering)?;

        self.metrics.record_question();
        Ok(answer)
    }

    /// List uploaded file names in upload order.
    pub async fn list_files(&self) -> Vec<String> {
        self.session.list_files().await
    }

    /// Forget a file name; returns whether it was known to the session.
    pub async fn remove_file(&self, file_name: &str) -> bool {
        self.session.remove_file(file_name).await
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn caption_image(&self, image: &[u8]) -> Result<String, PipelineError> {
        PipelineService::caption_image(self, image).await
    }

    async fn analyze_video(&self, video_path: &Path) -> Result<String, PipelineError> {
        PipelineService::analyze_video(self, video_path).await
    }

    async fn ingest_documents(
        &self,
        uploads: &[UploadedFile],
    ) -> Result<CorpusDelta, PipelineError> {
        PipelineService::ingest_documents(self, uploads).await
    }

    async fn answer_question(&self, question: &str) -> Result<String, PipelineError> {
        PipelineService::answer_question(self, question).await
    }

    async fn list_files(&self) -> Vec<String> {
        PipelineService::list_files(self).await
    }

    async fn remove_file(&self, file_name: &str) -> bool {
        PipelineService::remove_file(self, file_name).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PipelineService::metrics_snapshot(self)
    }
}
