//! Core data types and error definitions for the media pipeline.

use crate::inference::InferenceError;
use crate::pipeline::frames::FrameExtractionError;
use crate::retry::RetryError;
use std::path::PathBuf;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Errors produced while partitioning the corpus into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Configuration requested an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors raised while extracting text from an uploaded document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// MIME type has no extraction strategy.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// File could not be read from disk.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// PDF parsing or text extraction failed.
    #[error("Failed to extract text from PDF '{name}': {reason}")]
    PdfExtraction {
        /// File name of the failing document.
        name: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// Word-processor document parsing failed.
    #[error("Failed to extract text from document '{name}': {reason}")]
    WordExtraction {
        /// File name of the failing document.
        name: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Errors raised while turning a video into a captioned description.
#[derive(Debug, Error)]
pub enum VideoError {
    /// Frame extraction stage failed; no frames were produced.
    #[error(transparent)]
    FrameExtraction(#[from] FrameExtractionError),
    /// An extracted frame could not be read back from disk.
    #[error("failed to read frame {index}: {source}")]
    FrameRead {
        /// Ordinal of the unreadable frame.
        index: usize,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// Captioning a frame failed terminally; the whole job fails with it.
    #[error("captioning frame {index} failed: {source}")]
    Captioning {
        /// Ordinal of the failing frame.
        index: usize,
        /// Terminal retry outcome for the frame.
        #[source]
        source: RetryError<InferenceError>,
    },
}

/// Errors raised while summarizing the corpus.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Corpus could not be partitioned.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// A chunk's summarization failed terminally.
    #[error("summarizing chunk {index} failed: {source}")]
    Chunk {
        /// Ordinal of the failing chunk.
        index: usize,
        /// Terminal retry outcome for the chunk.
        #[source]
        source: RetryError<InferenceError>,
    },
}

/// Errors raised while answering a question against the corpus.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// No documents have been ingested yet; checked before any network call.
    #[error("no context available: upload documents before asking questions")]
    NoContextAvailable,
    /// Condensing the corpus failed.
    #[error("failed to summarize corpus: {0}")]
    Summarization(#[from] SummarizeError),
    /// The extractive-QA call failed terminally.
    #[error("question answering failed: {0}")]
    Answering(#[source] RetryError<InferenceError>),
}

/// Boundary error type returned by the pipeline service.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Single-image captioning failed terminally.
    #[error("image captioning failed: {0}")]
    Caption(#[source] RetryError<InferenceError>),
    /// Video analysis failed.
    #[error(transparent)]
    Video(#[from] VideoError),
    /// Document ingestion failed; nothing was appended.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Question answering failed.
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

/// Kind of media carried by a [`MediaJob`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// A single still image.
    Image,
    /// A video file.
    Video,
    /// A batch of text-bearing documents.
    DocumentSet,
}

/// One user submission moving through the pipeline.
///
/// The job id namespaces transient artifacts (the frame workspace), so concurrent jobs
/// never share scratch space.
#[derive(Clone, Debug)]
pub struct MediaJob {
    /// Unique id for this submission.
    pub id: Uuid,
    /// Kind of media submitted.
    pub kind: SourceKind,
    /// When the job was accepted.
    pub created_at: OffsetDateTime,
}

impl MediaJob {
    /// Create a job record for a new submission.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Stages of the video-analysis state machine, traced per job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoStage {
    /// Job accepted, nothing extracted yet.
    Received,
    /// Frame extraction completed.
    FramesExtracted,
    /// Every frame captioned.
    Captioned,
    /// Captions merged into the final description.
    Aggregated,
    /// Job finished and its workspace reclaimed.
    Done,
}

/// Extracted text for one uploaded document.
#[derive(Clone, Debug)]
pub struct DocumentRecord {
    /// Original file name; labels the corpus segment and backs the files surface.
    pub file_name: String,
    /// MIME type the extraction strategy was chosen by.
    pub mime_type: String,
    /// Extracted plain text.
    pub text: String,
}

/// An uploaded file handed to the ingestion boundary.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Where the upload was stored on disk.
    pub path: PathBuf,
    /// Original file name.
    pub file_name: String,
    /// Declared or guessed MIME type.
    pub mime_type: String,
}

/// Summary of a committed document batch.
#[derive(Clone, Debug)]
pub struct CorpusDelta {
    /// File names appended to the session, in upload order.
    pub files: Vec<String>,
    /// Characters appended to the corpus.
    pub appended_chars: usize,
}
