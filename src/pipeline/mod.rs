//! Media pipeline: frame extraction, captioning, document ingestion, summarization, QA.

pub mod captions;
pub mod chunking;
pub mod corpus;
pub mod extract;
pub mod frames;
pub mod service;
pub mod summarize;
pub mod types;

pub use chunking::chunk_text;
pub use corpus::{FILE_BREAK, SessionContext};
pub use extract::{DOCX_MIME, extract_text};
pub use frames::FrameExtractionError;
pub use service::{PipelineApi, PipelineService};
pub use types::{
    AnswerError, ChunkingError, CorpusDelta, DocumentError, DocumentRecord, MediaJob,
    PipelineError, SourceKind, SummarizeError, UploadedFile, VideoError, VideoStage,
};
