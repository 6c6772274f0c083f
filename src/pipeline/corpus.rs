//! Session-scoped accumulation of extracted document text.
//!
//! The corpus and its file-name list are the only mutable shared state in the pipeline.
//! Both live behind a single async mutex so concurrent uploads serialize their
//! read-modify-append sequence; text and file names always move together.

use crate::pipeline::types::DocumentRecord;
use tokio::sync::Mutex;

/// Separator inserted between labeled document segments in the corpus.
pub const FILE_BREAK: &str = "\n\n=== FILE BREAK ===\n\n";

/// Append-only corpus plus the ordered list of file names backing the files surface.
#[derive(Default)]
pub struct SessionContext {
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    corpus: String,
    files: Vec<String>,
}

impl SessionContext {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fully extracted batch to the corpus and file list in one critical section.
    ///
    /// Each document becomes a labeled segment (`File: {name}` header) and segments are
    /// joined by [`FILE_BREAK`]. Returns the number of characters appended.
    pub async fn append_batch(&self, records: &[DocumentRecord]) -> usize {
        if records.is_empty() {
            return 0;
        }

        let labeled: Vec<String> = records
            .iter()
            .map(|record| format!("File: {}\n\n{}", record.file_name, record.text))
            .collect();
        let addition = labeled.join(FILE_BREAK);

        let mut state = self.state.lock().await;
        state.corpus.push_str("\n\n");
        state.corpus.push_str(&addition);
        state
            .files
            .extend(records.iter().map(|record| record.file_name.clone()));
        addition.chars().count() + 2
    }

    /// Snapshot the accumulated corpus text.
    pub async fn corpus_snapshot(&self) -> String {
        self.state.lock().await.corpus.clone()
    }

    /// List known file names in upload order.
    pub async fn list_files(&self) -> Vec<String> {
        self.state.lock().await.files.clone()
    }

    /// Remove a file name from the session list; returns whether it was present.
    ///
    /// Corpus text already appended for the file is not rewritten.
    pub async fn remove_file(&self, file_name: &str) -> bool {
        let mut state = self.state.lock().await;
        let before = state.files.len();
        state.files.retain(|name| name != file_name);
        state.files.len() != before
    }

    /// Whether the corpus holds any non-whitespace text.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.corpus.trim().is_empty()
    }
}
