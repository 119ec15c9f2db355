//! The summarization collaborator.

use async_trait::async_trait;

/// Error type returned by summarizer implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Input for summarizing one file.
#[derive(Debug, Clone, Copy)]
pub struct FileRequest<'a> {
    /// Root-relative path of the file.
    pub relative_path: &'a str,
    /// Decoded text content.
    pub content: &'a str,
}

/// Input for summarizing one folder.
#[derive(Debug, Clone, Copy)]
pub struct FolderRequest<'a> {
    /// Root-relative path of the folder; empty for the root.
    pub relative_path: &'a str,
    /// Summaries of every descendant file, one `- path: summary` per line.
    pub summaries: &'a str,
}

/// Produces summaries for files and folders, typically by calling an LLM.
///
/// Implementations must either fail or return a non-blank string. The sync
/// engine treats a blank result the same way as an error.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Identity of the model behind this summarizer, stored in the graph.
    fn model(&self) -> &str;

    /// Summarize one file.
    async fn summarize_file(&self, request: FileRequest<'_>) -> Result<String, BoxError>;

    /// Summarize one folder from its descendant file summaries.
    async fn summarize_folder(&self, request: FolderRequest<'_>) -> Result<String, BoxError>;
}
