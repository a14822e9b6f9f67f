//! Documents and their re-readable content

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tempfile::TempPath;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::error::ImporterError;
use super::metadata::Metadata;

/// Default in-memory limit before content spills to disk (10 MiB)
pub const DEFAULT_MAX_MEMORY_BYTES: usize = 10 * 1024 * 1024;

/// Document content held in memory or in a self-deleting temp file
#[derive(Clone)]
pub enum DocumentContent {
    Memory(Bytes),
    File { path: Arc<TempPath>, len: u64 },
}

impl DocumentContent {
    /// Empty in-memory content
    pub fn empty() -> Self {
        Self::Memory(Bytes::new())
    }

    /// Content size in bytes
    pub fn len(&self) -> u64 {
        match self {
            Self::Memory(bytes) => bytes.len() as u64,
            Self::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the content was spilled to disk
    pub fn is_spilled(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Read the whole content
    pub async fn to_bytes(&self) -> Result<Bytes, ImporterError> {
        match self {
            Self::Memory(bytes) => Ok(bytes.clone()),
            Self::File { path, .. } => {
                let data = tokio::fs::read(&**path).await?;
                Ok(Bytes::from(data))
            }
        }
    }

    /// Read the content as text, replacing invalid UTF-8 sequences
    pub async fn to_text_lossy(&self) -> Result<String, ImporterError> {
        let bytes = self.to_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Stream the content into a writer
    pub async fn copy_to<W>(&self, writer: &mut W) -> std::io::Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        match self {
            Self::Memory(bytes) => {
                writer.write_all(bytes).await?;
                Ok(bytes.len() as u64)
            }
            Self::File { path, .. } => {
                let mut file = tokio::fs::File::open(&**path).await?;
                tokio::io::copy(&mut file, writer).await
            }
        }
    }

    /// Write the content to a file path
    pub async fn write_to_path(&self, target: &Path) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(target).await?;
        self.copy_to(&mut file).await?;
        file.flush().await
    }
}

impl fmt::Debug for DocumentContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            Self::File { path, len } => {
                write!(f, "File({}, {} bytes)", path.display(), len)
            }
        }
    }
}

/// Creates document content, spilling to disk past a size threshold
#[derive(Debug, Clone)]
pub struct ContentFactory {
    max_memory_bytes: usize,
    temp_dir: Option<PathBuf>,
}

impl Default for ContentFactory {
    fn default() -> Self {
        Self {
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            temp_dir: None,
        }
    }
}

impl ContentFactory {
    /// Create a factory with a spill threshold
    pub fn new(max_memory_bytes: usize) -> Self {
        Self {
            max_memory_bytes,
            temp_dir: None,
        }
    }

    /// Place spilled content and temp files under this directory
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_bytes
    }

    /// Create content from bytes
    pub async fn create(&self, bytes: impl Into<Bytes>) -> Result<DocumentContent, ImporterError> {
        let bytes = bytes.into();

        if bytes.len() <= self.max_memory_bytes {
            return Ok(DocumentContent::Memory(bytes));
        }

        let path = self.temp_path("content", "")?;
        tokio::fs::write(&path, &bytes).await?;

        Ok(DocumentContent::File {
            path: Arc::new(path),
            len: bytes.len() as u64,
        })
    }

    /// Reserve a unique, self-deleting temp file path
    pub fn temp_path(&self, prefix: &str, suffix: &str) -> Result<TempPath, ImporterError> {
        let prefix = format!("importer-{}-", prefix);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(suffix);

        let file = match self.temp_dir {
            Some(ref dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        Ok(file.into_temp_path())
    }
}

/// A document flowing through the import pipeline
#[derive(Debug, Clone)]
pub struct Document {
    reference: String,
    content: DocumentContent,
    metadata: Metadata,
    parsed: bool,
}

impl Document {
    /// Create an unparsed document
    pub fn new(reference: impl Into<String>, content: DocumentContent) -> Self {
        Self {
            reference: reference.into(),
            content,
            metadata: Metadata::new(),
            parsed: false,
        }
    }

    /// Create an unparsed document from in-memory text
    pub fn from_text(reference: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(reference, DocumentContent::Memory(Bytes::from(text.into())))
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn content(&self) -> &DocumentContent {
        &self.content
    }

    pub fn set_content(&mut self, content: DocumentContent) {
        self.content = content;
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Whether extraction already ran on this document
    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    pub fn mark_parsed(&mut self) {
        self.parsed = true;
    }
}
