/// Top-level error type. Every pipeline entry point returns this.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Missing container descriptor: {0}")]
    MissingContainerDescriptor(String),

    #[error("Missing package document: {0}")]
    MissingPackageDocument(String),

    #[error("Malformed {document}: {source}")]
    MalformedDocument {
        document: String,
        source: MarkupError,
    },

    #[error("Security violation: {0}")]
    Security(#[from] SecurityError),

    #[error("Failed to serialize metadata record: {0}")]
    Record(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub(crate) fn malformed(document: &str, source: MarkupError) -> Self {
        Self::MalformedDocument {
            document: document.to_string(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Not a valid zip container: {0}")]
    CorruptArchive(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry {path} is not valid UTF-8: {detail}")]
    InvalidText { path: String, detail: String },

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("{0}")]
    Malformed(String),

    #[error("invalid encoding: {0}")]
    Encoding(String),

    #[error(transparent)]
    Security(#[from] SecurityError),
}

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("ZIP bomb detected in {path}: decompression ratio {ratio}:1 exceeds limit {limit}:1")]
    ZipBomb { path: String, ratio: u64, limit: u64 },

    #[error("Path traversal detected in archive entry: {path}")]
    PathTraversal { path: String },

    #[error("Archive contains {count} files, exceeding limit of {limit}")]
    TooManyFiles { count: u64, limit: u64 },

    #[error("Resource {name} is {size_mb}MB, exceeding limit of {limit_mb}MB")]
    OversizedResource {
        name: String,
        size_mb: u64,
        limit_mb: u64,
    },

    #[error("XML nesting depth {depth} exceeds limit of {limit}")]
    ExcessiveNesting { depth: u32, limit: u32 },

    #[error("DRM protected archive ({drm_type})")]
    DrmProtected { drm_type: String },

    #[error("Archive entry {path} is encrypted")]
    EncryptedEntry { path: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Library operation failed: {0}")]
    Failed(String),
}
