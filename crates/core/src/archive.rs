//! Zip container access: ordered entry listing and on-demand entry decoding.
//! The archive never interprets entry content.

use std::io::{Cursor, Read};

use crate::error::{ArchiveError, SecurityError};
use crate::security::{self, SecurityLimits};

pub const MIMETYPE_PATH: &str = "mimetype";
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// One entry of the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub compressed_size: u64,
    pub encrypted: bool,
}

/// An EPUB archive loaded in memory. Entries are listed once at open time;
/// content is decoded only when asked for.
pub struct EpubArchive {
    zip: zip::ZipArchive<Cursor<Vec<u8>>>,
    entries: Vec<ArchiveEntry>,
    limits: SecurityLimits,
}

impl std::fmt::Debug for EpubArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpubArchive")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl EpubArchive {
    /// Open an archive from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>, limits: &SecurityLimits) -> Result<Self, ArchiveError> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ArchiveError::CorruptArchive(e.to_string()))?;

        security::check_file_count(zip.len() as u64, limits)?;

        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let file = zip
                .by_index_raw(index)
                .map_err(|e| ArchiveError::CorruptArchive(e.to_string()))?;
            entries.push(ArchiveEntry {
                path: file.name().to_string(),
                is_dir: file.is_dir(),
                size: file.size(),
                compressed_size: file.compressed_size(),
                encrypted: file.encrypted(),
            });
        }

        Ok(Self {
            zip,
            entries,
            limits: limits.clone(),
        })
    }

    /// Entries in central-directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entry(path).is_some_and(|e| !e.is_dir)
    }

    /// First file entry whose path satisfies `predicate`.
    pub fn find_entry(&self, predicate: impl Fn(&str) -> bool) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| !e.is_dir && predicate(&e.path))
    }

    /// Decode a whole entry. Repeatable; each call decompresses afresh.
    pub fn read(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        let entry = self
            .entry(path)
            .filter(|e| !e.is_dir)
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))?;
        if entry.encrypted {
            return Err(SecurityError::EncryptedEntry {
                path: path.to_string(),
            }
            .into());
        }
        security::check_resource_size(path, entry.size, &self.limits)?;
        security::check_compression_ratio(path, entry.compressed_size, entry.size, &self.limits)?;

        let mut file = self.zip.by_name(path).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => ArchiveError::NotFound(path.to_string()),
            other => ArchiveError::CorruptArchive(format!("{path}: {other}")),
        })?;
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Decode an entry as UTF-8 text.
    pub fn read_text(&mut self, path: &str) -> Result<String, ArchiveError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| ArchiveError::InvalidText {
            path: path.to_string(),
            detail: e.to_string(),
        })
    }

    /// Warn when the `mimetype` entry is present but does not declare EPUB.
    pub fn check_mimetype(&mut self) {
        if !self.contains(MIMETYPE_PATH) {
            tracing::debug!("archive has no mimetype entry");
            return;
        }
        match self.read_text(MIMETYPE_PATH) {
            Ok(text) if text.trim() == EPUB_MIMETYPE => {}
            Ok(text) => tracing::warn!("unexpected mimetype '{}'", text.trim()),
            Err(e) => tracing::warn!("unreadable mimetype entry: {}", e),
        }
    }
}
