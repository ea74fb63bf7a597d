//! Extraction of readable assets and the metadata record to disk.
//!
//! This is the only part of the pipeline that touches the filesystem.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::archive::EpubArchive;
use crate::document::{ChapterDescriptor, EpubMetadataRecord, PackageMetadata};
use crate::error::IngestError;
use crate::metadata::DEFAULT_TITLE;
use crate::progress::{emit_progress, ProgressHandler, Stage};
use crate::security::{self, SecurityLimits};

/// Subdirectory of the destination root holding every ingested book.
pub const CONVERTED_DIR: &str = "convertedEpubs";

/// File name of the serialized record inside a book's save directory.
pub const RECORD_FILE: &str = "metadata.json";

/// Entry suffixes (lowercased) that are extracted. Everything else, e.g.
/// fonts and scripts, stays in the archive.
pub const EXTRACT_EXTENSIONS: &[&str] = &[
    ".html", ".htm", ".xhtml", ".css", ".png", ".jpeg", ".jpg", ".gif", ".ncx", ".opf",
];

pub fn is_extractable(entry_path: &str) -> bool {
    let lower = entry_path.to_lowercase();
    EXTRACT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Strip `< > : " / \ | ? *` and control characters. Nothing is substituted.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect()
}

/// Directory name for a book. Titles that sanitize to nothing usable
/// (empty, blank, only dots) use the default title instead.
pub fn save_dir_name(title: &str) -> String {
    let sanitized = sanitize_title(title);
    if sanitized.trim().is_empty() || sanitized.chars().all(|c| c == '.') {
        DEFAULT_TITLE.to_string()
    } else {
        sanitized
    }
}

/// `<destination_root>/convertedEpubs/<sanitized title>`.
pub fn save_path(destination_root: &Path, title: &str) -> PathBuf {
    destination_root.join(CONVERTED_DIR).join(save_dir_name(title))
}

/// Extract allowlisted entries under the book's save directory, mirroring
/// their archive paths, then write `metadata.json` there.
///
/// Any I/O failure aborts the run; files written so far are left in place.
pub async fn materialize(
    archive: &mut EpubArchive,
    metadata: PackageMetadata,
    chapters: Vec<ChapterDescriptor>,
    destination_root: &Path,
    limits: &SecurityLimits,
    progress: Option<&dyn ProgressHandler>,
) -> Result<EpubMetadataRecord, IngestError> {
    let save_dir = save_path(destination_root, &metadata.title);
    fs::create_dir_all(&save_dir).await?;
    tracing::debug!("extracting into {}", save_dir.display());

    let selected: Vec<String> = archive
        .entries()
        .iter()
        .filter(|e| !e.is_dir && is_extractable(&e.path))
        .map(|e| e.path.clone())
        .collect();
    let total = selected.len() as u64;

    let mut written: u64 = 0;
    for (index, entry_path) in selected.iter().enumerate() {
        security::check_entry_path(entry_path)?;
        let data = archive.read(entry_path)?;
        written += data.len() as u64;
        security::check_total_size(written, limits)?;

        let target = save_dir.join(entry_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &data).await?;

        emit_progress(
            progress,
            Stage::Extracting,
            index as u64 + 1,
            Some(total),
            Some(entry_path.as_str()),
        );
    }
    tracing::debug!("extracted {} of {} entries ({} bytes)", total, archive.entries().len(), written);

    let record = EpubMetadataRecord::new(save_dir.to_string_lossy().into_owned(), metadata, chapters);
    let json = serde_json::to_vec(&record)?;
    fs::write(save_dir.join(RECORD_FILE), json).await?;

    Ok(record)
}

/// Load the record written by a previous ingestion from its save directory.
pub async fn read_record(save_dir: &Path) -> Result<EpubMetadataRecord, IngestError> {
    let bytes = fs::read(save_dir.join(RECORD_FILE)).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Every record under `<destination_root>/convertedEpubs`, ordered by
/// directory name. Directories without a readable record are skipped.
pub async fn scan_converted(destination_root: &Path) -> Result<Vec<EpubMetadataRecord>, IngestError> {
    let converted = destination_root.join(CONVERTED_DIR);
    let mut dirs = match fs::read_dir(&converted).await {
        Ok(dirs) => dirs,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut found: Vec<(String, EpubMetadataRecord)> = Vec::new();
    while let Some(entry) = dirs.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let dir = entry.path();
        match read_record(&dir).await {
            Ok(record) => found.push((entry.file_name().to_string_lossy().into_owned(), record)),
            Err(e) => tracing::warn!("skipping {}: {}", dir.display(), e),
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found.into_iter().map(|(_, record)| record).collect())
}
