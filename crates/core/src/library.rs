//! Library registration: the contract between ingestion and whatever store
//! tracks a reader's books.
//!
//! The pipeline itself never touches a library. After an ingestion, the caller
//! hands the record to `register_ingested`, which looks the book up by
//! (source, path) and inserts it when it is absent or not yet in the library.
//! Stores implement `LibraryStore`; `MemoryLibrary` is an in-process store
//! for embedders without persistence of their own.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::document::{ChapterDescriptor, EpubMetadataRecord};
use crate::error::LibraryError;

/// Source id for books ingested from local files.
pub const LOCAL_SOURCE_ID: i64 = 0;

/// A book as the library sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryNovel {
    pub source_id: i64,
    /// Save directory of the ingested book; unique per source.
    pub path: String,
    pub title: String,
    pub cover: Option<String>,
    pub in_library: bool,
    pub chapters: Vec<ChapterDescriptor>,
}

impl LibraryNovel {
    pub fn from_record(record: &EpubMetadataRecord) -> Self {
        Self {
            source_id: LOCAL_SOURCE_ID,
            path: record.url.clone(),
            title: record.title.clone(),
            cover: record.cover.clone(),
            in_library: true,
            chapters: record.chapters.clone(),
        }
    }
}

/// Outcome of `register_ingested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterOutcome {
    Inserted,
    AlreadyInLibrary,
}

/// Persistence backend for library entries.
pub trait LibraryStore: Send + Sync {
    fn find_novel(&self, source_id: i64, path: &str) -> Result<Option<LibraryNovel>, LibraryError>;

    /// Insert or replace the entry keyed by (source, path).
    fn insert_novel(&self, novel: LibraryNovel) -> Result<(), LibraryError>;

    fn list_novels(&self) -> Result<Vec<LibraryNovel>, LibraryError>;
}

/// Record an ingested book in `store` unless it is already in the library.
pub fn register_ingested(
    store: &dyn LibraryStore,
    record: &EpubMetadataRecord,
) -> Result<RegisterOutcome, LibraryError> {
    match store.find_novel(LOCAL_SOURCE_ID, &record.url)? {
        Some(existing) if existing.in_library => {
            tracing::debug!("'{}' already in library", existing.title);
            Ok(RegisterOutcome::AlreadyInLibrary)
        }
        _ => {
            store.insert_novel(LibraryNovel::from_record(record))?;
            tracing::info!("added '{}' to library", record.title);
            Ok(RegisterOutcome::Inserted)
        }
    }
}

/// In-process store keyed by (source, path).
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    novels: Mutex<HashMap<(i64, String), LibraryNovel>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> LibraryError {
    LibraryError::Failed("library lock poisoned".into())
}

impl LibraryStore for MemoryLibrary {
    fn find_novel(&self, source_id: i64, path: &str) -> Result<Option<LibraryNovel>, LibraryError> {
        let novels = self.novels.lock().map_err(poisoned)?;
        Ok(novels.get(&(source_id, path.to_string())).cloned())
    }

    fn insert_novel(&self, novel: LibraryNovel) -> Result<(), LibraryError> {
        let mut novels = self.novels.lock().map_err(poisoned)?;
        novels.insert((novel.source_id, novel.path.clone()), novel);
        Ok(())
    }

    fn list_novels(&self) -> Result<Vec<LibraryNovel>, LibraryError> {
        let novels = self.novels.lock().map_err(poisoned)?;
        let mut list: Vec<LibraryNovel> = novels.values().cloned().collect();
        list.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(list)
    }
}
