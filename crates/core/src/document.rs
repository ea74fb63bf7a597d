use serde::{Deserialize, Serialize};

/// Descriptive fields read from the package document. Every field is
/// populated; missing source fields carry their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub title: String,
    /// Creators joined by a single space.
    pub authors: String,
    /// Subjects joined by a single space.
    pub genre: String,
    pub summary: String,
    /// Archive path of the cover image, joined to the package directory.
    pub cover: Option<String>,
}

/// One entry of the chapter list, in spine order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    pub name: String,
    /// Archive path, joined to the package directory.
    pub path: String,
}

impl ChapterDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// The terminal artifact of an ingestion, serialized as `metadata.json`
/// inside the save directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpubMetadataRecord {
    /// Save directory of the extracted book.
    pub url: String,
    pub title: String,
    pub cover: Option<String>,
    pub genre: String,
    pub summary: String,
    pub authors: String,
    /// Not derivable from EPUB metadata; always empty.
    pub artist: String,
    pub chapters: Vec<ChapterDescriptor>,
}

impl EpubMetadataRecord {
    pub fn new(url: String, metadata: PackageMetadata, chapters: Vec<ChapterDescriptor>) -> Self {
        Self {
            url,
            title: metadata.title,
            cover: metadata.cover,
            genre: metadata.genre,
            summary: metadata.summary,
            authors: metadata.authors,
            artist: String::new(),
            chapters,
        }
    }
}
