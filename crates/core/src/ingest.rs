//! Pipeline driver: archive → container → package → metadata + chapters →
//! extraction.

use std::path::Path;

use crate::archive::EpubArchive;
use crate::container::{self, CONTAINER_PATH};
use crate::document::{ChapterDescriptor, EpubMetadataRecord, PackageMetadata};
use crate::error::{ArchiveError, IngestError, MarkupError};
use crate::markup::{DecoderOptions, Element, MarkupDecoder};
use crate::materialize;
use crate::metadata;
use crate::package::{normalize_archive_path, Package, NCX_MEDIA_TYPE};
use crate::progress::{emit_progress, ProgressHandler, Stage};
use crate::security::{self, SecurityLimits};
use crate::toc::{self, Navigation};

const ENCRYPTION_PATH: &str = "META-INF/encryption.xml";

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub security: SecurityLimits,
}

/// Everything read from an archive before anything is written to disk.
#[derive(Debug)]
pub struct ParsedEpub {
    pub archive: EpubArchive,
    pub package_path: String,
    pub metadata: PackageMetadata,
    pub chapters: Vec<ChapterDescriptor>,
}

/// Read an EPUB file and ingest it under `destination_root`.
pub async fn ingest_file(
    epub_path: &Path,
    destination_root: &Path,
    opts: &IngestOptions,
    progress: Option<&dyn ProgressHandler>,
) -> Result<EpubMetadataRecord, IngestError> {
    emit_progress(progress, Stage::Opening, 0, None, Some("Reading archive"));
    let bytes = tokio::fs::read(epub_path).await?;
    ingest_bytes(bytes, destination_root, opts, progress).await
}

/// Ingest an in-memory EPUB under `destination_root`.
pub async fn ingest_bytes(
    bytes: Vec<u8>,
    destination_root: &Path,
    opts: &IngestOptions,
    progress: Option<&dyn ProgressHandler>,
) -> Result<EpubMetadataRecord, IngestError> {
    let parsed = parse_epub(bytes, opts, progress)?;
    let ParsedEpub {
        mut archive,
        metadata,
        chapters,
        ..
    } = parsed;

    let record = materialize::materialize(
        &mut archive,
        metadata,
        chapters,
        destination_root,
        &opts.security,
        progress,
    )
    .await?;

    emit_progress(progress, Stage::Finished, 1, Some(1), Some(record.url.as_str()));
    tracing::info!("ingested '{}' into {}", record.title, record.url);
    Ok(record)
}

/// Parse an EPUB without touching the filesystem.
pub fn parse_epub(
    bytes: Vec<u8>,
    opts: &IngestOptions,
    progress: Option<&dyn ProgressHandler>,
) -> Result<ParsedEpub, IngestError> {
    let mut archive = EpubArchive::from_bytes(bytes, &opts.security)?;
    archive.check_mimetype();
    check_drm(&mut archive)?;

    let decoder = MarkupDecoder::new(DecoderOptions::from(&opts.security));

    emit_progress(progress, Stage::Parsing, 0, Some(3), Some("Parsing container"));
    let container_bytes = archive.read(CONTAINER_PATH).map_err(|e| match e {
        ArchiveError::NotFound(path) => IngestError::MissingContainerDescriptor(path),
        other => other.into(),
    })?;
    let container_doc = decode(&decoder, "container descriptor", &container_bytes)?;
    let package_path = container::resolve(&container_doc, &archive)?;
    tracing::debug!("package document at {}", package_path);

    emit_progress(progress, Stage::Parsing, 1, Some(3), Some("Parsing package document"));
    let package_bytes = archive.read(&package_path).map_err(|e| match e {
        ArchiveError::NotFound(path) => IngestError::MissingPackageDocument(path),
        other => other.into(),
    })?;
    let package_doc = decode(&decoder, "package document", &package_bytes)?;
    let package = Package::from_tree(&package_doc, container::package_dir(&package_path));

    let metadata = metadata::extract(&package);

    emit_progress(progress, Stage::Parsing, 2, Some(3), Some("Building chapter list"));
    let ncx = load_navigation(&mut archive, &decoder, &package);
    let navigation = ncx.as_ref().map(|(root, path)| Navigation {
        root,
        dir: container::package_dir(path),
    });
    let chapters = toc::build(navigation, &package);
    tracing::debug!(
        "'{}': {} chapters, navigation {}",
        metadata.title,
        chapters.len(),
        if ncx.is_some() { "present" } else { "absent" }
    );

    emit_progress(progress, Stage::Parsing, 3, Some(3), None);
    Ok(ParsedEpub {
        archive,
        package_path,
        metadata,
        chapters,
    })
}

fn decode(decoder: &MarkupDecoder, document: &str, bytes: &[u8]) -> Result<Element, IngestError> {
    decoder
        .parse_bytes(bytes)
        .map_err(|e| match e {
            MarkupError::Security(s) => IngestError::Security(s),
            other => IngestError::malformed(document, other),
        })
}

fn check_drm(archive: &mut EpubArchive) -> Result<(), IngestError> {
    if !archive.contains(ENCRYPTION_PATH) {
        return Ok(());
    }
    match archive.read_text(ENCRYPTION_PATH) {
        Ok(xml) => security::check_epub_drm(&xml)?,
        Err(e) => tracing::warn!("unreadable {}: {}", ENCRYPTION_PATH, e),
    }
    Ok(())
}

/// Archive path of the NCX: the spine's `toc` item, else the first manifest
/// item typed as NCX, else any entry ending in `toc.ncx`.
fn find_navigation_path(archive: &EpubArchive, package: &Package<'_>) -> Option<String> {
    let from_spine = package
        .toc_id
        .and_then(|id| package.item(id))
        .and_then(|item| item.href);
    let from_media_type = || {
        package
            .manifest
            .iter()
            .find(|item| item.media_type == Some(NCX_MEDIA_TYPE))
            .and_then(|item| item.href)
    };

    let declared = from_spine
        .or_else(from_media_type)
        .map(|href| normalize_archive_path(&package.dir, href))
        .filter(|path| archive.contains(path));

    declared.or_else(|| {
        archive
            .find_entry(|path| path.ends_with("toc.ncx"))
            .map(|entry| entry.path.clone())
    })
}

/// Parsed NCX and its archive path. Missing, unreadable and malformed
/// documents all yield `None`.
fn load_navigation(
    archive: &mut EpubArchive,
    decoder: &MarkupDecoder,
    package: &Package<'_>,
) -> Option<(Element, String)> {
    let path = find_navigation_path(archive, package)?;
    let bytes = match archive.read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("navigation document {} unreadable, using spine order: {}", path, e);
            return None;
        }
    };
    match decoder.parse_bytes(&bytes) {
        Ok(root) => Some((root, path)),
        Err(e) => {
            tracing::warn!("navigation document {} malformed, using spine order: {}", path, e);
            None
        }
    }
}
