//! `META-INF/container.xml` → package document path.

use crate::archive::EpubArchive;
use crate::error::IngestError;
use crate::markup::Element;

pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Return the `full-path` of the first `rootfile` declared by the container.
///
/// Later rootfiles (alternate renditions) are ignored. The path must name a
/// file entry in `archive`.
pub fn resolve(container: &Element, archive: &EpubArchive) -> Result<String, IngestError> {
    let rootfile = container
        .descend(&["rootfiles", "rootfile"])
        .ok_or_else(|| IngestError::MissingPackageDocument("container declares no rootfile".into()))?;

    let package_path = rootfile
        .attr("full-path")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            IngestError::MissingPackageDocument("rootfile has no full-path attribute".into())
        })?;

    if !archive.contains(package_path) {
        return Err(IngestError::MissingPackageDocument(format!(
            "{package_path} is not in the archive"
        )));
    }
    Ok(package_path.to_string())
}

/// Directory of the package document, without a trailing slash. Empty when
/// the package sits at the archive root.
pub fn package_dir(package_path: &str) -> &str {
    package_path
        .rfind('/')
        .map(|i| &package_path[..i])
        .unwrap_or("")
}
