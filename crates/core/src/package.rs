//! Typed view over a parsed OPF package document, plus the path rules used
//! to turn manifest hrefs into chapter and cover paths.

use percent_encoding::percent_decode_str;

use crate::markup::Element;

pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// A `<manifest><item>` entry. Every attribute is optional in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestItem<'a> {
    pub id: Option<&'a str>,
    pub href: Option<&'a str>,
    pub media_type: Option<&'a str>,
    pub properties: Option<&'a str>,
}

impl ManifestItem<'_> {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .is_some_and(|p| p.split_ascii_whitespace().any(|p| p == property))
    }
}

/// Package document borrowed from its element tree.
#[derive(Debug, Clone)]
pub struct Package<'a> {
    /// Directory of the package document inside the archive (no trailing slash).
    pub dir: String,
    pub metadata: Option<&'a Element>,
    pub manifest: Vec<ManifestItem<'a>>,
    /// `idref` of each spine itemref in reading order; `None` when missing.
    pub spine: Vec<Option<&'a str>>,
    /// Manifest id named by the spine's `toc` attribute (EPUB2 NCX).
    pub toc_id: Option<&'a str>,
}

impl<'a> Package<'a> {
    pub fn from_tree(root: &'a Element, dir: &str) -> Self {
        if root.name() != "package" {
            tracing::warn!("package document root is <{}>, expected <package>", root.name());
        }

        let manifest = root
            .first("manifest")
            .map(|m| m.children("item"))
            .unwrap_or(&[])
            .iter()
            .map(|item| ManifestItem {
                id: item.attr("id"),
                href: item.attr("href"),
                media_type: item.attr("media-type"),
                properties: item.attr("properties"),
            })
            .collect();

        let spine_el = root.first("spine");
        let spine = spine_el
            .map(|s| s.children("itemref"))
            .unwrap_or(&[])
            .iter()
            .map(|itemref| itemref.attr("idref"))
            .collect();

        Self {
            dir: dir.to_string(),
            metadata: root.first("metadata"),
            manifest,
            spine,
            toc_id: spine_el.and_then(|s| s.attr("toc")),
        }
    }

    /// First manifest item with the given id.
    pub fn item(&self, id: &str) -> Option<&ManifestItem<'a>> {
        self.manifest.iter().find(|item| item.id == Some(id))
    }

    /// Join an href to the package directory.
    pub fn resolve(&self, href: &str) -> String {
        join_package_path(&self.dir, href)
    }
}

/// Literal join of `dir` and `href` with one separator. No `.`/`..` handling.
pub fn join_package_path(dir: &str, href: &str) -> String {
    if dir.is_empty() {
        href.to_string()
    } else {
        format!("{dir}/{href}")
    }
}

/// Canonical archive path for comparing hrefs written relative to different
/// documents: fragment stripped, percent-decoded, joined to `base_dir`,
/// `.` and `..` segments resolved.
pub fn normalize_archive_path(base_dir: &str, href: &str) -> String {
    let without_fragment = href.split('#').next().unwrap_or("");
    let decoded = percent_decode_str(without_fragment).decode_utf8_lossy();

    let mut segments: Vec<&str> = Vec::new();
    let joined = join_package_path(base_dir, &decoded);
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
