//! Chapter list construction: NCX labels reconciled with spine order.

use std::collections::{HashMap, HashSet};

use crate::document::ChapterDescriptor;
use crate::markup::Element;
use crate::package::{normalize_archive_path, Package};

/// A parsed NCX together with its directory inside the archive, against
/// which its `content/@src` values are resolved.
#[derive(Debug, Clone, Copy)]
pub struct Navigation<'a> {
    pub root: &'a Element,
    pub dir: &'a str,
}

/// Normalized archive path → first label seen for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavLabelMap {
    labels: HashMap<String, String>,
}

impl NavLabelMap {
    /// Flatten every navPoint (parent before children) into the map.
    pub fn from_navigation(nav: Navigation<'_>) -> Self {
        let mut map = Self::default();
        let Some(nav_map) = nav.root.first("navMap") else {
            tracing::warn!("navigation document has no navMap");
            return map;
        };

        let mut pending: Vec<&Element> = nav_map.children("navPoint").iter().rev().collect();
        while let Some(point) = pending.pop() {
            let label = point.descend(&["navLabel", "text"]).and_then(Element::text);
            let src = point.first("content").and_then(|c| c.attr("src"));
            if let (Some(label), Some(src)) = (label, src) {
                map.insert(normalize_archive_path(nav.dir, src), label);
            }
            pending.extend(point.children("navPoint").iter().rev());
        }
        map
    }

    /// Keep the existing label when `path` is already indexed.
    pub fn insert(&mut self, path: String, label: &str) {
        if path.is_empty() || label.is_empty() {
            return;
        }
        self.labels.entry(path).or_insert_with(|| label.to_string());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.labels.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Build the chapter list in spine order.
///
/// With an NCX, chapters take their navigation label; without one they are
/// numbered `EPUB3 - Chapter N` by spine position. Spine items that do not
/// resolve to a manifest item with an href are skipped, and a path already
/// listed is not listed again.
pub fn build(navigation: Option<Navigation<'_>>, package: &Package<'_>) -> Vec<ChapterDescriptor> {
    let labels = navigation.map(NavLabelMap::from_navigation);
    if labels.as_ref().is_some_and(NavLabelMap::is_empty) {
        tracing::warn!("navigation document has no usable labels, naming chapters from ids");
    }
    let mut chapters: Vec<ChapterDescriptor> = Vec::with_capacity(package.spine.len());
    let mut seen: HashSet<String> = HashSet::new();

    for (position, idref) in package.spine.iter().copied().enumerate() {
        let Some((id, href)) = idref.and_then(|id| Some((id, package.item(id)?.href?))) else {
            tracing::warn!("skipping spine item {:?}: no manifest entry", idref);
            continue;
        };

        let path = package.resolve(href);
        if !seen.insert(path.clone()) {
            tracing::debug!("spine lists {} more than once", path);
            continue;
        }

        let name = match &labels {
            Some(labels) => {
                let key = normalize_archive_path(&package.dir, href);
                match labels.get(&key) {
                    Some(label) => numeric_label(label),
                    None => fallback_name(id, chapters.len() + 1),
                }
            }
            None => format!("EPUB3 - Chapter {}", position + 1),
        };
        chapters.push(ChapterDescriptor::new(name, path));
    }

    chapters
}

/// Bare numbers become `Chapter N`; anything else is kept.
pub fn numeric_label(label: &str) -> String {
    if !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit()) {
        format!("Chapter {label}")
    } else {
        label.to_string()
    }
}

/// Name for a spine item with no navigation label: the manifest id up to its
/// first underscore, or `Chapter N` when that is empty.
pub fn fallback_name(id: &str, position: usize) -> String {
    match id.split('_').next() {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => format!("Chapter {position}"),
    }
}
