//! Descriptive metadata and cover lookup from the package document.

use crate::document::PackageMetadata;
use crate::markup::{Children, Element};
use crate::package::{ManifestItem, Package};

pub const DEFAULT_TITLE: &str = "Unknown Title";
pub const DEFAULT_GENRE: &str = "N/A";
pub const DEFAULT_SUMMARY: &str = "N/A";

/// One way of reading a field out of the child shape stored under its tag.
type Extractor = fn(&Children) -> Option<String>;

/// Bare element carrying only text.
fn plain_text(children: &Children) -> Option<String> {
    match children {
        Children::Single(e) if e.attributes().next().is_none() => e.text().map(String::from),
        _ => None,
    }
}

/// Element with attributes (`opf:role`, `xml:lang`, ...) around its text.
fn inline_text(children: &Children) -> Option<String> {
    match children {
        Children::Single(e) => e.text().map(String::from),
        _ => None,
    }
}

/// First of a repeated sequence, read as if it were the only one.
fn first_repeated(children: &Children) -> Option<String> {
    match children {
        Children::Many(all) => all.first().and_then(|e| e.text()).map(String::from),
        _ => None,
    }
}

/// Every element's text, space-joined.
fn joined_text(children: &Children) -> Option<String> {
    let joined = children
        .as_slice()
        .iter()
        .filter_map(Element::text)
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

const SCALAR: &[Extractor] = &[plain_text, inline_text, first_repeated];
const LIST: &[Extractor] = &[joined_text];

/// Apply `chain` in order and stop at the first extractor that yields a value.
fn first_match(children: Option<&Children>, chain: &[Extractor]) -> Option<String> {
    let children = children?;
    chain.iter().find_map(|extract| extract(children))
}

fn field(metadata: Option<&Element>, tag: &str, chain: &[Extractor]) -> Option<String> {
    first_match(metadata.and_then(|m| m.child(tag)), chain)
}

/// Extract title, authors, genre, summary and cover. Never fails: absent
/// fields take their defaults.
pub fn extract(package: &Package<'_>) -> PackageMetadata {
    let md = package.metadata;

    PackageMetadata {
        title: field(md, "title", SCALAR).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        authors: field(md, "creator", LIST)
            .map(|a| a.trim().to_string())
            .unwrap_or_default(),
        genre: field(md, "subject", LIST).unwrap_or_else(|| DEFAULT_GENRE.to_string()),
        summary: field(md, "description", SCALAR).unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        cover: find_cover_href(package).map(|href| package.resolve(href)),
    }
}

type CoverRule = for<'p, 'a> fn(&'p Package<'a>) -> Option<&'a str>;

const COVER_RULES: &[CoverRule] = &[cover_from_meta, cover_from_properties, cover_from_id];

/// Manifest href of the cover image, before joining to the package directory.
pub fn find_cover_href<'a>(package: &Package<'a>) -> Option<&'a str> {
    COVER_RULES.iter().find_map(|rule| rule(package))
}

/// EPUB2: `<meta name="cover" content="item-id"/>`.
fn cover_from_meta<'a>(package: &Package<'a>) -> Option<&'a str> {
    let metadata = package.metadata?;
    let cover_id = metadata
        .children("meta")
        .iter()
        .find(|m| m.attr("name") == Some("cover"))?
        .attr("content")?;
    package.item(cover_id)?.href
}

/// EPUB3: `<item properties="cover-image"/>`.
fn cover_from_properties<'a>(package: &Package<'a>) -> Option<&'a str> {
    package
        .manifest
        .iter()
        .find(|item| item.has_property("cover-image"))?
        .href
}

/// Any image item whose id mentions "cover".
fn cover_from_id<'a>(package: &Package<'a>) -> Option<&'a str> {
    let looks_like_cover = |item: &&ManifestItem<'a>| {
        item.id
            .is_some_and(|id| id.to_ascii_lowercase().contains("cover"))
            && item.media_type.is_some_and(|t| t.starts_with("image/"))
    };
    package.manifest.iter().find(looks_like_cover)?.href
}
