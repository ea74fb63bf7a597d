//! Generic XML → element tree decoding, shared by the container descriptor,
//! the package document and the NCX.
//!
//! Names are stored by local name (`dc:title` → `title`). Attributes and child
//! elements live in separate maps, so an attribute can never shadow a child
//! element of the same name. A tag seen once under a parent is held as
//! [`Children::Single`]; seen again it becomes [`Children::Many`]. Callers
//! iterate through [`Children::as_slice`] and never match on the shape.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

use crate::error::MarkupError;
use crate::security::{self, SecurityLimits};

/// A parsed XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: BTreeMap<String, String>,
    children: BTreeMap<String, Children>,
    text: Option<String>,
}

/// The element(s) stored under one child tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    Single(Box<Element>),
    Many(Vec<Element>),
}

impl Children {
    /// Both shapes as one ordered slice.
    pub fn as_slice(&self) -> &[Element] {
        match self {
            Children::Single(element) => std::slice::from_ref(element.as_ref()),
            Children::Many(elements) => elements,
        }
    }

    fn push(&mut self, element: Element) {
        match self {
            Children::Single(_) => {
                let previous = std::mem::replace(self, Children::Many(Vec::with_capacity(2)));
                if let (Children::Single(first), Children::Many(all)) = (previous, &mut *self) {
                    all.push(*first);
                    all.push(element);
                }
            }
            Children::Many(all) => all.push(element),
        }
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Trimmed text content; `None` when the element has no non-blank text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The raw child shape stored under `name`.
    pub fn child(&self, name: &str) -> Option<&Children> {
        self.children.get(name)
    }

    /// All children named `name`, in document order. Empty when absent.
    pub fn children(&self, name: &str) -> &[Element] {
        self.child(name).map(Children::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&Element> {
        self.children(name).first()
    }

    /// Follow a chain of first children, e.g. `["rootfiles", "rootfile"]`.
    pub fn descend(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |node, name| node.first(name))
    }

    fn append(&mut self, child: Element) {
        match self.children.get_mut(&child.name) {
            Some(existing) => existing.push(child),
            None => {
                self.children
                    .insert(child.name.clone(), Children::Single(Box::new(child)));
            }
        }
    }

    fn set_text(&mut self, raw: String) {
        let trimmed = raw.trim();
        self.text = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Maximum element nesting depth before the document is rejected.
    pub max_depth: u32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_depth: SecurityLimits::default().max_nesting_depth,
        }
    }
}

impl From<&SecurityLimits> for DecoderOptions {
    fn from(limits: &SecurityLimits) -> Self {
        Self {
            max_depth: limits.max_nesting_depth,
        }
    }
}

/// Stateless XML decoder. Build one per ingestion run and reuse it for every
/// document of that run.
#[derive(Debug, Clone, Default)]
pub struct MarkupDecoder {
    options: DecoderOptions,
}

impl MarkupDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    /// Decode raw bytes as UTF-8 (skipping a byte-order mark) and parse them.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Element, MarkupError> {
        let text = std::str::from_utf8(bytes).map_err(|e| MarkupError::Encoding(e.to_string()))?;
        self.parse(text)
    }

    /// Parse a document into its root element.
    pub fn parse(&self, text: &str) -> Result<Element, MarkupError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = XmlReader::from_str(text);

        let mut stack: Vec<(Element, String)> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    security::check_nesting_depth(stack.len() as u32 + 1, self.options.max_depth)?;
                    stack.push((start_element(e), String::new()));
                }
                Ok(Event::Empty(ref e)) => {
                    security::check_nesting_depth(stack.len() as u32 + 1, self.options.max_depth)?;
                    attach(&mut stack, &mut root, start_element(e));
                }
                Ok(Event::Text(ref e)) => {
                    if let Some((_, text)) = stack.last_mut() {
                        match e.unescape() {
                            Ok(unescaped) => text.push_str(&unescaped),
                            // Unknown entities (e.g. `&nbsp;` from HTML habits) are kept verbatim.
                            Err(_) => text.push_str(&String::from_utf8_lossy(e)),
                        }
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if let Some((_, text)) = stack.last_mut() {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Ok(Event::End(_)) => {
                    let Some((mut element, text)) = stack.pop() else {
                        return Err(MarkupError::Malformed("unexpected closing tag".into()));
                    };
                    element.set_text(text);
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(MarkupError::Malformed(format!(
                        "{e} at byte {}",
                        reader.error_position()
                    )));
                }
            }
        }

        if let Some((open, _)) = stack.last() {
            return Err(MarkupError::Malformed(format!(
                "unclosed element <{}>",
                open.name
            )));
        }
        root.ok_or_else(|| MarkupError::Malformed("document has no root element".into()))
    }
}

fn start_element(e: &BytesStart<'_>) -> Element {
    let mut element = Element::new(String::from_utf8_lossy(e.local_name().as_ref()));
    for attr in e.attributes().flatten() {
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let value = match attr.unescape_value() {
            Ok(v) => v.to_string(),
            Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
        };
        element.attributes.entry(key).or_insert(value);
    }
    element
}

fn attach(stack: &mut [(Element, String)], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some((parent, _)) => parent.append(element),
        None if root.is_none() => *root = Some(element),
        None => tracing::debug!("ignoring extra top-level element <{}>", element.name),
    }
}
