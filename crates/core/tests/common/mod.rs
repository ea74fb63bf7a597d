//! Shared fixtures: EPUBs assembled in memory.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Fluent builder over `zip::ZipWriter`; entries are deflated except
/// `mimetype`, which is stored first.
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self {
            entries: vec![("mimetype".into(), b"application/epub+zip".to_vec())],
        }
    }

    /// Start with the standard container pointing at `OEBPS/content.opf`.
    pub fn with_container() -> Self {
        Self::new().file("META-INF/container.xml", CONTAINER_XML)
    }

    pub fn file(mut self, path: &str, body: &str) -> Self {
        self.entries.push((path.into(), body.as_bytes().to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (path, body) in &self.entries {
            let options = if path == "mimetype" { stored } else { deflated };
            zip.start_file(path.as_str(), options).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

/// OPF with the given metadata body, manifest items and spine itemrefs.
pub fn opf(version: &str, metadata: &str, manifest: &str, spine: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="{version}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">{metadata}</metadata>
  <manifest>{manifest}</manifest>
  {spine}
</package>"#
    )
}

pub fn ncx(nav_points: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="x"/></head>
  <docTitle><text>Doc</text></docTitle>
  <navMap>{nav_points}</navMap>
</ncx>"#
    )
}

pub fn nav_point(label: &str, src: &str) -> String {
    format!(r#"<navPoint><navLabel><text>{label}</text></navLabel><content src="{src}"/></navPoint>"#)
}

/// The reference EPUB2 book: two chapters, NCX, cover meta, a stylesheet,
/// an image and a font.
pub fn test_book() -> Vec<u8> {
    let package = opf(
        "2.0",
        r#"<dc:title>Test Book</dc:title>
           <dc:creator opf:role="aut">Jane Doe</dc:creator>
           <dc:creator opf:role="aut">John Roe</dc:creator>
           <dc:subject>Fantasy</dc:subject>
           <dc:subject>Adventure</dc:subject>
           <meta name="cover" content="cover"/>"#,
        r#"<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
           <item id="cover" href="Images/cover.png" media-type="image/png"/>
           <item id="css" href="Styles/main.css" media-type="text/css"/>
           <item id="font" href="fonts/custom.ttf" media-type="font/ttf"/>
           <item id="chapter_1" href="Text/chapter1.xhtml" media-type="application/xhtml+xml"/>
           <item id="chapter_2" href="Text/chapter2.xhtml" media-type="application/xhtml+xml"/>"#,
        r#"<spine toc="ncx"><itemref idref="chapter_1"/><itemref idref="chapter_2"/></spine>"#,
    );
    let toc = ncx(&format!(
        "{}{}",
        nav_point("The Beginning", "Text/chapter1.xhtml"),
        nav_point("2", "Text/chapter2.xhtml#part")
    ));
    EpubBuilder::with_container()
        .file("OEBPS/content.opf", &package)
        .file("OEBPS/toc.ncx", &toc)
        .file("OEBPS/Text/chapter1.xhtml", "<html><body><h1>One</h1></body></html>")
        .file("OEBPS/Text/chapter2.xhtml", "<html><body><h1>Two</h1></body></html>")
        .file("OEBPS/Styles/main.css", "body { margin: 0 }")
        .file("OEBPS/Images/cover.png", "png")
        .file("OEBPS/fonts/custom.ttf", "ttf")
        .build()
}
