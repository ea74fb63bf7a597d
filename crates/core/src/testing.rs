//! Archive fixtures for unit tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// Build a stored (uncompressed) zip. `None` content adds a directory entry.
pub(crate) fn build_zip(entries: &[(&str, Option<&str>)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (path, content) in entries {
        match content {
            Some(text) => {
                zip.start_file(*path, options).unwrap();
                zip.write_all(text.as_bytes()).unwrap();
            }
            None => zip.add_directory(*path, options).unwrap(),
        }
    }
    zip.finish().unwrap().into_inner()
}

/// Build a deflated zip.
pub(crate) fn build_deflated_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (path, text) in entries {
        zip.start_file(*path, options).unwrap();
        zip.write_all(text.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub(crate) fn build_zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (path, data) in entries {
        zip.start_file(*path, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub(crate) const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// A two-chapter EPUB2 package with an NCX.
pub(crate) const TWO_CHAPTER_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Test Book</dc:title>
    <dc:creator opf:role="aut">Jane Doe</dc:creator>
    <dc:subject>Fantasy</dc:subject>
    <dc:description>A short test.</dc:description>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="cover-img" href="images/cover.jpg" media-type="image/jpeg"/>
    <item id="chapter_1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
    <item id="chapter_2" href="chapter2.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="chapter_1"/>
    <itemref idref="chapter_2"/>
  </spine>
</package>"#;

pub(crate) const TWO_CHAPTER_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="np1" playOrder="1">
      <navLabel><text>Prologue</text></navLabel>
      <content src="chapter1.xhtml"/>
    </navPoint>
    <navPoint id="np2" playOrder="2">
      <navLabel><text>2</text></navLabel>
      <content src="chapter2.xhtml#start"/>
    </navPoint>
  </navMap>
</ncx>"#;

pub(crate) fn two_chapter_epub() -> Vec<u8> {
    build_zip(&[
        ("mimetype", Some("application/epub+zip")),
        ("META-INF/container.xml", Some(CONTAINER_XML)),
        ("OEBPS/content.opf", Some(TWO_CHAPTER_OPF)),
        ("OEBPS/toc.ncx", Some(TWO_CHAPTER_NCX)),
        ("OEBPS/chapter1.xhtml", Some("<html><body><p>One</p></body></html>")),
        ("OEBPS/chapter2.xhtml", Some("<html><body><p>Two</p></body></html>")),
        ("OEBPS/images/cover.jpg", Some("jpeg-bytes")),
        ("OEBPS/fonts/custom.ttf", Some("font-bytes")),
    ])
}
