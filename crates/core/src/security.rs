//! Security hardening: ZIP bomb protection, path traversal guards, resource limits,
//! DRM detection.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::error::SecurityError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityLimits {
    /// Maximum decompression ratio before flagging as ZIP bomb.
    pub max_compression_ratio: u64,
    /// Entries smaller than this (decompressed) skip the ratio check.
    pub compression_ratio_floor_bytes: u64,
    /// Maximum number of entries allowed in an archive.
    pub max_file_count: u64,
    /// Maximum decompressed size of a single entry in bytes.
    pub max_resource_size_bytes: u64,
    /// Maximum total bytes written during extraction.
    pub max_total_size_bytes: u64,
    /// Maximum XML nesting depth.
    pub max_nesting_depth: u32,
}

impl Default for SecurityLimits {
    fn default() -> Self {
        Self {
            max_compression_ratio: 100,
            compression_ratio_floor_bytes: 1024 * 1024, // 1 MB
            max_file_count: 10_000,
            max_resource_size_bytes: 200 * 1024 * 1024, // 200 MB
            max_total_size_bytes: 1024 * 1024 * 1024,   // 1 GB
            max_nesting_depth: 200,
        }
    }
}

/// Reject archive entry paths that would escape the extraction root:
/// `..` components, absolute paths and drive-letter prefixes.
pub fn check_entry_path(entry_path: &str) -> Result<(), SecurityError> {
    let traversal = || SecurityError::PathTraversal {
        path: entry_path.to_string(),
    };

    if entry_path.starts_with('/') || entry_path.starts_with('\\') {
        return Err(traversal());
    }
    if entry_path.len() >= 2 && entry_path.as_bytes()[1] == b':' {
        return Err(traversal());
    }
    // Zip names use '/', but backslash-separated names show up in archives
    // produced on Windows.
    if entry_path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(traversal());
    }
    let escapes = Path::new(entry_path)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(traversal());
    }

    Ok(())
}

/// Check an entry's decompression ratio against the configured limit.
/// Entries below `compression_ratio_floor_bytes` always pass; size limits
/// bound them instead.
pub fn check_compression_ratio(
    path: &str,
    compressed_size: u64,
    uncompressed_size: u64,
    limits: &SecurityLimits,
) -> Result<(), SecurityError> {
    if uncompressed_size < limits.compression_ratio_floor_bytes {
        return Ok(());
    }
    if compressed_size == 0 {
        if uncompressed_size > 0 {
            return Err(SecurityError::ZipBomb {
                path: path.to_string(),
                ratio: u64::MAX,
                limit: limits.max_compression_ratio,
            });
        }
        return Ok(());
    }

    let ratio = uncompressed_size / compressed_size;
    if ratio > limits.max_compression_ratio {
        return Err(SecurityError::ZipBomb {
            path: path.to_string(),
            ratio,
            limit: limits.max_compression_ratio,
        });
    }
    Ok(())
}

pub fn check_file_count(count: u64, limits: &SecurityLimits) -> Result<(), SecurityError> {
    if count > limits.max_file_count {
        return Err(SecurityError::TooManyFiles {
            count,
            limit: limits.max_file_count,
        });
    }
    Ok(())
}

pub fn check_resource_size(
    name: &str,
    size_bytes: u64,
    limits: &SecurityLimits,
) -> Result<(), SecurityError> {
    if size_bytes > limits.max_resource_size_bytes {
        return Err(SecurityError::OversizedResource {
            name: name.to_string(),
            size_mb: size_bytes / (1024 * 1024),
            limit_mb: limits.max_resource_size_bytes / (1024 * 1024),
        });
    }
    Ok(())
}

/// Check the running total of extracted bytes.
pub fn check_total_size(total_bytes: u64, limits: &SecurityLimits) -> Result<(), SecurityError> {
    if total_bytes > limits.max_total_size_bytes {
        return Err(SecurityError::OversizedResource {
            name: "<total>".to_string(),
            size_mb: total_bytes / (1024 * 1024),
            limit_mb: limits.max_total_size_bytes / (1024 * 1024),
        });
    }
    Ok(())
}

pub fn check_nesting_depth(depth: u32, limit: u32) -> Result<(), SecurityError> {
    if depth > limit {
        return Err(SecurityError::ExcessiveNesting { depth, limit });
    }
    Ok(())
}

/// Inspect `META-INF/encryption.xml` for DRM schemes.
///
/// Font obfuscation (IDPF and Adobe algorithms) is not DRM and passes.
pub fn check_epub_drm(encryption_xml: &str) -> Result<(), SecurityError> {
    const KNOWN_SCHEMES: &[(&[&str], &str)] = &[
        (
            &["http://ns.adobe.com/adept", "http://ns.adobe.com/digitaleditions"],
            "Adobe DRM",
        ),
        (&["http://www.apple.com/ibooks", "sinf"], "Apple FairPlay"),
        (&["http://urms.org"], "Sony URMS"),
    ];

    for (markers, drm_type) in KNOWN_SCHEMES {
        if markers.iter().any(|m| encryption_xml.contains(m)) {
            return Err(SecurityError::DrmProtected {
                drm_type: drm_type.to_string(),
            });
        }
    }

    if encryption_xml.contains("EncryptedData") {
        let font_obfuscation = encryption_xml.contains("http://www.idpf.org/2008/embedding")
            || encryption_xml.contains("http://ns.adobe.com/pdf/enc#RC");
        if !font_obfuscation {
            return Err(SecurityError::DrmProtected {
                drm_type: "Unknown DRM".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_path_accepts_archive_relative_paths() {
        assert!(check_entry_path("OEBPS/chapter1.xhtml").is_ok());
        assert!(check_entry_path("META-INF/container.xml").is_ok());
        assert!(check_entry_path("mimetype").is_ok());
        assert!(check_entry_path("OEBPS/images/../cover.jpg").is_err());
        assert!(check_entry_path("OEBPS/./images/cover.jpg").is_ok());
    }

    #[test]
    fn entry_path_rejects_escapes() {
        assert!(check_entry_path("../../../etc/passwd").is_err());
        assert!(check_entry_path("OEBPS/../../etc/shadow").is_err());
        assert!(check_entry_path("/etc/passwd").is_err());
        assert!(check_entry_path("\\Windows\\System32\\config").is_err());
        assert!(check_entry_path("C:\\Windows\\System32").is_err());
        assert!(check_entry_path("OEBPS\\..\\..\\evil.html").is_err());
    }

    #[test]
    fn compression_ratio_limits() {
        let limits = SecurityLimits {
            compression_ratio_floor_bytes: 0,
            ..SecurityLimits::default()
        };
        assert!(check_compression_ratio("a", 1000, 50_000, &limits).is_ok());
        assert!(check_compression_ratio("a", 100, 100_000, &limits).is_err());
        assert!(check_compression_ratio("a", 0, 0, &limits).is_ok());
        assert!(check_compression_ratio("a", 0, 100, &limits).is_err());
    }

    #[test]
    fn small_entries_skip_ratio_check() {
        let limits = SecurityLimits::default();
        // 60 KB of spacer paragraphs deflates to well under 1/100th.
        assert!(check_compression_ratio("a.xhtml", 176, 60_000, &limits).is_ok());
        assert!(check_compression_ratio("a.xhtml", 0, 60_000, &limits).is_ok());
        assert!(check_compression_ratio("big.xhtml", 1000, 5 * 1024 * 1024, &limits).is_err());
    }

    #[test]
    fn file_count_and_sizes() {
        let limits = SecurityLimits::default();
        assert!(check_file_count(10_000, &limits).is_ok());
        assert!(check_file_count(10_001, &limits).is_err());
        assert!(check_resource_size("image.jpg", 1024 * 1024, &limits).is_ok());
        assert!(check_resource_size("huge.png", 201 * 1024 * 1024, &limits).is_err());
        assert!(check_total_size(2 * 1024 * 1024 * 1024, &limits).is_err());
    }

    #[test]
    fn nesting_depth_limit() {
        assert!(check_nesting_depth(200, 200).is_ok());
        assert!(matches!(
            check_nesting_depth(201, 200),
            Err(SecurityError::ExcessiveNesting { depth: 201, limit: 200 })
        ));
    }

    #[test]
    fn drm_adobe_detected() {
        let xml = r#"<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <EncryptedData xmlns="http://www.w3.org/2001/04/xmlenc#">
    <KeyInfo xmlns="http://www.w3.org/2000/09/xmldsig#">
      <resource xmlns="http://ns.adobe.com/adept"/>
    </KeyInfo>
  </EncryptedData>
</encryption>"#;
        match check_epub_drm(xml).unwrap_err() {
            SecurityError::DrmProtected { drm_type } => assert_eq!(drm_type, "Adobe DRM"),
            other => panic!("expected DrmProtected, got {other:?}"),
        }
    }

    #[test]
    fn drm_font_obfuscation_allowed() {
        let xml = r#"<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <EncryptedData xmlns="http://www.w3.org/2001/04/xmlenc#">
    <EncryptionMethod Algorithm="http://www.idpf.org/2008/embedding"/>
  </EncryptedData>
</encryption>"#;
        assert!(check_epub_drm(xml).is_ok());
        assert!(check_epub_drm("<encryption/>").is_ok());
    }
}
