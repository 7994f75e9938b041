//! Manifest Reader - Load Manifests From Disk
//!
//! The manifest's `outputPath` is relative to the manifest file itself, so a
//! locator read from disk carries an absolute output directory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::locator::{Locator, LocatorOptions};
use crate::manifest::Manifest;
use crate::paths::{normalize_path, to_dir_path};

pub fn read_manifest(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(serde_json::from_str(&contents)?)
}

/// Read a manifest and build a locator whose output path is the manifest's
/// `outputPath` resolved against the manifest's own directory.
pub fn read_locator(path: impl AsRef<Path>) -> Result<Locator> {
    let path = path.as_ref();
    let manifest = read_manifest(path)?;
    let directory = manifest_directory(path)?;

    let output_path = manifest
        .output_path
        .as_deref()
        .filter(|output_path| !output_path.is_empty())
        .unwrap_or(".");
    let output_path = to_dir_path(&normalize_path(&format!(
        "{}/{output_path}",
        directory.to_string_lossy()
    )));

    tracing::debug!(manifest = %path.display(), %output_path, "read manifest");

    Ok(Locator::new(
        manifest,
        LocatorOptions::default().with_output_path(output_path),
    ))
}

fn manifest_directory(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "outputPath": "dist",
        "urls": {"base": "https://example.org/", "output": "."},
        "output": {
            "document": {"index": {"path": "index.html", "url": "index.html"}},
            "image": {}
        }
    }"#;

    #[test]
    fn test_read_locator_resolves_output_path() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("site.manifest");
        fs::write(&manifest_path, MANIFEST).unwrap();

        let locator = read_locator(&manifest_path).unwrap();
        let expected = format!("{}/dist/", dir.path().display());

        assert_eq!(locator.output_path(), Some(expected.as_str()));
        assert_eq!(
            locator.absolute_document_path("index"),
            Some(format!("{expected}index.html"))
        );
    }

    #[test]
    fn test_missing_output_path_means_manifest_directory() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("site.manifest");
        fs::write(&manifest_path, "{}").unwrap();

        let locator = read_locator(&manifest_path).unwrap();
        let expected = format!("{}/", dir.path().display());

        assert_eq!(locator.output_path(), Some(expected.as_str()));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.manifest");

        match read_manifest(&missing) {
            Err(Error::Read { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("broken.manifest");
        fs::write(&manifest_path, "{not json").unwrap();

        assert!(matches!(
            read_manifest(&manifest_path),
            Err(Error::Serialization(_))
        ));
    }
}
