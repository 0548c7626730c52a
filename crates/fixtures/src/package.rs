//! Package writing and hashing

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::FixtureResult;
use flowlab_common::CaseId;

/// A fixture written to disk
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFixture {
    pub case: CaseId,
    pub path: PathBuf,
    pub sha256: String,
}

/// `metadata.json` written next to Blue Prism and PAD flows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub name: String,
    pub description: String,
    pub version: String,
    pub test_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl PackageMetadata {
    pub fn new(name: String, description: &str, case: CaseId) -> Self {
        Self {
            name,
            description: description.to_string(),
            version: "1.0.0".to_string(),
            test_id: case.to_string(),
            platform: None,
        }
    }

    pub fn to_json(&self) -> FixtureResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Write a deflated zip archive with the given `(name, contents)` entries
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> FixtureResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, contents) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(contents)?;
    }
    writer.finish()?;
    Ok(())
}

/// Hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> FixtureResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hash `path` and describe it as a generated fixture
pub fn finish(case: CaseId, path: PathBuf) -> FixtureResult<GeneratedFixture> {
    let sha256 = sha256_file(&path)?;
    Ok(GeneratedFixture { case, path, sha256 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_zip_and_read_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("pkg.zip");
        write_zip(&path, &[("a.txt", b"alpha"), ("dir/b.txt", b"beta")]).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut text = String::new();
        archive.by_name("dir/b.txt").unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "beta");
    }

    #[test]
    fn test_metadata_json() {
        let case: CaseId = "S03".parse().unwrap();
        let mut meta = PackageMetadata::new("Simple_File_Delete".into(), "Delete specified file", case);
        let plain: serde_json::Value = serde_json::from_str(&meta.to_json().unwrap()).unwrap();
        assert_eq!(plain["testId"], "S03");
        assert!(plain.get("platform").is_none());

        meta.platform = Some("Blue Prism".into());
        let tagged: serde_json::Value = serde_json::from_str(&meta.to_json().unwrap()).unwrap();
        assert_eq!(tagged["platform"], "Blue Prism");
    }

    #[test]
    fn test_sha256_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
