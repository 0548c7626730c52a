//! Lab directory layout and artifact lookup

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::types::{CaseId, Platform, Tier};

/// Directory tree of a lab
///
/// ```text
/// <root>/
///   artifacts_source/<platform>/<tier>/
///   artifacts_converted/<platform>/<tier>/
///   runs/
///   logs/
///   screenshots/
///   api_tests/
/// ```
#[derive(Debug, Clone)]
pub struct LabLayout {
    root: PathBuf,
}

/// Number of source artifacts for one platform and tier
#[derive(Debug, Clone, Serialize)]
pub struct InventoryEntry {
    pub platform: Platform,
    pub tier: Tier,
    pub count: usize,
}

impl LabLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_root(&self) -> PathBuf {
        self.root.join("artifacts_source")
    }

    pub fn converted_root(&self) -> PathBuf {
        self.root.join("artifacts_converted")
    }

    pub fn source_dir(&self, platform: Platform, tier: Tier) -> PathBuf {
        self.source_root().join(platform.dir_name()).join(tier.dir_name())
    }

    pub fn converted_dir(&self, platform: Platform, tier: Tier) -> PathBuf {
        self.converted_root().join(platform.dir_name()).join(tier.dir_name())
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.root.join("runs")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.root.join("screenshots")
    }

    pub fn api_tests_dir(&self) -> PathBuf {
        self.root.join("api_tests")
    }

    /// Create the output directories a run writes into
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.converted_root(), self.runs_dir(), self.logs_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Count source artifacts per platform and tier, skipping empty directories
    pub fn inventory(&self) -> Result<Vec<InventoryEntry>> {
        let mut entries = Vec::new();
        for platform in Platform::ALL {
            for tier in Tier::ALL {
                let dir = self.source_dir(platform, tier);
                if !dir.is_dir() {
                    continue;
                }
                let count = regular_files(&dir)?.len();
                if count > 0 {
                    entries.push(InventoryEntry { platform, tier, count });
                }
            }
        }
        Ok(entries)
    }

    /// Source packages of a platform and tier, sorted by file name
    pub fn list_artifacts(&self, platform: Platform, tier: Tier) -> Result<Vec<PathBuf>> {
        let dir = self.source_dir(platform, tier);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = regular_files(&dir)?
            .into_iter()
            .filter(|p| has_extension(p, platform.extension()))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Locate the source package for a test case.
    ///
    /// A file whose stem contains the case id as a whole token wins; otherwise
    /// the catalog project name (`{Tier}_{name}`) is tried.
    pub fn find_artifact(
        &self,
        platform: Platform,
        tier: Tier,
        case: CaseId,
        catalog_name: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        let candidates = self.list_artifacts(platform, tier)?;
        let case_token = case.to_string();

        if let Some(found) = candidates.iter().find(|p| {
            stem_of(p, platform.extension())
                .split(['_', '-', '.'])
                .any(|token| token.eq_ignore_ascii_case(&case_token))
        }) {
            return Ok(Some(found.clone()));
        }

        if let Some(name) = catalog_name {
            let project = format!("{}_{}", tier.label(), name);
            if let Some(found) = candidates
                .iter()
                .find(|p| stem_of(p, platform.extension()).eq_ignore_ascii_case(&project))
            {
                return Ok(Some(found.clone()));
            }
        }

        debug!("No artifact for {} in {}", case, self.source_dir(platform, tier).display());
        Ok(None)
    }
}

fn regular_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    file_name(path).to_lowercase().ends_with(extension)
}

fn stem_of(path: &Path, extension: &str) -> String {
    let name = file_name(path);
    match name.len().checked_sub(extension.len()) {
        Some(cut) if name.is_char_boundary(cut) => name[..cut].to_string(),
        _ => name,
    }
}
