//! FlowLab Fixtures
//!
//! Generates the minimal Simple tier source packages (S01-S20) for UiPath,
//! Blue Prism and Power Automate Desktop. Each package exercises a single
//! activity so conversion failures point at one construct.

pub mod blueprism;
pub mod catalog;
pub mod error;
pub mod package;
pub mod pad;
pub mod uipath;
pub mod xml;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

pub use blueprism::BluePrismGenerator;
pub use catalog::{lookup, simple_cases, FixtureCase};
pub use error::{FixtureError, FixtureResult};
pub use package::GeneratedFixture;
pub use pad::PadGenerator;
pub use uipath::UiPathGenerator;

use flowlab_common::{CaseId, Platform};

/// Windows root the generated workflows read from and write to
pub const DEFAULT_TARGET_ROOT: &str = r"C:\flowbots_lab";

/// Paths embedded in generated workflows, rooted at the lab directory of the
/// machine that will run them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPaths {
    root: String,
}

impl Default for TargetPaths {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_ROOT)
    }
}

impl TargetPaths {
    pub fn new(root: impl Into<String>) -> Self {
        let root: String = root.into();
        Self {
            root: root.trim_end_matches('\\').to_string(),
        }
    }

    /// `{root}\{sub}`
    pub fn dir(&self, sub: &str) -> String {
        format!("{}\\{}", self.root, sub)
    }

    /// `{root}\{sub}\{name}`
    pub fn file(&self, sub: &str, name: &str) -> String {
        format!("{}\\{}\\{}", self.root, sub, name)
    }
}

/// Outcome of generating every catalog case for one platform
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub platform: Platform,
    pub output_dir: PathBuf,
    pub created: Vec<GeneratedFixture>,
    pub failures: Vec<(CaseId, String)>,
}

impl GenerationReport {
    pub fn total(&self) -> usize {
        self.created.len() + self.failures.len()
    }
}

/// Writes source packages for one platform
pub trait FixtureGenerator: Send + Sync {
    fn platform(&self) -> Platform;

    /// Write the package for a single case into `out_dir`
    fn generate(&self, case: &FixtureCase, out_dir: &Path) -> FixtureResult<GeneratedFixture>;

    /// Generate all catalog cases. A failing case is logged and recorded;
    /// the remaining cases are still generated.
    fn generate_all(&self, out_dir: &Path) -> FixtureResult<GenerationReport> {
        std::fs::create_dir_all(out_dir)?;
        info!(
            "Creating {} Simple tier fixtures in {}",
            self.platform().display_name(),
            out_dir.display()
        );

        let mut report = GenerationReport {
            platform: self.platform(),
            output_dir: out_dir.to_path_buf(),
            created: Vec::new(),
            failures: Vec::new(),
        };

        for case in simple_cases() {
            match self.generate(&case, out_dir) {
                Ok(fixture) => {
                    info!("[{}] Created: {}", case.id, fixture.path.display());
                    report.created.push(fixture);
                }
                Err(e) => {
                    warn!("[{}] {}", case.id, e);
                    report.failures.push((case.id, e.to_string()));
                }
            }
        }

        info!(
            "Created {}/{} {} fixtures",
            report.created.len(),
            report.total(),
            self.platform().display_name()
        );
        Ok(report)
    }
}

/// Generator for a platform, if fixtures exist for it
pub fn generator_for(platform: Platform, paths: TargetPaths) -> Option<Box<dyn FixtureGenerator>> {
    match platform {
        Platform::UiPath => Some(Box::new(UiPathGenerator::new(paths))),
        Platform::BluePrism => Some(Box::new(BluePrismGenerator::new(paths))),
        Platform::PowerAutomateDesktop => Some(Box::new(PadGenerator::new(paths))),
        _ => None,
    }
}

/// Generators for every platform with fixtures
pub fn generators(paths: &TargetPaths) -> Vec<Box<dyn FixtureGenerator>> {
    Platform::ALL
        .into_iter()
        .filter_map(|p| generator_for(p, paths.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_target_paths() {
        let paths = TargetPaths::new(r"C:\lab\");
        assert_eq!(paths.dir("output"), r"C:\lab\output");
        assert_eq!(paths.file("input", "data.txt"), r"C:\lab\input\data.txt");
    }

    #[test]
    fn test_generators_cover_source_platforms() {
        let platforms: Vec<Platform> = generators(&TargetPaths::default())
            .iter()
            .map(|g| g.platform())
            .collect();
        assert_eq!(
            platforms,
            vec![Platform::UiPath, Platform::PowerAutomateDesktop, Platform::BluePrism]
        );
        assert!(generator_for(Platform::FlowBots, TargetPaths::default()).is_none());
    }

    #[test]
    fn test_generate_all() {
        let tmp = TempDir::new().unwrap();
        for generator in generators(&TargetPaths::default()) {
            let out = tmp.path().join(generator.platform().dir_name());
            let report = generator.generate_all(&out).unwrap();
            assert_eq!(report.created.len(), 20, "{}", generator.platform());
            assert!(report.failures.is_empty());
        }

        let blueprism = std::fs::read_dir(tmp.path().join("blueprism")).unwrap().count();
        assert_eq!(blueprism, 40);
    }
}
