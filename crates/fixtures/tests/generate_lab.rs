//! Generate every fixture into a lab tree and read the packages back

use std::io::Read;
use std::path::Path;

use tempfile::TempDir;
use test_case::test_case;

use flowlab_common::{CaseId, LabLayout, Platform, Tier};
use flowlab_fixtures::package::sha256_file;
use flowlab_fixtures::{generator_for, generators, lookup, FixtureGenerator, TargetPaths};

fn read_entry(archive: &Path, name: &str) -> String {
    let file = std::fs::File::open(archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

fn generate(platform: Platform, layout: &LabLayout) {
    let generator = generator_for(platform, TargetPaths::new(r"D:\lab")).unwrap();
    let report = generator
        .generate_all(&layout.source_dir(platform, Tier::Simple))
        .unwrap();
    assert_eq!(report.created.len(), 20);
    assert!(report.failures.is_empty());
}

#[test]
fn test_generators_cover_three_platforms() {
    let platforms: Vec<Platform> = generators(&TargetPaths::new(r"C:\flowbots_lab"))
        .iter()
        .map(|g| g.platform())
        .collect();
    assert_eq!(
        platforms,
        vec![Platform::UiPath, Platform::PowerAutomateDesktop, Platform::BluePrism]
    );
}

#[test_case(Platform::UiPath ; "uipath")]
#[test_case(Platform::BluePrism ; "blueprism")]
#[test_case(Platform::PowerAutomateDesktop ; "pad")]
fn test_generated_packages_are_found_by_case(platform: Platform) {
    let tmp = TempDir::new().unwrap();
    let layout = LabLayout::new(tmp.path());
    generate(platform, &layout);

    let artifacts = layout.list_artifacts(platform, Tier::Simple).unwrap();
    assert_eq!(artifacts.len(), 20);

    for case in Tier::Simple.cases() {
        let name = lookup(case).unwrap().name;
        let found = layout
            .find_artifact(platform, Tier::Simple, case, Some(name))
            .unwrap()
            .unwrap();
        assert!(found.to_string_lossy().contains(name));
    }
}

#[test]
fn test_uipath_package_contents() {
    let tmp = TempDir::new().unwrap();
    let layout = LabLayout::new(tmp.path());
    generate(Platform::UiPath, &layout);

    let package = layout
        .source_dir(Platform::UiPath, Tier::Simple)
        .join("Simple_File_Create.nupkg");
    let xaml = read_entry(&package, "Main.xaml");
    assert!(xaml.contains(r"D:\lab"));
    assert!(xaml.contains("x:Class=\"FileCreate\""));

    let project: serde_json::Value =
        serde_json::from_str(&read_entry(&package, "project.json")).unwrap();
    assert_eq!(project["name"], "Simple_File_Create");
    assert_eq!(project["main"], "Main.xaml");
}

#[test]
fn test_blueprism_release_and_bundle() {
    let tmp = TempDir::new().unwrap();
    let layout = LabLayout::new(tmp.path());
    let dir = layout.source_dir(Platform::BluePrism, Tier::Simple);
    let generator = generator_for(Platform::BluePrism, TargetPaths::new(r"C:\flowbots_lab")).unwrap();
    let case = lookup(CaseId::new(Tier::Simple, 2).unwrap()).unwrap();

    let fixture = generator.generate(&case, &dir).unwrap();
    assert_eq!(fixture.sha256, sha256_file(&fixture.path).unwrap());

    let release = std::fs::read_to_string(&fixture.path).unwrap();
    let bundle = dir.join("Simple_File_Read.bprelease.zip");
    assert_eq!(read_entry(&bundle, "Simple_File_Read.bprelease"), release);

    let metadata: serde_json::Value =
        serde_json::from_str(&read_entry(&bundle, "metadata.json")).unwrap();
    assert_eq!(metadata["testId"], "S02");
    assert_eq!(metadata["platform"], "Blue Prism");
}

#[test]
fn test_pad_bundle_contents() {
    let tmp = TempDir::new().unwrap();
    let layout = LabLayout::new(tmp.path());
    generate(Platform::PowerAutomateDesktop, &layout);

    let bundle = layout
        .source_dir(Platform::PowerAutomateDesktop, Tier::Simple)
        .join("Simple_File_Delete.zip");
    let flow = read_entry(&bundle, "Simple_File_Delete.pad");
    assert!(flow.contains(r"D:\lab"));

    let metadata: serde_json::Value =
        serde_json::from_str(&read_entry(&bundle, "metadata.json")).unwrap();
    assert_eq!(metadata["name"], "Simple_File_Delete");
    assert_eq!(metadata["version"], "1.0.0");
    assert!(metadata.get("platform").is_none());
}
