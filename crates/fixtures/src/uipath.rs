//! UiPath `.nupkg` fixtures (Main.xaml + project.json)

use std::path::Path;

use serde_json::json;
use tracing::debug;

use crate::catalog::FixtureCase;
use crate::error::{FixtureError, FixtureResult};
use crate::package::{self, GeneratedFixture};
use crate::xml::{escape_attr, escape_text};
use crate::{FixtureGenerator, TargetPaths};
use flowlab_common::Platform;

const NS_ACTIVITIES: &str = "http://schemas.microsoft.com/netfx/2009/xaml/activities";
const NS_MARKUP: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
const NS_XAML: &str = "http://schemas.microsoft.com/winfx/2006/xaml";
const NS_UIPATH: &str = "http://schemas.uipath.com/workflow/activities";

/// Workflow variable declared on the root sequence
#[derive(Debug, Clone, PartialEq)]
struct Variable {
    ty: &'static str,
    name: &'static str,
    default: Option<&'static str>,
}

fn var(ty: &'static str, name: &'static str, default: Option<&'static str>) -> Variable {
    Variable { ty, name, default }
}

/// Sequence variables and body activities for one case
#[derive(Debug, Clone)]
struct Workflow {
    variables: Vec<Variable>,
    body: Vec<String>,
}

fn assign(display: &str, ty: &str, to: &str, value: &str) -> String {
    format!(
        "<Assign DisplayName=\"{display}\">\n  \
         <Assign.To><OutArgument x:TypeArguments=\"{ty}\">[{to}]</OutArgument></Assign.To>\n  \
         <Assign.Value><InArgument x:TypeArguments=\"{ty}\">{value}</InArgument></Assign.Value>\n\
         </Assign>",
        display = escape_attr(display),
        ty = ty,
        to = to,
        value = escape_text(value),
    )
}

/// Activity whose single out-argument property is bound to `target`
fn with_result(open: &str, element: &str, property: &str, ty: &str, target: &str) -> String {
    format!(
        "{open}\n  <{element}.{property}>\n    \
         <OutArgument x:TypeArguments=\"{ty}\">[{target}]</OutArgument>\n  \
         </{element}.{property}>\n</{element}>",
    )
}

fn workflow(case: &FixtureCase, paths: &TargetPaths) -> FixtureResult<Workflow> {
    let path = |sub: &str, file: &str| escape_attr(&paths.file(sub, file));

    let (variables, body) = match case.id.number {
        1 => (
            vec![],
            vec![format!(
                "<ui:WriteTextFile FileName=\"{}\" Text=\"Created at: \" />",
                path("output", "test_file.txt")
            )],
        ),
        2 => (
            vec![],
            vec![format!("<ui:ReadTextFile FileName=\"{}\" />", path("input", "data.txt"))],
        ),
        3 => (
            vec![],
            vec![format!("<ui:DeleteFile FileName=\"{}\" />", path("output", "temp_file.txt"))],
        ),
        4 => (
            vec![],
            vec![format!(
                "<ui:CreateDirectory DirectoryName=\"{}\" />",
                path("output", "new_folder")
            )],
        ),
        5 => (
            vec![var("x:String", "testVar", Some("Hello World"))],
            vec![assign("Set Variable", "x:String", "testVar", "\"Test Value\"")],
        ),
        6 => (
            vec![
                var("x:String", "str1", Some("Hello")),
                var("x:String", "str2", Some("World")),
                var("x:String", "result", None),
            ],
            vec![assign("Concatenate", "x:String", "result", "[str1 + \" \" + str2]")],
        ),
        7 => (
            vec![
                var("x:Int32", "num1", Some("10")),
                var("x:Int32", "num2", Some("20")),
                var("x:Int32", "sum", None),
            ],
            vec![assign("Add Numbers", "x:Int32", "sum", "[num1 + num2]")],
        ),
        8 => (
            vec![var("x:String", "formattedDate", None)],
            vec![assign(
                "Format Date",
                "x:String",
                "formattedDate",
                "[DateTime.Now.ToString(\"yyyy-MM-dd HH:mm:ss\")]",
            )],
        ),
        9 => (
            vec![],
            vec!["<ui:MessageBox Text=\"Hello from UiPath!\" Caption=\"Test Message\" />".into()],
        ),
        10 => (
            vec![],
            vec!["<ui:LogMessage Level=\"Info\" Message=\"Test log message from UiPath\" />".into()],
        ),
        11 => (
            vec![],
            vec!["<ui:SetToClipboard Text=\"Text copied to clipboard\" />".into()],
        ),
        12 => (
            vec![var("x:String", "clipboardText", None)],
            vec![with_result(
                "<ui:GetFromClipboard>",
                "ui:GetFromClipboard",
                "Result",
                "x:String",
                "clipboardText",
            )],
        ),
        13 => (
            vec![var("x:String", "envValue", None)],
            vec![with_result(
                "<ui:GetEnvironmentVariable VariableName=\"USERNAME\">",
                "ui:GetEnvironmentVariable",
                "Result",
                "x:String",
                "envValue",
            )],
        ),
        14 => (
            vec![var("x:Int32", "randomNum", None)],
            vec![assign("Generate Random", "x:Int32", "randomNum", "[New Random().Next(1, 100)]")],
        ),
        15 => (vec![], vec!["<ui:Delay Duration=\"00:00:02\" />".into()]),
        16 => (
            vec![
                var("x:String", "testStr", Some("Hello World")),
                var("x:Int32", "length", None),
            ],
            vec![assign("Get Length", "x:Int32", "length", "[testStr.Length]")],
        ),
        17 => (
            vec![
                var("x:String", "input", Some("hello world")),
                var("x:String", "output", None),
            ],
            vec![assign("Convert To Upper", "x:String", "output", "[input.ToUpper()]")],
        ),
        18 => (
            vec![
                var("x:String", "input", Some("HELLO WORLD")),
                var("x:String", "output", None),
            ],
            vec![assign("Convert To Lower", "x:String", "output", "[input.ToLower()]")],
        ),
        19 => (
            vec![var("x:Boolean", "exists", None)],
            vec![with_result(
                &format!("<ui:PathExists Path=\"{}\" PathType=\"File\">", path("input", "data.txt")),
                "ui:PathExists",
                "Exists",
                "x:Boolean",
                "exists",
            )],
        ),
        20 => (
            vec![var("x:Boolean", "exists", None)],
            vec![with_result(
                &format!("<ui:PathExists Path=\"{}\" PathType=\"Folder\">", escape_attr(&paths.dir("output"))),
                "ui:PathExists",
                "Exists",
                "x:Boolean",
                "exists",
            )],
        ),
        _ => {
            return Err(FixtureError::UnknownCase {
                platform: Platform::UiPath.display_name().to_string(),
                case: case.id.to_string(),
            })
        }
    };

    Ok(Workflow { variables, body })
}

fn indent(block: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    block
        .lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render Main.xaml for a case
pub fn render_xaml(case: &FixtureCase, paths: &TargetPaths) -> FixtureResult<String> {
    let workflow = workflow(case, paths)?;
    let class = case.name.replace('_', "");
    let display = case.name.replace('_', " ");
    let uses_ui = workflow.body.iter().any(|b| b.contains("<ui:"));

    let mut xaml = format!(
        "<Activity mc:Ignorable=\"sap sap2010\" x:Class=\"{class}\"\n  \
         xmlns=\"{NS_ACTIVITIES}\"\n  \
         xmlns:mc=\"{NS_MARKUP}\"\n  \
         xmlns:x=\"{NS_XAML}\""
    );
    if uses_ui {
        xaml.push_str(&format!("\n  xmlns:ui=\"{NS_UIPATH}\""));
    }
    xaml.push_str(">\n");
    xaml.push_str(&format!("  <Sequence DisplayName=\"{}\">\n", escape_attr(&display)));

    if !workflow.variables.is_empty() {
        xaml.push_str("    <Sequence.Variables>\n");
        for v in &workflow.variables {
            let default = v
                .default
                .map(|d| format!(" Default=\"{}\"", escape_attr(d)))
                .unwrap_or_default();
            xaml.push_str(&format!(
                "      <Variable x:TypeArguments=\"{}\" Name=\"{}\"{} />\n",
                v.ty, v.name, default
            ));
        }
        xaml.push_str("    </Sequence.Variables>\n");
    }

    for activity in &workflow.body {
        xaml.push_str(&indent(activity, 4));
        xaml.push('\n');
    }

    xaml.push_str("  </Sequence>\n</Activity>\n");
    Ok(xaml)
}

/// Render project.json for a case
pub fn render_project_json(case: &FixtureCase) -> FixtureResult<String> {
    let project = json!({
        "name": case.project_name(),
        "description": case.description,
        "main": "Main.xaml",
        "dependencies": {
            "UiPath.System.Activities": "[22.4.1]",
            "UiPath.UIAutomation.Activities": "[22.4.4]"
        },
        "webServices": [],
        "entitiesStores": [],
        "schemaVersion": "4.0",
        "studioVersion": "22.4.3",
        "projectVersion": "1.0.0",
        "runtimeOptions": {
            "autoDispose": false,
            "netFrameworkLazyAssemblyLoad": false,
            "isPausable": true,
            "isAttended": false,
            "requiresUserInteraction": true,
            "supportsPersistence": false,
            "workflowSerialization": "DataContract",
            "excludedLoggedData": ["Private:*", "*password*"],
            "executionType": "Workflow",
            "readyForPiP": false,
            "startsInPiP": false,
            "mustRestoreAllDependencies": true,
            "pipType": "ChildSession"
        },
        "designOptions": {
            "projectProfile": "Developement",
            "outputType": "Process",
            "libraryOptions": { "includeOriginalXaml": false, "privateWorkflows": [] },
            "fileInfoCollection": []
        },
        "expressionLanguage": "VisualBasic",
        "isTemplate": false,
        "publishUrl": "",
        "templateProjectData": {},
        "publishData": {}
    });
    Ok(serde_json::to_string_pretty(&project)?)
}

/// Generates `Simple_{name}.nupkg`
#[derive(Debug, Clone)]
pub struct UiPathGenerator {
    paths: TargetPaths,
}

impl UiPathGenerator {
    pub fn new(paths: TargetPaths) -> Self {
        Self { paths }
    }
}

impl FixtureGenerator for UiPathGenerator {
    fn platform(&self) -> Platform {
        Platform::UiPath
    }

    fn generate(&self, case: &FixtureCase, out_dir: &Path) -> FixtureResult<GeneratedFixture> {
        let xaml = render_xaml(case, &self.paths)?;
        let project = render_project_json(case)?;

        let path = out_dir.join(format!("{}.nupkg", case.project_name()));
        package::write_zip(
            &path,
            &[("Main.xaml", xaml.as_bytes()), ("project.json", project.as_bytes())],
        )?;

        debug!("Wrote {}", path.display());
        package::finish(case.id, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{lookup, simple_cases};
    use flowlab_common::{CaseId, Tier};
    use std::io::Read;
    use tempfile::TempDir;

    fn case(n: u8) -> FixtureCase {
        lookup(CaseId::new(Tier::Simple, n).unwrap()).unwrap()
    }

    #[test]
    fn test_file_create_uses_target_root() {
        let xaml = render_xaml(&case(1), &TargetPaths::new(r"D:\lab")).unwrap();
        assert!(xaml.contains(r#"x:Class="FileCreate""#));
        assert!(xaml.contains(r#"<Sequence DisplayName="File Create">"#));
        assert!(xaml.contains(r#"FileName="D:\lab\output\test_file.txt""#));
        assert!(xaml.contains(NS_UIPATH));
    }

    #[test]
    fn test_assign_case_declares_variables_without_ui_namespace() {
        let xaml = render_xaml(&case(6), &TargetPaths::default()).unwrap();
        assert!(!xaml.contains("xmlns:ui"));
        assert!(xaml.contains(r#"<Variable x:TypeArguments="x:String" Name="str1" Default="Hello" />"#));
        assert!(xaml.contains(r#"<Variable x:TypeArguments="x:String" Name="result" />"#));
        assert!(xaml.contains(r#"[str1 + " " + str2]"#));
    }

    #[test]
    fn test_every_case_renders() {
        for case in simple_cases() {
            let xaml = render_xaml(&case, &TargetPaths::default()).unwrap();
            assert!(xaml.starts_with("<Activity"), "{}", case.id);
            assert!(xaml.trim_end().ends_with("</Activity>"), "{}", case.id);
        }
    }

    #[test]
    fn test_project_json() {
        let parsed: serde_json::Value =
            serde_json::from_str(&render_project_json(&case(2)).unwrap()).unwrap();
        assert_eq!(parsed["name"], "Simple_File_Read");
        assert_eq!(parsed["main"], "Main.xaml");
        assert_eq!(parsed["dependencies"]["UiPath.System.Activities"], "[22.4.1]");
        assert_eq!(parsed["runtimeOptions"]["excludedLoggedData"][1], "*password*");
    }

    #[test]
    fn test_generate_package() {
        let tmp = TempDir::new().unwrap();
        let generator = UiPathGenerator::new(TargetPaths::default());
        let fixture = generator.generate(&case(20), tmp.path()).unwrap();

        assert_eq!(fixture.path, tmp.path().join("Simple_Folder_Exists.nupkg"));
        assert_eq!(fixture.sha256.len(), 64);

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&fixture.path).unwrap()).unwrap();
        let mut xaml = String::new();
        archive.by_name("Main.xaml").unwrap().read_to_string(&mut xaml).unwrap();
        assert!(xaml.contains(r#"PathType="Folder""#));
        assert!(archive.by_name("project.json").is_ok());
    }
}
