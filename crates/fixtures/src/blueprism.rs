//! Blue Prism `.bprelease` fixtures

use std::path::Path;

use chrono::{DateTime, Local};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::FixtureCase;
use crate::error::{FixtureError, FixtureResult};
use crate::package::{self, GeneratedFixture, PackageMetadata};
use crate::xml::{escape_attr, escape_text};
use crate::{FixtureGenerator, TargetPaths};
use flowlab_common::Platform;

const NS_RELEASE: &str = "http://www.blueprism.co.uk/product/release";
const FILE_MANAGEMENT: &str = "Utility - File Management";
const ENVIRONMENT: &str = "Utility - Environment";

/// One process stage between Start and End
#[derive(Debug, Clone)]
enum Step {
    Action {
        stage: &'static str,
        action: &'static str,
        object: &'static str,
        inputs: Vec<(&'static str, &'static str, String)>,
        outputs: Vec<(&'static str, &'static str, &'static str)>,
    },
    Calculation {
        stage: &'static str,
        expression: String,
        store: &'static str,
    },
    Wait {
        stage: &'static str,
        seconds: u32,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Action { stage, .. }
            | Step::Calculation { stage, .. }
            | Step::Wait { stage, .. } => *stage,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Step::Action { .. } => "Action",
            Step::Calculation { .. } => "Calculation",
            Step::Wait { .. } => "Wait",
        }
    }

    fn content(&self) -> String {
        match self {
            Step::Action { action, object, inputs, outputs, .. } => {
                let mut xml = format!(
                    "<action name=\"{}\"><object>{}</object>",
                    escape_attr(action),
                    escape_text(object)
                );
                for (name, ty, expr) in inputs {
                    xml.push_str(&format!(
                        "<input name=\"{}\" type=\"{}\" expr=\"{}\" />",
                        escape_attr(name),
                        ty,
                        escape_attr(expr)
                    ));
                }
                for (name, ty, store) in outputs {
                    xml.push_str(&format!(
                        "<output name=\"{}\" type=\"{}\" stage=\"{}\" />",
                        escape_attr(name),
                        ty,
                        escape_attr(store)
                    ));
                }
                xml.push_str("</action>");
                xml
            }
            Step::Calculation { expression, store, .. } => format!(
                "<calculation expression=\"{}\" stage=\"{}\" />",
                escape_attr(expression),
                escape_attr(store)
            ),
            Step::Wait { seconds, .. } => format!("<wait duration=\"{}\" />", seconds),
        }
    }
}

/// Blue Prism text literal
fn quoted(text: &str) -> String {
    format!("\"{}\"", text)
}

fn calc(stage: &'static str, expression: impl Into<String>, store: &'static str) -> Step {
    Step::Calculation { stage, expression: expression.into(), store }
}

fn steps(case: &FixtureCase, paths: &TargetPaths) -> FixtureResult<Vec<Step>> {
    let file = |sub: &str, name: &str| quoted(&paths.file(sub, name));

    let steps = match case.id.number {
        1 => vec![Step::Action {
            stage: "Write File",
            action: "File - Write Text",
            object: FILE_MANAGEMENT,
            inputs: vec![
                ("File Path", "text", file("output", "test_file.txt")),
                ("Text", "text", "\"Created at: \" & Now()".to_string()),
            ],
            outputs: vec![],
        }],
        2 => vec![Step::Action {
            stage: "Read File",
            action: "File - Read Text",
            object: FILE_MANAGEMENT,
            inputs: vec![("File Path", "text", file("input", "data.txt"))],
            outputs: vec![("Contents", "text", "FileContent")],
        }],
        3 => vec![Step::Action {
            stage: "Delete File",
            action: "File - Delete",
            object: FILE_MANAGEMENT,
            inputs: vec![("File Path", "text", file("output", "temp_file.txt"))],
            outputs: vec![],
        }],
        4 => vec![Step::Action {
            stage: "Create Folder",
            action: "Folder - Create",
            object: FILE_MANAGEMENT,
            inputs: vec![("Folder Path", "text", file("output", "new_folder"))],
            outputs: vec![],
        }],
        5 => vec![calc("Set Variable", quoted("Hello World"), "testVar")],
        6 => vec![
            calc("Set Str1", quoted("Hello"), "str1"),
            calc("Set Str2", quoted("World"), "str2"),
            calc("Concat", "[str1] & \" \" & [str2]", "result"),
        ],
        7 => vec![
            calc("Set Num1", "10", "num1"),
            calc("Set Num2", "20", "num2"),
            calc("Add", "[num1] + [num2]", "sum"),
        ],
        8 => vec![
            calc("Get Date", "Now()", "CurrentDateTime"),
            calc(
                "Format Date",
                "Format([CurrentDateTime], \"yyyy-MM-dd HH:mm:ss\")",
                "formattedDate",
            ),
        ],
        9 => vec![Step::Action {
            stage: "Show Message",
            action: "Show Message",
            object: "Utility - General",
            inputs: vec![
                ("Title", "text", quoted("Test Message")),
                ("Message", "text", quoted("Hello from Blue Prism!")),
            ],
            outputs: vec![],
        }],
        10 => vec![Step::Action {
            stage: "Write Log",
            action: "File - Append Text",
            object: FILE_MANAGEMENT,
            inputs: vec![
                ("File Path", "text", file("logs", "bp_log.txt")),
                ("Text", "text", quoted("Test log message from Blue Prism")),
            ],
            outputs: vec![],
        }],
        11 => vec![Step::Action {
            stage: "Set Clipboard",
            action: "Set Clipboard",
            object: ENVIRONMENT,
            inputs: vec![("Text", "text", quoted("Text copied to clipboard"))],
            outputs: vec![],
        }],
        12 => vec![Step::Action {
            stage: "Get Clipboard",
            action: "Get Clipboard",
            object: ENVIRONMENT,
            inputs: vec![],
            outputs: vec![("Text", "text", "ClipboardText")],
        }],
        13 => vec![Step::Action {
            stage: "Get Env Var",
            action: "Get Environment Variable",
            object: ENVIRONMENT,
            inputs: vec![("Name", "text", quoted("USERNAME"))],
            outputs: vec![("Value", "text", "envValue")],
        }],
        14 => vec![calc("Generate Random", "RND(1, 100)", "randomNum")],
        15 => vec![Step::Wait { stage: "Wait", seconds: 2 }],
        16 => vec![
            calc("Set String", quoted("Hello World"), "testStr"),
            calc("Get Length", "Len([testStr])", "length"),
        ],
        17 => vec![
            calc("Set Input", quoted("hello world"), "input"),
            calc("To Upper", "Upper([input])", "output"),
        ],
        18 => vec![
            calc("Set Input", quoted("HELLO WORLD"), "input"),
            calc("To Lower", "Lower([input])", "output"),
        ],
        19 => vec![Step::Action {
            stage: "Check File",
            action: "File - Exists",
            object: FILE_MANAGEMENT,
            inputs: vec![("File Path", "text", file("input", "data.txt"))],
            outputs: vec![("Exists", "flag", "exists")],
        }],
        20 => vec![Step::Action {
            stage: "Check Folder",
            action: "Folder - Exists",
            object: FILE_MANAGEMENT,
            inputs: vec![("Folder Path", "text", quoted(&paths.dir("output")))],
            outputs: vec![("Exists", "flag", "exists")],
        }],
        _ => {
            return Err(FixtureError::UnknownCase {
                platform: Platform::BluePrism.display_name().to_string(),
                case: case.id.to_string(),
            })
        }
    };
    Ok(steps)
}

fn stage(id: Uuid, name: &str, kind: &str, process_id: Uuid, body: &str) -> String {
    format!(
        "      <stage stageid=\"{id}\" name=\"{name}\" type=\"{kind}\">\n\
         \x20       <subsheetid>{process_id}</subsheetid>\n\
         \x20       <loginhibit onnever=\"True\" />\n\
         \x20       {body}\n\
         \x20     </stage>\n",
        name = escape_attr(name),
    )
}

/// Render the release XML. `new_id` supplies the process id first, then one
/// id per stage in document order.
pub fn render_release(
    case: &FixtureCase,
    paths: &TargetPaths,
    created: DateTime<Local>,
    mut new_id: impl FnMut() -> Uuid,
) -> FixtureResult<String> {
    let steps = steps(case, paths)?;
    let process_id = new_id();
    let project = escape_attr(&case.project_name());
    let view = "<view><camerax>0</camerax><cameray>0</cameray><zoom>1</zoom></view>";

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    xml.push_str(&format!("<bpr:release xmlns:bpr=\"{NS_RELEASE}\">\n"));
    xml.push_str(&format!("  <bpr:name>{}</bpr:name>\n", escape_text(case.name)));
    xml.push_str(&format!(
        "  <bpr:release-notes>{} - Test ID: {}</bpr:release-notes>\n",
        escape_text(case.description),
        case.id
    ));
    xml.push_str(&format!("  <bpr:created>{}</bpr:created>\n", created.to_rfc3339()));
    xml.push_str(&format!("  <bpr:package-id>{process_id}</bpr:package-id>\n"));
    xml.push_str(&format!("  <bpr:package-name>{project}</bpr:package-name>\n"));
    xml.push_str("  <bpr:contents>\n");
    xml.push_str(&format!(
        "    <process name=\"{project}\" id=\"{process_id}\" byrefcollection=\"true\">\n"
    ));
    xml.push_str(&format!("      {view}\n"));
    xml.push_str("      <preconditions />\n      <endpoint-in />\n      <endpoint-out />\n");
    xml.push_str(&format!(
        "      <subsheet subsheetid=\"{process_id}\" type=\"Main\" published=\"True\">\n\
         \x20       <name>Main Page</name>\n\
         \x20       {view}\n\
         \x20     </subsheet>\n"
    ));

    xml.push_str(&stage(
        new_id(),
        "Start",
        "Start",
        process_id,
        "<narrative>Process start point</narrative>",
    ));
    for step in &steps {
        xml.push_str(&stage(new_id(), step.name(), step.kind(), process_id, &step.content()));
    }
    xml.push_str(&stage(
        new_id(),
        "End",
        "End",
        process_id,
        "<narrative>Process end point</narrative>",
    ));

    xml.push_str("    </process>\n  </bpr:contents>\n</bpr:release>\n");
    Ok(xml)
}

/// Generates `Simple_{name}.bprelease` and a `.bprelease.zip` bundle with
/// metadata
#[derive(Debug, Clone)]
pub struct BluePrismGenerator {
    paths: TargetPaths,
}

impl BluePrismGenerator {
    pub fn new(paths: TargetPaths) -> Self {
        Self { paths }
    }
}

impl FixtureGenerator for BluePrismGenerator {
    fn platform(&self) -> Platform {
        Platform::BluePrism
    }

    fn generate(&self, case: &FixtureCase, out_dir: &Path) -> FixtureResult<GeneratedFixture> {
        let xml = render_release(case, &self.paths, Local::now(), Uuid::new_v4)?;
        let project = case.project_name();

        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(format!("{}.bprelease", project));
        std::fs::write(&path, &xml)?;

        let mut metadata = PackageMetadata::new(project.clone(), case.description, case.id);
        metadata.platform = Some(Platform::BluePrism.display_name().to_string());
        let metadata = metadata.to_json()?;

        let bundle = out_dir.join(format!("{}.bprelease.zip", project));
        let entry = format!("{}.bprelease", project);
        package::write_zip(
            &bundle,
            &[(entry.as_str(), xml.as_bytes()), ("metadata.json", metadata.as_bytes())],
        )?;

        debug!("Wrote {} and {}", path.display(), bundle.display());
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

    fn counter() -> impl FnMut() -> Uuid {
        let mut n = 0u128;
        move || {
            n += 1;
            Uuid::from_u128(n)
        }
    }

    #[test]
    fn test_release_structure() {
        let xml = render_release(&case(6), &TargetPaths::default(), Local::now(), counter()).unwrap();
        let process_id = Uuid::from_u128(1).to_string();

        assert!(xml.contains(&format!("<bpr:package-id>{process_id}</bpr:package-id>")));
        assert!(xml.contains("<bpr:name>String_Concat</bpr:name>"));
        assert!(xml.contains("Concatenate two strings - Test ID: S06"));
        assert!(xml.contains(r#"<process name="Simple_String_Concat""#));
        assert!(xml.contains(r#"type="Main" published="True""#));
        assert!(xml.contains(r#"expression="[str1] &amp; &quot; &quot; &amp; [str2]""#));

        let start = xml.find("Process start point").unwrap();
        let concat = xml.find(r#"name="Concat""#).unwrap();
        let end = xml.find("Process end point").unwrap();
        assert!(start < concat && concat < end);

        // process + start + 3 calculations + end
        assert!(xml.contains(&Uuid::from_u128(6).to_string()));
        assert!(!xml.contains(&Uuid::from_u128(7).to_string()));
    }

    #[test]
    fn test_action_inputs_are_escaped() {
        let xml = render_release(&case(1), &TargetPaths::new(r"E:\bots"), Local::now(), counter()).unwrap();
        assert!(xml.contains(r#"expr="&quot;E:\bots\output\test_file.txt&quot;""#));
        assert!(xml.contains(r#"expr="&quot;Created at: &quot; &amp; Now()""#));
        assert!(xml.contains("<object>Utility - File Management</object>"));
    }

    #[test]
    fn test_every_case_renders() {
        for case in simple_cases() {
            let xml = render_release(&case, &TargetPaths::default(), Local::now(), Uuid::new_v4).unwrap();
            assert_eq!(xml.matches("<stage ").count(), xml.matches("</stage>").count());
            assert!(xml.ends_with("</bpr:release>\n"), "{}", case.id);
        }
    }

    #[test]
    fn test_generate_writes_release_and_bundle() {
        let tmp = TempDir::new().unwrap();
        let fixture = BluePrismGenerator::new(TargetPaths::default())
            .generate(&case(15), tmp.path())
            .unwrap();

        assert_eq!(fixture.path, tmp.path().join("Simple_Sleep_Wait.bprelease"));
        let xml = std::fs::read_to_string(&fixture.path).unwrap();
        assert!(xml.contains(r#"<wait duration="2" />"#));

        let bundle = tmp.path().join("Simple_Sleep_Wait.bprelease.zip");
        let mut archive = zip::ZipArchive::new(std::fs::File::open(bundle).unwrap()).unwrap();
        let mut meta = String::new();
        archive.by_name("metadata.json").unwrap().read_to_string(&mut meta).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta["platform"], "Blue Prism");
        assert_eq!(meta["testId"], "S15");
        assert!(archive.by_name("Simple_Sleep_Wait.bprelease").is_ok());
    }
}
