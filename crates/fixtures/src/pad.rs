//! Power Automate Desktop fixtures: a Robin `.pad` script zipped with metadata

use std::path::Path;

use tracing::debug;

use crate::catalog::FixtureCase;
use crate::error::{FixtureError, FixtureResult};
use crate::package::{self, GeneratedFixture, PackageMetadata};
use crate::{FixtureGenerator, TargetPaths};
use flowlab_common::Platform;

/// Robin string literal
fn lit(text: &str) -> String {
    format!("$'''{}'''", text)
}

fn script(case: &FixtureCase, paths: &TargetPaths) -> FixtureResult<String> {
    let file = |sub: &str, name: &str| lit(&paths.file(sub, name));

    let script = match case.id.number {
        1 => format!(
            "File.WriteText File: {} TextToWrite: {} AppendNewLine: True \
             IfFileExists: File.IfFileExists.Overwrite Encoding: File.FileEncoding.UTF8",
            file("output", "test_file.txt"),
            lit("Created at: %CurrentDateTime%")
        ),
        2 => format!(
            "File.ReadTextFromFile.ReadText File: {} Encoding: File.TextFileEncoding.UTF8 Content=> FileContent",
            file("input", "data.txt")
        ),
        3 => format!("File.Delete Files: {}", file("output", "temp_file.txt")),
        4 => format!(
            "Folder.Create FolderPath: {} Folder=> NewFolder",
            file("output", "new_folder")
        ),
        5 => format!(
            "SET testVar TO {}\nSET testVar TO {}",
            lit("Hello World"),
            lit("Test Value")
        ),
        6 => format!(
            "SET str1 TO {}\nSET str2 TO {}\n\
             Text.Join TextList: [str1, str2] StandardDelimiter: Text.StandardDelimiter.Space Result=> result",
            lit("Hello"),
            lit("World")
        ),
        7 => "SET num1 TO 10\nSET num2 TO 20\nSET sum TO num1 + num2".to_string(),
        8 => format!(
            "DateTime.GetCurrentDateTime.Local DateTimeFormat: DateTime.DateTimeFormat.DateAndTime \
             CurrentDateTime=> CurrentDateTime\n\
             Text.ConvertDateTimeToText.FromCustomDateTime DateTime: CurrentDateTime CustomFormat: {} \
             Result=> formattedDate",
            lit("yyyy-MM-dd HH:mm:ss")
        ),
        9 => format!(
            "Display.ShowMessageDialog.ShowMessage Title: {} Message: {} Icon: Display.Icon.None \
             Buttons: Display.Buttons.OK DefaultButton: Display.DefaultButton.Button1 IsTopMost: False \
             ButtonPressed=> ButtonPressed",
            lit("Test Message"),
            lit("Hello from PAD!")
        ),
        10 => format!(
            "File.WriteText File: {} TextToWrite: {} AppendNewLine: True \
             IfFileExists: File.IfFileExists.Append Encoding: File.FileEncoding.UTF8",
            file("logs", "pad_log.txt"),
            lit("Test log message from PAD")
        ),
        11 => format!("Clipboard.SetText Text: {}", lit("Text copied to clipboard")),
        12 => "Clipboard.GetText ClipboardText=> ClipboardText".to_string(),
        13 => format!(
            "System.GetEnvironmentVariable.GetEnvironmentVariable Name: {} Value=> envValue",
            lit("USERNAME")
        ),
        14 => "Variables.GenerateRandomNumber MinimumValue: 1 MaximumValue: 100 RandomNumber=> randomNum"
            .to_string(),
        15 => "WAIT 2".to_string(),
        16 => format!(
            "SET testStr TO {}\nText.GetLength Text: testStr Length=> length",
            lit("Hello World")
        ),
        17 => format!(
            "SET input TO {}\nText.ChangeCase Text: input TextCase: Text.CaseType.Uppercase Result=> output",
            lit("hello world")
        ),
        18 => format!(
            "SET input TO {}\nText.ChangeCase Text: input TextCase: Text.CaseType.Lowercase Result=> output",
            lit("HELLO WORLD")
        ),
        19 => format!(
            "File.IfFile.Exists File: {}\n    SET exists TO True\nEND",
            file("input", "data.txt")
        ),
        20 => format!(
            "Folder.IfFolder.Exists Folder: {}\n    SET exists TO True\nEND",
            lit(&paths.dir("output"))
        ),
        _ => {
            return Err(FixtureError::UnknownCase {
                platform: Platform::PowerAutomateDesktop.display_name().to_string(),
                case: case.id.to_string(),
            })
        }
    };
    Ok(script)
}

/// Render the `.pad` flow with its comment header
pub fn render_flow(case: &FixtureCase, paths: &TargetPaths) -> FixtureResult<String> {
    Ok(format!(
        "# Power Automate Desktop Flow\n\
         # Name: {}\n\
         # Description: {}\n\
         # Test ID: {}\n\n\
         {}\n",
        case.project_name(),
        case.description,
        case.id,
        script(case, paths)?.trim()
    ))
}

/// Generates `Simple_{name}.zip`
#[derive(Debug, Clone)]
pub struct PadGenerator {
    paths: TargetPaths,
}

impl PadGenerator {
    pub fn new(paths: TargetPaths) -> Self {
        Self { paths }
    }
}

impl FixtureGenerator for PadGenerator {
    fn platform(&self) -> Platform {
        Platform::PowerAutomateDesktop
    }

    fn generate(&self, case: &FixtureCase, out_dir: &Path) -> FixtureResult<GeneratedFixture> {
        let project = case.project_name();
        let flow = render_flow(case, &self.paths)?;
        let metadata = PackageMetadata::new(project.clone(), case.description, case.id).to_json()?;

        let path = out_dir.join(format!("{}.zip", project));
        let entry = format!("{}.pad", project);
        package::write_zip(
            &path,
            &[(entry.as_str(), flow.as_bytes()), ("metadata.json", metadata.as_bytes())],
        )?;

        debug!("Wrote {}", path.display());
        package::finish(case.id, path)
    }
}
