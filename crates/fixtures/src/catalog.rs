//! Catalog of the Simple tier test cases

use flowlab_common::{CaseId, Tier};

/// One fixture case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureCase {
    pub id: CaseId,
    pub name: &'static str,
    pub description: &'static str,
}

impl FixtureCase {
    /// Project / package base name, e.g. `Simple_File_Create`
    pub fn project_name(&self) -> String {
        format!("{}_{}", self.id.tier.label(), self.name)
    }
}

const SIMPLE: [(&str, &str); 20] = [
    ("File_Create", "Create text file with timestamp"),
    ("File_Read", "Read text file content"),
    ("File_Delete", "Delete specified file"),
    ("Folder_Create", "Create new directory"),
    ("Variable_Set", "Set and get variable value"),
    ("String_Concat", "Concatenate two strings"),
    ("Number_Add", "Add two numbers"),
    ("Date_Format", "Format current date"),
    ("Message_Box", "Display message box"),
    ("Log_Message", "Write to log"),
    ("Clipboard_Copy", "Copy text to clipboard"),
    ("Clipboard_Paste", "Paste from clipboard"),
    ("Environment_Var", "Read environment variable"),
    ("Random_Number", "Generate random number"),
    ("Sleep_Wait", "Wait specified seconds"),
    ("String_Length", "Get string length"),
    ("To_Upper", "Convert string to uppercase"),
    ("To_Lower", "Convert string to lowercase"),
    ("File_Exists", "Check if file exists"),
    ("Folder_Exists", "Check if folder exists"),
];

/// All Simple tier cases, S01 through S20
pub fn simple_cases() -> Vec<FixtureCase> {
    Tier::Simple
        .cases()
        .zip(SIMPLE)
        .map(|(id, (name, description))| FixtureCase { id, name, description })
        .collect()
}

/// Catalog entry for a case id, if one exists
pub fn lookup(id: CaseId) -> Option<FixtureCase> {
    if id.tier != Tier::Simple {
        return None;
    }
    let &(name, description) = SIMPLE.get(usize::from(id.number).checked_sub(1)?)?;
    Some(FixtureCase { id, name, description })
}
