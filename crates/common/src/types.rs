//! Core types for FlowLab

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of test cases in every tier
pub const CASES_PER_TIER: u8 = 20;

/// RPA platform taking part in a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    UiPath,
    PowerAutomateDesktop,
    PowerAutomateCloud,
    AutomationAnywhere,
    BluePrism,
    FlowBots,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::UiPath,
        Platform::PowerAutomateDesktop,
        Platform::PowerAutomateCloud,
        Platform::AutomationAnywhere,
        Platform::BluePrism,
        Platform::FlowBots,
    ];

    /// Directory name used in the lab tree
    pub fn dir_name(&self) -> &'static str {
        match self {
            Platform::UiPath => "uipath",
            Platform::PowerAutomateDesktop => "pad",
            Platform::PowerAutomateCloud => "pacloud",
            Platform::AutomationAnywhere => "aa",
            Platform::BluePrism => "blueprism",
            Platform::FlowBots => "flowbots",
        }
    }

    /// Name the conversion API expects in `sourcePlatform` / `targetPlatform`
    pub fn api_name(&self) -> &'static str {
        match self {
            Platform::UiPath => "uipath",
            Platform::PowerAutomateDesktop => "powerAutomate",
            Platform::PowerAutomateCloud => "powerAutomateCloud",
            Platform::AutomationAnywhere => "automationAnywhere",
            Platform::BluePrism => "bluePrism",
            Platform::FlowBots => "flowbots",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::UiPath => "UiPath",
            Platform::PowerAutomateDesktop => "Power Automate Desktop",
            Platform::PowerAutomateCloud => "Power Automate Cloud",
            Platform::AutomationAnywhere => "Automation Anywhere",
            Platform::BluePrism => "Blue Prism",
            Platform::FlowBots => "FlowBots",
        }
    }

    /// File extension of a source package, including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Platform::UiPath => ".nupkg",
            Platform::PowerAutomateCloud => ".json",
            Platform::BluePrism => ".bprelease",
            Platform::PowerAutomateDesktop
            | Platform::AutomationAnywhere
            | Platform::FlowBots => ".zip",
        }
    }

    /// Whether the conversion API accepts this platform as a source
    pub fn is_api_source(&self) -> bool {
        matches!(
            self,
            Platform::UiPath
                | Platform::AutomationAnywhere
                | Platform::PowerAutomateDesktop
                | Platform::BluePrism
                | Platform::FlowBots
        )
    }

    /// Whether the conversion API accepts this platform as a target
    pub fn is_api_target(&self) -> bool {
        matches!(
            self,
            Platform::FlowBots
                | Platform::AutomationAnywhere
                | Platform::PowerAutomateDesktop
                | Platform::PowerAutomateCloud
                | Platform::UiPath
        )
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.dir_name() == name)
    }

    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.api_name() == name)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::from_dir_name(&trimmed.to_lowercase())
            .or_else(|| Self::from_api_name(trimmed))
            .ok_or_else(|| Error::UnknownPlatform(s.to_string()))
    }
}

/// Complexity tier of a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Simple,
    Moderate,
    Complex,
    #[serde(rename = "supercomplex")]
    SuperComplex,
    Enterprise,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Simple,
        Tier::Moderate,
        Tier::Complex,
        Tier::SuperComplex,
        Tier::Enterprise,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Tier::Simple => "simple",
            Tier::Moderate => "moderate",
            Tier::Complex => "complex",
            Tier::SuperComplex => "supercomplex",
            Tier::Enterprise => "enterprise",
        }
    }

    /// Prefix of the case ids in this tier
    pub fn prefix(&self) -> &'static str {
        match self {
            Tier::Simple => "S",
            Tier::Moderate => "M",
            Tier::Complex => "C",
            Tier::SuperComplex => "SC",
            Tier::Enterprise => "E",
        }
    }

    /// Title-cased label used in project names, e.g. `Simple`
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Simple => "Simple",
            Tier::Moderate => "Moderate",
            Tier::Complex => "Complex",
            Tier::SuperComplex => "SuperComplex",
            Tier::Enterprise => "Enterprise",
        }
    }

    /// Light tiers are driven with the cheaper agent model
    pub fn is_light(&self) -> bool {
        matches!(self, Tier::Simple | Tier::Moderate)
    }

    pub fn cases(&self) -> impl Iterator<Item = CaseId> {
        let tier = *self;
        (1..=CASES_PER_TIER).map(move |number| CaseId { tier, number })
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.prefix() == prefix)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.dir_name() == lower)
            .ok_or_else(|| Error::UnknownTier(s.to_string()))
    }
}

/// Identifier of a test case inside a tier, e.g. `S01` or `SC20`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseId {
    pub tier: Tier,
    pub number: u8,
}

impl CaseId {
    pub fn new(tier: Tier, number: u8) -> Result<Self> {
        if number == 0 || number > CASES_PER_TIER {
            return Err(Error::InvalidCaseId(format!("{}{}", tier.prefix(), number)));
        }
        Ok(Self { tier, number })
    }
}

fn case_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?i)(SC|S|M|C|E)(\d{1,2})$").expect("valid case id regex"))
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.tier.prefix(), self.number)
    }
}

impl FromStr for CaseId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = case_id_pattern()
            .captures(s.trim())
            .ok_or_else(|| Error::InvalidCaseId(s.to_string()))?;
        let tier = Tier::from_prefix(&caps[1].to_uppercase())
            .ok_or_else(|| Error::InvalidCaseId(s.to_string()))?;
        let number: u8 = caps[2]
            .parse()
            .map_err(|_| Error::InvalidCaseId(s.to_string()))?;
        CaseId::new(tier, number)
    }
}

impl Serialize for CaseId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CaseId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered (source, target) platform pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Direction {
    pub source: Platform,
    pub target: Platform,
}

impl Direction {
    pub const fn new(source: Platform, target: Platform) -> Self {
        Self { source, target }
    }

    /// Whether the conversion API accepts both ends of this direction
    pub fn api_supported(&self) -> bool {
        self.source.is_api_source() && self.target.is_api_target()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

impl FromStr for Direction {
    type Err = Error;

    /// Parses `source:target` (also accepts `->` and `,` as separators)
    fn from_str(s: &str) -> Result<Self> {
        let (source, target) = s
            .split_once("->")
            .or_else(|| s.split_once(':'))
            .or_else(|| s.split_once(','))
            .ok_or_else(|| Error::InvalidDirection(s.to_string()))?;
        let direction = Direction::new(source.parse()?, target.parse()?);
        if direction.source == direction.target {
            return Err(Error::InvalidDirection(s.to_string()));
        }
        Ok(direction)
    }
}

use Platform::{
    AutomationAnywhere as AA, BluePrism as BP, FlowBots as FB, PowerAutomateCloud as PAC,
    PowerAutomateDesktop as PAD, UiPath as UI,
};

/// The fixed conversion matrix exercised by the runner
pub const CONVERSION_MATRIX: [Direction; 24] = [
    Direction::new(UI, PAD),
    Direction::new(UI, PAC),
    Direction::new(UI, AA),
    Direction::new(UI, BP),
    Direction::new(PAD, UI),
    Direction::new(PAD, PAC),
    Direction::new(PAD, AA),
    Direction::new(PAD, BP),
    Direction::new(PAC, UI),
    Direction::new(PAC, PAD),
    Direction::new(PAC, AA),
    Direction::new(PAC, BP),
    Direction::new(AA, UI),
    Direction::new(AA, PAD),
    Direction::new(AA, PAC),
    Direction::new(AA, BP),
    Direction::new(BP, UI),
    Direction::new(BP, PAD),
    Direction::new(BP, PAC),
    Direction::new(BP, AA),
    Direction::new(UI, FB),
    Direction::new(PAD, FB),
    Direction::new(AA, FB),
    Direction::new(BP, FB),
];

/// Identifier of one matrix test, e.g. `FB-SIMPLE-UIPATH-to-PAD-S01`
pub fn run_test_id(tier: Tier, direction: Direction, case: CaseId) -> String {
    format!(
        "FB-{}-{}-to-{}-{}",
        tier.dir_name().to_uppercase(),
        direction.source.dir_name().to_uppercase(),
        direction.target.dir_name().to_uppercase(),
        case
    )
}

/// Status of a matrix test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
    Timeout,
    Error,
    Skipped,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Timeout => write!(f, "TIMEOUT"),
            TestStatus::Error => write!(f, "ERROR"),
            TestStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}
