//! Shared types for logsieve
//!
//! This crate contains the data structures passed between the filter engine
//! and its collaborators: captured lines, rule definitions, and decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Colors
// ============================================================================

/// 24-bit display color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(229, 20, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value; bits above 24 are ignored
    pub const fn from_packed(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    /// Packed `0xRRGGBB` value, as persisted in filter files
    pub const fn packed(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl From<u32> for Rgb {
    fn from(value: u32) -> Self {
        Self::from_packed(value)
    }
}

impl From<Rgb> for u32 {
    fn from(color: Rgb) -> Self {
        color.packed()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Standard highlight palette offered to users when picking rule colors
pub const HIGHLIGHT_COLORS: [Rgb; 16] = [
    Rgb::new(255, 255, 255), // white
    Rgb::new(192, 192, 192), // light grey
    Rgb::new(128, 128, 128), // mid grey
    Rgb::new(64, 64, 64),    // dark grey
    Rgb::new(0, 0, 0),       // black
    Rgb::new(27, 161, 226),  // blue
    Rgb::new(160, 80, 0),    // brown
    Rgb::new(51, 153, 51),   // green
    Rgb::new(162, 193, 57),  // lime
    Rgb::new(216, 0, 115),   // magenta
    Rgb::new(240, 150, 9),   // mango
    Rgb::new(230, 113, 184), // pink
    Rgb::new(162, 0, 255),   // purple
    Rgb::new(229, 20, 0),    // red
    Rgb::new(0, 171, 169),   // teal
    Rgb::new(255, 255, 255), // white
];

// ============================================================================
// Rule Definitions
// ============================================================================

/// What a rule does when it matches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Include,
    Exclude,
    Highlight,
    Track,
    Stop,
}

impl RuleKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Include" => Some(Self::Include),
            "Exclude" => Some(Self::Exclude),
            "Highlight" => Some(Self::Highlight),
            "Track" => Some(Self::Track),
            "Stop" => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Include => "Include",
            Self::Exclude => "Exclude",
            Self::Highlight => "Highlight",
            Self::Track => "Track",
            Self::Stop => "Stop",
        }
    }

    /// Whether the rule's color is used when it matches
    pub fn uses_color(&self) -> bool {
        matches!(self, Self::Highlight | Self::Track)
    }
}

/// Which field of a line a rule is tested against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Target {
    #[default]
    MessageText,
    ProcessName,
    ProcessId,
}

impl Target {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MessageText" => Some(Self::MessageText),
            "ProcessName" => Some(Self::ProcessName),
            "ProcessId" => Some(Self::ProcessId),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageText => "MessageText",
            Self::ProcessName => "ProcessName",
            Self::ProcessId => "ProcessId",
        }
    }

    /// Process rules target the originating process rather than the text
    pub fn is_process(&self) -> bool {
        matches!(self, Self::ProcessName | Self::ProcessId)
    }
}

/// How a rule's pattern is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchType {
    #[default]
    Substring,
    Wildcard,
    Regex,
}

impl MatchType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Substring" => Some(Self::Substring),
            "Wildcard" => Some(Self::Wildcard),
            "Regex" => Some(Self::Regex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substring => "Substring",
            Self::Wildcard => "Wildcard",
            Self::Regex => "Regex",
        }
    }
}

/// A rule as edited by the user, before its pattern is compiled
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleDef {
    pub kind: RuleKind,
    pub target: Target,
    pub match_type: MatchType,
    pub case_sensitive: bool,
    pub pattern: String,
    pub color: Rgb,
    pub enabled: bool,
}

impl RuleDef {
    /// Create an enabled, case-insensitive substring rule on the message text
    pub fn message(kind: RuleKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            target: Target::MessageText,
            match_type: MatchType::Substring,
            case_sensitive: false,
            pattern: pattern.into(),
            color: Rgb::default(),
            enabled: true,
        }
    }

    /// Create an enabled, case-insensitive substring rule on the process name
    pub fn process(kind: RuleKind, pattern: impl Into<String>) -> Self {
        Self {
            target: Target::ProcessName,
            ..Self::message(kind, pattern)
        }
    }

    /// Create an enabled rule on the process id
    pub fn process_id(kind: RuleKind, pid: u32) -> Self {
        Self {
            target: Target::ProcessId,
            ..Self::message(kind, pid.to_string())
        }
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ============================================================================
// Line & Decision Types
// ============================================================================

/// A captured debug output line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    /// Originating process id
    pub pid: u32,

    /// Originating process image name
    pub process_name: String,

    /// Message text
    pub message: String,

    /// Capture time (if known)
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogLine {
    pub fn new(pid: u32, process_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pid,
            process_name: process_name.into(),
            message: message.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Outcome of evaluating one line against a rule set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub visible: bool,
    pub color: Option<Rgb>,
    pub tracked: bool,
}

impl Default for Decision {
    fn default() -> Self {
        Self {
            visible: true,
            color: None,
            tracked: false,
        }
    }
}
