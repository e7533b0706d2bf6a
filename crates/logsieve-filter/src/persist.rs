//! Filter file formats
//!
//! A rule set is stored either as JSON or as XML; the file extension picks
//! the format (`.json` is JSON, anything else XML). Both forms carry the same
//! fields and keep rule order and disabled rules.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use logsieve_types::{MatchType, Rgb, RuleDef, RuleKind, Target};

use crate::error::StoreError;
use crate::rule_set::{RuleList, RuleSet};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialization format of a filter file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    /// Pick the format from a file name's extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Xml,
        }
    }
}

// ============================================================================
// Stored rule, format independent
// ============================================================================

struct StoredRule {
    kind: RuleKind,
    match_type: MatchType,
    pattern: String,
    case_sensitive: bool,
    enabled: bool,
    color: Rgb,
    target: Option<Target>,
}

impl StoredRule {
    fn from_def(def: RuleDef, list: RuleList) -> Self {
        Self {
            kind: def.kind,
            match_type: def.match_type,
            pattern: def.pattern,
            case_sensitive: def.case_sensitive,
            enabled: def.enabled,
            color: def.color,
            // Message rules always target the text; only process rules say which field
            target: (list == RuleList::Process).then_some(def.target),
        }
    }

    fn into_def(self, list: RuleList) -> Result<RuleDef, StoreError> {
        let target = match (list, self.target) {
            (RuleList::Message, None | Some(Target::MessageText)) => Target::MessageText,
            (RuleList::Process, None) => Target::ProcessName,
            (RuleList::Process, Some(t)) if t.is_process() => t,
            (_, Some(t)) => {
                return Err(StoreError::Invalid(format!(
                    "target {} in {} filters",
                    t.as_str(),
                    match list {
                        RuleList::Message => "message",
                        RuleList::Process => "process",
                    }
                )));
            }
        };

        Ok(RuleDef {
            kind: self.kind,
            target,
            match_type: self.match_type,
            case_sensitive: self.case_sensitive,
            pattern: self.pattern,
            color: self.color,
            enabled: self.enabled,
        })
    }
}

/// Colors are stored packed; anything past 24 bits is not a color
fn unpack_color(value: u32) -> Result<Rgb, StoreError> {
    if value > 0xff_ffff {
        return Err(StoreError::Invalid(format!("color {:#x} out of range", value)));
    }
    Ok(Rgb::from_packed(value))
}

fn stored_rules(set: &RuleSet, list: RuleList) -> impl Iterator<Item = StoredRule> + '_ {
    set.filters(list)
        .into_iter()
        .map(move |def| StoredRule::from_def(def, list))
}

fn build_set(
    name: String,
    message: Vec<StoredRule>,
    process: Vec<StoredRule>,
) -> Result<RuleSet, StoreError> {
    let message = message
        .into_iter()
        .map(|r| r.into_def(RuleList::Message))
        .collect::<Result<Vec<_>, _>>()?;
    let process = process
        .into_iter()
        .map(|r| r.into_def(RuleList::Process))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuleSet::from_defs(name, message, process)?)
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonRuleSet {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message_filters: Vec<JsonRule>,
    #[serde(default)]
    process_filters: Vec<JsonRule>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonRule {
    kind: RuleKind,
    #[serde(default)]
    match_type: MatchType,
    pattern: String,
    #[serde(default)]
    case_sensitive: bool,
    #[serde(default = "yes")]
    enabled: bool,
    #[serde(default)]
    color: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<Target>,
}

fn yes() -> bool {
    true
}

fn substring() -> String {
    MatchType::Substring.as_str().to_string()
}

impl From<StoredRule> for JsonRule {
    fn from(r: StoredRule) -> Self {
        Self {
            kind: r.kind,
            match_type: r.match_type,
            pattern: r.pattern,
            case_sensitive: r.case_sensitive,
            enabled: r.enabled,
            color: r.color.packed(),
            target: r.target,
        }
    }
}

impl TryFrom<JsonRule> for StoredRule {
    type Error = StoreError;

    fn try_from(r: JsonRule) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: r.kind,
            match_type: r.match_type,
            pattern: r.pattern,
            case_sensitive: r.case_sensitive,
            enabled: r.enabled,
            color: unpack_color(r.color)?,
            target: r.target,
        })
    }
}

fn to_json(set: &RuleSet) -> Result<String, StoreError> {
    let doc = JsonRuleSet {
        name: set.name().to_string(),
        message_filters: stored_rules(set, RuleList::Message).map(Into::into).collect(),
        process_filters: stored_rules(set, RuleList::Process).map(Into::into).collect(),
    };
    let mut out = serde_json::to_string_pretty(&doc)?;
    out.push('\n');
    Ok(out)
}

fn from_json(contents: &str) -> Result<RuleSet, StoreError> {
    let doc: JsonRuleSet = serde_json::from_str(contents)?;
    let convert = |rules: Vec<JsonRule>| {
        rules
            .into_iter()
            .map(StoredRule::try_from)
            .collect::<Result<Vec<_>, _>>()
    };
    build_set(
        doc.name,
        convert(doc.message_filters)?,
        convert(doc.process_filters)?,
    )
}

// ============================================================================
// XML
// ============================================================================

#[derive(Serialize, Deserialize)]
#[serde(rename = "LogFilter")]
struct XmlRuleSet {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "messageFilters", default)]
    message_filters: XmlRuleList,
    #[serde(rename = "processFilters", default)]
    process_filters: XmlRuleList,
}

#[derive(Default, Serialize, Deserialize)]
struct XmlRuleList {
    #[serde(rename = "filter", default)]
    filters: Vec<XmlRule>,
}

/// Enumerations are kept as plain attribute text and parsed by hand
#[derive(Serialize, Deserialize)]
struct XmlRule {
    #[serde(rename = "@kind")]
    kind: String,
    #[serde(rename = "@matchType", default = "substring")]
    match_type: String,
    #[serde(rename = "@pattern")]
    pattern: String,
    #[serde(rename = "@caseSensitive", default)]
    case_sensitive: bool,
    #[serde(rename = "@enabled", default = "yes")]
    enabled: bool,
    #[serde(rename = "@color", default)]
    color: u32,
    #[serde(rename = "@target", default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
}

impl From<StoredRule> for XmlRule {
    fn from(r: StoredRule) -> Self {
        Self {
            kind: r.kind.as_str().to_string(),
            match_type: r.match_type.as_str().to_string(),
            pattern: r.pattern,
            case_sensitive: r.case_sensitive,
            enabled: r.enabled,
            color: r.color.packed(),
            target: r.target.map(|t| t.as_str().to_string()),
        }
    }
}

impl TryFrom<XmlRule> for StoredRule {
    type Error = StoreError;

    fn try_from(r: XmlRule) -> Result<Self, Self::Error> {
        let invalid = |what: &str, value: &str| StoreError::Invalid(format!("unknown {what} '{value}'"));

        let kind = RuleKind::parse(&r.kind).ok_or_else(|| invalid("kind", &r.kind))?;
        let match_type =
            MatchType::parse(&r.match_type).ok_or_else(|| invalid("matchType", &r.match_type))?;
        let target = match r.target {
            Some(t) => Some(Target::parse(&t).ok_or_else(|| invalid("target", &t))?),
            None => None,
        };
        Ok(Self {
            kind,
            match_type,
            pattern: r.pattern,
            case_sensitive: r.case_sensitive,
            enabled: r.enabled,
            color: unpack_color(r.color)?,
            target,
        })
    }
}

fn to_xml(set: &RuleSet) -> Result<String, StoreError> {
    let doc = XmlRuleSet {
        name: set.name().to_string(),
        message_filters: XmlRuleList {
            filters: stored_rules(set, RuleList::Message).map(Into::into).collect(),
        },
        process_filters: XmlRuleList {
            filters: stored_rules(set, RuleList::Process).map(Into::into).collect(),
        },
    };

    let mut body = String::new();
    let mut ser = quick_xml::se::Serializer::new(&mut body);
    ser.indent(' ', 2);
    doc.serialize(ser)?;

    Ok(format!("{}\n{}\n", XML_DECLARATION, body))
}

fn from_xml(contents: &str) -> Result<RuleSet, StoreError> {
    let doc: XmlRuleSet = quick_xml::de::from_str(contents)?;
    let convert = |list: XmlRuleList| {
        list.filters
            .into_iter()
            .map(StoredRule::try_from)
            .collect::<Result<Vec<_>, _>>()
    };
    build_set(
        doc.name,
        convert(doc.message_filters)?,
        convert(doc.process_filters)?,
    )
}

// ============================================================================
// Public API
// ============================================================================

/// Serialize a rule set
pub fn to_string(set: &RuleSet, format: Format) -> Result<String, StoreError> {
    match format {
        Format::Json => to_json(set),
        Format::Xml => to_xml(set),
    }
}

/// Parse and compile a rule set
pub fn from_str(contents: &str, format: Format) -> Result<RuleSet, StoreError> {
    match format {
        Format::Json => from_json(contents),
        Format::Xml => from_xml(contents),
    }
}

/// Read a filter file, choosing the format from its extension
pub fn read_file(path: &Path) -> Result<RuleSet, StoreError> {
    let contents = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    from_str(&contents, Format::from_path(path))
}

/// Write a filter file, choosing the format from its extension.
///
/// The data goes to a temporary file next to the target which is then
/// renamed over it, so the target is either fully old or fully new.
pub fn write_file(set: &RuleSet, path: &Path) -> Result<(), StoreError> {
    let contents = to_string(set, Format::from_path(path))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(path, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| StoreError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;

    tracing::debug!(path = %path.display(), "saved filter '{}'", set.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RuleSet {
        RuleSet::from_defs(
            "errors & <warnings>",
            vec![
                RuleDef::message(RuleKind::Highlight, "ERROR").with_color(Rgb::new(255, 0, 0)),
                RuleDef::message(RuleKind::Exclude, r#"heart"beat*"#)
                    .with_match_type(MatchType::Wildcard)
                    .case_sensitive()
                    .disabled(),
                RuleDef::message(RuleKind::Track, r"id=\d+").with_match_type(MatchType::Regex),
                RuleDef::message(RuleKind::Stop, "[").with_match_type(MatchType::Regex),
            ],
            vec![
                RuleDef::process(RuleKind::Exclude, "noisy.exe"),
                RuleDef::process_id(RuleKind::Include, 4242),
            ],
        )
        .unwrap()
    }

    fn defs(set: &RuleSet) -> (Vec<RuleDef>, Vec<RuleDef>) {
        (
            set.filters(RuleList::Message),
            set.filters(RuleList::Process),
        )
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a.JSON")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a.xml")), Format::Xml);
        assert_eq!(Format::from_path(Path::new("a.flt")), Format::Xml);
        assert_eq!(Format::from_path(Path::new("noext")), Format::Xml);
    }

    #[test]
    fn test_json_roundtrip_is_exact() {
        let set = sample();
        let saved = to_string(&set, Format::Json).unwrap();
        let loaded = from_str(&saved, Format::Json).unwrap();
        assert_eq!(loaded.name(), set.name());
        assert_eq!(defs(&loaded), defs(&set));
        assert_eq!(to_string(&loaded, Format::Json).unwrap(), saved);
    }

    #[test]
    fn test_xml_roundtrip_is_exact() {
        let set = sample();
        let saved = to_string(&set, Format::Xml).unwrap();
        assert!(saved.starts_with(XML_DECLARATION));
        let loaded = from_str(&saved, Format::Xml).unwrap();
        assert_eq!(loaded.name(), set.name());
        assert_eq!(defs(&loaded), defs(&set));
        assert_eq!(to_string(&loaded, Format::Xml).unwrap(), saved);
    }

    #[test]
    fn test_empty_set_roundtrip() {
        let set = RuleSet::new("");
        for format in [Format::Json, Format::Xml] {
            let saved = to_string(&set, format).unwrap();
            let loaded = from_str(&saved, format).unwrap();
            assert!(loaded.is_empty());
            assert_eq!(to_string(&loaded, format).unwrap(), saved);
        }
    }

    #[test]
    fn test_json_layout() {
        let set = RuleSet::from_defs(
            "x",
            vec![RuleDef::message(RuleKind::Highlight, "ERROR").with_color(Rgb::new(255, 0, 0))],
            vec![RuleDef::process(RuleKind::Exclude, "noisy.exe")],
        )
        .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&to_string(&set, Format::Json).unwrap()).unwrap();
        let message = &value["messageFilters"][0];
        assert_eq!(message["kind"], "Highlight");
        assert_eq!(message["matchType"], "Substring");
        assert_eq!(message["color"], 0xff0000);
        assert!(message.get("target").is_none());
        assert_eq!(value["processFilters"][0]["target"], "ProcessName");
    }

    #[test]
    fn test_process_rule_without_target_is_process_name() {
        let json = r#"{"name":"n","processFilters":[{"kind":"Exclude","pattern":"a.exe"}]}"#;
        let set = from_str(json, Format::Json).unwrap();
        let rule = &set.filters(RuleList::Process)[0];
        assert_eq!(rule.target, Target::ProcessName);
        assert!(rule.enabled);
    }

    #[test]
    fn test_message_rule_with_process_target_is_rejected() {
        let json = r#"{"name":"n","messageFilters":[{"kind":"Exclude","pattern":"a","target":"ProcessId"}]}"#;
        assert!(matches!(
            from_str(json, Format::Json),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            from_str("{ not json", Format::Json),
            Err(StoreError::Json(_))
        ));
        assert!(from_str("<LogFilter><messageFilters>", Format::Xml).is_err());

        let xml = r#"<LogFilter name="n"><messageFilters><filter kind="Shout" matchType="Substring" pattern="x"/></messageFilters></LogFilter>"#;
        assert!(matches!(
            from_str(xml, Format::Xml),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_out_of_range_color_is_rejected() {
        let json = r#"{"name":"n","messageFilters":[{"kind":"Highlight","pattern":"x","color":16777216}]}"#;
        assert!(matches!(
            from_str(json, Format::Json),
            Err(StoreError::Invalid(_))
        ));

        let xml = r#"<LogFilter name="n"><messageFilters><filter kind="Highlight" matchType="Substring" pattern="x" color="16777216"/></messageFilters></LogFilter>"#;
        assert!(matches!(
            from_str(xml, Format::Xml),
            Err(StoreError::Invalid(_))
        ));

        let json = r#"{"name":"n","messageFilters":[{"kind":"Highlight","pattern":"x","color":16777215}]}"#;
        let set = from_str(json, Format::Json).unwrap();
        assert_eq!(set.filters(RuleList::Message)[0].color, Rgb::WHITE);
    }

    #[test]
    fn test_match_type_defaults_to_substring() {
        let json = r#"{"name":"n","messageFilters":[{"kind":"Exclude","pattern":"a"}]}"#;
        let xml = r#"<LogFilter name="n"><messageFilters><filter kind="Exclude" pattern="a"/></messageFilters></LogFilter>"#;
        for (contents, format) in [(json, Format::Json), (xml, Format::Xml)] {
            let set = from_str(contents, format).unwrap();
            let rule = &set.filters(RuleList::Message)[0];
            assert_eq!(rule.match_type, MatchType::Substring);
            assert!(rule.enabled);
        }
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let set = sample();
        for file in ["filters.xml", "filters.json"] {
            let path = dir.path().join(file);
            write_file(&set, &path).unwrap();
            let loaded = read_file(&path).unwrap();
            assert_eq!(defs(&loaded), defs(&set));

            let bytes = fs::read_to_string(&path).unwrap();
            write_file(&loaded, &path).unwrap();
            assert_eq!(fs::read_to_string(&path).unwrap(), bytes);
        }
    }

    #[test]
    fn test_failed_save_keeps_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("filters.xml");
        let err = write_file(&sample(), &path).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
