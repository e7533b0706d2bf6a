use logsieve_types::{LogLine, MatchType, Rgb, RuleDef, RuleKind, Target};

use crate::error::PatternError;
use crate::matcher::Matcher;

/// A rule with its pattern compiled
///
/// A rule whose pattern failed to compile keeps the error as a warning and
/// never matches; it stays in its list so the editor can show and fix it.
#[derive(Clone, Debug)]
pub struct Rule {
    def: RuleDef,
    check: Result<Check, PatternError>,
}

#[derive(Clone, Debug)]
enum Check {
    Pattern(Matcher),
    /// Plain process id rule, compared as a number
    Pid(u32),
}

impl Rule {
    /// Compile a rule definition. Never fails; see [`Rule::warning`].
    pub fn compile(def: RuleDef) -> Self {
        let check = match (def.target, def.match_type) {
            (Target::ProcessId, MatchType::Substring) => def
                .pattern
                .trim()
                .parse::<u32>()
                .map(Check::Pid)
                .map_err(|e| PatternError::new(&def.pattern, format!("not a process id: {e}"))),
            _ => Matcher::compile(&def.pattern, def.match_type, def.case_sensitive)
                .map(Check::Pattern),
        };
        if let Err(e) = &check {
            tracing::warn!(
                kind = def.kind.as_str(),
                target = def.target.as_str(),
                "rule disabled by bad pattern: {}",
                e
            );
        }
        Self { def, check }
    }

    /// Check the rule against the field its target selects
    pub fn matches(&self, line: &LogLine) -> bool {
        match &self.check {
            Ok(Check::Pid(pid)) => line.pid == *pid,
            Ok(Check::Pattern(matcher)) => match self.def.target {
                Target::MessageText => matcher.is_match(&line.message),
                Target::ProcessName => matcher.is_match(&line.process_name),
                Target::ProcessId => matcher.is_match(&line.pid.to_string()),
            },
            Err(_) => false,
        }
    }

    /// Match spans in a piece of text, empty for a broken pattern
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.check {
            Ok(Check::Pattern(matcher)) => matcher.find_matches(text),
            _ => Vec::new(),
        }
    }

    /// The compile error, if the pattern is unusable
    pub fn warning(&self) -> Option<&PatternError> {
        self.check.as_ref().err()
    }

    pub fn def(&self) -> &RuleDef {
        &self.def
    }

    pub fn kind(&self) -> RuleKind {
        self.def.kind
    }

    pub fn target(&self) -> Target {
        self.def.target
    }

    pub fn color(&self) -> Rgb {
        self.def.color
    }

    pub fn is_enabled(&self) -> bool {
        self.def.enabled
    }

    /// Same rule with the enabled flag flipped; the pattern is not recompiled
    pub(crate) fn toggled(&self) -> Self {
        let mut rule = self.clone();
        rule.def.enabled = !rule.def.enabled;
        rule
    }
}
