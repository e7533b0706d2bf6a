//! Per-line rule evaluation
//!
//! A line goes through two passes: the process rules first, then the message
//! rules. Within a pass rules are consulted in list order:
//!
//! - the first matching Include or Exclude decides visibility; later
//!   Include/Exclude rules in the same pass are not consulted
//! - an Exclude ends evaluation; a process Exclude skips the message pass
//! - a Stop ends the current pass with whatever has been decided so far
//! - Highlight and Track never affect visibility; the last match sets the
//!   color and any Track match marks the line as tracked
//!
//! With no decisive match the line is visible.

use logsieve_types::{Decision, LogLine, Rgb, RuleKind};

use crate::rule::Rule;
use crate::rule_set::RuleSet;

/// Counters collected while evaluating one line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Number of rule patterns tested against the line
    pub rules_tested: usize,
}

/// A colored span of message text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
    pub color: Rgb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visibility {
    Undecided,
    Included,
    Excluded,
}

#[derive(Default)]
struct Accumulator {
    color: Option<Rgb>,
    tracked: bool,
}

/// Evaluate a line against a rule set
pub fn evaluate(set: &RuleSet, line: &LogLine) -> Decision {
    evaluate_counted(set, line).0
}

/// Evaluate a line, also reporting how much work it took
pub fn evaluate_counted(set: &RuleSet, line: &LogLine) -> (Decision, EvalStats) {
    let mut stats = EvalStats::default();
    let mut acc = Accumulator::default();

    let visibility = match run_pass(set.process_rules(), line, &mut acc, &mut stats) {
        Visibility::Excluded => Visibility::Excluded,
        _ => run_pass(set.message_rules(), line, &mut acc, &mut stats),
    };

    let decision = Decision {
        visible: visibility != Visibility::Excluded,
        color: acc.color,
        tracked: acc.tracked,
    };
    (decision, stats)
}

fn run_pass(
    rules: &[Rule],
    line: &LogLine,
    acc: &mut Accumulator,
    stats: &mut EvalStats,
) -> Visibility {
    let mut visibility = Visibility::Undecided;

    for rule in rules.iter().filter(|r| r.is_enabled()) {
        let kind = rule.kind();
        // Once decided, Include/Exclude cannot change anything
        if visibility != Visibility::Undecided
            && matches!(kind, RuleKind::Include | RuleKind::Exclude)
        {
            continue;
        }

        stats.rules_tested += 1;
        if !rule.matches(line) {
            continue;
        }

        match kind {
            RuleKind::Exclude => return Visibility::Excluded,
            RuleKind::Include => visibility = Visibility::Included,
            RuleKind::Stop => break,
            RuleKind::Highlight => acc.color = Some(rule.color()),
            RuleKind::Track => {
                acc.color = Some(rule.color());
                acc.tracked = true;
            }
        }
    }

    visibility
}

/// Spans of message text matched by enabled Highlight rules, in rule order
pub fn highlights(set: &RuleSet, text: &str) -> Vec<Highlight> {
    set.message_rules()
        .iter()
        .filter(|r| r.is_enabled() && r.kind() == RuleKind::Highlight)
        .flat_map(|r| {
            let color = r.color();
            r.find_matches(text)
                .into_iter()
                .map(move |(start, end)| Highlight { start, end, color })
        })
        .collect()
}
