use logsieve_types::RuleDef;

use crate::error::{FilterError, PatternError};
use crate::rule::Rule;

/// One of the two ordered rule lists of a rule set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleList {
    Message,
    Process,
}

impl RuleList {
    fn label(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Process => "process",
        }
    }

    fn check(&self, def: &RuleDef) -> Result<(), FilterError> {
        let is_process = def.target.is_process();
        match (self, is_process) {
            (Self::Message, false) | (Self::Process, true) => Ok(()),
            _ => Err(FilterError::mismatch(def.target, self.label())),
        }
    }
}

/// A named filter configuration: message rules and process rules, each in
/// evaluation order
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    name: String,
    message_rules: Vec<Rule>,
    process_rules: Vec<Rule>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a rule set from definitions, compiling every pattern
    pub fn from_defs(
        name: impl Into<String>,
        message: Vec<RuleDef>,
        process: Vec<RuleDef>,
    ) -> Result<Self, FilterError> {
        let mut set = Self::new(name);
        set.set_filters(RuleList::Message, message)?;
        set.set_filters(RuleList::Process, process)?;
        Ok(set)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Compiled rules of one list, in evaluation order
    pub fn rules(&self, list: RuleList) -> &[Rule] {
        match list {
            RuleList::Message => &self.message_rules,
            RuleList::Process => &self.process_rules,
        }
    }

    pub fn message_rules(&self) -> &[Rule] {
        &self.message_rules
    }

    pub fn process_rules(&self) -> &[Rule] {
        &self.process_rules
    }

    /// Rule definitions of one list, as the editor shows them
    pub fn filters(&self, list: RuleList) -> Vec<RuleDef> {
        self.rules(list).iter().map(|r| r.def().clone()).collect()
    }

    /// Replace one list. Nothing changes if any definition has the wrong target.
    pub fn set_filters(&mut self, list: RuleList, defs: Vec<RuleDef>) -> Result<(), FilterError> {
        for def in &defs {
            list.check(def)?;
        }
        *self.rules_mut(list) = defs.into_iter().map(Rule::compile).collect();
        Ok(())
    }

    /// Append a rule at the end of a list
    pub fn push(&mut self, list: RuleList, def: RuleDef) -> Result<(), FilterError> {
        list.check(&def)?;
        self.rules_mut(list).push(Rule::compile(def));
        Ok(())
    }

    /// Insert a rule at a position; `index == len` appends
    pub fn insert(&mut self, list: RuleList, index: usize, def: RuleDef) -> Result<(), FilterError> {
        list.check(&def)?;
        let rules = self.rules_mut(list);
        if index > rules.len() {
            return Err(FilterError::IndexOutOfRange {
                index,
                len: rules.len(),
            });
        }
        rules.insert(index, Rule::compile(def));
        Ok(())
    }

    /// Remove a rule, returning its definition
    pub fn remove(&mut self, list: RuleList, index: usize) -> Result<RuleDef, FilterError> {
        let rules = self.rules_mut(list);
        check_index(index, rules.len())?;
        Ok(rules.remove(index).def().clone())
    }

    /// Move a rule to a new position, shifting the ones in between
    pub fn move_rule(&mut self, list: RuleList, from: usize, to: usize) -> Result<(), FilterError> {
        let rules = self.rules_mut(list);
        check_index(from, rules.len())?;
        check_index(to, rules.len())?;
        let rule = rules.remove(from);
        rules.insert(to, rule);
        Ok(())
    }

    /// Flip a rule's enabled flag
    pub fn toggle(&mut self, list: RuleList, index: usize) -> Result<(), FilterError> {
        let rules = self.rules_mut(list);
        check_index(index, rules.len())?;
        rules[index] = rules[index].toggled();
        Ok(())
    }

    /// Append another set's rules after ours, list by list, keeping duplicates
    pub fn merge(&mut self, other: RuleSet) {
        self.message_rules.extend(other.message_rules);
        self.process_rules.extend(other.process_rules);
    }

    /// Remove every rule from both lists
    pub fn clear(&mut self) {
        self.message_rules.clear();
        self.process_rules.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.message_rules.is_empty() && self.process_rules.is_empty()
    }

    /// Rules whose pattern did not compile, with their list and position
    pub fn warnings(&self) -> Vec<(RuleList, usize, &PatternError)> {
        let mut warnings = Vec::new();
        for list in [RuleList::Message, RuleList::Process] {
            for (i, rule) in self.rules(list).iter().enumerate() {
                if let Some(warning) = rule.warning() {
                    warnings.push((list, i, warning));
                }
            }
        }
        warnings
    }

    fn rules_mut(&mut self, list: RuleList) -> &mut Vec<Rule> {
        match list {
            RuleList::Message => &mut self.message_rules,
            RuleList::Process => &mut self.process_rules,
        }
    }
}

fn check_index(index: usize, len: usize) -> Result<(), FilterError> {
    if index < len {
        Ok(())
    } else {
        Err(FilterError::IndexOutOfRange { index, len })
    }
}
