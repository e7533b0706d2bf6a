use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use logsieve_types::{Decision, LogLine, RuleDef};

use crate::error::{FilterError, StoreError};
use crate::evaluator::{self, EvalStats, Highlight};
use crate::persist::{self, Format};
use crate::process_colors::ProcessColors;
use crate::rule_set::{RuleList, RuleSet};

/// Thread-safe holder of the active rule set
///
/// Readers take an `Arc` snapshot and evaluate without holding any lock.
/// Every change builds a new rule set and swaps it in, so an evaluation sees
/// the set entirely as it was before or entirely as it is after a change.
#[derive(Clone, Default)]
pub struct FilterStore {
    /// Snapshot used by evaluation
    active: Arc<RwLock<Arc<RuleSet>>>,

    /// Named rule sets kept aside for switching sessions
    stashed: Arc<RwLock<BTreeMap<String, Arc<RuleSet>>>>,

    /// Fallback line colors by process
    colors: Arc<RwLock<Arc<ProcessColors>>>,

    /// Serializes read-modify-swap updates
    writer: Arc<Mutex<()>>,
}

impl FilterStore {
    /// Create a store with an empty, unnamed rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store starting from the given rule set
    pub fn with_rule_set(set: RuleSet) -> Self {
        let store = Self::new();
        store.replace(set);
        store
    }

    /// Current rule set, stable for as long as the caller holds it
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.active.read())
    }

    /// Swap in a whole new rule set, returning the previous one
    pub fn replace(&self, set: RuleSet) -> Arc<RuleSet> {
        let _guard = self.writer.lock();
        self.swap(Arc::new(set))
    }

    /// Apply a change to a copy of the active set and swap the copy in
    pub fn update<T>(&self, f: impl FnOnce(&mut RuleSet) -> T) -> T {
        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        let result = f(&mut next);
        self.swap(Arc::new(next));
        result
    }

    /// Like [`FilterStore::update`], but nothing is swapped in on error
    pub fn try_update<T, E>(&self, f: impl FnOnce(&mut RuleSet) -> Result<T, E>) -> Result<T, E> {
        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        let result = f(&mut next)?;
        self.swap(Arc::new(next));
        Ok(result)
    }

    fn swap(&self, next: Arc<RuleSet>) -> Arc<RuleSet> {
        tracing::debug!(
            name = next.name(),
            message_rules = next.message_rules().len(),
            process_rules = next.process_rules().len(),
            "activating rule set"
        );
        std::mem::replace(&mut *self.active.write(), next)
    }

    // ------------------------------------------------------------------------
    // Load / save
    // ------------------------------------------------------------------------

    /// Load a filter file and append its rules after the current ones.
    ///
    /// The file's name becomes the active name. On error nothing changes.
    pub fn load(&self, path: &Path) -> Result<(), StoreError> {
        let loaded = persist::read_file(path)?;
        tracing::debug!(path = %path.display(), "loaded filter '{}'", loaded.name());
        self.merge(loaded);
        Ok(())
    }

    /// Parse filter data and append its rules after the current ones
    pub fn load_str(&self, contents: &str, format: Format) -> Result<(), StoreError> {
        let loaded = persist::from_str(contents, format)?;
        self.merge(loaded);
        Ok(())
    }

    fn merge(&self, loaded: RuleSet) {
        self.update(|set| {
            set.set_name(loaded.name());
            set.merge(loaded);
        });
    }

    /// Save the active set; the format follows the file extension
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        persist::write_file(&self.snapshot(), path)
    }

    /// Serialize the active set
    pub fn save_to_string(&self, format: Format) -> Result<String, StoreError> {
        persist::to_string(&self.snapshot(), format)
    }

    /// Remove all message and process rules
    pub fn clear(&self) {
        self.update(RuleSet::clear);
    }

    // ------------------------------------------------------------------------
    // Editor accessors
    // ------------------------------------------------------------------------

    pub fn name(&self) -> String {
        self.snapshot().name().to_string()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(|set| set.set_name(name));
    }

    pub fn message_filters(&self) -> Vec<RuleDef> {
        self.snapshot().filters(RuleList::Message)
    }

    pub fn set_message_filters(&self, defs: Vec<RuleDef>) -> Result<(), FilterError> {
        self.try_update(|set| set.set_filters(RuleList::Message, defs))
    }

    pub fn process_filters(&self) -> Vec<RuleDef> {
        self.snapshot().filters(RuleList::Process)
    }

    pub fn set_process_filters(&self, defs: Vec<RuleDef>) -> Result<(), FilterError> {
        self.try_update(|set| set.set_filters(RuleList::Process, defs))
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    /// Keep a copy of the active set under a name, replacing any earlier one
    pub fn stash(&self, name: impl Into<String>) {
        let snapshot = self.snapshot();
        self.stashed.write().insert(name.into(), snapshot);
    }

    /// Make a stashed set the active one; the stash keeps its copy
    pub fn activate(&self, name: &str) -> Result<(), StoreError> {
        let set = self
            .stashed
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownSession(name.to_string()))?;
        let _guard = self.writer.lock();
        self.swap(set);
        Ok(())
    }

    pub fn remove_stashed(&self, name: &str) -> bool {
        self.stashed.write().remove(name).is_some()
    }

    /// Names of stashed sets, sorted
    pub fn stashed_names(&self) -> Vec<String> {
        self.stashed.read().keys().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    pub fn set_process_colors(&self, colors: ProcessColors) {
        *self.colors.write() = Arc::new(colors);
    }

    pub fn process_colors(&self) -> Arc<ProcessColors> {
        Arc::clone(&self.colors.read())
    }

    /// Decide one line against the current snapshot
    pub fn evaluate(&self, line: &LogLine) -> Decision {
        self.evaluate_counted(line).0
    }

    /// Decide one line, reporting how many rules were tested
    pub fn evaluate_counted(&self, line: &LogLine) -> (Decision, EvalStats) {
        let set = self.snapshot();
        let (mut decision, stats) = evaluator::evaluate_counted(&set, line);
        if decision.color.is_none() {
            decision.color = self.process_colors().color_for(line);
        }
        (decision, stats)
    }

    /// Highlight spans for a message against the current snapshot
    pub fn highlights(&self, text: &str) -> Vec<Highlight> {
        evaluator::highlights(&self.snapshot(), text)
    }
}

impl std::fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = self.snapshot();
        f.debug_struct("FilterStore")
            .field("name", &set.name())
            .field("message_rules", &set.message_rules().len())
            .field("process_rules", &set.process_rules().len())
            .field("stashed", &self.stashed_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsieve_types::{MatchType, Rgb, RuleKind};
    use std::thread;

    fn sample(name: &str, message: &[&str], process: &[&str]) -> RuleSet {
        RuleSet::from_defs(
            name,
            message
                .iter()
                .map(|p| RuleDef::message(RuleKind::Exclude, *p))
                .collect(),
            process
                .iter()
                .map(|p| RuleDef::process(RuleKind::Exclude, *p))
                .collect(),
        )
        .unwrap()
    }

    fn patterns(defs: Vec<RuleDef>) -> Vec<String> {
        defs.into_iter().map(|d| d.pattern).collect()
    }

    #[test]
    fn test_load_merges_additively() {
        let store = FilterStore::with_rule_set(sample("first", &["a", "b"], &["x.exe"]));
        let incoming = sample("second", &["b", "c", "d"], &["y.exe", "z.exe"]);
        let xml = persist::to_string(&incoming, Format::Xml).unwrap();

        store.load_str(&xml, Format::Xml).unwrap();

        assert_eq!(patterns(store.message_filters()), vec!["a", "b", "b", "c", "d"]);
        assert_eq!(
            patterns(store.process_filters()),
            vec!["x.exe", "y.exe", "z.exe"]
        );
        assert_eq!(store.name(), "second");
    }

    #[test]
    fn test_failed_load_leaves_store_unchanged() {
        let store = FilterStore::with_rule_set(sample("first", &["a"], &["x.exe"]));
        let before = store.snapshot();

        assert!(store.load_str("{ broken", Format::Json).is_err());
        assert!(store.load(Path::new("/definitely/not/here.xml")).is_err());

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_load_and_save_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");

        let store = FilterStore::with_rule_set(sample("saved", &["a"], &["x.exe"]));
        store.save(&path).unwrap();

        let other = FilterStore::new();
        other.load(&path).unwrap();
        other.load(&path).unwrap();
        assert_eq!(patterns(other.message_filters()), vec!["a", "a"]);
        assert_eq!(patterns(other.process_filters()), vec!["x.exe", "x.exe"]);
    }

    #[test]
    fn test_save_to_string_roundtrip() {
        let store = FilterStore::with_rule_set(sample("n", &["a"], &["x.exe"]));
        let saved = store.save_to_string(Format::Json).unwrap();

        let other = FilterStore::new();
        other.load_str(&saved, Format::Json).unwrap();
        assert_eq!(other.save_to_string(Format::Json).unwrap(), saved);
    }

    #[test]
    fn test_clear_and_name() {
        let store = FilterStore::with_rule_set(sample("n", &["a"], &["x.exe"]));
        store.set_name("renamed");
        store.clear();
        assert!(store.message_filters().is_empty());
        assert!(store.process_filters().is_empty());
        assert_eq!(store.name(), "renamed");
    }

    #[test]
    fn test_set_filters_validates_target() {
        let store = FilterStore::new();
        let before = store.snapshot();
        let result = store.set_process_filters(vec![RuleDef::message(RuleKind::Exclude, "a")]);
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &store.snapshot()));

        store
            .set_message_filters(vec![RuleDef::message(RuleKind::Exclude, "a")])
            .unwrap();
        assert_eq!(patterns(store.message_filters()), vec!["a"]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_updates() {
        let store = FilterStore::with_rule_set(sample("n", &["secret"], &[]));
        let held = store.snapshot();
        store.clear();

        let line = LogLine::new(1, "a.exe", "secret");
        assert!(!evaluator::evaluate(&held, &line).visible);
        assert!(store.evaluate(&line).visible);
    }

    #[test]
    fn test_sessions() {
        let store = FilterStore::with_rule_set(sample("one", &["a"], &[]));
        store.stash("one");
        store.replace(sample("two", &["b"], &[]));
        store.stash("two");

        assert_eq!(store.stashed_names(), vec!["one", "two"]);
        store.activate("one").unwrap();
        assert_eq!(store.name(), "one");
        assert!(matches!(
            store.activate("three"),
            Err(StoreError::UnknownSession(_))
        ));
        assert!(store.remove_stashed("two"));
        assert!(!store.remove_stashed("two"));
    }

    #[test]
    fn test_process_color_fallback() {
        let set = RuleSet::from_defs(
            "n",
            vec![RuleDef::message(RuleKind::Highlight, "ERROR").with_color(Rgb::RED)],
            vec![],
        )
        .unwrap();
        let store = FilterStore::with_rule_set(set);
        let mut colors = ProcessColors::new();
        colors.set_name("svc.exe", Rgb::WHITE);
        store.set_process_colors(colors);

        assert_eq!(
            store.evaluate(&LogLine::new(1, "svc.exe", "ERROR")).color,
            Some(Rgb::RED)
        );
        assert_eq!(
            store.evaluate(&LogLine::new(1, "svc.exe", "ok")).color,
            Some(Rgb::WHITE)
        );
        assert_eq!(store.evaluate(&LogLine::new(1, "other.exe", "ok")).color, None);
    }

    #[test]
    fn test_bad_regex_does_not_break_the_set() {
        let store = FilterStore::new();
        store
            .set_message_filters(vec![
                RuleDef::message(RuleKind::Exclude, "[").with_match_type(MatchType::Regex),
                RuleDef::message(RuleKind::Exclude, "drop"),
            ])
            .unwrap();
        assert!(store.evaluate(&LogLine::new(1, "a", "[ keep")).visible);
        assert!(!store.evaluate(&LogLine::new(1, "a", "drop me")).visible);
    }

    #[test]
    fn test_concurrent_readers_see_whole_sets() {
        // Every set either hides "x" in both lists or in neither
        let store = FilterStore::new();
        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    if i % 2 == 0 {
                        store.replace(sample("on", &["x"], &["p.exe"]));
                    } else {
                        store.replace(RuleSet::new("off"));
                    }
                }
            })
        };

        let line = LogLine::new(1, "p.exe", "x");
        for _ in 0..1000 {
            let set = store.snapshot();
            let hidden = !evaluator::evaluate(&set, &line).visible;
            assert_eq!(hidden, !set.is_empty());
            assert_eq!(set.message_rules().len(), set.process_rules().len());
        }
        writer.join().unwrap();
    }
}
