use std::collections::HashMap;

use logsieve_types::{HIGHLIGHT_COLORS, LogLine, Rgb};

/// First palette entry handed out by [`ProcessColors::assign`]; the ones
/// before it are greys.
const FIRST_ASSIGNABLE: usize = 5;

/// Colors the presentation layer gives to processes, by pid or by name
#[derive(Clone, Debug, Default)]
pub struct ProcessColors {
    by_pid: HashMap<u32, Rgb>,

    /// Keyed by lowercased process name
    by_name: HashMap<String, Rgb>,

    /// Next palette slot for automatic assignment
    next: usize,
}

impl ProcessColors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pid(&mut self, pid: u32, color: Rgb) {
        self.by_pid.insert(pid, color);
    }

    pub fn set_name(&mut self, process_name: &str, color: Rgb) {
        self.by_name.insert(process_name.to_lowercase(), color);
    }

    pub fn remove_pid(&mut self, pid: u32) -> Option<Rgb> {
        self.by_pid.remove(&pid)
    }

    pub fn remove_name(&mut self, process_name: &str) -> Option<Rgb> {
        self.by_name.remove(&process_name.to_lowercase())
    }

    /// Give a process name the next palette color, or return the one it has
    pub fn assign(&mut self, process_name: &str) -> Rgb {
        let key = process_name.to_lowercase();
        if let Some(color) = self.by_name.get(&key) {
            return *color;
        }

        let assignable = &HIGHLIGHT_COLORS[FIRST_ASSIGNABLE..HIGHLIGHT_COLORS.len() - 1];
        let color = assignable[self.next % assignable.len()];
        self.next += 1;
        self.by_name.insert(key, color);
        color
    }

    /// Color for a line's process; a pid entry wins over a name entry
    pub fn color_for(&self, line: &LogLine) -> Option<Rgb> {
        if let Some(color) = self.by_pid.get(&line.pid) {
            return Some(*color);
        }
        if self.by_name.is_empty() {
            return None;
        }
        self.by_name.get(&line.process_name.to_lowercase()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pid.is_empty() && self.by_name.is_empty()
    }
}
