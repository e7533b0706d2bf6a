use std::io::{self, Write};

use colored::Colorize;
use logsieve_filter::{Decision, EvalStats, LogLine};

/// Counters for the end-of-stream summary
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub lines: u64,
    pub visible: u64,
    pub tracked: u64,
    pub rules_tested: u64,
}

impl Stats {
    pub fn record(&mut self, decision: &Decision, eval: EvalStats) {
        self.lines += 1;
        if decision.visible {
            self.visible += 1;
        }
        if decision.tracked {
            self.tracked += 1;
        }
        self.rules_tested += eval.rules_tested as u64;
    }

    pub fn hidden(&self) -> u64 {
        self.lines - self.visible
    }

    pub fn summary(&self) -> String {
        format!(
            "{} lines, {} shown, {} hidden, {} tracked, {} rule tests",
            self.lines,
            self.visible,
            self.hidden(),
            self.tracked,
            self.rules_tested
        )
    }
}

/// Writes kept lines to the sink
pub struct Printer {
    color: bool,
    only_tracked: bool,
}

impl Printer {
    pub fn new(color: bool, only_tracked: bool) -> Self {
        Self {
            color,
            only_tracked,
        }
    }

    /// Write the line if the decision keeps it
    pub fn print<W: Write>(&self, out: &mut W, line: &LogLine, decision: &Decision) -> io::Result<()> {
        if !decision.visible || (self.only_tracked && !decision.tracked) {
            return Ok(());
        }

        let marker = if decision.tracked { "*" } else { " " };
        let text = format!(
            "{}{}\t{}\t{}",
            marker, line.pid, line.process_name, line.message
        );
        // colored decides whether the sink gets escape codes (tty, NO_COLOR)
        match decision.color.filter(|_| self.color) {
            Some(c) => writeln!(out, "{}", text.truecolor(c.r, c.g, c.b)),
            None => writeln!(out, "{}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsieve_filter::Rgb;

    fn render(printer: &Printer, decision: Decision) -> String {
        let mut out = Vec::new();
        let line = LogLine::new(7, "svc.exe", "disk full");
        printer.print(&mut out, &line, &decision).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_hidden_lines_print_nothing() {
        let printer = Printer::new(true, false);
        let decision = Decision {
            visible: false,
            ..Decision::default()
        };
        assert_eq!(render(&printer, decision), "");
    }

    #[test]
    fn test_plain_output() {
        let decision = Decision {
            visible: true,
            color: Some(Rgb::new(255, 0, 0)),
            tracked: true,
        };
        assert_eq!(
            render(&Printer::new(false, false), decision),
            "*7\tsvc.exe\tdisk full\n"
        );
    }

    #[test]
    fn test_colored_output() {
        let decision = Decision {
            visible: true,
            color: Some(Rgb::new(255, 0, 0)),
            tracked: false,
        };

        let printer = Printer::new(true, false);
        colored::control::set_override(false);
        let plain = render(&printer, decision);
        colored::control::set_override(true);
        let styled = render(&printer, decision);
        colored::control::unset_override();

        assert_eq!(plain, " 7\tsvc.exe\tdisk full\n");
        assert!(styled.starts_with("\x1b["));
        assert!(styled.contains(" 7\tsvc.exe\tdisk full"));
        assert!(styled.ends_with("\x1b[0m\n"));
    }

    #[test]
    fn test_only_tracked() {
        let printer = Printer::new(false, true);
        assert_eq!(render(&printer, Decision::default()), "");
    }

    #[test]
    fn test_stats() {
        let mut stats = Stats::default();
        stats.record(&Decision::default(), EvalStats { rules_tested: 3 });
        stats.record(
            &Decision {
                visible: false,
                color: None,
                tracked: true,
            },
            EvalStats { rules_tested: 1 },
        );
        assert_eq!(stats.hidden(), 1);
        assert_eq!(
            stats.summary(),
            "2 lines, 1 shown, 1 hidden, 1 tracked, 4 rule tests"
        );
    }
}
