use regex::Regex;

use logsieve_types::MatchType;

use crate::error::PatternError;

/// Compiled form of a rule pattern
#[derive(Clone)]
enum Compiled {
    /// Case-sensitive substring, checked without the regex engine
    Literal(String),

    /// Everything else goes through a regex
    Regex(Regex),
}

/// Reusable matcher for one rule pattern
#[derive(Clone)]
pub struct Matcher {
    compiled: Compiled,

    /// Original pattern string
    pattern: String,

    match_type: MatchType,

    case_sensitive: bool,
}

impl Matcher {
    /// Compile a pattern once so it can be tested against many lines
    pub fn compile(
        pattern: &str,
        match_type: MatchType,
        case_sensitive: bool,
    ) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::new(pattern, "pattern is empty"));
        }

        let compiled = match match_type {
            MatchType::Substring if case_sensitive => Compiled::Literal(pattern.to_string()),
            MatchType::Substring => Compiled::Regex(build_regex(
                pattern,
                &regex::escape(pattern),
                case_sensitive,
            )?),
            MatchType::Wildcard => Compiled::Regex(build_regex(
                pattern,
                &wildcard_to_regex(pattern),
                case_sensitive,
            )?),
            MatchType::Regex => Compiled::Regex(build_regex(pattern, pattern, case_sensitive)?),
        };

        Ok(Self {
            compiled,
            pattern: pattern.to_string(),
            match_type,
            case_sensitive,
        })
    }

    /// Check whether the text matches
    pub fn is_match(&self, text: &str) -> bool {
        match &self.compiled {
            Compiled::Literal(literal) => text.contains(literal.as_str()),
            Compiled::Regex(re) => re.is_match(text),
        }
    }

    /// Find all non-empty match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.compiled {
            Compiled::Literal(literal) => text
                .match_indices(literal.as_str())
                .map(|(start, m)| (start, start + m.len()))
                .collect(),
            Compiled::Regex(re) => re
                .find_iter(text)
                .filter(|m| !m.is_empty())
                .map(|m| (m.start(), m.end()))
                .collect(),
        }
    }

    /// Get the original pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("pattern", &self.pattern)
            .field("match_type", &self.match_type)
            .field("case_sensitive", &self.case_sensitive)
            .finish()
    }
}

fn build_regex(original: &str, expr: &str, case_sensitive: bool) -> Result<Regex, PatternError> {
    let result = if case_sensitive {
        Regex::new(expr)
    } else {
        // Prepend (?i) for case insensitive matching
        Regex::new(&format!("(?i){}", expr))
    };
    result.map_err(|e| PatternError::new(original, e.to_string()))
}

/// Translate a `*`/`?` glob into a regex anchored to the whole string
fn wildcard_to_regex(pattern: &str) -> String {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push_str("(?s)\\A");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            _ => expr.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    expr.push_str("\\z");
    expr
}
