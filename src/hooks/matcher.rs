//! Tool-name matcher
//!
//! A matcher string is a `|`-separated list of shell-glob patterns, e.g.
//! `"Write|Edit"` or `"mcp__*"`. A tool matches when its full name matches
//! any of the patterns.

use std::fmt;

use glob::Pattern;

/// One `|`-separated alternative
#[derive(Clone)]
enum SubPattern {
    Glob(Pattern),
    /// Not a valid glob; compared verbatim
    Literal(String),
}

impl SubPattern {
    fn matches(&self, tool_name: &str) -> bool {
        match self {
            SubPattern::Glob(pattern) => pattern.matches(tool_name),
            SubPattern::Literal(literal) => literal == tool_name,
        }
    }

    fn as_str(&self) -> &str {
        match self {
            SubPattern::Glob(pattern) => pattern.as_str(),
            SubPattern::Literal(literal) => literal,
        }
    }
}

/// Compiled OR-of-globs tool-name filter
#[derive(Clone)]
pub struct ToolMatcher {
    source: String,
    patterns: Vec<SubPattern>,
}

impl ToolMatcher {
    /// Compile a matcher string
    ///
    /// Examples:
    /// - `"*"` or `""` - match every tool
    /// - `"Bash"` - match only Bash
    /// - `"Read|Write|Edit"` - match file tools
    /// - `"mcp__*"` - match all MCP tools
    pub fn new(matcher: &str) -> Self {
        let mut parts: Vec<&str> = matcher
            .split('|')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            parts.push("*");
        }

        let patterns = parts
            .into_iter()
            .map(|part| match Pattern::new(part) {
                Ok(pattern) => SubPattern::Glob(pattern),
                Err(e) => {
                    tracing::warn!(
                        "[ToolMatcher] Invalid glob '{}' ({}), matching literally",
                        part,
                        e
                    );
                    SubPattern::Literal(part.to_string())
                }
            })
            .collect();

        Self {
            source: matcher.to_string(),
            patterns,
        }
    }

    /// Matcher that accepts every tool
    pub fn any() -> Self {
        Self::new("*")
    }

    /// Check if a tool name matches any sub-pattern
    pub fn matches(&self, tool_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(tool_name))
    }

    /// The matcher string this was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled sub-patterns
    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(SubPattern::as_str).collect()
    }
}

impl Default for ToolMatcher {
    fn default() -> Self {
        Self::any()
    }
}

impl From<&str> for ToolMatcher {
    fn from(matcher: &str) -> Self {
        Self::new(matcher)
    }
}

impl fmt::Debug for ToolMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolMatcher")
            .field("patterns", &self.patterns())
            .finish()
    }
}
