/// RouteMatcher
///
/// The set of path patterns the gate inspects. Anything that does not match bypasses the gate
/// entirely. Patterns follow the routing layer's matcher grammar:
///
/// - `/account/settings` matches that exact path.
/// - `/admin/:path*` matches `/admin` and every path below it.
/// - `/docs*` matches any path starting with `/docs`.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatcher {
    patterns: Vec<Pattern>,
}

#[derive(Debug, Clone, PartialEq)]
enum Pattern {
    Exact(String),
    Subtree(String),
    Prefix(String),
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        if let Some(base) = raw.strip_suffix("/:path*") {
            Pattern::Subtree(base.to_string())
        } else if let Some(prefix) = raw.strip_suffix('*') {
            Pattern::Prefix(prefix.to_string())
        } else {
            Pattern::Exact(raw.to_string())
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Pattern::Exact(exact) => path == exact,
            Pattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Pattern::Subtree(base) => path
                .strip_prefix(base.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

impl RouteMatcher {
    /// Parses a comma-separated pattern list; blank entries are ignored.
    pub fn parse(raw: &str) -> Self {
        let patterns = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Pattern::parse)
            .collect();
        Self { patterns }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
