//! Parser for the legacy line-oriented rule file format (§6): one rule per
//! line, `#` comments, optional `[glob]` prefix scoping a rule to files
//! matching that glob.
//!
//! ```text
//! # deny fmt.Println outside tests
//! !fmt:Println
//! [*_test.go] +fmt:Println
//! net/http
//! internal/*
//! ```

use std::path::{Path, PathBuf};

use arch_unit_query::pattern::glob_match;

/// What a rule does when it wins the precedence walk for a call/import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// No leading marker: calls/imports to this pattern are permitted.
    Allow,
    /// Leading `!` (on the whole pattern or a single `pkg:!meth` segment):
    /// a match is a violation.
    Deny,
    /// Leading `+`: resolves (cancels) a denial inherited from an ancestor
    /// scope.
    Override,
}

/// One parsed rule, plus the directory it came from (for precedence
/// ordering) and the file it was read from (for violation messages).
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub action: RuleAction,
    /// The pattern with action markers stripped, e.g. `"fmt:Println"` or
    /// `"internal/*"`.
    pub pattern: String,
    /// `Some(glob)` for a `[glob] rule` line — the rule only applies to
    /// source files whose path matches this glob.
    pub file_glob: Option<String>,
    /// Directory this rule file lives in, used to order entries
    /// innermost-to-outward relative to the file being checked.
    pub scope_dir: PathBuf,
    /// The rule file this entry was read from, for diagnostics.
    pub source_file: PathBuf,
    /// The original line text, used to render the decisive rule in
    /// violation messages.
    pub raw: String,
}

impl RuleEntry {
    /// Split `pattern` into its call-matching components: `(package-glob,
    /// method-glob)`. A pattern with no `:` has no method component — it
    /// matches the whole package (any method) for calls, or is used whole
    /// for import matching.
    fn call_parts(&self) -> (&str, Option<&str>) {
        match self.pattern.split_once(':') {
            Some((pkg, meth)) => (pkg, Some(meth)),
            None => (self.pattern.as_str(), None),
        }
    }

    /// True iff this rule's pattern matches a call to `package`/`method`
    /// (method may be absent for free functions without a type).
    pub fn matches_call(&self, package: Option<&str>, method: Option<&str>) -> bool {
        let (pkg_glob, meth_glob) = self.call_parts();
        let pkg_hit = package.map(|p| glob_match(pkg_glob, p)).unwrap_or(pkg_glob == "*");
        if !pkg_hit {
            return false;
        }
        match meth_glob {
            None => true,
            Some(g) => method.map(|m| glob_match(g, m)).unwrap_or(false),
        }
    }

    /// True iff this rule's pattern matches an import path. A pattern ending
    /// in `/` denotes a subtree: it matches the path itself and anything
    /// nested under it.
    pub fn matches_import(&self, import_path: &str) -> bool {
        if let Some(prefix) = self.pattern.strip_suffix('/') {
            return import_path == prefix || import_path.starts_with(&self.pattern);
        }
        glob_match(&self.pattern, import_path)
    }

    /// True iff `file_path` (relative to the scan root) falls inside this
    /// entry's file-glob scope, or the entry is unscoped.
    pub fn applies_to_file(&self, file_path: &str) -> bool {
        match &self.file_glob {
            None => true,
            Some(glob) => {
                let basename = Path::new(file_path)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(file_path);
                glob_match(glob, basename) || glob_match(glob, file_path)
            }
        }
    }
}

/// Parse one rule file's contents. Blank lines and `#`-prefixed comments
/// are skipped. Never fails — a line that doesn't parse to anything
/// meaningful is simply dropped, matching the teacher convention of warning
/// rather than hard-failing on a single malformed config line.
pub fn parse_rule_file(path: &Path, scope_dir: &Path, contents: &str) -> Vec<RuleEntry> {
    contents
        .lines()
        .filter_map(|line| parse_line(line, path, scope_dir))
        .collect()
}

fn parse_line(line: &str, source_file: &Path, scope_dir: &Path) -> Option<RuleEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let raw = trimmed.to_string();

    let (file_glob, rest) = if let Some(stripped) = trimmed.strip_prefix('[') {
        let close = stripped.find(']')?;
        let glob = stripped[..close].trim().to_string();
        let rest = stripped[close + 1..].trim();
        (Some(glob), rest)
    } else {
        (None, trimmed)
    };

    if rest.is_empty() {
        return None;
    }

    let (action, rest) = match rest.strip_prefix('!') {
        Some(r) => (RuleAction::Deny, r),
        None => match rest.strip_prefix('+') {
            Some(r) => (RuleAction::Override, r),
            None => (RuleAction::Allow, rest),
        },
    };

    // A bang embedded before a segment (`pkg:!meth`) also denies, even when
    // the line has no leading marker.
    let (action, pattern) = if action == RuleAction::Allow && rest.contains(":!") {
        (RuleAction::Deny, rest.replacen(":!", ":", 1))
    } else {
        (action, rest.to_string())
    };

    Some(RuleEntry {
        action,
        pattern,
        file_glob,
        scope_dir: scope_dir.to_path_buf(),
        source_file: source_file.to_path_buf(),
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(text: &str) -> Vec<RuleEntry> {
        parse_rule_file(Path::new(".ARCHUNIT"), Path::new("."), text)
    }

    #[test]
    fn parses_plain_deny() {
        let e = entries("!fmt:Println");
        assert_eq!(e.len(), 1);
        assert_eq!(e[0].action, RuleAction::Deny);
        assert_eq!(e[0].pattern, "fmt:Println");
    }

    #[test]
    fn parses_embedded_bang_as_deny() {
        let e = entries("fmt:!Println");
        assert_eq!(e[0].action, RuleAction::Deny);
        assert_eq!(e[0].pattern, "fmt:Println");
    }

    #[test]
    fn parses_override() {
        let e = entries("+fmt:Println");
        assert_eq!(e[0].action, RuleAction::Override);
    }

    #[test]
    fn parses_file_scoped_rule() {
        let e = entries("[*_test.go] +fmt:Println");
        assert_eq!(e[0].file_glob.as_deref(), Some("*_test.go"));
        assert_eq!(e[0].action, RuleAction::Override);
        assert_eq!(e[0].pattern, "fmt:Println");
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let e = entries("# comment\n\n!fmt:Println\n");
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn matches_call_wildcard_package() {
        let e = entries("*:Println");
        assert!(e[0].matches_call(Some("fmt"), Some("Println")));
        assert!(e[0].matches_call(Some("os"), Some("Println")));
    }

    #[test]
    fn matches_import_subtree() {
        let e = entries("internal/");
        assert!(e[0].matches_import("internal/"));
        assert!(e[0].matches_import("internal/foo"));
        assert!(!e[0].matches_import("external/foo"));
    }

    #[test]
    fn file_scope_matches_basename() {
        let e = entries("[*_test.go] !fmt:Println");
        assert!(e[0].applies_to_file("pkg/foo_test.go"));
        assert!(!e[0].applies_to_file("pkg/foo.go"));
    }
}
