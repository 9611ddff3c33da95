//! Pattern grammar: `[language:][path-clause]name-parts`, compiled to a SQL
//! predicate over the `ast_nodes` view.
//!
//! Grammar:
//! ```text
//! pattern     := [language ":"] [path-clause] name-parts
//! language    := "go" | "python" | "js" | "ts" | "sql" | "openapi"
//! path-clause := "@" glob | "path(" glob ")"
//! name-parts  := seg (":" seg){0,3}
//! seg         := "" | "*" | glob-ident
//! ```
//! A trailing `!` on a segment inverts that segment's match (deny). Omitted
//! trailing segments wildcard-match; an explicitly empty segment (`foo::bar`)
//! means "this position is absent" rather than "anything here" — the only
//! way to target a `Function` node's name without constraining `type_name`,
//! since `type_name IS NULL` and `type_name = anything` are different
//! predicates. `*` alone matches every node.

use arch_unit_core::types::{Language, NodeKind};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,
    #[error("unknown language prefix `{0}`")]
    UnknownLanguage(String),
    #[error("unterminated path(...) clause")]
    UnterminatedPath,
    #[error("too many name segments (max 4: package:type:method:field)")]
    TooManySegments,
}

/// One `pkg`/`type`/`method`/`field` segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Position omitted entirely (trailing) or `*`: matches anything,
    /// including absence.
    Wildcard,
    /// Position given as `""` explicitly: matches only `NULL` (absent).
    Absent,
    /// A glob-style literal (`*` and `?` wildcards within an identifier),
    /// optionally negated with a trailing `!`.
    Literal { glob: String, negate: bool },
}

/// A compiled-from-text pattern: which nodes it selects.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub language: Option<Language>,
    pub path_glob: Option<String>,
    /// 0..=4 segments, in `package, type, method, field` order. Missing
    /// trailing segments are absent from this vec (treated as `Wildcard`).
    pub segments: Vec<Segment>,
}

fn map_language_prefix(s: &str) -> Option<Language> {
    Some(match s {
        "go" => Language::Go,
        "python" => Language::Python,
        "js" | "javascript" => Language::Javascript,
        "ts" | "typescript" => Language::Typescript,
        "sql" => Language::Sql,
        "openapi" => Language::Openapi,
        "markdown" | "md" => Language::Markdown,
        _ => return None,
    })
}

impl Pattern {
    /// Parse a pattern string. `*` alone matches every node.
    pub fn parse(input: &str) -> Result<Self, PatternError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PatternError::Empty);
        }
        if input == "*" {
            return Ok(Pattern { language: None, path_glob: None, segments: Vec::new() });
        }

        let mut rest = input;

        let language = if let Some(colon_idx) = rest.find(':') {
            let candidate = &rest[..colon_idx];
            if let Some(lang) = map_language_prefix(candidate) {
                rest = &rest[colon_idx + 1..];
                Some(lang)
            } else if KNOWN_LANGUAGE_WORDS.contains(&candidate) {
                return Err(PatternError::UnknownLanguage(candidate.to_string()));
            } else {
                None
            }
        } else {
            None
        };

        let (path_glob, rest) = parse_path_clause(rest)?;

        let segments = parse_name_parts(rest)?;

        Ok(Pattern { language, path_glob, segments })
    }

    /// Compile to a `(predicate_sql, bind_params)` pair suitable for
    /// [`arch_unit_core::store::AstCache::query_raw`]. `cwd_prefix`, when
    /// given, restricts matches to files under that prefix (the default
    /// scope unless a pattern is run with an explicit global flag).
    pub fn compile(&self, cwd_prefix: Option<&str>) -> CompiledPattern {
        let mut clauses = Vec::new();
        let mut params: Vec<Param> = Vec::new();

        if let Some(lang) = self.language {
            clauses.push("language = ?".to_string());
            params.push(Param::Text(lang.as_str().to_string()));
        }

        if let Some(glob) = &self.path_glob {
            clauses.push("file_path GLOB ?".to_string());
            params.push(Param::Text(glob.clone()));
        }

        const COLUMNS: [&str; 4] = ["package_name", "type_name", "method_name", "field_name"];
        for (col, seg) in COLUMNS.iter().zip(self.segments.iter()) {
            match seg {
                Segment::Wildcard => {}
                Segment::Absent => clauses.push(format!("{col} IS NULL")),
                Segment::Literal { glob, negate } => {
                    let op = if *negate { "NOT GLOB" } else { "GLOB" };
                    clauses.push(format!("{col} {op} ?"));
                    params.push(Param::Text(glob.clone()));
                }
            }
        }

        if let Some(prefix) = cwd_prefix {
            clauses.push("file_path GLOB ?".to_string());
            params.push(Param::Text(format!("{}*", prefix.trim_end_matches('/'))));
        }

        let predicate_sql = if clauses.is_empty() { "1 = 1".to_string() } else { clauses.join(" AND ") };

        CompiledPattern { predicate_sql, params }
    }

    /// True iff this pattern, applied to in-memory fields (no DB involved),
    /// matches. Used by AQL evaluation once nodes are already fetched, and
    /// by tests that don't stand up a cache.
    pub fn matches_fields(
        &self,
        language: Language,
        file_path: &str,
        package: Option<&str>,
        type_name: Option<&str>,
        method: Option<&str>,
        field: Option<&str>,
    ) -> bool {
        if let Some(want) = self.language {
            if want != language {
                return false;
            }
        }
        if let Some(glob) = &self.path_glob {
            if !glob_match(glob, file_path) {
                return false;
            }
        }
        let fields = [package, type_name, method, field];
        for (seg, value) in self.segments.iter().zip(fields.iter()) {
            match seg {
                Segment::Wildcard => {}
                Segment::Absent => {
                    if value.is_some() {
                        return false;
                    }
                }
                Segment::Literal { glob, negate } => {
                    let hit = value.map(|v| glob_match(glob, v)).unwrap_or(false);
                    if hit == *negate {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Convenience: match against an already-fetched node.
    pub fn matches_node(&self, node: &arch_unit_core::types::AstNode) -> bool {
        self.matches_fields(
            node.language,
            &node.file_path,
            node.package.as_deref(),
            node.type_name.as_deref(),
            node.method.as_deref(),
            node.field.as_deref(),
        )
    }

    /// A pattern targets a node kind when the extraction layer's own
    /// node-shape convention applies: an explicit-absence type segment
    /// together with a present method segment can only select `Function`
    /// nodes, never `Method`. Returns `None` when the pattern doesn't
    /// constrain kind.
    pub fn implied_kind(&self) -> Option<NodeKind> {
        if self.segments.len() >= 3 && self.segments[1] == Segment::Absent {
            return Some(NodeKind::Function);
        }
        None
    }
}

const KNOWN_LANGUAGE_WORDS: &[&str] =
    &["go", "python", "js", "javascript", "ts", "typescript", "sql", "openapi", "markdown", "md"];

fn parse_path_clause(input: &str) -> Result<(Option<String>, &str), PatternError> {
    if let Some(stripped) = input.strip_prefix('@') {
        let end = stripped.find(':').unwrap_or(stripped.len());
        let glob = stripped[..end].to_string();
        let rest = stripped[end..].strip_prefix(':').unwrap_or(&stripped[end..]);
        return Ok((Some(glob), rest));
    }
    if let Some(stripped) = input.strip_prefix("path(") {
        let close = stripped.find(')').ok_or(PatternError::UnterminatedPath)?;
        let glob = stripped[..close].to_string();
        let rest = &stripped[close + 1..];
        let rest = rest.strip_prefix(':').unwrap_or(rest);
        return Ok((Some(glob), rest));
    }
    Ok((None, input))
}

fn parse_name_parts(input: &str) -> Result<Vec<Segment>, PatternError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() > 4 {
        return Err(PatternError::TooManySegments);
    }
    Ok(parts.into_iter().map(parse_segment).collect())
}

fn parse_segment(raw: &str) -> Segment {
    if raw.is_empty() {
        return Segment::Absent;
    }
    if raw == "*" {
        return Segment::Wildcard;
    }
    let (body, negate) = match raw.strip_suffix('!') {
        Some(b) => (b, true),
        None => (raw, false),
    };
    Segment::Literal { glob: body.to_string(), negate }
}

/// A pattern in its SQL-ready form.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub predicate_sql: String,
    pub params: Vec<Param>,
}

impl CompiledPattern {
    /// Bind params in the form [`arch_unit_core::store::AstCache::query_raw`]
    /// expects.
    pub fn param_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p as &dyn rusqlite::ToSql).collect()
    }
}

/// Owned parameter value bound positionally into `predicate_sql`.
#[derive(Debug, Clone)]
pub enum Param {
    Text(String),
}

impl rusqlite::ToSql for Param {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            Param::Text(s) => s.to_sql(),
        }
    }
}

/// Shell-glob style matcher (`*` = any run, `?` = one char), anchored at
/// both ends. Used for in-memory evaluation; SQL's `GLOB` operator uses the
/// identical syntax so compiled predicates agree with this.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    glob_match_bytes(pattern.as_bytes(), text.as_bytes())
}

fn glob_match_bytes(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(b'*'), _) => {
            glob_match_bytes(&pattern[1..], text)
                || (!text.is_empty() && glob_match_bytes(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match_bytes(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match_bytes(&pattern[1..], &text[1..]),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_wildcard() {
        let p = Pattern::parse("*").unwrap();
        assert_eq!(p.language, None);
        assert!(p.segments.is_empty());
    }

    #[test]
    fn parses_language_prefixed_name() {
        let p = Pattern::parse("go:myservice:Handler").unwrap();
        assert_eq!(p.language, Some(Language::Go));
        assert_eq!(
            p.segments,
            vec![
                Segment::Literal { glob: "myservice".into(), negate: false },
                Segment::Literal { glob: "Handler".into(), negate: false },
            ]
        );
    }

    #[test]
    fn parses_at_path_clause() {
        let p = Pattern::parse("@internal/**:pkg:Type").unwrap();
        assert_eq!(p.path_glob.as_deref(), Some("internal/**"));
        assert_eq!(p.segments.len(), 2);
    }

    #[test]
    fn parses_path_function_clause() {
        let p = Pattern::parse("path(cmd/**):main").unwrap();
        assert_eq!(p.path_glob.as_deref(), Some("cmd/**"));
        assert_eq!(p.segments, vec![Segment::Literal { glob: "main".into(), negate: false }]);
    }

    #[test]
    fn empty_segment_means_absent() {
        let p = Pattern::parse("foo::bar").unwrap();
        assert_eq!(
            p.segments,
            vec![
                Segment::Literal { glob: "foo".into(), negate: false },
                Segment::Absent,
                Segment::Literal { glob: "bar".into(), negate: false },
            ]
        );
    }

    #[test]
    fn trailing_bang_negates_segment() {
        let p = Pattern::parse("foo:Bar!").unwrap();
        assert_eq!(
            p.segments[1],
            Segment::Literal { glob: "Bar".into(), negate: true }
        );
    }

    #[test]
    fn too_many_segments_errors() {
        assert_eq!(
            Pattern::parse("a:b:c:d:e").unwrap_err(),
            PatternError::TooManySegments
        );
    }

    #[test]
    fn unterminated_path_errors() {
        assert_eq!(
            Pattern::parse("path(foo:bar").unwrap_err(),
            PatternError::UnterminatedPath
        );
    }

    #[test]
    fn matches_fields_respects_absent_vs_wildcard() {
        let explicit_absent = Pattern::parse("foo::bar").unwrap();
        assert!(explicit_absent.matches_fields(
            Language::Go,
            "a.go",
            Some("foo"),
            None,
            Some("bar"),
            None,
        ));
        assert!(!explicit_absent.matches_fields(
            Language::Go,
            "a.go",
            Some("foo"),
            Some("SomeType"),
            Some("bar"),
            None,
        ));

        let trailing_wildcard = Pattern::parse("foo:bar").unwrap();
        assert!(trailing_wildcard.matches_fields(
            Language::Go,
            "a.go",
            Some("foo"),
            Some("bar"),
            Some("anything"),
            None,
        ));
    }

    #[test]
    fn glob_match_supports_star_and_question() {
        assert!(glob_match("*Service", "UserService"));
        assert!(glob_match("Get?ser", "GetUser"));
        assert!(!glob_match("Get?ser", "GetUsers"));
        assert!(!glob_match("Foo", "Foobar"));
    }

    #[test]
    fn implied_kind_detects_function_shape() {
        let p = Pattern::parse("pkg::handler").unwrap();
        assert_eq!(p.implied_kind(), Some(NodeKind::Function));

        let p = Pattern::parse("pkg:Type:method").unwrap();
        assert_eq!(p.implied_kind(), None);
    }
}
