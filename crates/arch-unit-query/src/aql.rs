//! AQL: a small rule document language built on top of [`crate::pattern`].
//!
//! ```text
//! RULE "no orm calls from handlers" {
//!     FORBID(go:handlers::*Query*)
//!     LIMIT(cyclomatic(*Service*) > 10)
//!     LIMIT(lines(*) > 500)
//! }
//! ```
//!
//! `FORBID(pattern)` makes every node the pattern selects a violation.
//! `LIMIT(metric(pattern) op value)` evaluates `metric` against every node
//! the pattern selects and flags the ones that satisfy the comparison.
//! Clauses within a rule, and rules within a document, are independent —
//! no clause short-circuits another.

use arch_unit_core::store::AstCache;
use arch_unit_core::types::{EdgeDirection, RelationshipKind};
use arch_unit_core::violations::Violation;

use crate::pattern::{Pattern, PatternError};

#[derive(Debug, thiserror::Error)]
pub enum AqlError {
    #[error("{0}")]
    Syntax(String),
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Lines,
    Cyclomatic,
    Parameters,
    Returns,
    Len,
    Imports,
    Calls,
}

impl Metric {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "lines" => Metric::Lines,
            "cyclomatic" => Metric::Cyclomatic,
            "parameters" | "params" => Metric::Parameters,
            "returns" => Metric::Returns,
            "len" => Metric::Len,
            "imports" => Metric::Imports,
            "calls" => Metric::Calls,
            _ => return None,
        })
    }

    fn value(&self, node: &arch_unit_core::types::AstNode, cache: &dyn AstCache) -> f64 {
        match self {
            Metric::Lines => node.line_count as f64,
            Metric::Cyclomatic => node.cyclomatic_complexity as f64,
            Metric::Parameters => node.parameter_count as f64,
            Metric::Returns => node.return_count as f64,
            Metric::Len => leaf_name(node).len() as f64,
            Metric::Imports => cache
                .get_relationships_by_kind(node.id, RelationshipKind::Import, EdgeDirection::Outgoing)
                .len() as f64,
            Metric::Calls => cache
                .get_relationships_by_kind(node.id, RelationshipKind::Call, EdgeDirection::Outgoing)
                .len() as f64,
        }
    }
}

fn leaf_name(node: &arch_unit_core::types::AstNode) -> &str {
    node.method
        .as_deref()
        .or(node.field.as_deref())
        .or(node.type_name.as_deref())
        .or(node.package.as_deref())
        .unwrap_or("")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Op {
    fn apply(&self, value: f64, threshold: f64) -> bool {
        match self {
            Op::Lt => value < threshold,
            Op::Le => value <= threshold,
            Op::Eq => value == threshold,
            Op::Ne => value != threshold,
            Op::Ge => value >= threshold,
            Op::Gt => value > threshold,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Ge => ">=",
            Op::Gt => ">",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Clause {
    Forbid { pattern: Pattern, pattern_text: String },
    Limit { metric: Metric, pattern: Pattern, pattern_text: String, op: Op, value: f64 },
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleDocument {
    pub rules: Vec<Rule>,
}

impl RuleDocument {
    pub fn parse(text: &str) -> Result<Self, AqlError> {
        let mut rules = Vec::new();
        let mut tokens = Tokens::new(text);

        loop {
            tokens.skip_trivia();
            if tokens.is_empty() {
                break;
            }
            tokens.expect_word("RULE")?;
            tokens.skip_trivia();
            let name = tokens.expect_quoted_string()?;
            tokens.skip_trivia();
            tokens.expect_char('{')?;
            let mut clauses = Vec::new();
            loop {
                tokens.skip_trivia();
                if tokens.peek_char() == Some('}') {
                    tokens.next_char();
                    break;
                }
                if tokens.is_empty() {
                    return Err(AqlError::Syntax(format!("unterminated rule `{name}`")));
                }
                clauses.push(parse_clause(&mut tokens)?);
            }
            rules.push(Rule { name, clauses });
        }

        Ok(RuleDocument { rules })
    }

    /// Evaluate every rule's every clause against `cache`. `cwd_prefix`
    /// scopes pattern matches the same way [`Pattern::compile`] does.
    pub fn evaluate(&self, cache: &dyn AstCache, cwd_prefix: Option<&str>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            for clause in &rule.clauses {
                match clause {
                    Clause::Forbid { pattern, pattern_text } => {
                        for node in select_nodes(pattern, cache, cwd_prefix) {
                            violations.push(Violation {
                                id: 0,
                                file_path: node.file_path.clone(),
                                line: node.start_line,
                                column: 1,
                                source: "arch-unit".to_string(),
                                rule_id: Some(rule.name.clone()),
                                message: format!(
                                    "`{}` matches forbidden pattern `{}`",
                                    node.qualified_name(),
                                    pattern_text
                                ),
                                // Reserved for the call/import rule engine, which
                                // knows the specific call site's target; AQL
                                // violations describe a declaration, not a call.
                                called_package: None,
                                called_method: None,
                                fixable: false,
                                fix_applicability: None,
                                created_at: chrono::Utc::now(),
                            });
                        }
                    }
                    Clause::Limit { metric, pattern, pattern_text, op, value } => {
                        for node in select_nodes(pattern, cache, cwd_prefix) {
                            let measured = metric.value(&node, cache);
                            if op.apply(measured, *value) {
                                violations.push(Violation {
                                    id: 0,
                                    file_path: node.file_path.clone(),
                                    line: node.start_line,
                                    column: 1,
                                    source: "arch-unit".to_string(),
                                    rule_id: Some(rule.name.clone()),
                                    message: format!(
                                        "`{}` metric on `{}` is {measured} (limit {} {value})",
                                        metric_name(*metric),
                                        pattern_text,
                                        op.as_str()
                                    ),
                                    called_package: None,
                                    called_method: None,
                                    fixable: false,
                                    fix_applicability: None,
                                    created_at: chrono::Utc::now(),
                                });
                            }
                        }
                    }
                }
            }
        }
        violations
    }
}

fn metric_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Lines => "lines",
        Metric::Cyclomatic => "cyclomatic",
        Metric::Parameters => "parameters",
        Metric::Returns => "returns",
        Metric::Len => "len",
        Metric::Imports => "imports",
        Metric::Calls => "calls",
    }
}

fn select_nodes(
    pattern: &Pattern,
    cache: &dyn AstCache,
    cwd_prefix: Option<&str>,
) -> Vec<arch_unit_core::types::AstNode> {
    let compiled = pattern.compile(cwd_prefix);
    cache
        .query_raw(&compiled.predicate_sql, compiled.param_refs().as_slice())
        .unwrap_or_default()
}

fn parse_clause(tokens: &mut Tokens) -> Result<Clause, AqlError> {
    tokens.skip_trivia();
    let keyword = tokens.take_word();
    tokens.skip_trivia();
    tokens.expect_char('(')?;

    match keyword.as_str() {
        "FORBID" => {
            let inner = tokens.take_balanced_parens()?;
            tokens.expect_char(')')?;
            let pattern = Pattern::parse(inner.trim())?;
            Ok(Clause::Forbid { pattern, pattern_text: inner.trim().to_string() })
        }
        "LIMIT" => {
            let metric_name = tokens.take_word();
            let metric = Metric::parse(&metric_name)
                .ok_or_else(|| AqlError::Syntax(format!("unknown metric `{metric_name}`")))?;
            tokens.expect_char('(')?;
            let pattern_text = tokens.take_balanced_parens()?;
            tokens.expect_char(')')?;
            let pattern = Pattern::parse(pattern_text.trim())?;

            tokens.skip_trivia();
            let op = tokens.take_op()?;
            tokens.skip_trivia();
            let value_str = tokens.take_until_close_paren();
            let value: f64 = value_str
                .trim()
                .parse()
                .map_err(|_| AqlError::Syntax(format!("bad numeric value `{value_str}`")))?;
            tokens.expect_char(')')?;

            Ok(Clause::Limit { metric, pattern, pattern_text: pattern_text.trim().to_string(), op, value })
        }
        other => Err(AqlError::Syntax(format!("unknown clause `{other}`"))),
    }
}

/// Minimal hand-rolled tokenizer: enough structure for the AQL grammar
/// without pulling in a parser-combinator dependency for a handful of
/// productions.
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Tokens { rest: text }
    }

    fn is_empty(&self) -> bool {
        self.rest.trim().is_empty()
    }

    fn skip_trivia(&mut self) {
        loop {
            self.rest = self.rest.trim_start();
            if let Some(stripped) = self.rest.strip_prefix('#') {
                self.rest = stripped.split_once('\n').map(|(_, r)| r).unwrap_or("");
                continue;
            }
            if let Some(stripped) = self.rest.strip_prefix("//") {
                self.rest = stripped.split_once('\n').map(|(_, r)| r).unwrap_or("");
                continue;
            }
            break;
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let mut iter = self.rest.chars();
        let c = iter.next();
        self.rest = iter.as_str();
        c
    }

    fn expect_char(&mut self, expected: char) -> Result<(), AqlError> {
        self.skip_trivia();
        match self.next_char() {
            Some(c) if c == expected => Ok(()),
            other => Err(AqlError::Syntax(format!("expected `{expected}`, found {other:?}"))),
        }
    }

    fn expect_word(&mut self, expected: &str) -> Result<(), AqlError> {
        self.skip_trivia();
        if let Some(stripped) = self.rest.strip_prefix(expected) {
            self.rest = stripped;
            Ok(())
        } else {
            Err(AqlError::Syntax(format!("expected `{expected}`")))
        }
    }

    fn take_word(&mut self) -> String {
        self.skip_trivia();
        let end = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        let word = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        word
    }

    fn expect_quoted_string(&mut self) -> Result<String, AqlError> {
        self.skip_trivia();
        self.expect_char('"')?;
        let end = self.rest.find('"').ok_or_else(|| AqlError::Syntax("unterminated string".into()))?;
        let s = self.rest[..end].to_string();
        self.rest = &self.rest[end + 1..];
        Ok(s)
    }

    /// Consume up to (not including) the matching close paren for the one
    /// already opened by the caller.
    fn take_balanced_parens(&mut self) -> Result<String, AqlError> {
        let mut depth = 1i32;
        let mut end = None;
        for (i, c) in self.rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| AqlError::Syntax("unterminated parenthesis".into()))?;
        let inner = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        Ok(inner)
    }

    fn take_op(&mut self) -> Result<Op, AqlError> {
        self.skip_trivia();
        for (text, op) in
            [("<=", Op::Le), (">=", Op::Ge), ("==", Op::Eq), ("!=", Op::Ne), ("<", Op::Lt), (">", Op::Gt)]
        {
            if let Some(stripped) = self.rest.strip_prefix(text) {
                self.rest = stripped;
                return Ok(op);
            }
        }
        Err(AqlError::Syntax(format!("expected a comparison operator, found `{}`", &self.rest[..self.rest.len().min(10)])))
    }

    fn take_until_close_paren(&mut self) -> String {
        let end = self.rest.find(')').unwrap_or(self.rest.len());
        let s = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_unit_core::types::{AstNode, FileMetadata, Language, NodeKind, Parameter};

    fn node(id: u64, file: &str, package: &str, type_name: Option<&str>, method: Option<&str>) -> AstNode {
        AstNode {
            id,
            node_type: if method.is_some() { NodeKind::Method } else { NodeKind::Type },
            file_path: file.to_string(),
            language: Language::Go,
            package: Some(package.to_string()),
            type_name: type_name.map(str::to_string),
            method: method.map(str::to_string),
            field: None,
            start_line: 1,
            end_line: 10,
            line_count: 10,
            cyclomatic_complexity: 1,
            parameter_count: 0,
            return_count: 0,
            parent_id: None,
            summary: None,
            field_type: None,
            default_value: None,
            parameters: Vec::<Parameter>::new(),
        }
    }

    fn metadata(file: &str) -> FileMetadata {
        FileMetadata {
            file_path: file.to_string(),
            content_hash: "deadbeef".to_string(),
            size: 1,
            mtime: 0,
            language: Language::Go,
            last_scanned_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn parses_forbid_and_limit_clauses() {
        let doc = RuleDocument::parse(
            r#"
            RULE "no orm in handlers" {
                FORBID(go:handlers::*Query*)
                LIMIT(cyclomatic(*Service*) > 10)
            }
            "#,
        )
        .unwrap();
        assert_eq!(doc.rules.len(), 1);
        assert_eq!(doc.rules[0].name, "no orm in handlers");
        assert_eq!(doc.rules[0].clauses.len(), 2);
        match &doc.rules[0].clauses[1] {
            Clause::Limit { metric, op, value, .. } => {
                assert_eq!(*metric, Metric::Cyclomatic);
                assert_eq!(*op, Op::Gt);
                assert_eq!(*value, 10.0);
            }
            _ => panic!("expected Limit clause"),
        }
    }

    #[test]
    fn evaluate_flags_forbidden_nodes() {
        let mut cache = arch_unit_core::sqlite::SqliteAstCache::in_memory().unwrap();
        let n = node(0, "handlers/user.go", "handlers", Some("UserHandler"), Some("RunQuery"));
        cache
            .replace_file("handlers/user.go", vec![n], vec![], vec![], metadata("handlers/user.go"))
            .unwrap();

        let doc = RuleDocument::parse(
            r#"RULE "r" { FORBID(handlers:UserHandler:RunQuery) }"#,
        )
        .unwrap();
        let violations = doc.evaluate(&cache, None);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].source, "arch-unit");
        assert_eq!(violations[0].rule_id.as_deref(), Some("r"));
    }

    #[test]
    fn evaluate_flags_limit_breaches() {
        let mut cache = arch_unit_core::sqlite::SqliteAstCache::in_memory().unwrap();
        let mut big = node(0, "svc/big.go", "svc", Some("BigService"), Some("Do"));
        big.cyclomatic_complexity = 25;
        cache
            .replace_file("svc/big.go", vec![big], vec![], vec![], metadata("svc/big.go"))
            .unwrap();

        let doc = RuleDocument::parse(r#"RULE "r" { LIMIT(cyclomatic(*Service*) > 10) }"#).unwrap();
        let violations = doc.evaluate(&cache, None);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("25"));
    }

    #[test]
    fn evaluate_runs_independent_rules_without_short_circuit() {
        let mut cache = arch_unit_core::sqlite::SqliteAstCache::in_memory().unwrap();
        let n = node(0, "handlers/user.go", "handlers", Some("UserHandler"), Some("RunQuery"));
        cache
            .replace_file("handlers/user.go", vec![n], vec![], vec![], metadata("handlers/user.go"))
            .unwrap();

        let doc = RuleDocument::parse(
            r#"
            RULE "a" { FORBID(handlers:UserHandler:RunQuery) }
            RULE "b" { LIMIT(lines(*) > 1000) }
            "#,
        )
        .unwrap();
        let violations = doc.evaluate(&cache, None);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id.as_deref(), Some("a"));
    }
}
