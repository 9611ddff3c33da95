//! Lowers the language-neutral [`ParseResult`] produced by the tree-sitter
//! layer into [`AstNode`]/[`Relationship`] values ready for
//! [`arch_unit_core::store::AstCache::replace_file`].
//!
//! Node ids in the returned [`ExtractOutput`] are placeholders local to this
//! one file's batch (0 for the package node, then 1.. in discovery order);
//! the cache remaps them to stable ids on insert.

use std::collections::HashMap;

use arch_unit_core::types::{
    AstNode, Language, LibraryNode, LibraryRelationship, NodeKind, Parameter, Relationship,
    RelationshipKind,
};

use crate::complexity::cyclomatic_complexity;
use crate::resolver::{DefKind, ExtractOutput, ParseResult, Reference};

/// Looks up the library a bare name (an import source, or the base of a
/// qualified call) belongs to, if it's a recognized external symbol rather
/// than something defined in this repository.
pub type LibraryLookup<'a> = dyn Fn(&str) -> Option<(String, String, String)> + 'a;

/// A method or function node already placed in the output, kept around to
/// resolve calls and containment against.
struct MethodSpan {
    id: u64,
    name: String,
    type_name: Option<String>,
    line_start: u32,
    line_end: u32,
}

pub fn lower(
    language: Language,
    file_path: &str,
    parsed: ParseResult,
    package_name: &str,
    lookup_library: &LibraryLookup<'_>,
) -> ExtractOutput {
    let mut nodes = Vec::new();
    let mut next_id = 0u64;
    let mut alloc = || {
        let id = next_id;
        next_id += 1;
        id
    };

    let package_id = alloc();
    nodes.push(AstNode {
        id: package_id,
        node_type: NodeKind::Package,
        file_path: file_path.to_string(),
        language,
        package: Some(package_name.to_string()),
        type_name: None,
        method: None,
        field: None,
        start_line: 1,
        end_line: parsed
            .definitions
            .iter()
            .map(|d| d.line_end)
            .max()
            .unwrap_or(1),
        line_count: 0,
        cyclomatic_complexity: 0,
        parameter_count: 0,
        return_count: 0,
        parent_id: None,
        summary: None,
        field_type: None,
        default_value: None,
        parameters: Vec::new(),
    });

    // Pass 1: types, so methods can be attached to them below.
    let mut type_ids_by_name: HashMap<String, u64> = HashMap::new();
    let mut type_spans: Vec<(u64, String, u32, u32)> = Vec::new();
    for def in parsed.definitions.iter().filter(|d| d.kind == DefKind::Type) {
        let id = alloc();
        type_ids_by_name.insert(def.name.clone(), id);
        type_spans.push((id, def.name.clone(), def.line_start, def.line_end));
        nodes.push(AstNode {
            id,
            node_type: NodeKind::Type,
            file_path: file_path.to_string(),
            language,
            package: Some(package_name.to_string()),
            type_name: Some(def.name.clone()),
            method: None,
            field: None,
            start_line: def.line_start,
            end_line: def.line_end,
            line_count: def.line_end.saturating_sub(def.line_start) + 1,
            cyclomatic_complexity: 0,
            parameter_count: 0,
            return_count: 0,
            parent_id: Some(package_id),
            summary: None,
            field_type: None,
            default_value: None,
            parameters: Vec::new(),
        });
    }

    for def in parsed.definitions.iter().filter(|d| d.kind == DefKind::Enum) {
        let id = alloc();
        nodes.push(AstNode {
            id,
            node_type: NodeKind::Enum,
            file_path: file_path.to_string(),
            language,
            package: Some(package_name.to_string()),
            type_name: Some(def.name.clone()),
            method: None,
            field: None,
            start_line: def.line_start,
            end_line: def.line_end,
            line_count: def.line_end.saturating_sub(def.line_start) + 1,
            cyclomatic_complexity: 0,
            parameter_count: 0,
            return_count: 0,
            parent_id: Some(package_id),
            summary: None,
            field_type: None,
            default_value: None,
            parameters: Vec::new(),
        });
    }

    // Pass 2: methods and functions. A method/function's id doubles as the
    // `from_id` for calls made inside its body.
    let mut method_spans: Vec<MethodSpan> = Vec::new();

    for def in parsed.definitions.iter().filter(|d| d.kind == DefKind::Method) {
        let parent_type = def
            .receiver_hint
            .as_deref()
            .and_then(receiver_type_name)
            .or_else(|| enclosing_type_name(&type_spans, def.line_start, def.line_end));

        let id = alloc();
        let (node_type, type_name, parent_id) = match &parent_type {
            Some(t) => (
                NodeKind::Method,
                Some(t.clone()),
                type_ids_by_name.get(t).copied().unwrap_or(package_id),
            ),
            None => (NodeKind::Function, None, package_id),
        };

        nodes.push(AstNode {
            id,
            node_type,
            file_path: file_path.to_string(),
            language,
            package: Some(package_name.to_string()),
            type_name: type_name.clone(),
            method: Some(def.name.clone()),
            field: None,
            start_line: def.line_start,
            end_line: def.line_end,
            line_count: def.line_end.saturating_sub(def.line_start) + 1,
            cyclomatic_complexity: cyclomatic_complexity(&def.body_text, language),
            parameter_count: count_params(&def.params_text),
            return_count: count_returns(&def.return_text),
            parent_id: Some(parent_id),
            summary: None,
            field_type: None,
            default_value: None,
            parameters: parse_parameters(&def.params_text),
        });

        method_spans.push(MethodSpan {
            id,
            name: def.name.clone(),
            type_name,
            line_start: def.line_start,
            line_end: def.line_end,
        });
    }

    let mut relationships = Vec::new();
    let mut library_relationships: Vec<(LibraryRelationship, LibraryNode)> = Vec::new();

    // References resolve against same-file methods/functions by name, with a
    // receiver match preferred when the call is qualified. Cross-file targets
    // are left as `to_text` for the second-pass re-resolution.
    for reference in &parsed.references {
        let from_id = enclosing_method(&method_spans, reference.line)
            .map(|m| m.id)
            .unwrap_or(package_id);

        match resolve_reference(&method_spans, reference) {
            Some(to_id) => relationships.push(Relationship {
                id: 0,
                from_id,
                to_id: Some(to_id),
                to_text: None,
                line_no: reference.line,
                column_no: reference.column,
                kind: RelationshipKind::Call,
            }),
            None => {
                let qualified = match &reference.receiver {
                    Some(recv) => format!("{recv}.{}", reference.callee),
                    None => reference.callee.clone(),
                };
                let lib_key = reference.receiver.as_deref().unwrap_or(&reference.callee);
                if let Some((framework, pkg, symbol)) = lookup_library(lib_key) {
                    library_relationships.push((
                        LibraryRelationship {
                            id: 0,
                            from_id,
                            library_id: 0,
                            line_no: reference.line,
                            column_no: reference.column,
                        },
                        LibraryNode {
                            id: 0,
                            framework,
                            package: pkg,
                            symbol,
                        },
                    ));
                } else {
                    relationships.push(Relationship {
                        id: 0,
                        from_id,
                        to_id: None,
                        to_text: Some(qualified),
                        line_no: reference.line,
                        column_no: reference.column,
                        kind: RelationshipKind::Call,
                    });
                }
            }
        }
    }

    for import in &parsed.imports {
        if let Some((framework, pkg, symbol)) = lookup_library(&import.source) {
            library_relationships.push((
                LibraryRelationship {
                    id: 0,
                    from_id: package_id,
                    library_id: 0,
                    line_no: import.line,
                    column_no: import.column,
                },
                LibraryNode {
                    id: 0,
                    framework,
                    package: pkg,
                    symbol,
                },
            ));
        } else {
            relationships.push(Relationship {
                id: 0,
                from_id: package_id,
                to_id: None,
                to_text: Some(import.source.clone()),
                line_no: import.line,
                column_no: import.column,
                kind: RelationshipKind::Import,
            });
        }
    }

    ExtractOutput {
        nodes,
        relationships,
        library_relationships,
    }
}

fn enclosing_type_name(
    type_spans: &[(u64, String, u32, u32)],
    line_start: u32,
    line_end: u32,
) -> Option<String> {
    type_spans
        .iter()
        .filter(|(_, _, s, e)| *s <= line_start && line_end <= *e)
        .min_by_key(|(_, _, s, e)| e - s)
        .map(|(_, name, _, _)| name.clone())
}

fn enclosing_method<'a>(spans: &'a [MethodSpan], line: u32) -> Option<&'a MethodSpan> {
    spans
        .iter()
        .filter(|m| m.line_start <= line && line <= m.line_end)
        .min_by_key(|m| m.line_end - m.line_start)
}

fn resolve_reference(spans: &[MethodSpan], reference: &Reference) -> Option<u64> {
    match &reference.receiver {
        Some(recv) if recv == "self" || recv == "this" => {
            let here_type = enclosing_method(spans, reference.line)?.type_name.clone();
            spans
                .iter()
                .find(|m| m.name == reference.callee && m.type_name == here_type)
                .map(|m| m.id)
        }
        Some(recv) => spans
            .iter()
            .find(|m| m.name == reference.callee && m.type_name.as_deref() == Some(recv.as_str()))
            .map(|m| m.id),
        None => spans
            .iter()
            .find(|m| m.name == reference.callee && m.type_name.is_none())
            .map(|m| m.id),
    }
}

/// Extracts the bare type name from a Go receiver clause, e.g.
/// `"(c *UserController)"` -> `"UserController"`, `"(s Set)"` -> `"Set"`.
fn receiver_type_name(receiver_text: &str) -> Option<String> {
    let inner = receiver_text.trim().trim_start_matches('(').trim_end_matches(')');
    let mut parts = inner.split_whitespace();
    parts.next()?;
    let ty = parts.next()?;
    Some(ty.trim_start_matches('*').to_string())
}

fn count_params(params_text: &str) -> u32 {
    let inner = params_text.trim().trim_start_matches('(').trim_end_matches(')');
    if inner.trim().is_empty() {
        0
    } else {
        inner.split(',').count() as u32
    }
}

fn count_returns(return_text: &str) -> u32 {
    let trimmed = return_text.trim().trim_start_matches('(').trim_end_matches(')');
    if trimmed.is_empty() {
        0
    } else {
        trimmed.split(',').count() as u32
    }
}

fn parse_parameters(params_text: &str) -> Vec<Parameter> {
    let inner = params_text.trim().trim_start_matches('(').trim_end_matches(')');
    if inner.trim().is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .filter_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            // "name: Type" (TS/Python), "name Type" (Go), or bare "name".
            if let Some((name, ty)) = raw.split_once(':') {
                Some(Parameter {
                    name: name.trim().trim_end_matches('?').to_string(),
                    type_name: Some(ty.trim().to_string()),
                })
            } else if let Some((name, ty)) = raw.rsplit_once(' ') {
                Some(Parameter {
                    name: name.trim().to_string(),
                    type_name: Some(ty.trim().to_string()),
                })
            } else {
                Some(Parameter {
                    name: raw.to_string(),
                    type_name: None,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DefKind, Definition, Import};

    fn def(name: &str, kind: DefKind, line_start: u32, line_end: u32) -> Definition {
        Definition {
            name: name.to_string(),
            kind,
            line_start,
            line_end,
            params_text: String::new(),
            return_text: String::new(),
            body_text: String::new(),
            receiver_hint: None,
        }
    }

    #[test]
    fn method_attaches_to_enclosing_type_by_containment() {
        let parsed = ParseResult {
            definitions: vec![
                def("UserController", DefKind::Type, 1, 20),
                def("save", DefKind::Method, 5, 10),
            ],
            references: vec![],
            imports: vec![],
        };
        let out = lower(
            Language::Python,
            "app/controller.py",
            parsed,
            "app",
            &|_| None,
        );
        let method = out
            .nodes
            .iter()
            .find(|n| n.node_type == NodeKind::Method)
            .expect("method node");
        assert_eq!(method.type_name.as_deref(), Some("UserController"));
    }

    #[test]
    fn go_method_attaches_via_receiver_hint_not_containment() {
        let mut save = def("Save", DefKind::Method, 50, 55);
        save.receiver_hint = Some("(c *UserController)".to_string());
        let parsed = ParseResult {
            definitions: vec![def("UserController", DefKind::Type, 1, 10), save],
            references: vec![],
            imports: vec![],
        };
        let out = lower(Language::Go, "controller.go", parsed, "controller", &|_| None);
        let method = out
            .nodes
            .iter()
            .find(|n| n.node_type == NodeKind::Method)
            .expect("method node");
        assert_eq!(method.type_name.as_deref(), Some("UserController"));
    }

    #[test]
    fn unresolved_call_falls_back_to_to_text() {
        let parsed = ParseResult {
            definitions: vec![def("main", DefKind::Method, 1, 5)],
            references: vec![Reference {
                callee: "fmt.Println".to_string(),
                receiver: Some("fmt".to_string()),
                line: 3,
                column: 1,
            }],
            imports: vec![Import {
                source: "fmt".to_string(),
                line: 1,
                column: 1,
            }],
        };
        let out = lower(Language::Go, "main.go", parsed, "main", &|name| {
            (name == "fmt").then(|| ("stdlib".to_string(), "fmt".to_string(), "*".to_string()))
        });
        assert!(out.relationships.is_empty());
        assert_eq!(out.library_relationships.len(), 2);
    }
}
