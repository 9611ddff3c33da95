//! Markdown extractor: headings become `type` nodes nested by
//! level, used by the fixture runner to anchor documentation against code.

use std::path::Path;

use arch_unit_core::types::{AstNode, Language, NodeKind};

use crate::resolver::{ExtractError, ExtractOutput, LanguageExtractor};

pub struct MarkdownExtractor;

impl MarkdownExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct Heading {
    level: u8,
    text: String,
    line: u32,
}

fn parse_headings(source: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_fence = false;
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('#') {
            let mut level = 1u8;
            let mut rest = rest;
            while let Some(r) = rest.strip_prefix('#') {
                level += 1;
                rest = r;
            }
            if level <= 6 && rest.starts_with(' ') {
                headings.push(Heading {
                    level,
                    text: rest.trim().to_string(),
                    line: idx as u32 + 1,
                });
            }
        }
    }
    headings
}

impl LanguageExtractor for MarkdownExtractor {
    fn language(&self) -> Language {
        Language::Markdown
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractOutput, ExtractError> {
        let source = std::str::from_utf8(bytes).map_err(|e| ExtractError::Parse {
            path: path.display().to_string(),
            reason: format!("not valid utf-8: {e}"),
        })?;
        let file_path = path.to_string_lossy().to_string();
        let package_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "doc".to_string());

        let mut nodes = Vec::new();
        let total_lines = source.lines().count().max(1) as u32;

        let package_id = 0u64;
        nodes.push(AstNode {
            id: package_id,
            node_type: NodeKind::Package,
            file_path: file_path.clone(),
            language: Language::Markdown,
            package: Some(package_name.clone()),
            type_name: None,
            method: None,
            field: None,
            start_line: 1,
            end_line: total_lines,
            line_count: total_lines,
            cyclomatic_complexity: 0,
            parameter_count: 0,
            return_count: 0,
            parent_id: None,
            summary: None,
            field_type: None,
            default_value: None,
            parameters: Vec::new(),
        });

        let headings = parse_headings(source);
        // Nest each heading under the nearest preceding heading of a lower
        // level (its section parent), or the package node at top level.
        let mut stack: Vec<(u8, u64)> = Vec::new();
        let mut next_id = 1u64;
        for (i, heading) in headings.iter().enumerate() {
            while stack.last().is_some_and(|(lvl, _)| *lvl >= heading.level) {
                stack.pop();
            }
            let parent_id = stack.last().map(|(_, id)| *id).unwrap_or(package_id);
            let id = next_id;
            next_id += 1;
            let end_line = headings
                .get(i + 1)
                .map(|next| next.line.saturating_sub(1))
                .unwrap_or(total_lines);

            nodes.push(AstNode {
                id,
                node_type: NodeKind::Type,
                file_path: file_path.clone(),
                language: Language::Markdown,
                package: Some(package_name.clone()),
                type_name: Some(heading.text.clone()),
                method: None,
                field: None,
                start_line: heading.line,
                end_line: end_line.max(heading.line),
                line_count: end_line.max(heading.line).saturating_sub(heading.line) + 1,
                cyclomatic_complexity: 0,
                parameter_count: 0,
                return_count: 0,
                parent_id: Some(parent_id),
                summary: None,
                field_type: Some(format!("h{}", heading.level)),
                default_value: None,
                parameters: Vec::new(),
            });
            stack.push((heading.level, id));
        }

        Ok(ExtractOutput {
            nodes,
            relationships: Vec::new(),
            library_relationships: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_nest_by_level() {
        let source = "# Title\n\n## Section A\n\ntext\n\n### Subsection\n\n## Section B\n";
        let extractor = MarkdownExtractor::new();
        let out = extractor.extract(Path::new("doc.md"), source.as_bytes()).unwrap();
        assert_eq!(out.nodes.len(), 5); // package + 4 headings

        let title = out.nodes.iter().find(|n| n.type_name.as_deref() == Some("Title")).unwrap();
        assert_eq!(title.parent_id, Some(0));

        let subsection = out
            .nodes
            .iter()
            .find(|n| n.type_name.as_deref() == Some("Subsection"))
            .unwrap();
        let section_a = out
            .nodes
            .iter()
            .find(|n| n.type_name.as_deref() == Some("Section A"))
            .unwrap();
        assert_eq!(subsection.parent_id, Some(section_a.id));
    }

    #[test]
    fn headings_inside_fenced_code_blocks_are_ignored() {
        let source = "# Title\n\n```\n# not a heading\n```\n";
        let extractor = MarkdownExtractor::new();
        let out = extractor.extract(Path::new("doc.md"), source.as_bytes()).unwrap();
        assert_eq!(out.nodes.len(), 2); // package + Title only
    }
}
