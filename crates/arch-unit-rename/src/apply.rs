//! Verifies a [`RenamePlan`]'s edits against the files on disk and applies
//! them atomically, file by file.

use std::collections::HashMap;

use crate::error::RenameError;
use crate::plan::{Edit, RenamePlan};

/// Outcome of applying a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameReport {
    pub files_modified: usize,
    pub references_updated: usize,
}

/// Apply every edit in `plan`. If `backup`, a sibling `.bak` of each touched
/// file is written before it's overwritten. If any edit location no longer
/// contains the expected old identifier, nothing is written anywhere.
pub fn apply_rename(plan: &RenamePlan, backup: bool) -> Result<RenameReport, RenameError> {
    let by_file = group_by_file(&plan.edits);
    let mut rewritten: HashMap<&str, String> = HashMap::new();

    for (file, edits) in &by_file {
        let contents = std::fs::read_to_string(file)
            .map_err(|source| RenameError::Read { path: file.into(), source })?;
        rewritten.insert(file.as_str(), rewrite_file(&contents, edits, file)?);
    }

    for (file, new_contents) in &rewritten {
        if backup {
            std::fs::write(format!("{file}.bak"), std::fs::read_to_string(file).unwrap_or_default())
                .map_err(|source| RenameError::Write { path: format!("{file}.bak").into(), source })?;
        }
        std::fs::write(file, new_contents).map_err(|source| RenameError::Write { path: (*file).into(), source })?;
    }

    Ok(RenameReport { files_modified: rewritten.len(), references_updated: plan.edits.len() })
}

fn group_by_file(edits: &[Edit]) -> HashMap<String, Vec<&Edit>> {
    let mut by_file: HashMap<String, Vec<&Edit>> = HashMap::new();
    for edit in edits {
        by_file.entry(edit.file.clone()).or_default().push(edit);
    }
    by_file
}

/// Rewrite `contents` applying every edit targeting `file`, verifying each
/// location still carries the old identifier before touching it.
fn rewrite_file(contents: &str, edits: &[&Edit], file: &str) -> Result<String, RenameError> {
    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();

    let mut by_line: HashMap<u32, Vec<&Edit>> = HashMap::new();
    for edit in edits {
        by_line.entry(edit.line).or_default().push(edit);
    }

    for (line_no, line_edits) in &by_line {
        let idx = (*line_no as usize).checked_sub(1).unwrap_or(0);
        let Some(line) = lines.get(idx).cloned() else {
            return Err(RenameError::StaleEdit {
                file: file.to_string(),
                line: *line_no,
                column: line_edits[0].column,
                expected: line_edits[0].old.clone(),
            });
        };
        lines[idx] = replace_identifier_occurrences(&line, line_edits)?;
    }

    let mut rewritten = lines.join("\n");
    if contents.ends_with('\n') {
        rewritten.push('\n');
    }
    Ok(rewritten)
}

/// Replace every edit's old identifier on one line. An edit's `column` of
/// `0` means "declaration site, location unknown" — the first whole-word
/// occurrence is used; other edits must find the identifier at their exact
/// byte column.
fn replace_identifier_occurrences(line: &str, edits: &[&Edit]) -> Result<String, RenameError> {
    let mut result = line.to_string();
    for edit in edits {
        let found = if edit.column == 0 {
            find_whole_word(&result, &edit.old, 0)
        } else {
            let col = edit.column as usize;
            (result.get(col..col + edit.old.len()).map(|s| s == edit.old).unwrap_or(false)
                && is_word_boundary(&result, col, edit.old.len()))
            .then_some(col)
        };

        let Some(at) = found else {
            return Err(RenameError::StaleEdit {
                file: edit.file.clone(),
                line: edit.line,
                column: edit.column,
                expected: edit.old.clone(),
            });
        };

        result.replace_range(at..at + edit.old.len(), &edit.new);
    }
    Ok(result)
}

fn is_word_boundary(line: &str, col: usize, len: usize) -> bool {
    let before_ok = col == 0 || !line.as_bytes()[col - 1].is_ascii_alphanumeric() && line.as_bytes()[col - 1] != b'_';
    let after = col + len;
    let after_ok = after >= line.len() || (!line.as_bytes()[after].is_ascii_alphanumeric() && line.as_bytes()[after] != b'_');
    before_ok && after_ok
}

fn find_whole_word(line: &str, word: &str, from: usize) -> Option<usize> {
    let mut search_start = from;
    while let Some(rel) = line[search_start..].find(word) {
        let at = search_start + rel;
        if is_word_boundary(line, at, word.len()) {
            return Some(at);
        }
        search_start = at + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_unit_core::types::{AstNode, Language, NodeKind};

    fn target(file: &str, line: u32, method: &str) -> AstNode {
        AstNode {
            id: 1,
            node_type: NodeKind::Method,
            file_path: file.to_string(),
            language: Language::Go,
            package: Some("billing".to_string()),
            type_name: None,
            method: Some(method.to_string()),
            field: None,
            start_line: line,
            end_line: line + 1,
            line_count: 1,
            cyclomatic_complexity: 1,
            parameter_count: 0,
            return_count: 0,
            parent_id: None,
            summary: None,
            field_type: None,
            default_value: None,
            parameters: Vec::new(),
        }
    }

    #[test]
    fn applies_edits_and_reports_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("charge.go");
        std::fs::write(&file, "func Charge(amount int) {\n\treturn Charge2(amount)\n}\n").unwrap();

        let path = file.to_string_lossy().to_string();
        let plan = RenamePlan {
            target: target(&path, 1, "Charge"),
            old_name: "Charge".to_string(),
            new_name: "ChargeCard".to_string(),
            edits: vec![Edit { file: path.clone(), line: 1, column: 0, old: "Charge".to_string(), new: "ChargeCard".to_string() }],
        };

        let report = apply_rename(&plan, false).unwrap();
        assert_eq!(report.files_modified, 1);
        assert_eq!(report.references_updated, 1);

        let contents = std::fs::read_to_string(&file).unwrap();
        assert!(contents.starts_with("func ChargeCard(amount int) {"));
        assert!(contents.contains("Charge2"), "unrelated identifier with shared prefix must survive untouched");
    }

    #[test]
    fn stale_edit_aborts_with_no_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("charge.go");
        std::fs::write(&file, "func Renamed(amount int) {}\n").unwrap();
        let path = file.to_string_lossy().to_string();

        let plan = RenamePlan {
            target: target(&path, 1, "Charge"),
            old_name: "Charge".to_string(),
            new_name: "ChargeCard".to_string(),
            edits: vec![Edit { file: path.clone(), line: 1, column: 5, old: "Charge".to_string(), new: "ChargeCard".to_string() }],
        };

        let err = apply_rename(&plan, false).unwrap_err();
        assert!(matches!(err, RenameError::StaleEdit { .. }));
        let contents = std::fs::read_to_string(&file).unwrap();
        assert_eq!(contents, "func Renamed(amount int) {}\n");
    }
}
