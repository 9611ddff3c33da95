//! Cyclomatic complexity for a method/function body: start at 1,
//! add 1 for every `if`, `else if`, `case`/`match` arm guard, loop construct,
//! boolean `&&`/`||`, ternary, and `catch`/`except` clause.
//!
//! This is a token scan over the body text rather than a per-grammar AST
//! walk: the keyword set below is shared across Go/Python/TS/JS, and a scan
//! is immune to the differences in each grammar's node names for the same
//! construct.

use arch_unit_core::types::Language;

pub fn cyclomatic_complexity(body: &str, language: Language) -> u32 {
    let mut complexity = 1u32;
    let mut chars = body.char_indices().peekable();
    let bytes = body.as_bytes();

    while let Some((i, c)) = chars.next() {
        match c {
            '&' if bytes.get(i + 1) == Some(&b'&') => complexity += 1,
            '|' if bytes.get(i + 1) == Some(&b'|') => complexity += 1,
            '?' if language != Language::Go => complexity += 1,
            _ => {}
        }
    }

    for word in tokenize_words(body) {
        if is_branch_keyword(word, language) {
            complexity += 1;
        }
    }

    complexity
}

fn tokenize_words(body: &str) -> impl Iterator<Item = &str> {
    body.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
}

fn is_branch_keyword(word: &str, language: Language) -> bool {
    match word {
        // "else" alone isn't a decision point; "else if" is counted via "if".
        "if" | "for" | "while" | "case" | "catch" => true,
        "except" | "elif" if language == Language::Python => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_function_has_complexity_one() {
        let body = "{ return 1 + 1; }";
        assert_eq!(cyclomatic_complexity(body, Language::Go), 1);
    }

    #[test]
    fn branches_increase_complexity() {
        let body = "{ if x { return 1 } else if y { return 2 } else { return 3 } }";
        assert_eq!(cyclomatic_complexity(body, Language::Go), 3);
    }

    #[test]
    fn boolean_operators_increase_complexity() {
        let body = "if a && b || c: pass";
        assert_eq!(cyclomatic_complexity(body, Language::Python), 4);
    }

    #[test]
    fn python_except_and_elif_count() {
        let body = "try:\n  x()\nexcept ValueError:\n  pass\nelif y:\n  pass";
        assert_eq!(cyclomatic_complexity(body, Language::Python), 3);
    }
}
