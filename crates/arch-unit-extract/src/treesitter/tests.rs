use super::*;
use crate::resolver::DefKind;

#[test]
fn go_parses_function_struct_method_and_call() {
    let source = r#"
package main

import "fmt"

type Greeter struct {
    Name string
}

func (g *Greeter) Greet() string {
    return fmt.Sprintf("hi %s", g.Name)
}

func main() {
    g := Greeter{Name: "arch-unit"}
    fmt.Println(g.Greet())
}
"#;
    let mut parser = TreeSitterParser::new();
    let result = parser
        .parse_file("go", Path::new("main.go"), source)
        .expect("parses");

    let types: Vec<_> = result
        .definitions
        .iter()
        .filter(|d| d.kind == DefKind::Type)
        .collect();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].name, "Greeter");

    let methods: Vec<_> = result
        .definitions
        .iter()
        .filter(|d| d.kind == DefKind::Method)
        .collect();
    assert_eq!(methods.len(), 2);
    let greet = methods.iter().find(|m| m.name == "Greet").unwrap();
    assert!(greet.receiver_hint.as_deref().unwrap().contains("Greeter"));

    assert!(result.imports.iter().any(|i| i.source == "fmt"));
    assert!(result
        .references
        .iter()
        .any(|r| r.callee == "Println" && r.receiver.as_deref() == Some("fmt")));
}

#[test]
fn python_parses_class_method_and_import() {
    let source = r#"
import os

class Repo:
    def save(self, path):
        return os.path.join(path, "x")

def helper():
    return 1
"#;
    let mut parser = TreeSitterParser::new();
    let result = parser
        .parse_file("python", Path::new("repo.py"), source)
        .expect("parses");

    assert!(result.definitions.iter().any(|d| d.kind == DefKind::Type && d.name == "Repo"));
    assert!(result
        .definitions
        .iter()
        .any(|d| d.kind == DefKind::Method && d.name == "save"));
    assert!(result
        .definitions
        .iter()
        .any(|d| d.kind == DefKind::Method && d.name == "helper"));
    assert!(result.imports.iter().any(|i| i.source == "os"));
}

#[test]
fn typescript_parses_class_method_arrow_function_and_import() {
    let source = r#"
import { Logger } from "./logger";

export class UserService {
    save(id: string): void {
        console.log(id);
    }
}

const helper = (x: number): number => x + 1;
"#;
    let mut parser = TreeSitterParser::new();
    let result = parser
        .parse_file("typescript", Path::new("service.ts"), source)
        .expect("parses");

    assert!(result
        .definitions
        .iter()
        .any(|d| d.kind == DefKind::Type && d.name == "UserService"));
    assert!(result
        .definitions
        .iter()
        .any(|d| d.kind == DefKind::Method && d.name == "save"));
    assert!(result
        .definitions
        .iter()
        .any(|d| d.kind == DefKind::Method && d.name == "helper"));
    assert!(result.imports.iter().any(|i| i.source == "./logger"));
}

#[test]
fn detect_language_maps_extensions() {
    assert_eq!(detect_language(Path::new("a.go")), Some("go"));
    assert_eq!(detect_language(Path::new("a.py")), Some("python"));
    assert_eq!(detect_language(Path::new("a.ts")), Some("typescript"));
    assert_eq!(detect_language(Path::new("a.tsx")), Some("tsx"));
    assert_eq!(detect_language(Path::new("a.rs")), None);
}
