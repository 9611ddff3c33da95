//! OpenAPI extractor: one `http_endpoint` node per
//! `operationId` (or `method+path` when absent), one `http_schema` node per
//! `components.schemas` entry. All nodes use the virtual file path
//! `openapi://<url>` rather than the spec file's real disk path.

use std::path::Path;

use serde_yaml::Value;

use arch_unit_core::types::{AstNode, Language, NodeKind, Parameter};

use crate::resolver::{ExtractError, ExtractOutput, LanguageExtractor};

pub struct OpenApiExtractor;

impl OpenApiExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OpenApiExtractor {
    fn default() -> Self {
        Self::new()
    }
}

const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

impl LanguageExtractor for OpenApiExtractor {
    fn language(&self) -> Language {
        Language::Openapi
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractOutput, ExtractError> {
        let source = std::str::from_utf8(bytes).map_err(|e| ExtractError::Parse {
            path: path.display().to_string(),
            reason: format!("not valid utf-8: {e}"),
        })?;
        let doc: Value = serde_yaml::from_str(source).map_err(|e| ExtractError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let url = doc
            .get("servers")
            .and_then(|s| s.as_sequence())
            .and_then(|s| s.first())
            .and_then(|s| s.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| doc.get("info").and_then(|i| i.get("title")).and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let file_path = format!("openapi://{url}");
        let package_name = url.clone();

        let mut nodes = Vec::new();
        let mut next_id = 0u64;
        let mut alloc = || {
            let id = next_id;
            next_id += 1;
            id
        };

        let package_id = alloc();
        nodes.push(blank_node(package_id, None, &file_path, &package_name, NodeKind::Package, None));

        if let Some(paths) = doc.get("paths").and_then(Value::as_mapping) {
            for (path_key, path_item) in paths {
                let Some(path_str) = path_key.as_str() else { continue };
                let Some(operations) = path_item.as_mapping() else { continue };
                for (method_key, operation) in operations {
                    let Some(method) = method_key.as_str() else { continue };
                    if !HTTP_METHODS.contains(&method.to_ascii_lowercase().as_str()) {
                        continue;
                    }
                    let operation_id = operation
                        .get("operationId")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{} {}", method.to_ascii_uppercase(), path_str));
                    let summary = operation.get("summary").and_then(Value::as_str).map(str::to_string);

                    let parameters = operation
                        .get("parameters")
                        .and_then(Value::as_sequence)
                        .map(|params| {
                            params
                                .iter()
                                .filter_map(|p| {
                                    let name = p.get("name")?.as_str()?.to_string();
                                    let type_name = p
                                        .get("schema")
                                        .and_then(|s| s.get("type"))
                                        .and_then(Value::as_str)
                                        .map(str::to_string);
                                    Some(Parameter { name, type_name })
                                })
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default();

                    let endpoint_id = alloc();
                    let mut node = blank_node(
                        endpoint_id,
                        Some(package_id),
                        &file_path,
                        &package_name,
                        NodeKind::HttpEndpoint,
                        Some(operation_id),
                    );
                    node.method = Some(method.to_ascii_uppercase());
                    node.field = Some(path_str.to_string());
                    node.summary = summary;
                    node.parameter_count = parameters.len() as u32;
                    node.parameters = parameters;
                    nodes.push(node);
                }
            }
        }

        if let Some(schemas) = doc
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_mapping)
        {
            for (name_key, schema) in schemas {
                let Some(name) = name_key.as_str() else { continue };
                let schema_id = alloc();
                let mut node = blank_node(
                    schema_id,
                    Some(package_id),
                    &file_path,
                    &package_name,
                    NodeKind::HttpSchema,
                    Some(name.to_string()),
                );
                node.summary = schema.get("description").and_then(Value::as_str).map(str::to_string);
                nodes.push(node);
            }
        }

        Ok(ExtractOutput {
            nodes,
            relationships: Vec::new(),
            library_relationships: Vec::new(),
        })
    }
}

fn blank_node(
    id: u64,
    parent_id: Option<u64>,
    file_path: &str,
    package: &str,
    node_type: NodeKind,
    type_name: Option<String>,
) -> AstNode {
    AstNode {
        id,
        node_type,
        file_path: file_path.to_string(),
        language: Language::Openapi,
        package: Some(package.to_string()),
        type_name,
        method: None,
        field: None,
        start_line: 1,
        end_line: 1,
        line_count: 1,
        cyclomatic_complexity: 0,
        parameter_count: 0,
        return_count: 0,
        parent_id,
        summary: None,
        field_type: None,
        default_value: None,
        parameters: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_endpoint_with_operation_id() {
        let source = r#"
openapi: "3.0.0"
info:
  title: Demo API
servers:
  - url: https://api.example.com
paths:
  /users:
    get:
      operationId: listUsers
      summary: List users
      parameters:
        - name: limit
          schema:
            type: integer
"#;
        let extractor = OpenApiExtractor::new();
        let out = extractor.extract(Path::new("api.yaml"), source.as_bytes()).unwrap();
        let endpoint = out
            .nodes
            .iter()
            .find(|n| n.node_type == NodeKind::HttpEndpoint)
            .unwrap();
        assert_eq!(endpoint.type_name.as_deref(), Some("listUsers"));
        assert_eq!(endpoint.method.as_deref(), Some("GET"));
        assert_eq!(endpoint.field.as_deref(), Some("/users"));
        assert_eq!(endpoint.file_path, "openapi://https://api.example.com");
    }

    #[test]
    fn falls_back_to_method_and_path_without_operation_id() {
        let source = "paths:\n  /ping:\n    get: {}\n";
        let extractor = OpenApiExtractor::new();
        let out = extractor.extract(Path::new("api.yaml"), source.as_bytes()).unwrap();
        let endpoint = out.nodes.iter().find(|n| n.node_type == NodeKind::HttpEndpoint).unwrap();
        assert_eq!(endpoint.type_name.as_deref(), Some("GET /ping"));
    }

    #[test]
    fn extracts_component_schemas() {
        let source = "components:\n  schemas:\n    User:\n      description: a user\n";
        let extractor = OpenApiExtractor::new();
        let out = extractor.extract(Path::new("api.yaml"), source.as_bytes()).unwrap();
        let schema = out.nodes.iter().find(|n| n.node_type == NodeKind::HttpSchema).unwrap();
        assert_eq!(schema.type_name.as_deref(), Some("User"));
        assert_eq!(schema.summary.as_deref(), Some("a user"));
    }
}
