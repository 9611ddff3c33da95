//! Source scanning and per-language structural extraction for arch-unit.
//!
//! [`walker::SourceScanner`] walks a repository once to find candidate files;
//! each [`resolver::LanguageExtractor`] implementation turns one file's bytes
//! into nodes and relationships ready for
//! `arch_unit_core::store::AstCache::replace_file`. [`lowering::lower`] holds
//! the conversion shared by the tree-sitter-backed extractors (Go, Python,
//! TypeScript/JavaScript); Markdown, SQL, and OpenAPI build their nodes
//! directly since they have no call/import graph to resolve.
//!
//! Supported languages: Go, Python, TypeScript/JavaScript, Markdown, SQL, OpenAPI.

pub mod complexity;
pub mod lowering;
pub mod markdown;
pub mod openapi;
pub mod pipeline;
pub mod queries;
pub mod resolver;
pub mod sql;
pub mod treesitter;
pub mod walker;

pub mod go;
pub mod python;
pub mod typescript;
