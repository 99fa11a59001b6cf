//! Rule OpenAPI Generator - OpenAPI documentation from a route table and validation rules.
//!
//! The library turns the routes registered in a web application into an OpenAPI 3.0
//! document. Request bodies and query parameters come from each handler's declarative
//! validation rules (`required|string|max:255`, `tags.*`, ...). Response codes are
//! inferred from the handler's source text.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`catalog`] - Route model and the collaborator traits feeding the generator
//! 2. [`manifest`] - File-backed route catalog and rule resolver
//! 3. [`source`] - File-backed handler source provider
//! 4. [`rules`] - Parses rule expressions into tokens
//! 5. [`schema_compiler`] - Compiles a rule declaration into a request schema
//! 6. [`responses`] - Infers response codes from handler source text
//! 7. [`path_item`] - Assembles the operation for one route and method
//! 8. [`openapi_builder`] - Collects path items into the complete document
//! 9. [`serializer`] - Serializes the document and writes the viewer page
//!
//! # Example Usage
//!
//! ```no_run
//! use rule_openapi::{
//!     cli::{build_document, OutputFormat},
//!     manifest::RouteManifest,
//!     openapi_builder::DocumentConfig,
//!     serializer::{serialize_yaml, write_artifacts},
//!     source::SourceTree,
//! };
//! use std::path::{Path, PathBuf};
//!
//! // Load routes and rules
//! let manifest = RouteManifest::load(Path::new("routes.yaml")).unwrap();
//!
//! // Index handler sources
//! let sources = SourceTree::scan(PathBuf::from("./app")).unwrap();
//!
//! // Build the OpenAPI document
//! let document = build_document(&manifest, &manifest, &sources, DocumentConfig::default());
//!
//! // Serialize to YAML, or write the document and viewer page
//! println!("{}", serialize_yaml(&document).unwrap());
//! write_artifacts(&document, Path::new("public"), OutputFormat::Yaml).unwrap();
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod catalog;
pub mod cli;
pub mod error;
pub mod manifest;
pub mod openapi_builder;
pub mod path_item;
pub mod responses;
pub mod rules;
pub mod schema_compiler;
pub mod serializer;
pub mod source;
