//! Serialization module for converting OpenAPI documents to YAML or JSON format.
//!
//! This module provides functions to serialize OpenAPI documents into standard formats,
//! write them to disk, and emit the HTML viewer page that loads the written artifact.

use crate::cli::OutputFormat;
use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the viewer page written next to the document
pub const VIEWER_FILE_NAME: &str = "docs.html";

/// Paths of the files written by [`write_artifacts`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// The serialized OpenAPI document
    pub document: PathBuf,
    /// The HTML viewer page
    pub viewer: PathBuf,
}

/// Serializes an OpenAPI document to YAML format.
///
/// Nested mappings and sequences are written in block style, one entry per line.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc)
        .context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc)
        .context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Missing parent directories are created first.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// File name of the serialized document for a format
pub fn document_file_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Yaml => "api-docs.yaml",
        OutputFormat::Json => "api-docs.json",
    }
}

/// Swagger UI page loading the document from `/<document_name>`
pub fn viewer_html(document_name: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Swagger UI</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist/swagger-ui.css" />
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://unpkg.com/swagger-ui-dist/swagger-ui-bundle.js"></script>
<script>
    SwaggerUIBundle({{
        url: '/{}',
        dom_id: "#swagger-ui"
    }});
</script>
</body>
</html>
"##,
        document_name
    )
}

/// Serializes `doc` and writes it, plus the viewer page, into `output_dir`.
///
/// Nothing is written when serialization fails.
pub fn write_artifacts(doc: &OpenApiDocument, output_dir: &Path, format: OutputFormat) -> Result<Artifacts> {
    let content = match format {
        OutputFormat::Yaml => serialize_yaml(doc)?,
        OutputFormat::Json => serialize_json(doc)?,
    };

    let name = document_file_name(format);
    let artifacts = Artifacts {
        document: output_dir.join(name),
        viewer: output_dir.join(VIEWER_FILE_NAME),
    };

    write_to_file(&content, &artifacts.document)?;
    write_to_file(&viewer_html(name), &artifacts.viewer)?;

    Ok(artifacts)
}
