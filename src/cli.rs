use crate::catalog::{HandlerSourceProvider, RouteCatalog, RuleDeclarationResolver};
use crate::manifest::{RouteFilter, RouteManifest};
use crate::openapi_builder::{DocumentConfig, OpenApiBuilder, OpenApiDocument};
use crate::path_item::PathItemAssembler;
use crate::serializer::{write_artifacts, Artifacts, VIEWER_FILE_NAME};
use crate::source::SourceTree;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Rule OpenAPI Generator - Generate OpenAPI documentation from a route table and validation rules
#[derive(Parser, Debug)]
#[command(name = "rule-openapi")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Route manifest listing routes and handler rules (YAML, or JSON by extension)
    #[arg(short = 'm', long = "manifest", value_name = "FILE", default_value = "routes.yaml")]
    pub manifest_path: PathBuf,

    /// Directory holding the handler source files
    #[arg(short = 's', long = "source", value_name = "DIR", default_value = "app")]
    pub source_root: PathBuf,

    /// Directory the document and viewer page are written to
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = "public")]
    pub output_dir: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Document title
    #[arg(long = "title", default_value = "Documentation")]
    pub title: String,

    /// Document version
    #[arg(long = "api-version", default_value = "1.0.0")]
    pub api_version: String,

    /// Base URL of the documented service
    #[arg(long = "server-url", env = "APP_URL", default_value = "http://localhost")]
    pub server_url: String,

    /// Only handlers under this namespace are documented (empty for all)
    #[arg(long = "namespace", default_value = "App\\Http\\Controllers")]
    pub namespace_prefix: String,

    /// Only routes carrying this middleware are documented (empty for all)
    #[arg(long = "middleware-group", default_value = "api")]
    pub middleware_group: String,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl CliArgs {
    /// Document metadata from the arguments
    pub fn document_config(&self) -> DocumentConfig {
        DocumentConfig {
            title: self.title.clone(),
            version: self.api_version.clone(),
            server_url: self.server_url.clone(),
        }
    }

    /// Route filter from the arguments
    pub fn route_filter(&self) -> RouteFilter {
        RouteFilter {
            namespace_prefix: self.namespace_prefix.clone(),
            middleware_group: self.middleware_group.clone(),
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.is_file() {
        anyhow::bail!(
            "Route manifest does not exist: {}",
            args.manifest_path.display()
        );
    }

    info!("Route manifest: {}", args.manifest_path.display());
    info!("Source root: {}", args.source_root.display());
    info!("Output directory: {}", args.output_dir.display());
    info!("Output format: {:?}", args.output_format);

    Ok(args)
}

/// Assembles the document for every catalog route.
///
/// Each route is handled on its own; a route whose rules or source cannot be read is
/// still documented, just with less detail.
pub fn build_document(
    catalog: &dyn RouteCatalog,
    resolver: &dyn RuleDeclarationResolver,
    sources: &dyn HandlerSourceProvider,
    config: DocumentConfig,
) -> OpenApiDocument {
    let assembler = PathItemAssembler::new(resolver, sources);
    let mut builder = OpenApiBuilder::with_config(config);

    for route in catalog.routes() {
        debug!("Adding route: {} {:?}", route.uri, route.methods);
        for item in assembler.assemble(&route) {
            builder.add_path_item(item);
        }
    }

    info!("Collected {} paths", builder.path_count());
    builder.build()
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<Artifacts> {
    info!("Starting OpenAPI document generation...");

    // Step 1: Load the route manifest
    let manifest = RouteManifest::load(&args.manifest_path)?.with_filter(args.route_filter());
    info!("Loaded {} routes", manifest.all_routes().len());

    // Step 2: Index handler sources
    let sources = match SourceTree::scan(args.source_root.clone()) {
        Ok(tree) => tree,
        Err(e) => {
            log::warn!("{}; response codes will fall back to defaults", e);
            SourceTree::empty(args.source_root.clone())
        }
    };

    // Step 3: Build the document
    let routes = manifest.routes();
    info!("{} routes belong to the API surface", routes.len());
    if routes.is_empty() {
        log::warn!("No routes found in the manifest");
    }

    let document = build_document(&manifest, &manifest, &sources, args.document_config());
    info!("OpenAPI document built successfully");

    // Step 4: Write the document and the viewer page
    let artifacts = write_artifacts(&document, &args.output_dir, args.output_format)?;
    info!("Wrote {}", artifacts.document.display());
    info!("Wrote {}", artifacts.viewer.display());

    println!(
        "Swagger document generated: {}/{}",
        args.server_url.trim_end_matches('/'),
        VIEWER_FILE_NAME
    );

    Ok(artifacts)
}
