use pretty_assertions::assert_eq;
use regex::Regex;
use rule_openapi::{
    catalog::{ActionRef, HandlerSourceProvider, HttpMethod, RouteCatalog, RouteDescriptor},
    cli::{build_document, run, CliArgs, OutputFormat},
    manifest::{RouteFilter, RouteManifest},
    openapi_builder::{DocumentConfig, OpenApiDocument},
    path_item::PathItemAssembler,
    responses::{ResponseCodeInferencer, ResponsePatterns},
    serializer::{serialize_json, serialize_yaml},
    source::SourceTree,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn load_fixture_manifest() -> RouteManifest {
    RouteManifest::load(&fixtures_dir().join("routes.yaml")).expect("Failed to load fixture manifest")
}

fn load_fixture_sources() -> SourceTree {
    SourceTree::scan(fixtures_dir().join("app")).expect("Failed to scan fixture sources")
}

/// Builds the fixture document and returns it as a JSON value for inspection
fn generate_fixture_document() -> (OpenApiDocument, Value) {
    let manifest = load_fixture_manifest();
    let sources = load_fixture_sources();

    let document = build_document(&manifest, &manifest, &sources, DocumentConfig::default());
    let json = serialize_json(&document).expect("Failed to serialize document");
    let value: Value = serde_json::from_str(&json).expect("Generated JSON should be valid");

    (document, value)
}

fn response_codes(operation: &Value) -> Vec<String> {
    operation["responses"]
        .as_object()
        .expect("responses should be a mapping")
        .keys()
        .cloned()
        .collect()
}

#[test]
fn test_document_header() {
    let (_, doc) = generate_fixture_document();

    assert_eq!(doc["openapi"], "3.0.0");
    assert_eq!(doc["info"], json!({"title": "Documentation", "version": "1.0.0"}));
    assert_eq!(
        doc["servers"],
        json!([{"url": "http://localhost", "description": "Base API URL"}])
    );
    assert_eq!(
        doc["components"]["securitySchemes"]["bearerAuth"],
        json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"})
    );
}

#[test]
fn test_only_api_routes_are_documented() {
    let (document, _) = generate_fixture_document();

    let uris: Vec<_> = document.paths.keys().cloned().collect();
    assert_eq!(
        uris,
        vec!["/api/posts", "/api/posts/{post}", "/api/users/{user}/avatar"]
    );

    for methods in document.paths.values() {
        assert!(!methods.contains_key("head"), "HEAD must never be documented");
    }
}

#[test]
fn test_get_rules_become_query_parameters() {
    let (_, doc) = generate_fixture_document();
    let index = &doc["paths"]["/api/posts"]["get"];

    assert_eq!(index["tags"], json!(["Post"]));
    assert_eq!(index["summary"], "list of posts");
    assert!(index.get("requestBody").is_none());
    assert!(index.get("security").is_none());
    assert_eq!(
        index["parameters"],
        json!([
            {
                "name": "search",
                "in": "query",
                "required": false,
                "schema": {"type": "string", "nullable": true, "maxLength": 100}
            },
            {
                "name": "page",
                "in": "query",
                "required": false,
                "schema": {"type": "integer", "minimum": 1}
            }
        ])
    );
    assert_eq!(response_codes(index), vec!["422"]);
}

#[test]
fn test_store_request_body() {
    let (_, doc) = generate_fixture_document();
    let store = &doc["paths"]["/api/posts"]["post"];

    assert_eq!(store["summary"], "create post");
    assert_eq!(store["security"], json!([{"bearerAuth": []}]));
    assert_eq!(store["parameters"], json!([]));

    let schema = &store["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["required"], json!(["title", "status"]));
    assert_eq!(schema["example"], json!({"title": "Hello", "status": "draft"}));

    let properties = &schema["properties"];
    assert_eq!(properties["title"], json!({"type": "string", "maxLength": 255}));
    assert_eq!(properties["body"], json!({"type": "string"}));
    assert_eq!(properties["published"], json!({"type": "boolean", "enum": [0, 1]}));
    assert_eq!(
        properties["status"],
        json!({"type": "string", "enum": ["draft", "published"]})
    );
    assert_eq!(
        properties["tags"],
        json!({"type": "array", "items": {"type": "string", "maxLength": 32}})
    );
    assert_eq!(
        properties["meta"],
        json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "key": {"type": "string"},
                    "value": {"type": "string", "nullable": true}
                }
            }
        })
    );
}

#[test]
fn test_store_responses_with_example() {
    let (_, doc) = generate_fixture_document();
    let responses = &doc["paths"]["/api/posts"]["post"]["responses"];

    assert_eq!(
        response_codes(&doc["paths"]["/api/posts"]["post"]),
        vec!["201", "422", "1"]
    );
    assert_eq!(responses["201"]["description"], "Response 201");
    assert_eq!(
        responses["201"]["content"]["application/json"]["schema"],
        json!({"type": "object"})
    );
    assert_eq!(
        responses["1"],
        json!({
            "description": "Example",
            "content": {"application/json": {"example": {"title": "Hello", "status": "draft"}}}
        })
    );
}

#[test]
fn test_show_without_rules() {
    let (_, doc) = generate_fixture_document();
    let show = &doc["paths"]["/api/posts/{post}"]["get"];

    assert_eq!(show["summary"], "get post");
    assert!(show.get("requestBody").is_none());
    assert_eq!(
        show["parameters"],
        json!([{"name": "post", "in": "path", "required": true, "schema": {"type": "integer"}}])
    );
    assert_eq!(response_codes(show), vec!["404", "200"]);
}

#[test]
fn test_put_and_patch_are_tunnelled_through_post() {
    let (_, doc) = generate_fixture_document();
    let methods = doc["paths"]["/api/posts/{post}"].as_object().unwrap();

    let keys: Vec<_> = methods.keys().cloned().collect();
    assert_eq!(keys, vec!["get", "post", "delete"]);

    // PATCH is registered after PUT and replaces it
    let update = &methods["post"];
    assert_eq!(update["summary"], "update post");
    let schema = &update["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(schema["required"], json!(["_method"]));
    assert_eq!(schema["properties"]["_method"], json!({"type": "string", "enum": ["PATCH"]}));
    assert_eq!(
        schema["properties"]["title"],
        json!({"type": "string", "minLength": 3, "maxLength": 255})
    );
    assert_eq!(response_codes(update), vec!["404", "200", "422"]);
}

#[test]
fn test_destroy_codes() {
    let (_, doc) = generate_fixture_document();
    let destroy = &doc["paths"]["/api/posts/{post}"]["delete"];

    assert_eq!(destroy["summary"], "delete post");
    assert!(destroy.get("requestBody").is_none());
    assert_eq!(response_codes(destroy), vec!["204", "404", "403"]);
}

#[test]
fn test_file_upload_uses_multipart() {
    let (_, doc) = generate_fixture_document();
    let upload = &doc["paths"]["/api/users/{user}/avatar"]["post"];

    assert_eq!(upload["tags"], json!(["User Avatar"]));
    assert_eq!(upload["summary"], "create user avatar");
    assert_eq!(upload["parameters"][0]["name"], "user");

    let content = upload["requestBody"]["content"].as_object().unwrap();
    assert_eq!(content.keys().collect::<Vec<_>>(), vec!["multipart/form-data"]);
    assert_eq!(
        content["multipart/form-data"]["schema"],
        json!({"type": "object", "properties": {"avatar": {"type": "file"}}, "required": ["avatar"]})
    );
    assert_eq!(response_codes(upload), vec!["201", "422"]);
}

#[test]
fn test_every_operation_has_a_response() {
    let (document, _) = generate_fixture_document();

    for (uri, methods) in &document.paths {
        for (method, operation) in methods {
            assert!(
                !operation.responses.codes.is_empty(),
                "{} {} has no responses",
                method,
                uri
            );
        }
    }
}

#[test]
fn test_missing_sources_fall_back_to_ok() {
    let manifest = load_fixture_manifest();
    let sources = SourceTree::empty(PathBuf::from("missing"));

    let document = build_document(&manifest, &manifest, &sources, DocumentConfig::default());
    let show = &document.paths["/api/posts/{post}"]["get"];

    assert_eq!(show.responses.codes.keys().collect::<Vec<_>>(), vec!["200"]);
    assert_eq!(show.responses.codes["200"].description, "OK");
    assert!(show.responses.codes["200"].content.is_none());

    // Rules still contribute 422 without any source text
    let store = &document.paths["/api/posts"]["post"];
    assert_eq!(store.responses.codes.keys().collect::<Vec<_>>(), vec!["422"]);
}

#[test]
fn test_accept_all_filter_includes_web_routes() {
    let manifest = load_fixture_manifest().with_filter(RouteFilter::accept_all());
    let sources = load_fixture_sources();

    let document = build_document(&manifest, &manifest, &sources, DocumentConfig::default());
    assert!(document.paths.contains_key("/dashboard"));
}

#[test]
fn test_custom_config() {
    let manifest = load_fixture_manifest();
    let sources = load_fixture_sources();
    let config = DocumentConfig {
        title: "Blog API".to_string(),
        version: "2.1.0".to_string(),
        server_url: "https://blog.example.com".to_string(),
    };

    let document = build_document(&manifest, &manifest, &sources, config);
    assert_eq!(document.info.title, "Blog API");
    assert_eq!(document.info.version, "2.1.0");
    assert_eq!(document.servers[0].url, "https://blog.example.com");
}

#[test]
fn test_generation_is_deterministic() {
    let manifest = load_fixture_manifest();
    let sources = load_fixture_sources();

    let first = build_document(&manifest, &manifest, &sources, DocumentConfig::default());
    let second = build_document(&manifest, &manifest, &sources, DocumentConfig::default());

    assert_eq!(serialize_yaml(&first).unwrap(), serialize_yaml(&second).unwrap());
}

#[test]
fn test_yaml_output_parses_back() {
    let (document, json_value) = generate_fixture_document();

    let yaml = serialize_yaml(&document).unwrap();
    let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("Generated YAML should be valid");

    assert_eq!(
        parsed["paths"]["/api/posts"]["post"]["summary"].as_str(),
        json_value["paths"]["/api/posts"]["post"]["summary"].as_str()
    );
    assert_eq!(
        parsed["paths"]["/api/posts/{post}"]["delete"]["responses"]["403"]["description"].as_str(),
        Some("Response 403")
    );
}

struct InlineSources(&'static str);

impl HandlerSourceProvider for InlineSources {
    fn source_text(&self, _action: &ActionRef) -> Option<String> {
        Some(self.0.to_string())
    }
}

struct InlineCatalog(Vec<RouteDescriptor>);

impl RouteCatalog for InlineCatalog {
    fn routes(&self) -> Vec<RouteDescriptor> {
        self.0.clone()
    }
}

#[test]
fn test_custom_response_patterns() {
    let manifest = RouteManifest::from_yaml_str("routes: []").unwrap();
    let sources = InlineSources("throw_unless($user->isAdmin(), 403); return ok($post);");
    let route = RouteDescriptor::new(
        "api/posts/{post}",
        vec![HttpMethod::Get],
        ActionRef::new("App\\Http\\Controllers\\PostController", "show"),
    );

    let patterns = ResponsePatterns {
        response_call: Regex::new(r"\bok\(").unwrap(),
        abort_call: Regex::new(r"\bthrow_unless\(.*?,\s*(\d{3})\)").unwrap(),
        ..Default::default()
    };
    let assembler = PathItemAssembler::new(&manifest, &sources)
        .with_inferencer(ResponseCodeInferencer::new(patterns));

    let items = assembler.assemble(&route);
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].operation.responses.codes.keys().collect::<Vec<_>>(),
        vec!["200", "403"]
    );
}

#[test]
fn test_build_document_from_custom_catalog() {
    let manifest = RouteManifest::from_yaml_str("routes: []").unwrap();
    let sources = InlineSources("return response()->json($items);");
    let catalog = InlineCatalog(vec![
        RouteDescriptor::new(
            "api/items",
            vec![HttpMethod::Get, HttpMethod::Head, HttpMethod::Options],
            ActionRef::new("ItemController", "index"),
        ),
        RouteDescriptor::new("api/ping", vec![], ActionRef::new("PingController", "__invoke")),
    ]);

    let document = build_document(&catalog, &manifest, &sources, DocumentConfig::default());

    let item_methods: Vec<_> = document.paths["/api/items"].keys().cloned().collect();
    assert_eq!(item_methods, vec!["get", "options"]);
    assert_eq!(document.paths["/api/items"]["get"].summary, "list of items");
    // A route without methods contributes nothing
    assert!(!document.paths.contains_key("/api/ping"));
}

fn cli_args(output_dir: &Path, format: OutputFormat) -> CliArgs {
    CliArgs {
        manifest_path: fixtures_dir().join("routes.yaml"),
        source_root: fixtures_dir().join("app"),
        output_dir: output_dir.to_path_buf(),
        output_format: format,
        title: "Documentation".to_string(),
        api_version: "1.0.0".to_string(),
        server_url: "http://localhost".to_string(),
        namespace_prefix: "App\\Http\\Controllers".to_string(),
        middleware_group: "api".to_string(),
        verbose: false,
    }
}

#[test]
fn test_run_writes_document_and_viewer() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("public");

    let artifacts = run(cli_args(&output_dir, OutputFormat::Yaml)).expect("Generation should succeed");

    assert_eq!(artifacts.document, output_dir.join("api-docs.yaml"));
    assert_eq!(artifacts.viewer, output_dir.join("docs.html"));

    let yaml = std::fs::read_to_string(&artifacts.document).unwrap();
    let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed["info"]["title"].as_str(), Some("Documentation"));

    let html = std::fs::read_to_string(&artifacts.viewer).unwrap();
    assert!(html.contains("url: '/api-docs.yaml'"));
}

#[test]
fn test_run_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("public");

    let first = run(cli_args(&output_dir, OutputFormat::Json)).unwrap();
    let first_content = std::fs::read_to_string(&first.document).unwrap();

    let second = run(cli_args(&output_dir, OutputFormat::Json)).unwrap();
    let second_content = std::fs::read_to_string(&second.document).unwrap();

    assert_eq!(first_content, second_content);
}

#[test]
fn test_run_with_missing_source_root_still_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let mut args = cli_args(&temp_dir.path().join("out"), OutputFormat::Json);
    args.source_root = temp_dir.path().join("no-such-dir");

    let artifacts = run(args).unwrap();
    assert!(artifacts.document.exists());
}

#[test]
fn test_run_with_missing_manifest_fails() {
    let temp_dir = TempDir::new().unwrap();
    let mut args = cli_args(&temp_dir.path().join("out"), OutputFormat::Yaml);
    args.manifest_path = temp_dir.path().join("missing.yaml");

    assert!(run(args).is_err());
    assert!(!temp_dir.path().join("out").join("api-docs.yaml").exists());
}
