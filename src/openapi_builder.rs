use crate::schema_compiler::SchemaNode;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Key under which the illustrative example response is published
pub const EXAMPLE_RESPONSE_KEY: &str = "1";

/// Name of the bearer security scheme referenced by authenticated operations
pub const BEARER_SCHEME: &str = "bearerAuth";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// Document metadata
    config: DocumentConfig,
    /// URI -> lower-case method -> operation, in catalog order
    paths: IndexMap<String, IndexMap<String, Operation>>,
}

/// Static document metadata
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentConfig {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// Base URL of the service
    pub server_url: String,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

/// OpenAPI Server object
#[derive(Debug, Clone, Serialize)]
pub struct Server {
    pub url: String,
    pub description: String,
}

/// One operation placed at a URI and method key
#[derive(Debug, Clone)]
pub struct PathItem {
    /// URI template (e.g. `/api/posts/{post}`)
    pub uri: String,
    /// Lower-case method key (e.g. `post`)
    pub method: String,
    /// The operation itself
    pub operation: Operation,
}

/// OpenAPI Operation object
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub tags: Vec<String>,
    pub summary: String,
    /// Path and query parameters
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: Responses,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<IndexMap<String, Vec<String>>>>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query)
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: SchemaNode,
}

/// Where a parameter is carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    /// Content type -> media type; a single entry
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// Responses of one operation.
///
/// The example is kept apart from the status codes and only joins them, under
/// [`EXAMPLE_RESPONSE_KEY`], when serialized.
#[derive(Debug, Clone, Default)]
pub struct Responses {
    /// Status code -> response
    pub codes: IndexMap<String, Response>,
    /// Documentation-only example response
    pub example: Option<Response>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize)]
pub struct Components {
    #[serde(rename = "securitySchemes")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

/// HTTP security scheme
#[derive(Debug, Clone, Serialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    pub scheme: String,
    #[serde(rename = "bearerFormat")]
    pub bearer_format: String,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    pub info: Info,
    pub servers: Vec<Server>,
    /// URI -> lower-case method -> operation
    pub paths: IndexMap<String, IndexMap<String, Operation>>,
    pub components: Components,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: "Documentation".to_string(),
            version: "1.0.0".to_string(),
            server_url: "http://localhost".to_string(),
        }
    }
}

impl Response {
    /// Response without a body description
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            content: None,
        }
    }

    /// Response with a single `application/json` media type
    pub fn json(description: impl Into<String>, media: MediaType) -> Self {
        let mut content = IndexMap::new();
        content.insert("application/json".to_string(), media);
        Self {
            description: description.into(),
            content: Some(content),
        }
    }
}

impl Responses {
    /// Whether a status code is documented
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }
}

impl Serialize for Responses {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.codes.len() + usize::from(self.example.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (code, response) in &self.codes {
            map.serialize_entry(code, response)?;
        }
        if let Some(example) = &self.example {
            map.serialize_entry(EXAMPLE_RESPONSE_KEY, example)?;
        }
        map.end()
    }
}

impl SecurityScheme {
    /// Bearer token carrying a JWT
    pub fn bearer_jwt() -> Self {
        Self {
            scheme_type: "http".to_string(),
            scheme: "bearer".to_string(),
            bearer_format: "JWT".to_string(),
        }
    }
}

/// Security requirement referencing the bearer scheme
pub fn bearer_requirement() -> Vec<IndexMap<String, Vec<String>>> {
    let mut requirement = IndexMap::new();
    requirement.insert(BEARER_SCHEME.to_string(), Vec::new());
    vec![requirement]
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default metadata
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    /// Create a builder with custom metadata
    pub fn with_config(config: DocumentConfig) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            config,
            paths: IndexMap::new(),
        }
    }

    /// Add an assembled path item. A later item for the same URI and method replaces
    /// the earlier one.
    pub fn add_path_item(&mut self, item: PathItem) {
        debug!("Adding path item: {} {}", item.method, item.uri);

        let methods = self.paths.entry(item.uri.clone()).or_default();
        if methods.contains_key(&item.method) {
            warn!(
                "Operation {} {} is defined more than once, keeping the last one",
                item.method, item.uri
            );
        }
        methods.insert(item.method, item.operation);
    }

    /// Number of distinct URIs collected so far
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let mut security_schemes = IndexMap::new();
        security_schemes.insert(BEARER_SCHEME.to_string(), SecurityScheme::bearer_jwt());

        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: Info {
                title: self.config.title,
                version: self.config.version,
            },
            servers: vec![Server {
                url: self.config.server_url,
                description: "Base API URL".to_string(),
            }],
            paths: self.paths,
            components: Components { security_schemes },
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn operation(summary: &str) -> Operation {
        let mut responses = Responses::default();
        responses.codes.insert("200".to_string(), Response::described("OK"));
        Operation {
            tags: vec!["Post".to_string()],
            summary: summary.to_string(),
            parameters: Vec::new(),
            request_body: None,
            responses,
            security: None,
        }
    }

    fn path_item(uri: &str, method: &str, summary: &str) -> PathItem {
        PathItem {
            uri: uri.to_string(),
            method: method.to_string(),
            operation: operation(summary),
        }
    }

    #[test]
    fn test_new_builder() {
        let builder = OpenApiBuilder::new();

        assert_eq!(builder.config.title, "Documentation");
        assert_eq!(builder.config.version, "1.0.0");
        assert_eq!(builder.path_count(), 0);
    }

    #[test]
    fn test_build_document_structure() {
        let config = DocumentConfig {
            title: "Blog API".to_string(),
            version: "2.1.0".to_string(),
            server_url: "https://blog.test".to_string(),
        };
        let mut builder = OpenApiBuilder::with_config(config);
        builder.add_path_item(path_item("/api/posts", "get", "list of posts"));

        let document = serde_json::to_value(builder.build()).unwrap();

        assert_eq!(document["openapi"], "3.0.0");
        assert_eq!(document["info"], json!({"title": "Blog API", "version": "2.1.0"}));
        assert_eq!(
            document["servers"],
            json!([{"url": "https://blog.test", "description": "Base API URL"}])
        );
        assert_eq!(
            document["components"]["securitySchemes"]["bearerAuth"],
            json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"})
        );
        assert_eq!(
            document["paths"]["/api/posts"]["get"]["responses"],
            json!({"200": {"description": "OK"}})
        );
    }

    #[test]
    fn test_methods_grouped_under_uri() {
        let mut builder = OpenApiBuilder::new();
        builder.add_path_item(path_item("/api/posts", "get", "list of posts"));
        builder.add_path_item(path_item("/api/posts", "post", "create post"));
        builder.add_path_item(path_item("/api/posts/{post}", "get", "get post"));

        let document = builder.build();

        assert_eq!(document.paths.len(), 2);
        let methods: Vec<_> = document.paths["/api/posts"].keys().cloned().collect();
        assert_eq!(methods, vec!["get", "post"]);
    }

    #[test]
    fn test_paths_follow_insertion_order() {
        let mut builder = OpenApiBuilder::new();
        for uri in ["/api/z", "/api/a", "/api/m"] {
            builder.add_path_item(path_item(uri, "get", "get"));
        }

        let uris: Vec<_> = builder.build().paths.keys().cloned().collect();
        assert_eq!(uris, vec!["/api/z", "/api/a", "/api/m"]);
    }

    #[test]
    fn test_later_item_replaces_earlier_one() {
        let mut builder = OpenApiBuilder::new();
        builder.add_path_item(path_item("/api/posts/{post}", "post", "first"));
        builder.add_path_item(path_item("/api/posts/{post}", "post", "second"));

        let document = builder.build();
        assert_eq!(document.paths["/api/posts/{post}"]["post"].summary, "second");
    }

    #[test]
    fn test_example_response_serialized_last() {
        let mut responses = Responses::default();
        responses.codes.insert("201".to_string(), Response::described("Response 201"));
        responses.example = Some(Response::json(
            "Example",
            MediaType {
                schema: None,
                example: Some(json!({"title": "Hello"})),
            },
        ));

        let value = serde_json::to_string(&responses).unwrap();
        assert_eq!(
            value,
            r#"{"201":{"description":"Response 201"},"1":{"description":"Example","content":{"application/json":{"example":{"title":"Hello"}}}}}"#
        );
    }

    #[test]
    fn test_bearer_requirement_shape() {
        let requirement = serde_json::to_value(bearer_requirement()).unwrap();
        assert_eq!(requirement, json!([{"bearerAuth": []}]));
    }
}
