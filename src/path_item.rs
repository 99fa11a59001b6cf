//! Assembles one documented operation per route and HTTP method.
//!
//! For every method of a route (HEAD excluded) the assembler derives a tag and a summary
//! from the handler name, turns `{placeholder}` segments into integer path parameters,
//! compiles the handler's rules into a request body (or query parameters for GET), infers
//! the responses, and marks the operation as authenticated when the route's middleware
//! asks for it.
//!
//! PUT and PATCH are documented as POST with a required `_method` form field, the way
//! clients tunnel those methods through form submissions.

use crate::catalog::{
    HandlerSourceProvider, HttpMethod, ResolvedRules, RouteDescriptor, RuleDeclarationResolver,
};
use crate::openapi_builder::{
    bearer_requirement, MediaType, Operation, Parameter, ParameterLocation, PathItem, RequestBody,
};
use crate::responses::ResponseCodeInferencer;
use crate::schema_compiler::{
    CompiledSchema, Constraints, ContentType, ObjectSchema, SchemaCompiler, SchemaNode,
};
use heck::{ToSnakeCase, ToTitleCase};
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

/// Handler member -> action word used in summaries
pub const SUMMARY_ACTIONS: &[(&str, &str)] = &[
    ("store", "create"),
    ("update", "update"),
    ("destroy", "delete"),
    ("index", "list of"),
    ("show", "get"),
];

/// Middleware fragments that mark a route as authenticated
pub const AUTH_MARKERS: &[&str] = &["auth", "auth:sanctum", "auth:api", "auth:jwt", "optional.sanctum"];

/// Form field carrying the tunnelled method
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Suffix stripped from owner names before humanizing
const OWNER_SUFFIX: &str = "Controller";

/// Lookup tables used when naming and securing operations
#[derive(Debug, Clone, Copy)]
pub struct NamingRules {
    pub summary_actions: &'static [(&'static str, &'static str)],
    pub auth_markers: &'static [&'static str],
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            summary_actions: SUMMARY_ACTIONS,
            auth_markers: AUTH_MARKERS,
        }
    }
}

/// Builds path items from routes, reading rules and handler sources from collaborators
pub struct PathItemAssembler<'a> {
    resolver: &'a dyn RuleDeclarationResolver,
    sources: &'a dyn HandlerSourceProvider,
    inferencer: ResponseCodeInferencer,
    naming: NamingRules,
}

impl<'a> PathItemAssembler<'a> {
    /// Create an assembler with the default inference patterns and naming tables
    pub fn new(resolver: &'a dyn RuleDeclarationResolver, sources: &'a dyn HandlerSourceProvider) -> Self {
        Self {
            resolver,
            sources,
            inferencer: ResponseCodeInferencer::default(),
            naming: NamingRules::default(),
        }
    }

    pub fn with_inferencer(mut self, inferencer: ResponseCodeInferencer) -> Self {
        self.inferencer = inferencer;
        self
    }

    pub fn with_naming(mut self, naming: NamingRules) -> Self {
        self.naming = naming;
        self
    }

    /// Path items for every surfaced method of `route`
    pub fn assemble(&self, route: &RouteDescriptor) -> Vec<PathItem> {
        let resolved = self.resolver.resolve(&route.action);
        let source = self.sources.source_text(&route.action).unwrap_or_else(|| {
            debug!("No source text for {}, inferring from nothing", route.action);
            String::new()
        });

        route
            .methods
            .iter()
            .filter(|method| **method != HttpMethod::Head)
            .map(|method| self.assemble_method(route, *method, resolved.as_ref(), &source))
            .collect()
    }

    /// Path item for one method, given the already resolved rules and source text
    pub fn assemble_method(
        &self,
        route: &RouteDescriptor,
        method: HttpMethod,
        resolved: Option<&ResolvedRules>,
        source: &str,
    ) -> PathItem {
        debug!("Assembling {} {}", method, route.uri);

        let owner = route.action.owner_basename();
        let mut parameters = path_parameters(&route.uri);
        let tunnelled = matches!(method, HttpMethod::Put | HttpMethod::Patch);

        let request_body = match resolved {
            Some(resolved) => {
                let compiled = SchemaCompiler::compile(&resolved.rules, resolved.example.as_ref());
                if method == HttpMethod::Get {
                    parameters.extend(query_parameters(compiled.schema));
                    None
                } else {
                    let CompiledSchema {
                        mut schema,
                        content_type,
                    } = compiled;
                    if tunnelled {
                        schema.insert_required(METHOD_OVERRIDE_FIELD, SchemaNode::single_value(method.as_str()));
                    }
                    Some(request_body(content_type, schema))
                }
            }
            None if tunnelled => {
                let mut schema = ObjectSchema::default();
                schema.insert_required(METHOD_OVERRIDE_FIELD, SchemaNode::single_value(method.as_str()));
                Some(request_body(ContentType::Multipart, schema))
            }
            None => None,
        };

        let responses = self.inferencer.infer(
            source,
            resolved.is_some(),
            resolved.and_then(|resolved| resolved.example.as_ref()),
        );

        let security = requires_auth(&route.middleware, self.naming.auth_markers).then(bearer_requirement);

        let operation = Operation {
            tags: vec![humanize_tag(owner)],
            summary: summarize(owner, &route.action.member, self.naming.summary_actions),
            parameters,
            request_body,
            responses,
            security,
        };

        PathItem {
            uri: route.uri.clone(),
            method: if tunnelled {
                HttpMethod::Post.key()
            } else {
                method.key()
            },
            operation,
        }
    }
}

fn request_body(content_type: ContentType, schema: ObjectSchema) -> RequestBody {
    let mut content = IndexMap::new();
    content.insert(
        content_type.as_str().to_string(),
        MediaType {
            schema: Some(SchemaNode::Object(schema)),
            example: None,
        },
    );
    RequestBody { content }
}

/// Unfolds the top-level properties of a compiled schema into query parameters
fn query_parameters(schema: ObjectSchema) -> Vec<Parameter> {
    let required = schema.required;
    schema
        .properties
        .into_iter()
        .map(|(name, node)| Parameter {
            required: required.contains(&name),
            name,
            location: ParameterLocation::Query,
            schema: node,
        })
        .collect()
}

/// Required integer path parameters for each `{name}` placeholder
pub fn path_parameters(uri: &str) -> Vec<Parameter> {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    let placeholder_re =
        PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("Invalid regex constant"));

    placeholder_re
        .captures_iter(uri)
        .map(|captures| Parameter {
            name: captures[1].to_string(),
            location: ParameterLocation::Path,
            required: true,
            schema: SchemaNode::Integer(Constraints::default()),
        })
        .collect()
}

/// `PostCommentController` -> `Post Comment`. Acronyms stay one word:
/// `APIKeyController` -> `Api Key`.
pub fn humanize_tag(owner: &str) -> String {
    owner.replace(OWNER_SUFFIX, "").to_title_case()
}

/// `store` on `PostCommentController` -> `create post comment`; unknown members pass through
pub fn summarize(owner: &str, member: &str, actions: &[(&str, &str)]) -> String {
    let Some((_, action)) = actions.iter().find(|(name, _)| *name == member) else {
        return member.to_string();
    };

    let mut resource = owner.replace(OWNER_SUFFIX, "").to_snake_case().replace('_', " ");
    if member == "index" {
        resource = pluralize(&resource);
    }

    format!("{} {}", action, resource).trim_end().to_string()
}

fn pluralize(resource: &str) -> String {
    match resource.strip_suffix('y') {
        Some(stem) => format!("{}ies", stem),
        None => format!("{}s", resource),
    }
}

/// Whether any middleware contains an authentication marker
pub fn requires_auth(middleware: &[String], markers: &[&str]) -> bool {
    middleware
        .iter()
        .any(|entry| markers.iter().any(|marker| entry.contains(marker)))
}
