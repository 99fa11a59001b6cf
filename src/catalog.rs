//! Route catalog model and the collaborator interfaces the generator reads from.
//!
//! The generator never inspects a web framework directly. It consumes three pure
//! data-fetching collaborators:
//!
//! - [`RouteCatalog`] enumerates the registered endpoints
//! - [`RuleDeclarationResolver`] finds the validation rules bound to a handler
//! - [`HandlerSourceProvider`] returns the raw source text of a handler
//!
//! File-backed implementations live in [`crate::manifest`] and [`crate::source`].

use crate::error::{Error, Result};
use crate::rules::RuleDeclaration;
use serde_json::Value;
use std::fmt;

/// Trait for enumerating the endpoints exposed by the service.
pub trait RouteCatalog {
    /// Returns every route in registration order.
    fn routes(&self) -> Vec<RouteDescriptor>;
}

/// Trait for resolving the validation rules attached to a request handler.
///
/// Resolution never fails hard: a handler without rules, or one whose rules cannot be
/// read, yields `None` and the route is documented without a request schema.
pub trait RuleDeclarationResolver {
    fn resolve(&self, action: &ActionRef) -> Option<ResolvedRules>;
}

/// Trait for reading the literal source text of a request handler.
pub trait HandlerSourceProvider {
    /// Returns the text spanning the handler definition, if it can be located.
    fn source_text(&self, action: &ActionRef) -> Option<String>;
}

/// Validation rules bound to one handler, plus the illustrative payload it may expose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRules {
    /// Field path -> rule expression, in declaration order
    pub rules: RuleDeclaration,
    /// Example request payload, used for documentation only
    pub example: Option<Value>,
}

/// A single registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// URI template with `{name}` placeholders, always starting with `/`
    pub uri: String,
    /// HTTP methods accepted by the route, in registration order
    pub methods: Vec<HttpMethod>,
    /// The handler serving the route
    pub action: ActionRef,
    /// Middleware applied to the route (e.g. `api`, `auth:sanctum`)
    pub middleware: Vec<String>,
}

/// Reference to a handler: the owning controller and the member serving the route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionRef {
    /// Fully qualified owner name (e.g. `App\Http\Controllers\PostController`)
    pub owner: String,
    /// Member name (e.g. `store`)
    pub member: String,
}

/// HTTP methods a route may be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP DELETE method
    Delete,
    /// HTTP PATCH method
    Patch,
    /// HTTP OPTIONS method
    Options,
    /// HTTP HEAD method
    Head,
}

impl HttpMethod {
    /// Parses a method name case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Lower-case key used under a path in the document
    pub fn key(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActionRef {
    pub fn new(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: member.into(),
        }
    }

    /// Parses `Owner@member`. An action without a member refers to an invokable owner.
    pub fn parse(action: &str) -> Result<Self> {
        let action = action.trim();
        let (owner, member) = match action.split_once('@') {
            Some((owner, member)) => (owner.trim(), member.trim()),
            None => (action, "__invoke"),
        };

        if owner.is_empty() || member.is_empty() {
            return Err(Error::InvalidAction(action.to_string()));
        }

        Ok(Self::new(owner, member))
    }

    /// Owner name without its namespace (`App\Http\Controllers\PostController` -> `PostController`)
    pub fn owner_basename(&self) -> &str {
        let after_backslash = self.owner.rsplit('\\').next().unwrap_or(&self.owner);
        after_backslash.rsplit("::").next().unwrap_or(after_backslash)
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.owner, self.member)
    }
}

impl RouteDescriptor {
    /// Create a new RouteDescriptor, normalizing the URI to a single leading slash
    pub fn new(uri: &str, methods: Vec<HttpMethod>, action: ActionRef) -> Self {
        Self {
            uri: format!("/{}", uri.trim_start_matches('/')),
            methods,
            action,
            middleware: Vec::new(),
        }
    }

    /// Builder-style helper for attaching middleware
    pub fn with_middleware<I, S>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware = middleware.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_with_member() {
        let action = ActionRef::parse("App\\Http\\Controllers\\PostController@store").unwrap();
        assert_eq!(action.owner, "App\\Http\\Controllers\\PostController");
        assert_eq!(action.member, "store");
        assert_eq!(action.owner_basename(), "PostController");
    }

    #[test]
    fn test_parse_invokable_action() {
        let action = ActionRef::parse("App\\Http\\Controllers\\PingController").unwrap();
        assert_eq!(action.member, "__invoke");
    }

    #[test]
    fn test_parse_action_rejects_empty_parts() {
        assert!(ActionRef::parse("@store").is_err());
        assert!(ActionRef::parse("PostController@").is_err());
    }

    #[test]
    fn test_owner_basename_with_path_separator() {
        let action = ActionRef::new("crate::handlers::UserController", "index");
        assert_eq!(action.owner_basename(), "UserController");
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse(" PATCH "), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("TRACE"), None);
        assert_eq!(HttpMethod::Delete.key(), "delete");
    }

    #[test]
    fn test_route_uri_normalization() {
        let action = ActionRef::new("PostController", "index");
        let route = RouteDescriptor::new("api/posts", vec![HttpMethod::Get], action.clone());
        assert_eq!(route.uri, "/api/posts");

        let route = RouteDescriptor::new("//api/posts", vec![HttpMethod::Get], action);
        assert_eq!(route.uri, "/api/posts");
    }
}
