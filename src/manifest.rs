//! Route manifest: a file-backed [`RouteCatalog`] and [`RuleDeclarationResolver`].
//!
//! The manifest lists the registered routes and, per handler, its validation rules and
//! an optional example payload:
//!
//! ```yaml
//! routes:
//!   - uri: api/posts/{post}
//!     methods: [PUT, PATCH]
//!     action: App\Http\Controllers\PostController@update
//!     middleware: [api, "auth:sanctum"]
//! handlers:
//!   App\Http\Controllers\PostController@update:
//!     rules:
//!       title: required|string|max:255
//!       tags.*: [string]
//!     example:
//!       title: Hello
//! ```
//!
//! Handler entries are decoded lazily, so one malformed entry only affects its own routes.

use crate::catalog::{
    ActionRef, HttpMethod, ResolvedRules, RouteCatalog, RouteDescriptor, RuleDeclarationResolver,
};
use crate::error::{Error, Result};
use crate::rules::{parse_declaration, RuleDeclaration};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Which routes belong to the documented API surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFilter {
    /// Owners must start with this prefix; empty accepts every owner
    pub namespace_prefix: String,
    /// Routes must carry this middleware; empty accepts every route
    pub middleware_group: String,
}

impl Default for RouteFilter {
    fn default() -> Self {
        Self {
            namespace_prefix: "App\\Http\\Controllers".to_string(),
            middleware_group: "api".to_string(),
        }
    }
}

impl RouteFilter {
    /// Filter that keeps every route
    pub fn accept_all() -> Self {
        Self {
            namespace_prefix: String::new(),
            middleware_group: String::new(),
        }
    }

    pub fn accepts(&self, route: &RouteDescriptor) -> bool {
        let owner_matches = route.action.owner.starts_with(&self.namespace_prefix);
        let group_matches = self.middleware_group.is_empty()
            || route.middleware.iter().any(|entry| *entry == self.middleware_group);
        owner_matches && group_matches
    }
}

/// Routes and handler rules loaded from a manifest file
#[derive(Debug, Clone)]
pub struct RouteManifest {
    routes: Vec<RouteDescriptor>,
    handlers: IndexMap<String, Value>,
    filter: RouteFilter,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    routes: Vec<RouteEntry>,
    #[serde(default)]
    handlers: IndexMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    uri: String,
    #[serde(default)]
    methods: Vec<String>,
    action: String,
    #[serde(default)]
    middleware: Vec<String>,
}

impl RouteManifest {
    /// Loads a manifest, choosing JSON for `.json` files and YAML otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading route manifest: {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| Error::ManifestError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        };

        parsed.map_err(|e| Error::ManifestError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ManifestFile = serde_yaml::from_str(content)?;
        Ok(Self::from_file(file))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: ManifestFile = serde_json::from_str(content)?;
        Ok(Self::from_file(file))
    }

    /// Replaces the default API surface filter
    pub fn with_filter(mut self, filter: RouteFilter) -> Self {
        self.filter = filter;
        self
    }

    /// All routes in the manifest, before filtering
    pub fn all_routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    fn from_file(file: ManifestFile) -> Self {
        let routes = file.routes.into_iter().filter_map(Self::to_descriptor).collect();

        Self {
            routes,
            handlers: file.handlers,
            filter: RouteFilter::default(),
        }
    }

    fn to_descriptor(entry: RouteEntry) -> Option<RouteDescriptor> {
        let action = match ActionRef::parse(&entry.action) {
            Ok(action) => action,
            Err(e) => {
                warn!("Skipping route {}: {}", entry.uri, e);
                return None;
            }
        };

        let methods = entry
            .methods
            .iter()
            .filter_map(|name| {
                let method = HttpMethod::parse(name);
                if method.is_none() {
                    warn!("Ignoring unknown HTTP method {} on route {}", name, entry.uri);
                }
                method
            })
            .collect();

        Some(RouteDescriptor::new(&entry.uri, methods, action).with_middleware(entry.middleware))
    }

    fn decode_handler(action: &ActionRef, entry: &Value) -> Result<ResolvedRules> {
        let entry = entry.as_object().ok_or_else(|| Error::InvalidRule {
            field: action.to_string(),
            message: "handler entry must be a mapping".to_string(),
        })?;

        let rules = match entry.get("rules") {
            Some(Value::Null) | None => RuleDeclaration::new(),
            Some(rules) => parse_declaration(rules)?,
        };

        Ok(ResolvedRules {
            rules,
            example: entry.get("example").filter(|example| !example.is_null()).cloned(),
        })
    }
}

impl RouteCatalog for RouteManifest {
    fn routes(&self) -> Vec<RouteDescriptor> {
        self.routes
            .iter()
            .filter(|route| {
                let accepted = self.filter.accepts(route);
                if !accepted {
                    debug!("Route {} ({}) is outside the API surface", route.uri, route.action);
                }
                accepted
            })
            .cloned()
            .collect()
    }
}

impl RuleDeclarationResolver for RouteManifest {
    fn resolve(&self, action: &ActionRef) -> Option<ResolvedRules> {
        let entry = self.handlers.get(&action.to_string())?;

        match Self::decode_handler(action, entry) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                warn!("Ignoring rules of {}: {}", action, e);
                None
            }
        }
    }
}
