use crate::catalog::{ActionRef, HandlerSourceProvider};
use anyhow::Result;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never searched for handler sources
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "target"];

/// Handler source provider backed by a directory of controller files.
///
/// Files are indexed by stem, so the owner `App\Http\Controllers\PostController`
/// is looked up in the first file named `PostController.*`. The member body is cut out
/// of that file by matching braces from its declaration.
///
/// # Example
///
/// ```no_run
/// use rule_openapi::catalog::{ActionRef, HandlerSourceProvider};
/// use rule_openapi::source::SourceTree;
/// use std::path::PathBuf;
///
/// let tree = SourceTree::scan(PathBuf::from("./app")).unwrap();
/// let action = ActionRef::new("App\\Http\\Controllers\\PostController", "store");
/// if let Some(text) = tree.source_text(&action) {
///     println!("{}", text);
/// }
/// ```
pub struct SourceTree {
    root_path: PathBuf,
    /// File stem -> path of the first file found with that stem
    files: HashMap<String, PathBuf>,
}

impl SourceTree {
    /// Walks `root_path` and indexes every file by stem.
    ///
    /// Hidden directories and dependency/build directories are skipped. Entries that
    /// cannot be read are logged and left out of the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory does not exist.
    pub fn scan(root_path: PathBuf) -> Result<Self> {
        if !root_path.is_dir() {
            anyhow::bail!("Source root is not a directory: {}", root_path.display());
        }

        let mut files = HashMap::new();

        for entry in WalkDir::new(&root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && !SKIPPED_DIRS.iter().any(|dir| *dir == file_name)
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if !path.is_file() {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        files.entry(stem.to_string()).or_insert_with(|| path.to_path_buf());
                    }
                }
                Err(e) => warn!("Failed to access path: {}", e),
            }
        }

        debug!("Indexed {} source files under {}", files.len(), root_path.display());

        Ok(Self { root_path, files })
    }

    /// Tree with no files, for when the source root is unavailable
    pub fn empty(root_path: PathBuf) -> Self {
        Self {
            root_path,
            files: HashMap::new(),
        }
    }

    /// Root the tree was scanned from
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Path of the file holding `owner`, if indexed
    pub fn file_for(&self, action: &ActionRef) -> Option<&Path> {
        self.files.get(action.owner_basename()).map(PathBuf::as_path)
    }
}

impl HandlerSourceProvider for SourceTree {
    fn source_text(&self, action: &ActionRef) -> Option<String> {
        let path = self.file_for(action)?;

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        let body = extract_member(&content, &action.member);
        if body.is_none() {
            debug!("Member {} not found in {}", action.member, path.display());
        }
        body
    }
}

/// Cuts the definition of `member` out of `content`.
///
/// The definition starts at `function member(` or `fn member(` and ends at the brace
/// closing its body. Braces inside quoted strings are ignored. When the braces never
/// balance, the rest of the file is returned.
pub fn extract_member(content: &str, member: &str) -> Option<String> {
    let pattern = format!(r"\b(?:function|fn)\s+{}\s*[(<]", regex::escape(member));
    let declaration = Regex::new(&pattern).ok()?.find(content)?;

    let rest = &content[declaration.start()..];
    let open = rest.find('{')?;

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, ch) in rest[open..].char_indices() {
        if let Some(open_quote) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open_quote {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(rest[..open + index + 1].to_string());
                }
            }
            _ => {}
        }
    }

    Some(rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const CONTROLLER: &str = r#"<?php

class PostController extends Controller
{
    public function index()
    {
        return PostResource::collection(Post::paginate());
    }

    public function store(StorePostRequest $request)
    {
        $post = Post::create($request->validated());
        if ($post->title === '}') {
            abort(409);
        }
        return response()->json($post, 201);
    }
}
"#;

    #[test]
    fn test_extract_member_body() {
        let body = extract_member(CONTROLLER, "store").unwrap();

        assert!(body.starts_with("function store("));
        assert!(body.contains("abort(409)"));
        assert!(body.trim_end().ends_with('}'));
        assert!(!body.contains("function index"));
        assert!(!body.contains("class"));
    }

    #[test]
    fn test_extract_member_does_not_match_prefixes() {
        let content = "function storeMany() { abort(500); }\nfunction store() { abort(403); }";
        let body = extract_member(content, "store").unwrap();
        assert_eq!(body, "function store() { abort(403); }");
    }

    #[test]
    fn test_extract_rust_style_member() {
        let content = "impl Posts {\n    pub async fn show<T>(id: T) -> Json<Post> { find(id).or_not_found() }\n}";
        let body = extract_member(content, "show").unwrap();
        assert_eq!(body, "fn show<T>(id: T) -> Json<Post> { find(id).or_not_found() }");
    }

    #[test]
    fn test_extract_missing_member() {
        assert!(extract_member(CONTROLLER, "destroy").is_none());
    }

    #[test]
    fn test_unbalanced_body_returns_remainder() {
        let body = extract_member("function broken() { if (true) {", "broken").unwrap();
        assert_eq!(body, "function broken() { if (true) {");
    }

    #[test]
    fn test_scan_and_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("Http/Controllers")).unwrap();
        fs::create_dir_all(root.join("vendor/Http")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("Http/Controllers/PostController.php"), CONTROLLER).unwrap();
        fs::write(root.join("vendor/Http/UserController.php"), "function show() {}").unwrap();
        fs::write(root.join(".cache/TagController.php"), "function show() {}").unwrap();

        let tree = SourceTree::scan(root.to_path_buf()).unwrap();

        let action = ActionRef::new("App\\Http\\Controllers\\PostController", "store");
        let text = tree.source_text(&action).unwrap();
        assert!(text.contains("response()->json($post, 201)"));

        assert!(tree.source_text(&ActionRef::new("UserController", "show")).is_none());
        assert!(tree.source_text(&ActionRef::new("TagController", "show")).is_none());
        assert!(tree.source_text(&ActionRef::new("PostController", "destroy")).is_none());
    }

    #[test]
    fn test_scan_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        assert!(SourceTree::scan(temp_dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_empty_tree_finds_nothing() {
        let tree = SourceTree::empty(PathBuf::from("app"));
        assert_eq!(tree.root_path(), Path::new("app"));
        assert!(tree.source_text(&ActionRef::new("PostController", "store")).is_none());
    }
}
