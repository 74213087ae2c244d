//! Path and URL conversion utilities.
//!
//! This module handles conversions between:
//! - Source file paths (relative paths within the content directory)
//! - URL paths (the URL at which content will be served)
//! - Output file paths (where files are written in the output directory)

use std::path::{Path, PathBuf};

/// Convert a Markdown file path to a URL path.
///
/// Takes a source-relative path and a URL prefix, produces a URL path.
///
/// # Examples
/// ```ignore
/// source_path_to_url("about.md", "") => "/about"
/// source_path_to_url("posts/hello.md", "") => "/posts/hello"
/// source_path_to_url("posts/index.md", "") => "/posts"
/// source_path_to_url("index.md", "") => "/"
/// ```
pub fn source_path_to_url(path: &Path, url_prefix: &str) -> String {
    let mut url = url_prefix.to_string();
    // Ensure we have a trailing slash for appending the path
    // (empty prefix becomes "/" which is then trimmed if needed)
    if url.is_empty() || !url.ends_with('/') {
        url.push('/');
    }

    // Remove the extension and convert path separators
    let path_str = path.with_extension("").to_string_lossy().to_string();
    let path_str = path_str.replace('\\', "/");

    // Handle index files - they become the directory URL
    let path_str = if path_str.ends_with("/index") || path_str == "index" {
        path_str
            .trim_end_matches("/index")
            .trim_end_matches("index")
            .to_string()
    } else {
        path_str
    };

    url.push_str(&path_str);

    // Normalize: remove trailing slash unless it's the root
    if url.len() > 1 && url.ends_with('/') {
        url.pop();
    }

    // Ensure we have at least a slash
    if url.is_empty() {
        url = "/".to_string();
    }

    url
}

/// Convert a page URL path to its output file path.
///
/// Every page becomes `path/index.html`, so URLs stay extension-free.
///
/// # Examples
/// ```ignore
/// page_output_path("/posts/hello", output_dir) => output_dir/posts/hello/index.html
/// page_output_path("/", output_dir) => output_dir/index.html
/// ```
pub fn page_output_path(url_path: &str, output_dir: &Path) -> PathBuf {
    let url_path = url_path.trim_matches('/');

    if url_path.is_empty() {
        output_dir.join("index.html")
    } else {
        output_dir.join(url_path).join("index.html")
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
