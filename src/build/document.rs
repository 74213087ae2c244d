use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::paths::source_path_to_url;
use crate::util::title_case;

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

// =============================================================================
// Documents
// =============================================================================

/// A content source unit rendered into one output page.
///
/// Documents are read fresh on every build; nothing about them is cached
/// between pipeline runs.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the content root (e.g., "posts/hello.md")
    pub source_path: PathBuf,
    /// The URL path this document will be served at (e.g., "/posts/hello")
    pub url_path: String,
    /// Front matter metadata
    pub front_matter: FrontMatter,
    /// The Markdown body without the front matter block
    pub body: String,
}

impl Document {
    /// Read and parse a document below `content_root`.
    pub fn load(content_root: &Path, source_path: &Path) -> Result<Self, DocumentError> {
        let full_path = content_root.join(source_path);
        let raw = std::fs::read_to_string(&full_path).map_err(|source| DocumentError::Read {
            path: full_path.clone(),
            source,
        })?;

        let parsed = parse_front_matter(&raw).map_err(|source| DocumentError::FrontMatter {
            path: full_path,
            source,
        })?;

        Ok(Self {
            source_path: source_path.to_path_buf(),
            url_path: source_path_to_url(source_path, ""),
            front_matter: parsed.front_matter,
            body: parsed.content,
        })
    }

    /// Get the document title, falling back to filename if not in front matter.
    pub fn title(&self) -> String {
        self.front_matter.title.clone().unwrap_or_else(|| {
            self.source_path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(title_case)
                .unwrap_or_else(|| "Untitled".to_string())
        })
    }
}

// =============================================================================
// Front matter
// =============================================================================

/// Front matter metadata parsed from the document.
///
/// Every recognized key is a typed, optional field; anything else lands
/// in `extra` and is handed to templates untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Page title (can override filename-derived title)
    pub title: Option<String>,
    /// Template selector; the theme's default layout applies when unset
    pub layout: Option<String>,
    /// Short description for listings and meta tags
    pub summary: Option<String>,
    /// Accepts a list or a comma-separated string
    #[serde(default, deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,
    pub published: Option<NaiveDate>,
    pub modified: Option<NaiveDate>,
    /// Content tags; accepts a list or a `;`-separated string
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    /// Additional arbitrary metadata (available in templates at top level, e.g., `page.author`)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => return Ok(Vec::new()),
        Some(OneOrMany::One(s)) => s.split(',').map(str::to_string).collect(),
        Some(OneOrMany::Many(list)) => list,
    };

    Ok(raw
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect())
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => return Ok(Vec::new()),
        Some(OneOrMany::One(s)) => s.split(';').map(str::to_string).collect(),
        Some(OneOrMany::Many(list)) => list,
    };

    Ok(normalize_tags(raw))
}

/// Trim, lowercase, drop empties and deduplicate. The result is sorted.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Result of parsing front matter from markdown content.
#[derive(Debug)]
pub struct ParsedContent {
    /// The parsed front matter (empty if none found)
    pub front_matter: FrontMatter,
    /// The markdown content without the front matter block
    pub content: String,
}

/// Parse front matter from markdown content.
///
/// Front matter is a YAML block delimited by `---` at the start of the file:
///
/// ```markdown
/// ---
/// title: My Page
/// layout: article
/// tags: rust; build tools
/// ---
///
/// # Content starts here
/// ```
///
/// Malformed YAML is an error; the page is not silently rendered with
/// default metadata.
pub fn parse_front_matter(content: &str) -> Result<ParsedContent, serde_yaml::Error> {
    let content = content.trim_start();

    // Check if content starts with front matter delimiter
    if !content.starts_with("---") {
        return Ok(ParsedContent {
            front_matter: FrontMatter::default(),
            content: content.to_string(),
        });
    }

    // Find the closing delimiter
    let after_opening = &content[3..];
    let Some(closing_pos) = after_opening.find("\n---") else {
        // No closing delimiter found, treat entire content as markdown
        return Ok(ParsedContent {
            front_matter: FrontMatter::default(),
            content: content.to_string(),
        });
    };

    let yaml_content = after_opening[..closing_pos].trim_start_matches(['\r', '\n']);

    // Skip the closing delimiter and the rest of its line
    let rest = &after_opening[closing_pos + 4..];
    let markdown_content = match rest.find('\n') {
        Some(eol) => rest[eol + 1..].trim_start_matches(['\r', '\n']).to_string(),
        None => String::new(),
    };

    let front_matter = if yaml_content.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(yaml_content)?
    };

    Ok(ParsedContent {
        front_matter,
        content: markdown_content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source_path: &str, front_matter: FrontMatter) -> Document {
        Document {
            source_path: PathBuf::from(source_path),
            url_path: source_path_to_url(Path::new(source_path), ""),
            front_matter,
            body: String::new(),
        }
    }

    #[test]
    fn test_document_title_fallback() {
        let doc = doc("posts/getting-started.md", FrontMatter::default());
        assert_eq!(doc.title(), "Getting Started");
        assert_eq!(doc.url_path, "/posts/getting-started");
    }

    #[test]
    fn test_document_title_from_front_matter() {
        let doc = doc(
            "intro.md",
            FrontMatter {
                title: Some("Welcome".to_string()),
                ..FrontMatter::default()
            },
        );
        assert_eq!(doc.title(), "Welcome");
    }

    #[test]
    fn test_parse_front_matter_recognized_fields() {
        let content = r#"---
title: My Page
layout: article
summary: A test page
keywords: rust, build , static site
published: 2023-01-05
modified: 2023-02-10
tags: Rust; build tools ;rust;
author: Jane
---

# Hello World
"#;
        let parsed = parse_front_matter(content).unwrap();
        let fm = parsed.front_matter;

        assert_eq!(fm.title.as_deref(), Some("My Page"));
        assert_eq!(fm.layout.as_deref(), Some("article"));
        assert_eq!(fm.summary.as_deref(), Some("A test page"));
        assert_eq!(fm.keywords, vec!["rust", "build", "static site"]);
        assert_eq!(fm.published, NaiveDate::from_ymd_opt(2023, 1, 5));
        assert_eq!(fm.modified, NaiveDate::from_ymd_opt(2023, 2, 10));
        assert_eq!(fm.tags, vec!["build tools", "rust"]);
        assert!(fm.extra.contains_key("author"));
        assert!(!fm.extra.contains_key("layout"));
        assert_eq!(parsed.content.trim(), "# Hello World");
    }

    #[test]
    fn test_parse_front_matter_list_forms() {
        let content = "---\nkeywords:\n  - one\n  - two\ntags:\n  - Web\n  - web\n  - ' CSS '\n---\nbody";
        let fm = parse_front_matter(content).unwrap().front_matter;

        assert_eq!(fm.keywords, vec!["one", "two"]);
        assert_eq!(fm.tags, vec!["css", "web"]);
    }

    #[test]
    fn test_parse_front_matter_no_front_matter() {
        let content = "# Just Markdown\n\nNo front matter here.";
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter, FrontMatter::default());
        assert!(parsed.content.starts_with("# Just Markdown"));
    }

    #[test]
    fn test_parse_front_matter_empty_front_matter() {
        let content = "---\n---\n\n# Content";
        let parsed = parse_front_matter(content).unwrap();
        assert_eq!(parsed.front_matter.title, None);
        assert!(parsed.content.starts_with("# Content"));
    }

    #[test]
    fn test_parse_front_matter_invalid_yaml_is_error() {
        let content = "---\ntitle: [unclosed\n---\nbody";
        assert!(parse_front_matter(content).is_err());
    }

    #[test]
    fn test_normalize_tags() {
        assert_eq!(
            normalize_tags(["  Foo", "bar", "", "FOO"]),
            vec!["bar".to_string(), "foo".to_string()]
        );
    }

    #[test]
    fn test_load_reports_path_on_bad_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.md"), "---\nlayout: [\n---\n").unwrap();

        let err = Document::load(dir.path(), Path::new("bad.md")).unwrap_err();
        assert!(err.to_string().contains("bad.md"));
    }
}
