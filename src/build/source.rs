use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("content path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("content path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

// =============================================================================
// Discovery
// =============================================================================

/// A file found below the content root, relative to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContentItem {
    /// A Markdown document to render
    Document(PathBuf),
    /// Any other file; copied verbatim
    Static(PathBuf),
}

impl ContentItem {
    pub fn path(&self) -> &Path {
        match self {
            ContentItem::Document(path) | ContentItem::Static(path) => path,
        }
    }
}

/// Walk the content root and classify every file.
///
/// Hidden entries are skipped along with everything below them. Items are
/// returned in sorted path order.
pub fn discover_content(content_root: &Path) -> Result<Vec<ContentItem>, SourceError> {
    if !content_root.exists() {
        return Err(SourceError::PathNotFound(content_root.to_path_buf()));
    }
    if !content_root.is_dir() {
        return Err(SourceError::NotADirectory(content_root.to_path_buf()));
    }

    let mut items = Vec::new();
    let walker = WalkDir::new(content_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|source| SourceError::Walk {
            path: content_root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(content_root) else {
            continue;
        };
        items.push(classify(relative.to_path_buf()));
    }

    items.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(items)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn classify(relative: PathBuf) -> ContentItem {
    let extension = relative
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("md" | "markdown") => ContentItem::Document(relative),
        _ => ContentItem::Static(relative),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_classifies_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("posts")).unwrap();
        std::fs::create_dir_all(root.join("images")).unwrap();
        std::fs::write(root.join("index.md"), "# Home").unwrap();
        std::fs::write(root.join("posts/b.markdown"), "").unwrap();
        std::fs::write(root.join("posts/a.md"), "").unwrap();
        std::fs::write(root.join("images/logo.png"), [0u8; 4]).unwrap();

        let items = discover_content(root).unwrap();

        assert_eq!(
            items,
            vec![
                ContentItem::Static(PathBuf::from("images/logo.png")),
                ContentItem::Document(PathBuf::from("index.md")),
                ContentItem::Document(PathBuf::from("posts/a.md")),
                ContentItem::Document(PathBuf::from("posts/b.markdown")),
            ]
        );
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".drafts")).unwrap();
        std::fs::write(root.join(".drafts/secret.md"), "").unwrap();
        std::fs::write(root.join(".DS_Store"), "").unwrap();
        std::fs::write(root.join("page.md"), "").unwrap();

        let items = discover_content(root).unwrap();

        assert_eq!(items, vec![ContentItem::Document(PathBuf::from("page.md"))]);
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_content(&dir.path().join("content"));
        assert!(matches!(result, Err(SourceError::PathNotFound(_))));
    }
}
