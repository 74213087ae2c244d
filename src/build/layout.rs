//! Layout resolution: which template renders a document.

use super::document::FrontMatter;
use crate::config::ConfigError;

/// Selects the layout for a document from its front matter, falling back
/// to the theme's default.
///
/// Resolution never checks that the template exists; an unknown layout
/// surfaces when the page is rendered.
#[derive(Debug, Clone)]
pub struct LayoutResolver {
    default_layout: String,
}

impl LayoutResolver {
    /// Create a resolver. The default must not be blank.
    pub fn new(default_layout: impl Into<String>) -> Result<Self, ConfigError> {
        let default_layout = default_layout.into();
        if default_layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "the default layout must not be empty".to_string(),
            ));
        }
        Ok(Self { default_layout })
    }

    pub fn default_layout(&self) -> &str {
        &self.default_layout
    }

    /// The layout to render a document with. Always non-empty.
    pub fn resolve<'a>(&'a self, front_matter: &'a FrontMatter) -> &'a str {
        resolve_layout(front_matter.layout.as_deref(), &self.default_layout)
    }
}

/// Return `layout` verbatim when it is set and not blank, else `default`.
pub fn resolve_layout<'a>(layout: Option<&'a str>, default: &'a str) -> &'a str {
    match layout {
        Some(layout) if !layout.trim().is_empty() => layout,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::parse_front_matter;

    fn with_layout(layout: Option<&str>) -> FrontMatter {
        FrontMatter {
            layout: layout.map(str::to_string),
            ..FrontMatter::default()
        }
    }

    #[test]
    fn test_explicit_layout_wins() {
        let resolver = LayoutResolver::new("page").unwrap();
        assert_eq!(resolver.resolve(&with_layout(Some("article"))), "article");
    }

    #[test]
    fn test_missing_layout_uses_default() {
        let resolver = LayoutResolver::new("page").unwrap();
        assert_eq!(resolver.resolve(&FrontMatter::default()), "page");
    }

    #[test]
    fn test_blank_layout_uses_default() {
        let resolver = LayoutResolver::new("page").unwrap();
        assert_eq!(resolver.resolve(&with_layout(Some(""))), "page");
        assert_eq!(resolver.resolve(&with_layout(Some("   "))), "page");
    }

    #[test]
    fn test_layout_returned_verbatim() {
        // No existence check and no normalization
        assert_eq!(
            resolve_layout(Some("does-not-exist"), "page"),
            "does-not-exist"
        );
        assert_eq!(resolve_layout(Some("Article "), "page"), "Article ");
    }

    #[test]
    fn test_empty_default_rejected() {
        assert!(LayoutResolver::new("").is_err());
        assert!(LayoutResolver::new(" \t").is_err());
    }

    #[test]
    fn test_front_matter_to_layout() {
        let resolver = LayoutResolver::new("page").unwrap();
        let parsed =
            parse_front_matter("---\nlayout: article\n---\nbody").unwrap();
        assert_eq!(resolver.resolve(&parsed.front_matter), "article");

        let parsed = parse_front_matter("body only").unwrap();
        assert_eq!(resolver.resolve(&parsed.front_matter), "page");
    }
}
