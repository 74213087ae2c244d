use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tera::{Context, Tera};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("theme templates not found: {0}")]
    ThemeNotFound(String),

    #[error("no template for layout '{layout}' (needed by {document})")]
    TemplateNotFound { layout: String, document: PathBuf },
}

/// Template used for a single tag's page.
pub const TAG_TEMPLATE: &str = "tag";
/// Template used for the overview of all tags.
pub const TAG_INDEX_TEMPLATE: &str = "tag_index";

/// The template renderer, wrapping Tera.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Create a new renderer loading `*.html` templates from the given directory.
    pub fn new(templates_path: &Path) -> Result<Self, RenderError> {
        if !templates_path.is_dir() {
            return Err(RenderError::ThemeNotFound(
                templates_path.display().to_string(),
            ));
        }

        let glob = templates_path.join("**/*.html");
        let glob_str = glob.to_string_lossy();
        let tera = Tera::new(&glob_str)?;

        Ok(Self { tera })
    }

    /// Whether `<layout>.html` was loaded.
    pub fn has_layout(&self, layout: &str) -> bool {
        self.tera
            .get_template_names()
            .any(|name| name == template_name(layout))
    }

    /// Render a page with its resolved layout.
    ///
    /// `document` names the source in the error when the layout has no
    /// template.
    pub fn render_page(
        &self,
        layout: &str,
        context: &PageContext,
        document: &Path,
    ) -> Result<String, RenderError> {
        self.require(layout, document)?;

        let mut tera_context = Context::new();
        tera_context.insert("site", &context.site);
        tera_context.insert("page", &context.page);
        tera_context.insert("content", &context.content);
        tera_context.insert("toc", &context.toc);
        tera_context.insert("theme", &context.theme);
        tera_context.insert("tags", &context.tags);
        tera_context.insert("stylesheet", &context.stylesheet);

        Ok(self.tera.render(&template_name(layout), &tera_context)?)
    }

    /// Render the page listing every document carrying `context.tag`.
    pub fn render_tag_page(&self, context: &TagPageContext) -> Result<String, RenderError> {
        self.require(TAG_TEMPLATE, Path::new(&context.url))?;

        let mut tera_context = Context::new();
        tera_context.insert("site", &context.site);
        tera_context.insert("tag", &context.tag);
        tera_context.insert("pages", &context.pages);
        tera_context.insert("theme", &context.theme);
        tera_context.insert("stylesheet", &context.stylesheet);

        Ok(self.tera.render(&template_name(TAG_TEMPLATE), &tera_context)?)
    }

    /// Render the overview of all tags.
    pub fn render_tag_index(&self, context: &TagIndexContext) -> Result<String, RenderError> {
        self.require(TAG_INDEX_TEMPLATE, Path::new(&context.url))?;

        let mut tera_context = Context::new();
        tera_context.insert("site", &context.site);
        tera_context.insert("tags", &context.tags);
        tera_context.insert("theme", &context.theme);
        tera_context.insert("stylesheet", &context.stylesheet);

        Ok(self
            .tera
            .render(&template_name(TAG_INDEX_TEMPLATE), &tera_context)?)
    }

    fn require(&self, layout: &str, document: &Path) -> Result<(), RenderError> {
        if self.has_layout(layout) {
            Ok(())
        } else {
            Err(RenderError::TemplateNotFound {
                layout: layout.to_string(),
                document: document.to_path_buf(),
            })
        }
    }
}

fn template_name(layout: &str) -> String {
    format!("{}.html", layout)
}

/// Context passed to page templates.
#[derive(Debug, Serialize)]
pub struct PageContext {
    pub site: SiteContext,
    pub page: PageInfo,
    pub content: String,
    /// Table of contents for the current page
    pub toc: Vec<TocEntry>,
    /// Theme settings from config, accessible as `theme.*` in templates
    pub theme: serde_json::Value,
    /// The page's own tags, linked to their tag pages
    pub tags: Vec<TagLink>,
    /// Site-relative URL of the published stylesheet
    pub stylesheet: Option<String>,
}

/// Site-level information.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub name: String,
    pub url: Option<String>,
}

/// Information about the current page.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub published: Option<NaiveDate>,
    pub modified: Option<NaiveDate>,
    pub tags: Vec<String>,
    /// Custom front matter fields (flattened to top level, e.g., `page.author`)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

/// A table of contents entry for the current page.
#[derive(Debug, Clone, Serialize)]
pub struct TocEntry {
    /// The heading text
    pub text: String,
    /// The heading id (for anchor links)
    pub id: String,
    /// The heading level (1-6)
    pub level: u8,
}

/// A tag and the URL of its page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagLink {
    pub name: String,
    pub url: String,
    /// Number of documents carrying the tag
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TagPageContext {
    pub site: SiteContext,
    pub tag: TagLink,
    pub url: String,
    pub pages: Vec<super::tags::TaggedPage>,
    pub theme: serde_json::Value,
    pub stylesheet: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TagIndexContext {
    pub site: SiteContext,
    pub url: String,
    pub tags: Vec<TagLink>,
    pub theme: serde_json::Value,
    pub stylesheet: Option<String>,
}
