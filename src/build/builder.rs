use std::path::{Component, Path, PathBuf};

use crate::config::{Config, ConfigError};

use super::document::{Document, DocumentError};
use super::layout::LayoutResolver;
use super::markdown::{MarkdownError, render_markdown};
use super::paths::page_output_path;
use super::render::{
    PageContext, PageInfo, RenderError, Renderer, SiteContext, TAG_INDEX_TEMPLATE,
    TagIndexContext, TagPageContext,
};
use super::source::{ContentItem, SourceError, discover_content};
use super::tags::{TagError, TagIndex, tag_index_url, tag_url};

/// Directory below the output root holding published theme assets.
pub const STATIC_DIR: &str = "_static";

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Document(#[from] DocumentError),

    #[error("markdown error in {path}: {source}")]
    Markdown {
        path: PathBuf,
        source: MarkdownError,
    },

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("tag error: {0}")]
    Tag(#[from] TagError),

    #[error("refusing to clear output directory {0}: it contains the project or its content")]
    UnsafeOutputDir(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    pub documents: usize,
    pub static_files: usize,
    /// Tag pages plus the overview
    pub tag_pages: usize,
}

/// The built-in content renderer: Markdown documents in, HTML tree out.
pub struct SiteBuilder {
    config: Config,
    /// Base path for resolving relative paths (typically the config file's directory)
    base_path: PathBuf,
}

impl SiteBuilder {
    pub fn new(config: Config, base_path: PathBuf) -> Self {
        Self { config, base_path }
    }

    pub fn build(&self) -> Result<BuildResult, BuildError> {
        // 1. Discover content
        // 2. Load templates and the layout resolver
        // 3. Reset the output tree and publish the stylesheet
        // 4. Parse every document and index its tags
        // 5. Render and write each document
        // 6. Render tag pages
        // 7. Copy static files

        let content_dir = self.base_path.join(&self.config.site.content);
        let items = discover_content(&content_dir)?;

        let resolver = LayoutResolver::new(self.config.theme.default_layout.clone())?;
        let renderer = Renderer::new(&self.base_path.join(self.config.theme.templates_dir()))?;

        let output_dir = self.output_dir();
        self.reset_output_dir(&output_dir, &content_dir)?;

        let stylesheet = self.publish_stylesheet(&output_dir)?;

        let mut documents = Vec::new();
        let mut static_files = Vec::new();
        for item in items {
            match item {
                ContentItem::Document(path) => {
                    documents.push(Document::load(&content_dir, &path)?);
                }
                ContentItem::Static(path) => static_files.push(path),
            }
        }

        let mut tag_index = TagIndex::new();
        for doc in &documents {
            tag_index.add(&doc.url_path, &doc.title(), &doc.front_matter.tags);
        }
        tag_index.check_urls(&self.config.tags)?;

        let site = SiteContext {
            name: self.config.site.name.clone(),
            url: self.config.site.url.clone(),
        };
        let theme_settings = &self.config.theme.settings;

        for doc in &documents {
            let layout = resolver.resolve(&doc.front_matter);
            let markdown = render_markdown(&doc.body, &self.config.markdown).map_err(|source| {
                BuildError::Markdown {
                    path: doc.source_path.clone(),
                    source,
                }
            })?;

            let front_matter = &doc.front_matter;
            let context = PageContext {
                site: site.clone(),
                page: PageInfo {
                    title: doc.title(),
                    url: doc.url_path.clone(),
                    summary: front_matter.summary.clone(),
                    keywords: front_matter.keywords.clone(),
                    published: front_matter.published,
                    modified: front_matter.modified,
                    tags: front_matter.tags.clone(),
                    extra: front_matter.extra.clone(),
                },
                content: markdown.html,
                toc: markdown.toc,
                theme: theme_settings.clone(),
                tags: tag_index.links_for(&front_matter.tags, &self.config.tags),
                stylesheet: stylesheet.clone(),
            };

            tracing::debug!(document = %doc.source_path.display(), layout, "rendering");
            let html = renderer.render_page(layout, &context, &doc.source_path)?;
            write_file(&page_output_path(&doc.url_path, &output_dir), html.as_bytes())?;
        }

        let tag_pages =
            self.write_tag_pages(&tag_index, &renderer, &site, &stylesheet, &output_dir)?;

        for path in &static_files {
            let target = output_dir.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(content_dir.join(path), &target)?;
        }

        tracing::info!(
            documents = documents.len(),
            static_files = static_files.len(),
            tag_pages,
            output = %output_dir.display(),
            "rendered site"
        );

        Ok(BuildResult {
            output_dir,
            documents: documents.len(),
            static_files: static_files.len(),
            tag_pages,
        })
    }

    fn write_tag_pages(
        &self,
        tag_index: &TagIndex,
        renderer: &Renderer,
        site: &SiteContext,
        stylesheet: &Option<String>,
        output_dir: &Path,
    ) -> Result<usize, BuildError> {
        let tags_config = &self.config.tags;
        let all_links = tag_index.all_links(tags_config);
        let mut written = 0;

        for ((tag, pages), link) in tag_index.iter().zip(all_links.iter()) {
            let url = tag_url(tag, tags_config);
            let context = TagPageContext {
                site: site.clone(),
                tag: link.clone(),
                url: url.clone(),
                pages,
                theme: self.config.theme.settings.clone(),
                stylesheet: stylesheet.clone(),
            };
            let html = renderer.render_tag_page(&context)?;
            write_file(&page_output_path(&url, output_dir), html.as_bytes())?;
            written += 1;
        }

        // An untagged site only gets an overview when the theme provides one
        if tag_index.is_empty() && !renderer.has_layout(TAG_INDEX_TEMPLATE) {
            return Ok(written);
        }

        let url = tag_index_url(tags_config);
        let context = TagIndexContext {
            site: site.clone(),
            url: url.clone(),
            tags: all_links,
            theme: self.config.theme.settings.clone(),
            stylesheet: stylesheet.clone(),
        };
        let html = renderer.render_tag_index(&context)?;
        write_file(&page_output_path(&url, output_dir), html.as_bytes())?;

        Ok(written + 1)
    }

    /// Copy the compiled stylesheet below `_static/` and return its URL.
    fn publish_stylesheet(&self, output_dir: &Path) -> Result<Option<String>, BuildError> {
        let Some(stylesheet) = &self.config.theme.stylesheet else {
            return Ok(None);
        };
        let source = self.base_path.join(stylesheet);
        let Some(file_name) = stylesheet.file_name() else {
            return Ok(None);
        };
        if !source.is_file() {
            tracing::warn!(path = %source.display(), "stylesheet not found, pages will link none");
            return Ok(None);
        }

        let target = output_dir.join(STATIC_DIR).join(file_name);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, &target)?;

        Ok(Some(format!(
            "/{}/{}",
            STATIC_DIR,
            file_name.to_string_lossy()
        )))
    }

    /// Start every build from an empty output tree so deleted documents
    /// do not linger.
    fn reset_output_dir(&self, output_dir: &Path, content_dir: &Path) -> Result<(), BuildError> {
        let unsafe_dir = || BuildError::UnsafeOutputDir(output_dir.to_path_buf());
        if self
            .config
            .site
            .output
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(unsafe_dir());
        }

        let output = resolve_existing(output_dir)?;
        let base = resolve_existing(&self.base_path)?;
        let content = resolve_existing(content_dir)?;
        if base.starts_with(&output) || content.starts_with(&output) || output.starts_with(&content)
        {
            return Err(unsafe_dir());
        }

        if output_dir.exists() {
            std::fs::remove_dir_all(output_dir)?;
        }
        std::fs::create_dir_all(output_dir)?;
        Ok(())
    }

    /// Get the output directory path, resolved against base_path.
    fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.config.site.output)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

/// Canonicalize the deepest existing ancestor of `path` and append the
/// rest, so symlinks and `.` components cannot hide where it points.
fn resolve_existing(path: &Path) -> Result<PathBuf, std::io::Error> {
    let lexical: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    for ancestor in lexical.ancestors() {
        if ancestor.exists() {
            let rest = lexical.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return Ok(ancestor.canonicalize()?.join(rest));
        }
    }
    Ok(lexical)
}
