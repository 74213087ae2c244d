//! Content tags: the index of tag → pages, and the URLs of tag pages.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::render::TagLink;
use crate::config::TagsConfig;
use crate::util::slugify;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TagError {
    #[error("tag '{0}' has no characters usable in a URL")]
    EmptySlug(String),

    #[error("tags '{first}' and '{second}' would both be published at {url}")]
    UrlCollision {
        first: String,
        second: String,
        url: String,
    },

    #[error("tag '{tag}' would be published at the tag overview URL {url}")]
    OverviewCollision { tag: String, url: String },
}

/// A document listed on a tag page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TaggedPage {
    pub url: String,
    pub title: String,
}

/// Every tag in the site and the documents carrying it, both sorted.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: BTreeMap<String, BTreeSet<TaggedPage>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document under each of its (already normalized) tags.
    pub fn add(&mut self, url: &str, title: &str, tags: &[String]) {
        for tag in tags {
            self.tags.entry(tag.clone()).or_default().insert(TaggedPage {
                url: url.to_string(),
                title: title.to_string(),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Every tag must get a page of its own: a non-empty slug, a URL no
    /// other tag maps to, and not the overview's URL.
    pub fn check_urls(&self, config: &TagsConfig) -> Result<(), TagError> {
        let overview = tag_index_url(config);
        let mut seen: BTreeMap<String, &str> = BTreeMap::new();

        for tag in self.tags.keys() {
            if slugify(tag).is_empty() {
                return Err(TagError::EmptySlug(tag.clone()));
            }
            let url = tag_url(tag, config);
            if url == overview {
                return Err(TagError::OverviewCollision {
                    tag: tag.clone(),
                    url,
                });
            }
            if let Some(first) = seen.insert(url.clone(), tag) {
                return Err(TagError::UrlCollision {
                    first: first.to_string(),
                    second: tag.clone(),
                    url,
                });
            }
        }
        Ok(())
    }

    /// Iterate tags in sorted order with their pages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec<TaggedPage>)> {
        self.tags
            .iter()
            .map(|(tag, pages)| (tag.as_str(), pages.iter().cloned().collect()))
    }

    /// Links for the given tags, in the order given.
    pub fn links_for(&self, tags: &[String], config: &TagsConfig) -> Vec<TagLink> {
        tags.iter()
            .map(|tag| TagLink {
                name: tag.clone(),
                url: tag_url(tag, config),
                count: self.tags.get(tag).map_or(0, BTreeSet::len),
            })
            .collect()
    }

    /// Links for every tag in the index.
    pub fn all_links(&self, config: &TagsConfig) -> Vec<TagLink> {
        self.tags
            .iter()
            .map(|(tag, pages)| TagLink {
                name: tag.clone(),
                url: tag_url(tag, config),
                count: pages.len(),
            })
            .collect()
    }
}

/// URL of a tag's page: `/<page_prefix>/<slug>`.
pub fn tag_url(tag: &str, config: &TagsConfig) -> String {
    let prefix = config.page_prefix.trim_matches('/');
    let slug = slugify(tag);
    if prefix.is_empty() {
        format!("/{}", slug)
    } else {
        format!("/{}/{}", prefix, slug)
    }
}

/// URL of the overview page listing every tag.
pub fn tag_index_url(config: &TagsConfig) -> String {
    format!("/{}", config.overview_url.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_index_groups_and_sorts() {
        let mut index = TagIndex::new();
        index.add("/posts/b", "B", &tags(&["rust", "web"]));
        index.add("/posts/a", "A", &tags(&["rust"]));

        let entries: Vec<_> = index.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "rust");
        let urls: Vec<&str> = entries[0].1.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["/posts/a", "/posts/b"]);
        assert_eq!(entries[1].0, "web");
    }

    #[test]
    fn test_empty_index() {
        let index = TagIndex::new();
        assert!(index.is_empty());
        assert!(index.all_links(&TagsConfig::default()).is_empty());
    }

    #[test]
    fn test_tag_urls() {
        let config = TagsConfig::default();
        assert_eq!(tag_url("build tools", &config), "/tags/build-tools");
        assert_eq!(tag_index_url(&config), "/tags");

        let config = TagsConfig {
            overview_url: "/topics/".to_string(),
            page_prefix: "".to_string(),
        };
        assert_eq!(tag_url("rust", &config), "/rust");
        assert_eq!(tag_index_url(&config), "/topics");
    }

    #[test]
    fn test_check_urls_rejects_shared_slug() {
        let mut index = TagIndex::new();
        index.add("/a", "A", &tags(&["c++"]));
        index.add("/b", "B", &tags(&["c#"]));

        let err = index.check_urls(&TagsConfig::default()).unwrap_err();
        assert_eq!(
            err,
            TagError::UrlCollision {
                first: "c#".to_string(),
                second: "c++".to_string(),
                url: "/tags/c".to_string(),
            }
        );
    }

    #[test]
    fn test_check_urls_rejects_empty_slug() {
        let mut index = TagIndex::new();
        index.add("/a", "A", &tags(&["rust", "???"]));

        assert_eq!(
            index.check_urls(&TagsConfig::default()),
            Err(TagError::EmptySlug("???".to_string()))
        );
    }

    #[test]
    fn test_check_urls_rejects_overview_url() {
        let config = TagsConfig {
            overview_url: "topics/all".to_string(),
            page_prefix: "topics".to_string(),
        };
        let mut index = TagIndex::new();
        index.add("/a", "A", &tags(&["all"]));

        assert!(matches!(
            index.check_urls(&config),
            Err(TagError::OverviewCollision { .. })
        ));
    }

    #[test]
    fn test_check_urls_accepts_distinct_tags() {
        let mut index = TagIndex::new();
        index.add("/a", "A", &tags(&["rust", "build tools", "web_dev"]));

        assert!(index.check_urls(&TagsConfig::default()).is_ok());
    }

    #[test]
    fn test_links_carry_counts() {
        let mut index = TagIndex::new();
        index.add("/a", "A", &tags(&["rust"]));
        index.add("/b", "B", &tags(&["rust", "web"]));

        let links = index.links_for(&tags(&["web", "rust"]), &TagsConfig::default());
        assert_eq!(links[0].name, "web");
        assert_eq!(links[0].count, 1);
        assert_eq!(links[1].count, 2);
    }
}
