use std::path::Path;

use crate::{
    InitArgs,
    config::{
        CONFIG_FILE_NAME, Config, DevConfig, LintTask, MarkdownConfig, PipelineConfig,
        SiteConfig, TagsConfig, ThemeConfig,
    },
};

const INDEX_MD: &str = "---
title: Welcome
tags: [Getting Started]
---

# Welcome

This page was generated by `staticweb init`. Edit `content/index.md` to get started.
";

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ page.title }} | {{ site.name }}</title>
  {% if stylesheet %}<link rel="stylesheet" href="{{ stylesheet | safe }}">{% endif %}
</head>
<body>
  <main>{{ content | safe }}</main>
  {% if tags %}
  <ul class="tags">
    {% for tag in tags %}<li><a href="{{ tag.url | safe }}">{{ tag.name }}</a></li>{% endfor %}
  </ul>
  {% endif %}
</body>
</html>
"#;

const TAG_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ tag.name }} | {{ site.name }}</title>
  {% if stylesheet %}<link rel="stylesheet" href="{{ stylesheet | safe }}">{% endif %}
</head>
<body>
  <h1>Pages tagged "{{ tag.name }}"</h1>
  <ul>
    {% for page in pages %}<li><a href="{{ page.url | safe }}">{{ page.title }}</a></li>{% endfor %}
  </ul>
</body>
</html>
"#;

const TAG_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Tags | {{ site.name }}</title>
  {% if stylesheet %}<link rel="stylesheet" href="{{ stylesheet | safe }}">{% endif %}
</head>
<body>
  <h1>Tags</h1>
  <ul>
    {% for tag in tags %}<li><a href="{{ tag.url | safe }}">{{ tag.name }}</a> ({{ tag.count }})</li>{% endfor %}
  </ul>
</body>
</html>
"#;

const STYLE_SCSS: &str = "$text: #222;

body {
  color: $text;
  font-family: sans-serif;
  margin: 0 auto;
  max-width: 48rem;
}
";

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            println!("Created directory {path}", path = path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    println!("Initializing project in {}", path.display());

    let config = default_config(&path);
    let config_text = serde_yaml::to_string(&config)?;

    let files = [
        (CONFIG_FILE_NAME.to_string(), config_text),
        ("content/index.md".to_string(), INDEX_MD.to_string()),
        ("theme/templates/page.html".to_string(), PAGE_HTML.to_string()),
        ("theme/templates/tag.html".to_string(), TAG_HTML.to_string()),
        (
            "theme/templates/tag_index.html".to_string(),
            TAG_INDEX_HTML.to_string(),
        ),
        ("theme/sass/style.scss".to_string(), STYLE_SCSS.to_string()),
    ];

    for (relative, contents) in files {
        let target = path.join(&relative);
        if write_new(&target, &contents).await? {
            println!("Created {}", target.display());
        } else {
            println!("Skipped {} (already exists)", target.display());
        }
    }

    Ok(())
}

fn default_config(path: &Path) -> Config {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "My Site".to_string());
    let site = SiteConfig {
        name,
        url: Some("https://example.org".into()),
        content: "content".into(),
        output: "build/html".into(),
    };
    let index = site.output.join("index.html").to_string_lossy().into_owned();

    Config {
        site,
        theme: ThemeConfig::default(),
        tags: TagsConfig::default(),
        markdown: MarkdownConfig::default(),
        pipeline: PipelineConfig::default(),
        lint: vec![LintTask {
            name: "linkcheck".into(),
            command: vec!["linkchecker".into(), "--no-status".into(), index],
            requires_build: true,
            accept_exit_codes: vec![0],
        }],
        dev: DevConfig::default(),
    }
}

/// Write `contents` unless the file already exists. Returns whether it
/// was written.
async fn write_new(path: &Path, contents: &str) -> Result<bool, std::io::Error> {
    if tokio::fs::try_exists(path).await? {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(true)
}
