use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::config::Config;
use crate::document::ElementKind;
use crate::error::Error;

/// Inline markdown link or image: `[text](target "title")`.
const MARKDOWN_LINK: &str = r#"!?\[([^\]]*)\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#;

/// Wiki link with optional alias: `[[Page Name|shown text]]`.
const WIKI_LINK: &str = r"\[\[([^\]|]+)(?:\|[^\]]*)?\]\]";

/// One link found in a markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOccurrence {
    /// What kind of link was written.
    pub kind: ElementKind,
    /// 1-based line number.
    pub line: u32,
    /// Markdown file, relative to the scanned root.
    pub source: PathBuf,
    /// Link target exactly as written.
    pub target: String,
}

/// Extracts links from markdown files.
#[derive(Debug)]
pub struct Scanner {
    /// Matches `[text](target)`.
    markdown: Regex,
    /// Matches `[[Page]]`.
    wiki: Regex,
}

impl Scanner {
    /// Compile the link patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if a pattern fails to compile.
    pub fn new() -> Result<Self, Error> {
        return Ok(Self {
            markdown: Regex::new(MARKDOWN_LINK)?,
            wiki: Regex::new(WIKI_LINK)?,
        });
    }

    /// Scan every markdown file under `root` that the config allows.
    /// Occurrences are ordered by file, then line.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if any markdown file cannot be read.
    pub fn scan(&self, root: &Path, config: &Config) -> Result<Vec<LinkOccurrence>, Error> {
        let mut occurrences = Vec::new();
        for relative in markdown_files(root, config) {
            let content = std::fs::read_to_string(root.join(&relative))?;
            occurrences.extend(self.scan_content(&content, &relative));
        }
        return Ok(occurrences);
    }

    /// Extract links from one file's content. Fenced code blocks are skipped.
    pub fn scan_content(&self, content: &str, source: &Path) -> Vec<LinkOccurrence> {
        let mut occurrences = Vec::new();
        let mut in_fence = false;
        for (idx, text) in content.lines().enumerate() {
            if text.trim_start().starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }
            let line: u32 = idx.saturating_add(1).try_into().unwrap_or(u32::MAX);
            self.scan_line(text, line, source, &mut occurrences);
        }
        return occurrences;
    }

    /// Collect markdown and wiki links on a single line.
    fn scan_line(&self, text: &str, line: u32, source: &Path, occurrences: &mut Vec<LinkOccurrence>) {
        for cap in self.markdown.captures_iter(text) {
            let Some(target) = cap.get(2).map(|m| return m.as_str()) else {
                continue;
            };
            if target.starts_with("mailto:") {
                continue;
            }
            let kind = if target.starts_with('#') { ElementKind::Heading } else { ElementKind::Link };
            occurrences.push(LinkOccurrence {
                kind,
                line,
                source: source.to_path_buf(),
                target: target.to_owned(),
            });
        }
        for cap in self.wiki.captures_iter(text) {
            let Some(page) = cap.get(1).map(|m| return m.as_str().trim()) else {
                continue;
            };
            if page.is_empty() {
                continue;
            }
            occurrences.push(LinkOccurrence {
                kind: ElementKind::WikiLink,
                line,
                source: source.to_path_buf(),
                target: page.to_owned(),
            });
        }
    }
}

/// Markdown files under `root` that the config allows, relative to `root`, sorted.
pub fn markdown_files(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && is_markdown(e.path()))
        .filter_map(|e| return e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|relative| return config.should_scan(&relative.to_string_lossy()))
        .collect();
    files.sort();
    return files;
}

/// True for `.md` files.
pub fn is_markdown(path: &Path) -> bool {
    return path.extension().is_some_and(|ext| return ext.eq_ignore_ascii_case("md"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> Vec<LinkOccurrence> {
        return Scanner::new().unwrap().scan_content(content, Path::new("docs/guide.md"));
    }

    #[test]
    fn finds_markdown_links_and_images() {
        let found = scan("See [the readme](../README.md#usage \"Usage\") and ![logo](img/logo.png).");
        let targets: Vec<&str> = found.iter().map(|o| return o.target.as_str()).collect();
        assert_eq!(targets, ["../README.md#usage", "img/logo.png"]);
        assert!(found.iter().all(|o| return o.kind == ElementKind::Link && o.line == 1));
    }

    #[test]
    fn classifies_anchor_links_as_headings() {
        let found = scan("intro\n[jump](#setup)");
        assert_eq!(found.len(), 1);
        let first = found.first().unwrap();
        assert_eq!(first.kind, ElementKind::Heading);
        assert_eq!(first.line, 2);
    }

    #[test]
    fn finds_wiki_links_without_alias() {
        let found = scan("Read [[Getting Started|the intro]] then [[ FAQ ]].");
        let targets: Vec<&str> = found.iter().map(|o| return o.target.as_str()).collect();
        assert_eq!(targets, ["Getting Started", "FAQ"]);
        assert!(found.iter().all(|o| return o.kind == ElementKind::WikiLink));
    }

    #[test]
    fn skips_mail_links_and_code_fences() {
        let found = scan("[mail](mailto:a@b.c)\n```\n[code](x.md)\n```\n[after](y.md)");
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().map(|o| return o.line), Some(5));
    }

    #[test]
    fn walks_markdown_files_with_config_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/drafts")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("README.md"), "[a](docs/a.md)").unwrap();
        std::fs::write(dir.path().join("docs/a.md"), "[[Home]]").unwrap();
        std::fs::write(dir.path().join("docs/drafts/b.md"), "[b](b.md)").unwrap();
        std::fs::write(dir.path().join(".git/c.md"), "[c](c.md)").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "[d](d.md)").unwrap();

        let config = Config::parse("exclude = [\"docs/drafts/\"]").unwrap();
        assert_eq!(markdown_files(dir.path(), &config), [PathBuf::from("README.md"), PathBuf::from("docs/a.md")]);

        let found = Scanner::new().unwrap().scan(dir.path(), &config).unwrap();
        let sources: Vec<&Path> = found.iter().map(|o| return o.source.as_path()).collect();
        assert_eq!(sources, [Path::new("README.md"), Path::new("docs/a.md")]);
    }
}
