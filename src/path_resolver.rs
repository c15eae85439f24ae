//! Resolve a link reference against the document that contains it.

use crate::path_info::{self, MARKDOWN_EXTENSION, PathInfo, WIKI_HOME_FILE_NAME};
use crate::rule::RuleChain;

/// The `(convert_wiki_home, with_anchor)` pair every entry point picks from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Redirect wiki-home targets to their home page and infer the markdown
    /// extension for wiki pages.
    pub convert_wiki_home: bool,
    /// Keep the link's `#anchor` on the result instead of discarding it.
    pub with_anchor: bool,
}

impl ResolveOptions {
    /// Path only, no wiki conversion.
    pub const PLAIN: Self = Self { convert_wiki_home: false, with_anchor: false };
    /// Wiki-page conversion, anchor discarded.
    pub const TO_WIKI_PAGE: Self = Self { convert_wiki_home: true, with_anchor: false };
    /// Anchor kept, no wiki conversion.
    pub const WITH_ANCHOR: Self = Self { convert_wiki_home: false, with_anchor: true };
    /// Anchor kept and wiki-page conversion.
    pub const WITH_ANCHOR_TO_WIKI_PAGE: Self = Self { convert_wiki_home: true, with_anchor: true };
}

/// Resolve `link_ref` relative to the document at `source`.
///
/// The link is split into segments and walked from the source's directory.
/// At each position the rule chain gets the first chance to reinterpret
/// the remaining segments; otherwise `..` climbs one level and any other
/// segment descends.
///
/// With a `project_root`, links starting with `/` are walked from it and
/// climbing above it clamps there. Otherwise climbing above an absolute
/// root or URL host clamps at that root. Climbing above the start of a
/// relative source cannot be made well-formed and yields `None`.
///
/// An empty link resolves to `source` itself and a bare `#anchor` to the
/// source document with that anchor.
pub fn resolve(
    source: &PathInfo,
    link_ref: &str,
    options: ResolveOptions,
    chain: &RuleChain<'_>,
    project_root: Option<&PathInfo>,
) -> Option<PathInfo> {
    if link_ref.is_empty() {
        return Some(source.clone());
    }

    let (target, anchor) = path_info::split_anchor(link_ref);
    let anchor = anchor.filter(|_| return options.with_anchor);

    if target.is_empty() {
        return Some(source.with_anchor(anchor));
    }
    if path_info::is_url(target) {
        return Some(PathInfo::parse(target).with_anchor(anchor));
    }

    let parts: Vec<&str> = target
        .split('/')
        .filter(|part| return !part.is_empty() && *part != ".")
        .collect();

    let project_root = project_root.filter(|root| return !root.is_external() && source.starts_with(root));
    let mut current = if target.starts_with('/') {
        project_root.cloned().unwrap_or_else(|| return source.root_path())
    } else {
        source.parent()?
    };

    let mut at = 0_usize;
    while let Some(part) = parts.get(at) {
        if let Some((replacement, consumed)) = chain.first_match(&current, &parts, at) {
            current = replacement;
            at = at.saturating_add(consumed);
            continue;
        }
        current = if *part == ".." {
            climb(current, link_ref, project_root)?
        } else {
            current.append(part)
        };
        at = at.saturating_add(1);
    }

    if options.convert_wiki_home && !current.is_external() {
        current = convert_wiki_page(current);
    }

    return Some(current.with_anchor(anchor));
}

/// Step up one directory, clamping at the project root or an absolute root.
fn climb(current: PathInfo, link_ref: &str, project_root: Option<&PathInfo>) -> Option<PathInfo> {
    if project_root.is_some_and(|root| return *root == current) {
        tracing::debug!(link_ref, root = %current, "clamping link at project root");
        return Some(current);
    }
    if let Some(parent) = current.parent() {
        return Some(parent);
    }
    if current.is_relative() {
        tracing::debug!(link_ref, "link escapes above a relative source");
        return None;
    }
    tracing::debug!(link_ref, root = %current, "clamping link at root");
    return Some(current);
}

/// Wiki-home targets become the home page; extensionless wiki pages become markdown.
fn convert_wiki_page(mut target: PathInfo) -> PathInfo {
    if target.is_wiki_home() {
        target = target.append(WIKI_HOME_FILE_NAME);
    }
    if target.is_wiki_page() && target.extension().is_none() {
        target = target.with_extension(MARKDOWN_EXTENSION);
    }
    return target;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{RepoInfo, RepositoryProvider};
    use crate::rule::{LinkRule, RuleContext};

    fn plain(source: &str, link: &str) -> Option<String> {
        let source = PathInfo::parse(source);
        return resolve(&source, link, ResolveOptions::PLAIN, &RuleChain::empty(), None).map(|p| return p.path_with_anchor());
    }

    #[test]
    fn empty_link_resolves_to_source() {
        for raw in ["/repo/docs/page.md", "docs/page.md", "https://github.com/org/repo/blob/main/x.md"] {
            let source = PathInfo::parse(raw);
            let resolved = resolve(&source, "", ResolveOptions::PLAIN, &RuleChain::empty(), None).unwrap();
            assert!(resolved.eq_with_anchor(&source), "{raw}");
        }
    }

    #[test]
    fn sibling_and_child_links() {
        assert_eq!(plain("/repo/docs/page.md", "other.md").as_deref(), Some("/repo/docs/other.md"));
        assert_eq!(plain("/repo/docs/page.md", "./img/a.png").as_deref(), Some("/repo/docs/img/a.png"));
        assert_eq!(plain("/repo/docs/page.md", "/abs/file.md").as_deref(), Some("/abs/file.md"));
    }

    #[test]
    fn balanced_parent_links_reach_ancestor_siblings() {
        let source = "/a/b/c/d/page.md";
        for depth in 0..4_usize {
            let link = format!("{}sibling.md", "../".repeat(depth));
            let source_info = PathInfo::parse(source);
            let mut expected = source_info.parent().unwrap();
            for _ in 0..depth {
                expected = expected.parent().unwrap();
            }
            assert_eq!(plain(source, &link), Some(expected.append("sibling.md").path()), "{link}");
        }
    }

    #[test]
    fn escaping_absolute_root_is_clamped() {
        assert_eq!(plain("/repo/page.md", "../../../x.md").as_deref(), Some("/x.md"));
    }

    #[test]
    fn escaping_project_root_is_clamped_at_the_project_root() {
        let root = PathInfo::parse("/home/me/project");
        let source = PathInfo::parse("/home/me/project/docs/guide.md");
        let chain = RuleChain::empty();
        let over = format!("{}README.md", "../".repeat(9));
        let resolved = resolve(&source, &over, ResolveOptions::PLAIN, &chain, Some(&root)).unwrap();
        assert_eq!(resolved.path(), "/home/me/project/README.md");

        let absolute = resolve(&source, "/README.md#top", ResolveOptions::WITH_ANCHOR, &chain, Some(&root)).unwrap();
        assert_eq!(absolute.path_with_anchor(), "/home/me/project/README.md#top");

        let balanced = resolve(&source, "../README.md", ResolveOptions::PLAIN, &chain, Some(&root)).unwrap();
        assert_eq!(balanced.path(), "/home/me/project/README.md");
    }

    #[test]
    fn project_root_is_ignored_for_sources_outside_it() {
        let root = PathInfo::parse("/home/me/project");
        let source = PathInfo::parse("/srv/docs/page.md");
        let resolved = resolve(&source, "../../../x.md", ResolveOptions::PLAIN, &RuleChain::empty(), Some(&root)).unwrap();
        assert_eq!(resolved.path(), "/x.md");
    }

    #[test]
    fn escaping_relative_source_has_no_result() {
        assert_eq!(plain("docs/page.md", "../x.md").as_deref(), Some("x.md"));
        assert_eq!(plain("docs/page.md", "../../x.md"), None);
    }

    #[test]
    fn anchor_is_kept_only_on_request() {
        let source = PathInfo::parse("/repo/docs/page.md");
        let chain = RuleChain::empty();
        let with = resolve(&source, "other.md#setup", ResolveOptions::WITH_ANCHOR, &chain, None).unwrap();
        let without = resolve(&source, "other.md#setup", ResolveOptions::PLAIN, &chain, None).unwrap();
        assert_eq!(with.anchor(), Some("setup"));
        assert_eq!(without.anchor(), None);
        assert!(with.without_anchor().eq_with_anchor(&without));
    }

    #[test]
    fn bare_anchor_points_at_source() {
        let source = PathInfo::parse("/repo/docs/page.md");
        let resolved = resolve(&source, "#intro", ResolveOptions::WITH_ANCHOR, &RuleChain::empty(), None).unwrap();
        assert_eq!(resolved.path_with_anchor(), "/repo/docs/page.md#intro");
    }

    #[test]
    fn absolute_urls_pass_through() {
        assert_eq!(
            plain("/repo/page.md", "https://example.com/a/../b").as_deref(),
            Some("https://example.com/b")
        );
    }

    #[test]
    fn wiki_home_converts_to_home_page() {
        let source = PathInfo::parse("/repo/repo.wiki/Page.md");
        let chain = RuleChain::empty();
        let home = resolve(&source, "../repo.wiki", ResolveOptions::TO_WIKI_PAGE, &chain, None).unwrap();
        assert_eq!(home.path(), "/repo/repo.wiki/Home.md");
        let kept = resolve(&source, "../repo.wiki", ResolveOptions::PLAIN, &chain, None).unwrap();
        assert_eq!(kept.path(), "/repo/repo.wiki");
    }

    #[test]
    fn wiki_pages_get_markdown_extension() {
        let source = PathInfo::parse("/repo/repo.wiki/Page.md");
        let chain = RuleChain::empty();
        let page = resolve(&source, "Other-Page#top", ResolveOptions::WITH_ANCHOR_TO_WIKI_PAGE, &chain, None).unwrap();
        assert_eq!(page.path_with_anchor(), "/repo/repo.wiki/Other-Page.md#top");
        let image = resolve(&source, "logo.png", ResolveOptions::TO_WIKI_PAGE, &chain, None).unwrap();
        assert_eq!(image.path(), "/repo/repo.wiki/logo.png");
    }

    #[test]
    fn rules_do_not_fire_on_plain_parent_links() {
        struct Panicking;
        impl RepositoryProvider for Panicking {
            fn lookup(&self, identity: &str) -> Result<Option<RepoInfo>, crate::error::Error> {
                panic!("unexpected lookup for {identity}");
            }
        }
        let builtin = LinkRule::repository_rules();
        let chain = RuleChain::new(&[], &builtin, RuleContext { repositories: Some(&Panicking) });
        let source = PathInfo::parse("/repo/docs/page.md");
        let resolved = resolve(&source, "../../README.md", ResolveOptions::PLAIN, &chain, None).unwrap();
        assert_eq!(resolved.path(), "/README.md");
    }

    #[test]
    fn custom_rule_replaces_matched_segments() {
        let rules = [LinkRule::custom(&[".."], "assets", |current| {
            return Some(PathInfo::parse("/cdn").append(current.file_name()));
        })];
        let chain = RuleChain::new(&rules, &[], RuleContext::default());
        let source = PathInfo::parse("/repo/docs/page.md");
        let resolved = resolve(&source, "../assets/logo.png", ResolveOptions::PLAIN, &chain, None).unwrap();
        assert_eq!(resolved.path(), "/cdn/docs/logo.png");
    }
}
