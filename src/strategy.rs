//! Resolution of markdown and wiki link names from one source document.

use crate::document::{ElementKind, ResolveStrategy};
use crate::file_reference::FileReference;
use crate::path_info::{MARKDOWN_EXTENSION, PathInfo};

/// Where a link points after resolution.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", content = "target", rename_all = "kebab-case")]
pub enum LinkTarget {
    /// A repository or web URL.
    External(String),
    /// An existing file in the workspace.
    File(PathInfo),
}

impl std::fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::External(url) => f.write_str(url),
            Self::File(path) => write!(f, "{path}"),
        };
    }
}

/// Resolves link names written in `source`.
#[derive(Debug, Clone)]
pub struct LinkTargetStrategy {
    /// Kind of link being resolved.
    kind: ElementKind,
    /// Document the link is written in.
    source: FileReference,
}

impl LinkTargetStrategy {
    /// Resolve names of `kind` links written in `source`.
    pub const fn new(source: FileReference, kind: ElementKind) -> Self {
        return Self { kind, source };
    }

    /// `[[Page Name]]` resolves as a wiki page named `Page-Name`. Outside a
    /// wiki home a missing extension falls back to markdown.
    fn resolve_wiki_page(&self, name: &str) -> Option<FileReference> {
        let page = name.trim().replace(' ', "-");
        let resolved = self.source.resolve_link_ref_with_anchor_to_wiki_page(&page)?;
        if resolved.exists() || resolved.path().extension().is_some() {
            return Some(resolved);
        }
        return Some(resolved.with_extension(MARKDOWN_EXTENSION));
    }
}

impl ResolveStrategy for LinkTargetStrategy {
    type Output = LinkTarget;

    fn resolve_name(&self, name: &str) -> Vec<LinkTarget> {
        let resolved = match self.kind {
            ElementKind::WikiLink => self.resolve_wiki_page(name),
            ElementKind::Heading | ElementKind::Link => self.source.resolve_external_link_ref_with_anchor(name, true),
        };
        let Some(resolved) = resolved else {
            tracing::debug!(name, source = %self.source, "link escapes its source");
            return Vec::new();
        };
        if resolved.is_external() {
            return vec![LinkTarget::External(resolved.path().path_with_anchor())];
        }
        if resolved.exists() {
            return vec![LinkTarget::File(resolved.path().clone())];
        }
        tracing::debug!(name, target = %resolved, "link target missing");
        return Vec::new();
    }
}
