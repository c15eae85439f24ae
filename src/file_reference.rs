//! File references: resolved paths bound to an optional workspace.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::path_info::PathInfo;
use crate::path_resolver::{self, ResolveOptions};
use crate::rule::{LinkRule, RuleChain};
use crate::workspace::Workspace;

/// A path plus the workspace it was resolved in.
///
/// Every `resolve_*` and `with_*` operation returns a new reference bound
/// to the same workspace. References bound to different workspaces are
/// never equal and never ordered.
#[derive(Debug, Clone)]
pub struct FileReference {
    /// The referenced path.
    path: PathInfo,
    /// Workspace context, if any.
    workspace: Option<Arc<Workspace>>,
}

impl FileReference {
    /// Bind `path` to a workspace.
    pub const fn new(path: PathInfo, workspace: Arc<Workspace>) -> Self {
        return Self { path, workspace: Some(workspace) };
    }

    /// A reference with no workspace: plain path arithmetic only.
    pub const fn detached(path: PathInfo) -> Self {
        return Self { path, workspace: None };
    }

    /// The referenced path.
    pub const fn path(&self) -> &PathInfo {
        return &self.path;
    }

    /// The bound workspace.
    pub fn workspace(&self) -> Option<&Arc<Workspace>> {
        return self.workspace.as_ref();
    }

    /// True when both references are bound to the same workspace, or both to none.
    pub fn same_workspace(&self, other: &Self) -> bool {
        return match (&self.workspace, &other.workspace) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            (Some(_), None) | (None, Some(_)) => false,
        };
    }

    /// Wrap a resolved path in the same workspace.
    fn derive(&self, path: PathInfo) -> Self {
        return Self { path, workspace: self.workspace.clone() };
    }

    /// Resolve `link_ref` from this document with explicit options and caller rules.
    /// Only the caller's rules are consulted, never the workspace's built-in ones.
    pub fn resolve_link_ref_with(&self, link_ref: &str, options: ResolveOptions, rules: &[LinkRule]) -> Option<Self> {
        let workspace = self.workspace.as_deref();
        let context = workspace.map(Workspace::rule_context).unwrap_or_default();
        let chain = RuleChain::new(rules, &[], context);
        let root = workspace.and_then(Workspace::root);
        return path_resolver::resolve(&self.path, link_ref, options, &chain, root).map(|path| return self.derive(path));
    }

    /// Resolve a link, discarding its anchor.
    pub fn resolve_link_ref(&self, link_ref: &str) -> Option<Self> {
        return self.resolve_link_ref_with(link_ref, ResolveOptions::PLAIN, &[]);
    }

    /// Resolve a link, keeping its anchor.
    pub fn resolve_link_ref_with_anchor(&self, link_ref: &str) -> Option<Self> {
        return self.resolve_link_ref_with(link_ref, ResolveOptions::WITH_ANCHOR, &[]);
    }

    /// Resolve a link as a wiki page, discarding its anchor.
    pub fn resolve_link_ref_to_wiki_page(&self, link_ref: &str) -> Option<Self> {
        return self.resolve_link_ref_with(link_ref, ResolveOptions::TO_WIKI_PAGE, &[]);
    }

    /// Resolve a link as a wiki page, keeping its anchor.
    pub fn resolve_link_ref_with_anchor_to_wiki_page(&self, link_ref: &str) -> Option<Self> {
        return self.resolve_link_ref_with(link_ref, ResolveOptions::WITH_ANCHOR_TO_WIKI_PAGE, &[]);
    }

    /// Resolve a link that may point at the repository's wiki, issues,
    /// pulls, pulse or graphs pages. Caller rules run first, then the
    /// workspace's built-in repository rules. Wiki-home conversion is on.
    pub fn resolve_external_link_ref_with(&self, link_ref: &str, with_anchor: bool, rules: &[LinkRule]) -> Option<Self> {
        let workspace = self.workspace.as_deref();
        let builtin = workspace.map(Workspace::builtin_rules).unwrap_or_default();
        let context = workspace.map(Workspace::rule_context).unwrap_or_default();
        let chain = RuleChain::new(rules, builtin, context);
        let options = ResolveOptions { convert_wiki_home: true, with_anchor };
        let root = workspace.and_then(Workspace::root);
        return path_resolver::resolve(&self.path, link_ref, options, &chain, root).map(|path| return self.derive(path));
    }

    /// [`Self::resolve_external_link_ref_with`] without caller rules.
    pub fn resolve_external_link_ref_with_anchor(&self, link_ref: &str, with_anchor: bool) -> Option<Self> {
        return self.resolve_external_link_ref_with(link_ref, with_anchor, &[]);
    }

    /// [`Self::resolve_external_link_ref_with`] without caller rules, anchor discarded.
    pub fn resolve_external_link_ref(&self, link_ref: &str) -> Option<Self> {
        return self.resolve_external_link_ref_with(link_ref, false, &[]);
    }

    /// Same reference with another extension.
    #[must_use]
    pub fn with_extension(&self, ext: &str) -> Self {
        return self.derive(self.path.with_extension(ext));
    }

    /// True for references that resolved to an external URL.
    pub const fn is_external(&self) -> bool {
        return self.path.is_external();
    }

    /// True when the referenced file exists in the bound workspace.
    pub fn exists(&self) -> bool {
        return self
            .workspace
            .as_deref()
            .is_some_and(|workspace| return workspace.files().exists(&self.path));
    }

    /// The directory containing this reference, in the same workspace.
    pub fn parent(&self) -> Option<Self> {
        return self.path.parent().map(|path| return self.derive(path));
    }

    /// Advisory check: could this file be renamed to `new_name`?
    ///
    /// True when a workspace is bound and either the rename only changes
    /// letter case, or the file exists and its directory holds nothing
    /// called `new_name`. Nothing is created or deleted to find out.
    pub fn can_rename_to(&self, new_name: &str) -> bool {
        let Some(workspace) = self.workspace.as_deref() else {
            return false;
        };
        if self.path.file_name().to_lowercase() == new_name.to_lowercase() {
            return true;
        }
        if !workspace.files().exists(&self.path) {
            return false;
        }
        return self.has_free_sibling_name(workspace, new_name);
    }

    /// Advisory check: could a file called `name` be created next to this one?
    pub fn can_create_file(&self, name: &str) -> bool {
        return self
            .workspace
            .as_deref()
            .is_some_and(|workspace| return self.has_free_sibling_name(workspace, name));
    }

    /// Advisory check: could this reference's own file be created?
    pub fn can_create(&self) -> bool {
        return self.can_create_file(self.path.file_name());
    }

    /// The parent directory exists and has no entry called `name`.
    fn has_free_sibling_name(&self, workspace: &Workspace, name: &str) -> bool {
        let Some(parent) = self.path.parent() else {
            return false;
        };
        let files = workspace.files();
        return files.exists(&parent) && !files.list_children(&parent).contains(name);
    }
}

impl PartialEq for FileReference {
    fn eq(&self, other: &Self) -> bool {
        return self.same_workspace(other) && self.path == other.path;
    }
}

impl PartialOrd for FileReference {
    /// `None` across workspaces, so neither side is ever less than the other.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.same_workspace(other) {
            return None;
        }
        return Some(self.path.cmp(&other.path));
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let workspace = self.workspace.as_deref().map_or("none", Workspace::name);
        return write!(f, "FileReference({}, workspace = {workspace})", self.path);
    }
}
