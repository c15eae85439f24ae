//! The workspace context a file reference is bound to.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::file_system::{DiskFileSystem, FileSystem};
use crate::path_info::PathInfo;
use crate::repository::{ConfiguredRepositories, RepositoryProvider};
use crate::rule::{LinkRule, RuleContext};

/// Collaborators shared by every reference resolved inside one project.
///
/// Identity matters: two file references only compare equal or ordered
/// when they are bound to the same `Arc<Workspace>`.
pub struct Workspace {
    /// Built-in rules tried after caller rules for external links.
    builtin_rules: Vec<LinkRule>,
    /// File-existence provider.
    files: Arc<dyn FileSystem>,
    /// Display name.
    name: String,
    /// Repository-metadata provider, if any.
    repositories: Option<Arc<dyn RepositoryProvider>>,
    /// Project root: `/`-leading links start here and `..` never climbs above it.
    root: Option<PathInfo>,
}

impl Workspace {
    /// A workspace over the given files, without repository metadata.
    pub fn new(name: &str, files: Arc<dyn FileSystem>) -> Self {
        return Self {
            builtin_rules: LinkRule::repository_rules(),
            files,
            name: name.to_owned(),
            repositories: None,
            root: None,
        };
    }

    /// Bind a repository-metadata provider.
    #[must_use]
    pub fn with_repositories(mut self, repositories: Arc<dyn RepositoryProvider>) -> Self {
        self.repositories = Some(repositories);
        return self;
    }

    /// Confine resolution to the project rooted at `root`.
    #[must_use]
    pub fn with_root(mut self, root: PathInfo) -> Self {
        self.root = Some(root);
        return self;
    }

    /// A disk-backed workspace rooted at `root`, with the repositories declared in `config`.
    pub fn from_config(root: &Path, config: &Config) -> Self {
        let name = root
            .file_name()
            .map_or_else(|| return root.to_string_lossy(), |n| return n.to_string_lossy());
        let workspace = Self::new(&name, Arc::new(DiskFileSystem)).with_root(PathInfo::from_file_path(root));
        let repositories = ConfiguredRepositories::new(root, config.repositories());
        if repositories.is_empty() {
            return workspace;
        }
        return workspace.with_repositories(Arc::new(repositories));
    }

    /// Display name.
    pub fn name(&self) -> &str {
        return &self.name;
    }

    /// File-existence provider.
    pub fn files(&self) -> &dyn FileSystem {
        return self.files.as_ref();
    }

    /// Repository-metadata provider, if bound.
    pub fn repositories(&self) -> Option<&dyn RepositoryProvider> {
        return self.repositories.as_deref();
    }

    /// Project root, if confined to one.
    pub const fn root(&self) -> Option<&PathInfo> {
        return self.root.as_ref();
    }

    /// Rules tried after caller rules when resolving external links.
    pub fn builtin_rules(&self) -> &[LinkRule] {
        return &self.builtin_rules;
    }

    /// Collaborators handed to rule guards and actions.
    pub fn rule_context(&self) -> RuleContext<'_> {
        return RuleContext {
            repositories: self.repositories(),
        };
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Workspace")
            .field("name", &self.name)
            .field("repositories", &self.repositories.is_some())
            .field("root", &self.root)
            .finish_non_exhaustive();
    }
}
