//! Repository metadata: the provider seam, repository sections that links
//! can point at, and a provider backed by `.linkref.toml`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::Error;
use crate::path_info::{PathInfo, WIKI_HOME_EXTENSION};

/// What a provider knows about one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Base URL without a trailing slash, e.g. `https://github.com/org/repo`.
    base_url: String,
}

impl RepoInfo {
    /// Create repository info from its base URL.
    pub fn new(base_url: &str) -> Self {
        return Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        };
    }

    /// Base URL of the repository.
    pub fn base_url(&self) -> &str {
        return &self.base_url;
    }

    /// URL of a section below the base, e.g. `issues`.
    pub fn url_for(&self, section: &str) -> String {
        let section = section.trim_matches('/');
        if section.is_empty() {
            return self.base_url.clone();
        }
        return format!("{}/{section}", self.base_url);
    }
}

/// Looks up repository metadata for a path or repository identity.
///
/// Lookups must be read-only. `Ok(None)` means the identity is unknown;
/// errors are absorbed by the rule chain and never reach resolution callers.
pub trait RepositoryProvider: Send + Sync {
    /// Find the repository that owns `identity`.
    ///
    /// # Errors
    ///
    /// Returns `Error::RepositoryLookup` when the provider cannot answer.
    fn lookup(&self, identity: &str) -> Result<Option<RepoInfo>, Error>;
}

/// Special repository pages reachable through `../../<keyword>` links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositorySection {
    /// Repository graphs.
    Graphs,
    /// Issue tracker.
    Issues,
    /// Pull requests.
    Pulls,
    /// Activity overview.
    Pulse,
    /// The repository's wiki, a separate `<name>.wiki` repository.
    Wiki,
}

impl RepositorySection {
    /// Built-in evaluation order.
    pub const ALL: [Self; 5] = [Self::Issues, Self::Wiki, Self::Pulls, Self::Pulse, Self::Graphs];

    /// Final link segment that selects this section.
    pub const fn keyword(self) -> &'static str {
        return match self {
            Self::Graphs => "graphs",
            Self::Issues => "issues",
            Self::Pulls => "pulls",
            Self::Pulse => "pulse",
            Self::Wiki => "wiki",
        };
    }

    /// Identity handed to the provider when `current` is the directory being resolved.
    /// The wiki section looks up the sibling `<dir>/<dir>.wiki` repository;
    /// every other section looks up `current` itself.
    pub fn lookup_identity(self, current: &PathInfo) -> String {
        return match self {
            Self::Wiki => current
                .append(&format!("{}{WIKI_HOME_EXTENSION}", current.file_name()))
                .path(),
            Self::Graphs | Self::Issues | Self::Pulls | Self::Pulse => current.path(),
        };
    }

    /// Replacement path for a matched section link.
    ///
    /// When the provider does not know `current` or cannot answer, the
    /// result is `current` itself: the section segments are consumed and
    /// the caller sees a local path instead of a URL.
    pub fn compute_path(self, provider: &dyn RepositoryProvider, current: &PathInfo) -> PathInfo {
        let identity = self.lookup_identity(current);
        let info = match provider.lookup(&identity) {
            Ok(Some(info)) => info,
            Ok(None) => {
                tracing::debug!(%identity, section = self.keyword(), "no repository for link section");
                return current.clone();
            },
            Err(e) => {
                tracing::info!(%identity, error = %e, "can't resolve repository url");
                return current.clone();
            },
        };
        let url = match self {
            Self::Wiki => info.url_for(""),
            Self::Graphs | Self::Issues | Self::Pulls | Self::Pulse => info.url_for(self.keyword()),
        };
        return PathInfo::parse(&url);
    }
}

impl fmt::Display for RepositorySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.keyword());
    }
}

/// Repositories declared in the `[repositories]` table of `.linkref.toml`.
///
/// Each entry maps a directory to a base URL. A lookup picks the deepest
/// directory containing the identity. Identities naming a `<dir>.wiki`
/// directory answer with the owning repository's `/wiki` URL.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredRepositories {
    /// Repository roots paired with their base URLs, deepest first.
    entries: Vec<(PathInfo, RepoInfo)>,
}

impl ConfiguredRepositories {
    /// Build from config entries whose keys are relative to `root`.
    pub fn new(root: &Path, repositories: &BTreeMap<String, String>) -> Self {
        let base = PathInfo::from_file_path(root);
        let mut entries: Vec<(PathInfo, RepoInfo)> = repositories
            .iter()
            .map(|(dir, url)| return (base.append(dir), RepoInfo::new(url)))
            .collect();
        entries.sort_by_key(|(dir, _)| return std::cmp::Reverse(dir.depth()));
        return Self { entries };
    }

    /// True when no repository is configured.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Deepest configured repository whose directory contains `path`.
    fn owner_of(&self, path: &PathInfo) -> Option<&RepoInfo> {
        return self
            .entries
            .iter()
            .find(|(dir, _)| return path.starts_with(dir))
            .map(|(_, info)| return info);
    }
}

impl RepositoryProvider for ConfiguredRepositories {
    fn lookup(&self, identity: &str) -> Result<Option<RepoInfo>, Error> {
        let path = PathInfo::from_file_path(Path::new(identity));
        if !path.is_wiki_home() {
            return Ok(self.owner_of(&path).cloned());
        }
        let Some(owner_dir) = path.parent() else {
            return Ok(None);
        };
        return Ok(self
            .owner_of(&owner_dir)
            .map(|info| return RepoInfo::new(&info.url_for(RepositorySection::Wiki.keyword()))));
    }
}
