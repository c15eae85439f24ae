//! Immutable path values: directory segments, file name, anchor, and
//! wiki-home classification. External URLs are carried as pseudo-paths
//! whose root is the scheme and host.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path};

/// Suffix that marks a directory as the home of a wiki collection.
pub const WIKI_HOME_EXTENSION: &str = ".wiki";

/// Landing page inside a wiki home, without extension.
pub const WIKI_HOME_FILE_NAME: &str = "Home";

/// Extension inferred for wiki pages linked without one.
pub const MARKDOWN_EXTENSION: &str = "md";

/// Where the segments of a path hang from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathRoot {
    /// Rooted at the file-system root (`/a/b`).
    Absolute,
    /// Relative to some unspecified directory (`a/b`).
    Relative,
    /// Rooted at a scheme and host such as `https://github.com`.
    Url(String),
}

/// A normalized path. Never mutated: every `with_*` operation returns a new value.
///
/// Equality, ordering and hashing look at the path only. The anchor takes
/// part in [`PathInfo::eq_with_anchor`] alone.
#[derive(Debug, Clone)]
pub struct PathInfo {
    /// Fragment after the first unescaped `#`, if any.
    anchor: Option<String>,
    /// Segments leading up to the file name.
    directory: Vec<String>,
    /// Last segment. Empty only for a bare root.
    file_name: String,
    /// Origin of the segments.
    root: PathRoot,
}

impl PathInfo {
    /// Parse a raw path, URL, or link target.
    ///
    /// `.` segments are dropped. `..` pops the previous segment, is kept
    /// when a relative path has nothing left to pop, and is clamped at the
    /// root of absolute paths and URLs.
    pub fn parse(raw: &str) -> Self {
        let (path, anchor) = split_anchor(raw);
        let (root, rest) = split_root(path);
        let mut segments = Vec::new();
        for part in rest.split('/') {
            push_segment(&root, &mut segments, part);
        }
        return Self::from_segments(root, segments, anchor.map(str::to_owned));
    }

    /// Convert an on-disk path. Unlike [`Self::parse`], `#` is an ordinary
    /// file-name character here and never starts an anchor.
    pub fn from_file_path(path: &Path) -> Self {
        let root = if path.has_root() { PathRoot::Absolute } else { PathRoot::Relative };
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => push_segment(&root, &mut segments, &part.to_string_lossy()),
                Component::ParentDir => push_segment(&root, &mut segments, ".."),
                Component::CurDir | Component::Prefix(_) | Component::RootDir => {},
            }
        }
        return Self::from_segments(root, segments, None);
    }

    /// Build a path from already-normalized segments.
    fn from_segments(root: PathRoot, mut segments: Vec<String>, anchor: Option<String>) -> Self {
        let file_name = segments.pop().unwrap_or_default();
        return Self {
            anchor,
            directory: segments,
            file_name,
            root,
        };
    }

    /// The fragment following the first unescaped `#`.
    pub fn anchor(&self) -> Option<&str> {
        return self.anchor.as_deref();
    }

    /// Segments leading up to the file name.
    pub fn directory(&self) -> &[String] {
        return &self.directory;
    }

    /// Last segment of the path, extension included.
    pub fn file_name(&self) -> &str {
        return &self.file_name;
    }

    /// File name with the extension removed.
    pub fn file_stem(&self) -> &str {
        return match self.extension() {
            Some(ext) => self
                .file_name
                .get(..self.file_name.len().saturating_sub(ext.len().saturating_add(1)))
                .unwrap_or(&self.file_name),
            None => &self.file_name,
        };
    }

    /// Extension without the dot. Dotfiles such as `.gitignore` have none.
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        return Some(ext);
    }

    /// How the path is rooted.
    pub const fn root(&self) -> &PathRoot {
        return &self.root;
    }

    /// All segments, directory first, ending with the file name.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let file = (!self.file_name.is_empty()).then_some(self.file_name.as_str());
        return self.directory.iter().map(String::as_str).chain(file);
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        return self.segments().count();
    }

    /// True for pseudo-paths that stand for an external URL.
    pub const fn is_external(&self) -> bool {
        return matches!(self.root, PathRoot::Url(_));
    }

    /// True for paths that hang from an unspecified directory.
    pub const fn is_relative(&self) -> bool {
        return matches!(self.root, PathRoot::Relative);
    }

    /// True when this path names a wiki home directory (`<name>.wiki`).
    pub fn is_wiki_home(&self) -> bool {
        return is_wiki_home_name(&self.file_name);
    }

    /// True when this path names a page directly inside a wiki home.
    pub fn is_wiki_page(&self) -> bool {
        return self.directory.last().is_some_and(|dir| return is_wiki_home_name(dir));
    }

    /// The containing directory as a path of its own.
    /// Returns `None` when there is nothing left to pop.
    pub fn parent(&self) -> Option<Self> {
        let mut segments: Vec<String> = self.segments().map(str::to_owned).collect();
        match segments.last() {
            Some(last) if last != ".." => {
                segments.pop();
                return Some(Self::from_segments(self.root.clone(), segments, None));
            },
            _ => return None,
        }
    }

    /// The bare root of this path: `/`, the empty relative path, or the URL host.
    pub fn root_path(&self) -> Self {
        return Self::from_segments(self.root.clone(), Vec::new(), None);
    }

    /// Treat this path as a directory and append one or more `/`-separated segments.
    pub fn append(&self, segments: &str) -> Self {
        let mut joined: Vec<String> = self.segments().map(str::to_owned).collect();
        for part in segments.split('/') {
            push_segment(&self.root, &mut joined, part);
        }
        return Self::from_segments(self.root.clone(), joined, None);
    }

    /// True when `prefix` has the same root and its segments lead this path.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        if self.root != prefix.root {
            return false;
        }
        let mut own = self.segments();
        return prefix.segments().all(|segment| return own.next() == Some(segment));
    }

    /// Replace the extension. An empty `ext` strips it.
    pub fn with_extension(&self, ext: &str) -> Self {
        let stem = self.file_stem();
        let file_name = if ext.is_empty() {
            stem.to_owned()
        } else {
            format!("{stem}.{}", ext.trim_start_matches('.'))
        };
        return self.with_file_name(&file_name);
    }

    /// Replace the last segment.
    pub fn with_file_name(&self, file_name: &str) -> Self {
        return Self {
            anchor: self.anchor.clone(),
            directory: self.directory.clone(),
            file_name: file_name.to_owned(),
            root: self.root.clone(),
        };
    }

    /// Replace the anchor.
    pub fn with_anchor(&self, anchor: Option<&str>) -> Self {
        return Self {
            anchor: anchor.filter(|a| return !a.is_empty()).map(str::to_owned),
            ..self.clone()
        };
    }

    /// The same path without an anchor.
    pub fn without_anchor(&self) -> Self {
        return self.with_anchor(None);
    }

    /// Full path text, anchor excluded.
    pub fn path(&self) -> String {
        let joined = self.segments().collect::<Vec<_>>().join("/");
        return match &self.root {
            PathRoot::Absolute => format!("/{joined}"),
            PathRoot::Relative => joined,
            PathRoot::Url(host) if joined.is_empty() => host.clone(),
            PathRoot::Url(host) => format!("{host}/{joined}"),
        };
    }

    /// Full path text followed by `#anchor` when one is set.
    pub fn path_with_anchor(&self) -> String {
        return match &self.anchor {
            Some(anchor) => format!("{}#{anchor}", self.path()),
            None => self.path(),
        };
    }

    /// Path equality that also requires matching anchors.
    pub fn eq_with_anchor(&self, other: &Self) -> bool {
        return self == other && self.anchor == other.anchor;
    }
}

impl PartialEq for PathInfo {
    fn eq(&self, other: &Self) -> bool {
        return self.path() == other.path();
    }
}

impl Eq for PathInfo {}

impl Hash for PathInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path().hash(state);
    }
}

impl Ord for PathInfo {
    /// Case-insensitive first, then case-sensitive so that only identical paths compare equal.
    fn cmp(&self, other: &Self) -> Ordering {
        let (left, right) = (self.path(), other.path());
        return left
            .to_lowercase()
            .cmp(&right.to_lowercase())
            .then_with(|| return left.cmp(&right));
    }
}

impl PartialOrd for PathInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl fmt::Display for PathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.path_with_anchor());
    }
}

impl serde::Serialize for PathInfo {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return serializer.serialize_str(&self.path_with_anchor());
    }
}

/// Split a link at its first unescaped `#`. An empty fragment counts as none.
pub fn split_anchor(raw: &str) -> (&str, Option<&str>) {
    let mut escaped = false;
    for (idx, c) in raw.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            '#' if !escaped => {
                let path = raw.get(..idx).unwrap_or(raw);
                let anchor = raw.get(idx.saturating_add(1)..).filter(|a| return !a.is_empty());
                return (path, anchor);
            },
            _ => escaped = false,
        }
    }
    return (raw, None);
}

/// True when the text starts with a `scheme://` prefix.
pub fn is_url(raw: &str) -> bool {
    return raw.split_once("://").is_some_and(|(scheme, _)| {
        return !scheme.is_empty() && scheme.chars().all(|c| return c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    });
}

/// True for a directory name of the form `<name>.wiki`.
fn is_wiki_home_name(name: &str) -> bool {
    return name.len() > WIKI_HOME_EXTENSION.len() && name.ends_with(WIKI_HOME_EXTENSION);
}

/// Separate the root from the remaining `/`-separated text.
fn split_root(path: &str) -> (PathRoot, &str) {
    if is_url(path) {
        let host_start = path.find("://").map_or(0, |idx| return idx.saturating_add(3));
        let host_end = path
            .get(host_start..)
            .and_then(|rest| return rest.find('/'))
            .map_or(path.len(), |idx| return idx.saturating_add(host_start));
        let host = path.get(..host_end).unwrap_or(path);
        let rest = path.get(host_end..).unwrap_or("");
        return (PathRoot::Url(host.to_owned()), rest);
    }
    if let Some(rest) = path.strip_prefix('/') {
        return (PathRoot::Absolute, rest);
    }
    return (PathRoot::Relative, path);
}

/// Push one raw segment, resolving `.` and `..` against what is already there.
fn push_segment(root: &PathRoot, segments: &mut Vec<String>, part: &str) {
    match part {
        "" | "." => {},
        ".." => {
            let can_pop = segments.last().is_some_and(|last| return last != "..");
            if can_pop {
                segments.pop();
            } else if *root == PathRoot::Relative {
                segments.push(part.to_owned());
            }
        },
        other => segments.push(other.to_owned()),
    }
}
