//! Read-only file-existence providers.

use std::collections::BTreeSet;
use std::path::Path;

use parking_lot::RwLock;

use crate::path_info::PathInfo;

/// Existence and listing queries over files. Implementations must not
/// modify anything they are asked about.
pub trait FileSystem: Send + Sync {
    /// True when a file or directory exists at `path`.
    fn exists(&self, path: &PathInfo) -> bool;

    /// Names of the entries directly inside the directory at `path`.
    /// Empty when `path` is not a directory.
    fn list_children(&self, path: &PathInfo) -> BTreeSet<String>;
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
    fn exists(&self, path: &PathInfo) -> bool {
        if path.is_external() {
            return false;
        }
        return Path::new(&path.path()).exists();
    }

    fn list_children(&self, path: &PathInfo) -> BTreeSet<String> {
        if path.is_external() {
            return BTreeSet::new();
        }
        let Ok(entries) = std::fs::read_dir(path.path()) else {
            return BTreeSet::new();
        };
        return entries
            .filter_map(Result::ok)
            .map(|entry| return entry.file_name().to_string_lossy().into_owned())
            .collect();
    }
}

/// An in-memory set of files. Directories exist implicitly above every file.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    /// Full paths of every file.
    files: RwLock<BTreeSet<String>>,
}

impl MemoryFileSystem {
    /// Create a file system holding the given file paths.
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files = files
            .into_iter()
            .map(|file| return PathInfo::parse(file.as_ref()).path())
            .collect();
        return Self { files: RwLock::new(files) };
    }

    /// Add a file.
    pub fn add_file(&self, path: &str) {
        self.files.write().insert(PathInfo::parse(path).path());
    }

    /// Remove a file. Returns true if it was present.
    pub fn remove_file(&self, path: &str) -> bool {
        return self.files.write().remove(&PathInfo::parse(path).path());
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &PathInfo) -> bool {
        let rendered = path.path();
        let prefix = directory_prefix(path);
        let files = self.files.read();
        return files.contains(&rendered) || files.iter().any(|file| return file.starts_with(&prefix));
    }

    fn list_children(&self, path: &PathInfo) -> BTreeSet<String> {
        let prefix = directory_prefix(path);
        return self
            .files
            .read()
            .iter()
            .filter_map(|file| return file.strip_prefix(&prefix))
            .filter_map(|rest| return rest.split('/').next())
            .filter(|name| return !name.is_empty())
            .map(str::to_owned)
            .collect();
    }
}

/// `path` as a prefix that only matches entries strictly below it.
fn directory_prefix(path: &PathInfo) -> String {
    let rendered = path.path();
    if rendered.ends_with('/') || rendered.is_empty() {
        return rendered;
    }
    return format!("{rendered}/");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_directories_are_implicit() {
        let fs = MemoryFileSystem::with_files(["/repo/docs/page.md", "/repo/README.md"]);
        assert!(fs.exists(&PathInfo::parse("/repo/docs/page.md")));
        assert!(fs.exists(&PathInfo::parse("/repo/docs")));
        assert!(fs.exists(&PathInfo::parse("/")));
        assert!(!fs.exists(&PathInfo::parse("/repo/doc")));
        assert!(!fs.exists(&PathInfo::parse("https://github.com/repo")));
    }

    #[test]
    fn memory_lists_direct_children() {
        let fs = MemoryFileSystem::with_files(["/repo/docs/page.md", "/repo/docs/img/a.png", "/repo/README.md"]);
        let children: Vec<String> = fs.list_children(&PathInfo::parse("/repo/docs")).into_iter().collect();
        assert_eq!(children, ["img", "page.md"]);
        let root: Vec<String> = fs.list_children(&PathInfo::parse("/repo")).into_iter().collect();
        assert_eq!(root, ["README.md", "docs"]);
    }

    #[test]
    fn memory_add_and_remove() {
        let fs = MemoryFileSystem::default();
        let page = PathInfo::parse("/w/Page.md");
        assert!(!fs.exists(&page));
        fs.add_file("/w/Page.md");
        assert!(fs.exists(&page));
        assert!(fs.remove_file("/w/./Page.md"));
        assert!(!fs.exists(&page));
    }

    #[test]
    fn disk_lists_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let base = PathInfo::from_file_path(dir.path());
        let children: Vec<String> = DiskFileSystem.list_children(&base).into_iter().collect();
        assert_eq!(children, ["a.md", "sub"]);
        assert!(DiskFileSystem.exists(&base.append("a.md")));
        assert!(!DiskFileSystem.exists(&base.append("b.md")));
    }
}
