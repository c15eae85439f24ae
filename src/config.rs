use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Error;

/// Project configuration loaded from `.linkref.toml`.
/// Include/exclude patterns are path prefixes applied to markdown source files.
#[derive(Debug, Default)]
pub struct Config {
    /// Prefixes of files never scanned.
    exclude: Vec<String>,
    /// Prefixes of files scanned; empty means everything.
    include: Vec<String>,
    /// Directory to repository base URL.
    repositories: BTreeMap<String, String>,
}

/// Raw TOML structure for `.linkref.toml`.
#[derive(serde::Deserialize)]
struct LinkrefTomlConfig {
    /// Path prefixes to skip.
    #[serde(default)]
    exclude: Vec<String>,
    /// Path prefixes to scan.
    #[serde(default)]
    include: Vec<String>,
    /// Directory (relative to the config file) to repository base URL.
    #[serde(default)]
    repositories: BTreeMap<String, String>,
}

impl Config {
    /// Load config from `.linkref.toml` in the given root directory.
    /// Returns a default that scans everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed, never silently
    /// falling back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".linkref.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: LinkrefTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            repositories: raw.repositories,
        });
    }

    /// Repository base URLs keyed by directory.
    pub const fn repositories(&self) -> &BTreeMap<String, String> {
        return &self.repositories;
    }

    /// Check whether a markdown file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_scans_everything() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.should_scan("docs/a.md"));
        assert!(config.repositories().is_empty());
    }

    #[test]
    fn include_then_exclude() {
        let config = Config::parse("include = [\"docs/\"]\nexclude = [\"docs/drafts/\"]\n").unwrap();
        assert!(config.should_scan("docs/guide.md"));
        assert!(!config.should_scan("docs/drafts/wip.md"));
        assert!(!config.should_scan("README.md"));
    }

    #[test]
    fn reads_repositories_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".linkref.toml"),
            "[repositories]\n\".\" = \"https://github.com/org/repo\"\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(
            config.repositories().get(".").map(String::as_str),
            Some("https://github.com/org/repo")
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(matches!(Config::parse("include = 3"), Err(Error::TomlDe(_))));
    }
}
