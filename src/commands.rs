//! CLI commands: resolve and check.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use linkref::check::{Checker, OutputFormat};
use linkref::config::Config;
use linkref::error::Error;
use linkref::file_reference::FileReference;
use linkref::path_info::PathInfo;
use linkref::path_resolver::ResolveOptions;
use linkref::workspace::Workspace;

/// Switches of the `resolve` command.
#[derive(Debug, Clone, Copy)]
pub struct ResolveFlags {
    /// Keep the anchor.
    pub anchor: bool,
    /// Apply repository rules.
    pub external: bool,
    /// Resolve as a wiki page.
    pub wiki: bool,
}

/// Resolve `link` as written in `source` and print the result.
///
/// Prints the resolved path or URL on stdout. Exits 0 when the result is
/// an existing file or a URL, 1 when it names a missing file or nothing
/// at all. Links climbing above the current directory stop there.
///
/// # Errors
///
/// Returns config or I/O errors.
pub fn resolve(source: &Path, link: &str, flags: ResolveFlags) -> Result<ExitCode, Error> {
    let root = std::fs::canonicalize(".")?;
    let config = Config::load(&root)?;
    let workspace = Arc::new(Workspace::from_config(&root, &config));
    let source_path = absolute_source(&root, source);
    let reference = FileReference::new(PathInfo::from_file_path(&source_path), workspace);

    let resolved = if flags.external {
        reference.resolve_external_link_ref_with_anchor(link, flags.anchor)
    } else {
        let options = ResolveOptions { convert_wiki_home: flags.wiki, with_anchor: flags.anchor };
        reference.resolve_link_ref_with(link, options, &[])
    };
    let Some(resolved) = resolved else {
        eprintln!("unresolvable: {link} from {}", source.display());
        return Ok(ExitCode::from(1));
    };

    println!("{}", resolved.path());
    if resolved.is_external() || resolved.exists() {
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("missing: {}", resolved.path().without_anchor());
    return Ok(ExitCode::from(1));
}

/// `source` made absolute against the canonical `root`.
fn absolute_source(root: &Path, source: &Path) -> PathBuf {
    if source.is_absolute() {
        return source.to_path_buf();
    }
    return root.join(source);
}

/// Scan markdown under the current directory and report broken links.
/// Exit code: 1 if any link is broken, 0 otherwise.
///
/// # Errors
///
/// Returns errors from config loading, scanning, or JSON output.
pub fn check(format: OutputFormat) -> Result<ExitCode, Error> {
    let checker = Checker::build(Path::new("."))?;
    let report = checker.report();
    report.print(format)?;
    return Ok(report.exit_code());
}
