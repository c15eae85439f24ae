//! File watcher: runs `check` on startup, then re-checks on file changes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use linkref::check::{Checker, OutputFormat};
use linkref::error::Error;
use linkref::scanner::is_markdown;
use notify::{RecursiveMode, Watcher as _};

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that forwards changed paths on the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<Vec<PathBuf>>) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(event.paths);
        }
    })
    .map_err(|e| {
        return Error::Watch {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// True when a path is inside a hidden directory such as `.git`.
fn is_hidden(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    return relative
        .components()
        .any(|c| return c.as_os_str().to_string_lossy().starts_with('.'));
}

/// Entry point for the watch command.
///
/// Markdown edits rebuild the checker, since links may have been added or
/// removed. Any other change is published as a wildcard on the files
/// namespace so memoized references resolve again.
///
/// # Errors
///
/// Returns errors from the initial scan or watcher setup.
pub fn run(format: OutputFormat) -> Result<ExitCode, Error> {
    eprintln!("watch: initial check");
    let mut checker = Checker::build(Path::new("."))?;
    let mut last_code = print_report(&checker, format);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    watcher
        .watch(checker.root(), RecursiveMode::Recursive)
        .map_err(|e| {
            return Error::Watch {
                reason: format!("cannot watch {}: {e}", checker.root().display()),
            };
        })?;

    eprintln!("watch: monitoring {}, press Ctrl+C to stop", checker.root().display());

    while let Ok(first) = rx.recv() {
        let mut changed: BTreeSet<PathBuf> = first.into_iter().collect();
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while let Ok(more) = rx.recv_timeout(debounce) {
            changed.extend(more);
        }
        changed.retain(|path| return !is_hidden(checker.root(), path));
        if changed.is_empty() {
            continue;
        }

        if changed.iter().any(|path| return is_markdown(path)) {
            eprintln!("watch: markdown changed, rescanning...");
            match Checker::build(checker.root()) {
                Ok(rebuilt) => checker = rebuilt,
                Err(e) => {
                    eprintln!("error: {e}");
                    continue;
                },
            }
        } else {
            let invalidated = checker.publish_file_change(None);
            eprintln!("watch: {} files changed, re-resolving {invalidated} links...", changed.len());
        }
        last_code = print_report(&checker, format);
    }

    return Ok(last_code);
}

/// Print one report. Returns its exit code.
fn print_report(checker: &Checker, format: OutputFormat) -> ExitCode {
    let report = checker.report();
    if let Err(e) = report.print(format) {
        eprintln!("error: {e}");
        return ExitCode::from(3_u8);
    }
    return report.exit_code();
}
