//! Link checking across a markdown tree, backed by memoized references.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;

use crate::changes::{ChangeStream, Namespace};
use crate::config::Config;
use crate::document::{ElementKind, LinkElement, Reference};
use crate::error::Error;
use crate::file_reference::FileReference;
use crate::path_info::PathInfo;
use crate::scanner::{LinkOccurrence, Scanner};
use crate::strategy::{LinkTarget, LinkTargetStrategy};
use crate::workspace::Workspace;

/// Namespace file-system changes are published on.
pub const FILES_NAMESPACE: &str = "files";

/// Namespace link-text renames are published on.
pub const LINKS_NAMESPACE: &str = "links";

/// How a report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Machine-readable JSON.
    Json,
    /// `BROKEN` lines and a summary.
    #[default]
    Text,
}

/// Whether a link resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Nothing exists at the link target.
    Broken,
    /// The link points at an existing file or a URL.
    Ok,
}

/// Outcome for one link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    /// What kind of link it is.
    pub kind: ElementKind,
    /// 1-based line in the source file.
    pub line: u32,
    /// Link target as written.
    pub link: String,
    /// Markdown file containing the link, relative to the root.
    pub source: String,
    /// Whether it resolved.
    pub status: LinkStatus,
    /// Everything it resolved to.
    pub targets: Vec<LinkTarget>,
}

/// Outcome for a whole tree.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Number of broken links.
    pub broken: usize,
    /// Per-link outcomes in file and line order.
    pub links: Vec<LinkReport>,
    /// Number of links checked.
    pub total: usize,
}

impl CheckReport {
    /// Print the report to stdout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if JSON serialization fails.
    pub fn print(&self, format: OutputFormat) -> Result<(), Error> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            OutputFormat::Text => self.print_text(),
        }
        return Ok(());
    }

    /// `BROKEN` lines followed by a summary.
    fn print_text(&self) {
        for link in self.links.iter().filter(|l| return l.status == LinkStatus::Broken) {
            println!("BROKEN  {}:{}  {} ({})", link.source, link.line, link.link, link.kind);
        }
        if self.broken > 0 {
            println!();
            println!("{} broken of {} links", self.broken, self.total);
        } else {
            println!("All {} links resolve", self.total);
        }
    }

    /// 0 when every link resolves, 1 otherwise.
    pub fn exit_code(&self) -> ExitCode {
        if self.broken > 0 {
            return ExitCode::from(1);
        }
        return ExitCode::SUCCESS;
    }
}

/// A scanned link and the reference that resolves it.
struct TrackedLink {
    /// Where the link was found and what it says.
    occurrence: LinkOccurrence,
    /// Memoized resolution of the link target.
    reference: Reference<LinkElement, LinkTargetStrategy>,
}

/// Every link under a root, each with its own memoized reference.
///
/// References listen on [`FILES_NAMESPACE`]; publishing a change there
/// forces the affected ones to resolve again on the next report.
pub struct Checker {
    /// Links in file and line order.
    links: Vec<TrackedLink>,
    /// Canonical scan root.
    root: PathBuf,
    /// Hub every reference listens on.
    stream: ChangeStream,
}

impl Checker {
    /// Scan `root` and build one reference per link.
    ///
    /// # Errors
    ///
    /// Returns config, scanning, or I/O errors.
    pub fn build(root: &Path) -> Result<Self, Error> {
        let root = std::fs::canonicalize(root)?;
        let config = Config::load(&root)?;
        let workspace = Arc::new(Workspace::from_config(&root, &config));
        let stream = ChangeStream::new();
        let occurrences = Scanner::new()?.scan(&root, &config)?;
        tracing::debug!(root = %root.display(), links = occurrences.len(), "scanned");

        let links = occurrences
            .into_iter()
            .map(|occurrence| {
                let source_path = PathInfo::from_file_path(&root.join(&occurrence.source));
                let source = FileReference::new(source_path, Arc::clone(&workspace));
                let element = Arc::new(LinkElement::new(
                    occurrence.kind,
                    &occurrence.target,
                    Namespace::new(LINKS_NAMESPACE),
                    stream.clone(),
                ));
                let strategy = LinkTargetStrategy::new(source, occurrence.kind);
                let reference = Reference::new(element, strategy, stream.clone(), Namespace::new(FILES_NAMESPACE));
                return TrackedLink { occurrence, reference };
            })
            .collect();

        return Ok(Self { links, root, stream });
    }

    /// Resolve every link and summarize.
    pub fn report(&self) -> CheckReport {
        let links: Vec<LinkReport> = self.links.iter().map(TrackedLink::report).collect();
        let broken = links.iter().filter(|l| return l.status == LinkStatus::Broken).count();
        return CheckReport {
            broken,
            total: links.len(),
            links,
        };
    }

    /// Tell every reference that files changed. `None` invalidates all of them.
    pub fn publish_file_change(&self, name: Option<&str>) -> usize {
        return self.stream.notify(&Namespace::new(FILES_NAMESPACE), name);
    }

    /// Canonical root the links were scanned under.
    pub fn root(&self) -> &Path {
        return &self.root;
    }

    /// Number of links tracked.
    pub fn len(&self) -> usize {
        return self.links.len();
    }

    /// True when no links were found.
    pub fn is_empty(&self) -> bool {
        return self.links.is_empty();
    }
}

impl TrackedLink {
    /// Resolve through the memo and classify.
    fn report(&self) -> LinkReport {
        let targets = self.reference.multi_resolve().to_vec();
        let status = if targets.is_empty() { LinkStatus::Broken } else { LinkStatus::Ok };
        return LinkReport {
            kind: self.occurrence.kind,
            line: self.occurrence.line,
            link: self.occurrence.target.clone(),
            source: self.occurrence.source.to_string_lossy().into_owned(),
            status,
            targets,
        };
    }
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f
            .debug_struct("Checker")
            .field("root", &self.root)
            .field("links", &self.links.len())
            .finish_non_exhaustive();
    }
}
