//! Named document elements and the references they own.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::ReferenceCache;
use crate::changes::{ChangeStream, Namespace};
use crate::error::Error;

/// What a named element is. References only rebind between elements of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// A heading, the target of `#anchor` links.
    Heading,
    /// An inline markdown link `[text](target)`.
    Link,
    /// A wiki link `[[Page Name]]`.
    WikiLink,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Heading => "heading",
            Self::Link => "link",
            Self::WikiLink => "wiki link",
        };
        return f.write_str(label);
    }
}

/// Why an element was renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameReason {
    /// The element's target moved and the element follows it.
    FileMoved,
    /// Someone edited the name directly.
    User,
}

/// An element of a document that has a display name other things refer to.
pub trait NamedElement: Send + Sync {
    /// Current display name.
    fn name(&self) -> String;

    /// What kind of element this is.
    fn kind(&self) -> ElementKind;

    /// Namespace renames of this element are published on.
    fn namespace(&self) -> &Namespace;

    /// Rename the element and publish the change.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the rename cannot be applied.
    fn set_name(&self, name: &str, reason: RenameReason) -> Result<(), Error>;
}

/// An in-memory named element that publishes its renames.
pub struct LinkElement {
    /// What kind of element this is.
    kind: ElementKind,
    /// Current name, replaced on rename.
    name: RwLock<String>,
    /// Namespace renames are published on.
    namespace: Namespace,
    /// Hub renames are published to.
    stream: ChangeStream,
}

impl LinkElement {
    /// Create an element named `name`, publishing renames on `namespace`.
    pub fn new(kind: ElementKind, name: &str, namespace: Namespace, stream: ChangeStream) -> Self {
        return Self {
            kind,
            name: RwLock::new(name.to_owned()),
            namespace,
            stream,
        };
    }
}

impl NamedElement for LinkElement {
    fn name(&self) -> String {
        return self.name.read().clone();
    }

    fn kind(&self) -> ElementKind {
        return self.kind;
    }

    fn namespace(&self) -> &Namespace {
        return &self.namespace;
    }

    /// Publishes the old name: memos computed for it are the ones that went stale.
    fn set_name(&self, name: &str, reason: RenameReason) -> Result<(), Error> {
        let old = std::mem::replace(&mut *self.name.write(), name.to_owned());
        tracing::debug!(kind = %self.kind, %old, new = name, ?reason, "element renamed");
        self.stream.notify(&self.namespace, Some(&old));
        return Ok(());
    }
}

impl fmt::Debug for LinkElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("LinkElement")
            .field("kind", &self.kind)
            .field("name", &*self.name.read())
            .field("namespace", &self.namespace)
            .finish_non_exhaustive();
    }
}

/// Computes what a reference name points at. Must not block or mutate anything.
pub trait ResolveStrategy {
    /// One resolution result.
    type Output;

    /// Every target `name` resolves to, in preference order. Empty when nothing matches.
    fn resolve_name(&self, name: &str) -> Vec<Self::Output>;
}

/// A reference owned by a named element, memoizing what the element's name resolves to.
///
/// Renames published on the target namespace invalidate the memo; the
/// subscription ends when the reference is dropped.
pub struct Reference<E: NamedElement, S: ResolveStrategy> {
    /// Memo of the last resolution.
    cache: ReferenceCache<S::Output>,
    /// Owning element whose name is resolved.
    element: Arc<E>,
    /// How names are turned into targets.
    strategy: S,
}

impl<E: NamedElement, S: ResolveStrategy> Reference<E, S> {
    /// A reference from `element`, resolved by `strategy`, invalidated by
    /// renames published on `targets`.
    pub fn new(element: Arc<E>, strategy: S, stream: ChangeStream, targets: Namespace) -> Self {
        return Self {
            cache: ReferenceCache::new(stream, targets),
            element,
            strategy,
        };
    }

    /// Every target the element's current name resolves to.
    pub fn multi_resolve(&self) -> Arc<[S::Output]> {
        let name = self.element.name();
        return self.cache.resolve(&name, |name| return self.strategy.resolve_name(name));
    }

    /// The target, when exactly one exists.
    pub fn resolve(&self) -> Option<S::Output>
    where
        S::Output: Clone,
    {
        return match &*self.multi_resolve() {
            [only] => Some(only.clone()),
            _ => None,
        };
    }

    /// Byte range of the reference inside its element: the whole name
    /// the memo was last computed for.
    pub fn range_in_element(&self) -> Range<usize> {
        let name = self.cache.memoized_name().unwrap_or_else(|| return self.element.name());
        return 0..name.len();
    }

    /// Point this reference at `target` by renaming the owning element to
    /// the target's name. The memo is never repointed in place; the next
    /// resolution converges on the new name.
    ///
    /// # Errors
    ///
    /// Returns `Error::IllegalRebind` if `target` is a different kind of
    /// element, or any error from renaming the owning element.
    pub fn bind_to_element(&self, target: &dyn NamedElement) -> Result<(), Error> {
        let expected = self.element.kind();
        let found = target.kind();
        if expected != found {
            return Err(Error::IllegalRebind { expected, found });
        }
        return self.element.set_name(&target.name(), RenameReason::FileMoved);
    }

    /// Element owning the reference.
    pub const fn element(&self) -> &Arc<E> {
        return &self.element;
    }

    /// The memo backing this reference.
    pub const fn cache(&self) -> &ReferenceCache<S::Output> {
        return &self.cache;
    }
}

impl<E: NamedElement, S: ResolveStrategy> fmt::Debug for Reference<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Reference")
            .field("name", &self.element.name())
            .field("kind", &self.element.kind())
            .finish_non_exhaustive();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::CacheStatus;

    /// Resolves names found in a fixed list of pages.
    struct Pages<'a> {
        calls: &'a AtomicUsize,
        pages: &'a [&'a str],
    }

    impl ResolveStrategy for Pages<'_> {
        type Output = String;

        fn resolve_name(&self, name: &str) -> Vec<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            return self
                .pages
                .iter()
                .filter(|page| return page.starts_with(name))
                .map(|page| return (*page).to_owned())
                .collect();
        }
    }

    fn link(stream: &ChangeStream, name: &str) -> Arc<LinkElement> {
        return Arc::new(LinkElement::new(ElementKind::WikiLink, name, Namespace::new("links"), stream.clone()));
    }

    #[test]
    fn resolve_returns_only_unique_targets() {
        let stream = ChangeStream::new();
        let calls = AtomicUsize::new(0);
        let pages = ["Home", "Install", "Installing"];
        let strategy = Pages { calls: &calls, pages: &pages };
        let reference = Reference::new(link(&stream, "Home"), strategy, stream.clone(), Namespace::new("pages"));
        assert_eq!(reference.resolve().as_deref(), Some("Home"));

        reference.element().set_name("Install", RenameReason::User).unwrap();
        assert_eq!(reference.multi_resolve().len(), 2);
        assert_eq!(reference.resolve(), None);
    }

    #[test]
    fn page_rename_invalidates_dependent_references() {
        let stream = ChangeStream::new();
        let pages_ns = Namespace::new("pages");
        let calls = AtomicUsize::new(0);
        let pages = ["Home"];
        let reference = Reference::new(
            link(&stream, "Home"),
            Pages { calls: &calls, pages: &pages },
            stream.clone(),
            pages_ns.clone(),
        );
        reference.multi_resolve();
        reference.multi_resolve();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let page = LinkElement::new(ElementKind::Heading, "Home", pages_ns, stream.clone());
        page.set_name("Start", RenameReason::User).unwrap();
        assert_eq!(reference.cache().status(), CacheStatus::Stale);
        reference.multi_resolve();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn range_spans_the_resolved_name() {
        let stream = ChangeStream::new();
        let calls = AtomicUsize::new(0);
        let reference = Reference::new(
            link(&stream, "Page"),
            Pages { calls: &calls, pages: &[] },
            stream.clone(),
            Namespace::new("pages"),
        );
        assert_eq!(reference.range_in_element(), 0..4);
        reference.element().set_name("Longer Page", RenameReason::User).unwrap();
        reference.multi_resolve();
        assert_eq!(reference.range_in_element(), 0..11);
    }

    #[test]
    fn rebind_renames_the_owning_element() {
        let stream = ChangeStream::new();
        let calls = AtomicUsize::new(0);
        let pages = ["Home", "Guide"];
        let reference = Reference::new(
            link(&stream, "Home"),
            Pages { calls: &calls, pages: &pages },
            stream.clone(),
            Namespace::new("pages"),
        );
        assert_eq!(reference.resolve().as_deref(), Some("Home"));

        let target = link(&stream, "Guide");
        reference.bind_to_element(target.as_ref()).unwrap();
        assert_eq!(reference.element().name(), "Guide");
        assert_eq!(reference.resolve().as_deref(), Some("Guide"));
    }

    #[test]
    fn rebind_across_kinds_is_rejected() {
        let stream = ChangeStream::new();
        let calls = AtomicUsize::new(0);
        let reference = Reference::new(
            link(&stream, "Home"),
            Pages { calls: &calls, pages: &[] },
            stream.clone(),
            Namespace::new("pages"),
        );
        let heading = LinkElement::new(ElementKind::Heading, "Intro", Namespace::new("headings"), stream);
        let err = reference.bind_to_element(&heading).unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalRebind { expected: ElementKind::WikiLink, found: ElementKind::Heading }
        ));
        assert_eq!(err.to_string(), "rebind cannot be performed from wiki link to heading");
        assert_eq!(reference.element().name(), "Home");
    }

    #[test]
    fn dropping_the_reference_unsubscribes() {
        let stream = ChangeStream::new();
        let pages_ns = Namespace::new("pages");
        let calls = AtomicUsize::new(0);
        let reference = Reference::new(
            link(&stream, "Home"),
            Pages { calls: &calls, pages: &[] },
            stream.clone(),
            pages_ns.clone(),
        );
        reference.multi_resolve();
        assert_eq!(stream.listener_count(&pages_ns), 1);
        drop(reference);
        assert_eq!(stream.listener_count(&pages_ns), 0);
    }
}
