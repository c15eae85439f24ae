//! Link rules reinterpret special link tails such as `../../issues`.
//!
//! A rule is a literal segment pattern plus an action. Rules sit in an
//! ordered chain: caller-supplied rules first, built-in rules after, and
//! the first rule that matches and produces a path wins. Rules later in
//! the chain are never evaluated once one has fired.

use std::fmt;
use std::sync::Arc;

use crate::path_info::PathInfo;
use crate::repository::{RepositoryProvider, RepositorySection};

/// Replacement computation for a caller-supplied rule.
pub type ComputeFn = dyn Fn(&PathInfo) -> Option<PathInfo> + Send + Sync;

/// What a rule does once its pattern matches.
#[derive(Clone)]
pub enum RuleAction {
    /// Caller-supplied replacement, applied without any context guard.
    Custom(Arc<ComputeFn>),
    /// Synthesize a repository URL. Only applies when a repository provider
    /// is bound and the current path is not itself a wiki home.
    Repository(RepositorySection),
}

impl fmt::Debug for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Repository(section) => f.debug_tuple("Repository").field(section).finish(),
        };
    }
}

/// A literal segment pattern and the action taken when it matches.
#[derive(Debug, Clone)]
pub struct LinkRule {
    /// Action run on a match.
    action: RuleAction,
    /// Final segment of the pattern.
    last_part: String,
    /// Segments that must precede `last_part`.
    match_parts: Vec<String>,
}

impl LinkRule {
    /// A rule that runs `compute` on the current directory whenever the link
    /// continues with `match_parts` followed by `last_part`.
    pub fn custom<F>(match_parts: &[&str], last_part: &str, compute: F) -> Self
    where
        F: Fn(&PathInfo) -> Option<PathInfo> + Send + Sync + 'static,
    {
        return Self {
            action: RuleAction::Custom(Arc::new(compute)),
            last_part: last_part.to_owned(),
            match_parts: match_parts.iter().map(|p| return (*p).to_owned()).collect(),
        };
    }

    /// The `../../<keyword>` rule for one repository section.
    pub fn repository(section: RepositorySection) -> Self {
        return Self {
            action: RuleAction::Repository(section),
            last_part: section.keyword().to_owned(),
            match_parts: vec!["..".to_owned(), "..".to_owned()],
        };
    }

    /// All repository rules in built-in order.
    pub fn repository_rules() -> Vec<Self> {
        return RepositorySection::ALL.into_iter().map(Self::repository).collect();
    }

    /// The action run on a match.
    pub const fn action(&self) -> &RuleAction {
        return &self.action;
    }

    /// Number of link segments a match consumes.
    pub fn consumed_len(&self) -> usize {
        return self.match_parts.len().saturating_add(1);
    }

    /// Structural match: the link segments starting at `at` spell out the pattern.
    fn matches_pattern(&self, parts: &[&str], at: usize) -> bool {
        let Some(end) = at.checked_add(self.consumed_len()) else {
            return false;
        };
        let Some((last, leading)) = parts.get(at..end).and_then(|window| return window.split_last()) else {
            return false;
        };
        return *last == self.last_part
            && leading.iter().zip(&self.match_parts).all(|(part, expected)| return part == expected);
    }

    /// Pattern match plus the action's context guard.
    pub fn is_matched(&self, current: &PathInfo, parts: &[&str], at: usize, context: &RuleContext<'_>) -> bool {
        return match &self.action {
            RuleAction::Custom(_) => self.matches_pattern(parts, at),
            RuleAction::Repository(_) => {
                context.repositories.is_some()
                    && !current.is_wiki_home()
                    && self.matches_pattern(parts, at)
            },
        };
    }

    /// Replacement for the matched segments, or `None` to fall through to later rules.
    ///
    /// A repository rule whose provider answers nothing useful still
    /// produces a path (`current`, unchanged), so it never falls through.
    pub fn compute_path(&self, current: &PathInfo, context: &RuleContext<'_>) -> Option<PathInfo> {
        return match &self.action {
            RuleAction::Custom(compute) => compute(current),
            RuleAction::Repository(section) => context
                .repositories
                .map(|provider| return section.compute_path(provider, current)),
        };
    }
}

/// Collaborators available to rule guards and actions.
#[derive(Clone, Copy, Default)]
pub struct RuleContext<'a> {
    /// Repository-metadata provider, when a workspace with one is bound.
    pub repositories: Option<&'a dyn RepositoryProvider>,
}

/// Ordered rule dispatcher: `extra` rules first, then `builtin` ones, both in list order.
#[derive(Clone, Copy, Default)]
pub struct RuleChain<'a> {
    /// Built-in rules of the bound workspace.
    builtin: &'a [LinkRule],
    /// Collaborators handed to every rule.
    context: RuleContext<'a>,
    /// Caller-supplied rules.
    extra: &'a [LinkRule],
}

impl<'a> RuleChain<'a> {
    /// Chain over caller rules and built-in rules.
    pub const fn new(extra: &'a [LinkRule], builtin: &'a [LinkRule], context: RuleContext<'a>) -> Self {
        return Self { builtin, context, extra };
    }

    /// A chain without rules: plain relative resolution only.
    pub fn empty() -> Self {
        return Self::default();
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &'a LinkRule> {
        return self.extra.iter().chain(self.builtin);
    }

    /// First rule matching the link segments at `at` that yields a path,
    /// with the number of segments it consumed.
    pub fn first_match(&self, current: &PathInfo, parts: &[&str], at: usize) -> Option<(PathInfo, usize)> {
        for rule in self.rules() {
            if !rule.is_matched(current, parts, at, &self.context) {
                continue;
            }
            if let Some(path) = rule.compute_path(current, &self.context) {
                tracing::debug!(?rule, at, replacement = %path, "link rule matched");
                return Some((path, rule.consumed_len()));
            }
        }
        return None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::repository::RepoInfo;

    struct Fixed;

    impl RepositoryProvider for Fixed {
        fn lookup(&self, _identity: &str) -> Result<Option<RepoInfo>, crate::error::Error> {
            return Ok(Some(RepoInfo::new("https://github.com/org/repo")));
        }
    }

    #[test]
    fn pattern_must_match_whole_window() {
        let rule = LinkRule::repository(RepositorySection::Issues);
        assert!(rule.matches_pattern(&["..", "..", "issues"], 0));
        assert!(rule.matches_pattern(&["x", "..", "..", "issues", "12"], 1));
        assert!(!rule.matches_pattern(&["..", "issues"], 0));
        assert!(!rule.matches_pattern(&["..", "..", "issue"], 0));
        assert!(!rule.matches_pattern(&["..", ".."], 0));
    }

    #[test]
    fn repository_rules_need_a_provider() {
        let rule = LinkRule::repository(RepositorySection::Pulls);
        let current = PathInfo::parse("/repo/docs");
        let parts = ["..", "..", "pulls"];
        assert!(!rule.is_matched(&current, &parts, 0, &RuleContext::default()));

        let context = RuleContext { repositories: Some(&Fixed) };
        assert!(rule.is_matched(&current, &parts, 0, &context));
        assert!(!rule.is_matched(&PathInfo::parse("/repo/repo.wiki"), &parts, 0, &context));
    }

    #[test]
    fn earlier_rule_wins_and_later_is_never_computed() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));
        let first_counter = Arc::clone(&first_calls);
        let second_counter = Arc::clone(&second_calls);
        let rules = [
            LinkRule::custom(&[".."], "special", move |_| {
                first_counter.fetch_add(1, Ordering::SeqCst);
                return Some(PathInfo::parse("/first"));
            }),
            LinkRule::custom(&[".."], "special", move |_| {
                second_counter.fetch_add(1, Ordering::SeqCst);
                return Some(PathInfo::parse("/second"));
            }),
        ];
        let chain = RuleChain::new(&rules, &[], RuleContext::default());
        let (path, consumed) = chain
            .first_match(&PathInfo::parse("/a"), &["..", "special"], 0)
            .unwrap();
        assert_eq!(path.path(), "/first");
        assert_eq!(consumed, 2);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn declining_rule_falls_through() {
        let rules = [
            LinkRule::custom(&[], "x", |_| return None),
            LinkRule::custom(&[], "x", |_| return Some(PathInfo::parse("/fallback"))),
        ];
        let chain = RuleChain::new(&[], &rules, RuleContext::default());
        let (path, _) = chain.first_match(&PathInfo::parse("/"), &["x"], 0).unwrap();
        assert_eq!(path.path(), "/fallback");
    }

    #[test]
    fn unknown_repository_consumes_the_section_without_falling_through() {
        struct Unknown;
        impl RepositoryProvider for Unknown {
            fn lookup(&self, _identity: &str) -> Result<Option<RepoInfo>, crate::error::Error> {
                return Ok(None);
            }
        }
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut builtin = LinkRule::repository_rules();
        builtin.push(LinkRule::custom(&["..", ".."], "issues", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            return Some(PathInfo::parse("/fallback"));
        }));
        let chain = RuleChain::new(&[], &builtin, RuleContext { repositories: Some(&Unknown) });
        let (path, consumed) = chain
            .first_match(&PathInfo::parse("/repo/docs"), &["..", "..", "issues"], 0)
            .unwrap();
        assert_eq!(path.path(), "/repo/docs");
        assert_eq!(consumed, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn extra_rules_run_before_builtin() {
        let extra = [LinkRule::custom(&["..", ".."], "issues", |_| return Some(PathInfo::parse("/custom")))];
        let builtin = LinkRule::repository_rules();
        let chain = RuleChain::new(&extra, &builtin, RuleContext { repositories: Some(&Fixed) });
        let (path, _) = chain
            .first_match(&PathInfo::parse("/repo/docs"), &["..", "..", "issues"], 0)
            .unwrap();
        assert_eq!(path.path(), "/custom");
    }
}
