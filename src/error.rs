//! Crate-level error types for linkref diagnostics.

use crate::document::ElementKind;

/// Resolution misses are `None` or empty result sets, never an `Error`.
/// Only failures the caller has to act on end up here, and each variant
/// names the link, element, or namespace involved.
#[allow(clippy::error_impl_error, reason = "crate-level error type re-exported from lib")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reference cache tried to register a second listener for the same namespace.
    #[error("subscriber {subscriber} is already listening on namespace `{namespace}`")]
    AlreadySubscribed {
        /// Namespace the listener was registered on.
        namespace: String,
        /// Identifier of the reference cache that subscribed twice.
        subscriber: u64,
    },

    /// A reference was asked to point at an element of an incompatible kind.
    #[error("rebind cannot be performed from {expected} to {found}")]
    IllegalRebind {
        /// Kind of the element owning the reference.
        expected: ElementKind,
        /// Kind of the element the caller tried to bind to.
        found: ElementKind,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A link-extraction pattern failed to compile.
    #[error("regex: {0}")]
    Regex(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// A repository-metadata provider could not answer a lookup.
    #[error("repository lookup failed for `{identity}`: {reason}")]
    RepositoryLookup {
        /// Path or identity that was looked up.
        identity: String,
        /// Description of the provider failure.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The file watcher could not be created.
    #[error("watch: {reason}")]
    Watch {
        /// Description of the watcher failure.
        reason: String,
    },
}
