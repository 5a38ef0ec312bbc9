//! Crate-wide error type.
//!
//! Every fallible operation in the engine returns [`Error`]. Construction
//! errors (paths, attributes, duplicate names) abort the user call that
//! caused them and leave the tree untouched; render errors (cycles, missing
//! ancestor values) abort the render and leave the render tree partial, so
//! the transaction that hit them must be treated as lost.

use thiserror::Error;

/// Errors produced by the layout engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A path string or path part did not match the path grammar.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An attribute value could not be parsed into the feature's type.
    #[error("attribute '{name}' has unparsable value '{value}'")]
    InvalidAttribute {
        /// Attribute key as given in the attribute map.
        name: String,
        /// The offending value string.
        value: String,
    },

    /// Relative attribute values form a dependency cycle.
    #[error("attributes given form a cycle: {0}")]
    AttributeCycle(String),

    /// A relative value named an ancestor value that is absent from scope or
    /// bound to an incompatible type.
    #[error(
        "requested relative value '{name}' of type {expected} could not be \
         found in ancestor values (missing ancestor or incompatible type)"
    )]
    MissingAncestorValue {
        /// The name or abbreviation that was looked up.
        name: String,
        /// The type of value the lookup expected.
        expected: &'static str,
    },

    /// A child was constructed with a name already used by a sibling.
    #[error("node already has a child named '{0}'")]
    DuplicateChildName(String),

    /// A template name was not present on the node it was requested from.
    #[error("could not find template with name '{0}'")]
    UnknownTemplate(String),

    /// The event server has been dropped; no further events can be observed.
    #[error("event server is gone")]
    ServerGone,

    /// A mesh provider failed to produce a mesh.
    #[error("could not import mesh '{path}': {reason}")]
    MeshImport {
        /// Path handed to the provider.
        path: String,
        /// Provider-specific failure description.
        reason: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
