//! Fatal build configuration errors.

use thiserror::Error;

use crate::actions::Phase;

/// Problems with how the build is set up, as opposed to its content.
///
/// Always fatal: the build aborts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no page named `404`; the fallback route is cloned from it")]
    MissingNotFoundPage,

    #[error("{count} pages are named `404`; expected exactly one")]
    AmbiguousNotFoundPage { count: usize },

    #[error("plugin `{name}` is registered twice")]
    DuplicatePlugin { name: String },

    #[error("no plugin named `{name}`")]
    UnknownPlugin { name: String },

    #[error("the {phase} phase cannot be rebuilt incrementally")]
    PhaseNotRebuildable { phase: Phase },
}
