//! Engine configuration.

use crate::constants::DEFAULT_RETAINED_CAPACITY;

/// Settings of a [`crate::Tangle`] engine.
///
/// ```rust
/// use tangle::{Tangle, TangleConfig};
///
/// let tangle = Tangle::with_config(
///     TangleConfig::default()
///         .with_registration_required(false)
///         .with_max_depth(Some(64)),
/// );
/// assert_eq!(tangle.config().max_depth, Some(64));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TangleConfig {
    /// Track object identity so shared and cyclic substructure is written once.
    pub references: bool,
    /// Reject types that were not registered. When false, unknown types are
    /// registered on first use and transmitted by name.
    pub registration_required: bool,
    /// Log a warning for every implicit registration.
    pub warn_unregistered: bool,
    /// Reset graph-scoped state after every top-level call.
    pub auto_reset: bool,
    /// Maximum traversal depth, `None` for unbounded.
    pub max_depth: Option<usize>,
    /// Preserve sharing and cycles when copying.
    pub copy_references: bool,
    /// Capacity that graph-scoped tables shrink back to on reset.
    pub retained_capacity: usize,
}

impl Default for TangleConfig {
    fn default() -> Self {
        Self {
            references: true,
            registration_required: true,
            warn_unregistered: false,
            auto_reset: true,
            max_depth: None,
            copy_references: true,
            retained_capacity: DEFAULT_RETAINED_CAPACITY,
        }
    }
}

impl TangleConfig {
    /// Sets [`Self::references`].
    pub fn with_references(mut self, references: bool) -> Self {
        self.references = references;
        self
    }

    /// Sets [`Self::registration_required`].
    pub fn with_registration_required(mut self, required: bool) -> Self {
        self.registration_required = required;
        self
    }

    /// Sets [`Self::warn_unregistered`].
    pub fn with_warn_unregistered(mut self, warn: bool) -> Self {
        self.warn_unregistered = warn;
        self
    }

    /// Sets [`Self::auto_reset`].
    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.auto_reset = auto_reset;
        self
    }

    /// Sets [`Self::max_depth`].
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets [`Self::copy_references`].
    pub fn with_copy_references(mut self, copy_references: bool) -> Self {
        self.copy_references = copy_references;
        self
    }

    /// Sets [`Self::retained_capacity`].
    pub fn with_retained_capacity(mut self, capacity: usize) -> Self {
        self.retained_capacity = capacity;
        self
    }
}
