//! Error types for the corral configuration kernel.
//!
//! The kernel itself accepts all input uncritically and raises no errors of
//! its own. The error type exists for deferred configuration blocks: host
//! code registered via `define` or `provision` runs later, against a
//! configuration it may reject.

use thiserror::Error;

/// Result type alias for operations that may fail with a corral error.
///
/// # Examples
///
/// ```
/// use corral::{Error, Result};
///
/// fn example_block() -> Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the corral library.
///
/// All variants originate in host-supplied configuration code; the kernel's
/// own operations (accumulators, merge, finalize, upgrade) are infallible.
#[derive(Debug, Error)]
pub enum Error {
    /// A deferred configuration block failed during application.
    #[error("configuration block {index} failed: {message}")]
    BlockFailed {
        /// Zero-based position of the block in its registration order.
        index: usize,
        /// Rendered message of the underlying failure.
        message: String,
    },

    /// A configuration block rejected the configuration being built.
    #[error("configuration rejected: {reason}")]
    Rejected {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// An arbitrary error bubbled out of host-supplied configuration code.
    #[error("configuration block error: {source}")]
    Block {
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Builds a [`Error::Rejected`] from any displayable reason.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::Error;
    ///
    /// let err = Error::rejected("memory must be configured");
    /// assert!(err.to_string().contains("memory"));
    /// ```
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Check if the error came from a failed block application.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::Error;
    ///
    /// let err = Error::BlockFailed { index: 0, message: "boom".to_string() };
    /// assert!(err.is_block_failure());
    /// ```
    #[must_use]
    pub fn is_block_failure(&self) -> bool {
        matches!(self, Self::BlockFailed { .. })
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Block { source }
    }
}
