//! Error types for the quickform library.
//!
//! Two families of failure exist here and they do not mix:
//!
//! - [`ValueError`] — a validation failure produced by a processor while a
//!   submitted value runs through an element's pipeline. These are expected,
//!   recoverable, and accumulate as per-field error messages; they are never
//!   raised to the caller.
//! - [`FormError`] — programmer errors. Configuration mistakes (duplicate
//!   ids, unknown element kinds, bad vtype tags) surface immediately at
//!   setup time. The one runtime variant, [`FormError::InvalidValueAccess`],
//!   guards against reading a safe value without checking validity first and
//!   is always avoidable by calling `is_valid()`.

use std::fmt;

use thiserror::Error;

/// A validation failure raised by a processor against a single value.
///
/// Carries only a message; the owning element decides whether the message
/// (or a configured override) lands in its error list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    /// The failure message shown to the user.
    pub message: String,
}

impl ValueError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValueError {}

/// The primary error type for form construction and value access.
#[derive(Error, Debug)]
pub enum FormError {
    /// A safe value was read from an element that failed validation and has
    /// no `if_invalid` fallback configured.
    #[error("\"value\" accessed, but element \"{label}\" is invalid")]
    InvalidValueAccess {
        /// The label (or id) of the offending element.
        label: String,
    },

    /// Two elements were registered with the same id.
    #[error("an element with id \"{0}\" already exists on this form")]
    DuplicateId(String),

    /// Two logical-group members were registered with the same value key.
    #[error("a member of this group already exists with value \"{0}\"")]
    DuplicateMember(String),

    /// An element factory was given a kind tag it does not know.
    #[error("\"{0}\" is not a registered element type")]
    UnknownElementType(String),

    /// A `vtype` tag string did not name a known coercion type.
    #[error("invalid vtype \"{0}\"")]
    InvalidVtype(String),

    /// A processor was attached to an element kind that does not support it.
    #[error("processor misuse: {0}")]
    ProcessorMisuse(String),

    /// A catch-all for other misconfigurations detected at setup time.
    #[error("programming error: {0}")]
    Programming(String),
}

/// A convenience alias for `Result<T, FormError>`.
pub type FormResult<T> = Result<T, FormError>;
