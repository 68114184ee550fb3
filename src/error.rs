//! Centralized error handling for Tangle.
//!
//! Every failure the codec can raise is a [`TangleError`]: an [`ErrorKind`] that
//! names what went wrong, plus a trace of what was being written or read when it
//! happened. Nested codecs append to the trace as the error travels outward, so a
//! fault deep inside a graph reads like a path:
//!
//! ```text
//! Buffer underflow: required 4 bytes, 1 available
//! Serialization trace:
//! score (i32)
//! my_app::Player
//! my_app::Team
//! ```
//!
//! ## Design Philosophy
//!
//! 1. **No Panics:** All error conditions are represented as `Result` values. The library
//!    enforces this through `#![deny(clippy::panic)]` and `#![deny(clippy::unwrap_used)]`.
//!
//! 2. **Fatal by Default:** No fault is retried internally. After a failed top-level call
//!    the graph-scoped state of the engine is undefined; call [`crate::Tangle::reset`]
//!    before reusing it.
//!
//! 3. **Cloneable Errors:** [`TangleError`] is `Clone`; I/O errors are wrapped in `Arc`.
//!
//! ## Error Categories
//!
//! Each kind belongs to one [`ErrorCategory`]:
//!
//! - **Buffer** ([`ErrorKind::BufferOverflow`], [`ErrorKind::BufferUnderflow`])
//! - **Resolution** ([`ErrorKind::UnregisteredId`], [`ErrorKind::UnregisteredType`],
//!   [`ErrorKind::TypeNotFound`], [`ErrorKind::NoCodec`])
//! - **Structural** ([`ErrorKind::UnboundReference`], [`ErrorKind::DepthExceeded`],
//!   [`ErrorKind::Format`], [`ErrorKind::TypeMismatch`])
//! - **Construction** ([`ErrorKind::Construction`])
//! - **Io** ([`ErrorKind::Io`])
//! - **Usage** (everything else)
//!
//! ## Usage Patterns
//!
//! ```rust
//! use tangle::{ErrorCategory, ErrorKind, Obj, Tangle, TangleConfig};
//!
//! let mut tangle = Tangle::new();
//! match tangle.to_bytes(&Obj::new(42_i32)) {
//!     Ok(bytes) => println!("{} bytes", bytes.len()),
//!     Err(e) if e.category() == ErrorCategory::Resolution => eprintln!("register first: {e}"),
//!     Err(e) => eprintln!("other error: {e}"),
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Tangle operations.
///
/// Equivalent to `std::result::Result<T, TangleError>`.
pub type Result<T> = std::result::Result<T, TangleError>;

/// Coarse classification of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A buffer ran out of room or out of bytes.
    Buffer,
    /// A type or id could not be resolved.
    Resolution,
    /// The stream or the graph is malformed.
    Structural,
    /// An instance could not be created.
    Construction,
    /// The underlying reader or writer failed.
    Io,
    /// The engine was used incorrectly.
    Usage,
}

/// What went wrong.
#[derive(Debug, Clone)]
pub enum ErrorKind {
    /// Low-level I/O failure of a stream-backed buffer.
    ///
    /// The underlying `io::Error` is wrapped in an `Arc` to make the error `Clone`.
    Io(Arc<io::Error>),

    /// A writer would exceed its configured maximum capacity.
    BufferOverflow {
        /// Bytes the write needed.
        required: usize,
        /// Bytes that could still be accepted.
        available: usize,
    },

    /// A reader needed more bytes than the buffer and its source could provide.
    BufferUnderflow {
        /// Bytes the read needed.
        required: usize,
        /// Bytes that were available.
        available: usize,
    },

    /// Malformed primitive encoding (overlong varint, invalid character, bad marker).
    Format(String),

    /// A class header carried an id that no registration holds.
    UnregisteredId(u32),

    /// Strict mode rejected a type that was never registered.
    UnregisteredType(String),

    /// A type name read from the stream does not resolve to a known type.
    TypeNotFound(String),

    /// A value was not of the type its codec or caller expected.
    TypeMismatch {
        /// Type the caller asked for.
        expected: String,
        /// Type that was actually found.
        found: String,
    },

    /// No codec could be chosen for a type.
    NoCodec(String),

    /// A reference marker pointed at an id that was never bound.
    ///
    /// Either the stream is corrupt or a codec for a cyclic type did not call
    /// [`crate::Tangle::reference`] before reading its children.
    UnboundReference(u32),

    /// The configured maximum traversal depth was exceeded.
    DepthExceeded(usize),

    /// An instantiator failed to create an instance.
    Construction {
        /// Fully qualified name of the target type.
        type_name: String,
        /// Why construction failed.
        reason: String,
    },

    /// The codec for this type cannot produce copies.
    UnsupportedCopy(String),

    /// A bincode payload failed to encode or decode.
    Serialization(String),

    /// Invalid configuration value.
    Config(String),

    /// Logic error inside the library. Please report it.
    Internal(String),
}

impl ErrorKind {
    /// Returns the category this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BufferOverflow { .. } | Self::BufferUnderflow { .. } => ErrorCategory::Buffer,
            Self::UnregisteredId(_)
            | Self::UnregisteredType(_)
            | Self::TypeNotFound(_)
            | Self::NoCodec(_) => ErrorCategory::Resolution,
            Self::UnboundReference(_)
            | Self::DepthExceeded(_)
            | Self::Format(_)
            | Self::TypeMismatch { .. } => ErrorCategory::Structural,
            Self::Construction { .. } => ErrorCategory::Construction,
            Self::Io(_) => ErrorCategory::Io,
            Self::UnsupportedCopy(_)
            | Self::Serialization(_)
            | Self::Config(_)
            | Self::Internal(_) => ErrorCategory::Usage,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::BufferOverflow {
                required,
                available,
            } => write!(
                f,
                "Buffer overflow: required {required} bytes, {available} available"
            ),
            Self::BufferUnderflow {
                required,
                available,
            } => write!(
                f,
                "Buffer underflow: required {required} bytes, {available} available"
            ),
            Self::Format(msg) => write!(f, "Format error: {msg}"),
            Self::UnregisteredId(id) => write!(f, "Encountered unregistered class ID: {id}"),
            Self::UnregisteredType(name) => write!(
                f,
                "Class is not registered: {name}\nNote: to register this class use: tangle.register::<{name}>();"
            ),
            Self::TypeNotFound(name) => write!(f, "Unable to find class: {name}"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {expected}, found {found}")
            }
            Self::NoCodec(name) => write!(f, "No default codec found for type: {name}"),
            Self::UnboundReference(id) => {
                write!(f, "Reference id {id} is not bound to an object")
            }
            Self::DepthExceeded(max) => write!(f, "Max depth exceeded: {max}"),
            Self::Construction { type_name, reason } => {
                write!(f, "Unable to create an instance of {type_name}: {reason}")
            }
            Self::UnsupportedCopy(name) => write!(f, "Codec does not support copy: {name}"),
            Self::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            Self::Config(msg) => write!(f, "Invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

/// The single error type raised by Tangle.
#[derive(Debug, Clone)]
pub struct TangleError {
    kind: ErrorKind,
    trace: Vec<String>,
}

impl TangleError {
    /// Creates an error with an empty trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            trace: Vec::new(),
        }
    }

    /// Shorthand for [`ErrorKind::Format`].
    pub fn format(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format(msg.into()))
    }

    /// Shorthand for [`ErrorKind::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(msg.into()))
    }

    /// Shorthand for [`ErrorKind::TypeMismatch`].
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        })
    }

    /// Appends an entry to the trace and returns the error.
    ///
    /// Entries are pushed innermost first.
    #[must_use]
    pub fn with_trace(mut self, entry: impl Into<String>) -> Self {
        self.trace.push(entry.into());
        self
    }

    /// What went wrong.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The category of [`Self::kind`].
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Trace entries, innermost first.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }
}

impl From<ErrorKind> for TangleError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for TangleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.trace.is_empty() {
            write!(f, "\nSerialization trace:")?;
            for entry in &self.trace {
                write!(f, "\n{entry}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for TangleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for TangleError {
    fn from(err: io::Error) -> Self {
        Self::new(ErrorKind::Io(Arc::new(err)))
    }
}

impl From<bincode::error::EncodeError> for TangleError {
    fn from(err: bincode::error::EncodeError) -> Self {
        Self::new(ErrorKind::Serialization(err.to_string()))
    }
}

impl From<bincode::error::DecodeError> for TangleError {
    fn from(err: bincode::error::DecodeError) -> Self {
        Self::new(ErrorKind::Serialization(err.to_string()))
    }
}
