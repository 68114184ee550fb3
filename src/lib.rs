//! # Tangle
//!
//! A binary object-graph codec. Tangle turns live, possibly cyclic graphs of
//! reference-counted objects into a compact byte stream and back, without a
//! hand-written schema per type.
//!
//! ## Overview
//!
//! Every value goes through one [`Tangle`] engine, which writes up to three parts:
//!
//! ```text
//! [class header]  varint(id + 2) | 0 = null | 1 = by name (name id, then the name once)
//! [reference]     varint: 0 = null | 1 = first occurrence | n >= 2 = repeat of id n - 2
//! [payload]       the type's codec bytes
//! ```
//!
//! An object reachable through several edges is written once; later edges write
//! only its reference id. A codec for a type that can refer back to itself binds
//! the new instance with [`Tangle::reference`] before reading its fields, so
//! cycles resolve to the very same instance on read.
//!
//! ### Key Features
//!
//! *   **Identity-preserving:** sharing and cycles survive a round trip and a deep copy.
//! *   **Compact:** variable-length integers, small registration ids, type names sent
//!     at most once per graph.
//! *   **Derivable:** `#[derive(Structural)]` generates a field-by-field codec;
//!     `#[tangle(cyclic)]` makes it read in place for cyclic types.
//! *   **Serde bridge:** [`codec::SerdeCodec`] embeds any serde type as a bincode payload.
//! *   **Bounded:** an optional maximum depth turns runaway recursion into an error.
//!
//! ## Core Concepts
//!
//! ### Objects
//!
//! An [`Obj`] is a type-erased `Rc` handle. Identity is the allocation: two
//! handles are the same object exactly when they share it. Struct fields of type
//! `Rc<T>` or `Obj` are graph edges.
//!
//! ### Registration
//!
//! The [`registry::TypeRegistry`] maps types to small ids. By default
//! registration is required; the reader and writer must register the same
//! types in the same order (or with the same explicit ids). With registration
//! not required, unknown types are registered on first use and sent by name.
//!
//! ### Graph Lifecycle
//!
//! Name ids and reference ids live for one top-level call. With auto-reset on
//! (the default) they are cleared when the call returns; with it off, several
//! calls share one id space until [`Tangle::reset`] is called.
//!
//! ## Usage Patterns
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tangle::{Obj, Structural, Tangle};
//!
//! #[derive(Structural)]
//! #[tangle(cyclic)]
//! struct Node {
//!     name: RefCell<String>,
//!     next: RefCell<Option<Rc<Node>>>,
//! }
//!
//! let mut tangle = Tangle::new();
//! tangle.register::<Node>()?;
//!
//! let node = Rc::new(Node {
//!     name: RefCell::new("loop".into()),
//!     next: RefCell::new(None),
//! });
//! *node.next.borrow_mut() = Some(Rc::clone(&node));
//!
//! let bytes = tangle.to_bytes(&Obj::from_rc(Rc::clone(&node)))?;
//! let read = tangle.from_bytes(&bytes)?.and_then(|o| o.downcast::<Node>()).unwrap();
//! let next = read.next.borrow().clone().unwrap();
//! assert!(Rc::ptr_eq(&read, &next));
//! # *node.next.borrow_mut() = None;
//! # *read.next.borrow_mut() = None;
//! # Ok::<(), tangle::TangleError>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **No Unsafe:** the crate forbids `unsafe` code.
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Traced Errors:** every failure is a [`TangleError`] carrying the path of
//!   types and fields being processed.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

extern crate self as tangle;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod generics;
pub mod instantiator;
pub mod io;
pub mod object;
pub mod references;
pub mod registry;

// --- INTERNAL IMPLEMENTATION MODULES ---
pub mod collections;

// --- MACRO SUPPORT MODULES ---

/// Runtime utilities used by the derived code.
pub mod rt;

// --- RE-EXPORTS ---

pub use codec::{Codable, Codec, ListCodec, SerdeCodec, Structural, StructuralCodec, ValueCodec};
pub use config::TangleConfig;
pub use engine::Tangle;
pub use error::{ErrorCategory, ErrorKind, Result, TangleError};
pub use object::{Obj, TypeInfo};
pub use registry::{Registration, TypeMatcher};
pub use tangle_derive::Structural;

/// Wire and sizing constants.
pub mod constants {
    /// Header value for null, in both class and reference headers.
    pub const NULL: i32 = 0;
    /// Reference header value for the first occurrence of an object.
    pub const NOT_NULL: i32 = 1;
    /// Class header value introducing a type written by name.
    pub const NAME: i32 = 1;
    /// Largest explicit registration id; `id + 2` must fit a positive `i32`.
    pub const MAX_REGISTRATION_ID: u32 = i32::MAX as u32 - 2;
    /// Capacity graph-scoped tables shrink back to on reset.
    pub const DEFAULT_RETAINED_CAPACITY: usize = 2048;
    /// Initial size of buffers created by the convenience API.
    pub const DEFAULT_BUFFER_SIZE: usize = 4096;
    /// Upper bound on capacity reserved up front from a length read off the wire.
    pub const MAX_PREALLOCATION: usize = 1 << 16;
}
