//! # formwork-core: Foundational Types for formwork
//!
//! This crate is the leaf of the formwork workspace. It defines the data
//! every other crate operates on and the error contract they report through.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One closed dynamic value type.** [`Value`] is the only representation
//!    of untyped input (`Null`, `Bool`, `Int`, `Float`, `String`, `Bytes`,
//!    `List`, `Map`). Validators and the coercion engine are defined purely in
//!    terms of it; there is no `dyn Any` anywhere in the workspace.
//!
//! 2. **String keys only.** [`Map`] is keyed by `String` and preserves
//!    insertion order. Documents with non-string map keys are rejected at
//!    load time by the parsers in [`document`].
//!
//! 3. **Typed data without a JSON detour.** [`to_value`] and [`from_value`]
//!    move serde types in and out of [`Value`] directly, keeping map order
//!    and byte payloads intact.
//!
//! 4. **Scoped, chainable errors.** [`ChainableError`] carries a message,
//!    code, optional data and an [`ErrorScope`]. Rendering for a consumer
//!    redacts anything above the consumer's scope.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `formwork-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - No I/O: parsers take strings, callers read the files.

pub mod document;
pub mod error;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use document::DocumentFormat;
pub use error::{
    Cause, ChainableError, ErrorScope, StructuredError, StructuredErrorWithTraceback, ValueError,
};
pub use value::{from_value, to_value, Map, Value, ValueKind};
