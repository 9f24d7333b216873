//! Utility Module
//!
//! - [`interner`]: String interning for shader macro names and values.
//!
//! Interned strings ([`Symbol`]) compare in O(1), which keeps macro-set
//! hashing cheap on the material rebind path.

pub mod interner;

pub use interner::Symbol;
