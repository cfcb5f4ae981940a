//! Utility Module
//!
//! Shared infrastructure for the material system:
//!
//! - [`interner`]: String interning for efficient symbol storage
//! - [`hashing`]: Fixed-seed 32-bit content hashing for cache keys
//!
//! # String Interning
//!
//! Property and piece names are interned once; afterwards they are
//! compared and hashed as integer symbols.
//!
//! ```rust,ignore
//! use hlms::utils::interner;
//!
//! let sym1 = interner::intern("hlms_normal");
//! let sym2 = interner::intern("hlms_normal");
//! assert_eq!(sym1, sym2); // O(1) comparison
//! ```

pub mod hashing;
pub mod interner;

pub use interner::Symbol;
