//! Global string interner.
//!
//! Converts strings into compact integer [`Symbol`]s so that property and
//! piece names can be compared and stored cheaply. The pool lives for the
//! whole process; interning the same string twice yields the same symbol.

use lasso::{Spur, ThreadedRodeo};
use once_cell::sync::Lazy;

static INTERNER: Lazy<ThreadedRodeo> = Lazy::new(ThreadedRodeo::new);

/// Compact integer identifier for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning its symbol.
///
/// Adds the string to the pool if it is not already present.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already-interned string.
///
/// Returns `None` without allocating if the string was never interned.
#[inline]
#[must_use]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
#[must_use]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}
