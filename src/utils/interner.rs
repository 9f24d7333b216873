//! Global String Interner
//!
//! Maps macro names and values to compact integer [`Symbol`]s so macro sets can
//! be compared and hashed without touching string data.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Interned string identifier.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol if it was seen before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already-interned string without allocating.
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

/// Pre-interns the macro names the built-in shader templates guard on.
pub fn preload_common_macros() {
    let common = [
        "USE_MAP",
        "USE_NORMAL_MAP",
        "USE_EMISSIVE_MAP",
        "USE_ALPHA_TEST",
        "USE_SKINNING",
        "USE_INSTANCING",
        "LIGHT_COUNT",
        "1",
    ];

    for name in common {
        intern(name);
    }
}
