//! Shader Macro Sets
//!
//! A material enables feature macros (`USE_NORMAL_MAP`, `LIGHT_COUNT 4`, ...)
//! that specialize its shader. [`ShaderDefines`] stores them as interned
//! symbol pairs kept in sorted order, so two sets holding the same macros
//! always hash identically regardless of insertion order. The hash keys the
//! compiled-shader cache in [`ShaderLibrary`](crate::resources::ShaderLibrary).
//!
//! # Macro strings
//!
//! Authoring tools pass macros as strings. A bare name (`"USE_MAP"`) enables
//! the macro with value `1`; a name followed by whitespace and a value
//! (`"LIGHT_COUNT 4"`) sets that value.

use std::hash::{BuildHasher, Hash, Hasher};

use crate::utils::interner::{self, Symbol};

/// An ordered set of enabled shader macros.
#[derive(Debug, Clone, Default)]
pub struct ShaderDefines {
    defines: Vec<(Symbol, Symbol)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: Vec::new(),
        }
    }

    /// Builds a set from authoring macro strings (see module docs).
    #[must_use]
    pub fn from_macros<S: AsRef<str>>(macros: &[S]) -> Self {
        let mut defines = Self::new();
        for m in macros {
            defines.enable(m.as_ref());
        }
        defines
    }

    /// Sets a macro value, replacing any existing value.
    pub fn set(&mut self, key: &str, value: &str) {
        let key_sym = interner::intern(key);
        let value_sym = interner::intern(value);
        match self.defines.binary_search_by_key(&key_sym, |&(k, _)| k) {
            Ok(idx) => self.defines[idx].1 = value_sym,
            Err(idx) => self.defines.insert(idx, (key_sym, value_sym)),
        }
    }

    /// Enables a macro from its authoring form: `"NAME"` or `"NAME VALUE"`.
    pub fn enable(&mut self, macro_str: &str) {
        let trimmed = macro_str.trim();
        if trimmed.is_empty() {
            return;
        }
        match trimmed.split_once(char::is_whitespace) {
            Some((name, value)) => self.set(name, value.trim()),
            None => self.set(trimmed, "1"),
        }
    }

    /// Removes a macro. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let Some(key_sym) = interner::get(key) else {
            return false;
        };
        if let Ok(idx) = self.defines.binary_search_by_key(&key_sym, |&(k, _)| k) {
            self.defines.remove(idx);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        interner::get(key).is_some_and(|key_sym| {
            self.defines
                .binary_search_by_key(&key_sym, |&(k, _)| k)
                .is_ok()
        })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static str> {
        let key_sym = interner::get(key)?;
        self.defines
            .binary_search_by_key(&key_sym, |&(k, _)| k)
            .ok()
            .map(|idx| interner::resolve(self.defines[idx].1))
    }

    #[inline]
    pub fn clear(&mut self) {
        self.defines.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Iterates `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.defines
            .iter()
            .map(|&(k, v)| (interner::resolve(k), interner::resolve(v)))
    }

    /// Returns the macros in authoring form, sorted by name.
    #[must_use]
    pub fn to_macros(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .iter()
            .map(|(k, v)| if v == "1" { k.to_string() } else { format!("{k} {v}") })
            .collect();
        out.sort();
        out
    }

    /// Content hash used as part of the compiled-shader cache key.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        rustc_hash::FxBuildHasher.hash_one(self)
    }
}

impl Hash for ShaderDefines {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.defines.hash(state);
    }
}

impl PartialEq for ShaderDefines {
    fn eq(&self, other: &Self) -> bool {
        self.defines == other.defines
    }
}

impl Eq for ShaderDefines {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_bare_and_valued_macros() {
        let mut defines = ShaderDefines::new();
        defines.enable("USE_MAP");
        defines.enable("LIGHT_COUNT 4");

        assert!(defines.contains("USE_MAP"));
        assert_eq!(defines.get("USE_MAP"), Some("1"));
        assert_eq!(defines.get("LIGHT_COUNT"), Some("4"));
        assert!(!defines.contains("USE_AO_MAP"));
    }

    #[test]
    fn test_remove() {
        let mut defines = ShaderDefines::from_macros(&["USE_MAP", "USE_FOG"]);
        assert!(defines.remove("USE_MAP"));
        assert!(!defines.remove("USE_MAP"));
        assert_eq!(defines.len(), 1);
    }

    #[test]
    fn test_hash_independent_of_insertion_order() {
        let d1 = ShaderDefines::from_macros(&["A", "B 2"]);
        let d2 = ShaderDefines::from_macros(&["B 2", "A"]);

        assert_eq!(d1, d2);
        assert_eq!(d1.compute_hash(), d2.compute_hash());
    }

    #[test]
    fn test_to_macros_round_trip() {
        let d = ShaderDefines::from_macros(&["USE_SKINNING", "LIGHT_COUNT 2"]);
        assert_eq!(d.to_macros(), vec!["LIGHT_COUNT 2".to_string(), "USE_SKINNING".to_string()]);
        assert_eq!(ShaderDefines::from_macros(&d.to_macros()), d);
    }
}
