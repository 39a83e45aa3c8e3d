//! The global symbol interner.
//!
//! Identifiers and literal lexemes are interned once at lex time; all later
//! comparisons are `u32` equality on [`Symbol`].

use std::fmt;
use std::sync::{LazyLock, Mutex};

use hashbrown::HashMap;

/// An interned string.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

/// The string interner, wrapped in a global mutex.
///
/// Interned strings are leaked, which is fine because symbols live for the
/// whole compilation anyway.
#[derive(Default)]
pub struct Interner {
  names: HashMap<&'static str, Symbol>,
  strings: Vec<&'static str>,
}

impl Interner {
  fn intern(&mut self, s: &str) -> Symbol {
    if let Some(&sym) = self.names.get(s) { return sym }
    let sym = Symbol(self.strings.len().try_into().expect("interner overflow"));
    let s: &'static str = Box::leak(s.to_owned().into_boxed_str());
    self.strings.push(s);
    self.names.insert(s, sym);
    sym
  }
}

static INTERNER: LazyLock<Mutex<Interner>> = LazyLock::new(Mutex::default);

/// Intern a string, returning its [`Symbol`].
pub fn intern(s: &str) -> Symbol { INTERNER.lock().expect("poisoned").intern(s) }

impl Symbol {
  /// The underlying index of this symbol in the interner.
  #[must_use] pub fn into_usize(self) -> usize { self.0 as usize }

  /// The string this symbol was interned from.
  #[must_use] pub fn as_str(self) -> &'static str {
    INTERNER.lock().expect("poisoned").strings[self.into_usize()]
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.as_str().fmt(f) }
}

impl fmt::Debug for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", self.as_str()) }
}

/// Build a dense `Symbol`-indexed map from a sparse list of entries.
/// Used for keyword tables, where the keywords are interned early and
/// therefore have small indices.
#[must_use]
pub fn init_dense_symbol_map<T: Copy>(xs: &[(Symbol, T)]) -> Box<[Option<T>]> {
  let mut vec = vec![];
  for &(s, t) in xs {
    let n = s.into_usize();
    if vec.len() <= n { vec.resize(n + 1, None) }
    vec[n] = Some(t);
  }
  vec.into()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn intern_is_idempotent() {
    let a = intern("foo");
    let b = intern("foo");
    assert_eq!(a, b);
    assert_ne!(a, intern("bar"));
    assert_eq!(a.as_str(), "foo");
  }

  #[test]
  fn dense_map_round_trips() {
    let (a, b) = (intern("alpha"), intern("beta"));
    let map = init_dense_symbol_map(&[(a, 0u8), (b, 1u8)]);
    assert_eq!(map[a.into_usize()], Some(0));
    assert_eq!(map[b.into_usize()], Some(1));
  }
}
