//! The scoped symbol table.
//!
//! Symbol records live in a translation-unit arena and are referenced by
//! [`SymId`]; scope frames hold only the lookup bindings. Popping a scope
//! removes visibility without touching the records, so references already
//! emitted into IR stay valid for the rest of the compile.

use std::ops::Index;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::Symbol;
use crate::error::{CResult, CompileError};
use crate::types::{IdxVec, Quals, Type, TypeKind, TypeS, mk_id};

mk_id! {
  /// A reference to a symbol record in the translation-unit arena.
  SymId,
}

/// A compile-time constant carried inline by an immediate symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imm {
  /// A 64-bit signed integer constant.
  Int(i64),
  /// A string literal lexeme.
  Str(Symbol),
}

/// A symbol record.
#[derive(Debug)]
pub struct SymbolS {
  /// The name, or `None` for temporaries.
  pub name: Option<Symbol>,
  /// The type of the symbol.
  pub ty: Type,
  /// The scope depth at definition. Depth 0 is file scope.
  pub depth: u32,
  /// `Some` iff this symbol is an immediate constant.
  pub imm: Option<Imm>,
}

impl SymbolS {
  /// Whether this symbol is a compile-time constant.
  #[must_use] pub fn is_immediate(&self) -> bool { self.imm.is_some() }
}

/// One scope frame: the names it introduced, remembered so the bindings can
/// be discarded at pop.
#[derive(Debug, Default)]
struct Frame {
  names: SmallVec<[Symbol; 8]>,
}

/// The symbol table: the symbol arena plus the scope stack and the name
/// lookup index.
#[derive(Debug, Default)]
pub struct SymTab {
  syms: IdxVec<SymId, SymbolS>,
  /// Scope frames, innermost last.
  frames: Vec<Frame>,
  /// Name to visible bindings, innermost last. The stack discipline makes
  /// lookup O(1): the innermost binding is always on top.
  lookup: HashMap<Symbol, SmallVec<[SymId; 2]>>,
}

impl SymTab {
  /// The current scope depth. Depth 0 is file scope.
  ///
  /// # Panics
  /// Panics if no scope has been pushed yet.
  #[must_use] pub fn depth(&self) -> u32 {
    u32::try_from(self.frames.len()).expect("overflow") - 1
  }

  /// Open a new scope.
  pub fn push_scope(&mut self) { self.frames.push(Frame::default()) }

  /// Close the innermost scope, discarding its lookup bindings. The symbol
  /// records themselves stay in the arena.
  pub fn pop_scope(&mut self) {
    let frame = self.frames.pop().expect("scope underflow");
    for name in frame.names {
      let stack = self.lookup.get_mut(&name).expect("missing binding");
      stack.pop();
      if stack.is_empty() { self.lookup.remove(&name); }
    }
  }

  /// Bind `name` at the current depth to a fresh symbol of type `ty`.
  /// Rebinding a name already bound at the current depth returns the
  /// existing symbol (a redeclaration of the same object); a binding at an
  /// outer depth is shadowed instead.
  pub fn add(&mut self, name: Symbol, ty: Type) -> SymId {
    let depth = self.depth();
    if let Some(&id) = self.lookup.get(&name).and_then(|stack| stack.last()) {
      if self.syms[id].depth == depth { return id }
    }
    let id = self.syms.push(SymbolS { name: Some(name), ty, depth, imm: None });
    self.lookup.entry(name).or_default().push(id);
    self.frames.last_mut().expect("no open scope").names.push(name);
    id
  }

  /// Innermost-first lookup; the first match wins.
  #[must_use] pub fn lookup(&self, name: Symbol) -> Option<SymId> {
    self.lookup.get(&name).and_then(|stack| stack.last().copied())
  }

  /// Iterate over every symbol record in the arena, including the ones
  /// whose scopes have been popped.
  pub fn symbols(&self) -> impl Iterator<Item = (SymId, &SymbolS)> {
    self.syms.enum_iter()
  }

  /// Allocate a nameless temporary of type `ty`. Temporaries never appear
  /// in lookup.
  pub fn mktemp(&mut self, ty: Type) -> SymId {
    self.syms.push(SymbolS { name: None, ty, depth: self.depth(), imm: None })
  }

  /// Build an `int` immediate from its decimal text.
  pub fn mkimmediate(&mut self, lexeme: Symbol) -> CResult<SymId> {
    let v = lexeme.as_str().parse::<i64>().map_err(|_| CompileError::Constant(
      format!("integer literal `{lexeme}` does not fit in 64 bits")))?;
    Ok(self.mkimmediate_long(v))
  }

  /// Build an `int` immediate from a native value.
  pub fn mkimmediate_long(&mut self, v: i64) -> SymId {
    let depth = self.depth();
    self.syms.push(SymbolS {
      name: None,
      ty: TypeS::int64(),
      depth,
      imm: Some(Imm::Int(v)),
    })
  }

  /// Build a `char *` immediate for a string literal.
  pub fn mkimmediate_str(&mut self, lexeme: Symbol) -> SymId {
    let depth = self.depth();
    self.syms.push(SymbolS {
      name: None,
      ty: TypeS::ptr(TypeS::scalar(TypeKind::Char, Quals::empty()), Quals::empty()),
      depth,
      imm: Some(Imm::Str(lexeme)),
    })
  }
}

impl Index<SymId> for SymTab {
  type Output = SymbolS;
  fn index(&self, i: SymId) -> &SymbolS { &self.syms[i] }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::intern;

  fn table() -> SymTab {
    let mut tab = SymTab::default();
    tab.push_scope();
    tab
  }

  #[test]
  fn redeclaration_at_same_depth_returns_existing() {
    let mut tab = table();
    let x = intern("x");
    let a = tab.add(x, TypeS::int64());
    let b = tab.add(x, TypeS::int64());
    assert_eq!(a, b);
  }

  #[test]
  fn shadowing_and_pop_restore() {
    let mut tab = table();
    let x = intern("x");
    let outer = tab.add(x, TypeS::int64());
    tab.push_scope();
    let inner = tab.add(x, TypeS::int64());
    assert_ne!(outer, inner);
    assert_eq!(tab.lookup(x), Some(inner));
    tab.pop_scope();
    assert_eq!(tab.lookup(x), Some(outer));
  }

  #[test]
  fn popped_names_no_longer_resolve() {
    let mut tab = table();
    let y = intern("y");
    tab.push_scope();
    let id = tab.add(y, TypeS::int64());
    tab.pop_scope();
    assert_eq!(tab.lookup(y), None);
    // the record survives the pop
    assert_eq!(tab[id].name, Some(y));
  }

  #[test]
  fn temporaries_are_invisible() {
    let mut tab = table();
    let t = tab.mktemp(TypeS::int64());
    assert!(tab[t].name.is_none());
    assert_eq!(tab[t].imm, None);
  }

  #[test]
  fn immediates_decode_decimal() {
    let mut tab = table();
    let id = tab.mkimmediate(intern("1234")).expect("decode");
    assert_eq!(tab[id].imm, Some(Imm::Int(1234)));
    assert!(tab[id].is_immediate());
    assert!(tab.mkimmediate(intern("99999999999999999999")).is_err());
  }
}
