//! Core type definitions: index arenas and the C type tree.

pub mod ir;

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use bitflags::bitflags;

use crate::Symbol;

/// A newtype for indexes into an [`IdxVec`].
pub trait Idx: Copy + Eq {
  /// Convert from `T` to `usize`.
  fn into_usize(self) -> usize;
  /// Convert from `usize` to `T`.
  fn from_usize(_: usize) -> Self;
  /// Generate a fresh index from a `&mut` counter.
  #[must_use] fn fresh(&mut self) -> Self {
    let n = *self;
    *self = Self::from_usize(self.into_usize() + 1);
    n
  }
}

impl Idx for usize {
  fn into_usize(self) -> usize { self }
  fn from_usize(n: usize) -> Self { n }
}

/// A vector indexed by a custom indexing type `I`, usually a newtyped
/// integer.
#[derive(Clone)]
pub struct IdxVec<I, T>(pub Vec<T>, PhantomData<I>);

impl<I, T: fmt::Debug> fmt::Debug for IdxVec<I, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl<I, T> Default for IdxVec<I, T> {
  fn default() -> Self { Self(vec![], PhantomData) }
}

impl<I, T> IdxVec<I, T> {
  /// Construct a new empty [`IdxVec`].
  #[must_use] pub fn new() -> Self { Self::default() }

  /// The number of elements in the vector.
  #[must_use] pub fn len(&self) -> usize { self.0.len() }

  /// Whether the vector is empty.
  #[must_use] pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<I: Idx, T> IdxVec<I, T> {
  /// Push a new value, returning its index.
  pub fn push(&mut self, t: T) -> I {
    let i = I::from_usize(self.0.len());
    self.0.push(t);
    i
  }

  /// An iterator over the indexed elements.
  pub fn enum_iter(&self) -> impl Iterator<Item = (I, &T)> {
    self.0.iter().enumerate().map(|(i, t)| (I::from_usize(i), t))
  }
}

impl<I: Idx, T> Index<I> for IdxVec<I, T> {
  type Output = T;
  fn index(&self, i: I) -> &T { &self.0[i.into_usize()] }
}

impl<I: Idx, T> IndexMut<I> for IdxVec<I, T> {
  fn index_mut(&mut self, i: I) -> &mut T { &mut self.0[i.into_usize()] }
}

/// Generate unit newtypes implementing [`Idx`].
macro_rules! mk_id {
  ($($(#[$attr:meta])* $id:ident),* $(,)?) => {$(
    $(#[$attr])*
    #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct $id(pub u32);

    impl $crate::types::Idx for $id {
      fn from_usize(n: usize) -> Self { Self(n.try_into().expect("overflow")) }
      fn into_usize(self) -> usize { self.0 as usize }
    }

    impl std::fmt::Debug for $id {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, concat!(stringify!($id), "({})"), self.0)
      }
    }
  )*}
}
pub(crate) use mk_id;

bitflags! {
  /// Type qualifier flags collected from declaration specifiers and
  /// pointer declarators.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
  pub struct Quals: u8 {
    /// `const`
    const CONST = 1 << 0;
    /// `volatile`
    const VOLATILE = 1 << 1;
  }
}

/// A C type. Type nodes are built bottom-up, immutable once constructed,
/// and form a DAG rooted at declarator results.
pub type Type = Rc<TypeS>;

/// The payload of a [`Type`] node.
#[derive(Debug, PartialEq, Eq)]
pub struct TypeS {
  /// The type constructor.
  pub k: TypeKind,
  /// Qualifier flags.
  pub quals: Quals,
  /// Size in bytes. An array of unspecified length has size 0 and is
  /// "incomplete".
  pub size: u64,
}

/// The type constructors of the language subset.
#[derive(Debug, PartialEq, Eq)]
pub enum TypeKind {
  /// `char`, 1 byte.
  Char,
  /// All integer specifier combinations collapse to one 8 byte signed rank.
  Int64,
  /// `float` and `double` collapse to 8 bytes.
  Double,
  /// `void`, no size.
  Void,
  /// Pointer to the pointee type.
  Pointer(Type),
  /// `Array(n, element)`: `n` elements; `n = 0` means unspecified length.
  Array(u64, Type),
  /// Function type.
  Function(Box<FnType>),
}

/// The contents of a function type node.
#[derive(Debug, PartialEq, Eq)]
pub struct FnType {
  /// The return type.
  pub ret: Type,
  /// Argument types, in order.
  pub args: Vec<Type>,
  /// Parameter names parallel to `args`. A name may be absent in a
  /// prototype declarator; absent names are rejected at a definition.
  pub params: Vec<Option<Symbol>>,
  /// Whether the parameter list ended in `, ...`.
  pub variadic: bool,
}

impl TypeS {
  /// A fresh scalar node of the given kind, with the platform byte size.
  #[must_use] pub fn scalar(k: TypeKind, quals: Quals) -> Type {
    let size = match k {
      TypeKind::Char => 1,
      TypeKind::Int64 | TypeKind::Double => 8,
      TypeKind::Void => 0,
      _ => panic!("not a scalar: {k:?}"),
    };
    Rc::new(Self { k, quals, size })
  }

  /// An unqualified `int`.
  #[must_use] pub fn int64() -> Type { Self::scalar(TypeKind::Int64, Quals::empty()) }

  /// A pointer to `to`. The qualifiers are the pointer's own, not the
  /// pointee's.
  #[must_use] pub fn ptr(to: Type, quals: Quals) -> Type {
    Rc::new(Self { k: TypeKind::Pointer(to), quals, size: 8 })
  }

  /// An array of `len` elements. `len = 0` leaves the array incomplete with
  /// size 0; otherwise the size is computed bottom-up from the element size.
  #[must_use] pub fn array(len: u64, elem: Type) -> Type {
    let size = len * elem.size;
    Rc::new(Self { k: TypeKind::Array(len, elem), quals: Quals::empty(), size })
  }

  /// A function type with return type `ret`.
  #[must_use] pub fn func(ret: Type, args: Vec<Type>, params: Vec<Option<Symbol>>,
    variadic: bool
  ) -> Type {
    debug_assert_eq!(args.len(), params.len());
    Rc::new(Self {
      k: TypeKind::Function(Box::new(FnType { ret, args, params, variadic })),
      quals: Quals::empty(),
      size: 0,
    })
  }

  /// The element/pointee type. Defined only for pointers and arrays.
  #[must_use] pub fn deref(&self) -> Option<&Type> {
    match &self.k {
      TypeKind::Pointer(t) | TypeKind::Array(_, t) => Some(t),
      _ => None,
    }
  }

  /// Whether this is a pointer type.
  #[must_use] pub fn is_pointer(&self) -> bool { matches!(self.k, TypeKind::Pointer(_)) }

  /// Whether this is an array type.
  #[must_use] pub fn is_array(&self) -> bool { matches!(self.k, TypeKind::Array(..)) }

  fn rank(&self) -> u8 {
    match self.k {
      TypeKind::Char => 1,
      TypeKind::Int64 => 2,
      TypeKind::Double => 3,
      // void and function operands lose to any arithmetic type
      _ => 0,
    }
  }

  fn decay(t: &Type) -> Type {
    match &t.k {
      TypeKind::Array(_, elem) => Self::ptr(elem.clone(), Quals::empty()),
      TypeKind::Pointer(elem) if !t.quals.is_empty() => Self::ptr(elem.clone(), Quals::empty()),
      _ => t.clone(),
    }
  }

  /// Usual arithmetic conversion: the higher-ranked of two scalar types,
  /// with array-to-pointer decay applied on both sides first. The result
  /// carries no qualifiers. Pointers absorb integer operands, as in pointer
  /// arithmetic.
  #[must_use] pub fn combine(a: &Type, b: &Type) -> Type {
    let a = Self::decay(a);
    let b = Self::decay(b);
    if a.is_pointer() { return a }
    if b.is_pointer() { return b }
    let wide = if a.rank() >= b.rank() { a } else { b };
    if wide.quals.is_empty() { return wide }
    let kind = match wide.k {
      TypeKind::Char => TypeKind::Char,
      TypeKind::Int64 => TypeKind::Int64,
      TypeKind::Double => TypeKind::Double,
      _ => TypeKind::Void,
    };
    Self::scalar(kind, Quals::empty())
  }
}

impl fmt::Display for TypeS {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.quals.contains(Quals::CONST) { write!(f, "const ")? }
    if self.quals.contains(Quals::VOLATILE) { write!(f, "volatile ")? }
    match &self.k {
      TypeKind::Char => write!(f, "char"),
      TypeKind::Int64 => write!(f, "int"),
      TypeKind::Double => write!(f, "double"),
      TypeKind::Void => write!(f, "void"),
      TypeKind::Pointer(t) => write!(f, "{t} *"),
      TypeKind::Array(0, t) => write!(f, "{t} []"),
      TypeKind::Array(n, t) => write!(f, "{t} [{n}]"),
      TypeKind::Function(ft) => {
        write!(f, "{} (", ft.ret)?;
        for (i, arg) in ft.args.iter().enumerate() {
          if i != 0 { write!(f, ", ")? }
          write!(f, "{arg}")?;
        }
        if ft.variadic { write!(f, ", ...")? }
        write!(f, ")")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scalar_sizes() {
    assert_eq!(TypeS::scalar(TypeKind::Char, Quals::empty()).size, 1);
    assert_eq!(TypeS::int64().size, 8);
    assert_eq!(TypeS::scalar(TypeKind::Double, Quals::empty()).size, 8);
    assert_eq!(TypeS::scalar(TypeKind::Void, Quals::empty()).size, 0);
  }

  #[test]
  fn array_sizes_compose() {
    let inner = TypeS::array(2, TypeS::int64());
    assert_eq!(inner.size, 16);
    let outer = TypeS::array(3, inner);
    assert_eq!(outer.size, 48);
    assert_eq!(TypeS::array(0, TypeS::int64()).size, 0);
  }

  #[test]
  fn combine_prefers_rank() {
    let c = TypeS::scalar(TypeKind::Char, Quals::empty());
    let i = TypeS::int64();
    let d = TypeS::scalar(TypeKind::Double, Quals::empty());
    assert_eq!(TypeS::combine(&c, &i).k, TypeKind::Int64);
    assert_eq!(TypeS::combine(&i, &d).k, TypeKind::Double);
    assert_eq!(TypeS::combine(&i, &i).k, TypeKind::Int64);
  }

  #[test]
  fn combine_decays_arrays_and_strips_quals() {
    let arr = TypeS::array(4, TypeS::int64());
    let i = TypeS::int64();
    let combined = TypeS::combine(&arr, &i);
    assert!(combined.is_pointer());
    let ci = TypeS::scalar(TypeKind::Int64, Quals::CONST);
    assert_eq!(TypeS::combine(&ci, &i).quals, Quals::empty());
  }
}
