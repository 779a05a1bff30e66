//! Canonical semantic types.
//!
//! A [`Type`] is the resolved form of a syntactic type expression. Its
//! payload is a closed sum ([`TypeKind`]): every variant carries exactly the
//! data its discriminant needs, so consumers match exhaustively instead of
//! inspecting an untyped tag.
//!
//! The `Display` rendering is the *kind string*. It names a type the way
//! source code spells it and, together with definition identity, is what
//! structural equality compares.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;

use crate::defs::{EnumId, StructId, TraitId};

// ============================================================================
// Primitives
// ============================================================================

/// Scalar types.
///
/// The discriminant order is significant: when two numeric operands of the
/// same family meet, the one with the larger code wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u8)]
pub enum Prim {
    I8 = 1,
    I16,
    I32,
    I64,
    Int,
    U8,
    U16,
    U32,
    U64,
    Uint,
    Uintptr,
    F32,
    F64,
    Bool,
    Str,
}

impl Prim {
    pub fn name(self) -> &'static str {
        match self {
            Prim::I8 => "i8",
            Prim::I16 => "i16",
            Prim::I32 => "i32",
            Prim::I64 => "i64",
            Prim::Int => "int",
            Prim::U8 => "u8",
            Prim::U16 => "u16",
            Prim::U32 => "u32",
            Prim::U64 => "u64",
            Prim::Uint => "uint",
            Prim::Uintptr => "uintptr",
            Prim::F32 => "f32",
            Prim::F64 => "f64",
            Prim::Bool => "bool",
            Prim::Str => "str",
        }
    }

    /// Primitive spelled `name`, including the `byte` and `rune` aliases.
    pub fn from_name(name: &str) -> Option<Prim> {
        Some(match name {
            "i8" => Prim::I8,
            "i16" => Prim::I16,
            "i32" | "rune" => Prim::I32,
            "i64" => Prim::I64,
            "int" => Prim::Int,
            "u8" | "byte" => Prim::U8,
            "u16" => Prim::U16,
            "u32" => Prim::U32,
            "u64" => Prim::U64,
            "uint" => Prim::Uint,
            "uintptr" => Prim::Uintptr,
            "f32" => Prim::F32,
            "f64" => Prim::F64,
            "bool" => Prim::Bool,
            "str" => Prim::Str,
            _ => return None,
        })
    }

    /// Numeric code; larger codes win widening ties.
    pub fn code(self) -> u8 {
        self.into()
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Prim::I8 | Prim::I16 | Prim::I32 | Prim::I64 | Prim::Int)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Prim::U8 | Prim::U16 | Prim::U32 | Prim::U64 | Prim::Uint | Prim::Uintptr
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Prim::F32 | Prim::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Platform-sized integers follow the configured width.
    pub fn is_platform_sized(self) -> bool {
        matches!(self, Prim::Int | Prim::Uint | Prim::Uintptr)
    }

    /// Bit width, `None` for bool and str.
    pub fn bits(self, int_bits: u32) -> Option<u32> {
        Some(match self {
            Prim::I8 | Prim::U8 => 8,
            Prim::I16 | Prim::U16 => 16,
            Prim::I32 | Prim::U32 | Prim::F32 => 32,
            Prim::I64 | Prim::U64 | Prim::F64 => 64,
            Prim::Int | Prim::Uint | Prim::Uintptr => int_bits,
            Prim::Bool | Prim::Str => return None,
        })
    }

    /// Inclusive value range of an integer primitive.
    pub fn int_range(self, int_bits: u32) -> Option<(i128, i128)> {
        if !self.is_integer() {
            return None;
        }
        let bits = self.bits(int_bits)?;
        if self.is_signed() {
            let max = (1i128 << (bits - 1)) - 1;
            Some((-max - 1, max))
        } else {
            Some((0, (1i128 << bits) - 1))
        }
    }

    /// Largest finite magnitude of a float primitive.
    pub fn float_max(self) -> Option<f64> {
        match self {
            Prim::F32 => Some(f32::MAX as f64),
            Prim::F64 => Some(f64::MAX),
            _ => None,
        }
    }
}

// ============================================================================
// Type
// ============================================================================

/// Size of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArraySize {
    Fixed(u64),
    /// `[...]T` waiting for an initializer to fix the count.
    Auto,
}

/// A struct type, possibly instantiated with generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructRef {
    pub id: StructId,
    pub name: Arc<str>,
    pub generics: Vec<Type>,
}

/// A trait or enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedRef<Id> {
    pub id: Id,
    pub name: Arc<str>,
}

/// Parameter of a function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SigParam {
    pub ty: Type,
    pub mutable: bool,
    /// The parameter absorbs trailing arguments; `ty` is the element type.
    pub variadic: bool,
}

/// Function signature. Multiple returns use a tuple `ret`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnSig {
    pub params: Vec<SigParam>,
    pub ret: Type,
}

impl FnSig {
    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }
}

/// The payload of a type, keyed by discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Prim(Prim),
    /// Dynamic type; anything is assignable to it.
    Any,
    /// Type of the untyped `nil` literal.
    Nil,
    Ptr(Box<Type>),
    Ref(Box<Type>),
    Slice(Box<Type>),
    Array { elem: Box<Type>, size: ArraySize },
    Map { key: Box<Type>, value: Box<Type> },
    Fn(Arc<FnSig>),
    Struct(StructRef),
    Trait(NamedRef<TraitId>),
    Enum(NamedRef<EnumId>),
    /// Unbound generic placeholder.
    Generic(Arc<str>),
    /// Multiple values, from multi-return functions and tuple expressions.
    Tuple(Vec<Type>),
}

/// A canonical type.
///
/// Equality and hashing look at [`TypeKind`] only; `original` keeps the
/// alias name a type was reached through, so diagnostics and output can
/// spell it the way the user wrote it.
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub original: Option<Arc<str>>,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

/// Generic name to concrete type.
pub type Bindings = FxHashMap<Arc<str>, Type>;

impl From<TypeKind> for Type {
    fn from(kind: TypeKind) -> Self {
        Type { kind, original: None }
    }
}

impl Type {
    pub fn void() -> Type {
        TypeKind::Void.into()
    }

    pub fn prim(prim: Prim) -> Type {
        TypeKind::Prim(prim).into()
    }

    pub fn int() -> Type {
        Type::prim(Prim::Int)
    }

    pub fn bool() -> Type {
        Type::prim(Prim::Bool)
    }

    pub fn str() -> Type {
        Type::prim(Prim::Str)
    }

    pub fn any() -> Type {
        TypeKind::Any.into()
    }

    pub fn nil() -> Type {
        TypeKind::Nil.into()
    }

    pub fn ptr(inner: Type) -> Type {
        TypeKind::Ptr(Box::new(inner)).into()
    }

    pub fn reference(inner: Type) -> Type {
        TypeKind::Ref(Box::new(inner)).into()
    }

    pub fn slice(elem: Type) -> Type {
        TypeKind::Slice(Box::new(elem)).into()
    }

    pub fn array(elem: Type, size: ArraySize) -> Type {
        TypeKind::Array {
            elem: Box::new(elem),
            size,
        }
        .into()
    }

    pub fn map(key: Type, value: Type) -> Type {
        TypeKind::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
        .into()
    }

    pub fn func(sig: FnSig) -> Type {
        TypeKind::Fn(Arc::new(sig)).into()
    }

    pub fn generic(name: impl Into<Arc<str>>) -> Type {
        TypeKind::Generic(name.into()).into()
    }

    /// A tuple; a single element collapses to that element.
    pub fn tuple(mut items: Vec<Type>) -> Type {
        match items.len() {
            0 => Type::void(),
            1 => items.remove(0),
            _ => TypeKind::Tuple(items).into(),
        }
    }

    /// Attach the alias name this type was reached through.
    pub fn with_original(mut self, alias: impl Into<Arc<str>>) -> Type {
        self.original = Some(alias.into());
        self
    }

    /// The alias name when there is one, otherwise the kind string.
    pub fn spelled(&self) -> String {
        match &self.original {
            Some(alias) => alias.to_string(),
            None => self.to_string(),
        }
    }

    // ------------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------------

    pub fn prim_kind(&self) -> Option<Prim> {
        match self.kind {
            TypeKind::Prim(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.kind, TypeKind::Nil)
    }

    pub fn is_any(&self) -> bool {
        matches!(self.kind, TypeKind::Any)
    }

    pub fn is_bool(&self) -> bool {
        self.prim_kind() == Some(Prim::Bool)
    }

    pub fn is_str(&self) -> bool {
        self.prim_kind() == Some(Prim::Str)
    }

    pub fn is_numeric(&self) -> bool {
        self.prim_kind().is_some_and(Prim::is_numeric)
    }

    pub fn is_integer(&self) -> bool {
        self.prim_kind().is_some_and(Prim::is_integer)
    }

    pub fn is_unsigned(&self) -> bool {
        self.prim_kind().is_some_and(Prim::is_unsigned)
    }

    pub fn is_float(&self) -> bool {
        self.prim_kind().is_some_and(Prim::is_float)
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self.kind, TypeKind::Ptr(_))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.kind, TypeKind::Ref(_))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.kind, TypeKind::Tuple(_))
    }

    /// No pointer, reference, array or slice wrapper.
    pub fn is_pure(&self) -> bool {
        !matches!(
            self.kind,
            TypeKind::Ptr(_) | TypeKind::Ref(_) | TypeKind::Slice(_) | TypeKind::Array { .. }
        )
    }

    /// Whether `nil` is a valid value of this type.
    pub fn is_nilable(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Ptr(_)
                | TypeKind::Slice(_)
                | TypeKind::Map { .. }
                | TypeKind::Fn(_)
                | TypeKind::Trait(_)
                | TypeKind::Any
        )
    }

    /// Whether copying a value of this type still shares memory with the
    /// source, so immutable sources must not flow into mutable bindings.
    pub fn shares_memory(&self) -> bool {
        match &self.kind {
            TypeKind::Ptr(_) | TypeKind::Ref(_) | TypeKind::Slice(_) | TypeKind::Map { .. } => true,
            TypeKind::Array { elem, .. } => elem.shares_memory(),
            TypeKind::Tuple(items) => items.iter().any(Type::shares_memory),
            TypeKind::Struct(s) => s.generics.iter().any(Type::shares_memory),
            _ => false,
        }
    }

    /// Type behind a reference, or the type itself.
    pub fn deref_ref(&self) -> &Type {
        match &self.kind {
            TypeKind::Ref(inner) => inner,
            _ => self,
        }
    }

    /// Struct payload, looking through one reference.
    pub fn as_struct(&self) -> Option<&StructRef> {
        match &self.deref_ref().kind {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Function signature payload.
    pub fn as_fn(&self) -> Option<&Arc<FnSig>> {
        match &self.kind {
            TypeKind::Fn(sig) => Some(sig),
            _ => None,
        }
    }

    /// Components of a tuple, or the type itself as a single component.
    pub fn components(&self) -> Vec<Type> {
        match &self.kind {
            TypeKind::Tuple(items) => items.clone(),
            TypeKind::Void => Vec::new(),
            _ => vec![self.clone()],
        }
    }

    /// Whether any generic placeholder remains.
    pub fn has_generics(&self) -> bool {
        match &self.kind {
            TypeKind::Generic(_) => true,
            TypeKind::Ptr(t) | TypeKind::Ref(t) | TypeKind::Slice(t) => t.has_generics(),
            TypeKind::Array { elem, .. } => elem.has_generics(),
            TypeKind::Map { key, value } => key.has_generics() || value.has_generics(),
            TypeKind::Fn(sig) => {
                sig.ret.has_generics() || sig.params.iter().any(|p| p.ty.has_generics())
            }
            TypeKind::Struct(s) => s.generics.iter().any(Type::has_generics),
            TypeKind::Tuple(items) => items.iter().any(Type::has_generics),
            _ => false,
        }
    }

    /// Replace bound generic placeholders. Unbound ones stay in place.
    pub fn substitute(&self, bindings: &Bindings) -> Type {
        if bindings.is_empty() || !self.has_generics() {
            return self.clone();
        }
        let kind = match &self.kind {
            TypeKind::Generic(name) => {
                return bindings.get(name).cloned().unwrap_or_else(|| self.clone());
            }
            TypeKind::Ptr(t) => TypeKind::Ptr(Box::new(t.substitute(bindings))),
            TypeKind::Ref(t) => TypeKind::Ref(Box::new(t.substitute(bindings))),
            TypeKind::Slice(t) => TypeKind::Slice(Box::new(t.substitute(bindings))),
            TypeKind::Array { elem, size } => TypeKind::Array {
                elem: Box::new(elem.substitute(bindings)),
                size: *size,
            },
            TypeKind::Map { key, value } => TypeKind::Map {
                key: Box::new(key.substitute(bindings)),
                value: Box::new(value.substitute(bindings)),
            },
            TypeKind::Fn(sig) => TypeKind::Fn(Arc::new(sig.substitute(bindings))),
            TypeKind::Struct(s) => TypeKind::Struct(StructRef {
                id: s.id,
                name: s.name.clone(),
                generics: s.generics.iter().map(|g| g.substitute(bindings)).collect(),
            }),
            TypeKind::Tuple(items) => {
                TypeKind::Tuple(items.iter().map(|t| t.substitute(bindings)).collect())
            }
            other => other.clone(),
        };
        kind.into()
    }
}

impl FnSig {
    pub fn substitute(&self, bindings: &Bindings) -> FnSig {
        FnSig {
            params: self
                .params
                .iter()
                .map(|p| SigParam {
                    ty: p.ty.substitute(bindings),
                    mutable: p.mutable,
                    variadic: p.variadic,
                })
                .collect(),
            ret: self.ret.substitute(bindings),
        }
    }
}

// ============================================================================
// Kind strings
// ============================================================================

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Type]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for FnSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if p.mutable {
                f.write_str("mut ")?;
            }
            if p.variadic {
                f.write_str("...")?;
            }
            write!(f, "{}", p.ty)?;
        }
        f.write_str(")")?;
        if !self.ret.is_void() {
            write!(f, ": {}", self.ret)?;
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Void => f.write_str("void"),
            TypeKind::Prim(p) => f.write_str(p.name()),
            TypeKind::Any => f.write_str("any"),
            TypeKind::Nil => f.write_str("nil"),
            TypeKind::Ptr(t) => write!(f, "*{t}"),
            TypeKind::Ref(t) => write!(f, "&{t}"),
            TypeKind::Slice(t) => write!(f, "[]{t}"),
            TypeKind::Array { elem, size } => match size {
                ArraySize::Fixed(n) => write!(f, "[{n}]{elem}"),
                ArraySize::Auto => write!(f, "[...]{elem}"),
            },
            TypeKind::Map { key, value } => write!(f, "[{key}:{value}]"),
            TypeKind::Fn(sig) => write!(f, "{sig}"),
            TypeKind::Struct(s) => {
                f.write_str(&s.name)?;
                if !s.generics.is_empty() {
                    f.write_str("[")?;
                    write_list(f, &s.generics)?;
                    f.write_str("]")?;
                }
                Ok(())
            }
            TypeKind::Trait(t) => f.write_str(&t.name),
            TypeKind::Enum(e) => f.write_str(&e.name),
            TypeKind::Generic(name) => f.write_str(name),
            TypeKind::Tuple(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
        }
    }
}
