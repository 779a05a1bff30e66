//! Evaluated expression values.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use ordered_float::OrderedFloat;

use crate::types::Type;

bitflags! {
    /// Facets of an evaluated value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValueFlags: u8 {
        /// Known at compile time, or a `const` binding.
        const CONSTANT = 1 << 0;
        /// Writable through this value.
        const MUTABLE = 1 << 1;
        /// Addressable storage.
        const LVALUE = 1 << 2;
        /// Spread with `...` into a variadic parameter.
        const VARIADIC = 1 << 3;
        /// The expression names a type, not a value.
        const TYPE_LITERAL = 1 << 4;
        /// Literal constant that still adapts to the type it meets.
        const UNTYPED = 1 << 5;
        /// Pointer to storage that may not be written through it.
        const POINTEE_CONST = 1 << 6;
    }
}

/// Compile-time value used for folding and range checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Int(i128),
    Float(OrderedFloat<f64>),
    Bool(bool),
    Str(Arc<str>),
}

impl ConstValue {
    pub fn as_int(&self) -> Option<i128> {
        match self {
            ConstValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Float(v) => Some(v.0),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{}", v.0),
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// The typed result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub ty: Type,
    pub constant: Option<ConstValue>,
    pub flags: ValueFlags,
}

impl Value {
    /// A plain rvalue.
    pub fn rvalue(ty: Type) -> Self {
        Self {
            ty,
            constant: None,
            flags: ValueFlags::empty(),
        }
    }

    pub fn void() -> Self {
        Self::rvalue(Type::void())
    }

    /// A typed compile-time constant.
    pub fn constant(ty: Type, value: ConstValue) -> Self {
        Self {
            ty,
            constant: Some(value),
            flags: ValueFlags::CONSTANT,
        }
    }

    /// A literal that adapts to the type it meets.
    pub fn untyped(ty: Type, value: ConstValue) -> Self {
        Self {
            ty,
            constant: Some(value),
            flags: ValueFlags::CONSTANT | ValueFlags::UNTYPED,
        }
    }

    /// Addressable storage.
    pub fn lvalue(ty: Type, mutable: bool) -> Self {
        let mut flags = ValueFlags::LVALUE;
        flags.set(ValueFlags::MUTABLE, mutable);
        Self {
            ty,
            constant: None,
            flags,
        }
    }

    /// A value that names a type.
    pub fn type_literal(ty: Type) -> Self {
        Self {
            ty,
            constant: None,
            flags: ValueFlags::TYPE_LITERAL,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.flags.contains(ValueFlags::CONSTANT)
    }

    pub fn is_untyped(&self) -> bool {
        self.flags.contains(ValueFlags::UNTYPED)
    }

    pub fn is_lvalue(&self) -> bool {
        self.flags.contains(ValueFlags::LVALUE)
    }

    pub fn is_mutable(&self) -> bool {
        self.flags.contains(ValueFlags::MUTABLE)
    }

    pub fn points_to_const(&self) -> bool {
        self.flags.contains(ValueFlags::POINTEE_CONST)
    }

    pub fn is_variadic(&self) -> bool {
        self.flags.contains(ValueFlags::VARIADIC)
    }

    pub fn is_type_literal(&self) -> bool {
        self.flags.contains(ValueFlags::TYPE_LITERAL)
    }

    /// Same constant, now committed to `ty`.
    pub fn typed_as(mut self, ty: Type) -> Self {
        self.ty = ty;
        self.flags.remove(ValueFlags::UNTYPED);
        self
    }
}
