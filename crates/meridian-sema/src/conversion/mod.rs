//! Assignability and casting.
//!
//! This module decides whether a value may be stored into, passed as, or
//! explicitly converted to another type. Both checks are pure functions of
//! the registry and the options, which lets the barrier run them on worker
//! threads.
//!
//! ## Assignment order
//!
//! 1. `any` targets accept every non-void value
//! 2. `nil` goes to nilable targets only
//! 3. Untyped numeric constants are range checked against the target
//! 4. Identical types (kind string equality)
//! 5. Tuples component-wise
//! 6. Struct to implemented trait, by reference when the trait has
//!    reference-receiver methods

use meridian_core::{Diagnostic, ErrorKey, Span};

use crate::defs::{Registry, TraitId};
use crate::options::CheckOptions;
use crate::types::{Type, TypeKind};
use crate::value::Value;

mod cast;
pub mod range;

pub use cast::check_castable;

fn incompatible(value: &Type, target: &Type, span: Span) -> Diagnostic {
    Diagnostic::new(ErrorKey::IncompatibleTypes, span)
        .arg(value.spelled())
        .arg(target.spelled())
}

/// Whether `value` may be stored into a slot of type `target`.
pub fn check_assignable(
    reg: &Registry,
    opts: &CheckOptions,
    target: &Type,
    value: &Value,
    span: Span,
) -> Result<(), Diagnostic> {
    if value.is_type_literal() {
        return Err(Diagnostic::new(ErrorKey::InvalidExpr, span).arg(value.ty.spelled()));
    }
    if value.ty.is_void() {
        return Err(incompatible(&value.ty, target, span));
    }
    if target.is_any() {
        return Ok(());
    }
    if value.ty.is_nil() {
        return if target.is_nilable() {
            Ok(())
        } else {
            Err(incompatible(&value.ty, target, span))
        };
    }
    if value.is_untyped() {
        if let (Some(prim), Some(constant)) = (target.prim_kind(), &value.constant) {
            if value.ty.is_numeric() && prim.is_numeric() {
                return range::check_fits(prim, constant, opts.int_bits, span);
            }
        }
    }
    if types_match(reg, target, &value.ty) {
        return Ok(());
    }
    if let TypeKind::Trait(t) = &target.kind {
        return check_trait(reg, target, t.id, &value.ty, span);
    }
    Err(incompatible(&value.ty, target, span))
}

/// Structural equality, recursing through tuples so a multi-value call can
/// feed a matching multi-value slot.
fn types_match(reg: &Registry, target: &Type, actual: &Type) -> bool {
    match (&target.kind, &actual.kind) {
        (TypeKind::Tuple(t), TypeKind::Tuple(a)) => {
            t.len() == a.len() && t.iter().zip(a).all(|(t, a)| types_match(reg, t, a))
        }
        (TypeKind::Any, _) => !actual.is_void(),
        _ => target == actual,
    }
}

fn check_trait(
    reg: &Registry,
    target: &Type,
    trait_id: TraitId,
    actual: &Type,
    span: Span,
) -> Result<(), Diagnostic> {
    let implemented = actual.as_struct().is_some_and(|s| reg.implements(s.id, trait_id));
    if !implemented || (reg[trait_id].has_ref_method() && !actual.is_ref()) {
        return Err(incompatible(actual, target, span));
    }
    Ok(())
}

/// Immutable storage must not flow into a mutable binding that would alias
/// it.
pub fn check_mutability(target_mutable: bool, value: &Value, span: Span) -> Result<(), Diagnostic> {
    if target_mutable && value.is_lvalue() && !value.is_mutable() && value.ty.shares_memory() {
        return Err(Diagnostic::new(ErrorKey::AssignmentNonMutToMut, span).arg(value.ty.spelled()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArraySize, Prim};
    use crate::value::ConstValue;

    fn check(target: &Type, value: &Value) -> Result<(), ErrorKey> {
        check_assignable(&Registry::new(), &CheckOptions::default(), target, value, Span::default())
            .map_err(|d| d.key)
    }

    fn lit(v: i128) -> Value {
        Value::untyped(Type::int(), ConstValue::Int(v))
    }

    #[test]
    fn literal_range_checks() {
        let u8_ty = Type::prim(Prim::U8);
        assert_eq!(check(&u8_ty, &lit(255)), Ok(()));
        assert_eq!(check(&u8_ty, &lit(300)), Err(ErrorKey::OverflowLimits));
        assert_eq!(check(&u8_ty, &lit(-1)), Err(ErrorKey::OverflowLimits));
        assert_eq!(check(&Type::prim(Prim::I8), &lit(-128)), Ok(()));
        assert_eq!(check(&Type::prim(Prim::I8), &lit(128)), Err(ErrorKey::OverflowLimits));
    }

    #[test]
    fn typed_values_need_identical_types() {
        let i32_val = Value::rvalue(Type::prim(Prim::I32));
        assert_eq!(check(&Type::prim(Prim::I32), &i32_val), Ok(()));
        assert_eq!(check(&Type::prim(Prim::I64), &i32_val), Err(ErrorKey::IncompatibleTypes));
        let typed_const = Value::constant(Type::int(), ConstValue::Int(1));
        assert_eq!(check(&Type::prim(Prim::U8), &typed_const), Err(ErrorKey::IncompatibleTypes));
    }

    #[test]
    fn nil_and_any() {
        let nil = Value::rvalue(Type::nil());
        assert_eq!(check(&Type::ptr(Type::int()), &nil), Ok(()));
        assert_eq!(check(&Type::slice(Type::int()), &nil), Ok(()));
        assert_eq!(check(&Type::int(), &nil), Err(ErrorKey::IncompatibleTypes));
        assert_eq!(check(&Type::any(), &Value::rvalue(Type::str())), Ok(()));
        assert_eq!(check(&Type::any(), &Value::void()), Err(ErrorKey::IncompatibleTypes));
    }

    #[test]
    fn arrays_compare_sizes() {
        let a3 = Type::array(Type::int(), ArraySize::Fixed(3));
        let a4 = Type::array(Type::int(), ArraySize::Fixed(4));
        assert_eq!(check(&a3, &Value::rvalue(a3.clone())), Ok(()));
        assert_eq!(check(&a3, &Value::rvalue(a4)), Err(ErrorKey::IncompatibleTypes));
    }

    #[test]
    fn type_literals_are_not_values() {
        assert_eq!(
            check(&Type::int(), &Value::type_literal(Type::int())),
            Err(ErrorKey::InvalidExpr)
        );
    }

    #[test]
    fn mutable_alias_of_immutable_storage() {
        let ptr = Value::lvalue(Type::ptr(Type::int()), false);
        let err = check_mutability(true, &ptr, Span::default()).unwrap_err();
        assert_eq!(err.key, ErrorKey::AssignmentNonMutToMut);
        assert!(
            check_mutability(true, &Value::lvalue(Type::int(), false), Span::default()).is_ok(),
        );
        assert!(check_mutability(false, &ptr, Span::default()).is_ok());
    }
}
