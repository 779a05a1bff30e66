//! Explicit conversions.

use meridian_core::{Diagnostic, ErrorKey, Span};

use super::{check_assignable, range};
use crate::defs::Registry;
use crate::options::CheckOptions;
use crate::types::{Prim, Type, TypeKind};
use crate::value::{ConstValue, Value};

/// Whether `value` may be converted to `target` with an explicit cast.
///
/// Constant integers cast to an integer type must fit it.
pub fn check_castable(
    reg: &Registry,
    opts: &CheckOptions,
    target: &Type,
    value: &Value,
    span: Span,
) -> Result<(), Diagnostic> {
    let source = &value.ty;
    if let (Some(prim), Some(constant @ ConstValue::Int(_))) =
        (target.prim_kind(), &value.constant)
    {
        if prim.is_integer() && source.is_integer() {
            return range::check_fits(prim, constant, opts.int_bits, span);
        }
    }
    if source == target || source.is_any() || explicit(reg, source, target) {
        return Ok(());
    }
    if check_assignable(reg, opts, target, value, span).is_ok() {
        return Ok(());
    }
    Err(Diagnostic::new(ErrorKey::TypeNotSupportsCastingTo, span)
        .arg(source.spelled())
        .arg(target.spelled()))
}

fn is_byte_or_rune_slice(ty: &Type) -> bool {
    match &ty.kind {
        TypeKind::Slice(elem) => matches!(elem.prim_kind(), Some(Prim::U8 | Prim::I32)),
        _ => false,
    }
}

fn is_pointer_sized(ty: &Type) -> bool {
    matches!(ty.prim_kind(), Some(Prim::Uintptr | Prim::Int | Prim::Uint))
}

fn explicit(reg: &Registry, source: &Type, target: &Type) -> bool {
    match (&source.kind, &target.kind) {
        (TypeKind::Prim(s), TypeKind::Prim(t)) => {
            (s.is_numeric() && t.is_numeric()) || (s.is_integer() && *t == Prim::Str)
        }
        (TypeKind::Prim(Prim::Str), TypeKind::Slice(_)) => is_byte_or_rune_slice(target),
        (TypeKind::Slice(_), TypeKind::Prim(Prim::Str)) => is_byte_or_rune_slice(source),
        (TypeKind::Ptr(_), TypeKind::Ptr(_)) => true,
        (TypeKind::Ptr(_), TypeKind::Prim(_)) => is_pointer_sized(target),
        (TypeKind::Prim(_), TypeKind::Ptr(_)) => is_pointer_sized(source),
        (TypeKind::Enum(_), TypeKind::Prim(p)) | (TypeKind::Prim(p), TypeKind::Enum(_)) => {
            p.is_integer()
        }
        (TypeKind::Trait(t), _) => target.as_struct().is_some_and(|s| reg.implements(s.id, t.id)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::EnumId;
    use crate::types::NamedRef;

    fn cast(target: &Type, value: &Value) -> Result<(), ErrorKey> {
        check_castable(&Registry::new(), &CheckOptions::default(), target, value, Span::default())
            .map_err(|d| d.key)
    }

    fn rv(ty: Type) -> Value {
        Value::rvalue(ty)
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(cast(&Type::prim(Prim::U8), &rv(Type::prim(Prim::F64))), Ok(()));
        assert_eq!(cast(&Type::prim(Prim::F32), &rv(Type::int())), Ok(()));
        assert_eq!(cast(&Type::str(), &rv(Type::prim(Prim::I32))), Ok(()));
        assert_eq!(cast(&Type::int(), &rv(Type::str())), Err(ErrorKey::TypeNotSupportsCastingTo));
        assert_eq!(cast(&Type::bool(), &rv(Type::int())), Err(ErrorKey::TypeNotSupportsCastingTo));
    }

    #[test]
    fn constant_casts_are_range_checked() {
        let big = Value::untyped(Type::int(), ConstValue::Int(300));
        assert_eq!(cast(&Type::prim(Prim::U8), &big), Err(ErrorKey::OverflowLimits));
        let ok = Value::untyped(Type::int(), ConstValue::Int(200));
        assert_eq!(cast(&Type::prim(Prim::U8), &ok), Ok(()));
    }

    #[test]
    fn strings_and_byte_slices() {
        let bytes = Type::slice(Type::prim(Prim::U8));
        let runes = Type::slice(Type::prim(Prim::I32));
        assert_eq!(cast(&bytes, &rv(Type::str())), Ok(()));
        assert_eq!(cast(&Type::str(), &rv(runes)), Ok(()));
        assert_eq!(
            cast(&Type::slice(Type::int()), &rv(Type::str())),
            Err(ErrorKey::TypeNotSupportsCastingTo)
        );
    }

    #[test]
    fn pointers_and_enums() {
        let p = Type::ptr(Type::int());
        assert_eq!(cast(&Type::prim(Prim::Uintptr), &rv(p.clone())), Ok(()));
        assert_eq!(cast(&Type::ptr(Type::str()), &rv(p.clone())), Ok(()));
        assert_eq!(cast(&Type::prim(Prim::U8), &rv(p)), Err(ErrorKey::TypeNotSupportsCastingTo));

        let e: Type = TypeKind::Enum(NamedRef {
            id: EnumId(0),
            name: "Color".into(),
        })
        .into();
        assert_eq!(cast(&Type::int(), &rv(e.clone())), Ok(()));
        assert_eq!(cast(&e, &rv(Type::prim(Prim::U8))), Ok(()));
    }

    #[test]
    fn any_casts_to_everything() {
        assert_eq!(cast(&Type::ptr(Type::int()), &rv(Type::any())), Ok(()));
    }
}
