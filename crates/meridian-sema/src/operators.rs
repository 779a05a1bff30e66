//! Operator solving.
//!
//! Given an operator and the already evaluated operands, decide the result
//! value or the diagnostic. Both entry points are pure: they see only the
//! operand values and the configured integer width.
//!
//! ## Operand unification
//!
//! Untyped literals adapt to the typed side (after a range check). Two
//! untyped numeric literals stay untyped; the float one or the larger code
//! wins. Two typed numerics must share a family (signed, unsigned, float)
//! and the larger code wins.
//!
//! ## Folding
//!
//! Constant operands fold with checked `i128` arithmetic. Typed results are
//! range checked against their type; untyped ones are only limited by the
//! `i128` range.

use meridian_ast::Op;
use meridian_core::{Diagnostic, ErrorKey, Span};
use ordered_float::OrderedFloat;

use crate::conversion::range;
use crate::types::{Prim, Type, TypeKind};
use crate::value::{ConstValue, Value};

/// Precedence tier of a binary operator; higher binds tighter.
pub fn precedence(op: Op) -> u8 {
    match op {
        Op::Shl | Op::Shr | Op::Amp => 8,
        Op::Star | Op::Slash | Op::Percent => 7,
        Op::Caret => 6,
        Op::Pipe => 5,
        Op::Plus | Op::Minus => 4,
        Op::Lt | Op::LtEq | Op::Gt | Op::GtEq => 3,
        Op::EqEq | Op::NotEq => 2,
        Op::AndAnd => 1,
        Op::OrOr | Op::Bang => 0,
    }
}

fn not_for(op: Op, ty: &Type, span: Span) -> Diagnostic {
    Diagnostic::new(ErrorKey::OperatorNotForType, span)
        .arg(op.as_str())
        .arg(ty.spelled())
}

fn incompatible(left: &Type, right: &Type, span: Span) -> Diagnostic {
    Diagnostic::new(ErrorKey::IncompatibleTypes, span)
        .arg(left.spelled())
        .arg(right.spelled())
}

fn is_comparison(op: Op) -> bool {
    matches!(op, Op::EqEq | Op::NotEq | Op::Lt | Op::LtEq | Op::Gt | Op::GtEq)
}

fn is_equality(op: Op) -> bool {
    matches!(op, Op::EqEq | Op::NotEq)
}

/// Result value: untyped when both inputs were, constant when folded.
fn result(ty: Type, constant: Option<ConstValue>, untyped: bool) -> Value {
    match constant {
        Some(c) if untyped => Value::untyped(ty, c),
        Some(c) => Value::constant(ty, c),
        None => Value::rvalue(ty),
    }
}

/// Range check a folded constant of a typed result.
fn fit(
    ty: &Type,
    constant: ConstValue,
    untyped: bool,
    int_bits: u32,
    span: Span,
) -> Result<ConstValue, Diagnostic> {
    if !untyped && let Some(prim) = ty.prim_kind() && prim.is_numeric() {
        range::check_fits(prim, &constant, int_bits, span)?;
    }
    Ok(constant)
}

// ============================================================================
// Unary
// ============================================================================

/// Solve a prefix operator applied to a value.
///
/// Pointer dereference and address-of depend on lvalue-ness and type
/// literals, so the evaluator handles them itself.
pub fn solve_unary(op: Op, value: &Value, int_bits: u32, span: Span) -> Result<Value, Diagnostic> {
    if value.is_type_literal() {
        return Err(Diagnostic::new(ErrorKey::InvalidExpr, span).arg(value.ty.spelled()));
    }
    let ty = &value.ty;
    let untyped = value.is_untyped();
    let folded = match op {
        Op::Plus | Op::Minus => {
            if !ty.is_numeric() {
                return Err(not_for(op, ty, span));
            }
            match (&value.constant, op) {
                (Some(c), Op::Plus) => Some(c.clone()),
                (Some(ConstValue::Int(v)), _) => {
                    let negated = v.checked_neg().ok_or_else(|| {
                        Diagnostic::new(ErrorKey::OverflowLimits, span)
                            .arg(v.to_string())
                            .arg(ty.spelled())
                    })?;
                    Some(ConstValue::Int(negated))
                }
                (Some(ConstValue::Float(v)), _) => Some(ConstValue::Float(OrderedFloat(-v.0))),
                _ => None,
            }
        }
        Op::Caret => {
            if !ty.is_integer() {
                return Err(not_for(op, ty, span));
            }
            value.constant.as_ref().and_then(ConstValue::as_int).map(|v| {
                let flipped = !v;
                match ty.prim_kind() {
                    Some(prim) if !untyped => ConstValue::Int(
                        range::wrap_int(prim, flipped, int_bits),
                    ),
                    _ => ConstValue::Int(flipped),
                }
            })
        }
        Op::Bang => {
            if !ty.is_bool() {
                return Err(not_for(op, ty, span));
            }
            value.constant.as_ref().and_then(ConstValue::as_bool).map(|b| ConstValue::Bool(!b))
        }
        _ => return Err(not_for(op, ty, span)),
    };
    let folded = match folded {
        Some(c) => Some(fit(ty, c, untyped, int_bits, span)?),
        None => None,
    };
    Ok(result(ty.clone(), folded, untyped))
}

// ============================================================================
// Binary
// ============================================================================

/// Numeric family; typed operands must share one.
fn family(prim: Prim) -> u8 {
    if prim.is_signed() {
        0
    } else if prim.is_unsigned() {
        1
    } else {
        2
    }
}

/// Bring both operands to one type.
fn unify(left: &Value, right: &Value, int_bits: u32, span: Span) -> Result<Type, Diagnostic> {
    let (lt, rt) = (&left.ty, &right.ty);
    match (left.is_untyped(), right.is_untyped()) {
        (true, true) => {
            if lt.is_numeric() && rt.is_numeric() {
                let (lp, rp) = (lt.prim_kind(), rt.prim_kind());
                let wide = match (lp, rp) {
                    (Some(l), Some(r)) if l.is_float() != r.is_float() => {
                        if l.is_float() { lt } else { rt }
                    }
                    (Some(l), Some(r)) if r.code() > l.code() => rt,
                    _ => lt,
                };
                Ok(wide.clone())
            } else if lt == rt {
                Ok(lt.clone())
            } else {
                Err(incompatible(lt, rt, span))
            }
        }
        (true, false) => adapt(left, rt, lt, int_bits, span),
        (false, true) => adapt(right, lt, rt, int_bits, span),
        (false, false) => {
            if let (Some(l), Some(r)) = (lt.prim_kind(), rt.prim_kind())
                && l.is_numeric()
                && r.is_numeric()
            {
                if family(l) != family(r) {
                    return Err(incompatible(lt, rt, span));
                }
                return Ok(if r.code() > l.code() { rt.clone() } else { lt.clone() });
            }
            if lt == rt {
                Ok(lt.clone())
            } else {
                Err(incompatible(lt, rt, span))
            }
        }
    }
}

/// Commit an untyped literal to the type of the other operand.
fn adapt(
    literal: &Value,
    target: &Type,
    own: &Type,
    int_bits: u32,
    span: Span,
) -> Result<Type, Diagnostic> {
    match (target.prim_kind(), &literal.constant) {
        (Some(prim), Some(c)) if prim.is_numeric() && own.is_numeric() => {
            range::check_fits(prim, c, int_bits, span)?;
            Ok(target.clone())
        }
        _ if target == own => Ok(target.clone()),
        _ => Err(incompatible(own, target, span)),
    }
}

/// Solve `left op right`.
pub fn solve_binary(
    op: Op,
    left: &Value,
    right: &Value,
    int_bits: u32,
    span: Span,
) -> Result<Value, Diagnostic> {
    for side in [left, right] {
        if side.is_type_literal() {
            return Err(Diagnostic::new(ErrorKey::InvalidExpr, span).arg(side.ty.spelled()));
        }
        if side.ty.is_void() || side.ty.is_tuple() {
            return Err(not_for(op, &side.ty, span));
        }
    }

    if matches!(op, Op::Shl | Op::Shr) {
        return solve_shift(op, left, right, int_bits, span);
    }

    // Pointer arithmetic.
    if left.ty.is_ptr() && matches!(op, Op::Plus | Op::Minus) && right.ty.is_integer() {
        return Ok(Value::rvalue(left.ty.clone()));
    }

    // Comparisons with nil.
    if left.ty.is_nil() || right.ty.is_nil() {
        let other = if left.ty.is_nil() { &right.ty } else { &left.ty };
        if !is_equality(op) {
            return Err(not_for(op, other, span));
        }
        if !(other.is_nil() || other.is_nilable()) {
            return Err(incompatible(&left.ty, &right.ty, span));
        }
        return Ok(Value::rvalue(Type::bool()));
    }

    let ty = unify(left, right, int_bits, span)?;
    let untyped = left.is_untyped() && right.is_untyped();
    let both_constant = left.constant.is_some() && right.constant.is_some();

    // Float division by zero is well defined, integer division is not.
    let zero_divisor = matches!(right.constant, Some(ConstValue::Int(0)));
    if matches!(op, Op::Slash | Op::Percent) && zero_divisor && ty.is_integer() {
        return Err(Diagnostic::new(ErrorKey::DivideByZero, span));
    }

    let allowed = match &ty.kind {
        TypeKind::Prim(p) if p.is_integer() => !matches!(op, Op::AndAnd | Op::OrOr),
        TypeKind::Prim(p) if p.is_float() => {
            matches!(op, Op::Plus | Op::Minus | Op::Star | Op::Slash) || is_comparison(op)
        }
        TypeKind::Prim(Prim::Str) => op == Op::Plus || is_comparison(op),
        TypeKind::Prim(Prim::Bool) => matches!(op, Op::AndAnd | Op::OrOr) || is_equality(op),
        TypeKind::Enum(_) => is_comparison(op),
        TypeKind::Struct(_)
        | TypeKind::Array { .. }
        | TypeKind::Any
        | TypeKind::Trait(_)
        | TypeKind::Ptr(_)
        | TypeKind::Ref(_) => is_equality(op),
        _ => false,
    };
    if !allowed {
        return Err(not_for(op, &ty, span));
    }

    let result_ty = if is_comparison(op) || matches!(op, Op::AndAnd | Op::OrOr) {
        Type::bool()
    } else {
        ty.clone()
    };
    let folded = match (both_constant, &left.constant, &right.constant) {
        (true, Some(l), Some(r)) => fold(op, l, r, &result_ty, span)?,
        _ => None,
    };
    let folded = match folded {
        Some(c) => Some(fit(&result_ty, c, untyped, int_bits, span)?),
        None => None,
    };
    Ok(result(result_ty, folded, untyped))
}

fn solve_shift(
    op: Op,
    left: &Value,
    right: &Value,
    int_bits: u32,
    span: Span,
) -> Result<Value, Diagnostic> {
    if !left.ty.is_integer() {
        return Err(not_for(op, &left.ty, span));
    }
    if !right.ty.is_integer() {
        return Err(Diagnostic::new(ErrorKey::BitshiftMustUnsigned, span).arg(right.ty.spelled()));
    }
    let amount = right.constant.as_ref().and_then(ConstValue::as_int);
    if !right.ty.is_unsigned() && !amount.is_some_and(|n| n >= 0) {
        return Err(Diagnostic::new(ErrorKey::BitshiftMustUnsigned, span).arg(right.ty.spelled()));
    }
    let untyped = left.is_untyped();
    let folded = match (left.constant.as_ref().and_then(ConstValue::as_int), amount) {
        (Some(l), Some(n)) => {
            let shifted = u32::try_from(n).ok().and_then(|n| match op {
                Op::Shl => l.checked_shl(n).filter(|v| (v >> n) == l),
                _ => l.checked_shr(n),
            });
            let Some(shifted) = shifted else {
                return Err(Diagnostic::new(ErrorKey::OverflowLimits, span)
                    .arg(format!("{l} {op} {n}"))
                    .arg(left.ty.spelled()));
            };
            Some(fit(&left.ty, ConstValue::Int(shifted), untyped, int_bits, span)?)
        }
        _ => None,
    };
    Ok(result(left.ty.clone(), folded, untyped))
}

fn fold(
    op: Op,
    left: &ConstValue,
    right: &ConstValue,
    ty: &Type,
    span: Span,
) -> Result<Option<ConstValue>, Diagnostic> {
    let overflow = || {
        Diagnostic::new(ErrorKey::OverflowLimits, span)
            .arg(format!("{left} {op} {right}"))
            .arg(ty.spelled())
    };
    let folded = match (left, right) {
        (ConstValue::Int(l), ConstValue::Int(r)) => {
            let (l, r) = (*l, *r);
            match op {
                Op::Plus => ConstValue::Int(l.checked_add(r).ok_or_else(overflow)?),
                Op::Minus => ConstValue::Int(l.checked_sub(r).ok_or_else(overflow)?),
                Op::Star => ConstValue::Int(l.checked_mul(r).ok_or_else(overflow)?),
                Op::Slash => ConstValue::Int(l.checked_div(r).ok_or_else(overflow)?),
                Op::Percent => ConstValue::Int(l.checked_rem(r).ok_or_else(overflow)?),
                Op::Amp => ConstValue::Int(l & r),
                Op::Pipe => ConstValue::Int(l | r),
                Op::Caret => ConstValue::Int(l ^ r),
                _ => ConstValue::Bool(compare(op, l.cmp(&r))),
            }
        }
        (ConstValue::Str(l), ConstValue::Str(r)) => match op {
            Op::Plus => ConstValue::Str(format!("{l}{r}").into()),
            _ => ConstValue::Bool(compare(op, l.cmp(r))),
        },
        (ConstValue::Bool(l), ConstValue::Bool(r)) => ConstValue::Bool(match op {
            Op::AndAnd => *l && *r,
            Op::OrOr => *l || *r,
            Op::EqEq => l == r,
            _ => l != r,
        }),
        _ => {
            let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
                return Ok(None);
            };
            let value = match op {
                Op::Plus => l + r,
                Op::Minus => l - r,
                Op::Star => l * r,
                Op::Slash => l / r,
                _ => {
                    let ordering = OrderedFloat(l).cmp(&OrderedFloat(r));
                    return Ok(Some(ConstValue::Bool(compare(op, ordering))));
                }
            };
            // Infinities and NaN from division are left to run time.
            if op == Op::Slash && !value.is_finite() {
                return Ok(None);
            }
            ConstValue::Float(OrderedFloat(value))
        }
    };
    Ok(Some(folded))
}

fn compare(op: Op, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        Op::EqEq => ordering == Equal,
        Op::NotEq => ordering != Equal,
        Op::Lt => ordering == Less,
        Op::LtEq => ordering != Greater,
        Op::Gt => ordering == Greater,
        _ => ordering != Less,
    }
}
