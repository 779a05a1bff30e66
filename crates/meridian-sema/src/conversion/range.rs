//! Compile-time range checks for constants.

use meridian_core::{Diagnostic, ErrorKey, Span};

use crate::types::Prim;
use crate::value::ConstValue;

/// Whether constant `value` can be represented by `prim`.
///
/// Integers must lie in the primitive's range; floats must be finite and
/// within the largest magnitude. Integer constants fit float targets when
/// their magnitude does. Float constants never fit integer targets.
pub fn fits(prim: Prim, value: &ConstValue, int_bits: u32) -> bool {
    match value {
        ConstValue::Int(v) => {
            if let Some((min, max)) = prim.int_range(int_bits) {
                (min..=max).contains(v)
            } else if let Some(max) = prim.float_max() {
                (*v as f64).abs() <= max
            } else {
                false
            }
        }
        ConstValue::Float(v) => {
            prim.float_max().is_some_and(|max| v.0.is_finite() && v.0.abs() <= max)
        }
        ConstValue::Bool(_) => prim == Prim::Bool,
        ConstValue::Str(_) => prim == Prim::Str,
    }
}

/// Report `overflow_limits` when `value` does not fit `prim`.
pub fn check_fits(
    prim: Prim,
    value: &ConstValue,
    int_bits: u32,
    span: Span,
) -> Result<(), Diagnostic> {
    if fits(prim, value, int_bits) {
        return Ok(());
    }
    let key = match value {
        ConstValue::Int(_) | ConstValue::Float(_) if prim.is_numeric() => ErrorKey::OverflowLimits,
        _ => ErrorKey::IncompatibleTypes,
    };
    let diag = Diagnostic::new(key, span);
    Err(match key {
        ErrorKey::OverflowLimits => diag.arg(value.to_string()).arg(prim.name()),
        _ => diag.arg(const_kind(value)).arg(prim.name()),
    })
}

/// Default type name of an untyped constant, for diagnostics.
pub fn const_kind(value: &ConstValue) -> &'static str {
    match value {
        ConstValue::Int(_) => "int",
        ConstValue::Float(_) => "f64",
        ConstValue::Bool(_) => "bool",
        ConstValue::Str(_) => "str",
    }
}

/// Wrap an integer into the range of `prim` the way a fixed-width store
/// would. Used when folding bitwise complement of typed constants.
pub fn wrap_int(prim: Prim, value: i128, int_bits: u32) -> i128 {
    let Some(bits) = prim.bits(int_bits) else {
        return value;
    };
    let modulus = 1i128 << bits;
    let wrapped = value.rem_euclid(modulus);
    if prim.is_signed() && wrapped >= modulus / 2 {
        wrapped - modulus
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use ordered_float::OrderedFloat;

    use super::*;

    #[test]
    fn integer_bounds() {
        for (prim, min, max) in [
            (Prim::U8, 0i128, 255i128),
            (Prim::I8, -128, 127),
            (Prim::I16, -32768, 32767),
            (Prim::U32, 0, u32::MAX as i128),
        ] {
            assert!(fits(prim, &ConstValue::Int(min), 64), "{prim:?} min");
            assert!(fits(prim, &ConstValue::Int(max), 64), "{prim:?} max");
            assert!(!fits(prim, &ConstValue::Int(min - 1), 64), "{prim:?} min-1");
            assert!(!fits(prim, &ConstValue::Int(max + 1), 64), "{prim:?} max+1");
        }
    }

    #[test]
    fn platform_width_follows_options() {
        let big = ConstValue::Int(i64::MAX as i128);
        assert!(fits(Prim::Int, &big, 64));
        assert!(!fits(Prim::Int, &big, 32));
    }

    #[test]
    fn floats() {
        assert!(fits(Prim::F32, &ConstValue::Int(3), 64));
        assert!(fits(Prim::F64, &ConstValue::Float(OrderedFloat(1e300)), 64));
        assert!(!fits(Prim::F32, &ConstValue::Float(OrderedFloat(1e300)), 64));
        assert!(!fits(Prim::Int, &ConstValue::Float(OrderedFloat(1.0)), 64));
    }

    #[test]
    fn overflow_reports_value_and_type() {
        let err = check_fits(Prim::U8, &ConstValue::Int(300), 64, Span::default()).unwrap_err();
        assert_eq!(err.key, ErrorKey::OverflowLimits);
        assert_eq!(err.args, vec!["300".to_string(), "u8".to_string()]);

        let err = check_fits(Prim::Bool, &ConstValue::Int(1), 64, Span::default()).unwrap_err();
        assert_eq!(err.key, ErrorKey::IncompatibleTypes);
    }

    #[test]
    fn wrapping() {
        assert_eq!(wrap_int(Prim::U8, 300, 64), 44);
        assert_eq!(wrap_int(Prim::I8, 200, 64), -56);
        assert_eq!(wrap_int(Prim::U8, -1, 64), 255);
    }
}
