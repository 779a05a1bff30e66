//! Literal tokens.

use meridian_ast::{Token, TokenKind};
use meridian_core::{Diagnostic, ErrorKey};
use ordered_float::OrderedFloat;

use crate::model::ExprModel;
use crate::types::{Prim, Type};
use crate::value::{ConstValue, Value};

/// Value and output text of a literal token.
pub(super) fn literal(tok: &Token) -> Result<(Value, ExprModel), Diagnostic> {
    let invalid = || Diagnostic::new(ErrorKey::InvalidSyntax, tok.span).arg(&tok.lexeme);
    match tok.kind {
        TokenKind::Int => {
            let digits: String = tok.lexeme.chars().filter(|&c| c != '_').collect();
            let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                Some(hex) => i128::from_str_radix(hex, 16),
                None => digits.parse::<i128>(),
            };
            let value = parsed.map_err(|_| {
                Diagnostic::new(ErrorKey::OverflowLimits, tok.span)
                    .arg(&tok.lexeme)
                    .arg("int")
            })?;
            Ok((Value::untyped(Type::int(), ConstValue::Int(value)), ExprModel::lit(digits)))
        }
        TokenKind::Float => {
            let digits: String = tok.lexeme.chars().filter(|&c| c != '_').collect();
            let value: f64 = digits.parse().map_err(|_| invalid())?;
            let value = Value::untyped(
                Type::prim(Prim::F64),
                ConstValue::Float(OrderedFloat(value)),
            );
            Ok((value, ExprModel::lit(digits)))
        }
        TokenKind::Str => {
            let inner = strip_quotes(&tok.lexeme, '"').ok_or_else(invalid)?;
            let text = unescape(inner).ok_or_else(invalid)?;
            let value = Value::untyped(Type::str(), ConstValue::Str(text.into()));
            Ok((value, ExprModel::lit(&tok.lexeme)))
        }
        TokenKind::Rune => {
            let inner = strip_quotes(&tok.lexeme, '\'').ok_or_else(invalid)?;
            let text = unescape(inner).ok_or_else(invalid)?;
            let mut chars = text.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return Err(invalid());
            };
            let value = Value::untyped(Type::prim(Prim::I32), ConstValue::Int(c as i128));
            Ok((value, ExprModel::lit(&tok.lexeme)))
        }
        TokenKind::True | TokenKind::False => {
            let b = tok.kind == TokenKind::True;
            Ok((
                Value::untyped(Type::bool(), ConstValue::Bool(b)),
                ExprModel::lit(if b { "true" } else { "false" }),
            ))
        }
        TokenKind::Nil => Ok((Value::rvalue(Type::nil()), ExprModel::lit("nullptr"))),
        _ => Err(invalid()),
    }
}

fn strip_quotes(lexeme: &str, quote: char) -> Option<&str> {
    lexeme.strip_prefix(quote)?.strip_suffix(quote)
}

fn unescape(src: &str) -> Option<String> {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            _ => return None,
        });
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use meridian_ast::testing::lex;

    use super::*;

    fn lit(src: &str) -> Result<(Value, ExprModel), Diagnostic> {
        let tokens = lex(src);
        assert_eq!(tokens.len(), 1, "{src:?}");
        literal(&tokens[0])
    }

    #[test]
    fn integers() {
        let (value, model) = lit("1_000").unwrap();
        assert_eq!(value.constant, Some(ConstValue::Int(1000)));
        assert!(value.is_untyped());
        assert_eq!(model.to_string(), "1000");

        let (value, _) = lit("0xFF").unwrap();
        assert_eq!(value.constant, Some(ConstValue::Int(255)));

        let huge = lit("999999999999999999999999999999999999999999").unwrap_err();
        assert_eq!(huge.key, ErrorKey::OverflowLimits);
    }

    #[test]
    fn floats_and_bools() {
        let (value, _) = lit("2.5").unwrap();
        assert_eq!(value.ty, Type::prim(Prim::F64));
        assert_eq!(value.constant, Some(ConstValue::Float(OrderedFloat(2.5))));

        let (value, model) = lit("false").unwrap();
        assert_eq!(value.constant, Some(ConstValue::Bool(false)));
        assert_eq!(model.to_string(), "false");
    }

    #[test]
    fn strings_and_runes() {
        let (value, model) = lit(r#""a\tb""#).unwrap();
        assert_eq!(value.constant, Some(ConstValue::Str("a\tb".into())));
        assert_eq!(model.to_string(), r#""a\tb""#);

        let (value, _) = lit("'\\n'").unwrap();
        assert_eq!(value.ty, Type::prim(Prim::I32));
        assert_eq!(value.constant, Some(ConstValue::Int(10)));

        assert_eq!(lit("'ab'").unwrap_err().key, ErrorKey::InvalidSyntax);
        assert_eq!(lit(r#""\q""#).unwrap_err().key, ErrorKey::InvalidSyntax);
    }

    #[test]
    fn nil_has_no_constant() {
        let (value, model) = lit("nil").unwrap();
        assert!(value.ty.is_nil());
        assert!(value.constant.is_none());
        assert_eq!(model.to_string(), "nullptr");
    }
}
