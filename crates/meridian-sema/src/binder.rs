//! Argument binding.
//!
//! Maps call-site arguments onto a parameter list. Binding only decides
//! *which* argument lands in *which* parameter; assignability and generic
//! inference run afterwards on the bound pairs.
//!
//! ## Strategies
//!
//! - **Positional**: argument `i` binds parameter `i`. Trailing parameters
//!   take their defaults; a variadic parameter absorbs the rest.
//! - **Targeted**: every argument names its parameter (`f(x: 1)`).
//! - **Struct**: targeted or positional construction over struct fields,
//!   refusing fields that are not visible from the requesting package.

use meridian_ast::{Ident, Span};
use meridian_core::{Diagnostic, ErrorKey};

use crate::model::ExprModel;
use crate::types::{SigParam, Type, TypeKind};
use crate::value::Value;

/// A resolved parameter (or struct field when constructing).
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    /// Element type for variadic parameters.
    pub ty: Type,
    pub mutable: bool,
    pub variadic: bool,
    pub default: Option<DefaultArg>,
    /// Not visible from the requesting package.
    pub hidden: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            mutable: false,
            variadic: false,
            default: None,
            hidden: false,
        }
    }

    /// Parameter of a function-typed callee, which has no names or defaults.
    pub fn from_sig(index: usize, sig: &SigParam) -> Self {
        Self {
            name: format!("arg{index}"),
            ty: sig.ty.clone(),
            mutable: sig.mutable,
            variadic: sig.variadic,
            default: None,
            hidden: false,
        }
    }

    pub fn sig_param(&self) -> SigParam {
        SigParam {
            ty: self.ty.clone(),
            mutable: self.mutable,
            variadic: self.variadic,
        }
    }

    /// Must receive an argument.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.variadic
    }

    /// Type a bound argument must be assignable to.
    pub fn slot_type(&self) -> Type {
        if self.variadic {
            Type::slice(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

/// Pre-evaluated default of a parameter or field.
#[derive(Debug, Clone)]
pub struct DefaultArg {
    pub value: Value,
    pub model: ExprModel,
}

/// An evaluated call-site argument.
#[derive(Debug, Clone)]
pub struct Arg {
    pub target: Option<Ident>,
    pub value: Value,
    pub model: ExprModel,
    pub span: Span,
}

/// What one parameter received.
#[derive(Debug, Clone)]
pub enum Bound {
    Arg(Arg),
    Default(DefaultArg),
    /// Trailing arguments absorbed by a variadic parameter.
    Variadic(Vec<Arg>),
    /// `xs...` passed straight through to a variadic parameter.
    Spread(Arg),
    /// Component `index` of a forwarded multi-value call.
    Forwarded { index: usize, ty: Type },
}

/// Binding result: one slot per parameter, in parameter order.
#[derive(Debug, Clone)]
pub struct BoundArgs {
    pub slots: Vec<Bound>,
    /// The single multi-value call whose components fill every slot.
    pub forwarded: Option<Arg>,
}

impl BoundArgs {
    /// Models in parameter order, synthesizing the variadic sequence.
    pub fn models(&self, params: &[Param]) -> Vec<ExprModel> {
        if let Some(call) = &self.forwarded {
            return vec![call.model.clone()];
        }
        self.slots
            .iter()
            .zip(params)
            .map(|(slot, param)| match slot {
                Bound::Arg(arg) | Bound::Spread(arg) => arg.model.clone(),
                Bound::Default(default) => default.model.clone(),
                Bound::Variadic(args) => ExprModel::Composite {
                    ty: param.slot_type().to_string(),
                    items: args.iter().map(|a| a.model.clone()).collect(),
                },
                Bound::Forwarded { .. } => ExprModel::lit("_"),
            })
            .collect()
    }
}

/// How arguments are matched to parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Positional,
    Targeted,
    Struct,
}

impl Strategy {
    /// Targeted as soon as one argument names a parameter.
    pub fn for_call(args: &[Arg]) -> Strategy {
        if args.iter().any(|a| a.target.is_some()) {
            Strategy::Targeted
        } else {
            Strategy::Positional
        }
    }
}

/// Bind `args` to `params`.
///
/// `callee` names the function or struct in diagnostics; `span` locates
/// errors that have no argument of their own.
pub fn bind(
    callee: &str,
    params: &[Param],
    args: Vec<Arg>,
    strategy: Strategy,
    span: Span,
) -> Result<BoundArgs, Diagnostic> {
    if let Some(bound) = try_forward(params, &args) {
        return Ok(bound);
    }
    let targeted = match strategy {
        Strategy::Targeted => true,
        Strategy::Positional => false,
        Strategy::Struct => args.iter().any(|a| a.target.is_some()),
    };
    if targeted {
        bind_targeted(callee, params, args, span)
    } else {
        bind_positional(callee, params, args, span)
    }
}

fn try_forward(params: &[Param], args: &[Arg]) -> Option<BoundArgs> {
    let [arg] = args else {
        return None;
    };
    if params.len() < 2 || arg.target.is_some() || params.iter().any(|p| p.variadic) {
        return None;
    }
    let TypeKind::Tuple(items) = &arg.value.ty.kind else {
        return None;
    };
    if items.len() != params.len() {
        return None;
    }
    let slots = items
        .iter()
        .enumerate()
        .map(|(index, ty)| Bound::Forwarded {
            index,
            ty: ty.clone(),
        })
        .collect();
    Some(BoundArgs {
        slots,
        forwarded: Some(arg.clone()),
    })
}

fn hidden_error(param: &Param, span: Span) -> Diagnostic {
    Diagnostic::new(ErrorKey::IdentIsNotAccessible, span).arg(param.name.clone())
}

fn bind_positional(
    callee: &str,
    params: &[Param],
    args: Vec<Arg>,
    span: Span,
) -> Result<BoundArgs, Diagnostic> {
    let has_variadic = params.iter().any(|p| p.variadic);
    if !has_variadic && args.len() > params.len() {
        let extra = &args[params.len()];
        return Err(Diagnostic::new(ErrorKey::ArgumentOverflow, extra.span).arg(callee));
    }

    let mut args = args.into_iter();
    let mut slots = Vec::with_capacity(params.len());
    for param in params {
        if param.variadic {
            let rest: Vec<Arg> = args.by_ref().collect();
            slots.push(absorb(rest)?);
            break;
        }
        match args.next() {
            Some(arg) => {
                if arg.value.is_variadic() {
                    return Err(Diagnostic::new(ErrorKey::VariadicWithNonVariadic, arg.span)
                        .arg(param.name.clone()));
                }
                if param.hidden {
                    return Err(hidden_error(param, arg.span));
                }
                slots.push(Bound::Arg(arg));
            }
            None => match &param.default {
                Some(default) => slots.push(Bound::Default(default.clone())),
                None => {
                    return Err(
                        Diagnostic::new(ErrorKey::MissingArgumentFor, span).arg(param.name.clone())
                    );
                }
            },
        }
    }
    Ok(BoundArgs {
        slots,
        forwarded: None,
    })
}

/// Trailing arguments of a variadic parameter.
fn absorb(mut rest: Vec<Arg>) -> Result<Bound, Diagnostic> {
    match rest.iter().position(|a| a.value.is_variadic()) {
        None => Ok(Bound::Variadic(rest)),
        Some(i) if rest.len() == 1 => Ok(Bound::Spread(rest.remove(i))),
        Some(i) => Err(Diagnostic::new(ErrorKey::MoreArgsWithVariadiced, rest[i].span)),
    }
}

fn bind_targeted(
    callee: &str,
    params: &[Param],
    args: Vec<Arg>,
    span: Span,
) -> Result<BoundArgs, Diagnostic> {
    let mut filled: Vec<Option<Bound>> = vec![None; params.len()];
    for arg in args {
        let Some(target) = arg.target.clone() else {
            return Err(Diagnostic::new(ErrorKey::ArgumentMissingTarget, arg.span));
        };
        let Some(index) = params.iter().position(|p| p.name == target.name) else {
            return Err(
                Diagnostic::new(ErrorKey::ArgumentTargetUnknown, target.span)
                    .arg(target.name.clone())
                    .arg(callee),
            );
        };
        let param = &params[index];
        if param.hidden {
            return Err(hidden_error(param, target.span));
        }
        if filled[index].is_some() {
            return Err(
                Diagnostic::new(ErrorKey::ArgumentAlreadyBound, target.span).arg(target.name),
            );
        }
        filled[index] = Some(if param.variadic {
            absorb(vec![arg])?
        } else if arg.value.is_variadic() {
            return Err(Diagnostic::new(ErrorKey::VariadicWithNonVariadic, arg.span)
                .arg(param.name.clone()));
        } else {
            Bound::Arg(arg)
        });
    }

    let mut slots = Vec::with_capacity(params.len());
    for (param, slot) in params.iter().zip(filled) {
        let bound = match slot {
            Some(bound) => bound,
            None if param.variadic => Bound::Variadic(Vec::new()),
            None => match &param.default {
                Some(default) => Bound::Default(default.clone()),
                None => {
                    return Err(
                        Diagnostic::new(ErrorKey::MissingArgumentFor, span).arg(param.name.clone()),
                    );
                }
            },
        };
        slots.push(bound);
    }
    Ok(BoundArgs {
        slots,
        forwarded: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ConstValue, ValueFlags};

    fn arg(name: &str) -> Arg {
        Arg {
            target: None,
            value: Value::rvalue(Type::int()),
            model: ExprModel::ident(name),
            span: Span::new(1, 1, 1),
        }
    }

    fn targeted(target: &str, name: &str) -> Arg {
        Arg {
            target: Some(Ident::new(target, Span::new(1, 1, 1))),
            ..arg(name)
        }
    }

    fn spread(name: &str) -> Arg {
        let mut a = arg(name);
        a.value.ty = Type::slice(Type::int());
        a.value.flags |= ValueFlags::VARIADIC;
        a
    }

    fn params(names: &[&str]) -> Vec<Param> {
        names.iter().map(|n| Param::new(*n, Type::int())).collect()
    }

    fn variadic(name: &str) -> Param {
        Param {
            variadic: true,
            ..Param::new(name, Type::int())
        }
    }

    fn run(ps: &[Param], args: Vec<Arg>, strategy: Strategy) -> Result<BoundArgs, Diagnostic> {
        bind("f", ps, args, strategy, Span::default())
    }

    fn names(bound: &BoundArgs) -> Vec<String> {
        bound
            .slots
            .iter()
            .map(|slot| match slot {
                Bound::Arg(a) | Bound::Spread(a) => a.model.to_string(),
                Bound::Default(_) => "<default>".into(),
                Bound::Variadic(args) => format!(
                    "[{}]",
                    args.iter().map(|a| a.model.to_string()).collect::<Vec<_>>().join(", ")
                ),
                Bound::Forwarded { index, .. } => format!("#{index}"),
            })
            .collect()
    }

    #[test]
    fn positional_keeps_order() {
        let args = vec![arg("x"), arg("y"), arg("z")];
        let bound = run(&params(&["a", "b", "c"]), args, Strategy::Positional).unwrap();
        assert_eq!(names(&bound), vec!["x", "y", "z"]);
    }

    #[test]
    fn missing_names_first_unfilled_parameter() {
        let err = run(&params(&["a", "b", "c"]), vec![arg("x")], Strategy::Positional).unwrap_err();
        assert_eq!(err.key, ErrorKey::MissingArgumentFor);
        assert_eq!(err.args, vec!["b".to_string()]);
    }

    #[test]
    fn overflow_without_variadic() {
        let err = run(&params(&["a"]), vec![arg("x"), arg("y")], Strategy::Positional).unwrap_err();
        assert_eq!(err.key, ErrorKey::ArgumentOverflow);
    }

    #[test]
    fn variadic_absorbs_trailing_arguments() {
        let mut ps = params(&["a", "b"]);
        ps.push(variadic("c"));
        let bound = run(&ps, vec![arg("x"), arg("y"), arg("z")], Strategy::Positional).unwrap();
        assert_eq!(names(&bound), vec!["x", "y", "[z]"]);

        let bound = run(&ps, vec![arg("x"), arg("y")], Strategy::Positional).unwrap();
        assert_eq!(names(&bound), vec!["x", "y", "[]"]);
    }

    #[test]
    fn spread_must_stand_alone() {
        let ps = vec![variadic("xs")];
        let bound = run(&ps, vec![spread("v")], Strategy::Positional).unwrap();
        assert!(matches!(bound.slots[0], Bound::Spread(_)));

        let err = run(&ps, vec![arg("a"), spread("v")], Strategy::Positional).unwrap_err();
        assert_eq!(err.key, ErrorKey::MoreArgsWithVariadiced);

        let err = run(&params(&["a"]), vec![spread("v")], Strategy::Positional).unwrap_err();
        assert_eq!(err.key, ErrorKey::VariadicWithNonVariadic);
    }

    #[test]
    fn defaults_fill_trailing_parameters() {
        let mut ps = params(&["a", "b"]);
        ps[1].default = Some(DefaultArg {
            value: Value::untyped(Type::int(), ConstValue::Int(2)),
            model: ExprModel::lit("2"),
        });
        let bound = run(&ps, vec![arg("x")], Strategy::Positional).unwrap();
        assert_eq!(names(&bound), vec!["x", "<default>"]);
        assert_eq!(bound.models(&ps)[1].to_string(), "2");
    }

    #[test]
    fn targeted_binding() {
        let ps = params(&["a", "b"]);
        let swapped = vec![targeted("b", "y"), targeted("a", "x")];
        let bound = run(&ps, swapped, Strategy::Targeted).unwrap();
        assert_eq!(names(&bound), vec!["x", "y"]);

        let twice = vec![targeted("a", "x"), targeted("a", "y")];
        let err = run(&ps, twice, Strategy::Targeted).unwrap_err();
        assert_eq!(err.key, ErrorKey::ArgumentAlreadyBound);

        let err = run(&ps, vec![targeted("q", "x")], Strategy::Targeted).unwrap_err();
        assert_eq!(err.key, ErrorKey::ArgumentTargetUnknown);

        let err = run(&ps, vec![targeted("a", "x"), arg("y")], Strategy::Targeted).unwrap_err();
        assert_eq!(err.key, ErrorKey::ArgumentMissingTarget);

        let err = run(&ps, vec![targeted("a", "x")], Strategy::Targeted).unwrap_err();
        assert_eq!(err.key, ErrorKey::MissingArgumentFor);
        assert_eq!(err.args, vec!["b".to_string()]);
    }

    #[test]
    fn struct_binding_refuses_hidden_fields() {
        let mut ps = params(&["x", "secret"]);
        ps[1].hidden = true;
        ps[1].default = Some(DefaultArg {
            value: Value::untyped(Type::int(), ConstValue::Int(0)),
            model: ExprModel::lit("0"),
        });
        assert!(run(&ps, vec![targeted("x", "a")], Strategy::Struct).is_ok());
        let err = run(&ps, vec![targeted("secret", "a")], Strategy::Struct).unwrap_err();
        assert_eq!(err.key, ErrorKey::IdentIsNotAccessible);
    }

    #[test]
    fn single_tuple_argument_forwards() {
        let mut call = arg("pair()");
        call.value.ty = Type::tuple(vec![Type::int(), Type::str()]);
        let bound = run(&params(&["a", "b"]), vec![call], Strategy::Positional).unwrap();
        assert!(bound.forwarded.is_some());
        assert_eq!(names(&bound), vec!["#0", "#1"]);
    }
}
