//! Output models handed to code emission.
//!
//! Every checked expression and statement is replaced by a typed model whose
//! only contract is rendering target-language text. Names are already
//! resolved and types are already spelled as kind strings, so the emitter
//! never consults the checker again.

use std::fmt::{self, Write};

use meridian_ast::Op;

// ============================================================================
// Expressions
// ============================================================================

/// A checked expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprModel {
    /// Literal text, already in target syntax.
    Lit(String),
    Ident(String),
    /// A type used in expression position.
    TypeName(String),
    Unary {
        op: Op,
        expr: Box<ExprModel>,
    },
    Binary {
        op: Op,
        left: Box<ExprModel>,
        right: Box<ExprModel>,
    },
    Call {
        callee: Box<ExprModel>,
        args: Vec<ExprModel>,
    },
    Member {
        base: Box<ExprModel>,
        name: String,
    },
    Index {
        base: Box<ExprModel>,
        index: Box<ExprModel>,
    },
    Slice {
        base: Box<ExprModel>,
        start: Option<Box<ExprModel>>,
        end: Option<Box<ExprModel>>,
    },
    Cast {
        ty: String,
        expr: Box<ExprModel>,
    },
    /// Array or slice literal; also the synthesized variadic argument.
    Composite {
        ty: String,
        items: Vec<ExprModel>,
    },
    MapLit {
        ty: String,
        pairs: Vec<(ExprModel, ExprModel)>,
    },
    /// Struct literal with every field in declaration order.
    StructLit {
        ty: String,
        fields: Vec<(String, ExprModel)>,
    },
    Tuple(Vec<ExprModel>),
    /// A generic function instance.
    Instance {
        name: String,
        generics: Vec<String>,
    },
    Lambda {
        by_ref: bool,
        params: Vec<(String, String)>,
        ret: String,
        body: Vec<StmtModel>,
    },
}

impl ExprModel {
    pub fn lit(text: impl Into<String>) -> Self {
        ExprModel::Lit(text.into())
    }

    pub fn ident(name: impl Into<String>) -> Self {
        ExprModel::Ident(name.into())
    }

    pub fn unary(op: Op, expr: ExprModel) -> Self {
        ExprModel::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: Op, left: ExprModel, right: ExprModel) -> Self {
        ExprModel::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(callee: ExprModel, args: Vec<ExprModel>) -> Self {
        ExprModel::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn member(base: ExprModel, name: impl Into<String>) -> Self {
        ExprModel::Member {
            base: Box::new(base),
            name: name.into(),
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, ExprModel::Call { .. })
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[ExprModel]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for ExprModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprModel::Lit(text) | ExprModel::Ident(text) | ExprModel::TypeName(text) => {
                f.write_str(text)
            }
            ExprModel::Unary { op, expr } => write!(f, "({op}{expr})"),
            ExprModel::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            ExprModel::Call { callee, args } => {
                write!(f, "{callee}(")?;
                write_joined(f, args)?;
                f.write_str(")")
            }
            ExprModel::Member { base, name } => write!(f, "{base}.{name}"),
            ExprModel::Index { base, index } => write!(f, "{base}[{index}]"),
            ExprModel::Slice { base, start, end } => {
                write!(f, "{base}.slice(")?;
                match start {
                    Some(start) => write!(f, "{start}")?,
                    None => f.write_str("0")?,
                }
                if let Some(end) = end {
                    write!(f, ", {end}")?;
                }
                f.write_str(")")
            }
            ExprModel::Cast { ty, expr } => write!(f, "static_cast<{ty}>({expr})"),
            ExprModel::Composite { ty, items } => {
                write!(f, "{ty}{{")?;
                write_joined(f, items)?;
                f.write_str("}")
            }
            ExprModel::MapLit { ty, pairs } => {
                write!(f, "{ty}{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{{{k}, {v}}}")?;
                }
                f.write_str("}")
            }
            ExprModel::StructLit { ty, fields } => {
                write!(f, "{ty}{{")?;
                for (i, (_, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
            ExprModel::Tuple(items) => {
                f.write_str("std::make_tuple(")?;
                write_joined(f, items)?;
                f.write_str(")")
            }
            ExprModel::Instance { name, generics } => {
                write!(f, "{name}<{}>", generics.join(", "))
            }
            ExprModel::Lambda {
                by_ref,
                params,
                ret,
                body,
            } => {
                f.write_str(if *by_ref { "[&](" } else { "[=](" })?;
                write_params(f, params)?;
                write!(f, ") -> {ret} {{")?;
                let mut out = String::new();
                for stmt in body {
                    out.push(' ');
                    stmt.render(&mut out, 0)?;
                }
                f.write_str(out.replace('\n', " ").trim_end())?;
                f.write_str(" }")
            }
        }
    }
}

fn write_params(f: &mut impl Write, params: &[(String, String)]) -> fmt::Result {
    for (i, (name, ty)) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{ty} {name}")?;
    }
    Ok(())
}

// ============================================================================
// Statements
// ============================================================================

/// Iteration header of a checked loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopModel {
    Infinite,
    While(ExprModel),
    Range {
        key: Option<String>,
        value: Option<String>,
        expr: ExprModel,
    },
}

/// One checked `match` case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseModel {
    /// Empty for the default case.
    pub exprs: Vec<ExprModel>,
    pub body: Vec<StmtModel>,
}

/// A checked statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtModel {
    Expr(ExprModel),
    Var {
        name: String,
        ty: String,
        init: Option<ExprModel>,
        constant: bool,
    },
    /// `let (a, b) = f()`; blank names are `_`.
    Destructure {
        names: Vec<String>,
        init: ExprModel,
    },
    Assign {
        targets: Vec<ExprModel>,
        op: &'static str,
        values: Vec<ExprModel>,
    },
    Postfix {
        target: ExprModel,
        increment: bool,
    },
    Ret(Option<ExprModel>),
    Block(Vec<StmtModel>),
    If {
        branches: Vec<(ExprModel, Vec<StmtModel>)>,
        default: Option<Vec<StmtModel>>,
    },
    Loop {
        kind: LoopModel,
        body: Vec<StmtModel>,
    },
    Match {
        subject: Option<ExprModel>,
        cases: Vec<CaseModel>,
    },
    Label(String),
    Goto(String),
    Break(Option<String>),
    Continue(Option<String>),
    Fallthrough,
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn render_block(out: &mut String, body: &[StmtModel], level: usize) -> fmt::Result {
    out.push_str("{\n");
    for stmt in body {
        stmt.render(out, level + 1)?;
    }
    indent(out, level);
    out.push('}');
    Ok(())
}

impl StmtModel {
    /// Append the statement at `level` indentation, ending with a newline.
    pub fn render(&self, out: &mut String, level: usize) -> fmt::Result {
        indent(out, level);
        match self {
            StmtModel::Expr(e) => writeln!(out, "{e};")?,
            StmtModel::Var {
                name,
                ty,
                init,
                constant,
            } => {
                if *constant {
                    out.push_str("const ");
                }
                write!(out, "{ty} {name}")?;
                if let Some(init) = init {
                    write!(out, " = {init}")?;
                }
                out.push_str(";\n");
            }
            StmtModel::Destructure { names, init } => {
                writeln!(out, "auto [{}] = {init};", names.join(", "))?;
            }
            StmtModel::Assign {
                targets,
                op,
                values,
            } => {
                let targets: Vec<String> = targets.iter().map(ToString::to_string).collect();
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                if targets.len() == 1 {
                    writeln!(out, "{} {op} {};", targets[0], values.join(", "))?;
                } else {
                    writeln!(out, "std::tie({}) {op} {};", targets.join(", "), values.join(", "))?;
                }
            }
            StmtModel::Postfix { target, increment } => {
                writeln!(out, "{target}{};", if *increment { "++" } else { "--" })?;
            }
            StmtModel::Ret(None) => out.push_str("return;\n"),
            StmtModel::Ret(Some(e)) => writeln!(out, "return {e};")?,
            StmtModel::Block(body) => {
                render_block(out, body, level)?;
                out.push('\n');
            }
            StmtModel::If { branches, default } => {
                for (i, (cond, body)) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" else ");
                    }
                    write!(out, "if ({cond}) ")?;
                    render_block(out, body, level)?;
                }
                if let Some(body) = default {
                    out.push_str(" else ");
                    render_block(out, body, level)?;
                }
                out.push('\n');
            }
            StmtModel::Loop { kind, body } => {
                match kind {
                    LoopModel::Infinite => out.push_str("for (;;) "),
                    LoopModel::While(cond) => write!(out, "while ({cond}) ")?,
                    LoopModel::Range { key, value, expr } => write!(
                        out,
                        "for (auto [{}, {}] : {expr}) ",
                        key.as_deref().unwrap_or("_"),
                        value.as_deref().unwrap_or("_")
                    )?,
                }
                render_block(out, body, level)?;
                out.push('\n');
            }
            StmtModel::Match { subject, cases } => {
                match subject {
                    Some(s) => write!(out, "match ({s}) ")?,
                    None => out.push_str("match "),
                }
                out.push_str("{\n");
                for case in cases {
                    indent(out, level + 1);
                    if case.exprs.is_empty() {
                        out.push_str("default: ");
                    } else {
                        let exprs: Vec<String> =
                            case.exprs.iter().map(ToString::to_string).collect();
                        write!(out, "case {}: ", exprs.join(", "))?;
                    }
                    render_block(out, &case.body, level + 1)?;
                    out.push('\n');
                }
                indent(out, level);
                out.push_str("}\n");
            }
            StmtModel::Label(name) => writeln!(out, "{name}:;")?,
            StmtModel::Goto(name) => writeln!(out, "goto {name};")?,
            StmtModel::Break(None) => out.push_str("break;\n"),
            StmtModel::Break(Some(label)) => writeln!(out, "goto {label}_end;")?,
            StmtModel::Continue(None) => out.push_str("continue;\n"),
            StmtModel::Continue(Some(label)) => writeln!(out, "goto {label}_next;")?,
            StmtModel::Fallthrough => out.push_str("[[fallthrough]];\n"),
        }
        Ok(())
    }
}

impl fmt::Display for StmtModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, 0)?;
        f.write_str(out.trim_end())
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// A checked function, or one instance of a generic function.
#[derive(Debug, Clone, PartialEq)]
pub struct FnModel {
    pub name: String,
    /// Kind strings of the instance's generic arguments.
    pub generics: Vec<String>,
    /// Owning struct for methods.
    pub owner: Option<String>,
    pub params: Vec<(String, String)>,
    pub ret: String,
    pub body: Vec<StmtModel>,
}

impl fmt::Display for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.ret)?;
        if let Some(owner) = &self.owner {
            write!(f, "{owner}::")?;
        }
        f.write_str(&self.name)?;
        if !self.generics.is_empty() {
            write!(f, "<{}>", self.generics.join(", "))?;
        }
        f.write_str("(")?;
        write_params(f, &self.params)?;
        f.write_str(") ")?;
        let mut out = String::new();
        render_block(&mut out, &self.body, 0)?;
        f.write_str(&out)
    }
}

/// A checked global.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalModel {
    pub name: String,
    pub ty: String,
    pub init: Option<ExprModel>,
    pub constant: bool,
}

/// Everything emission needs from one checked package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckedPackage {
    pub path: String,
    pub globals: Vec<GlobalModel>,
    pub functions: Vec<FnModel>,
}

impl CheckedPackage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Every instance emitted for the function `name`.
    pub fn instances<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FnModel> + 'a {
        self.functions.iter().filter(move |f| f.name == name)
    }
}

impl fmt::Display for CheckedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for g in &self.globals {
            let stmt = StmtModel::Var {
                name: g.name.clone(),
                ty: g.ty.clone(),
                init: g.init.clone(),
                constant: g.constant,
            };
            writeln!(f, "{stmt}")?;
        }
        for func in &self.functions {
            writeln!(f, "{func}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_renders_with_parentheses() {
        let model = ExprModel::binary(
            Op::Plus,
            ExprModel::ident("a"),
            ExprModel::binary(Op::Star, ExprModel::ident("b"), ExprModel::ident("c")),
        );
        assert_eq!(model.to_string(), "(a + (b * c))");
    }

    #[test]
    fn statements_render() {
        let stmt = StmtModel::If {
            branches: vec![(
                ExprModel::ident("ok"),
                vec![StmtModel::Ret(Some(ExprModel::lit("1")))],
            )],
            default: None,
        };
        assert_eq!(stmt.to_string(), "if (ok) {\n    return 1;\n}");
    }

    #[test]
    fn function_renders_generics() {
        let func = FnModel {
            name: "id".into(),
            generics: vec!["int".into()],
            owner: None,
            params: vec![("x".into(), "int".into())],
            ret: "int".into(),
            body: vec![StmtModel::Ret(Some(ExprModel::ident("x")))],
        };
        assert_eq!(func.to_string(), "int id<int>(int x) {\n    return x;\n}");
    }
}
