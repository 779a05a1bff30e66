//! Symbolic diagnostics.
//!
//! The semantic core never formats human-readable messages. Every problem is
//! reported as an [`ErrorKey`] plus positional substitution arguments and a
//! [`Span`]; rendering belongs to whoever drains the sink.
//!
//! ## Taxonomy
//!
//! ```text
//! resolution   exist_id, id_not_exist, ident_is_not_accessible, ...
//! type         incompatible_types, invalid_type, operator_not_for_type, ...
//! binding      argument_overflow, missing_argument_for, ...
//! assignment   assign_require_lvalue, assign_const, overflow_limits, ...
//! control flow missing_ret, goto_jumps_declarations, invalid_label, ...
//! structural   illegal_cycle_in_declaration, illegal_import_cycle
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::Span;

macro_rules! error_keys {
    ($($(#[$doc:meta])* $variant:ident => $key:literal,)*) => {
        /// Symbolic diagnostic key.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorKey {
            $($(#[$doc])* $variant,)*
        }

        impl ErrorKey {
            /// The stable snake_case key consumed by message catalogs.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ErrorKey::$variant => $key,)*
                }
            }
        }
    };
}

error_keys! {
    // Resolution
    /// Identifier already defined in this scope.
    ExistId => "exist_id",
    /// Identifier could not be resolved.
    IdNotExist => "id_not_exist",
    /// Definition is private to another package.
    IdentIsNotAccessible => "ident_is_not_accessible",
    /// Local definition never read.
    DeclaredButNotUsed => "declared_but_not_used",
    /// Two wildcard imports provide the same identifier.
    AmbiguousSideId => "ambiguous_side_id",
    /// Imported package path is not part of the session.
    UseNotFound => "use_not_found",
    /// Packages import each other.
    IllegalImportCycle => "illegal_import_cycle",
    /// Name resolves to something that is not a type.
    NotType => "not_type",
    /// Member does not exist on the receiver.
    ObjHaveNotId => "obj_have_not_id",

    // Types
    /// Malformed or redundant type.
    InvalidType => "invalid_type",
    /// Value is not compatible with the expected type.
    IncompatibleTypes => "incompatible_types",
    /// Explicit conversion is not permitted.
    TypeNotSupportsCastingTo => "type_not_supports_casting_to",
    /// Operator is not defined for the operand category.
    OperatorNotForType => "operator_not_for_type",
    /// Too many generic arguments.
    GenericsOverflow => "generics_overflow",
    /// Too few generic arguments, or generics could not be inferred.
    MissingGenerics => "missing_generics",
    /// Generic arguments given to a non-generic definition.
    NotHasGenerics => "not_has_generics",
    /// Inference found conflicting bindings for one generic.
    DynamicTypeAnnotationFailed => "dynamic_type_annotation_failed",
    /// Struct does not provide every trait method.
    NotImplTraitDef => "not_impl_trait_def",
    /// Implemented method signature differs from the trait's.
    TraitMethodMismatch => "trait_method_mismatch",
    /// `&self` method called through a non-reference value.
    RefMethodUsedWithNonRefInstance => "ref_method_used_with_non_ref_instance",
    /// Value cannot be indexed.
    NotSupportsIndexing => "not_supports_indexing",
    /// Value cannot be sliced.
    NotSupportsSlicing => "not_supports_slicing",
    /// Value cannot be called.
    NotCallable => "not_callable",
    /// Untyped `nil` used where a type must be inferred.
    NilForAutotype => "nil_for_autotype",
    /// Void value used where a type must be inferred.
    VoidForAutotype => "void_for_autotype",
    /// Expression is not valid in this position.
    InvalidExpr => "invalid_expr",
    /// Expression is missing.
    MissingExpr => "missing_expr",
    /// Token sequence could not be understood.
    InvalidSyntax => "invalid_syntax",
    /// Constant expression required.
    ExprNotConst => "expr_not_const",
    /// Shift amount is neither unsigned nor a non-negative constant.
    BitshiftMustUnsigned => "bitshift_must_unsigned",
    /// Constant division by zero.
    DivideByZero => "divide_by_zero",
    /// Constant does not fit the target range.
    OverflowLimits => "overflow_limits",
    /// Auto-sized array without an initializer.
    AutoSizedArrayWithoutInit => "auto_sized_array_without_init",
    /// Variadic spread passed to a non-variadic parameter.
    VariadicWithNonVariadic => "variadic_with_non_variadic",
    /// Variadic spread mixed with extra arguments.
    MoreArgsWithVariadiced => "more_args_with_variadiced",

    // Binding
    /// More arguments than parameters.
    ArgumentOverflow => "argument_overflow",
    /// Required parameter left unbound.
    MissingArgumentFor => "missing_argument_for",
    /// Targeted argument names no parameter or field.
    ArgumentTargetUnknown => "argument_target_unknown",
    /// Two arguments bind the same parameter.
    ArgumentAlreadyBound => "argument_already_bound",
    /// Targeted binding with an untargeted argument.
    ArgumentMissingTarget => "argument_missing_target",

    // Assignment
    /// Assignment target is not an lvalue.
    AssignRequireLvalue => "assign_require_lvalue",
    /// Assignment target is constant.
    AssignConst => "assign_const",
    /// Assignment target is immutable.
    AssignmentToNonMut => "assignment_to_non_mut",
    /// Immutable source stored into a mutable binding that aliases it.
    AssignmentNonMutToMut => "assignment_non_mut_to_mut",
    /// Fewer values than assignment targets.
    MissingMultiAssignValues => "missing_multi_assign_values",
    /// More values than assignment targets.
    OverflowMultiAssignIdentifiers => "overflow_multi_assign_identifiers",
    /// Constant declared without a value.
    ConstVarNotHaveValue => "const_var_not_have_value",

    // Control flow
    /// Non-void function without a return path.
    MissingRet => "missing_ret",
    /// `ret` without value in a non-void function.
    RequireReturnValue => "require_return_value",
    /// `ret` with a value in a void function.
    VoidFunctionReturnValue => "void_function_return_value",
    /// Too few values returned.
    MissingMultiReturn => "missing_multi_return",
    /// Too many values returned.
    OverflowReturn => "overflow_return",
    /// Goto jumps forward over a declaration.
    GotoJumpsDeclarations => "goto_jumps_declarations",
    /// Goto jumps into a nested block.
    GotoIntoBlock => "goto_into_block",
    /// Goto or labeled break names no label.
    LabelNotExist => "label_not_exist",
    /// Label declared twice in a function.
    LabelExist => "label_exist",
    /// Label is not attached to an iteration or match.
    InvalidLabel => "invalid_label",
    /// `break` outside of an iteration or match.
    BreakAtOutOfValidScope => "break_at_out_of_valid_scope",
    /// `continue` outside of an iteration.
    ContinueAtOutOfValidScope => "continue_at_out_of_valid_scope",
    /// `fallthrough` that is not the last statement of a case.
    FallthroughWrongUse => "fallthrough_wrong_use",
    /// `fallthrough` in the last case.
    FallthroughIntoFinalCase => "fallthrough_into_final_case",
    /// Expression statement that is not a call.
    ExprNotFuncCall => "expr_not_func_call",

    // Structural
    /// Declaration contains itself.
    IllegalCycleInDeclaration => "illegal_cycle_in_declaration",
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a diagnostic affects the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

/// A symbolic diagnostic.
///
/// `args` are substitution arguments in the order the message catalog
/// expects them (for example `["300", "u8"]` for `overflow_limits`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}:{span}: {key} {args:?}")]
pub struct Diagnostic {
    /// The symbolic key.
    pub key: ErrorKey,
    /// Where the problem was found.
    pub span: Span,
    /// Substitution arguments.
    pub args: Vec<String>,
    /// Source file the span belongs to (empty when not yet attributed).
    pub path: Arc<str>,
    /// Error or warning.
    pub severity: Severity,
}

impl Diagnostic {
    /// Create an error diagnostic without arguments.
    pub fn new(key: ErrorKey, span: Span) -> Self {
        Self {
            key,
            span,
            args: Vec::new(),
            path: Arc::from(""),
            severity: Severity::Error,
        }
    }

    /// Append one substitution argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Attribute the diagnostic to a source file.
    pub fn in_file(mut self, path: Arc<str>) -> Self {
        self.path = path;
        self
    }

    /// Turn the diagnostic into a warning.
    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }
}

/// Errors from misuse of the session API (not source problems).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No package registered under this path.
    #[error("unknown package '{path}'")]
    UnknownPackage { path: String },

    /// A package was registered twice.
    #[error("package '{path}' is already registered")]
    DuplicatePackage { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_snake_case() {
        assert_eq!(ErrorKey::MissingArgumentFor.as_str(), "missing_argument_for");
        assert_eq!(ErrorKey::IllegalCycleInDeclaration.to_string(), "illegal_cycle_in_declaration");
    }

    #[test]
    fn diagnostic_builder() {
        let diag = Diagnostic::new(ErrorKey::OverflowLimits, Span::new(2, 4, 3))
            .arg("300")
            .arg("u8")
            .in_file(Arc::from("main.mr"));
        assert_eq!(diag.args, vec!["300".to_string(), "u8".to_string()]);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.to_string(), "main.mr:2:4: overflow_limits [\"300\", \"u8\"]");
    }

    #[test]
    fn warning_severity() {
        let diag = Diagnostic::new(ErrorKey::DeclaredButNotUsed, Span::default()).warning();
        assert_eq!(diag.severity, Severity::Warning);
    }
}
