//! Integration tests for the Meridian semantic core using `Session` as the
//! entry point.
//!
//! Programs are assembled from the node builders in `meridian_ast::testing`,
//! checked as whole packages, and validated through the diagnostics and the
//! output model.

use meridian::ast::testing::*;
use meridian::ast::{AssignOp, Decl, File, Stmt, UseKind};
use meridian::{CheckOptions, Definition, ErrorKey, Session};

fn options() -> CheckOptions {
    CheckOptions::default().with_parallel_leaf_checks(false)
}

/// Check `decls` plus `fn main() { stmts }` as the package `app`.
fn check_main_with(opts: CheckOptions, decls: Vec<Decl>, stmts: Vec<Stmt>) -> Session {
    let mut all = decls;
    all.push(func("main").body(stmts).decl());
    let mut session = Session::new(opts);
    session.add_package("app", vec![file("app/main.mer", all)]).unwrap();
    session.check("app").unwrap();
    session
}

fn check_main(decls: Vec<Decl>, stmts: Vec<Stmt>) -> Session {
    check_main_with(options(), decls, stmts)
}

fn check_decls(decls: Vec<Decl>) -> Session {
    let mut session = Session::new(options());
    session.add_package("app", vec![file("app/main.mer", decls)]).unwrap();
    session.check("app").unwrap();
    session
}

fn errors(session: &Session) -> Vec<ErrorKey> {
    session.diagnostics().errors().iter().map(|d| d.key).collect()
}

fn rendered(session: &Session, name: &str) -> String {
    session
        .output("app")
        .and_then(|out| out.instances(name).next())
        .map(|f| f.to_string())
        .unwrap_or_default()
}

// =============================================================================
// Constant ranges
// =============================================================================

#[test]
fn test_literal_ranges_follow_declared_types() {
    let s = check_main(
        vec![],
        vec![
            let_typed("a", "u8", Some("255")),
            let_typed("b", "u8", Some("300")),
            let_typed("c", "i8", Some("-128")),
            let_typed("d", "i8", Some("-129")),
        ],
    );
    assert_eq!(errors(&s), vec![ErrorKey::OverflowLimits, ErrorKey::OverflowLimits]);
}

#[test]
fn test_int_width_follows_options() {
    let stmts = || vec![let_typed("x", "int", Some("3000000000"))];
    let wide = check_main(vec![], stmts());
    assert!(errors(&wide).is_empty(), "{:?}", errors(&wide));

    let narrow = check_main_with(options().with_int_bits(32), vec![], stmts());
    assert_eq!(errors(&narrow), vec![ErrorKey::OverflowLimits]);
}

#[test]
fn test_enum_items_must_fit_their_base() {
    let s = check_decls(vec![enum_(
        "Small",
        Some("u8"),
        &[("A", Some("250")), ("B", None), ("C", Some("300"))],
    )]);
    assert_eq!(errors(&s), vec![ErrorKey::OverflowLimits]);
}

// =============================================================================
// Generics
// =============================================================================

#[test]
fn test_generic_body_is_walked_once_per_tuple() {
    let id = func("id")
        .generics(&["T"])
        .param("x", "T")
        .ret("T")
        .body(vec![let_("tmp", "x"), ret(&["x"])])
        .decl();
    let s = check_main(
        vec![id],
        vec![
            let_("a", "id(1)"),
            let_("b", "id(2)"),
            let_("c", "id(\"s\")"),
            expr_stmt("id(a + b)"),
            expr_stmt("id(c)"),
        ],
    );
    assert!(errors(&s).is_empty(), "{:?}", errors(&s));

    let out = s.output("app").unwrap();
    let mut tuples: Vec<String> = out.instances("id").map(|f| f.generics.join(",")).collect();
    tuples.sort();
    assert_eq!(tuples, vec!["int", "str"]);

    // Unused locals of a generic body are reported by the first walk only.
    let unused_tmp = s
        .diagnostics()
        .warnings()
        .iter()
        .filter(|d| {
            d.key == ErrorKey::DeclaredButNotUsed
                && d.args.first().map(String::as_str) == Some("tmp")
        })
        .count();
    assert_eq!(unused_tmp, 1);
}

#[test]
fn test_generic_body_walks_match_distinct_tuples() {
    let id = func("id")
        .generics(&["T"])
        .param("x", "T")
        .ret("T")
        .body(vec![ret(&["x"])])
        .decl();
    let helper = func("helper")
        .body(vec![expr_stmt("id(4)"), expr_stmt("id(true)"), expr_stmt("id(\"t\")")])
        .decl();
    let s = check_main(
        vec![id, helper],
        vec![
            expr_stmt("id(1)"),
            expr_stmt("id(2)"),
            expr_stmt("id(\"s\")"),
            expr_stmt("id(3)"),
        ],
    );
    assert!(errors(&s).is_empty(), "{:?}", errors(&s));

    let Some(Definition::Fn(fid)) = s.definition("app", "id") else {
        panic!("id is not a function");
    };
    let def = &s.registry()[fid];
    assert_eq!(def.combines.len(), 3);
    assert_eq!(def.body_checks, 3);
}

#[test]
fn test_generic_struct_methods_follow_instances() {
    let boxed = struct_("Box").generics(&["T"]).pub_field("v", "T").decl();
    let get = func("get").receiver(false, false).ret("T").body(vec![ret(&["self.v"])]).build();
    let s = check_main(
        vec![boxed, impl_("Box", None, vec![get])],
        vec![
            let_("a", "Box[int]{1}"),
            let_("b", "Box[str]{\"s\"}"),
            let_("c", "Box[int]{2}"),
            let_("x", "a.get() + c.get()"),
            let_("y", "b.get()"),
        ],
    );
    assert!(errors(&s).is_empty(), "{:?}", errors(&s));
    let owners: Vec<String> = s
        .output("app")
        .unwrap()
        .instances("get")
        .filter_map(|f| f.owner.clone())
        .collect();
    assert_eq!(owners.len(), 2);
    assert!(owners.contains(&"Box[int]".to_string()));
    assert!(owners.contains(&"Box[str]".to_string()));
}

#[test]
fn test_runaway_instantiation_is_a_cycle() {
    let wrap = func("wrap")
        .generics(&["T"])
        .param("x", "T")
        .body(vec![expr_stmt("wrap([]T{x})")])
        .decl();
    let s = check_main_with(
        options().with_max_instantiation_depth(4),
        vec![wrap],
        vec![expr_stmt("wrap(1)")],
    );
    assert_eq!(errors(&s), vec![ErrorKey::IllegalCycleInDeclaration]);
}

#[test]
fn test_generic_arity() {
    let pair = struct_("Pair").generics(&["A", "B"]).pub_field("a", "A").pub_field("b", "B").decl();
    let s = check_main(
        vec![pair],
        vec![
            let_typed("p", "Pair[int]", None),
            let_typed("q", "Pair[int, str, bool]", None),
            let_typed("r", "int[str]", None),
            let_typed("ok", "Pair[int, str]", None),
        ],
    );
    assert_eq!(
        errors(&s),
        vec![ErrorKey::MissingGenerics, ErrorKey::GenericsOverflow, ErrorKey::NotHasGenerics]
    );
}

// =============================================================================
// Returns
// =============================================================================

#[test]
fn test_every_path_must_return() {
    let partial = func("partial")
        .param("x", "int")
        .ret("int")
        .body(vec![if_("x > 0", vec![ret(&["1"])])])
        .decl();
    let full = func("full")
        .param("x", "int")
        .ret("int")
        .body(vec![if_else("x > 0", vec![ret(&["1"])], vec![ret(&["2"])])])
        .decl();
    let spin = func("spin").ret("int").body(vec![loop_(vec![])]).decl();
    let s = check_decls(vec![partial, full, spin]);
    assert_eq!(errors(&s), vec![ErrorKey::MissingRet]);
}

#[test]
fn test_return_value_shapes() {
    let pair = func("pair").ret("(int, str)").body(vec![ret(&["1", "\"a\""])]).decl();
    let short = func("short").ret("(int, str)").body(vec![ret(&["1"])]).decl();
    let long = func("long").ret("int").body(vec![ret(&["1", "2"])]).decl();
    let empty = func("empty").ret("int").body(vec![ret(&[])]).decl();
    let void = func("void_fn").body(vec![ret(&["1"])]).decl();
    let whole = func("whole").ret("(int, str)").body(vec![ret(&["pair()"])]).decl();
    let s = check_decls(vec![pair, short, long, empty, void, whole]);
    assert_eq!(
        errors(&s),
        vec![
            ErrorKey::MissingMultiReturn,
            ErrorKey::OverflowReturn,
            ErrorKey::RequireReturnValue,
            ErrorKey::VoidFunctionReturnValue,
        ]
    );
}

#[test]
fn test_returned_values_are_checked_at_the_barrier() {
    let f = func("f").ret("str").body(vec![ret(&["1"])]).decl();
    let s = check_decls(vec![f]);
    assert_eq!(errors(&s), vec![ErrorKey::IncompatibleTypes]);
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn test_fallthrough_in_bodies() {
    let s = check_main(
        vec![],
        vec![
            let_("x", "1"),
            match_(
                Some("x"),
                vec![(vec!["1"], vec![fallthrough()]), (vec!["2"], vec![])],
                Some(vec![fallthrough()]),
            ),
        ],
    );
    assert_eq!(errors(&s), vec![ErrorKey::FallthroughIntoFinalCase]);
}

#[test]
fn test_goto_over_declaration() {
    let s = check_main(vec![], vec![goto("end"), let_("x", "1"), label("end")]);
    assert_eq!(errors(&s), vec![ErrorKey::GotoJumpsDeclarations]);
}

#[test]
fn test_jumps_outside_loops() {
    let s = check_main(vec![], vec![brk(None), loop_(vec![brk(None)]), cont(None)]);
    assert_eq!(
        errors(&s),
        vec![ErrorKey::BreakAtOutOfValidScope, ErrorKey::ContinueAtOutOfValidScope]
    );
}

#[test]
fn test_structural_errors_in_generic_bodies_are_reported_once() {
    let g = func("g")
        .generics(&["T"])
        .param("x", "T")
        .body(vec![goto("missing")])
        .decl();
    let s = check_main(
        vec![g],
        vec![expr_stmt("g(1)"), expr_stmt("g(\"s\")"), expr_stmt("g(true)")],
    );
    assert_eq!(errors(&s), vec![ErrorKey::LabelNotExist]);
}

#[test]
fn test_conditions_must_be_bool() {
    let s = check_main(
        vec![],
        vec![
            let_("n", "1"),
            if_("n", vec![]),
            while_("n > 0", vec![]),
            while_("\"s\"", vec![]),
        ],
    );
    assert_eq!(errors(&s), vec![ErrorKey::IncompatibleTypes, ErrorKey::IncompatibleTypes]);
}

#[test]
fn test_range_loops() {
    let s = check_main(
        vec![],
        vec![
            let_("xs", "[]int{1, 2}"),
            let_mut("total", "0"),
            range_(
                Some("i"),
                Some("v"),
                "xs",
                vec![compound(&["total"], AssignOp::Add, &["v + i"])],
            ),
            range_(None, Some("v"), "total", vec![]),
        ],
    );
    assert_eq!(errors(&s), vec![ErrorKey::InvalidExpr]);
}

// =============================================================================
// Statements
// =============================================================================

#[test]
fn test_assignment_rules() {
    let s = check_main(
        vec![],
        vec![
            let_("fixed", "1"),
            const_("k", Some("2")),
            let_mut("m", "3"),
            assign(&["fixed"], &["4"]),
            assign(&["k"], &["5"]),
            assign(&["1"], &["6"]),
            assign(&["m"], &["\"s\""]),
            assign(&["m", "fixed"], &["7"]),
            assign(&["m"], &["8", "9"]),
            assign(&["m", "_"], &["fixed", "10"]),
        ],
    );
    assert_eq!(
        errors(&s),
        vec![
            ErrorKey::AssignmentToNonMut,
            ErrorKey::AssignConst,
            ErrorKey::AssignRequireLvalue,
            ErrorKey::IncompatibleTypes,
            ErrorKey::AssignmentToNonMut,
            ErrorKey::OverflowMultiAssignIdentifiers,
        ]
    );
}

#[test]
fn test_declaration_rules() {
    let pair = func("pair").ret("(int, str)").body(vec![ret(&["1", "\"a\""])]).decl();
    let s = check_main(
        vec![pair],
        vec![
            const_("a", None),
            let_mut("b", "1"),
            const_("c", Some("b")),
            let_("d", "nil"),
            let_typed("e", "[...]int", None),
            let_tuple(&["f", "g", "h"], "pair()"),
            let_tuple(&["j", "k"], "pair()"),
        ],
    );
    assert_eq!(
        errors(&s),
        vec![
            ErrorKey::ConstVarNotHaveValue,
            ErrorKey::ExprNotConst,
            ErrorKey::NilForAutotype,
            ErrorKey::AutoSizedArrayWithoutInit,
            ErrorKey::MissingMultiAssignValues,
        ]
    );
}

#[test]
fn test_expression_statements_must_be_calls() {
    let f = func("f").body(vec![]).decl();
    let s = check_main(vec![f], vec![expr_stmt("f()"), expr_stmt("1 + 2")]);
    assert_eq!(errors(&s), vec![ErrorKey::ExprNotFuncCall]);
}

#[test]
fn test_redeclaration_and_shadowing() {
    let s = check_main(
        vec![],
        vec![
            let_("x", "1"),
            block_stmt(vec![let_("x", "\"inner\""), expr_stmt("len(x)")]),
            let_("x", "missing + 2"),
            alias_stmt("x", "int"),
        ],
    );
    // A redeclared name stops before its initializer is evaluated.
    assert_eq!(errors(&s), vec![ErrorKey::ExistId, ErrorKey::ExistId]);
}

#[test]
fn test_unused_locals_are_warnings_by_default() {
    let relaxed = check_main(vec![], vec![let_("x", "1")]);
    assert!(errors(&relaxed).is_empty());
    assert!(relaxed.diagnostics().has_warning(ErrorKey::DeclaredButNotUsed));

    let strict = check_main_with(
        options().with_unused_as_error(true),
        vec![],
        vec![let_("x", "1")],
    );
    assert_eq!(errors(&strict), vec![ErrorKey::DeclaredButNotUsed]);
}

// =============================================================================
// Calls and literals
// =============================================================================

#[test]
fn test_argument_binding() {
    let f = func("f")
        .param("a", "int")
        .param_default("b", "str", "\"b\"")
        .body(vec![])
        .decl();
    let s = check_main(
        vec![f],
        vec![
            expr_stmt("f(1)"),
            expr_stmt("f(b: \"x\", a: 2)"),
            expr_stmt("f(a: 1, \"x\")"),
            expr_stmt("f(c: 1)"),
            expr_stmt("f(a: 1, a: 2)"),
            expr_stmt("f(1, \"x\", 3)"),
            expr_stmt("f()"),
        ],
    );
    assert_eq!(
        errors(&s),
        vec![
            ErrorKey::ArgumentMissingTarget,
            ErrorKey::ArgumentTargetUnknown,
            ErrorKey::ArgumentAlreadyBound,
            ErrorKey::ArgumentOverflow,
            ErrorKey::MissingArgumentFor,
        ]
    );
    let body = rendered(&s, "main");
    assert!(body.contains("f(1, \"b\")"), "{body}");
    assert!(body.contains("f(2, \"x\")"), "{body}");
}

#[test]
fn test_variadic_rules() {
    let sum = func("sum")
        .variadic_param("xs", "int")
        .ret("int")
        .body(vec![ret(&["len(xs)"])])
        .decl();
    let one = func("one").param("x", "int").body(vec![]).decl();
    let s = check_main(
        vec![sum, one],
        vec![
            let_("v", "[]int{1, 2}"),
            expr_stmt("sum()"),
            expr_stmt("sum(v...)"),
            expr_stmt("one(v...)"),
            expr_stmt("sum(1, v...)"),
        ],
    );
    assert_eq!(
        errors(&s),
        vec![ErrorKey::VariadicWithNonVariadic, ErrorKey::MoreArgsWithVariadiced]
    );
}

#[test]
fn test_leaf_errors_follow_immediate_errors() {
    let f = func("f").param("s", "str").body(vec![]).decl();
    let s = check_main(vec![f], vec![expr_stmt("f(1)"), let_typed("x", "u8", Some("300"))]);
    // The argument check runs at the end of the body.
    assert_eq!(errors(&s), vec![ErrorKey::OverflowLimits, ErrorKey::IncompatibleTypes]);
}

#[test]
fn test_parallel_and_inline_barriers_agree() {
    let f = func("f").param("a", "u8").param("b", "str").body(vec![]).decl();
    let stmts = || {
        vec![
            expr_stmt("f(1, \"a\")"),
            expr_stmt("f(300, \"b\")"),
            expr_stmt("f(2, 3)"),
            expr_stmt("f(256, 4)"),
        ]
    };
    let inline = check_main(vec![f.clone()], stmts());
    let parallel = check_main_with(CheckOptions::default(), vec![f], stmts());
    assert_eq!(errors(&inline), errors(&parallel));
    assert_eq!(
        errors(&inline),
        vec![
            ErrorKey::OverflowLimits,
            ErrorKey::IncompatibleTypes,
            ErrorKey::OverflowLimits,
            ErrorKey::IncompatibleTypes,
        ]
    );
}

#[test]
fn test_struct_field_defaults_are_checked() {
    let bad = struct_("Bad").field_default("n", "int", "\"text\"").decl();
    let s = check_decls(vec![bad]);
    assert_eq!(errors(&s), vec![ErrorKey::IncompatibleTypes]);
}

#[test]
fn test_generic_field_defaults_follow_instances() {
    let cell = || {
        struct_("Cell")
            .generics(&["T"])
            .field_default("x", "T", "1")
            .decl()
    };

    let ok = check_main(vec![cell()], vec![let_("a", "Cell[int]{}"), let_("b", "Cell[int]{}")]);
    assert!(errors(&ok).is_empty(), "{:?}", errors(&ok));

    let bad = check_main(
        vec![cell()],
        vec![
            let_("a", "Cell[str]{}"),
            let_("b", "Cell[str]{x: \"s\"}"),
            let_("c", "Cell[int]{}"),
        ],
    );
    assert_eq!(errors(&bad), vec![ErrorKey::IncompatibleTypes]);
}

#[test]
fn test_struct_containing_itself() {
    let a = struct_("A").pub_field("b", "B").decl();
    let b = struct_("B").pub_field("a", "A").decl();
    let node = struct_("Node").pub_field("next", "*Node").pub_field("kids", "[]Node").decl();
    let s = check_decls(vec![a, b, node]);
    assert_eq!(
        errors(&s),
        vec![ErrorKey::IllegalCycleInDeclaration, ErrorKey::IllegalCycleInDeclaration]
    );
}

#[test]
fn test_global_initializers_resolve_in_any_order() {
    let s = check_decls(vec![
        global("TOTAL", None, Some("BASE * 2"), false, true),
        global("BASE", Some("u8"), Some("100"), false, true),
        global("LOOP_A", None, Some("LOOP_B"), false, false),
        global("LOOP_B", None, Some("LOOP_A"), false, false),
    ]);
    assert_eq!(errors(&s), vec![ErrorKey::IllegalCycleInDeclaration]);
    let out = s.output("app").unwrap().to_string();
    assert!(out.contains("const u8 BASE = 100;"), "{out}");
    assert!(out.contains("const u8 TOTAL = (BASE * 2);"), "{out}");
}

// =============================================================================
// Traits
// =============================================================================

fn shapes() -> Vec<Decl> {
    let area = func("area")
        .receiver(true, false)
        .ret("int")
        .body(vec![ret(&["self.side * self.side"])])
        .build();
    vec![
        trait_("Shape", vec![("area", true, vec![], Some("int"))]),
        struct_("Square").pub_field("side", "int").decl(),
        impl_("Square", Some("Shape"), vec![area]),
        func("describe").param("s", "Shape").ret("int").body(vec![ret(&["s.area()"])]).decl(),
    ]
}

#[test]
fn test_trait_values_need_references_for_ref_methods() {
    let s = check_main(
        shapes(),
        vec![
            let_("a", "describe(&Square{2})"),
            let_("sq", "Square{3}"),
            let_("b", "describe(sq)"),
        ],
    );
    assert_eq!(errors(&s), vec![ErrorKey::IncompatibleTypes]);
    let out = s.output("app").unwrap();
    let area = out.instances("area").next().unwrap();
    assert_eq!(area.owner.as_deref(), Some("Square"));
}

#[test]
fn test_ref_method_on_value() {
    let s = check_main(shapes(), vec![let_("sq", "Square{3}"), let_("a", "sq.area()")]);
    assert_eq!(errors(&s), vec![ErrorKey::RefMethodUsedWithNonRefInstance]);
}

#[test]
fn test_trait_conformance() {
    let wrong = func("area").receiver(true, false).ret("f64").body(vec![ret(&["1.0"])]).build();
    let s = check_decls(vec![
        trait_("Shape", vec![("area", true, vec![], Some("int"))]),
        struct_("Circle").pub_field("r", "f64").decl(),
        struct_("Empty").decl(),
        impl_("Circle", Some("Shape"), vec![wrong]),
        impl_("Empty", Some("Shape"), vec![]),
    ]);
    assert_eq!(errors(&s), vec![ErrorKey::TraitMethodMismatch, ErrorKey::NotImplTraitDef]);
}

// =============================================================================
// Packages and imports
// =============================================================================

fn util_package() -> Vec<File> {
    vec![file(
        "util/lib.mer",
        vec![
            func("double").public().param("x", "int").ret("int").body(vec![ret(&["x * 2"])]).decl(),
            func("secret").ret("int").body(vec![ret(&["1"])]).decl(),
        ],
    )]
}

#[test]
fn test_namespace_imports() {
    let mut session = Session::new(options());
    session.add_package("util", util_package()).unwrap();
    let main = func("main")
        .body(vec![let_("a", "util.double(2)"), let_("b", "util.secret()")])
        .decl();
    session
        .add_package(
            "app",
            vec![file("app/main.mer", vec![use_("util", UseKind::Namespace), main])],
        )
        .unwrap();
    session.check("app").unwrap();

    assert_eq!(errors(&session), vec![ErrorKey::IdentIsNotAccessible]);
    assert!(rendered(&session, "main").contains("util::double(2)"));
    assert!(session.output("util").is_some());
}

#[test]
fn test_selective_and_wildcard_imports() {
    let mut session = Session::new(options());
    session.add_package("util", util_package()).unwrap();
    session
        .add_package(
            "other",
            vec![file(
                "other/lib.mer",
                vec![
                    func("double")
                        .public()
                        .param("x", "int")
                        .ret("int")
                        .body(vec![ret(&["x"])])
                        .decl(),
                ],
            )],
        )
        .unwrap();

    let selective = file(
        "app/a.mer",
        vec![
            use_select("util", &["double", "secret"]),
            func("a").ret("int").body(vec![ret(&["double(1)"])]).decl(),
        ],
    );
    let wildcard = file(
        "app/b.mer",
        vec![use_("util", UseKind::Wildcard), use_("other", UseKind::Wildcard)],
    );
    session.add_package("app", vec![selective, wildcard]).unwrap();
    session.check("app").unwrap();

    assert_eq!(errors(&session), vec![ErrorKey::IdentIsNotAccessible, ErrorKey::AmbiguousSideId]);
    let paths: Vec<&str> = session.diagnostics().errors().iter().map(|d| &*d.path).collect();
    assert_eq!(paths, vec!["app/a.mer", "app/b.mer"]);
}

#[test]
fn test_import_cycles_and_missing_packages() {
    let mut session = Session::new(options());
    session
        .add_package("a", vec![file("a/a.mer", vec![use_("b", UseKind::Namespace)])])
        .unwrap();
    session
        .add_package("b", vec![file("b/b.mer", vec![use_("a", UseKind::Namespace)])])
        .unwrap();
    session
        .add_package("c", vec![file("c/c.mer", vec![use_("nowhere", UseKind::Namespace)])])
        .unwrap();
    session.check_all();
    assert_eq!(errors(&session), vec![ErrorKey::IllegalImportCycle, ErrorKey::UseNotFound]);
}

#[test]
fn test_duplicate_top_level_names() {
    let s = check_decls(vec![
        func("f").body(vec![]).decl(),
        struct_("f").decl(),
        global("g", None, Some("1"), false, false),
    ]);
    assert_eq!(errors(&s), vec![ErrorKey::ExistId]);
}

#[test]
fn test_error_limit_stops_remaining_bodies() {
    let bad = |name: &str| func(name).body(vec![expr_stmt("1")]).decl();
    let mut session = Session::new(options().with_max_errors(1));
    session
        .add_package("app", vec![file("app/main.mer", vec![bad("f"), bad("g"), bad("h")])])
        .unwrap();
    session.check("app").unwrap();
    assert_eq!(errors(&session), vec![ErrorKey::ExprNotFuncCall]);
    assert!(session.should_stop());
}

// =============================================================================
// Output
// =============================================================================

#[test]
fn test_output_renders_functions() {
    let add = func("add")
        .param("a", "int")
        .param("b", "int")
        .ret("int")
        .body(vec![ret(&["a + b"])]);
    let s = check_decls(vec![add.decl()]);
    assert!(errors(&s).is_empty(), "{:?}", errors(&s));
    let text = rendered(&s, "add");
    assert!(text.starts_with("int add(int a, int b) {"), "{text}");
    assert!(text.contains("return (a + b);"), "{text}");
}
