//! End-to-end fix scenarios.
//!
//! Each test builds a small compilation unit, runs analysis, applies the
//! fix for the reported site and compares the rendered result.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use asyncify::diagnostic::{BLOCKING_ACCESS, BLOCKING_INVOCATION, SYNC_SIBLING};
use asyncify::prelude::*;
use asyncify::semantic::{ExternalMethod, ExternalType};
use asyncify::syntax::{render_signature, NodeRef};
use pretty_assertions::assert_eq;

// ============================================================================
// Fixture helpers
// ============================================================================

fn int() -> TypeRef {
    TypeRef::named("int")
}

fn task_of(t: &str) -> TypeRef {
    TypeRef::generic("Task", vec![TypeRef::named(t)])
}

fn ct_param() -> Param {
    Param::new("cancellationToken", TypeRef::named("CancellationToken"))
        .with_default("default(CancellationToken)")
}

fn async_class() -> TypeBuilder {
    TypeBuilder::class("AsyncClass")
        .routine(
            RoutineBuilder::new("CallAsync")
                .returns(task_of("int"))
                .async_()
                .param(ct_param())
                .body(vec![Stmt::ret(Expr::lit("0"))]),
        )
        .routine(
            RoutineBuilder::new("FireAsync")
                .returns(TypeRef::named("Task"))
                .async_()
                .body(vec![Stmt::ret_void()]),
        )
}

fn new_test() -> Stmt {
    Stmt::var("test", Expr::create_named("AsyncClass"))
}

fn blocking_leaf() -> RoutineBuilder {
    RoutineBuilder::new("Test").returns(int()).body(vec![
        new_test(),
        Stmt::ret(Expr::ident("test").dot("CallAsync").call(vec![]).dot("Result")),
    ])
}

fn routine_named(tree: &SyntaxTree, name: &str) -> NodeRef {
    tree.descendants()
        .find(|n| n.signature().is_some_and(|s| s.name == name))
        .expect("routine present")
}

fn signature_of(tree: &SyntaxTree, name: &str) -> String {
    render_signature(routine_named(tree, name).signature().unwrap())
}

fn stmt(tree: &SyntaxTree, routine: &str, index: usize) -> String {
    render_node(routine_named(tree, routine).body().unwrap().child(index).unwrap())
}

/// Analyze, fix the first finding, and return the outcome.
fn fix_first(tree: &SyntaxTree) -> FixOutcome {
    let table = SymbolTable::bind(tree, &Library::standard());
    let engine = Asyncify::new(&table);
    let report = engine.analyze(tree);
    let site = report.diagnostics.first().expect("a finding").node;
    engine.fix(tree, site).expect("fix applies")
}

// ============================================================================
// Full-unit rewrites
// ============================================================================

#[test]
fn test_two_level_chain_full_render() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(blocking_leaf()).routine(
            RoutineBuilder::new("FirstLevelUp")
                .returns(int())
                .body(vec![Stmt::ret(Expr::ident("Test").call(vec![]))]),
        ))
        .ty(TypeBuilder::class("AsyncClass").routine(
            RoutineBuilder::new("CallAsync")
                .returns(task_of("int"))
                .async_()
                .param(ct_param())
                .body(vec![Stmt::ret(Expr::lit("0"))]),
        ))
        .build()
        .unwrap();

    let outcome = fix_first(&tree);

    let expected = "\
public class TapTest
{
    public async Task<int> Test(CancellationToken cancellationToken = default(CancellationToken))
    {
        var test = new AsyncClass();
        return await test.CallAsync(cancellationToken);
    }

    public async Task<int> FirstLevelUp(CancellationToken cancellationToken = default(CancellationToken))
    {
        return await Test(cancellationToken);
    }
}

public class AsyncClass
{
    public async Task<int> CallAsync(CancellationToken cancellationToken = default(CancellationToken))
    {
        return 0;
    }
}
";
    assert_eq!(render(&outcome.tree), expected);
    assert_eq!(outcome.summary().converted, vec!["Test", "FirstLevelUp"]);
}

#[test]
fn test_fix_leaves_no_findings_behind() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(blocking_leaf()).routine(
            RoutineBuilder::new("FirstLevelUp")
                .returns(int())
                .body(vec![Stmt::ret(Expr::ident("Test").call(vec![]))]),
        ))
        .ty(async_class())
        .build()
        .unwrap();

    let outcome = fix_first(&tree);
    let table = SymbolTable::bind(&outcome.tree, &Library::standard());
    let report = Asyncify::new(&table).analyze(&outcome.tree);
    assert!(!report.has_findings(), "{:?}", report.diagnostics);
}

// ============================================================================
// Blocking forms
// ============================================================================

#[test]
fn test_awaiter_chain_is_replaced_whole() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(
            RoutineBuilder::new("Test").returns(int()).body(vec![
                new_test(),
                Stmt::ret(
                    Expr::ident("test")
                        .dot("CallAsync")
                        .call(vec![])
                        .dot("GetAwaiter")
                        .call(vec![])
                        .dot("GetResult")
                        .call(vec![]),
                ),
            ]),
        ))
        .ty(async_class())
        .build()
        .unwrap();

    let outcome = fix_first(&tree);
    assert_eq!(
        stmt(&outcome.tree, "Test", 1),
        "return await test.CallAsync(cancellationToken);\n"
    );
}

#[test]
fn test_parenthesized_wait_on_bare_handle() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(RoutineBuilder::new("Test").body(vec![
            new_test(),
            Stmt::expr(
                Expr::ident("test")
                    .dot("FireAsync")
                    .call(vec![])
                    .paren()
                    .dot("Wait")
                    .call(vec![]),
            ),
        ])))
        .ty(async_class())
        .build()
        .unwrap();

    let outcome = fix_first(&tree);
    assert_eq!(stmt(&outcome.tree, "Test", 1), "await test.FireAsync();\n");
    assert_eq!(
        signature_of(&outcome.tree, "Test"),
        "public async Task Test(CancellationToken cancellationToken = default(CancellationToken))"
    );
}

#[test]
fn test_variable_held_handle() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(
            RoutineBuilder::new("Test").returns(int()).body(vec![
                new_test(),
                Stmt::var("task", Expr::ident("test").dot("CallAsync").call(vec![])),
                Stmt::ret(Expr::ident("task").dot("Result")),
            ]),
        ))
        .ty(async_class())
        .build()
        .unwrap();

    let table = SymbolTable::bind(&tree, &Library::standard());
    let engine = Asyncify::new(&table);
    let report = engine.analyze(&tree);
    assert_eq!(report.count_rule(BLOCKING_ACCESS), 1);
    assert_eq!(report.count_rule(BLOCKING_INVOCATION), 0);

    let outcome = engine.fix(&tree, report.diagnostics[0].node).unwrap();
    assert_eq!(stmt(&outcome.tree, "Test", 2), "return await task;\n");
    assert_eq!(
        signature_of(&outcome.tree, "Test"),
        "public async Task<int> Test(CancellationToken cancellationToken = default(CancellationToken))"
    );
}

// ============================================================================
// Synchronous siblings
// ============================================================================

#[test]
fn test_static_platform_sibling() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("Reader").routine(
            RoutineBuilder::new("Load")
                .returns(TypeRef::named("string"))
                .param(Param::new("path", TypeRef::named("string")))
                .body(vec![Stmt::ret(
                    Expr::ident("File")
                        .dot("ReadAllText")
                        .call(vec![Expr::ident("path")]),
                )]),
        ))
        .build()
        .unwrap();

    let table = SymbolTable::bind(&tree, &Library::standard());
    let report = Asyncify::new(&table).analyze(&tree);
    assert_eq!(report.count_rule(SYNC_SIBLING), 1);

    let outcome = fix_first(&tree);
    assert_eq!(
        stmt(&outcome.tree, "Load", 0),
        "return await File.ReadAllTextAsync(path, cancellationToken);\n"
    );
    assert_eq!(
        signature_of(&outcome.tree, "Load"),
        "public async Task<string> Load(string path, CancellationToken cancellationToken = default(CancellationToken))"
    );
}

#[test]
fn test_sibling_replaces_blocking_unwrap() {
    let fetcher = ExternalType::new("Fetcher", "System.Net")
        .method(ExternalMethod::new("Fetch", task_of("int")))
        .method(ExternalMethod::new("FetchAsync", task_of("int")));
    let library = Library::standard().with_type(fetcher);
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("Client").routine(
            RoutineBuilder::new("Get")
                .returns(int())
                .param(Param::new("f", TypeRef::named("Fetcher")))
                .body(vec![Stmt::ret(
                    Expr::ident("f").dot("Fetch").call(vec![]).dot("Result"),
                )]),
        ))
        .build()
        .unwrap();

    let table = SymbolTable::bind(&tree, &library);
    let engine = Asyncify::new(&table);
    let report = engine.analyze(&tree);
    assert_eq!(report.count_rule(SYNC_SIBLING), 1);
    assert_eq!(report.count_rule(BLOCKING_INVOCATION), 0);

    let outcome = engine.fix(&tree, report.diagnostics[0].node).unwrap();
    assert_eq!(stmt(&outcome.tree, "Get", 0), "return await f.FetchAsync();\n");
    assert_eq!(
        signature_of(&outcome.tree, "Get"),
        "public async Task<int> Get(Fetcher f, CancellationToken cancellationToken = default(CancellationToken))"
    );
}

#[test]
fn test_ambiguous_and_virtual_siblings_are_skipped() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("Reader").routine(
            RoutineBuilder::new("Drain")
                .param(Param::new("reader", TypeRef::named("StreamReader")))
                .param(Param::new("stream", TypeRef::named("Stream")))
                .body(vec![
                    Stmt::var("line", Expr::ident("reader").dot("ReadLine").call(vec![])),
                    Stmt::expr(Expr::ident("stream").dot("Flush").call(vec![])),
                ]),
        ))
        .build()
        .unwrap();

    let table = SymbolTable::bind(&tree, &Library::standard());
    let report = Asyncify::new(&table).analyze(&tree);
    assert!(!report.has_findings(), "{:?}", report.diagnostics);
}

#[test]
fn test_source_routine_with_async_name_is_not_a_sibling() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("Service")
            .routine(
                RoutineBuilder::new("Load")
                    .returns(int())
                    .body(vec![Stmt::ret(Expr::lit("1"))]),
            )
            .routine(
                RoutineBuilder::new("LoadAsync")
                    .returns(task_of("int"))
                    .async_()
                    .body(vec![Stmt::ret(Expr::lit("1"))]),
            )
            .routine(
                RoutineBuilder::new("Run")
                    .returns(int())
                    .body(vec![Stmt::ret(Expr::ident("Load").call(vec![]))]),
            ))
        .build()
        .unwrap();

    let table = SymbolTable::bind(&tree, &Library::standard());
    let report = Asyncify::new(&table).analyze(&tree);
    assert_eq!(report.count_rule(SYNC_SIBLING), 0);
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_interface_caller_keeps_blocking() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::interface("IService").routine(
            RoutineBuilder::new("Compute").returns(int()),
        ))
        .ty(TypeBuilder::class("TapTest").routine(blocking_leaf()).routine(
            RoutineBuilder::new("Outer")
                .returns(int())
                .param(Param::new("value", int()).with_mode(ParamMode::Ref))
                .body(vec![Stmt::ret(Expr::ident("Test").call(vec![]))]),
        ))
        .ty(async_class())
        .build()
        .unwrap();

    let outcome = fix_first(&tree);
    assert_eq!(stmt(&outcome.tree, "Outer", 0), "return Test().Result;\n");
    assert_eq!(
        signature_of(&outcome.tree, "Outer"),
        "public int Outer(ref int value)"
    );
    assert_eq!(outcome.blocked_sites.len(), 1);
    assert_eq!(signature_of(&outcome.tree, "Compute"), "int Compute()");
}

#[test]
fn test_lock_in_leaf_is_not_fixable() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(
            RoutineBuilder::new("Test").returns(int()).body(vec![
                new_test(),
                Stmt::lock(
                    Expr::ident("test"),
                    vec![Stmt::ret(
                        Expr::ident("test").dot("CallAsync").call(vec![]).dot("Result"),
                    )],
                ),
            ]),
        ))
        .ty(async_class())
        .build()
        .unwrap();

    let table = SymbolTable::bind(&tree, &Library::standard());
    let engine = Asyncify::new(&table);
    assert!(!engine.analyze(&tree).has_findings());

    let call = tree
        .descendants()
        .find(|n| n.invoked_name() == Some("CallAsync"))
        .unwrap()
        .id();
    let err = engine.fix(&tree, call).unwrap_err();
    assert!(err.is_not_applicable());
}

#[test]
fn test_already_awaited_is_not_reported() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(
            RoutineBuilder::new("Test")
                .returns(task_of("int"))
                .async_()
                .body(vec![
                    new_test(),
                    Stmt::ret(Expr::ident("test").dot("CallAsync").call(vec![]).awaited()),
                ]),
        ))
        .ty(async_class())
        .build()
        .unwrap();

    let table = SymbolTable::bind(&tree, &Library::standard());
    assert!(!Asyncify::new(&table).analyze(&tree).has_findings());
}

// ============================================================================
// Lambdas and chains through many callers
// ============================================================================

#[test]
fn test_lambda_site_only_marks_lambda() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(
            RoutineBuilder::new("Test")
                .param(Param::new("bla", TypeRef::named("Items")))
                .body(vec![Stmt::var(
                    "x",
                    Expr::ident("bla").dot("Select").call(vec![Expr::lambda(
                        &["x"],
                        Expr::ident("Task")
                            .dot("FromResult")
                            .call(vec![Expr::lit("100")])
                            .dot("Result"),
                    )]),
                )]),
        ))
        .build()
        .unwrap();

    let outcome = fix_first(&tree);
    assert_eq!(
        stmt(&outcome.tree, "Test", 0),
        "var x = bla.Select(async x => await Task.FromResult(100));\n"
    );
    assert_eq!(signature_of(&outcome.tree, "Test"), "public void Test(Items bla)");
    assert!(outcome.converted.is_empty());
}

#[test]
fn test_multiple_callers_of_one_routine() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest")
            .routine(blocking_leaf())
            .routine(
                RoutineBuilder::new("Sum")
                    .returns(int())
                    .body(vec![
                        Stmt::var("a", Expr::ident("Test").call(vec![])),
                        Stmt::ret(Expr::ident("Test").call(vec![])),
                    ]),
            )
            .routine(
                RoutineBuilder::new("Entry")
                    .returns(int())
                    .body(vec![Stmt::ret(Expr::ident("Test").call(vec![]))]),
            ))
        .ty(async_class())
        .build()
        .unwrap();

    let outcome = fix_first(&tree);
    assert_eq!(stmt(&outcome.tree, "Sum", 0), "var a = await Test(cancellationToken);\n");
    assert_eq!(stmt(&outcome.tree, "Sum", 1), "return await Test(cancellationToken);\n");
    assert_eq!(stmt(&outcome.tree, "Entry", 0), "return await Test(cancellationToken);\n");
    assert_eq!(outcome.converted.len(), 3);
}

#[test]
fn test_routine_returning_handle_is_marked_only() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(blocking_leaf()).routine(
            RoutineBuilder::new("Start")
                .returns(TypeRef::named("Task"))
                .body(vec![
                    Stmt::expr(Expr::ident("Test").call(vec![])),
                    Stmt::ret(Expr::ident("Task").dot("Delay").call(vec![Expr::lit("1")])),
                ]),
        ))
        .ty(async_class())
        .build()
        .unwrap();

    let outcome = fix_first(&tree);
    assert_eq!(signature_of(&outcome.tree, "Start"), "public async Task Start()");
    assert_eq!(stmt(&outcome.tree, "Start", 0), "await Test();\n");
    assert_eq!(outcome.summary().converted, vec!["Test", "Start"]);
}

#[test]
fn test_original_ids_survive_the_fix() {
    let tree = UnitBuilder::new()
        .ty(TypeBuilder::class("TapTest").routine(blocking_leaf()).routine(
            RoutineBuilder::new("FirstLevelUp")
                .returns(int())
                .body(vec![Stmt::ret(Expr::ident("Test").call(vec![]))]),
        ))
        .ty(async_class())
        .build()
        .unwrap();

    let before_test = routine_named(&tree, "Test").id();
    let before_up = routine_named(&tree, "FirstLevelUp").id();
    let outcome = fix_first(&tree);

    assert_eq!(routine_named(&outcome.tree, "Test").id(), before_test);
    assert_eq!(routine_named(&outcome.tree, "FirstLevelUp").id(), before_up);
    assert_eq!(outcome.converted, vec![before_test, before_up]);
}
