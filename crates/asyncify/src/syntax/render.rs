//! Source rendering.
//!
//! Produces brace-style source text for a tree or subtree. Rewrites never
//! depend on rendering; it exists for reports, fixtures and assertions.

use super::node::{Node, NodeKind, Param, Signature, TypeDeclKind};
use super::tree::SyntaxTree;

const INDENT: &str = "    ";

/// Render a whole tree.
#[must_use]
pub fn render(tree: &SyntaxTree) -> String {
    render_node(tree.root())
}

/// Render any node. Statements and declarations end with a newline;
/// expressions are rendered inline.
#[must_use]
pub fn render_node(node: &Node) -> String {
    let mut renderer = Renderer::default();
    renderer.node(node);
    renderer.out
}

/// Render a routine header without its body.
#[must_use]
pub fn render_signature(sig: &Signature) -> String {
    let mut out = String::new();
    for modifier in [
        (!sig.visibility.is_empty()).then_some(sig.visibility.as_str()),
        sig.is_static.then_some("static"),
        sig.is_abstract.then_some("abstract"),
        sig.is_async.then_some("async"),
    ]
    .into_iter()
    .flatten()
    {
        out.push_str(modifier);
        out.push(' ');
    }
    out.push_str(&format!("{} {}(", sig.return_type, sig.name));
    let params: Vec<String> = sig.params.iter().map(render_param).collect();
    out.push_str(&params.join(", "));
    out.push(')');
    out
}

fn render_param(param: &Param) -> String {
    let mut out = String::new();
    if let Some(keyword) = param.mode.keyword() {
        out.push_str(keyword);
        out.push(' ');
    }
    out.push_str(&format!("{} {}", param.ty, param.name));
    if let Some(default) = &param.default {
        out.push_str(" = ");
        out.push_str(default);
    }
    out
}

#[derive(Debug, Default)]
struct Renderer {
    out: String,
    depth: usize,
}

impl Renderer {
    fn line_start(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn node(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::Unit => {
                for (i, ty) in node.children().iter().enumerate() {
                    if i > 0 {
                        self.out.push('\n');
                    }
                    self.node(ty);
                }
            }
            NodeKind::TypeDecl { .. } => self.type_decl(node),
            NodeKind::Routine(_) => self.routine(node),
            NodeKind::Block
            | NodeKind::Local { .. }
            | NodeKind::ExprStmt
            | NodeKind::Return
            | NodeKind::Lock => self.stmt(node),
            _ => self.expr(node),
        }
    }

    fn type_decl(&mut self, node: &Node) {
        let NodeKind::TypeDecl { name, kind } = node.kind() else {
            return;
        };
        let keyword = match kind {
            TypeDeclKind::Class => "class",
            TypeDeclKind::Interface => "interface",
        };
        self.line_start();
        self.out.push_str(&format!("public {keyword} {name}\n"));
        self.line_start();
        self.out.push_str("{\n");
        self.depth += 1;
        for (i, routine) in node.children().iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.node(routine);
        }
        self.depth -= 1;
        self.line_start();
        self.out.push_str("}\n");
    }

    fn routine(&mut self, node: &Node) {
        let Some(sig) = node.signature() else {
            return;
        };
        self.line_start();
        self.out.push_str(&render_signature(sig));
        match node.body() {
            None => self.out.push_str(";\n"),
            Some(body) if matches!(body.kind(), NodeKind::Block) => {
                self.out.push('\n');
                self.stmt(body);
            }
            Some(expr) => {
                self.out.push_str(" => ");
                self.expr(expr);
                self.out.push_str(";\n");
            }
        }
    }

    fn block_lines(&mut self, block: &Node) {
        self.line_start();
        self.out.push_str("{\n");
        self.depth += 1;
        for stmt in block.children() {
            self.stmt(stmt);
        }
        self.depth -= 1;
        self.line_start();
        self.out.push_str("}\n");
    }

    fn stmt(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::Block => self.block_lines(node),
            NodeKind::Local { name, ty } => {
                self.line_start();
                match ty {
                    Some(ty) => self.out.push_str(&format!("{ty} {name}")),
                    None => self.out.push_str(&format!("var {name}")),
                }
                if let Some(init) = node.child(0) {
                    self.out.push_str(" = ");
                    self.expr(init);
                }
                self.out.push_str(";\n");
            }
            NodeKind::ExprStmt => {
                self.line_start();
                if let Some(expr) = node.child(0) {
                    self.expr(expr);
                }
                self.out.push_str(";\n");
            }
            NodeKind::Return => {
                self.line_start();
                self.out.push_str("return");
                if let Some(expr) = node.child(0) {
                    self.out.push(' ');
                    self.expr(expr);
                }
                self.out.push_str(";\n");
            }
            NodeKind::Lock => {
                self.line_start();
                self.out.push_str("lock (");
                if let Some(target) = node.child(0) {
                    self.expr(target);
                }
                self.out.push_str(")\n");
                if let Some(body) = node.child(1) {
                    self.block_lines(body);
                }
            }
            _ => {
                self.line_start();
                self.expr(node);
                self.out.push_str(";\n");
            }
        }
    }

    fn expr(&mut self, node: &Node) {
        match node.kind() {
            NodeKind::Ident { name } => self.out.push_str(name),
            NodeKind::Literal { text } => self.out.push_str(text),
            NodeKind::Member { name } => {
                if let Some(target) = node.child(0) {
                    self.expr(target);
                }
                self.out.push('.');
                self.out.push_str(name);
            }
            NodeKind::Call => {
                if let Some(callee) = node.callee() {
                    self.expr(callee);
                }
                self.arg_list(node.args());
            }
            NodeKind::New { ty } => {
                self.out.push_str(&format!("new {ty}"));
                self.arg_list(node.args());
            }
            NodeKind::Await => {
                self.out.push_str("await ");
                if let Some(operand) = node.child(0) {
                    self.expr(operand);
                }
            }
            NodeKind::Paren => {
                self.out.push('(');
                if let Some(inner) = node.child(0) {
                    self.expr(inner);
                }
                self.out.push(')');
            }
            NodeKind::Lambda { params, is_async } => {
                if *is_async {
                    self.out.push_str("async ");
                }
                if params.len() == 1 {
                    self.out.push_str(&params[0]);
                } else {
                    self.out.push_str(&format!("({})", params.join(", ")));
                }
                self.out.push_str(" => ");
                match node.body() {
                    Some(body) if matches!(body.kind(), NodeKind::Block) => {
                        self.out.push_str("{ ");
                        for stmt in body.children() {
                            let mut inline = Self::default();
                            inline.stmt(stmt);
                            for line in inline.out.lines().map(str::trim).filter(|l| !l.is_empty()) {
                                self.out.push_str(line);
                                self.out.push(' ');
                            }
                        }
                        self.out.push('}');
                    }
                    Some(body) => self.expr(body),
                    None => {}
                }
            }
            // Statements and declarations never appear in expression
            // position; render them inline for diagnostics.
            _ => {
                let mut inner = Self::default();
                inner.node(node);
                self.out.push_str(inner.out.trim());
            }
        }
    }

    fn arg_list(&mut self, args: &[super::node::NodeRef]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(arg);
        }
        self.out.push(')');
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::syntax::builder::{Expr, RoutineBuilder, Stmt, TypeBuilder, UnitBuilder};
    use crate::syntax::node::{ParamMode, TypeRef};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_class_with_routine() {
        let tree = UnitBuilder::new()
            .ty(TypeBuilder::class("TapTest").routine(
                RoutineBuilder::new("Test")
                    .returns(TypeRef::named("int"))
                    .body(vec![
                        Stmt::var("test", Expr::create_named("AsyncClass")),
                        Stmt::ret(Expr::ident("test").dot("CallAsync").call(vec![]).dot("Result")),
                    ]),
            ))
            .build()
            .unwrap();

        let expected = "\
public class TapTest
{
    public int Test()
    {
        var test = new AsyncClass();
        return test.CallAsync().Result;
    }
}
";
        assert_eq!(render(&tree), expected);
    }

    #[test]
    fn renders_signature_modifiers_and_params() {
        let mut sig = Signature::new(
            "Test",
            TypeRef::generic("Task", vec![TypeRef::named("int")]),
        );
        sig.is_async = true;
        sig.params.push(
            Param::new("cancellationToken", TypeRef::named("CancellationToken"))
                .with_default("default(CancellationToken)"),
        );
        assert_eq!(
            render_signature(&sig),
            "public async Task<int> Test(CancellationToken cancellationToken = default(CancellationToken))"
        );

        let mut out_sig = Signature::new("Try", TypeRef::named("bool"));
        out_sig
            .params
            .push(Param::new("value", TypeRef::named("string")).with_mode(ParamMode::Out));
        assert_eq!(render_signature(&out_sig), "public bool Try(out string value)");
    }

    #[test]
    fn renders_lambdas() {
        let single = Expr::async_lambda(&["x"], Expr::ident("x").awaited()).into_node();
        assert_eq!(render_node(&single), "async x => await x");

        let none = Expr::lambda(&[], Expr::ident("Run").call(vec![])).into_node();
        assert_eq!(render_node(&none), "() => Run()");

        let block = Expr::lambda_block(&["a", "b"], vec![Stmt::ret(Expr::ident("a"))]).into_node();
        assert_eq!(render_node(&block), "(a, b) => { return a; }");

        let nested = Expr::lambda_block(
            &[],
            vec![Stmt::lock(
                Expr::ident("gate"),
                vec![Stmt::expr(Expr::ident("Run").call(vec![]))],
            )],
        )
        .into_node();
        assert_eq!(render_node(&nested), "() => { lock (gate) { Run(); } }");
    }

    #[test]
    fn renders_lock_and_expression_body() {
        let tree = UnitBuilder::new()
            .ty(TypeBuilder::class("C")
                .routine(RoutineBuilder::new("Run").body(vec![Stmt::lock(
                    Expr::ident("gate"),
                    vec![Stmt::expr(Expr::ident("Work").call(vec![]))],
                )]))
                .routine(
                    RoutineBuilder::new("Value")
                        .returns(TypeRef::named("int"))
                        .expression_body(Expr::lit("1").paren()),
                ))
            .build()
            .unwrap();

        let expected = "\
public class C
{
    public void Run()
    {
        lock (gate)
        {
            Work();
        }
    }

    public int Value() => (1);
}
";
        assert_eq!(render(&tree), expected);
    }
}
