//! Reference binder.
//!
//! Walks a tree once and records, per node id, the routine each invocation
//! resolves to and the static type of each expression it can type. Local
//! types come from declarations, object creation and call return types.
//! Overloads are picked by argument count. Visibility is not modelled: every
//! member is visible from every site.

use super::library::{substitute, Library};
use super::{ParamSymbol, RoutineSymbol, SemanticModel, SymbolId};
use crate::syntax::{NodeId, NodeKind, NodeRef, Signature, SyntaxTree, TypeDeclKind, TypeRef};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Assembly name given to routines declared in the analyzed tree.
pub const SOURCE_ASSEMBLY: &str = "Workspace";

type Scope = HashMap<String, Option<TypeRef>>;

/// Bound semantic information for one tree.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    library: Library,
    routines: Vec<RoutineSymbol>,
    members: HashMap<String, Vec<SymbolId>>,
    source_types: HashSet<String>,
    by_declaration: HashMap<NodeId, SymbolId>,
    call_targets: HashMap<NodeId, SymbolId>,
    expr_types: HashMap<NodeId, TypeRef>,
    references: HashMap<SymbolId, Vec<NodeId>>,
}

impl SymbolTable {
    /// Bind `tree` against `library`.
    #[must_use]
    pub fn bind(tree: &SyntaxTree, library: &Library) -> Self {
        let mut table = Self {
            library: library.clone(),
            ..Self::default()
        };

        for ty in &library.types {
            for method in &ty.methods {
                table.register(RoutineSymbol {
                    id: SymbolId(0),
                    name: method.name.clone(),
                    containing_type: ty.name.clone(),
                    assembly: ty.assembly.clone(),
                    is_async: method.is_async,
                    is_virtual: method.is_virtual,
                    is_abstract: method.is_abstract,
                    is_static: method.is_static,
                    return_type: method.return_type.clone(),
                    params: method.params.iter().map(param_symbol).collect(),
                    declaration: None,
                });
            }
        }

        let type_decls: Vec<NodeRef> = tree
            .descendants()
            .filter(|n| matches!(n.kind(), NodeKind::TypeDecl { .. }))
            .collect();

        for decl in &type_decls {
            let NodeKind::TypeDecl { name, kind } = decl.kind() else {
                continue;
            };
            table.source_types.insert(name.clone());
            for routine in decl.children() {
                if let Some(sig) = routine.signature() {
                    let is_abstract = sig.is_abstract
                        || *kind == TypeDeclKind::Interface
                        || routine.body().is_none();
                    let id = table.register(source_symbol(sig, name, is_abstract, routine.id()));
                    table.by_declaration.insert(routine.id(), id);
                }
            }
        }

        for decl in &type_decls {
            let NodeKind::TypeDecl { name, .. } = decl.kind() else {
                continue;
            };
            for routine in decl.children() {
                let (Some(sig), Some(body)) = (routine.signature(), routine.body()) else {
                    continue;
                };
                let mut scope: Scope = sig
                    .params
                    .iter()
                    .map(|p| (p.name.clone(), Some(p.ty.clone())))
                    .collect();
                table.bind_node(body, name, &mut scope);
            }
        }

        debug!(
            routines = table.routines.len(),
            calls = table.call_targets.len(),
            typed = table.expr_types.len(),
            "bound syntax tree"
        );
        table
    }

    fn register(&mut self, mut symbol: RoutineSymbol) -> SymbolId {
        let id = SymbolId(self.routines.len() as u32);
        symbol.id = id;
        self.members
            .entry(symbol.containing_type.clone())
            .or_default()
            .push(id);
        self.routines.push(symbol);
        id
    }

    /// Symbol by id.
    #[must_use]
    pub fn routine(&self, id: SymbolId) -> Option<&RoutineSymbol> {
        self.routines.get(id.0 as usize)
    }

    /// All routine symbols, library first.
    #[must_use]
    pub fn routines(&self) -> &[RoutineSymbol] {
        &self.routines
    }

    fn is_type_name(&self, name: &str) -> bool {
        self.source_types.contains(name) || self.library.find_type(name).is_some()
    }

    fn members_named(&self, type_name: &str, name: &str) -> Vec<&RoutineSymbol> {
        self.members
            .get(type_name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.routine(*id))
            .filter(|r| r.name == name)
            .collect()
    }

    fn property_type(&self, receiver: &TypeRef, name: &str) -> Option<TypeRef> {
        let ty = self.library.find_type(receiver.name()?)?;
        let property = ty.find_property(name)?;
        Some(substitute(&property.ty, &ty.generics, receiver.args()))
    }

    fn return_type(&self, symbol: &RoutineSymbol, receiver: Option<&TypeRef>) -> TypeRef {
        match (self.library.find_type(&symbol.containing_type), receiver) {
            (Some(ty), Some(receiver)) => {
                substitute(&symbol.return_type, &ty.generics, receiver.args())
            }
            _ => symbol.return_type.clone(),
        }
    }

    fn bind_node(&mut self, node: &NodeRef, type_name: &str, scope: &mut Scope) -> Option<TypeRef> {
        let ty = match node.kind() {
            NodeKind::Block => {
                let mut inner = scope.clone();
                for stmt in node.children() {
                    self.bind_node(stmt, type_name, &mut inner);
                }
                None
            }
            NodeKind::Local { name, ty } => {
                let init = node
                    .child(0)
                    .and_then(|init| self.bind_node(init, type_name, scope));
                scope.insert(name.clone(), ty.clone().or(init));
                None
            }
            NodeKind::ExprStmt | NodeKind::Return | NodeKind::Lock => {
                for child in node.children() {
                    self.bind_node(child, type_name, scope);
                }
                None
            }
            NodeKind::Ident { name } => match scope.get(name) {
                Some(local) => local.clone(),
                None if self.is_type_name(name) => Some(TypeRef::named(name.clone())),
                None => None,
            },
            NodeKind::Literal { text } => literal_type(text),
            NodeKind::Member { name } => {
                let receiver = node
                    .child(0)
                    .and_then(|target| self.bind_node(target, type_name, scope));
                receiver.and_then(|r| self.property_type(&r, name))
            }
            NodeKind::Call => self.bind_call(node, type_name, scope),
            NodeKind::New { ty } => {
                for arg in node.children() {
                    self.bind_node(arg, type_name, scope);
                }
                Some(ty.clone())
            }
            NodeKind::Await => {
                let operand = node
                    .child(0)
                    .and_then(|operand| self.bind_node(operand, type_name, scope));
                operand
                    .filter(|t| t.is_named(&self.library.handle_type))
                    .and_then(|t| t.args().first().cloned())
            }
            NodeKind::Paren => node
                .child(0)
                .and_then(|inner| self.bind_node(inner, type_name, scope)),
            NodeKind::Lambda { params, .. } => {
                let mut inner = scope.clone();
                for param in params {
                    inner.insert(param.clone(), None);
                }
                if let Some(body) = node.body() {
                    self.bind_node(body, type_name, &mut inner);
                }
                None
            }
            NodeKind::Unit | NodeKind::TypeDecl { .. } | NodeKind::Routine(_) => None,
        };

        if let Some(ty) = &ty {
            self.expr_types.insert(node.id(), ty.clone());
        }
        ty
    }

    fn bind_call(&mut self, call: &NodeRef, type_name: &str, scope: &mut Scope) -> Option<TypeRef> {
        let args = call.args();
        for arg in args {
            self.bind_node(arg, type_name, scope);
        }
        let callee = call.callee()?;

        let argc = args.len();
        let (symbol, receiver) = match callee.kind() {
            NodeKind::Ident { name } if !scope.contains_key(name) => {
                let symbol = select_overload(&self.members_named(type_name, name), argc).cloned();
                (symbol, None)
            }
            NodeKind::Member { name } => {
                let receiver = callee
                    .child(0)
                    .and_then(|target| self.bind_node(target, type_name, scope));
                let symbol = receiver.as_ref().and_then(TypeRef::name).and_then(|recv| {
                    select_overload(&self.members_named(recv, name), argc).cloned()
                });
                (symbol, receiver)
            }
            _ => {
                self.bind_node(callee, type_name, scope);
                return None;
            }
        };

        let symbol = symbol?;
        let ty = self.return_type(&symbol, receiver.as_ref());
        self.call_targets.insert(call.id(), symbol.id);
        if symbol.declaration.is_some() {
            self.references.entry(symbol.id).or_default().push(call.id());
        }
        (!ty.is_void()).then_some(ty)
    }
}

fn select_overload<'a>(candidates: &[&'a RoutineSymbol], argc: usize) -> Option<&'a RoutineSymbol> {
    candidates
        .iter()
        .copied()
        .find(|r| {
            let required = r.params.iter().filter(|p| !p.has_default).count();
            required <= argc && argc <= r.params.len()
        })
        .or_else(|| candidates.first().copied())
}

fn param_symbol(param: &crate::syntax::Param) -> ParamSymbol {
    ParamSymbol {
        name: param.name.clone(),
        ty: param.ty.clone(),
        mode: param.mode,
        has_default: param.default.is_some(),
    }
}

fn source_symbol(sig: &Signature, type_name: &str, is_abstract: bool, decl: NodeId) -> RoutineSymbol {
    RoutineSymbol {
        id: SymbolId(0),
        name: sig.name.clone(),
        containing_type: type_name.to_string(),
        assembly: SOURCE_ASSEMBLY.to_string(),
        is_async: sig.is_async,
        is_virtual: false,
        is_abstract,
        is_static: sig.is_static,
        return_type: sig.return_type.clone(),
        params: sig.params.iter().map(param_symbol).collect(),
        declaration: Some(decl),
    }
}

fn literal_type(text: &str) -> Option<TypeRef> {
    if text.starts_with('"') {
        Some(TypeRef::named("string"))
    } else if text == "true" || text == "false" {
        Some(TypeRef::named("bool"))
    } else if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        Some(TypeRef::named("int"))
    } else {
        None
    }
}

impl SemanticModel for SymbolTable {
    fn symbol_of(&self, call: NodeId) -> Option<&RoutineSymbol> {
        self.call_targets.get(&call).and_then(|id| self.routine(*id))
    }

    fn type_of(&self, expr: NodeId) -> Option<&TypeRef> {
        self.expr_types.get(&expr)
    }

    fn lookup_members(&self, receiver: &TypeRef, name: &str, _at: NodeId) -> Vec<&RoutineSymbol> {
        receiver
            .name()
            .map(|recv| self.members_named(recv, name))
            .unwrap_or_default()
    }

    fn declared_symbol(&self, declaration: NodeId) -> Option<&RoutineSymbol> {
        self.by_declaration
            .get(&declaration)
            .and_then(|id| self.routine(*id))
    }

    fn references_to(&self, routine: SymbolId) -> Vec<NodeId> {
        self.references.get(&routine).cloned().unwrap_or_default()
    }
}
