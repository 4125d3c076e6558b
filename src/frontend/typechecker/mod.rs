//! Type resolver for the Vela front-end.
//!
//! A tree-walking semantic pass that performs name resolution, scope
//! bookkeeping, class and method resolution, implicit-widening decisions, and
//! full type checking. It runs once per module, after parsing; imported
//! modules have already been resolved by the time the importer's resolver
//! runs.
//!
//! The resolver never holds pointers into the AST. Class and function
//! signatures are collected into resolver-owned tables up front and resolved
//! to value-level [`Ty`]s on demand; the walk itself mutates each
//! expression's `resolved` record in place.
//!
//! Errors are reported to the diagnostics sink and checking continues: a
//! failed sub-expression yields the [`TyKind::Error`] sentinel, which is
//! compatible with everything so one mistake does not cascade.

mod check_expr;
mod check_stmt;


use std::collections::HashMap;

use crate::frontend::ast::*;
use crate::frontend::lexer::tokens::Token;
use crate::frontend::module::{Module, ModuleRegistry, Session};

/// A resolved function or method signature.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<(String, Ty)>,
    pub ret: Ty,
}

/// A class member as collected from its declaration; the resolved type is
/// cached on first use.
#[derive(Debug, Clone)]
pub(crate) struct MemberInfo {
    name: String,
    visibility: Visibility,
    texpr: Option<TypeExpr>,
    ty: Option<Ty>,
}

#[derive(Debug, Clone)]
pub(crate) struct MethodInfo {
    name: String,
    visibility: Visibility,
    params: Vec<(String, TypeExpr)>,
    ret: TypeExpr,
    sig: Option<FnSig>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ClassInfo {
    members: Vec<MemberInfo>,
    methods: Vec<MethodInfo>,
    ctor: Option<usize>,
    dtor: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionInfo {
    params: Vec<(String, TypeExpr)>,
    ret: TypeExpr,
    sig: Option<FnSig>,
}

/// One entry of the lexical scope stack. Lookup is last-in-first-out by
/// name; `class` is set for class members and methods brought into scope
/// while their class body is being checked.
#[derive(Debug, Clone)]
pub(crate) struct Local {
    pub name: String,
    pub ty: Ty,
    pub depth: usize,
    pub class: Option<String>,
}

/// What a class member lookup found.
pub(crate) enum Member {
    Field { ty: Ty, visibility: Visibility },
    Method { visibility: Visibility },
}

pub struct TypeResolver<'a> {
    pub(crate) session: &'a mut Session,
    pub(crate) imported: Vec<usize>,
    pub(crate) classes: HashMap<String, ClassInfo>,
    pub(crate) functions: HashMap<String, FunctionInfo>,
    pub(crate) aliases: HashMap<String, Ty>,
    pub(crate) values: Vec<Local>,
    pub(crate) scope_depth: usize,
    pub(crate) current_class: Option<String>,
    pub(crate) current_function: Option<String>,
    pub(crate) current_return: Option<Ty>,
    /// Name of the alias currently being resolved, for cycle detection.
    pub(crate) current_alias: Option<String>,
    /// Scope-stack length at entry of the enclosing function body.
    pub(crate) function_base: usize,
    pub(crate) in_ctor: bool,
    pub(crate) in_dtor: bool,
    pub(crate) in_loop: bool,
    pub(crate) in_switch: bool,
}

/// Type-check a parsed module, annotating every expression's resolved record.
#[tracing::instrument(skip_all, fields(module = %module.name, stmt_count = module.statements.len()))]
pub fn check(module: &mut Module, session: &mut Session) {
    let mut resolver = TypeResolver::new(module, session);
    let mut statements = std::mem::take(&mut module.statements);
    for stmt in &mut statements {
        resolver.check_stmt(stmt);
    }
    module.statements = statements;
}

impl<'a> TypeResolver<'a> {
    /// Collect class and function declarations so bodies can reference them
    /// regardless of declaration order.
    pub fn new(module: &Module, session: &'a mut Session) -> Self {
        let mut classes = HashMap::new();
        let mut functions = HashMap::new();

        for stmt in &module.statements {
            match stmt {
                Stmt::Class(class) => {
                    let mut info = ClassInfo {
                        ctor: class.ctor,
                        dtor: class.dtor,
                        ..ClassInfo::default()
                    };

                    for (member, visibility) in &class.members {
                        if info.members.iter().any(|m| m.name == member.name.lexeme) {
                            session.reporter.error(
                                format!(
                                    "Duplicate member '{}' in class '{}'",
                                    member.name.lexeme, class.name.lexeme
                                ),
                                &member.name,
                            );
                            continue;
                        }
                        if member.declared_type.is_none() {
                            session.reporter.error(
                                format!("Class member '{}' requires a type annotation", member.name.lexeme),
                                &member.name,
                            );
                        }
                        info.members.push(MemberInfo {
                            name: member.name.lexeme.clone(),
                            visibility: *visibility,
                            texpr: member.declared_type.clone(),
                            ty: member.declared_type.is_none().then(Ty::error),
                        });
                    }

                    for (method, visibility) in &class.methods {
                        info.methods.push(MethodInfo {
                            name: method.name.lexeme.clone(),
                            visibility: *visibility,
                            params: method
                                .params
                                .iter()
                                .map(|(name, texpr)| (name.lexeme.clone(), texpr.clone()))
                                .collect(),
                            ret: method.return_type.clone(),
                            sig: None,
                        });
                    }

                    classes.insert(class.name.lexeme.clone(), info);
                }
                Stmt::Function(function) => {
                    functions.insert(
                        function.name.lexeme.clone(),
                        FunctionInfo {
                            params: function
                                .params
                                .iter()
                                .map(|(name, texpr)| (name.lexeme.clone(), texpr.clone()))
                                .collect(),
                            ret: function.return_type.clone(),
                            sig: None,
                        },
                    );
                }
                _ => {}
            }
        }

        Self {
            session,
            imported: module.imported.clone(),
            classes,
            functions,
            aliases: HashMap::new(),
            values: Vec::new(),
            scope_depth: 0,
            current_class: None,
            current_function: None,
            current_return: None,
            current_alias: None,
            function_base: 0,
            in_ctor: false,
            in_dtor: false,
            in_loop: false,
            in_switch: false,
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub(crate) fn error(&mut self, message: impl Into<String>, token: &Token) {
        self.session.reporter.error(message, token);
    }

    pub(crate) fn note(&mut self, message: impl Into<String>) {
        self.session.reporter.note(message);
    }

    // ========================================================================
    // Scope stack
    // ========================================================================

    pub(crate) fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Pop every trailing entry declared at the current depth, then leave it.
    pub(crate) fn end_scope(&mut self) {
        while self
            .values
            .last()
            .map(|value| value.depth == self.scope_depth)
            .unwrap_or(false)
        {
            self.values.pop();
        }
        self.scope_depth -= 1;
    }

    pub(crate) fn declare_value(&mut self, name: String, ty: Ty, class: Option<String>) {
        self.values.push(Local {
            name,
            ty,
            depth: self.scope_depth,
            class,
        });
    }

    pub(crate) fn lookup_value(&self, name: &str) -> Option<&Local> {
        self.values.iter().rev().find(|value| value.name == name)
    }

    // ========================================================================
    // Class, function, and module lookups
    // ========================================================================

    /// Make sure `class_name` has a `ClassInfo` entry, pulling the class in
    /// from an imported module if it is not local.
    pub(crate) fn ensure_class_info(&mut self, class_name: &str) -> bool {
        if self.classes.contains_key(class_name) {
            return true;
        }

        let imported = self.imported.clone();
        for index in imported {
            let built = {
                let registry = &self.session.registry;
                let module = registry.module(index);
                module
                    .class(class_name)
                    .map(|decl| class_info_from_module(decl, module, registry))
            };
            if let Some(info) = built {
                self.classes.insert(class_name.to_string(), info);
                return true;
            }
        }
        false
    }

    /// Look up a field or method on a class, resolving and caching the
    /// field's type on first use.
    pub(crate) fn class_member(&mut self, class_name: &str, member: &str) -> Option<Member> {
        if !self.ensure_class_info(class_name) {
            return None;
        }

        let field = {
            let info = self.classes.get(class_name)?;
            info.members
                .iter()
                .position(|m| m.name == member)
                .map(|i| (i, info.members[i].visibility, info.members[i].ty.clone(), info.members[i].texpr.clone()))
        };

        if let Some((index, visibility, cached, texpr)) = field {
            let ty = match cached {
                Some(ty) => ty,
                None => {
                    let ty = match texpr {
                        Some(mut texpr) => self.resolve_type(&mut texpr),
                        None => Ty::error(),
                    };
                    if let Some(info) = self.classes.get_mut(class_name) {
                        info.members[index].ty = Some(ty.clone());
                    }
                    ty
                }
            };
            return Some(Member::Field { ty, visibility });
        }

        let info = self.classes.get(class_name)?;
        info.methods
            .iter()
            .find(|m| m.name == member)
            .map(|m| Member::Method { visibility: m.visibility })
    }

    pub(crate) fn method_sig(&mut self, class_name: &str, method: &str) -> Option<FnSig> {
        if !self.ensure_class_info(class_name) {
            return None;
        }
        let index = self
            .classes
            .get(class_name)?
            .methods
            .iter()
            .position(|m| m.name == method)?;
        self.method_sig_at(class_name, index)
    }

    pub(crate) fn method_sig_at(&mut self, class_name: &str, index: usize) -> Option<FnSig> {
        let (cached, params, ret) = {
            let info = self.classes.get(class_name)?;
            let method = info.methods.get(index)?;
            (method.sig.clone(), method.params.clone(), method.ret.clone())
        };

        if let Some(sig) = cached {
            return Some(sig);
        }
        let sig = self.resolve_signature(params, ret);
        if let Some(info) = self.classes.get_mut(class_name) {
            if let Some(method) = info.methods.get_mut(index) {
                method.sig = Some(sig.clone());
            }
        }
        Some(sig)
    }

    /// Constructor signature of a class, if it declares one.
    pub(crate) fn ctor_sig(&mut self, class_name: &str) -> Option<FnSig> {
        if !self.ensure_class_info(class_name) {
            return None;
        }
        let ctor = self.classes.get(class_name)?.ctor?;
        self.method_sig_at(class_name, ctor)
    }

    pub(crate) fn function_sig(&mut self, name: &str) -> Option<FnSig> {
        let (cached, params, ret) = {
            let info = self.functions.get(name)?;
            (info.sig.clone(), info.params.clone(), info.ret.clone())
        };

        if let Some(sig) = cached {
            return Some(sig);
        }
        let sig = self.resolve_signature(params, ret);
        if let Some(info) = self.functions.get_mut(name) {
            info.sig = Some(sig.clone());
        }
        Some(sig)
    }

    fn resolve_signature(&mut self, params: Vec<(String, TypeExpr)>, mut ret: TypeExpr) -> FnSig {
        let params = params
            .into_iter()
            .map(|(name, mut texpr)| {
                let ty = self.resolve_type(&mut texpr);
                (name, ty)
            })
            .collect();
        let ret = self.resolve_type(&mut ret);
        FnSig { params, ret }
    }

    pub(crate) fn imported_function_sig(&mut self, module_index: usize, name: &str) -> Option<FnSig> {
        let registry = &self.session.registry;
        let module = registry.module(module_index);
        let function = module.function(name)?;
        Some(FnSig {
            params: function
                .params
                .iter()
                .map(|(param, texpr)| (param.lexeme.clone(), resolve_module_type(module, registry, texpr)))
                .collect(),
            ret: resolve_module_type(module, registry, &function.return_type),
        })
    }

    /// Registry index of an imported module with the given name, limited to
    /// the modules this one actually imports. Module names carry the file
    /// extension (`util.vela`), while scope accesses use the bare stem
    /// (`util::helper`), so both spellings match.
    pub(crate) fn find_imported_module(&self, name: &str) -> Option<usize> {
        self.imported.iter().copied().find(|&index| {
            let module_name = &self.session.registry.module(index).name;
            module_name == name
                || std::path::Path::new(module_name)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(|stem| stem == name)
                    .unwrap_or(false)
        })
    }

    fn find_imported_class(&self, name: &str) -> bool {
        self.imported
            .iter()
            .any(|&index| self.session.registry.module(index).classes.contains_key(name))
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    /// Resolve a parsed type annotation to a value-level type. Aliases expand
    /// eagerly; a direct self-reference is reported as cyclic.
    pub(crate) fn resolve_type(&mut self, texpr: &mut TypeExpr) -> Ty {
        let is_const = texpr.is_const;
        let is_ref = texpr.is_ref;

        let ty = match &mut texpr.kind {
            TypeExprKind::Primitive(primitive) => Ty::new(match primitive {
                Primitive::Bool => TyKind::Bool,
                Primitive::Int => TyKind::Int,
                Primitive::Float => TyKind::Float,
                Primitive::Str => TyKind::Str,
                Primitive::Null => TyKind::Null,
            }),
            TypeExprKind::Named(token) => {
                let name = token.lexeme.clone();
                let token = token.clone();
                if self.current_alias.as_deref() == Some(name.as_str()) {
                    self.error(format!("Cyclic type alias '{}'", name), &token);
                    Ty::error()
                } else if self.classes.contains_key(&name) {
                    Ty::new(TyKind::Class(name))
                } else if let Some(aliased) = self.aliases.get(&name) {
                    aliased.clone()
                } else if self.find_imported_class(&name) {
                    Ty::new(TyKind::Class(name))
                } else {
                    self.error(format!("Unknown type name '{}'", name), &token);
                    Ty::error()
                }
            }
            TypeExprKind::List { element, size } => {
                let element_ty = self.resolve_type(element);
                if let Some(size) = size {
                    let size_ty = self.check_expr(size);
                    if !size_ty.is_int() {
                        let at = size.resolved.token.clone();
                        self.error("List size must be an integer", &at);
                    }
                }
                Ty::new(TyKind::List(Box::new(element_ty)))
            }
            TypeExprKind::Tuple(types) => {
                let mut elements = Vec::with_capacity(types.len());
                for texpr in types.iter_mut() {
                    elements.push(self.resolve_type(texpr));
                }
                Ty::new(TyKind::Tuple(elements))
            }
            TypeExprKind::Typeof(expr) => {
                let ty = self.check_expr(expr);
                Ty::with_flags(ty.kind, ty.is_const, ty.is_ref)
            }
        };

        Ty::with_flags(ty.kind, ty.is_const || is_const, ty.is_ref || is_ref)
    }
}

/// How a value matches an expected type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compat {
    Exact,
    /// INT where FLOAT is expected; widening is recorded for the generator.
    Widen,
    Incompatible,
}

pub(crate) fn assign_compat(target: &Ty, value: &Ty) -> Compat {
    if target.is_error() || value.is_error() {
        Compat::Exact
    } else if target.is_float() && matches!(value.kind, TyKind::Int) {
        Compat::Widen
    } else if target.same_base(value) {
        Compat::Exact
    } else {
        Compat::Incompatible
    }
}

/// Equality (`==` `!=`, switch arms) requires the same primitive type or two
/// values of the same class.
pub(crate) fn equality_comparable(a: &Ty, b: &Ty) -> bool {
    match (&a.kind, &b.kind) {
        (TyKind::Error, _) | (_, TyKind::Error) => true,
        (TyKind::Bool, TyKind::Bool)
        | (TyKind::Int, TyKind::Int)
        | (TyKind::Float, TyKind::Float)
        | (TyKind::Str, TyKind::Str)
        | (TyKind::Null, TyKind::Null) => true,
        (TyKind::Class(x), TyKind::Class(y)) => x == y,
        _ => false,
    }
}

/// Resolve a type annotation against an already-checked module, without
/// reporting diagnostics. Used for signatures pulled out of imported modules,
/// which were validated when that module was checked.
fn resolve_module_type(module: &Module, registry: &ModuleRegistry, texpr: &TypeExpr) -> Ty {
    let ty = match &texpr.kind {
        TypeExprKind::Primitive(primitive) => Ty::new(match primitive {
            Primitive::Bool => TyKind::Bool,
            Primitive::Int => TyKind::Int,
            Primitive::Float => TyKind::Float,
            Primitive::Str => TyKind::Str,
            Primitive::Null => TyKind::Null,
        }),
        TypeExprKind::Named(token) => {
            let name = &token.lexeme;
            if module.classes.contains_key(name) {
                Ty::new(TyKind::Class(name.clone()))
            } else if let Some(alias) = module.statements.iter().find_map(|stmt| match stmt {
                Stmt::TypeAlias { name: alias_name, aliased } if alias_name.lexeme == *name => Some(aliased),
                _ => None,
            }) {
                resolve_module_type(module, registry, alias)
            } else if module
                .imported
                .iter()
                .any(|&index| registry.module(index).classes.contains_key(name))
            {
                Ty::new(TyKind::Class(name.clone()))
            } else {
                Ty::error()
            }
        }
        TypeExprKind::List { element, .. } => {
            Ty::new(TyKind::List(Box::new(resolve_module_type(module, registry, element))))
        }
        TypeExprKind::Tuple(types) => Ty::new(TyKind::Tuple(
            types.iter().map(|t| resolve_module_type(module, registry, t)).collect(),
        )),
        // A `typeof` in an exported signature cannot be re-evaluated outside
        // its module; the owning module already validated it.
        TypeExprKind::Typeof(_) => Ty::error(),
    };

    Ty::with_flags(ty.kind, ty.is_const || texpr.is_const, ty.is_ref || texpr.is_ref)
}

/// Build class info for a class pulled in from an imported module, resolving
/// member and method types against that module's own context.
fn class_info_from_module(decl: &ClassDecl, module: &Module, registry: &ModuleRegistry) -> ClassInfo {
    ClassInfo {
        ctor: decl.ctor,
        dtor: decl.dtor,
        members: decl
            .members
            .iter()
            .map(|(member, visibility)| MemberInfo {
                name: member.name.lexeme.clone(),
                visibility: *visibility,
                texpr: member.declared_type.clone(),
                ty: Some(
                    member
                        .declared_type
                        .as_ref()
                        .map(|texpr| resolve_module_type(module, registry, texpr))
                        .unwrap_or_else(Ty::error),
                ),
            })
            .collect(),
        methods: decl
            .methods
            .iter()
            .map(|(method, visibility)| MethodInfo {
                name: method.name.lexeme.clone(),
                visibility: *visibility,
                params: method
                    .params
                    .iter()
                    .map(|(name, texpr)| (name.lexeme.clone(), texpr.clone()))
                    .collect(),
                ret: method.return_type.clone(),
                sig: Some(FnSig {
                    params: method
                        .params
                        .iter()
                        .map(|(name, texpr)| (name.lexeme.clone(), resolve_module_type(module, registry, texpr)))
                        .collect(),
                    ret: resolve_module_type(module, registry, &method.return_type),
                }),
            })
            .collect(),
    }
}
