//! Statement and declaration rules.
//!
//! Conditions must be booleans, switch arms must be comparable with the
//! discriminant, returns must match the declared return type, and class
//! bodies are checked with their members and methods in scope.

use crate::frontend::ast::*;
use crate::frontend::lexer::tokens::TokenKind;

use super::{equality_comparable, Member, TypeResolver};

impl TypeResolver<'_> {
    pub(crate) fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for statement in statements.iter_mut() {
                    self.check_stmt(statement);
                }
                self.end_scope();
            }

            Stmt::Break(_) | Stmt::Continue(_) => {}

            Stmt::Expression(expr) => {
                self.check_expr(expr);
            }

            Stmt::Var(decl) => self.check_var_decl(decl, true),

            Stmt::TypeAlias { name, aliased } => {
                let name_tok = name.clone();
                if self.aliases.contains_key(&name_tok.lexeme) || self.classes.contains_key(&name_tok.lexeme) {
                    self.error(
                        format!("Type name '{}' is already defined", name_tok.lexeme),
                        &name_tok,
                    );
                    return;
                }
                self.current_alias = Some(name_tok.lexeme.clone());
                let ty = self.resolve_type(aliased);
                self.current_alias = None;
                self.aliases.insert(name_tok.lexeme, ty);
            }

            Stmt::Function(function) => self.check_function(function),

            Stmt::Class(class) => self.check_class(class),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let cond_ty = self.check_expr(condition);
                if !cond_ty.is_bool() {
                    let at = condition.resolved.token.clone();
                    self.error(format!("'if' condition must be a boolean, got '{}'", cond_ty), &at);
                }
                self.check_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
            }

            Stmt::While { condition, body, .. } => {
                if let Some(condition) = condition {
                    let cond_ty = self.check_expr(condition);
                    if !cond_ty.is_bool() {
                        let at = condition.resolved.token.clone();
                        self.error(format!("Loop condition must be a boolean, got '{}'", cond_ty), &at);
                    }
                }
                let saved_in_loop = std::mem::replace(&mut self.in_loop, true);
                self.check_stmt(body);
                self.in_loop = saved_in_loop;
            }

            Stmt::Return {
                keyword,
                value,
                locals_popped,
                function,
            } => {
                let keyword = keyword.clone();
                *function = self.current_function.clone();
                *locals_popped = self.values.len().saturating_sub(self.function_base);

                let ret = self.current_return.clone().unwrap_or_else(Ty::error);
                match value {
                    Some(expr) => {
                        let value_ty = self.check_expr(expr);
                        if ret.is_null() {
                            if !value_ty.is_null() && !value_ty.is_error() {
                                self.error(
                                    "Cannot return a value from a function declared to return 'null'",
                                    &keyword,
                                );
                            }
                        } else if ret.is_float() && matches!(value_ty.kind, TyKind::Int) {
                            expr.resolved.conversion = NumericConversion::IntToFloat;
                        } else if !ret.same_base(&value_ty) {
                            self.error(
                                format!(
                                    "Return value type '{}' does not match declared return type '{}'",
                                    value_ty, ret
                                ),
                                &keyword,
                            );
                        }
                    }
                    None => {
                        if !ret.is_null() && !ret.is_error() {
                            self.error(format!("Expected a return value of type '{}'", ret), &keyword);
                        }
                    }
                }
            }

            Stmt::Switch {
                condition,
                cases,
                default_case,
            } => {
                let cond_ty = self.check_expr(condition);

                let saved_in_switch = std::mem::replace(&mut self.in_switch, true);
                for (arm, body) in cases.iter_mut() {
                    let arm_ty = self.check_expr(arm);
                    if !equality_comparable(&cond_ty, &arm_ty) {
                        let at = arm.resolved.token.clone();
                        self.error(
                            format!(
                                "Switch case type '{}' does not match the switch expression type '{}'",
                                arm_ty, cond_ty
                            ),
                            &at,
                        );
                    }
                    self.check_stmt(body);
                }
                if let Some(default_case) = default_case {
                    self.check_stmt(default_case);
                }
                self.in_switch = saved_in_switch;
            }
        }
    }

    /// Check a variable declaration and, when `declare` is set, bring the
    /// name into scope. Member initializers reuse this with `declare` off
    /// since members enter scope with their class.
    pub(crate) fn check_var_decl(&mut self, decl: &mut VarDecl, declare: bool) {
        let init_ty = decl.initializer.as_mut().map(|expr| self.check_expr(expr));
        let declared_ty = match &mut decl.declared_type {
            Some(texpr) => Some(self.resolve_type(texpr)),
            None => None,
        };

        if decl.declared_type.is_none() {
            if let Some(ExprKind::List { elements }) = decl.initializer.as_ref().map(|e| &e.kind) {
                if elements.is_empty() {
                    self.error("Cannot infer the element type of an empty list", &decl.name.clone());
                }
            }
        }

        let mut ty = match (declared_ty, init_ty.clone()) {
            (Some(declared), Some(init)) => {
                let op = decl.keyword.clone();
                let at = decl.name.clone();
                // The keyword stands in for '=' here; plain-assignment rules.
                let mut eq = op;
                eq.kind = TokenKind::Eq;
                decl.conversion = self.check_assignment(&eq, &declared, &init, &at);
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => init,
            (None, None) => {
                let at = decl.name.clone();
                self.error("Variable declaration requires a type or an initializer", &at);
                Ty::error()
            }
        };

        match decl.keyword.kind {
            TokenKind::Const => {
                ty.is_const = true;
            }
            TokenKind::Ref => {
                ty.is_ref = true;
                match &decl.initializer {
                    Some(init) if !init.is_lvalue() => {
                        let at = decl.name.clone();
                        self.error("Cannot bind a reference to a temporary value", &at);
                    }
                    None => {
                        let at = decl.name.clone();
                        self.error("A 'ref' variable requires an initializer", &at);
                    }
                    _ => {}
                }
            }
            _ => {
                // A plain `var` binding is mutable even when initialized from
                // a constant.
                ty.is_const = false;
            }
        }

        decl.requires_copy = decl.keyword.kind != TokenKind::Ref
            && init_ty.map(|t| t.is_aggregate() && !t.is_ref).unwrap_or(false);

        if declare {
            self.declare_value(decl.name.lexeme.clone(), ty, None);
        }
    }

    fn check_function(&mut self, function: &mut FunctionDecl) {
        let ret = self.resolve_type(&mut function.return_type);

        self.begin_scope();
        let saved_function = self.current_function.replace(function.name.lexeme.clone());
        let saved_return = self.current_return.replace(ret);
        let saved_base = self.function_base;

        for (name, texpr) in function.params.iter_mut() {
            let ty = self.resolve_type(texpr);
            self.declare_value(name.lexeme.clone(), ty, None);
        }
        self.function_base = self.values.len();

        for stmt in function.body.iter_mut() {
            self.check_stmt(stmt);
        }

        self.end_scope();
        self.current_function = saved_function;
        self.current_return = saved_return;
        self.function_base = saved_base;
    }

    fn check_class(&mut self, class: &mut ClassDecl) {
        let class_name = class.name.lexeme.clone();
        let saved_class = self.current_class.replace(class_name.clone());
        self.begin_scope();

        // Members and methods are visible by bare name inside the class.
        for (member, _) in &class.members {
            let member_name = member.name.lexeme.clone();
            let ty = match self.class_member(&class_name, &member_name) {
                Some(Member::Field { ty, .. }) => ty,
                _ => Ty::error(),
            };
            self.declare_value(member_name, ty, Some(class_name.clone()));
        }
        for (method, _) in &class.methods {
            let method_name = method.name.lexeme.clone();
            self.declare_value(
                method_name.clone(),
                Ty::new(TyKind::Callable(method_name)),
                Some(class_name.clone()),
            );
        }

        for (member, _) in class.members.iter_mut() {
            self.check_var_decl(member, false);
        }

        for (index, (method, _)) in class.methods.iter_mut().enumerate() {
            let saved_ctor = self.in_ctor;
            let saved_dtor = self.in_dtor;
            self.in_ctor = class.ctor == Some(index);
            self.in_dtor = class.dtor == Some(index);
            self.check_function(method);
            self.in_ctor = saved_ctor;
            self.in_dtor = saved_dtor;
        }

        self.end_scope();
        self.current_class = saved_class;
    }
}
