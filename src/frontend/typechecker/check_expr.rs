//! Expression type rules.
//!
//! [`TypeResolver::check_expr`] synthesizes a type for every expression,
//! fills its `resolved` record, and records INT→FLOAT widenings where the
//! context requires them.

use crate::frontend::ast::*;
use crate::frontend::lexer::tokens::{Token, TokenKind};

use super::{assign_compat, equality_comparable, Compat, Member, TypeResolver};

pub(crate) fn is_builtin(name: &str) -> bool {
    matches!(name, "print" | "println" | "size" | "int" | "float")
}

impl TypeResolver<'_> {
    pub(crate) fn check_expr(&mut self, expr: &mut Expr) -> Ty {
        let token = expr.resolved.token.clone();
        let mut func: Option<String> = None;
        let mut class: Option<String> = None;
        let mut module_idx: Option<usize> = None;

        let ty = match &mut expr.kind {
            ExprKind::Literal { value } => match value {
                LiteralValue::Int(_) => Ty::literal(TyKind::Int),
                LiteralValue::Float(_) => Ty::literal(TyKind::Float),
                LiteralValue::Str(_) => Ty::literal(TyKind::Str),
                LiteralValue::Bool(_) => Ty::literal(TyKind::Bool),
                LiteralValue::Null => Ty::literal(TyKind::Null),
            },

            ExprKind::Grouping { expr: inner } => self.check_expr(inner),

            ExprKind::Comma { exprs } => {
                let mut last = Ty::error();
                for expr in exprs.iter_mut() {
                    last = self.check_expr(expr);
                }
                last
            }

            ExprKind::Variable { name } => {
                let name = name.clone();
                self.check_variable(&name, &mut func, &mut class)
            }

            ExprKind::Assign {
                target,
                value,
                conversion,
                requires_copy,
            } => {
                let target_tok = target.clone();
                let value_ty = self.check_expr(value);

                let target_ty = match self.lookup_value(&target_tok.lexeme) {
                    Some(local) => local.ty.clone(),
                    None => {
                        self.error(format!("Undefined name '{}'", target_tok.lexeme), &target_tok);
                        Ty::error()
                    }
                };

                if target_ty.is_const {
                    self.error(
                        format!("Cannot assign to const variable '{}'", target_tok.lexeme),
                        &target_tok,
                    );
                }

                *conversion = self.check_assignment(&token, &target_ty, &value_ty, &target_tok);
                *requires_copy = value_ty.is_aggregate() && !value_ty.is_ref && !target_ty.is_ref;
                Ty::with_flags(target_ty.kind, false, target_ty.is_ref)
            }

            ExprKind::Binary { left, right } => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                self.check_binary(&token, left, &left_ty, right, &right_ty)
            }

            ExprKind::Logical { left, right } => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                if !left_ty.is_bool() || !right_ty.is_bool() {
                    self.error(
                        format!(
                            "Logical '{}' requires boolean operands, got '{}' and '{}'",
                            token.lexeme, left_ty, right_ty
                        ),
                        &token,
                    );
                }
                Ty::new(TyKind::Bool)
            }

            ExprKind::Unary { op, operand } => {
                let op = op.clone();
                let operand_ty = self.check_expr(operand);
                match op.kind {
                    TokenKind::Minus | TokenKind::Plus => {
                        if operand_ty.is_numeric() {
                            Ty::new(operand_ty.kind)
                        } else {
                            self.error(
                                format!("Unary '{}' requires a numeric operand, got '{}'", op.lexeme, operand_ty),
                                &op,
                            );
                            Ty::error()
                        }
                    }
                    TokenKind::Bang => {
                        if !operand_ty.is_bool() {
                            self.error(
                                format!("Operator '!' requires a boolean operand, got '{}'", operand_ty),
                                &op,
                            );
                        }
                        Ty::new(TyKind::Bool)
                    }
                    TokenKind::Tilde => {
                        if !operand_ty.is_int() {
                            self.error(
                                format!("Operator '~' requires an integer operand, got '{}'", operand_ty),
                                &op,
                            );
                        }
                        Ty::new(TyKind::Int)
                    }
                    TokenKind::PlusPlus | TokenKind::MinusMinus => {
                        if !operand.is_lvalue() {
                            self.error(format!("Operand of '{}' must be assignable", op.lexeme), &op);
                            Ty::error()
                        } else {
                            if operand_ty.is_const {
                                self.error(format!("Cannot apply '{}' to a const value", op.lexeme), &op);
                            }
                            if operand_ty.is_numeric() {
                                Ty::new(operand_ty.kind)
                            } else {
                                self.error(
                                    format!("Operand of '{}' must be numeric, got '{}'", op.lexeme, operand_ty),
                                    &op,
                                );
                                Ty::error()
                            }
                        }
                    }
                    _ => Ty::error(),
                }
            }

            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                let cond_ty = self.check_expr(condition);
                if !cond_ty.is_bool() {
                    let at = condition.resolved.token.clone();
                    self.error(format!("Ternary condition must be a boolean, got '{}'", cond_ty), &at);
                }

                let then_ty = self.check_expr(then_expr);
                let else_ty = self.check_expr(else_expr);

                if then_ty.is_float() && matches!(else_ty.kind, TyKind::Int) {
                    else_expr.resolved.conversion = NumericConversion::IntToFloat;
                    Ty::new(TyKind::Float)
                } else if else_ty.is_float() && matches!(then_ty.kind, TyKind::Int) {
                    then_expr.resolved.conversion = NumericConversion::IntToFloat;
                    Ty::new(TyKind::Float)
                } else if then_ty.same_base(&else_ty) {
                    Ty::with_flags(then_ty.kind, false, false)
                } else {
                    self.error(
                        format!(
                            "Ternary expression arms have mismatched types '{}' and '{}'",
                            then_ty, else_ty
                        ),
                        &token,
                    );
                    Ty::error()
                }
            }

            ExprKind::Index { object, index } => {
                let object_ty = self.check_expr(object);
                let index_ty = self.check_expr(index);
                if !index_ty.is_int() {
                    let at = index.resolved.token.clone();
                    self.error(format!("List index must be an integer, got '{}'", index_ty), &at);
                }
                match object_ty.kind.clone() {
                    TyKind::List(element) => {
                        // Element access preserves the container's qualifiers.
                        let mut ty = *element;
                        ty.is_const = ty.is_const || object_ty.is_const;
                        ty.is_ref = ty.is_ref || object_ty.is_ref;
                        ty
                    }
                    TyKind::Error => Ty::error(),
                    _ => {
                        self.error(format!("Type '{}' cannot be indexed", object_ty), &token);
                        Ty::error()
                    }
                }
            }

            ExprKind::ListAssign {
                object,
                index,
                value,
                conversion,
                requires_copy,
            } => {
                let object_ty = self.check_expr(object);
                let index_ty = self.check_expr(index);
                let value_ty = self.check_expr(value);
                if !index_ty.is_int() {
                    let at = index.resolved.token.clone();
                    self.error(format!("List index must be an integer, got '{}'", index_ty), &at);
                }
                match object_ty.kind.clone() {
                    TyKind::List(element) => {
                        let element = *element;
                        if object_ty.is_const || element.is_const {
                            self.error("Cannot assign to an element of a const list", &token);
                        }
                        *conversion = self.check_assignment(&token, &element, &value_ty, &token);
                        *requires_copy = value_ty.is_aggregate() && !value_ty.is_ref && !element.is_ref;
                        let is_ref = element.is_ref;
                        Ty::with_flags(element.kind, false, is_ref)
                    }
                    TyKind::Error => Ty::error(),
                    _ => {
                        self.error(format!("Type '{}' cannot be indexed", object_ty), &token);
                        Ty::error()
                    }
                }
            }

            ExprKind::Get { object, name } => {
                let object_ty = self.check_expr(object);
                let name_tok = name.clone();
                match object_ty.kind.clone() {
                    TyKind::Class(class_name) => match self.class_member(&class_name, &name_tok.lexeme) {
                        Some(Member::Field { ty: member_ty, visibility }) => {
                            self.check_visibility(&class_name, &name_tok.lexeme, visibility, &name_tok);
                            class = Some(class_name);
                            let mut ty = member_ty;
                            ty.is_const = ty.is_const || object_ty.is_const;
                            ty
                        }
                        Some(Member::Method { visibility }) => {
                            self.check_visibility(&class_name, &name_tok.lexeme, visibility, &name_tok);
                            class = Some(class_name);
                            func = Some(name_tok.lexeme.clone());
                            Ty::new(TyKind::Callable(name_tok.lexeme.clone()))
                        }
                        None => {
                            self.error(
                                format!("Class '{}' has no member '{}'", class_name, name_tok.lexeme),
                                &name_tok,
                            );
                            Ty::error()
                        }
                    },
                    TyKind::Tuple(elements) => {
                        if name_tok.kind == TokenKind::IntLit {
                            match name_tok.lexeme.parse::<usize>() {
                                Ok(index) if index < elements.len() => {
                                    let mut ty = elements[index].clone();
                                    ty.is_const = ty.is_const || object_ty.is_const;
                                    ty.is_ref = ty.is_ref || object_ty.is_ref;
                                    ty
                                }
                                _ => {
                                    self.error(
                                        format!("Tuple index '{}' is out of range", name_tok.lexeme),
                                        &name_tok,
                                    );
                                    Ty::error()
                                }
                            }
                        } else {
                            self.error("Tuple members are accessed with integer indices", &name_tok);
                            Ty::error()
                        }
                    }
                    TyKind::Error => Ty::error(),
                    _ => {
                        self.error(format!("Type '{}' has no members", object_ty), &name_tok);
                        Ty::error()
                    }
                }
            }

            ExprKind::Set {
                object,
                name,
                value,
                conversion,
                requires_copy,
            } => {
                let object_ty = self.check_expr(object);
                let value_ty = self.check_expr(value);
                let name_tok = name.clone();
                match object_ty.kind.clone() {
                    TyKind::Class(class_name) => match self.class_member(&class_name, &name_tok.lexeme) {
                        Some(Member::Field { ty: member_ty, visibility }) => {
                            self.check_visibility(&class_name, &name_tok.lexeme, visibility, &name_tok);
                            class = Some(class_name);
                            if object_ty.is_const {
                                self.error("Cannot assign to a member of a const value", &name_tok);
                            } else if member_ty.is_const {
                                self.error(
                                    format!("Cannot assign to const member '{}'", name_tok.lexeme),
                                    &name_tok,
                                );
                            }
                            *conversion = self.check_assignment(&token, &member_ty, &value_ty, &name_tok);
                            *requires_copy = value_ty.is_aggregate() && !value_ty.is_ref && !member_ty.is_ref;
                            Ty::with_flags(member_ty.kind, false, member_ty.is_ref)
                        }
                        Some(Member::Method { .. }) => {
                            self.error(format!("Cannot assign to method '{}'", name_tok.lexeme), &name_tok);
                            Ty::error()
                        }
                        None => {
                            self.error(
                                format!("Class '{}' has no member '{}'", class_name, name_tok.lexeme),
                                &name_tok,
                            );
                            Ty::error()
                        }
                    },
                    TyKind::Tuple(_) => {
                        self.error("Cannot assign to a tuple member", &name_tok);
                        Ty::error()
                    }
                    TyKind::Error => Ty::error(),
                    _ => {
                        self.error(format!("Type '{}' has no members", object_ty), &name_tok);
                        Ty::error()
                    }
                }
            }

            ExprKind::Call {
                callee,
                args,
                is_native,
            } => {
                // Builtins resolve first, unless the name is bound to
                // something in the program.
                let builtin = if let ExprKind::Variable { name } = &callee.kind {
                    let name = name.lexeme.clone();
                    if is_builtin(&name)
                        && self.lookup_value(&name).is_none()
                        && !self.functions.contains_key(&name)
                        && !self.classes.contains_key(&name)
                    {
                        Some(name)
                    } else {
                        None
                    }
                } else {
                    None
                };

                if let Some(name) = builtin {
                    *is_native = true;
                    callee.resolved.ty = Some(Ty::new(TyKind::Callable(name.clone())));
                    callee.resolved.func = Some(name.clone());
                    func = Some(name.clone());
                    self.check_native_call(&name, args, &token)
                } else {
                    let callee_ty = self.check_expr(callee);

                    if let Some(fn_name) = callee.resolved.func.clone() {
                        let sig = if let Some(index) = callee.resolved.module {
                            module_idx = Some(index);
                            self.imported_function_sig(index, &fn_name)
                        } else if let Some(class_name) = callee.resolved.class.clone() {
                            class = Some(class_name.clone());
                            self.method_sig(&class_name, &fn_name)
                        } else {
                            self.function_sig(&fn_name)
                        };
                        func = Some(fn_name.clone());

                        match sig {
                            Some(sig) => {
                                self.check_args(&fn_name, &sig, args, &token);
                                sig.ret
                            }
                            None => {
                                for arg in args.iter_mut() {
                                    self.check_expr(&mut arg.expr);
                                }
                                Ty::error()
                            }
                        }
                    } else if let Some(class_name) = callee.resolved.class.clone() {
                        // Construction
                        class = Some(class_name.clone());
                        match self.ctor_sig(&class_name) {
                            Some(sig) => {
                                self.check_args(&class_name, &sig, args, &token);
                            }
                            None => {
                                for arg in args.iter_mut() {
                                    self.check_expr(&mut arg.expr);
                                }
                                if !args.is_empty() {
                                    self.error(
                                        format!(
                                            "Class '{}' has no constructor but was called with {} argument(s)",
                                            class_name,
                                            args.len()
                                        ),
                                        &token,
                                    );
                                }
                            }
                        }
                        Ty::new(TyKind::Class(class_name))
                    } else {
                        for arg in args.iter_mut() {
                            self.check_expr(&mut arg.expr);
                        }
                        if !callee_ty.is_error() {
                            self.error("Can only call functions and classes", &token);
                        }
                        Ty::error()
                    }
                }
            }

            ExprKind::List { elements } => {
                if elements.is_empty() {
                    Ty::new(TyKind::List(Box::new(Ty::error())))
                } else {
                    let mut tys = Vec::with_capacity(elements.len());
                    for element in elements.iter_mut() {
                        tys.push(self.check_expr(&mut element.expr));
                    }

                    let any_float = tys.iter().any(|ty| ty.is_float());
                    let all_numeric = tys.iter().all(|ty| ty.is_numeric());

                    let element_ty = if any_float && all_numeric {
                        for (element, ty) in elements.iter_mut().zip(&tys) {
                            if matches!(ty.kind, TyKind::Int) {
                                element.conversion = NumericConversion::IntToFloat;
                            }
                        }
                        Ty::new(TyKind::Float)
                    } else {
                        let first = tys[0].clone();
                        for (i, ty) in tys.iter().enumerate().skip(1) {
                            if !first.same_base(ty) {
                                let at = elements[i].expr.resolved.token.clone();
                                self.error(
                                    format!(
                                        "List elements must all have the same type; expected '{}', found '{}'",
                                        first, ty
                                    ),
                                    &at,
                                );
                                break;
                            }
                        }
                        Ty::with_flags(first.kind, false, false)
                    };

                    for (element, ty) in elements.iter_mut().zip(&tys) {
                        element.requires_copy = ty.is_aggregate() && !ty.is_ref;
                    }
                    Ty::new(TyKind::List(Box::new(element_ty)))
                }
            }

            ExprKind::Tuple { elements } => {
                let mut tys = Vec::with_capacity(elements.len());
                for element in elements.iter_mut() {
                    let ty = self.check_expr(&mut element.expr);
                    element.requires_copy = ty.is_aggregate() && !ty.is_ref;
                    tys.push(Ty::with_flags(ty.kind, false, false));
                }
                Ty::new(TyKind::Tuple(tys))
            }

            ExprKind::ScopeName { name } => {
                let name_tok = name.clone();
                if let Some(index) = self.find_imported_module(&name_tok.lexeme) {
                    module_idx = Some(index);
                    Ty::error()
                } else if self.ensure_class_info(&name_tok.lexeme) {
                    class = Some(name_tok.lexeme.clone());
                    Ty::new(TyKind::Callable(name_tok.lexeme.clone()))
                } else {
                    self.error(
                        format!("Unknown module or scope name '{}'", name_tok.lexeme),
                        &name_tok,
                    );
                    Ty::error()
                }
            }

            ExprKind::ScopeAccess { scope, name } => {
                self.check_expr(scope);
                let name_tok = name.clone();

                if let Some(index) = scope.resolved.module {
                    module_idx = Some(index);
                    let (has_function, has_class, module_name) = {
                        let module = self.session.registry.module(index);
                        (
                            module.functions.contains_key(&name_tok.lexeme),
                            module.classes.contains_key(&name_tok.lexeme),
                            module.name.clone(),
                        )
                    };

                    if has_function {
                        func = Some(name_tok.lexeme.clone());
                        Ty::new(TyKind::Callable(name_tok.lexeme.clone()))
                    } else if has_class {
                        class = Some(name_tok.lexeme.clone());
                        Ty::new(TyKind::Callable(name_tok.lexeme.clone()))
                    } else {
                        self.error(
                            format!(
                                "Module '{}' has no top-level function or class named '{}'",
                                module_name, name_tok.lexeme
                            ),
                            &name_tok,
                        );
                        Ty::error()
                    }
                } else if let Some(scope_class) = scope.resolved.class.clone() {
                    self.error(format!("Class '{}' has no scoped members", scope_class), &name_tok);
                    Ty::error()
                } else {
                    // The scope itself failed to resolve; already reported.
                    Ty::error()
                }
            }

            ExprKind::This { .. } => match self.current_class.clone() {
                Some(class_name) => {
                    class = Some(class_name.clone());
                    Ty::with_flags(
                        TyKind::Class(class_name),
                        !(self.in_ctor || self.in_dtor),
                        true,
                    )
                }
                None => Ty::error(),
            },

            ExprKind::Super { keyword, .. } => {
                let at = keyword.clone();
                let class_name = self.current_class.clone().unwrap_or_default();
                self.error(
                    format!("Cannot use 'super': class '{}' has no superclass", class_name),
                    &at,
                );
                self.note("Classes do not support inheritance");
                Ty::error()
            }
        };

        expr.resolved.ty = Some(ty.clone());
        if func.is_some() {
            expr.resolved.func = func;
        }
        if class.is_some() {
            expr.resolved.class = class;
        }
        if module_idx.is_some() {
            expr.resolved.module = module_idx;
        }
        ty
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn check_variable(&mut self, name: &Token, func: &mut Option<String>, class: &mut Option<String>) -> Ty {
        if let Some(local) = self.lookup_value(&name.lexeme) {
            let ty = local.ty.clone();
            let local_class = local.class.clone();
            if let TyKind::Callable(method) = &ty.kind {
                *func = Some(method.clone());
                if local_class.is_some() {
                    *class = local_class;
                }
            }
            ty
        } else if self.functions.contains_key(&name.lexeme) {
            *func = Some(name.lexeme.clone());
            Ty::new(TyKind::Callable(name.lexeme.clone()))
        } else if self.ensure_class_info(&name.lexeme) {
            *class = Some(name.lexeme.clone());
            Ty::new(TyKind::Callable(name.lexeme.clone()))
        } else {
            self.error(format!("Undefined name '{}'", name.lexeme), name);
            Ty::error()
        }
    }

    /// Validate the right-hand side of an assignment-like position against
    /// the target type, returning the widening to record.
    pub(crate) fn check_assignment(&mut self, op: &Token, target: &Ty, value: &Ty, at: &Token) -> NumericConversion {
        use TokenKind::*;
        match op.kind {
            PlusEq | MinusEq | StarEq | SlashEq => {
                if op.kind == PlusEq && matches!(target.kind, TyKind::Str) && matches!(value.kind, TyKind::Str) {
                    return NumericConversion::None;
                }
                if !target.is_numeric() || !value.is_numeric() {
                    self.error(
                        format!(
                            "Operator '{}' requires numeric operands, got '{}' and '{}'",
                            op.lexeme, target, value
                        ),
                        at,
                    );
                    return NumericConversion::None;
                }
                if target.is_float() && matches!(value.kind, TyKind::Int) {
                    NumericConversion::IntToFloat
                } else if matches!(target.kind, TyKind::Int) && value.is_float() {
                    self.error(
                        format!("Cannot apply '{}' with a float value to an integer", op.lexeme),
                        at,
                    );
                    NumericConversion::None
                } else {
                    NumericConversion::None
                }
            }
            _ => match assign_compat(target, value) {
                Compat::Exact => NumericConversion::None,
                Compat::Widen => NumericConversion::IntToFloat,
                Compat::Incompatible => {
                    self.error(format!("Type mismatch: expected '{}', found '{}'", target, value), at);
                    NumericConversion::None
                }
            },
        }
    }

    fn check_binary(&mut self, op: &Token, left: &mut Expr, left_ty: &Ty, right: &mut Expr, right_ty: &Ty) -> Ty {
        use TokenKind::*;
        match op.kind {
            Plus | Minus | Star | Slash | Percent => {
                if op.kind == Plus && matches!(left_ty.kind, TyKind::Str) && matches!(right_ty.kind, TyKind::Str) {
                    return Ty::new(TyKind::Str);
                }
                if left_ty.is_numeric() && right_ty.is_numeric() {
                    if left_ty.is_float() || right_ty.is_float() {
                        self.record_widening(left, left_ty);
                        self.record_widening(right, right_ty);
                        Ty::new(TyKind::Float)
                    } else if left_ty.is_error() || right_ty.is_error() {
                        Ty::error()
                    } else {
                        Ty::new(TyKind::Int)
                    }
                } else {
                    self.error(
                        format!(
                            "Operator '{}' requires numeric operands, got '{}' and '{}'",
                            op.lexeme, left_ty, right_ty
                        ),
                        op,
                    );
                    Ty::error()
                }
            }
            Lt | LtEq | Gt | GtEq => {
                if left_ty.is_numeric() && right_ty.is_numeric() {
                    if left_ty.is_float() || right_ty.is_float() {
                        self.record_widening(left, left_ty);
                        self.record_widening(right, right_ty);
                    }
                } else {
                    self.error(
                        format!(
                            "Comparison '{}' requires numeric operands, got '{}' and '{}'",
                            op.lexeme, left_ty, right_ty
                        ),
                        op,
                    );
                }
                Ty::new(TyKind::Bool)
            }
            EqEq | NotEq => {
                if !equality_comparable(left_ty, right_ty) {
                    self.error(
                        format!("Cannot compare values of type '{}' and '{}'", left_ty, right_ty),
                        op,
                    );
                }
                Ty::new(TyKind::Bool)
            }
            Amp | Pipe | Caret | Shl | Shr => {
                if !(left_ty.is_int() && right_ty.is_int()) {
                    self.error(
                        format!(
                            "Operator '{}' requires integer operands, got '{}' and '{}'",
                            op.lexeme, left_ty, right_ty
                        ),
                        op,
                    );
                }
                Ty::new(TyKind::Int)
            }
            DotDot | DotDotEq => {
                if !(left_ty.is_int() && right_ty.is_int()) {
                    self.error(
                        format!("Range bounds must be integers, got '{}' and '{}'", left_ty, right_ty),
                        op,
                    );
                }
                Ty::new(TyKind::Range {
                    inclusive: op.kind == DotDotEq,
                })
            }
            _ => Ty::error(),
        }
    }

    fn record_widening(&mut self, operand: &mut Expr, ty: &Ty) {
        if matches!(ty.kind, TyKind::Int) {
            operand.resolved.conversion = NumericConversion::IntToFloat;
        }
    }

    pub(crate) fn check_visibility(&mut self, class_name: &str, member: &str, visibility: Visibility, at: &Token) {
        if visibility == Visibility::Public {
            return;
        }
        if self.current_class.as_deref() == Some(class_name) {
            return;
        }
        let kind = if visibility == Visibility::Private {
            "private"
        } else {
            "protected"
        };
        self.error(
            format!("Cannot access {} member '{}' outside class '{}'", kind, member, class_name),
            at,
        );
    }

    fn check_args(&mut self, name: &str, sig: &super::FnSig, args: &mut [Element], at: &Token) {
        if sig.params.len() != args.len() {
            self.error(
                format!(
                    "'{}' expects {} argument(s) but got {}",
                    name,
                    sig.params.len(),
                    args.len()
                ),
                at,
            );
        }

        for (i, arg) in args.iter_mut().enumerate() {
            let arg_ty = self.check_expr(&mut arg.expr);
            let Some((param_name, param_ty)) = sig.params.get(i) else {
                continue;
            };
            match assign_compat(param_ty, &arg_ty) {
                Compat::Exact => {}
                Compat::Widen => arg.conversion = NumericConversion::IntToFloat,
                Compat::Incompatible => {
                    let arg_at = arg.expr.resolved.token.clone();
                    self.error(
                        format!(
                            "Argument '{}' of '{}' expects type '{}', found '{}'",
                            param_name, name, param_ty, arg_ty
                        ),
                        &arg_at,
                    );
                }
            }
            arg.requires_copy = arg_ty.is_aggregate() && !arg_ty.is_ref && !param_ty.is_ref;
        }
    }

    fn check_native_call(&mut self, name: &str, args: &mut [Element], at: &Token) -> Ty {
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            arg_tys.push(self.check_expr(&mut arg.expr));
        }

        match name {
            "print" | "println" => {
                if arg_tys.len() != 1 {
                    self.error(format!("'{}' expects 1 argument but got {}", name, arg_tys.len()), at);
                } else if !matches!(
                    arg_tys[0].kind,
                    TyKind::Bool | TyKind::Int | TyKind::Float | TyKind::Str | TyKind::Null | TyKind::Error
                ) {
                    self.error(
                        format!("'{}' expects a primitive value, found '{}'", name, arg_tys[0]),
                        at,
                    );
                }
                Ty::new(TyKind::Null)
            }
            "size" => {
                if arg_tys.len() != 1 {
                    self.error(format!("'size' expects 1 argument but got {}", arg_tys.len()), at);
                } else if !matches!(arg_tys[0].kind, TyKind::List(_) | TyKind::Error) {
                    self.error(format!("'size' expects a list, found '{}'", arg_tys[0]), at);
                }
                Ty::new(TyKind::Int)
            }
            "int" => {
                if arg_tys.len() != 1 {
                    self.error(format!("'int' expects 1 argument but got {}", arg_tys.len()), at);
                } else if !arg_tys[0].is_numeric() {
                    self.error(format!("'int' expects a numeric value, found '{}'", arg_tys[0]), at);
                } else if arg_tys[0].is_float() {
                    args[0].conversion = NumericConversion::FloatToInt;
                }
                Ty::new(TyKind::Int)
            }
            "float" => {
                if arg_tys.len() != 1 {
                    self.error(format!("'float' expects 1 argument but got {}", arg_tys.len()), at);
                } else if !arg_tys[0].is_numeric() {
                    self.error(format!("'float' expects a numeric value, found '{}'", arg_tys[0]), at);
                } else if matches!(arg_tys[0].kind, TyKind::Int) {
                    args[0].conversion = NumericConversion::IntToFloat;
                }
                Ty::new(TyKind::Float)
            }
            _ => Ty::error(),
        }
    }
}
