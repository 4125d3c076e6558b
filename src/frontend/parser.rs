//! Parser for the Vela programming language
//!
//! A Pratt (precedence-climbing) recursive-descent parser. Expression
//! dispatch is a `match` over the current token kind rather than a table of
//! function pointers; every token has an optional prefix handler, an optional
//! infix handler, and an infix precedence.
//!
//! The parser also drives import resolution: an `import "path"` statement
//! either resolves against the module registry or recursively compiles the
//! imported file through the full front-end pipeline.
//!
//! Error recovery is `Result`-driven: a syntax error reports to the
//! [`Reporter`](crate::frontend::diagnostics::Reporter), unwinds to the
//! enclosing declaration via [`ParseInterrupt`], and [`synchronize`]
//! discards tokens until a statement boundary. The failed declaration is
//! dropped and parsing resumes.

use crate::frontend::ast::*;
use crate::frontend::lexer::tokens::{Token, TokenKind};
use crate::frontend::module::{self, Module, Session};

/// Marker for an already-reported syntax error unwinding to the enclosing
/// declaration.
#[derive(Debug, Clone, Copy)]
pub struct ParseInterrupt;

type PResult<T> = Result<T, ParseInterrupt>;

const ASSIGN_OPS: &[TokenKind] = &[
    TokenKind::Eq,
    TokenKind::PlusEq,
    TokenKind::MinusEq,
    TokenKind::StarEq,
    TokenKind::SlashEq,
];

/// Expression precedence, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Comma,      // ,
    Assignment, // = += -= *= /=
    Ternary,    // ?:
    LogicOr,    // or
    LogicAnd,   // and
    BitOr,      // |
    BitXor,     // ^
    BitAnd,     // &
    Equality,   // == !=
    Ordering,   // > >= < <=
    Shift,      // << >>
    Range,      // .. ..=
    Sum,        // + -
    Product,    // * / %
    Unary,      // ! ~ ++ --
    Call,       // . () []
    Primary,
}

impl Precedence {
    /// The next-tighter level; used to make binary operators left-associate.
    fn one_higher(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Comma,
            Comma => Assignment,
            Assignment => Ternary,
            Ternary => LogicOr,
            LogicOr => LogicAnd,
            LogicAnd => BitOr,
            BitOr => BitXor,
            BitXor => BitAnd,
            BitAnd => Equality,
            Equality => Ordering,
            Ordering => Shift,
            Shift => Range,
            Range => Sum,
            Sum => Product,
            Product => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

/// Infix precedence for a token kind. Tokens that cannot continue an
/// expression sit at [`Precedence::None`], which never satisfies the loop in
/// [`Parser::parse_precedence`]. `!`, `~`, `++` and `--` carry a precedence
/// but no infix handler so that their appearance in infix position produces a
/// targeted diagnostic.
fn infix_precedence(kind: TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        Comma => Precedence::Comma,
        Question => Precedence::Ternary,
        Or => Precedence::LogicOr,
        And => Precedence::LogicAnd,
        Pipe => Precedence::BitOr,
        Caret => Precedence::BitXor,
        Amp => Precedence::BitAnd,
        EqEq | NotEq => Precedence::Equality,
        Lt | LtEq | Gt | GtEq => Precedence::Ordering,
        Shl | Shr => Precedence::Shift,
        DotDot | DotDotEq => Precedence::Range,
        Plus | Minus => Precedence::Sum,
        Star | Slash | Percent => Precedence::Product,
        Bang | Tilde | PlusPlus | MinusMinus => Precedence::Unary,
        Dot | LParen | LBracket => Precedence::Call,
        ColonColon => Precedence::Primary,
        _ => Precedence::None,
    }
}

/// Parser state
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    module: &'a mut Module,
    session: &'a mut Session,
    /// Import distance of the module being parsed.
    depth: usize,
    scope_depth: usize,
    in_class: bool,
    in_function: bool,
    in_loop: bool,
    in_switch: bool,
}

/// Parse a token stream into `module`, populating its statement list, class
/// and function tables, and imported-module indices. Imports may extend the
/// registry inside `session`.
#[tracing::instrument(skip_all, fields(module = %module.name, token_count = tokens.len(), depth))]
pub fn parse(tokens: &[Token], module: &mut Module, depth: usize, session: &mut Session) {
    Parser {
        tokens,
        pos: 0,
        module,
        session,
        depth,
        scope_depth: 0,
        in_class: false,
        in_function: false,
        in_loop: false,
        in_switch: false,
    }
    .program();
}

impl<'a> Parser<'a> {
    // ========================================================================
    // Cursor helpers
    // ========================================================================

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[(self.pos - 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> PResult<()> {
        if self.pos >= self.tokens.len() {
            let prev = self.previous().clone();
            return Err(self.error_at("Found unexpected EOF while parsing", &prev));
        }
        self.pos += 1;
        Ok(())
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) && self.pos < self.tokens.len() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|&k| self.check(k)) && self.pos < self.tokens.len() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.error_at_peek(message))
        }
    }

    fn consume_any(&mut self, kinds: &[TokenKind], message: &str) -> PResult<()> {
        if self.match_any(kinds) {
            Ok(())
        } else {
            Err(self.error_at_peek(message))
        }
    }

    /// Statements end at `;` or at a synthesized end-of-line token.
    fn consume_terminator(&mut self, message: &str) -> PResult<()> {
        self.consume_any(&[TokenKind::Semicolon, TokenKind::EndOfLine], message)
    }

    fn skip_end_of_lines(&mut self) {
        while self.match_token(TokenKind::EndOfLine) {}
    }

    fn error_at(&mut self, message: impl Into<String>, token: &Token) -> ParseInterrupt {
        self.session.reporter.error(message, token);
        ParseInterrupt
    }

    fn error_at_peek(&mut self, message: impl Into<String>) -> ParseInterrupt {
        let token = self.peek().clone();
        self.error_at(message, &token)
    }

    /// Discard tokens until a plausible statement boundary so parsing can
    /// resume after a syntax error.
    fn synchronize(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }

        while !self.is_at_end() {
            if matches!(
                self.previous().kind,
                TokenKind::Semicolon | TokenKind::EndOfLine | TokenKind::RBrace
            ) {
                return;
            }

            match self.peek().kind {
                TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Class
                | TokenKind::Fn
                | TokenKind::For
                | TokenKind::If
                | TokenKind::Import
                | TokenKind::Private
                | TokenKind::Protected
                | TokenKind::Public
                | TokenKind::Return
                | TokenKind::Type
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::While => return,
                _ => {}
            }

            self.pos += 1;
        }
    }

    // ========================================================================
    // Program and declarations
    // ========================================================================

    fn program(&mut self) {
        while !self.check(TokenKind::Eof) && !self.check(TokenKind::EndOfLine) {
            if let Some(stmt) = self.declaration() {
                self.register_top_level(&stmt);
                self.module.statements.push(stmt);
            }
        }

        self.match_token(TokenKind::EndOfLine);

        if !self.check(TokenKind::Eof) {
            let token = self.peek().clone();
            self.session.reporter.error("Expected EOF at the end of file", &token);
        }
    }

    /// Record top-level classes and functions in the module tables. The index
    /// refers into `module.statements`, where the declaration is about to be
    /// pushed.
    fn register_top_level(&mut self, stmt: &Stmt) {
        let index = self.module.statements.len();
        match stmt {
            Stmt::Class(class) => {
                self.module.classes.insert(class.name.lexeme.clone(), index);
            }
            Stmt::Function(function) if self.scope_depth == 0 => {
                self.module.functions.insert(function.name.lexeme.clone(), index);
            }
            _ => {}
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_token(TokenKind::Class) {
            self.class_declaration().map(Some)
        } else if self.match_token(TokenKind::Fn) {
            self.function_declaration(&[]).map(|f| Some(Stmt::Function(f)))
        } else if self.match_token(TokenKind::Import) {
            self.import_statement()
        } else if self.match_token(TokenKind::Type) {
            self.type_declaration().map(Some)
        } else if self.match_any(&[TokenKind::Var, TokenKind::Const, TokenKind::Ref]) {
            self.variable_declaration().map(|v| Some(Stmt::Var(v)))
        } else {
            self.statement().map(Some)
        };

        match result {
            Ok(stmt) => stmt,
            Err(ParseInterrupt) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::Ident, "Expected class name after 'class' keyword")?;
        let name = self.previous().clone();

        if self.module.classes.contains_key(&name.lexeme) {
            return Err(self.error_at("Class already defined", &name));
        }

        self.consume(TokenKind::LBrace, "Expected '{' after class name")?;

        let saved_in_class = std::mem::replace(&mut self.in_class, true);
        let body = self.class_body(&name);
        self.in_class = saved_in_class;
        let (ctor, dtor, members, methods) = body?;

        Ok(Stmt::Class(ClassDecl {
            name,
            superclass: None,
            ctor,
            dtor,
            members,
            methods,
        }))
    }

    #[allow(clippy::type_complexity)]
    fn class_body(
        &mut self,
        class_name: &Token,
    ) -> PResult<(
        Option<usize>,
        Option<usize>,
        Vec<(VarDecl, Visibility)>,
        Vec<(FunctionDecl, Visibility)>,
    )> {
        let mut ctor = None;
        let mut dtor = None;
        let mut members: Vec<(VarDecl, Visibility)> = Vec::new();
        let mut methods: Vec<(FunctionDecl, Visibility)> = Vec::new();
        // Regular method names, for duplicate detection; constructor and
        // destructor entries are excluded so their duplication gets the
        // dedicated diagnostic below.
        let mut method_names: Vec<String> = Vec::new();

        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            self.consume_any(
                &[TokenKind::Private, TokenKind::Public, TokenKind::Protected],
                "Expected 'public', 'private' or 'protected' modifier before member declaration",
            )?;

            let visibility = match self.previous().kind {
                TokenKind::Public => Visibility::Public,
                TokenKind::Private => Visibility::Private,
                _ => Visibility::Protected,
            };

            if self.match_any(&[TokenKind::Var, TokenKind::Const, TokenKind::Ref]) {
                match self.variable_declaration() {
                    Ok(member) => members.push((member, visibility)),
                    Err(ParseInterrupt) => self.synchronize(),
                }
            } else if self.match_token(TokenKind::Fn) {
                match self.class_method(class_name, ctor.is_some(), dtor.is_some(), &method_names) {
                    Ok((method, is_ctor, is_dtor)) => {
                        if is_ctor {
                            ctor = Some(methods.len());
                        } else if is_dtor {
                            dtor = Some(methods.len());
                        } else {
                            method_names.push(method.name.lexeme.clone());
                        }
                        methods.push((method, visibility));
                    }
                    Err(ParseInterrupt) => self.synchronize(),
                }
            } else {
                return Err(self.error_at_peek("Expected either member or method declaration in class"));
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}' at the end of class declaration")?;
        Ok((ctor, dtor, members, methods))
    }

    /// Parse one method of a class; a method whose name equals the class name
    /// is the constructor, or the destructor when written `fn ~Name`.
    fn class_method(
        &mut self,
        class_name: &Token,
        has_ctor: bool,
        has_dtor: bool,
        declared: &[String],
    ) -> PResult<(FunctionDecl, bool, bool)> {
        let found_dtor = self.match_token(TokenKind::Tilde);
        if found_dtor && self.peek().lexeme != class_name.lexeme {
            self.advance()?;
            let at = self.previous().clone();
            return Err(self.error_at(
                "The name of the destructor has to be the same as the name of the class",
                &at,
            ));
        }

        let mut method = self.function_declaration(declared)?;

        let mut is_ctor = false;
        let mut is_dtor = false;
        if method.name.lexeme == class_name.lexeme {
            if found_dtor && !has_dtor {
                is_dtor = true;
                method.name.lexeme = format!("~{}", method.name.lexeme);
            } else if !found_dtor && !has_ctor {
                is_ctor = true;
            } else {
                let at = method.name.clone();
                return Err(self.error_at("Cannot declare constructors or destructors more than once", &at));
            }
        }

        Ok((method, is_ctor, is_dtor))
    }

    fn function_declaration(&mut self, declared_methods: &[String]) -> PResult<FunctionDecl> {
        self.consume(TokenKind::Ident, "Expected function name after 'fn' keyword")?;
        let name = self.previous().clone();

        if !self.in_class && self.module.functions.contains_key(&name.lexeme) {
            return Err(self.error_at("Function already defined", &name));
        } else if self.in_class && declared_methods.iter().any(|m| *m == name.lexeme) {
            return Err(self.error_at("Method already defined", &name));
        }

        self.consume(TokenKind::LParen, "Expected '(' after function name")?;

        self.scope_depth += 1;
        let rest = self.function_rest(name);
        self.scope_depth -= 1;
        rest
    }

    fn function_rest(&mut self, name: Token) -> PResult<FunctionDecl> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                self.consume(TokenKind::Ident, "Expected parameter name")?;
                let param_name = self.previous().clone();
                self.consume(TokenKind::Colon, "Expected ':' after function parameter name")?;
                let param_type = self.type_expr()?;
                params.push((param_name, param_type));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expected ')' after function parameters")?;

        // The scanner may emit end-of-line tokens between ')' and '->'.
        self.skip_end_of_lines();

        self.consume(TokenKind::Arrow, "Expected '->' after ')' to specify return type")?;
        let return_type = self.type_expr()?;
        self.consume(TokenKind::LBrace, "Expected '{' after function return type")?;

        let saved_in_function = std::mem::replace(&mut self.in_function, true);
        let body = self.block_body();
        self.in_function = saved_in_function;

        Ok(FunctionDecl {
            name,
            return_type,
            params,
            body: body?,
        })
    }

    fn import_statement(&mut self) -> PResult<Option<Stmt>> {
        self.consume(TokenKind::StrLit, "Expected path to module after 'import' keyword")?;
        let imported = self.previous().clone();
        self.consume_terminator("Expected ';' or newline after imported file")?;

        let (full_path, module_name, module_dir) =
            module::resolve_import_path(&self.module.directory, &imported.lexeme);

        if module_name == self.module.name {
            self.session
                .reporter
                .error("Cannot import module with the same name as the current one", &imported);
            return Ok(None);
        }

        // Already present in the registry: do not reparse. A shorter path to
        // an existing module lifts it (and its transitive imports) deeper.
        if let Some(existing) = self.session.registry.find(&module_name) {
            if self.session.registry.depth(existing) < self.depth + 1 {
                self.session.registry.raise_depth(existing, self.depth + 1);
            }
            self.module.imported.push(existing);
            return Ok(None);
        }

        let source = match std::fs::read_to_string(&full_path) {
            Ok(source) => source,
            Err(_) => {
                self.session
                    .reporter
                    .error(format!("Unable to open module '{}'", module_name), &imported);
                return Ok(None);
            }
        };

        let index = module::compile_module(&source, &module_name, &module_dir, self.depth + 1, self.session);
        self.module.imported.push(index);
        Ok(None)
    }

    fn type_declaration(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::Ident, "Expected type name after 'type' keyword")?;
        let name = self.previous().clone();
        self.consume(TokenKind::Eq, "Expected '=' after type name")?;
        let aliased = self.type_expr()?;
        self.consume_terminator("Expected ';' or newline after type alias")?;
        Ok(Stmt::TypeAlias { name, aliased })
    }

    fn variable_declaration(&mut self) -> PResult<VarDecl> {
        let keyword = self.previous().clone();
        let message = format!("Expected variable name after '{}' keyword", keyword.lexeme);
        self.consume(TokenKind::Ident, &message)?;
        let name = self.previous().clone();

        let declared_type = if self.match_token(TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        let initializer = if self.match_token(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume_terminator("Expected ';' or newline after variable initializer")?;

        Ok(VarDecl {
            keyword,
            name,
            declared_type,
            initializer,
            conversion: NumericConversion::None,
            requires_copy: false,
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> PResult<Stmt> {
        if self.match_token(TokenKind::LBrace) {
            self.block_statement()
        } else if self.match_token(TokenKind::Break) {
            self.break_statement()
        } else if self.match_token(TokenKind::Continue) {
            self.continue_statement()
        } else if self.match_token(TokenKind::For) {
            self.for_statement()
        } else if self.match_token(TokenKind::If) {
            self.if_statement()
        } else if self.match_token(TokenKind::Return) {
            self.return_statement()
        } else if self.match_token(TokenKind::Switch) {
            self.switch_statement()
        } else if self.match_token(TokenKind::While) {
            self.while_statement()
        } else {
            self.expression_statement()
        }
    }

    fn block_statement(&mut self) -> PResult<Stmt> {
        Ok(Stmt::Block(self.block_body()?))
    }

    fn block_body(&mut self) -> PResult<Vec<Stmt>> {
        self.scope_depth += 1;
        let result = self.block_body_inner();
        self.scope_depth -= 1;
        result
    }

    fn block_body_inner(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            if self.match_any(&[TokenKind::Var, TokenKind::Const, TokenKind::Ref]) {
                statements.push(Stmt::Var(self.variable_declaration()?));
            } else {
                statements.push(self.statement()?);
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    fn break_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        if !(self.in_loop || self.in_switch) {
            return Err(self.error_at("Cannot use 'break' outside a loop or switch", &keyword));
        }
        self.consume_terminator("Expected ';' or newline after 'break' keyword")?;
        Ok(Stmt::Break(keyword))
    }

    fn continue_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        if !self.in_loop {
            return Err(self.error_at("Cannot use 'continue' outside a loop", &keyword));
        }
        self.consume_terminator("Expected ';' or newline after 'continue' keyword")?;
        Ok(Stmt::Continue(keyword))
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume_terminator("Expected ';' or newline after expression")?;
        Ok(Stmt::Expression(expr))
    }

    /// `for (init; cond; step) { body }` desugars to
    /// `{ init; while cond { body; step; } }`.
    fn for_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        self.consume(TokenKind::LParen, "Expected '(' after 'for' keyword")?;

        self.scope_depth += 1;
        let result = self.for_rest(keyword);
        self.scope_depth -= 1;
        result
    }

    fn for_rest(&mut self, keyword: Token) -> PResult<Stmt> {
        let initializer = if self.match_any(&[TokenKind::Var, TokenKind::Const, TokenKind::Ref]) {
            Some(Stmt::Var(self.variable_declaration()?))
        } else if self.match_token(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after loop condition")?;

        let increment = if !self.check(TokenKind::RParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RParen, "Expected ')' after for loop header")?;

        self.skip_end_of_lines();
        self.consume(TokenKind::LBrace, "Expected '{' after for-loop header")?;

        let saved_in_loop = std::mem::replace(&mut self.in_loop, true);
        let body = self.block_body();
        self.in_loop = saved_in_loop;
        let mut body = body?;

        if let Some(step) = increment {
            body.push(Stmt::Expression(step));
        }

        let desugared = Stmt::While {
            keyword,
            condition,
            body: Box::new(Stmt::Block(body)),
        };

        let mut wrapper = Vec::new();
        if let Some(init) = initializer {
            wrapper.push(init);
        }
        wrapper.push(desugared);
        Ok(Stmt::Block(wrapper))
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let condition = self.expression()?;

        self.skip_end_of_lines();
        self.consume(TokenKind::LBrace, "Expected '{' after if statement condition")?;
        let then_branch = self.block_statement()?;

        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(if self.match_token(TokenKind::If) {
                self.if_statement()?
            } else {
                self.consume(TokenKind::LBrace, "Expected '{' after else keyword")?;
                self.block_statement()?
            }))
        } else {
            None
        };

        Ok(Stmt::If {
            keyword,
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        if !self.in_function {
            return Err(self.error_at("Cannot use 'return' keyword outside a function", &keyword));
        }

        let value = if !self.check(TokenKind::Semicolon) && !self.check(TokenKind::EndOfLine) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume_terminator("Expected ';' or newline after return statement")?;
        Ok(Stmt::Return {
            keyword,
            value,
            locals_popped: 0,
            function: None,
        })
    }

    fn switch_statement(&mut self) -> PResult<Stmt> {
        let condition = self.expression()?;

        self.skip_end_of_lines();
        self.consume(TokenKind::LBrace, "Expected '{' after switch statement condition")?;

        let saved_in_switch = std::mem::replace(&mut self.in_switch, true);
        let body = self.switch_body();
        self.in_switch = saved_in_switch;
        let (cases, default_case) = body?;

        Ok(Stmt::Switch {
            condition,
            cases,
            default_case,
        })
    }

    #[allow(clippy::type_complexity)]
    fn switch_body(&mut self) -> PResult<(Vec<(Expr, Stmt)>, Option<Box<Stmt>>)> {
        let mut cases = Vec::new();
        let mut default_case = None;

        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            if self.match_token(TokenKind::Default) {
                if default_case.is_some() {
                    let at = self.previous().clone();
                    return Err(self.error_at("Cannot have more than one default case in a switch", &at));
                }
                self.consume(TokenKind::Arrow, "Expected '->' after 'default'")?;
                default_case = Some(Box::new(self.statement()?));
            } else {
                let expr = self.expression()?;
                self.consume(TokenKind::Arrow, "Expected '->' after case expression")?;
                let stmt = self.statement()?;
                cases.push((expr, stmt));
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}' at the end of switch statement")?;
        Ok((cases, default_case))
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let condition = self.expression()?;

        self.skip_end_of_lines();

        let saved_in_loop = std::mem::replace(&mut self.in_loop, true);
        let body = self.while_body();
        self.in_loop = saved_in_loop;

        Ok(Stmt::While {
            keyword,
            condition: Some(condition),
            body: Box::new(body?),
        })
    }

    fn while_body(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LBrace, "Expected '{' after while-loop header")?;
        self.block_statement()
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn expression(&mut self) -> PResult<Expr> {
        self.parse_precedence(Precedence::Comma)
    }

    fn assignment(&mut self) -> PResult<Expr> {
        self.parse_precedence(Precedence::Assignment)
    }

    /// The Pratt core: consume one token, run its prefix handler, then fold
    /// infix handlers while the next token binds at least as tightly as
    /// `precedence`.
    fn parse_precedence(&mut self, precedence: Precedence) -> PResult<Expr> {
        self.advance()?;

        let can_assign = precedence <= Precedence::Assignment;
        let mut left = self.parse_prefix(can_assign)?;

        while precedence <= infix_precedence(self.peek().kind) {
            self.advance()?;
            left = self.parse_infix(can_assign, left)?;
        }

        if can_assign && self.match_any(ASSIGN_OPS) {
            let at = self.previous().clone();
            return Err(self.error_at("Invalid assignment target", &at));
        }

        Ok(left)
    }

    fn parse_prefix(&mut self, can_assign: bool) -> PResult<Expr> {
        use TokenKind::*;
        match self.previous().kind {
            Minus | Plus | Bang | Tilde | PlusPlus | MinusMinus => self.unary(),
            LParen => self.grouping(),
            LBracket => self.list(),
            LBrace => self.tuple(),
            IntLit | FloatLit | StrLit | True | False | Null => self.literal(),
            Ident | Int | Float | Str => self.variable(can_assign),
            This => self.this_expr(),
            Super => self.super_expr(),
            _ => {
                let prev = self.previous().clone();
                let message = if prev.kind == EndOfLine {
                    "Unexpected token in expression '\\n' (newline)".to_string()
                } else {
                    format!("Unexpected token in expression '{}'", prev.lexeme)
                };
                let had_error_before = self.session.reporter.had_error();
                self.session.reporter.error(message, &prev);
                if had_error_before {
                    self.session
                        .reporter
                        .note("This may occur because of previous errors leading to the parser being confused");
                }
                Err(ParseInterrupt)
            }
        }
    }

    fn parse_infix(&mut self, can_assign: bool, left: Expr) -> PResult<Expr> {
        use TokenKind::*;
        match self.previous().kind {
            Comma => self.comma(left),
            Question => self.ternary(left),
            And | Or => self.logical(left),
            Pipe | Caret | Amp | EqEq | NotEq | Lt | LtEq | Gt | GtEq | Shl | Shr | DotDot | DotDotEq | Plus
            | Minus | Star | Slash | Percent => self.binary(left),
            Dot => self.dot(can_assign, left),
            LParen => self.call(left),
            LBracket => self.index(can_assign, left),
            ColonColon => self.scope_access(left),
            kind => {
                let prev = self.previous().clone();
                let message = format!("'{}' cannot occur in an infix/postfix expression", prev.lexeme);
                self.session.reporter.error(message, &prev);
                if kind == PlusPlus {
                    self.session.reporter.note("Postfix increment is not supported");
                } else if kind == MinusMinus {
                    self.session.reporter.note("Postfix decrement is not supported");
                }
                Err(ParseInterrupt)
            }
        }
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = self.previous().clone();
        let operand = self.parse_precedence(infix_precedence(op.kind))?;
        Ok(Expr::new(
            ExprKind::Unary {
                op: op.clone(),
                operand: Box::new(operand),
            },
            op,
        ))
    }

    fn binary(&mut self, left: Expr) -> PResult<Expr> {
        let op = self.previous().clone();
        let right = self.parse_precedence(infix_precedence(op.kind).one_higher())?;
        Ok(Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                right: Box::new(right),
            },
            op,
        ))
    }

    fn logical(&mut self, left: Expr) -> PResult<Expr> {
        let op = self.previous().clone();
        let precedence = if op.kind == TokenKind::And {
            Precedence::LogicAnd
        } else {
            Precedence::LogicOr
        };
        let right = self.parse_precedence(precedence)?;
        Ok(Expr::new(
            ExprKind::Logical {
                left: Box::new(left),
                right: Box::new(right),
            },
            op,
        ))
    }

    fn ternary(&mut self, condition: Expr) -> PResult<Expr> {
        let question = self.previous().clone();
        let then_expr = self.parse_precedence(Precedence::LogicOr)?;
        self.consume(TokenKind::Colon, "Expected colon in ternary expression")?;
        let else_expr = self.parse_precedence(Precedence::Ternary)?;
        Ok(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            question,
        ))
    }

    fn comma(&mut self, left: Expr) -> PResult<Expr> {
        let op = self.previous().clone();
        let mut exprs = vec![left];
        loop {
            exprs.push(self.assignment()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(Expr::new(ExprKind::Comma { exprs }, op))
    }

    fn call(&mut self, callee: Expr) -> PResult<Expr> {
        let paren = self.previous().clone();
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(Element::new(self.assignment()?));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expected ')' after function call")?;
        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
                is_native: false,
            },
            paren,
        ))
    }

    /// Member access. When `.` is followed by a float literal the source is
    /// a tuple double-access like `x.2.0` (scanned as `x` `.` `2.0`); the
    /// float splits into two integer components and chains two accesses.
    fn dot(&mut self, can_assign: bool, left: Expr) -> PResult<Expr> {
        let mut left = left;
        let name;

        if self.check(TokenKind::FloatLit) {
            let float = self.peek().clone();
            // A float lexeme always contains exactly one dot.
            let cursor = float.lexeme.find('.').unwrap_or(0);
            let first = Token::new(
                TokenKind::IntLit,
                &float.lexeme[..cursor],
                float.line,
                float.start,
                float.start + cursor,
            );
            let second = Token::new(
                TokenKind::IntLit,
                &float.lexeme[cursor + 1..],
                float.line,
                float.start + cursor + 1,
                float.end,
            );
            self.advance()?;

            left = Expr::new(
                ExprKind::Get {
                    object: Box::new(left),
                    name: first.clone(),
                },
                first,
            );
            name = second;
        } else {
            self.consume_any(
                &[TokenKind::Ident, TokenKind::IntLit],
                "Expected identifier or integer literal after '.'",
            )?;
            name = self.previous().clone();
        }

        if can_assign && self.match_any(ASSIGN_OPS) {
            let op = self.previous().clone();
            let value = self.assignment()?;
            Ok(Expr::new(
                ExprKind::Set {
                    object: Box::new(left),
                    name,
                    value: Box::new(value),
                    conversion: NumericConversion::None,
                    requires_copy: false,
                },
                op,
            ))
        } else {
            Ok(Expr::new(
                ExprKind::Get {
                    object: Box::new(left),
                    name: name.clone(),
                },
                name,
            ))
        }
    }

    fn index(&mut self, can_assign: bool, object: Expr) -> PResult<Expr> {
        let bracket = self.previous().clone();
        let index = self.expression()?;
        self.consume(TokenKind::RBracket, "Expected ']' after array subscript index")?;

        if can_assign && self.match_any(ASSIGN_OPS) {
            let op = self.previous().clone();
            let value = self.assignment()?;
            Ok(Expr::new(
                ExprKind::ListAssign {
                    object: Box::new(object),
                    index: Box::new(index),
                    value: Box::new(value),
                    conversion: NumericConversion::None,
                    requires_copy: false,
                },
                op,
            ))
        } else {
            Ok(Expr::new(
                ExprKind::Index {
                    object: Box::new(object),
                    index: Box::new(index),
                },
                bracket,
            ))
        }
    }

    fn grouping(&mut self) -> PResult<Expr> {
        let paren = self.previous().clone();
        let expr = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after parenthesized expression")?;
        Ok(Expr::new(
            ExprKind::Grouping {
                expr: Box::new(expr),
            },
            paren,
        ))
    }

    fn list(&mut self) -> PResult<Expr> {
        let bracket = self.previous().clone();
        let mut elements = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                elements.push(Element::new(self.assignment()?));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
                // Trailing comma
                if self.check(TokenKind::RBracket) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RBracket, "Expected ']' after list expression")?;
        Ok(Expr::new(ExprKind::List { elements }, bracket))
    }

    fn tuple(&mut self) -> PResult<Expr> {
        let brace = self.previous().clone();
        let mut elements = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            elements.push(Element::new(self.assignment()?));
            self.match_token(TokenKind::Comma);
        }
        self.consume(TokenKind::RBrace, "Expected '}' after tuple expression")?;
        Ok(Expr::new(ExprKind::Tuple { elements }, brace))
    }

    fn literal(&mut self) -> PResult<Expr> {
        let token = self.previous().clone();
        let value = match token.kind {
            TokenKind::IntLit => match token.lexeme.parse::<i64>() {
                Ok(value) => LiteralValue::Int(value),
                Err(_) => {
                    return Err(self.error_at("Integer literal out of range", &token));
                }
            },
            TokenKind::FloatLit => match token.lexeme.parse::<f64>() {
                Ok(value) => LiteralValue::Float(value),
                Err(_) => {
                    return Err(self.error_at("Float literal out of range", &token));
                }
            },
            TokenKind::StrLit => {
                // Adjacent string literals concatenate into one.
                let mut value = token.lexeme.clone();
                while self.match_token(TokenKind::StrLit) {
                    value.push_str(&self.previous().lexeme);
                }
                LiteralValue::Str(value)
            }
            TokenKind::True => LiteralValue::Bool(true),
            TokenKind::False => LiteralValue::Bool(false),
            TokenKind::Null => LiteralValue::Null,
            _ => {
                return Err(self.error_at("Unexpected token passed to literal parser", &token));
            }
        };

        Ok(Expr::new(ExprKind::Literal { value }, token))
    }

    fn scope_access(&mut self, left: Expr) -> PResult<Expr> {
        let colons = self.previous().clone();
        self.consume(TokenKind::Ident, "Expected identifier to be accessed after scope name")?;
        let name = self.previous().clone();
        Ok(Expr::new(
            ExprKind::ScopeAccess {
                scope: Box::new(left),
                name,
            },
            colons,
        ))
    }

    fn variable(&mut self, can_assign: bool) -> PResult<Expr> {
        let name = self.previous().clone();

        if can_assign && self.match_any(ASSIGN_OPS) {
            let op = self.previous().clone();
            let value = self.assignment()?;
            Ok(Expr::new(
                ExprKind::Assign {
                    target: name,
                    value: Box::new(value),
                    conversion: NumericConversion::None,
                    requires_copy: false,
                },
                op,
            ))
        } else if self.check(TokenKind::ColonColon) {
            Ok(Expr::new(ExprKind::ScopeName { name: name.clone() }, name))
        } else {
            Ok(Expr::new(ExprKind::Variable { name: name.clone() }, name))
        }
    }

    fn this_expr(&mut self) -> PResult<Expr> {
        let keyword = self.previous().clone();
        if !(self.in_class && self.in_function) {
            return Err(self.error_at(
                "Cannot use 'this' keyword outside a class's constructor or destructor",
                &keyword,
            ));
        }
        Ok(Expr::new(ExprKind::This { keyword: keyword.clone() }, keyword))
    }

    fn super_expr(&mut self) -> PResult<Expr> {
        let keyword = self.previous().clone();
        if !(self.in_class && self.in_function) {
            return Err(self.error_at("Cannot use 'super' expression outside a class", &keyword));
        }
        self.consume(TokenKind::Dot, "Expected '.' after 'super' keyword")?;
        self.consume(TokenKind::Ident, "Expected name after '.' in super expression")?;
        let name = self.previous().clone();
        Ok(Expr::new(
            ExprKind::Super {
                keyword: keyword.clone(),
                name,
            },
            keyword,
        ))
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn type_expr(&mut self) -> PResult<TypeExpr> {
        let is_const = self.match_token(TokenKind::Const);
        let is_ref = self.match_token(TokenKind::Ref);

        if self.match_token(TokenKind::Bool) {
            Ok(TypeExpr {
                kind: TypeExprKind::Primitive(Primitive::Bool),
                is_const,
                is_ref,
            })
        } else if self.match_token(TokenKind::Int) {
            Ok(TypeExpr {
                kind: TypeExprKind::Primitive(Primitive::Int),
                is_const,
                is_ref,
            })
        } else if self.match_token(TokenKind::Float) {
            Ok(TypeExpr {
                kind: TypeExprKind::Primitive(Primitive::Float),
                is_const,
                is_ref,
            })
        } else if self.match_token(TokenKind::Str) {
            Ok(TypeExpr {
                kind: TypeExprKind::Primitive(Primitive::Str),
                is_const,
                is_ref,
            })
        } else if self.match_token(TokenKind::Null) {
            Ok(TypeExpr {
                kind: TypeExprKind::Primitive(Primitive::Null),
                is_const,
                is_ref,
            })
        } else if self.match_token(TokenKind::Ident) {
            Ok(TypeExpr {
                kind: TypeExprKind::Named(self.previous().clone()),
                is_const,
                is_ref,
            })
        } else if self.match_token(TokenKind::LBracket) {
            self.list_type(is_const, is_ref)
        } else if self.match_token(TokenKind::LBrace) {
            self.tuple_type(is_const, is_ref)
        } else if self.match_token(TokenKind::Typeof) {
            let expr = self.parse_precedence(Precedence::LogicOr)?;
            Ok(TypeExpr {
                kind: TypeExprKind::Typeof(Box::new(expr)),
                is_const,
                is_ref,
            })
        } else {
            let interrupt = self.error_at_peek("Unexpected token in type specifier");
            self.session
                .reporter
                .note("The type needs to be one of: bool, int, float, string, an identifier or an array type");
            Err(interrupt)
        }
    }

    fn list_type(&mut self, is_const: bool, is_ref: bool) -> PResult<TypeExpr> {
        let element = self.type_expr()?;
        let size = if self.match_token(TokenKind::Comma) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.consume(TokenKind::RBracket, "Expected ']' after array type")?;
        Ok(TypeExpr {
            kind: TypeExprKind::List {
                element: Box::new(element),
                size,
            },
            is_const,
            is_ref,
        })
    }

    fn tuple_type(&mut self, is_const: bool, is_ref: bool) -> PResult<TypeExpr> {
        let mut types = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            types.push(self.type_expr()?);
            self.match_token(TokenKind::Comma);
        }
        self.consume(TokenKind::RBrace, "Expected '}' after tuple type")?;
        Ok(TypeExpr {
            kind: TypeExprKind::Tuple(types),
            is_const,
            is_ref,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer;

    fn parse_source(source: &str) -> (Module, Session) {
        let mut session = Session::new();
        session.reporter.set_source(source);
        session.reporter.set_module_name("test.vela");
        let tokens = lexer::lex(source, &mut session.reporter);
        let mut module = Module::new("test.vela", ".");
        parse(&tokens, &mut module, 0, &mut session);
        (module, session)
    }

    fn parse_clean(source: &str) -> Module {
        let (module, session) = parse_source(source);
        assert!(
            !session.reporter.had_error(),
            "unexpected diagnostics: {:?}",
            session.reporter.diagnostics()
        );
        module
    }

    fn count_message(session: &Session, fragment: &str) -> usize {
        session
            .reporter
            .diagnostics()
            .iter()
            .filter(|d| d.message.contains(fragment))
            .count()
    }

    #[test]
    fn newline_terminates_two_declarations() {
        let module = parse_clean("var x = 1\nvar y = 2\n");
        assert_eq!(module.statements.len(), 2);
        assert!(matches!(module.statements[0], Stmt::Var(_)));
        assert!(matches!(module.statements[1], Stmt::Var(_)));
    }

    #[test]
    fn semicolon_also_terminates() {
        let module = parse_clean("var x = 1; var y = 2;");
        assert_eq!(module.statements.len(), 2);
    }

    #[test]
    fn tuple_member_double_access() {
        // `x.2.0` becomes Get(Get(Variable(x), "2"), "0")
        let module = parse_clean("x.2.0;");
        let Stmt::Expression(expr) = &module.statements[0] else {
            panic!("expected expression statement");
        };
        let ExprKind::Get { object, name } = &expr.kind else {
            panic!("expected outer Get, got {:?}", expr.kind);
        };
        assert_eq!(name.lexeme, "0");
        assert_eq!(name.kind, TokenKind::IntLit);
        let ExprKind::Get { object: inner, name: inner_name } = &object.kind else {
            panic!("expected inner Get, got {:?}", object.kind);
        };
        assert_eq!(inner_name.lexeme, "2");
        assert!(matches!(&inner.kind, ExprKind::Variable { name } if name.lexeme == "x"));
    }

    #[test]
    fn for_loop_desugars_to_while() {
        let module = parse_clean("fn f() -> null { for(var i = 0; i < 10; i = i + 1) { break; } }");
        let Stmt::Function(function) = &module.statements[0] else {
            panic!("expected function");
        };
        let Stmt::Block(wrapper) = &function.body[0] else {
            panic!("expected desugared block, got {:?}", function.body[0]);
        };
        assert_eq!(wrapper.len(), 2);
        assert!(matches!(&wrapper[0], Stmt::Var(decl) if decl.name.lexeme == "i"));
        let Stmt::While { condition, body, .. } = &wrapper[1] else {
            panic!("expected while, got {:?}", wrapper[1]);
        };
        assert!(condition.is_some());
        let Stmt::Block(loop_body) = body.as_ref() else {
            panic!("expected block body");
        };
        assert_eq!(loop_body.len(), 2);
        assert!(matches!(loop_body[0], Stmt::Break(_)));
        assert!(matches!(
            &loop_body[1],
            Stmt::Expression(expr) if matches!(expr.kind, ExprKind::Assign { .. })
        ));
    }

    #[test]
    fn invalid_assignment_target_reports_once_and_recovers() {
        let (module, session) = parse_source("1 + 2 = 3;\nvar ok = 1\n");
        assert_eq!(count_message(&session, "Invalid assignment target"), 1);
        // Recovery: the following declaration still parses.
        assert!(module.statements.iter().any(|s| matches!(s, Stmt::Var(_))));
    }

    #[test]
    fn duplicate_constructor_reports_dedicated_error_once() {
        let source = "class Foo { public fn Foo() -> null {} public fn Foo() -> null {} }";
        let (_, session) = parse_source(source);
        assert_eq!(
            count_message(&session, "Cannot declare constructors or destructors more than once"),
            1
        );
    }

    #[test]
    fn class_members_and_methods_are_collected() {
        let source = "class Point {\n\
                      public var x: int = 0;\n\
                      private var y: int = 0;\n\
                      public fn Point() -> null {}\n\
                      public fn ~Point() -> null {}\n\
                      protected fn shift() -> null {}\n\
                      }";
        let module = parse_clean(source);
        let Stmt::Class(class) = &module.statements[0] else {
            panic!("expected class");
        };
        assert_eq!(class.members.len(), 2);
        assert_eq!(class.members[0].1, Visibility::Public);
        assert_eq!(class.members[1].1, Visibility::Private);
        assert_eq!(class.methods.len(), 3);
        assert_eq!(class.ctor, Some(0));
        assert_eq!(class.dtor, Some(1));
        // Destructor name is normalized with the '~' prefix.
        assert_eq!(class.methods[1].0.name.lexeme, "~Point");
        assert_eq!(class.methods[2].1, Visibility::Protected);
        assert_eq!(module.classes.get("Point"), Some(&0));
    }

    #[test]
    fn destructor_name_must_match_class() {
        let (_, session) = parse_source("class Foo { public fn ~Bar() -> null {} }");
        assert_eq!(
            count_message(&session, "The name of the destructor has to be the same as the name of the class"),
            1
        );
    }

    #[test]
    fn member_requires_visibility_modifier() {
        let (_, session) = parse_source("class Foo { var x: int; }");
        assert!(count_message(&session, "Expected 'public', 'private' or 'protected'") >= 1);
    }

    #[test]
    fn top_level_functions_are_registered() {
        let module = parse_clean("fn one() -> int { return 1; }\nfn two() -> int { return 2; }");
        assert_eq!(module.functions.get("one"), Some(&0));
        assert_eq!(module.functions.get("two"), Some(&1));
    }

    #[test]
    fn duplicate_function_is_an_error() {
        let (_, session) = parse_source("fn f() -> null {}\nfn f() -> null {}");
        assert_eq!(count_message(&session, "Function already defined"), 1);
    }

    #[test]
    fn newline_allowed_between_params_and_arrow() {
        let module = parse_clean("fn f(a: int)\n-> int { return a; }");
        assert!(matches!(module.statements[0], Stmt::Function(_)));
    }

    #[test]
    fn precedence_product_binds_tighter_than_sum() {
        let module = parse_clean("x = 1 + 2 * 3;");
        let Stmt::Expression(expr) = &module.statements[0] else {
            panic!("expected expression");
        };
        let ExprKind::Assign { value, .. } = &expr.kind else {
            panic!("expected assignment");
        };
        // 1 + (2 * 3): the outer node is the '+'.
        assert_eq!(value.resolved.token.kind, TokenKind::Plus);
        let ExprKind::Binary { right, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert_eq!(right.resolved.token.kind, TokenKind::Star);
    }

    #[test]
    fn ternary_parses_right_associative() {
        let module = parse_clean("x = a ? b : c ? d : e;");
        let Stmt::Expression(expr) = &module.statements[0] else {
            panic!("expected expression");
        };
        let ExprKind::Assign { value, .. } = &expr.kind else {
            panic!("expected assignment");
        };
        let ExprKind::Ternary { else_expr, .. } = &value.kind else {
            panic!("expected ternary");
        };
        assert!(matches!(else_expr.kind, ExprKind::Ternary { .. }));
    }

    #[test]
    fn compound_assignment_forms() {
        let module = parse_clean("x += 1; obj.field -= 2; xs[0] *= 3;");
        assert!(matches!(
            &module.statements[0],
            Stmt::Expression(e) if matches!(e.kind, ExprKind::Assign { .. })
                && e.resolved.token.kind == TokenKind::PlusEq
        ));
        assert!(matches!(
            &module.statements[1],
            Stmt::Expression(e) if matches!(e.kind, ExprKind::Set { .. })
                && e.resolved.token.kind == TokenKind::MinusEq
        ));
        assert!(matches!(
            &module.statements[2],
            Stmt::Expression(e) if matches!(e.kind, ExprKind::ListAssign { .. })
                && e.resolved.token.kind == TokenKind::StarEq
        ));
    }

    #[test]
    fn adjacent_string_literals_merge() {
        let module = parse_clean("var s = \"foo\" \"bar\"\n");
        let Stmt::Var(decl) = &module.statements[0] else {
            panic!("expected var");
        };
        let Some(init) = &decl.initializer else {
            panic!("expected initializer");
        };
        assert!(matches!(
            &init.kind,
            ExprKind::Literal { value: LiteralValue::Str(s) } if s == "foobar"
        ));
    }

    #[test]
    fn null_is_a_literal_expression() {
        let module = parse_clean("var x = null\n");
        let Stmt::Var(decl) = &module.statements[0] else {
            panic!("expected var");
        };
        assert!(matches!(
            decl.initializer.as_ref().map(|e| &e.kind),
            Some(ExprKind::Literal { value: LiteralValue::Null })
        ));
    }

    #[test]
    fn scope_access_parses() {
        let module = parse_clean("helpers::run();");
        let Stmt::Expression(expr) = &module.statements[0] else {
            panic!("expected expression");
        };
        let ExprKind::Call { callee, .. } = &expr.kind else {
            panic!("expected call");
        };
        let ExprKind::ScopeAccess { scope, name } = &callee.kind else {
            panic!("expected scope access, got {:?}", callee.kind);
        };
        assert_eq!(name.lexeme, "run");
        assert!(matches!(&scope.kind, ExprKind::ScopeName { name } if name.lexeme == "helpers"));
    }

    #[test]
    fn switch_allows_one_default() {
        let (_, session) =
            parse_source("fn f(x: int) -> null { switch x { default -> {} default -> {} } }");
        assert_eq!(count_message(&session, "Cannot have more than one default case"), 1);
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let (_, session) = parse_source("fn f() -> null { break; }");
        assert_eq!(count_message(&session, "Cannot use 'break' outside a loop or switch"), 1);
    }

    #[test]
    fn continue_requires_a_loop() {
        let (_, session) = parse_source("fn f(x: int) -> null { switch x { 1 -> continue; } }");
        assert_eq!(count_message(&session, "Cannot use 'continue' outside a loop"), 1);
    }

    #[test]
    fn this_requires_class_context() {
        let (_, session) = parse_source("fn f() -> null { this.x = 1; }");
        assert!(count_message(&session, "Cannot use 'this' keyword") >= 1);
    }

    #[test]
    fn return_requires_function_context() {
        let (_, session) = parse_source("return 1\n");
        assert_eq!(count_message(&session, "Cannot use 'return' keyword outside a function"), 1);
    }

    #[test]
    fn postfix_increment_gets_a_note() {
        let (_, session) = parse_source("x++;");
        let diag = session
            .reporter
            .diagnostics()
            .iter()
            .find(|d| d.message.contains("cannot occur in an infix/postfix expression"))
            .expect("expected infix error");
        assert!(diag.notes.iter().any(|n| n.contains("Postfix increment")));
    }

    #[test]
    fn list_and_tuple_types_parse() {
        let module = parse_clean("var xs: [int] = [1, 2, 3]\nvar pair: {int, float};");
        assert_eq!(module.statements.len(), 2);
        let Stmt::Var(decl) = &module.statements[0] else {
            panic!("expected var");
        };
        assert!(matches!(
            decl.declared_type.as_ref().map(|t| &t.kind),
            Some(TypeExprKind::List { .. })
        ));
    }

    #[test]
    fn sized_list_type_parses() {
        let module = parse_clean("var xs: [int, 4];");
        let Stmt::Var(decl) = &module.statements[0] else {
            panic!("expected var");
        };
        let Some(TypeExprKind::List { size, .. }) = decl.declared_type.as_ref().map(|t| &t.kind) else {
            panic!("expected list type");
        };
        assert!(size.is_some());
    }

    #[test]
    fn parsing_twice_yields_identical_asts() {
        let source = "fn fib(n: int) -> int {\n\
                      if n < 2 { return n; }\n\
                      return fib(n - 1) + fib(n - 2);\n\
                      }\n\
                      var start = fib(10)\n";
        let first = parse_clean(source);
        let second = parse_clean(source);
        assert_eq!(first.statements, second.statements);
        assert_eq!(first.functions, second.functions);
    }

    #[test]
    fn error_recovery_keeps_following_declarations() {
        let (module, session) = parse_source("var = 1\nfn ok() -> int { return 3; }\n");
        assert!(session.reporter.had_error());
        assert!(module.functions.contains_key("ok"));
    }
}
