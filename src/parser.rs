// File: src/parser.rs
//
// Pratt-style recursive-descent parser. Builds the AST and, at the same
// time, populates the symbol table (`var`/function-parameter bindings are
// defined the moment they're parsed, not in a later pass) so the compiler
// can later re-enter the exact scope the parser built for a given
// function by name.

use crate::ast::{AssignTarget, Expr, InfixOp, PrefixOp, Program, Stmt};
use crate::errors::{ErrorList, SourceLocation, Stage};
use crate::symbol_table::{self, SymbolTable};
use crate::token::{Token, TokenKind};

type Precedence = u8;

const LOWEST: Precedence = 1;
const OR_AND: Precedence = 2;
const EQUALS: Precedence = 3;
const COMPARE: Precedence = 4;
const SUM: Precedence = 5;
const PRODUCT: Precedence = 6;
const MOD_POW: Precedence = 7;
const PREFIX: Precedence = 8;
const CALL: Precedence = 9;
const INDEX: Precedence = 10;
const MEMBER: Precedence = 11;

/// Binding power of `kind` when it appears as an infix/postfix operator.
/// Ordered exactly as the lowest-to-highest table: `or`/`and` bind
/// loosest, then equality, comparison, `+ -`, `* /`, `% **`, then the
/// postfix forms `()`, `[]`, `.` bind tightest.
fn precedence_of(kind: &TokenKind) -> Precedence {
    match kind {
        TokenKind::Or | TokenKind::And => OR_AND,
        TokenKind::Equal | TokenKind::NotEq => EQUALS,
        TokenKind::LT | TokenKind::LTEq | TokenKind::GT | TokenKind::GTEq => COMPARE,
        TokenKind::Plus | TokenKind::Minus => SUM,
        TokenKind::Mul | TokenKind::Div => PRODUCT,
        TokenKind::Mod | TokenKind::Pow => MOD_POW,
        TokenKind::LParen => CALL,
        TokenKind::LBracket => INDEX,
        TokenKind::Dot => MEMBER,
        _ => LOWEST,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub errors: ErrorList,
    pub symbol_table: SymbolTable,
    lambda_counter: usize,
}

impl Parser {
    /// Fresh global scope with builtins pre-defined, for one-shot compiles.
    pub fn new(tokens: Vec<Token>) -> Self {
        let symbol_table = symbol_table::new_global();
        crate::builtins::register(&symbol_table);
        Parser { tokens, pos: 0, errors: ErrorList::new(), symbol_table, lambda_counter: 0 }
    }

    /// Continues parsing against an existing scope, for the REPL, where
    /// each line's `var`s must be visible to the next line's parse.
    pub fn with_table(tokens: Vec<Token>, symbol_table: SymbolTable) -> Self {
        Parser { tokens, pos: 0, errors: ErrorList::new(), symbol_table, lambda_counter: 0 }
    }

    fn cur(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn cur_loc(&self) -> SourceLocation {
        let t = &self.tokens[self.pos];
        SourceLocation::new(t.line, t.column)
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn skip_lf(&mut self) {
        while matches!(self.cur(), TokenKind::LF | TokenKind::Semi) {
            self.advance();
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push_at(Stage::Parse, message, self.cur_loc());
    }

    fn expect(&mut self, kind: &TokenKind) -> bool {
        if std::mem::discriminant(self.cur()) == std::mem::discriminant(kind) {
            self.advance();
            true
        } else {
            self.error(format!("expected {}, got {}", kind, self.cur()));
            false
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        self.skip_lf();
        while !matches!(self.cur(), TokenKind::Eof) {
            let stmt = self.parse_statement();
            statements.push(stmt);
            self.skip_lf();
        }
        Program { statements }
    }

    fn parse_statement(&mut self) -> Stmt {
        match self.cur() {
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::Def => self.parse_func_def_or_expr_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Break => {
                let loc = self.cur_loc();
                self.advance();
                Stmt::Break(loc)
            }
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::LBrace => self.parse_block_statement(),
            _ => self.parse_expr_or_assign_statement(),
        }
    }

    fn parse_var_statement(&mut self) -> Stmt {
        let loc = self.cur_loc();
        self.advance(); // `var`
        let name = match self.cur().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                name
            }
            other => {
                self.error(format!("expected identifier after 'var', got {}", other));
                String::new()
            }
        };
        self.expect(&TokenKind::Assign);
        let value = self.parse_expression(LOWEST);
        self.symbol_table.borrow_mut().define(&name);
        Stmt::Var { name, value, loc }
    }

    fn parse_func_def_or_expr_statement(&mut self) -> Stmt {
        if matches!(self.peek(), TokenKind::Ident(_)) {
            self.parse_func_def_statement()
        } else {
            self.parse_expr_or_assign_statement()
        }
    }

    fn parse_func_def_statement(&mut self) -> Stmt {
        let loc = self.cur_loc();
        self.advance(); // `def`
        let name = match self.cur().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                name
            }
            other => {
                self.error(format!("expected function name, got {}", other));
                String::new()
            }
        };
        self.symbol_table.borrow_mut().define(&name);
        let params = self.parse_func_params();
        let inner = symbol_table::new_enclosed(&self.symbol_table, name.clone());
        inner.borrow_mut().define_function_name(&name);
        for param in &params {
            inner.borrow_mut().define(param);
        }
        let outer = std::mem::replace(&mut self.symbol_table, inner);
        let body = self.parse_block_statement();
        self.symbol_table = outer;
        Stmt::FuncDef { name, params, body: Box::new(body), loc }
    }

    fn parse_func_params(&mut self) -> Vec<String> {
        let mut params = Vec::new();
        self.expect(&TokenKind::LParen);
        if matches!(self.cur(), TokenKind::RParen) {
            self.advance();
            return params;
        }
        loop {
            match self.cur().clone() {
                TokenKind::Ident(name) => {
                    params.push(name);
                    self.advance();
                }
                other => {
                    self.error(format!("expected parameter name, got {}", other));
                    break;
                }
            }
            if matches!(self.cur(), TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(&TokenKind::RParen);
        params
    }

    fn parse_if_statement(&mut self) -> Stmt {
        let loc = self.cur_loc();
        self.advance(); // `if`
        self.expect(&TokenKind::LParen);
        let condition = self.parse_expression(LOWEST);
        self.expect(&TokenKind::RParen);
        let consequence = Box::new(self.parse_block_statement());
        self.skip_lf();
        let alternative = if matches!(self.cur(), TokenKind::Else) {
            self.advance();
            if matches!(self.cur(), TokenKind::If) {
                Some(Box::new(self.parse_if_statement()))
            } else {
                Some(Box::new(self.parse_block_statement()))
            }
        } else {
            None
        };
        Stmt::If { condition, consequence, alternative, loc }
    }

    fn parse_for_statement(&mut self) -> Stmt {
        let loc = self.cur_loc();
        self.advance(); // `for`
        self.expect(&TokenKind::LParen);
        let init = if matches!(self.cur(), TokenKind::Semi) {
            None
        } else {
            Some(Box::new(self.parse_statement()))
        };
        self.expect(&TokenKind::Semi);
        let condition = if matches!(self.cur(), TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expression(LOWEST))
        };
        self.expect(&TokenKind::Semi);
        let step = if matches!(self.cur(), TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_statement()))
        };
        self.expect(&TokenKind::RParen);
        let body = Box::new(self.parse_block_statement());
        Stmt::For { init, condition, step, body, loc }
    }

    fn parse_return_statement(&mut self) -> Stmt {
        let loc = self.cur_loc();
        self.advance(); // `return`
        let value = if matches!(self.cur(), TokenKind::LF | TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof) {
            None
        } else {
            Some(self.parse_expression(LOWEST))
        };
        Stmt::Return { value, loc }
    }

    fn parse_block_statement(&mut self) -> Stmt {
        self.expect(&TokenKind::LBrace);
        self.skip_lf();
        let mut statements = Vec::new();
        while !matches!(self.cur(), TokenKind::RBrace | TokenKind::Eof) {
            statements.push(self.parse_statement());
            self.skip_lf();
        }
        self.expect(&TokenKind::RBrace);
        Stmt::Block(statements)
    }

    fn parse_expr_or_assign_statement(&mut self) -> Stmt {
        let loc = self.cur_loc();
        let expr = self.parse_expression(LOWEST);

        let augmented_op = match self.cur() {
            TokenKind::Assign => None,
            TokenKind::PlusEq => Some(InfixOp::Add),
            TokenKind::MinusEq => Some(InfixOp::Sub),
            TokenKind::MulEq => Some(InfixOp::Mul),
            TokenKind::DivEq => Some(InfixOp::Div),
            TokenKind::ModEq => Some(InfixOp::Mod),
            TokenKind::PowEq => Some(InfixOp::Pow),
            _ => return Stmt::Expr(expr),
        };
        let is_plain_assign = matches!(self.cur(), TokenKind::Assign);
        self.advance(); // the assignment operator

        let Some(target) = expr_to_assign_target(&expr) else {
            self.error("left-hand side of assignment must be a name or an index expression");
            return Stmt::Expr(expr);
        };

        let rhs = self.parse_expression(LOWEST);
        let value = if is_plain_assign {
            rhs
        } else {
            Expr::Infix {
                op: augmented_op.unwrap(),
                left: Box::new(assign_target_to_expr(&target)),
                right: Box::new(rhs),
                loc,
            }
        };
        Stmt::Assign { target, value, loc }
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Expr {
        let mut left = self.parse_prefix();
        while !matches!(self.cur(), TokenKind::LF | TokenKind::Semi | TokenKind::Eof)
            && precedence < precedence_of(self.cur())
        {
            left = self.parse_infix(left);
        }
        left
    }

    fn parse_prefix(&mut self) -> Expr {
        let loc = self.cur_loc();
        match self.cur().clone() {
            TokenKind::Int(v) => {
                self.advance();
                Expr::Int(v)
            }
            TokenKind::Float(v) => {
                self.advance();
                Expr::Float(v)
            }
            TokenKind::String(s) => {
                self.advance();
                Expr::Str(s)
            }
            TokenKind::True => {
                self.advance();
                Expr::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                Expr::Bool(false)
            }
            TokenKind::None_ => {
                self.advance();
                Expr::None
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.symbol_table.borrow().resolve(&name).is_none() {
                    self.error(format!("use of undefined name '{}'", name));
                }
                Expr::Ident(name)
            }
            TokenKind::Minus => {
                self.advance();
                let right = self.parse_expression(PREFIX);
                Expr::Prefix { op: PrefixOp::Neg, right: Box::new(right), loc }
            }
            TokenKind::Not => {
                self.advance();
                let right = self.parse_expression(PREFIX);
                Expr::Prefix { op: PrefixOp::Not, right: Box::new(right), loc }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression(LOWEST);
                self.expect(&TokenKind::RParen);
                expr
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_map_literal(),
            TokenKind::Def => self.parse_func_literal(),
            other => {
                self.error(format!("unexpected token {}", other));
                self.advance();
                Expr::None
            }
        }
    }

    fn parse_func_literal(&mut self) -> Expr {
        let loc = self.cur_loc();
        self.advance(); // `def`
        let scope_name = format!("<anonymous:{}>", self.lambda_counter);
        self.lambda_counter += 1;
        let params = self.parse_func_params();
        let inner = symbol_table::new_enclosed(&self.symbol_table, scope_name.clone());
        for param in &params {
            inner.borrow_mut().define(param);
        }
        let outer = std::mem::replace(&mut self.symbol_table, inner);
        let body = self.parse_block_statement();
        self.symbol_table = outer;
        Expr::FuncLiteral { params, body: Box::new(body), scope_name, loc }
    }

    fn parse_array_literal(&mut self) -> Expr {
        self.advance(); // `[`
        self.skip_lf();
        let mut elements = Vec::new();
        if !matches!(self.cur(), TokenKind::RBracket) {
            elements.push(self.parse_expression(LOWEST));
            while matches!(self.cur(), TokenKind::Comma) {
                self.advance();
                self.skip_lf();
                if matches!(self.cur(), TokenKind::RBracket) {
                    break;
                }
                elements.push(self.parse_expression(LOWEST));
            }
        }
        self.skip_lf();
        self.expect(&TokenKind::RBracket);
        Expr::Array(elements)
    }

    fn parse_map_literal(&mut self) -> Expr {
        self.advance(); // `{`
        self.skip_lf();
        let mut pairs = Vec::new();
        if !matches!(self.cur(), TokenKind::RBrace) {
            pairs.push(self.parse_map_pair());
            while matches!(self.cur(), TokenKind::Comma) {
                self.advance();
                self.skip_lf();
                if matches!(self.cur(), TokenKind::RBrace) {
                    break;
                }
                pairs.push(self.parse_map_pair());
            }
        }
        self.skip_lf();
        self.expect(&TokenKind::RBrace);
        Expr::Map(pairs)
    }

    fn parse_map_pair(&mut self) -> (Expr, Expr) {
        let key = self.parse_expression(LOWEST);
        self.expect(&TokenKind::Colon);
        self.skip_lf();
        let value = self.parse_expression(LOWEST);
        (key, value)
    }

    fn parse_infix(&mut self, left: Expr) -> Expr {
        let loc = self.cur_loc();
        match self.cur().clone() {
            TokenKind::LParen => self.parse_call(left),
            TokenKind::LBracket => self.parse_index_or_slice(left),
            TokenKind::Dot => self.parse_method_call(left),
            kind => {
                let op = infix_op(&kind);
                let prec = precedence_of(&kind);
                self.advance();
                let right = self.parse_expression(prec);
                match op {
                    Some(op) => Expr::Infix { op, left: Box::new(left), right: Box::new(right), loc },
                    None => {
                        self.error(format!("unexpected infix operator {}", kind));
                        left
                    }
                }
            }
        }
    }

    fn parse_call(&mut self, func: Expr) -> Expr {
        let loc = self.cur_loc();
        let args = self.parse_expression_list(TokenKind::RParen);
        Expr::Call { func: Box::new(func), args, loc }
    }

    fn parse_method_call(&mut self, receiver: Expr) -> Expr {
        let loc = self.cur_loc();
        self.advance(); // `.`
        let method = match self.cur().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                name
            }
            other => {
                self.error(format!("expected method name after '.', got {}", other));
                String::new()
            }
        };
        if !method.is_empty() && !crate::builtins::is_known_method(&method) {
            self.error(format!("unknown method name '{}'", method));
        }
        self.symbol_table.borrow().intern_method(&method);
        let args = self.parse_expression_list(TokenKind::RParen);
        Expr::MethodCall { receiver: Box::new(receiver), method, args, loc }
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Vec<Expr> {
        self.advance(); // opening delimiter: caller has already checked it matches
        let mut list = Vec::new();
        if std::mem::discriminant(self.cur()) == std::mem::discriminant(&end) {
            self.advance();
            return list;
        }
        list.push(self.parse_expression(LOWEST));
        while matches!(self.cur(), TokenKind::Comma) {
            self.advance();
            list.push(self.parse_expression(LOWEST));
        }
        self.expect(&end);
        list
    }

    fn parse_index_or_slice(&mut self, left: Expr) -> Expr {
        let loc = self.cur_loc();
        self.advance(); // `[`
        let start = if matches!(self.cur(), TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.parse_expression(LOWEST)))
        };
        if matches!(self.cur(), TokenKind::Colon) {
            self.advance();
            let end = if matches!(self.cur(), TokenKind::Colon | TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression(LOWEST)))
            };
            let step = if matches!(self.cur(), TokenKind::Colon) {
                self.advance();
                if matches!(self.cur(), TokenKind::RBracket) {
                    None
                } else {
                    Some(Box::new(self.parse_expression(LOWEST)))
                }
            } else {
                None
            };
            self.expect(&TokenKind::RBracket);
            Expr::Slice { left: Box::new(left), start, end, step, loc }
        } else {
            self.expect(&TokenKind::RBracket);
            let index = start.unwrap_or_else(|| {
                self.error("empty index expression");
                Box::new(Expr::None)
            });
            Expr::Index { left: Box::new(left), index, loc }
        }
    }
}

fn infix_op(kind: &TokenKind) -> Option<InfixOp> {
    Some(match kind {
        TokenKind::Plus => InfixOp::Add,
        TokenKind::Minus => InfixOp::Sub,
        TokenKind::Mul => InfixOp::Mul,
        TokenKind::Div => InfixOp::Div,
        TokenKind::Mod => InfixOp::Mod,
        TokenKind::Pow => InfixOp::Pow,
        TokenKind::Equal => InfixOp::Eq,
        TokenKind::NotEq => InfixOp::NotEq,
        TokenKind::LT => InfixOp::Lt,
        TokenKind::LTEq => InfixOp::LtEq,
        TokenKind::GT => InfixOp::Gt,
        TokenKind::GTEq => InfixOp::GtEq,
        TokenKind::And => InfixOp::And,
        TokenKind::Or => InfixOp::Or,
        _ => return None,
    })
}

fn expr_to_assign_target(expr: &Expr) -> Option<AssignTarget> {
    match expr {
        Expr::Ident(name) => Some(AssignTarget::Ident(name.clone())),
        Expr::Index { left, index, .. } => {
            Some(AssignTarget::Index { left: (**left).clone(), index: (**index).clone() })
        }
        _ => None,
    }
}

fn assign_target_to_expr(target: &AssignTarget) -> Expr {
    match target {
        AssignTarget::Ident(name) => Expr::Ident(name.clone()),
        AssignTarget::Index { left, index } => Expr::Index {
            left: Box::new(left.clone()),
            index: Box::new(index.clone()),
            loc: SourceLocation::unknown(),
        },
    }
}

/// Tokenizes and parses `source`, returning the program, the populated
/// root symbol table, and any accumulated parse errors.
pub fn parse(tokens: Vec<Token>) -> (Program, SymbolTable, ErrorList) {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, parser.symbol_table, parser.errors)
}
