use std::rc::Rc;

use kit::helpers::location::Position;

use crate::errors::EvalError;

use super::ast::{
    ArrowBody, ArrowFn, BinaryOp, Expr, ExprKind, ListItem, LogicalOp, Param, Pattern, PatternElement, Prop,
    PropKey, Stmt, UnaryOp,
};
use super::lexer::{Lexer, Token, TokenKind};

pub fn parse_program(source: &str) -> Result<Vec<Stmt>, EvalError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let mut statements = vec![];
    while !parser.at_eof() {
        if let Some(statement) = parser.parse_statement()? {
            statements.push(statement);
        }
    }
    Ok(statements)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn position(&self) -> Position {
        self.peek().position
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check_punct(&self, punct: &str) -> bool {
        self.peek().is_punct(punct)
    }

    fn check_ident(&self, name: &str) -> bool {
        self.peek().is_ident(name)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.check_punct(punct) {
            self.advance();
            return true;
        }
        false
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.check_ident(name) {
            self.advance();
            return true;
        }
        false
    }

    fn unexpected(&self, expected: &str) -> EvalError {
        EvalError::parse(
            format!("expected {}, found {}", expected, self.peek().describe()),
            Some(self.position()),
        )
    }

    fn expect_punct(&mut self, punct: &str) -> Result<Position, EvalError> {
        if self.check_punct(punct) {
            return Ok(self.advance().position);
        }
        Err(self.unexpected(&format!("'{}'", punct)))
    }

    fn expect_ident(&mut self) -> Result<String, EvalError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn end_statement(&mut self) {
        while self.eat_punct(";") {}
    }

    // Statements

    /// Parses one statement. Type-only declarations yield `None`.
    fn parse_statement(&mut self) -> Result<Option<Stmt>, EvalError> {
        let position = self.position();
        if self.eat_punct(";") {
            return Ok(None);
        }
        if self.check_ident("import") {
            return self.parse_import().map(Some);
        }
        if self.check_ident("interface") {
            self.advance();
            self.skip_type()?;
            self.skip_balanced()?;
            return Ok(None);
        }
        if self.check_ident("type") && matches!(self.peek_at(1).kind, TokenKind::Ident(_)) {
            self.advance();
            self.advance();
            if self.check_punct("<") {
                self.skip_balanced()?;
            }
            self.expect_punct("=")?;
            self.skip_type()?;
            self.end_statement();
            return Ok(None);
        }
        let exported = self.eat_ident("export");
        if self.check_ident("const") || self.check_ident("let") || self.check_ident("var") {
            self.advance();
            let pattern = self.parse_pattern()?;
            if self.eat_punct(":") {
                self.skip_type()?;
            }
            self.expect_punct("=")?;
            let init = self.parse_expression()?;
            self.end_statement();
            return Ok(Some(Stmt::Decl { pattern, init, exported, position }));
        }
        if self.check_ident("function") {
            self.advance();
            let name = self.expect_ident()?;
            let function = self.parse_function_rest()?;
            return Ok(Some(Stmt::Function { name, function, exported, position }));
        }
        if exported {
            return Err(EvalError::unsupported("export forms other than 'export const' and 'export function'")
                .or_position(Some(position)));
        }
        if self.check_ident("if") {
            self.advance();
            self.expect_punct("(")?;
            let cond = self.parse_expression()?;
            self.expect_punct(")")?;
            let then = Box::new(self.parse_required_statement()?);
            let otherwise = if self.eat_ident("else") {
                Some(Box::new(self.parse_required_statement()?))
            } else {
                None
            };
            return Ok(Some(Stmt::If { cond, then, otherwise }));
        }
        if self.check_ident("for") {
            self.advance();
            self.expect_punct("(")?;
            if !(self.eat_ident("const") || self.eat_ident("let") || self.eat_ident("var")) {
                return Err(self.unexpected("'const' in for-of loop"));
            }
            let pattern = self.parse_pattern()?;
            if !self.eat_ident("of") {
                return Err(EvalError::unsupported("only 'for (const x of ...)' loops").or_position(Some(position)));
            }
            let iterable = self.parse_expression()?;
            self.expect_punct(")")?;
            let body = Box::new(self.parse_required_statement()?);
            return Ok(Some(Stmt::ForOf { pattern, iterable, body }));
        }
        if self.check_ident("return") {
            self.advance();
            let value = if self.check_punct(";") || self.check_punct("}") || self.at_eof() {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.end_statement();
            return Ok(Some(Stmt::Return { value, position }));
        }
        if self.check_punct("{") {
            return self.parse_block().map(|stmts| Some(Stmt::Block(stmts)));
        }
        let expr = self.parse_expression()?;
        self.end_statement();
        Ok(Some(Stmt::Expr(expr)))
    }

    fn parse_required_statement(&mut self) -> Result<Stmt, EvalError> {
        Ok(self.parse_statement()?.unwrap_or(Stmt::Block(vec![])))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, EvalError> {
        self.expect_punct("{")?;
        let mut statements = vec![];
        while !self.check_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            if let Some(statement) = self.parse_statement()? {
                statements.push(statement);
            }
        }
        self.advance();
        Ok(statements)
    }

    fn parse_import(&mut self) -> Result<Stmt, EvalError> {
        let position = self.advance().position;
        let alias = if self.eat_punct("*") {
            if !self.eat_ident("as") {
                return Err(self.unexpected("'as'"));
            }
            self.expect_ident()?
        } else if let TokenKind::Ident(_) = self.peek().kind {
            self.expect_ident()?
        } else {
            return Err(EvalError::unsupported("named imports; use 'import * as x from \"pkg\"'")
                .or_position(Some(position)));
        };
        if !self.eat_ident("from") {
            return Err(self.unexpected("'from'"));
        }
        let package = match &self.peek().kind {
            TokenKind::Str(package) => package.clone(),
            _ => return Err(self.unexpected("package name")),
        };
        self.advance();
        self.end_statement();
        Ok(Stmt::Import { alias, package, position })
    }

    // Patterns

    fn parse_pattern(&mut self) -> Result<Pattern, EvalError> {
        if self.eat_punct("[") {
            let mut elements = vec![];
            while !self.check_punct("]") {
                if self.check_punct(",") {
                    self.advance();
                    elements.push(None);
                    continue;
                }
                elements.push(Some(self.parse_pattern_element()?));
                if !self.check_punct("]") {
                    self.expect_punct(",")?;
                }
            }
            self.advance();
            return Ok(Pattern::Array(elements));
        }
        if self.eat_punct("{") {
            let mut properties = vec![];
            while !self.check_punct("}") {
                let key = match &self.peek().kind {
                    TokenKind::Ident(name) | TokenKind::Str(name) => name.clone(),
                    _ => return Err(self.unexpected("property name")),
                };
                self.advance();
                let element = if self.eat_punct(":") {
                    self.parse_pattern_element()?
                } else {
                    let default = if self.eat_punct("=") { Some(self.parse_assignment()?) } else { None };
                    PatternElement { pattern: Pattern::Ident(key.clone()), default }
                };
                properties.push((key, element));
                if !self.check_punct("}") {
                    self.expect_punct(",")?;
                }
            }
            self.advance();
            return Ok(Pattern::Object(properties));
        }
        Ok(Pattern::Ident(self.expect_ident()?))
    }

    fn parse_pattern_element(&mut self) -> Result<PatternElement, EvalError> {
        let pattern = self.parse_pattern()?;
        let default = if self.eat_punct("=") { Some(self.parse_assignment()?) } else { None };
        Ok(PatternElement { pattern, default })
    }

    // Types are parsed only to be skipped

    fn skip_balanced(&mut self) -> Result<(), EvalError> {
        let mut depth = 0usize;
        loop {
            let token = self.advance();
            match &token.kind {
                TokenKind::Punct("(" | "[" | "{" | "<") => depth += 1,
                TokenKind::Punct(")" | "]" | "}" | ">") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                TokenKind::Eof => return Err(EvalError::parse("unbalanced brackets", Some(token.position))),
                _ => {}
            }
        }
    }

    fn skip_type(&mut self) -> Result<(), EvalError> {
        self.eat_punct("|");
        loop {
            self.skip_type_atom()?;
            if self.eat_punct("|") || self.eat_punct("&") {
                continue;
            }
            return Ok(());
        }
    }

    fn skip_type_atom(&mut self) -> Result<(), EvalError> {
        match &self.peek().kind {
            TokenKind::Punct("(") => {
                self.skip_balanced()?;
                if self.eat_punct("=>") {
                    self.skip_type()?;
                }
            }
            TokenKind::Punct("{" | "[") => self.skip_balanced()?,
            TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Number(_) => {
                self.advance();
                while self.check_punct(".") && matches!(self.peek_at(1).kind, TokenKind::Ident(_)) {
                    self.advance();
                    self.advance();
                }
                if self.check_punct("<") {
                    self.skip_balanced()?;
                }
            }
            _ => return Err(self.unexpected("type")),
        }
        while self.check_punct("[") && self.peek_at(1).is_punct("]") {
            self.advance();
            self.advance();
        }
        Ok(())
    }

    // Expressions

    pub fn parse_expression(&mut self) -> Result<Expr, EvalError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, EvalError> {
        if self.arrow_ahead() {
            let position = self.position();
            return Ok(Expr::new(ExprKind::Arrow(self.parse_arrow()?), position));
        }
        let position = self.position();
        let cond = self.parse_logical_or()?;
        if self.eat_punct("?") {
            let then = self.parse_assignment()?;
            self.expect_punct(":")?;
            let otherwise = self.parse_assignment()?;
            return Ok(Expr::new(
                ExprKind::Conditional { cond: Box::new(cond), then: Box::new(then), otherwise: Box::new(otherwise) },
                position,
            ));
        }
        if self.check_punct("=") {
            return Err(EvalError::unsupported("assignment expressions").or_position(Some(self.position())));
        }
        Ok(cond)
    }

    /// Whether the tokens ahead start an arrow function.
    fn arrow_ahead(&self) -> bool {
        if let TokenKind::Ident(_) = self.peek().kind {
            return self.peek_at(1).is_punct("=>");
        }
        if !self.check_punct("(") {
            return false;
        }
        let mut depth = 0usize;
        let mut offset = 0;
        loop {
            let token = self.peek_at(offset);
            match &token.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
        let after = self.peek_at(offset + 1);
        if after.is_punct("=>") {
            return true;
        }
        if after.is_punct(":") {
            // a return type annotation; a ternary branch also looks like this
            let mut probe = Parser { tokens: self.tokens.clone(), pos: self.pos + offset + 2 };
            return probe.skip_type().is_ok() && probe.check_punct("=>");
        }
        false
    }

    fn parse_arrow(&mut self) -> Result<Rc<ArrowFn>, EvalError> {
        let params = if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            vec![Param { pattern: Pattern::Ident(name), default: None }]
        } else {
            self.parse_params()?
        };
        if self.eat_punct(":") {
            self.skip_type()?;
        }
        self.expect_punct("=>")?;
        let body = if self.check_punct("{") {
            ArrowBody::Block(self.parse_block()?)
        } else {
            ArrowBody::Expr(Box::new(self.parse_assignment()?))
        };
        Ok(Rc::new(ArrowFn { params, body }))
    }

    /// `(params): Type { body }` after `function name`.
    fn parse_function_rest(&mut self) -> Result<Rc<ArrowFn>, EvalError> {
        let params = self.parse_params()?;
        if self.eat_punct(":") {
            self.skip_type()?;
        }
        let body = ArrowBody::Block(self.parse_block()?);
        Ok(Rc::new(ArrowFn { params, body }))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, EvalError> {
        self.expect_punct("(")?;
        let mut params = vec![];
        while !self.check_punct(")") {
            let pattern = self.parse_pattern()?;
            self.eat_punct("?");
            if self.eat_punct(":") {
                self.skip_type()?;
            }
            let default = if self.eat_punct("=") { Some(self.parse_assignment()?) } else { None };
            params.push(Param { pattern, default });
            if !self.check_punct(")") {
                self.expect_punct(",")?;
            }
        }
        self.advance();
        Ok(params)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_logical_and()?;
        loop {
            let op = if self.check_punct("||") {
                LogicalOp::Or
            } else if self.check_punct("??") {
                LogicalOp::Nullish
            } else {
                return Ok(lhs);
            };
            let position = self.advance().position;
            let rhs = self.parse_logical_and()?;
            lhs = Expr::new(ExprKind::Logical { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, position);
        }
    }

    fn parse_logical_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_equality()?;
        while self.check_punct("&&") {
            let position = self.advance().position;
            let rhs = self.parse_equality()?;
            lhs = Expr::new(
                ExprKind::Logical { op: LogicalOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                position,
            );
        }
        Ok(lhs)
    }

    fn parse_binary_level(
        &mut self,
        operators: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (punct, op) in operators {
                if self.check_punct(punct) {
                    let position = self.advance().position;
                    let rhs = next(self)?;
                    lhs = Expr::new(ExprKind::Binary { op: *op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, position);
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[("===", BinaryOp::Eq), ("!==", BinaryOp::NotEq), ("==", BinaryOp::Eq), ("!=", BinaryOp::NotEq)],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[("<=", BinaryOp::LtEq), (">=", BinaryOp::GtEq), ("<", BinaryOp::Lt), (">", BinaryOp::Gt)],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        self.parse_binary_level(
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
            Self::parse_cast,
        )
    }

    /// `expr as Type` and `expr satisfies Type` keep `expr`.
    fn parse_cast(&mut self) -> Result<Expr, EvalError> {
        let expr = self.parse_unary()?;
        while self.eat_ident("as") || self.eat_ident("satisfies") {
            self.skip_type()?;
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let position = self.position();
        let op = if self.check_punct("!") {
            UnaryOp::Not
        } else if self.check_punct("-") {
            UnaryOp::Neg
        } else if self.check_punct("+") {
            UnaryOp::Plus
        } else if self.check_ident("typeof") {
            UnaryOp::TypeOf
        } else {
            return self.parse_postfix();
        };
        self.advance();
        let expr = self.parse_unary()?;
        Ok(Expr::new(ExprKind::Unary { op, expr: Box::new(expr) }, position))
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            let position = self.position();
            if self.eat_punct(".") {
                let property = self.expect_property_name()?;
                expr = Expr::new(ExprKind::Member { object: Box::new(expr), property, optional: false }, position);
            } else if self.eat_punct("?.") {
                if self.check_punct("(") {
                    let args = self.parse_arguments()?;
                    expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args, optional: true }, position);
                } else if self.eat_punct("[") {
                    let index = self.parse_expression()?;
                    self.expect_punct("]")?;
                    expr = Expr::new(
                        ExprKind::Index { object: Box::new(expr), index: Box::new(index), optional: true },
                        position,
                    );
                } else {
                    let property = self.expect_property_name()?;
                    expr = Expr::new(ExprKind::Member { object: Box::new(expr), property, optional: true }, position);
                }
            } else if self.eat_punct("[") {
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::new(
                    ExprKind::Index { object: Box::new(expr), index: Box::new(index), optional: false },
                    position,
                );
            } else if self.check_punct("(") {
                let args = self.parse_arguments()?;
                expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args, optional: false }, position);
            } else if self.check_punct("!") {
                // non-null assertion
                self.advance();
            } else if let TokenKind::Template { .. } = self.peek().kind {
                let (quasis, exprs) = self.parse_template_parts()?;
                expr = Expr::new(ExprKind::Template { tag: Some(Box::new(expr)), quasis, exprs }, position);
            } else {
                return Ok(expr);
            }
        }
    }

    fn expect_property_name(&mut self) -> Result<String, EvalError> {
        // keywords are valid property names
        self.expect_ident()
    }

    fn parse_arguments(&mut self) -> Result<Vec<ListItem>, EvalError> {
        self.expect_punct("(")?;
        let items = self.parse_list_items(")")?;
        Ok(items)
    }

    fn parse_list_items(&mut self, close: &str) -> Result<Vec<ListItem>, EvalError> {
        let mut items = vec![];
        while !self.check_punct(close) {
            if self.eat_punct("...") {
                items.push(ListItem::Spread(self.parse_assignment()?));
            } else {
                items.push(ListItem::Item(self.parse_assignment()?));
            }
            if !self.check_punct(close) {
                self.expect_punct(",")?;
            }
        }
        self.advance();
        Ok(items)
    }

    fn parse_template_parts(&mut self) -> Result<(Vec<String>, Vec<Expr>), EvalError> {
        let token = self.advance();
        let TokenKind::Template { quasis, exprs } = token.kind else {
            return Err(EvalError::parse("expected template literal", Some(token.position)));
        };
        let mut parsed = Vec::with_capacity(exprs.len());
        for mut tokens in exprs {
            let end = tokens.last().map(|t| t.position).unwrap_or(token.position);
            tokens.push(Token { kind: TokenKind::Eof, position: end });
            let mut parser = Parser::new(tokens);
            let expr = parser.parse_expression()?;
            if !parser.at_eof() {
                return Err(parser.unexpected("'}'"));
            }
            parsed.push(expr);
        }
        Ok((quasis, parsed))
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let position = self.position();
        let kind = match &self.peek().kind {
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                ExprKind::Number(n)
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                ExprKind::Str(s)
            }
            TokenKind::Template { .. } => {
                let (quasis, exprs) = self.parse_template_parts()?;
                ExprKind::Template { tag: None, quasis, exprs }
            }
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                return Ok(expr);
            }
            TokenKind::Punct("[") => {
                self.advance();
                ExprKind::Array(self.parse_list_items("]")?)
            }
            TokenKind::Punct("{") => ExprKind::Object(self.parse_object()?),
            TokenKind::Ident(ident) => match ident.as_str() {
                "true" => {
                    self.advance();
                    ExprKind::Bool(true)
                }
                "false" => {
                    self.advance();
                    ExprKind::Bool(false)
                }
                "null" => {
                    self.advance();
                    ExprKind::Null
                }
                "undefined" => {
                    self.advance();
                    ExprKind::Undefined
                }
                "new" => {
                    self.advance();
                    let callee = self.parse_new_callee()?;
                    let args = if self.check_punct("(") { self.parse_arguments()? } else { vec![] };
                    ExprKind::New { callee: Box::new(callee), args }
                }
                "function" => {
                    self.advance();
                    if let TokenKind::Ident(_) = self.peek().kind {
                        self.advance();
                    }
                    ExprKind::Arrow(self.parse_function_rest()?)
                }
                _ => {
                    let name = ident.clone();
                    self.advance();
                    ExprKind::Ident(name)
                }
            },
            _ => return Err(self.unexpected("expression")),
        };
        Ok(Expr::new(kind, position))
    }

    /// Member chain after `new`, stopping before the argument list.
    fn parse_new_callee(&mut self) -> Result<Expr, EvalError> {
        let position = self.position();
        let mut expr = Expr::new(ExprKind::Ident(self.expect_ident()?), position);
        while self.check_punct(".") {
            let position = self.advance().position;
            let property = self.expect_property_name()?;
            expr = Expr::new(ExprKind::Member { object: Box::new(expr), property, optional: false }, position);
        }
        Ok(expr)
    }

    fn parse_object(&mut self) -> Result<Vec<Prop>, EvalError> {
        self.expect_punct("{")?;
        let mut props = vec![];
        while !self.check_punct("}") {
            if self.eat_punct("...") {
                props.push(Prop::Spread(self.parse_assignment()?));
            } else {
                let key = match &self.peek().kind {
                    TokenKind::Ident(name) | TokenKind::Str(name) => {
                        let name = name.clone();
                        self.advance();
                        PropKey::Named(name)
                    }
                    TokenKind::Number(n) => {
                        let name = kit::types::value::format_number(*n);
                        self.advance();
                        PropKey::Named(name)
                    }
                    TokenKind::Punct("[") => {
                        self.advance();
                        let key = self.parse_expression()?;
                        self.expect_punct("]")?;
                        PropKey::Computed(key)
                    }
                    _ => return Err(self.unexpected("property name")),
                };
                if self.eat_punct(":") {
                    props.push(Prop::KeyValue(key, self.parse_assignment()?));
                } else if self.check_punct("(") {
                    // method shorthand `name(args) { ... }`
                    let position = self.position();
                    let function = self.parse_function_rest()?;
                    props.push(Prop::KeyValue(key, Expr::new(ExprKind::Arrow(function), position)));
                } else {
                    match key {
                        PropKey::Named(name) => props.push(Prop::Shorthand(name)),
                        PropKey::Computed(_) => return Err(self.unexpected("':'")),
                    }
                }
            }
            if !self.check_punct("}") {
                self.expect_punct(",")?;
            }
        }
        self.advance();
        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(source: &str) -> Expr {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expression().unwrap();
        assert!(parser.at_eof(), "trailing tokens in {}", source);
        expr
    }

    #[test]
    fn test_binary_precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let ExprKind::Binary { op: BinaryOp::Add, rhs, .. } = expr.kind else { panic!("expected addition") };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_arrow_functions_are_detected() {
        assert!(matches!(parse_expr("x => x + 1").kind, ExprKind::Arrow(_)));
        assert!(matches!(parse_expr("([k, v]) => k").kind, ExprKind::Arrow(_)));
        assert!(matches!(parse_expr("(a: number, b = 2): number => { return a + b; }").kind, ExprKind::Arrow(_)));
        assert!(matches!(parse_expr("c ? (a) : b").kind, ExprKind::Conditional { .. }));
        assert!(matches!(parse_expr("(a)").kind, ExprKind::Ident(_)));
    }

    #[test]
    fn test_new_expression_path() {
        let expr = parse_expr(r#"new aws.ec2.Instance("web", { ami: "ami-1" })"#);
        let ExprKind::New { callee, args } = expr.kind else { panic!("expected new") };
        assert_eq!(callee.dotted_path().unwrap(), vec!["aws", "ec2", "Instance"]);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_casts_and_non_null_assertions_are_transparent() {
        assert_eq!(parse_expr("(x as string[])").kind, ExprKind::Ident("x".into()));
        assert!(matches!(parse_expr("x!.y").kind, ExprKind::Member { .. }));
    }

    #[test]
    fn test_program_skips_type_declarations() {
        let program = parse_program(
            r#"
            import * as aws from "@pulumi/aws";
            interface Args { name: string; size?: number }
            type Names = string[] | undefined;
            const names: string[] = ["a", "b"];
            export const count = names.length
            for (const [i, n] of names.entries()) {
              if (i > 0) { console.log(n) } else console.log(i)
            }
            "#,
        )
        .unwrap();
        assert_eq!(program.len(), 4);
        assert!(matches!(&program[2], Stmt::Decl { exported: true, .. }));
    }

    #[test]
    fn test_parse_errors_carry_positions() {
        let err = parse_program("const x = ;").unwrap_err();
        assert_eq!(err.position(), Some(Position::new(1, 11)));
    }

    #[test]
    fn test_tagged_templates() {
        let expr = parse_expr("pulumi.interpolate`http://${host}:${port}/`");
        let ExprKind::Template { tag, quasis, exprs } = expr.kind else { panic!("expected template") };
        assert!(tag.is_some());
        assert_eq!(quasis, vec!["http://", ":", "/"]);
        assert_eq!(exprs.len(), 2);
    }
}
