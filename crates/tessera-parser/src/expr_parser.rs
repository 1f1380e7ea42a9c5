//! Syntax validator for host expressions.
//!
//! Checks that template expressions, binding patterns, parameter lists and
//! generated render code are well-formed JavaScript without evaluating
//! anything. The grammar covers what templates and the code generator use:
//! literals, every operator, optional chaining, function and arrow
//! expressions, classes, object/array literals and destructuring, and the
//! usual statements with automatic semicolon insertion. Code is treated as
//! non-strict function body code.
//!
//! No tree is built; the validator only walks the token stream, classifying
//! expressions enough to reject invalid assignment targets.

use crate::expr_lexer::{is_keyword, ExprLexer, Token, TokenKind};
use crate::ExprSyntaxError;

/// Validate `return <exp>` as a function body.
pub fn validate_return_body(exp: &str) -> Result<(), ExprSyntaxError> {
    validate_with_prefix("return ", exp, Validator::function_body)
}

/// Validate `var <pattern>=_`: an identifier or destructuring pattern.
pub fn validate_binding(pattern: &str) -> Result<(), ExprSyntaxError> {
    validate_with_prefix("var ", &format!("{pattern}=_"), Validator::function_body)
}

/// Validate a formal parameter list, without the surrounding parentheses.
pub fn validate_params(params: &str) -> Result<(), ExprSyntaxError> {
    let tokens = ExprLexer::tokenize(params)?;
    let mut validator = Validator::new(tokens);
    validator.formal_params(None)?;
    validator.expect_eof()
}

/// Validate a complete function body.
pub fn validate_function_body(code: &str) -> Result<(), ExprSyntaxError> {
    let tokens = ExprLexer::tokenize(code)?;
    Validator::new(tokens).function_body()
}

fn validate_with_prefix(
    prefix: &str,
    source: &str,
    entry: fn(Validator) -> Result<(), ExprSyntaxError>,
) -> Result<(), ExprSyntaxError> {
    let code = format!("{prefix}{source}");
    ExprLexer::tokenize(&code)
        .and_then(|tokens| entry(Validator::new(tokens)))
        .map_err(|err| ExprSyntaxError {
            message: err.message,
            position: err.position.saturating_sub(prefix.len()),
        })
}

/// What an expression turned out to be, as far as assignment cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Identifier,
    Member,
    Call,
    /// Object or array literal, assignable by destructuring.
    Literal,
    /// Contains `?.`: never assignable.
    Optional,
    Other,
}

impl Shape {
    fn is_simple_target(self) -> bool {
        matches!(self, Shape::Identifier | Shape::Member | Shape::Call)
    }
}

const ASSIGN_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

fn binary_precedence(token: &Token, no_in: bool) -> Option<u8> {
    match token.kind {
        TokenKind::Punct => Some(match token.value.as_str() {
            "??" => 1,
            "||" => 2,
            "&&" => 3,
            "|" => 4,
            "^" => 5,
            "&" => 6,
            "==" | "!=" | "===" | "!==" => 7,
            "<" | ">" | "<=" | ">=" => 8,
            "<<" | ">>" | ">>>" => 9,
            "+" | "-" => 10,
            "*" | "/" | "%" => 11,
            "**" => 12,
            _ => return None,
        }),
        TokenKind::Keyword => match token.value.as_str() {
            "instanceof" => Some(8),
            "in" if !no_in => Some(8),
            _ => None,
        },
        _ => None,
    }
}

struct Validator {
    tokens: Vec<Token>,
    pos: usize,
    /// Inside a generator body, where `yield` is an operator.
    generator: bool,
}

impl Validator {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            generator: false,
        }
    }

    // --- Cursor ---

    fn current(&self) -> &Token {
        // The lexer always ends the stream with `Eof`, and the cursor never
        // moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.current().kind != TokenKind::Eof {
            self.pos += 1;
        }
    }

    fn at_punct(&self, value: &str) -> bool {
        self.current().is_punct(value)
    }

    fn at_keyword(&self, value: &str) -> bool {
        self.current().is_keyword(value)
    }

    fn at_identifier(&self, name: &str) -> bool {
        self.current().is(TokenKind::Identifier, name)
    }

    fn eat_punct(&mut self, value: &str) -> bool {
        if self.at_punct(value) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, value: &str) -> bool {
        if self.at_keyword(value) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, value: &str) -> Result<(), ExprSyntaxError> {
        if self.eat_punct(value) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_eof(&self) -> Result<(), ExprSyntaxError> {
        if self.current().kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ExprSyntaxError {
        let token = self.current();
        let message = match token.kind {
            TokenKind::Eof => "Unexpected end of input".to_string(),
            TokenKind::Identifier => format!("Unexpected identifier '{}'", token.value),
            TokenKind::Number => "Unexpected number".to_string(),
            TokenKind::String => "Unexpected string".to_string(),
            TokenKind::Template | TokenKind::TemplateHead => "Unexpected template string".to_string(),
            _ => format!("Unexpected token '{}'", token.value),
        };
        ExprSyntaxError {
            message,
            position: token.start,
        }
    }

    fn error_at(&self, message: &str, position: usize) -> ExprSyntaxError {
        ExprSyntaxError {
            message: message.to_string(),
            position,
        }
    }

    /// Automatic semicolon insertion.
    fn consume_semicolon(&mut self) -> Result<(), ExprSyntaxError> {
        if self.eat_punct(";") {
            return Ok(());
        }
        let token = self.current();
        if token.is_punct("}") || token.kind == TokenKind::Eof || token.newline_before {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn function_body(mut self) -> Result<(), ExprSyntaxError> {
        while self.current().kind != TokenKind::Eof {
            self.statement()?;
        }
        Ok(())
    }

    fn block(&mut self) -> Result<(), ExprSyntaxError> {
        self.expect_punct("{")?;
        while !self.at_punct("}") {
            if self.current().kind == TokenKind::Eof {
                return Err(self.unexpected());
            }
            self.statement()?;
        }
        self.advance();
        Ok(())
    }

    fn statement(&mut self) -> Result<(), ExprSyntaxError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Punct if token.value == "{" => self.block(),
            TokenKind::Punct if token.value == ";" => {
                self.advance();
                Ok(())
            }
            TokenKind::Keyword => self.keyword_statement(&token.value),
            TokenKind::Identifier if token.value == "let" && self.starts_let_declaration() => {
                self.advance();
                self.declarations(false)?;
                self.consume_semicolon()
            }
            TokenKind::Identifier
                if token.value == "async"
                    && self.peek(1).is_keyword("function")
                    && !self.peek(1).newline_before =>
            {
                self.advance();
                self.function(true)
            }
            TokenKind::Identifier if self.peek(1).is_punct(":") => {
                self.advance();
                self.advance();
                self.statement()
            }
            _ => {
                self.expression(false)?;
                self.consume_semicolon()
            }
        }
    }

    fn starts_let_declaration(&self) -> bool {
        let next = self.peek(1);
        next.kind == TokenKind::Identifier || next.is_punct("[") || next.is_punct("{")
    }

    fn keyword_statement(&mut self, keyword: &str) -> Result<(), ExprSyntaxError> {
        match keyword {
            "var" | "const" => {
                self.advance();
                self.declarations(false)?;
                self.consume_semicolon()
            }
            "function" => self.function(true),
            "class" => self.class(true),
            "if" => {
                self.advance();
                self.paren_expression()?;
                self.statement()?;
                if self.eat_keyword("else") {
                    self.statement()?;
                }
                Ok(())
            }
            "for" => self.for_statement(),
            "while" | "with" => {
                self.advance();
                self.paren_expression()?;
                self.statement()
            }
            "do" => {
                self.advance();
                self.statement()?;
                if !self.eat_keyword("while") {
                    return Err(self.unexpected());
                }
                self.paren_expression()?;
                self.eat_punct(";");
                Ok(())
            }
            "return" => {
                self.advance();
                if !self.ends_statement() {
                    self.expression(false)?;
                }
                self.consume_semicolon()
            }
            "break" | "continue" => {
                self.advance();
                if self.current().kind == TokenKind::Identifier && !self.current().newline_before {
                    self.advance();
                }
                self.consume_semicolon()
            }
            "throw" => {
                self.advance();
                if self.current().newline_before {
                    return Err(self.error_at("Illegal newline after throw", self.current().start));
                }
                self.expression(false)?;
                self.consume_semicolon()
            }
            "try" => self.try_statement(),
            "switch" => self.switch_statement(),
            "debugger" => {
                self.advance();
                self.consume_semicolon()
            }
            _ => {
                self.expression(false)?;
                self.consume_semicolon()
            }
        }
    }

    /// A `return` without an argument.
    fn ends_statement(&self) -> bool {
        let token = self.current();
        token.kind == TokenKind::Eof
            || token.newline_before
            || token.is_punct(";")
            || token.is_punct("}")
    }

    fn paren_expression(&mut self) -> Result<(), ExprSyntaxError> {
        self.expect_punct("(")?;
        self.expression(false)?;
        self.expect_punct(")")
    }

    /// `a = 1, [b] = c` after `var`/`let`/`const`.
    fn declarations(&mut self, no_in: bool) -> Result<(), ExprSyntaxError> {
        loop {
            self.binding_target()?;
            if self.eat_punct("=") {
                self.assignment(no_in)?;
            }
            if !self.eat_punct(",") {
                return Ok(());
            }
        }
    }

    fn for_statement(&mut self) -> Result<(), ExprSyntaxError> {
        self.advance();
        self.expect_punct("(")?;

        if !self.eat_punct(";") {
            let is_declaration = self.at_keyword("var")
                || self.at_keyword("const")
                || (self.at_identifier("let") && self.starts_let_declaration());
            if is_declaration {
                self.advance();
                self.declarations(true)?;
            } else {
                self.expression(true)?;
            }
            if self.eat_keyword("in") || self.current().is(TokenKind::Identifier, "of") {
                if self.at_identifier("of") {
                    self.advance();
                }
                self.expression(false)?;
                self.expect_punct(")")?;
                return self.statement();
            }
            self.expect_punct(";")?;
        }

        if !self.at_punct(";") {
            self.expression(false)?;
        }
        self.expect_punct(";")?;
        if !self.at_punct(")") {
            self.expression(false)?;
        }
        self.expect_punct(")")?;
        self.statement()
    }

    fn try_statement(&mut self) -> Result<(), ExprSyntaxError> {
        let start = self.current().start;
        self.advance();
        self.block()?;
        let mut handled = false;
        if self.eat_keyword("catch") {
            handled = true;
            if self.eat_punct("(") {
                self.binding_target()?;
                self.expect_punct(")")?;
            }
            self.block()?;
        }
        if self.eat_keyword("finally") {
            handled = true;
            self.block()?;
        }
        if handled {
            Ok(())
        } else {
            Err(self.error_at("Missing catch or finally after try", start))
        }
    }

    fn switch_statement(&mut self) -> Result<(), ExprSyntaxError> {
        self.advance();
        self.paren_expression()?;
        self.expect_punct("{")?;
        while !self.eat_punct("}") {
            if self.eat_keyword("case") {
                self.expression(false)?;
            } else if !self.eat_keyword("default") {
                return Err(self.unexpected());
            }
            self.expect_punct(":")?;
            while !(self.at_keyword("case") || self.at_keyword("default") || self.at_punct("}")) {
                if self.current().kind == TokenKind::Eof {
                    return Err(self.unexpected());
                }
                self.statement()?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Functions and classes
    // =========================================================================

    /// `function [*] name? (params) { body }`, cursor on `function`.
    fn function(&mut self, require_name: bool) -> Result<(), ExprSyntaxError> {
        self.advance();
        let generator = self.eat_punct("*");
        if self.current().kind == TokenKind::Identifier {
            self.advance();
        } else if require_name {
            return Err(self.unexpected());
        }
        self.function_rest(generator)
    }

    /// `(params) { body }`
    fn function_rest(&mut self, generator: bool) -> Result<(), ExprSyntaxError> {
        let outer = std::mem::replace(&mut self.generator, generator);
        self.expect_punct("(")?;
        self.formal_params(Some(")"))?;
        self.expect_punct(")")?;
        self.block()?;
        self.generator = outer;
        Ok(())
    }

    /// Parameters up to `close` (or the end of input when `None`).
    fn formal_params(&mut self, close: Option<&str>) -> Result<(), ExprSyntaxError> {
        let at_close = |v: &Validator| match close {
            Some(p) => v.at_punct(p),
            None => v.current().kind == TokenKind::Eof,
        };
        while !at_close(self) {
            if self.eat_punct("...") {
                self.binding_target()?;
                if !at_close(self) {
                    return Err(self.unexpected());
                }
                break;
            }
            self.binding_element()?;
            if !at_close(self) {
                self.expect_punct(",")?;
            }
        }
        Ok(())
    }

    fn class(&mut self, require_name: bool) -> Result<(), ExprSyntaxError> {
        self.advance();
        if self.current().kind == TokenKind::Identifier {
            self.advance();
        } else if require_name {
            return Err(self.unexpected());
        }
        if self.eat_keyword("extends") {
            self.unary()?;
        }
        self.expect_punct("{")?;
        while !self.eat_punct("}") {
            if self.eat_punct(";") {
                continue;
            }
            if self.at_identifier("static") && !self.peek(1).is_punct("(") && !self.peek(1).is_punct("=") {
                self.advance();
                if self.at_punct("{") {
                    self.block()?;
                    continue;
                }
            }
            self.class_member()?;
        }
        Ok(())
    }

    fn class_member(&mut self) -> Result<(), ExprSyntaxError> {
        if let Some(generator) = self.method_prefix() {
            self.property_name()?;
            return self.function_rest(generator);
        }
        self.property_name()?;
        if self.at_punct("(") {
            return self.function_rest(false);
        }
        if self.eat_punct("=") {
            self.assignment(false)?;
        }
        self.consume_semicolon()
    }

    /// Skip `get`/`set`/`async`/`*` when they introduce a method. `Some`
    /// tells whether the method is a generator.
    fn method_prefix(&mut self) -> Option<bool> {
        let mut seen = false;
        let mut generator = false;
        loop {
            let token = self.current();
            let is_modifier = token.kind == TokenKind::Identifier
                && matches!(token.value.as_str(), "get" | "set" | "async")
                && !self.peek(1).is_punct("(")
                && !self.peek(1).is_punct(":")
                && !self.peek(1).is_punct(",")
                && !self.peek(1).is_punct("}")
                && !self.peek(1).is_punct("=")
                && !self.peek(1).is_punct(";");
            if is_modifier || token.is_punct("*") {
                generator |= token.is_punct("*");
                self.advance();
                seen = true;
            } else {
                return seen.then_some(generator);
            }
        }
    }

    /// Identifier name (keywords allowed), string, number or `[computed]`.
    fn property_name(&mut self) -> Result<(), ExprSyntaxError> {
        match self.current().kind {
            TokenKind::Identifier | TokenKind::Keyword | TokenKind::String | TokenKind::Number => {
                self.advance();
                Ok(())
            }
            TokenKind::Punct if self.at_punct("[") => {
                self.advance();
                self.assignment(false)?;
                self.expect_punct("]")
            }
            _ => Err(self.unexpected()),
        }
    }

    // =========================================================================
    // Binding patterns
    // =========================================================================

    /// A binding target with an optional default.
    fn binding_element(&mut self) -> Result<(), ExprSyntaxError> {
        self.binding_target()?;
        if self.eat_punct("=") {
            self.assignment(false)?;
        }
        Ok(())
    }

    fn binding_target(&mut self) -> Result<(), ExprSyntaxError> {
        if self.at_punct("[") {
            self.advance();
            while !self.eat_punct("]") {
                if self.eat_punct(",") {
                    continue;
                }
                if self.eat_punct("...") {
                    self.binding_target()?;
                    return self.expect_punct("]");
                }
                self.binding_element()?;
                if !self.at_punct("]") {
                    self.expect_punct(",")?;
                }
            }
            Ok(())
        } else if self.at_punct("{") {
            self.advance();
            while !self.eat_punct("}") {
                if self.eat_punct("...") {
                    self.binding_identifier()?;
                    return self.expect_punct("}");
                }
                let shorthand = self.current().kind == TokenKind::Identifier
                    && !self.peek(1).is_punct(":");
                if shorthand {
                    self.binding_element()?;
                } else {
                    self.property_name()?;
                    self.expect_punct(":")?;
                    self.binding_element()?;
                }
                if !self.at_punct("}") {
                    self.expect_punct(",")?;
                }
            }
            Ok(())
        } else {
            self.binding_identifier()
        }
    }

    fn binding_identifier(&mut self) -> Result<(), ExprSyntaxError> {
        if self.current().kind == TokenKind::Identifier {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Comma-separated expressions. `no_in` keeps `in` out of relational
    /// expressions inside a `for (...)` head.
    fn expression(&mut self, no_in: bool) -> Result<Shape, ExprSyntaxError> {
        let mut shape = self.assignment(no_in)?;
        while self.eat_punct(",") {
            self.assignment(no_in)?;
            shape = Shape::Other;
        }
        Ok(shape)
    }

    fn assignment(&mut self, no_in: bool) -> Result<Shape, ExprSyntaxError> {
        if self.is_arrow_start() {
            self.arrow(no_in)?;
            return Ok(Shape::Other);
        }
        if self.generator && self.at_identifier("yield") {
            self.yield_expression(no_in)?;
            return Ok(Shape::Other);
        }
        let start = self.current().start;
        let shape = self.conditional(no_in)?;
        self.finish_assignment(shape, start, no_in)
    }

    fn finish_assignment(&mut self, shape: Shape, start: usize, no_in: bool) -> Result<Shape, ExprSyntaxError> {
        let token = self.current();
        if token.kind != TokenKind::Punct || !ASSIGN_OPS.contains(&token.value.as_str()) {
            return Ok(shape);
        }
        let valid = if token.value == "=" {
            shape.is_simple_target() || shape == Shape::Literal
        } else {
            shape.is_simple_target()
        };
        if !valid {
            return Err(self.error_at("Invalid left-hand side in assignment", start));
        }
        self.advance();
        self.assignment(no_in)?;
        Ok(Shape::Other)
    }

    fn is_arrow_start(&self) -> bool {
        let token = self.current();
        if token.kind == TokenKind::Identifier {
            if self.peek(1).is_punct("=>") {
                return true;
            }
            if token.value == "async" && !self.peek(1).newline_before {
                let next = self.peek(1);
                if next.kind == TokenKind::Identifier && self.peek(2).is_punct("=>") {
                    return true;
                }
                if next.is_punct("(") {
                    return self.paren_closes_before_arrow(self.pos + 1);
                }
            }
            return false;
        }
        token.is_punct("(") && self.paren_closes_before_arrow(self.pos)
    }

    /// The parenthesis at `open` is matched by a `)` followed by `=>`.
    fn paren_closes_before_arrow(&self, open: usize) -> bool {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            if token.kind != TokenKind::Punct {
                continue;
            }
            match token.value.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return token.value == ")"
                            && self
                                .tokens
                                .get(i + 1)
                                .is_some_and(|t| t.is_punct("=>") && !t.newline_before);
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn arrow(&mut self, no_in: bool) -> Result<(), ExprSyntaxError> {
        let outer = std::mem::replace(&mut self.generator, false);
        if self.at_identifier("async") && !self.peek(1).is_punct("=>") {
            self.advance();
        }
        if self.eat_punct("(") {
            self.formal_params(Some(")"))?;
            self.expect_punct(")")?;
        } else {
            self.binding_identifier()?;
        }
        self.expect_punct("=>")?;
        if self.at_punct("{") {
            self.block()?;
        } else {
            self.assignment(no_in)?;
        }
        self.generator = outer;
        Ok(())
    }

    /// `yield`, `yield value` or `yield* iterable`, cursor on `yield`.
    fn yield_expression(&mut self, no_in: bool) -> Result<(), ExprSyntaxError> {
        self.advance();
        let token = self.current();
        if token.newline_before {
            return Ok(());
        }
        if token.is_punct("*") {
            self.advance();
            return self.assignment(no_in).map(|_| ());
        }
        let ends = match token.kind {
            TokenKind::Eof | TokenKind::TemplateMiddle | TokenKind::TemplateTail => true,
            TokenKind::Punct => matches!(token.value.as_str(), ")" | "]" | "}" | "," | ";" | ":"),
            _ => false,
        };
        if ends {
            return Ok(());
        }
        self.assignment(no_in).map(|_| ())
    }

    fn conditional(&mut self, no_in: bool) -> Result<Shape, ExprSyntaxError> {
        let shape = self.binary(0, no_in)?;
        if !self.eat_punct("?") {
            return Ok(shape);
        }
        self.assignment(false)?;
        self.expect_punct(":")?;
        self.assignment(no_in)?;
        Ok(Shape::Other)
    }

    /// Precedence climbing over binary operators.
    fn binary(&mut self, min_precedence: u8, no_in: bool) -> Result<Shape, ExprSyntaxError> {
        let mut shape = self.unary()?;
        while let Some(precedence) = binary_precedence(self.current(), no_in) {
            if precedence <= min_precedence {
                break;
            }
            self.advance();
            // `**` is right-associative.
            let next_min = if precedence == 12 { precedence - 1 } else { precedence };
            self.binary(next_min, no_in)?;
            shape = Shape::Other;
        }
        Ok(shape)
    }

    fn unary(&mut self) -> Result<Shape, ExprSyntaxError> {
        let token = self.current().clone();
        let is_prefix_op = match token.kind {
            TokenKind::Punct => matches!(token.value.as_str(), "!" | "~" | "+" | "-"),
            TokenKind::Keyword => matches!(token.value.as_str(), "typeof" | "void" | "delete"),
            _ => false,
        };
        if is_prefix_op {
            self.advance();
            self.unary()?;
            return Ok(Shape::Other);
        }
        if token.is_punct("++") || token.is_punct("--") {
            self.advance();
            let start = self.current().start;
            let shape = self.unary()?;
            if !shape.is_simple_target() {
                return Err(self.error_at(
                    "Invalid left-hand side expression in prefix operation",
                    start,
                ));
            }
            return Ok(Shape::Other);
        }

        // `await` only binds like an operator inside async functions, which
        // are not tracked here: accept it wherever an operand follows.
        if token.is(TokenKind::Identifier, "await") && self.operand_follows() {
            self.advance();
            self.unary()?;
            return Ok(Shape::Other);
        }

        let start = token.start;
        let shape = self.left_hand_side()?;
        let next = self.current();
        if (next.is_punct("++") || next.is_punct("--")) && !next.newline_before {
            if !shape.is_simple_target() {
                return Err(self.error_at(
                    "Invalid left-hand side expression in postfix operation",
                    start,
                ));
            }
            self.advance();
            return Ok(Shape::Other);
        }
        Ok(shape)
    }

    fn operand_follows(&self) -> bool {
        let next = self.peek(1);
        if next.newline_before {
            return false;
        }
        match next.kind {
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::Regex
            | TokenKind::Template
            | TokenKind::TemplateHead => true,
            TokenKind::Keyword => matches!(
                next.value.as_str(),
                "this" | "new" | "function" | "class" | "null" | "true" | "false" | "typeof"
                    | "void" | "delete" | "super"
            ),
            _ => false,
        }
    }

    /// Member access, calls, `new` and tagged templates.
    fn left_hand_side(&mut self) -> Result<Shape, ExprSyntaxError> {
        let mut shape = if self.at_keyword("new") {
            self.new_expression()?
        } else {
            self.primary()?
        };
        let mut optional = false;

        loop {
            let token = self.current();
            if token.is_punct(".") {
                self.advance();
                self.identifier_name()?;
                shape = Shape::Member;
            } else if token.is_punct("?.") {
                self.advance();
                optional = true;
                if self.eat_punct("(") {
                    self.arguments()?;
                    shape = Shape::Call;
                } else if self.eat_punct("[") {
                    self.expression(false)?;
                    self.expect_punct("]")?;
                    shape = Shape::Member;
                } else {
                    self.identifier_name()?;
                    shape = Shape::Member;
                }
            } else if token.is_punct("[") {
                self.advance();
                self.expression(false)?;
                self.expect_punct("]")?;
                shape = Shape::Member;
            } else if token.is_punct("(") {
                self.advance();
                self.arguments()?;
                shape = Shape::Call;
            } else if matches!(token.kind, TokenKind::Template | TokenKind::TemplateHead) {
                if optional {
                    return Err(self.error_at(
                        "Invalid tagged template on optional chain",
                        token.start,
                    ));
                }
                self.template()?;
                shape = Shape::Call;
            } else {
                break;
            }
        }

        Ok(if optional { Shape::Optional } else { shape })
    }

    fn new_expression(&mut self) -> Result<Shape, ExprSyntaxError> {
        self.advance();
        if self.eat_punct(".") {
            if self.at_identifier("target") {
                self.advance();
                return Ok(Shape::Other);
            }
            return Err(self.unexpected());
        }
        if self.at_keyword("new") {
            self.new_expression()?;
        } else {
            self.primary()?;
        }
        loop {
            if self.eat_punct(".") {
                self.identifier_name()?;
            } else if self.eat_punct("[") {
                self.expression(false)?;
                self.expect_punct("]")?;
            } else if matches!(self.current().kind, TokenKind::Template | TokenKind::TemplateHead) {
                self.template()?;
            } else {
                break;
            }
        }
        if self.eat_punct("(") {
            self.arguments()?;
        }
        Ok(Shape::Other)
    }

    fn identifier_name(&mut self) -> Result<(), ExprSyntaxError> {
        match self.current().kind {
            TokenKind::Identifier | TokenKind::Keyword => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Call arguments after `(`, including the closing `)`.
    fn arguments(&mut self) -> Result<(), ExprSyntaxError> {
        while !self.eat_punct(")") {
            self.eat_punct("...");
            self.assignment(false)?;
            if !self.at_punct(")") {
                self.expect_punct(",")?;
            }
        }
        Ok(())
    }

    fn template(&mut self) -> Result<(), ExprSyntaxError> {
        if self.current().kind == TokenKind::Template {
            self.advance();
            return Ok(());
        }
        // TemplateHead
        self.advance();
        loop {
            self.expression(false)?;
            match self.current().kind {
                TokenKind::TemplateMiddle => self.advance(),
                TokenKind::TemplateTail => {
                    self.advance();
                    return Ok(());
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn primary(&mut self) -> Result<Shape, ExprSyntaxError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Identifier => {
                if token.value == "async"
                    && self.peek(1).is_keyword("function")
                    && !self.peek(1).newline_before
                {
                    self.advance();
                    self.function(false)?;
                    return Ok(Shape::Other);
                }
                self.advance();
                Ok(Shape::Identifier)
            }
            TokenKind::Number | TokenKind::String | TokenKind::Regex => {
                self.advance();
                Ok(Shape::Other)
            }
            TokenKind::Template | TokenKind::TemplateHead => {
                self.template()?;
                Ok(Shape::Other)
            }
            TokenKind::Keyword => match token.value.as_str() {
                "this" | "null" | "true" | "false" | "super" => {
                    self.advance();
                    Ok(if token.value == "super" {
                        Shape::Identifier
                    } else {
                        Shape::Other
                    })
                }
                "function" => {
                    self.function(false)?;
                    Ok(Shape::Other)
                }
                "class" => {
                    self.class(false)?;
                    Ok(Shape::Other)
                }
                _ => Err(self.unexpected()),
            },
            TokenKind::Punct => match token.value.as_str() {
                "(" => {
                    self.advance();
                    let shape = self.expression(false)?;
                    self.expect_punct(")")?;
                    // `(a) = 1` is fine, `({a}) = 1` is not.
                    Ok(match shape {
                        Shape::Identifier | Shape::Member => shape,
                        _ => Shape::Other,
                    })
                }
                "[" => {
                    self.array_literal()?;
                    Ok(Shape::Literal)
                }
                "{" => {
                    self.object_literal()?;
                    Ok(Shape::Literal)
                }
                _ => Err(self.unexpected()),
            },
            _ => Err(self.unexpected()),
        }
    }

    fn array_literal(&mut self) -> Result<(), ExprSyntaxError> {
        self.advance();
        while !self.eat_punct("]") {
            if self.eat_punct(",") {
                continue;
            }
            self.eat_punct("...");
            self.assignment(false)?;
            if !self.at_punct("]") {
                self.expect_punct(",")?;
            }
        }
        Ok(())
    }

    fn object_literal(&mut self) -> Result<(), ExprSyntaxError> {
        self.advance();
        while !self.eat_punct("}") {
            self.object_property()?;
            if !self.at_punct("}") {
                self.expect_punct(",")?;
            }
        }
        Ok(())
    }

    fn object_property(&mut self) -> Result<(), ExprSyntaxError> {
        if self.eat_punct("...") {
            self.assignment(false)?;
            return Ok(());
        }
        if let Some(generator) = self.method_prefix() {
            self.property_name()?;
            return self.function_rest(generator);
        }

        let token = self.current().clone();
        let next = self.peek(1);
        let shorthand = next.is_punct(",") || next.is_punct("}") || next.is_punct("=");
        if shorthand {
            if token.kind != TokenKind::Identifier || is_keyword(&token.value) {
                return Err(self.unexpected());
            }
            self.advance();
            // Only valid once the literal becomes a destructuring target.
            if self.eat_punct("=") {
                self.assignment(false)?;
            }
            return Ok(());
        }

        self.property_name()?;
        if self.at_punct("(") {
            return self.function_rest(false);
        }
        self.expect_punct(":")?;
        self.assignment(false)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body_error(exp: &str) -> String {
        validate_return_body(exp).unwrap_err().message
    }

    fn assert_valid(exp: &str) {
        if let Err(err) = validate_return_body(exp) {
            panic!("expected `{exp}` to be valid, got: {err}");
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    #[test]
    fn test_valid_expressions() {
        for exp in [
            "a",
            "a + b * c ** 2",
            "ok ? 'yes' : `no ${reason}`",
            "list.filter(x => x.done).length",
            "(a, b) => { return a + b }",
            "async (x) => await x",
            "obj?.deep?.[key]?.(arg)",
            "new Date().getTime()",
            "new Foo",
            "{ a: 1, 'b': [1, , 3], [k]: v, ...rest, m() { return 1 }, get g() { return 2 } }",
            "typeof x === 'undefined' || void 0",
            "/a|b/gi.test(s) && a / b",
            "'key' in $event && !(x instanceof Y)",
            "function (a, { b, c = 1 }, ...d) { return a }",
            "class extends Base { static x = 1; method() {} }",
            "x = y = 3",
            "a.b += 1",
            "i++",
            "--i",
            "[a, b] = [b, a]",
        ] {
            assert_valid(exp);
        }
    }

    #[test]
    fn test_generators() {
        assert_valid("function* g(){ yield 1 }");
        assert_valid("function *(){ yield; yield* other(); const x = yield a + 1 }");
        assert_valid("{ *items() { yield* this.list }, async *stream() { yield await next() } }");
        assert_valid("class A { *[Symbol.iterator]() { yield 1 } }");
        assert_valid("function* g(){ return [yield, (yield x)] }");
    }

    #[test]
    fn test_yield_is_an_identifier_outside_generators() {
        assert_valid("yield + 1");
        assert_eq!(body_error("function(){ yield 1 }"), "Unexpected number");
        assert_eq!(body_error("function*(){ return () => { yield 1 } }"), "Unexpected number");
    }

    #[test]
    fn test_division_after_postfix_update() {
        assert_valid("a++ / 2");
        assert_valid("i-- / n");
    }

    #[test]
    fn test_return_body_allows_trailing_statements() {
        assert_valid("a; b = 1");
        assert_valid("\n a\n b");
    }

    #[test]
    fn test_unexpected_identifier() {
        assert_eq!(body_error("a b"), "Unexpected identifier 'b'");
    }

    #[test]
    fn test_unexpected_end_of_input() {
        assert_eq!(body_error("a +"), "Unexpected end of input");
        assert_eq!(body_error("fn("), "Unexpected end of input");
    }

    #[test]
    fn test_unexpected_tokens() {
        assert_eq!(body_error("a )"), "Unexpected token ')'");
        assert_eq!(body_error("delete"), "Unexpected end of input");
        assert_eq!(body_error("1 2"), "Unexpected number");
        assert_eq!(body_error("a 'b'"), "Unexpected string");
    }

    #[test]
    fn test_keyword_as_identifier() {
        assert_eq!(body_error("foo.bar + typeof"), "Unexpected end of input");
        assert_eq!(body_error("var"), "Unexpected token 'var'");
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(body_error("a + 1 = 2"), "Invalid left-hand side in assignment");
        assert_eq!(body_error("a?.b = 1"), "Invalid left-hand side in assignment");
    }

    #[test]
    fn test_lexer_errors_surface() {
        assert_eq!(body_error("'abc"), "Invalid or unexpected token");
    }

    #[test]
    fn test_error_position_relative_to_expression() {
        let err = validate_return_body("a b").unwrap_err();
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_keyword_property_names() {
        assert_valid("{ class: a, default: b }.default");
        assert_eq!(body_error("{ class }"), "Unexpected token 'class'");
    }

    // =========================================================================
    // Statements
    // =========================================================================

    #[test]
    fn test_statements() {
        let code = "var $$a=x,$$el=$event.target,$$c=$$el.checked?(1):(0);\
                    if(Array.isArray($$a)){var $$v=null,$$i=_i($$a,$$v);\
                    if($$el.checked){$$i<0&&(x=$$a.concat([$$v]))}else{$$i>-1&&(x=$$a.slice(0,$$i).concat($$a.slice($$i+1)))}}\
                    else{x=$$c}";
        validate_function_body(code).unwrap();
        validate_function_body("for (let i = 0; i < 3; i++) { continue }").unwrap();
        validate_function_body("for (const k in obj) {} for (x of xs) ;").unwrap();
        validate_function_body("try { a() } catch (e) { throw e } finally {}").unwrap();
        validate_function_body("switch (a) { case 1: b(); break; default: c() }").unwrap();
        validate_function_body("label: while (true) break label").unwrap();
        validate_function_body("do x++; while (x < 3)").unwrap();
    }

    #[test]
    fn test_render_code_shape() {
        validate_function_body(
            r#"with(this){return _c('div',{attrs:{"id":"app"},on:{"click":function($event){$event.stopPropagation();return go($event)}}},[_v(_s(msg))],1)}"#,
        )
        .unwrap();
        validate_function_body(
            "with(this){return _c('div',{on:{\"keyup\":function($event){if(!$event.type.indexOf('key')&&_k($event.keyCode,\"enter\",13,$event.key,\"Enter\"))return null;return submit($event)}}})}",
        )
        .unwrap();
    }

    #[test]
    fn test_try_without_handler() {
        assert_eq!(
            validate_function_body("try {}").unwrap_err().message,
            "Missing catch or finally after try"
        );
    }

    #[test]
    fn test_throw_newline() {
        assert_eq!(
            validate_function_body("throw\nx").unwrap_err().message,
            "Illegal newline after throw"
        );
    }

    // =========================================================================
    // Bindings and parameters
    // =========================================================================

    #[test]
    fn test_bindings() {
        validate_binding("item").unwrap();
        validate_binding("{ id, name: label }").unwrap();
        validate_binding("[first, ...others]").unwrap();
        assert_eq!(validate_binding("a.b").unwrap_err().message, "Unexpected token '.'");
        assert_eq!(validate_binding("1a").unwrap_err().message, "Invalid or unexpected token");
        assert_eq!(validate_binding("this").unwrap_err().message, "Unexpected token 'this'");
    }

    #[test]
    fn test_params() {
        validate_params("").unwrap();
        validate_params("{ row }, index").unwrap();
        validate_params("a = 1, ...rest").unwrap();
        assert_eq!(validate_params("...a, b").unwrap_err().message, "Unexpected token ','");
        assert_eq!(validate_params("a b").unwrap_err().message, "Unexpected identifier 'b'");
        assert_eq!(validate_params("x.y").unwrap_err().message, "Unexpected token '.'");
    }
}
