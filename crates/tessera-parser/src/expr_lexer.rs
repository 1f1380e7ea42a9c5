//! Lexer for host (JavaScript) expressions.
//!
//! Produces the token stream the validator in [`crate::expr_parser`] checks.
//! Tokens carry their source text and byte positions but no decoded values:
//! nothing here ever evaluates an expression.
//!
//! Regular expression literals and template strings need context. A `/`
//! starts a regex wherever an operand is expected, judged from the previous
//! token, and a `}` that closes a `${` substitution resumes the template.
//!
//! # Examples
//!
//! ```
//! use tessera_parser::expr_lexer::{ExprLexer, TokenKind};
//!
//! let tokens = ExprLexer::tokenize("a / b + /re/g.test(c)").unwrap();
//! assert_eq!(tokens[1].value, "/");
//! assert_eq!(tokens[4].kind, TokenKind::Regex);
//! ```

use crate::ExprSyntaxError;

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    /// A reserved word, including the `null`/`true`/`false` literals.
    Keyword,
    Number,
    String,
    Regex,
    /// Template literal without substitutions: `` `abc` ``.
    Template,
    /// `` `abc${ ``
    TemplateHead,
    /// `}abc${`
    TemplateMiddle,
    /// `` }abc` ``
    TemplateTail,
    Punct,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token.
    pub value: String,
    pub start: usize,
    pub end: usize,
    /// A line terminator separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }

    pub fn is_punct(&self, value: &str) -> bool {
        self.is(TokenKind::Punct, value)
    }

    pub fn is_keyword(&self, value: &str) -> bool {
        self.is(TokenKind::Keyword, value)
    }
}

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with",
];

/// Longest match first.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

const REGEX_FLAGS: &str = "dgimsuyv";

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_id_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_id_part(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '$' | '\u{200c}' | '\u{200d}')
}

fn invalid_token(position: usize) -> ExprSyntaxError {
    ExprSyntaxError {
        message: "Invalid or unexpected token".to_string(),
        position,
    }
}

/// JavaScript tokenizer over a single source string.
pub struct ExprLexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    /// One entry per open `{`: `true` when it opened a template substitution.
    braces: Vec<bool>,
    last: Option<(TokenKind, String)>,
    /// The last `++`/`--` followed an operand, so it closed one.
    postfix_update: bool,
}

impl<'a> ExprLexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            braces: Vec::new(),
            last: None,
            postfix_update: false,
        }
    }

    /// Tokenize the whole source. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprSyntaxError> {
        let mut lexer = ExprLexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, ExprSyntaxError> {
        let newline_before = self.skip_trivia()?;
        let start = self.offset();

        let Some(ch) = self.current() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                value: String::new(),
                start,
                end: start,
                newline_before,
            });
        };

        let kind = match ch {
            '"' | '\'' => self.read_string(ch)?,
            '`' => {
                self.advance();
                self.read_template_chars(true)?
            }
            '}' if self.braces.last() == Some(&true) => {
                self.braces.pop();
                self.advance();
                self.read_template_chars(false)?
            }
            '0'..='9' => self.read_number()?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            '/' if self.regex_allowed() => self.read_regex()?,
            c if is_id_start(c) => self.read_word(),
            _ => self.read_punct()?,
        };

        let end = self.offset();
        let value = self.source[start..end].to_string();
        if kind == TokenKind::Punct && matches!(value.as_str(), "++" | "--") {
            self.postfix_update = !self.regex_allowed();
        }
        self.last = Some((kind, value.clone()));
        Ok(Token {
            kind,
            value,
            start,
            end,
            newline_before,
        })
    }

    // --- Context ---

    fn regex_allowed(&self) -> bool {
        let Some((kind, value)) = &self.last else {
            return true;
        };
        match kind {
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::Regex
            | TokenKind::Template
            | TokenKind::TemplateTail => false,
            TokenKind::Keyword => !matches!(
                value.as_str(),
                "this" | "super" | "null" | "true" | "false"
            ),
            TokenKind::Punct => match value.as_str() {
                ")" | "]" | "}" => false,
                "++" | "--" => !self.postfix_update,
                _ => true,
            },
            TokenKind::TemplateHead | TokenKind::TemplateMiddle | TokenKind::Eof => true,
        }
    }

    // --- Scanners ---

    /// Skip whitespace and comments, reporting whether a line break was seen.
    fn skip_trivia(&mut self) -> Result<bool, ExprSyntaxError> {
        let mut newline = false;
        while let Some(ch) = self.current() {
            if is_line_terminator(ch) {
                newline = true;
                self.advance();
            } else if ch.is_whitespace() || ch == '\u{feff}' {
                self.advance();
            } else if ch == '/' && self.peek() == Some('/') {
                while self.current().is_some_and(|c| !is_line_terminator(c)) {
                    self.advance();
                }
            } else if ch == '/' && self.peek() == Some('*') {
                let start = self.offset();
                self.advance_n(2);
                loop {
                    match self.current() {
                        None => return Err(invalid_token(start)),
                        Some('*') if self.peek() == Some('/') => {
                            self.advance_n(2);
                            break;
                        }
                        Some(c) => {
                            newline |= is_line_terminator(c);
                            self.advance();
                        }
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    fn read_string(&mut self, quote: char) -> Result<TokenKind, ExprSyntaxError> {
        let start = self.offset();
        self.advance();
        loop {
            match self.current() {
                None => return Err(invalid_token(start)),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(TokenKind::String);
                }
                Some('\\') => {
                    self.advance();
                    // Escaped line breaks are line continuations.
                    if self.current() == Some('\r') && self.peek() == Some('\n') {
                        self.advance();
                    }
                    if self.current().is_none() {
                        return Err(invalid_token(start));
                    }
                    self.advance();
                }
                Some('\n' | '\r') => return Err(invalid_token(start)),
                Some(_) => self.advance(),
            }
        }
    }

    /// Template characters up to the closing backtick or the next `${`.
    /// `fresh` is set when the template starts at a backtick.
    fn read_template_chars(&mut self, fresh: bool) -> Result<TokenKind, ExprSyntaxError> {
        let start = self.offset();
        loop {
            match self.current() {
                None => {
                    return Err(ExprSyntaxError {
                        message: "Unterminated template literal".to_string(),
                        position: start,
                    })
                }
                Some('`') => {
                    self.advance();
                    return Ok(if fresh {
                        TokenKind::Template
                    } else {
                        TokenKind::TemplateTail
                    });
                }
                Some('$') if self.peek() == Some('{') => {
                    self.advance_n(2);
                    self.braces.push(true);
                    return Ok(if fresh {
                        TokenKind::TemplateHead
                    } else {
                        TokenKind::TemplateMiddle
                    });
                }
                Some('\\') => self.advance_n(2),
                Some(_) => self.advance(),
            }
        }
    }

    fn read_number(&mut self) -> Result<TokenKind, ExprSyntaxError> {
        let start = self.offset();
        let radix = match (self.current(), self.peek()) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.advance_n(2);
            if self.eat_digits(radix) == 0 {
                return Err(invalid_token(start));
            }
            self.eat('n');
        } else {
            let mut integer = self.eat_digits(10) > 0;
            if self.eat('.') {
                integer = false;
                self.eat_digits(10);
            }
            if matches!(self.current(), Some('e' | 'E')) {
                integer = false;
                self.advance();
                if matches!(self.current(), Some('+' | '-')) {
                    self.advance();
                }
                if self.eat_digits(10) == 0 {
                    return Err(invalid_token(start));
                }
            }
            if integer {
                self.eat('n');
            }
        }

        // `3in`, `1.2.3` and friends.
        if self
            .current()
            .is_some_and(|c| is_id_start(c) || c.is_ascii_digit())
        {
            return Err(invalid_token(start));
        }
        Ok(TokenKind::Number)
    }

    fn eat_digits(&mut self, radix: u32) -> usize {
        let mut count = 0;
        while let Some(c) = self.current() {
            if c.is_digit(radix) {
                count += 1;
            } else if c != '_' || count == 0 {
                break;
            }
            self.advance();
        }
        count
    }

    fn read_regex(&mut self) -> Result<TokenKind, ExprSyntaxError> {
        let start = self.offset();
        let missing_slash = || ExprSyntaxError {
            message: "Invalid regular expression: missing /".to_string(),
            position: start,
        };
        self.advance();
        let mut in_class = false;
        loop {
            match self.current() {
                None => return Err(missing_slash()),
                Some(c) if is_line_terminator(c) => return Err(missing_slash()),
                Some('\\') => {
                    self.advance();
                    if self.current().is_none_or(is_line_terminator) {
                        return Err(missing_slash());
                    }
                    self.advance();
                }
                Some('[') => {
                    in_class = true;
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    self.advance();
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
            }
        }

        let flags_start = self.offset();
        while self.current().is_some_and(is_id_part) {
            self.advance();
        }
        let flags = &self.source[flags_start..self.offset()];
        let duplicate = flags
            .char_indices()
            .any(|(i, c)| flags[i + c.len_utf8()..].contains(c));
        if duplicate || flags.chars().any(|c| !REGEX_FLAGS.contains(c)) {
            return Err(ExprSyntaxError {
                message: "Invalid regular expression flags".to_string(),
                position: flags_start,
            });
        }
        Ok(TokenKind::Regex)
    }

    fn read_word(&mut self) -> TokenKind {
        let start = self.offset();
        while self.current().is_some_and(is_id_part) {
            self.advance();
        }
        if is_keyword(&self.source[start..self.offset()]) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        }
    }

    fn read_punct(&mut self) -> Result<TokenKind, ExprSyntaxError> {
        let start = self.offset();
        let rest = &self.source[start..];
        let Some(punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) else {
            return Err(invalid_token(start));
        };
        // `a?.5:b` is a conditional, not optional chaining.
        let punct = if *punct == "?."
            && rest[2..].chars().next().is_some_and(|c| c.is_ascii_digit())
        {
            "?"
        } else {
            punct
        };
        match punct {
            "{" => self.braces.push(false),
            "}" => {
                self.braces.pop();
            }
            _ => {}
        }
        self.advance_n(punct.chars().count());
        Ok(TokenKind::Punct)
    }

    // --- Cursor ---

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.current() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }
}
