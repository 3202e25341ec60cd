//! Tokenizer for the TypeScript subset.
//!
//! Template literals are lexed eagerly: each `${ ... }` segment is tokenized
//! into its own token list so the parser can treat it as an expression.

use kit::helpers::location::Position;

use crate::errors::EvalError;

/// Multi-character punctuators, longest first.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "...", "?.", "??", "=>", "==", "!=", "<=", ">=", "&&", "||", "{", "}", "(", ")",
    "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%", "!", "?", ":", ".", "=", "|", "&",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    /// Literal chunks interleaved with tokenized `${}` segments:
    /// `quasis.len() == exprs.len() + 1`.
    Template { quasis: Vec<String>, exprs: Vec<Vec<Token>> },
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn is_punct(&self, punct: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(p) if *p == punct)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(ident) if ident == name)
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(ident) => format!("'{}'", ident),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(s) => format!("string {:?}", s),
            TokenKind::Template { .. } => "template literal".into(),
            TokenKind::Punct(p) => format!("'{}'", p),
            TokenKind::Eof => "end of input".into(),
        }
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer { chars: source.chars().collect(), pos: 0, line: 1, column: 1 }
    }

    /// Tokenizes the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = self.tokens_until(false)?;
        tokens.push(Token { kind: TokenKind::Eof, position: self.position() });
        Ok(tokens)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::parse(message, Some(self.position()))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn skip_trivia(&mut self) -> Result<(), EvalError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.advance() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.position();
                    self.advance();
                    self.advance();
                    loop {
                        if self.starts_with("*/") {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.advance().is_none() {
                            return Err(EvalError::parse("unterminated comment", Some(start)));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Lexes tokens until end of input, or until the `}` closing a template
    /// substitution when `in_template` is set.
    fn tokens_until(&mut self, in_template: bool) -> Result<Vec<Token>, EvalError> {
        let mut tokens = vec![];
        let mut depth = 0usize;
        loop {
            self.skip_trivia()?;
            let position = self.position();
            let Some(c) = self.peek() else {
                if in_template {
                    return Err(self.error("unterminated template substitution"));
                }
                return Ok(tokens);
            };

            let kind = if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
                self.lex_number()?
            } else if c == '"' || c == '\'' {
                self.lex_string(c)?
            } else if c == '`' {
                self.lex_template()?
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                let mut ident = String::new();
                while let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '$' {
                        ident.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                TokenKind::Ident(ident)
            } else {
                let Some(punct) = PUNCTUATORS.iter().find(|p| self.starts_with(p)) else {
                    return Err(self.error(format!("unexpected character '{}'", c)));
                };
                if in_template {
                    match *punct {
                        "{" => depth += 1,
                        "}" if depth == 0 => {
                            self.advance();
                            return Ok(tokens);
                        }
                        "}" => depth -= 1,
                        _ => {}
                    }
                }
                for _ in 0..punct.len() {
                    self.advance();
                }
                TokenKind::Punct(*punct)
            };
            tokens.push(Token { kind, position });
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, EvalError> {
        let mut text = String::new();
        if self.starts_with("0x") || self.starts_with("0X") {
            self.advance();
            self.advance();
            while let Some(c) = self.peek().filter(|c| c.is_ascii_hexdigit() || *c == '_') {
                if c != '_' {
                    text.push(c);
                }
                self.advance();
            }
            return i64::from_str_radix(&text, 16)
                .map(|n| TokenKind::Number(n as f64))
                .map_err(|_| self.error("invalid hex literal"));
        }
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-') && text.ends_with(['e', 'E']);
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                text.push(c);
                self.advance();
            } else if c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("invalid number literal '{}'", text)))
    }

    fn lex_escape(&mut self) -> Result<char, EvalError> {
        let Some(c) = self.advance() else {
            return Err(self.error("unterminated escape sequence"));
        };
        let escaped = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'u' => {
                let mut hex = String::new();
                for _ in 0..4 {
                    match self.advance() {
                        Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                        _ => return Err(self.error("invalid unicode escape")),
                    }
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("invalid unicode escape"))?
            }
            other => other,
        };
        Ok(escaped)
    }

    fn lex_string(&mut self, quote: char) -> Result<TokenKind, EvalError> {
        let start = self.position();
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => return Ok(TokenKind::Str(value)),
                Some('\\') => value.push(self.lex_escape()?),
                Some('\n') | None => return Err(EvalError::parse("unterminated string literal", Some(start))),
                Some(c) => value.push(c),
            }
        }
    }

    fn lex_template(&mut self) -> Result<TokenKind, EvalError> {
        let start = self.position();
        self.advance();
        let mut quasis = vec![];
        let mut exprs = vec![];
        let mut current = String::new();
        loop {
            if self.starts_with("${") {
                self.advance();
                self.advance();
                quasis.push(std::mem::take(&mut current));
                exprs.push(self.tokens_until(true)?);
                continue;
            }
            match self.advance() {
                Some('`') => break,
                Some('\\') => current.push(self.lex_escape()?),
                Some(c) => current.push(c),
                None => return Err(EvalError::parse("unterminated template literal", Some(start))),
            }
        }
        quasis.push(current);
        Ok(TokenKind::Template { quasis, exprs })
    }
}
