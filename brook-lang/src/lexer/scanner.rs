//! Lexer implementation

use super::token::*;
use brook_core::Number;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Start position of the token being scanned.
#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    column: usize,
}

/// Lexer for BROOK source text.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.mark();

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '%' => self.single(TokenKind::Percent),
                '^' => self.single(TokenKind::Caret),

                '/' => match self.peek_next_char() {
                    Some('/') => self.scan_line_comment(),
                    Some('*') => self.scan_block_comment(start)?,
                    _ => self.single(TokenKind::Slash),
                },

                '=' => self.with_eq(TokenKind::Assign, TokenKind::Eq),
                '!' => self.with_eq(TokenKind::Not, TokenKind::Ne),
                '<' => self.with_eq(TokenKind::Lt, TokenKind::Le),
                '>' => self.with_eq(TokenKind::Gt, TokenKind::Ge),

                '&' | '|' => {
                    self.advance();
                    if self.peek_char() == Some(c) {
                        self.advance();
                        if c == '&' {
                            TokenKind::And
                        } else {
                            TokenKind::Or
                        }
                    } else {
                        return Err(self.error(start, format!("Unexpected character: {}", c)));
                    }
                }

                '"' => self.scan_string(start)?,

                c if c.is_ascii_digit() => self.scan_number(start)?,

                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

                c => {
                    self.advance();
                    return Err(self.error(start, format!("Unexpected character: {}", c)));
                }
            },
        };

        Ok(Token {
            kind,
            text: self.source[start.pos..self.pos].to_string(),
            span: self.span_from(start),
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// One-character operator, or its two-character `=` suffixed form.
    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_char() == Some('=') {
            self.advance();
            with_eq
        } else {
            plain
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        match &self.source[start..self.pos] {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "null" => TokenKind::Null,
            ident => TokenKind::Identifier(ident.to_string()),
        }
    }

    /// Scan a string literal with escape sequences.
    fn scan_string(&mut self, start: Mark) -> Result<TokenKind, LexError> {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(self.error(start, "Unterminated string")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('a') => '\u{07}',
                        Some('b') => '\u{08}',
                        Some('f') => '\u{0C}',
                        Some('v') => '\u{0B}',
                        Some('u') => self.scan_code_point(start, 4)?,
                        Some('U') => self.scan_code_point(start, 8)?,
                        Some(c) => {
                            return Err(self.error(start, format!("Invalid escape sequence: \\{}", c)))
                        }
                        None => return Err(self.error(start, "Unterminated string")),
                    };
                    value.push(escaped);
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        Ok(TokenKind::String(value))
    }

    fn scan_code_point(&mut self, start: Mark, digits: usize) -> Result<char, LexError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .peek_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error(start, "Invalid unicode escape"))?;
            self.advance();
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error(start, format!("Invalid code point: {:#x}", code)))
    }

    /// Scan a number literal: digits, optional fraction, optional exponent.
    fn scan_number(&mut self, start: Mark) -> Result<TokenKind, LexError> {
        let mut is_float = false;
        self.consume_digits();

        if self.peek_char() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            self.consume_digits();
        }

        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let has_exponent = match self.peek_nth(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                is_float = true;
                self.advance();
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.advance();
                }
                self.consume_digits();
            }
        }

        if let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.advance();
                return Err(self.error(
                    start,
                    format!("Invalid number: {}", &self.source[start.pos..self.pos]),
                ));
            }
        }

        let text = &self.source[start.pos..self.pos];
        let number = if is_float {
            text.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Number::Float)
        } else if let Ok(i) = text.parse::<i64>() {
            Some(Number::Int(i))
        } else {
            text.parse::<u64>().ok().map(Number::Uint)
        };

        number
            .map(TokenKind::Number)
            .ok_or_else(|| self.error(start, format!("Invalid number: {}", text)))
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn scan_line_comment(&mut self) -> TokenKind {
        self.advance(); // /
        self.advance(); // /
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        TokenKind::Comment(self.source[start..self.pos].trim_end().to_string())
    }

    fn scan_block_comment(&mut self, start: Mark) -> Result<TokenKind, LexError> {
        self.advance(); // /
        self.advance(); // *
        let body_start = self.pos;
        loop {
            match self.peek_char() {
                None => return Err(self.error(start, "Unterminated block comment")),
                Some('*') if self.peek_next_char() == Some('/') => {
                    let body = self.source[body_start..self.pos].to_string();
                    self.advance();
                    self.advance();
                    return Ok(TokenKind::Comment(body));
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip whitespace.
    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r' | '\n') = self.peek_char() {
            self.advance();
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn span_from(&self, start: Mark) -> Span {
        Span {
            start: start.pos,
            end: self.pos,
            line: start.line,
            column: start.column,
        }
    }

    fn error(&self, start: Mark, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            span: self.span_from(start),
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        self.peek_nth(1)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(c)
        } else {
            None
        }
    }
}

/// Tokenize source text, dropping comments.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let tokens = Lexer::new(source).tokenize()?;
    Ok(tokens
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Comment(_)))
        .collect())
}
