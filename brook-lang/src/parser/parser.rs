//! Recursive-descent parser producing [`File`] and [`Expr`] trees.

use super::ast::*;
use crate::lexer::{Span, Token, TokenKind};
use serde::{Deserialize, Serialize};

// ============================================================================
// PARSE ERROR
// ============================================================================

/// Parse error: what the parser wanted and what it found instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub span: Span,
    pub expected: String,
    pub got: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: expected {}, got {}",
            self.span.line, self.span.column, self.expected, self.got
        )
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// PARSER
// ============================================================================

/// Deepest nesting of blocks and expressions the parser accepts.
pub const MAX_NESTING: usize = 64;

/// Parser over a token stream. Comment tokens are dropped on construction.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Create a new parser from a vector of tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Comment(_)))
            .collect();
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                span,
            });
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse every statement up to end of input.
    pub fn parse_file(&mut self, name: impl Into<String>) -> Result<File, ParseError> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_stmt()?);
        }
        Ok(File {
            name: name.into(),
            body,
        })
    }

    /// Parse a single expression that must span the whole input.
    pub fn parse_standalone_expr(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if !self.is_at_end() {
            return Err(self.error("end of expression"));
        }
        Ok(expr)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let first = self.expect_ident("statement name")?;
        let mut name = vec![first.name];
        let name_span = first.span;
        let mut name_end = first.span;

        while self.check(&TokenKind::Dot) {
            self.advance();
            let part = self.expect_ident("identifier")?;
            name_end = part.span;
            name.push(part.name);
        }

        if self.check(&TokenKind::Assign) {
            if name.len() > 1 {
                return Err(self.error("block label or '{' after dotted name"));
            }
            self.advance();
            let value = self.parse_expr()?;
            return Ok(Stmt::Attribute(AttributeStmt {
                name: Ident {
                    name: name.remove(0),
                    span: name_span,
                },
                value,
            }));
        }

        let label = match &self.current().kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        };

        if !self.check(&TokenKind::LBrace) {
            let expected = if label.is_some() { "'{'" } else { "'=' or '{'" };
            return Err(self.error(expected));
        }
        self.advance();

        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.error("'}'"));
            }
            body.push(self.nested(Self::parse_stmt)?);
        }
        let close = self.current().span;
        self.advance();

        Ok(Stmt::Block(BlockStmt {
            name,
            name_span: name_span.to(name_end),
            label,
            body,
            span: name_span.to(close),
        }))
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(|p| p.parse_binary_level(BinaryOp::Or.precedence()))
    }

    /// Left-associative levels from `||` up to `*`; `^` is handled by
    /// [`Self::parse_power`].
    fn parse_binary_level(&mut self, level: u8) -> Result<Expr, ParseError> {
        if level >= BinaryOp::Pow.precedence() {
            return self.parse_power();
        }

        let mut left = self.parse_binary_level(level + 1)?;
        while let Some(op) = self.binary_op().filter(|op| op.precedence() == level) {
            self.advance();
            let right = self.parse_binary_level(level + 1)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_unary()?;
        if self.check(&TokenKind::Caret) {
            self.advance();
            let exponent = self.nested(Self::parse_power)?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current().kind {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let start = self.current().span;
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            span: start.to(operand.span()),
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_ident("field name")?;
                    expr = Expr::Access {
                        span: expr.span().to(name.span),
                        base: Box::new(expr),
                        name,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let close = self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index {
                        span: expr.span().to(close),
                        base: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::LParen => {
                    let callee = match expr.as_path() {
                        Some(path) => path,
                        None => return Err(self.error("operator or end of expression")),
                    };
                    self.advance();
                    let (args, close) =
                        self.parse_list(TokenKind::RParen, |p| p.parse_expr())?;
                    expr = Expr::Call {
                        callee,
                        args,
                        span: expr.span().to(close),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        let literal = match &token.kind {
            TokenKind::Null => Some(Literal::Null),
            TokenKind::Bool(b) => Some(Literal::Bool(*b)),
            TokenKind::Number(n) => Some(Literal::Number(*n)),
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return Ok(Expr::Literal {
                value,
                span: token.span,
            });
        }

        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Ident(Ident {
                    name,
                    span: token.span,
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                let close = self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren {
                    inner: Box::new(inner),
                    span: token.span.to(close),
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let (elements, close) =
                    self.parse_list(TokenKind::RBracket, |p| p.parse_expr())?;
                Ok(Expr::Array {
                    elements,
                    span: token.span.to(close),
                })
            }
            TokenKind::LBrace => {
                self.advance();
                let (fields, close) =
                    self.parse_list(TokenKind::RBrace, |p| p.parse_object_field())?;
                Ok(Expr::Object {
                    fields,
                    span: token.span.to(close),
                })
            }
            _ => Err(self.error("expression")),
        }
    }

    fn parse_object_field(&mut self) -> Result<ObjectField, ParseError> {
        let token = self.current().clone();
        let (name, quoted) = match token.kind {
            TokenKind::Identifier(name) => (name, false),
            TokenKind::String(name) => (name, true),
            _ => return Err(self.error("object key")),
        };
        self.advance();
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        Ok(ObjectField {
            name: Ident {
                name,
                span: token.span,
            },
            quoted,
            value,
        })
    }

    /// Comma-separated items up to `close`, trailing comma allowed.
    /// Returns the items and the span of the closing token.
    fn parse_list<T>(
        &mut self,
        close: TokenKind,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<(Vec<T>, Span), ParseError> {
        let mut items = Vec::new();
        loop {
            if self.check(&close) {
                break;
            }
            items.push(item(self)?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&close) {
                return Err(self.error(&format!("',' or '{}'", close.symbol())));
            }
        }
        let span = self.expect(close)?;
        Ok((items, span))
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        let op = match self.current().kind {
            TokenKind::Or => BinaryOp::Or,
            TokenKind::And => BinaryOp::And,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::Caret => BinaryOp::Pow,
            _ => return None,
        };
        Some(op)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(&format!("at most {} levels of nesting", MAX_NESTING)));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    /// Consume a token of `kind`, returning its span.
    fn expect(&mut self, kind: TokenKind) -> Result<Span, ParseError> {
        if self.check(&kind) {
            let span = self.current().span;
            self.advance();
            Ok(span)
        } else {
            Err(self.error(&kind.describe()))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<Ident, ParseError> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let ident = Ident {
                    name: name.clone(),
                    span: self.current().span,
                };
                self.advance();
                Ok(ident)
            }
            _ => Err(self.error(what)),
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError {
            span: token.span,
            expected: expected.to_string(),
            got: token.kind.describe(),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        span: left.span().to(right.span()),
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use brook_core::Number;

    fn parse(source: &str) -> Result<File, ParseError> {
        let tokens = Lexer::new(source).tokenize().map_err(|e| ParseError {
            span: e.span,
            expected: "valid token".to_string(),
            got: e.message,
        })?;
        Parser::new(tokens).parse_file("test.brook")
    }

    fn expr(source: &str) -> Expr {
        match parse(&format!("x = {}", source)) {
            Ok(file) => match file.body.into_iter().next() {
                Some(Stmt::Attribute(attr)) => attr.value,
                other => panic!("expected attribute, got {:?}", other),
            },
            Err(e) => panic!("parse failed: {}", e),
        }
    }

    fn num(n: i64) -> Literal {
        Literal::Number(Number::Int(n))
    }

    /// Render the operator structure with explicit grouping.
    fn shape(e: &Expr) -> String {
        match e {
            Expr::Literal { value: Literal::Number(n), .. } => n.to_string(),
            Expr::Literal { value, .. } => format!("{:?}", value),
            Expr::Ident(ident) => ident.name.clone(),
            Expr::Binary {
                op, left, right, ..
            } => format!("({} {} {})", shape(left), op.symbol(), shape(right)),
            Expr::Unary { op, operand, .. } => format!("({}{})", op.symbol(), shape(operand)),
            Expr::Paren { inner, .. } => format!("[{}]", shape(inner)),
            Expr::Array { elements, .. } => format!(
                "<{}>",
                elements.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            Expr::Access { base, name, .. } => format!("{}.{}", shape(base), name.name),
            Expr::Index { base, index, .. } => format!("{}[{}]", shape(base), shape(index)),
            Expr::Call { callee, args, .. } => format!(
                "{}({})",
                callee,
                args.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
            other => format!("{:?}", other),
        }
    }

    #[test]
    fn test_parse_attribute_and_block() -> Result<(), ParseError> {
        let file = parse(
            r#"
            log_level = "debug"

            loki.write "default" {
                endpoint {
                    url = "http://localhost:3100"
                }
            }
            "#,
        )?;

        assert_eq!(file.body.len(), 2);
        match &file.body[1] {
            Stmt::Block(block) => {
                assert_eq!(block.name, vec!["loki", "write"]);
                assert_eq!(block.label.as_deref(), Some("default"));
                assert_eq!(block.body.len(), 1);
                assert_eq!(block.body[0].name(), "endpoint");
            }
            other => panic!("expected block, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_parse_empty_block() -> Result<(), ParseError> {
        let file = parse("inner { }")?;
        assert!(matches!(&file.body[0], Stmt::Block(b) if b.body.is_empty() && b.label.is_none()));
        Ok(())
    }

    #[test]
    fn test_parse_precedence() {
        assert_eq!(shape(&expr("1 + 2 * 3")), "(1 + (2 * 3))");
        assert_eq!(shape(&expr("1 - 2 - 3")), "((1 - 2) - 3)");
        assert_eq!(shape(&expr("2 ^ 3 ^ 2")), "(2 ^ (3 ^ 2))");
        assert_eq!(shape(&expr("-2 ^ 2")), "((-2) ^ 2)");
        assert_eq!(
            shape(&expr("a || b && c == d")),
            "(a || (b && (c == d)))"
        );
        assert_eq!(shape(&expr("!a && b")), "((!a) && b)");
        assert_eq!(shape(&expr("(1 + 2) * 3")), "([(1 + 2)] * 3)");
    }

    #[test]
    fn test_parse_postfix() {
        assert_eq!(shape(&expr("a.b[0].c")), "a.b[0].c");
        assert_eq!(
            shape(&expr("env.lookup(\"HOME\", 1)")),
            "env.lookup(\"HOME\", 1)"
        );
        assert_eq!(shape(&expr("concat([1], [2])[0]")), "concat(<1>, <2>)[0]");
    }

    #[test]
    fn test_parse_collections() {
        match expr(r#"{ a = 1, "b-c" = [1, 2,], }"#) {
            Expr::Object { fields, .. } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].name.name, "a");
                assert!(!fields[0].quoted);
                assert_eq!(fields[1].name.name, "b-c");
                assert!(fields[1].quoted);
                assert!(matches!(&fields[1].value, Expr::Array { elements, .. } if elements.len() == 2));
            }
            other => panic!("expected object, got {:?}", other),
        }

        match expr("[]") {
            Expr::Array { elements, .. } => assert!(elements.is_empty()),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_literals() {
        assert!(matches!(expr("null"), Expr::Literal { value: Literal::Null, .. }));
        assert!(matches!(expr("true"), Expr::Literal { value: Literal::Bool(true), .. }));
        assert_eq!(
            match expr("42") {
                Expr::Literal { value, .. } => value,
                other => panic!("{:?}", other),
            },
            num(42)
        );
    }

    #[test]
    fn test_parse_skips_comments() -> Result<(), ParseError> {
        let file = parse("// header\na = 1 /* trailing */\n")?;
        assert_eq!(file.body.len(), 1);
        Ok(())
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("a.b = 1", "block label or '{'"),
            ("a = ", "expression"),
            ("block {", "'}'"),
            ("a = [1 2]", "',' or ']'"),
            ("a = { b 1 }", "'='"),
            ("a = (1 + 2)(3)", "operator or end of expression"),
            ("\"label\" {}", "statement name"),
            ("name \"label\" = 1", "'{'"),
        ];
        for (source, expected) in cases {
            match parse(source) {
                Err(e) => assert!(
                    e.expected.contains(expected),
                    "{:?}: expected {:?}, got {:?}",
                    source,
                    expected,
                    e
                ),
                Ok(file) => panic!("{:?} parsed to {:?}", source, file),
            }
        }
    }

    #[test]
    fn test_parse_nesting_limit() {
        let nested = |depth: usize| format!("a = {}1{}", "[".repeat(depth), "]".repeat(depth));
        assert!(parse(&nested(MAX_NESTING / 2)).is_ok());

        for source in [
            nested(100_000),
            format!("a = {}1", "-".repeat(100_000)),
            format!("a = 2{}", "^2".repeat(100_000)),
            format!("{}{}", "b {\n".repeat(100_000), "}\n".repeat(100_000)),
        ] {
            match parse(&source) {
                Err(e) => assert!(e.expected.contains("levels of nesting"), "{:?}", e),
                Ok(_) => panic!("deeply nested input parsed"),
            }
        }
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse("a = 1\nb = ]").err();
        let err = match err {
            Some(e) => e,
            None => panic!("expected error"),
        };
        assert_eq!((err.span.line, err.span.column), (2, 5));
        assert_eq!(err.got, "']'");
    }
}
