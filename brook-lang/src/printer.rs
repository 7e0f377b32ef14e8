//! Canonical text rendering of BROOK syntax trees.
//!
//! Shared by the builder and by `format`. Layout rules:
//! - one statement per line, body indented one level per block;
//! - `=` aligned across consecutive attributes and object keys;
//! - empty blocks as `name { }`;
//! - arrays of scalars inline, other non-empty collections one entry per
//!   line with a trailing comma;
//! - a blank line between top-level statements next to a block.

use crate::lexer::is_identifier;
use crate::parser::*;
use brook_core::Number;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Indentation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indent {
    Tabs,
    Spaces(usize),
}

impl Indent {
    fn unit(self) -> String {
        match self {
            Indent::Tabs => "\t".to_string(),
            Indent::Spaces(n) => " ".repeat(n),
        }
    }
}

/// Printer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    pub indent: Indent,
    /// Pad names so `=` lines up across consecutive attributes.
    pub align_equals: bool,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            indent: Indent::Tabs,
            align_equals: true,
        }
    }
}

// ============================================================================
// PRINTER
// ============================================================================

struct Printer<'a> {
    unit: String,
    config: &'a PrintConfig,
    out: String,
}

impl<'a> Printer<'a> {
    fn new(config: &'a PrintConfig) -> Self {
        Self {
            unit: config.indent.unit(),
            config,
            out: String::new(),
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(&self.unit);
        }
    }

    fn body(&mut self, stmts: &[Stmt], depth: usize, top_level: bool) {
        let mut i = 0;
        while i < stmts.len() {
            if i > 0 && top_level {
                let prev_block = matches!(stmts[i - 1], Stmt::Block(_));
                let this_block = matches!(stmts[i], Stmt::Block(_));
                if prev_block || this_block {
                    self.out.push('\n');
                }
            }

            match &stmts[i] {
                Stmt::Block(block) => {
                    self.block(block, depth);
                    i += 1;
                }
                Stmt::Attribute(_) => {
                    // Run of consecutive attributes shares one `=` column.
                    let run_end = stmts[i..]
                        .iter()
                        .position(|s| matches!(s, Stmt::Block(_)))
                        .map_or(stmts.len(), |n| i + n);
                    let width = stmts[i..run_end]
                        .iter()
                        .map(|s| s.name().chars().count())
                        .max()
                        .unwrap_or(0);
                    for stmt in &stmts[i..run_end] {
                        if let Stmt::Attribute(attr) = stmt {
                            self.attribute(attr, width, depth);
                        }
                    }
                    i = run_end;
                }
            }
        }
    }

    fn attribute(&mut self, attr: &AttributeStmt, width: usize, depth: usize) {
        self.indent(depth);
        self.key(&attr.name.name, false, width);
        self.out.push_str(" = ");
        self.expr(&attr.value, depth);
        self.out.push('\n');
    }

    fn block(&mut self, block: &BlockStmt, depth: usize) {
        self.indent(depth);
        self.out.push_str(&block.full_name());
        if let Some(label) = &block.label {
            self.out.push_str(&format!(" \"{}\"", escape_string(label)));
        }
        if block.body.is_empty() {
            self.out.push_str(" { }\n");
            return;
        }
        self.out.push_str(" {\n");
        self.body(&block.body, depth + 1, false);
        self.indent(depth);
        self.out.push_str("}\n");
    }

    fn key(&mut self, name: &str, quoted: bool, width: usize) {
        let start = self.out.len();
        if quoted || !is_identifier(name) {
            self.out.push_str(&format!("\"{}\"", escape_string(name)));
        } else {
            self.out.push_str(name);
        }
        if self.config.align_equals {
            let written = self.out[start..].chars().count();
            for _ in written..width {
                self.out.push(' ');
            }
        }
    }

    fn expr(&mut self, expr: &Expr, depth: usize) {
        match expr {
            Expr::Literal { value, .. } => self.literal(value),
            Expr::Ident(ident) => self.out.push_str(&ident.name),
            Expr::Access { base, name, .. } => {
                self.operand(base, u8::MAX, depth);
                self.out.push('.');
                self.out.push_str(&name.name);
            }
            Expr::Index { base, index, .. } => {
                self.operand(base, u8::MAX, depth);
                self.out.push('[');
                self.expr(index, depth);
                self.out.push(']');
            }
            Expr::Call { callee, args, .. } => {
                self.out.push_str(callee);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(arg, depth);
                }
                self.out.push(')');
            }
            Expr::Unary { op, operand, .. } => {
                self.out.push_str(op.symbol());
                self.operand(operand, u8::MAX, depth);
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                let prec = op.precedence();
                let (left_min, right_min) = if op.is_right_assoc() {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.operand(left, left_min, depth);
                self.out.push_str(&format!(" {} ", op.symbol()));
                self.operand(right, right_min, depth);
            }
            Expr::Paren { inner, .. } => {
                self.out.push('(');
                self.expr(inner, depth);
                self.out.push(')');
            }
            Expr::Array { elements, .. } => self.array(elements, depth),
            Expr::Object { fields, .. } => self.object(fields, depth),
        }
    }

    /// Print `expr`, adding parentheses when it binds looser than `min`.
    fn operand(&mut self, expr: &Expr, min: u8, depth: usize) {
        let needs_parens = match expr {
            Expr::Binary { op, .. } => op.precedence() < min,
            Expr::Unary { .. } => min == u8::MAX,
            _ => false,
        };
        if needs_parens {
            self.out.push('(');
            self.expr(expr, depth);
            self.out.push(')');
        } else {
            self.expr(expr, depth);
        }
    }

    fn literal(&mut self, value: &Literal) {
        match value {
            Literal::Null => self.out.push_str("null"),
            Literal::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Literal::Number(n) => self.number(n),
            Literal::String(s) => {
                self.out.push('"');
                self.out.push_str(&escape_string(s));
                self.out.push('"');
            }
        }
    }

    fn number(&mut self, n: &Number) {
        self.out.push_str(&n.to_string());
    }

    fn array(&mut self, elements: &[Expr], depth: usize) {
        if elements.iter().all(is_inline) {
            self.out.push('[');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.expr(element, depth);
            }
            self.out.push(']');
            return;
        }

        self.out.push_str("[\n");
        for element in elements {
            self.indent(depth + 1);
            self.expr(element, depth + 1);
            self.out.push_str(",\n");
        }
        self.indent(depth);
        self.out.push(']');
    }

    fn object(&mut self, fields: &[ObjectField], depth: usize) {
        if fields.is_empty() {
            self.out.push_str("{}");
            return;
        }

        let width = fields.iter().map(key_width).max().unwrap_or(0);
        self.out.push_str("{\n");
        for field in fields {
            self.indent(depth + 1);
            self.key(&field.name.name, field.quoted, width);
            self.out.push_str(" = ");
            self.expr(&field.value, depth + 1);
            self.out.push_str(",\n");
        }
        self.indent(depth);
        self.out.push('}');
    }
}

/// Elements that keep an enclosing array on one line.
fn is_inline(expr: &Expr) -> bool {
    match expr {
        Expr::Array { elements, .. } => elements.is_empty(),
        Expr::Object { fields, .. } => fields.is_empty(),
        _ => true,
    }
}

fn key_width(field: &ObjectField) -> usize {
    let name = &field.name.name;
    if field.quoted || !is_identifier(name) {
        escape_string(name).chars().count() + 2
    } else {
        name.len()
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Escape a string for use inside double quotes.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Render a whole file.
pub fn print_file(file: &File, config: &PrintConfig) -> String {
    print_body(&file.body, config)
}

/// Render a sequence of top-level statements.
pub fn print_body(body: &[Stmt], config: &PrintConfig) -> String {
    let mut printer = Printer::new(config);
    printer.body(body, 0, true);
    printer.out
}

/// Render a single expression without a trailing newline.
pub fn print_expr(expr: &Expr, config: &PrintConfig) -> String {
    let mut printer = Printer::new(config);
    printer.expr(expr, 0);
    printer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    fn lit(value: Literal) -> Expr {
        Expr::literal(value)
    }

    fn attr(name: &str, value: Expr) -> Stmt {
        Stmt::Attribute(AttributeStmt {
            name: Ident::new(name),
            value,
        })
    }

    fn block(name: &str, label: Option<&str>, body: Vec<Stmt>) -> Stmt {
        Stmt::Block(BlockStmt {
            name: name.split('.').map(String::from).collect(),
            name_span: Span::default(),
            label: label.map(String::from),
            body,
            span: Span::default(),
        })
    }

    #[test]
    fn test_print_nested_blocks() {
        let body = vec![block(
            "outer",
            Some("main"),
            vec![
                attr("attr1", lit(Literal::Number(Number::Int(1)))),
                attr("long_name", lit(Literal::Bool(true))),
                block("inner", None, vec![]),
            ],
        )];
        assert_eq!(
            print_body(&body, &PrintConfig::default()),
            "outer \"main\" {\n\tattr1     = 1\n\tlong_name = true\n\tinner { }\n}\n"
        );
    }

    #[test]
    fn test_print_top_level_spacing() {
        let body = vec![
            attr("a", lit(Literal::Null)),
            attr("bb", lit(Literal::Null)),
            block("x", None, vec![]),
            block("y", None, vec![]),
        ];
        assert_eq!(
            print_body(&body, &PrintConfig::default()),
            "a  = null\nbb = null\n\nx { }\n\ny { }\n"
        );
    }

    #[test]
    fn test_print_spaces_without_alignment() {
        let config = PrintConfig {
            indent: Indent::Spaces(2),
            align_equals: false,
        };
        let body = vec![block(
            "b",
            None,
            vec![
                attr("x", lit(Literal::String("v".into()))),
                attr("long", lit(Literal::Number(Number::Float(3.0)))),
            ],
        )];
        assert_eq!(
            print_body(&body, &config),
            "b {\n  x = \"v\"\n  long = 3.0\n}\n"
        );
    }

    #[test]
    fn test_print_collections() {
        let array = Expr::Array {
            elements: vec![
                lit(Literal::Number(Number::Int(1))),
                lit(Literal::String("two".into())),
            ],
            span: Span::default(),
        };
        assert_eq!(print_expr(&array, &PrintConfig::default()), "[1, \"two\"]");

        let object = Expr::Object {
            fields: vec![
                ObjectField {
                    name: Ident::new("a"),
                    quoted: false,
                    value: lit(Literal::Bool(false)),
                },
                ObjectField {
                    name: Ident::new("content-type"),
                    quoted: true,
                    value: array.clone(),
                },
            ],
            span: Span::default(),
        };
        assert_eq!(
            print_expr(&object, &PrintConfig::default()),
            "{\n\ta              = false,\n\t\"content-type\" = [1, \"two\"],\n}"
        );

        let nested = Expr::Array {
            elements: vec![object],
            span: Span::default(),
        };
        assert_eq!(
            print_expr(&nested, &PrintConfig::default()),
            "[\n\t{\n\t\ta              = false,\n\t\t\"content-type\" = [1, \"two\"],\n\t},\n]"
        );
    }

    #[test]
    fn test_print_operators_parenthesize() {
        let one = || Box::new(lit(Literal::Number(Number::Int(1))));
        let sum = Expr::Binary {
            op: BinaryOp::Add,
            left: one(),
            right: one(),
            span: Span::default(),
        };
        let product = Expr::Binary {
            op: BinaryOp::Mul,
            left: Box::new(sum.clone()),
            right: one(),
            span: Span::default(),
        };
        assert_eq!(print_expr(&product, &PrintConfig::default()), "(1 + 1) * 1");

        let negated = Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(sum),
            span: Span::default(),
        };
        assert_eq!(print_expr(&negated, &PrintConfig::default()), "-(1 + 1)");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b\\c\n\u{1}"), "a\\\"b\\\\c\\n\\u0001");
    }

    #[test]
    fn test_print_config_deserializes_with_defaults() -> Result<(), serde_json::Error> {
        let config: PrintConfig = serde_json::from_str(r#"{"indent": {"spaces": 4}}"#)?;
        assert_eq!(config.indent, Indent::Spaces(4));
        assert!(config.align_equals);
        Ok(())
    }
}
