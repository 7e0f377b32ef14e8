//! VM: decodes block bodies into native values.
//!
//! Decoding starts from the target type's default value and applies the
//! statements in source order. Fields the source does not mention keep
//! whatever the default gave them.

pub mod expr;
pub mod ops;

pub use expr::Evaluator;

use crate::error::DecodeError;
use crate::lexer::Span;
use crate::parser::{BlockStmt, Stmt};
use crate::schema::{default_value, schema_of, Block, Cardinality, FieldRole};
use brook_core::Scope;
use std::collections::HashSet;

/// A body ready to be decoded, with the header of its block if it has one.
pub struct Vm<'a> {
    name: Option<String>,
    label: Option<&'a str>,
    body: &'a [Stmt],
    span: Span,
}

impl<'a> Vm<'a> {
    pub fn new(block: &'a BlockStmt) -> Self {
        Self {
            name: Some(block.full_name()),
            label: block.label.as_deref(),
            body: &block.body,
            span: block.name_span,
        }
    }

    /// A headerless body, such as the statements of a whole file.
    pub fn from_body(body: &'a [Stmt]) -> Self {
        Self {
            name: None,
            label: None,
            body,
            span: body.first().map(Stmt::span).unwrap_or_default(),
        }
    }

    /// Decode into a fresh `T`, resolving references through `scope`.
    pub fn evaluate<T: Block>(&self, scope: &dyn Scope) -> Result<T, DecodeError> {
        let schema = schema_of::<T>()?;
        let block_name = || self.name.clone().unwrap_or_else(|| schema.owner().to_string());

        tracing::debug!(
            target: "brook::vm",
            block = self.name.as_deref().unwrap_or("<body>"),
            label = self.label.unwrap_or(""),
            owner = schema.owner(),
            "decoding block"
        );

        let mut target = default_value::<T>();

        match (schema.has_label(), self.label) {
            (true, Some(label)) => schema.set_label(&mut target, label.to_string()),
            (true, None) => {
                return Err(DecodeError::MissingLabel {
                    block: block_name(),
                    span: self.span,
                })
            }
            (false, Some(label)) => {
                return Err(DecodeError::UnexpectedLabel {
                    block: block_name(),
                    label: label.to_string(),
                    span: self.span,
                })
            }
            (false, None) => {}
        }

        let evaluator = Evaluator::new(scope);
        let mut seen: HashSet<String> = HashSet::new();

        for stmt in self.body {
            match stmt {
                Stmt::Attribute(attr) => {
                    let name = &attr.name.name;
                    let entry = schema.entry(name).ok_or_else(|| DecodeError::UnknownField {
                        name: name.clone(),
                        kind: "attribute",
                        owner: schema.owner(),
                        span: attr.name.span,
                    })?;
                    if entry.info.role != FieldRole::Attribute {
                        return Err(DecodeError::WrongStatementKind {
                            name: name.clone(),
                            expected: "a block",
                            span: attr.name.span,
                        });
                    }
                    if !seen.insert(name.clone()) {
                        return Err(DecodeError::DuplicateField {
                            name: name.clone(),
                            span: attr.name.span,
                        });
                    }

                    let value = evaluator.eval(&attr.value)?;
                    entry
                        .access
                        .assign(&mut target, value)
                        .map_err(|source| DecodeError::TypeMismatch {
                            name: name.clone(),
                            source,
                            span: attr.value.span(),
                        })?;
                }
                Stmt::Block(block) => {
                    let name = block.full_name();
                    let entry = schema.entry(&name).ok_or_else(|| DecodeError::UnknownField {
                        name: name.clone(),
                        kind: "block",
                        owner: schema.owner(),
                        span: block.name_span,
                    })?;
                    if entry.info.role != FieldRole::Block {
                        return Err(DecodeError::WrongStatementKind {
                            name,
                            expected: "an attribute",
                            span: block.name_span,
                        });
                    }

                    let first = !seen.contains(&name);
                    if !first && entry.info.cardinality != Cardinality::Repeated {
                        return Err(DecodeError::DuplicateField {
                            name,
                            span: block.name_span,
                        });
                    }
                    entry.access.decode_block(&mut target, block, first, scope)?;
                    seen.insert(name);
                }
            }
        }

        if let Some(missing) = schema
            .fields()
            .find(|info| info.required && !seen.contains(&info.name))
        {
            return Err(DecodeError::MissingRequiredField {
                name: missing.name.clone(),
                kind: missing.role.as_str(),
                span: self.span,
            });
        }

        Ok(target)
    }
}

/// Decode a nested block statement into a fresh `B`.
pub(crate) fn decode_block<B: Block>(block: &BlockStmt, scope: &dyn Scope) -> Result<B, DecodeError> {
    Vm::new(block).evaluate(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::schema::SchemaBuilder;
    use brook_core::{CoerceError, EmptyScope, Variables};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Rule {
        action: String,
        regex: Option<String>,
    }

    impl Block for Rule {
        fn schema(s: &mut SchemaBuilder<Self>) {
            s.attr("action", |r| &r.action, |r| &mut r.action);
            s.attr("regex", |r| &r.regex, |r| &mut r.regex).optional();
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Relabel {
        name: String,
        forward_to: Vec<String>,
        rules: Vec<Rule>,
        max_cache: u32,
    }

    impl Block for Relabel {
        fn schema(s: &mut SchemaBuilder<Self>) {
            s.label(|r| &r.name, |r| &mut r.name);
            s.attr("forward_to", |r| &r.forward_to, |r| &mut r.forward_to);
            s.blocks("rule", |r| &r.rules, |r| &mut r.rules).optional();
            s.attr("max_cache_size", |r| &r.max_cache, |r| &mut r.max_cache)
                .optional();
        }

        fn defaults() -> Option<Self> {
            Some(Relabel {
                name: String::new(),
                forward_to: Vec::new(),
                rules: vec![Rule {
                    action: "keep".to_string(),
                    regex: None,
                }],
                max_cache: 10_000,
            })
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Stage {
        rule: Rule,
        fallback: Option<Rule>,
    }

    impl Block for Stage {
        fn schema(s: &mut SchemaBuilder<Self>) {
            s.block("rule", |st| &st.rule, |st| &mut st.rule);
            s.block_opt("fallback", |st| &st.fallback, |st| &mut st.fallback)
                .optional();
        }
    }

    fn decode_first<T: Block>(source: &str, scope: &dyn Scope) -> Result<T, DecodeError> {
        let file = match parse(source) {
            Ok(file) => file,
            Err(e) => panic!("parse failed: {}", e),
        };
        match file.body.first() {
            Some(Stmt::Block(block)) => Vm::new(block).evaluate(scope),
            other => panic!("expected a block, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_applies_defaults_and_statements() -> Result<(), DecodeError> {
        let mut scope = Variables::new();
        scope.set("sink.default", brook_core::Object::from_iter([(
            "receiver",
            brook_core::Value::from("r1"),
        )]));

        let relabel: Relabel = decode_first(
            r#"
            relabel "main" {
                forward_to = [sink.default.receiver]

                rule {
                    action = "drop"
                    regex  = "debug.*"
                }
                rule {
                    action = "keep"
                }
            }
            "#,
            &scope,
        )?;

        assert_eq!(relabel.name, "main");
        assert_eq!(relabel.forward_to, vec!["r1".to_string()]);
        assert_eq!(relabel.max_cache, 10_000);
        // The first rule statement replaces the default list.
        assert_eq!(relabel.rules.len(), 2);
        assert_eq!(relabel.rules[0].regex.as_deref(), Some("debug.*"));
        Ok(())
    }

    #[test]
    fn test_decode_keeps_default_collection_without_statements() -> Result<(), DecodeError> {
        let relabel: Relabel = decode_first(
            "relabel \"x\" {\n forward_to = []\n}",
            &EmptyScope,
        )?;
        assert_eq!(relabel.rules, default_value::<Relabel>().rules);
        Ok(())
    }

    #[test]
    fn test_repeated_blocks_keep_source_order() -> Result<(), DecodeError> {
        let relabel: Relabel = decode_first(
            r#"
            relabel "main" {
                rule { action = "first" }
                forward_to = []
                rule { action = "second" }
                max_cache_size = 5
                rule { action = "third" }
            }
            "#,
            &EmptyScope,
        )?;
        let actions: Vec<&str> = relabel.rules.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(actions, vec!["first", "second", "third"]);
        assert_eq!(relabel.max_cache, 5);
        Ok(())
    }

    #[test]
    fn test_single_blocks_may_appear_once() -> Result<(), DecodeError> {
        let stage: Stage = decode_first(
            "stage {\n rule { action = \"a\" }\n fallback { action = \"b\" }\n}",
            &EmptyScope,
        )?;
        assert_eq!(stage.rule.action, "a");
        assert_eq!(stage.fallback.map(|r| r.action).as_deref(), Some("b"));

        for source in [
            "stage {\n rule { action = \"a\" }\n rule { action = \"b\" }\n}",
            "stage {\n rule { action = \"a\" }\n fallback { action = \"b\" }\n fallback { action = \"c\" }\n}",
        ] {
            match decode_first::<Stage>(source, &EmptyScope) {
                Err(DecodeError::DuplicateField { name, span }) => {
                    assert!(name == "rule" || name == "fallback", "{}", name);
                    // The error points at the second occurrence.
                    assert!(span.line > 2, "{:?}", span);
                }
                other => panic!("{:?}: expected DuplicateField, got {:?}", source, other),
            }
        }
        Ok(())
    }

    #[test]
    fn test_decode_label_errors() {
        assert!(matches!(
            decode_first::<Relabel>("relabel { forward_to = [] }", &EmptyScope),
            Err(DecodeError::MissingLabel { .. })
        ));
        assert!(matches!(
            decode_first::<Rule>("rule \"x\" { action = \"keep\" }", &EmptyScope),
            Err(DecodeError::UnexpectedLabel { .. })
        ));
    }

    #[test]
    fn test_decode_field_errors() {
        let cases: Vec<(&str, fn(&DecodeError) -> bool)> = vec![
            ("r \"a\" { }", |e| {
                matches!(e, DecodeError::MissingRequiredField { name, .. } if name == "forward_to")
            }),
            ("r \"a\" { forward_to = [] \n bogus = 1 }", |e| {
                matches!(e, DecodeError::UnknownField { kind: "attribute", .. })
            }),
            ("r \"a\" { forward_to = [] \n extra { } }", |e| {
                matches!(e, DecodeError::UnknownField { kind: "block", .. })
            }),
            ("r \"a\" { forward_to = [] \n rule = 1 }", |e| {
                matches!(e, DecodeError::WrongStatementKind { expected: "a block", .. })
            }),
            ("r \"a\" { forward_to { } }", |e| {
                matches!(e, DecodeError::WrongStatementKind { expected: "an attribute", .. })
            }),
            ("r \"a\" { forward_to = [] \n forward_to = [] }", |e| {
                matches!(e, DecodeError::DuplicateField { .. })
            }),
            ("r \"a\" { forward_to = \"x\" }", |e| {
                matches!(e, DecodeError::TypeMismatch { source: CoerceError::TypeMismatch { .. }, .. })
            }),
            ("r \"a\" { forward_to = [1] }", |e| {
                matches!(e, DecodeError::TypeMismatch { source: CoerceError::Element { index: 0, .. }, .. })
            }),
            ("r \"a\" { forward_to = missing.ref }", |e| {
                matches!(e, DecodeError::Eval(_))
            }),
            ("r \"a\" { forward_to = [] \n rule { } }", |e| {
                matches!(e, DecodeError::MissingRequiredField { name, .. } if name == "action")
            }),
        ];

        for (source, check) in cases {
            match decode_first::<Relabel>(source, &EmptyScope) {
                Err(e) => assert!(check(&e), "{:?}: unexpected error {:?}", source, e),
                Ok(v) => panic!("{:?} decoded to {:?}", source, v),
            }
        }
    }

    #[test]
    fn test_decode_error_span_points_at_value() {
        let err = decode_first::<Relabel>("r \"a\" {\n  forward_to = 5\n}", &EmptyScope).err();
        match err {
            Some(DecodeError::TypeMismatch { span, .. }) => {
                assert_eq!((span.line, span.column), (2, 16));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
