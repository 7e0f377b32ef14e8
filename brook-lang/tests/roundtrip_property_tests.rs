//! Property-Based Tests for Encode/Decode Round Trips
//!
//! Property: any value the builder can write reads back as the same value,
//! and printed output is already in canonical form.

use brook_lang::builder::{expr_from_value, File};
use brook_lang::printer::print_expr;
use brook_lang::{
    decode, encode, format, parse_expr, Block, EmptyScope, Evaluator, Lexer, Object, PrintConfig,
    SchemaBuilder, Value,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// ARBITRATORS
// ============================================================================

/// Floats with an exact short decimal form.
fn arb_float() -> impl Strategy<Value = f64> {
    (-4_000_000i64..4_000_000).prop_map(|n| n as f64 / 4.0)
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{0,12}",
        Just("tab\there".to_string()),
        Just("quote \" and \\ slash".to_string()),
        Just("line\nbreak\u{7}".to_string()),
    ]
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_][a-z0-9_]{0,8}",
        "[A-Za-z0-9 .:/-]{0,10}",
        Just("true".to_string()),
        Just("null".to_string()),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        arb_float().prop_map(Value::from),
        arb_text().prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((arb_key(), inner), 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect::<Object>())),
        ]
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Limits {
    name: String,
    max_series: u64,
    ratio: f64,
    tags: Vec<String>,
    timeout: Duration,
    labels: BTreeMap<String, String>,
    note: Option<String>,
}

impl Block for Limits {
    fn schema(s: &mut SchemaBuilder<Self>) {
        s.attr("name", |l| &l.name, |l| &mut l.name);
        s.attr("max_series", |l| &l.max_series, |l| &mut l.max_series)
            .optional();
        s.attr("ratio", |l| &l.ratio, |l| &mut l.ratio).optional();
        s.attr("tags", |l| &l.tags, |l| &mut l.tags).optional();
        s.attr("timeout", |l| &l.timeout, |l| &mut l.timeout).optional();
        s.attr("labels", |l| &l.labels, |l| &mut l.labels).optional();
        s.attr("note", |l| &l.note, |l| &mut l.note).optional();
    }

    fn defaults() -> Option<Self> {
        Some(Limits {
            max_series: 100_000,
            ratio: 0.5,
            timeout: Duration::from_secs(30),
            ..Limits::default()
        })
    }
}

fn arb_limits() -> impl Strategy<Value = Limits> {
    (
        arb_text(),
        prop_oneof![Just(100_000u64), any::<u64>()],
        prop_oneof![Just(0.5), arb_float()],
        prop::collection::vec(arb_text(), 0..3),
        (0u64..200_000, 0u32..1_000)
            .prop_map(|(secs, millis)| Duration::from_secs(secs) + Duration::from_millis(millis as u64)),
        prop::collection::btree_map(arb_key(), arb_text(), 0..3),
        prop::option::of(arb_text()),
    )
        .prop_map(
            |(name, max_series, ratio, tags, timeout, labels, note)| Limits {
                name,
                max_series,
                ratio,
                tags,
                timeout,
                labels,
                note,
            },
        )
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A rendered value evaluates back to itself.
    #[test]
    fn prop_value_rendering_round_trips(value in arb_value()) {
        let expr = expr_from_value(&value).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let text = print_expr(&expr, &PrintConfig::default());
        let parsed = parse_expr(&text).map_err(|e| TestCaseError::fail(format!("{}: {}", text, e)))?;
        let evaluated = Evaluator::new(&EmptyScope)
            .eval(&parsed)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(evaluated, value, "rendered as {}", text);
    }

    /// Decoding the encoded form gives back the original block value.
    #[test]
    fn prop_block_round_trips(limits in arb_limits()) {
        let text = encode(&limits).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let decoded: Limits = decode(&text, &EmptyScope)
            .map_err(|e| TestCaseError::fail(format!("{}\n{}", e, text)))?;
        prop_assert_eq!(decoded, limits);
    }

    /// Builder output is a fixed point of the formatter.
    #[test]
    fn prop_builder_output_is_canonical(
        attrs in prop::collection::btree_map(
            "[a-z][a-z_]{0,10}".prop_filter("keywords are not names", |n| {
                !matches!(n.as_str(), "true" | "false" | "null")
            }),
            arb_value(),
            0..5,
        )
    ) {
        let mut file = File::new();
        for (name, value) in &attrs {
            file.body_mut()
                .set_attribute_value(name, value)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
        }
        let text = file.to_string();
        let formatted = format(&text).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(formatted, text);
    }

    /// The lexer returns a result for any input, with ordered spans.
    #[test]
    fn prop_lexer_never_panics(input in "\\PC{0,64}") {
        if let Ok(tokens) = Lexer::new(&input).tokenize() {
            for pair in tokens.windows(2) {
                prop_assert!(pair[0].span.end <= pair[1].span.start);
            }
        }
    }
}

#[test]
fn test_encode_omits_every_default() {
    let limits = brook_lang::default_value::<Limits>();
    assert_eq!(encode(&limits).ok().as_deref(), Some("name = \"\"\n"));
}

#[test]
fn test_encode_layout_of_changed_fields() {
    let limits = Limits {
        name: "tenant-a".to_string(),
        timeout: Duration::from_secs(90),
        labels: [("team".to_string(), "infra".to_string())].into_iter().collect(),
        ..brook_lang::default_value::<Limits>()
    };
    assert_eq!(
        encode(&limits).ok().as_deref(),
        Some("name    = \"tenant-a\"\ntimeout = \"1m30s\"\nlabels  = {\n\tteam = \"infra\",\n}\n")
    );
}
