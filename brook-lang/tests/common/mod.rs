//! Shared fixtures for the integration tests.
//!
//! The component types model a small log pipeline: a file source that
//! forwards to a relabel stage, which forwards to a remote writer.

#![allow(dead_code)]

use brook_lang::{
    decode, encode, Block, BlockObject, Handle, Scope, SchemaBuilder, Value, Variables,
};
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// COMPONENT TYPES
// ============================================================================

/// Opaque receiver exported by a writer component.
#[derive(Debug)]
pub struct Receiver {
    pub component: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl Block for BasicAuth {
    fn schema(s: &mut SchemaBuilder<Self>) {
        s.attr("username", |a| &a.username, |a| &mut a.username);
        s.attr("password", |a| &a.password, |a| &mut a.password)
            .optional();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Endpoint {
    pub url: String,
    pub batch_wait: Duration,
    pub batch_size: u32,
    pub headers: BTreeMap<String, String>,
    pub basic_auth: Option<BasicAuth>,
}

impl Block for Endpoint {
    fn schema(s: &mut SchemaBuilder<Self>) {
        s.attr("url", |e| &e.url, |e| &mut e.url);
        s.attr("batch_wait", |e| &e.batch_wait, |e| &mut e.batch_wait)
            .optional();
        s.attr("batch_size", |e| &e.batch_size, |e| &mut e.batch_size)
            .optional();
        s.attr("headers", |e| &e.headers, |e| &mut e.headers)
            .optional();
        s.block_opt("basic_auth", |e| &e.basic_auth, |e| &mut e.basic_auth)
            .optional();
    }

    fn defaults() -> Option<Self> {
        Some(Endpoint {
            url: String::new(),
            batch_wait: Duration::from_secs(1),
            batch_size: 1024,
            headers: BTreeMap::new(),
            basic_auth: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Writer {
    pub name: String,
    pub endpoints: Vec<Endpoint>,
    pub external_labels: BTreeMap<String, String>,
    pub max_streams: u64,
}

impl Block for Writer {
    fn schema(s: &mut SchemaBuilder<Self>) {
        s.label(|w| &w.name, |w| &mut w.name);
        s.blocks("endpoint", |w| &w.endpoints, |w| &mut w.endpoints);
        s.attr(
            "external_labels",
            |w| &w.external_labels,
            |w| &mut w.external_labels,
        )
        .optional();
        s.attr("max_streams", |w| &w.max_streams, |w| &mut w.max_streams)
            .optional();
    }

    fn defaults() -> Option<Self> {
        Some(Writer {
            max_streams: 5_000,
            ..Writer::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    pub source_labels: Vec<String>,
    pub regex: String,
    pub action: String,
    pub target_label: Option<String>,
}

impl Block for Rule {
    fn schema(s: &mut SchemaBuilder<Self>) {
        s.attr(
            "source_labels",
            |r| &r.source_labels,
            |r| &mut r.source_labels,
        )
        .optional();
        s.attr("regex", |r| &r.regex, |r| &mut r.regex).optional();
        s.attr("action", |r| &r.action, |r| &mut r.action).optional();
        s.attr("target_label", |r| &r.target_label, |r| &mut r.target_label)
            .optional();
    }

    fn defaults() -> Option<Self> {
        Some(Rule {
            source_labels: Vec::new(),
            regex: "(.*)".to_string(),
            action: "replace".to_string(),
            target_label: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relabel {
    pub name: String,
    pub forward_to: Vec<Handle<Receiver>>,
    pub rules: Vec<Rule>,
    pub max_cache_size: usize,
}

impl Block for Relabel {
    fn schema(s: &mut SchemaBuilder<Self>) {
        s.label(|r| &r.name, |r| &mut r.name);
        s.attr("forward_to", |r| &r.forward_to, |r| &mut r.forward_to);
        s.blocks("rule", |r| &r.rules, |r| &mut r.rules).optional();
        s.attr(
            "max_cache_size",
            |r| &r.max_cache_size,
            |r| &mut r.max_cache_size,
        )
        .optional();
    }

    fn defaults() -> Option<Self> {
        Some(Relabel {
            max_cache_size: 10_000,
            ..Relabel::default()
        })
    }
}

/// Top-level settings file: attributes plus one optional nested block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub log_level: String,
    pub targets: Vec<BlockObject<Target>>,
    pub sync_period: Duration,
    pub bounds: [i32; 2],
    pub writer: Option<Writer>,
}

impl Block for Settings {
    fn schema(s: &mut SchemaBuilder<Self>) {
        s.attr("log_level", |c| &c.log_level, |c| &mut c.log_level)
            .optional();
        s.attr("targets", |c| &c.targets, |c| &mut c.targets)
            .optional();
        s.attr("sync_period", |c| &c.sync_period, |c| &mut c.sync_period)
            .optional();
        s.attr("bounds", |c| &c.bounds, |c| &mut c.bounds).optional();
        s.block_opt("loki.write", |c| &c.writer, |c| &mut c.writer)
            .optional();
    }

    fn defaults() -> Option<Self> {
        Some(Settings {
            log_level: "info".to_string(),
            targets: Vec::new(),
            sync_period: Duration::from_secs(10),
            bounds: [0, 100],
            writer: None,
        })
    }
}

/// A block type used in object form, e.g. `targets = [{ ... }]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    pub address: String,
    pub job: String,
}

impl Block for Target {
    fn schema(s: &mut SchemaBuilder<Self>) {
        s.attr("__address__", |t| &t.address, |t| &mut t.address);
        s.attr("job", |t| &t.job, |t| &mut t.job).optional();
    }

    fn defaults() -> Option<Self> {
        Some(Target {
            address: String::new(),
            job: "default".to_string(),
        })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Scope exporting one writer receiver under `loki.write.<name>`.
pub fn scope_with_receiver(name: &str) -> (Variables, Handle<Receiver>) {
    let path = format!("loki.write.{}", name);
    let handle = Handle::referenced(
        format!("{}.receiver", path),
        Receiver {
            component: path.clone(),
        },
    );
    let mut scope = Variables::new();
    let exports: Value = [("receiver", Value::Capsule(handle.to_capsule()))]
        .into_iter()
        .collect::<brook_lang::Object>()
        .into();
    scope.set(path, exports);
    (scope, handle)
}

/// Decode `source`, panicking with the error text on failure.
pub fn must_decode<T: Block>(source: &str, scope: &dyn Scope) -> T {
    match decode(source, scope) {
        Ok(value) => value,
        Err(e) => panic!("decode failed: {}\nsource:\n{}", e, source),
    }
}

/// Encode `value`, panicking with the error text on failure.
pub fn must_encode<T: Block>(value: &T) -> String {
    match encode(value) {
        Ok(text) => text,
        Err(e) => panic!("encode failed: {}", e),
    }
}
