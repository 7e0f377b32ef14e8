//! Canonical layout of formatted and built documents.

mod common;

use brook_lang::builder::{Block as BuiltBlock, File};
use brook_lang::{format, format_with, Error, Indent, PrintConfig};
use common::*;
use std::time::Duration;

#[test]
fn test_format_pipeline() -> Result<(), Error> {
    let source = r#"
// writer
loki.write "default" {
endpoint { url = "http://loki:3100"
batch_wait="5s" }
external_labels={cluster="eu-1",  "k8s.io/ns"="default"}
}
logging { level="debug" }
"#;
    let expected = "loki.write \"default\" {\n\
                    \tendpoint {\n\
                    \t\turl        = \"http://loki:3100\"\n\
                    \t\tbatch_wait = \"5s\"\n\
                    \t}\n\
                    \texternal_labels = {\n\
                    \t\tcluster     = \"eu-1\",\n\
                    \t\t\"k8s.io/ns\" = \"default\",\n\
                    \t}\n\
                    }\n\
                    \n\
                    logging {\n\
                    \tlevel = \"debug\"\n\
                    }\n";
    assert_eq!(format(source)?, expected);
    assert_eq!(format(expected)?, expected);
    Ok(())
}

#[test]
fn test_format_with_spaces() -> Result<(), Error> {
    let config = PrintConfig {
        indent: Indent::Spaces(2),
        align_equals: false,
    };
    let formatted = format_with("b { x = 1\n long = -(2 + 3) }", &config)?;
    assert_eq!(formatted, "b {\n  x = 1\n  long = -(2 + 3)\n}\n");
    Ok(())
}

#[test]
fn test_build_document() -> Result<(), Error> {
    let (_, handle) = scope_with_receiver("default");
    let relabel = Relabel {
        name: "drop_debug".to_string(),
        forward_to: vec![handle],
        rules: vec![Rule {
            source_labels: vec!["level".to_string()],
            action: "drop".to_string(),
            ..brook_lang::default_value::<Rule>()
        }],
        max_cache_size: 10_000,
    };

    let mut writer = BuiltBlock::new("loki.write", Some("default"))?;
    let mut endpoint = BuiltBlock::from_value(
        "endpoint",
        &Endpoint {
            url: "http://loki:3100".to_string(),
            batch_wait: Duration::from_millis(1500),
            ..brook_lang::default_value::<Endpoint>()
        },
    )?;
    endpoint
        .body_mut()
        .set_attribute_value("batch_size", &2048u32)?;
    writer.body_mut().append_block(endpoint);

    let mut file = File::new();
    file.body_mut()
        .append_block(BuiltBlock::from_value("loki.relabel", &relabel)?);
    file.body_mut().append_block(writer);

    assert_eq!(
        file.to_string(),
        "loki.relabel \"drop_debug\" {\n\
         \tforward_to = [loki.write.default.receiver]\n\
         \trule {\n\
         \t\tsource_labels = [\"level\"]\n\
         \t\taction        = \"drop\"\n\
         \t}\n\
         }\n\
         \n\
         loki.write \"default\" {\n\
         \tendpoint {\n\
         \t\turl        = \"http://loki:3100\"\n\
         \t\tbatch_wait = \"1s500ms\"\n\
         \t\tbatch_size = 2048\n\
         \t}\n\
         }\n"
    );
    Ok(())
}
