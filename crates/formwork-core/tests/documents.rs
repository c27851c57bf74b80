//! Document parsing and error rendering through the public API.

use std::path::Path;

use formwork_core::document::parse_document;
use formwork_core::{ChainableError, DocumentFormat, ErrorScope, Value, ValueError};

#[test]
fn yaml_and_json_documents_agree() {
    let yaml = parse_document(Path::new("a.yml"), "name: x\ntags: [a, b]\ncount: 3\n").unwrap();
    let json = parse_document(
        Path::new("a.json"),
        r#"{"name": "x", "tags": ["a", "b"], "count": 3}"#,
    )
    .unwrap();
    assert_eq!(yaml, json);
    assert_eq!(DocumentFormat::from_path(Path::new("schema")), DocumentFormat::Yaml);
}

#[test]
fn nested_non_string_keys_are_rejected() {
    let err = Value::from_yaml_str("outer:\n  true: 1\n").unwrap_err();
    assert!(matches!(err, ValueError::NonStringKey(_)));
}

#[test]
fn error_chain_renders_per_scope() {
    let root = ChainableError::internal("connection refused", "DB-DOWN");
    let err = ChainableError::external("could not load schema", "SCHEMA-LOAD").caused_by(root);
    assert_eq!(err.to_string(), "could not load schema: connection refused");

    let external = err.structured_with_traceback(ErrorScope::External);
    assert_eq!(external.error.message, "could not load schema");
    assert_eq!(external.traceback[0].message, "undisclosed error");

    let internal = err.structured_with_traceback(ErrorScope::Internal);
    assert_eq!(internal.traceback[0].message, "connection refused");

    let wire = serde_json::to_value(&internal).unwrap();
    assert_eq!(wire["code"], "SCHEMA-LOAD");
    assert_eq!(wire["traceback"][0]["code"], "DB-DOWN");
}
