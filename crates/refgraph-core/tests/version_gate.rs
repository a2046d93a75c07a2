//! Version tolerance of decoded documents

use refgraph_core::{
    Engine, Error, Heap, Severity, TypeRegistry, Value, VersionHeader, VersionPolicy, dumps, loads,
};
use rstest::rstest;

fn document(version: u32, min_version: u32) -> anyhow::Result<refgraph_core::Node> {
    let writer = Engine::with_policy(
        TypeRegistry::new(),
        VersionPolicy::new(version, min_version, Severity::Fail),
    );
    let mut heap = Heap::new();
    let root = Value::Object(heap.list([Value::Int(1), Value::from("two")]));
    Ok(writer.encode(&heap, &root)?)
}

fn reader(severity: Severity) -> Engine {
    Engine::with_policy(TypeRegistry::new(), VersionPolicy::new(2, 1, severity))
}

#[rstest]
#[case(1, 1)]
#[case(2, 1)]
#[case(3, 1)]
fn test_compatible_documents_decode(
    #[case] version: u32,
    #[case] min_version: u32,
) -> anyhow::Result<()> {
    let node = document(version, min_version)?;
    assert_eq!(
        node.version,
        Some(VersionHeader {
            version,
            min_version
        })
    );
    let graph = reader(Severity::Fail).decode(&node, false)?;
    assert!(graph.root_object().is_some());
    Ok(())
}

#[test]
fn test_incompatible_document_fails() -> anyhow::Result<()> {
    let node = document(1, 2)?;
    let err = reader(Severity::Fail).decode(&node, false).unwrap_err();
    assert!(matches!(
        err,
        Error::VersionIncompatible {
            version: 1,
            min_version: 2,
            current: 2,
            min_supported: 1
        }
    ));
    Ok(())
}

#[rstest]
#[case(Severity::Warn)]
#[case(Severity::Ignore)]
fn test_incompatible_document_decodes_under_lenient_severity(
    #[case] severity: Severity,
) -> anyhow::Result<()> {
    let node = document(1, 2)?;
    let graph = reader(severity).decode(&node, false)?;
    assert!(graph.root_object().is_some());
    Ok(())
}

#[test]
fn test_document_without_header_is_legacy() -> anyhow::Result<()> {
    let mut node = document(1, 1)?;
    node.version = None;

    assert!(reader(Severity::Fail).decode(&node, false).is_err());
    assert!(reader(Severity::Warn).decode(&node, false).is_ok());
    Ok(())
}

#[test]
fn test_header_survives_text() -> anyhow::Result<()> {
    let engine = reader(Severity::Fail);
    let heap = Heap::new();
    let text = dumps(&engine, &heap, &Value::Int(9))?;

    let json: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(json["version"], 2);
    assert_eq!(json["min_version"], 1);
    assert_eq!(loads(&engine, &text, false)?.root, Value::Int(9));
    Ok(())
}
