//! Literal (`repr`) attributes are only restored on request

use refgraph_core::{
    AttrValue, Engine, Error, FieldDescriptor, Heap, Mode, TypeDescriptor, TypeRegistry, Value,
    dumps, loads,
};

fn measurement(heap: &mut Heap) -> Value {
    Value::Object(heap.record(
        "lab",
        "Measurement",
        [("pi", Value::Float(3.14)), ("unit", Value::from("rad"))],
    ))
}

fn repr_float_engine() -> Engine {
    let mut types = TypeRegistry::new();
    types.declare_namespace("lab");
    types.register_type("float", Mode::Repr, None, None);
    Engine::new(types)
}

#[test]
fn test_repr_attribute_is_written_as_literal_text() -> anyhow::Result<()> {
    let engine = repr_float_engine();
    let mut heap = Heap::new();
    let root = measurement(&mut heap);

    let node = engine.encode(&heap, &root)?;
    assert_eq!(node.attrs["pi"].value, AttrValue::Repr("3.14".to_string()));
    assert_eq!(node.to_json()["attrs"]["pi"]["mode"], "repr");
    Ok(())
}

#[test]
fn test_repr_rejected_without_permission() -> anyhow::Result<()> {
    let engine = repr_float_engine();
    let mut heap = Heap::new();
    let root = measurement(&mut heap);
    let text = dumps(&engine, &heap, &root)?;

    let err = loads(&engine, &text, false).unwrap_err();
    assert!(matches!(err, Error::UnsafeReprRejected(literal) if literal == "3.14"));
    Ok(())
}

#[test]
fn test_repr_restored_with_permission() -> anyhow::Result<()> {
    let engine = repr_float_engine();
    let mut heap = Heap::new();
    let root = measurement(&mut heap);
    let text = dumps(&engine, &heap, &root)?;

    let graph = loads(&engine, &text, true)?;
    assert_eq!(graph.attr("pi"), Some(&Value::Float(3.14)));
    assert_eq!(graph.attr("unit"), Some(&Value::from("rad")));
    Ok(())
}

#[test]
fn test_field_level_repr_override() -> anyhow::Result<()> {
    let mut types = TypeRegistry::new();
    types.declare(TypeDescriptor::new("lab", "Sample").fields(vec![
        FieldDescriptor::new("label").with_mode(Mode::Repr),
        FieldDescriptor::new("count"),
        FieldDescriptor::new("missing").with_mode(Mode::Repr),
    ]));
    let engine = Engine::new(types);

    let mut heap = Heap::new();
    let root = Value::Object(heap.record(
        "lab",
        "Sample",
        [
            ("label", Value::from("it's")),
            ("count", Value::Int(4)),
            ("missing", Value::Null),
        ],
    ));

    let node = engine.encode(&heap, &root)?;
    assert_eq!(node.attrs["label"].value, AttrValue::Repr("\"it's\"".to_string()));
    assert_eq!(node.attrs["missing"].value, AttrValue::Repr("None".to_string()));
    assert_eq!(node.attrs["count"].mode(), Mode::Fallback);

    let graph = engine.decode(&node, true)?;
    assert_eq!(graph.attr("label"), Some(&Value::from("it's")));
    assert_eq!(graph.attr("count"), Some(&Value::Int(4)));
    assert_eq!(graph.attr("missing"), Some(&Value::Null));
    Ok(())
}

#[test]
fn test_repr_of_record_is_unsupported() {
    let mut types = TypeRegistry::new();
    types.declare(
        TypeDescriptor::new("lab", "Holder")
            .fields(vec![FieldDescriptor::new("inner").with_mode(Mode::Repr)]),
    );
    let engine = Engine::new(types);

    let mut heap = Heap::new();
    let inner = Value::Object(heap.record("lab", "Inner", [("v", Value::Int(1))]));
    let root = Value::Object(heap.record("lab", "Holder", [("inner", inner)]));

    let err = engine.encode(&heap, &root).unwrap_err();
    assert!(matches!(err, Error::UnsupportedRepr(t) if t == "Inner"));
}

#[test]
fn test_unparsable_literal_is_reported() -> anyhow::Result<()> {
    let engine = repr_float_engine();
    let mut heap = Heap::new();
    let root = measurement(&mut heap);
    let mut node = engine.encode(&heap, &root)?;
    node.attrs[0].value = AttrValue::Repr("__import__('os')".to_string());

    let err = engine.decode(&node, true).unwrap_err();
    assert!(matches!(err, Error::InvalidLiteral(_)));
    Ok(())
}
