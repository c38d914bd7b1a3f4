use microdantic::{AmbiguityError, FieldType, ModelError, Registry, SchemaDocument, Target, Value};

const GARDEN: &str = r#"
[[model]]
name = "Fruit"
serialize_name = false

[[model.field]]
name = "kind"
type = { literal = ["apple", "pear"] }

[[model.field]]
name = "quantity"
type = "int"
default = 10
ge = 0

[[model.field]]
name = "label"
type = "bytes"
default = "AAE="

[[model]]
name = "Orchard"

[[model.field]]
name = "best"
type = { model = "Fruit" }
default = { kind = "pear" }

[[model.field]]
name = "rows"
type = { seq = { model = "Fruit" } }
max_len = 3
default = []
"#;

#[test]
fn test_toml_document_registers_every_model() {
    let mut registry = Registry::new();

    let models = SchemaDocument::from_toml_str(GARDEN).unwrap().register_into(&mut registry).unwrap();

    assert_eq!(models.iter().map(|m| m.name()).collect::<Vec<_>>(), ["Fruit", "Orchard"]);
    let fruit = registry.get("Fruit").unwrap();
    assert!(!fruit.serialize_name());
    assert_eq!(fruit.field("label").unwrap().default(), Some(&Value::Bytes(vec![0, 1])));
    assert_eq!(*fruit.field("quantity").unwrap().field_type(), FieldType::Int);
}

#[test]
fn test_nested_defaults_are_decoded() {
    let mut registry = Registry::new();
    SchemaDocument::from_toml_str(GARDEN).unwrap().register_into(&mut registry).unwrap();
    let orchard = registry.get("Orchard").unwrap();

    let empty = orchard.defaults().unwrap();

    assert_eq!(
        empty.to_string(),
        "Orchard(best=Fruit(kind='pear', quantity=10, label=bytes(0001)), rows=[])"
    );
    assert_eq!(
        empty.to_text().unwrap(),
        r#"{"__model__":"Orchard","best":{"kind":"pear","quantity":10,"label":"AAE="},"rows":[]}"#
    );
}

#[test]
fn test_document_models_decode_payloads() {
    let mut registry = Registry::new();
    SchemaDocument::from_toml_str(GARDEN).unwrap().register_into(&mut registry).unwrap();

    let orchard = registry
        .from_text(r#"{"__model__":"Orchard","rows":[{"kind":"apple","quantity":2}]}"#, Target::Family)
        .unwrap();
    assert_eq!(orchard.get("rows").and_then(Value::len), Some(1));

    // Orchard has no literal or required fields, so it matches any untagged payload.
    let err = registry.from_text(r#"{"kind":"apple"}"#, Target::Family).unwrap_err();
    assert_eq!(
        err.ambiguity(),
        Some(&AmbiguityError::Ambiguous { candidates: vec!["Fruit".to_owned(), "Orchard".to_owned()] })
    );
}

#[test]
fn test_json_documents_are_accepted() {
    let doc = SchemaDocument::from_json_str(
        r#"{"model":[{"name":"Ping","field":[{"name":"seq","type":"int","ge":0}]}]}"#,
    )
    .unwrap();
    let mut registry = Registry::new();

    let models = doc.register_into(&mut registry).unwrap();

    let ping = models[0].construct([("seq", 4)]).unwrap();
    assert_eq!(ping.to_text().unwrap(), r#"{"__model__":"Ping","seq":4}"#);
}

#[test]
fn test_failing_document_registers_nothing() {
    let doc = SchemaDocument::from_toml_str(
        r#"
        [[model]]
        name = "Good"

        [[model.field]]
        name = "n"
        type = "int"

        [[model]]
        name = "Bad"

        [[model.field]]
        name = "n"
        type = "int"
        default = -1
        ge = 0
        "#,
    )
    .unwrap();
    let mut registry = Registry::new();

    let err = doc.register_into(&mut registry).unwrap_err();

    assert!(matches!(err, ModelError::Definition { .. }));
    assert!(registry.is_empty());
}

#[test]
fn test_invalid_bytes_default_is_a_definition_error() {
    let doc = SchemaDocument::from_toml_str(
        r#"
        [[model]]
        name = "Blob"

        [[model.field]]
        name = "data"
        type = "bytes"
        default = "not base64!"
        "#,
    )
    .unwrap();

    let err = doc.register_into(&mut Registry::new()).unwrap_err();

    assert!(err.to_string().contains("base64"));
}
