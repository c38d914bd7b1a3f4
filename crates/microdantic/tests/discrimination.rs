pub mod fixtures;

use fixtures::*;
use microdantic::{
    AmbiguityError, Field, FieldType, ModelDefinition, ModelError, OrderedMap, Registry, TAG_KEY,
    Target, Value,
};

#[test]
fn test_structural_match_resolves_family_payload() {
    let registry = setup_family();

    let instance = registry.from_text(r#"{"tag":"a","n":5}"#, Target::Family).unwrap();

    assert_eq!(instance.model().name(), "A");
    assert_eq!(instance.get("n"), Some(&Value::Int(5)));
}

#[test]
fn test_unmatched_payload_is_no_match() {
    let registry = setup_family();

    let err = registry.from_text(r#"{"tag":"c","n":5}"#, Target::Family).unwrap_err();

    assert_eq!(err.ambiguity(), Some(&AmbiguityError::NoMatch));
}

#[test]
fn test_shared_signature_is_ambiguous() {
    let mut registry = setup_family();
    registry.register(tagged_definition("C", "a")).unwrap();

    let err = registry.from_text(r#"{"tag":"a","n":5}"#, Target::Family).unwrap_err();

    assert_eq!(
        err.ambiguity(),
        Some(&AmbiguityError::Ambiguous { candidates: vec!["A".to_owned(), "C".to_owned()] })
    );
}

#[test]
fn test_resolved_model_is_fully_validated() {
    let registry = setup_family();

    let err = registry.from_text(r#"{"tag":"b","n":"five"}"#, Target::Family).unwrap_err();

    let validation = err.validation().expect("validation error after resolution");
    assert_eq!(validation.model(), "B");
    assert!(validation.field("n").unwrap().mentions("Value must be of type int"));
}

#[test]
fn test_missing_required_field_excludes_a_model() {
    let registry = setup_family();

    let err = registry.from_text(r#"{"tag":"a"}"#, Target::Family).unwrap_err();

    assert_eq!(err.ambiguity(), Some(&AmbiguityError::NoMatch));
}

#[test]
fn test_explicit_tag_takes_precedence() {
    let registry = setup_family();
    let payload: OrderedMap =
        [(TAG_KEY, Value::from("B")), ("tag", Value::from("a")), ("n", Value::Int(1))]
            .into_iter()
            .collect();

    let err = registry.from_ordered_map(payload, Target::Family).unwrap_err();

    // Resolved to B by tag, then B's literal rejects "a".
    assert_eq!(err.validation().unwrap().model(), "B");
}

#[test]
fn test_unknown_tag_is_reported() {
    let registry = setup_family();

    let err = registry.from_text(r#"{"__model__":"Z","tag":"a","n":1}"#, Target::Family).unwrap_err();

    assert!(matches!(err, ModelError::UnknownModel { ref name, .. } if name == "Z"));
}

#[test]
fn test_staged_models_do_not_take_part() {
    let mut registry = setup_family();
    registry.stage(tagged_definition("C", "c"));

    let err = registry.from_text(r#"{"tag":"c","n":1}"#, Target::Family).unwrap_err();
    assert_eq!(err.ambiguity(), Some(&AmbiguityError::NoMatch));

    registry.finalize().unwrap();
    let instance = registry.from_text(r#"{"tag":"c","n":1}"#, Target::Family).unwrap();
    assert_eq!(instance.model().name(), "C");
}

#[test]
fn test_union_members_resolve_by_discriminator() {
    let (registry, basket) = setup_basket();

    let instance = registry
        .from_text(
            r#"{"first":{"kind":"pear","ripe":true},"rest":[{"kind":"apple"},{"kind":"pear"}]}"#,
            Target::from(&basket),
        )
        .unwrap();

    let first = instance.get("first").and_then(Value::as_model).unwrap();
    assert_eq!(first.to_string(), "Pear(kind='pear', ripe=true)");
    let rest: Vec<_> = instance
        .get("rest")
        .and_then(Value::as_seq)
        .unwrap()
        .iter()
        .filter_map(|v| v.as_model().map(|m| m.model().name().to_owned()))
        .collect();
    assert_eq!(rest, ["Apple", "Pear"]);
}

#[test]
fn test_unknown_discriminator_value_is_a_field_failure() {
    let (registry, basket) = setup_basket();

    let err = registry
        .from_text(r#"{"first":{"kind":"apple"},"rest":[{"kind":"plum"}]}"#, Target::from(&basket))
        .unwrap_err();

    let failure = err.validation().unwrap().field("rest[0]").expect("indexed failure path");
    assert!(failure.mentions("no registered model matches"));
}

#[test]
fn test_any_model_fields_resolve_against_the_registry() {
    let mut registry = setup_family();
    let envelope = registry
        .register(
            ModelDefinition::builder()
                .name("Envelope")
                .field(Field::new("body", FieldType::AnyModel))
                .build()
                .unwrap(),
        )
        .unwrap();

    let instance = registry
        .from_text(r#"{"__model__":"Envelope","body":{"tag":"b","n":2}}"#, Target::from(&envelope))
        .unwrap();

    assert_eq!(instance.to_string(), "Envelope(body=B(tag='b', n=2))");
}

#[test]
fn test_concrete_target_bypasses_discrimination() {
    let mut registry = Registry::new();
    let a = registry.register(tagged_definition("A", "a")).unwrap();
    registry.register(tagged_definition("C", "a")).unwrap();

    let instance = registry.from_text(r#"{"tag":"a","n":5}"#, Target::from(&a)).unwrap();

    assert_eq!(instance.model().name(), "A");
}
