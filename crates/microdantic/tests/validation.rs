pub mod fixtures;

use fixtures::*;
use microdantic::{Field, FieldType, ModelDefinition, ModelError, Registry, Value};

#[test]
fn test_set_then_get_returns_the_value() {
    let (_, fruit) = setup_fruit();
    let mut apple = fruit.construct([("name", "apple")]).unwrap();

    apple.set("quantity", 3).unwrap();

    assert_eq!(apple.get("quantity"), Some(&Value::Int(3)));
}

#[test]
fn test_failed_set_names_only_violated_constraints() {
    let (_, fruit) = setup_fruit();
    let mut apple = fruit.construct([("name", "apple")]).unwrap();

    let err = apple.set("quantity", -3).unwrap_err();

    let failure = err.validation().and_then(|v| v.field("quantity")).expect("quantity failure");
    assert_eq!(failure.messages, ["Value must be greater than or equal to 0"]);
    assert!(!failure.mentions("length"));
    assert_eq!(apple.get("quantity"), Some(&Value::Int(10)), "failed set must not store the value");
}

#[test]
fn test_types_are_exact() {
    let (_, fruit) = setup_fruit();
    let mut apple = fruit.construct([("name", "apple")]).unwrap();

    let err = apple.set("weight", 5).unwrap_err();

    assert!(err.validation().unwrap().field("weight").unwrap().mentions("Value must be of type float"));
}

#[test]
fn test_defaults_fill_missing_fields() {
    let (_, fruit) = setup_fruit();

    let pear = fruit.construct([("name", "pear")]).unwrap();

    assert_eq!(pear.get("quantity"), Some(&Value::Int(10)));
    assert_eq!(pear.get("weight"), Some(&Value::Float(5.0)));
}

#[test]
fn test_argument_order_does_not_matter() {
    let mut registry = Registry::new();
    let point = registry
        .register(
            ModelDefinition::builder()
                .name("Point")
                .field(Field::new("x", FieldType::Int).default(1))
                .field(Field::new("y", FieldType::Int).default(2))
                .build()
                .unwrap(),
        )
        .unwrap();

    let defaults = point.defaults().unwrap();
    assert_eq!(defaults.values(), [Value::Int(1), Value::Int(2)]);

    let declared = point.construct([("x", 7), ("y", 8)]).unwrap();
    let reversed = point.construct([("y", 8), ("x", 7)]).unwrap();
    assert_eq!(declared, reversed);
}

#[test]
fn test_construction_reports_every_failing_field() {
    let (_, fruit) = setup_fruit();

    let err = fruit
        .construct([("name", Value::from("dragonfruits")), ("quantity", Value::Int(-1))])
        .unwrap_err();

    let validation = err.validation().expect("validation error");
    assert_eq!(validation.model(), "Fruit");
    let paths: Vec<_> = validation.failures().iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["name", "quantity"]);
    assert!(validation.field("name").unwrap().mentions("length less than or equal to 10"));
}

#[test]
fn test_missing_required_field_is_reported() {
    let (_, fruit) = setup_fruit();

    let err = fruit.defaults().unwrap_err();

    assert_eq!(err.validation().unwrap().field("name").unwrap().messages, ["Field required"]);
}

#[test]
fn test_every_constraint_is_evaluated() {
    let mut registry = Registry::new();
    let code = registry
        .register(
            ModelDefinition::builder()
                .name("Code")
                .field(
                    Field::new("value", FieldType::Text)
                        .min_len(4)
                        .validate("Value must be upper case", |v| {
                            v.as_text().is_some_and(|t| t.chars().all(|c| c.is_ascii_uppercase()))
                        }),
                )
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = code.construct([("value", "ab")]).unwrap_err();

    assert_eq!(
        err.validation().unwrap().field("value").unwrap().messages,
        ["Value must have length greater than or equal to 4", "Value must be upper case"]
    );
}

#[test]
fn test_optional_fields_accept_null() {
    let mut registry = Registry::new();
    let note = registry
        .register(
            ModelDefinition::builder()
                .name("Note")
                .field(Field::new("body", FieldType::Text).optional().max_len(3))
                .build()
                .unwrap(),
        )
        .unwrap();

    let mut empty = note.defaults().unwrap();
    assert_eq!(empty.get("body"), Some(&Value::Null));

    empty.set("body", "abc").unwrap();
    empty.set("body", Value::Null).unwrap();
    assert!(empty.set("body", "abcd").is_err());
}

#[test]
fn test_union_requires_an_exact_member() {
    let mut registry = Registry::new();
    let reading = registry
        .register(
            ModelDefinition::builder()
                .name("Reading")
                .field(Field::new("value", FieldType::union([FieldType::Int, FieldType::Float])))
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(reading.construct([("value", 1)]).is_ok());
    assert!(reading.construct([("value", 1.5)]).is_ok());

    let err = reading.construct([("value", "1")]).unwrap_err();
    assert!(err.validation().unwrap().field("value").unwrap().mentions("Union[int, float]"));
}

#[test]
fn test_float_bounds_on_large_integers_are_exact() {
    let mut registry = Registry::new();
    let counter = registry
        .register(
            ModelDefinition::builder()
                .name("Counter")
                .field(Field::new("n", FieldType::Int).le(9_007_199_254_740_992.0))
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(counter.construct([("n", 9_007_199_254_740_992_i64)]).is_ok());

    let err = counter.construct([("n", 9_007_199_254_740_993_i64)]).unwrap_err();
    assert!(err.validation().unwrap().field("n").unwrap().mentions("less than or equal to"));
}

#[test]
fn test_nan_is_rejected_so_stored_floats_equal_themselves() {
    let (_, fruit) = setup_fruit();
    let mut apple = fruit.construct([("name", "apple")]).unwrap();

    let err = apple.set("weight", f64::NAN).unwrap_err();

    assert!(err.validation().unwrap().field("weight").unwrap().mentions("type float"));
    assert_eq!(apple.get("weight"), Some(&Value::Float(5.0)));
    apple.set("weight", f64::INFINITY).unwrap();
    assert_eq!(apple.get("weight"), Some(&Value::Float(f64::INFINITY)));
}

#[test]
fn test_one_of_lists_allowed_values() {
    let mut registry = Registry::new();
    let light = registry
        .register(
            ModelDefinition::builder()
                .name("Light")
                .field(Field::new("colour", FieldType::Text).one_of(["red", "amber", "green"]))
                .build()
                .unwrap(),
        )
        .unwrap();

    let err = light.construct([("colour", "blue")]).unwrap_err();

    assert!(
        err.validation()
            .unwrap()
            .field("colour")
            .unwrap()
            .mentions("Value must be one of ['red', 'amber', 'green']")
    );
}

#[test]
fn test_unknown_keys_are_ignored() {
    let (_, fruit) = setup_fruit();

    let apple = fruit.construct([("name", "apple"), ("colour", "red")]).unwrap();

    assert_eq!(apple.get("colour"), None);
}

#[test]
fn test_setting_an_unknown_field_fails() {
    let (_, fruit) = setup_fruit();
    let mut apple = fruit.construct([("name", "apple")]).unwrap();

    let err = apple.set("colour", "red").unwrap_err();

    assert!(matches!(err, ModelError::Validation { .. }));
}

#[test]
fn test_rendering_uses_declaration_order() {
    let (_, fruit) = setup_fruit();

    let apple = fruit.construct([("quantity", Value::Int(5)), ("name", Value::from("apple"))]).unwrap();

    assert_eq!(apple.to_string(), "Fruit(name='apple', quantity=5, weight=5.0)");
}

#[test]
fn test_validation_error_lists_each_message() {
    let (_, fruit) = setup_fruit();

    let err = fruit.construct([("name", Value::Int(3)), ("quantity", Value::Int(-1))]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Validation error: The following validations failed for `Fruit`:\n\
         -- name: Value must be of type text\n\
         -- quantity: Value must be greater than or equal to 0"
    );
}
