#![allow(dead_code)]

use microdantic::{Field, FieldType, Model, ModelDefinition, Registry, Value};

/// `Fruit { name: text <= 10, quantity: int >= 0 = 10, weight: float = 5.0 }`, tagged.
#[must_use]
pub fn fruit_definition() -> ModelDefinition {
    ModelDefinition::builder()
        .name("Fruit")
        .field(Field::new("name", FieldType::Text).max_len(10))
        .field(Field::new("quantity", FieldType::Int).default(10).ge(0))
        .field(Field::new("weight", FieldType::Float).default(5.0))
        .build()
        .expect("Fruit definition is valid")
}

/// A registry holding only `Fruit`.
/// # Panics
/// * If registration fails.
#[must_use]
pub fn setup_fruit() -> (Registry, Model) {
    let mut registry = Registry::new();
    let fruit = registry.register(fruit_definition()).expect("Fruit registration failed");
    (registry, fruit)
}

/// `{ tag: Literal[tag], n: int }` without the model tag on the wire.
#[must_use]
pub fn tagged_definition(name: &str, tag: &str) -> ModelDefinition {
    ModelDefinition::builder()
        .name(name)
        .serialize_name(false)
        .field(Field::new("tag", FieldType::literal([tag])))
        .field(Field::new("n", FieldType::Int))
        .build()
        .expect("tagged definition is valid")
}

/// Models `A` (tag "a") and `B` (tag "b").
#[must_use]
pub fn setup_family() -> Registry {
    let mut registry = Registry::new();
    registry.register(tagged_definition("A", "a")).expect("A registration failed");
    registry.register(tagged_definition("B", "b")).expect("B registration failed");
    registry
}

/// `Ingredient { name, grams > 0 }` and
/// `Recipe { title, main: Ingredient, extras: seq[Ingredient] = [] }`.
#[must_use]
pub fn setup_recipe() -> (Registry, Model) {
    let mut registry = Registry::new();
    registry
        .register(
            ModelDefinition::builder()
                .name("Ingredient")
                .serialize_name(false)
                .field(Field::new("name", FieldType::Text).min_len(1))
                .field(Field::new("grams", FieldType::Float).gt(0))
                .build()
                .expect("Ingredient definition is valid"),
        )
        .expect("Ingredient registration failed");
    let recipe = registry
        .register(
            ModelDefinition::builder()
                .name("Recipe")
                .field(Field::new("title", FieldType::Text))
                .field(Field::new("main", FieldType::model("Ingredient")))
                .field(
                    Field::new("extras", FieldType::seq(FieldType::model("Ingredient")))
                        .default(Value::Seq(Vec::new())),
                )
                .build()
                .expect("Recipe definition is valid"),
        )
        .expect("Recipe registration failed");
    (registry, recipe)
}

/// `Apple`, `Pear` and a `Basket` holding a discriminated union of them.
#[must_use]
pub fn setup_basket() -> (Registry, Model) {
    let mut registry = Registry::new();
    registry
        .register(
            ModelDefinition::builder()
                .name("Apple")
                .serialize_name(false)
                .field(Field::new("kind", FieldType::literal(["apple"])).default("apple"))
                .field(Field::new("crisp", FieldType::Bool).default(true))
                .build()
                .expect("Apple definition is valid"),
        )
        .expect("Apple registration failed");
    registry
        .register(
            ModelDefinition::builder()
                .name("Pear")
                .serialize_name(false)
                .field(Field::new("kind", FieldType::literal(["pear"])).default("pear"))
                .field(Field::new("ripe", FieldType::Bool).default(false))
                .build()
                .expect("Pear definition is valid"),
        )
        .expect("Pear registration failed");

    let either = FieldType::union([FieldType::model("Apple"), FieldType::model("Pear")]);
    let basket = registry
        .register(
            ModelDefinition::builder()
                .name("Basket")
                .serialize_name(false)
                .field(Field::new("first", either.clone()).discriminator("kind"))
                .field(
                    Field::new("rest", FieldType::seq(either))
                        .discriminator("kind")
                        .default(Value::Seq(Vec::new())),
                )
                .build()
                .expect("Basket definition is valid"),
        )
        .expect("Basket registration failed");
    (registry, basket)
}

/// `Fruit` plus `Holder { payload: any, blob: Union[int, bytes] = 0 }`.
/// # Panics
/// * If registration fails.
#[must_use]
pub fn setup_holder() -> (Registry, Model, Model) {
    let (mut registry, fruit) = setup_fruit();
    let holder = registry
        .register(
            ModelDefinition::builder()
                .name("Holder")
                .field(Field::new("payload", FieldType::Any))
                .field(Field::new("blob", FieldType::union([FieldType::Int, FieldType::Bytes])).default(0))
                .build()
                .expect("Holder definition is valid"),
        )
        .expect("Holder registration failed");
    (registry, fruit, holder)
}
