//! Model definitions and the finalised [`Model`] handle.
//!
//! A [`ModelDefinition`] is plain data: a name, an ordered list of field descriptors and
//! the tag flag. Only a [`Registry`](crate::Registry) turns it into a [`Model`], after
//! checking defaults and references and computing the discrimination signature. The
//! handle is reference-counted and cheap to clone; instances keep their model alive.

use crate::error::{FieldFailure, ModelError, ModelErrorExt, ValidationError};
use crate::field::{Field, FieldDescriptor};
use crate::instance::Instance;
use crate::types::FieldType;
use crate::value::{OrderedMap, Value};
use fxhash::FxHashMap;
use private::Sealed;
use std::borrow::Cow;
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// The reserved key that carries a model's registered name in serialized payloads.
pub const TAG_KEY: &str = "__model__";

/// A model's name, fields in declaration order, and tag flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    name: String,
    fields: Vec<FieldDescriptor>,
    serialize_name: bool,
}

impl ModelDefinition {
    #[must_use = "The definition is not built until you call .name(..).build()"]
    pub fn builder() -> ModelDefinitionBuilder {
        ModelDefinitionBuilder::default()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Whether serialized output leads with the [`TAG_KEY`] entry.
    #[must_use]
    pub const fn serialize_name(&self) -> bool {
        self.serialize_name
    }
}

#[derive(Debug, Default)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}

/// Type-state builder for [`ModelDefinition`]; a name is required before `build`.
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct ModelDefinitionBuilder<S: Sealed = NoName> {
    state: S,
    fields: Vec<Field>,
    serialize_name: Option<bool>,
}

#[allow(private_bounds)]
impl<S: Sealed> ModelDefinitionBuilder<S> {
    /// Appends a field; declaration order is serialization order.
    #[must_use = "Adds a field to the model definition"]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use = "Adds fields to the model definition"]
    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Embed the model name as a discrimination tag (default: `true`).
    #[must_use = "Sets whether serialized output carries the model tag"]
    pub const fn serialize_name(mut self, enable: bool) -> Self {
        self.serialize_name = Some(enable);
        self
    }

    fn transition<N: Sealed>(self, state: N) -> ModelDefinitionBuilder<N> {
        ModelDefinitionBuilder { state, fields: self.fields, serialize_name: self.serialize_name }
    }
}

impl ModelDefinitionBuilder<NoName> {
    #[must_use = "Sets the registered name of the model"]
    pub fn name(self, name: impl Into<String>) -> ModelDefinitionBuilder<WithName> {
        self.transition(WithName(name.into()))
    }
}

impl ModelDefinitionBuilder<WithName> {
    /// Builds every field and checks that field names are unique.
    pub fn build(self) -> Result<ModelDefinition, ModelError> {
        let name = self.state.0;
        if name.trim().is_empty() {
            return Err(ModelError::definition("model names cannot be empty"));
        }

        let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let descriptor = field.build().context(format!("model `{name}`"))?;
            if fields.iter().any(|f| f.name() == descriptor.name()) {
                return Err(ModelError::definition(format!(
                    "model `{name}` declares field `{}` more than once",
                    descriptor.name()
                )));
            }
            fields.push(descriptor);
        }

        Ok(ModelDefinition { name, fields, serialize_name: self.serialize_name.unwrap_or(true) })
    }
}

/// The fields used to recognise a model in an untagged payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscriminationSignature {
    literals: Vec<(String, Vec<Value>)>,
    required: Vec<String>,
}

impl DiscriminationSignature {
    fn of(definition: &ModelDefinition) -> Self {
        let mut signature = Self::default();
        for field in definition.fields() {
            if let FieldType::Literal(values) = field.field_type() {
                signature.literals.push((field.name().to_owned(), values.clone()));
            }
            if field.is_required() && field.default().is_none() {
                signature.required.push(field.name().to_owned());
            }
        }
        signature
    }

    /// Literal-typed fields with their admitted values.
    pub fn literals(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.literals.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Required fields without a default.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str)
    }

    /// Every literal field is present with an admitted value and every required,
    /// default-less field is present.
    #[must_use]
    pub fn matches(&self, payload: &OrderedMap) -> bool {
        self.literals
            .iter()
            .all(|(name, values)| payload.get(name).is_some_and(|v| values.contains(v)))
            && self.required.iter().all(|name| payload.contains_key(name))
    }

    /// Whether the literal field `key` admits `value`; `None` when `key` is not a
    /// literal field of this model.
    pub(crate) fn admits(&self, key: &str, value: &Value) -> Option<bool> {
        self.literals.iter().find(|(name, _)| name == key).map(|(_, values)| values.contains(value))
    }
}

/// The internal shared state of a [`Model`].
#[derive(Debug)]
pub struct ModelInner {
    definition: ModelDefinition,
    signature: DiscriminationSignature,
    index: FxHashMap<String, usize>,
}

impl ModelInner {
    #[must_use]
    pub const fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.definition.fields
    }

    #[must_use]
    pub const fn serialize_name(&self) -> bool {
        self.definition.serialize_name
    }

    #[must_use]
    pub const fn signature(&self) -> &DiscriminationSignature {
        &self.signature
    }

    /// Position of `name` in declaration order.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index(name).map(|i| &self.definition.fields[i])
    }
}

/// A registered model: the handle instances are constructed through.
#[derive(Debug, Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Deref for Model {
    type Target = ModelInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.definition == other.definition
    }
}

impl Model {
    /// Finalises a definition. Only the registry calls this, after its checks.
    pub(crate) fn finalize(definition: ModelDefinition) -> Self {
        let signature = DiscriminationSignature::of(&definition);
        let index =
            definition.fields.iter().enumerate().map(|(i, f)| (f.name().to_owned(), i)).collect();
        Self { inner: Arc::new(ModelInner { definition, signature, index }) }
    }

    /// Constructs an instance from `(field, value)` pairs in any order. Missing fields
    /// take their defaults; keys naming no field are ignored.
    ///
    /// Every field is checked and every failure is reported together.
    pub fn construct<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Instance, ModelError>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let supplied: OrderedMap = pairs.into_iter().collect();
        self.bind_with(supplied, "", |_, value, _| Ok(value))
            .map_err(|failures| ValidationError::new(self.name(), failures).into())
    }

    /// An instance with every field at its default.
    pub fn defaults(&self) -> Result<Instance, ModelError> {
        self.construct(std::iter::empty::<(String, Value)>())
    }

    /// Binds supplied values to fields in declaration order.
    ///
    /// `prepare` turns a supplied wire-level value into the field's value before the
    /// constraints run; failures are reported under `prefix.field`.
    pub(crate) fn bind_with<F>(
        &self,
        mut supplied: OrderedMap,
        prefix: &str,
        mut prepare: F,
    ) -> Result<Instance, Vec<FieldFailure>>
    where
        F: FnMut(&FieldDescriptor, Value, &str) -> Result<Value, Vec<FieldFailure>>,
    {
        let mut values = Vec::with_capacity(self.fields().len());
        let mut failures = Vec::new();

        for field in self.fields() {
            let path = join_path(prefix, field.name());
            let value = match supplied.remove(field.name()) {
                Some(raw) => match prepare(field, raw, &path) {
                    Ok(value) => value,
                    Err(nested) => {
                        failures.extend(nested);
                        continue;
                    },
                },
                None => match field.fallback() {
                    Some(value) => {
                        values.push(value);
                        continue;
                    },
                    None => {
                        failures.push(FieldFailure::new(path, vec![Cow::Borrowed("Field required")]));
                        continue;
                    },
                },
            };

            let messages = field.check(&value);
            if messages.is_empty() {
                values.push(value);
            } else {
                failures.push(FieldFailure::new(path, messages));
            }
        }

        for key in supplied.keys().filter(|k| *k != TAG_KEY) {
            trace!(model = self.name(), key, "Ignoring key that names no field");
        }

        if failures.is_empty() {
            Ok(Instance::from_parts(self.clone(), values))
        } else {
            Err(failures)
        }
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() { name.to_owned() } else { format!("{prefix}.{name}") }
}
