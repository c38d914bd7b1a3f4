//! Field declarations and the per-field data contract.
//!
//! A [`Field`] is the declaration a caller writes; [`Field::build`] checks it and
//! produces the immutable [`FieldDescriptor`] a model definition is made of. The
//! descriptor's constraint list always starts with the type check, followed by the
//! not-null check for required fields, followed by the declared constraints in the
//! order they were added.

use crate::constraint::{self, Constraint, Number};
use crate::error::{FieldFailure, ModelError};
use crate::model::TAG_KEY;
use crate::types::FieldType;
use crate::value::Value;
use std::borrow::Cow;

/// A field declaration under construction.
///
/// ```
/// use microdantic::{Field, FieldType, Value};
///
/// let quantity = Field::new("quantity", FieldType::Int).default(10).ge(0).build()?;
/// assert!(quantity.check(&Value::Int(-3)).iter().any(|m| m.contains("greater than or equal to 0")));
/// # Ok::<(), microdantic::ModelError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use = "a field does nothing until it is built or added to a model"]
pub struct Field {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    required: bool,
    constraints: Vec<Constraint>,
    discriminator: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            required: true,
            constraints: Vec::new(),
            discriminator: None,
        }
    }

    /// The value bound when construction supplies none. Checked at registration.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Admits `null`; without a default the field is bound to `null`.
    pub fn optional(self) -> Self {
        self.required(false)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn ge(self, bound: impl Into<Number>) -> Self {
        self.constraint(Constraint::ge(bound))
    }

    pub fn gt(self, bound: impl Into<Number>) -> Self {
        self.constraint(Constraint::gt(bound))
    }

    pub fn le(self, bound: impl Into<Number>) -> Self {
        self.constraint(Constraint::le(bound))
    }

    pub fn lt(self, bound: impl Into<Number>) -> Self {
        self.constraint(Constraint::lt(bound))
    }

    pub fn min_len(self, len: usize) -> Self {
        self.constraint(Constraint::MinLen(len))
    }

    pub fn max_len(self, len: usize) -> Self {
        self.constraint(Constraint::MaxLen(len))
    }

    pub fn one_of<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        self.constraint(Constraint::one_of(values))
    }

    /// Adds a custom predicate with its failure message.
    pub fn validate(
        self,
        message: impl Into<Cow<'static, str>>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.constraint(Constraint::custom(message, check))
    }

    /// Names the literal field that tells the models of a union apart.
    pub fn discriminator(mut self, key: impl Into<String>) -> Self {
        self.discriminator = Some(key.into());
        self
    }

    /// Checks the declaration and produces its descriptor.
    pub fn build(self) -> Result<FieldDescriptor, ModelError> {
        let name = self.name;
        let fail = |message: Cow<'static, str>| {
            ModelError::definition(format!("field `{name}`: {message}"))
        };

        if name.trim().is_empty() {
            return Err(ModelError::definition("field names cannot be empty"));
        }
        if name == TAG_KEY {
            return Err(fail(format!("`{TAG_KEY}` is reserved for the model tag").into()));
        }
        self.ty.check_declaration().map_err(fail)?;
        for c in &self.constraints {
            if matches!(c, Constraint::Type(_) | Constraint::NotNull) {
                return Err(fail("type and null checks are derived from the declaration".into()));
            }
            c.check_declaration(&self.ty).map_err(fail)?;
        }
        constraint::check_consistency(&self.constraints).map_err(fail)?;
        if self.required && self.default.as_ref().is_some_and(Value::is_null) {
            return Err(fail("a required field cannot default to null".into()));
        }
        if let Some(key) = &self.discriminator {
            if key.trim().is_empty() {
                return Err(fail("the discriminator key cannot be empty".into()));
            }
            if discriminated_union(&self.ty).is_none() {
                return Err(fail(
                    format!("a discriminator needs a union of models, not {}", self.ty).into(),
                ));
            }
        }

        let mut constraints = Vec::with_capacity(self.constraints.len() + 2);
        constraints.push(Constraint::Type(self.ty.clone()));
        if self.required {
            constraints.push(Constraint::NotNull);
        }
        constraints.extend(self.constraints);

        Ok(FieldDescriptor {
            name,
            ty: self.ty,
            default: self.default,
            required: self.required,
            constraints,
            discriminator: self.discriminator,
        })
    }
}

/// The union of models a discriminator applies to, at the top level or as the
/// element type of a container.
pub(crate) fn discriminated_union(ty: &FieldType) -> Option<&FieldType> {
    match ty {
        FieldType::Union(_) if !ty.union_models().is_empty() => Some(ty),
        FieldType::Seq(inner) | FieldType::Map(inner) => discriminated_union(inner),
        _ => None,
    }
}

/// Finalised metadata of one field of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    required: bool,
    constraints: Vec<Constraint>,
    discriminator: Option<String>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn field_type(&self) -> &FieldType {
        &self.ty
    }

    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// The full ordered constraint list, type check first.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// Messages of every constraint `value` violates; empty when it is valid.
    #[must_use]
    pub fn check(&self, value: &Value) -> Vec<Cow<'static, str>> {
        constraint::check_all(&self.constraints, value)
    }

    /// Returns the candidate when it satisfies every constraint.
    pub fn validate_and_set(&self, candidate: Value) -> Result<Value, FieldFailure> {
        let messages = self.check(&candidate);
        if messages.is_empty() {
            Ok(candidate)
        } else {
            Err(FieldFailure::new(self.name.clone(), messages))
        }
    }

    /// The value bound when construction supplies none, or `None` when the field
    /// must be supplied.
    pub(crate) fn fallback(&self) -> Option<Value> {
        match (&self.default, self.required) {
            (Some(v), _) => Some(v.clone()),
            (None, false) => Some(Value::Null),
            (None, true) => None,
        }
    }
}
