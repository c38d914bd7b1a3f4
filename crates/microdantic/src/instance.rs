use crate::error::{FieldFailure, ModelError, ValidationError};
use crate::model::Model;
use crate::value::Value;
use std::borrow::Cow;
use std::fmt;

/// A complete, constraint-valid set of field values for one model.
///
/// Every field is bound and every value satisfies its field's constraints; the only
/// way to change a value is [`Instance::set`], which re-validates and leaves the
/// instance untouched on failure.
#[derive(Debug, Clone)]
pub struct Instance {
    model: Model,
    values: Vec<Value>,
}

impl Instance {
    pub(crate) const fn from_parts(model: Model, values: Vec<Value>) -> Self {
        Self { model, values }
    }

    #[must_use]
    pub const fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.model.field_index(field).map(|i| &self.values[i])
    }

    /// Validates `value` against the field's constraints and stores it.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let Some(index) = self.model.field_index(field) else {
            let failure = FieldFailure::new(field, vec![Cow::Borrowed("Model has no such field")]);
            return Err(ValidationError::new(self.model.name(), vec![failure]).into());
        };
        let value = self.model.fields()[index]
            .validate_and_set(value.into())
            .map_err(|failure| ValidationError::new(self.model.name(), vec![failure]))?;
        self.values[index] = value;
        Ok(())
    }

    /// `(field, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.model.fields().iter().map(|f| f.name()).zip(&self.values)
    }

    /// Values in declaration order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Field-wise equality between instances of the same model.
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.model.name() == other.model.name() && self.values == other.values
    }
}

/// Renders `Name(field=value, ...)` in declaration order.
impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.model.name())?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}
