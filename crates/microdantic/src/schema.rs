//! # Schema Documents
//!
//! Declarative model definitions in TOML or JSON, so that components built separately
//! can share one definition source:
//!
//! ```toml
//! [[model]]
//! name = "Fruit"
//! serialize_name = false
//!
//! [[model.field]]
//! name = "name"
//! type = "text"
//! max_len = 32
//!
//! [[model.field]]
//! name = "quantity"
//! type = "int"
//! default = 10
//! ge = 0
//! ```
//!
//! Custom predicates are only available through the Rust API.

use crate::constraint::Number;
use crate::error::{ModelError, ModelErrorExt};
use crate::field::Field;
use crate::model::{Model, ModelDefinition};
use crate::registry::Registry;
use crate::types::FieldType;
use crate::value::Value;
use serde::Deserialize;

/// A parsed schema document: models in declaration order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default, rename = "model")]
    pub models: Vec<ModelSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSpec {
    pub name: String,
    #[serde(default = "enabled")]
    pub serialize_name: bool,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default = "enabled")]
    pub required: bool,
    pub ge: Option<Number>,
    pub gt: Option<Number>,
    pub le: Option<Number>,
    pub lt: Option<Number>,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub one_of: Option<Vec<Value>>,
    pub discriminator: Option<String>,
}

const fn enabled() -> bool {
    true
}

impl SchemaDocument {
    /// Parses a TOML document. Syntax and shape errors are [`ModelError::Definition`].
    pub fn from_toml_str(text: &str) -> Result<Self, ModelError> {
        toml::from_str(text).map_err(|err| ModelError::definition(err.to_string()))
    }

    /// Parses a JSON document. Syntax and shape errors are [`ModelError::Parse`].
    pub fn from_json_str(text: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds and registers every model in document order, all or nothing.
    ///
    /// A model may refer to itself and to models declared earlier in the document or
    /// already in `registry`. Defaults are written in the text form: base64 for bytes,
    /// objects for nested models.
    pub fn register_into(&self, registry: &mut Registry) -> Result<Vec<Model>, ModelError> {
        let mut scratch = registry.clone();
        let mut models = Vec::with_capacity(self.models.len());
        for spec in &self.models {
            let definition = spec.to_definition(&scratch)?;
            models.push(scratch.register(definition)?);
        }
        *registry = scratch;
        Ok(models)
    }
}

impl ModelSpec {
    /// Builds the definition; `registry` decodes defaults that hold nested models.
    pub fn to_definition(&self, registry: &Registry) -> Result<ModelDefinition, ModelError> {
        let mut builder = ModelDefinition::builder().name(&self.name).serialize_name(self.serialize_name);
        for spec in &self.fields {
            builder = builder.field(spec.to_field(registry).context(format!("model `{}`", self.name))?);
        }
        builder.build()
    }
}

impl FieldSpec {
    pub fn to_field(&self, registry: &Registry) -> Result<Field, ModelError> {
        let mut field = Field::new(&self.name, self.ty.clone()).required(self.required);

        if let Some(default) = &self.default {
            let value = registry
                .lift(default.clone(), &self.ty, self.discriminator.as_deref(), &self.name)
                .map_err(|failures| {
                    let messages: Vec<String> = failures
                        .iter()
                        .flat_map(|f| f.messages.iter().map(move |m| format!("{}: {m}", f.path)))
                        .collect();
                    ModelError::definition(format!("invalid default ({})", messages.join("; ")))
                })?;
            field = field.default(value);
        }

        if let Some(bound) = self.ge {
            field = field.ge(bound);
        }
        if let Some(bound) = self.gt {
            field = field.gt(bound);
        }
        if let Some(bound) = self.le {
            field = field.le(bound);
        }
        if let Some(bound) = self.lt {
            field = field.lt(bound);
        }
        if let Some(len) = self.min_len {
            field = field.min_len(len);
        }
        if let Some(len) = self.max_len {
            field = field.max_len(len);
        }
        if let Some(values) = &self.one_of {
            field = field.one_of(values.iter().cloned());
        }
        if let Some(key) = &self.discriminator {
            field = field.discriminator(key);
        }
        Ok(field)
    }
}
