//! The explicitly owned store of registered models.
//!
//! Registration is the only place metadata is finalised. It happens either
//! explicitly through [`Registry::register`] or deferred through
//! [`Registry::stage`] followed by one [`Registry::finalize`] call during start-up.
//! Nothing is registered implicitly: constructing or decoding never touches the
//! registry's contents.
//!
//! The registry does no internal locking. It is built by a single writer before
//! concurrent readers exist; sharing it afterwards only needs `&Registry`.

use crate::error::ModelError;
use crate::field::discriminated_union;
use crate::model::{Model, ModelDefinition};
use crate::types::FieldType;
use fxhash::FxHashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    models: FxHashMap<String, Model>,
    order: Vec<String>,
    staged: Vec<ModelDefinition>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalises `definition` and publishes it under its name.
    ///
    /// Re-registering an identical definition is a no-op returning the existing
    /// handle. Fails with [`ModelError::Definition`] when the name is taken by a
    /// different definition, a default violates its field's constraints, a field
    /// refers to an unregistered model, or a discriminator is not a literal field of
    /// every member of its union.
    pub fn register(&mut self, definition: ModelDefinition) -> Result<Model, ModelError> {
        self.admit(definition, &[])
    }

    /// Queues `definition` for the next [`Registry::finalize`]. Staged models are
    /// invisible to lookup and discrimination until then.
    pub fn stage(&mut self, definition: ModelDefinition) -> &mut Self {
        self.staged.push(definition);
        self
    }

    /// Number of definitions waiting for [`Registry::finalize`].
    #[must_use]
    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    /// Registers every staged definition, all or nothing.
    ///
    /// Staged definitions may refer to each other in any order. On failure the
    /// registry is left exactly as it was and the staged definitions are discarded.
    pub fn finalize(&mut self) -> Result<Vec<Model>, ModelError> {
        let staged = std::mem::take(&mut self.staged);
        let mut scratch = self.clone();
        let mut models = Vec::with_capacity(staged.len());
        for definition in &staged {
            models.push(scratch.admit(definition.clone(), &staged)?);
        }
        *self = scratch;
        debug!(count = models.len(), "Finalized staged models");
        Ok(models)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Like [`Registry::get`], failing with [`ModelError::UnknownModel`].
    pub fn model(&self, name: &str) -> Result<&Model, ModelError> {
        self.get(name).ok_or_else(|| ModelError::UnknownModel { name: name.to_owned(), context: None })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.order.iter().filter_map(|name| self.models.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn admit(
        &mut self,
        definition: ModelDefinition,
        pending: &[ModelDefinition],
    ) -> Result<Model, ModelError> {
        if let Some(existing) = self.models.get(definition.name()) {
            if *existing.definition() == definition {
                debug!(model = definition.name(), "Model already registered");
                return Ok(existing.clone());
            }
            return Err(ModelError::definition(format!(
                "model `{}` is already registered with a different definition",
                definition.name()
            )));
        }

        self.check(&definition, pending)?;

        let model = Model::finalize(definition);
        self.order.push(model.name().to_owned());
        self.models.insert(model.name().to_owned(), model.clone());
        debug!(
            model = model.name(),
            fields = model.fields().len(),
            literals = model.signature().literals().count(),
            "Registered model"
        );
        Ok(model)
    }

    /// The definition behind `name`, looking at `definition` itself, then the
    /// registered models, then `pending`.
    fn lookup<'a>(
        &'a self,
        name: &str,
        definition: &'a ModelDefinition,
        pending: &'a [ModelDefinition],
    ) -> Option<&'a ModelDefinition> {
        if definition.name() == name {
            return Some(definition);
        }
        self.models
            .get(name)
            .map(|m| m.definition())
            .or_else(|| pending.iter().find(|d| d.name() == name))
    }

    fn check(&self, definition: &ModelDefinition, pending: &[ModelDefinition]) -> Result<(), ModelError> {
        let model = definition.name();

        for field in definition.fields() {
            let ty = field.field_type();

            for name in ty.referenced_models() {
                if self.lookup(name, definition, pending).is_none() {
                    return Err(ModelError::definition(format!(
                        "field `{}` of `{model}` refers to unregistered model `{name}`",
                        field.name()
                    )));
                }
            }

            if let (Some(key), Some(union)) = (field.discriminator(), discriminated_union(ty)) {
                for member in union.union_models() {
                    let is_literal = self
                        .lookup(member, definition, pending)
                        .and_then(|d| d.fields().iter().find(|f| f.name() == key))
                        .is_some_and(|f| matches!(f.field_type(), FieldType::Literal(_)));
                    if !is_literal {
                        return Err(ModelError::definition(format!(
                            "discriminator `{key}` of field `{}` of `{model}` is not a literal field of `{member}`",
                            field.name()
                        )));
                    }
                }
            }

            if let Some(default) = field.default() {
                if let Err(failure) = field.validate_and_set(default.clone()) {
                    return Err(ModelError::definition(format!(
                        "default of field `{}` of `{model}` is invalid: {}",
                        field.name(),
                        failure.messages.join("; ")
                    )));
                }
            }
        }

        Ok(())
    }
}
