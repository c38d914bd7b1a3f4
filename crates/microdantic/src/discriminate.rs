//! Recovering the concrete model of an untyped payload.
//!
//! Resolution looks at the explicit tag first, then (inside a discriminated union)
//! the declared discriminator field, then falls back to structural matching
//! against discrimination signatures. Only registered models take part.

use crate::error::{AmbiguityError, ModelError};
use crate::model::{Model, TAG_KEY};
use crate::registry::Registry;
use crate::value::{OrderedMap, Value};
use tracing::trace;

impl Registry {
    /// Finds the unique registered model `payload` belongs to.
    ///
    /// A payload carrying the [`TAG_KEY`] entry resolves to the named model, even when
    /// its literal fields would structurally match a different one. Without a tag the
    /// payload must match exactly one model's discrimination signature.
    pub fn resolve(&self, payload: &OrderedMap) -> Result<&Model, ModelError> {
        self.resolve_in(payload, None, None)
    }

    /// Resolves against `members` only (every registered model when `None`),
    /// consulting `discriminator` before structural matching.
    pub(crate) fn resolve_in(
        &self,
        payload: &OrderedMap,
        members: Option<&[&str]>,
        discriminator: Option<&str>,
    ) -> Result<&Model, ModelError> {
        if let Some(tag) = payload.get(TAG_KEY) {
            let model = match tag {
                Value::Text(name) => self.model(name)?,
                other => {
                    return Err(ModelError::UnknownModel { name: other.to_string(), context: None });
                },
            };
            trace!(model = model.name(), "Resolved payload by tag");
            return Ok(model);
        }

        let candidates: Vec<&Model> = match members {
            Some(names) => names.iter().filter_map(|name| self.get(name)).collect(),
            None => self.iter().collect(),
        };

        if let Some((key, value)) = discriminator.and_then(|k| payload.get(k).map(|v| (k, v))) {
            let matched =
                candidates.iter().copied().filter(|m| m.signature().admits(key, value) == Some(true));
            let model = pick_one(matched)?;
            trace!(model = model.name(), key, "Resolved payload by discriminator");
            return Ok(model);
        }

        let model = pick_one(candidates.into_iter().filter(|m| m.signature().matches(payload)))?;
        trace!(model = model.name(), "Resolved payload by structure");
        Ok(model)
    }
}

fn pick_one<'a>(mut matched: impl Iterator<Item = &'a Model>) -> Result<&'a Model, ModelError> {
    let Some(first) = matched.next() else {
        return Err(AmbiguityError::NoMatch.into());
    };
    let rest: Vec<&Model> = matched.collect();
    if rest.is_empty() {
        return Ok(first);
    }
    let candidates = std::iter::once(first).chain(rest).map(|m| m.name().to_owned()).collect();
    Err(AmbiguityError::Ambiguous { candidates }.into())
}
