//! Conversion between instances, ordered maps, canonical text and framed bytes.
//!
//! The text form is compact JSON whose object keys follow field declaration order,
//! led by the [`TAG_KEY`] entry when the model's tag flag is set. Byte sequences travel
//! as standard base64 strings. The framed form is the text form's UTF-8 bytes plus a
//! single trailing `\n`.

use crate::error::{FieldFailure, ModelError, ValidationError};
use crate::instance::Instance;
use crate::model::{Model, TAG_KEY, join_path};
use crate::registry::Registry;
use crate::types::FieldType;
use crate::value::{OrderedMap, Value};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// The frame delimiter.
pub const FRAME_DELIMITER: u8 = b'\n';

/// What a payload is decoded into.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Exactly this model; discrimination is bypassed.
    Concrete(&'a Model),
    /// Whichever registered model the payload resolves to.
    Family,
}

impl<'a> From<&'a Model> for Target<'a> {
    fn from(model: &'a Model) -> Self {
        Self::Concrete(model)
    }
}

impl Instance {
    /// Field name to value in declaration order, nested instances converted to maps.
    /// Leads with the [`TAG_KEY`] entry when the model's tag flag is set.
    #[must_use]
    pub fn to_ordered_map(&self) -> OrderedMap {
        let mut map = OrderedMap::with_capacity(self.values().len() + 1);
        if self.model().serialize_name() {
            map.insert(TAG_KEY, self.model().name());
        }
        for (name, value) in self.iter() {
            map.insert(name, unnest(value));
        }
        map
    }

    /// Canonical text form.
    ///
    /// Fails with [`ModelError::Serialization`] when a float is NaN or infinite.
    pub fn to_text(&self) -> Result<String, ModelError> {
        serde_json::to_string(self).map_err(serialization)
    }

    /// Text form as UTF-8 bytes with one trailing newline.
    pub fn to_framed_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let mut frame = serde_json::to_vec(self).map_err(serialization)?;
        frame.push(FRAME_DELIMITER);
        Ok(frame)
    }
}

fn unnest(value: &Value) -> Value {
    match value {
        Value::Model(instance) => Value::Map(instance.to_ordered_map()),
        Value::Seq(items) => Value::Seq(items.iter().map(unnest).collect()),
        Value::Map(map) => Value::Map(map.iter().map(|(k, v)| (k, unnest(v))).collect()),
        other => other.clone(),
    }
}

fn serialization(err: serde_json::Error) -> ModelError {
    ModelError::Serialization { message: err.to_string().into(), context: None }
}

impl Registry {
    /// Builds an instance from its ordered-map form.
    ///
    /// With [`Target::Concrete`] the map is bound directly to that model's fields and
    /// a tag naming another model is a validation failure. With [`Target::Family`] the
    /// model is resolved first. Nested objects bound to model-typed positions are
    /// decoded recursively and their failures reported under dotted paths.
    pub fn from_ordered_map(&self, map: OrderedMap, target: Target<'_>) -> Result<Instance, ModelError> {
        let model = match target {
            Target::Concrete(model) => model,
            Target::Family => self.resolve(&map)?,
        };
        self.decode_model(model, map, "")
            .map_err(|failures| ValidationError::new(model.name(), failures).into())
    }

    /// Parses the text form, then decodes it like [`Registry::from_ordered_map`].
    ///
    /// Malformed JSON, or JSON that is not an object, is a [`ModelError::Parse`].
    pub fn from_text(&self, text: &str, target: Target<'_>) -> Result<Instance, ModelError> {
        let map: OrderedMap = serde_json::from_str(text)?;
        self.from_ordered_map(map, target)
    }

    /// Strips the single trailing newline, then decodes like [`Registry::from_text`].
    ///
    /// A frame without the delimiter is a [`ModelError::IncompleteFrame`]; invalid
    /// UTF-8 is a [`ModelError::Encoding`].
    pub fn from_framed_bytes(&self, frame: &[u8], target: Target<'_>) -> Result<Instance, ModelError> {
        let Some((&FRAME_DELIMITER, body)) = frame.split_last() else {
            return Err(ModelError::IncompleteFrame { buffered: frame.len(), context: None });
        };
        let text = std::str::from_utf8(body)?;
        self.from_text(text, target)
    }

    fn decode_model(
        &self,
        model: &Model,
        map: OrderedMap,
        prefix: &str,
    ) -> Result<Instance, Vec<FieldFailure>> {
        if let Some(tag) = map.get(TAG_KEY) {
            if tag.as_text() != Some(model.name()) {
                let message = format!("Tag must name model `{}`, got {tag}", model.name());
                return Err(vec![FieldFailure::new(join_path(prefix, TAG_KEY), vec![message.into()])]);
            }
        }
        model.bind_with(map, prefix, |field, raw, path| {
            self.lift(raw, field.field_type(), field.discriminator(), path)
        })
    }

    /// Turns a wire-level value into the value a position of type `ty` holds: nested
    /// objects become instances and base64 text becomes bytes. Values that need no
    /// conversion pass through for the field's constraints to judge.
    pub(crate) fn lift(
        &self,
        raw: Value,
        ty: &FieldType,
        discriminator: Option<&str>,
        path: &str,
    ) -> Result<Value, Vec<FieldFailure>> {
        match (ty, raw) {
            (FieldType::Bytes, Value::Text(text)) => decode_base64(&text, path),
            (FieldType::Model(name), Value::Map(map)) => {
                let model = self.get(name).ok_or_else(|| {
                    single(path, format!("Model `{name}` is not registered").into())
                })?;
                self.decode_model(model, map, path).map(Value::from)
            },
            (FieldType::AnyModel, Value::Map(map)) => match self.resolve(&map) {
                Ok(model) => self.decode_model(model, map, path).map(Value::from),
                Err(err) => Err(single(path, err.to_string().into())),
            },
            (FieldType::Any, Value::Map(map)) if map.contains_key(TAG_KEY) => {
                self.lift(Value::Map(map), &FieldType::AnyModel, None, path)
            },
            (FieldType::Any, Value::Seq(items)) => {
                self.lift(Value::Seq(items), &FieldType::seq(FieldType::Any), discriminator, path)
            },
            (FieldType::Any, Value::Map(map)) => {
                self.lift(Value::Map(map), &FieldType::map(FieldType::Any), discriminator, path)
            },
            (FieldType::Union(members), raw) => self.lift_union(members, raw, discriminator, path),
            (FieldType::Seq(inner), Value::Seq(items)) => {
                let mut lifted = Vec::with_capacity(items.len());
                let mut failures = Vec::new();
                for (i, item) in items.into_iter().enumerate() {
                    match self.lift(item, inner, discriminator, &format!("{path}[{i}]")) {
                        Ok(value) => lifted.push(value),
                        Err(nested) => failures.extend(nested),
                    }
                }
                if failures.is_empty() { Ok(Value::Seq(lifted)) } else { Err(failures) }
            },
            (FieldType::Map(inner), Value::Map(map)) => {
                let mut lifted = OrderedMap::with_capacity(map.len());
                let mut failures = Vec::new();
                for (key, item) in map {
                    match self.lift(item, inner, discriminator, &join_path(path, &key)) {
                        Ok(value) => {
                            lifted.insert(key, value);
                        },
                        Err(nested) => failures.extend(nested),
                    }
                }
                if failures.is_empty() { Ok(Value::Map(lifted)) } else { Err(failures) }
            },
            (_, raw) => Ok(raw),
        }
    }

    /// Lifts a union position by the wire kind of `raw`. Declarations guarantee at
    /// most one reading: objects go to the model members when there are any, text
    /// goes to a bytes member only when no member takes text.
    fn lift_union(
        &self,
        members: &[FieldType],
        raw: Value,
        discriminator: Option<&str>,
        path: &str,
    ) -> Result<Value, Vec<FieldFailure>> {
        match raw {
            Value::Text(text) if members.contains(&FieldType::Bytes) => decode_base64(&text, path),
            Value::Map(map) if members.iter().any(|m| matches!(m, FieldType::Model(_) | FieldType::AnyModel)) => {
                let names: Vec<&str> = members
                    .iter()
                    .filter_map(|m| match m {
                        FieldType::Model(name) => Some(name.as_str()),
                        _ => None,
                    })
                    .collect();
                let scope = (!members.contains(&FieldType::AnyModel)).then_some(names.as_slice());
                match self.resolve_in(&map, scope, discriminator) {
                    Ok(model) => self.decode_model(model, map, path).map(Value::from),
                    Err(err) => Err(single(path, err.to_string().into())),
                }
            },
            raw @ (Value::Seq(_) | Value::Map(_)) => {
                let mut first_failure = None;
                for member in members.iter().filter(|m| same_container(m, &raw)) {
                    match self.lift(raw.clone(), member, discriminator, path) {
                        Ok(value) if member.accepts(&value) => return Ok(value),
                        Ok(_) => {},
                        Err(failures) => {
                            first_failure.get_or_insert(failures);
                        },
                    }
                }
                first_failure.map_or(Ok(raw), Err)
            },
            raw => Ok(raw),
        }
    }
}

fn same_container(member: &FieldType, raw: &Value) -> bool {
    matches!((member, raw), (FieldType::Seq(_), Value::Seq(_)) | (FieldType::Map(_), Value::Map(_)))
}

fn single(path: &str, message: Cow<'static, str>) -> Vec<FieldFailure> {
    vec![FieldFailure::new(path, vec![message])]
}

fn decode_base64(text: &str, path: &str) -> Result<Value, Vec<FieldFailure>> {
    STANDARD
        .decode(text)
        .map(Value::Bytes)
        .map_err(|_| single(path, Cow::Borrowed("Value must be valid base64")))
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Self::Float(v) => Err(ser::Error::custom(format!("float {v} has no text rendering"))),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Bytes(v) => serializer.serialize_str(&STANDARD.encode(v)),
            Self::Seq(items) => serializer.collect_seq(items),
            Self::Map(map) => map.serialize(serializer),
            Self::Model(instance) => instance.serialize(serializer),
        }
    }
}

impl Serialize for OrderedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = self.model().serialize_name();
        let mut map = serializer.serialize_map(Some(self.values().len() + usize::from(tagged)))?;
        if tagged {
            map.serialize_entry(TAG_KEY, self.model().name())?;
        }
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {v} does not fit in 64 signed bits")))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Value, A::Error> {
        OrderedMapVisitor.visit_map(map).map(Value::Map)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct OrderedMapVisitor;

impl<'de> Visitor<'de> for OrderedMapVisitor {
    type Value = OrderedMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<OrderedMap, A::Error> {
        let mut map = OrderedMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key `{key}`")));
            }
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for OrderedMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::model::ModelDefinition;

    fn blob_registry() -> (Registry, Model) {
        let mut registry = Registry::new();
        let model = registry
            .register(
                ModelDefinition::builder()
                    .name("Blob")
                    .serialize_name(false)
                    .field(Field::new("data", FieldType::Bytes))
                    .field(Field::new("ratio", FieldType::Float).default(0.5))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        (registry, model)
    }

    #[test]
    fn bytes_travel_as_base64() {
        let (registry, model) = blob_registry();
        let blob = model.construct([("data", vec![0_u8, 1, 2, 254])]).unwrap();

        let text = blob.to_text().unwrap();

        assert_eq!(text, r#"{"data":"AAEC/g==","ratio":0.5}"#);
        assert_eq!(registry.from_text(&text, Target::from(&model)).unwrap(), blob);
    }

    #[test]
    fn invalid_base64_is_a_field_failure() {
        let (registry, model) = blob_registry();

        let err = registry.from_text(r#"{"data":"***"}"#, Target::from(&model)).unwrap_err();

        let failure = err.validation().and_then(|v| v.field("data")).unwrap();
        assert!(failure.mentions("base64"));
    }

    #[test]
    fn non_finite_floats_have_no_text_form() {
        let (_, model) = blob_registry();
        let blob = model.construct([("data", Value::Bytes(Vec::new())), ("ratio", Value::Float(f64::INFINITY))]).unwrap();

        assert!(matches!(blob.to_text(), Err(ModelError::Serialization { .. })));
    }

    #[test]
    fn duplicate_keys_are_parse_errors() {
        let (registry, model) = blob_registry();

        let err = registry.from_text(r#"{"data":"","data":""}"#, Target::from(&model)).unwrap_err();

        assert!(err.is_parse_error());
    }

    #[test]
    fn non_objects_are_parse_errors() {
        let (registry, _) = blob_registry();

        assert!(registry.from_text("[1, 2]", Target::Family).unwrap_err().is_parse_error());
    }

    #[test]
    fn missing_delimiter_is_incomplete() {
        let (registry, model) = blob_registry();

        let err = registry.from_framed_bytes(br#"{"data":""}"#, Target::from(&model)).unwrap_err();

        assert!(err.is_incomplete());
    }

    #[test]
    fn large_unsigned_integers_are_rejected() {
        assert!(serde_json::from_str::<Value>("18446744073709551615").is_err());
        assert_eq!(serde_json::from_str::<Value>("-7").unwrap(), Value::Int(-7));
    }
}
