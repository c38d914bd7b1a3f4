//! Declared field types and exact type membership.

use crate::model::TAG_KEY;
use crate::value::Value;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;

/// The type a field declares.
///
/// Membership is exact: no numeric coercion, and `null` is never a member. Whether a
/// field admits `null` is decided by its required flag, not by its type.
///
/// In schema documents the simple types are written as strings (`"int"`), the
/// parameterised ones as single-key tables (`{ seq = "int" }`, `{ model = "Fruit" }`,
/// `{ union = ["int", "float"] }`, `{ literal = ["apple", "banana"] }`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Text,
    Bytes,
    /// Any non-null value that can be told apart on the wire: no bytes, no NaN, no
    /// untagged instances and no maps carrying the tag key.
    Any,
    /// A sequence whose every element is a member of the inner type.
    Seq(Box<FieldType>),
    /// A text-keyed mapping whose every value is a member of the inner type.
    Map(Box<FieldType>),
    /// An instance of the named model.
    Model(String),
    /// An instance of any registered model.
    AnyModel,
    /// Exactly one of several member types.
    Union(Vec<FieldType>),
    /// Equality with one of a fixed, ordered set of scalar values.
    Literal(Vec<Value>),
}

impl FieldType {
    #[must_use]
    pub fn seq(inner: Self) -> Self {
        Self::Seq(Box::new(inner))
    }

    #[must_use]
    pub fn map(inner: Self) -> Self {
        Self::Map(Box::new(inner))
    }

    #[must_use]
    pub fn model(name: impl Into<String>) -> Self {
        Self::Model(name.into())
    }

    #[must_use]
    pub fn union(members: impl IntoIterator<Item = Self>) -> Self {
        Self::Union(members.into_iter().collect())
    }

    #[must_use]
    pub fn literal<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Literal(values.into_iter().map(Into::into).collect())
    }

    /// Exact membership test for a non-null value.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => false,
            (Self::Float, Value::Float(v)) => !v.is_nan(),
            (Self::Int, Value::Int(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::Text, Value::Text(_))
            | (Self::Bytes, Value::Bytes(_))
            | (Self::AnyModel, Value::Model(_)) => true,
            (Self::Any, v) => self_describing(v),
            (Self::Seq(inner), Value::Seq(items)) => items.iter().all(|v| inner.accepts(v)),
            (Self::Map(inner), Value::Map(map)) => map.values().all(|v| inner.accepts(v)),
            (Self::Model(name), Value::Model(instance)) => instance.model().name() == name,
            (Self::Union(members), v) => members.iter().any(|m| m.accepts(v)),
            (Self::Literal(allowed), v) => allowed.contains(v),
            _ => false,
        }
    }

    #[must_use]
    pub fn literal_values(&self) -> Option<&[Value]> {
        match self {
            Self::Literal(values) => Some(values),
            _ => None,
        }
    }

    /// Whether bound constraints (`ge`, `lt`, ...) can apply to members of this type.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        match self {
            Self::Int | Self::Float | Self::Any => true,
            Self::Union(members) => members.iter().any(Self::is_ordered),
            Self::Literal(values) => {
                values.iter().any(|v| matches!(v, Value::Int(_) | Value::Float(_)))
            },
            _ => false,
        }
    }

    /// Whether length constraints can apply to members of this type.
    #[must_use]
    pub fn is_sized(&self) -> bool {
        match self {
            Self::Text | Self::Bytes | Self::Seq(_) | Self::Map(_) | Self::Any => true,
            Self::Union(members) => members.iter().any(Self::is_sized),
            Self::Literal(values) => values.iter().any(|v| matches!(v, Value::Text(_))),
            _ => false,
        }
    }

    /// Names of the models this type refers to directly or through containers.
    pub fn referenced_models(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_models(&mut names);
        names
    }

    fn collect_models<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Model(name) => names.push(name),
            Self::Seq(inner) | Self::Map(inner) => inner.collect_models(names),
            Self::Union(members) => members.iter().for_each(|m| m.collect_models(names)),
            _ => {},
        }
    }

    /// Model members of a union, in declaration order.
    pub(crate) fn union_models(&self) -> Vec<&str> {
        match self {
            Self::Union(members) => members
                .iter()
                .filter_map(|m| match m {
                    Self::Model(name) => Some(name.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    const fn is_model(&self) -> bool {
        matches!(self, Self::Model(_) | Self::AnyModel)
    }

    fn takes_text(&self) -> bool {
        match self {
            Self::Text => true,
            Self::Literal(values) => values.iter().any(|v| matches!(v, Value::Text(_))),
            _ => false,
        }
    }

    /// Checks the shape of the declaration itself.
    pub(crate) fn check_declaration(&self) -> Result<(), Cow<'static, str>> {
        match self {
            Self::Seq(inner) | Self::Map(inner) => inner.check_declaration(),
            Self::Model(name) if name.trim().is_empty() => {
                Err("model type must name a model".into())
            },
            Self::Union(members) => {
                if members.len() < 2 {
                    return Err(format!("union must list at least two types, got {}", members.len())
                        .into());
                }
                for (i, member) in members.iter().enumerate() {
                    if matches!(member, Self::Union(_)) {
                        return Err("union members cannot themselves be unions".into());
                    }
                    if members[..i].contains(member) {
                        return Err(format!("union lists `{member}` more than once").into());
                    }
                    for earlier in &members[..i] {
                        let discriminated = earlier.is_model() && member.is_model();
                        if !discriminated && shares_wire_form(earlier, member) {
                            return Err(format!(
                                "union members `{earlier}` and `{member}` cannot be told apart in the text form"
                            )
                            .into());
                        }
                    }
                    member.check_declaration()?;
                }
                Ok(())
            },
            Self::Literal(values) => {
                if values.is_empty() {
                    return Err("literal must enumerate at least one value".into());
                }
                for (i, value) in values.iter().enumerate() {
                    if !value.is_scalar() {
                        return Err(format!(
                            "literal values must be scalars, got a {} value",
                            value.kind()
                        )
                        .into());
                    }
                    if values[..i].contains(value) {
                        return Err(format!("literal lists {value} more than once").into());
                    }
                }
                Ok(())
            },
            _ => Ok(()),
        }
    }
}

/// Whether a value decodes back to itself under [`FieldType::Any`], which has no
/// declared type to steer decoding.
fn self_describing(value: &Value) -> bool {
    match value {
        Value::Float(v) => !v.is_nan(),
        Value::Bytes(_) => false,
        Value::Seq(items) => items.iter().all(self_describing),
        Value::Map(map) => !map.contains_key(TAG_KEY) && map.values().all(self_describing),
        Value::Model(instance) => instance.model().serialize_name(),
        _ => true,
    }
}

/// Whether some text-form payload would decode differently as `a` than as `b`.
///
/// Bytes travel as base64 text and instances as objects, so those collide with text
/// and map members. Model pairs collide only inside containers: at the top of a
/// union they are told apart by discrimination.
fn shares_wire_form(a: &FieldType, b: &FieldType) -> bool {
    match (a, b) {
        (FieldType::Any, _) | (_, FieldType::Any) => true,
        (FieldType::Union(members), other) | (other, FieldType::Union(members)) => {
            members.iter().any(|m| (m.is_model() && other.is_model()) || shares_wire_form(m, other))
        },
        (FieldType::Bytes, other) | (other, FieldType::Bytes) => other.takes_text(),
        (FieldType::Seq(x), FieldType::Seq(y)) | (FieldType::Map(x), FieldType::Map(y)) => {
            (x.is_model() && y.is_model()) || shares_wire_form(x, y)
        },
        (FieldType::Map(_), other) | (other, FieldType::Map(_)) => other.is_model(),
        _ => false,
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Bool => f.write_str("bool"),
            Self::Text => f.write_str("text"),
            Self::Bytes => f.write_str("bytes"),
            Self::Any => f.write_str("any"),
            Self::Seq(inner) => write!(f, "seq[{inner}]"),
            Self::Map(inner) => write!(f, "map[{inner}]"),
            Self::Model(name) => f.write_str(name),
            Self::AnyModel => f.write_str("model"),
            Self::Union(members) => write_list(f, "Union", members),
            Self::Literal(values) => write_list(f, "Literal", values),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, head: &str, items: &[T]) -> fmt::Result {
    write!(f, "{head}[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_accepts_exact_members_only() {
        let number = FieldType::union([FieldType::Int, FieldType::Float]);

        assert!(number.accepts(&Value::Int(3)));
        assert!(number.accepts(&Value::Float(3.0)));
        assert!(!number.accepts(&Value::from("3")));
        assert!(!number.accepts(&Value::Null));
        assert_eq!(number.to_string(), "Union[int, float]");
    }

    #[test]
    fn test_literal_requires_equality() {
        let fruit = FieldType::literal(["apple", "banana"]);

        assert!(fruit.accepts(&Value::from("apple")));
        assert!(!fruit.accepts(&Value::from("orange")));
        assert_eq!(fruit.to_string(), "Literal['apple', 'banana']");
    }

    #[test]
    fn test_containers_check_every_element() {
        let ints = FieldType::seq(FieldType::Int);

        assert!(ints.accepts(&Value::Seq(vec![Value::Int(1), Value::Int(2)])));
        assert!(!ints.accepts(&Value::Seq(vec![Value::Int(1), Value::Float(2.0)])));
    }

    #[test]
    fn test_malformed_declarations_are_reported() {
        assert!(FieldType::union([FieldType::Int]).check_declaration().is_err());
        assert!(FieldType::Literal(Vec::new()).check_declaration().is_err());
        assert!(FieldType::literal([Value::Seq(Vec::new())]).check_declaration().is_err());
        assert!(FieldType::literal([1, 1]).check_declaration().is_err());
        assert!(FieldType::seq(FieldType::union([FieldType::Int, FieldType::Text]))
            .check_declaration()
            .is_ok());
    }

    #[test]
    fn test_unions_must_be_distinguishable_on_the_wire() {
        let rejected = [
            FieldType::union([FieldType::Text, FieldType::Bytes]),
            FieldType::union([FieldType::Bytes, FieldType::literal(["raw"])]),
            FieldType::union([FieldType::Int, FieldType::Any]),
            FieldType::union([FieldType::map(FieldType::Int), FieldType::model("Fruit")]),
            FieldType::union([FieldType::seq(FieldType::Text), FieldType::seq(FieldType::Bytes)]),
            FieldType::union([FieldType::seq(FieldType::model("A")), FieldType::seq(FieldType::model("B"))]),
        ];
        for ty in rejected {
            assert!(ty.check_declaration().is_err(), "{ty} should be rejected");
        }

        let accepted = [
            FieldType::union([FieldType::Int, FieldType::Bytes]),
            FieldType::union([FieldType::model("A"), FieldType::model("B"), FieldType::Int]),
            FieldType::union([FieldType::seq(FieldType::Int), FieldType::seq(FieldType::Text)]),
            FieldType::union([FieldType::Text, FieldType::literal([1, 2])]),
        ];
        for ty in accepted {
            assert!(ty.check_declaration().is_ok(), "{ty} should be accepted");
        }
    }

    #[test]
    fn test_any_holds_only_self_describing_values() {
        assert!(FieldType::Any.accepts(&Value::from("text")));
        assert!(FieldType::Any.accepts(&Value::Seq(vec![Value::Int(1), Value::Null])));
        assert!(!FieldType::Any.accepts(&Value::Bytes(vec![1, 2])));
        assert!(!FieldType::Any.accepts(&Value::Seq(vec![Value::Bytes(Vec::new())])));
        assert!(!FieldType::Any.accepts(&Value::Float(f64::NAN)));

        let mut tagged = crate::value::OrderedMap::new();
        tagged.insert(TAG_KEY, Value::from("Fruit"));
        assert!(!FieldType::Any.accepts(&Value::Map(tagged)));
    }

    #[test]
    fn test_nan_is_not_a_float_member() {
        assert!(FieldType::Float.accepts(&Value::Float(f64::INFINITY)));
        assert!(!FieldType::Float.accepts(&Value::Float(f64::NAN)));
        assert!(!FieldType::union([FieldType::Int, FieldType::Float]).accepts(&Value::Float(f64::NAN)));
    }
}
