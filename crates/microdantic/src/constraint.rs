//! Composable predicate + message pairs checked against candidate values.
//!
//! Constraints are pure. A constraint that does not apply to a value's kind (a length
//! bound on an integer, a numeric bound on text) passes, leaving the type check to
//! report the mismatch, so a failure list only ever names constraints the value
//! actually violates. `null` passes everything except [`Constraint::NotNull`].

use crate::types::FieldType;
use crate::value::Value;
use serde::Deserialize;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A numeric bound for the ordered scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Orders a value against this bound; `None` for non-numeric values, `Some(None)`
    /// when the comparison is undefined (NaN).
    fn compare(self, value: &Value) -> Option<Option<Ordering>> {
        let ordering = match (value, self) {
            (Value::Int(v), Self::Int(b)) => Some(v.cmp(&b)),
            (Value::Float(v), Self::Float(b)) => v.partial_cmp(&b),
            (Value::Int(v), Self::Float(b)) => cmp_int_float(*v, b),
            (Value::Float(v), Self::Int(b)) => cmp_int_float(b, *v).map(Ordering::reverse),
            _ => return None,
        };
        Some(ordering)
    }

    fn as_value(self) -> Value {
        match self {
            Self::Int(v) => Value::Int(v),
            Self::Float(v) => Value::Float(v),
        }
    }
}

/// Exact ordering of an integer against a float, without rounding the integer.
fn cmp_int_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63: the first float above every i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return None;
    }
    if float >= LIMIT {
        return Some(Ordering::Less);
    }
    if float < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = float.trunc();
    // In range and integral, so the conversion is exact.
    #[allow(clippy::cast_possible_truncation)]
    let ordering = int.cmp(&(whole as i64));
    Some(ordering.then_with(|| 0.0_f64.total_cmp(&(float - whole))))
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// A user-supplied predicate with a fixed failure message.
///
/// Two predicates are equal only when they share the same closure allocation, so
/// cloning a definition keeps it identical for registration purposes.
#[derive(Clone)]
pub struct Predicate {
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    message: Cow<'static, str>,
}

impl Predicate {
    pub fn new(
        message: impl Into<Cow<'static, str>>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { check: Arc::new(check), message: message.into() }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.check, &other.check) && self.message == other.message
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("message", &self.message).finish_non_exhaustive()
    }
}

/// One rule of a field's data contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Membership in the declared type.
    Type(FieldType),
    /// Rejects `null`; added for every required field.
    NotNull,
    Ge(Number),
    Gt(Number),
    Le(Number),
    Lt(Number),
    MinLen(usize),
    MaxLen(usize),
    /// Equality with one of the listed values.
    OneOf(Vec<Value>),
    Custom(Predicate),
}

impl Constraint {
    pub fn ge(bound: impl Into<Number>) -> Self {
        Self::Ge(bound.into())
    }

    pub fn gt(bound: impl Into<Number>) -> Self {
        Self::Gt(bound.into())
    }

    pub fn le(bound: impl Into<Number>) -> Self {
        Self::Le(bound.into())
    }

    pub fn lt(bound: impl Into<Number>) -> Self {
        Self::Lt(bound.into())
    }

    pub fn one_of<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// A custom rule. The predicate only sees non-null values.
    pub fn custom(
        message: impl Into<Cow<'static, str>>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(Predicate::new(message, check))
    }

    /// Returns `true` when `value` satisfies this constraint.
    #[must_use]
    pub fn check(&self, value: &Value) -> bool {
        if value.is_null() {
            return !matches!(self, Self::NotNull);
        }
        match self {
            Self::Type(ty) => ty.accepts(value),
            Self::NotNull => true,
            Self::Ge(b) => b.compare(value).is_none_or(|o| o.is_some_and(Ordering::is_ge)),
            Self::Gt(b) => b.compare(value).is_none_or(|o| o.is_some_and(Ordering::is_gt)),
            Self::Le(b) => b.compare(value).is_none_or(|o| o.is_some_and(Ordering::is_le)),
            Self::Lt(b) => b.compare(value).is_none_or(|o| o.is_some_and(Ordering::is_lt)),
            Self::MinLen(n) => value.len().is_none_or(|len| len >= *n),
            Self::MaxLen(n) => value.len().is_none_or(|len| len <= *n),
            Self::OneOf(allowed) => allowed.contains(value),
            Self::Custom(p) => (p.check)(value),
        }
    }

    /// The human-readable failure message.
    #[must_use]
    pub fn message(&self) -> Cow<'static, str> {
        match self {
            Self::Type(ty) => format!("Value must be of type {ty}").into(),
            Self::NotNull => "Value must not be null".into(),
            Self::Ge(b) => format!("Value must be greater than or equal to {b}").into(),
            Self::Gt(b) => format!("Value must be greater than {b}").into(),
            Self::Le(b) => format!("Value must be less than or equal to {b}").into(),
            Self::Lt(b) => format!("Value must be less than {b}").into(),
            Self::MinLen(n) => format!("Value must have length greater than or equal to {n}").into(),
            Self::MaxLen(n) => format!("Value must have length less than or equal to {n}").into(),
            Self::OneOf(allowed) => format!("Value must be one of {}", Value::Seq(allowed.clone())).into(),
            Self::Custom(p) => p.message.clone(),
        }
    }

    /// Checks that this constraint can apply to members of `ty`.
    pub(crate) fn check_declaration(&self, ty: &FieldType) -> Result<(), Cow<'static, str>> {
        match self {
            Self::Ge(_) | Self::Gt(_) | Self::Le(_) | Self::Lt(_) if !ty.is_ordered() => {
                Err(format!("bound constraints do not apply to type {ty}").into())
            },
            Self::MinLen(_) | Self::MaxLen(_) if !ty.is_sized() => {
                Err(format!("length constraints do not apply to type {ty}").into())
            },
            Self::OneOf(allowed) if allowed.is_empty() => {
                Err("one_of must list at least one value".into())
            },
            Self::OneOf(allowed) => match allowed.iter().find(|v| !ty.accepts(v)) {
                Some(v) => Err(format!("one_of value {v} is not of type {ty}").into()),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

/// Applies every constraint (no short-circuit) and collects all failure messages.
#[must_use]
pub fn check_all(constraints: &[Constraint], value: &Value) -> Vec<Cow<'static, str>> {
    constraints.iter().filter(|c| !c.check(value)).map(Constraint::message).collect()
}

/// Rejects bound and length combinations that no value could satisfy.
pub(crate) fn check_consistency(constraints: &[Constraint]) -> Result<(), Cow<'static, str>> {
    let mut min_len = None;
    let mut max_len = None;
    let mut lower: Option<(Number, bool)> = None;
    let mut upper: Option<(Number, bool)> = None;

    for c in constraints {
        match c {
            Constraint::MinLen(n) => min_len = Some(min_len.map_or(*n, |m: usize| m.max(*n))),
            Constraint::MaxLen(n) => max_len = Some(max_len.map_or(*n, |m: usize| m.min(*n))),
            Constraint::Ge(b) => lower = tighten(lower, *b, true, Ordering::Greater),
            Constraint::Gt(b) => lower = tighten(lower, *b, false, Ordering::Greater),
            Constraint::Le(b) => upper = tighten(upper, *b, true, Ordering::Less),
            Constraint::Lt(b) => upper = tighten(upper, *b, false, Ordering::Less),
            _ => {},
        }
    }

    if let (Some(min), Some(max)) = (min_len, max_len) {
        if min > max {
            return Err(format!("min_len {min} exceeds max_len {max}").into());
        }
    }

    if let (Some((lo, lo_inclusive)), Some((hi, hi_inclusive))) = (lower, upper) {
        let satisfiable = match hi.compare(&lo.as_value()).flatten() {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => lo_inclusive && hi_inclusive,
            _ => false,
        };
        if !satisfiable {
            return Err(format!("lower bound {lo} and upper bound {hi} admit no value").into());
        }
    }

    Ok(())
}

/// Keeps whichever of `held` and the new bound is tighter. `tighter` is the direction
/// a stricter bound moves in: greater for lower bounds, less for upper bounds.
fn tighten(
    held: Option<(Number, bool)>,
    bound: Number,
    inclusive: bool,
    tighter: Ordering,
) -> Option<(Number, bool)> {
    let Some((current, current_inclusive)) = held else {
        return Some((bound, inclusive));
    };
    let replace = match current.compare(&bound.as_value()).flatten() {
        Some(Ordering::Equal) => current_inclusive && !inclusive,
        Some(ordering) => ordering == tighter,
        None => true,
    };
    Some(if replace { (bound, inclusive) } else { (current, current_inclusive) })
}
