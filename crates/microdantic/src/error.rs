//! # Model Errors
//!
//! This module defines [`ModelError`], the single error type returned by registration,
//! construction, mutation, discrimination and decoding, together with the structured
//! payloads it carries: [`ValidationError`] (every failing field, every failing message)
//! and [`AmbiguityError`] (zero or several candidate models).

use std::borrow::Cow;
use std::fmt;

/// Failed constraint messages for one field of one model.
///
/// `path` is the field name; failures inside nested models are reported with a dotted
/// path (`ingredient.name`) and failures inside sequences with an index (`readings[3]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub path: String,
    pub messages: Vec<Cow<'static, str>>,
}

impl FieldFailure {
    #[must_use]
    pub fn new(path: impl Into<String>, messages: Vec<Cow<'static, str>>) -> Self {
        Self { path: path.into(), messages }
    }

    /// Returns `true` when any message contains `needle`.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.contains(needle))
    }
}

/// Every constraint violation found while constructing or mutating an instance.
///
/// Failures appear in field declaration order; a field with several violated
/// constraints lists their messages in constraint order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    model: Box<str>,
    failures: Vec<FieldFailure>,
}

impl ValidationError {
    pub(crate) fn new(model: &str, failures: Vec<FieldFailure>) -> Self {
        Self { model: model.into(), failures }
    }

    /// Name of the model whose contract was violated.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// The failure recorded for `path`, if any.
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&FieldFailure> {
        self.failures.iter().find(|f| f.path == path)
    }

    pub(crate) fn into_failures(self) -> Vec<FieldFailure> {
        self.failures
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The following validations failed for `{}`:", self.model)?;
        for failure in &self.failures {
            for message in &failure.messages {
                write!(f, "\n-- {}: {message}", failure.path)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Structural discrimination could not settle on exactly one model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmbiguityError {
    #[error("no registered model matches the payload")]
    NoMatch,

    #[error("payload matches several models: {}", candidates.join(", "))]
    Ambiguous { candidates: Vec<String> },
}

/// A specialized [`ModelError`] enum of this crate.
#[microdantic_derive::model_error]
pub enum ModelError {
    /// A model or field definition is malformed, conflicts with a registered model,
    /// or declares a default that violates its own constraints.
    #[error("Definition error{}: {message}", format_context(.context))]
    Definition { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Values violate the data contract of a model.
    #[error("Validation error{}: {source}", format_context(.context))]
    Validation { source: ValidationError, context: Option<Cow<'static, str>> },

    /// A payload carries an explicit tag naming a model that is not registered.
    #[error("Unknown model{}: {name}", format_context(.context))]
    UnknownModel { name: String, context: Option<Cow<'static, str>> },

    /// Structural discrimination found zero or several candidate models.
    #[error("Discrimination error{}: {source}", format_context(.context))]
    Ambiguity { source: AmbiguityError, context: Option<Cow<'static, str>> },

    /// Text is not well-formed JSON or is not a JSON object.
    #[error("Parse error{}: {source}", format_context(.context))]
    Parse { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// Frame bytes are not valid UTF-8.
    #[error("Encoding error{}: {source}", format_context(.context))]
    Encoding { source: std::str::Utf8Error, context: Option<Cow<'static, str>> },

    /// The frame delimiter has not arrived yet; more bytes are needed.
    #[error(
        "Incomplete frame{}: {buffered} bytes received without a trailing newline",
        format_context(.context)
    )]
    IncompleteFrame { buffered: usize, context: Option<Cow<'static, str>> },

    /// A partial frame outgrew the configured buffer limit.
    #[error("Frame too large{}: exceeds {limit} bytes", format_context(.context))]
    FrameTooLarge { limit: usize, context: Option<Cow<'static, str>> },

    /// A value has no text rendering.
    #[error("Serialization error{}: {message}", format_context(.context))]
    Serialization { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ModelError {
    pub(crate) fn definition(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Definition { message: message.into(), context: None }
    }

    /// Returns `true` for malformed input bytes (as opposed to well-formed data that
    /// violates a model's contract).
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Encoding { .. })
    }

    /// Returns `true` when the caller should wait for more bytes and retry.
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::IncompleteFrame { .. })
    }

    /// The validation payload, when this is a [`ModelError::Validation`].
    #[must_use]
    pub const fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The discrimination payload, when this is a [`ModelError::Ambiguity`].
    #[must_use]
    pub const fn ambiguity(&self) -> Option<&AmbiguityError> {
        match self {
            Self::Ambiguity { source, .. } => Some(source),
            _ => None,
        }
    }
}
