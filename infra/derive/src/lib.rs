#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the microdantic workspace.
//!
//! ## Usage
//! Depend on the crate from any workspace member that declares an error enum:
//! ```toml
//! [dependencies]
//! microdantic-derive.workspace = true
//! thiserror.workspace = true
//! ```

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for declaring crate error enums.
///
/// Turns a plain enum into a `thiserror` error with the conveniences every crate in the
/// workspace relies on.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` when missing.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `source`
///   field, so upstream errors convert with the `?` operator.
/// * **Kind Names**: Generates `const fn kind(&self) -> &'static str` returning the
///   variant name, for use as a structured field in log events.
///
/// Variant names carry no meaning of their own; only `source` fields produce
/// conversions.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with **named-field** variants.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. Variants wrapping an upstream error need a `source` field (or a field marked
///    `#[source]`/`#[from]`) *and* a `context` field.
/// 4. Each source type may appear in one variant only.
///
/// # Example
///
/// ```rust,ignore
/// use microdantic_derive::model_error;
/// use std::borrow::Cow;
///
/// #[model_error]
/// pub enum CodecError {
///     #[error("Parse error{}: {source}", format_context(.context))]
///     Parse { source: serde_json::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Frame too large{}: limit is {limit} bytes", format_context(.context))]
///     FrameTooLarge { limit: usize, context: Option<Cow<'static, str>> },
/// }
///
/// fn decode(text: &str) -> Result<serde_json::Value, CodecError> {
///     serde_json::from_str(text).context("Decoding sensor frame")
/// }
/// ```
#[proc_macro_attribute]
pub fn model_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
