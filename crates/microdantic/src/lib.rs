//! Constraint-checked data models that independently built components can exchange
//! and interpret identically.
//!
//! # Core Features
//!
//! - **Data contracts**: every field carries an ordered constraint list (exact type,
//!   bounds, lengths, membership, custom predicates). Construction and mutation check all
//!   of it and report every failure at once; an invalid instance never exists.
//! - **Explicit registration**: a [`Registry`] finalises each [`ModelDefinition`] once,
//!   during start-up, and hands back a [`Model`] handle. Nothing is registered lazily.
//! - **Discrimination**: untyped payloads resolve to their concrete model by explicit tag,
//!   declared discriminator, or literal-field signature.
//! - **Wire forms**: canonical JSON text in declaration order and a newline-framed byte
//!   form for `readline`-style transports, with [`FrameBuffer`] to split a stream.
//! - **Content hash**: a 32-bit fixed-width hash of the canonical value encoding, equal
//!   across hosts for structurally equal instances.
//!
//! The crate performs no I/O, spawns nothing and takes no locks; every operation is
//! synchronous and bounded by the size of its input.
//!
//! # Examples
//!
//! ```rust
//! use microdantic::{Field, FieldType, ModelDefinition, ModelError, Registry, Target, Value};
//!
//! # fn main() -> Result<(), ModelError> {
//! let mut registry = Registry::new();
//! let fruit = registry.register(
//!     ModelDefinition::builder()
//!         .name("Fruit")
//!         .field(Field::new("name", FieldType::Text).max_len(10))
//!         .field(Field::new("quantity", FieldType::Int).default(1).ge(0))
//!         .field(Field::new("weight", FieldType::Float).default(5.0))
//!         .build()?,
//! )?;
//!
//! let apple = fruit.construct([("quantity", Value::Int(5)), ("name", Value::from("apple"))])?;
//! assert_eq!(apple.to_string(), "Fruit(name='apple', quantity=5, weight=5.0)");
//!
//! let frame = apple.to_framed_bytes()?;
//! assert_eq!(frame, b"{\"__model__\":\"Fruit\",\"name\":\"apple\",\"quantity\":5,\"weight\":5.0}\n");
//! assert_eq!(registry.from_framed_bytes(&frame, Target::Family)?, apple);
//! # Ok(())
//! # }
//! ```
//!
//! Violations are collected per field:
//!
//! ```rust
//! # use microdantic::{Field, FieldType, ModelDefinition, ModelError, Registry, Value};
//! # fn main() -> Result<(), ModelError> {
//! # let mut registry = Registry::new();
//! # let fruit = registry.register(
//! #     ModelDefinition::builder()
//! #         .name("Fruit")
//! #         .field(Field::new("name", FieldType::Text).max_len(10))
//! #         .field(Field::new("quantity", FieldType::Int).default(1).ge(0))
//! #         .build()?,
//! # )?;
//! let err = fruit
//!     .construct([("name", Value::from("dragonfruit!")), ("quantity", Value::Int(-1))])
//!     .unwrap_err();
//! let failures = err.validation().unwrap();
//! assert!(failures.field("name").unwrap().mentions("length less than or equal to 10"));
//! assert!(failures.field("quantity").unwrap().mentions("greater than or equal to 0"));
//! # Ok(())
//! # }
//! ```

mod codec;
mod constraint;
mod discriminate;
mod error;
mod field;
mod frame;
mod hash;
mod instance;
mod model;
mod registry;
mod schema;
mod types;
mod value;

pub use codec::{FRAME_DELIMITER, Target};
pub use constraint::{Constraint, Number, Predicate, check_all};
pub use error::{AmbiguityError, FieldFailure, ModelError, ModelErrorExt, ValidationError};
pub use field::{Field, FieldDescriptor};
pub use frame::{DEFAULT_FRAME_LIMIT, FrameBuffer};
pub use hash::{DEFAULT_SEED, Hasher32, hash32};
pub use instance::Instance;
pub use model::{
    DiscriminationSignature, Model, ModelDefinition, ModelDefinitionBuilder, ModelInner, NoName,
    TAG_KEY, WithName,
};
pub use registry::Registry;
pub use schema::{FieldSpec, ModelSpec, SchemaDocument};
pub use types::FieldType;
pub use value::{OrderedMap, Value, ValueKind};
