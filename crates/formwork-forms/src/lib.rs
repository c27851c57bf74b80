//! # formwork-forms: Declarative Validation
//!
//! Validates loosely typed input ([`Value`](formwork_core::Value) trees as
//! parsed from JSON or YAML) against composable validator chains, and maps
//! the result into typed records.
//!
//! ## Architecture
//!
//! - [`coerce`]: structural coercion between dynamic values and typed
//!   records described by a [`Shape`].
//! - [`validator`] and [`validators`]: the closed [`Validator`] enum and the
//!   built-in rules it dispatches to.
//! - [`form`]: [`Form`] and [`Field`], the evaluation loop that aggregates
//!   every failure into one [`FormError`].
//! - [`registry`] and [`schema`]: building forms from `{type, params}`
//!   descriptions and describing live forms back as data.
//!
//! ## Example
//!
//! ```
//! use formwork_core::{Map, Value};
//! use formwork_forms::{Field, Form, Validator};
//!
//! let form = Form::new(vec![Field::new("name", vec![Validator::IsRequired, Validator::string()])])
//!     .strict();
//! let mut input = Map::new();
//! input.insert("name".into(), Value::from("alice"));
//! assert!(form.validate(&input).is_ok());
//! ```

pub mod coerce;
pub mod error;
pub mod form;
pub mod registry;
pub mod schema;
pub mod validator;
pub mod validators;

pub use coerce::{coerce, coerce_value, decoerce, from_normalized, Coercible, FieldShape, Kind, Shape};
pub use error::{
    CoerceError, FieldError, FieldErrors, FormError, PathSegment, SchemaError, ValidationError,
};
pub use form::{Field, FieldExample, Form, FormExample, FormHook, Transform, TransformFn, WILDCARD};
pub use registry::{FormDescriptionContext, ValidatorDefinition, ValidatorMaker};
pub use schema::{
    from_config, ExampleFailure, FieldDescription, FormDescription, ValidatorDescription,
};
pub use validator::{run_chain, run_nested_chain, Custom, Validator};
