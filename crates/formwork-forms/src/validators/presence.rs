//! Presence validators: required, optional with defaults, nil, anything.

use std::fmt;
use std::sync::Arc;

use formwork_core::{Map, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::flag_param;
use crate::coerce::{Coercible, FieldShape, Kind, Shape};
use crate::error::{SchemaError, ValidationError};
use crate::form::{Field, Form};
use crate::registry::{parse_params, FormDescriptionContext};
use crate::validator::Validator;

/// Produces a fresh default for each missing value.
pub type DefaultGenerator = Arc<dyn Fn() -> Value + Send + Sync>;

/// Treats `Null` and `""` as missing and substitutes the default (or the
/// generator's output). Without either, the chain stops.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IsOptional {
    pub default: Option<Value>,
    #[serde(skip)]
    pub default_generator: Option<DefaultGenerator>,
}

impl IsOptional {
    pub fn with_default(default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            default_generator: None,
        }
    }

    pub fn with_generator<F>(generator: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            default: None,
            default_generator: Some(Arc::new(generator)),
        }
    }

    pub fn validate(&self, input: Value) -> Value {
        let missing = match &input {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if !missing {
            return input;
        }
        match (&self.default, &self.default_generator) {
            (Some(default), _) if !default.is_null() => default.clone(),
            (_, Some(generator)) => generator(),
            _ => Value::Null,
        }
    }
}

impl fmt::Debug for IsOptional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsOptional")
            .field("default", &self.default)
            .field("default_generator", &self.default_generator.is_some())
            .finish()
    }
}

impl Coercible for IsOptional {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> =
            Lazy::new(|| Shape::new("IsOptional").field(FieldShape::new("default", Kind::Any)));
        &SHAPE
    }
}

pub(crate) static IS_OPTIONAL_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![Field::new(
        "default",
        vec![Validator::optional(), Validator::CanBeAnything],
    )]))
});

pub(crate) fn make_is_optional(
    params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    Ok(Validator::IsOptional(parse_params("IsOptional", params, &IS_OPTIONAL_PARAMS)?))
}

/// Accepts only missing values. With `allow_null`, `""` and `0` also count
/// as missing. Always yields `Null`, which ends the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsNil {
    pub allow_null: bool,
}

impl Default for IsNil {
    fn default() -> Self {
        Self { allow_null: true }
    }
}

impl IsNil {
    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let blank = matches!(&input, Value::String(s) if s.is_empty()) || input == Value::Int(0);
        if input.is_null() || (self.allow_null && blank) {
            return Ok(Value::Null);
        }
        Err(format!("expected a nil value, got '{input}'").into())
    }
}

impl Coercible for IsNil {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsNil").field(FieldShape::new("allow_null", Kind::Bool).key("allowNull"))
        });
        &SHAPE
    }
}

pub(crate) static IS_NIL_PARAMS: Lazy<Arc<Form>> =
    Lazy::new(|| Arc::new(Form::new(vec![flag_param("allowNull", true)])));

pub(crate) fn make_is_nil(params: &Map, _ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    Ok(Validator::IsNil(parse_params("IsNil", params, &IS_NIL_PARAMS)?))
}

/// Parameter form of validators that take no parameters.
pub(crate) static NO_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| Arc::new(Form::default()));

pub(crate) fn make_is_required(
    params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    NO_PARAMS
        .validate(params)
        .map_err(|source| SchemaError::InvalidParams {
            validator: "IsRequired".to_string(),
            source,
        })?;
    Ok(Validator::IsRequired)
}

pub(crate) fn make_can_be_anything(
    _params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    Ok(Validator::CanBeAnything)
}
