//! Pattern and membership validators.

use std::sync::Arc;

use formwork_core::{Map, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::coerce::{Coercible, FieldShape, Kind, Shape};
use crate::error::{SchemaError, ValidationError};
use crate::form::{Field, Form};
use crate::registry::{parse_params, FormDescriptionContext};
use crate::validator::Validator;

// --- MatchesRegex -----------------------------------------------------------

/// Accepts strings the pattern matches anywhere in.
#[derive(Debug, Clone)]
pub struct MatchesRegex {
    regex: Regex,
}

impl MatchesRegex {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let Value::String(s) = input else {
            return Err("expected a string".into());
        };
        if !self.regex.is_match(&s) {
            return Err(format!("regex '{}' did not match", self.regex.as_str()).into());
        }
        Ok(Value::String(s))
    }

    pub(crate) fn params(&self) -> MatchesRegexParams {
        MatchesRegexParams {
            regexp: self.pattern().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct MatchesRegexParams {
    pub regexp: String,
}

impl Coercible for MatchesRegexParams {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("MatchesRegex").field(FieldShape::new("regexp", Kind::String).required())
        });
        &SHAPE
    }
}

pub(crate) static MATCHES_REGEX_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    let compiles = Validator::custom("IsValidRegexp", |input, _| {
        let compiled = input.as_str().map(Regex::new);
        match compiled {
            Some(Ok(_)) => Ok(input),
            Some(Err(e)) => Err(format!("cannot compile regular expression: {e}").into()),
            None => Err("expected a string".into()),
        }
    });
    Arc::new(Form::new(vec![Field::new(
        "regexp",
        vec![Validator::optional_or(".*"), Validator::string(), compiles],
    )]))
});

pub(crate) fn make_matches_regex(
    params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    let params: MatchesRegexParams = parse_params("MatchesRegex", params, &MATCHES_REGEX_PARAMS)?;
    Ok(Validator::MatchesRegex(MatchesRegex::new(&params.regexp)?))
}

// --- IsIn -------------------------------------------------------------------

/// Accepts only values equal to one of `choices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsIn {
    pub choices: Vec<Value>,
}

impl IsIn {
    pub fn new(choices: Vec<Value>) -> Self {
        Self { choices }
    }

    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        if self.choices.contains(&input) {
            return Ok(input);
        }
        let choices: Vec<String> = self.choices.iter().map(ToString::to_string).collect();
        Err(format!("invalid choice, must be one of: {}", choices.join(", ")).into())
    }
}

impl Coercible for IsIn {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsIn").field(FieldShape::new("choices", Kind::list(Kind::Any)).required())
        });
        &SHAPE
    }
}

pub(crate) static IS_IN_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![Field::new(
        "choices",
        vec![Validator::IsRequired, Validator::list(vec![])],
    )]))
});

pub(crate) fn make_is_in(params: &Map, _ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    Ok(Validator::IsIn(parse_params("IsIn", params, &IS_IN_PARAMS)?))
}

// --- IsNotIn ----------------------------------------------------------------

/// Rejects values equal to one of `values`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsNotIn {
    pub values: Vec<Value>,
}

impl IsNotIn {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        match self.values.iter().find(|v| **v == input) {
            Some(illegal) => Err(format!("illegal value: {illegal}").into()),
            None => Ok(input),
        }
    }
}

impl Coercible for IsNotIn {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> =
            Lazy::new(|| Shape::new("IsNotIn").field(FieldShape::new("values", Kind::list(Kind::Any))));
        &SHAPE
    }
}

pub(crate) static IS_NOT_IN_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![Field::new(
        "values",
        vec![Validator::optional_or(Value::List(Vec::new())), Validator::list(vec![])],
    )]))
});

pub(crate) fn make_is_not_in(params: &Map, _ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    Ok(Validator::IsNotIn(parse_params("IsNotIn", params, &IS_NOT_IN_PARAMS)?))
}
