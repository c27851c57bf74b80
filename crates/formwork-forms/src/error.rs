//! # Error Types
//!
//! - [`ValidationError`] is what a single validator returns.
//! - [`FormError`] aggregates every field failure of one form run.
//! - [`CoerceError`] reports a structural mismatch together with the full
//!   access path into the source value.
//! - [`SchemaError`] aborts loading or describing a schema.
//!
//! `FormError` and `CoerceError` convert into the scoped
//! [`ChainableError`](formwork_core::ChainableError) with codes
//! `FORM-ERROR` and `COERCE-ERROR`.

use std::fmt;

use formwork_core::{ChainableError, Map, Value};
use indexmap::IndexMap;
use thiserror::Error;

pub const FORM_ERROR_CODE: &str = "FORM-ERROR";
pub const COERCE_ERROR_CODE: &str = "COERCE-ERROR";

/// Message used when a form has no `error_msg` of its own.
pub const DEFAULT_FORM_ERROR_MESSAGE: &str = "invalid input data";

/// Failure of a single validator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0}")]
    Message(String),

    /// A nested form (or list) failed; its per-key detail is kept.
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Coerce(#[from] CoerceError),
}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        ValidationError::Message(message)
    }
}

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        ValidationError::Message(message.to_string())
    }
}

/// One error recorded against a key. Nested form errors stay structured,
/// everything else is kept as its message.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    Message(String),
    Form(FormError),
}

impl FieldError {
    pub fn to_value(&self) -> Value {
        match self {
            FieldError::Message(message) => Value::from(message.as_str()),
            FieldError::Form(err) => err.to_value(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Message(message) => f.write_str(message),
            FieldError::Form(err) => write!(f, "{err}"),
        }
    }
}

impl From<ValidationError> for FieldError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Form(form) => FieldError::Form(form),
            other => FieldError::Message(other.to_string()),
        }
    }
}

impl From<&str> for FieldError {
    fn from(message: &str) -> Self {
        FieldError::Message(message.to_string())
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        FieldError::Message(message)
    }
}

/// Errors collected during one form run, keyed by input key.
///
/// Passed mutably to the whole-form hook so it can add errors under
/// arbitrary keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(IndexMap<String, Vec<FieldError>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, err: impl Into<FieldError>) {
        self.0.entry(key.into()).or_default().push(err.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&[FieldError]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<FieldError>)> {
        self.0.iter()
    }

    /// A key with one error renders as that error, several as a list.
    pub fn to_value(&self) -> Value {
        let map: Map = self
            .0
            .iter()
            .map(|(key, errs)| {
                let rendered = match errs.as_slice() {
                    [single] => single.to_value(),
                    many => Value::List(many.iter().map(FieldError::to_value).collect()),
                };
                (key.clone(), rendered)
            })
            .collect();
        Value::Map(map)
    }
}

/// Aggregated failure of a form (or of a list element).
#[derive(Debug, Clone, PartialEq)]
pub struct FormError {
    message: String,
    errors: FieldErrors,
}

impl FormError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: FieldErrors::new(),
        }
    }

    pub fn with_errors(message: impl Into<String>, errors: FieldErrors) -> Self {
        Self {
            message: message.into(),
            errors,
        }
    }

    /// The base message, without the per-key summary.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &str {
        FORM_ERROR_CODE
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Errors recorded for a key, if any.
    pub fn field(&self, key: &str) -> Option<&[FieldError]> {
        self.errors.get(key)
    }

    /// `{message, code, data}` rendering used when nesting form errors.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("message".to_string(), Value::from(self.to_string()));
        map.insert("code".to_string(), Value::from(FORM_ERROR_CODE));
        if !self.errors.is_empty() {
            map.insert("data".to_string(), self.errors.to_value());
        }
        Value::Map(map)
    }

    pub fn to_chainable(&self) -> ChainableError {
        let err = ChainableError::external(self.to_string(), FORM_ERROR_CODE);
        if self.errors.is_empty() {
            err
        } else {
            err.with_data(self.errors.to_value())
        }
    }
}

impl fmt::Display for FormError {
    /// `message: key(err), key(err)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if self.errors.is_empty() {
            return Ok(());
        }
        f.write_str(": ")?;
        for (i, (key, errs)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}(")?;
            for (j, err) in errs.iter().enumerate() {
                if j > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{err}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl std::error::Error for FormError {}

impl From<FormError> for ChainableError {
    fn from(err: FormError) -> Self {
        err.to_chainable()
    }
}

/// One step of a coercion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Structural mismatch during coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CoerceError {
    message: String,
    path: Vec<PathSegment>,
}

impl CoerceError {
    pub fn new(message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Path joined with dots, e.g. `zap_list.1.zap`.
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn to_chainable(&self) -> ChainableError {
        let path: Vec<Value> = self
            .path
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) => Value::from(key.as_str()),
                PathSegment::Index(i) => Value::Int(*i as i64),
            })
            .collect();
        let mut data = Map::new();
        data.insert("path".to_string(), Value::List(path));
        ChainableError::external(self.to_string(), COERCE_ERROR_CODE).with_data(data)
    }
}

impl fmt::Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} ({})", self.message, self.path_string())
        }
    }
}

impl std::error::Error for CoerceError {}

impl From<CoerceError> for ChainableError {
    fn from(err: CoerceError) -> Self {
        err.to_chainable()
    }
}

/// Errors raised while building a form from a description or describing a
/// live form. These abort immediately.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unknown validator type: '{0}'")]
    UnknownValidator(String),

    /// The description does not have the expected shape.
    #[error("invalid form description: {0}")]
    InvalidDescription(FormError),

    /// A validator's `params` were rejected by its parameter form.
    #[error("invalid params for {validator}: {source}")]
    InvalidParams {
        validator: String,
        #[source]
        source: FormError,
    },

    #[error(transparent)]
    Coerce(#[from] CoerceError),

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    /// Code-defined validators and closures have no description.
    #[error("{0} cannot be described")]
    NotDescribable(String),

    #[error("validator type '{0}' is not registered")]
    NotRegistered(String),
}
