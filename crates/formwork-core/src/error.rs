//! # Error Types: Scoped Chainable Errors
//!
//! Every error that crosses the formwork boundary can be rendered as
//! `{message, code, data}` plus an optional traceback of its causes.
//!
//! ## Scopes
//!
//! - [`ErrorScope::External`] errors are safe to show to an end user.
//! - [`ErrorScope::Internal`] errors only disclose their message and data to
//!   consumers holding internal scope. Everyone else sees
//!   `"undisclosed error"` and the code.
//!
//! Foreign errors (anything that is not a [`ChainableError`]) only appear in
//! a traceback rendered at internal scope, carrying their raw message and
//! Rust type name. The traceback walk stops at the first foreign cause.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::value::Value;

/// Message shown in place of an error the consumer may not see.
pub const UNDISCLOSED_MESSAGE: &str = "undisclosed error";

/// Code attached to foreign causes in a traceback.
pub const FOREIGN_ERROR_CODE: &str = "RUST-ERROR";

/// Visibility tier of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorScope {
    /// Safe to show to end users.
    External = 1,
    /// Only shown to privileged consumers.
    Internal = 2,
}

/// Wire shape of a single error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredError {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Wire shape of an error together with its causes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredErrorWithTraceback {
    #[serde(flatten)]
    pub error: StructuredError,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub traceback: Vec<StructuredError>,
}

/// The cause of a [`ChainableError`].
#[derive(Debug, Clone)]
pub enum Cause {
    /// Another chainable error.
    Chained(ChainableError),
    /// A foreign error, captured by message and type name.
    Foreign { message: String, type_name: String },
}

impl Cause {
    fn message(&self) -> &str {
        match self {
            Cause::Chained(err) => err.message(),
            Cause::Foreign { message, .. } => message,
        }
    }
}

/// An error with a scope, a machine-readable code, optional structured data
/// and an optional parent.
#[derive(Debug, Clone)]
pub struct ChainableError {
    scope: ErrorScope,
    message: String,
    code: String,
    data: Option<Value>,
    parent: Option<Box<Cause>>,
}

impl ChainableError {
    pub fn new(scope: ErrorScope, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            scope,
            message: message.into(),
            code: code.into(),
            data: None,
            parent: None,
        }
    }

    /// An error safe to show to end users.
    pub fn external(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(ErrorScope::External, message, code)
    }

    /// An error whose details are only shown at internal scope.
    pub fn internal(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(ErrorScope::Internal, message, code)
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Chain another chainable error as the parent.
    pub fn caused_by(mut self, parent: ChainableError) -> Self {
        self.parent = Some(Box::new(Cause::Chained(parent)));
        self
    }

    /// Chain a foreign error as the parent, keeping its message and type name.
    pub fn caused_by_foreign<E: std::error::Error>(mut self, err: &E) -> Self {
        self.parent = Some(Box::new(Cause::Foreign {
            message: err.to_string(),
            type_name: std::any::type_name::<E>().to_string(),
        }));
        self
    }

    pub fn scope(&self) -> ErrorScope {
        self.scope
    }

    /// This error's own message, without its causes.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn parent(&self) -> Option<&Cause> {
        self.parent.as_deref()
    }

    /// Render this error alone for a consumer with the given scope.
    pub fn structured(&self, scope: ErrorScope) -> StructuredError {
        if self.scope > scope {
            return StructuredError {
                message: UNDISCLOSED_MESSAGE.to_string(),
                code: self.code.clone(),
                data: None,
            };
        }
        StructuredError {
            message: self.message.clone(),
            code: self.code.clone(),
            data: self.data.clone(),
        }
    }

    /// Render this error and its causes for a consumer with the given scope.
    pub fn structured_with_traceback(&self, scope: ErrorScope) -> StructuredErrorWithTraceback {
        let mut traceback = Vec::new();
        let mut parent = self.parent();
        while let Some(cause) = parent {
            match cause {
                Cause::Chained(err) => {
                    traceback.push(err.structured(scope));
                    parent = err.parent();
                }
                Cause::Foreign { message, type_name } => {
                    if scope >= ErrorScope::Internal {
                        let mut data = crate::value::Map::new();
                        data.insert("type".to_string(), Value::from(type_name.as_str()));
                        traceback.push(StructuredError {
                            message: message.clone(),
                            code: FOREIGN_ERROR_CODE.to_string(),
                            data: Some(Value::Map(data)),
                        });
                    }
                    break;
                }
            }
        }
        StructuredErrorWithTraceback {
            error: self.structured(scope),
            traceback,
        }
    }
}

impl fmt::Display for ChainableError {
    /// Messages concatenated up the chain: `outer: middle: root`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        let mut parent = self.parent();
        while let Some(cause) = parent {
            write!(f, ": {}", cause.message())?;
            parent = match cause {
                Cause::Chained(err) => err.parent(),
                Cause::Foreign { .. } => None,
            };
        }
        Ok(())
    }
}

impl std::error::Error for ChainableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.parent() {
            Some(Cause::Chained(err)) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while loading documents into the dynamic value model.
#[derive(Error, Debug)]
pub enum ValueError {
    /// A map key was not a string.
    #[error("map keys must be strings, found {0}")]
    NonStringKey(String),

    /// A YAML number could not be represented.
    #[error("unsupported number: {0}")]
    UnsupportedNumber(String),

    /// The document was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document was not valid YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A typed value could not be read from or written to the value model.
    #[error("{0}")]
    Serde(String),
}

impl serde::de::Error for ValueError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValueError::Serde(msg.to_string())
    }
}

impl serde::ser::Error for ValueError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValueError::Serde(msg.to_string())
    }
}
