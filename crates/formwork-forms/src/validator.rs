//! # Validator Dispatch
//!
//! [`Validator`] is a closed enum over every built-in rule plus one
//! [`Custom`] escape hatch for code-defined closures. A validator receives
//! the current value, the values validated so far in the enclosing form and,
//! for context-aware variants, a context map. It returns the (possibly
//! replaced) value or an error. Inside a form field, returning `Null` stops
//! the chain silently. Chains nested in composites keep running on `Null`.

use std::fmt;
use std::sync::Arc;

use formwork_core::{Map, Value};

use crate::error::ValidationError;
use crate::form::Form;
use crate::validators::{
    IsBoolean, IsBytes, IsFloat, IsHex, IsIn, IsInteger, IsList, IsNil, IsNotIn, IsOptional,
    IsString, IsStringList, IsStringMap, IsTime, IsUuid, MatchesRegex, Or, Switch,
};

/// A single validation rule.
#[derive(Debug, Clone)]
pub enum Validator {
    IsString(IsString),
    IsInteger(IsInteger),
    IsFloat(IsFloat),
    IsBoolean(IsBoolean),
    IsBytes(IsBytes),
    IsHex(IsHex),
    IsUuid(IsUuid),
    IsTime(IsTime),
    MatchesRegex(MatchesRegex),
    IsIn(IsIn),
    IsNotIn(IsNotIn),
    IsRequired,
    IsOptional(IsOptional),
    IsNil(IsNil),
    CanBeAnything,
    IsList(IsList),
    IsStringList(IsStringList),
    IsStringMap(IsStringMap),
    Or(Or),
    Switch(Switch),
    Custom(Custom),
}

impl Validator {
    /// Registry name of this validator.
    pub fn type_name(&self) -> &str {
        match self {
            Validator::IsString(_) => "IsString",
            Validator::IsInteger(_) => "IsInteger",
            Validator::IsFloat(_) => "IsFloat",
            Validator::IsBoolean(_) => "IsBoolean",
            Validator::IsBytes(_) => "IsBytes",
            Validator::IsHex(_) => "IsHex",
            Validator::IsUuid(_) => "IsUUID",
            Validator::IsTime(_) => "IsTime",
            Validator::MatchesRegex(_) => "MatchesRegex",
            Validator::IsIn(_) => "IsIn",
            Validator::IsNotIn(_) => "IsNotIn",
            Validator::IsRequired => "IsRequired",
            Validator::IsOptional(_) => "IsOptional",
            Validator::IsNil(_) => "IsNil",
            Validator::CanBeAnything => "CanBeAnything",
            Validator::IsList(_) => "IsList",
            Validator::IsStringList(_) => "IsStringList",
            Validator::IsStringMap(_) => "IsStringMap",
            Validator::Or(_) => "Or",
            Validator::Switch(_) => "Switch",
            Validator::Custom(custom) => custom.name(),
        }
    }

    /// Whether this validator reads or forwards the validation context.
    pub fn is_context_aware(&self) -> bool {
        match self {
            Validator::IsList(_)
            | Validator::IsStringList(_)
            | Validator::IsStringMap(_)
            | Validator::Or(_)
            | Validator::Switch(_) => true,
            Validator::Custom(custom) => custom.is_context_aware(),
            _ => false,
        }
    }

    /// Whether this validator (shallowly) has a data description.
    pub fn is_self_describing(&self) -> bool {
        match self {
            Validator::Custom(_) => false,
            Validator::IsOptional(optional) => optional.default_generator.is_none(),
            Validator::IsStringMap(map) => map.coerce.is_none(),
            _ => true,
        }
    }

    /// Validates `input`, given the sibling `values` validated so far.
    pub fn validate(
        &self,
        input: Value,
        values: &Map,
        ctx: Option<&Map>,
    ) -> Result<Value, ValidationError> {
        match self {
            Validator::IsString(v) => v.validate(input),
            Validator::IsInteger(v) => v.validate(input),
            Validator::IsFloat(v) => v.validate(input),
            Validator::IsBoolean(v) => v.validate(input),
            Validator::IsBytes(v) => v.validate(input),
            Validator::IsHex(v) => v.validate(input),
            Validator::IsUuid(v) => v.validate(input),
            Validator::IsTime(v) => v.validate(input),
            Validator::MatchesRegex(v) => v.validate(input),
            Validator::IsIn(v) => v.validate(input),
            Validator::IsNotIn(v) => v.validate(input),
            Validator::IsRequired => {
                if input.is_null() {
                    Err("is required".into())
                } else {
                    Ok(input)
                }
            }
            Validator::IsOptional(v) => Ok(v.validate(input)),
            Validator::IsNil(v) => v.validate(input),
            Validator::CanBeAnything => Ok(input),
            Validator::IsList(v) => v.validate(input, values, ctx),
            Validator::IsStringList(v) => v.validate(input, values, ctx),
            Validator::IsStringMap(v) => v.validate(input, values, ctx),
            Validator::Or(v) => v.validate(input, values, ctx),
            Validator::Switch(v) => v.validate(input, values, ctx),
            Validator::Custom(v) => (v.func)(input, values, ctx),
        }
    }

    pub fn optional() -> Self {
        Validator::IsOptional(IsOptional::default())
    }

    /// `IsOptional` that fills in `default` for missing values.
    pub fn optional_or(default: impl Into<Value>) -> Self {
        Validator::IsOptional(IsOptional::with_default(default))
    }

    /// `IsString` without length bounds.
    pub fn string() -> Self {
        Validator::IsString(IsString::default())
    }

    /// `IsInteger` without bounds or string conversion.
    pub fn integer() -> Self {
        Validator::IsInteger(IsInteger::default())
    }

    pub fn boolean() -> Self {
        Validator::IsBoolean(IsBoolean::default())
    }

    pub fn list(validators: Vec<Validator>) -> Self {
        Validator::IsList(IsList::new(validators))
    }

    pub fn string_map(form: Arc<Form>) -> Self {
        Validator::IsStringMap(IsStringMap::with_form(form))
    }

    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value, &Map) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        Validator::Custom(Custom::new(name, func))
    }

    /// A code-defined validator that also receives the validation context.
    pub fn custom_with_context<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value, &Map, Option<&Map>) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        Validator::Custom(Custom::with_context(name, func))
    }
}

/// Run a validator chain on one value the way a form field does.
///
/// Stops at the first error, or silently when a validator returns `Null`.
pub fn run_chain(
    chain: &[Validator],
    input: Value,
    values: &Map,
    ctx: Option<&Map>,
) -> Result<Value, ValidationError> {
    let mut value = input;
    for validator in chain {
        value = validator.validate(value, values, ctx)?;
        if value.is_null() {
            break;
        }
    }
    Ok(value)
}

/// Run a chain nested inside a composite validator.
///
/// Stops at the first error only: a `Null` result is handed on to the next
/// validator, so `[IsOptional, IsString]` still rejects an empty value.
pub fn run_nested_chain(
    chain: &[Validator],
    input: Value,
    values: &Map,
    ctx: Option<&Map>,
) -> Result<Value, ValidationError> {
    chain
        .iter()
        .try_fold(input, |value, validator| validator.validate(value, values, ctx))
}

type CustomFn = dyn Fn(Value, &Map, Option<&Map>) -> Result<Value, ValidationError> + Send + Sync;

/// A code-defined validator. Never self-describing.
#[derive(Clone)]
pub struct Custom {
    name: String,
    func: Arc<CustomFn>,
    context_aware: bool,
}

impl Custom {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value, &Map) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(move |input: Value, values: &Map, _: Option<&Map>| func(input, values)),
            context_aware: false,
        }
    }

    /// Like [`Custom::new`], but `func` also sees the context map. Inside an
    /// `IsStringMap` sub-form the enclosing values sit under `_parent`.
    pub fn with_context<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value, &Map, Option<&Map>) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            context_aware: true,
        }
    }

    /// Passes the value through when `predicate` holds, otherwise stops the
    /// chain by returning `Null`.
    pub fn only_if<P>(predicate: P) -> Self
    where
        P: Fn(&Value, &Map) -> bool + Send + Sync + 'static,
    {
        Self::new("OnlyIf", move |input, values| {
            if predicate(&input, values) {
                Ok(input)
            } else {
                Ok(Value::Null)
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_context_aware(&self) -> bool {
        self.context_aware
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom")
            .field("name", &self.name)
            .field("context_aware", &self.context_aware)
            .finish_non_exhaustive()
    }
}
