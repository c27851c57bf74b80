//! # Validator Registry
//!
//! A [`FormDescriptionContext`] maps validator type names to a
//! [`ValidatorDefinition`]: the maker that builds a live [`Validator`] from
//! `params`, and the parameter [`Form`] those params must satisfy.
//!
//! Registries are built up front and then only read. [`FormDescriptionContext::global`]
//! is the process-wide registry of built-in validators, built on first use.

use std::fmt;
use std::sync::Arc;

use formwork_core::{Map, Value};
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::coerce::{coerce, Coercible};
use crate::error::SchemaError;
use crate::form::Form;
use crate::schema::ValidatorDescription;
use crate::validator::Validator;
use crate::validators::*;

/// Builds a validator from its (unchecked) params.
pub type ValidatorMaker = fn(&Map, &FormDescriptionContext) -> Result<Validator, SchemaError>;

#[derive(Clone)]
pub struct ValidatorDefinition {
    pub maker: ValidatorMaker,
    /// Parameter form the maker validates `params` against.
    pub form: Arc<Form>,
}

impl fmt::Debug for ValidatorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorDefinition")
            .field("params", &self.param_names())
            .finish_non_exhaustive()
    }
}

impl ValidatorDefinition {
    pub fn new(maker: ValidatorMaker, form: Arc<Form>) -> Self {
        Self { maker, form }
    }

    /// Description keys the validator accepts.
    pub fn param_names(&self) -> Vec<&str> {
        self.form.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormDescriptionContext {
    validators: IndexMap<String, ValidatorDefinition>,
}

static GLOBAL: Lazy<FormDescriptionContext> = Lazy::new(FormDescriptionContext::with_builtins);

impl FormDescriptionContext {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in validator.
    pub fn with_builtins() -> Self {
        let builtins: [(&str, ValidatorMaker, &Lazy<Arc<Form>>); 20] = [
            ("IsString", make_is_string, &IS_STRING_PARAMS),
            ("IsInteger", make_is_integer, &IS_INTEGER_PARAMS),
            ("IsFloat", make_is_float, &IS_FLOAT_PARAMS),
            ("IsBoolean", make_is_boolean, &IS_BOOLEAN_PARAMS),
            ("IsBytes", make_is_bytes, &IS_BYTES_PARAMS),
            ("IsHex", make_is_hex, &IS_HEX_PARAMS),
            ("IsUUID", make_is_uuid, &IS_UUID_PARAMS),
            ("IsTime", make_is_time, &IS_TIME_PARAMS),
            ("MatchesRegex", make_matches_regex, &MATCHES_REGEX_PARAMS),
            ("IsIn", make_is_in, &IS_IN_PARAMS),
            ("IsNotIn", make_is_not_in, &IS_NOT_IN_PARAMS),
            ("IsRequired", make_is_required, &NO_PARAMS),
            ("IsOptional", make_is_optional, &IS_OPTIONAL_PARAMS),
            ("IsNil", make_is_nil, &IS_NIL_PARAMS),
            ("CanBeAnything", make_can_be_anything, &NO_PARAMS),
            ("IsList", make_is_list, &IS_LIST_PARAMS),
            ("IsStringList", make_is_string_list, &IS_STRING_LIST_PARAMS),
            ("IsStringMap", make_is_string_map, &IS_STRING_MAP_PARAMS),
            ("Or", make_or, &OR_PARAMS),
            ("Switch", make_switch, &SWITCH_PARAMS),
        ];
        let mut ctx = Self::new();
        for (name, maker, form) in builtins {
            ctx.register(name, ValidatorDefinition::new(maker, Arc::clone(form)));
        }
        ctx
    }

    /// The shared registry of built-in validators.
    pub fn global() -> &'static FormDescriptionContext {
        &GLOBAL
    }

    /// Adds or replaces a validator type.
    pub fn register(&mut self, name: impl Into<String>, definition: ValidatorDefinition) {
        self.validators.insert(name.into(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&ValidatorDefinition> {
        self.validators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&str, &ValidatorDefinition)> {
        self.validators.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Builds the live validator for one description.
    pub fn resolve(&self, description: &ValidatorDescription) -> Result<Validator, SchemaError> {
        let definition = self
            .get(&description.type_name)
            .ok_or_else(|| SchemaError::UnknownValidator(description.type_name.clone()))?;
        tracing::trace!(validator = %description.type_name, "resolving validator");
        (definition.maker)(&description.params, self)
    }

    pub fn resolve_chain(&self, descriptions: &[ValidatorDescription]) -> Result<Vec<Validator>, SchemaError> {
        descriptions.iter().map(|d| self.resolve(d)).collect()
    }
}

/// Checks `params` against a validator's parameter form and coerces the
/// result into its parameter record.
pub(crate) fn parse_params<T: Coercible>(
    validator: &str,
    params: &Map,
    form: &Form,
) -> Result<T, SchemaError> {
    let checked = form.validate(params).map_err(|source| SchemaError::InvalidParams {
        validator: validator.to_string(),
        source,
    })?;
    Ok(coerce(&Value::Map(checked))?)
}
