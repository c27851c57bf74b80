//! Composite validators: lists, nested forms, alternatives and switches.
//!
//! These hold nested validator chains (or a whole sub-form) and are what
//! makes a description recursive. Their makers resolve nested descriptions
//! through the same registry that resolved them.

use std::sync::Arc;

use formwork_core::{Map, Value};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::flag_param;
use crate::coerce::{coerce_value, Coercible, FieldShape, Kind, Shape};
use crate::error::{FieldErrors, FormError, SchemaError, ValidationError};
use crate::form::{Field, Form};
use crate::registry::{parse_params, FormDescriptionContext};
use crate::schema::{
    describe_chain, record_params, FormDescription, ValidatorDescription, FORM_FORM,
    VALIDATOR_DESCRIPTION_FORM,
};
use crate::validator::{run_nested_chain, Validator};

/// `IsList` of description maps, the shape of every nested chain.
fn description_list() -> Validator {
    Validator::list(vec![Validator::string_map(Arc::clone(&VALIDATOR_DESCRIPTION_FORM))])
}

fn description_records() -> Kind {
    Kind::list(Kind::record::<ValidatorDescription>())
}

// --- IsList / IsStringList --------------------------------------------------

/// Accepts lists, running the chain on every element.
#[derive(Debug, Clone, Default)]
pub struct IsList {
    pub validators: Vec<Validator>,
}

impl IsList {
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    /// The first failing element aborts with a form error keyed by its index.
    pub fn validate(
        &self,
        input: Value,
        values: &Map,
        ctx: Option<&Map>,
    ) -> Result<Value, ValidationError> {
        let Value::List(items) = input else {
            return Err("not a list".into());
        };
        if self.validators.is_empty() {
            return Ok(Value::List(items));
        }
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match run_nested_chain(&self.validators, item, values, ctx) {
                Ok(value) => out.push(value),
                Err(err) => {
                    let mut errors = FieldErrors::new();
                    errors.add(i.to_string(), err);
                    return Err(FormError::with_errors("validation error in list value", errors).into());
                }
            }
        }
        Ok(Value::List(out))
    }

    pub(crate) fn describe_params(&self, ctx: &FormDescriptionContext) -> Result<Map, SchemaError> {
        record_params(&IsListParams {
            validators: describe_chain(&self.validators, ctx)?,
        })
    }
}

/// Accepts lists of strings. Every validator runs on every element and must
/// produce a string.
#[derive(Debug, Clone, Default)]
pub struct IsStringList {
    pub validators: Vec<Validator>,
}

impl IsStringList {
    pub fn new(validators: Vec<Validator>) -> Self {
        Self { validators }
    }

    pub fn validate(
        &self,
        input: Value,
        values: &Map,
        ctx: Option<&Map>,
    ) -> Result<Value, ValidationError> {
        let Value::List(items) = input else {
            return Err("not a list".into());
        };
        let mut strings = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(s) => strings.push(s),
                _ => return Err("not a string".into()),
            }
        }
        for validator in &self.validators {
            for entry in strings.iter_mut() {
                let result = validator.validate(Value::String(std::mem::take(entry)), values, ctx)?;
                match result {
                    Value::String(s) => *entry = s,
                    _ => return Err("validator result is not a string".into()),
                }
            }
        }
        Ok(Value::List(strings.into_iter().map(Value::String).collect()))
    }

    pub(crate) fn describe_params(&self, ctx: &FormDescriptionContext) -> Result<Map, SchemaError> {
        record_params(&IsListParams {
            validators: describe_chain(&self.validators, ctx)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct IsListParams {
    pub validators: Vec<ValidatorDescription>,
}

impl Coercible for IsListParams {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsList").field(FieldShape::new("validators", description_records()))
        });
        &SHAPE
    }
}

pub(crate) static IS_LIST_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![Field::new(
        "validators",
        vec![Validator::optional(), description_list()],
    )]))
});

pub(crate) static IS_STRING_LIST_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| Arc::clone(&IS_LIST_PARAMS));

pub(crate) fn make_is_list(params: &Map, ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    let params: IsListParams = parse_params("IsList", params, &IS_LIST_PARAMS)?;
    Ok(Validator::IsList(IsList::new(ctx.resolve_chain(&params.validators)?)))
}

pub(crate) fn make_is_string_list(
    params: &Map,
    ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    let params: IsListParams = parse_params("IsStringList", params, &IS_STRING_LIST_PARAMS)?;
    Ok(Validator::IsStringList(IsStringList::new(
        ctx.resolve_chain(&params.validators)?,
    )))
}

// --- IsStringMap ------------------------------------------------------------

/// Accepts string-keyed maps, optionally validating them with a sub-form and
/// coercing the result into a record shape.
///
/// The sub-form sees the enclosing values under the context key `_parent`.
#[derive(Debug, Clone, Default)]
pub struct IsStringMap {
    pub form: Option<Arc<Form>>,
    /// Output the normalized record map of this shape instead.
    pub coerce: Option<&'static Shape>,
}

/// Context key under which a sub-form sees its enclosing values.
pub const PARENT_CONTEXT_KEY: &str = "_parent";

impl IsStringMap {
    pub fn with_form(form: Arc<Form>) -> Self {
        Self {
            form: Some(form),
            coerce: None,
        }
    }

    pub fn coercing_into(mut self, shape: &'static Shape) -> Self {
        self.coerce = Some(shape);
        self
    }

    pub fn validate(
        &self,
        input: Value,
        values: &Map,
        ctx: Option<&Map>,
    ) -> Result<Value, ValidationError> {
        let Value::Map(map) = input else {
            return Err("not a map".into());
        };
        let validated = match &self.form {
            Some(form) => {
                let mut context = ctx.cloned().unwrap_or_default();
                context.insert(PARENT_CONTEXT_KEY.to_string(), Value::Map(values.clone()));
                form.validate_with_context(&map, &context)?
            }
            None => map,
        };
        match self.coerce {
            Some(shape) => Ok(coerce_value(&Kind::Record(shape), &Value::Map(validated))?),
            None => Ok(Value::Map(validated)),
        }
    }

    pub(crate) fn describe_params(&self, ctx: &FormDescriptionContext) -> Result<Map, SchemaError> {
        if let Some(shape) = self.coerce {
            return Err(SchemaError::NotDescribable(format!(
                "IsStringMap coercing into {}",
                shape.name()
            )));
        }
        let form = self.form.as_ref().map(|form| form.describe(ctx)).transpose()?;
        record_params(&IsStringMapParams { form })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct IsStringMapParams {
    pub form: Option<FormDescription>,
}

impl Coercible for IsStringMapParams {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsStringMap")
                .field(FieldShape::new("form", Kind::optional(Kind::record::<FormDescription>())))
        });
        &SHAPE
    }
}

pub(crate) static IS_STRING_MAP_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![Field::new(
        "form",
        vec![Validator::optional(), Validator::string_map(Arc::clone(&FORM_FORM))],
    )]))
});

pub(crate) fn make_is_string_map(
    params: &Map,
    ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    let params: IsStringMapParams = parse_params("IsStringMap", params, &IS_STRING_MAP_PARAMS)?;
    let form = params.form.map(|desc| desc.build(ctx)).transpose()?;
    Ok(Validator::IsStringMap(IsStringMap {
        form: form.map(Arc::new),
        coerce: None,
    }))
}

// --- Or ---------------------------------------------------------------------

/// Tries each option chain in order; the first one that succeeds wins.
#[derive(Debug, Clone, Default)]
pub struct Or {
    pub options: Vec<Vec<Validator>>,
}

impl Or {
    pub fn new(options: Vec<Vec<Validator>>) -> Self {
        Self { options }
    }

    pub fn validate(
        &self,
        input: Value,
        values: &Map,
        ctx: Option<&Map>,
    ) -> Result<Value, ValidationError> {
        for (i, option) in self.options.iter().enumerate() {
            match run_nested_chain(option, input.clone(), values, ctx) {
                Ok(value) => return Ok(value),
                Err(err) => tracing::trace!(option = i, error = %err, "Or option rejected value"),
            }
        }
        Err("no possible option worked out".into())
    }

    pub(crate) fn describe_params(&self, ctx: &FormDescriptionContext) -> Result<Map, SchemaError> {
        let options = self
            .options
            .iter()
            .map(|option| describe_chain(option, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        record_params(&OrParams { options })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OrParams {
    pub options: Vec<Vec<ValidatorDescription>>,
}

impl Coercible for OrParams {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("Or").field(FieldShape::new("options", Kind::list(description_records())))
        });
        &SHAPE
    }
}

pub(crate) static OR_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![Field::new(
        "options",
        vec![
            Validator::optional_or(Value::List(Vec::new())),
            Validator::list(vec![description_list()]),
        ],
    )]))
});

pub(crate) fn make_or(params: &Map, ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    let params: OrParams = parse_params("Or", params, &OR_PARAMS)?;
    let options = params
        .options
        .iter()
        .map(|option| ctx.resolve_chain(option))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Validator::Or(Or::new(options)))
}

// --- Switch -----------------------------------------------------------------

/// Picks a chain by the already validated string value of a sibling field.
///
/// An absent sibling counts as unmatched. Unmatched values use the `default`
/// chain if there is one; otherwise they fail when `exhaustive` and pass
/// through unchanged when not.
#[derive(Debug, Clone)]
pub struct Switch {
    pub key: String,
    pub cases: IndexMap<String, Vec<Validator>>,
    pub default: Option<Vec<Validator>>,
    pub exhaustive: bool,
}

impl Switch {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cases: IndexMap::new(),
            default: None,
            exhaustive: true,
        }
    }

    pub fn with_case(mut self, value: impl Into<String>, chain: Vec<Validator>) -> Self {
        self.cases.insert(value.into(), chain);
        self
    }

    pub fn with_default(mut self, chain: Vec<Validator>) -> Self {
        self.default = Some(chain);
        self
    }

    pub fn non_exhaustive(mut self) -> Self {
        self.exhaustive = false;
        self
    }

    pub fn validate(
        &self,
        input: Value,
        values: &Map,
        ctx: Option<&Map>,
    ) -> Result<Value, ValidationError> {
        let selector = match values.get(&self.key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => return Err("switch key is not a string".into()),
        };
        let chain = selector
            .and_then(|s| self.cases.get(s))
            .or(self.default.as_ref());
        match chain {
            Some(chain) => run_nested_chain(chain, input, values, ctx),
            None if self.exhaustive => Err(format!(
                "unknown switch case value: '{}'",
                selector.unwrap_or_default()
            )
            .into()),
            None => Ok(input),
        }
    }

    pub(crate) fn describe_params(&self, ctx: &FormDescriptionContext) -> Result<Map, SchemaError> {
        let mut cases = IndexMap::with_capacity(self.cases.len());
        for (value, chain) in &self.cases {
            cases.insert(value.clone(), describe_chain(chain, ctx)?);
        }
        let default = self
            .default
            .as_ref()
            .map(|chain| describe_chain(chain, ctx))
            .transpose()?;
        record_params(&SwitchParams {
            key: self.key.clone(),
            cases,
            default,
            exhaustive: self.exhaustive,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SwitchParams {
    pub key: String,
    pub cases: IndexMap<String, Vec<ValidatorDescription>>,
    pub default: Option<Vec<ValidatorDescription>>,
    pub exhaustive: bool,
}

impl Default for SwitchParams {
    fn default() -> Self {
        Self {
            key: String::new(),
            cases: IndexMap::new(),
            default: None,
            exhaustive: true,
        }
    }
}

impl Coercible for SwitchParams {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("Switch")
                .field(FieldShape::new("key", Kind::String).required())
                .field(FieldShape::new("cases", Kind::map(description_records())))
                .field(FieldShape::new("default", Kind::optional(description_records())))
                .field(FieldShape::new("exhaustive", Kind::Bool))
        });
        &SHAPE
    }
}

static CASES_FORM: Lazy<Arc<Form>> =
    Lazy::new(|| Arc::new(Form::new(vec![Field::wildcard(vec![description_list()])])));

pub(crate) static SWITCH_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![
        Field::new("key", vec![Validator::string()]),
        Field::new(
            "cases",
            vec![
                Validator::optional_or(Value::Map(Map::new())),
                Validator::string_map(Arc::clone(&CASES_FORM)),
            ],
        ),
        Field::new("default", vec![Validator::optional(), description_list()]),
        flag_param("exhaustive", true),
    ]))
});

pub(crate) fn make_switch(params: &Map, ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    let params: SwitchParams = parse_params("Switch", params, &SWITCH_PARAMS)?;
    let mut values: Vec<&String> = params.cases.keys().collect();
    values.sort();
    let mut switch = Switch::new(params.key.clone());
    for value in values {
        if let Some(chain) = params.cases.get(value) {
            switch.cases.insert(value.clone(), ctx.resolve_chain(chain)?);
        }
    }
    if let Some(default) = &params.default {
        switch.default = Some(ctx.resolve_chain(default)?);
    }
    switch.exhaustive = params.exhaustive;
    Ok(Validator::Switch(switch))
}
