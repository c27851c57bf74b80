//! # Schema Descriptions
//!
//! Forms can be written as data:
//!
//! ```yaml
//! strict: true
//! fields:
//!   - name: email
//!     validators:
//!       - type: IsString
//!         params: {minLength: 3}
//! ```
//!
//! [`from_config`] checks a description against a fixed meta-schema (itself
//! a [`Form`]), coerces it into [`FormDescription`] records and resolves
//! every validator through a [`FormDescriptionContext`]. [`Form::describe`]
//! goes the other way, so load → describe → load yields a form that
//! validates the same way.
//!
//! Descriptions may embed `examples`. [`Form::check_examples`] runs them.

use std::fmt;
use std::sync::Arc;

use formwork_core::{Map, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::coerce::{coerce, decoerce, Coercible, FieldShape, Kind, Shape};
use crate::error::{CoerceError, SchemaError};
use crate::form::{Field, FieldExample, Form, FormExample};
use crate::registry::FormDescriptionContext;
use crate::validator::{run_chain, Validator};
use crate::validators::IsStringMap;

fn is_false(b: &bool) -> bool {
    !*b
}

/// `{type, params}` description of one validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorDescription {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map,
}

impl ValidatorDescription {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl Coercible for ValidatorDescription {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("ValidatorDescription")
                .field(FieldShape::new("type", Kind::String).required())
                .field(FieldShape::new("params", Kind::map(Kind::Any)))
        });
        &SHAPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDescription {
    pub name: String,
    pub validators: Vec<ValidatorDescription>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<FieldExample>,
}

impl Coercible for FieldDescription {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("FieldDescription")
                .field(FieldShape::new("name", Kind::String).required())
                .field(FieldShape::new(
                    "validators",
                    Kind::list(Kind::record::<ValidatorDescription>()),
                ))
                .field(FieldShape::new("examples", Kind::list(Kind::record::<FieldExample>())))
        });
        &SHAPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDescription {
    #[serde(skip_serializing_if = "is_false")]
    pub strict: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub sanitize_keys: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<FormExample>,
    pub fields: Vec<FieldDescription>,
}

impl Coercible for FormDescription {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("FormDescription")
                .field(FieldShape::new("strict", Kind::Bool))
                .field(FieldShape::new("sanitize_keys", Kind::Bool).key("sanitizeKeys"))
                .field(FieldShape::new("name", Kind::optional(Kind::String)))
                .field(FieldShape::new("error_msg", Kind::optional(Kind::String)).key("errorMsg"))
                .field(FieldShape::new("examples", Kind::list(Kind::record::<FormExample>())))
                .field(FieldShape::new(
                    "fields",
                    Kind::list(Kind::record::<FieldDescription>()),
                ))
        });
        &SHAPE
    }
}

fn flag(name: &str) -> Field {
    Field::new(name, vec![Validator::optional_or(false), Validator::boolean()])
}

fn any_map() -> Validator {
    Validator::IsStringMap(IsStringMap::default())
}

fn list_of(form: &Lazy<Arc<Form>>) -> Validator {
    Validator::list(vec![Validator::string_map(Arc::clone(form))])
}

pub(crate) static VALIDATOR_DESCRIPTION_FORM: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(
        Form::new(vec![
            Field::new("type", vec![Validator::IsRequired, Validator::string()]),
            Field::new("params", vec![Validator::optional_or(Map::new()), any_map()]),
        ])
        .strict(),
    )
});

static FIELD_EXAMPLE_FORM: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![Field::new("value", vec![]), flag("invalid")]).strict())
});

static FORM_EXAMPLE_FORM: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(
        Form::new(vec![
            Field::new("value", vec![Validator::IsRequired, any_map()]),
            flag("invalid"),
        ])
        .strict(),
    )
});

static FIELD_FORM: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(
        Form::new(vec![
            Field::new("name", vec![Validator::IsRequired, Validator::string()]),
            Field::new(
                "validators",
                vec![
                    Validator::optional_or(Value::List(Vec::new())),
                    list_of(&VALIDATOR_DESCRIPTION_FORM),
                ],
            ),
            Field::new("examples", vec![Validator::optional(), list_of(&FIELD_EXAMPLE_FORM)]),
        ])
        .strict(),
    )
});

/// Meta-schema every form description must satisfy.
pub(crate) static FORM_FORM: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(
        Form::new(vec![
            Field::new("fields", vec![Validator::IsRequired, list_of(&FIELD_FORM)]),
            flag("strict"),
            flag("sanitizeKeys"),
            Field::new("name", vec![Validator::optional(), Validator::string()]),
            Field::new("errorMsg", vec![Validator::optional(), Validator::string()]),
            Field::new("examples", vec![Validator::optional(), list_of(&FORM_EXAMPLE_FORM)]),
        ])
        .strict(),
    )
});

impl FormDescription {
    /// Checks a raw description against the meta-schema and coerces it.
    pub fn parse(description: &Map) -> Result<Self, SchemaError> {
        let checked = FORM_FORM
            .validate(description)
            .map_err(SchemaError::InvalidDescription)?;
        Ok(coerce(&Value::Map(checked))?)
    }

    /// Resolves every validator and builds the live form.
    pub fn build(&self, ctx: &FormDescriptionContext) -> Result<Form, SchemaError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let validators = ctx.resolve_chain(&field.validators)?;
            fields.push(Field::new(field.name.clone(), validators).with_examples(field.examples.clone()));
        }
        tracing::debug!(
            form = self.name.as_deref().unwrap_or(""),
            fields = fields.len(),
            "built form from description"
        );
        Ok(Form {
            fields,
            strict: self.strict,
            sanitize_keys: self.sanitize_keys,
            error_msg: self.error_msg.clone(),
            name: self.name.clone(),
            examples: self.examples.clone(),
            ..Form::default()
        })
    }

    /// Renders the description as data, keyed the way it is written.
    pub fn to_value(&self) -> Result<Value, CoerceError> {
        decoerce(self)
    }
}

/// Builds a live form from a data description.
pub fn from_config(description: &Map, ctx: &FormDescriptionContext) -> Result<Form, SchemaError> {
    FormDescription::parse(description)?.build(ctx)
}

/// Renders a parameter record as a description `params` map.
pub(crate) fn record_params<T: Coercible>(record: &T) -> Result<Map, SchemaError> {
    Ok(decoerce(record)?.into_map().unwrap_or_default())
}

pub(crate) fn describe_chain(
    chain: &[Validator],
    ctx: &FormDescriptionContext,
) -> Result<Vec<ValidatorDescription>, SchemaError> {
    chain.iter().map(|v| v.describe(ctx)).collect()
}

impl Validator {
    /// Describes this validator as `{type, params}`.
    ///
    /// Fails for code-defined validators and for types `ctx` does not know.
    pub fn describe(&self, ctx: &FormDescriptionContext) -> Result<ValidatorDescription, SchemaError> {
        let type_name = self.type_name();
        if !self.is_self_describing() {
            return Err(SchemaError::NotDescribable(format!("validator {type_name}")));
        }
        if !ctx.contains(type_name) {
            return Err(SchemaError::NotRegistered(type_name.to_string()));
        }
        let params = match self {
            Validator::IsString(v) => record_params(v)?,
            Validator::IsInteger(v) => record_params(v)?,
            Validator::IsFloat(v) => record_params(v)?,
            Validator::IsBoolean(v) => record_params(v)?,
            Validator::IsBytes(v) => record_params(v)?,
            Validator::IsHex(v) => record_params(v)?,
            Validator::IsUuid(v) => record_params(v)?,
            Validator::IsTime(v) => record_params(v)?,
            Validator::MatchesRegex(v) => record_params(&v.params())?,
            Validator::IsIn(v) => record_params(v)?,
            Validator::IsNotIn(v) => record_params(v)?,
            Validator::IsOptional(v) => record_params(v)?,
            Validator::IsNil(v) => record_params(v)?,
            Validator::IsRequired | Validator::CanBeAnything => Map::new(),
            Validator::IsList(v) => v.describe_params(ctx)?,
            Validator::IsStringList(v) => v.describe_params(ctx)?,
            Validator::IsStringMap(v) => v.describe_params(ctx)?,
            Validator::Or(v) => v.describe_params(ctx)?,
            Validator::Switch(v) => v.describe_params(ctx)?,
            Validator::Custom(_) => {
                return Err(SchemaError::NotDescribable(format!("validator {type_name}")))
            }
        };
        Ok(ValidatorDescription {
            type_name: type_name.to_string(),
            params,
        })
    }
}

/// An embedded example that did not behave as declared.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleFailure {
    /// Dotted location of the example, e.g. `address.fields.street.examples.0`.
    pub location: String,
    /// The example was declared valid.
    pub expected_valid: bool,
    /// Validation error of an example declared valid.
    pub error: Option<String>,
}

impl fmt::Display for ExampleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.expected_valid) {
            (Some(err), _) => write!(f, "{}: expected valid, got: {err}", self.location),
            (None, true) => write!(f, "{}: expected valid", self.location),
            (None, false) => write!(f, "{}: expected invalid, but it validated", self.location),
        }
    }
}

impl Form {
    /// Builds a live form from a data description.
    pub fn from_config(description: &Map, ctx: &FormDescriptionContext) -> Result<Form, SchemaError> {
        from_config(description, ctx)
    }

    /// Describes this form as data.
    ///
    /// Forms with transforms or a whole-form hook hold code and cannot be
    /// described.
    pub fn describe(&self, ctx: &FormDescriptionContext) -> Result<FormDescription, SchemaError> {
        if !self.transforms.is_empty() || self.validator.is_some() {
            return Err(SchemaError::NotDescribable(format!(
                "form '{}' with code hooks",
                self.name.as_deref().unwrap_or("")
            )));
        }
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            fields.push(FieldDescription {
                name: field.name.clone(),
                validators: describe_chain(&field.validators, ctx)?,
                examples: field.examples.clone(),
            });
        }
        Ok(FormDescription {
            strict: self.strict,
            sanitize_keys: self.sanitize_keys,
            name: self.name.clone(),
            error_msg: self.error_msg.clone(),
            examples: self.examples.clone(),
            fields,
        })
    }

    /// Runs every embedded example of this form and its nested forms.
    pub fn check_examples(&self) -> Vec<ExampleFailure> {
        let mut failures = Vec::new();
        let root = self.name.clone().unwrap_or_else(|| "form".to_string());
        self.collect_example_failures(&root, &mut failures);
        failures
    }

    fn collect_example_failures(&self, location: &str, failures: &mut Vec<ExampleFailure>) {
        for (i, example) in self.examples.iter().enumerate() {
            let result = self.validate(&example.value).map_err(|e| e.to_string());
            if let Some(failure) = judge(format!("{location}.examples.{i}"), example.invalid, result) {
                failures.push(failure);
            }
        }
        for field in &self.fields {
            let field_location = format!("{location}.fields.{}", field.name);
            for (i, example) in field.examples.iter().enumerate() {
                let result = run_chain(&field.validators, example.value.clone(), &Map::new(), None)
                    .map_err(|e| e.to_string());
                if let Some(failure) = judge(format!("{field_location}.examples.{i}"), example.invalid, result) {
                    failures.push(failure);
                }
            }
            for validator in &field.validators {
                for nested in nested_forms(validator) {
                    nested.collect_example_failures(&field_location, failures);
                }
            }
        }
    }
}

fn judge<T>(location: String, invalid: bool, result: Result<T, String>) -> Option<ExampleFailure> {
    match (invalid, result) {
        (false, Err(error)) => Some(ExampleFailure {
            location,
            expected_valid: true,
            error: Some(error),
        }),
        (true, Ok(_)) => Some(ExampleFailure {
            location,
            expected_valid: false,
            error: None,
        }),
        _ => None,
    }
}

/// Sub-forms reachable from a validator without crossing another form.
fn nested_forms(validator: &Validator) -> Vec<&Form> {
    let chains: Vec<&Vec<Validator>> = match validator {
        Validator::IsStringMap(map) => return map.form.as_deref().into_iter().collect(),
        Validator::IsList(list) => vec![&list.validators],
        Validator::IsStringList(list) => vec![&list.validators],
        Validator::Or(or) => or.options.iter().collect(),
        Validator::Switch(switch) => switch.cases.values().chain(switch.default.as_ref()).collect(),
        _ => Vec::new(),
    };
    chains.into_iter().flatten().flat_map(nested_forms).collect()
}
