//! # Forms
//!
//! A [`Form`] is an ordered list of [`Field`]s plus form-level policy. It is
//! the executable schema: `validate` walks the input, runs each field's
//! validator chain and aggregates every failure into a single [`FormError`].
//!
//! ## Evaluation order
//!
//! 1. With `sanitize_keys`, input keys are lower-cased.
//! 2. Fields run in declaration order. A wildcard field (`*`) runs once per
//!    input key. Validators see the values validated so far.
//! 3. If no field failed, transforms run, then the whole-form hook.
//! 4. With `strict`, undeclared input keys are reported.
//!
//! Field failures never abort the walk; all of them are reported together.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use formwork_core::{Map, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::coerce::{Coercible, FieldShape, Kind, Shape};
use crate::error::{FieldErrors, FormError, ValidationError, DEFAULT_FORM_ERROR_MESSAGE};
use crate::validator::Validator;

/// Field name matching every input key.
pub const WILDCARD: &str = "*";

/// An example value for a single field, checked by [`Form::check_examples`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldExample {
    pub value: Value,
    /// The example is expected to fail validation.
    pub invalid: bool,
}

impl Coercible for FieldExample {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("FieldExample")
                .field(FieldShape::new("value", Kind::Any))
                .field(FieldShape::new("invalid", Kind::Bool))
        });
        &SHAPE
    }
}

/// An example input for a whole form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormExample {
    pub value: Map,
    pub invalid: bool,
}

impl Coercible for FormExample {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("FormExample")
                .field(FieldShape::new("value", Kind::map(Kind::Any)))
                .field(FieldShape::new("invalid", Kind::Bool))
        });
        &SHAPE
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub validators: Vec<Validator>,
    pub examples: Vec<FieldExample>,
}

impl Field {
    pub fn new(name: impl Into<String>, validators: Vec<Validator>) -> Self {
        Self {
            name: name.into(),
            validators,
            examples: Vec::new(),
        }
    }

    /// A field applied to every input key.
    pub fn wildcard(validators: Vec<Validator>) -> Self {
        Self::new(WILDCARD, validators)
    }

    pub fn with_examples(mut self, examples: Vec<FieldExample>) -> Self {
        self.examples = examples;
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }
}

pub type TransformFn = Arc<dyn Fn(&Value, &Map) -> Result<Value, ValidationError> + Send + Sync>;

/// Post-processing bound to one field. Functions run in order on the
/// validated value.
#[derive(Clone)]
pub struct Transform {
    pub field: String,
    pub functions: Vec<TransformFn>,
}

impl Transform {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            functions: Vec::new(),
        }
    }

    pub fn then<F>(mut self, function: F) -> Self
    where
        F: Fn(&Value, &Map) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        self.functions.push(Arc::new(function));
        self
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("field", &self.field)
            .field("functions", &self.functions.len())
            .finish()
    }
}

/// Whole-form hook. May add errors under any key, or fail with a message
/// that replaces the form's error message.
pub type FormHook = Arc<dyn Fn(&Map, &mut FieldErrors) -> Result<(), String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Form {
    pub fields: Vec<Field>,
    /// Reject input keys no field declares.
    pub strict: bool,
    /// Lower-case input keys before lookup.
    pub sanitize_keys: bool,
    pub error_msg: Option<String>,
    pub name: Option<String>,
    pub examples: Vec<FormExample>,
    pub transforms: Vec<Transform>,
    pub validator: Option<FormHook>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("strict", &self.strict)
            .field("sanitize_keys", &self.sanitize_keys)
            .field("error_msg", &self.error_msg)
            .field("examples", &self.examples)
            .field("transforms", &self.transforms)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Form {
    /// A lenient form over `fields`, with no hooks.
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Reports input keys no field declares.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn sanitizing_keys(mut self) -> Self {
        self.sanitize_keys = true;
        self
    }

    pub fn with_error_msg(mut self, message: impl Into<String>) -> Self {
        self.error_msg = Some(message.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_examples(mut self, examples: Vec<FormExample>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Sets the whole-form hook, run after fields and transforms succeed.
    pub fn with_validator<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Map, &mut FieldErrors) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(hook));
        self
    }

    /// Message used when validation fails.
    pub fn error_message(&self) -> &str {
        self.error_msg.as_deref().unwrap_or(DEFAULT_FORM_ERROR_MESSAGE)
    }

    /// Validates `input`, returning the validated values or every failure.
    pub fn validate(&self, input: &Map) -> Result<Map, FormError> {
        self.run(input, false, None)
    }

    /// Validates a partial update: validators are skipped for absent values.
    pub fn validate_update(&self, input: &Map) -> Result<Map, FormError> {
        self.run(input, true, None)
    }

    /// Like [`Form::validate`], handing `ctx` to context-aware validators.
    pub fn validate_with_context(&self, input: &Map, ctx: &Map) -> Result<Map, FormError> {
        self.run(input, false, Some(ctx))
    }

    pub fn validate_update_with_context(&self, input: &Map, ctx: &Map) -> Result<Map, FormError> {
        self.run(input, true, Some(ctx))
    }

    /// Validates an arbitrary value, which must be a map.
    pub fn validate_value(&self, input: &Value) -> Result<Map, FormError> {
        match input {
            Value::Map(map) => self.validate(map),
            _ => Err(FormError::new("invalid input type: not a map")),
        }
    }

    /// Validates decoded query parameters. Every parameter becomes a list of
    /// strings.
    pub fn validate_query(&self, query: &HashMap<String, Vec<String>>) -> Result<Map, FormError> {
        let mut keys: Vec<&String> = query.keys().collect();
        keys.sort();
        let mut input = Map::with_capacity(keys.len());
        for key in keys {
            let values = query[key].iter().cloned().map(Value::String).collect();
            input.insert(key.clone(), Value::List(values));
        }
        self.validate(&input)
    }

    fn run(&self, input: &Map, update: bool, ctx: Option<&Map>) -> Result<Map, FormError> {
        let input: Cow<'_, Map> = if self.sanitize_keys {
            Cow::Owned(input.iter().map(|(k, v)| (k.to_lowercase(), v.clone())).collect())
        } else {
            Cow::Borrowed(input)
        };

        let mut values = Map::new();
        let mut errors = FieldErrors::new();

        for field in &self.fields {
            let keys: Vec<String> = if field.is_wildcard() {
                input.keys().cloned().collect()
            } else {
                vec![field.name.clone()]
            };
            for key in keys {
                let raw = input.get(&key);
                if field.validators.is_empty() {
                    if let Some(raw) = raw {
                        values.insert(key, raw.clone());
                    }
                    continue;
                }
                let mut value = raw.cloned().unwrap_or(Value::Null);
                for validator in &field.validators {
                    if update && value.is_null() {
                        continue;
                    }
                    match validator.validate(std::mem::replace(&mut value, Value::Null), &values, ctx) {
                        Err(err) => {
                            errors.add(key.clone(), err);
                            break;
                        }
                        Ok(Value::Null) => break,
                        Ok(result) => {
                            values.insert(key.clone(), result.clone());
                            value = result;
                        }
                    }
                }
            }
        }

        let mut message = None;
        if errors.is_empty() {
            self.apply_transforms(&mut values, &mut errors);
        }
        if errors.is_empty() {
            if let Some(hook) = &self.validator {
                if let Err(msg) = hook(&values, &mut errors) {
                    message = Some(msg);
                }
            }
        }

        if self.strict && !self.fields.iter().any(Field::is_wildcard) {
            for key in input.keys() {
                if !self.fields.iter().any(|f| &f.name == key) {
                    errors.add(key.clone(), "unexpected field");
                }
            }
        }

        if errors.is_empty() && message.is_none() {
            return Ok(values);
        }
        let message = message.unwrap_or_else(|| self.error_message().to_string());
        tracing::trace!(
            form = self.name.as_deref().unwrap_or(""),
            failed = errors.len(),
            "form validation failed"
        );
        Err(FormError::with_errors(message, errors))
    }

    fn apply_transforms(&self, values: &mut Map, errors: &mut FieldErrors) {
        for transform in &self.transforms {
            // An absent field reaches the transform as Null.
            let mut value = values.get(&transform.field).cloned().unwrap_or_default();
            let mut failed = false;
            for function in &transform.functions {
                match function(&value, values) {
                    Ok(next) => value = next,
                    Err(err) => {
                        errors.add(transform.field.clone(), err);
                        failed = true;
                        break;
                    }
                }
            }
            if failed {
                continue;
            }
            if value.is_null() {
                values.shift_remove(&transform.field);
            } else {
                values.insert(transform.field.clone(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::IsInteger;

    fn map(entries: &[(&str, Value)]) -> Map {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn name_form() -> Form {
        Form::new(vec![Field::new("name", vec![Validator::IsRequired, Validator::string()])])
    }

    #[test]
    fn test_valid_input_returns_values() {
        let out = name_form().validate(&map(&[("name", Value::from("x"))])).unwrap();
        assert_eq!(out.get("name"), Some(&Value::from("x")));
    }

    #[test]
    fn test_strict_rejects_unknown_keys() {
        let input = map(&[("name", Value::from("x")), ("extra", Value::Int(1))]);
        assert!(name_form().validate(&input).is_ok());
        let err = name_form().strict().validate(&input).unwrap_err();
        assert_eq!(err.code(), "FORM-ERROR");
        assert_eq!(err.message(), "invalid input data");
        let extra = err.field("extra").unwrap();
        assert_eq!(extra[0].to_string(), "unexpected field");
        assert!(err.field("name").is_none());
    }

    #[test]
    fn test_all_field_errors_are_reported() {
        let form = Form::new(vec![
            Field::new("a", vec![Validator::string()]),
            Field::new("b", vec![Validator::integer()]),
        ]);
        let err = form
            .validate(&map(&[("a", Value::Int(1)), ("b", Value::from("ar"))]))
            .unwrap_err();
        assert!(err.field("a").is_some());
        assert!(err.field("b").is_some());
    }

    #[test]
    fn test_required_field_missing() {
        let err = name_form().validate(&Map::new()).unwrap_err();
        assert_eq!(err.field("name").unwrap()[0].to_string(), "is required");
    }

    #[test]
    fn test_update_mode_skips_missing_values() {
        assert!(name_form().validate_update(&Map::new()).unwrap().is_empty());
        assert!(name_form()
            .validate_update(&map(&[("name", Value::Int(3))]))
            .is_err());
    }

    #[test]
    fn test_sanitize_keys_lowercases() {
        let form = name_form().sanitizing_keys().strict();
        let out = form.validate(&map(&[("NaMe", Value::from("x"))])).unwrap();
        assert_eq!(out.get("name"), Some(&Value::from("x")));
    }

    #[test]
    fn test_wildcard_field() {
        let form = Form::new(vec![Field::wildcard(vec![Validator::integer()])]).strict();
        let out = form
            .validate(&map(&[("a", Value::Int(1)), ("b", Value::Int(2))]))
            .unwrap();
        assert_eq!(out.len(), 2);
        let err = form.validate(&map(&[("a", Value::from("x"))])).unwrap_err();
        assert!(err.field("a").is_some());
    }

    #[test]
    fn test_field_without_validators_copies_raw_value() {
        let form = Form::new(vec![Field::new("raw", vec![])]);
        let out = form.validate(&map(&[("raw", Value::Float(1.5))])).unwrap();
        assert_eq!(out.get("raw"), Some(&Value::Float(1.5)));
        assert!(form.validate(&Map::new()).unwrap().is_empty());
    }

    #[test]
    fn test_optional_default_is_stored() {
        let form = Form::new(vec![Field::new(
            "limit",
            vec![Validator::optional_or(10), Validator::integer()],
        )]);
        let out = form.validate(&Map::new()).unwrap();
        assert_eq!(out.get("limit"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_optional_without_default_leaves_key_out() {
        let form = Form::new(vec![Field::new("limit", vec![Validator::optional(), Validator::integer()])]);
        assert!(form.validate(&Map::new()).unwrap().get("limit").is_none());
    }

    #[test]
    fn test_validators_see_previous_values() {
        let form = Form::new(vec![
            Field::new("min", vec![Validator::integer()]),
            Field::new(
                "max",
                vec![Validator::custom("AtLeastMin", |input, values| {
                    let min = values.get("min").and_then(Value::as_i64).unwrap_or(i64::MIN);
                    match input.as_i64() {
                        Some(max) if max >= min => Ok(input),
                        _ => Err("max is below min".into()),
                    }
                })],
            ),
        ]);
        assert!(form.validate(&map(&[("min", Value::Int(1)), ("max", Value::Int(2))])).is_ok());
        assert!(form.validate(&map(&[("min", Value::Int(3)), ("max", Value::Int(2))])).is_err());
    }

    #[test]
    fn test_transforms_run_after_validation() {
        let form = Form::new(vec![Field::new("n", vec![Validator::integer()])]).with_transform(
            Transform::new("n")
                .then(|v, _| Ok(Value::Int(v.as_i64().unwrap_or(0) * 2)))
                .then(|v, _| Ok(Value::Int(v.as_i64().unwrap_or(0) + 1))),
        );
        let out = form.validate(&map(&[("n", Value::Int(4))])).unwrap();
        assert_eq!(out.get("n"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_transform_fills_absent_field() {
        let form = Form::new(vec![
            Field::new("first", vec![Validator::string()]),
            Field::new("nick", vec![Validator::optional(), Validator::string()]),
        ])
        .with_transform(Transform::new("nick").then(|v, values| match v {
            Value::Null => Ok(values.get("first").cloned().unwrap_or_default()),
            other => Ok(other.clone()),
        }));

        let out = form.validate(&map(&[("first", Value::from("ada"))])).unwrap();
        assert_eq!(out.get("nick"), Some(&Value::from("ada")));

        let out = form
            .validate(&map(&[("first", Value::from("ada")), ("nick", Value::from("a"))]))
            .unwrap();
        assert_eq!(out.get("nick"), Some(&Value::from("a")));
    }

    #[test]
    fn test_transform_returning_null_leaves_field_absent() {
        let form = Form::new(vec![Field::new("n", vec![Validator::optional(), Validator::integer()])])
            .with_transform(Transform::new("n").then(|_, _| Ok(Value::Null)));
        let out = form.validate(&map(&[("n", Value::Int(1))])).unwrap();
        assert!(!out.contains_key("n"));
        assert!(form.validate(&Map::new()).unwrap().is_empty());
    }

    #[test]
    fn test_failing_transform_reports_field() {
        let form = Form::new(vec![Field::new("n", vec![Validator::integer()])])
            .with_transform(Transform::new("n").then(|_, _| Err("cannot transform".into())));
        let err = form.validate(&map(&[("n", Value::Int(4))])).unwrap_err();
        assert_eq!(err.field("n").unwrap()[0].to_string(), "cannot transform");
    }

    #[test]
    fn test_hook_adds_errors_and_message() {
        let form = Form::new(vec![Field::new("a", vec![Validator::integer()])]).with_validator(
            |values, errors| {
                if values.get("a") == Some(&Value::Int(0)) {
                    errors.add("a", "must not be zero");
                }
                if values.get("a") == Some(&Value::Int(-1)) {
                    return Err("negative input".to_string());
                }
                Ok(())
            },
        );
        assert!(form.validate(&map(&[("a", Value::Int(1))])).is_ok());
        let err = form.validate(&map(&[("a", Value::Int(0))])).unwrap_err();
        assert!(err.field("a").is_some());
        let err = form.validate(&map(&[("a", Value::Int(-1))])).unwrap_err();
        assert_eq!(err.message(), "negative input");
    }

    #[test]
    fn test_hook_not_run_after_field_errors() {
        let form = Form::new(vec![Field::new("a", vec![Validator::integer()])])
            .with_validator(|_, errors| {
                errors.add("hook", "ran");
                Ok(())
            });
        let err = form.validate(&map(&[("a", Value::from("x"))])).unwrap_err();
        assert!(err.field("hook").is_none());
    }

    #[test]
    fn test_custom_error_message() {
        let err = name_form().with_error_msg("bad user").validate(&Map::new()).unwrap_err();
        assert_eq!(err.message(), "bad user");
    }

    #[test]
    fn test_validate_value_requires_map() {
        let err = name_form().validate_value(&Value::Int(1)).unwrap_err();
        assert_eq!(err.message(), "invalid input type: not a map");
    }

    #[test]
    fn test_validate_query_lifts_to_string_lists() {
        let form = Form::new(vec![Field::new("tag", vec![Validator::list(vec![Validator::string()])])]);
        let mut query = HashMap::new();
        query.insert("tag".to_string(), vec!["a".to_string(), "b".to_string()]);
        let out = form.validate_query(&query).unwrap();
        assert_eq!(
            out.get("tag"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );
    }

    #[test]
    fn test_integer_bounds_in_form() {
        let form = Form::new(vec![Field::new(
            "age",
            vec![Validator::IsInteger(IsInteger::at_least(18))],
        )]);
        let err = form.validate(&map(&[("age", Value::Int(3))])).unwrap_err();
        assert!(err.field("age").is_some());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn scalar() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(Value::Int),
                "[a-z]{0,6}".prop_map(Value::String),
            ]
        }

        proptest! {
            #[test]
            fn validation_is_deterministic(
                entries in proptest::collection::vec(("[a-d]", scalar()), 0..6)
            ) {
                let form = Form::new(vec![
                    Field::new("a", vec![Validator::optional(), Validator::string()]),
                    Field::new("b", vec![Validator::optional_or(1), Validator::integer()]),
                    Field::new("c", vec![Validator::IsRequired]),
                ])
                .strict();
                let input: Map = entries.into_iter().collect();
                let first = form.validate(&input);
                let second = form.validate(&input);
                prop_assert_eq!(first, second);
            }
        }
    }
}
