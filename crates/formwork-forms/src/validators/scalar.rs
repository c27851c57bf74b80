//! Scalar type validators: strings, numbers, booleans and binary encodings.

use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use formwork_core::{Map, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{flag_param, length_param};
use crate::coerce::{Coercible, FieldShape, Kind, Shape};
use crate::error::{SchemaError, ValidationError};
use crate::form::{Field, Form};
use crate::registry::{parse_params, FormDescriptionContext};
use crate::validator::Validator;
use crate::validators::IsIn;

fn check_length(len: usize, min: Option<usize>, max: Option<usize>, unit: &str) -> Result<(), ValidationError> {
    if let Some(min) = min {
        if len < min {
            return Err(format!("must be at least {min} {unit} long").into());
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(format!("must be at most {max} {unit} long").into());
        }
    }
    Ok(())
}

// --- IsString ---------------------------------------------------------------

/// Accepts strings, optionally bounded in length (counted in characters).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsString {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl Coercible for IsString {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsString")
                .field(FieldShape::new("min_length", Kind::Int).key("minLength"))
                .field(FieldShape::new("max_length", Kind::Int).key("maxLength"))
        });
        &SHAPE
    }
}

pub(crate) static IS_STRING_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![
        length_param("minLength"),
        length_param("maxLength"),
    ]))
});

pub(crate) fn make_is_string(
    params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    Ok(Validator::IsString(parse_params("IsString", params, &IS_STRING_PARAMS)?))
}

impl IsString {
    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let Value::String(s) = input else {
            return Err("expected a string".into());
        };
        check_length(s.chars().count(), self.min_length, self.max_length, "characters")?;
        Ok(Value::String(s))
    }
}

// --- IsInteger --------------------------------------------------------------

/// Accepts integers. Integral floats are narrowed; strings are parsed only
/// with `convert`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsInteger {
    pub convert: bool,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl IsInteger {
    pub fn at_least(min: i64) -> Self {
        Self {
            min: Some(min),
            ..Self::default()
        }
    }

    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let n = match input {
            Value::Int(i) => i,
            Value::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                f as i64
            }
            Value::String(ref s) if self.convert => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ValidationError::from("not an integer"))?,
            _ => return Err("not an integer".into()),
        };
        if let Some(min) = self.min {
            if n < min {
                return Err(format!("value must be larger than or equal {min}").into());
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return Err(format!("value must be smaller than or equal {max}").into());
            }
        }
        Ok(Value::Int(n))
    }
}

impl Coercible for IsInteger {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsInteger")
                .field(FieldShape::new("convert", Kind::Bool))
                .field(FieldShape::new("min", Kind::Int))
                .field(FieldShape::new("max", Kind::Int))
        });
        &SHAPE
    }
}

pub(crate) static IS_INTEGER_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![
        flag_param("convert", false),
        Field::new("min", vec![Validator::optional(), Validator::integer()]),
        Field::new("max", vec![Validator::optional(), Validator::integer()]),
    ]))
});

pub(crate) fn make_is_integer(
    params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    Ok(Validator::IsInteger(parse_params("IsInteger", params, &IS_INTEGER_PARAMS)?))
}

// --- IsFloat ----------------------------------------------------------------

/// Accepts floats. Integers are widened; strings are parsed only with
/// `convert`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsFloat {
    pub convert: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl IsFloat {
    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let n = match input {
            Value::Float(f) => f,
            Value::Int(i) => i as f64,
            Value::String(ref s) if self.convert => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::from("not a float"))?,
            _ => return Err("not a float".into()),
        };
        if let Some(min) = self.min {
            if n < min {
                return Err(format!("value must be larger than or equal {min}").into());
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return Err(format!("value must be smaller than or equal {max}").into());
            }
        }
        Ok(Value::Float(n))
    }
}

impl Coercible for IsFloat {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsFloat")
                .field(FieldShape::new("convert", Kind::Bool))
                .field(FieldShape::new("min", Kind::Float).convert())
                .field(FieldShape::new("max", Kind::Float).convert())
        });
        &SHAPE
    }
}

pub(crate) static IS_FLOAT_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    let bound = || vec![Validator::optional(), Validator::IsFloat(IsFloat::default())];
    Arc::new(Form::new(vec![
        flag_param("convert", false),
        Field::new("min", bound()),
        Field::new("max", bound()),
    ]))
});

pub(crate) fn make_is_float(
    params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    Ok(Validator::IsFloat(parse_params("IsFloat", params, &IS_FLOAT_PARAMS)?))
}

// --- IsBoolean --------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsBoolean {
    /// Accept the strings `"true"` and `"false"`.
    pub convert: bool,
}

impl IsBoolean {
    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        match input {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::String(s) if self.convert && s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if self.convert && s == "false" => Ok(Value::Bool(false)),
            _ => Err("expected a boolean".into()),
        }
    }
}

impl Coercible for IsBoolean {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> =
            Lazy::new(|| Shape::new("IsBoolean").field(FieldShape::new("convert", Kind::Bool)));
        &SHAPE
    }
}

pub(crate) static IS_BOOLEAN_PARAMS: Lazy<Arc<Form>> =
    Lazy::new(|| Arc::new(Form::new(vec![flag_param("convert", false)])));

pub(crate) fn make_is_boolean(
    params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    Ok(Validator::IsBoolean(parse_params("IsBoolean", params, &IS_BOOLEAN_PARAMS)?))
}

// --- IsBytes ----------------------------------------------------------------

/// Text encoding of binary input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteEncoding {
    #[default]
    #[serde(rename = "base64")]
    Base64,
    #[serde(rename = "base64-url")]
    Base64Url,
    #[serde(rename = "hex")]
    Hex,
}

impl ByteEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            ByteEncoding::Base64 => "base64",
            ByteEncoding::Base64Url => "base64-url",
            ByteEncoding::Hex => "hex",
        }
    }

    fn decode(self, text: &str) -> Result<Vec<u8>, String> {
        match self {
            ByteEncoding::Base64 => STANDARD.decode(text).map_err(|e| e.to_string()),
            ByteEncoding::Base64Url => URL_SAFE.decode(text).map_err(|e| e.to_string()),
            ByteEncoding::Hex => hex::decode(text).map_err(|e| e.to_string()),
        }
    }
}

/// Accepts raw bytes, or strings in the configured encoding which are
/// decoded into bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsBytes {
    pub encoding: ByteEncoding,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl IsBytes {
    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let bytes = match input {
            Value::Bytes(bytes) => return Ok(Value::Bytes(bytes)),
            Value::String(s) => self
                .encoding
                .decode(&s)
                .map_err(|e| format!("invalid {} data: {e}", self.encoding.as_str()))?,
            _ => return Err("expected a string".into()),
        };
        check_length(bytes.len(), self.min_length, self.max_length, "bytes")?;
        Ok(Value::Bytes(bytes))
    }
}

impl Coercible for IsBytes {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsBytes")
                .field(FieldShape::new("encoding", Kind::String))
                .field(FieldShape::new("min_length", Kind::Int).key("minLength"))
                .field(FieldShape::new("max_length", Kind::Int).key("maxLength"))
        });
        &SHAPE
    }
}

pub(crate) static IS_BYTES_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    let encodings = ["base64", "base64-url", "hex"].map(Value::from).to_vec();
    Arc::new(Form::new(vec![
        Field::new(
            "encoding",
            vec![
                Validator::optional_or("base64"),
                Validator::IsIn(IsIn::new(encodings)),
            ],
        ),
        length_param("minLength"),
        length_param("maxLength"),
    ]))
});

pub(crate) fn make_is_bytes(
    params: &Map,
    _ctx: &FormDescriptionContext,
) -> Result<Validator, SchemaError> {
    Ok(Validator::IsBytes(parse_params("IsBytes", params, &IS_BYTES_PARAMS)?))
}

// --- IsHex ------------------------------------------------------------------

/// Accepts hex strings. Dashes are stripped unless `strict`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsHex {
    /// Output the decoded bytes instead of the normalized string.
    pub convert_to_binary: bool,
    pub strict: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl IsHex {
    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let Value::String(s) = input else {
            return Err("not a valid hex string".into());
        };
        let raw = if self.strict { s } else { s.replace('-', "") };
        let bytes = hex::decode(&raw).map_err(|_| ValidationError::from("not a valid hex string"))?;
        check_length(bytes.len(), self.min_length, self.max_length, "bytes")?;
        if self.convert_to_binary {
            Ok(Value::Bytes(bytes))
        } else {
            Ok(Value::String(raw))
        }
    }
}

impl Coercible for IsHex {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsHex")
                .field(FieldShape::new("convert_to_binary", Kind::Bool).key("convertToBinary"))
                .field(FieldShape::new("strict", Kind::Bool))
                .field(FieldShape::new("min_length", Kind::Int).key("minLength"))
                .field(FieldShape::new("max_length", Kind::Int).key("maxLength"))
        });
        &SHAPE
    }
}

pub(crate) static IS_HEX_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    Arc::new(Form::new(vec![
        flag_param("convertToBinary", false),
        flag_param("strict", false),
        length_param("minLength"),
        length_param("maxLength"),
    ]))
});

pub(crate) fn make_is_hex(params: &Map, _ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    Ok(Validator::IsHex(parse_params("IsHex", params, &IS_HEX_PARAMS)?))
}

// --- IsUUID -----------------------------------------------------------------

/// Accepts 32 hex digits, with dashes allowed anywhere. Braced and
/// `urn:uuid:` forms are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsUuid {
    /// Output the 16 raw bytes instead of the input string.
    pub convert_to_binary: bool,
}

impl IsUuid {
    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let Value::String(s) = input else {
            return Err("not a valid UUID".into());
        };
        let digits: String = s.chars().filter(|c| *c != '-').collect();
        let uuid = hex::decode(digits)
            .ok()
            .and_then(|bytes| uuid::Uuid::from_slice(&bytes).ok())
            .ok_or_else(|| ValidationError::from("not a valid UUID"))?;
        if self.convert_to_binary {
            Ok(Value::Bytes(uuid.as_bytes().to_vec()))
        } else {
            Ok(Value::String(s))
        }
    }
}

impl Coercible for IsUuid {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsUUID")
                .field(FieldShape::new("convert_to_binary", Kind::Bool).key("convertToBinary"))
        });
        &SHAPE
    }
}

pub(crate) static IS_UUID_PARAMS: Lazy<Arc<Form>> =
    Lazy::new(|| Arc::new(Form::new(vec![flag_param("convertToBinary", false)])));

pub(crate) fn make_is_uuid(params: &Map, _ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    Ok(Validator::IsUuid(parse_params("IsUUID", params, &IS_UUID_PARAMS)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_string_counts_characters() {
        let v = IsString {
            min_length: Some(2),
            max_length: Some(3),
        };
        assert!(v.validate(Value::from("äöü")).is_ok());
        assert_eq!(
            v.validate(Value::from("a")).unwrap_err().to_string(),
            "must be at least 2 characters long"
        );
        assert!(v.validate(Value::from("abcd")).is_err());
        assert!(v.validate(Value::Int(1)).is_err());
    }

    #[test]
    fn test_is_integer_narrowing_and_convert() {
        let plain = IsInteger::default();
        assert_eq!(plain.validate(Value::Float(3.0)).unwrap(), Value::Int(3));
        assert!(plain.validate(Value::Float(3.5)).is_err());
        assert!(plain.validate(Value::from("12")).is_err());

        let converting = IsInteger {
            convert: true,
            ..IsInteger::default()
        };
        assert_eq!(converting.validate(Value::from("12")).unwrap(), Value::Int(12));
        assert!(converting.validate(Value::from("x")).is_err());
    }

    #[test]
    fn test_is_integer_bounds() {
        let v = IsInteger {
            min: Some(-1),
            max: Some(10),
            ..IsInteger::default()
        };
        assert!(v.validate(Value::Int(-1)).is_ok());
        assert_eq!(
            v.validate(Value::Int(11)).unwrap_err().to_string(),
            "value must be smaller than or equal 10"
        );
        assert!(v.validate(Value::Int(-2)).is_err());
    }

    #[test]
    fn test_is_float_widens_integers() {
        let v = IsFloat {
            min: Some(0.5),
            ..IsFloat::default()
        };
        assert_eq!(v.validate(Value::Int(2)).unwrap(), Value::Float(2.0));
        assert!(v.validate(Value::Float(0.1)).is_err());
        assert_eq!(v.validate(Value::Bool(true)).unwrap_err().to_string(), "not a float");
    }

    #[test]
    fn test_is_boolean_convert() {
        assert!(IsBoolean::default().validate(Value::from("true")).is_err());
        let v = IsBoolean { convert: true };
        assert_eq!(v.validate(Value::from("false")).unwrap(), Value::Bool(false));
        assert!(v.validate(Value::from("yes")).is_err());
    }

    #[test]
    fn test_is_bytes_encodings() {
        let b64 = IsBytes::default();
        assert_eq!(b64.validate(Value::from("aGk=")).unwrap(), Value::Bytes(b"hi".to_vec()));
        assert!(b64.validate(Value::from("!!")).is_err());

        let url = IsBytes {
            encoding: ByteEncoding::Base64Url,
            ..IsBytes::default()
        };
        assert_eq!(url.validate(Value::from("-_8=")).unwrap(), Value::Bytes(vec![0xfb, 0xff]));

        let hexed = IsBytes {
            encoding: ByteEncoding::Hex,
            max_length: Some(1),
            ..IsBytes::default()
        };
        assert_eq!(hexed.validate(Value::from("ff")).unwrap(), Value::Bytes(vec![0xff]));
        assert!(hexed.validate(Value::from("ffff")).is_err());

        assert_eq!(b64.validate(Value::Bytes(vec![1])).unwrap(), Value::Bytes(vec![1]));
    }

    #[test]
    fn test_is_hex_strict_and_binary() {
        let lenient = IsHex::default();
        assert_eq!(lenient.validate(Value::from("de-ad")).unwrap(), Value::from("dead"));
        let strict = IsHex {
            strict: true,
            ..IsHex::default()
        };
        assert!(strict.validate(Value::from("de-ad")).is_err());
        let binary = IsHex {
            convert_to_binary: true,
            ..IsHex::default()
        };
        assert_eq!(binary.validate(Value::from("dead")).unwrap(), Value::Bytes(vec![0xde, 0xad]));
    }

    #[test]
    fn test_is_uuid() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(IsUuid::default().validate(Value::from(id)).unwrap(), Value::from(id));
        let binary = IsUuid {
            convert_to_binary: true,
        };
        let out = binary.validate(Value::from(id)).unwrap();
        assert_eq!(out.as_bytes().map(<[u8]>::len), Some(16));
        assert!(IsUuid::default().validate(Value::from("not-a-uuid")).is_err());
    }

    #[test]
    fn test_is_uuid_dash_placement() {
        let compact = "67e5504410b1426f9247bb680e5fe0c8";
        assert!(IsUuid::default().validate(Value::from(compact)).is_ok());
        let odd = "67e5-504410b1426f9247bb680e5fe0-c8";
        assert_eq!(IsUuid::default().validate(Value::from(odd)).unwrap(), Value::from(odd));

        for rejected in [
            "{67e55044-10b1-426f-9247-bb680e5fe0c8}",
            "urn:uuid:67e55044-10b1-426f-9247-bb680e5fe0c8",
            "67e55044-10b1-426f-9247-bb680e5fe0",
        ] {
            assert!(IsUuid::default().validate(Value::from(rejected)).is_err(), "{rejected}");
        }

        let binary = IsUuid {
            convert_to_binary: true,
        };
        let out = binary.validate(Value::from(compact)).unwrap();
        assert_eq!(out.as_bytes().map(|b| b[0]), Some(0x67));
    }

    #[test]
    fn test_make_is_string_from_params() {
        let mut params = Map::new();
        params.insert("minLength".into(), Value::Int(2));
        let v = make_is_string(&params, &FormDescriptionContext::new()).unwrap();
        match v {
            Validator::IsString(s) => assert_eq!(s.min_length, Some(2)),
            other => panic!("unexpected validator {other:?}"),
        }
    }

    #[test]
    fn test_make_is_string_rejects_negative_length() {
        let mut params = Map::new();
        params.insert("minLength".into(), Value::Int(-1));
        let err = make_is_string(&params, &FormDescriptionContext::new()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidParams { .. }));
    }

    #[test]
    fn test_make_is_bytes_rejects_unknown_encoding() {
        let mut params = Map::new();
        params.insert("encoding".into(), Value::from("rot13"));
        assert!(make_is_bytes(&params, &FormDescriptionContext::new()).is_err());
    }

    #[test]
    fn test_make_is_float_accepts_integer_bounds() {
        let mut params = Map::new();
        params.insert("min".into(), Value::Int(1));
        let v = make_is_float(&params, &FormDescriptionContext::new()).unwrap();
        match v {
            Validator::IsFloat(f) => assert_eq!(f.min, Some(1.0)),
            other => panic!("unexpected validator {other:?}"),
        }
    }
}
