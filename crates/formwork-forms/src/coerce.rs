//! # Structural Coercion
//!
//! Maps dynamic [`Value`] trees onto named, typed records and back.
//!
//! A record type describes itself once through a [`Shape`]: an ordered list
//! of fields, each with its record key, the key it is read from in the
//! source map, a [`Kind`] and a few flags. Coercion walks the source against
//! the shape and produces a *normalized* map keyed by record keys, which
//! serde then materializes into the Rust type straight from the [`Value`].
//!
//! ## Rules
//!
//! 1. A source of the target kind is taken as is.
//! 2. Int/Float and String/Bytes convert into each other only on fields
//!    flagged `convert`. Without the flag the mismatch is an error.
//! 3. [`Kind::Any`] takes the raw value unchanged, map order and bytes included.
//! 4. Lists coerce element by element. The first failure aborts.
//! 5. Maps coerce into records field by field. A missing (or null) source
//!    key fails on `required` fields and is skipped otherwise.
//! 6. Maps coerce into `Map(T)` entry by entry.
//! 7. Anything else is a kind mismatch.
//!
//! Embedded fields read the whole enclosing source map and their output is
//! merged into the enclosing record, which pairs with `#[serde(flatten)]`.
//! Every error carries the full path into the source.

use std::fmt;

use formwork_core::{Map, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoerceError, PathSegment};

/// Target kind of a coerced value.
#[derive(Debug, Clone)]
pub enum Kind {
    Any,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    List(Box<Kind>),
    Map(Box<Kind>),
    Record(&'static Shape),
    /// Accepts `Null` in addition to the inner kind.
    Optional(Box<Kind>),
}

impl Kind {
    pub fn list(inner: Kind) -> Kind {
        Kind::List(Box::new(inner))
    }

    pub fn map(inner: Kind) -> Kind {
        Kind::Map(Box::new(inner))
    }

    pub fn optional(inner: Kind) -> Kind {
        Kind::Optional(Box::new(inner))
    }

    /// The shape of a [`Coercible`] record type.
    pub fn record<T: Coercible>() -> Kind {
        Kind::Record(T::shape())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Any => f.write_str("any"),
            Kind::Bool => f.write_str("bool"),
            Kind::Int => f.write_str("int"),
            Kind::Float => f.write_str("float"),
            Kind::String => f.write_str("string"),
            Kind::Bytes => f.write_str("bytes"),
            Kind::List(inner) => write!(f, "list<{inner}>"),
            Kind::Map(inner) => write!(f, "map<{inner}>"),
            Kind::Record(shape) => write!(f, "record {}", shape.name()),
            Kind::Optional(inner) => write!(f, "optional<{inner}>"),
        }
    }
}

/// One field of a record shape.
#[derive(Debug, Clone)]
pub struct FieldShape {
    /// Key of the field in the normalized record (the serde field name).
    pub name: String,
    /// Key the value is read from in the source map.
    pub source_key: String,
    pub kind: Kind,
    pub required: bool,
    pub convert: bool,
    pub embedded: bool,
}

impl FieldShape {
    /// A field whose source key is the snake case form of `name`.
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        let name = name.into();
        Self {
            source_key: to_snake_case(&name),
            name,
            kind,
            required: false,
            convert: false,
            embedded: false,
        }
    }

    /// A flattened sub-record that reads from the enclosing map.
    pub fn embedded(name: impl Into<String>, shape: &'static Shape) -> Self {
        Self {
            embedded: true,
            ..Self::new(name, Kind::Record(shape))
        }
    }

    /// Read the value from an explicit source key.
    pub fn key(mut self, source_key: impl Into<String>) -> Self {
        self.source_key = source_key.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Allow Int/Float and String/Bytes conversions for this field.
    pub fn convert(mut self) -> Self {
        self.convert = true;
        self
    }
}

/// Ordered field descriptor of a named record.
#[derive(Debug, Clone)]
pub struct Shape {
    name: String,
    fields: Vec<FieldShape>,
}

impl Shape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldShape) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }
}

/// A record type that can be coerced from dynamic values.
///
/// Implementors keep their shape in a lazily built static:
///
/// ```ignore
/// impl Coercible for Point {
///     fn shape() -> &'static Shape {
///         static SHAPE: Lazy<Shape> = Lazy::new(|| {
///             Shape::new("Point")
///                 .field(FieldShape::new("x", Kind::Int).required())
///                 .field(FieldShape::new("y", Kind::Int).required())
///         });
///         &SHAPE
///     }
/// }
/// ```
pub trait Coercible: Serialize + DeserializeOwned {
    fn shape() -> &'static Shape;
}

/// Coerce a dynamic value into a typed record.
pub fn coerce<T: Coercible>(source: &Value) -> Result<T, CoerceError> {
    let normalized = coerce_value(&Kind::Record(T::shape()), source)?;
    from_normalized(&normalized)
}

/// Materialize a record from a value [`coerce_value`] already normalized,
/// such as the output of an `IsStringMap` that coerces.
pub fn from_normalized<T: Coercible>(normalized: &Value) -> Result<T, CoerceError> {
    formwork_core::from_value(normalized.clone()).map_err(|e| {
        CoerceError::new(format!("cannot build record {}: {e}", T::shape().name()), Vec::new())
    })
}

/// Render a typed record back into a source map keyed by source keys.
pub fn decoerce<T: Coercible>(record: &T) -> Result<Value, CoerceError> {
    let shape = T::shape();
    let rendered = formwork_core::to_value(record).map_err(|e| {
        CoerceError::new(format!("cannot render record {}: {e}", shape.name()), Vec::new())
    })?;
    Ok(decoerce_value(&Kind::Record(shape), rendered))
}

/// Coerce a dynamic value against a kind, producing the normalized value.
pub fn coerce_value(kind: &Kind, source: &Value) -> Result<Value, CoerceError> {
    let mut path = Vec::new();
    coerce_kind(kind, source, false, &mut path)
}

fn mismatch(kind: &Kind, source: &Value, path: &[PathSegment]) -> CoerceError {
    CoerceError::new(
        format!(
            "cannot coerce source of type '{}' into target of type '{kind}'",
            source.kind()
        ),
        path.to_vec(),
    )
}

fn coerce_kind(
    kind: &Kind,
    source: &Value,
    convert: bool,
    path: &mut Vec<PathSegment>,
) -> Result<Value, CoerceError> {
    match (kind, source) {
        (Kind::Any, _) => Ok(source.clone()),
        (Kind::Optional(_), Value::Null) => Ok(Value::Null),
        (Kind::Optional(inner), _) => coerce_kind(inner, source, convert, path),

        (Kind::Bool, Value::Bool(_))
        | (Kind::Int, Value::Int(_))
        | (Kind::Float, Value::Float(_))
        | (Kind::String, Value::String(_))
        | (Kind::Bytes, Value::Bytes(_)) => Ok(source.clone()),

        (Kind::Float, Value::Int(i)) if convert => Ok(Value::Float(*i as f64)),
        (Kind::Int, Value::Float(f)) if convert => {
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Ok(Value::Int(*f as i64))
            } else {
                Err(CoerceError::new(
                    format!("cannot convert non-integral float {f} to int"),
                    path.clone(),
                ))
            }
        }
        (Kind::Bytes, Value::String(s)) if convert => Ok(Value::Bytes(s.as_bytes().to_vec())),
        (Kind::String, Value::Bytes(b)) if convert => String::from_utf8(b.clone())
            .map(Value::String)
            .map_err(|_| CoerceError::new("bytes are not valid UTF-8", path.clone())),

        (Kind::List(inner), Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                out.push(coerce_kind(inner, item, false, path)?);
                path.pop();
            }
            Ok(Value::List(out))
        }
        (Kind::Map(inner), Value::Map(entries)) => {
            let mut out = Map::with_capacity(entries.len());
            for (key, item) in entries {
                path.push(PathSegment::Key(key.clone()));
                out.insert(key.clone(), coerce_kind(inner, item, false, path)?);
                path.pop();
            }
            Ok(Value::Map(out))
        }
        (Kind::Record(shape), Value::Map(entries)) => {
            let mut out = Map::with_capacity(shape.fields().len());
            coerce_record(shape, entries, path, &mut out)?;
            Ok(Value::Map(out))
        }

        _ => Err(mismatch(kind, source, path)),
    }
}

fn coerce_record(
    shape: &Shape,
    source: &Map,
    path: &mut Vec<PathSegment>,
    out: &mut Map,
) -> Result<(), CoerceError> {
    for field in shape.fields() {
        if field.embedded {
            path.push(PathSegment::Key(format!("{}(embedded)", field.source_key)));
            match &field.kind {
                Kind::Record(inner) => coerce_record(inner, source, path, out)?,
                other => {
                    return Err(CoerceError::new(
                        format!("embedded field must be a record, found {other}"),
                        path.clone(),
                    ))
                }
            }
            path.pop();
            continue;
        }

        path.push(PathSegment::Key(field.source_key.clone()));
        match source.get(&field.source_key) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(CoerceError::new(
                        format!("missing value for required key '{}'", field.source_key),
                        path.clone(),
                    ));
                }
            }
            Some(value) => {
                let coerced = coerce_kind(&field.kind, value, field.convert, path)?;
                out.insert(field.name.clone(), coerced);
            }
        }
        path.pop();
    }
    Ok(())
}

fn decoerce_value(kind: &Kind, value: Value) -> Value {
    match (kind, value) {
        (Kind::Optional(inner), value) => decoerce_value(inner, value),
        (Kind::Record(shape), Value::Map(entries)) => {
            let mut out = Map::with_capacity(entries.len());
            decoerce_record(shape, &entries, &mut out);
            Value::Map(out)
        }
        // Serialized byte vectors arrive as integer lists.
        (Kind::Bytes, Value::List(items)) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_i64().and_then(|i| u8::try_from(i).ok()))
                .collect();
            match bytes {
                Some(bytes) => Value::Bytes(bytes),
                None => Value::List(items),
            }
        }
        (Kind::List(inner), Value::List(items)) => Value::List(
            items
                .into_iter()
                .map(|item| decoerce_value(inner, item))
                .collect(),
        ),
        (Kind::Map(inner), Value::Map(entries)) => Value::Map(
            entries
                .into_iter()
                .map(|(key, item)| (key, decoerce_value(inner, item)))
                .collect(),
        ),
        (_, value) => value,
    }
}

fn decoerce_record(shape: &Shape, record: &Map, out: &mut Map) {
    for field in shape.fields() {
        if field.embedded {
            if let Kind::Record(inner) = &field.kind {
                decoerce_record(inner, record, out);
            }
            continue;
        }
        match record.get(&field.name) {
            None | Some(Value::Null) => {}
            Some(value) => {
                out.insert(
                    field.source_key.clone(),
                    decoerce_value(&field.kind, value.clone()),
                );
            }
        }
    }
}

/// Lower snake case of an identifier: `ZapListPtr` becomes `zap_list_ptr`,
/// `HTTPServer` becomes `http_server`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Zap {
        zap: String,
    }

    impl Coercible for Zap {
        fn shape() -> &'static Shape {
            static SHAPE: Lazy<Shape> =
                Lazy::new(|| Shape::new("Zap").field(FieldShape::new("zap", Kind::String)));
            &SHAPE
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Embedded {
        name: String,
        labels: indexmap::IndexMap<String, String>,
    }

    impl Coercible for Embedded {
        fn shape() -> &'static Shape {
            static SHAPE: Lazy<Shape> = Lazy::new(|| {
                Shape::new("Embedded")
                    .field(FieldShape::new("name", Kind::String))
                    .field(FieldShape::new("labels", Kind::map(Kind::String)))
            });
            &SHAPE
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Complex {
        #[serde(flatten)]
        embedded: Embedded,
        foo: String,
        bar: i64,
        ratio: f64,
        payload: Vec<u8>,
        zap_list: Vec<Zap>,
        maybe: Option<Zap>,
        anything: Value,
    }

    impl Coercible for Complex {
        fn shape() -> &'static Shape {
            static SHAPE: Lazy<Shape> = Lazy::new(|| {
                Shape::new("Complex")
                    .field(FieldShape::embedded("embedded", Embedded::shape()))
                    .field(FieldShape::new("foo", Kind::String).required())
                    .field(FieldShape::new("bar", Kind::Int).key("Bar").convert())
                    .field(FieldShape::new("ratio", Kind::Float).convert())
                    .field(FieldShape::new("payload", Kind::Bytes).convert())
                    .field(FieldShape::new("zap_list", Kind::list(Kind::record::<Zap>())))
                    .field(FieldShape::new("maybe", Kind::optional(Kind::record::<Zap>())))
                    .field(FieldShape::new("anything", Kind::Any))
            });
            &SHAPE
        }
    }

    fn source() -> Value {
        Value::from_json(json!({
            "name": "outer",
            "labels": {"a": "b"},
            "foo": "test",
            "Bar": 4.0,
            "ratio": 2,
            "payload": "hi",
            "zap_list": [{"zap": "one"}, {"zap": "two"}],
            "anything": [1, "x"],
            "ignored": true
        }))
    }

    #[test]
    fn test_coerce_complex_record() {
        let record: Complex = coerce(&source()).unwrap();
        assert_eq!(record.embedded.name, "outer");
        assert_eq!(record.embedded.labels.get("a").map(String::as_str), Some("b"));
        assert_eq!(record.foo, "test");
        assert_eq!(record.bar, 4);
        assert_eq!(record.ratio, 2.0);
        assert_eq!(record.payload, b"hi".to_vec());
        assert_eq!(record.zap_list.len(), 2);
        assert_eq!(record.zap_list[1].zap, "two");
        assert!(record.maybe.is_none());
        assert_eq!(record.anything, Value::List(vec![Value::Int(1), Value::from("x")]));
    }

    #[test]
    fn test_mismatch_error_carries_path() {
        let src = Value::from_json(json!({
            "foo": "x",
            "zap_list": [{"zap": "ok"}, {"zap": 3}]
        }));
        let err = coerce::<Complex>(&src).unwrap_err();
        assert_eq!(err.path_string(), "zap_list.1.zap");
        assert!(err.message().contains("'int'"));
    }

    #[test]
    fn test_missing_required_key() {
        let err = coerce::<Complex>(&Value::from_json(json!({}))).unwrap_err();
        assert_eq!(err.message(), "missing value for required key 'foo'");
        assert_eq!(err.path_string(), "foo");
    }

    #[test]
    fn test_convert_requires_tag() {
        // `zap` is a plain string field: bytes are not converted.
        let src = Value::Map(
            [("zap".to_string(), Value::Bytes(b"x".to_vec()))].into_iter().collect(),
        );
        assert!(coerce::<Zap>(&src).is_err());
    }

    #[test]
    fn test_non_integral_float_rejected() {
        let src = Value::from_json(json!({"foo": "x", "Bar": 1.5}));
        let err = coerce::<Complex>(&src).unwrap_err();
        assert_eq!(err.path_string(), "Bar");
    }

    #[test]
    fn test_embedded_error_path() {
        let src = Value::from_json(json!({"foo": "x", "name": 5}));
        let err = coerce::<Complex>(&src).unwrap_err();
        assert_eq!(err.path_string(), "embedded(embedded).name");
    }

    #[test]
    fn test_list_into_record_is_mismatch() {
        let err = coerce::<Zap>(&Value::List(vec![])).unwrap_err();
        assert!(err.path().is_empty());
        assert!(err.message().contains("record Zap"));
    }

    #[test]
    fn test_decoerce_uses_source_keys_and_restores_bytes() {
        let record: Complex = coerce(&source()).unwrap();
        let back = decoerce(&record).unwrap();
        assert_eq!(back.get("Bar"), Some(&Value::Int(4)));
        assert_eq!(back.get("payload"), Some(&Value::Bytes(b"hi".to_vec())));
        assert_eq!(back.get("name"), Some(&Value::from("outer")));
        assert!(back.get("maybe").is_none());
        assert!(back.get("ignored").is_none());
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("ZapListPtr"), "zap_list_ptr");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("minLength"), "min_length");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("v2Value"), "v2_value");
    }

    #[test]
    fn test_any_field_keeps_raw_value() {
        let mut inner = Map::new();
        inner.insert("z".into(), Value::Int(1));
        inner.insert("a".into(), Value::Int(2));
        let raw = Value::List(vec![Value::Map(inner), Value::Bytes(vec![1, 2])]);
        let mut src = Map::new();
        src.insert("foo".into(), Value::from("x"));
        src.insert("anything".into(), raw.clone());
        let src = Value::Map(src);

        let record: Complex = coerce(&src).unwrap();
        assert_eq!(record.anything, raw);
        let back = decoerce(&record).unwrap();
        assert_eq!(back.get("anything"), Some(&raw));
    }

    #[test]
    fn test_coerce_value_optional_list_elements() {
        let kind = Kind::list(Kind::optional(Kind::Int));
        let src = Value::List(vec![Value::Int(1), Value::Null]);
        assert_eq!(coerce_value(&kind, &src).unwrap(), src);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use once_cell::sync::Lazy;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Item {
        label: String,
        count: i64,
        weight: Option<f64>,
        data: Vec<u8>,
        tags: Vec<String>,
    }

    impl Coercible for Item {
        fn shape() -> &'static Shape {
            static SHAPE: Lazy<Shape> = Lazy::new(|| {
                Shape::new("Item")
                    .field(FieldShape::new("label", Kind::String).key("itemLabel").required())
                    .field(FieldShape::new("count", Kind::Int).convert())
                    .field(FieldShape::new("weight", Kind::optional(Kind::Float)).convert())
                    .field(FieldShape::new("data", Kind::Bytes))
                    .field(FieldShape::new("tags", Kind::list(Kind::String)))
            });
            &SHAPE
        }
    }

    fn item_source() -> impl Strategy<Value = Value> {
        (
            "[a-z]{1,10}",
            any::<i32>(),
            proptest::option::of(-1000i32..1000),
            proptest::collection::vec(any::<u8>(), 0..8),
            proptest::collection::vec("[a-z]{0,6}", 0..4),
        )
            .prop_map(|(label, count, weight, data, tags)| {
                let mut map = Map::new();
                map.insert("itemLabel".into(), Value::from(label));
                map.insert("count".into(), Value::from(count));
                if let Some(w) = weight {
                    map.insert("weight".into(), Value::from(w));
                }
                map.insert("data".into(), Value::Bytes(data));
                map.insert(
                    "tags".into(),
                    Value::List(tags.into_iter().map(Value::from).collect()),
                );
                Value::Map(map)
            })
    }

    proptest! {
        /// coerce, decoerce, coerce again yields the same record.
        #[test]
        fn coerce_round_trip_is_stable(src in item_source()) {
            let first: Item = coerce(&src).unwrap();
            let rendered = decoerce(&first).unwrap();
            let second: Item = coerce(&rendered).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
