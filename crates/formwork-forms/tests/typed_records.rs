//! Validated input mapped into typed records.

use std::sync::Arc;

use formwork_core::{Map, Value};
use formwork_forms::validators::{IsInteger, IsStringMap, Or, Switch};
use formwork_forms::{
    coerce, decoerce, from_normalized, Coercible, Field, FieldShape, Form, Kind, PathSegment, Shape,
    Validator,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Address {
    street: String,
    zip_code: Option<i64>,
}

impl Coercible for Address {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("Address")
                .field(FieldShape::new("street", Kind::String).required())
                .field(FieldShape::new("zip_code", Kind::Int).key("zipCode"))
        });
        &SHAPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Customer {
    name: String,
    addresses: Vec<Address>,
}

impl Coercible for Customer {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("Customer")
                .field(FieldShape::new("name", Kind::String).required())
                .field(FieldShape::new("addresses", Kind::list(Kind::record::<Address>())))
        });
        &SHAPE
    }
}

fn map(entries: &[(&str, Value)]) -> Map {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn address_form() -> Arc<Form> {
    Arc::new(Form::new(vec![
        Field::new("street", vec![Validator::IsRequired, Validator::string()]),
        Field::new(
            "zipCode",
            vec![
                Validator::optional(),
                Validator::IsInteger(IsInteger {
                    convert: true,
                    ..IsInteger::default()
                }),
            ],
        ),
    ]))
}

#[test]
fn string_map_coerces_into_record() {
    let validator = Validator::IsStringMap(IsStringMap::with_form(address_form()).coercing_into(Address::shape()));
    let form = Form::new(vec![Field::new("address", vec![validator])]);
    let input = map(&[(
        "address",
        Value::Map(map(&[("street", Value::from("Main")), ("zipCode", Value::from("12345"))])),
    )]);
    let out = form.validate(&input).unwrap();
    let address: Address = from_normalized(out.get("address").unwrap()).unwrap();
    assert_eq!(
        address,
        Address {
            street: "Main".into(),
            zip_code: Some(12345),
        }
    );
}

#[test]
fn coerce_and_decoerce_nested_records() {
    let source = Value::Map(map(&[
        ("name", Value::from("acme")),
        (
            "addresses",
            Value::List(vec![
                Value::Map(map(&[("street", Value::from("Main")), ("zipCode", Value::Int(1))])),
                Value::Map(map(&[("street", Value::from("Side"))])),
            ]),
        ),
    ]));
    let customer: Customer = coerce(&source).unwrap();
    assert_eq!(customer.addresses.len(), 2);
    assert_eq!(customer.addresses[1].zip_code, None);

    let rendered = decoerce(&customer).unwrap();
    let again: Customer = coerce(&rendered).unwrap();
    assert_eq!(again, customer);
}

#[test]
fn coerce_error_carries_path() {
    let source = Value::Map(map(&[
        ("name", Value::from("acme")),
        (
            "addresses",
            Value::List(vec![
                Value::Map(map(&[("street", Value::from("Main"))])),
                Value::Map(map(&[("street", Value::Int(4))])),
            ]),
        ),
    ]));
    let err = coerce::<Customer>(&source).unwrap_err();
    assert_eq!(
        err.path(),
        &[
            PathSegment::Key("addresses".into()),
            PathSegment::Index(1),
            PathSegment::Key("street".into()),
        ]
    );
    assert_eq!(err.path_string(), "addresses.1.street");
}

#[test]
fn or_tries_options_in_order() {
    let or = Validator::Or(Or::new(vec![vec![Validator::string()], vec![Validator::integer()]]));
    let values = Map::new();
    assert_eq!(or.validate(Value::from("abc"), &values, None).unwrap(), Value::from("abc"));
    assert_eq!(or.validate(Value::Int(5), &values, None).unwrap(), Value::Int(5));
    assert_eq!(
        or.validate(Value::Bool(true), &values, None).unwrap_err().to_string(),
        "no possible option worked out"
    );
}

#[test]
fn switch_on_nil_input() {
    let lenient = Validator::Switch(Switch::new("type").with_case("a", vec![Validator::string()]).non_exhaustive());
    assert_eq!(lenient.validate(Value::Null, &Map::new(), None).unwrap(), Value::Null);

    let exhaustive = Validator::Switch(Switch::new("type").with_case("a", vec![Validator::string()]));
    let err = exhaustive.validate(Value::Null, &Map::new(), None).unwrap_err();
    assert!(err.to_string().starts_with("unknown switch case"));
}

#[test]
fn string_map_sub_form_reports_each_field() {
    let sub = Form::new(vec![
        Field::new("a", vec![Validator::string()]),
        Field::new("b", vec![Validator::integer()]),
    ]);
    let validator = Validator::string_map(Arc::new(sub));
    let ok = Value::Map(map(&[("a", Value::from("foo")), ("b", Value::Int(10))]));
    assert!(validator.validate(ok, &Map::new(), None).is_ok());

    let bad = Value::Map(map(&[("a", Value::Int(1)), ("b", Value::from("ar"))]));
    match validator.validate(bad, &Map::new(), None).unwrap_err() {
        formwork_forms::ValidationError::Form(err) => {
            assert!(err.field("a").is_some());
            assert!(err.field("b").is_some());
        }
        other => panic!("unexpected error {other:?}"),
    }
}
