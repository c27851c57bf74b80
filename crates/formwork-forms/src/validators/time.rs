//! Timestamp validation.
//!
//! Parsed times are emitted as RFC 3339 strings since the value model has no
//! time variant. Unix inputs are rendered in UTC.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc};
use formwork_core::{Map, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::flag_param;
use crate::coerce::{Coercible, FieldShape, Kind, Shape};
use crate::error::{SchemaError, ValidationError};
use crate::form::{Field, Form};
use crate::registry::{parse_params, FormDescriptionContext};
use crate::validator::Validator;
use crate::validators::IsIn;

/// Accepted input representations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "rfc3339")]
    Rfc3339,
    #[serde(rename = "rfc3339-date")]
    Rfc3339Date,
    #[serde(rename = "unix")]
    Unix,
    #[serde(rename = "unix-milli")]
    UnixMilli,
    #[serde(rename = "unix-nano")]
    UnixNano,
}

impl TimeFormat {
    pub const ALL: [TimeFormat; 5] = [
        TimeFormat::Rfc3339,
        TimeFormat::Rfc3339Date,
        TimeFormat::Unix,
        TimeFormat::UnixMilli,
        TimeFormat::UnixNano,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeFormat::Rfc3339 => "rfc3339",
            TimeFormat::Rfc3339Date => "rfc3339-date",
            TimeFormat::Unix => "unix",
            TimeFormat::UnixMilli => "unix-milli",
            TimeFormat::UnixNano => "unix-nano",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsTime {
    pub format: TimeFormat,
    /// Shift RFC 3339 inputs to UTC.
    pub to_utc: bool,
    /// Return the input unchanged once it parsed.
    pub raw: bool,
}

fn as_number(input: &Value) -> Result<i64, ValidationError> {
    match input {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        _ => Err("not a number".into()),
    }
}

fn as_text(input: &Value) -> Result<&str, ValidationError> {
    input.as_str().ok_or_else(|| ValidationError::from("not a string"))
}

fn render_utc(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn render_fixed(t: DateTime<FixedOffset>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl IsTime {
    pub fn validate(&self, input: Value) -> Result<Value, ValidationError> {
        let out_of_range = || ValidationError::from("timestamp out of range");
        let rendered = match self.format {
            TimeFormat::Rfc3339 => {
                let parsed = DateTime::parse_from_rfc3339(as_text(&input)?)
                    .map_err(|e| format!("invalid time: {e}"))?;
                if self.to_utc {
                    render_utc(parsed.with_timezone(&Utc))
                } else {
                    render_fixed(parsed)
                }
            }
            TimeFormat::Rfc3339Date => {
                let date = NaiveDate::parse_from_str(as_text(&input)?, "%Y-%m-%d")
                    .map_err(|e| format!("invalid date: {e}"))?;
                let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(out_of_range)?;
                render_utc(Utc.from_utc_datetime(&midnight))
            }
            TimeFormat::Unix => {
                let t = Utc.timestamp_opt(as_number(&input)?, 0).single().ok_or_else(out_of_range)?;
                render_utc(t)
            }
            TimeFormat::UnixMilli => {
                let t = Utc
                    .timestamp_millis_opt(as_number(&input)?)
                    .single()
                    .ok_or_else(out_of_range)?;
                render_utc(t)
            }
            TimeFormat::UnixNano => render_utc(Utc.timestamp_nanos(as_number(&input)?)),
        };
        if self.raw {
            Ok(input)
        } else {
            Ok(Value::String(rendered))
        }
    }
}

impl Coercible for IsTime {
    fn shape() -> &'static Shape {
        static SHAPE: Lazy<Shape> = Lazy::new(|| {
            Shape::new("IsTime")
                .field(FieldShape::new("format", Kind::String))
                .field(FieldShape::new("to_utc", Kind::Bool).key("toUTC"))
                .field(FieldShape::new("raw", Kind::Bool))
        });
        &SHAPE
    }
}

pub(crate) static IS_TIME_PARAMS: Lazy<Arc<Form>> = Lazy::new(|| {
    let formats = TimeFormat::ALL.iter().map(|f| Value::from(f.as_str())).collect();
    Arc::new(Form::new(vec![
        Field::new(
            "format",
            vec![
                Validator::optional_or(TimeFormat::Rfc3339.as_str()),
                Validator::IsIn(IsIn::new(formats)),
            ],
        ),
        flag_param("toUTC", false),
        flag_param("raw", false),
    ]))
});

pub(crate) fn make_is_time(params: &Map, _ctx: &FormDescriptionContext) -> Result<Validator, SchemaError> {
    Ok(Validator::IsTime(parse_params("IsTime", params, &IS_TIME_PARAMS)?))
}
