//! Built-in validators.
//!
//! Each validator owns its parameters as a plain record that is
//! [`Coercible`](crate::coerce::Coercible), next to the parameter form that
//! checks a description's `params` and the maker the registry calls.

mod choice;
mod composite;
mod presence;
mod scalar;
mod time;

use formwork_core::Value;

use crate::form::Field;
use crate::validator::Validator;

pub use choice::{IsIn, IsNotIn, MatchesRegex};
pub use composite::{IsList, IsStringList, IsStringMap, Or, Switch, PARENT_CONTEXT_KEY};
pub use presence::{DefaultGenerator, IsNil, IsOptional};
pub use scalar::{ByteEncoding, IsBoolean, IsBytes, IsFloat, IsHex, IsInteger, IsString, IsUuid};
pub use time::{IsTime, TimeFormat};

pub(crate) use choice::{
    make_is_in, make_is_not_in, make_matches_regex, IS_IN_PARAMS, IS_NOT_IN_PARAMS,
    MATCHES_REGEX_PARAMS,
};
pub(crate) use composite::{
    make_is_list, make_is_string_list, make_is_string_map, make_or, make_switch, IS_LIST_PARAMS,
    IS_STRING_LIST_PARAMS, IS_STRING_MAP_PARAMS, OR_PARAMS, SWITCH_PARAMS,
};
pub(crate) use presence::{
    make_can_be_anything, make_is_nil, make_is_optional, make_is_required, IS_NIL_PARAMS,
    IS_OPTIONAL_PARAMS, NO_PARAMS,
};
pub(crate) use scalar::{
    make_is_boolean, make_is_bytes, make_is_float, make_is_hex, make_is_integer, make_is_string,
    make_is_uuid, IS_BOOLEAN_PARAMS, IS_BYTES_PARAMS, IS_FLOAT_PARAMS, IS_HEX_PARAMS,
    IS_INTEGER_PARAMS, IS_STRING_PARAMS, IS_UUID_PARAMS,
};
pub(crate) use time::{make_is_time, IS_TIME_PARAMS};

/// Optional non-negative integer parameter.
fn length_param(name: &str) -> Field {
    Field::new(
        name,
        vec![Validator::optional(), Validator::IsInteger(IsInteger::at_least(0))],
    )
}

/// Boolean parameter with a default.
fn flag_param(name: &str, default: bool) -> Field {
    Field::new(
        name,
        vec![Validator::optional_or(Value::Bool(default)), Validator::boolean()],
    )
}
