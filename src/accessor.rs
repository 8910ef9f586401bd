//! Typed access to configuration values.
//!
//! Every backend implements only [`ConfigSource::get`]. All typed getters, their
//! default-valued siblings and structured decoding are layered on top of it by
//! [`TypedAccessor`], so they behave identically whatever the backend.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::env::substitute_env;
use crate::error::{ConfigError, Result};
use crate::format::kind_of;

/// Raw lookup of a dotted key inside a named config.
pub trait ConfigSource {
    /// Look up `key` in `config`. An empty key returns the whole snapshot.
    fn get(&self, config: &str, key: &str) -> Result<Value>;
}

/// Conversion from a raw configuration value.
pub trait FromConfigValue: Sized {
    /// Name of the target type, reported in conversion errors.
    const EXPECTED: &'static str;

    fn from_config_value(value: &Value) -> Option<Self>;
}

impl FromConfigValue for Value {
    const EXPECTED: &'static str = "value";

    fn from_config_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromConfigValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
                .or_else(|| n.as_f64().and_then(integral)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            _ => None,
        }
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl FromConfigValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl FromConfigValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
                "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            _ => None,
        }
    }
}

/// Strings are never produced from other scalar kinds.
impl FromConfigValue for String {
    const EXPECTED: &'static str = "string";

    fn from_config_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    const EXPECTED: &'static str = "array";

    fn from_config_value(value: &Value) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(T::from_config_value)
            .collect()
    }
}

impl<T: FromConfigValue> FromConfigValue for HashMap<String, T> {
    const EXPECTED: &'static str = "map";

    fn from_config_value(value: &Value) -> Option<Self> {
        value
            .as_object()?
            .iter()
            .map(|(k, v)| T::from_config_value(v).map(|v| (k.clone(), v)))
            .collect()
    }
}

macro_rules! typed_getters {
    ($($(#[$meta:meta])* $get:ident, $get_d:ident => $ty:ty;)*) => {
        $(
            $(#[$meta])*
            fn $get(&self, config: &str, key: &str) -> Result<$ty> {
                self.get_as(config, key)
            }

            #[doc = concat!("Like [`", stringify!($get), "`](Self::", stringify!($get), "), returning `default` on any error.")]
            fn $get_d(&self, config: &str, key: &str, default: $ty) -> $ty {
                self.get_as_d(config, key, default)
            }
        )*
    };
}

/// Typed getters available on every [`ConfigSource`].
///
/// `get_*` methods fail with `ConfigNotAdded`, `KeyNotFound` or `TypeConversion`.
/// `get_*_d` methods never fail: they return the caller's default instead.
pub trait TypedAccessor: ConfigSource {
    /// Raw lookup returning `default` on any error.
    fn get_d(&self, config: &str, key: &str, default: Value) -> Value {
        self.get(config, key).unwrap_or(default)
    }

    /// Look up `key` and coerce it to `T`.
    fn get_as<T: FromConfigValue>(&self, config: &str, key: &str) -> Result<T> {
        let value = self.get(config, key)?;
        T::from_config_value(&value).ok_or_else(|| ConfigError::TypeConversion {
            key: key.to_string(),
            expected: T::EXPECTED,
            found: kind_of(&value),
        })
    }

    /// Like [`get_as`](Self::get_as), returning `default` on any error.
    fn get_as_d<T: FromConfigValue>(&self, config: &str, key: &str, default: T) -> T {
        self.get_as(config, key).unwrap_or(default)
    }

    typed_getters! {
        /// Integer value; numeric strings are parsed.
        get_int, get_int_d => i64;
        /// Float value; numeric strings are parsed.
        get_float, get_float_d => f64;
        /// Boolean value; `"true"`, `"f"`, `1`, ... are accepted.
        get_bool, get_bool_d => bool;
        /// String value. Non-string scalars are a conversion error.
        get_string, get_string_d => String;
        get_slice, get_slice_d => Vec<Value>;
        get_int_slice, get_int_slice_d => Vec<i64>;
        get_float_slice, get_float_slice_d => Vec<f64>;
        get_string_slice, get_string_slice_d => Vec<String>;
        get_bool_slice, get_bool_slice_d => Vec<bool>;
        get_map, get_map_d => HashMap<String, Value>;
        get_int_map, get_int_map_d => HashMap<String, i64>;
        get_float_map, get_float_map_d => HashMap<String, f64>;
        get_string_map, get_string_map_d => HashMap<String, String>;
        get_bool_map, get_bool_map_d => HashMap<String, bool>;
    }

    /// Decode the value at `key` into a structured type.
    fn unmarshal<T: DeserializeOwned>(&self, config: &str, key: &str) -> Result<T> {
        let value = self.get(config, key)?;
        serde_json::from_value(value).map_err(|source| ConfigError::Decode {
            key: key.to_string(),
            source,
        })
    }

    /// String value with `${VAR}` placeholders filled from the process environment.
    fn get_string_with_env(&self, config: &str, key: &str) -> Result<String> {
        self.get_string(config, key).map(|s| substitute_env(&s))
    }

    /// Like [`get_string_with_env`](Self::get_string_with_env), returning `default`
    /// untouched on any error.
    fn get_string_with_env_d(&self, config: &str, key: &str, default: String) -> String {
        self.get_string_with_env(config, key).unwrap_or(default)
    }
}

impl<S: ConfigSource + ?Sized> TypedAccessor for S {}
