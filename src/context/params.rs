//! Typed parameter parsing.
//!
//! Parameters and properties arrive as strings; callers ask for one of a
//! closed set of target types and get a typed value or an error back.

use thiserror::Error;

use crate::context::MessageContext;
use crate::error::ConnectorError;

/// Target type for a string parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    Double,
    Boolean,
    String,
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Integer => "Integer",
            ParamType::Double => "Double",
            ParamType::Boolean => "Boolean",
            ParamType::String => "String",
        }
    }
}

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i32),
    Double(f64),
    Boolean(bool),
    String(String),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value is not of type {}", .0.name())]
pub struct ParamError(pub ParamType);

/// Parse a raw string into the requested type.
pub fn parse(value: &str, ty: ParamType) -> Result<ParamValue, ParamError> {
    match ty {
        ParamType::Integer => value
            .trim()
            .parse()
            .map(ParamValue::Integer)
            .map_err(|_| ParamError(ty)),
        ParamType::Double => value
            .trim()
            .parse()
            .map(ParamValue::Double)
            .map_err(|_| ParamError(ty)),
        ParamType::Boolean => match value.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(ParamValue::Boolean(true)),
            "false" => Ok(ParamValue::Boolean(false)),
            _ => Err(ParamError(ty)),
        },
        ParamType::String => Ok(ParamValue::String(remove_quotes_if_exist(value).to_string())),
    }
}

/// Strip one pair of surrounding double quotes.
pub fn remove_quotes_if_exist(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Read and parse an input parameter.
///
/// Missing or empty values are `Ok(None)` when optional, a configuration
/// error otherwise.
pub fn get_parameter(
    ctx: &dyn MessageContext,
    name: &str,
    ty: ParamType,
    optional: bool,
) -> Result<Option<ParamValue>, ConnectorError> {
    let raw = ctx.parameter(name).filter(|v| !v.is_empty());
    let Some(raw) = raw else {
        if optional {
            return Ok(None);
        }
        return Err(ConnectorError::Config(format!("Parameter {} is not provided", name)));
    };

    parse(&raw, ty).map(Some).map_err(|_| {
        ConnectorError::Config(format!("Parameter {} is not of type {}", name, ty.name()))
    })
}

/// Read and parse a message property.
pub fn get_property(
    ctx: &dyn MessageContext,
    name: &str,
    ty: ParamType,
    optional: bool,
) -> Result<Option<ParamValue>, ConnectorError> {
    let raw = ctx.property(name).filter(|v| !v.is_empty());
    let Some(raw) = raw else {
        if optional {
            return Ok(None);
        }
        return Err(ConnectorError::Config(format!("Property {} is not set", name)));
    };

    parse(&raw, ty).map(Some).map_err(|_| {
        ConnectorError::Config(format!("Property {} is not of type {}", name, ty.name()))
    })
}
