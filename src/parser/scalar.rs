//! Built-in scalar parsers, pre-registered by [`super::ParserRegistry::new`].

use async_trait::async_trait;

use super::{ParseContext, Parser};
use crate::error::ParseFailure;
use crate::value::{RawValue, Value};

fn text_of(raw: &RawValue, target: &'static str) -> Result<&str, ParseFailure> {
    raw.as_text()
        .ok_or_else(|| ParseFailure::new(format!("expected a text value for {target}")))
}

pub struct BoolParser;

#[async_trait]
impl Parser for BoolParser {
    fn target_type_name(&self) -> &'static str {
        "bool"
    }

    async fn parse(&self, raw: &RawValue, _ctx: &ParseContext<'_>) -> Result<Value, ParseFailure> {
        match raw {
            RawValue::Object(obj) => obj
                .downcast_ref::<bool>()
                .map(|b| Value::Bool(*b))
                .ok_or_else(|| ParseFailure::new("expected a bool object")),
            _ => {
                let text = text_of(raw, "bool")?;
                match text.to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                    "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                    other => Err(ParseFailure::new(format!("{other:?} is not a valid bool"))),
                }
            }
        }
    }
}

pub struct IntParser;

#[async_trait]
impl Parser for IntParser {
    fn target_type_name(&self) -> &'static str {
        "int"
    }

    async fn parse(&self, raw: &RawValue, _ctx: &ParseContext<'_>) -> Result<Value, ParseFailure> {
        match raw {
            RawValue::Object(obj) => obj
                .downcast_ref::<i64>()
                .map(|i| Value::Int(*i))
                .ok_or_else(|| ParseFailure::new("expected an int object")),
            _ => {
                let text = text_of(raw, "int")?;
                text.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| ParseFailure::new(format!("{text:?} is not a valid int")))
            }
        }
    }
}

pub struct FloatParser;

#[async_trait]
impl Parser for FloatParser {
    fn target_type_name(&self) -> &'static str {
        "float"
    }

    async fn parse(&self, raw: &RawValue, _ctx: &ParseContext<'_>) -> Result<Value, ParseFailure> {
        match raw {
            RawValue::Object(obj) => obj
                .downcast_ref::<f64>()
                .map(|v| Value::Float(*v))
                .ok_or_else(|| ParseFailure::new("expected a float object")),
            _ => {
                let text = text_of(raw, "float")?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| ParseFailure::new(format!("{text:?} is not a valid float")))
            }
        }
    }
}

pub struct StringParser;

#[async_trait]
impl Parser for StringParser {
    fn target_type_name(&self) -> &'static str {
        "string"
    }

    async fn parse(&self, raw: &RawValue, _ctx: &ParseContext<'_>) -> Result<Value, ParseFailure> {
        match raw {
            RawValue::Object(obj) => obj
                .downcast_ref::<String>()
                .map(|s| Value::String(s.clone()))
                .ok_or_else(|| ParseFailure::new("expected a string object")),
            _ => Ok(Value::String(text_of(raw, "string")?.to_string())),
        }
    }
}
