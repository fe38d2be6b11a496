//! Synthesized composite parsers: array, list, set, and enum (spec §4.1
//! steps 2-4).

use std::sync::Arc;

use async_trait::async_trait;

use super::{EnumDescriptor, ParseContext, Parser};
use crate::error::ParseFailure;
use crate::value::{EnumValue, RawValue, Value};

/// Parses an object sequence element-wise, wrapping `get_parser(T)`. The
/// first element failure short-circuits with an index-tagged error (spec
/// §4.1).
async fn parse_elements(
    inner: &Arc<dyn Parser>,
    raw: &RawValue,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Value>, ParseFailure> {
    let elements = raw
        .as_sequence()
        .ok_or_else(|| ParseFailure::new("expected a sequence of values"))?;

    let mut out = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let value = inner
            .parse(element, ctx)
            .await
            .map_err(|e| e.at_index(index))?;
        out.push(value);
    }
    Ok(out)
}

pub struct ArrayParser {
    pub inner: Arc<dyn Parser>,
}

#[async_trait]
impl Parser for ArrayParser {
    fn target_type_name(&self) -> &'static str {
        "array"
    }

    async fn parse(&self, raw: &RawValue, ctx: &ParseContext<'_>) -> Result<Value, ParseFailure> {
        Ok(Value::Array(parse_elements(&self.inner, raw, ctx).await?))
    }
}

pub struct ListParser {
    pub inner: Arc<dyn Parser>,
}

#[async_trait]
impl Parser for ListParser {
    fn target_type_name(&self) -> &'static str {
        "list"
    }

    async fn parse(&self, raw: &RawValue, ctx: &ParseContext<'_>) -> Result<Value, ParseFailure> {
        Ok(Value::List(parse_elements(&self.inner, raw, ctx).await?))
    }
}

pub struct SetParser {
    pub inner: Arc<dyn Parser>,
}

#[async_trait]
impl Parser for SetParser {
    fn target_type_name(&self) -> &'static str {
        "set"
    }

    async fn parse(&self, raw: &RawValue, ctx: &ParseContext<'_>) -> Result<Value, ParseFailure> {
        let elements = parse_elements(&self.inner, raw, ctx).await?;
        let mut seen: Vec<Value> = Vec::with_capacity(elements.len());
        for value in elements {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        Ok(Value::Set(seen))
    }
}

/// Accepts case-insensitive variant name or ordinal text (spec §4.1 step 2).
pub struct EnumParser {
    pub descriptor: Arc<EnumDescriptor>,
}

#[async_trait]
impl Parser for EnumParser {
    fn target_type_name(&self) -> &'static str {
        self.descriptor.type_name
    }

    async fn parse(&self, raw: &RawValue, _ctx: &ParseContext<'_>) -> Result<Value, ParseFailure> {
        let text = raw
            .as_text()
            .ok_or_else(|| ParseFailure::new("expected a text value for enum"))?;

        if let Some((name, ordinal)) = self
            .descriptor
            .variants
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(text))
        {
            return Ok(Value::Enum(EnumValue {
                name: name.to_string(),
                ordinal: *ordinal,
            }));
        }

        if let Ok(ordinal) = text.trim().parse::<i64>() {
            if let Some((name, ordinal)) = self
                .descriptor
                .variants
                .iter()
                .find(|(_, o)| *o == ordinal)
            {
                return Ok(Value::Enum(EnumValue {
                    name: name.to_string(),
                    ordinal,
                }));
            }
        }

        Err(ParseFailure::new(format!(
            "{text:?} is not a valid {}",
            self.descriptor.type_name
        )))
    }
}
