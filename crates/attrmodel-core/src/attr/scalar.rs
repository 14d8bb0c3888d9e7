//! Scalar kinds: `Integer`, `Float`, `String` and `Boolean`.
//!
//! Casts are loose: text is read for a leading number, booleans become 0/1,
//! timestamps become Unix seconds, and collections count as 0 or 1 depending
//! on whether they are empty.

use super::{AttrCore, AttrOptions, PrimitiveKind};
use crate::error::Result;
use crate::value::Value;

/// Integer kind; casts truncate toward zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl PrimitiveKind for Integer {
    const TYPE_NAME: &'static str = "Integer";

    fn from_options(_name: &str, _opts: &AttrOptions) -> Result<Self> {
        Ok(Integer)
    }

    fn default_value(&self) -> Value {
        Value::Int(0)
    }

    fn cast(&self, _core: &AttrCore, value: Value) -> Result<Value> {
        Ok(Value::Int(to_i64(&value)))
    }
}

/// Floating-point kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl PrimitiveKind for Float {
    const TYPE_NAME: &'static str = "Float";

    fn from_options(_name: &str, _opts: &AttrOptions) -> Result<Self> {
        Ok(Float)
    }

    fn default_value(&self) -> Value {
        Value::Float(0.0)
    }

    fn cast(&self, _core: &AttrCore, value: Value) -> Result<Value> {
        Ok(Value::Float(to_f64(&value)))
    }
}

/// Text kind, registered as `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl PrimitiveKind for Text {
    const TYPE_NAME: &'static str = "String";

    fn from_options(_name: &str, _opts: &AttrOptions) -> Result<Self> {
        Ok(Text)
    }

    fn default_value(&self) -> Value {
        Value::Text(String::new())
    }

    fn cast(&self, core: &AttrCore, value: Value) -> Result<Value> {
        let text = match value {
            Value::Text(s) => s,
            Value::Null => String::new(),
            Value::Bool(b) => (if b { "1" } else { "" }).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Time(t) => t.to_rfc3339(),
            other @ (Value::List(_) | Value::Map(_)) => {
                return Err(core.invalid_value(
                    Self::TYPE_NAME,
                    &other,
                    format!("a {} has no text form", other.type_name()),
                ));
            }
        };
        Ok(Value::Text(text))
    }
}

/// Boolean kind; casts by truthiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl PrimitiveKind for Boolean {
    const TYPE_NAME: &'static str = "Boolean";

    fn from_options(_name: &str, _opts: &AttrOptions) -> Result<Self> {
        Ok(Boolean)
    }

    fn default_value(&self) -> Value {
        Value::Bool(false)
    }

    fn cast(&self, _core: &AttrCore, value: Value) -> Result<Value> {
        Ok(Value::Bool(value.truthy()))
    }
}

fn to_i64(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Int(i) => *i,
        Value::Float(f) => f.trunc() as i64,
        Value::Text(s) => {
            let digits = numeric_prefix(s);
            digits
                .parse::<i64>()
                .or_else(|_| digits.parse::<f64>().map(|f| f.trunc() as i64))
                .unwrap_or(0)
        }
        Value::Time(t) => t.timestamp(),
        Value::List(_) | Value::Map(_) => i64::from(value.truthy()),
    }
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Text(s) => numeric_prefix(s).parse().unwrap_or(0.0),
        Value::Time(t) => t.timestamp() as f64,
        Value::List(_) | Value::Map(_) => f64::from(u8::from(value.truthy())),
    }
}

/// The leading numeric part of `s` after whitespace: sign, digits, fraction, exponent.
fn numeric_prefix(s: &str) -> &str {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    end = digits_from(end);
    if bytes.get(end) == Some(&b'.') {
        end = digits_from(end + 1);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    &s[..end]
}
