//! Scalar values held by the store.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A scalar value stored under a key.
///
/// Every variant has a raw byte rendering (see [`Value::to_bytes`]) which is
/// what decode functions operate on. Integers and floats render as their
/// decimal text, so a value stored as `42` decodes as the string `"42"` and a
/// value stored as `"42"` decodes as the integer `42`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// UTF-8 text
    Str(String),
    /// Opaque bytes
    Bytes(Bytes),
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
}

impl Value {
    /// Returns the raw byte rendering of this value.
    ///
    /// Numbers render as text. Floats keep their fractional part or exponent
    /// (`2.0`, `1e300`) so they read back as floats.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Value::Str(s) => Cow::Borrowed(s.as_bytes()),
            Value::Bytes(b) => Cow::Borrowed(b.as_ref()),
            Value::Int(i) => Cow::Owned(i.to_string().into_bytes()),
            Value::Float(f) => Cow::Owned(format!("{:?}", f).into_bytes()),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
        }
    }

    /// Returns the integer this value holds or renders to, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(_) => None,
            other => std::str::from_utf8(&other.to_bytes())
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Value::from("hello"), b"hello" ; "string")]
    #[test_case(Value::from(vec![0xffu8, 0x00]), &[0xff, 0x00] ; "bytes")]
    #[test_case(Value::from(42), b"42" ; "integer")]
    #[test_case(Value::from(-7i64), b"-7" ; "negative integer")]
    #[test_case(Value::from(3.5), b"3.5" ; "float")]
    #[test_case(Value::from(2.0), b"2.0" ; "whole float keeps its point")]
    #[test_case(Value::from(1e300), b"1e300" ; "large float stays short")]
    fn test_raw_rendering(value: Value, expected: &[u8]) {
        assert_eq!(value.to_bytes().as_ref(), expected);
    }

    #[test_case(Value::from("42"), Some(42) ; "numeric string")]
    #[test_case(Value::from(b"17".as_slice()), Some(17) ; "numeric bytes")]
    #[test_case(Value::from(9), Some(9) ; "integer")]
    #[test_case(Value::from("abc"), None ; "text")]
    #[test_case(Value::from(1.5), None ; "float")]
    fn test_as_integer(value: Value, expected: Option<i64>) {
        assert_eq!(value.as_integer(), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("foo").to_string(), "\"foo\"");
        assert_eq!(Value::from(b"a\n".as_slice()).to_string(), "b\"a\\n\"");
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from(2.0).to_string(), "2.0");
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::from("x").kind(), "string");
        assert_eq!(Value::from(1).kind(), "integer");
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&Value::from(5)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":5}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Int(5));
    }
}
