//! Decoders for raw value bytes.
//!
//! These are the functions behind `get_as_string`, `get_as_integer`, and
//! `get_as_float`; they can also be passed to `KeyValueStore::get_with`.

use std::num::{ParseFloatError, ParseIntError};
use std::str::Utf8Error;

/// Decodes UTF-8 text.
pub fn decode_utf8(raw: &[u8]) -> Result<String, Utf8Error> {
    std::str::from_utf8(raw).map(str::to_owned)
}

/// Decodes a base-10 signed integer.
pub fn decode_integer(raw: &[u8]) -> Result<i64, DecodeFailure<ParseIntError>> {
    let text = std::str::from_utf8(raw).map_err(DecodeFailure::Utf8)?;
    text.parse().map_err(DecodeFailure::Parse)
}

/// Decodes a float.
pub fn decode_float(raw: &[u8]) -> Result<f64, DecodeFailure<ParseFloatError>> {
    let text = std::str::from_utf8(raw).map_err(DecodeFailure::Utf8)?;
    text.parse().map_err(DecodeFailure::Parse)
}

/// Failure of a two-step (UTF-8, then parse) decode.
#[derive(Debug)]
pub enum DecodeFailure<E> {
    /// Bytes were not UTF-8
    Utf8(Utf8Error),
    /// Text did not parse
    Parse(E),
}

impl<E: std::fmt::Display> std::fmt::Display for DecodeFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeFailure::Utf8(e) => write!(f, "invalid utf-8: {}", e),
            DecodeFailure::Parse(e) => write!(f, "{}", e),
        }
    }
}
