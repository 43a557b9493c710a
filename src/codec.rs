//! Serialization boundary between persisted embeddings and in-memory vectors.
//!
//! On disk an embedding is a JSON array of numbers; in memory it is a
//! `Vec<f32>`. Everything that crosses that line goes through this module so
//! malformed input is rejected in one place instead of crashing a scan.

use std::fmt;

use serde_json::{Number, Value};

/// Reasons a persisted embedding value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value was not a JSON array.
    NotAnArray,
    /// An element was not a finite JSON number (position recorded).
    BadElement(usize),
    /// The array length disagreed with the collection dimension.
    WrongLength {
        /// Dimension the rest of the collection uses.
        expected: usize,
        /// Length actually found.
        found: usize,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::NotAnArray => write!(f, "embedding is not a JSON array"),
            CodecError::BadElement(index) => {
                write!(f, "embedding element {index} is not a finite number")
            }
            CodecError::WrongLength { expected, found } => {
                write!(f, "embedding has length {found}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Decodes a persisted embedding into an in-memory vector.
///
/// `expected_len` enforces the collection-wide dimension when known; pass
/// `None` for the first vector that establishes it.
pub fn decode_embedding(value: &Value, expected_len: Option<usize>) -> Result<Vec<f32>, CodecError> {
    let elements = value.as_array().ok_or(CodecError::NotAnArray)?;
    if let Some(expected) = expected_len {
        if elements.len() != expected {
            return Err(CodecError::WrongLength {
                expected,
                found: elements.len(),
            });
        }
    }
    let mut vector = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let number = element
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or(CodecError::BadElement(index))?;
        vector.push(number as f32);
    }
    Ok(vector)
}

/// Encodes an in-memory vector into its persisted JSON form.
pub fn encode_embedding(vector: &[f32]) -> Value {
    Value::Array(
        vector
            .iter()
            .map(|component| {
                Number::from_f64(f64::from(*component))
                    .map(Value::Number)
                    // f32 components are finite by construction; NaN would only
                    // appear through a bug upstream, encode it as zero.
                    .unwrap_or_else(|| Value::Number(Number::from(0)))
            })
            .collect(),
    )
}
