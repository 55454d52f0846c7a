// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error types for bit array operations

use std::fmt;

/// ErrorKind is all kinds of Error of bit array operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The argument provided is invalid.
    InvalidArgument,
    /// The serialized bytes are malformed or possibly corrupted.
    InvalidData,
    /// A mutating operation was attempted on a read-only bit array.
    ReadOnly,
}

impl ErrorKind {
    /// Convert this error kind instance into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::InvalidData => "InvalidData",
            ErrorKind::ReadOnly => "ReadOnly",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error is the error struct returned by all bit array functions.
///
/// # Examples
///
/// ```
/// # use datasketches_bitarray::error::Error;
/// # use datasketches_bitarray::error::ErrorKind;
/// let err = Error::new(ErrorKind::InvalidArgument, "bad input");
/// assert_eq!(err.kind(), ErrorKind::InvalidArgument);
/// assert_eq!(err.message(), "bad input");
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: vec![],
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Return the value recorded for the given context key, if any.
    pub fn context(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

// Convenient constructors used within this crate.
impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, msg)
    }

    pub(crate) fn deserial(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidData, msg)
    }

    pub(crate) fn insufficient_data(msg: impl fmt::Display) -> Self {
        Self::deserial(format!("insufficient data: {msg}"))
    }

    pub(crate) fn possible_corruption(array_length: i64) -> Self {
        Self::deserial(format!(
            "possible corruption: declared array length {array_length} is out of range"
        ))
        .with_context("array_length", array_length)
    }

    pub(crate) fn invalid_num_bits_set(num_bits_set: u64, capacity: u64) -> Self {
        Self::deserial(format!(
            "possible corruption: stored bit count {num_bits_set} exceeds capacity {capacity}"
        ))
        .with_context("num_bits_set", num_bits_set)
        .with_context("capacity", capacity)
    }

    pub(crate) fn read_only(operation: &'static str) -> Self {
        Self::new(
            ErrorKind::ReadOnly,
            format!("cannot {operation} a read-only bit array"),
        )
        .with_context("operation", operation)
    }

    pub(crate) fn capacity_mismatch(capacity: u64, other_capacity: u64) -> Self {
        Self::invalid_argument(format!(
            "cannot combine bit arrays of different capacities: {capacity} and {other_capacity}"
        ))
        .with_context("capacity", capacity)
        .with_context("other_capacity", other_capacity)
    }

    pub(crate) fn region_too_small(required: usize, actual: usize) -> Self {
        Self::invalid_argument(format!(
            "memory region too small: requires {required} bytes, got {actual}"
        ))
        .with_context("required", required)
        .with_context("actual", actual)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // If alternate has been specified, we will print like Debug.
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("context", &self.context);
            return de.finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            for (i, (k, v)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", k, v)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn test_format_consistency() {
        let err = Error::new(ErrorKind::InvalidArgument, "something went wrong");
        assert_snapshot!(err, @"InvalidArgument => something went wrong");
    }

    #[test]
    fn test_format_read_only() {
        let err = Error::read_only("invert");
        assert_eq!(err.kind(), ErrorKind::ReadOnly);
        assert_eq!(err.context("operation"), Some("invert"));
        assert_snapshot!(err, @"ReadOnly, context: { operation: invert } => cannot invert a read-only bit array");
    }

    #[test]
    fn test_format_capacity_mismatch() {
        let err = Error::capacity_mismatch(128, 64);
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_snapshot!(err, @"InvalidArgument, context: { capacity: 128, other_capacity: 64 } => cannot combine bit arrays of different capacities: 128 and 64");
    }

    #[test]
    fn test_format_possible_corruption() {
        let err = Error::possible_corruption(-1);
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_snapshot!(err, @"InvalidData, context: { array_length: -1 } => possible corruption: declared array length -1 is out of range");
    }
}
