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

//! Error types for filter operations

use std::fmt;

/// ErrorKind is all kinds of Error of the filter structures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A dimension (cell width, hash count, ordinal, word count) is out of
    /// its valid range.
    InvalidDimension,
    /// Two filters do not agree on size, cell width, hash count, strategy
    /// or funnel and cannot be combined.
    Incompatible,
    /// The operation is declared but intentionally not implemented.
    UnsupportedOperation,
    /// A supplied word buffer does not match the logical size of the
    /// structure adopting it.
    SizeMismatch,
}

impl ErrorKind {
    /// Convert this error kind instance into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            ErrorKind::InvalidDimension => "InvalidDimension",
            ErrorKind::Incompatible => "Incompatible",
            ErrorKind::UnsupportedOperation => "UnsupportedOperation",
            ErrorKind::SizeMismatch => "SizeMismatch",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error is the error struct returned by all fallible filter functions.
///
/// # Examples
///
/// ```
/// # use spectral::error::Error;
/// # use spectral::error::ErrorKind;
/// let err = Error::new(ErrorKind::SizeMismatch, "wrong buffer length");
/// assert_eq!(err.kind(), ErrorKind::SizeMismatch);
/// assert_eq!(err.message(), "wrong buffer length");
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
}

// Convenience constructors for the recurring failure cases
impl Error {
    pub(crate) fn invalid_dimension(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDimension, msg)
    }

    pub(crate) fn incompatible(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Incompatible, msg)
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedOperation, msg)
    }

    pub(crate) fn size_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SizeMismatch, msg)
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
            write!(
                f,
                "{}",
                self.context
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
