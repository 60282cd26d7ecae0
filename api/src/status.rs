//! Status codes and reported errors.

use crate::model::Cursor;
use std::error::Error as StdError;
use std::fmt;

/// The outcome of an operation.
///
/// `Success` and `Failure` are not errors: `Failure` is the non-fatal
/// "nothing to do right now" signal returned between chunks and at a soft
/// end of input. Everything else is a real error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Completed successfully.
    Success,
    /// Non-fatal failure: no data or no chunk available right now.
    Failure,
    /// Unknown error.
    Unknown,
    /// Invalid syntax in the input document.
    BadSyntax,
    /// Invalid argument.
    BadArg,
    /// Invalid IRI.
    BadIri,
    /// Not found.
    NotFound,
    /// Clashing blank node identifiers.
    IdClash,
    /// Invalid CURIE, e.g. one with an undefined prefix.
    BadCurie,
    /// Unexpected internal error.
    Internal,
    /// Stack overflow.
    Overflow,
    /// Invalid text encoding.
    BadText,
    /// Unexpected end of input.
    NoData,
    /// Error reading from or writing to the byte stream.
    BadStream,
}

impl Status {
    /// Returns a human readable description of this status.
    pub fn message(self) -> &'static str {
        match self {
            Status::Success => "Success",
            Status::Failure => "Non-fatal failure",
            Status::Unknown => "Unknown error",
            Status::BadSyntax => "Invalid syntax",
            Status::BadArg => "Invalid argument",
            Status::BadIri => "Invalid IRI",
            Status::NotFound => "Not found",
            Status::IdClash => "Clashing blank node identifiers",
            Status::BadCurie => "Invalid CURIE",
            Status::Internal => "Internal error",
            Status::Overflow => "Stack overflow",
            Status::BadText => "Invalid text encoding",
            Status::NoData => "Unexpected end of input",
            Status::BadStream => "Error on byte stream",
        }
    }

    /// Returns true for real errors, i.e. everything past `Failure`.
    pub fn is_error(self) -> bool {
        !matches!(self, Status::Success | Status::Failure)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl StdError for Status {}

/// An error reported by a reader or writer, with its origin in the source
/// document when one is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub status: Status,
    pub cursor: Option<Cursor>,
    pub message: String,
}

impl Error {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            cursor: None,
            message: message.into(),
        }
    }

    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cursor) = &self.cursor {
            write!(
                f,
                "{}:{}:{}: {}",
                cursor.file.string(),
                cursor.line,
                cursor.col,
                self.message
            )
        } else {
            f.write_str(&self.message)
        }
    }
}

impl StdError for Error {}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::new(status, status.message())
    }
}
