//! The parser's error type.
//!
//! NGINX Unit's `nxt_http_parse_request` reports every failure as a
//! single `NXT_ERROR` outcome and leaves classification to the caller;
//! `thiserror` gives callers of this crate the same named variants they
//! would otherwise have had to infer from *where* parsing went wrong.

use thiserror::Error;

/// Why a request head failed to parse.
///
/// Running out of buffer is deliberately not a member of this enum — it
/// isn't an error, so it is represented as `Ok(Status::Again)` from
/// [`crate::ParseState::parse`] instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A byte in the method was neither an uppercase letter nor a
    /// tolerated `_`/`-` continuation character.
    #[error("invalid character in request method")]
    InvalidMethod,

    /// The target contained a `\0`, a bare `\r`, or a bare `\n`, or did
    /// not begin with `/` and was not recoverable as a tolerated form
    /// (extra leading spaces). Absolute-URI and `*` targets are not
    /// implemented and are reported here.
    #[error("invalid or unsupported request target")]
    InvalidTarget,

    /// The bytes after the target did not form a recognisable
    /// `HTTP/<digit>.<digit>` version token.
    #[error("invalid or unsupported HTTP version")]
    InvalidVersion,

    /// A `\r` was not followed by `\n`.
    #[error("malformed line terminator")]
    MissingLineTerminator,

    /// A header line began with `:`, i.e. the field name was empty.
    #[error("empty header field name")]
    EmptyFieldName,

    /// A `\0` byte appeared inside a header field value.
    #[error("invalid byte in header field value")]
    InvalidFieldValue,

    /// A dispatched field handler returned `Err`.
    #[error("header field handler rejected the request")]
    HandlerRejected,
}
