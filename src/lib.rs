//! A resumable, zero-copy HTTP/1.x request-head parser.
//!
//! The parser consumes a byte buffer that may arrive in one shot or in
//! arbitrarily small pieces and, either way, produces the same final
//! result: a parsed request line (method, target, version) and a series
//! of calls into handlers registered against a [`FieldsTable`] for the
//! header fields the caller cares about. Unrecognised header fields are
//! skipped without allocating.
//!
//! ```
//! use httphead::{FieldRegistration, FieldsTable, ParseState, Status};
//!
//! #[derive(Default)]
//! struct Seen {
//!     host: Option<Vec<u8>>,
//! }
//!
//! let table = FieldsTable::build(vec![FieldRegistration::new(
//!     b"host",
//!     0,
//!     |ctx: &mut Seen, _name: &[u8], value: &[u8], _data: usize| {
//!         ctx.host = Some(value.to_vec());
//!         Ok(())
//!     },
//! )])
//! .unwrap();
//!
//! let mut state = ParseState::new(&table, Seen::default());
//! let mut pos = 0;
//! let request = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! assert_eq!(state.parse(request, &mut pos).unwrap(), Status::Done);
//! assert_eq!(state.ctx().host.as_deref(), Some(&b"example.com"[..]));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod fields;
pub mod grammar;
pub mod parse;

pub use error::ParseError;
pub use fields::{BuildError, FieldHandler, FieldRegistration, FieldsTable, HandlerResult};
pub use parse::{ParseState, Span, Status, TargetFlags, Version};
