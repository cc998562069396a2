//! The fields lookup structure.
//!
//! Grounded on NGINX Unit's `nxt_http_fields_hash`/`nxt_http_fields_hash_lookup`:
//! a read-only structure, built once from a registration list and indexed primarily
//! by name length, whose entries compare a handful of 64-bit lanes
//! rather than bytes. The source lays entries out as a hand-rolled
//! sentinel-terminated run inside one allocation per bucket; here each
//! bucket is simply a `Vec<Entry<Ctx>>`, which gives the same "probe
//! linearly within one exact-length bucket" behaviour without unsafe
//! pointer arithmetic (a deliberate redesign — see DESIGN.md).

use thiserror::Error;

use crate::grammar::field_name::{self, KEY_LEN};

/// The result a registered field handler returns: `Ok(())` to continue
/// parsing, `Err(())` to abort the whole parse with
/// [`crate::ParseError::HandlerRejected`].
pub type HandlerResult = Result<(), ()>;

/// A callback invoked once a registered header's name and value have
/// both been fully scanned.
///
/// Any `Fn` closure automatically implements this trait via the blanket
/// impl below, so registering a handler is normally just passing a
/// closure; a trait object is used instead of a raw function pointer so
/// stateful handlers (closures capturing data, or `impl` types holding
/// a cache) work without any unsafe casting.
pub trait FieldHandler<Ctx>: Send + Sync {
    /// Handle one recognised header field. `name` and `value` are
    /// borrowed from the input buffer and must not be retained past the
    /// call.
    fn handle(&self, ctx: &mut Ctx, name: &[u8], value: &[u8], data: usize) -> HandlerResult;
}

// `HandlerResult` is intentionally `Result<(), ()>` rather than a richer
// error type: the only thing a parse in progress can do with a handler
// failure is abort with `ParseError::HandlerRejected`, so there is
// nothing for a handler-specific error payload to carry upward.

impl<Ctx, F> FieldHandler<Ctx> for F
where
    F: Fn(&mut Ctx, &[u8], &[u8], usize) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &mut Ctx, name: &[u8], value: &[u8], data: usize) -> HandlerResult {
        self(ctx, name, value, data)
    }
}

/// One entry in the registration list passed to [`FieldsTable::build`].
pub struct FieldRegistration<Ctx> {
    /// The field name, exactly as it should be matched (case is folded
    /// at build time, so either case may be given here).
    pub name: Vec<u8>,
    /// The handler to invoke when this name is matched.
    pub handler: Box<dyn FieldHandler<Ctx>>,
    /// An opaque value passed straight through to the handler.
    pub data: usize,
}

impl<Ctx> FieldRegistration<Ctx> {
    /// Convenience constructor taking a plain closure.
    pub fn new<F>(name: &[u8], data: usize, handler: F) -> Self
    where
        F: Fn(&mut Ctx, &[u8], &[u8], usize) -> HandlerResult + Send + Sync + 'static,
    {
        FieldRegistration {
            name: name.to_vec(),
            handler: Box::new(handler),
            data,
        }
    }
}

/// Failure building a [`FieldsTable`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// A registered name was longer than [`KEY_LEN`] bytes. The long-name
    /// lookup path is unimplemented, so, as in the source, the whole
    /// build is rejected rather than silently dropping the entry.
    #[error("registered field name exceeds the {KEY_LEN}-byte lookup limit")]
    NameTooLong,
    /// A registered name was empty.
    #[error("registered field name is empty")]
    EmptyName,
}

struct Entry<Ctx> {
    key: [u64; 4],
    handler: Box<dyn FieldHandler<Ctx>>,
    data: usize,
}

/// A read-only, length-bucketed lookup table of registered header field
/// names.
///
/// Built once and then shared freely: queries take `&self` only, so one
/// `FieldsTable` can back many concurrent [`crate::ParseState`]s.
pub struct FieldsTable<Ctx> {
    min_length: usize,
    max_length: usize,
    buckets: Vec<Option<Vec<Entry<Ctx>>>>,
}

impl<Ctx> FieldsTable<Ctx> {
    /// Build a table from a registration list.
    ///
    /// An empty list produces a table that matches nothing.
    pub fn build(registrations: Vec<FieldRegistration<Ctx>>) -> Result<Self, BuildError> {
        if registrations.is_empty() {
            return Ok(FieldsTable {
                min_length: 1,
                max_length: 0,
                buckets: Vec::new(),
            });
        }

        let mut min_length = KEY_LEN + 1;
        let mut max_length = 0usize;
        for registration in &registrations {
            let len = registration.name.len();
            if len == 0 {
                return Err(BuildError::EmptyName);
            }
            if len > KEY_LEN {
                log::debug!(
                    "rejecting fields table build: {:?} is {} bytes, over the {}-byte limit",
                    String::from_utf8_lossy(&registration.name),
                    len,
                    KEY_LEN
                );
                return Err(BuildError::NameTooLong);
            }
            min_length = min_length.min(len);
            max_length = max_length.max(len);
        }

        let mut buckets: Vec<Option<Vec<Entry<Ctx>>>> =
            (0..=max_length - min_length).map(|_| None).collect();

        for registration in registrations {
            let len = registration.name.len();
            let key = pack_key(&registration.name);
            let entry = Entry {
                key,
                handler: registration.handler,
                data: registration.data,
            };
            buckets[len - min_length].get_or_insert_with(Vec::new).push(entry);
        }

        Ok(FieldsTable {
            min_length,
            max_length,
            buckets,
        })
    }

    /// Look up a header name by its packed key and length. `key`'s first
    /// `ceil(name_len / 8)` lanes are compared; the rest are ignored.
    pub fn lookup(&self, key: &[u64; 4], name_len: usize) -> Option<(&dyn FieldHandler<Ctx>, usize)> {
        if name_len < self.min_length || name_len > self.max_length {
            // Long-field lookup (> KEY_LEN) is out of scope.
            return None;
        }

        let bucket = self.buckets[name_len - self.min_length].as_ref()?;
        let lanes = field_name::lanes_for_len(name_len);

        bucket
            .iter()
            .find(|entry| entry.key[..lanes] == key[..lanes])
            .map(|entry| (entry.handler.as_ref(), entry.data))
    }
}

fn pack_key(name: &[u8]) -> [u64; 4] {
    let mut bytes = [0u8; KEY_LEN];
    for (i, &b) in name.iter().enumerate() {
        bytes[i] = field_name::normalize(b);
    }
    field_name::lanes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut (), _: &[u8], _: &[u8], _: usize) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn matches_case_insensitively() {
        let table = FieldsTable::build(vec![FieldRegistration::new(b"Host", 0, noop)]).unwrap();

        let mut key = [0u8; KEY_LEN];
        for (i, &b) in b"hOsT".iter().enumerate() {
            key[i] = field_name::normalize(b);
        }
        let lanes = field_name::lanes(&key);
        assert!(table.lookup(&lanes, 4).is_some());
    }

    #[test]
    fn distinguishes_different_lengths_same_bucket_absence() {
        let table = FieldsTable::build(vec![FieldRegistration::new(b"Host", 0, noop)]).unwrap();
        let mut key = [0u8; KEY_LEN];
        for (i, &b) in b"Hosts".iter().enumerate() {
            key[i] = field_name::normalize(b);
        }
        let lanes = field_name::lanes(&key);
        assert!(table.lookup(&lanes, 5).is_none());
    }

    #[test]
    fn rejects_overlong_name() {
        let name = vec![b'x'; 33];
        let err = FieldsTable::build(vec![FieldRegistration::new(&name, 0, noop)]).unwrap_err();
        assert_eq!(err, BuildError::NameTooLong);
    }

    #[test]
    fn rejects_empty_name() {
        let err = FieldsTable::build(vec![FieldRegistration::new(b"", 0, noop)]).unwrap_err();
        assert_eq!(err, BuildError::EmptyName);
    }

    #[test]
    fn empty_table_matches_nothing() {
        let table: FieldsTable<()> = FieldsTable::build(Vec::new()).unwrap();
        let key = [0u8; 4];
        assert!(table.lookup(&key, 4).is_none());
    }
}
