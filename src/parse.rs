//! The resumable request-head state machine.
//!
//! Grounded on `nxt_http_parse_request_line`, `nxt_http_parse_unusual_target`,
//! `nxt_http_parse_field_name`, `nxt_http_parse_field_value`, and
//! `nxt_http_parse_field_end` in
//! NGINX Unit's `nxt_http_parse_request`. The source persists
//! almost no state across an `AGAIN` from inside the request line: `*pos`
//! is left untouched until the whole request line (method, target,
//! version) has matched, so a suspension there simply re-parses the
//! request line from its start on the next call. Only the header-name
//! and header-value scans use a genuine resume counter
//! (`rp->offset`/[`ParseState::offset`]), because a header line can be
//! arbitrarily long. This port keeps exactly that asymmetry rather than
//! adding incremental resume to the request line: byte-by-byte delivery
//! and single-shot delivery of the same bytes still produce identical
//! final state and identical handler invocations, which is all that is
//! required of it.

use crate::fields::FieldsTable;
use crate::grammar::core::{CR, LF};
use crate::grammar::field_name::{self, KEY_LEN};
use crate::grammar::target::{self, Trap};
use crate::grammar::Scan;
use crate::error::ParseError;

/// A borrowed byte range into the caller's buffer: offsets rather than
/// raw pointers, so that buffer relocation or compaction by the caller
/// stays cheap to reflect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// Offset of the first byte, from the start of the buffer passed to
    /// [`ParseState::parse`].
    pub start: usize,
    /// Number of bytes in the span.
    pub len: usize,
}

impl Span {
    /// Borrow the bytes this span refers to from `buf`.
    #[inline]
    pub fn as_slice<'b>(&self, buf: &'b [u8]) -> &'b [u8] {
        &buf[self.start..self.start + self.len]
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The packed 8-byte ASCII version token (e.g. `HTTP/1.1`).
pub type Version = [u8; 8];

/// Target classification flags, accumulated while the target is scanned
/// and handed to field handlers unchanged for the rest of the parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetFlags {
    /// The target contained `//`, a leading `/.` in a segment, or `#`.
    pub complex_target: bool,
    /// The target contained `%`.
    pub quoted_target: bool,
    /// The target contained `+`.
    pub plus_in_target: bool,
    /// A malformed-but-tolerated space was folded back into the target.
    pub space_in_target: bool,
}

/// The outcome of one call to [`ParseState::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The full request head has been parsed; the position has been
    /// advanced past the final `\n` of the header block.
    Done,
    /// The buffer was exhausted before the current phase could
    /// complete. This is not an error: call again once more bytes have
    /// been appended to the same buffer.
    Again,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    RequestLine,
    FieldName,
    FieldValue,
    FieldEnd,
    Done,
}

enum StepResult {
    Continue,
    Suspend,
}

/// A resumable, zero-copy parser for one HTTP/1.x request head.
///
/// `ParseState` borrows nothing from the input buffer; every recorded
/// position is an offset, so the same `ParseState` can be re-entered
/// with a buffer that has grown (bytes appended past the previous end)
/// between calls. It does borrow the [`FieldsTable`] that header
/// dispatch is driven by, since that table is expected to be shared
/// across many concurrent parses.
pub struct ParseState<'t, Ctx> {
    phase: Phase,
    offset: usize,

    method: Span,
    target_start: usize,
    target_end: usize,
    exten_start: Option<usize>,
    args_start: Option<usize>,
    version: Version,
    flags: TargetFlags,

    field_name: Span,
    field_value: Span,
    field_name_key: [u8; KEY_LEN],

    hash: &'t FieldsTable<Ctx>,
    ctx: Ctx,
}

impl<'t, Ctx> ParseState<'t, Ctx> {
    /// Start a new parse against `hash`, with the given opaque context
    /// value to be threaded through to field handlers.
    pub fn new(hash: &'t FieldsTable<Ctx>, ctx: Ctx) -> Self {
        ParseState {
            phase: Phase::RequestLine,
            offset: 0,
            method: Span::default(),
            target_start: 0,
            target_end: 0,
            exten_start: None,
            args_start: None,
            version: [0; 8],
            flags: TargetFlags::default(),
            field_name: Span::default(),
            field_value: Span::default(),
            field_name_key: [0; KEY_LEN],
            hash,
            ctx,
        }
    }

    /// Drive the parse forward. `buf` is the whole request head seen so
    /// far, starting at offset 0; `pos` is the caller-owned cursor into
    /// it — on entry, where this call should resume; on return, how far
    /// parsing actually got.
    ///
    /// Returns `Ok(Status::Again)` when `buf` ran out before the head
    /// could be fully parsed: append more bytes to the same buffer (the
    /// previously-scanned prefix must not move or be overwritten) and
    /// call again with the same `pos`. Returns `Ok(Status::Done)` once
    /// the full head — request line plus the terminating empty line —
    /// has been parsed.
    pub fn parse(&mut self, buf: &[u8], pos: &mut usize) -> Result<Status, ParseError> {
        loop {
            let step = match self.phase {
                Phase::RequestLine => self.step_request_line(buf, pos)?,
                Phase::FieldName => self.step_field_name(buf, pos)?,
                Phase::FieldValue => self.step_field_value(buf, pos)?,
                Phase::FieldEnd => self.step_field_end(buf, pos)?,
                Phase::Done => return Ok(Status::Done),
            };
            match step {
                StepResult::Continue => continue,
                StepResult::Suspend => return Ok(Status::Again),
            }
        }
    }

    /// The request method, e.g. `GET`.
    pub fn method<'b>(&self, buf: &'b [u8]) -> &'b [u8] {
        self.method.as_slice(buf)
    }

    /// The request target, e.g. `/a/b.txt?x=1`.
    pub fn target<'b>(&self, buf: &'b [u8]) -> &'b [u8] {
        &buf[self.target_start..self.target_end]
    }

    /// The position of the last path segment's extension marker (the
    /// byte after a `.`), if any.
    pub fn exten_start(&self) -> Option<usize> {
        self.exten_start
    }

    /// The position of the query string (the byte after `?`), if any.
    pub fn args_start(&self) -> Option<usize> {
        self.args_start
    }

    /// The packed ASCII version token, e.g. `b"HTTP/1.1"`.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Target classification flags accumulated while scanning the
    /// target.
    pub fn flags(&self) -> TargetFlags {
        self.flags
    }

    /// Borrow the opaque context value.
    pub fn ctx(&self) -> &Ctx {
        &self.ctx
    }

    /// Mutably borrow the opaque context value.
    pub fn ctx_mut(&mut self) -> &mut Ctx {
        &mut self.ctx
    }

    /// Consume the parser, returning the context value.
    pub fn into_ctx(self) -> Ctx {
        self.ctx
    }

    // ---- request-line phase --------------------------------------

    fn step_request_line(&mut self, buf: &[u8], pos: &mut usize) -> Result<StepResult, ParseError> {
        match self.parse_request_line(buf)? {
            None => Ok(StepResult::Suspend),
            Some(next_pos) => {
                *pos = next_pos;
                self.offset = 0;
                self.field_name_key = [0; KEY_LEN];
                self.phase = Phase::FieldName;
                Ok(StepResult::Continue)
            }
        }
    }

    /// Parse method, target, and version in one pass, always starting
    /// from the beginning of `buf` (see module docs). Returns the
    /// position just past the header block's introductory line
    /// terminator on success, or `None` for "again".
    fn parse_request_line(&mut self, buf: &[u8]) -> Result<Option<usize>, ParseError> {
        let method = match scan_method(buf)? {
            None => return Ok(None),
            Some(m) => m,
        };
        self.method = Span { start: method.start, len: method.len };

        let mut p = method.after_space;
        if p == buf.len() {
            return Ok(None);
        }

        if buf[p] != b'/' {
            p = match skip_unusual_target(buf, p)? {
                None => return Ok(None),
                Some(p) => p,
            };
        }

        self.target_start = p;
        self.target_end = p;
        self.exten_start = None;
        self.args_start = None;
        self.flags = TargetFlags::default();

        let space_pos = match self.scan_target_main(buf, p)? {
            None => return Ok(None),
            Some(space_pos) => space_pos,
        };

        self.finish_request_line(buf, space_pos)
    }

    /// The main target-scanning loop. `p` is the
    /// offset of the leading `/`.
    fn scan_target_main(&mut self, buf: &[u8], p: usize) -> Result<Option<usize>, ParseError> {
        let mut p = p;
        let mut after_slash = p + 1;
        loop {
            p += 1;
            let (stop, trap) = match target::scan(buf, p) {
                Scan::Again => return Ok(None),
                Scan::Stop(stop, trap) => (stop, trap),
            };
            p = stop;
            match trap {
                Trap::Slash => {
                    if after_slash == p {
                        self.flags.complex_target = true;
                        return self.scan_target_rest(buf, p);
                    }
                    after_slash = p + 1;
                    self.exten_start = None;
                }
                Trap::Dot => {
                    if after_slash == p {
                        self.flags.complex_target = true;
                        return self.scan_target_rest(buf, p);
                    }
                    self.exten_start = Some(p + 1);
                }
                Trap::ArgsMark => {
                    self.args_start = Some(p + 1);
                    return self.scan_target_rest(buf, p);
                }
                Trap::Space => {
                    self.target_end = p;
                    return Ok(Some(p));
                }
                Trap::QuoteMark => {
                    self.flags.quoted_target = true;
                    return self.scan_target_rest(buf, p);
                }
                Trap::Plus => {
                    self.flags.plus_in_target = true;
                }
                Trap::Hash => {
                    self.flags.complex_target = true;
                    return self.scan_target_rest(buf, p);
                }
                Trap::Bad => return Err(ParseError::InvalidTarget),
            }
        }
    }

    /// The simplified "rest of target" loop, reached once the target is
    /// known to be complex/quoted/etc. and only space, `#`, and illegal
    /// bytes remain interesting.
    fn scan_target_rest(&mut self, buf: &[u8], p: usize) -> Result<Option<usize>, ParseError> {
        let mut p = p;
        loop {
            p += 1;
            let (stop, trap) = match target::scan(buf, p) {
                Scan::Again => return Ok(None),
                Scan::Stop(stop, trap) => (stop, trap),
            };
            p = stop;
            match trap {
                Trap::Space => {
                    self.target_end = p;
                    return Ok(Some(p));
                }
                Trap::Hash => {
                    self.flags.complex_target = true;
                }
                Trap::Bad => return Err(ParseError::InvalidTarget),
                Trap::Slash | Trap::Dot | Trap::ArgsMark | Trap::QuoteMark | Trap::Plus => {}
            }
        }
    }

    /// Attempt to match the version token starting at the space that
    /// ends the target, retrying as the source does for surplus spaces
    /// and for a malformed-but-tolerated space inside the target.
    fn finish_request_line(&mut self, buf: &[u8], space_pos: usize) -> Result<Option<usize>, ParseError> {
        let mut p = space_pos;
        loop {
            match self.try_version(buf, p)? {
                VersionAttempt::Success(next_pos) => return Ok(Some(next_pos)),
                VersionAttempt::Again => return Ok(None),
                VersionAttempt::SurplusSpace => {
                    p += 1;
                }
                VersionAttempt::Malformed => {
                    self.flags.space_in_target = true;
                    match self.scan_target_rest(buf, p)? {
                        None => return Ok(None),
                        Some(new_space_pos) => p = new_space_pos,
                    }
                }
            }
        }
    }

    /// A single attempt to read ` HTTP/<d>.<d>` starting at the space
    /// found at `p`.
    fn try_version(&mut self, buf: &[u8], p: usize) -> Result<VersionAttempt, ParseError> {
        if buf.len().saturating_sub(p) < 10 {
            return Ok(VersionAttempt::Again);
        }

        let candidate = &buf[p + 1..p + 9];
        let terminator = buf[p + 9];

        if is_http_version(candidate) && (terminator == CR || terminator == LF) {
            self.version.copy_from_slice(candidate);

            if terminator == CR {
                let mut q = p + 10;
                if q == buf.len() {
                    return Ok(VersionAttempt::Again);
                }
                if buf[q] != LF {
                    return Err(ParseError::MissingLineTerminator);
                }
                q += 1;
                return Ok(VersionAttempt::Success(q));
            }

            return Ok(VersionAttempt::Success(p + 10));
        }

        if buf[p + 1] == b' ' {
            return Ok(VersionAttempt::SurplusSpace);
        }

        Ok(VersionAttempt::Malformed)
    }

    // ---- header-name phase -----------------------------------------

    fn step_field_name(&mut self, buf: &[u8], pos: &mut usize) -> Result<StepResult, ParseError> {
        let start = *pos;
        match field_name::scan(buf, start, self.offset, &mut self.field_name_key) {
            Scan::Again => {
                self.offset = buf.len() - start;
                Ok(StepResult::Suspend)
            }
            Scan::Stop(len, terminator) => {
                if terminator == b':' {
                    if len == 0 {
                        return Err(ParseError::EmptyFieldName);
                    }
                    self.field_name = Span { start, len };
                    *pos = start + len + 1;
                    self.offset = 0;
                    self.phase = Phase::FieldValue;
                } else {
                    // Not a colon: either the empty line ending the
                    // header block, or a malformed name. Either way the
                    // field-end phase is what decides: it accepts only
                    // `\r`/`\n` right here.
                    self.field_name = Span { start, len: 0 };
                    *pos = start + len;
                    self.phase = Phase::FieldEnd;
                }
                Ok(StepResult::Continue)
            }
        }
    }

    // ---- header-value phase ------------------------------------------

    fn step_field_value(&mut self, buf: &[u8], pos: &mut usize) -> Result<StepResult, ParseError> {
        // Skip leading OWS; progress here is persisted directly via
        // `*pos`, matching the source (no separate resume counter is
        // needed because re-scanning already-seen spaces is O(1) work
        // per suspension, not O(n)).
        let mut p = *pos;
        loop {
            if p == buf.len() {
                *pos = p;
                return Ok(StepResult::Suspend);
            }
            if buf[p] != b' ' {
                break;
            }
            p += 1;
        }
        *pos = p;

        // Scan to the first control byte, resuming via `self.offset`.
        let value_start = p;
        let mut q = value_start + self.offset;
        let end = loop {
            match field_name::lookup_field_end(buf, q) {
                None => {
                    self.offset = buf.len() - value_start;
                    return Ok(StepResult::Suspend);
                }
                Some(stop) => {
                    let ch = buf[stop];
                    if ch == CR || ch == LF {
                        break stop;
                    }
                    // Any other control byte, including `\0`, is
                    // invalid in a field value.
                    return Err(ParseError::InvalidFieldValue);
                }
            }
        };

        let mut trimmed_end = end;
        if trimmed_end != value_start {
            while buf[trimmed_end - 1] == b' ' {
                trimmed_end -= 1;
            }
        }

        self.offset = 0;
        self.field_value = Span {
            start: value_start,
            len: trimmed_end - value_start,
        };
        *pos = end;
        self.phase = Phase::FieldEnd;
        Ok(StepResult::Continue)
    }

    // ---- end-of-field phase -----------------------------------------

    fn step_field_end(&mut self, buf: &[u8], pos: &mut usize) -> Result<StepResult, ParseError> {
        let mut p = *pos;
        if buf[p] == CR {
            p += 1;
            if p == buf.len() {
                return Ok(StepResult::Suspend);
            }
        }

        if buf[p] != LF {
            return Err(ParseError::MissingLineTerminator);
        }

        *pos = p + 1;

        if self.field_name.is_empty() {
            self.phase = Phase::Done;
            return Ok(StepResult::Continue);
        }

        self.dispatch(buf)?;
        self.field_name_key = [0; KEY_LEN];
        self.offset = 0;
        self.phase = Phase::FieldName;
        Ok(StepResult::Continue)
    }

    fn dispatch(&mut self, buf: &[u8]) -> Result<(), ParseError> {
        let lanes = field_name::lanes(&self.field_name_key);
        if let Some((handler, data)) = self.hash.lookup(&lanes, self.field_name.len) {
            let name = self.field_name.as_slice(buf);
            let value = self.field_value.as_slice(buf);
            handler
                .handle(&mut self.ctx, name, value, data)
                .map_err(|_| ParseError::HandlerRejected)?;
        }
        Ok(())
    }
}

enum VersionAttempt {
    Success(usize),
    Again,
    SurplusSpace,
    Malformed,
}

#[inline]
fn is_http_version(v: &[u8]) -> bool {
    debug_assert_eq!(v.len(), 8);
    v == b"HTTP/1.1"
        || v == b"HTTP/1.0"
        || (v[0] == b'H'
            && v[1] == b'T'
            && v[2] == b'T'
            && v[3] == b'P'
            && v[4] == b'/'
            && v[5].is_ascii_digit()
            && v[6] == b'.'
            && v[7].is_ascii_digit())
}

struct MethodScan {
    start: usize,
    len: usize,
    after_space: usize,
}

/// Lookahead the method scan needs before it will inspect a byte; one
/// more than the target scan's, per the source.
const METHOD_LOOKAHEAD: usize = 12;

/// Accumulate method bytes: uppercase letters, with
/// `_`/`-` tolerated as continuation characters, and leading stray
/// `\r`/`\n` silently skipped.
fn scan_method(buf: &[u8]) -> Result<Option<MethodScan>, ParseError> {
    let mut p = 0usize;
    let mut start = 0usize;

    loop {
        loop {
            if buf.len().saturating_sub(p) < METHOD_LOOKAHEAD {
                return Ok(None);
            }
            if !buf[p].is_ascii_uppercase() {
                break;
            }
            p += 1;
        }

        let ch = buf[p];
        if ch == b' ' {
            let len = p - start;
            p += 1;
            return Ok(Some(MethodScan { start, len, after_space: p }));
        }
        if ch == b'_' || ch == b'-' {
            p += 1;
            continue;
        }
        if start == p && (ch == CR || ch == LF) {
            start += 1;
            p += 1;
            continue;
        }
        return Err(ParseError::InvalidMethod);
    }
}

/// Tolerate extra leading spaces before the target, then require `/`
/// (origin-form). Absolute-URI and `*` targets are not implemented
/// here.
fn skip_unusual_target(buf: &[u8], p: usize) -> Result<Option<usize>, ParseError> {
    let mut p = p;
    if buf[p] != b' ' {
        return Err(ParseError::InvalidTarget);
    }
    loop {
        p += 1;
        if p == buf.len() {
            return Ok(None);
        }
        if buf[p] != b' ' {
            break;
        }
    }
    if buf[p] == b'/' {
        return Ok(Some(p));
    }
    Err(ParseError::InvalidTarget)
}
