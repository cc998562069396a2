//! Integration coverage for the boundary scenarios and invariants in
//! spec §8: minimal requests, target classification flags, header
//! dispatch (including case-insensitivity), malformed input, and the
//! stream-split independence property.

use httphead::{FieldRegistration, FieldsTable, ParseState, ParseError, Status};

#[derive(Default, Debug)]
struct Seen {
    host: Option<Vec<u8>>,
}

fn host_table() -> FieldsTable<Seen> {
    FieldsTable::build(vec![FieldRegistration::new(
        b"Host",
        0,
        |ctx: &mut Seen, _name: &[u8], value: &[u8], _data: usize| {
            ctx.host = Some(value.to_vec());
            Ok(())
        },
    )])
    .unwrap()
}

/// Feed the whole buffer to a fresh `ParseState` in one call.
fn parse_whole(table: &FieldsTable<Seen>, input: &[u8]) -> Result<(ParseState<'_, Seen>, usize), ParseError> {
    let mut state = ParseState::new(table, Seen::default());
    let mut pos = 0usize;
    match state.parse(input, &mut pos)? {
        Status::Done => Ok((state, pos)),
        Status::Again => panic!("expected Done, got Again for a complete input"),
    }
}

/// Feed `input` one byte at a time, growing the visible slice by one each
/// call, and return the final state once `Done` is reported. Exercises
/// the stream-split independence property (spec §8).
fn parse_dripped(table: &FieldsTable<Seen>, input: &[u8]) -> Result<(ParseState<'_, Seen>, usize), ParseError> {
    let mut state = ParseState::new(table, Seen::default());
    let mut pos = 0usize;
    for end in 1..=input.len() {
        match state.parse(&input[..end], &mut pos)? {
            Status::Done => return Ok((state, pos)),
            Status::Again => continue,
        }
    }
    panic!("input ended before Done was reported");
}

#[test]
fn minimal_well_formed() {
    let table = host_table();
    let input = b"GET / HTTP/1.0\r\n\r\n";
    let (state, consumed) = parse_whole(&table, input).unwrap();

    assert_eq!(state.method(input), b"GET");
    assert_eq!(state.target(input), b"/");
    assert_eq!(state.exten_start(), None);
    assert_eq!(state.args_start(), None);
    assert_eq!(state.version(), b"HTTP/1.0");
    assert_eq!(consumed, input.len());
}

#[test]
fn byte_by_byte_drip_matches_single_call() {
    let table = host_table();
    let input = b"GET / HTTP/1.0\r\n\r\n";

    let (whole, whole_pos) = parse_whole(&table, input).unwrap();
    let (dripped, dripped_pos) = parse_dripped(&table, input).unwrap();

    assert_eq!(whole_pos, dripped_pos);
    assert_eq!(whole.method(input), dripped.method(input));
    assert_eq!(whole.target(input), dripped.target(input));
    assert_eq!(whole.version(), dripped.version());
    assert_eq!(whole.flags(), dripped.flags());
}

#[test]
fn stream_split_independence_with_headers() {
    let table = host_table();
    let input = b"GET /a/b.txt?x=1 HTTP/1.1\r\nHost: example.com\r\nX-Skip: ignored\r\n\r\n";

    let (whole, whole_pos) = parse_whole(&table, input).unwrap();
    let (dripped, dripped_pos) = parse_dripped(&table, input).unwrap();

    assert_eq!(whole_pos, dripped_pos);
    assert_eq!(whole.ctx().host, dripped.ctx().host);
    assert_eq!(whole.exten_start(), dripped.exten_start());
    assert_eq!(whole.args_start(), dripped.args_start());
}

#[test]
fn target_extension_and_query_flags() {
    let table = host_table();
    let input = b"GET /a/b.txt?x=1 HTTP/1.1\r\n\r\n";
    let (state, _) = parse_whole(&table, input).unwrap();

    let exten_start = state.exten_start().unwrap();
    assert_eq!(&input[exten_start..exten_start + 3], b"txt");

    let args_start = state.args_start().unwrap();
    assert_eq!(&input[args_start..args_start + 3], b"x=1");

    let flags = state.flags();
    assert!(!flags.complex_target);
    assert!(!flags.quoted_target);
    assert!(!flags.plus_in_target);
    assert!(!flags.space_in_target);
}

#[test]
fn complex_target_double_slash() {
    let table = host_table();
    let input = b"GET //a HTTP/1.1\r\n\r\n";
    let (state, _) = parse_whole(&table, input).unwrap();
    assert!(state.flags().complex_target);
}

#[test]
fn quoted_and_plus_target() {
    // `+` must appear before `%` on the wire: once `%` is seen the scan
    // jumps to the "rest of target" loop, which (per spec §4.3 and
    // `nxt_http_parse_request_line`'s `rest_of_target` label) only
    // recognises space/`#`/illegal bytes and treats `+` as ordinary.
    let table = host_table();
    let input = b"GET /a+b%20c HTTP/1.1\r\n\r\n";
    let (state, _) = parse_whole(&table, input).unwrap();
    let flags = state.flags();
    assert!(flags.quoted_target);
    assert!(flags.plus_in_target);
}

#[test]
fn header_dispatch_exact_case() {
    let table = host_table();
    let input = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let (state, _) = parse_whole(&table, input).unwrap();
    assert_eq!(state.ctx().host.as_deref(), Some(&b"example.com"[..]));
}

#[test]
fn header_dispatch_case_insensitive_and_trimmed() {
    let table = host_table();
    let input = b"GET / HTTP/1.1\r\nhOsT:   EXAMPLE.com   \r\n\r\n";
    let (state, _) = parse_whole(&table, input).unwrap();
    assert_eq!(state.ctx().host.as_deref(), Some(&b"EXAMPLE.com"[..]));
}

#[test]
fn unregistered_header_is_skipped_without_error() {
    let table = host_table();
    let input = b"GET / HTTP/1.1\r\nX-Unknown: whatever\r\n\r\n";
    let (state, _) = parse_whole(&table, input).unwrap();
    assert_eq!(state.ctx().host, None);
}

#[test]
fn bare_lf_line_terminators_are_accepted() {
    let table = host_table();
    let input = b"GET / HTTP/1.1\nHost: example.com\n\n";
    let (state, _) = parse_whole(&table, input).unwrap();
    assert_eq!(state.ctx().host.as_deref(), Some(&b"example.com"[..]));
}

#[test]
fn control_byte_in_value_is_an_error() {
    let table = host_table();
    let input = b"GET / HTTP/1.0\r\nX: a\0b\r\n\r\n";
    let mut state = ParseState::new(&table, Seen::default());
    let mut pos = 0usize;
    assert_eq!(state.parse(input, &mut pos), Err(ParseError::InvalidFieldValue));
}

#[test]
fn bad_version_is_an_error() {
    // A version token that doesn't match `HTTP/<d>.<d>` is tolerantly
    // folded back into the target (the malformed-but-tolerated-space
    // recovery in spec §4.3); the control byte reached while rescanning
    // the "target" is what actually surfaces as an error here, matching
    // `nxt_http_parse_request_line`'s `rest_of_target` fallthrough.
    //
    // The trailing header line is not part of what's under test; it's
    // padding so the target-rest scan has its required 10-byte lookahead
    // margin left when it reaches the `\r` that triggers the error,
    // rather than suspending on `Again` first.
    let table = host_table();
    let input = b"GET / HTX/1.0\r\nHost: example.com\r\n\r\n";
    let mut state = ParseState::new(&table, Seen::default());
    let mut pos = 0usize;
    assert_eq!(state.parse(input, &mut pos), Err(ParseError::InvalidTarget));
}

#[test]
fn empty_field_name_is_an_error() {
    let table = host_table();
    let input = b"GET / HTTP/1.0\r\n: value\r\n\r\n";
    let mut state = ParseState::new(&table, Seen::default());
    let mut pos = 0usize;
    assert_eq!(state.parse(input, &mut pos), Err(ParseError::EmptyFieldName));
}

#[test]
fn handler_rejection_aborts_the_parse() {
    let table = FieldsTable::build(vec![FieldRegistration::new(
        b"host",
        0,
        |_ctx: &mut Seen, _name: &[u8], _value: &[u8], _data: usize| Err(()),
    )])
    .unwrap();
    let input = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let mut state = ParseState::new(&table, Seen::default());
    let mut pos = 0usize;
    assert_eq!(state.parse(input, &mut pos), Err(ParseError::HandlerRejected));
}
