//! A small command-line driver for [`httphead`], useful for manually
//! exercising the parser against a captured request head.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use httphead::{FieldRegistration, FieldsTable, ParseState, Status};

/// Parse an HTTP/1.x request head and print the fields it recognises.
#[derive(Parser, Debug)]
#[command(name = "headparse", version, about)]
struct Args {
    /// File containing a request head. Reads from stdin if omitted.
    file: Option<PathBuf>,

    /// Feed the input one byte at a time, to exercise resumption.
    #[arg(long)]
    drip: bool,
}

#[derive(Default)]
struct Seen {
    host: Option<Vec<u8>>,
    content_length: Option<Vec<u8>>,
    connection: Option<Vec<u8>>,
}

fn record(name: &'static str) -> impl Fn(&mut Seen, &[u8], &[u8], usize) -> Result<(), ()> {
    move |ctx, _name, value, _data| {
        let value = value.to_vec();
        match name {
            "host" => ctx.host = Some(value),
            "content-length" => ctx.content_length = Some(value),
            "connection" => ctx.connection = Some(value),
            _ => unreachable!(),
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut input = Vec::new();
    match &args.file {
        Some(path) => {
            input = fs::read(path).unwrap_or_else(|err| {
                eprintln!("headparse: {}: {}", path.display(), err);
                std::process::exit(1);
            });
        }
        None => {
            io::stdin().read_to_end(&mut input).unwrap_or_else(|err| {
                eprintln!("headparse: stdin: {}", err);
                std::process::exit(1);
            });
        }
    }

    let table = FieldsTable::build(vec![
        FieldRegistration::new(b"host", 0, record("host")),
        FieldRegistration::new(b"content-length", 0, record("content-length")),
        FieldRegistration::new(b"connection", 0, record("connection")),
    ])
    .expect("fixed registration list is well-formed");

    let mut state = ParseState::new(&table, Seen::default());
    let mut pos = 0usize;
    let mut available = if args.drip { 0 } else { input.len() };

    loop {
        match state.parse(&input[..available], &mut pos) {
            Ok(Status::Done) => break,
            Ok(Status::Again) => {
                if available == input.len() {
                    eprintln!("headparse: input ended mid-request");
                    std::process::exit(1);
                }
                available += 1;
            }
            Err(err) => {
                log::warn!("rejecting request head: {}", err);
                eprintln!("headparse: {}", err);
                std::process::exit(1);
            }
        }
    }

    log::trace!("parsed request head, {} bytes consumed", pos);
    println!("method:  {}", String::from_utf8_lossy(state.method(&input)));
    println!("target:  {}", String::from_utf8_lossy(state.target(&input)));
    println!("version: {}", String::from_utf8_lossy(state.version()));
    if let Some(host) = &state.ctx().host {
        println!("host:    {}", String::from_utf8_lossy(host));
    }
    if let Some(len) = &state.ctx().content_length {
        println!("length:  {}", String::from_utf8_lossy(len));
    }
    if let Some(conn) = &state.ctx().connection {
        println!("conn:    {}", String::from_utf8_lossy(conn));
    }
}
