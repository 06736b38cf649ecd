use std::{
    borrow::Cow,
    env, fs,
    io::{self, Read},
    process,
};

use bursar_application::{BlobStore, Message, Treasury};
use bursar_infrastructure::{JsonFileStore, MemoryBlobStore};
use bursar_presentation::ReplyPresenter;
use chrono::Utc;

type CliResult<T> = Result<T, Cow<'static, str>>;

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let mut args = env::args().skip(1);
    let Some(script) = args.next() else {
        return Err("Usage: bursar-interpreter <session-file|-> [store.json]".into());
    };
    let store_path = args.next();

    let source = if script == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| format!("Failed to read stdin: {err}"))?;
        buffer
    } else {
        fs::read_to_string(&script).map_err(|err| format!("Failed to read '{script}': {err}"))?
    };

    let file_store;
    let memory_store;
    let store: &dyn BlobStore = match store_path {
        Some(path) => {
            file_store = JsonFileStore::open(&path)
                .map_err(|err| format!("Failed to open '{path}': {err}"))?;
            &file_store
        }
        None => {
            memory_store = MemoryBlobStore::new();
            &memory_store
        }
    };

    let mut treasury = Treasury::new(store);
    for line in source.lines() {
        let Some((sender, text)) = split_session_line(line) else {
            continue;
        };
        let message = Message {
            sender,
            date: Utc::now(),
            text,
        };
        if let Some(reply) = treasury.handle_message(&message) {
            println!("{}", ReplyPresenter::render(&reply));
        }
    }

    Ok(())
}

/// One session line is `<SENDER>: <message>`, where the sender is a two
/// letter user handle. Blank lines, `#` comments and anything else are
/// skipped, in line with the engine's silence on malformed input.
fn split_session_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (sender, text) = trimmed.split_once(':')?;
    let sender = sender.trim();
    if sender.len() == 2 && sender.bytes().all(|b| b.is_ascii_uppercase()) {
        Some((sender, text.trim()))
    } else {
        None
    }
}
