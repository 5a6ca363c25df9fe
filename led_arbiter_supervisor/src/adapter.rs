//! Request source adapter: turn console lines into engine requests.
//!
//! Grammar, one command per line:
//! - `3`      toggle the third catalog entry
//! - `+eco`   request `eco`
//! - `-eco`   release `eco`
//! - `q`      stop reading

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Activate,
    Deactivate,
    /// Activate if released, release if active.
    Toggle,
}

/// Which catalog entry a request names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Id(String),
    /// Zero-based catalog position.
    Index(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub action: Action,
    pub target: Target,
}

impl Request {
    pub fn activate(id: impl Into<String>) -> Self {
        Self {
            action: Action::Activate,
            target: Target::Id(id.into()),
        }
    }

    pub fn deactivate(id: impl Into<String>) -> Self {
        Self {
            action: Action::Deactivate,
            target: Target::Id(id.into()),
        }
    }

    pub fn toggle_index(index: usize) -> Self {
        Self {
            action: Action::Toggle,
            target: Target::Index(index),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleInput {
    Request(Request),
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> Result<ConsoleInput> {
    let s = line.trim();
    if s.is_empty() {
        return Ok(ConsoleInput::Empty);
    }
    if s.eq_ignore_ascii_case("q") || s.eq_ignore_ascii_case("quit") {
        return Ok(ConsoleInput::Quit);
    }
    if let Ok(n) = s.parse::<usize>() {
        // Console numbering is one-based.
        return match n.checked_sub(1) {
            Some(index) => Ok(ConsoleInput::Request(Request::toggle_index(index))),
            None => Err(Error::parse(s)),
        };
    }
    if let Some(id) = s.strip_prefix('+') {
        return named(id, Request::activate, s);
    }
    if let Some(id) = s.strip_prefix('-') {
        return named(id, Request::deactivate, s);
    }
    Err(Error::parse(s))
}

fn named(id: &str, make: fn(String) -> Request, line: &str) -> Result<ConsoleInput> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::parse(line));
    }
    Ok(ConsoleInput::Request(make(id.to_string())))
}

/// Read lines until EOF or `quit`, forwarding each parsed request to `tx`.
///
/// Unparseable lines are logged and skipped. Returns early without error if
/// the receiving side has gone away.
pub async fn forward_lines<R>(reader: R, tx: mpsc::Sender<Request>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(ConsoleInput::Request(req)) => {
                if tx.send(req).await.is_err() {
                    debug!("request channel closed; stop reading input");
                    break;
                }
            }
            Ok(ConsoleInput::Quit) => break,
            Ok(ConsoleInput::Empty) => {}
            Err(e) => warn!("{e}"),
        }
    }
    Ok(())
}
