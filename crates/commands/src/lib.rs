//! Pure text → [`Command`] parser for the chat command surface.
//!
//! Parsing is total and lenient: every input maps to some `Command`, nothing
//! panics, and unrecognized text falls through to [`Command::Freeform`].

mod parse;

pub use parse::{AgenticAction, AgenticRequest, Command, USAGE, parse};
