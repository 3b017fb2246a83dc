#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Turn-taking on top of `parley_core` conversations.
//!
//! - [`TurnTaker`] runs one request/response cycle against a provider
//! - [`ChatService`] ties a registry, a turn taker and a store together for
//!   the bot front-ends
//! - [`ReplSession`] drives an interactive terminal chat
//! - [`ChatStore`] writes chats to timestamped files

mod manager;
mod repl;
mod service;
mod store;

pub use manager::{TurnError, TurnReply, TurnTaker};
pub use repl::{
    END_MARKERS, ExitReason, LineReceiver, ReplOptions, ReplSession, is_end_marker, reader_lines,
    stdin_lines,
};
pub use service::ChatService;
pub use store::{ChatStore, FILE_NAME_FORMAT};
