#![deny(
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

//! Slack front-end over the Events API.
//!
//! Each `(user, channel, thread)` gets its own conversation. A thread the
//! process has not seen yet (after a restart, say) is rebuilt from
//! `conversations.replies` before the new message is answered.

mod api;
mod bot;
mod error;
mod events;
mod verify;

pub use api::{ResponseUrl, SlackClient, SlackMessage, SlackThread};
pub use bot::SlackBot;
pub use error::{Result, SlackError};
pub use events::{CHANNEL_SCOPE_NOTE, EventEnvelope, MessageEvent, SlashCommand, router};
pub use verify::{MAX_REQUEST_AGE_SECS, sign_request, verify_request};
