//! SMTP client sessions for probing relays and sending test messages.
//!
//! [`SmtpSession`] drives one connection through
//! `connect -> greet -> [upgrade_to_tls -> greet] -> [authenticate] -> send | close`,
//! writing the lines each step exchanges to a caller-supplied
//! [`TranscriptSink`].

pub mod auth;
pub mod capabilities;
pub mod client;
pub mod error;
pub mod message;
pub mod session;
pub mod state;
pub mod transcript;

pub use crate::{
    error::HandshakeError,
    message::{Message, Sender, strip_markup},
    session::{MailSession, SessionOptions, SmtpSession},
    state::SessionState,
    transcript::{Discard, Step, Transcript, TranscriptLine, TranscriptSink},
};
