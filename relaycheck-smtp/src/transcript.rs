//! Per-step protocol transcripts.
//!
//! Every session operation writes the lines it exchanges into a
//! [`TranscriptSink`] supplied by the caller, so each handshake step ends up
//! with its own transcript rather than one interleaved log.

use std::fmt;

/// A handshake step that produces its own transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    Connection,
    Hello,
    Tls,
    Auth,
}

impl Step {
    /// Steps in handshake order.
    pub const ALL: [Self; 4] = [Self::Connection, Self::Hello, Self::Tls, Self::Auth];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Hello => "hello",
            Self::Tls => "tls",
            Self::Auth => "auth",
        }
    }

    /// The key this step's transcript is reported under.
    #[must_use]
    pub const fn log_key(self) -> &'static str {
        match self {
            Self::Connection => "connection_log",
            Self::Hello => "hello_log",
            Self::Tls => "tls_log",
            Self::Auth => "auth_log",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptLine {
    /// A command written to the server, with secrets already masked.
    Sent(String),
    /// A raw reply line read from the server.
    Received(String),
    /// The failure that ended the step.
    Error(String),
    /// Client-side progress, such as opening the socket.
    Notice(String),
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent(line) => write!(f, "CLIENT -> SERVER: {line}"),
            Self::Received(line) => write!(f, "SERVER -> CLIENT: {line}"),
            Self::Error(line) => write!(f, "SMTP ERROR: {line}"),
            Self::Notice(line) => write!(f, "SMTP NOTICE: {line}"),
        }
    }
}

/// Destination for the lines of one step.
pub trait TranscriptSink: Send {
    fn record(&mut self, line: TranscriptLine);
}

/// An ordered transcript of one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The transcript as newline-joined text.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TranscriptSink for Transcript {
    fn record(&mut self, line: TranscriptLine) {
        self.lines.push(line);
    }
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl TranscriptSink for Discard {
    fn record(&mut self, _line: TranscriptLine) {}
}
