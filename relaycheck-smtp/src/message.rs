//! The test message and its MIME rendering.

use std::fmt::Write;

use base64::{Engine, engine::general_purpose::STANDARD};

/// The envelope sender and `From` header identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub address: String,
    pub name: Option<String>,
}

impl Sender {
    #[must_use]
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name: name.filter(|n| !n.trim().is_empty()),
        }
    }

    fn header_value(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", encode_header(name), self.address),
            None => self.address.clone(),
        }
    }
}

/// A minimal test message: one recipient, a subject and an HTML body with
/// its plain-text alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    /// `html_body` with markup removed.
    pub plain_body: String,
}

impl Message {
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        let html_body = html_body.into();
        Self {
            to: to.into(),
            subject: subject.into(),
            plain_body: strip_markup(&html_body),
            html_body,
        }
    }

    /// Renders the message as `multipart/alternative` with CRLF line endings.
    /// The result is not dot-stuffed.
    #[must_use]
    pub fn render(&self, sender: &Sender) -> String {
        let boundary = generate_boundary();
        let mut message = String::with_capacity(
            512 + self.html_body.len() + self.plain_body.len(),
        );

        // Writing to a String cannot fail.
        let _ = write!(message, "From: {}\r\n", sender.header_value());
        let _ = write!(message, "To: {}\r\n", self.to);
        let _ = write!(message, "Subject: {}\r\n", encode_header(&self.subject));
        message.push_str("MIME-Version: 1.0\r\n");
        let _ = write!(
            message,
            "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n"
        );
        message.push_str("\r\n");

        for (content_type, body) in [
            ("text/plain", &self.plain_body),
            ("text/html", &self.html_body),
        ] {
            let _ = write!(message, "--{boundary}\r\n");
            let _ = write!(message, "Content-Type: {content_type}; charset=utf-8\r\n");
            message.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
            message.push_str(&normalize_line_endings(body));
            message.push_str("\r\n");
        }

        let _ = write!(message, "--{boundary}--\r\n");
        message
    }
}

/// Removes markup from `html`, keeping the text between tags.
///
/// Tags, comments and processing instructions are dropped up to their closing
/// `>`, honouring quoted attribute values. A `<` not followed by a letter,
/// `/`, `!` or `?` is kept as text, so `1<2` survives unchanged where PHP's
/// `strip_tags` would drop everything from the `<` onward. Entities are left
/// untouched. Passes repeat
/// until nothing changes, so the result never contains a tag and stripping
/// it again is a no-op.
#[must_use]
pub fn strip_markup(html: &str) -> String {
    let mut current = strip_pass(html);
    loop {
        let next = strip_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_pass(html: &str) -> String {
    #[derive(Clone, Copy)]
    enum State {
        Text,
        Tag,
        Quoted(char),
    }

    let mut output = String::with_capacity(html.len());
    let mut state = State::Text;
    let mut chars = html.chars().peekable();

    while let Some(ch) = chars.next() {
        state = match (state, ch) {
            (State::Text, '<') if chars.peek().is_some_and(|&next| starts_tag(next)) => State::Tag,
            (State::Text, _) => {
                output.push(ch);
                State::Text
            }
            (State::Tag, '>') => State::Text,
            (State::Tag, '"' | '\'') => State::Quoted(ch),
            (State::Tag, _) => State::Tag,
            (State::Quoted(quote), _) if ch == quote => State::Tag,
            (State::Quoted(quote), _) => State::Quoted(quote),
        };
    }

    output
}

const fn starts_tag(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, '/' | '!' | '?')
}

/// Escapes lines starting with `.` (RFC 5321 section 4.5.2).
#[must_use]
pub fn dot_stuff(data: &str) -> String {
    let mut stuffed = String::with_capacity(data.len() + 16);

    for (i, line) in data.split("\r\n").enumerate() {
        if i > 0 {
            stuffed.push_str("\r\n");
        }
        if line.starts_with('.') {
            stuffed.push('.');
        }
        stuffed.push_str(line);
    }

    stuffed
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").replace('\n', "\r\n")
}

/// RFC 2047 encoding for header values that are not plain ASCII.
fn encode_header(value: &str) -> String {
    if value.is_ascii() && !value.contains(['\r', '\n']) {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    format!("----=_Part_{timestamp:x}")
}
