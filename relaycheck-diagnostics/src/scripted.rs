//! An in-memory [`MailSession`] that follows a script.

use std::time::Duration;

use relaycheck_smtp::{
    HandshakeError, MailSession, Message, Sender, TranscriptLine, TranscriptSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Connect,
    Greet,
    Upgrade,
    Authenticate,
    Send,
}

/// Records every call and fails the `nth` (zero-based) call of an operation
/// with the scripted error.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    pub calls: Vec<Op>,
    pub close_calls: usize,
    pub sent: Vec<Message>,
    pub senders: Vec<Sender>,
    failures: Vec<(Op, usize, HandshakeError)>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, op: Op, error: HandshakeError) -> Self {
        self.failures.push((op, 0, error));
        self
    }

    pub fn fail_nth(mut self, op: Op, nth: usize, error: HandshakeError) -> Self {
        self.failures.push((op, nth, error));
        self
    }

    fn step(&mut self, op: Op, sink: &mut dyn TranscriptSink) -> Result<(), HandshakeError> {
        let occurrence = self.calls.iter().filter(|&&call| call == op).count();
        self.calls.push(op);
        sink.record(TranscriptLine::Sent(format!("{op:?}")));

        match self
            .failures
            .iter()
            .find(|(failing, nth, _)| *failing == op && *nth == occurrence)
        {
            Some((_, _, error)) => {
                sink.record(TranscriptLine::Error(error.to_string()));
                Err(error.clone())
            }
            None => {
                sink.record(TranscriptLine::Received("250 OK".to_string()));
                Ok(())
            }
        }
    }
}

impl MailSession for ScriptedSession {
    async fn connect(
        &mut self,
        _host: &str,
        _port: u16,
        _timeout: Duration,
        sink: &mut dyn TranscriptSink,
    ) -> Result<(), HandshakeError> {
        self.step(Op::Connect, sink)
    }

    async fn greet(
        &mut self,
        _identity: &str,
        sink: &mut dyn TranscriptSink,
    ) -> Result<(), HandshakeError> {
        self.step(Op::Greet, sink)
    }

    async fn upgrade_to_tls(&mut self, sink: &mut dyn TranscriptSink) -> Result<(), HandshakeError> {
        self.step(Op::Upgrade, sink)
    }

    async fn authenticate(
        &mut self,
        _username: &str,
        _password: &str,
        sink: &mut dyn TranscriptSink,
    ) -> Result<(), HandshakeError> {
        self.step(Op::Authenticate, sink)
    }

    async fn send(
        &mut self,
        sender: &Sender,
        message: &Message,
        sink: &mut dyn TranscriptSink,
    ) -> Result<(), HandshakeError> {
        self.step(Op::Send, sink)?;
        self.senders.push(sender.clone());
        self.sent.push(message.clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.close_calls += 1;
    }
}
