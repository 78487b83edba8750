//! Orchestration of SMTP sessions: connection probes and test dispatch.
//!
//! Both entry points own exactly one session for the duration of a call,
//! stop at the first failing step, close the session on every path and turn
//! every outcome into a result record. Neither returns an error.

mod diagnostics;
mod dispatcher;
mod handshake;
mod report;
#[cfg(test)]
mod scripted;

pub use diagnostics::ConnectionDiagnostics;
pub use dispatcher::{DEFAULT_BODY, DEFAULT_SUBJECT, MessageDispatcher};
pub use handshake::client_identity;
pub use report::{DiagnosticReport, DispatchResult};
