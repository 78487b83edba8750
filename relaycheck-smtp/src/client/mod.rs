//! Low-level SMTP client: transport, reply parsing and command I/O.

mod connection;
mod error;
mod response;
mod smtp_client;

pub use error::{ClientError, Result};
pub use response::{Response, ResponseLine};
pub use smtp_client::SmtpClient;
