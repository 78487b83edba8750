pub mod address;
pub mod config;
pub mod error;
pub mod logging;

pub use tracing;

pub use crate::{
    address::{AddressError, Mailbox},
    config::{ConfigProvider, ConfigUpdate, Configuration, SecurityMode},
    error::ConfigError,
};

#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
}
