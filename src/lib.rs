pub mod macros;

pub mod account;
pub mod config;
pub mod credentials;
pub mod deposit;
pub mod domain;
pub mod error;
pub mod globals;
pub mod helpers;
pub mod logger;
pub mod networks;
pub mod signing;
pub mod verify;

pub use error::{Error, ErrorKind, Result};
